use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::{crypto::Address, vrf::RequestId};

/// Observable notifications emitted by a lottery, in emission order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum LotteryEvent {
    LotteryEnter {
        player: Address,
    },
    RequestedLotteryWinner {
        #[serde(rename = "requestId")]
        request_id: RequestId,
    },
    WinnerPicked {
        winner: Address,
    },
}

impl Display for LotteryEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::LotteryEnter { player } => write!(f, "LotteryEnter(player={player})"),
            Self::RequestedLotteryWinner { request_id } => {
                write!(f, "RequestedLotteryWinner(requestId={request_id})")
            }
            Self::WinnerPicked { winner } => write!(f, "WinnerPicked(winner={winner})"),
        }
    }
}
