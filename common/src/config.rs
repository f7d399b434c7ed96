// 9 decimals numbers
pub const COIN_DECIMALS: u8 = 9;
// 1 000 000 000 atomic units to represent 1 coin
// The same scale is used for the native coin and for LINK
pub const COIN_VALUE: u64 = 10u64.pow(COIN_DECIMALS as u32);

// Fixed shape of every randomness request issued by the lottery
// Blocks the oracle waits before answering
pub const REQUEST_CONFIRMATIONS: u16 = 3;
// Only the first word is consumed by the settlement
pub const NUM_WORDS: u32 = 1;

// Coordinator limits
pub const MAX_NUM_WORDS: u32 = 500;
pub const MAX_REQUEST_CONFIRMATIONS: u16 = 200;
pub const MAX_CONSUMERS: usize = 100;

// Mock coordinator pricing
// 0.25 LINK flat premium per fulfillment
pub const DEFAULT_BASE_FEE: u64 = COIN_VALUE / 4;
// LINK atomic units charged per unit of callback gas
pub const DEFAULT_GAS_PRICE_LINK: u64 = 1;
// 5 LINK funded into a freshly created local subscription
pub const DEFAULT_SUBSCRIPTION_FUND_AMOUNT: u64 = 5 * COIN_VALUE;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coin_value() {
        assert_eq!(COIN_VALUE, 1_000_000_000);
        assert_eq!(DEFAULT_BASE_FEE, 250_000_000);
    }

    #[test]
    fn test_request_shape_within_limits() {
        assert!(NUM_WORDS <= MAX_NUM_WORDS);
        assert!(REQUEST_CONFIRMATIONS <= MAX_REQUEST_CONFIRMATIONS);
    }
}
