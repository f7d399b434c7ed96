use crate::config::{COIN_DECIMALS, COIN_VALUE};

// Format any atomic value to a human readable coin amount
// 100_000_000 => "0.100000000"
pub fn format_coin(value: u64) -> String {
    format!(
        "{}.{:0width$}",
        value / COIN_VALUE,
        value % COIN_VALUE,
        width = COIN_DECIMALS as usize
    )
}

// Parse a human readable coin amount into atomic units
// "0.1" => 100_000_000
pub fn from_coin(value: &str) -> Option<u64> {
    let mut split = value.split('.');
    let whole: u64 = split.next()?.parse().ok()?;
    let fraction = split.next().unwrap_or("0");
    if split.next().is_some() || fraction.len() > COIN_DECIMALS as usize {
        return None;
    }

    let padded = format!("{:0<width$}", fraction, width = COIN_DECIMALS as usize);
    let fraction: u64 = padded.parse().ok()?;

    whole.checked_mul(COIN_VALUE)?.checked_add(fraction)
}
