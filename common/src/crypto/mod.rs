mod address;
mod hash;

pub use address::*;
pub use hash::*;

/// 256-bit unsigned integer used for random words
pub use primitive_types::U256;
