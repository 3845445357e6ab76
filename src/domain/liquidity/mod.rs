//! Liquidity quoting - token amounts, liquidity deltas and slippage bounds

pub mod amounts;
pub mod quote;

pub use amounts::*;
pub use quote::*;
