//! Tick <-> price conversion

pub mod converter;
pub mod tick_math;

pub use converter::*;
pub use tick_math::*;
