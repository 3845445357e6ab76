//! Domain layer - position engine logic and entities

pub mod bounds;
pub mod context;
pub mod distribution;
pub mod execution;
pub mod liquidity;
pub mod pool;
pub mod position;
pub mod price;
pub mod tick;

#[cfg(test)]
pub(crate) mod testing;
