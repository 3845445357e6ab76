//! clmm-lp - concentrated-liquidity position engine for Orca Whirlpools
//! Built with Domain-Driven Design principles

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod shared;

// Re-export main types for convenience
pub use application::PositionService;
pub use domain::context::EngineContext;
pub use domain::execution::{TransactionComposer, TransactionLifecycle};
pub use shared::errors::{ComposeResult, PositionError};
