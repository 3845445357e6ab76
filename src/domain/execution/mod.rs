//! Instruction composition, transaction assembly and the execution lifecycle

pub mod accounts;
pub mod composer;
pub mod lifecycle;
pub mod ops;
pub mod submitter;
pub mod transaction_builder;

pub use accounts::*;
pub use composer::*;
pub use lifecycle::*;
pub use ops::*;
pub use submitter::*;
pub use transaction_builder::*;
