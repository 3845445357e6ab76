//! Infrastructure layer - chain access

pub mod blockchain;
