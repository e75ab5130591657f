//! Command implementations.

pub mod block_id;
pub mod check;
pub mod emit;
pub mod validate;
pub mod verify;
