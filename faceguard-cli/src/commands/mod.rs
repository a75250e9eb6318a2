//! CLI subcommand implementations.

pub mod build_index;
pub mod identify;
pub mod inspect;
pub mod sign;
pub mod verify;
