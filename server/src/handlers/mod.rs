//! Request handlers for collab operations.

mod fetch;
mod update;

pub use fetch::*;
pub use update::*;
