//! Collab state held by the server.

mod store;

pub use store::*;
