//! Route handlers for the HTTP API.

pub mod play;
pub mod reload;
pub mod sounds;
pub mod status;
pub mod trigger;
