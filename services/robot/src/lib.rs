//! Riddler Robot Service Library Crate
//!
//! Connects the gesture coordinator to a real robot over WAMP and runs the
//! word-guessing game on top of it. The `robot` binary is a thin wrapper
//! around this library.

pub mod config;
pub mod game;
pub mod robot;
pub mod stt;
pub mod wamp;
