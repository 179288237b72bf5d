//! Interface adapters exposing the contact service to external callers.

pub mod stdio;

pub use stdio::{handle_line, run_stdio_server, serve, ContactCommand};
