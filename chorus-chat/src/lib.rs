//! Chat platform connector for chorus.
//!
//! A deliberately small IRC-style client: connect, register, join one
//! channel, receive messages as [`event::Event`]s, and post lines back.
//! Everything richer (auth schemes, history, media) is out of scope. The
//! orchestrator only needs the boundary: events in, posts out, a ready
//! signal.

pub mod client;
pub mod event;
pub mod irc;
