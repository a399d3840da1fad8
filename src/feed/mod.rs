//! Real-time price feed client.
//!
//! Responsibilities:
//! • Maintain one WebSocket connection to the feed server.
//! • Decode `{type, data}` envelopes and dispatch them to a [`FeedHandler`].
//! • Report connection status and reconnect with exponential backoff.

pub mod client;
pub mod handler;
pub mod message;
pub mod reconnect;

pub use client::{FeedHandle, RealtimeClient};
pub use handler::{ChannelHandler, FeedHandler, FeedUpdate};
pub use message::FeedEvent;
pub use reconnect::{CloseDecision, ConnectionMachine, ConnectionState};
