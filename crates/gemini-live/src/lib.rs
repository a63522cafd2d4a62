mod client;
pub mod types;

pub use client::{GeminiLiveClient, LiveReceiver, LiveSender, connect};
