//! Core types for graphchat.

pub mod conversation;
pub mod message;
pub mod stream;

pub use conversation::*;
pub use message::{Message, MessageStatus, Role};
pub use stream::*;
