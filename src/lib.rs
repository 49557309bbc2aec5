//! graphchat: conversation state synchronizer for streaming graph backends.
//!
//! Appends user turns to a canonical transcript, opens a remote run,
//! keeps only the generation node's token deltas, folds them into an
//! assistant message as they arrive, and projects the result into UI rows.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use graphchat::prelude::*;
//!
//! # async fn example() -> graphchat::error::Result<()> {
//! let config = SyncConfig::from_env();
//! let client = Arc::new(HttpRunClient::from_config(&config)?);
//! let sync = Synchronizer::from_config(client, &config);
//!
//! let store = sync.start_conversation(None).await?;
//! let outcome = sync.submit_user_message(&store, "What is LangGraph?").await?;
//! println!("{:?}", outcome.descriptor.display.text());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod filter;
pub mod lifecycle;
pub mod persistence;
pub mod prelude;
pub mod store;
pub mod sync;
pub mod types;
pub mod ui;

#[cfg(feature = "cli")]
pub mod cli;
