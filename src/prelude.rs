//! Convenience re-exports for common use.

pub use crate::client::{HttpRunClient, RunClient, RunRequest};
pub use crate::config::SyncConfig;
pub use crate::error::{Result, SyncError};
pub use crate::filter::EventFilter;
pub use crate::persistence::{Authenticator, Chat, ChatRepository, PersistenceGateway};
pub use crate::store::SessionStore;
pub use crate::sync::{SubmitOutcome, Synchronizer, TurnHandle};
pub use crate::types::{ConversationState, Message, MessageStatus, Role, RunEvent};
pub use crate::ui::{project, UiContent, UiDescriptor};
