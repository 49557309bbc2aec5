//! The conversation synchronizer.
//!
//! One turn runs, strictly in order:
//! - [`Synchronizer::append_user_message`]: record the question
//! - [`Synchronizer::consume_stream`]: open a run, fold accepted deltas
//!   into a fresh assistant message, settle it as `complete` or `error`
//! - [`Synchronizer::commit`]: publish the settled state and persist it
//!
//! [`Synchronizer::submit_user_message`] runs all three and waits;
//! [`Synchronizer::start_turn`] runs them on a task and hands back a live
//! UI handle right away.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::{watch, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::client::{RunClient, RunRequest};
use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::filter::EventFilter;
use crate::lifecycle::AssistantTurn;
use crate::persistence::PersistenceGateway;
use crate::store::SessionStore;
use crate::types::{ConversationState, Message, MessageStatus, RunInput};
use crate::ui::{descriptor_id, StreamableUi, UiContent, UiDescriptor, UiFrame};

/// Result of a finished submission.
#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    /// Row for the assistant answer.
    pub descriptor: UiDescriptor,
    /// Committed state after the turn.
    pub state: ConversationState,
    /// Run events dropped by the filter during this turn.
    pub discarded: u64,
}

/// A turn running in the background.
#[derive(Debug)]
pub struct TurnHandle {
    /// Id of the assistant row; stable for the life of the conversation.
    pub descriptor_id: String,
    /// Live view of the assistant row, updated on every accepted delta.
    pub display: watch::Receiver<UiFrame<UiContent>>,
    task: JoinHandle<Result<SubmitOutcome>>,
}

impl TurnHandle {
    /// Wait for the turn to settle and commit.
    pub async fn wait(self) -> Result<SubmitOutcome> {
        self.task
            .await
            .map_err(|e| SyncError::InvalidState(format!("turn task failed: {e}")))?
    }
}

/// Keeps one conversation's transcript in step with a remote run.
pub struct Synchronizer {
    client: Arc<dyn RunClient>,
    filter: EventFilter,
    assistant_id: String,
}

impl Synchronizer {
    pub fn new(client: Arc<dyn RunClient>, filter: EventFilter, assistant_id: impl Into<String>) -> Self {
        Self {
            client,
            filter,
            assistant_id: assistant_id.into(),
        }
    }

    pub fn from_config(client: Arc<dyn RunClient>, config: &SyncConfig) -> Self {
        Self::new(client, EventFilter::from_config(config), &config.assistant_id)
    }

    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }

    /// Create a remote thread and an empty conversation bound to it.
    ///
    /// The thread id becomes the chat id.
    pub async fn start_conversation(&self, gateway: Option<Arc<PersistenceGateway>>) -> Result<SessionStore> {
        let thread_id = self.client.create_thread().await?;
        info!(chat_id = %thread_id, "conversation started");
        let store = SessionStore::new(ConversationState::new(thread_id));
        Ok(match gateway {
            Some(gateway) => store.with_gateway(gateway),
            None => store,
        })
    }

    /// Append the user's message and publish it.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::TurnInFlight`] if an assistant message has not
    /// settled yet; nothing is appended in that case.
    pub fn append_user_message(&self, store: &SessionStore, content: impl Into<String>) -> Result<Message> {
        let message = Message::user(content);
        let appended = message.clone();
        store.modify(|state| {
            if state.in_flight().is_some() {
                return Err(SyncError::TurnInFlight {
                    chat_id: state.chat_id.clone(),
                });
            }
            state.messages.push(message);
            Ok(())
        })?;
        Ok(appended)
    }

    /// Run the backend for `question` and settle a new assistant message.
    ///
    /// Transport, run and store failures do not escape once the assistant
    /// message exists: they become its diagnostic content with status
    /// `error`, so the message is always settled and `ui` always finalized.
    /// Only a rejected start (another turn in flight) or a message removed
    /// from under the turn is returned.
    pub async fn consume_stream(
        &self,
        store: &SessionStore,
        question: &str,
        ui: Option<&StreamableUi<UiContent>>,
    ) -> Result<ConversationState> {
        self.consume(store, question, ui).await.map(|(state, _)| state)
    }

    async fn consume(
        &self,
        store: &SessionStore,
        question: &str,
        ui: Option<&StreamableUi<UiContent>>,
    ) -> Result<(ConversationState, u64)> {
        let mut turn = AssistantTurn::begin(store)?;
        let mut discarded = 0;

        let outcome = match self.drive(store, &mut turn, question, ui, &mut discarded).await {
            Ok(()) => turn.complete(store),
            Err(err) => Err(err),
        };
        let settled = match outcome {
            Ok(state) => Ok(state),
            Err(err) => {
                warn!(chat_id = store.chat_id(), error = %err, deltas = turn.deltas(), "run failed");
                turn.fail(store, &err)
            }
        };

        if let Some(ui) = ui {
            let display = match &settled {
                Ok(state) => state.message(turn.message_id()).map(UiContent::bot),
                Err(err) => Some(UiContent::Bot {
                    text: err.diagnostic(),
                    status: Some(MessageStatus::Error),
                }),
            };
            if let Some(display) = display {
                ui.done(display)?;
            }
        }
        settled.map(|state| (state, discarded))
    }

    async fn drive(
        &self,
        store: &SessionStore,
        turn: &mut AssistantTurn,
        question: &str,
        ui: Option<&StreamableUi<UiContent>>,
        discarded: &mut u64,
    ) -> Result<()> {
        let request = RunRequest::builder()
            .thread_id(store.chat_id())
            .assistant_id(self.assistant_id.as_str())
            .input(RunInput {
                question: question.to_string(),
            })
            .build();

        let events = self.client.stream_run(request).await?;
        let run = self.filter.filter_deltas(events);
        let mut deltas = run.deltas;

        let result = async {
            while let Some(delta) = deltas.next().await {
                let delta = delta?;
                if let Some(run_id) = run.stats.run_id() {
                    turn.bind_run(run_id);
                }
                let state = turn.push_delta(store, &delta)?;
                if let (Some(ui), Some(message)) = (ui, state.message(turn.message_id())) {
                    ui.update(UiContent::bot(message))?;
                }
            }
            if let Some(run_id) = run.stats.run_id() {
                turn.bind_run(run_id);
            }
            Ok::<(), SyncError>(())
        }
        .await;

        *discarded = run.stats.discarded();
        debug!(
            chat_id = store.chat_id(),
            run_id = run.stats.run_id().unwrap_or("<none>"),
            deltas = turn.deltas(),
            discarded = *discarded,
            "run stream finished"
        );
        result
    }

    /// Publish the settled state and hand it to persistence.
    pub async fn commit(&self, store: &SessionStore, settled: ConversationState) -> Result<()> {
        store.commit(settled).await
    }

    /// Run a whole turn and wait for it to settle.
    pub async fn submit_user_message(
        &self,
        store: &SessionStore,
        content: impl Into<String>,
    ) -> Result<SubmitOutcome> {
        let guard = store.try_lock_turn()?;
        self.run_turn(store, content.into(), None, guard).await
    }

    /// Run a whole turn on a task.
    ///
    /// The returned handle's `display` starts as an empty pending bot row
    /// and follows the answer as it streams.
    pub fn start_turn(self: &Arc<Self>, store: &SessionStore, content: impl Into<String>) -> Result<TurnHandle> {
        let guard = store.try_lock_turn()?;
        let descriptor_id = descriptor_id(store.chat_id(), store.get().len() + 1);

        let ui = StreamableUi::new(UiContent::Bot {
            text: String::new(),
            status: Some(MessageStatus::Pending),
        });
        let display = ui.subscribe();

        let this = Arc::clone(self);
        let store = store.clone();
        let content = content.into();
        let task = tokio::spawn(async move { this.run_turn(&store, content, Some(ui), guard).await });

        Ok(TurnHandle {
            descriptor_id,
            display,
            task,
        })
    }

    async fn run_turn(
        &self,
        store: &SessionStore,
        content: String,
        ui: Option<StreamableUi<UiContent>>,
        _guard: OwnedMutexGuard<()>,
    ) -> Result<SubmitOutcome> {
        self.append_user_message(store, content.as_str())?;
        let position = store.get().len();

        let (settled, discarded) = self.consume(store, &content, ui.as_ref()).await?;
        self.commit(store, settled.clone()).await?;

        let display = settled
            .messages
            .get(position)
            .map(UiContent::bot)
            .ok_or_else(|| SyncError::InvalidState("assistant message missing after turn".into()))?;

        Ok(SubmitOutcome {
            descriptor: UiDescriptor {
                id: descriptor_id(&settled.chat_id, position),
                display,
            },
            state: settled,
            discarded,
        })
    }
}
