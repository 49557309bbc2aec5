//! Projection of a transcript into renderable UI descriptors.

pub mod handle;

pub use handle::{StreamableUi, UiFrame};

use serde::Serialize;
use serde_json::Value;
use strum::{Display, EnumString};

use crate::types::{ConversationState, Message, MessageStatus, Role};

/// One renderable row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UiDescriptor {
    /// `"{chat_id}-{position}"`, where `position` indexes the full
    /// transcript (system messages included), so ids never shift when a
    /// system message is added later.
    pub id: String,
    pub display: UiContent,
}

/// What a row shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UiContent {
    User {
        text: String,
    },
    Bot {
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        status: Option<MessageStatus>,
    },
    Card {
        card: FunctionCard,
    },
    /// Nothing to render: unknown function name or unreadable payload.
    Empty,
}

impl UiContent {
    /// Bot row for a message, used while it streams and once it settles.
    pub fn bot(message: &Message) -> Self {
        Self::Bot {
            text: message.content.clone(),
            status: message.status,
        }
    }

    /// Text shown by this row, if any.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::User { text } | Self::Bot { text, .. } => Some(text.as_str()),
            _ => None,
        }
    }
}

/// Structured cards rendered for function-role messages.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "view", content = "props", rename_all = "snake_case")]
pub enum FunctionCard {
    Stocks(Value),
    StockPrice(Value),
    StockPurchase(Value),
    Events(Value),
}

/// Function names that have a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum FunctionView {
    #[strum(serialize = "listStocks")]
    ListStocks,
    #[strum(serialize = "showStockPrice")]
    ShowStockPrice,
    #[strum(serialize = "showStockPurchase")]
    ShowStockPurchase,
    #[strum(serialize = "getEvents")]
    GetEvents,
}

impl FunctionView {
    fn card(self, props: Value) -> FunctionCard {
        match self {
            Self::ListStocks => FunctionCard::Stocks(props),
            Self::ShowStockPrice => FunctionCard::StockPrice(props),
            Self::ShowStockPurchase => FunctionCard::StockPurchase(props),
            Self::GetEvents => FunctionCard::Events(props),
        }
    }
}

/// Descriptor id for the message at `position` in `chat_id`.
pub fn descriptor_id(chat_id: &str, position: usize) -> String {
    format!("{chat_id}-{position}")
}

/// Render one message, or `None` for system messages.
pub fn render(message: &Message) -> Option<UiContent> {
    let content = match message.role {
        Role::System => return None,
        Role::User => UiContent::User {
            text: message.content.clone(),
        },
        Role::Function => render_function(message),
        Role::Assistant | Role::Data | Role::Tool => UiContent::bot(message),
    };
    Some(content)
}

fn render_function(message: &Message) -> UiContent {
    let Some(view) = message
        .name
        .as_deref()
        .and_then(|name| name.parse::<FunctionView>().ok())
    else {
        return UiContent::Empty;
    };
    match serde_json::from_str::<Value>(&message.content) {
        Ok(props) => UiContent::Card {
            card: view.card(props),
        },
        Err(e) => {
            tracing::debug!(message_id = %message.id, view = %view, error = %e, "unreadable function payload");
            UiContent::Empty
        }
    }
}

/// Project a transcript into UI rows. Pure: same input, same output.
pub fn project(state: &ConversationState) -> Vec<UiDescriptor> {
    state
        .messages
        .iter()
        .enumerate()
        .filter_map(|(position, message)| {
            render(message).map(|display| UiDescriptor {
                id: descriptor_id(&state.chat_id, position),
                display,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn state(messages: Vec<Message>) -> ConversationState {
        ConversationState {
            chat_id: "c".into(),
            messages,
        }
    }

    #[test]
    fn system_messages_are_skipped_but_keep_their_position() {
        let rows = project(&state(vec![
            Message::user("Hi"),
            Message::system("[note]"),
            Message::assistant("Hello"),
        ]));
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, "c-0");
        assert_eq!(rows[1].id, "c-2");
        assert_eq!(rows[1].display.text(), Some("Hello"));
    }

    #[test]
    fn function_messages_dispatch_by_name() {
        let rows = project(&state(vec![
            Message::function("showStockPrice", &json!({ "symbol": "DOGE", "price": 0.12 })),
            Message::function("getEvents", &json!([])),
        ]));
        assert_eq!(
            rows[0].display,
            UiContent::Card {
                card: FunctionCard::StockPrice(json!({ "symbol": "DOGE", "price": 0.12 }))
            }
        );
        assert_eq!(
            rows[1].display,
            UiContent::Card {
                card: FunctionCard::Events(json!([]))
            }
        );
    }

    #[test]
    fn unknown_or_broken_functions_render_empty() {
        let mut broken = Message::function("listStocks", &json!({}));
        broken.content = "{not json".into();
        let mut nameless = Message::function("x", &json!({}));
        nameless.name = None;

        let rows = project(&state(vec![
            Message::function("launchRocket", &json!({})),
            broken,
            nameless,
        ]));
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|row| row.display == UiContent::Empty));
    }

    #[test]
    fn data_and_tool_roles_render_as_bot() {
        let mut tool = Message::assistant("tool output");
        tool.role = Role::Tool;
        let rows = project(&state(vec![tool]));
        assert!(matches!(rows[0].display, UiContent::Bot { .. }));
    }

    #[test]
    fn projection_is_idempotent() {
        let s = state(vec![
            Message::user("Hi"),
            Message::pending_assistant("s"),
            Message::function("listStocks", &json!([{ "symbol": "A" }])),
        ]);
        assert_eq!(project(&s), project(&s));
    }

    #[test]
    fn serialized_rows_are_tagged() {
        let row = UiDescriptor {
            id: "c-0".into(),
            display: UiContent::Card {
                card: FunctionCard::Stocks(json!([])),
            },
        };
        assert_eq!(
            serde_json::to_value(&row).unwrap(),
            json!({ "id": "c-0", "display": { "kind": "card", "card": { "view": "stocks", "props": [] } } })
        );
    }
}
