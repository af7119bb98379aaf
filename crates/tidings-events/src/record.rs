//! History records describing registry actions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::handler::HandlerId;

/// Kind of action captured by a [`Record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// A handler was registered.
    On,
    /// A handler was removed.
    Unregister,
    /// An event was emitted.
    Emit,
    /// Handler sequences were cleared.
    Clear,
}

impl Action {
    /// Get the action name as used in serialized history.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Unregister => "unregister",
            Self::Emit => "emit",
            Self::Clear => "clear",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the registry history.
///
/// Records are immutable once appended. Native and non-native emissions of
/// the same event name are distinguished by [`Record::native`] and tracked
/// independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Unique record identifier.
    pub id: Uuid,
    /// When the action happened.
    pub timestamp: DateTime<Utc>,
    /// What happened.
    pub action: Action,
    /// Event name. `None` only for a global clear.
    pub event: Option<String>,
    /// Registration involved in the action, when there is one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handler: Option<HandlerId>,
    /// Emitted arguments.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<Value>,
    /// Whether the action went through the native channel.
    #[serde(default)]
    pub native: bool,
}

impl Record {
    pub(crate) fn new(action: Action, event: Option<&str>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            action,
            event: event.map(str::to_owned),
            handler: None,
            args: Vec::new(),
            native: false,
        }
    }

    #[must_use]
    pub(crate) fn with_handler(mut self, id: HandlerId) -> Self {
        self.handler = Some(id);
        self
    }

    #[must_use]
    pub(crate) fn with_args(mut self, args: Vec<Value>) -> Self {
        self.args = args;
        self
    }

    #[must_use]
    pub(crate) fn native(mut self, native: bool) -> Self {
        self.native = native;
        self
    }

    /// Check whether this record is an emission of `event` on the given channel.
    #[must_use]
    pub fn is_emission_of(&self, event: &str, native: bool) -> bool {
        self.action == Action::Emit && self.native == native && self.event.as_deref() == Some(event)
    }
}
