//! Turn state types

use serde::{Deserialize, Serialize};

/// Turn state of one conversation session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnState {
    /// Ready for user input, no reply outstanding
    #[default]
    Idle,

    /// A user message was accepted and its reply is outstanding
    AwaitingReply {
        /// Identifies the in-flight turn so late or foreign replies are ignored
        turn_id: String,
    },
}

impl TurnState {
    /// The busy flag shown to the presentation layer
    pub fn is_busy(&self) -> bool {
        matches!(self, TurnState::AwaitingReply { .. })
    }

    /// Id of the turn currently in flight, if any
    pub fn turn_id(&self) -> Option<&str> {
        match self {
            TurnState::Idle => None,
            TurnState::AwaitingReply { turn_id } => Some(turn_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_is_not_busy() {
        assert!(!TurnState::Idle.is_busy());
        assert_eq!(TurnState::Idle.turn_id(), None);
    }

    #[test]
    fn test_awaiting_reply_is_busy() {
        let state = TurnState::AwaitingReply {
            turn_id: "t-1".to_string(),
        };
        assert!(state.is_busy());
        assert_eq!(state.turn_id(), Some("t-1"));
    }

    #[test]
    fn test_state_serializes_with_type_tag() {
        let json = serde_json::to_value(TurnState::AwaitingReply {
            turn_id: "t-1".to_string(),
        })
        .unwrap();
        assert_eq!(json["type"], "awaiting_reply");
        assert_eq!(json["turn_id"], "t-1");
    }
}
