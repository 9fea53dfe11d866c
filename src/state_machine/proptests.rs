//! Property-based tests for the turn state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::transition::*;
use super::*;
use crate::gateway::GatewayErrorKind;
use crate::session::Role;
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_turn_id() -> impl Strategy<Value = String> {
    // A small id space so replies regularly collide with the in-flight turn
    prop_oneof![
        Just("t-1".to_string()),
        Just("t-2".to_string()),
        Just("t-3".to_string()),
    ]
}

fn arb_text() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z?][a-zA-Z ?]{0,29}",
        Just(String::new()),
        "[ \t\n]{1,5}",
    ]
}

fn arb_error_kind() -> impl Strategy<Value = GatewayErrorKind> {
    prop_oneof![
        Just(GatewayErrorKind::Unavailable),
        Just(GatewayErrorKind::Timeout),
        Just(GatewayErrorKind::Failed),
    ]
}

fn arb_state() -> impl Strategy<Value = TurnState> {
    prop_oneof![
        Just(TurnState::Idle),
        arb_turn_id().prop_map(|turn_id| TurnState::AwaitingReply { turn_id }),
    ]
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        (arb_turn_id(), arb_text()).prop_map(|(turn_id, text)| Event::UserMessage { turn_id, text }),
        (arb_turn_id(), "[a-zA-Z ]{1,30}")
            .prop_map(|(turn_id, text)| Event::ReplyReceived { turn_id, text }),
        (arb_turn_id(), arb_error_kind(), "[a-z ]{1,20}").prop_map(
            |(turn_id, error_kind, message)| Event::ReplyFailed {
                turn_id,
                error_kind,
                message,
            }
        ),
    ]
}

// ============================================================================
// Transcript Model
// ============================================================================

/// Mirrors what the session does with `AppendMessage` effects
fn apply_appends(transcript: &mut Vec<Role>, effects: &[Effect]) {
    for effect in effects {
        if let Effect::AppendMessage { role, .. } = effect {
            transcript.push(*role);
        }
    }
}

/// Every assistant message directly answers the user message before it
fn assistant_messages_follow_user(transcript: &[Role]) -> bool {
    transcript.iter().enumerate().all(|(i, role)| match role {
        Role::Assistant => i > 0 && transcript[i - 1] == Role::User,
        Role::User => true,
    })
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    // Busy iff a reply is outstanding, and the transcript stays well formed
    #[test]
    fn prop_sequences_preserve_turn_invariants(events in proptest::collection::vec(arb_event(), 0..30)) {
        let mut state = TurnState::Idle;
        let mut transcript = Vec::new();

        for event in events {
            if let Ok(result) = transition(&state, event) {
                apply_appends(&mut transcript, &result.effects);
                state = result.new_state;
            }

            prop_assert!(assistant_messages_follow_user(&transcript), "Bad transcript: {:?}", transcript);
            if state.is_busy() {
                prop_assert_eq!(transcript.last(), Some(&Role::User));
            }
        }
    }

    // Gateway events for any turn other than the in-flight one are rejected
    #[test]
    fn prop_foreign_replies_rejected(state in arb_state(), event in arb_event()) {
        let foreign = match (&state, &event) {
            (_, Event::UserMessage { .. }) => false,
            (TurnState::Idle, _) => true,
            (
                TurnState::AwaitingReply { turn_id },
                Event::ReplyReceived { turn_id: other, .. } | Event::ReplyFailed { turn_id: other, .. },
            ) => turn_id != other,
        };
        if foreign {
            prop_assert!(
                matches!(transition(&state, event), Err(TransitionError::InvalidTransition(_))),
                "Foreign reply accepted in {:?}",
                state
            );
        }
    }

    // A busy session rejects every user message and requests nothing
    #[test]
    fn prop_busy_rejects_messages(turn_id in arb_turn_id(), other in arb_turn_id(), text in arb_text()) {
        let state = TurnState::AwaitingReply { turn_id };
        let result = transition(&state, Event::UserMessage { turn_id: other, text });
        prop_assert!(
            matches!(
                result,
                Err(TransitionError::TurnAlreadyInFlight | TransitionError::EmptyInput)
            ),
            "Busy state should reject messages, got {:?}",
            result
        );
    }

    // Idle accepts any non-blank message with exactly one reply request
    #[test]
    fn prop_idle_accepts_messages(turn_id in arb_turn_id(), text in "[a-zA-Z?][a-zA-Z ?]{0,29}") {
        let result = transition(&TurnState::Idle, Event::UserMessage { turn_id: turn_id.clone(), text });
        prop_assert!(result.is_ok(), "Idle should accept messages: {:?}", result);
        let result = result.unwrap();
        prop_assert_eq!(result.new_state, TurnState::AwaitingReply { turn_id });
        let requests = result
            .effects
            .iter()
            .filter(|e| matches!(e, Effect::RequestReply { .. }))
            .count();
        prop_assert_eq!(requests, 1);
    }

    // Blank input is rejected from any state
    #[test]
    fn prop_blank_input_rejected(state in arb_state(), turn_id in arb_turn_id(), text in "[ \t\n]{0,5}") {
        let result = transition(&state, Event::UserMessage { turn_id, text });
        prop_assert_eq!(result.unwrap_err(), TransitionError::EmptyInput);
    }

    // Any gateway failure for the in-flight turn clears busy and appends nothing
    #[test]
    fn prop_failure_always_recovers(turn_id in arb_turn_id(), kind in arb_error_kind(), message in "[a-z ]{1,20}") {
        let state = TurnState::AwaitingReply { turn_id: turn_id.clone() };
        let result = transition(&state, Event::ReplyFailed { turn_id, error_kind: kind, message }).unwrap();
        prop_assert_eq!(result.new_state, TurnState::Idle);
        let appended = result.effects.iter().any(|e| matches!(e, Effect::AppendMessage { .. }));
        prop_assert!(!appended, "failure appended a message");
    }
}
