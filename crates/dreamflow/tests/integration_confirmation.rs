//! Tests of the confirmation gate: staging, approval, rejection, and the
//! N-operations-N-outcomes batch property.

mod common;

use std::sync::Arc;

use serde_json::{json, Value};

use common::{turn, ScriptedModel};
use dreamflow::checkpoint::MemoryCheckpointer;
use dreamflow::dream::ops::OperationRegistry;
use dreamflow::records::DreamRecords;
use dreamflow::{
    build_dream_workflow, DreamState, Executor, MemoryRecords, Role, RunOutcome,
};

fn executor_with(
    model: ScriptedModel,
    records: Arc<MemoryRecords>,
) -> Executor<DreamState> {
    let registry = OperationRegistry::standard(records.clone());
    let graph = build_dream_workflow(Arc::new(model), records, registry).unwrap();
    Executor::new(Arc::new(graph), Arc::new(MemoryCheckpointer::new()))
}

fn command_route() -> Value {
    json!({"route": "command", "reply": null})
}

#[tokio::test]
async fn rejection_cancels_operations_and_reinterprets() {
    let model = ScriptedModel::new()
        .push_json(command_route())
        .push_json(json!({
            "reply": null,
            "operations": [{"operation": "archive_dream", "arguments": {"id": "42"}}]
        }))
        // Intent re-runs after the rejection and stands down.
        .push_json(json!({"reply": "Understood, I left everything as it was.", "operations": []}));
    let executor = executor_with(model, Arc::new(MemoryRecords::new()));

    let outcome = executor
        .run("alice", turn("alice", "archive dream 42"))
        .await
        .unwrap();

    let RunOutcome::Suspended { interrupt } = outcome else {
        panic!("expected suspension for confirmation");
    };
    let question = interrupt.payload["question"].as_str().unwrap();
    assert!(question.contains("archive"));
    assert!(question.contains("42"));
    assert_eq!(interrupt.payload["options"][0], "YES");

    let outcome = executor.resume("alice", json!("NO")).await.unwrap();
    let RunOutcome::Complete { state } = outcome else {
        panic!("expected completion after rejection");
    };

    // The cancellation notice references the archived operation, the
    // correction went back through intent, and nothing is pending.
    assert!(state
        .messages
        .iter()
        .any(|m| m.role == Role::Tool && m.content.contains("cancelled") && m.content.contains("archive")));
    assert!(state.confirmations.is_empty());
    assert!(dreamflow::state::last_assistant(&state.messages)
        .unwrap()
        .content
        .contains("left everything"));

    let checkpoint = executor.checkpoint("alice").await.unwrap().unwrap();
    assert!(!checkpoint.is_suspended());
    assert_eq!(checkpoint.version, 2);
}

#[tokio::test]
async fn batch_yields_one_outcome_per_operation_including_failures() {
    let records = Arc::new(MemoryRecords::new());
    let model = ScriptedModel::new()
        .push_json(command_route())
        .push_json(json!({
            "reply": null,
            "operations": [
                {"operation": "save_dream", "arguments": {"text": "a garden under snow"}},
                {"operation": "archive_dream", "arguments": {"id": "no-such-id"}},
                {"operation": "save_dream", "arguments": {"text": "a clock with no hands"}}
            ]
        }));
    let executor = executor_with(model, records.clone());

    let before = {
        let outcome = executor
            .run("alice", turn("alice", "save these two dreams and archive the old one"))
            .await
            .unwrap();
        assert!(matches!(outcome, RunOutcome::Suspended { .. }));
        executor.checkpoint("alice").await.unwrap().unwrap().state.messages.len()
    };

    let outcome = executor.resume("alice", json!("yes")).await.unwrap();
    let RunOutcome::Complete { state } = outcome else {
        panic!("expected completion after approval");
    };

    // Exactly three outcome messages for three staged operations: two
    // successes and one caught failure, no exception escaping the gate.
    let outcomes: Vec<_> = state.messages[before..]
        .iter()
        .filter(|m| m.role == Role::Tool)
        .collect();
    assert_eq!(outcomes.len(), 3);
    assert_eq!(outcomes.iter().filter(|m| m.content.contains("Saved dream")).count(), 2);
    assert_eq!(outcomes.iter().filter(|m| m.content.contains("failed")).count(), 1);

    // Both saves actually landed.
    assert_eq!(records.snapshot().await.len(), 2);
}

#[tokio::test]
async fn pre_approved_operations_skip_the_interrupt() {
    let records = Arc::new(MemoryRecords::new());
    records
        .store(dreamflow::NewDream {
            title: "Blue door".to_string(),
            text: "a long corridor with a blue door".to_string(),
            date: None,
            tags: vec![],
            owner_id: "alice".to_string(),
        })
        .await
        .unwrap();

    let model = ScriptedModel::new()
        .push_json(command_route())
        .push_json(json!({
            "reply": null,
            "operations": [{"operation": "search_dreams", "arguments": {"query": "blue door"}}]
        }));
    let executor = executor_with(model, records);

    // search_dreams needs no confirmation, so the whole turn completes in
    // one call.
    let outcome = executor
        .run("alice", turn("alice", "look up my blue door dream"))
        .await
        .unwrap();

    let RunOutcome::Complete { state } = outcome else {
        panic!("expected completion without suspension");
    };
    assert!(state
        .messages
        .iter()
        .any(|m| m.role == Role::Tool && m.content.contains("Blue door")));
}

#[tokio::test]
async fn approval_is_case_insensitive() {
    let model = ScriptedModel::new()
        .push_json(command_route())
        .push_json(json!({
            "reply": null,
            "operations": [{"operation": "save_dream", "arguments": {"text": "an empty stage"}}]
        }));
    let records = Arc::new(MemoryRecords::new());
    let executor = executor_with(model, records.clone());

    executor.run("alice", turn("alice", "save this one")).await.unwrap();
    let outcome = executor.resume("alice", json!("Yes")).await.unwrap();

    assert!(matches!(outcome, RunOutcome::Complete { .. }));
    assert_eq!(records.snapshot().await.len(), 1);
}
