//! Managed journal operations and their registry.
//!
//! Operations are the side-effecting verbs the intent node may propose.
//! Each carries metadata the confirmation gate needs: a friendly name for
//! rendering and whether it must be staged behind explicit approval.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

use crate::records::{DreamRecords, NewDream, RecordFilter};

use super::prompts::render_search_hits;
use super::state::{PendingAction, Session};

/// Failure of a single operation execution.
///
/// Never escapes the confirmation gate as an engine error; it becomes that
/// operation's outcome message.
#[derive(Debug, Error)]
pub enum OperationError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("{0}")]
    Failed(String),
}

fn parse_args<T: for<'de> Deserialize<'de>>(args: &Value) -> Result<T, OperationError> {
    serde_json::from_value(args.clone()).map_err(|e| OperationError::InvalidArguments(e.to_string()))
}

/// A journal operation the model may propose on the user's behalf.
#[async_trait]
pub trait ManagedOperation: Send + Sync {
    /// Stable identifier used in structured model output.
    fn name(&self) -> &str;

    /// Human-readable name used in confirmation and cancellation text.
    fn friendly_name(&self) -> &str;

    /// Whether execution must be staged behind the confirmation gate.
    fn requires_confirmation(&self) -> bool;

    /// One-line description for the intent prompt's catalog.
    fn description(&self) -> &str;

    /// Execute against the owner in `session`, returning user-facing text.
    async fn execute(&self, args: &Value, session: &Session) -> Result<String, OperationError>;
}

/// Registry of the operations available to the intent node.
#[derive(Clone, Default)]
pub struct OperationRegistry {
    ops: Vec<Arc<dyn ManagedOperation>>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard set backed by a record store.
    pub fn standard(records: Arc<dyn DreamRecords>) -> Self {
        Self::new()
            .register(SearchDreamsOp { records: records.clone(), k: 3 })
            .register(SaveDreamOp { records: records.clone() })
            .register(ArchiveDreamOp { records })
    }

    pub fn register(mut self, op: impl ManagedOperation + 'static) -> Self {
        self.ops.push(Arc::new(op));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn ManagedOperation>> {
        self.ops.iter().find(|op| op.name() == name)
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Rendered operation list for the intent prompt.
    pub fn catalog(&self) -> String {
        self.ops
            .iter()
            .map(|op| format!("- {}: {}", op.name(), op.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Rendering of one staged action for the confirmation summary.
pub fn describe_action(registry: &OperationRegistry, action: &PendingAction) -> String {
    let friendly = registry
        .get(&action.operation)
        .map(|op| op.friendly_name().to_string())
        .unwrap_or_else(|| action.operation.clone());

    let args = serde_json::to_string_pretty(&action.arguments)
        .unwrap_or_else(|_| action.arguments.to_string());

    format!("Operation '{}' ({})\nArguments:\n{}", friendly, action.operation, args)
}

/// Search the user's journal; needs no confirmation.
pub struct SearchDreamsOp {
    pub records: Arc<dyn DreamRecords>,
    pub k: usize,
}

#[derive(Deserialize)]
struct SearchArgs {
    query: String,
}

#[async_trait]
impl ManagedOperation for SearchDreamsOp {
    fn name(&self) -> &str {
        "search_dreams"
    }

    fn friendly_name(&self) -> &str {
        "search dreams"
    }

    fn requires_confirmation(&self) -> bool {
        false
    }

    fn description(&self) -> &str {
        "look up past dreams similar to a query; arguments: {\"query\": string}"
    }

    async fn execute(&self, args: &Value, session: &Session) -> Result<String, OperationError> {
        let args: SearchArgs = parse_args(args)?;
        let filter = RecordFilter::owned_by(&session.user_id);

        let hits = self
            .records
            .search(&args.query, &filter, self.k)
            .await
            .map_err(|e| OperationError::Failed(e.to_string()))?;

        if hits.is_empty() {
            Ok("No dreams about that were found.".to_string())
        } else {
            let records: Vec<_> = hits.into_iter().map(|h| h.record).collect();
            Ok(render_search_hits(&records))
        }
    }
}

/// Store a new dream entry; confirmed before execution.
pub struct SaveDreamOp {
    pub records: Arc<dyn DreamRecords>,
}

#[derive(Deserialize)]
struct SaveArgs {
    title: Option<String>,
    text: String,
    date: Option<NaiveDate>,
    #[serde(default)]
    tags: Vec<String>,
}

#[async_trait]
impl ManagedOperation for SaveDreamOp {
    fn name(&self) -> &str {
        "save_dream"
    }

    fn friendly_name(&self) -> &str {
        "save dream"
    }

    fn requires_confirmation(&self) -> bool {
        true
    }

    fn description(&self) -> &str {
        "store a dream in the journal; arguments: {\"title\"?: string, \"text\": string, \"date\"?: YYYY-MM-DD, \"tags\"?: [string]}"
    }

    async fn execute(&self, args: &Value, session: &Session) -> Result<String, OperationError> {
        let args: SaveArgs = parse_args(args)?;
        let title = args.title.unwrap_or_else(|| derive_title(&args.text));

        let record = self
            .records
            .store(NewDream {
                title,
                text: args.text,
                date: args.date,
                tags: args.tags,
                owner_id: session.user_id.clone(),
            })
            .await
            .map_err(|e| OperationError::Failed(e.to_string()))?;

        Ok(format!("Saved dream \"{}\" ({}).", record.title, record.id))
    }
}

/// Archive a dream entry; confirmed before execution.
pub struct ArchiveDreamOp {
    pub records: Arc<dyn DreamRecords>,
}

#[derive(Deserialize)]
struct ArchiveArgs {
    id: String,
}

#[async_trait]
impl ManagedOperation for ArchiveDreamOp {
    fn name(&self) -> &str {
        "archive_dream"
    }

    fn friendly_name(&self) -> &str {
        "archive dream"
    }

    fn requires_confirmation(&self) -> bool {
        true
    }

    fn description(&self) -> &str {
        "archive a journal entry so it no longer appears in searches; arguments: {\"id\": string}"
    }

    async fn execute(&self, args: &Value, session: &Session) -> Result<String, OperationError> {
        let args: ArchiveArgs = parse_args(args)?;

        let record = self
            .records
            .archive(&args.id, &session.user_id)
            .await
            .map_err(|e| OperationError::Failed(e.to_string()))?;

        Ok(format!("Archived dream \"{}\" ({}).", record.title, record.id))
    }
}

/// Derive a title from a dream's opening words.
pub fn derive_title(text: &str) -> String {
    let words: Vec<&str> = text.split_whitespace().take(8).collect();
    let mut title = words.join(" ");
    if text.split_whitespace().count() > 8 {
        title.push_str("...");
    }
    if title.is_empty() {
        title = "Untitled dream".to_string();
    }
    title
}
