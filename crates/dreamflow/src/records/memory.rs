//! In-memory record store with lexical similarity ranking.
//!
//! Ranking is keyword-based in the BM25 spirit: terms matter more the
//! rarer they are across the stored corpus, and long records do not win on
//! raw repetition alone. Good enough to stand in for a vector index in
//! tests and small local deployments.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{DreamRecord, DreamRecords, NewDream, RecordFilter, RecordsError, ScoredRecord};

/// In-memory, non-durable record store.
#[derive(Debug, Default)]
pub struct MemoryRecords {
    records: RwLock<HashMap<String, DreamRecord>>,
}

impl MemoryRecords {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with existing records (used by the file-backed store
    /// on load, and by tests).
    pub fn with_records(records: Vec<DreamRecord>) -> Self {
        let map = records.into_iter().map(|r| (r.id.clone(), r)).collect();
        Self { records: RwLock::new(map) }
    }

    pub async fn snapshot(&self) -> Vec<DreamRecord> {
        let records = self.records.read().await;
        let mut all: Vec<DreamRecord> = records.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        all
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 1)
        .map(str::to_string)
        .collect()
}

/// Score one record against the query terms.
///
/// Per-term contribution is `tf / (tf + 1)` (saturating term frequency)
/// weighted by a document-frequency penalty, so a term present in every
/// record contributes little.
fn score_record(record: &DreamRecord, query_terms: &[String], doc_freq: &HashMap<&str, usize>, corpus: usize) -> f32 {
    if query_terms.is_empty() {
        return 0.0;
    }

    let haystack = tokenize(&format!("{} {} {}", record.title, record.text, record.tags.join(" ")));
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for token in &haystack {
        *counts.entry(token.as_str()).or_default() += 1;
    }

    let mut score = 0.0_f32;
    for term in query_terms {
        let tf = *counts.get(term.as_str()).unwrap_or(&0) as f32;
        if tf == 0.0 {
            continue;
        }
        let df = *doc_freq.get(term.as_str()).unwrap_or(&0) as f32;
        let idf = (1.0 + corpus as f32) / (1.0 + df);
        score += (tf / (tf + 1.0)) * idf.ln_1p();
    }
    score
}

#[async_trait]
impl DreamRecords for MemoryRecords {
    async fn store(&self, dream: NewDream) -> Result<DreamRecord, RecordsError> {
        let record = DreamRecord {
            id: Uuid::new_v4().to_string(),
            title: dream.title,
            text: dream.text,
            date: dream.date.unwrap_or_else(|| Utc::now().date_naive()),
            tags: dream.tags,
            owner_id: dream.owner_id,
            created_at: Utc::now(),
            archived: false,
        };

        let mut records = self.records.write().await;
        records.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn search(
        &self,
        query: &str,
        filter: &RecordFilter,
        k: usize,
    ) -> Result<Vec<ScoredRecord>, RecordsError> {
        let records = self.records.read().await;
        let query_terms = tokenize(query);

        let candidates: Vec<&DreamRecord> =
            records.values().filter(|r| filter.matches(r)).collect();

        // Document frequency over the filtered candidate set.
        let mut doc_freq: HashMap<&str, usize> = HashMap::new();
        let candidate_tokens: Vec<HashSet<String>> = candidates
            .iter()
            .map(|r| tokenize(&format!("{} {} {}", r.title, r.text, r.tags.join(" "))).into_iter().collect())
            .collect();
        for term in &query_terms {
            let df = candidate_tokens.iter().filter(|t| t.contains(term)).count();
            doc_freq.insert(term.as_str(), df);
        }

        let mut scored: Vec<ScoredRecord> = candidates
            .iter()
            .map(|r| ScoredRecord {
                record: (*r).clone(),
                score: score_record(r, &query_terms, &doc_freq, candidates.len()),
            })
            .filter(|s| s.score > 0.0)
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }

    async fn archive(&self, id: &str, owner_id: &str) -> Result<DreamRecord, RecordsError> {
        let mut records = self.records.write().await;
        match records.get_mut(id) {
            Some(record) if record.owner_id == owner_id => {
                record.archived = true;
                Ok(record.clone())
            }
            _ => Err(RecordsError::not_found(id, owner_id)),
        }
    }

    async fn delete(&self, id: &str, owner_id: &str) -> Result<(), RecordsError> {
        let mut records = self.records.write().await;
        match records.get(id) {
            Some(record) if record.owner_id == owner_id => {
                records.remove(id);
                Ok(())
            }
            _ => Err(RecordsError::not_found(id, owner_id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_dream(owner: &str, title: &str, text: &str) -> NewDream {
        NewDream {
            title: title.to_string(),
            text: text.to_string(),
            date: None,
            tags: vec![],
            owner_id: owner.to_string(),
        }
    }

    #[tokio::test]
    async fn test_store_assigns_id_and_date() {
        let store = MemoryRecords::new();
        let record = store
            .store(new_dream("alice", "Blue door", "I dreamed of a blue door"))
            .await
            .unwrap();

        assert!(!record.id.is_empty());
        assert_eq!(record.date, Utc::now().date_naive());
        assert!(!record.archived);
    }

    #[tokio::test]
    async fn test_search_ranks_matching_records_first() {
        let store = MemoryRecords::new();
        store.store(new_dream("alice", "Blue door", "A long corridor with a blue door at the end")).await.unwrap();
        store.store(new_dream("alice", "Falling", "Falling from a tall tower into water")).await.unwrap();
        store.store(new_dream("alice", "Ocean", "Swimming in a dark ocean")).await.unwrap();

        let filter = RecordFilter::owned_by("alice");
        let hits = store.search("blue door corridor", &filter, 3).await.unwrap();

        assert!(!hits.is_empty());
        assert_eq!(hits[0].record.title, "Blue door");
    }

    #[tokio::test]
    async fn test_search_scopes_by_owner() {
        let store = MemoryRecords::new();
        store.store(new_dream("alice", "Blue door", "blue door")).await.unwrap();
        store.store(new_dream("bob", "Blue door too", "blue door")).await.unwrap();

        let hits = store
            .search("blue door", &RecordFilter::owned_by("alice"), 10)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record.owner_id, "alice");
    }

    #[tokio::test]
    async fn test_search_empty_when_nothing_matches() {
        let store = MemoryRecords::new();
        store.store(new_dream("alice", "Ocean", "Swimming in a dark ocean")).await.unwrap();

        let hits = store
            .search("spaceship", &RecordFilter::owned_by("alice"), 3)
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_search_excludes_requested_ids() {
        let store = MemoryRecords::new();
        let stored = store.store(new_dream("alice", "Blue door", "blue door")).await.unwrap();

        let filter = RecordFilter::owned_by("alice").excluding(stored.id.clone());
        let hits = store.search("blue door", &filter, 3).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_archive_hides_from_search() {
        let store = MemoryRecords::new();
        let stored = store.store(new_dream("alice", "Blue door", "blue door")).await.unwrap();

        let archived = store.archive(&stored.id, "alice").await.unwrap();
        assert!(archived.archived);

        let hits = store
            .search("blue door", &RecordFilter::owned_by("alice"), 3)
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_archive_enforces_ownership() {
        let store = MemoryRecords::new();
        let stored = store.store(new_dream("alice", "Blue door", "blue door")).await.unwrap();

        let err = store.archive(&stored.id, "bob").await.unwrap_err();
        assert!(matches!(err, RecordsError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete_removes_record() {
        let store = MemoryRecords::new();
        let stored = store.store(new_dream("alice", "Blue door", "blue door")).await.unwrap();

        store.delete(&stored.id, "alice").await.unwrap();
        assert!(store.snapshot().await.is_empty());

        let err = store.delete(&stored.id, "alice").await.unwrap_err();
        assert!(matches!(err, RecordsError::NotFound { .. }));
    }
}
