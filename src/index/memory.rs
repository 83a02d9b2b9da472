//! In-memory [`SearchIndex`] used by importer, translator, and server tests.

use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use serde_json::Value;

use super::{EnsureOutcome, IndexError, SearchIndex};
use crate::course::CourseDocument;

#[derive(Default)]
pub struct MemoryIndex {
    exists: Mutex<bool>,
    docs: Mutex<BTreeMap<String, CourseDocument>>,
    writes: Mutex<usize>,
    rejected_ids: HashSet<String>,
    create_error: Option<String>,
    hits: Vec<Value>,
    search_error: Option<String>,
    searched: Mutex<Vec<Value>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes to these ids fail with a 400.
    pub fn rejecting(ids: &[&str]) -> Self {
        Self {
            rejected_ids: ids.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn failing_create(message: &str) -> Self {
        Self {
            create_error: Some(message.to_string()),
            ..Self::default()
        }
    }

    /// Every search returns `hits` as `_source` values.
    pub fn with_hits(hits: Vec<Value>) -> Self {
        Self {
            hits,
            ..Self::default()
        }
    }

    pub fn failing_search(message: &str) -> Self {
        Self {
            search_error: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn docs(&self) -> BTreeMap<String, CourseDocument> {
        self.docs.lock().unwrap().clone()
    }

    pub fn write_count(&self) -> usize {
        *self.writes.lock().unwrap()
    }

    pub fn searched(&self) -> Vec<Value> {
        self.searched.lock().unwrap().clone()
    }
}

impl SearchIndex for MemoryIndex {
    async fn ensure_index(&self) -> Result<EnsureOutcome, IndexError> {
        if let Some(message) = &self.create_error {
            return Err(IndexError::Api {
                code: 401,
                message: message.clone(),
            });
        }
        let mut exists = self.exists.lock().unwrap();
        if *exists {
            Ok(EnsureOutcome::AlreadyExists)
        } else {
            *exists = true;
            Ok(EnsureOutcome::Created)
        }
    }

    async fn put_document(&self, id: &str, doc: &CourseDocument) -> Result<(), IndexError> {
        *self.writes.lock().unwrap() += 1;
        if self.rejected_ids.contains(id) {
            return Err(IndexError::Api {
                code: 400,
                message: format!("document_parsing_exception: rejected {id}"),
            });
        }
        self.docs.lock().unwrap().insert(id.to_string(), doc.clone());
        Ok(())
    }

    async fn search(&self, body: &Value) -> Result<Vec<Value>, IndexError> {
        self.searched.lock().unwrap().push(body.clone());
        match &self.search_error {
            Some(message) => Err(IndexError::Api {
                code: 400,
                message: message.clone(),
            }),
            None => Ok(self.hits.clone()),
        }
    }
}
