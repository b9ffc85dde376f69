// src/core/backend/memory/connection.rs

//! A connection to one memory backend node.

use super::commands::{self, BACKEND_VERSION};
use super::query::{count_matching, execute_find};
use super::update::{apply_update, is_modifier_update, upsert_seed};
use super::ServerNode;
use super::matcher::matches;
use crate::core::backend::{
    BackendConnection, BackendError, DUPLICATE_KEY_CODE, DocumentStream, FindSpec, UpdateOutcome,
};
use crate::core::protocol::{Document, ObjectId, Value};
use crate::core::registry::ServerAddress;
use crate::doc;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

#[derive(Debug)]
pub struct MemoryConnection {
    node: Arc<ServerNode>,
    id: u64,
    generation: u64,
    /// Status of the last write per database, as reported by `getlasterror`.
    statuses: Mutex<HashMap<String, Document>>,
}

impl MemoryConnection {
    pub(super) fn new(node: Arc<ServerNode>, id: u64) -> Self {
        Self {
            generation: node.generation(),
            node,
            id,
            statuses: Mutex::new(HashMap::new()),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Fails if the node is offline or has dropped this connection.
    fn ensure_live(&self) -> Result<(), BackendError> {
        ensure_live(&self.node, self.generation)
    }

    fn status(&self, n: u64, err: Option<&BackendError>) -> Document {
        let mut status = doc! { "n" => n, "connectionId" => self.id };
        match err {
            None => {
                status.insert("err".to_string(), Value::Null);
            }
            Some(BackendError::DuplicateKey { message }) => {
                status.insert("err".to_string(), Value::from(message.as_str()));
                status.insert("code".to_string(), Value::from(DUPLICATE_KEY_CODE));
            }
            Some(e) => {
                status.insert("err".to_string(), Value::from(e.to_string()));
            }
        }
        status.insert("ok".to_string(), Value::Int(1));
        status
    }

    fn record(&self, db: &str, status: Document) {
        self.statuses.lock().insert(db.to_string(), status);
    }

    fn record_failure(&self, db: &str, err: BackendError) -> BackendError {
        self.record(db, self.status(0, Some(&err)));
        err
    }

    fn last(&self, db: &str) -> Document {
        self.statuses
            .lock()
            .get(db)
            .cloned()
            .unwrap_or_else(|| self.status(0, None))
    }
}

fn duplicate_key(db: &str, collection: &str, id: &Value) -> BackendError {
    BackendError::DuplicateKey {
        message: format!(
            "E11000 duplicate key error collection: {db}.{collection} index: _id_ dup key: {{ _id: {} }}",
            crate::core::protocol::ext_json::encode(id)
        ),
    }
}

/// Puts `_id` first, generating an ObjectId when the document has none.
fn with_id(mut doc: Document) -> (Document, Value) {
    let id = match doc.shift_remove("_id") {
        Some(id) => id,
        None => Value::ObjectId(ObjectId::new()),
    };
    doc.shift_insert(0, "_id".to_string(), id.clone());
    (doc, id)
}

fn has_id(docs: &[Document], id: &Value) -> bool {
    docs.iter()
        .any(|d| d.get("_id").is_some_and(|existing| existing.loose_eq(id)))
}

#[async_trait]
impl BackendConnection for MemoryConnection {
    fn address(&self) -> &ServerAddress {
        self.node.address()
    }

    async fn run_command(&self, db: &str, command: Document) -> Result<Document, BackendError> {
        self.ensure_live()?;
        match command.keys().next().map(String::as_str) {
            Some("getlasterror" | "getLastError") => Ok(self.last(db)),
            _ => Ok(commands::run(&self.node, db, &command)),
        }
    }

    async fn authenticate(
        &self,
        db: &str,
        username: &str,
        password: &str,
    ) -> Result<(), BackendError> {
        self.ensure_live()?;
        let accepted = self.node.with_databases(|dbs| {
            dbs.get(db)
                .and_then(|d| d.users.get(username))
                .is_some_and(|stored| stored == password)
        });
        if accepted {
            Ok(())
        } else {
            Err(BackendError::Unauthorized("auth fails".to_string()))
        }
    }

    async fn find(
        &self,
        db: &str,
        collection: &str,
        spec: FindSpec,
    ) -> Result<Box<dyn DocumentStream>, BackendError> {
        self.ensure_live()?;
        let docs = self
            .node
            .read_collection(db, collection, |docs| execute_find(docs, &spec))?;
        Ok(Box::new(MemoryStream {
            node: self.node.clone(),
            generation: self.generation,
            pending: docs.into(),
        }))
    }

    async fn explain(
        &self,
        db: &str,
        collection: &str,
        spec: FindSpec,
    ) -> Result<Document, BackendError> {
        self.ensure_live()?;
        let (scanned, matched) = self.node.read_collection(db, collection, |docs| {
            count_matching(docs, &spec.criteria).map(|n| (docs.len(), n))
        })?;
        let returned = execute_find_len(matched, &spec);
        Ok(doc! {
            "cursor" => "BasicCursor",
            "isMultiKey" => false,
            "n" => returned,
            "nscannedObjects" => scanned,
            "nscanned" => scanned,
            "scanAndOrder" => !spec.sort.is_empty(),
            "indexOnly" => false,
            "millis" => 0,
            "indexBounds" => doc! {},
            "server" => self.node.address().to_string(),
            "version" => BACKEND_VERSION,
        })
    }

    async fn insert(
        &self,
        db: &str,
        collection: &str,
        docs: Vec<Document>,
    ) -> Result<Vec<Value>, BackendError> {
        self.ensure_live()?;
        let result = self.node.write_collection(db, collection, |stored| -> Result<Vec<Value>, BackendError> {
            let mut ids = Vec::with_capacity(docs.len());
            for doc in docs {
                let (doc, id) = with_id(doc);
                if has_id(stored, &id) {
                    return Err(duplicate_key(db, collection, &id));
                }
                stored.push(doc);
                ids.push(id);
            }
            Ok(ids)
        });
        match result {
            Ok(ids) => {
                self.record(db, self.status(0, None));
                Ok(ids)
            }
            Err(e) => Err(self.record_failure(db, e)),
        }
    }

    async fn update(
        &self,
        db: &str,
        collection: &str,
        criteria: Document,
        update: Document,
        upsert: bool,
        multi: bool,
    ) -> Result<UpdateOutcome, BackendError> {
        self.ensure_live()?;
        if multi && !is_modifier_update(&update) {
            let err = BackendError::CommandFailed {
                message: "multi update only works with $ operators".to_string(),
                code: Some(10158),
            };
            return Err(self.record_failure(db, err));
        }
        let result = self.node.write_collection(db, collection, |stored| -> Result<UpdateOutcome, BackendError> {
            let mut matched = 0u64;
            for doc in stored.iter_mut() {
                if !matches(doc, &criteria)? {
                    continue;
                }
                let mut next = doc.clone();
                apply_update(&mut next, &update)?;
                *doc = next;
                matched += 1;
                if !multi {
                    break;
                }
            }
            if matched > 0 || !upsert {
                return Ok(UpdateOutcome {
                    matched,
                    upserted: None,
                });
            }
            let mut seeded = upsert_seed(&criteria);
            apply_update(&mut seeded, &update)?;
            let (seeded, id) = with_id(seeded);
            if has_id(stored, &id) {
                return Err(duplicate_key(db, collection, &id));
            }
            stored.push(seeded);
            Ok(UpdateOutcome {
                matched: 1,
                upserted: Some(id),
            })
        });
        match result {
            Ok(outcome) => {
                let mut status = self.status(outcome.matched, None);
                status.shift_insert(
                    0,
                    "updatedExisting".to_string(),
                    Value::Bool(outcome.upserted.is_none() && outcome.matched > 0),
                );
                if let Some(id) = &outcome.upserted {
                    status.shift_insert(1, "upserted".to_string(), id.clone());
                }
                self.record(db, status);
                Ok(outcome)
            }
            Err(e) => Err(self.record_failure(db, e)),
        }
    }

    async fn remove(
        &self,
        db: &str,
        collection: &str,
        criteria: Document,
    ) -> Result<u64, BackendError> {
        self.ensure_live()?;
        let result = self.node.write_collection(db, collection, |stored| -> Result<u64, BackendError> {
            let mut keep = Vec::with_capacity(stored.len());
            for doc in stored.iter() {
                keep.push(!matches(doc, &criteria)?);
            }
            let before = stored.len();
            let mut flags = keep.into_iter();
            stored.retain(|_| flags.next().unwrap_or(true));
            Ok((before - stored.len()) as u64)
        });
        match result {
            Ok(n) => {
                self.record(db, self.status(n, None));
                Ok(n)
            }
            Err(e) => Err(self.record_failure(db, e)),
        }
    }

    async fn last_status(&self, db: &str) -> Result<Document, BackendError> {
        self.ensure_live()?;
        Ok(self.last(db))
    }
}

/// Applies skip and limit to a match count, as `find` would.
fn execute_find_len(matched: usize, spec: &FindSpec) -> usize {
    let skip = usize::try_from(spec.skip).unwrap_or(usize::MAX);
    let remaining = matched.saturating_sub(skip);
    match spec.limit {
        0 => remaining,
        n => remaining.min(usize::try_from(n).unwrap_or(usize::MAX)),
    }
}

/// Fails if `node` is offline or has dropped connections since `generation`.
fn ensure_live(node: &ServerNode, generation: u64) -> Result<(), BackendError> {
    node.ensure_online()?;
    if node.generation() == generation {
        Ok(())
    } else {
        Err(BackendError::Disconnected(node.address().to_string()))
    }
}

/// A cursor over a snapshot of query results. Every step checks that the server is
/// still reachable, so a lost server surfaces while draining.
struct MemoryStream {
    node: Arc<ServerNode>,
    generation: u64,
    pending: VecDeque<Document>,
}

#[async_trait]
impl DocumentStream for MemoryStream {
    async fn next(&mut self) -> Result<Option<Document>, BackendError> {
        ensure_live(&self.node, self.generation)?;
        Ok(self.pending.pop_front())
    }
}
