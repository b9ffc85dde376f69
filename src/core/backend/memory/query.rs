// src/core/backend/memory/query.rs

//! Query execution over a collection snapshot: filter, sort, skip, limit, project.

use super::matcher::matches;
use super::path::{get_path, set_path};
use crate::core::backend::{BackendError, FindSpec, SortDirection};
use crate::core::protocol::{Document, Value};
use std::cmp::Ordering;

/// Runs `spec` against `docs` and returns the resulting documents in order.
pub fn execute_find(docs: &[Document], spec: &FindSpec) -> Result<Vec<Document>, BackendError> {
    let projection = spec.fields.as_ref().map(Projection::parse).transpose()?;

    let mut hits = Vec::new();
    for doc in docs {
        if matches(doc, &spec.criteria)? {
            hits.push(doc);
        }
    }

    if !spec.sort.is_empty() {
        hits.sort_by(|a, b| compare_by_sort(a, b, &spec.sort));
    }

    let skip = usize::try_from(spec.skip).unwrap_or(usize::MAX);
    let limit = match spec.limit {
        0 => usize::MAX,
        n => usize::try_from(n).unwrap_or(usize::MAX),
    };

    Ok(hits
        .into_iter()
        .skip(skip)
        .take(limit)
        .map(|doc| match &projection {
            Some(p) => p.apply(doc),
            None => doc.clone(),
        })
        .collect())
}

/// Counts the documents matching `criteria`.
pub fn count_matching(docs: &[Document], criteria: &Document) -> Result<usize, BackendError> {
    let mut n = 0;
    for doc in docs {
        if matches(doc, criteria)? {
            n += 1;
        }
    }
    Ok(n)
}

fn compare_by_sort(a: &Document, b: &Document, sort: &[(String, SortDirection)]) -> Ordering {
    for (path, direction) in sort {
        let left = get_path(a, path).unwrap_or(&Value::Null);
        let right = get_path(b, path).unwrap_or(&Value::Null);
        let ord = match direction {
            SortDirection::Ascending => left.canonical_cmp(right),
            SortDirection::Descending => right.canonical_cmp(left),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// A parsed field projection.
#[derive(Debug)]
struct Projection {
    include: bool,
    paths: Vec<String>,
    include_id: bool,
}

impl Projection {
    fn parse(fields: &Document) -> Result<Self, BackendError> {
        let mut include: Option<bool> = None;
        let mut id_flag: Option<bool> = None;
        let mut paths = Vec::new();
        for (path, flag) in fields {
            let on = flag.is_truthy();
            if path == "_id" {
                id_flag = Some(on);
                continue;
            }
            match include {
                Some(mode) if mode != on => {
                    return Err(BackendError::InvalidQuery(
                        "You cannot currently mix including and excluding fields.".to_string(),
                    ));
                }
                _ => include = Some(on),
            }
            paths.push(path.clone());
        }
        // A projection that only mentions `_id` either keeps `_id` alone or drops it.
        let include = include.unwrap_or(id_flag == Some(true));
        Ok(Self {
            include,
            paths,
            include_id: id_flag.unwrap_or(true),
        })
    }

    fn apply(&self, doc: &Document) -> Document {
        if self.include {
            let mut out = Document::new();
            if self.include_id {
                if let Some(id) = doc.get("_id") {
                    out.insert("_id".to_string(), id.clone());
                }
            }
            for path in &self.paths {
                if let Some(value) = get_path(doc, path) {
                    let _ = set_path(&mut out, path, value.clone());
                }
            }
            out
        } else {
            let mut out = doc.clone();
            if !self.include_id {
                out.shift_remove("_id");
            }
            for path in &self.paths {
                super::path::remove_path(&mut out, path);
            }
            out
        }
    }
}
