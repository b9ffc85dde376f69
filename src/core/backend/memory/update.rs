// src/core/backend/memory/update.rs

//! Applies update documents: either a set of modifiers (`$set`, `$inc`, ..) or a
//! whole-document replacement.

use super::path::{get_path, get_path_mut, remove_path, set_path};
use crate::core::backend::BackendError;
use crate::core::protocol::{Document, Value};

fn failed(message: impl Into<String>) -> BackendError {
    BackendError::CommandFailed {
        message: message.into(),
        code: None,
    }
}

/// Returns true when the update is made of modifiers rather than a replacement.
pub fn is_modifier_update(update: &Document) -> bool {
    update.keys().next().is_some_and(|k| k.starts_with('$'))
}

/// Applies `update` to `doc` in place.
pub fn apply_update(doc: &mut Document, update: &Document) -> Result<(), BackendError> {
    if !is_modifier_update(update) {
        return replace(doc, update);
    }
    for (modifier, fields) in update {
        let Value::Document(fields) = fields else {
            return Err(failed(format!("Modifier {modifier} allowed for objects only")));
        };
        for (path, operand) in fields {
            if path == "_id" || path.starts_with("_id.") {
                return Err(failed("Mod on _id not allowed"));
            }
            apply_modifier(doc, modifier, path, operand)?;
        }
    }
    Ok(())
}

fn replace(doc: &mut Document, replacement: &Document) -> Result<(), BackendError> {
    if replacement.keys().any(|k| k.starts_with('$')) {
        return Err(failed("replacement documents cannot mix in modifiers"));
    }
    let id = doc.get("_id").cloned();
    if let (Some(old), Some(new)) = (&id, replacement.get("_id")) {
        if !old.loose_eq(new) {
            return Err(failed("cannot change _id of a document"));
        }
    }
    let mut next = Document::with_capacity(replacement.len() + 1);
    if let Some(id) = id {
        next.insert("_id".to_string(), id);
    }
    for (k, v) in replacement {
        if k != "_id" || !next.contains_key("_id") {
            next.insert(k.clone(), v.clone());
        }
    }
    *doc = next;
    Ok(())
}

fn apply_modifier(
    doc: &mut Document,
    modifier: &str,
    path: &str,
    operand: &Value,
) -> Result<(), BackendError> {
    match modifier {
        "$set" => set_path(doc, path, operand.clone()).map_err(failed),
        "$unset" => {
            remove_path(doc, path);
            Ok(())
        }
        "$inc" => increment(doc, path, operand),
        "$push" => push(doc, path, operand, false),
        "$addToSet" => push(doc, path, operand, true),
        "$pull" => {
            if let Some(Value::Array(items)) = get_path_mut(doc, path) {
                items.retain(|item| !item.loose_eq(operand));
            }
            Ok(())
        }
        other => Err(failed(format!("Invalid modifier specified {other}"))),
    }
}

fn increment(doc: &mut Document, path: &str, operand: &Value) -> Result<(), BackendError> {
    if operand.as_f64().is_none() {
        return Err(failed("Modifier $inc allowed for numbers only"));
    }
    let next = match get_path(doc, path) {
        None => operand.clone(),
        Some(Value::Int(a)) => match operand {
            Value::Int(b) => Value::Int(a.wrapping_add(*b)),
            _ => Value::Double(*a as f64 + operand.as_f64().unwrap_or(0.0)),
        },
        Some(Value::Double(a)) => Value::Double(a + operand.as_f64().unwrap_or(0.0)),
        Some(_) => return Err(failed("Cannot apply $inc modifier to non-number")),
    };
    set_path(doc, path, next).map_err(failed)
}

fn push(doc: &mut Document, path: &str, operand: &Value, unique: bool) -> Result<(), BackendError> {
    let values: Vec<Value> = match operand {
        Value::Document(spec) if spec.contains_key("$each") => match &spec["$each"] {
            Value::Array(items) => items.clone(),
            _ => return Err(failed("$each requires an array")),
        },
        other => vec![other.clone()],
    };
    match get_path(doc, path) {
        None => set_path(doc, path, Value::Array(Vec::new())).map_err(failed)?,
        Some(Value::Array(_)) => {}
        Some(_) => return Err(failed("Cannot apply $push/$pushAll modifier to non-array")),
    }
    if let Some(Value::Array(items)) = get_path_mut(doc, path) {
        for value in values {
            if !unique || !items.iter().any(|item| item.loose_eq(&value)) {
                items.push(value);
            }
        }
    }
    Ok(())
}

/// Builds the base of an upserted document from the equality clauses of the criteria.
pub fn upsert_seed(criteria: &Document) -> Document {
    let mut seed = Document::new();
    for (key, value) in criteria {
        if key.starts_with('$') {
            continue;
        }
        let is_operator = matches!(value, Value::Document(d) if d.keys().next().is_some_and(|k| k.starts_with('$')));
        if is_operator || matches!(value, Value::Regex { .. }) {
            continue;
        }
        // A seed that cannot be built simply leaves the field out.
        let _ = set_path(&mut seed, key, value.clone());
    }
    seed
}
