// src/core/backend/memory/path.rs

//! Dotted field path access (`"a.b.0.c"`) on documents.

use crate::core::protocol::{Document, Value};

/// Resolves a dotted path. Numeric segments index into arrays.
pub fn get_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = doc.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Value::Document(d) => d.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Sets a dotted path, creating intermediate documents as needed.
/// Fails when an intermediate segment holds a non-container value.
pub fn set_path(doc: &mut Document, path: &str, value: Value) -> Result<(), String> {
    match path.split_once('.') {
        None => {
            doc.insert(path.to_string(), value);
            Ok(())
        }
        Some((head, rest)) => {
            let child = doc
                .entry(head.to_string())
                .or_insert_with(|| Value::Document(Document::new()));
            set_in_value(child, rest, value, path)
        }
    }
}

fn set_in_value(target: &mut Value, rest: &str, value: Value, full: &str) -> Result<(), String> {
    match target {
        Value::Document(d) => set_path(d, rest, value),
        Value::Array(items) => {
            let (head, tail) = match rest.split_once('.') {
                Some((h, t)) => (h, Some(t)),
                None => (rest, None),
            };
            let index: usize = head
                .parse()
                .map_err(|_| format!("cannot use the part ({head}) of ({full}) to traverse an array"))?;
            if index >= items.len() {
                items.resize(index + 1, Value::Null);
            }
            match tail {
                None => {
                    items[index] = value;
                    Ok(())
                }
                Some(tail) => {
                    if matches!(items[index], Value::Null) {
                        items[index] = Value::Document(Document::new());
                    }
                    set_in_value(&mut items[index], tail, value, full)
                }
            }
        }
        other => Err(format!(
            "cannot create field in element of type {} while setting ({full})",
            other.type_name()
        )),
    }
}

/// Removes a dotted path. Returns the removed value, if any.
pub fn remove_path(doc: &mut Document, path: &str) -> Option<Value> {
    match path.split_once('.') {
        None => doc.shift_remove(path),
        Some((head, rest)) => match doc.get_mut(head)? {
            Value::Document(d) => remove_path(d, rest),
            _ => None,
        },
    }
}

/// Returns a mutable reference to the value at a dotted path, if present.
pub fn get_path_mut<'a>(doc: &'a mut Document, path: &str) -> Option<&'a mut Value> {
    let mut segments = path.split('.');
    let mut current = doc.get_mut(segments.next()?)?;
    for segment in segments {
        current = match current {
            Value::Document(d) => d.get_mut(segment)?,
            Value::Array(items) => items.get_mut(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}
