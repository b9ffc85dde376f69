// src/core/backend/memory/matcher.rs

//! Query criteria evaluation.

use super::path::get_path;
use crate::core::backend::BackendError;
use crate::core::protocol::{Document, Value};
use regex::{Regex, RegexBuilder};
use std::cmp::Ordering;

/// Returns true when `doc` satisfies every clause of `criteria`.
pub fn matches(doc: &Document, criteria: &Document) -> Result<bool, BackendError> {
    for (key, condition) in criteria {
        let ok = match key.as_str() {
            "$and" => {
                let clauses = clause_list(key, condition)?;
                all_match(doc, &clauses)?
            }
            "$or" => {
                let clauses = clause_list(key, condition)?;
                any_match(doc, &clauses)?
            }
            "$nor" => {
                let clauses = clause_list(key, condition)?;
                !any_match(doc, &clauses)?
            }
            op if op.starts_with('$') => {
                return Err(BackendError::InvalidQuery(format!(
                    "unknown top level operator: {op}"
                )));
            }
            path => matches_field(get_path(doc, path), condition)?,
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn clause_list<'a>(op: &str, condition: &'a Value) -> Result<Vec<&'a Document>, BackendError> {
    let Value::Array(items) = condition else {
        return Err(BackendError::InvalidQuery(format!("{op} must be an array")));
    };
    items
        .iter()
        .map(|item| {
            item.as_document().ok_or_else(|| {
                BackendError::InvalidQuery(format!("{op} entries must be objects"))
            })
        })
        .collect()
}

fn all_match(doc: &Document, clauses: &[&Document]) -> Result<bool, BackendError> {
    for clause in clauses {
        if !matches(doc, clause)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn any_match(doc: &Document, clauses: &[&Document]) -> Result<bool, BackendError> {
    for clause in clauses {
        if matches(doc, clause)? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn is_operator_document(value: &Value) -> Option<&Document> {
    match value {
        Value::Document(d) if d.keys().next().is_some_and(|k| k.starts_with('$')) => Some(d),
        _ => None,
    }
}

fn matches_field(value: Option<&Value>, condition: &Value) -> Result<bool, BackendError> {
    if let Some(ops) = is_operator_document(condition) {
        return matches_operators(value, ops);
    }
    if let Value::Regex { pattern, options } = condition {
        let re = compile_regex(pattern, options)?;
        return Ok(value.is_some_and(|v| regex_matches(&re, v)));
    }
    Ok(equals(value, condition))
}

/// Equality with array fan-out: an array field matches if it equals the operand
/// or any of its elements does. A null operand also matches a missing field.
fn equals(value: Option<&Value>, operand: &Value) -> bool {
    match value {
        None => matches!(operand, Value::Null),
        Some(v) if v.loose_eq(operand) => true,
        Some(Value::Array(items)) => items.iter().any(|item| item.loose_eq(operand)),
        Some(_) => false,
    }
}

fn compare(value: Option<&Value>, operand: &Value, accept: fn(Ordering) -> bool) -> bool {
    let check = |v: &Value| v.same_bracket(operand) && accept(v.canonical_cmp(operand));
    match value {
        None => false,
        Some(Value::Array(items)) if !matches!(operand, Value::Array(_)) => {
            items.iter().any(check)
        }
        Some(v) => check(v),
    }
}

fn matches_operators(value: Option<&Value>, ops: &Document) -> Result<bool, BackendError> {
    for (op, operand) in ops {
        let ok = match op.as_str() {
            "$eq" => equals(value, operand),
            "$ne" => !equals(value, operand),
            "$gt" => compare(value, operand, Ordering::is_gt),
            "$gte" => compare(value, operand, Ordering::is_ge),
            "$lt" => compare(value, operand, Ordering::is_lt),
            "$lte" => compare(value, operand, Ordering::is_le),
            "$in" => in_list(value, op, operand)?,
            "$nin" => !in_list(value, op, operand)?,
            "$exists" => value.is_some() == operand.is_truthy(),
            "$size" => {
                let expected = operand.as_i64().ok_or_else(|| {
                    BackendError::InvalidQuery("$size needs a number".to_string())
                })?;
                matches!(value, Some(Value::Array(items)) if items.len() as i64 == expected)
            }
            "$not" => !matches_field(value, operand)?,
            "$regex" => {
                let pattern = match operand {
                    Value::String(s) => s.as_str(),
                    Value::Regex { pattern, .. } => pattern.as_str(),
                    _ => {
                        return Err(BackendError::InvalidQuery(
                            "$regex has to be a string".to_string(),
                        ));
                    }
                };
                let options = ops.get("$options").and_then(Value::as_str).unwrap_or("");
                let re = compile_regex(pattern, options)?;
                value.is_some_and(|v| regex_matches(&re, v))
            }
            "$options" => true,
            other => {
                return Err(BackendError::InvalidQuery(format!("unknown operator: {other}")));
            }
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn in_list(value: Option<&Value>, op: &str, operand: &Value) -> Result<bool, BackendError> {
    let Value::Array(candidates) = operand else {
        return Err(BackendError::InvalidQuery(format!("{op} needs an array")));
    };
    for candidate in candidates {
        let hit = match candidate {
            Value::Regex { pattern, options } => {
                let re = compile_regex(pattern, options)?;
                value.is_some_and(|v| regex_matches(&re, v))
            }
            _ => equals(value, candidate),
        };
        if hit {
            return Ok(true);
        }
    }
    Ok(false)
}

pub fn compile_regex(pattern: &str, options: &str) -> Result<Regex, BackendError> {
    RegexBuilder::new(pattern)
        .case_insensitive(options.contains('i'))
        .multi_line(options.contains('m'))
        .dot_matches_new_line(options.contains('s'))
        .ignore_whitespace(options.contains('x'))
        .build()
        .map_err(|e| BackendError::InvalidQuery(format!("invalid regular expression: {e}")))
}

fn regex_matches(re: &Regex, value: &Value) -> bool {
    match value {
        Value::String(s) => re.is_match(s),
        Value::Array(items) => items.iter().any(|item| regex_matches(re, item)),
        _ => false,
    }
}
