use crate::error::FilterError;
use crate::predicate::{ComparisonOperator, FilterPredicate, LogicalOperator};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use docflow_core::Document;
use serde_json::Value;
use std::cmp::Ordering;
use tracing::trace;

const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Evaluate a predicate against one document
///
/// Absent fields (or fields holding `null`) make every comparison false
/// except `!=`, which is true.
pub fn evaluate(predicate: &FilterPredicate, document: &Document) -> Result<bool, FilterError> {
    match predicate {
        FilterPredicate::Logical {
            operator,
            conditions,
        } => match operator {
            LogicalOperator::And => {
                for condition in conditions {
                    if !evaluate(condition, document)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            LogicalOperator::Or => {
                for condition in conditions {
                    if evaluate(condition, document)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            LogicalOperator::Not => match conditions.as_slice() {
                [only] => Ok(!evaluate(only, document)?),
                _ => Err(FilterError::Arity {
                    operator: operator.to_string(),
                    count: conditions.len(),
                }),
            },
        },
        FilterPredicate::Comparison {
            field,
            operator,
            value,
        } => compare(field, *operator, resolve(document, field).as_ref(), value),
    }
}

/// Keep the documents the predicate selects, preserving order
pub fn filter_documents(
    documents: impl IntoIterator<Item = Document>,
    predicate: &FilterPredicate,
) -> Result<Vec<Document>, FilterError> {
    let mut selected = Vec::new();
    for document in documents {
        if evaluate(predicate, &document)? {
            selected.push(document);
        }
    }
    trace!(selected = selected.len(), "Filtered documents");
    Ok(selected)
}

/// `meta.<path>` walks the metadata; `id`, `content` and `score` are top-level
fn resolve(document: &Document, field: &str) -> Option<Value> {
    let resolved = match field {
        "id" => Some(Value::String(document.id.clone())),
        "content" => document.content.clone().map(Value::String),
        "score" => document.score.map(Value::from),
        _ => field
            .strip_prefix("meta.")
            .and_then(|path| document.meta_value(path))
            .cloned(),
    };
    resolved.filter(|value| !value.is_null())
}

fn compare(
    field: &str,
    operator: ComparisonOperator,
    actual: Option<&Value>,
    expected: &Value,
) -> Result<bool, FilterError> {
    let type_error = |message: String| FilterError::Type {
        field: field.to_string(),
        operator: operator.to_string(),
        message,
    };

    match operator {
        ComparisonOperator::In | ComparisonOperator::NotIn => {
            let candidates = expected
                .as_array()
                .ok_or_else(|| type_error(format!("expected a list, got {}", type_name(expected))))?;
            let Some(actual) = actual else {
                return Ok(false);
            };
            let found = candidates.iter().any(|candidate| values_equal(actual, candidate));
            Ok(if operator == ComparisonOperator::In {
                found
            } else {
                !found
            })
        }
        ComparisonOperator::Eq => Ok(actual.map_or(false, |actual| values_equal(actual, expected))),
        ComparisonOperator::Ne => Ok(actual.map_or(true, |actual| !values_equal(actual, expected))),
        ComparisonOperator::Gt
        | ComparisonOperator::Ge
        | ComparisonOperator::Lt
        | ComparisonOperator::Le => {
            let Some(actual) = actual else {
                return Ok(false);
            };
            let ordering = order(actual, expected).map_err(type_error)?;
            Ok(match operator {
                ComparisonOperator::Gt => ordering == Ordering::Greater,
                ComparisonOperator::Ge => ordering != Ordering::Less,
                ComparisonOperator::Lt => ordering == Ordering::Less,
                _ => ordering != Ordering::Greater,
            })
        }
    }
}

/// Equality across JSON values; numbers compare by value, date strings chronologically
fn values_equal(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Value::String(a), Value::String(b)) => match (parse_datetime(a), parse_datetime(b)) {
            (Some(a), Some(b)) => a == b,
            _ => a == b,
        },
        _ => actual == expected,
    }
}

fn order(actual: &Value, expected: &Value) -> Result<Ordering, String> {
    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => a
            .as_f64()
            .zip(b.as_f64())
            .and_then(|(a, b)| a.partial_cmp(&b))
            .ok_or_else(|| "numbers are not comparable".to_string()),
        (Value::String(a), Value::String(b)) => match (parse_datetime(a), parse_datetime(b)) {
            (Some(a), Some(b)) => Ok(a.cmp(&b)),
            (None, None) => Ok(a.cmp(b)),
            _ => Err(format!("cannot order date and non-date strings ('{}', '{}')", a, b)),
        },
        _ => Err(format!(
            "cannot order {} against {}",
            type_name(actual),
            type_name(expected)
        )),
    }
}

/// ISO-8601 dates and datetimes; offsets are normalized to UTC
fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.naive_utc());
    }
    for format in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(parsed);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    }
}
