//! Bounded, acyclic summaries of props for log snapshots.

use chrono::SecondsFormat;
use serde_json::Value;

use crate::telemetry::event::{number, Snapshot};

use super::{PropValue, Props, CHILDREN};

/// Summarises one prop value.
///
/// Only scalars survive as themselves. Everything else collapses to a short
/// label so a snapshot never walks into nested trees.
pub fn redact(value: &PropValue) -> Value {
    match value {
        PropValue::Null => Value::Null,
        PropValue::Bool(b) => Value::Bool(*b),
        PropValue::Number(n) => number(*n),
        PropValue::Text(text) => Value::String(text.clone()),
        PropValue::Callback(_) => Value::from("function"),
        PropValue::Element(element) => Value::from(format!("ReactElement({})", element.ty.describe())),
        PropValue::List(items) => Value::from(format!("Array({})", items.len())),
        PropValue::Date(date) => Value::from(date.to_rfc3339_opts(SecondsFormat::Millis, true)),
        PropValue::Object(_) => Value::from("Object"),
    }
}

fn summarize_children(children: &PropValue) -> Value {
    match children {
        PropValue::List(items) => Value::from(format!("children({})", items.len())),
        PropValue::Null => Value::Null,
        _ => Value::from("child"),
    }
}

pub fn sanitize_props(props: &Props) -> Snapshot {
    props
        .iter()
        .map(|(key, value)| {
            let summary = if key == CHILDREN {
                summarize_children(value)
            } else {
                redact(value)
            };
            (key.clone(), summary)
        })
        .collect()
}
