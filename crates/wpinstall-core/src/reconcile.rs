//! Idempotent option reconciliation: an option is written only when its
//! stored value differs from the desired one, so re-running against a
//! configured site issues no updates.
//!
//! Structured options are read as JSON and match when every desired key is
//! present with an equal value (extra stored keys are ignored, scalars compare
//! by their text so `0` matches `"0"`). Flat options are read raw and compared
//! as exact strings.

use serde_json::{Map, Value};

use crate::error::Result;
use crate::wp_cli::{OptionFormat, WpCli};

#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Structured(Map<String, Value>),
    Flat(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptionSpec {
    pub name: String,
    pub value: OptionValue,
}

impl OptionSpec {
    /// A structured option; `value` should be a JSON object; anything else is
    /// stored under an empty map.
    pub fn structured(name: &str, value: Value) -> Self {
        let map = match value {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            name: name.to_string(),
            value: OptionValue::Structured(map),
        }
    }

    pub fn flat(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: OptionValue::Flat(value.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub updated: Vec<String>,
    pub unchanged: Vec<String>,
}

/// Bring every option in `desired` to its desired value, in order.
pub fn reconcile(wp: &WpCli<'_>, desired: &[OptionSpec]) -> Result<ReconcileReport> {
    let mut report = ReconcileReport::default();
    for spec in desired {
        let changed = match &spec.value {
            OptionValue::Structured(want) => {
                let current = wp.get_option(&spec.name, OptionFormat::Json);
                if needs_update(want, current.as_ref()) {
                    wp.update_option(&spec.name, &Value::Object(want.clone()))?;
                    true
                } else {
                    false
                }
            }
            OptionValue::Flat(want) => {
                let current = wp.get_option(&spec.name, OptionFormat::Raw);
                if current.as_ref().and_then(Value::as_str) != Some(want.as_str()) {
                    wp.update_raw_option(&spec.name, want)?;
                    true
                } else {
                    false
                }
            }
        };
        tracing::debug!(option = %spec.name, changed, "reconciled option");
        if changed {
            report.updated.push(spec.name.clone());
        } else {
            report.unchanged.push(spec.name.clone());
        }
    }
    Ok(report)
}

/// True when `current` is missing, not an object, or lacks/differs on any
/// desired key.
pub fn needs_update(desired: &Map<String, Value>, current: Option<&Value>) -> bool {
    let Some(Value::Object(current)) = current else {
        return true;
    };
    desired.iter().any(|(key, want)| match current.get(key) {
        Some(have) => !loosely_equal(want, have),
        None => true,
    })
}

fn loosely_equal(a: &Value, b: &Value) -> bool {
    match (scalar_text(a), scalar_text(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn scalar_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(true) => Some("1".to_string()),
        Value::Bool(false) | Value::Null => Some(String::new()),
        Value::Array(_) | Value::Object(_) => None,
    }
}
