//! Task definition and its flat stored representation.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

use crate::constants::{fields, NO_OPTIONS};
use crate::error::{RbError, Result};
use crate::ids::{is_record_id, TaskId};

/// A unit of work with its options resolved inline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Logical name of the executable unit.
    pub module: String,
    /// Expected execution bound. Advisory only; nothing here enforces it.
    pub timeout: u64,
    /// Flat parameters, in the store's text representation.
    pub options: BTreeMap<String, String>,
}

/// A task moved into the in-progress queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claimed {
    pub id: TaskId,
    pub task: Task,
}

/// Where an enqueued task was placed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enqueued {
    pub queue: String,
    pub task_id: TaskId,
}

/// What a task record's `options` field points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum OptionsRef {
    Empty,
    Record(String),
}

impl OptionsRef {
    fn as_field(&self) -> &str {
        match self {
            OptionsRef::Empty => NO_OPTIONS,
            OptionsRef::Record(id) => id,
        }
    }
}

/// Reject module names that look like a resolved filesystem path.
pub(crate) fn validate_module(module: &str) -> Result<()> {
    if module.contains(['/', '\\']) {
        return Err(RbError::InvalidModuleName(module.to_string()));
    }
    Ok(())
}

/// Serialize `options` and flatten it into text fields.
///
/// Strings are kept verbatim, numbers use their JSON text and booleans
/// become `"true"`/`"false"`. Nulls, arrays and objects are rejected.
pub(crate) fn flatten_options<T: Serialize + ?Sized>(options: &T) -> Result<Vec<(String, String)>> {
    let map = match serde_json::to_value(options)? {
        Value::Object(map) => map,
        other => return Err(RbError::OptionsNotObject(other.to_string())),
    };

    map.into_iter()
        .map(|(key, value)| {
            let text = match value {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Null | Value::Array(_) | Value::Object(_) => {
                    return Err(RbError::NonFlatOptions(key))
                }
            };
            Ok((key, text))
        })
        .collect()
}

/// Fields written under a task id.
pub(crate) fn record_fields(module: &str, timeout: u64, options: &OptionsRef) -> Vec<(String, String)> {
    vec![
        (fields::MODULE.to_string(), module.to_string()),
        (fields::TIMEOUT.to_string(), timeout.to_string()),
        (fields::OPTIONS.to_string(), options.as_field().to_string()),
    ]
}

/// A task record read back from the store, options still unresolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TaskRecord {
    pub module: String,
    pub timeout: u64,
    pub options: OptionsRef,
}

impl TaskRecord {
    /// Decode the flat mapping stored under `id`.
    pub fn parse(id: &str, mut record: HashMap<String, String>) -> Result<Self> {
        let corrupt = |reason: String| RbError::CorruptRecord {
            id: id.to_string(),
            reason,
        };

        let options = match record.remove(fields::OPTIONS) {
            None => return Err(corrupt("missing options field".to_string())),
            Some(value) if value == NO_OPTIONS => OptionsRef::Empty,
            Some(value) if is_record_id(&value) => OptionsRef::Record(value),
            Some(value) => {
                return Err(RbError::InvalidOptionsReference {
                    task_id: id.to_string(),
                    reference: value,
                })
            }
        };

        let module = record
            .remove(fields::MODULE)
            .ok_or_else(|| corrupt("missing module field".to_string()))?;

        let timeout = record
            .remove(fields::TIMEOUT)
            .ok_or_else(|| corrupt("missing timeout field".to_string()))?;
        let timeout = timeout
            .parse()
            .map_err(|_| corrupt(format!("timeout is not an integer: {}", timeout)))?;

        Ok(Self {
            module,
            timeout,
            options,
        })
    }

    /// Attach resolved options.
    pub fn into_task(self, options: BTreeMap<String, String>) -> Task {
        Task {
            module: self.module,
            timeout: self.timeout,
            options,
        }
    }
}
