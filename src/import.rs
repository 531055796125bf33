//! Reading account lists back from exported files.
//!
//! Two shapes are accepted, both JSON arrays of objects: the raw export
//! (`mid`, `uname`) and the simplified export (`UID`, `用户名`). The shape is
//! decided by the first entry.

use std::path::Path;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::types::RelationRecord;

const RAW_ID: &str = "mid";
const RAW_NAME: &str = "uname";
const SIMPLE_ID: &str = "UID";
const SIMPLE_NAME: &str = "用户名";

/// Read and parse an exported account list.
pub fn read_import(path: impl AsRef<Path>) -> Result<Vec<RelationRecord>> {
    let text = std::fs::read_to_string(path)?;
    parse_import(&text)
}

/// Parse an exported account list. Entries without an id (missing, null,
/// 0 or empty) are skipped.
pub fn parse_import(text: &str) -> Result<Vec<RelationRecord>> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| Error::InvalidImport(e.to_string()))?;
    let Value::Array(entries) = value else {
        return Err(Error::InvalidImport("expected a JSON array of accounts".into()));
    };
    let Some(first) = entries.first() else {
        return Ok(Vec::new());
    };

    let (id_key, name_key) = if first.get(SIMPLE_ID).is_some() {
        (SIMPLE_ID, SIMPLE_NAME)
    } else if first.get(RAW_ID).is_some() {
        (RAW_ID, RAW_NAME)
    } else {
        return Err(Error::InvalidImport(format!(
            "entries carry neither `{}` nor `{}`",
            RAW_ID, SIMPLE_ID
        )));
    };

    let mut records = Vec::with_capacity(entries.len());
    for entry in &entries {
        let Some(mid) = account_id(entry.get(id_key))? else {
            continue;
        };
        let name = entry.get(name_key).and_then(Value::as_str).unwrap_or_default();
        records.push(RelationRecord::new(mid, name));
    }
    Ok(records)
}

fn account_id(value: Option<&Value>) -> Result<Option<u64>> {
    let id = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(None),
        Some(Value::String(s)) => s.trim().parse().ok(),
        Some(_) => None,
    };
    match id {
        Some(0) => Ok(None),
        Some(id) => Ok(Some(id)),
        None => Err(Error::InvalidImport(format!(
            "invalid account id {}",
            value.unwrap_or(&Value::Null)
        ))),
    }
}
