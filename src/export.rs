//! Export of the following list to JSON files.
//!
//! Two files are written per export: the raw records as returned by the API,
//! and a subscription list that NewPipe can import.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::RelationRecord;

const NEWPIPE_APP_VERSION: &str = "4.7.2";
const NEWPIPE_APP_VERSION_INT: u32 = 108500;
/// NewPipe's service id for bilibili
const NEWPIPE_SERVICE_ID: u32 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPipeExport {
    pub app_version: String,
    pub app_version_int: u32,
    pub subscriptions: Vec<NewPipeSubscription>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPipeSubscription {
    pub service_id: u32,
    pub url: String,
    pub name: String,
}

/// Paths of the files written by [`write_exports`].
#[derive(Debug, Clone)]
pub struct ExportPaths {
    pub raw: PathBuf,
    pub newpipe: PathBuf,
}

pub fn space_url(mid: u64) -> String {
    format!("https://space.bilibili.com/{}", mid)
}

/// Build the NewPipe document, skipping records without an id or name.
pub fn newpipe_export(records: &[RelationRecord]) -> NewPipeExport {
    let subscriptions = records
        .iter()
        .filter(|r| r.mid != 0 && !r.uname.is_empty())
        .map(|r| NewPipeSubscription {
            service_id: NEWPIPE_SERVICE_ID,
            url: space_url(r.mid),
            name: r.uname.clone(),
        })
        .collect();

    NewPipeExport {
        app_version: NEWPIPE_APP_VERSION.to_string(),
        app_version_int: NEWPIPE_APP_VERSION_INT,
        subscriptions,
    }
}

/// Write both export files into `dir`, named after `now`.
pub fn write_exports(
    dir: impl AsRef<Path>,
    records: &[RelationRecord],
    now: DateTime<Local>,
) -> Result<ExportPaths> {
    let dir = dir.as_ref();
    let raw = dir.join(format!(
        "bilibili_following_{}_{}_raw.json",
        now.format("%Y-%m-%d-%H-%M-%S"),
        records.len()
    ));
    let newpipe = dir.join(format!(
        "newpipe_subscriptions_{}.json",
        now.format("%Y%m%d%H%M")
    ));

    let raw_json = serde_json::to_string_pretty(records)
        .map_err(std::io::Error::from)?;
    std::fs::write(&raw, raw_json)?;

    let newpipe_json = serde_json::to_string(&newpipe_export(records))
        .map_err(std::io::Error::from)?;
    std::fs::write(&newpipe, newpipe_json)?;

    Ok(ExportPaths { raw, newpipe })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn record(mid: u64, uname: &str) -> RelationRecord {
        RelationRecord::new(mid, uname)
    }

    #[test]
    fn test_newpipe_skips_incomplete_records() {
        let export = newpipe_export(&[record(1, "a"), record(0, "ghost"), record(2, "")]);
        assert_eq!(export.app_version, "4.7.2");
        assert_eq!(
            export.subscriptions,
            vec![NewPipeSubscription {
                service_id: 5,
                url: "https://space.bilibili.com/1".into(),
                name: "a".into(),
            }]
        );
    }

    #[test]
    fn test_file_names_and_contents() {
        let dir = tempfile::tempdir().unwrap();
        let now = Local.with_ymd_and_hms(2025, 9, 6, 15, 43, 7).unwrap();
        let records = vec![record(1, "a"), record(2, "b")];

        let paths = write_exports(dir.path(), &records, now).unwrap();
        assert_eq!(
            paths.raw.file_name().unwrap(),
            "bilibili_following_2025-09-06-15-43-07_2_raw.json"
        );
        assert_eq!(
            paths.newpipe.file_name().unwrap(),
            "newpipe_subscriptions_202509061543.json"
        );

        let raw: Vec<RelationRecord> =
            serde_json::from_str(&std::fs::read_to_string(&paths.raw).unwrap()).unwrap();
        assert_eq!(raw, records);
        let newpipe: NewPipeExport =
            serde_json::from_str(&std::fs::read_to_string(&paths.newpipe).unwrap()).unwrap();
        assert_eq!(newpipe.subscriptions.len(), 2);
    }
}
