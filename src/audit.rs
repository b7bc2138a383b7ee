//! Audit records and the sidecar persistence convention.
//!
//! One record describes one producing command. Every file the command created
//! gets its own sidecar at `<output>.au`, each carrying the same record.
use crate::staging::write_atomic_json;
use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Suffix appended to an output path to name its sidecar.
pub const SIDECAR_SUFFIX: &str = ".au";

/// Environment identifier recorded when commands run directly on the host.
pub const DEFAULT_IMAGE: &str = "none";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub inputs: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub outputs: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub executors: Vec<Executor>,
    #[serde(default)]
    pub tags: Tags,
    /// Reserved for inline ancestors. Never populated here; resolution goes
    /// through `resolve` instead.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub upstream: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Executor {
    #[serde(default = "default_image")]
    pub image: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub command: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tags {
    #[serde(default = "epoch")]
    pub start_time: DateTime<FixedOffset>,
    #[serde(default = "epoch")]
    pub end_time: DateTime<FixedOffset>,
    /// Wall-clock duration, stored as integer nanoseconds.
    #[serde(default, with = "duration_nanos")]
    pub duration: Duration,
    #[serde(default, rename = "duration_s")]
    pub duration_secs: u64,
}

impl Default for Tags {
    fn default() -> Self {
        Self::new(epoch(), epoch(), Duration::ZERO)
    }
}

impl Tags {
    pub fn new(
        start_time: DateTime<FixedOffset>,
        end_time: DateTime<FixedOffset>,
        duration: Duration,
    ) -> Self {
        Self {
            start_time,
            end_time,
            duration,
            duration_secs: duration.as_secs_f64().round() as u64,
        }
    }
}

impl Executor {
    pub fn host(command_line: &str) -> Self {
        Self {
            image: default_image(),
            command: command_tokens(command_line),
        }
    }

    pub fn command_line(&self) -> String {
        self.command.join(" ")
    }
}

impl AuditRecord {
    pub fn new(command_line: &str, inputs: Vec<String>, outputs: Vec<String>, tags: Tags) -> Self {
        Self {
            inputs,
            outputs,
            executors: vec![Executor::host(command_line)],
            tags,
            upstream: Vec::new(),
        }
    }

    /// Placeholder for a file no recorded command produced.
    pub fn leaf() -> Self {
        Self::new("", Vec::new(), Vec::new(), Tags::default())
    }

    /// True unless the first executor carries a real command token.
    pub fn is_leaf(&self) -> bool {
        !self
            .executors
            .first()
            .and_then(|executor| executor.command.first())
            .is_some_and(|token| !token.is_empty())
    }

    /// The first executor's tokens joined with single spaces.
    pub fn command_line(&self) -> String {
        self.executors
            .first()
            .map(Executor::command_line)
            .unwrap_or_default()
    }
}

/// Split a command line into recorded tokens. Joining them with a single
/// space reproduces the command line.
pub fn command_tokens(command_line: &str) -> Vec<String> {
    command_line.split(' ').map(str::to_string).collect()
}

pub fn sidecar_path(output: &Path) -> PathBuf {
    let mut raw = output.as_os_str().to_os_string();
    raw.push(SIDECAR_SUFFIX);
    PathBuf::from(raw)
}

/// The output path a sidecar is named after, if it carries the suffix.
pub fn output_path_for(sidecar: &Path) -> Option<PathBuf> {
    let raw = sidecar.to_str()?;
    raw.strip_suffix(SIDECAR_SUFFIX)
        .filter(|stem| !stem.is_empty())
        .map(PathBuf::from)
}

pub fn is_sidecar(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.ends_with(SIDECAR_SUFFIX))
}

/// Persist `record` beside `output`.
pub fn write_sidecar(output: &Path, record: &AuditRecord) -> Result<PathBuf> {
    let path = sidecar_path(output);
    write_atomic_json(&path, record).with_context(|| format!("write sidecar {}", path.display()))?;
    tracing::debug!(path = %path.display(), "sidecar written");
    Ok(path)
}

/// Load a sidecar. A missing sidecar yields a leaf record.
pub fn read_sidecar(path: &Path) -> Result<AuditRecord> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no sidecar; treating as leaf");
            return Ok(AuditRecord::leaf());
        }
        Err(err) => {
            return Err(err).with_context(|| format!("read sidecar {}", path.display()));
        }
    };
    serde_json::from_slice(&bytes).with_context(|| format!("parse sidecar {}", path.display()))
}

fn default_image() -> String {
    DEFAULT_IMAGE.to_string()
}

fn epoch() -> DateTime<FixedOffset> {
    DateTime::<chrono::Utc>::default().fixed_offset()
}

impl Default for AuditRecord {
    fn default() -> Self {
        Self::leaf()
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

mod duration_nanos {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let nanos = u64::try_from(value.as_nanos()).unwrap_or(u64::MAX);
        serializer.serialize_u64(nanos)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_nanos(u64::deserialize(deserializer)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn sample_tags() -> Tags {
        let offset = FixedOffset::east_opt(3600).expect("offset");
        let start = offset
            .with_ymd_and_hms(2024, 3, 1, 12, 0, 0)
            .single()
            .expect("start")
            + chrono::Duration::nanoseconds(123_456_789);
        let duration = Duration::from_millis(2_600);
        let end = start + chrono::Duration::from_std(duration).expect("duration");
        Tags::new(start, end, duration)
    }

    #[test]
    fn sidecar_round_trip_keeps_subsecond_timestamps() {
        let dir = TempDir::new().expect("temp dir");
        let output = dir.path().join("rev.txt");
        let record = AuditRecord::new(
            "rev seq.txt > rev.txt",
            vec!["seq.txt".to_string()],
            vec!["rev.txt".to_string()],
            sample_tags(),
        );

        let path = write_sidecar(&output, &record).expect("write");
        assert_eq!(path, dir.path().join("rev.txt.au"));

        let loaded = read_sidecar(&path).expect("read");
        assert_eq!(loaded, record);
        assert_eq!(loaded.tags.start_time.timestamp_subsec_nanos(), 123_456_789);
        assert_eq!(loaded.tags.duration_secs, 3);
    }

    #[test]
    fn sidecar_json_uses_wire_field_names() {
        let record = AuditRecord::new(
            "echo hello > hello.txt",
            Vec::new(),
            vec!["hello.txt".to_string()],
            sample_tags(),
        );
        let value = serde_json::to_value(&record).expect("serialize");

        assert_eq!(value["executors"][0]["image"], "none");
        assert_eq!(
            value["executors"][0]["command"],
            serde_json::json!(["echo", "hello", ">", "hello.txt"])
        );
        assert_eq!(value["tags"]["duration"], 2_600_000_000u64);
        assert_eq!(value["tags"]["duration_s"], 3);
        assert_eq!(value["upstream"], serde_json::json!([]));
        assert!(value["tags"]["start_time"]
            .as_str()
            .expect("start_time string")
            .ends_with("+01:00"));
    }

    #[test]
    fn missing_sidecar_reads_as_leaf() {
        let dir = TempDir::new().expect("temp dir");
        let record = read_sidecar(&dir.path().join("user-input.txt.au")).expect("read");

        assert!(record.is_leaf());
        assert!(record.inputs.is_empty());
        assert!(record.outputs.is_empty());
        assert_eq!(record.executors[0].command, vec![String::new()]);
        assert_eq!(record.tags.duration, Duration::ZERO);
    }

    #[test]
    fn malformed_sidecar_is_an_error_naming_the_path() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("broken.txt.au");
        fs::write(&path, "{ not json").expect("write");

        let err = read_sidecar(&path).expect_err("parse should fail");
        assert!(format!("{err:#}").contains("broken.txt.au"));
    }

    #[test]
    fn null_lists_from_older_tools_read_as_empty() {
        let text = r#"{
            "inputs": null,
            "outputs": null,
            "executors": [{"image": "None", "command": [""]}],
            "tags": {
                "start_time": "0001-01-01T00:00:00Z",
                "end_time": "0001-01-01T00:00:00Z",
                "duration": 0,
                "duration_s": 0
            },
            "upstream": []
        }"#;
        let record: AuditRecord = serde_json::from_str(text).expect("parse");

        assert!(record.inputs.is_empty());
        assert!(record.outputs.is_empty());
        assert!(record.is_leaf());
    }

    #[test]
    fn sidecar_naming_helpers_agree() {
        let output = Path::new("out/rev.txt");
        let sidecar = sidecar_path(output);

        assert_eq!(sidecar, PathBuf::from("out/rev.txt.au"));
        assert!(is_sidecar(&sidecar));
        assert!(!is_sidecar(output));
        assert_eq!(output_path_for(&sidecar), Some(output.to_path_buf()));
        assert_eq!(output_path_for(Path::new("rev.txt")), None);
    }

    #[test]
    fn record_without_executors_counts_as_leaf() {
        let mut record = AuditRecord::new("cat a > b", vec![], vec![], Tags::default());
        assert!(!record.is_leaf());
        record.executors.clear();
        assert!(record.is_leaf());
        assert_eq!(record.command_line(), "");
    }
}
