//! CLI command implementations
//!
//! - `load`: build the configured sink, stage every stdin op through one
//!   writer, close it and print the reports
//! - `demo`: the users-table and message-queue walkthrough against the
//!   in-process sinks

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::observability::{Logger, ObservationScope};
use crate::record::{KeySchema, KeyValue, Record, WriteOp};
use crate::sink::{QueueSink, RemoteSink, TableSink, DEFAULT_MAX_MESSAGE_BYTES};
use crate::writer::{
    with_writer, BatchWriter, FileReporter, FlushReport, LogReporter, ResultReporter,
    WriterConfig, WriterError,
};

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{read_ops, write_error, write_response};

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CliConfig {
    /// Writer options
    #[serde(default)]
    pub writer: WriterConfig,

    /// Sink to write to (required)
    pub sink: SinkConfig,
}

/// Which in-process sink to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    Table,
    Queue,
}

/// Sink section of the configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SinkConfig {
    pub kind: SinkKind,

    /// Table or queue name (default "batchwrite")
    #[serde(default = "default_sink_name")]
    pub name: String,

    /// Table key attributes (required for tables)
    #[serde(default)]
    pub key_fields: Vec<String>,

    /// Queue message size limit (default 256 KiB)
    #[serde(default = "default_max_message_bytes")]
    pub max_message_bytes: usize,
}

fn default_sink_name() -> String {
    "batchwrite".to_string()
}

fn default_max_message_bytes() -> usize {
    DEFAULT_MAX_MESSAGE_BYTES
}

impl CliConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;
        Self::from_json_str(&content)
    }

    /// Parse and validate configuration JSON
    pub fn from_json_str(content: &str) -> CliResult<Self> {
        let config: CliConfig = serde_json::from_str(content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> CliResult<()> {
        self.writer.validate()?;

        match self.sink.kind {
            SinkKind::Table => {
                self.table_schema()?;
            }
            SinkKind::Queue => {
                if self.sink.max_message_bytes == 0 {
                    return Err(CliError::config_error("max_message_bytes must be > 0"));
                }
            }
        }
        Ok(())
    }

    fn table_schema(&self) -> CliResult<KeySchema> {
        KeySchema::new(self.sink.key_fields.iter().cloned())
            .map_err(|e| CliError::config_error(format!("sink.key_fields: {}", e)))
    }
}

/// Run the CLI: parse args, set the log level, dispatch.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    Logger::set_min_severity(cli.log_level);
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    let outcome = match cmd {
        Command::Load {
            config,
            report_file,
        } => load(&config, report_file.as_deref()),
        Command::Demo => demo(),
    };

    match outcome {
        Ok(data) => write_response(data),
        Err(e) => {
            write_error(e.code_str(), e.message())?;
            Err(e)
        }
    }
}

/// Stage stdin ops into the configured sink and close the writer.
pub fn load(config_path: &Path, report_file: Option<&Path>) -> CliResult<Value> {
    let config = CliConfig::load(config_path)?;
    let reporter: Box<dyn ResultReporter> = match report_file {
        Some(path) => Box::new(FileReporter::open(path)?),
        None => Box::new(LogReporter::new()),
    };

    let stdin = io::stdin();
    let ops = read_ops(stdin.lock());

    match config.sink.kind {
        SinkKind::Table => {
            let mut table = TableSink::new(&config.sink.name, config.table_schema()?);
            let mut data = load_ops(&mut table, config.writer.clone(), reporter, ops)?;
            data["sink"] = json!({"kind": "table", "name": config.sink.name, "items": table.item_count()});
            Ok(data)
        }
        SinkKind::Queue => {
            let mut queue = QueueSink::new(&config.sink.name)
                .with_max_message_bytes(config.sink.max_message_bytes);
            let mut data = load_ops(&mut queue, config.writer.clone(), reporter, ops)?;
            data["sink"] = json!({"kind": "queue", "name": config.sink.name, "messages": queue.len()});
            Ok(data)
        }
    }
}

/// Stage `ops` through one writer over `sink` and close it.
///
/// With auto-flush disabled, a full buffer is flushed explicitly and the
/// op retried. Returns the explicit flush reports, the close report and
/// the writer metrics.
pub fn load_ops<S, I>(
    sink: S,
    config: WriterConfig,
    reporter: Box<dyn ResultReporter>,
    ops: I,
) -> CliResult<Value>
where
    S: RemoteSink,
    I: IntoIterator<Item = CliResult<WriteOp>>,
{
    let mut writer = BatchWriter::open_with_reporter(sink, config, reporter)?;
    let scope = ObservationScope::new("LOAD");
    let mut flushes: Vec<FlushReport> = Vec::new();

    for op in ops {
        let op = op?;
        match writer.submit(op.clone()) {
            Err(WriterError::CapacityExceeded { .. }) => {
                flushes.push(writer.flush()?);
                writer.submit(op)?;
            }
            other => other?,
        }
    }

    let close = writer.close()?;
    let metrics = writer.metrics();
    scope.complete_with_fields(&[("ops", &metrics.ops_staged.to_string())]);

    Ok(json!({
        "writer_id": writer.id(),
        "flushes": flushes,
        "close": close,
        "metrics": metrics,
    }))
}

/// The walkthrough: four users, fifty anonymous users, a keyed overwrite
/// batch, a query, then the same users as queue messages.
pub fn demo() -> CliResult<Value> {
    let schema = KeySchema::new(["username", "last_name"])
        .map_err(|e| CliError::config_error(e.to_string()))?;
    let mut table = TableSink::new("users", schema);

    let (_, named) = with_writer(&mut table, WriterConfig::default(), |writer| {
        for user in named_users()? {
            writer.put(user)?;
        }
        Ok::<_, WriterError>(())
    })
    .map_err(scope_error)?;

    let (_, anonymous) = with_writer(&mut table, WriterConfig::default(), |writer| {
        for i in 0..50 {
            writer.put(record(json!({
                "account_type": "anonymous",
                "username": format!("user_{}", i),
                "first_name": "???",
                "last_name": "???",
            }))?)?;
        }
        Ok::<_, WriterError>(())
    })
    .map_err(scope_error)?;

    let overwrite_config = WriterConfig::default().dedup_by(["username", "last_name"]);
    let (_, overwrite) = with_writer(&mut table, overwrite_config, |writer| {
        for (first, last) in [("harry", "potter"), ("harmonie", "granger"), ("RONALD", "WEASLEY!!!")] {
            writer.put(record(json!({"username": first, "last_name": last}))?)?;
        }
        Ok::<_, WriterError>(())
    })
    .map_err(scope_error)?;

    let johndoe: Vec<Value> = table
        .query("username", &KeyValue::from("johndoe"))
        .into_iter()
        .map(|r| r.clone().into_json())
        .collect();

    let mut queue = QueueSink::new("test");
    let (_, sent) = with_writer(&mut queue, WriterConfig::default(), |writer| {
        for user in named_users()? {
            writer.put(user)?;
        }
        Ok::<_, WriterError>(())
    })
    .map_err(scope_error)?;

    Ok(json!({
        "table": {
            "items": table.item_count(),
            "sink_calls": table.calls(),
            "batches": [summary(&named), summary(&anonymous), summary(&overwrite)],
            "query_johndoe": johndoe,
        },
        "queue": {
            "messages": queue.len(),
            "sink_calls": queue.calls(),
            "batch": summary(&sent),
        },
    }))
}

fn summary(report: &FlushReport) -> Value {
    json!({
        "sink_calls": report.sink_calls,
        "succeeded": report.succeeded(),
        "failed": report.failed(),
    })
}

fn record(value: Value) -> Result<Record, WriterError> {
    Ok(Record::from_json(value)?)
}

fn scope_error(e: crate::writer::ScopeError<WriterError>) -> CliError {
    use crate::writer::ScopeError;
    match e {
        ScopeError::Open(e) | ScopeError::Body(e) | ScopeError::Close(e) => e.into(),
        ScopeError::Both { close, .. } => close.into(),
    }
}

fn named_users() -> Result<Vec<Record>, WriterError> {
    let users = [
        ("standard_user", "johndoe", "John", "Doe", 25, "1 Jefferson Street", "Los Angeles", "CA", 90001),
        ("super_user", "janedoering", "Jane", "Doering", 40, "2 Washington Avenue", "Seattle", "WA", 98109),
        ("standard_user", "bobsmith", "Bob", "Smith", 18, "3 Madison Lane", "Louisville", "KY", 40213),
        ("super_user", "alicedoe", "Alice", "Doe", 27, "1 Jefferson Street", "Los Angeles", "CA", 90001),
    ];
    users
        .into_iter()
        .map(|(account_type, username, first, last, age, road, city, state, zipcode)| {
            record(json!({
                "account_type": account_type,
                "username": username,
                "first_name": first,
                "last_name": last,
                "age": age,
                "address": {"road": road, "city": city, "state": state, "zipcode": zipcode},
            }))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::MemoryReporter;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn ops(lines: &[&str]) -> Vec<CliResult<WriteOp>> {
        lines
            .iter()
            .enumerate()
            .map(|(i, line)| super::super::io::parse_op(i + 1, line))
            .collect()
    }

    #[test]
    fn test_config_load() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"writer": {{"capacity": 4}}, "sink": {{"kind": "table", "key_fields": ["username"]}}}}"#
        )
        .unwrap();

        let config = CliConfig::load(file.path()).unwrap();
        assert_eq!(config.writer.capacity, 4);
        assert_eq!(config.sink.kind, SinkKind::Table);
        assert_eq!(config.sink.name, "batchwrite");
    }

    #[test]
    fn test_table_requires_key_fields() {
        let err = CliConfig::from_json_str(r#"{"sink": {"kind": "table"}}"#).unwrap_err();
        assert_eq!(err.code_str(), "BATCH_CLI_CONFIG_ERROR");
        assert!(CliConfig::from_json_str(r#"{"sink": {"kind": "queue"}}"#).is_ok());
    }

    #[test]
    fn test_load_ops_retries_after_capacity_flush() {
        let mut table = TableSink::new("users", KeySchema::new(["username"]).unwrap());
        let config = WriterConfig::with_capacity(2).auto_flush(false);
        let input = ops(&[
            r#"{"op":"put","item":{"username":"a"}}"#,
            r#"{"op":"put","item":{"username":"b"}}"#,
            r#"{"op":"put","item":{"username":"c"}}"#,
            r#"{"op":"delete","key":{"username":"a"}}"#,
        ]);

        let data = load_ops(&mut table, config, Box::new(MemoryReporter::new()), input).unwrap();
        assert_eq!(data["flushes"].as_array().unwrap().len(), 1);
        assert_eq!(data["close"]["results"].as_array().unwrap().len(), 2);
        assert_eq!(table.item_count(), 2);
    }

    #[test]
    fn test_demo_loads_table_and_queue() {
        let data = demo().unwrap();
        assert_eq!(data["table"]["items"], 57);
        assert_eq!(data["table"]["query_johndoe"].as_array().unwrap().len(), 1);
        assert_eq!(data["table"]["batches"][1]["sink_calls"], 1);
        assert_eq!(data["queue"]["messages"], 4);
    }
}
