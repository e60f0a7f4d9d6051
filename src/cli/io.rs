//! JSON I/O handling for CLI
//!
//! - Input: one JSON op per stdin line, blank lines ignored
//!   - `{"op": "put", "item": {...}}`
//!   - `{"op": "delete", "key": {...}}`
//! - Output: single JSON object via stdout
//! - UTF-8 only

use std::io::{self, BufRead, Write};

use serde_json::Value;

use crate::record::{LogicalKey, Record, WriteOp};

use super::errors::{CliError, CliResult};

/// Parse one op from a JSON line. `line_no` is used in errors only.
pub fn parse_op(line_no: usize, line: &str) -> CliResult<WriteOp> {
    let value: Value = serde_json::from_str(line)
        .map_err(|e| CliError::invalid_input(line_no, format!("invalid JSON: {}", e)))?;

    let kind = value
        .get("op")
        .and_then(Value::as_str)
        .ok_or_else(|| CliError::invalid_input(line_no, "missing \"op\""))?;

    match kind {
        "put" => {
            let item = value
                .get("item")
                .cloned()
                .ok_or_else(|| CliError::invalid_input(line_no, "put without \"item\""))?;
            let record = Record::from_json(item)
                .map_err(|e| CliError::invalid_input(line_no, e.to_string()))?;
            Ok(WriteOp::put(record))
        }
        "delete" => {
            let key = value
                .get("key")
                .ok_or_else(|| CliError::invalid_input(line_no, "delete without \"key\""))?;
            let key = LogicalKey::from_json_object(key)
                .map_err(|e| CliError::invalid_input(line_no, e.to_string()))?;
            Ok(WriteOp::delete(key))
        }
        other => Err(CliError::invalid_input(
            line_no,
            format!("unknown op '{}'", other),
        )),
    }
}

/// Read ops from a line source, skipping blank lines.
pub fn read_ops<R: BufRead>(reader: R) -> impl Iterator<Item = CliResult<WriteOp>> {
    reader
        .lines()
        .enumerate()
        .filter_map(|(i, line)| match line {
            Ok(line) if line.trim().is_empty() => None,
            Ok(line) => Some(parse_op(i + 1, &line)),
            Err(e) => Some(Err(CliError::from(e))),
        })
}

/// Write a success response to stdout
pub fn write_response(data: Value) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "ok",
        "data": data
    });

    let mut stdout = io::stdout();
    serde_json::to_writer(&mut stdout, &response)?;
    writeln!(stdout)?;
    stdout.flush()?;

    Ok(())
}

/// Write an error response to stdout
pub fn write_error(code: &str, message: &str) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "error",
        "code": code,
        "message": message
    });

    let mut stdout = io::stdout();
    serde_json::to_writer(&mut stdout, &response)?;
    writeln!(stdout)?;
    stdout.flush()?;

    Ok(())
}
