//! Request and result I/O for the CLI frontend.
//!
//! Requests are read as JSON from a file or stdin; results go to stdout and
//! errors to stderr, both as pretty-printed JSON.

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use serde::Serialize;

use crate::domain::SolverRequest;
use crate::error::{MembraneError, Result};

/// Path that selects stdin instead of a file.
pub const STDIN_PATH: &str = "-";

/// Read a request from `path`, or from stdin when `path` is `None` or `-`.
///
/// Empty input is an empty request.
pub fn read_request(path: Option<&Path>) -> Result<SolverRequest> {
    let (source, text) = match path {
        Some(p) if p != Path::new(STDIN_PATH) => {
            let text = fs::read_to_string(p).map_err(|e| MembraneError::FileReadError {
                path: p.display().to_string(),
                source: e,
            })?;
            (p.display().to_string(), text)
        }
        _ => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .map_err(|e| MembraneError::FileReadError {
                    path: "<stdin>".to_string(),
                    source: e,
                })?;
            ("<stdin>".to_string(), text)
        }
    };

    log::debug!("read {} bytes of request from {}", text.len(), source);
    parse_request(&text)
}

/// Parse request JSON; blank text is an empty request.
pub fn parse_request(text: &str) -> Result<SolverRequest> {
    if text.trim().is_empty() {
        return Ok(SolverRequest::new());
    }
    SolverRequest::from_json(text)
}

/// Write `value` as pretty JSON followed by a newline.
pub fn write_json<W: Write, T: Serialize>(mut out: W, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out).map_err(|source| MembraneError::WriteError { source })?;
    out.flush().map_err(|source| MembraneError::WriteError { source })
}
