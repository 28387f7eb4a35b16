use crate::error::{IntakeError, Result};
use crate::io;
use crate::request::ActionRequest;
use std::path::Path;

/// Three fixed lines per accepted request; multiple requests are separated by a blank line.
pub fn render(requests: &[ActionRequest]) -> String {
    requests
        .iter()
        .map(|r| {
            format!(
                "Action name: {}\nAction description: {}\nAction version: {}\n",
                one_line(&r.name),
                one_line(&r.description),
                one_line(&r.version)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Continuation lines are joined with single spaces so each field stays on its line.
fn one_line(value: &str) -> String {
    value
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Overwrite the receipt at `path`.
pub fn write(path: &Path, requests: &[ActionRequest]) -> Result<()> {
    io::atomic_write(path, render(requests).as_bytes()).map_err(|source| {
        IntakeError::ReceiptWrite {
            path: path.to_path_buf(),
            source,
        }
    })
}
