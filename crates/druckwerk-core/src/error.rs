// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Druckwerk.

use thiserror::Error;

/// Top-level error type for all Druckwerk operations.
#[derive(Debug, Error)]
pub enum DruckwerkError {
    // -- Input validation --
    #[error("invalid value: {0}")]
    Validation(String),

    // -- Upload path resolution --
    #[error("path escapes the uploads root: {0}")]
    PathEscape(String),

    #[error("upload not found: {0}")]
    NotFound(String),

    #[error("invalid upload path: {0}")]
    InvalidPath(String),

    // -- External tools --
    #[error("required tool not available: {0}")]
    ToolUnavailable(String),

    #[error("{0} timed out")]
    Timeout(String),

    #[error("process failed: {0}")]
    ProcessFailure(String),

    // -- Printer resolution --
    #[error("no printer profile is configured")]
    PrinterNotConfigured,

    /// A single wire-format parser failed.  Recovered internally by the
    /// diagnostics provider chain and never surfaced to callers.
    #[error("attribute payload could not be parsed: {0}")]
    Parse(String),

    // -- Ambient plumbing --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DruckwerkError>;

impl DruckwerkError {
    /// Whether a failed operation may reasonably be retried as-is.
    ///
    /// Only bounded-timeout expiries qualify; validation, path, and
    /// configuration errors require caller action first.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}
