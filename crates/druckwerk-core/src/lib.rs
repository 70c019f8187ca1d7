// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Druckwerk — Core types, error definitions, configuration, and input
// validation shared across all crates.

pub mod config;
pub mod error;
pub mod types;
pub mod upload_types;
pub mod validate;

pub use config::PrintConfig;
pub use error::DruckwerkError;
pub use types::*;
