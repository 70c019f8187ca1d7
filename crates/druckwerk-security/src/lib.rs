// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// druckwerk-security — the filesystem trust boundary.  Everything that
// gets printed must resolve to a regular file inside the uploads root;
// this crate is the only code that turns an untrusted filename into an
// on-disk path.

pub mod uploads;

pub use uploads::{sanitize_upload_name, UploadRoot};
