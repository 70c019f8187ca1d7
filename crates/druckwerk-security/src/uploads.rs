// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Upload path resolution against a trusted root.
//
// Resolution never follows an attacker-influenced path construction:
// the filename is matched against the root's own directory entries, and
// only the matched entry is canonicalized and checked.  Nothing here is
// cached — the filesystem can change between requests, so the full check
// runs on every call.

use std::path::{Path, PathBuf};

use tracing::{debug, instrument, warn};

use druckwerk_core::error::{DruckwerkError, Result};
use druckwerk_core::validate;

/// The trusted uploads directory.
///
/// Holds the canonical root path; [`resolve`] guarantees every returned
/// path is a regular file strictly inside it.
///
/// [`resolve`]: UploadRoot::resolve
#[derive(Debug, Clone)]
pub struct UploadRoot {
    root: PathBuf,
}

impl UploadRoot {
    /// Canonicalize and adopt an uploads root.
    ///
    /// Fails with `InvalidPath` when the directory does not exist or is
    /// not a directory.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let root = std::fs::canonicalize(path).map_err(|e| {
            DruckwerkError::InvalidPath(format!("uploads root {}: {e}", path.display()))
        })?;
        if !root.is_dir() {
            return Err(DruckwerkError::InvalidPath(format!(
                "uploads root {} is not a directory",
                root.display()
            )));
        }
        Ok(Self { root })
    }

    /// The canonical root path.
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Resolve an untrusted filename to a canonical path inside the root.
    ///
    /// The filename must pass [`validate::upload_filename`], match one of
    /// the root's directory entries by name, and canonicalize to a strict
    /// descendant of the root that is a regular file.  Symlinks pointing
    /// outside the root fail with `PathEscape`.
    #[instrument(skip(self), fields(root = %self.root.display()))]
    pub fn resolve(&self, filename: &str) -> Result<PathBuf> {
        let filename = validate::upload_filename(filename)?;

        // Match by directory-entry enumeration rather than joining the
        // untrusted name onto the root and following the result.
        let mut candidate = None;
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_name().to_str() == Some(filename.as_str()) {
                candidate = Some(entry.path());
                break;
            }
        }
        let candidate = candidate
            .ok_or_else(|| DruckwerkError::NotFound(filename.clone()))?;

        // Canonicalizing the matched entry resolves any symlink to its
        // final target.  A broken link has no target to print.
        let resolved = std::fs::canonicalize(&candidate)
            .map_err(|_| DruckwerkError::NotFound(filename.clone()))?;

        // Component-wise ancestor check on two canonical paths, so a
        // sibling like /uploads-evil can never pass as a descendant.
        if resolved == self.root || !resolved.starts_with(&self.root) {
            warn!(
                filename = %filename,
                resolved = %resolved.display(),
                "upload resolved outside the trusted root"
            );
            return Err(DruckwerkError::PathEscape(filename));
        }

        let metadata = std::fs::metadata(&resolved)?;
        if !metadata.is_file() {
            return Err(DruckwerkError::InvalidPath(format!(
                "{filename} is not a regular file"
            )));
        }

        debug!(resolved = %resolved.display(), "upload resolved");
        Ok(resolved)
    }
}

/// Make an uploaded name filesystem-safe while preserving its suffix.
///
/// Runs of characters outside `[A-Za-z0-9_-]` in the stem collapse to a
/// single `-`; leading/trailing `-`/`_` are trimmed; an empty stem falls
/// back to `upload`; the suffix is lower-cased.
pub fn sanitize_upload_name(name: &str) -> String {
    let path = Path::new(name);
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
    let suffix = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default();

    let mut sanitized = String::with_capacity(stem.len());
    let mut in_run = false;
    for c in stem.chars() {
        if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
            sanitized.push(c);
            in_run = false;
        } else if !in_run {
            sanitized.push('-');
            in_run = true;
        }
    }
    let sanitized = sanitized.trim_matches(|c| c == '-' || c == '_');

    if sanitized.is_empty() {
        format!("upload{suffix}")
    } else {
        format!("{sanitized}{suffix}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root_with_file(name: &str) -> (tempfile::TempDir, UploadRoot) {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join(name), b"%PDF-1.4").expect("write upload");
        let root = UploadRoot::new(dir.path()).expect("root");
        (dir, root)
    }

    #[test]
    fn resolves_existing_upload_to_canonical_path() {
        let (dir, root) = root_with_file("report.pdf");
        let resolved = root.resolve("report.pdf").expect("resolve");
        assert!(resolved.starts_with(root.path()));
        assert_eq!(
            resolved,
            std::fs::canonicalize(dir.path().join("report.pdf")).expect("canonical")
        );
    }

    #[test]
    fn rejects_traversal_even_when_target_exists() {
        let (_dir, root) = root_with_file("report.pdf");
        for name in ["../report.pdf", "/etc/hostname", "a/../report.pdf", ".."] {
            assert!(
                matches!(root.resolve(name), Err(DruckwerkError::Validation(_))),
                "{name} must fail validation"
            );
        }
    }

    #[test]
    fn missing_upload_is_not_found() {
        let (_dir, root) = root_with_file("report.pdf");
        assert!(matches!(
            root.resolve("missing.pdf"),
            Err(DruckwerkError::NotFound(_))
        ));
    }

    #[test]
    fn directories_are_not_printable() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir(dir.path().join("folder.pdf")).expect("mkdir");
        let root = UploadRoot::new(dir.path()).expect("root");
        assert!(matches!(
            root.resolve("folder.pdf"),
            Err(DruckwerkError::InvalidPath(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn symlink_escaping_the_root_is_rejected() {
        let outside = tempfile::tempdir().expect("outside");
        let secret = outside.path().join("secret.pdf");
        std::fs::write(&secret, b"secret").expect("write secret");

        let dir = tempfile::tempdir().expect("tempdir");
        std::os::unix::fs::symlink(&secret, dir.path().join("innocent.pdf"))
            .expect("symlink");
        let root = UploadRoot::new(dir.path()).expect("root");

        assert!(matches!(
            root.resolve("innocent.pdf"),
            Err(DruckwerkError::PathEscape(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn symlink_staying_inside_the_root_resolves() {
        let (dir, root) = root_with_file("real.pdf");
        std::os::unix::fs::symlink(dir.path().join("real.pdf"), dir.path().join("alias.pdf"))
            .expect("symlink");
        let resolved = root.resolve("alias.pdf").expect("resolve");
        assert!(resolved.ends_with("real.pdf"));
    }

    #[test]
    fn root_must_exist_and_be_a_directory() {
        assert!(matches!(
            UploadRoot::new("/definitely/not/here"),
            Err(DruckwerkError::InvalidPath(_))
        ));

        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("plain.txt");
        std::fs::write(&file, b"x").expect("write");
        assert!(matches!(
            UploadRoot::new(&file),
            Err(DruckwerkError::InvalidPath(_))
        ));
    }

    #[test]
    fn sanitize_preserves_suffix_and_collapses_runs() {
        assert_eq!(sanitize_upload_name("Q3 report (final).PDF"), "Q3-report-final.pdf");
        assert_eq!(sanitize_upload_name("résumé.pdf"), "r-sum.pdf");
        assert_eq!(sanitize_upload_name("___.pdf"), "upload.pdf");
        assert_eq!(sanitize_upload_name("scan_001.tiff"), "scan_001.tiff");
    }

    #[test]
    fn sanitize_handles_missing_stem_or_suffix() {
        assert_eq!(sanitize_upload_name("notes"), "notes");
        assert_eq!(sanitize_upload_name("!!!"), "upload");
    }
}
