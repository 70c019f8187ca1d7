// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Supported upload formats.
//
// Druckwerk only dispatches formats CUPS renders natively; conversion of
// office formats happens upstream and is not this engine's concern.

/// File extensions CUPS can render without an intermediate conversion step.
pub const CUPS_NATIVE_EXTENSIONS: [&str; 9] = [
    "pdf", "ps", "txt", "jpg", "jpeg", "png", "gif", "tif", "tiff",
];

/// Whether an extension (without the dot, any case) is printable as-is.
pub fn is_cups_native(extension: &str) -> bool {
    let ext = extension.trim_start_matches('.').to_ascii_lowercase();
    CUPS_NATIVE_EXTENSIONS.contains(&ext.as_str())
}

/// Human-readable label for a filename's format, shown in job listings.
pub fn file_type_label(filename: &str) -> &'static str {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "pdf" => "PDF",
        "ps" => "PostScript",
        "txt" => "Plain text",
        "jpg" | "jpeg" => "JPEG image",
        "png" => "PNG image",
        "gif" => "GIF image",
        "tif" | "tiff" => "TIFF image",
        _ => "Unknown format",
    }
}

/// Comma-separated summary of supported extensions for UI copy.
pub fn describe_supported_extensions() -> String {
    CUPS_NATIVE_EXTENSIONS.join(", ")
}
