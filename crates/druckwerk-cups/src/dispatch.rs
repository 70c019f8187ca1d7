// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Job dispatch through the CUPS print tool.
//
// The command line is built only from validated values — target device,
// orientation, colour model, and (for custom ranges) the sanitised page
// selection.  The document itself is streamed to `lp` over stdin, so the
// payload never appears as an argument.

use std::path::Path;
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{info, instrument, warn};

use druckwerk_core::error::{DruckwerkError, Result};
use druckwerk_core::{PrintConfig, PrintJobRequest, PrintOutcome, PrinterProfile};
use druckwerk_security::UploadRoot;

/// Resolve an upload inside the trusted root and dispatch it.
///
/// Path resolution runs fresh on every call; nothing about the uploads
/// directory is cached between requests.
pub async fn print_upload(
    config: &PrintConfig,
    uploads: &UploadRoot,
    profile: &PrinterProfile,
    request: &PrintJobRequest,
) -> Result<PrintOutcome> {
    if !profile.is_configured() {
        return Err(DruckwerkError::PrinterNotConfigured);
    }
    let document = uploads.resolve(&request.filename)?;
    dispatch_job(config, profile, request, &document).await
}

/// Dispatch one validated request to the printer.
///
/// Fails fast — unconfigured profile, missing print tool, vanished
/// document — before any job reaches the queue.  A non-zero exit becomes
/// a failed [`PrintOutcome`] carrying the tool's own diagnostics.
#[instrument(skip(config, request), fields(printer = %profile, file = %request.filename))]
pub async fn dispatch_job(
    config: &PrintConfig,
    profile: &PrinterProfile,
    request: &PrintJobRequest,
    document: &Path,
) -> Result<PrintOutcome> {
    if !profile.is_configured() {
        return Err(DruckwerkError::PrinterNotConfigured);
    }

    let mut file = tokio::fs::File::open(document).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            DruckwerkError::NotFound(request.filename.clone())
        } else {
            DruckwerkError::Io(e)
        }
    })?;

    let orientation_opt = format!(
        "orientation-requested={}",
        request.orientation.ipp_enum_value()
    );
    let color_opt = format!("ColorModel={}", request.color.as_cups_option());

    let mut args: Vec<&str> = vec!["-d", profile.name()];
    if let Some(selection) = request.pages.selection() {
        args.extend(["-P", selection]);
    }
    args.extend(["-o", orientation_opt.as_str(), "-o", color_opt.as_str()]);

    let mut child = Command::new(&config.tools.lp)
        .args(&args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                DruckwerkError::ToolUnavailable(config.tools.lp.clone())
            }
            _ => DruckwerkError::Io(e),
        })?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| DruckwerkError::ProcessFailure("lp stdin not captured".into()))?;

    // Stream the document while draining the tool's output, bounded as a
    // whole: a wedged printer queue must not hang the request forever.
    let stream_document = async move {
        let result = tokio::io::copy(&mut file, &mut stdin).await;
        let _ = stdin.shutdown().await;
        result
    };
    let (written, output) = tokio::time::timeout(
        config.dispatch_timeout(),
        async { tokio::join!(stream_document, child.wait_with_output()) },
    )
    .await
    .map_err(|_| DruckwerkError::Timeout("print dispatch".into()))?;

    let output = output?;
    if let Err(e) = written {
        // The tool can legitimately exit before consuming all input when
        // it rejects the job; its own diagnostics below say why.
        warn!(error = %e, "document streaming ended early");
    }

    if output.status.success() {
        info!("job dispatched");
        return Ok(PrintOutcome {
            stdout: output.stdout,
            error_text: String::new(),
            succeeded: true,
        });
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout_text = String::from_utf8_lossy(&output.stdout);
    let mut parts: Vec<String> = Vec::new();
    if !stderr.trim().is_empty() {
        parts.push(stderr.trim().to_owned());
    }
    if !stdout_text.trim().is_empty() {
        parts.push(stdout_text.trim().to_owned());
    }
    parts.push(match output.status.code() {
        Some(code) => format!("lp exited with status {code}"),
        None => "lp terminated by signal".to_owned(),
    });
    let error_text = parts.join("; ");
    warn!(error = %error_text, "dispatch failed");

    Ok(PrintOutcome {
        stdout: output.stdout,
        error_text,
        succeeded: false,
    })
}
