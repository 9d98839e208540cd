//! Terminal output for the gitsync CLI.
//!
//! Messages go to stdout, warnings, errors and progress to stderr. Colors
//! follow `--ansi`/`--no-ansi`, otherwise `console`'s TTY and `NO_COLOR`
//! detection.

pub mod progress;
pub mod table;

pub use progress::TerminalSink;

use console::style;
use gitsync_transport::{SyncError, TransferSummary};
use miette::Diagnostic;

/// Initialize color output from the command-line override.
pub fn init(force_ansi: Option<bool>) {
    if let Some(enabled) = force_ansi {
        console::set_colors_enabled(enabled);
        console::set_colors_enabled_stderr(enabled);
    }
}

/// Print a success message
pub fn success(text: &str) {
    println!("{} {text}", style("✔").green());
}

/// Print an info message
pub fn info(text: &str) {
    println!("{} {text}", style("ℹ").blue());
}

/// Print a warning message
pub fn warning(text: &str) {
    eprintln!("{} {}", style("warning:").yellow().bold(), style(text).yellow());
}

/// Print an error message
pub fn error(text: &str) {
    eprintln!("{} {text}", style("error:").red().bold());
}

/// Print an error chain, with the diagnostic help of gitsync errors.
pub fn report(err: &anyhow::Error) {
    error(&format!("{err:#}"));
    if let Some(help) = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<SyncError>())
        .and_then(Diagnostic::help)
    {
        eprintln!("  {} {help}", style("help:").cyan());
    }
}

/// Summarize a fetch.
pub fn transfer_summary(summary: &TransferSummary, quiet: bool) {
    if quiet {
        return;
    }
    if summary.updated_refs.is_empty() && summary.received_objects == 0 {
        info("Already up to date.");
        return;
    }
    success(&format!(
        "Received {}/{} objects ({}), {} reference(s) updated",
        summary.received_objects,
        summary.total_objects,
        format_bytes(summary.received_bytes as u64),
        summary.updated_refs.len()
    ));
}

/// Format bytes for display
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes < KB {
        format!("{bytes} B")
    } else if bytes < MB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else if bytes < GB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    }
}
