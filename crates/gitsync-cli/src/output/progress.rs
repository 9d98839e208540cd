//! Progress bar sink for transport sessions.

use super::{format_bytes, warning};
use console::style;
use gitsync_transport::{ProgressSink, SessionEvent};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use parking_lot::Mutex;
use std::fmt;
use std::time::Duration;

const TRANSFER_TEMPLATE: &str =
    "{spinner:.green} {prefix} [{bar:30.cyan/blue}] {pos}/{len} objects {msg}";

/// Renders session events on the terminal.
///
/// Transfer events drive a progress bar created on first use; every other
/// event is printed as a line above it.
pub struct TerminalSink {
    quiet: bool,
    bar: Mutex<Option<ProgressBar>>,
}

impl fmt::Debug for TerminalSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TerminalSink")
            .field("quiet", &self.quiet)
            .field("drawing", &self.bar.lock().is_some())
            .finish()
    }
}

impl TerminalSink {
    /// Create a sink; `quiet` keeps only warnings.
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            bar: Mutex::new(None),
        }
    }

    /// Clear the progress bar, if one was drawn.
    pub fn finish(&self) {
        if let Some(bar) = self.bar.lock().take() {
            bar.finish_and_clear();
        }
    }

    fn progress(&self, prefix: &'static str, position: usize, total: usize, bytes: usize) {
        if self.quiet {
            return;
        }
        let mut slot = self.bar.lock();
        let bar = slot.get_or_insert_with(|| new_bar(prefix));
        bar.set_prefix(prefix);
        bar.set_length(total as u64);
        bar.set_position(position as u64);
        bar.set_message(format!("({})", format_bytes(bytes as u64)));
    }

    /// Print a line without tearing the progress bar.
    fn line(&self, print: impl FnOnce()) {
        match self.bar.lock().as_ref() {
            Some(bar) => bar.suspend(print),
            None => print(),
        }
    }
}

fn new_bar(prefix: &'static str) -> ProgressBar {
    let bar = ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::stderr());
    let style = ProgressStyle::with_template(TRANSFER_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-");
    bar.set_style(style);
    bar.set_prefix(prefix);
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

impl ProgressSink for TerminalSink {
    fn on_event(&self, event: &SessionEvent) {
        match event {
            SessionEvent::Transfer {
                received_objects,
                total_objects,
                received_bytes,
            } => self.progress("Receiving", *received_objects, *total_objects, *received_bytes),
            SessionEvent::PushTransfer {
                current,
                total,
                bytes,
            } => self.progress("Writing", *current, *total, *bytes),
            SessionEvent::Warning { message, .. } => self.line(|| warning(message)),
            _ if self.quiet => {}
            SessionEvent::Notice(message) => self.line(|| println!("{message}")),
            SessionEvent::Reject { .. } | SessionEvent::Exhausted { .. } => {
                self.line(|| eprintln!("{}", style(event).yellow()));
            }
            SessionEvent::Accepted { .. } => self.line(|| eprintln!("{}", style(event).green())),
            other => self.line(|| eprintln!("{}", style(other).dim())),
        }
    }
}
