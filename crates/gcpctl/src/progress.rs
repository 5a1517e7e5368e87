//! Spinner shown while waiting on an operation

use gcpctl_core::{ProgressCallback, ProgressEvent};
use indicatif::{ProgressBar, ProgressStyle};

/// Spinner-backed progress callback
///
/// Nothing is drawn until polling starts. Draws to stderr, hidden when
/// stderr is not a terminal.
pub fn spinner(action: &str) -> ProgressCallback {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed_precise}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );

    let action = action.to_string();
    Box::new(move |event| match event {
        ProgressEvent::Started { operation } => {
            pb.set_message(format!("{}: {}", action, operation));
        }
        ProgressEvent::Polling {
            status, attempt, ..
        } => {
            pb.set_message(format!("{}: {} (poll {})", action, status, attempt));
        }
        ProgressEvent::Completed { .. } => {
            pb.finish_with_message(format!("{}: done", action));
        }
        ProgressEvent::Failed { error, .. } => {
            pb.abandon_with_message(format!("{}: failed - {}", action, error));
        }
    })
}
