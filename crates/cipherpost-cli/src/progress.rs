//! Upload progress display.

use cipherpost_core::{MAX_ATTEMPTS, TransferObserver};
use indicatif::{ProgressBar, ProgressStyle};

/// Upload progress tracker
#[derive(Clone)]
pub struct TransferProgress {
    bar: ProgressBar,
    filename: String,
}

impl TransferProgress {
    /// Create a new progress tracker
    #[must_use]
    pub fn new(total_bytes: u64, filename: &str) -> Self {
        let bar = ProgressBar::new(total_bytes);

        bar.set_style(
            ProgressStyle::default_bar()
                .template("{msg}\n{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );

        bar.set_message(format!("Encrypting: {filename}"));

        Self {
            bar,
            filename: filename.to_string(),
        }
    }

    /// Finish with custom message
    pub fn finish_with_message(&self, msg: String) {
        self.bar.finish_with_message(msg);
    }

    /// Abandon the progress bar (for errors)
    pub fn abandon(&self) {
        self.bar.abandon();
    }
}

impl TransferObserver for TransferProgress {
    fn on_send(&mut self, attempt: u32, bytes: u64) {
        self.bar.set_length(bytes);
        self.bar.set_position(0);
        self.bar.set_message(format!(
            "Sending: {} (attempt {attempt}/{MAX_ATTEMPTS})",
            self.filename
        ));
    }

    fn on_sent(&mut self, _attempt: u32) {
        if let Some(len) = self.bar.length() {
            self.bar.set_position(len);
        }
        self.bar.set_message(format!("Verifying: {}", self.filename));
    }

    fn on_checksum(&mut self, attempt: u32, local: u32, server: u32) {
        if local != server && attempt < MAX_ATTEMPTS {
            self.bar.println(format!(
                "Checksum mismatch on attempt {attempt} (local {local}, server {server})"
            ));
        }
    }
}

/// Format bytes in human-readable format
///
/// # Example
///
/// ```text
/// format_bytes(1024)        == "1.00 KB"
/// format_bytes(1024 * 1024) == "1.00 MB"
/// ```
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    format!("{size:.2} {}", UNITS[unit_idx])
}
