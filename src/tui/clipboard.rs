use anyhow::Result;
use std::sync::mpsc as std_mpsc;
use std::sync::OnceLock;
use std::time::Duration;

use super::state::UiState;

static CLIPBOARD_SENDER: OnceLock<std_mpsc::Sender<String>> = OnceLock::new();

/// Clipboard writes happen on one background thread. Each clipboard instance is kept
/// alive for a moment after writing so Linux clipboard managers can pick up the text.
fn clipboard_sender() -> &'static std_mpsc::Sender<String> {
    CLIPBOARD_SENDER.get_or_init(|| {
        let (tx, rx) = std_mpsc::channel::<String>();
        std::thread::spawn(move || {
            for text in rx {
                match arboard::Clipboard::new() {
                    Ok(mut clipboard) => {
                        if let Err(e) = clipboard.set_text(&text) {
                            tracing::warn!(error = %e, "clipboard write failed");
                            continue;
                        }
                        std::thread::sleep(Duration::from_secs(2));
                    }
                    Err(e) => tracing::warn!(error = %e, "clipboard unavailable"),
                }
            }
        });
        tx
    })
}

/// Queue `text` for the clipboard without blocking the UI thread.
pub fn copy_to_clipboard(text: &str) -> Result<()> {
    clipboard_sender()
        .send(text.to_string())
        .map_err(|_| anyhow::anyhow!("clipboard thread is gone"))
}

/// Copy the selected run's report URL and report what happened in the status line.
pub fn copy_selected_report(state: &mut UiState) {
    let Some(row) = state.selected_row() else {
        state.info = "No run selected".into();
        return;
    };
    let Some(url) = row.report.target().map(str::to_string) else {
        state.info = format!("Run {} has no report", row.id);
        return;
    };
    state.info = match copy_to_clipboard(&url) {
        Ok(()) => format!("Copied report URL: {url}"),
        Err(e) => format!("Clipboard copy failed: {e:#}"),
    };
}
