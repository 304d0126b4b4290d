use anyhow::Result;
use tracing::debug;

/// A mechanism that can place text on the system clipboard.
pub trait Clipboard {
    fn name(&self) -> &str;

    fn write_text(&self, text: &str) -> Result<()>;
}

/// Which mechanism ended up copying the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyOutcome {
    Primary,
    Fallback,
    Failed,
}

/// Copy `text` with `primary`, falling back to `fallback`.
///
/// Best-effort: a failure of both is only logged.
pub fn copy_text(text: &str, primary: &dyn Clipboard, fallback: &dyn Clipboard) -> CopyOutcome {
    match primary.write_text(text) {
        Ok(()) => return CopyOutcome::Primary,
        Err(e) => debug!(clipboard = primary.name(), error = %e, "Primary clipboard failed"),
    }

    match fallback.write_text(text) {
        Ok(()) => CopyOutcome::Fallback,
        Err(e) => {
            debug!(clipboard = fallback.name(), error = %e, "Fallback clipboard failed");
            CopyOutcome::Failed
        }
    }
}
