//! Collaborators provided by the host front-end.
//!
//! - `Confirm`: blocking yes/no question asked before destructive actions
//! - `Clipboard`: copies prompt text, with a fallback mechanism

pub mod clipboard;
pub mod confirm;

pub use clipboard::{copy_text, Clipboard, CopyOutcome};
pub use confirm::Confirm;
