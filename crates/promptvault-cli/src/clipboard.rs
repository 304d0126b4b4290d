//! Clipboard backends for the terminal.
//!
//! `SystemClipboard` pipes text into the platform's clipboard program.
//! `Osc52Clipboard` asks the terminal itself to set the clipboard, which also
//! works over SSH.

use std::io::{IsTerminal, Write};
use std::process::{Command, Stdio};

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use promptvault_core::host::Clipboard;

/// A clipboard program and the arguments that make it read from stdin.
#[derive(Debug, Clone)]
pub struct ClipboardCommand {
    program: String,
    args: Vec<String>,
}

impl ClipboardCommand {
    pub fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    fn run(&self, text: &str) -> Result<()> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("Failed to start {}", self.program))?;

        // Closing stdin before waiting lets the program see end of input
        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(text.as_bytes()),
            None => Ok(()),
        };

        // Reap the child even when the write failed
        let status = child.wait()?;
        written.with_context(|| format!("Failed to write to {}", self.program))?;
        if !status.success() {
            bail!("{} exited with {}", self.program, status);
        }
        Ok(())
    }
}

/// The platform clipboard, via the first clipboard program that works.
pub struct SystemClipboard {
    commands: Vec<ClipboardCommand>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self::with_commands(Self::platform_commands())
    }

    pub fn with_commands(commands: Vec<ClipboardCommand>) -> Self {
        Self { commands }
    }

    fn platform_commands() -> Vec<ClipboardCommand> {
        if cfg!(target_os = "macos") {
            vec![ClipboardCommand::new("pbcopy", &[])]
        } else if cfg!(windows) {
            vec![ClipboardCommand::new("clip", &[])]
        } else {
            vec![
                ClipboardCommand::new("wl-copy", &[]),
                ClipboardCommand::new("xclip", &["-selection", "clipboard"]),
                ClipboardCommand::new("xsel", &["--clipboard", "--input"]),
            ]
        }
    }
}

impl Default for SystemClipboard {
    fn default() -> Self {
        Self::new()
    }
}

impl Clipboard for SystemClipboard {
    fn name(&self) -> &str {
        "system"
    }

    fn write_text(&self, text: &str) -> Result<()> {
        let mut last_error = None;
        for command in &self.commands {
            match command.run(text) {
                Ok(()) => return Ok(()),
                Err(e) => last_error = Some(e),
            }
        }
        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("No clipboard program configured")))
    }
}

/// Sets the clipboard through the terminal's OSC 52 escape sequence.
pub struct Osc52Clipboard;

impl Osc52Clipboard {
    pub fn sequence(text: &str) -> String {
        format!("\x1b]52;c;{}\x07", STANDARD.encode(text))
    }
}

impl Clipboard for Osc52Clipboard {
    fn name(&self) -> &str {
        "osc52"
    }

    fn write_text(&self, text: &str) -> Result<()> {
        let mut stdout = std::io::stdout();
        if !stdout.is_terminal() {
            bail!("stdout is not a terminal");
        }
        stdout.write_all(Self::sequence(text).as_bytes())?;
        stdout.flush()?;
        Ok(())
    }
}
