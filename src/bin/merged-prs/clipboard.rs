use std::io::{IsTerminal, Write};

use anyhow::{Context, Result};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use tracing::debug;

/// Builds an OSC 52 "set clipboard" escape sequence for `text`.
///
/// Inside tmux the sequence is wrapped in a DCS passthrough so it reaches
/// the outer terminal.
fn osc52_sequence(text: &str, in_tmux: bool) -> String {
    let osc = format!("\x1b]52;c;{}\x07", STANDARD.encode(text));
    if in_tmux {
        format!("\x1bPtmux;{}\x1b\\", osc.replace('\x1b', "\x1b\x1b"))
    } else {
        osc
    }
}

#[cfg(unix)]
fn open_terminal() -> Option<Box<dyn Write>> {
    std::fs::OpenOptions::new()
        .write(true)
        .open("/dev/tty")
        .ok()
        .map(|tty| Box::new(tty) as Box<dyn Write>)
}

#[cfg(not(unix))]
fn open_terminal() -> Option<Box<dyn Write>> {
    None
}

/// Copies `text` to the system clipboard via the controlling terminal.
pub fn copy_to_clipboard(text: &str) -> Result<()> {
    let sequence = osc52_sequence(text, std::env::var_os("TMUX").is_some());

    let mut writer: Box<dyn Write> = match open_terminal() {
        Some(tty) => tty,
        None if std::io::stderr().is_terminal() => Box::new(std::io::stderr()),
        None => anyhow::bail!("--copy needs a terminal to talk to"),
    };

    debug!(bytes = text.len(), "Writing OSC 52 clipboard sequence");
    writer
        .write_all(sequence.as_bytes())
        .and_then(|()| writer.flush())
        .context("Failed to write clipboard sequence to terminal")
}
