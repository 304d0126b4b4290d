//! Subcommand handlers.
//!
//! Handlers write their normal output to `out` and return an error for
//! anything the user should see as a failure.

use std::io::{BufRead, Read, Write};

use anyhow::{anyhow, bail, Context, Result};
use promptvault_core::host::{copy_text, Clipboard, Confirm, CopyOutcome};
use promptvault_core::offline::{Request, ResponseSource};
use promptvault_core::storage::KeyValueStorage;
use promptvault_core::utils::{format_timestamp, truncate_string};
use promptvault_core::{Prompt, PromptStore};
use reqwest::Method;
use tracing::debug;

use crate::app::Offline;

/// Width of the text preview in `list`.
const PREVIEW_CHARS: usize = 60;

/// Use `value` as prompt text, or read it from `input` when it is `-`.
pub fn read_text(value: &str, mut input: impl Read) -> Result<String> {
    if value != "-" {
        return Ok(value.to_string());
    }
    let mut text = String::new();
    input
        .read_to_string(&mut text)
        .context("Failed to read prompt text from stdin")?;
    Ok(text)
}

/// Ask a yes/no question on `output`, reading the answer from `input`.
/// Anything other than `y` or `yes` is a no.
pub fn ask(message: &str, mut input: impl BufRead, mut output: impl Write) -> bool {
    if write!(output, "{} [y/N] ", message).and_then(|_| output.flush()).is_err() {
        return false;
    }
    let mut answer = String::new();
    if input.read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

fn write_summary(out: &mut impl Write, prompt: &Prompt) -> Result<()> {
    let tag = if prompt.has_tag() {
        format!(" [{}]", prompt.tag)
    } else {
        String::new()
    };
    writeln!(
        out,
        "{}  {}{}  {}",
        prompt.id,
        prompt.title,
        tag,
        format_timestamp(prompt.created_at)
    )?;
    let preview = prompt.text.split_whitespace().collect::<Vec<_>>().join(" ");
    writeln!(out, "    {}", truncate_string(&preview, PREVIEW_CHARS))?;
    Ok(())
}

/// List prompts matching `query`, newest first.
pub fn list<S: KeyValueStorage>(
    store: &PromptStore<S>,
    query: &str,
    out: &mut impl Write,
) -> Result<()> {
    let mut matches = store.search(query);
    if matches.is_empty() {
        if query.trim().is_empty() {
            writeln!(out, "No prompts yet.")?;
        } else {
            writeln!(out, "No prompts match \"{}\".", query.trim())?;
        }
        return Ok(());
    }

    matches.reverse();
    for prompt in matches {
        write_summary(out, prompt)?;
    }
    Ok(())
}

pub fn show<S: KeyValueStorage>(
    store: &PromptStore<S>,
    id: &str,
    out: &mut impl Write,
) -> Result<()> {
    let prompt = store.get(id).ok_or_else(|| anyhow!("Prompt not found: {}", id))?;

    writeln!(out, "Title:   {}", prompt.title)?;
    if prompt.has_tag() {
        writeln!(out, "Tag:     {}", prompt.tag)?;
    }
    writeln!(out, "Created: {}", format_timestamp(prompt.created_at))?;
    writeln!(out, "Id:      {}", prompt.id)?;
    writeln!(out)?;
    writeln!(out, "{}", prompt.text)?;
    Ok(())
}

pub fn add<S: KeyValueStorage>(
    store: &mut PromptStore<S>,
    title: &str,
    text: &str,
    tag: &str,
    out: &mut impl Write,
) -> Result<()> {
    match store.create(title, text, tag)? {
        Some(prompt) => {
            writeln!(out, "Saved {}", prompt.id)?;
            Ok(())
        }
        None => bail!("Nothing saved: a prompt needs a title and text"),
    }
}

/// Change some fields of a prompt, keeping the others.
pub fn edit<S: KeyValueStorage>(
    store: &mut PromptStore<S>,
    id: &str,
    title: Option<&str>,
    text: Option<&str>,
    tag: Option<&str>,
    out: &mut impl Write,
) -> Result<()> {
    let current = store.get(id).cloned().ok_or_else(|| anyhow!("Prompt not found: {}", id))?;

    let prompt = store
        .try_update(
            id,
            title.unwrap_or(&current.title),
            text.unwrap_or(&current.text),
            tag.unwrap_or(&current.tag),
        )
        .inspect_err(|e| debug!(id = id, category = e.category(), "Edit rejected"))?;
    writeln!(out, "Updated {}", prompt.id)?;
    Ok(())
}

pub fn delete<S: KeyValueStorage>(
    store: &mut PromptStore<S>,
    id: &str,
    confirm: &dyn Confirm,
    out: &mut impl Write,
) -> Result<()> {
    if store.get(id).is_none() {
        bail!("Prompt not found: {}", id);
    }

    if store.delete(id, confirm)? {
        writeln!(out, "Deleted {}", id)?;
    } else {
        writeln!(out, "Kept {}", id)?;
    }
    Ok(())
}

pub fn copy<S: KeyValueStorage>(
    store: &PromptStore<S>,
    id: &str,
    primary: &dyn Clipboard,
    fallback: &dyn Clipboard,
    out: &mut impl Write,
) -> Result<()> {
    let prompt = store.get(id).ok_or_else(|| anyhow!("Prompt not found: {}", id))?;

    match copy_text(&prompt.text, primary, fallback) {
        CopyOutcome::Primary => writeln!(out, "Copied to clipboard")?,
        CopyOutcome::Fallback => writeln!(out, "Copied via terminal")?,
        CopyOutcome::Failed => writeln!(
            out,
            "Could not reach a clipboard; copy it from `promptvault show {}`",
            id
        )?,
    }
    Ok(())
}

pub async fn offline_install(offline: &Offline, out: &mut impl Write) -> Result<()> {
    let controller = offline
        .registration
        .register(offline.manifest.clone())
        .await
        .with_context(|| format!("Failed to install {}", offline.manifest.cache_name()))?;

    writeln!(
        out,
        "Installed {} ({} assets)",
        controller.cache_name(),
        controller.manifest().paths().len()
    )?;
    Ok(())
}

pub async fn offline_status(offline: &Offline, out: &mut impl Write) -> Result<()> {
    let current = offline.manifest.cache_name();
    match offline.registration.active().await {
        Some(controller) => writeln!(
            out,
            "Active: {} ({})",
            controller.cache_name(),
            controller.state()
        )?,
        None => writeln!(out, "Not installed: run `promptvault offline install`")?,
    }

    let storage = offline.registration.storage();
    for name in storage.keys()? {
        let marker = if name == current { "*" } else { " " };
        writeln!(out, "{} {}  {} entries", marker, name, storage.urls(&name)?.len())?;
    }
    Ok(())
}

fn source_label(source: ResponseSource) -> &'static str {
    match source {
        ResponseSource::Cache => "cache",
        ResponseSource::Network => "network",
        ResponseSource::OfflineFallback => "offline fallback",
        ResponseSource::Passthrough => "passthrough",
    }
}

/// Fetch `path` from the configured origin through the offline controller.
pub async fn offline_fetch(
    offline: &Offline,
    path: &str,
    navigate: bool,
    method: &str,
    out: &mut impl Write,
) -> Result<()> {
    let url = offline.manifest.resolve(path)?;
    let method = Method::from_bytes(method.to_uppercase().as_bytes())
        .with_context(|| format!("Invalid method: {}", method))?;

    let request = if navigate {
        Request::navigate(url)
    } else {
        Request::get(url)
    }
    .with_method(method);

    let served = offline.registration.handle_fetch(&request).await?;
    let response = &served.response;
    match response.header("content-type") {
        Some(content_type) => writeln!(
            out,
            "{} {} from {}",
            response.status,
            content_type,
            source_label(served.source)
        )?,
        None => writeln!(out, "{} from {}", response.status, source_label(served.source))?,
    }
    out.write_all(&response.body)?;
    writeln!(out)?;
    Ok(())
}
