use crate::model::{FaqEntry, FaqSeed};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

pub fn save_entries_jsonl(path: &Path, entries: &[FaqEntry]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    for entry in entries {
        let line = serde_json::to_string(entry).context("serialize faq entry")?;
        writer
            .write_all(line.as_bytes())
            .context("write entry line")?;
        writer.write_all(b"\n").context("write newline")?;
    }

    writer.flush().context("flush output")
}

/// Prebuilt index: one embedded entry per line.
pub fn load_entries_jsonl(path: &Path) -> Result<Vec<FaqEntry>> {
    read_jsonl(path, "faq entry")
}

/// Raw corpus: one `{"question", "answer", "intent"}` object per line.
pub fn load_seeds_jsonl(path: &Path) -> Result<Vec<FaqSeed>> {
    read_jsonl(path, "faq seed")
}

fn read_jsonl<T: DeserializeOwned>(path: &Path, what: &str) -> Result<Vec<T>> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let reader = BufReader::new(file);
    let mut out = Vec::new();

    for (i, line) in reader.lines().enumerate() {
        let line = line.context("read jsonl line")?;
        if line.trim().is_empty() {
            continue;
        }
        let item = serde_json::from_str(&line)
            .with_context(|| format!("parse {what} json at {}:{}", path.display(), i + 1))?;
        out.push(item);
    }

    Ok(out)
}

/// Intent labels, either a JSON array (`.json`) or one label per line with
/// blank lines and `#` comments skipped.
pub fn load_intent_labels(path: &Path) -> Result<Vec<String>> {
    if path.extension().and_then(|e| e.to_str()) == Some("json") {
        let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
        return serde_json::from_reader(file)
            .with_context(|| format!("parse intent labels {}", path.display()));
    }

    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut labels = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line.context("read intent label line")?;
        let label = line.trim();
        if label.is_empty() || label.starts_with('#') {
            continue;
        }
        labels.push(label.to_string());
    }
    Ok(labels)
}
