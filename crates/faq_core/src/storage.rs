use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::{FaqError, Result};
use crate::model::{FaqEntry, IndexRecord};

/// Reads the FAQ source file: a JSON array of `{id, question, answer}`.
pub fn load_faqs_json(path: &Path) -> Result<Vec<FaqEntry>> {
    let file = File::open(path).map_err(|e| FaqError::io(path, e))?;
    let entries: Vec<FaqEntry> =
        serde_json::from_reader(BufReader::new(file)).map_err(|e| FaqError::json(path, e))?;

    let mut seen = HashSet::with_capacity(entries.len());
    for entry in &entries {
        if !seen.insert(entry.id.as_str()) {
            return Err(FaqError::DuplicateId(entry.id.clone()));
        }
    }

    debug!(path = %path.display(), count = entries.len(), "loaded faqs");
    Ok(entries)
}

pub fn save_records_jsonl(path: &Path, records: &[IndexRecord]) -> Result<()> {
    let file = File::create(path).map_err(|e| FaqError::io(path, e))?;
    let mut writer = BufWriter::new(file);

    for record in records {
        let line = serde_json::to_string(record).map_err(|e| FaqError::json(path, e))?;
        writer
            .write_all(line.as_bytes())
            .and_then(|_| writer.write_all(b"\n"))
            .map_err(|e| FaqError::io(path, e))?;
    }

    writer.flush().map_err(|e| FaqError::io(path, e))
}

pub fn load_records_jsonl(path: &Path) -> Result<Vec<IndexRecord>> {
    let file = File::open(path).map_err(|e| FaqError::io(path, e))?;
    let reader = BufReader::new(file);
    let mut records = Vec::new();

    for line in reader.lines() {
        let line = line.map_err(|e| FaqError::io(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        records.push(serde_json::from_str(&line).map_err(|e| FaqError::json(path, e))?);
    }

    Ok(records)
}

pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path).map_err(|e| FaqError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value).map_err(|e| FaqError::json(path, e))?;
    writer.flush().map_err(|e| FaqError::io(path, e))
}

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).map_err(|e| FaqError::io(path, e))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| FaqError::json(path, e))
}
