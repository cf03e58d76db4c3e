use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use csv::Writer;
use serde::Serialize;

/// Per-epoch metrics of a transfer run.
#[derive(Serialize)]
pub struct TransferRecord {
    pub epoch: usize,
    pub percent: f32,
    pub loss: f32,
    pub style_loss: f32,
    pub content_loss: f32,
    pub tv_loss: f32,
}

/// Appends metric records as JSONL and CSV under `<log_dir>/<experiment>/`.
///
/// The engine itself never writes files; this logger exists for callers
/// (such as the demo binary) that want a durable trace of a run.
pub struct Logger {
    json: File,
    csv: Writer<File>,
}

impl Logger {
    pub fn new(log_dir: Option<String>, experiment: Option<String>) -> std::io::Result<Self> {
        let base = log_dir.unwrap_or_else(|| "runs".to_string());
        let exp = experiment.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_else(|_| Duration::from_secs(0))
                .as_secs()
                .to_string()
        });
        let dir = PathBuf::from(base).join(exp);
        std::fs::create_dir_all(&dir)?;
        let json = OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join("metrics.jsonl"))?;
        let csv_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join("metrics.csv"))?;
        let csv = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(csv_file);
        Ok(Logger { json, csv })
    }

    pub fn log<T: Serialize>(&mut self, record: &T) {
        if let Ok(line) = serde_json::to_string(record) {
            let _ = writeln!(self.json, "{}", line);
        }
        let _ = self.csv.serialize(record);
    }
}
