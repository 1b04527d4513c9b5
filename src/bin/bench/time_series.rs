// Per-Round JSONL Time Series Recorder
// One JSON line per committed round: model record joined with its cascade metrics

use diffusion_engine::metrics::RoundRow;
use std::io::Write;

/// Time series recorder that accumulates joined round rows and writes JSONL
pub struct TimeSeriesRecorder {
    rows: Vec<RoundRow>,
}

impl TimeSeriesRecorder {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn extend(&mut self, rows: impl IntoIterator<Item = RoundRow>) {
        self.rows.extend(rows);
    }

    /// Write all rows to a JSONL file
    pub fn write_jsonl(&self, path: &std::path::Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::File::create(path)?;
        for row in &self.rows {
            let line = serde_json::to_string(row)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
            writeln!(file, "{}", line)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}
