use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use winstair_core::TrialRow;
use winstair_experiment::TrialSink;

/// Writes one JSON object per trial. Each row is flushed so an aborted or
/// failed session leaves every completed trial on disk.
pub struct JsonLinesSink {
    writer: BufWriter<File>,
    pub rows: usize,
}

impl JsonLinesSink {
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        Ok(Self {
            writer: BufWriter::new(file),
            rows: 0,
        })
    }
}

impl TrialSink for JsonLinesSink {
    type Error = io::Error;

    fn record_trial_row(&mut self, row: &TrialRow) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, row)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        self.rows += 1;
        Ok(())
    }
}
