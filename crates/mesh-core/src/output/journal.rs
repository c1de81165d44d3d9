//! Message Journal
//!
//! Append-only JSONL log of delivered messages.

use mesh_events::{DeliveryReport, Message};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

/// One delivery as written to the journal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub sequence: u64,
    pub recipient: String,
    pub message: Message,
}

/// Writes one line per delivered message
pub struct MessageJournal {
    writer: Option<BufWriter<File>>,
    next_sequence: u64,
}

impl MessageJournal {
    /// Creates a journal at `path`, truncating any previous contents.
    pub fn new(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        Ok(Self {
            writer: Some(BufWriter::new(file)),
            next_sequence: 1,
        })
    }

    /// A journal that counts entries but writes nothing
    pub fn null() -> Self {
        Self {
            writer: None,
            next_sequence: 1,
        }
    }

    pub fn entry_count(&self) -> u64 {
        self.next_sequence - 1
    }

    /// Records one message delivered to `recipient`.
    pub fn record(&mut self, recipient: &str, message: &Message) -> std::io::Result<()> {
        let entry = JournalEntry {
            sequence: self.next_sequence,
            recipient: recipient.to_string(),
            message: message.clone(),
        };
        self.next_sequence += 1;
        if let Some(ref mut writer) = self.writer {
            let json = serde_json::to_string(&entry)?;
            writeln!(writer, "{}", json)?;
        }
        Ok(())
    }

    /// Records `message` once per recipient in `report`.
    pub fn record_delivery(&mut self, message: &Message, report: &DeliveryReport) -> std::io::Result<()> {
        for recipient in &report.recipients {
            self.record(recipient, message)?;
        }
        Ok(())
    }

    /// Flush the buffer to disk
    pub fn flush(&mut self) -> std::io::Result<()> {
        if let Some(ref mut writer) = self.writer {
            writer.flush()?;
        }
        Ok(())
    }
}

impl Drop for MessageJournal {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            tracing::warn!(error = %e, "failed to flush message journal");
        }
    }
}
