//! Run progress reporting.
//!
//! Reports observable progress during `distill run` so users see what is
//! being scanned, how much is left, and which document is in flight.
//! Progress is emitted on **stderr** so stdout remains parseable for
//! scripts.

use std::io::Write;

/// A single progress event for a run.
#[derive(Clone, Debug)]
pub enum RunProgressEvent {
    /// Corpus discovery is in flight for this layout (no total yet).
    Discovering { layout: String },
    /// Per-document phase: document n of total is being processed.
    Processing {
        n: u64,
        total: u64,
        source_id: String,
    },
    /// All documents materialized; views are being written.
    Writing { records: u64, suggestions: u64 },
}

/// Reports run progress. Implementations write to stderr (human or JSON).
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: RunProgressEvent);
}

/// Human-friendly progress on stderr: "run  processing  3 / 12  city/…/report.pdf".
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, event: RunProgressEvent) {
        let line = match &event {
            RunProgressEvent::Discovering { layout } => {
                format!("run {}  discovering...\n", layout)
            }
            RunProgressEvent::Processing { n, total, source_id } => {
                format!("run  processing  {} / {}  {}\n", n, total, source_id)
            }
            RunProgressEvent::Writing { records, suggestions } => {
                format!(
                    "run  writing views  {} records, {} suggestions\n",
                    records, suggestions
                )
            }
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ProgressReporter for JsonProgress {
    fn report(&self, event: RunProgressEvent) {
        if let Ok(line) = serde_json::to_string(&json_event(&event)) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
        }
    }
}

fn json_event(event: &RunProgressEvent) -> serde_json::Value {
    match event {
        RunProgressEvent::Discovering { layout } => serde_json::json!({
            "event": "progress",
            "phase": "discovering",
            "layout": layout
        }),
        RunProgressEvent::Processing { n, total, source_id } => serde_json::json!({
            "event": "progress",
            "phase": "processing",
            "n": n,
            "total": total,
            "source_id": source_id
        }),
        RunProgressEvent::Writing { records, suggestions } => serde_json::json!({
            "event": "progress",
            "phase": "writing",
            "records": records,
            "suggestions": suggestions
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn processing_event_carries_position_and_identity() {
        let obj = json_event(&RunProgressEvent::Processing {
            n: 3,
            total: 12,
            source_id: "riyadh/collapsing/residential/tower-b/a.pdf".to_string(),
        });
        assert_eq!(obj["phase"], "processing");
        assert_eq!(obj["n"], 3);
        assert_eq!(obj["total"], 12);
        assert_eq!(obj["source_id"], "riyadh/collapsing/residential/tower-b/a.pdf");
    }

    #[test]
    fn writing_event_reports_batch_sizes() {
        let obj = json_event(&RunProgressEvent::Writing {
            records: 7,
            suggestions: 21,
        });
        assert_eq!(obj["phase"], "writing");
        assert_eq!(obj["records"], 7);
        assert_eq!(obj["suggestions"], 21);
    }
}
