use std::fmt::Display;
use std::path::PathBuf;

// how a pass ended when nothing fatal happened
#[derive(Debug, PartialEq, Clone)]
pub enum PassEvent {
    AwaitingInput,
    PassComplete {
        report_dir: PathBuf,
        failed_steps: usize,
    },
}

impl Display for PassEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PassEvent::AwaitingInput => write!(f, "{}", crate::page::idle_message()),
            PassEvent::PassComplete {
                report_dir,
                failed_steps,
            } => write!(
                f,
                "report written to {} ({failed_steps} failed steps)",
                report_dir.display()
            ),
        }
    }
}

// errors which occur during a pass
#[derive(Debug, thiserror::Error)]
pub enum EdaError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("missing column: {0}")]
    MissingColumn(String),

    #[error("column {column} is not {expected}")]
    ColumnType {
        column: String,
        expected: &'static str,
    },

    #[error("unparsable date {value:?} in row {row}")]
    UnparsableDate { row: usize, value: String },

    #[error("render failed: {0}")]
    Render(String),
}

impl EdaError {
    /// Malformed input aborts the whole pass.
    pub fn is_malformed_input(&self) -> bool {
        matches!(
            self,
            EdaError::MissingColumn(_) | EdaError::UnparsableDate { .. } | EdaError::Csv(_)
        )
    }

    /// Line printed by the binary when a pass fails.
    pub fn failure_message(&self) -> String {
        if self.is_malformed_input() {
            format!("Input rejected, no report written: {self}")
        } else {
            format!("App failed during pass: {self}")
        }
    }
}
