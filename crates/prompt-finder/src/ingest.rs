/// CSV ingestion of example prompts.
///
/// Expected columns (header names are matched case-insensitively after trimming):
/// - `act` (required): becomes the record category
/// - `prompt` (required): becomes the record text
/// - `for_devs` (optional): boolean developer flag, `false` when absent or empty
///
/// A batch is all-or-nothing: the first bad row aborts the load and nothing is returned.
use std::io::Read;
use std::path::Path;

use thiserror::Error;
use tracing::info;

use crate::model::PromptRecord;

const CATEGORY_COLUMN: &str = "act";
const TEXT_COLUMN: &str = "prompt";
const DEV_FLAG_COLUMN: &str = "for_devs";

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to read CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing required column: {0}")]
    MissingColumn(&'static str),

    /// `row` is 1-based and counts data rows only (the header is row 0).
    #[error("row {row}: empty value in required column '{column}'")]
    MissingField { row: usize, column: &'static str },

    #[error("row {row}: invalid for_devs value '{value}'")]
    InvalidFlag { row: usize, value: String },
}

/// Positions of the known columns in the header row.
struct Columns {
    category: usize,
    text: usize,
    for_devs: Option<usize>,
}

impl Columns {
    fn locate(headers: &csv::StringRecord) -> Result<Self, IngestError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        Ok(Self {
            category: find(CATEGORY_COLUMN).ok_or(IngestError::MissingColumn(CATEGORY_COLUMN))?,
            text: find(TEXT_COLUMN).ok_or(IngestError::MissingColumn(TEXT_COLUMN))?,
            for_devs: find(DEV_FLAG_COLUMN),
        })
    }
}

/// Load prompt records from a CSV file on disk.
pub fn load_prompts_csv(path: &Path) -> Result<Vec<PromptRecord>, IngestError> {
    let file = std::fs::File::open(path).map_err(csv::Error::from)?;
    let records = parse_prompts_csv(file)?;
    info!(path = %path.display(), records = records.len(), "loaded prompts from csv");
    Ok(records)
}

/// Parse prompt records from any CSV source with a header row.
pub fn parse_prompts_csv<R: Read>(source: R) -> Result<Vec<PromptRecord>, IngestError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(source);

    let columns = Columns::locate(reader.headers()?)?;

    let mut records = Vec::new();
    for (index, row) in reader.records().enumerate() {
        let row_number = index + 1;
        let row = row?;

        let field = |idx: usize| row.get(idx).map(str::trim).unwrap_or("");
        let category = field(columns.category);
        if category.is_empty() {
            return Err(IngestError::MissingField {
                row: row_number,
                column: CATEGORY_COLUMN,
            });
        }
        let text = field(columns.text);
        if text.is_empty() {
            return Err(IngestError::MissingField {
                row: row_number,
                column: TEXT_COLUMN,
            });
        }
        let for_devs = match columns.for_devs {
            Some(idx) => parse_flag(field(idx)).ok_or_else(|| IngestError::InvalidFlag {
                row: row_number,
                value: field(idx).to_string(),
            })?,
            None => false,
        };

        records.push(PromptRecord::new(text, category, for_devs));
    }

    Ok(records)
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "" | "false" | "0" | "no" | "n" => Some(false),
        "true" | "1" | "yes" | "y" => Some(true),
        _ => None,
    }
}
