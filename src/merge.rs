//src/merge.rs

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::error::Result;
use crate::normalize::NormalizedTable;
use crate::types::{format_score, CanonicalRow, Method, CANONICAL_COLUMNS};

/// What happened on the low-resolution branch.
#[derive(Debug, Clone, PartialEq)]
pub enum SecondaryOutcome {
    /// Every BLAST call was resolved; the second classifier never ran.
    Skipped,
    /// The second classifier ran; its output, normalized (possibly empty).
    Classified(NormalizedTable),
}

impl SecondaryOutcome {
    pub fn rows(&self) -> &[CanonicalRow] {
        match self {
            SecondaryOutcome::Skipped => &[],
            SecondaryOutcome::Classified(table) => &table.rows,
        }
    }
}

/// The final hybrid taxonomy table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HybridTable {
    pub rows: Vec<CanonicalRow>,
}

impl HybridTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of rows produced by `method`.
    pub fn count_method(&self, method: Method) -> usize {
        self.rows.iter().filter(|r| r.method == Some(method)).count()
    }

    /// Serialize as a tab-separated table with the canonical header and no index.
    pub fn write_tsv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .from_writer(writer);

        wtr.write_record(CANONICAL_COLUMNS)?;
        for row in &self.rows {
            let score = row.score.map(format_score).unwrap_or_default();
            wtr.write_record([
                row.feature_id.as_deref().unwrap_or(""),
                row.taxon.as_deref().unwrap_or(""),
                row.method.map(|m| m.as_str()).unwrap_or(""),
                score.as_str(),
            ])?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Generate the TSV text on demand
    pub fn to_tsv(&self) -> Result<String> {
        let mut buf = Vec::new();
        self.write_tsv(&mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        self.write_tsv(file)
    }
}

/// Concatenate kept BLAST rows and second-classifier rows, in that order.
///
/// No sorting or deduplication happens here: the router already removed
/// every reclassified feature from `high_res`.
pub fn merge(high_res: Vec<CanonicalRow>, secondary: SecondaryOutcome) -> HybridTable {
    let mut rows = high_res;
    match secondary {
        SecondaryOutcome::Skipped => {}
        SecondaryOutcome::Classified(table) => rows.extend(table.rows),
    }
    HybridTable { rows }
}
