//src/engine.rs

use std::path::{Path, PathBuf};

use crate::error::{HybridError, Result};
use crate::table::ClassificationTable;

/// Parameters for the consensus BLAST search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignmentParams {
    /// Maximum number of hits kept per query
    pub max_accepts: u32,
    /// Hits below this identity (0-1) are rejected
    pub perc_identity: f64,
    /// Hits below this query coverage (0-1) are rejected
    pub query_cov: f64,
    pub num_threads: u32,
}

impl Default for AlignmentParams {
    fn default() -> Self {
        Self {
            max_accepts: 10,
            perc_identity: 1.0,
            query_cov: 0.95,
            num_threads: 5,
        }
    }
}

impl AlignmentParams {
    pub fn validate(&self) -> Result<()> {
        check_positive("max_accepts", self.max_accepts)?;
        check_fraction("perc_identity", self.perc_identity)?;
        check_fraction("query_cov", self.query_cov)?;
        check_positive("num_threads", self.num_threads)
    }
}

/// Parameters for the fallback classifier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SecondaryParams {
    /// Confidence threshold for limiting taxonomic depth (0-1)
    pub confidence: f64,
    pub num_threads: u32,
}

impl Default for SecondaryParams {
    fn default() -> Self {
        Self {
            confidence: 0.7,
            num_threads: 5,
        }
    }
}

impl SecondaryParams {
    pub fn validate(&self) -> Result<()> {
        check_fraction("classifier_confidence", self.confidence)?;
        check_positive("num_threads", self.num_threads)
    }
}

fn check_positive(name: &'static str, value: u32) -> Result<()> {
    if value == 0 {
        return Err(HybridError::InvalidParameter {
            name,
            reason: "must be at least 1".to_string(),
        });
    }
    Ok(())
}

fn check_fraction(name: &'static str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(HybridError::InvalidParameter {
            name,
            reason: format!("{} is outside [0, 1]", value),
        });
    }
    Ok(())
}

/// Alignment-based classifier returning one row per query feature with at
/// least a feature id, a taxon and a consensus score.
pub trait AlignmentClassifier {
    fn classify(
        &self,
        query: &Path,
        reference_sequences: &Path,
        reference_taxonomy: &Path,
        params: &AlignmentParams,
    ) -> Result<ClassificationTable>;
}

/// Restricts a sequence set to the given feature ids, returning the location
/// of the subset.
pub trait SequenceFilter {
    fn filter(&self, sequences: &Path, ids: &[String]) -> Result<PathBuf>;
}

/// Fallback classifier; zero output rows is a valid answer.
pub trait SecondaryClassifier {
    fn classify(
        &self,
        reads: &Path,
        classifier: &Path,
        params: &SecondaryParams,
    ) -> Result<ClassificationTable>;
}
