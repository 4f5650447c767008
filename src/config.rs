//src/config.rs

use std::path::{Path, PathBuf};

use crate::engine::{AlignmentParams, SecondaryParams};
use crate::error::{HybridError, Result};

pub const DEFAULT_OUTPUT_DIR: &str = "hybrid_classification_results";
pub const OUTPUT_FILE_NAME: &str = "hybrid_taxonomy.tsv";

/// Everything one hybrid classification run needs.
#[derive(Debug, Clone)]
pub struct HybridConfig {
    /// Representative sequences (e.g. DADA2 output)
    pub rep_seqs: PathBuf,
    pub database_taxonomy: PathBuf,
    pub database_sequences: PathBuf,
    /// Pre-trained naive Bayes classifier
    pub classifier: PathBuf,
    pub max_accepts: u32,
    pub perc_identity: f64,
    pub query_cov: f64,
    pub classifier_confidence: f64,
    /// Shared by both classifiers
    pub num_threads: u32,
    pub output_dir: PathBuf,
}

impl HybridConfig {
    pub fn new<P: Into<PathBuf>>(
        rep_seqs: P,
        database_taxonomy: P,
        database_sequences: P,
        classifier: P,
    ) -> Self {
        let alignment = AlignmentParams::default();
        let secondary = SecondaryParams::default();
        Self {
            rep_seqs: rep_seqs.into(),
            database_taxonomy: database_taxonomy.into(),
            database_sequences: database_sequences.into(),
            classifier: classifier.into(),
            max_accepts: alignment.max_accepts,
            perc_identity: alignment.perc_identity,
            query_cov: alignment.query_cov,
            classifier_confidence: secondary.confidence,
            num_threads: alignment.num_threads,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
        }
    }

    pub fn alignment_params(&self) -> AlignmentParams {
        AlignmentParams {
            max_accepts: self.max_accepts,
            perc_identity: self.perc_identity,
            query_cov: self.query_cov,
            num_threads: self.num_threads,
        }
    }

    pub fn secondary_params(&self) -> SecondaryParams {
        SecondaryParams {
            confidence: self.classifier_confidence,
            num_threads: self.num_threads,
        }
    }

    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(OUTPUT_FILE_NAME)
    }

    /// Check parameter ranges and that every input exists.
    pub fn validate(&self) -> Result<()> {
        self.alignment_params().validate()?;
        self.secondary_params().validate()?;
        for path in [
            &self.rep_seqs,
            &self.database_taxonomy,
            &self.database_sequences,
            &self.classifier,
        ] {
            require_file(path)?;
        }
        Ok(())
    }
}

pub fn require_file(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(HybridError::MissingInput(path.to_path_buf()));
    }
    Ok(())
}
