//src/qiime.rs

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::engine::{
    AlignmentClassifier, AlignmentParams, SecondaryClassifier, SecondaryParams, SequenceFilter,
};
use crate::error::{HybridError, Result};
use crate::table::ClassificationTable;

pub const DEFAULT_QIIME_BIN: &str = "qiime";

/// Header QIIME accepts for a feature id metadata column.
const ID_METADATA_HEADER: &str = "feature id";

/// File `qiime tools export` writes for a FeatureData[Taxonomy] artifact.
const EXPORTED_TAXONOMY: &str = "taxonomy.tsv";

/// Drives the QIIME 2 command line for database creation, both classifiers
/// and sequence filtering. Artifacts are written under `work_dir`.
pub struct QiimeCli {
    bin: PathBuf,
    work_dir: PathBuf,
}

impl QiimeCli {
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(bin: P, work_dir: Q) -> Result<Self> {
        let work_dir = work_dir.into();
        fs::create_dir_all(&work_dir)?;
        Ok(Self {
            bin: bin.into(),
            work_dir,
        })
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    fn artifact(&self, name: &str) -> PathBuf {
        self.work_dir.join(name)
    }

    /// Run one `qiime` subcommand; a non-zero exit becomes `Upstream`.
    fn run(&self, args: Vec<OsString>) -> Result<()> {
        let tool = format!(
            "{} {}",
            self.bin.display(),
            args.iter()
                .take(2)
                .map(|a| a.to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join(" ")
        );
        log::debug!("Running {:?} {:?}", self.bin, args);

        let output = Command::new(&self.bin)
            .args(&args)
            .output()
            .map_err(|e| HybridError::Upstream {
                tool: tool.clone(),
                status: -1,
                stderr: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(HybridError::Upstream {
                tool,
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }

    /// Build a BLAST database from reference sequences.
    pub fn make_blast_db(&self, reference_sequences: &Path) -> Result<PathBuf> {
        let db = self.artifact("blast_db.qza");
        self.run(args(&[
            "feature-classifier".into(),
            "makeblastdb".into(),
            "--i-sequences".into(),
            reference_sequences.into(),
            "--o-database".into(),
            db.as_path().into(),
        ]))?;
        Ok(db)
    }

    /// Export a taxonomy artifact and load its table.
    pub fn export_taxonomy(&self, artifact: &Path) -> Result<ClassificationTable> {
        let stem = artifact
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "taxonomy".to_string());
        let out_dir = self.artifact(&format!("{}_export", stem));
        self.run(args(&[
            "tools".into(),
            "export".into(),
            "--input-path".into(),
            artifact.into(),
            "--output-path".into(),
            out_dir.as_path().into(),
        ]))?;
        ClassificationTable::read_tsv(out_dir.join(EXPORTED_TAXONOMY))
    }
}

fn args(parts: &[Arg<'_>]) -> Vec<OsString> {
    parts.iter().map(Arg::to_os_string).collect()
}

/// Command-line argument that is either text or a path.
enum Arg<'a> {
    Text(String),
    Path(&'a Path),
}

impl Arg<'_> {
    fn to_os_string(&self) -> OsString {
        match self {
            Arg::Text(s) => OsString::from(s),
            Arg::Path(p) => p.as_os_str().to_os_string(),
        }
    }
}

impl From<&str> for Arg<'_> {
    fn from(s: &str) -> Self {
        Arg::Text(s.to_string())
    }
}

impl From<String> for Arg<'_> {
    fn from(s: String) -> Self {
        Arg::Text(s)
    }
}

impl<'a> From<&'a Path> for Arg<'a> {
    fn from(p: &'a Path) -> Self {
        Arg::Path(p)
    }
}

/// Write a one-column QIIME metadata file listing feature ids.
pub fn write_id_metadata<W: Write>(writer: W, ids: &[String]) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_writer(writer);
    wtr.write_record([ID_METADATA_HEADER])?;
    for id in ids {
        wtr.write_record([id.as_str()])?;
    }
    wtr.flush()?;
    Ok(())
}

impl AlignmentClassifier for QiimeCli {
    fn classify(
        &self,
        query: &Path,
        reference_sequences: &Path,
        reference_taxonomy: &Path,
        params: &AlignmentParams,
    ) -> Result<ClassificationTable> {
        log::info!("Creating BLAST database...");
        let db = self.make_blast_db(reference_sequences)?;

        log::info!("Running BLAST classification...");
        let classification = self.artifact("blast_classification.qza");
        let search_results = self.artifact("blast_search_results.qza");
        self.run(args(&[
            "feature-classifier".into(),
            "classify-consensus-blast".into(),
            "--i-query".into(),
            query.into(),
            "--i-blastdb".into(),
            db.as_path().into(),
            "--i-reference-taxonomy".into(),
            reference_taxonomy.into(),
            "--p-maxaccepts".into(),
            params.max_accepts.to_string().into(),
            "--p-perc-identity".into(),
            params.perc_identity.to_string().into(),
            "--p-query-cov".into(),
            params.query_cov.to_string().into(),
            "--p-num-threads".into(),
            params.num_threads.to_string().into(),
            "--o-classification".into(),
            classification.as_path().into(),
            "--o-search-results".into(),
            search_results.as_path().into(),
        ]))?;

        self.export_taxonomy(&classification)
    }
}

impl SequenceFilter for QiimeCli {
    fn filter(&self, sequences: &Path, ids: &[String]) -> Result<PathBuf> {
        let metadata = self.artifact("low_resolution_ids.tsv");
        write_id_metadata(File::create(&metadata)?, ids)?;

        let filtered = self.artifact("low_resolution_seqs.qza");
        self.run(args(&[
            "feature-table".into(),
            "filter-seqs".into(),
            "--i-data".into(),
            sequences.into(),
            "--m-metadata-file".into(),
            metadata.as_path().into(),
            "--o-filtered-data".into(),
            filtered.as_path().into(),
        ]))?;
        Ok(filtered)
    }
}

impl SecondaryClassifier for QiimeCli {
    fn classify(
        &self,
        reads: &Path,
        classifier: &Path,
        params: &SecondaryParams,
    ) -> Result<ClassificationTable> {
        let classification = self.artifact("sklearn_classification.qza");
        self.run(args(&[
            "feature-classifier".into(),
            "classify-sklearn".into(),
            "--i-reads".into(),
            reads.into(),
            "--i-classifier".into(),
            classifier.into(),
            "--p-confidence".into(),
            params.confidence.to_string().into(),
            "--p-n-jobs".into(),
            params.num_threads.to_string().into(),
            "--o-classification".into(),
            classification.as_path().into(),
        ]))?;

        self.export_taxonomy(&classification)
    }
}
