// src/lib.rs
pub mod config;
pub mod engine;
pub mod error;
pub mod fasta;
pub mod merge;
pub mod normalize;
pub mod qiime;
pub mod resolution;
pub mod router;
pub mod table;
pub mod types;

use std::fs;
use std::path::PathBuf;

use ahash::AHashSet;

use crate::config::HybridConfig;
use crate::engine::{AlignmentClassifier, SecondaryClassifier, SequenceFilter};
use crate::error::Result;
use crate::merge::{merge, HybridTable, SecondaryOutcome};
use crate::normalize::{normalize, NormalizedTable};
use crate::router::route;
use crate::table::ClassificationTable;
use crate::types::Method;

/// Outcome of a hybrid classification run.
#[derive(Debug)]
pub struct HybridResults {
    /// Final table, BLAST rows first, then second-classifier rows
    pub table: HybridTable,

    /// Number of features in the BLAST output
    pub total_features: usize,
    /// Features kept with their BLAST call
    pub high_resolution: usize,
    /// Features sent to the second classifier
    pub low_resolution: usize,

    /// Second-classifier output as normalized (None when it was skipped)
    pub secondary: Option<NormalizedTable>,

    /// Where the table was written (None when nothing was persisted)
    pub output_path: Option<PathBuf>,
}

impl HybridResults {
    /// Rows that came back from the second classifier
    pub fn secondary_classified(&self) -> usize {
        self.secondary.as_ref().map(|t| t.len()).unwrap_or(0)
    }

    /// Generate a one-line run summary on demand
    pub fn summary(&self) -> String {
        format!(
            "{} features: {} kept from BLAST, {} sent to sklearn, {} classified by sklearn",
            self.total_features,
            self.high_resolution,
            self.low_resolution,
            self.secondary_classified()
        )
    }
}

/// Route the alignment table and, if needed, run the low-resolution features
/// through the sequence filter and the second classifier.
///
/// The table is returned in memory; nothing is written here.
pub fn classify_hybrid<A, F, S>(
    config: &HybridConfig,
    aligner: &A,
    filter: &F,
    secondary: &S,
) -> Result<HybridResults>
where
    A: AlignmentClassifier + ?Sized,
    F: SequenceFilter + ?Sized,
    S: SecondaryClassifier + ?Sized,
{
    // 1. Alignment-based classification of every feature
    let blast_table = aligner.classify(
        &config.rep_seqs,
        &config.database_sequences,
        &config.database_taxonomy,
        &config.alignment_params(),
    )?;

    // 2. Split by resolution
    let routed = route(&blast_table);
    let total_features = routed.total();
    let high_resolution = routed.high_res.len();
    let low_resolution = routed.low_res_ids.len();

    // 3. Reclassify only what BLAST could not resolve to genus
    let outcome = if routed.needs_secondary() {
        log::info!("Filtering {} ASVs for sklearn classification...", low_resolution);
        log::info!("Extracting sequences for low-resolution ASVs...");
        let subset = filter.filter(&config.rep_seqs, &routed.low_res_ids)?;

        log::info!("Running sklearn classification on low-resolution ASVs...");
        let raw = secondary.classify(&subset, &config.classifier, &config.secondary_params())?;
        SecondaryOutcome::Classified(normalize(&raw, Method::Sklearn))
    } else {
        log::info!("No low-resolution ASVs to process with sklearn");
        SecondaryOutcome::Skipped
    };

    let secondary_table = match &outcome {
        SecondaryOutcome::Classified(t) => Some(t.clone()),
        SecondaryOutcome::Skipped => None,
    };

    // 4. Combine
    log::info!("Combining results from both methods...");
    let table = merge(routed.high_res, outcome);

    Ok(HybridResults {
        table,
        total_features,
        high_resolution,
        low_resolution,
        secondary: secondary_table,
        output_path: None,
    })
}

/// Full run: validate inputs, classify, then write
/// `<output_dir>/hybrid_taxonomy.tsv`. No file is written if any step fails.
pub fn run_hybrid_classification<A, F, S>(
    config: &HybridConfig,
    aligner: &A,
    filter: &F,
    secondary: &S,
) -> Result<HybridResults>
where
    A: AlignmentClassifier + ?Sized,
    F: SequenceFilter + ?Sized,
    S: SecondaryClassifier + ?Sized,
{
    config.validate()?;
    let mut results = classify_hybrid(config, aligner, filter, secondary)?;

    fs::create_dir_all(&config.output_dir)?;
    let path = config.output_path();
    results.table.save(&path)?;
    log::info!("Hybrid classification complete. Results saved to: {}", path.display());

    results.output_path = Some(path);
    Ok(results)
}

/// Merge pre-exported tables without running any classifier.
///
/// `secondary` is only consulted when some BLAST calls are low resolution,
/// and only its rows for those features are kept.
pub fn merge_exported_tables(
    blast_table: &ClassificationTable,
    secondary: Option<&ClassificationTable>,
) -> HybridResults {
    let routed = route(blast_table);
    let total_features = routed.total();
    let high_resolution = routed.high_res.len();
    let low_resolution = routed.low_res_ids.len();

    let outcome = match secondary {
        Some(raw) if routed.needs_secondary() => {
            let wanted: AHashSet<&str> = routed.low_res_ids.iter().map(String::as_str).collect();
            let mut normalized = normalize(raw, Method::Sklearn);
            let before = normalized.rows.len();
            normalized
                .rows
                .retain(|r| r.feature_id.as_deref().is_some_and(|id| wanted.contains(id)));
            if normalized.rows.len() < before {
                log::info!(
                    "Ignored {} sklearn rows for features BLAST already resolved",
                    before - normalized.rows.len()
                );
            }
            SecondaryOutcome::Classified(normalized)
        }
        Some(_) => {
            log::info!("No low-resolution ASVs to process with sklearn");
            SecondaryOutcome::Skipped
        }
        None => {
            if routed.needs_secondary() {
                log::warn!(
                    "{} low-resolution ASVs have no sklearn table and are left out",
                    low_resolution
                );
            }
            SecondaryOutcome::Skipped
        }
    };

    let secondary_table = match &outcome {
        SecondaryOutcome::Classified(t) => Some(t.clone()),
        SecondaryOutcome::Skipped => None,
    };

    HybridResults {
        table: merge(routed.high_res, outcome),
        total_features,
        high_resolution,
        low_resolution,
        secondary: secondary_table,
        output_path: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{AlignmentParams, SecondaryParams};
    use crate::error::HybridError;
    use std::cell::RefCell;
    use std::path::Path;

    const GENUS: &str = "k__Bacteria;p__Firmicutes;c__Bacilli;o__Lactobacillales;f__Lactobacillaceae;g__Lactobacillus";
    const FAMILY: &str = "k__Bacteria;p__Firmicutes;c__Bacilli;o__Lactobacillales;f__Lactobacillaceae;g__";
    const BACILLUS: &str = "k__Bacteria;p__Firmicutes;c__Bacilli;o__Bacillales;f__Bacillaceae;g__Bacillus";

    struct StubBlast(ClassificationTable);

    impl AlignmentClassifier for StubBlast {
        fn classify(&self, _: &Path, _: &Path, _: &Path, params: &AlignmentParams) -> Result<ClassificationTable> {
            assert_eq!(params.max_accepts, 10);
            Ok(self.0.clone())
        }
    }

    #[derive(Default)]
    struct RecordingFilter {
        requested: RefCell<Vec<String>>,
    }

    impl SequenceFilter for RecordingFilter {
        fn filter(&self, _: &Path, ids: &[String]) -> Result<PathBuf> {
            self.requested.borrow_mut().extend_from_slice(ids);
            Ok(PathBuf::from("subset.qza"))
        }
    }

    struct StubSklearn {
        table: ClassificationTable,
        calls: RefCell<usize>,
    }

    impl StubSklearn {
        fn new(table: ClassificationTable) -> Self {
            Self { table, calls: RefCell::new(0) }
        }
    }

    impl SecondaryClassifier for StubSklearn {
        fn classify(&self, reads: &Path, _: &Path, params: &SecondaryParams) -> Result<ClassificationTable> {
            assert_eq!(reads, Path::new("subset.qza"));
            assert_eq!(params.confidence, 0.7);
            *self.calls.borrow_mut() += 1;
            Ok(self.table.clone())
        }
    }

    struct FailingSklearn;

    impl SecondaryClassifier for FailingSklearn {
        fn classify(&self, _: &Path, _: &Path, _: &SecondaryParams) -> Result<ClassificationTable> {
            Err(HybridError::Upstream {
                tool: "qiime feature-classifier".to_string(),
                status: 1,
                stderr: "classifier version mismatch".to_string(),
            })
        }
    }

    fn blast(rows: &[(&str, &str, &str)]) -> ClassificationTable {
        let mut table = ClassificationTable::new(["Feature ID", "Taxon", "Consensus"]);
        for (id, taxon, consensus) in rows {
            table.push_row([Some(*id), Some(*taxon), Some(*consensus)]);
        }
        table
    }

    fn sklearn(rows: &[(&str, &str, &str)]) -> ClassificationTable {
        let mut table = ClassificationTable::new(["Feature ID", "Taxon", "Confidence"]);
        for (id, taxon, confidence) in rows {
            table.push_row([Some(*id), Some(*taxon), Some(*confidence)]);
        }
        table
    }

    fn config_in(dir: &Path) -> HybridConfig {
        let mut paths = Vec::new();
        for name in ["rep_seqs.qza", "taxonomy.qza", "ref_seqs.qza", "classifier.qza"] {
            let p = dir.join(name);
            fs::write(&p, b"").unwrap();
            paths.push(p);
        }
        let mut cfg = HybridConfig::new(
            paths[0].clone(),
            paths[1].clone(),
            paths[2].clone(),
            paths[3].clone(),
        );
        cfg.output_dir = dir.join("results");
        cfg
    }

    #[test]
    fn test_low_res_feature_goes_to_sklearn() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config_in(dir.path());
        let aligner = StubBlast(blast(&[("F1", FAMILY, "1.0"), ("F2", GENUS, "1.0")]));
        let filter = RecordingFilter::default();
        let sk = StubSklearn::new(sklearn(&[("F1", BACILLUS, "0.85")]));

        let results = run_hybrid_classification(&cfg, &aligner, &filter, &sk).unwrap();

        assert_eq!(*filter.requested.borrow(), vec!["F1".to_string()]);
        assert_eq!(results.total_features, 2);
        assert_eq!(results.high_resolution, 1);
        assert_eq!(results.low_resolution, 1);
        assert_eq!(results.secondary_classified(), 1);

        let f1: Vec<_> = results
            .table
            .rows
            .iter()
            .filter(|r| r.feature_id.as_deref() == Some("F1"))
            .collect();
        assert_eq!(f1.len(), 1);
        assert_eq!(f1[0].method, Some(Method::Sklearn));
        assert_eq!(f1[0].score, Some(0.85));

        let written = fs::read_to_string(results.output_path.unwrap()).unwrap();
        assert_eq!(
            written,
            format!(
                "Feature ID\tTaxon\tMethod\tConsensus/Confidence\n\
                 F2\t{GENUS}\tBLAST\t1.0\n\
                 F1\t{BACILLUS}\tsklearn\t0.85\n"
            )
        );
    }

    #[test]
    fn test_secondary_skipped_when_all_resolved() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config_in(dir.path());
        let aligner = StubBlast(blast(&[("a", GENUS, "1.0"), ("b", GENUS, "0.8")]));
        let filter = RecordingFilter::default();
        let sk = StubSklearn::new(sklearn(&[]));

        let results = classify_hybrid(&cfg, &aligner, &filter, &sk).unwrap();
        assert_eq!(*sk.calls.borrow(), 0);
        assert!(filter.requested.borrow().is_empty());
        assert!(results.secondary.is_none());
        assert_eq!(results.table.len(), 2);
        assert_eq!(results.table.count_method(Method::Blast), 2);
    }

    #[test]
    fn test_all_low_res_and_nothing_back() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config_in(dir.path());
        let aligner = StubBlast(blast(&[("a", FAMILY, "1.0"), ("b", "Unassigned", "1.0")]));
        let filter = RecordingFilter::default();
        let sk = StubSklearn::new(sklearn(&[]));

        let results = run_hybrid_classification(&cfg, &aligner, &filter, &sk).unwrap();
        assert_eq!(*sk.calls.borrow(), 1);
        assert!(results.table.is_empty());
        assert_eq!(
            fs::read_to_string(cfg.output_path()).unwrap(),
            "Feature ID\tTaxon\tMethod\tConsensus/Confidence\n"
        );
    }

    #[test]
    fn test_upstream_failure_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config_in(dir.path());
        let aligner = StubBlast(blast(&[("a", FAMILY, "1.0")]));
        let filter = RecordingFilter::default();

        let err = run_hybrid_classification(&cfg, &aligner, &filter, &FailingSklearn).unwrap_err();
        assert!(matches!(err, HybridError::Upstream { status: 1, .. }));
        assert!(!cfg.output_path().exists());
    }

    #[test]
    fn test_missing_input_fails_before_classification() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config_in(dir.path());
        cfg.classifier = dir.path().join("absent.qza");
        let aligner = StubBlast(blast(&[("a", FAMILY, "1.0")]));
        let filter = RecordingFilter::default();
        let sk = StubSklearn::new(sklearn(&[]));

        let err = run_hybrid_classification(&cfg, &aligner, &filter, &sk).unwrap_err();
        assert!(matches!(err, HybridError::MissingInput(_)));
        assert!(filter.requested.borrow().is_empty());
    }

    #[test]
    fn test_merge_exported_tables_drops_resolved_features() {
        let blast_tab = blast(&[("a", GENUS, "1.0"), ("b", FAMILY, "1.0")]);
        // sklearn was run on everything; only b should be taken from it
        let sk = sklearn(&[("a", BACILLUS, "0.99"), ("b", BACILLUS, "0.75")]);

        let results = merge_exported_tables(&blast_tab, Some(&sk));
        assert_eq!(results.table.len(), 2);
        assert_eq!(results.table.rows[0].method, Some(Method::Blast));
        assert_eq!(results.table.rows[1].feature_id.as_deref(), Some("b"));
        assert_eq!(results.table.rows[1].score, Some(0.75));
        assert!(results.summary().starts_with("2 features"));
    }

    #[test]
    fn test_merge_exported_tables_without_secondary() {
        let blast_tab = blast(&[("a", GENUS, "1.0"), ("b", FAMILY, "1.0")]);
        let results = merge_exported_tables(&blast_tab, None);
        assert_eq!(results.table.len(), 1);
        assert_eq!(results.low_resolution, 1);
        assert!(results.secondary.is_none());
    }
}
