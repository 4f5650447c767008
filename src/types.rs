//src/types.rs

use std::fmt;

/// Canonical column names of the hybrid taxonomy table, in output order.
pub const FEATURE_ID_COLUMN: &str = "Feature ID";
pub const TAXON_COLUMN: &str = "Taxon";
pub const METHOD_COLUMN: &str = "Method";
pub const SCORE_COLUMN: &str = "Consensus/Confidence";

pub const CANONICAL_COLUMNS: [&str; 4] =
    [FEATURE_ID_COLUMN, TAXON_COLUMN, METHOD_COLUMN, SCORE_COLUMN];

/// Which classifier produced a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// Consensus BLAST (alignment-based, high specificity)
    Blast,
    /// Pre-trained naive Bayes classifier (fallback)
    Sklearn,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Blast => "BLAST",
            Method::Sklearn => "sklearn",
        }
    }

    /// Name of the score column the method reports natively.
    pub fn native_score_column(&self) -> &'static str {
        match self {
            Method::Blast => "Consensus",
            Method::Sklearn => "Confidence",
        }
    }

    pub fn parse(s: &str) -> Option<Method> {
        match s {
            "BLAST" => Some(Method::Blast),
            "sklearn" => Some(Method::Sklearn),
            _ => None,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the four canonical columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanonicalColumn {
    FeatureId,
    Taxon,
    Method,
    Score,
}

impl CanonicalColumn {
    pub fn name(&self) -> &'static str {
        match self {
            CanonicalColumn::FeatureId => FEATURE_ID_COLUMN,
            CanonicalColumn::Taxon => TAXON_COLUMN,
            CanonicalColumn::Method => METHOD_COLUMN,
            CanonicalColumn::Score => SCORE_COLUMN,
        }
    }
}

/// A structured representation of one row of the hybrid taxonomy table.
/// Any field may be null when the source table lacked the column.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRow {
    pub feature_id: Option<String>,
    pub taxon: Option<String>,
    pub method: Option<Method>,
    pub score: Option<f64>,
}

impl CanonicalRow {
    pub fn new(feature_id: &str, taxon: Option<&str>, method: Method, score: Option<f64>) -> Self {
        Self {
            feature_id: Some(feature_id.to_string()),
            taxon: taxon.map(str::to_string),
            method: Some(method),
            score,
        }
    }
}

/// Render a score the way the exported QIIME tables print floats:
/// integral values keep one decimal ("1.0"), everything else is shortest form.
pub fn format_score(score: f64) -> String {
    if score.is_finite() && score.fract() == 0.0 {
        format!("{:.1}", score)
    } else {
        format!("{}", score)
    }
}
