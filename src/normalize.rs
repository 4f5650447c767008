//src/normalize.rs

use crate::table::{ClassificationTable, DEFAULT_INDEX_NAME};
use crate::types::{
    CanonicalColumn, CanonicalRow, Method, FEATURE_ID_COLUMN, SCORE_COLUMN, TAXON_COLUMN,
};

/// Alternative taxonomy column name some classifier exports use.
const TAXONOMY_ALIAS: &str = "Taxonomy";

/// Identifier headers QIIME metadata accepts for the id column (compared
/// case-insensitively), plus the generic name given to a materialized index.
const FEATURE_ID_ALIASES: &[&str] = &[
    DEFAULT_INDEX_NAME,
    "feature id",
    "feature-id",
    "featureid",
    "id",
    "sample id",
    "sample-id",
    "sampleid",
    "#otu id",
    "#otuid",
    "#sample id",
    "#sampleid",
    "sample_name",
];

/// Classifier output mapped onto the canonical four-column shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedTable {
    pub rows: Vec<CanonicalRow>,
    /// Canonical columns the source table lacked and that were filled with nulls.
    pub synthesized: Vec<CanonicalColumn>,
}

impl NormalizedTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// True when the source had rows but no usable score column.
    pub fn lost_scores(&self) -> bool {
        !self.rows.is_empty() && self.synthesized.contains(&CanonicalColumn::Score)
    }
}

/// Map a classifier's raw table onto canonical rows stamped with `method`.
///
/// - row labels become a `Feature ID` column (renamed from `index` or any
///   QIIME id header if needed)
/// - `Taxonomy` is renamed to `Taxon` when `Taxon` is absent
/// - the method's native score column becomes `Consensus/Confidence`
///
/// Missing columns come back as nulls and are listed in
/// [`NormalizedTable::synthesized`]; this never fails.
pub fn normalize(raw: &ClassificationTable, method: Method) -> NormalizedTable {
    let mut table = raw.clone();
    table.reset_index();

    if !table.has_column(FEATURE_ID_COLUMN) {
        let alias = table
            .columns
            .iter()
            .find(|c| FEATURE_ID_ALIASES.contains(&c.to_lowercase().as_str()))
            .cloned();
        if let Some(alias) = alias {
            table.rename_column(&alias, FEATURE_ID_COLUMN);
        }
    }

    if !table.has_column(TAXON_COLUMN) {
        table.rename_column(TAXONOMY_ALIAS, TAXON_COLUMN);
    }

    if !table.has_column(SCORE_COLUMN) {
        table.rename_column(method.native_score_column(), SCORE_COLUMN);
    }

    let id_col = table.column_position(FEATURE_ID_COLUMN);
    let taxon_col = table.column_position(TAXON_COLUMN);
    let score_col = table.column_position(SCORE_COLUMN);

    let mut synthesized = Vec::new();
    if id_col.is_none() {
        synthesized.push(CanonicalColumn::FeatureId);
    }
    if taxon_col.is_none() {
        synthesized.push(CanonicalColumn::Taxon);
    }
    if score_col.is_none() {
        synthesized.push(CanonicalColumn::Score);
    }

    let text = |row: usize, col: Option<usize>| col.and_then(|c| table.cell(row, c));

    let rows: Vec<CanonicalRow> = (0..table.len())
        .map(|i| CanonicalRow {
            feature_id: text(i, id_col).map(str::to_string),
            taxon: text(i, taxon_col).map(str::to_string),
            method: Some(method),
            score: text(i, score_col).and_then(|s| s.trim().parse::<f64>().ok()),
        })
        .collect();

    if !rows.is_empty() && !synthesized.is_empty() {
        let names: Vec<&str> = synthesized.iter().map(|c| c.name()).collect();
        log::warn!(
            "{} output is missing column(s) {:?}; {} row(s) kept with null values (columns: {:?})",
            method,
            names,
            rows.len(),
            table.columns
        );
    }

    NormalizedTable { rows, synthesized }
}
