//src/table.rs

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::Result;

/// Column name given to row labels when they are materialized without a name.
pub const DEFAULT_INDEX_NAME: &str = "index";

/// Prefix of QIIME metadata directive rows (`#q2:types`).
const DIRECTIVE_PREFIX: &str = "#q2:";

/// Row labels that have not been turned into a column yet.
#[derive(Debug, Clone, PartialEq)]
pub struct RowIndex {
    pub name: Option<String>,
    pub labels: Vec<String>,
}

/// A loosely-typed classification table as handed back by an external
/// classifier: named columns of optional string cells, plus optional row labels.
///
/// Column sets differ between classifiers, so nothing here assumes a schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassificationTable {
    pub index: Option<RowIndex>,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl ClassificationTable {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            index: None,
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row. Short rows are padded with nulls, long rows truncated.
    pub fn push_row<S: AsRef<str>>(&mut self, cells: impl IntoIterator<Item = Option<S>>) {
        let mut row: Vec<Option<String>> = cells
            .into_iter()
            .map(|c| c.map(|s| s.as_ref().to_string()))
            .collect();
        row.resize(self.columns.len(), None);
        self.rows.push(row);
    }

    /// Attach row labels, e.g. feature ids a classifier used as its index.
    pub fn with_index(mut self, name: Option<&str>, labels: Vec<String>) -> Self {
        self.index = Some(RowIndex {
            name: name.map(str::to_string),
            labels,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_position(name).is_some()
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .and_then(|c| c.as_deref())
    }

    /// Rename a column in place. Returns `false` if `from` does not exist.
    pub fn rename_column(&mut self, from: &str, to: &str) -> bool {
        match self.column_position(from) {
            Some(pos) => {
                self.columns[pos] = to.to_string();
                true
            }
            None => false,
        }
    }

    /// Move row labels into a leading column, named after the index
    /// (or `index` when unnamed). No-op when there are no row labels.
    pub fn reset_index(&mut self) {
        let Some(index) = self.index.take() else {
            return;
        };
        let name = index.name.unwrap_or_else(|| DEFAULT_INDEX_NAME.to_string());
        self.columns.insert(0, name);

        let mut labels = index.labels.into_iter();
        for row in &mut self.rows {
            row.insert(0, labels.next());
        }
    }

    /// Parse a tab-separated metadata table (e.g. an exported `taxonomy.tsv`).
    /// The first line is the header; `#q2:` directive rows and blank lines are
    /// skipped and empty cells become nulls.
    pub fn read_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let columns: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
        let mut table = ClassificationTable::new(columns);

        for record in rdr.records() {
            let record = record?;
            let first = record.get(0).unwrap_or("");
            if first.starts_with(DIRECTIVE_PREFIX) {
                continue;
            }
            if record.iter().all(|c| c.trim().is_empty()) {
                continue;
            }
            table.push_row(record.iter().map(|c| {
                if c.is_empty() {
                    None
                } else {
                    Some(c)
                }
            }));
        }

        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_exported_taxonomy() {
        let text = "Feature ID\tTaxon\tConsensus\n\
                    #q2:types\tcategorical\tnumeric\n\
                    asv1\tk__Bacteria;p__Firmicutes\t1.0\n\
                    asv2\tUnassigned\t\n";
        let table = ClassificationTable::from_reader(text.as_bytes()).unwrap();

        assert_eq!(table.columns, vec!["Feature ID", "Taxon", "Consensus"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(0, 1), Some("k__Bacteria;p__Firmicutes"));
        assert_eq!(table.cell(1, 2), None);
    }

    #[test]
    fn test_header_only_table() {
        let table = ClassificationTable::from_reader("Feature ID\tTaxon\tConfidence\n".as_bytes())
            .unwrap();
        assert!(table.is_empty());
        assert!(table.has_column("Confidence"));
    }

    #[test]
    fn test_short_rows_are_padded() {
        let text = "Feature ID\tTaxon\tConfidence\nasv1\tk__Bacteria\n";
        let table = ClassificationTable::from_reader(text.as_bytes()).unwrap();
        assert_eq!(table.rows[0].len(), 3);
        assert_eq!(table.cell(0, 2), None);
    }

    #[test]
    fn test_reset_index_unnamed() {
        let mut table = ClassificationTable::new(["Taxon"])
            .with_index(None, vec!["a".into(), "b".into()]);
        table.push_row([Some("t1")]);
        table.push_row([Some("t2")]);
        table.reset_index();

        assert!(table.index.is_none());
        assert_eq!(table.columns, vec!["index", "Taxon"]);
        assert_eq!(table.cell(1, 0), Some("b"));
        assert_eq!(table.cell(1, 1), Some("t2"));

        // A second reset has nothing left to move
        let before = table.clone();
        table.reset_index();
        assert_eq!(table, before);
    }

    #[test]
    fn test_rename_column() {
        let mut table = ClassificationTable::new(["Taxonomy"]);
        assert!(table.rename_column("Taxonomy", "Taxon"));
        assert!(!table.rename_column("Taxonomy", "Taxon"));
        assert!(table.has_column("Taxon"));
    }
}
