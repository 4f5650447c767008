//src/fasta.rs

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use ahash::AHashSet;
use flate2::read::MultiGzDecoder;

use crate::engine::SequenceFilter;
use crate::error::Result;

/// A minimal representation of a representative sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct FastaRecord {
    pub id: String,
    pub header_line: String,
    pub seq: String,
}

/// Minimal FASTA reader that also supports .gz
pub fn read_fasta_records<P: AsRef<Path>>(path: P) -> Result<Vec<FastaRecord>> {
    let path = path.as_ref();
    let f = File::open(path)?;

    let is_gz = path
        .extension()
        .map(|ext| ext == "gz")
        .unwrap_or(false);

    let reader: Box<dyn BufRead> = if is_gz {
        Box::new(BufReader::new(MultiGzDecoder::new(f)))
    } else {
        Box::new(BufReader::new(f))
    };

    parse_fasta(reader)
}

pub fn parse_fasta<R: BufRead>(reader: R) -> Result<Vec<FastaRecord>> {
    let mut records = Vec::new();
    let mut current: Option<FastaRecord> = None;

    for line in reader.lines() {
        let line = line?;
        let line = line.trim_end();
        if let Some(header) = line.strip_prefix('>') {
            if let Some(done) = current.take() {
                records.push(done);
            }
            current = Some(FastaRecord {
                id: header.split_whitespace().next().unwrap_or("").to_string(),
                header_line: header.to_string(),
                seq: String::new(),
            });
        } else if let Some(rec) = current.as_mut() {
            // Multi-line sequences are joined
            rec.seq.push_str(line.trim());
        }
        // Text before the first header is ignored
    }
    if let Some(done) = current {
        records.push(done);
    }

    Ok(records)
}

/// Keep only records whose id is in `ids`, preserving file order.
pub fn filter_records<'a, S: AsRef<str>>(records: &'a [FastaRecord], ids: &[S]) -> Vec<&'a FastaRecord> {
    let wanted: AHashSet<&str> = ids.iter().map(|s| s.as_ref()).collect();
    records
        .iter()
        .filter(|r| wanted.contains(r.id.as_str()))
        .collect()
}

pub fn write_fasta<W: Write>(writer: W, records: &[&FastaRecord]) -> Result<()> {
    let mut out = BufWriter::new(writer);
    for rec in records {
        writeln!(out, ">{}\n{}", rec.header_line, rec.seq)?;
    }
    out.flush()?;
    Ok(())
}

/// Sequence filter over plain or gzipped FASTA files; the subset is
/// written to `output`.
pub struct FastaFilter {
    output: PathBuf,
}

impl FastaFilter {
    pub fn new<P: Into<PathBuf>>(output: P) -> Self {
        Self {
            output: output.into(),
        }
    }
}

impl SequenceFilter for FastaFilter {
    fn filter(&self, sequences: &Path, ids: &[String]) -> Result<PathBuf> {
        let records = read_fasta_records(sequences)?;
        let kept = filter_records(&records, ids);
        if kept.len() < ids.len() {
            log::warn!(
                "{} of {} requested features not found in {}",
                ids.len() - kept.len(),
                ids.len(),
                sequences.display()
            );
        }

        if let Some(parent) = self.output.parent() {
            std::fs::create_dir_all(parent)?;
        }
        write_fasta(File::create(&self.output)?, &kept)?;
        log::info!("Wrote {} sequences to {}", kept.len(), self.output.display());
        Ok(self.output.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;

    const FASTA: &str = ">asv1 sample=A\nACGT\nACGT\n>asv2\nTTTT\n>asv3\nGGGG\n";

    #[test]
    fn test_parse_multiline() {
        let recs = parse_fasta(FASTA.as_bytes()).unwrap();
        assert_eq!(recs.len(), 3);
        assert_eq!(recs[0].id, "asv1");
        assert_eq!(recs[0].header_line, "asv1 sample=A");
        assert_eq!(recs[0].seq, "ACGTACGT");
    }

    #[test]
    fn test_filter_preserves_order() {
        let recs = parse_fasta(FASTA.as_bytes()).unwrap();
        let kept = filter_records(&recs, &["asv3", "asv1", "missing"]);
        let ids: Vec<&str> = kept.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["asv1", "asv3"]);
    }

    #[test]
    fn test_gzip_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seqs.fasta.gz");
        let mut enc = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        enc.write_all(FASTA.as_bytes()).unwrap();
        enc.finish().unwrap();

        let recs = read_fasta_records(&path).unwrap();
        assert_eq!(recs.len(), 3);
        assert_eq!(recs[2].seq, "GGGG");
    }

    #[test]
    fn test_fasta_filter_writes_subset() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("seqs.fasta");
        std::fs::write(&input, FASTA).unwrap();

        let filter = FastaFilter::new(dir.path().join("out").join("subset.fasta"));
        let out = filter.filter(&input, &["asv2".to_string()]).unwrap();
        assert_eq!(std::fs::read_to_string(out).unwrap(), ">asv2\nTTTT\n");
    }
}
