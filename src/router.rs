//src/router.rs

use crate::normalize::normalize;
use crate::resolution::is_low_resolution;
use crate::table::ClassificationTable;
use crate::types::{CanonicalRow, Method};

/// Alignment results split by taxonomic resolution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoutedResults {
    /// Genus-level (or deeper) BLAST calls, kept as final rows.
    pub high_res: Vec<CanonicalRow>,
    /// Features whose BLAST call needs a second opinion, in input order.
    pub low_res_ids: Vec<String>,
}

impl RoutedResults {
    pub fn needs_secondary(&self) -> bool {
        !self.low_res_ids.is_empty()
    }

    pub fn total(&self) -> usize {
        self.high_res.len() + self.low_res_ids.len()
    }
}

/// Partition a BLAST consensus table into kept rows and feature ids that
/// must be reclassified.
///
/// Every input row lands on exactly one side. A low-resolution row with no
/// feature id cannot be requested from the second classifier, so it stays
/// with the BLAST rows.
pub fn route(alignment: &ClassificationTable) -> RoutedResults {
    let normalized = normalize(alignment, Method::Blast);
    let mut routed = RoutedResults::default();

    for row in normalized.rows {
        if !is_low_resolution(row.taxon.as_deref()) {
            routed.high_res.push(row);
            continue;
        }
        match row.feature_id {
            Some(id) => routed.low_res_ids.push(id),
            None => {
                log::warn!(
                    "Low-resolution BLAST call without a feature id kept as is: {:?}",
                    row.taxon
                );
                routed.high_res.push(row);
            }
        }
    }

    log::debug!(
        "Routed {} features: {} high resolution, {} low resolution",
        routed.total(),
        routed.high_res.len(),
        routed.low_res_ids.len()
    );
    routed
}
