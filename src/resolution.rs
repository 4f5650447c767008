//src/resolution.rs

/// Separator between rank levels in a taxonomy string.
pub const RANK_DELIMITER: char = ';';

/// Position of the genus level (k, p, c, o, f, g, s).
pub const GENUS_INDEX: usize = 5;

/// Sentinel written by the classifiers when nothing was assigned.
pub const UNASSIGNED: &str = "Unassigned";

/// Suffix of a rank marker with no value, e.g. `g__`.
const EMPTY_RANK_SUFFIX: &str = "__";

/// Returns `true` when a taxonomy call stops short of genus level.
///
/// Low resolution means any of:
///   - missing label or the `Unassigned` sentinel
///   - fewer than six `;`-separated levels
///   - an empty genus level, or one that is only a rank marker (`g__`)
///
/// Deeper calls (species level and below) are never downgraded; only the
/// genus level is inspected.
pub fn is_low_resolution(taxon: Option<&str>) -> bool {
    let taxon = match taxon {
        Some(t) if t != UNASSIGNED => t,
        _ => return true,
    };

    let levels: Vec<&str> = taxon.split(RANK_DELIMITER).collect();
    if levels.len() <= GENUS_INDEX {
        return true;
    }

    let genus = levels[GENUS_INDEX];
    genus.is_empty() || genus.ends_with(EMPTY_RANK_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPTY_GENUS: &str =
        "k__Bacteria;p__Firmicutes;c__Bacilli;o__Lactobacillales;f__Lactobacillaceae;g__";
    const GENUS: &str =
        "k__Bacteria;p__Firmicutes;c__Bacilli;o__Lactobacillales;f__Lactobacillaceae;g__Lactobacillus";

    #[test]
    fn test_empty_genus_is_low_resolution() {
        assert!(is_low_resolution(Some(EMPTY_GENUS)));
    }

    #[test]
    fn test_genus_call_is_resolved() {
        assert!(!is_low_resolution(Some(GENUS)));
    }

    #[test]
    fn test_unassigned_and_missing() {
        assert!(is_low_resolution(Some("Unassigned")));
        assert!(is_low_resolution(None));
    }

    #[test]
    fn test_short_lineages() {
        assert!(is_low_resolution(Some("k__Bacteria;p__Firmicutes;c__Bacilli")));
        assert!(is_low_resolution(Some("k__Bacteria")));
        assert!(is_low_resolution(Some("")));
        // Five levels: genus rank absent entirely
        assert!(is_low_resolution(Some(
            "k__Bacteria;p__Firmicutes;c__Bacilli;o__Lactobacillales;f__Lactobacillaceae"
        )));
    }

    #[test]
    fn test_blank_genus_level() {
        assert!(is_low_resolution(Some("k__A;p__B;c__C;o__D;f__E;")));
        assert!(is_low_resolution(Some("k__A;p__B;c__C;o__D;f__E;;s__F")));
    }

    #[test]
    fn test_species_level_is_resolved() {
        let species = format!("{};s__Lactobacillus_casei", GENUS);
        assert!(!is_low_resolution(Some(&species)));
        // An empty species level does not downgrade a genus call
        let blank_species = format!("{};s__", GENUS);
        assert!(!is_low_resolution(Some(&blank_species)));
    }

    #[test]
    fn test_unprefixed_levels() {
        // SILVA-style lineages without rank markers still count by position
        assert!(!is_low_resolution(Some(
            "Bacteria;Firmicutes;Bacilli;Lactobacillales;Lactobacillaceae;Lactobacillus"
        )));
    }
}
