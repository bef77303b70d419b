use std::cmp::Ordering;
use std::collections::HashMap;

#[derive(Clone, Default)]
pub struct ChromInfo {
    pub label: String,

    /// Chromosome length, or zero if no length was given in the VCF header
    pub length: u64,
}

/// Contig rank table
///
/// The index of each chromosome in `data` defines its sort rank for all genomic ordering in the
/// resolved output.
///
#[derive(Clone, Default)]
pub struct ChromList {
    pub data: Vec<ChromInfo>,
    pub label_to_index: HashMap<String, usize>,
}

impl ChromList {
    /// Add a new chromosome, if the label is already present the existing rank is kept
    ///
    pub fn add_chrom(&mut self, label: &str, length: u64) {
        if self.label_to_index.contains_key(label) {
            return;
        }
        self.label_to_index
            .insert(label.to_string(), self.data.len());
        self.data.push(ChromInfo {
            label: label.to_string(),
            length,
        });
    }

    pub fn rank(&self, label: &str) -> Option<usize> {
        self.label_to_index.get(label).copied()
    }

    /// Compare two chromosomes by rank
    ///
    /// Chromosomes missing from the table sort after all ranked chromosomes, and are ordered
    /// lexically among themselves.
    ///
    pub fn compare_chroms(&self, chrom1: &str, chrom2: &str) -> Ordering {
        if chrom1 == chrom2 {
            return Ordering::Equal;
        }
        match (self.rank(chrom1), self.rank(chrom2)) {
            (Some(r1), Some(r2)) => r1.cmp(&r2),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => chrom1.cmp(chrom2),
        }
    }

    /// Compare two genome positions by chromosome rank, then position
    ///
    pub fn compare_pos(&self, chrom1: &str, pos1: i64, chrom2: &str, pos2: i64) -> Ordering {
        self.compare_chroms(chrom1, chrom2).then(pos1.cmp(&pos2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_chroms() {
        let mut chrom_list = ChromList::default();
        chrom_list.add_chrom("chr2", 100);
        chrom_list.add_chrom("chr10", 100);
        chrom_list.add_chrom("chr2", 500);

        assert_eq!(chrom_list.data.len(), 2);
        assert_eq!(chrom_list.data[0].length, 100);

        // Rank order rather than lexical order
        assert_eq!(chrom_list.compare_chroms("chr2", "chr10"), Ordering::Less);

        // Unranked chromosomes sort last
        assert_eq!(chrom_list.compare_chroms("chrUn", "chr10"), Ordering::Greater);
        assert_eq!(chrom_list.compare_chroms("chrA", "chrB"), Ordering::Less);

        assert_eq!(
            chrom_list.compare_pos("chr10", 5, "chr10", 20),
            Ordering::Less
        );
    }
}
