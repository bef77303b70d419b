use std::collections::HashMap;

use bio::data_structures::interval_tree::{IntervalTree, IntervalTreeIterator};
use camino::Utf8Path;
use log::info;
use unwrap::unwrap;

use crate::int_range::IntRange;

/// A set of chromosome regions which can be efficiently queried
///
#[derive(Clone)]
pub struct ChromRegions<T> {
    regions: IntervalTree<i64, T>,
}

impl<T> ChromRegions<T> {
    pub fn new() -> Self {
        Self {
            regions: IntervalTree::new(),
        }
    }

    /// Return true if the start-end range intersects with any regions stored in this object
    ///
    pub fn intersect(&self, start: i64, end: i64) -> bool {
        self.regions.find(start..end).next().is_some()
    }

    pub fn find_overlaps(&self, start: i64, end: i64) -> IntervalTreeIterator<'_, i64, T> {
        self.regions.find(start..end)
    }

    /// Add region value
    ///
    /// Adds a value for a particular region, regions are not collapsed
    ///
    pub fn add_region_value(&mut self, start: i64, end: i64, value: T) {
        self.regions.insert(start..end, value);
    }
}

/// Regions for all chromosomes, each region holding a value of type T
///
#[derive(Clone)]
pub struct GenomeRegions<T> {
    pub chroms: HashMap<String, ChromRegions<T>>,
}

impl<T> GenomeRegions<T> {
    pub fn new() -> Self {
        Self {
            chroms: HashMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.chroms.is_empty()
    }

    /// Add a region with a value
    /// # Arguments
    /// * `chrom` - the contig string
    /// * `start` - the start coordinate (included)
    /// * `end` - the end coordinates (excluded)
    /// * `value` - the value associated with the region
    pub fn add_region_value(&mut self, chrom: &str, start: i64, end: i64, value: T) {
        self.chroms
            .entry(chrom.to_owned())
            .or_insert_with(ChromRegions::new)
            .add_region_value(start, end, value);
    }

    /// Return an iterator over any overlapping regions. None if the contig does not exist.
    ///
    pub fn find_overlaps(
        &self,
        chrom: &str,
        start: i64,
        end: i64,
    ) -> Option<IntervalTreeIterator<'_, i64, T>> {
        self.chroms
            .get(chrom)
            .map(|chrom_regions| chrom_regions.find_overlaps(start, end))
    }

    /// Return true if the start-end range on `chrom` intersects any region
    ///
    pub fn intersect(&self, chrom: &str, start: i64, end: i64) -> bool {
        self.chroms
            .get(chrom)
            .is_some_and(|x| x.intersect(start, end))
    }

    pub fn intersect_pos(&self, chrom: &str, pos: i64) -> bool {
        self.intersect(chrom, pos, pos + 1)
    }

    /// Fraction of the start-end range covered by the union of all regions
    ///
    /// Empty query ranges have zero coverage.
    ///
    pub fn coverage_fraction(&self, chrom: &str, start: i64, end: i64) -> f64 {
        if end <= start {
            return 0.0;
        }
        let Some(overlaps) = self.find_overlaps(chrom, start, end) else {
            return 0.0;
        };

        let mut clipped = overlaps
            .map(|x| {
                let interval = x.interval();
                IntRange::from_pair(
                    std::cmp::max(interval.start, start),
                    std::cmp::min(interval.end, end),
                )
            })
            .collect::<Vec<_>>();
        clipped.sort();

        let mut covered = 0;
        let mut current: Option<IntRange> = None;
        for range in clipped {
            match current.as_mut() {
                Some(x) if range.start <= x.end => x.merge(&range),
                _ => {
                    if let Some(x) = current.take() {
                        covered += x.size();
                    }
                    current = Some(range);
                }
            }
        }
        if let Some(x) = current {
            covered += x.size();
        }

        covered as f64 / (end - start) as f64
    }
}

impl GenomeRegions<()> {
    /// Read a bed file as a region set without values
    ///
    pub fn from_bed(filename: &Utf8Path, label: &str) -> Self {
        let mut regions = Self::new();
        for_each_bed_line(filename, label, |chrom, start, end, _| {
            regions.add_region_value(chrom, start, end, ());
        });
        regions
    }
}

/// Chromosome arm lookup
///
/// Each region value is the arm label, taken from the first character of the band name in
/// column 4 of the cytoband bed file.
///
pub type ChromArms = GenomeRegions<char>;

impl GenomeRegions<char> {
    pub fn from_cytoband_bed(filename: &Utf8Path) -> Self {
        let label = "cytoband";
        let mut regions = Self::new();
        for_each_bed_line(filename, label, |chrom, start, end, extra_fields| {
            let band = unwrap!(
                extra_fields.first(),
                "Missing band name for {label} region {chrom}:{start}-{end} in file: '{filename}'"
            );
            let arm = unwrap!(
                band.chars().next(),
                "Empty band name for {label} region {chrom}:{start}-{end} in file: '{filename}'"
            );
            regions.add_region_value(chrom, start, end, arm);
        });
        regions
    }

    /// Get the arm of the 1-indexed position `pos`
    ///
    pub fn get_arm(&self, chrom: &str, pos: i64) -> Option<char> {
        self.find_overlaps(chrom, pos - 1, pos)?
            .next()
            .map(|x| *x.data())
    }
}

/// Run `f` on every line of a (possibly bgzf-compressed) bed file
///
/// `f` is called with the chromosome, start, end and any further columns on the line. Header
/// and comment lines are skipped.
///
fn for_each_bed_line<F>(filename: &Utf8Path, label: &str, mut f: F)
where
    F: FnMut(&str, i64, i64, &[&str]),
{
    use rust_htslib::bgzf;
    use std::io::Read;

    info!("Reading {label} regions from bed file: '{filename}'");

    let mut reader = unwrap!(
        bgzf::Reader::from_path(filename),
        "Unable to open {label} regions file: '{filename}'"
    );

    let mut content = String::new();
    unwrap!(
        reader.read_to_string(&mut content),
        "Can't parse text from {label} regions file: '{filename}'"
    );

    for line in content.lines() {
        if line.is_empty()
            || line.starts_with('#')
            || line.starts_with("track")
            || line.starts_with("browser")
        {
            continue;
        }

        let words = line.split('\t').collect::<Vec<_>>();
        assert!(
            words.len() >= 3,
            "Unexpected {label} bed line format in file '{filename}': '{line}'"
        );
        let chrom = words[0];
        let start = unwrap!(
            words[1].parse::<i64>(),
            "Can't parse start position from {label} bed line in file '{filename}': '{line}'"
        );
        let end = unwrap!(
            words[2].parse::<i64>(),
            "Can't parse end position from {label} bed line in file '{filename}': '{line}'"
        );
        f(chrom, start, end, &words[3..]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersect() {
        let mut regions = GenomeRegions::new();
        regions.add_region_value("chr1", 100, 101, ());
        assert!(regions.intersect_pos("chr1", 100));
        assert!(!regions.intersect_pos("chr1", 99));
        assert!(!regions.intersect_pos("chr1", 101));
        assert!(!regions.intersect_pos("chr2", 100));
    }

    #[test]
    fn test_find_overlaps() {
        let mut regions = GenomeRegions::new();
        regions.add_region_value("chr1", 10, 20, 12u8);
        regions.add_region_value("chr1", 19, 30, 10u8);

        assert_eq!(regions.find_overlaps("chr1", 9, 10).unwrap().count(), 0);
        assert_eq!(regions.find_overlaps("chr1", 19, 20).unwrap().count(), 2);
        assert_eq!(regions.find_overlaps("chr1", 30, 31).unwrap().count(), 0);
        assert!(regions.find_overlaps("chr2", 0, 100).is_none());
    }

    #[test]
    fn test_get_arm() {
        let mut arms = ChromArms::new();
        arms.add_region_value("chr1", 0, 1000, 'p');
        arms.add_region_value("chr1", 1000, 2000, 'q');

        assert_eq!(arms.get_arm("chr1", 1), Some('p'));
        assert_eq!(arms.get_arm("chr1", 1000), Some('p'));
        assert_eq!(arms.get_arm("chr1", 1001), Some('q'));
        assert_eq!(arms.get_arm("chr1", 5000), None);
        assert_eq!(arms.get_arm("chr2", 10), None);
    }

    #[test]
    fn test_coverage_fraction() {
        let mut regions = GenomeRegions::new();
        regions.add_region_value("chr1", 100, 200, ());
        regions.add_region_value("chr1", 150, 250, ());
        regions.add_region_value("chr1", 300, 350, ());

        // Overlapping regions are only counted once
        approx::assert_ulps_eq!(
            regions.coverage_fraction("chr1", 100, 300) as f32,
            0.75_f32,
            max_ulps = 4
        );
        approx::assert_ulps_eq!(
            regions.coverage_fraction("chr1", 0, 400) as f32,
            0.5_f32,
            max_ulps = 4
        );
        approx::assert_ulps_eq!(
            regions.coverage_fraction("chr2", 100, 300) as f32,
            0.0_f32,
            max_ulps = 4
        );
        approx::assert_ulps_eq!(
            regions.coverage_fraction("chr1", 200, 200) as f32,
            0.0_f32,
            max_ulps = 4
        );
    }
}
