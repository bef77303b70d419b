use std::fmt;

/// A simple type for integer ranges
///
/// All ranges follow the bed file range convention: [start,end)
///
/// Breakpoint records carry VCF-style POS/END pairs, which are converted here with `from_span`
/// so that every interval comparison in the resolver uses the same convention.
///
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd)]
pub struct IntRange {
    pub start: i64,
    pub end: i64,
}

impl IntRange {
    pub fn from_pair(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// Build a range from two coordinates given in either order
    ///
    pub fn from_span(a: i64, b: i64) -> Self {
        Self {
            start: std::cmp::min(a, b),
            end: std::cmp::max(a, b),
        }
    }

    pub fn size(&self) -> i64 {
        self.end - self.start
    }

    /// Return true if the ranges intersect (adjacency does not count)
    ///
    pub fn intersect_range(&self, other: &IntRange) -> bool {
        other.end > self.start && other.start < self.end
    }

    pub fn merge(&mut self, other: &IntRange) {
        if other.start < self.start {
            self.start = other.start;
        }
        if other.end > self.end {
            self.end = other.end;
        }
    }
}

impl fmt::Debug for IntRange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}-{})", self.start, self.end)
    }
}

/// Get the distance between 2 ranges
///
///    [---------)            [-----------)
///        R1    -------------     R2
///                R1/R2 dist
///
/// The distance is 0 if the ranges intersect or are adjacent
///
pub fn get_int_range_distance(ir1: &IntRange, ir2: &IntRange) -> i64 {
    use std::cmp::max;
    max(max(ir2.start - ir1.end, ir1.start - ir2.end), 0)
}

pub fn get_overlap_range(r1: &IntRange, r2: &IntRange) -> Option<IntRange> {
    if !r1.intersect_range(r2) {
        return None;
    }
    Some(IntRange {
        start: std::cmp::max(r1.start, r2.start),
        end: std::cmp::min(r1.end, r2.end),
    })
}

/// Reciprocal overlap of two ranges
///
/// This is the overlap size divided by the larger of the two range sizes, which is the minimum
/// over both ranges of the fraction covered by the other range. Empty ranges are treated as
/// size 1 so that two identical point ranges have an overlap of 1.
///
pub fn get_recip_overlap(r1: &IntRange, r2: &IntRange) -> f64 {
    let r1_end = std::cmp::max(r1.end, r1.start + 1);
    let r2_end = std::cmp::max(r2.end, r2.start + 1);

    let olap = std::cmp::max(
        std::cmp::min(r1_end, r2_end) - std::cmp::max(r1.start, r2.start),
        0,
    );
    let span = std::cmp::max(r1_end - r1.start, r2_end - r2.start);

    olap as f64 / span as f64
}
