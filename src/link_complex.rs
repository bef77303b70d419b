//! Link breakpoint records into candidate complex SV clusters
//!

use crate::breakpoint_record::{BreakpointRecord, SvType};
use crate::genome_slink::{GenomeNode, SlinkClusters, cluster_nodes_by};
use crate::int_range::{IntRange, get_int_range_distance};

#[derive(Clone, Debug)]
pub struct LinkSettings {
    /// Max gap between the breakpoint footprints of two linked records
    pub window: i64,

    /// Min fraction of each record's called samples which must be shared with the other record
    pub min_sample_overlap: f64,

    /// Min fraction of shared called samples for the record with the higher shared fraction
    pub max_sample_overlap: f64,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            window: 300,
            min_sample_overlap: 0.5,
            max_sample_overlap: 0.8,
        }
    }
}

/// Genomic footprints of a record on its primary chromosome
///
/// Interval types contribute their full span, breakends contribute a point at each breakend
/// found on the primary chromosome.
///
fn primary_footprints(record: &BreakpointRecord) -> Vec<IntRange> {
    let point = |pos: i64| IntRange::from_pair(pos, pos + 1);
    if record.is_interchromosomal() {
        vec![point(record.pos)]
    } else if record.svtype == SvType::Bnd {
        vec![point(record.pos), point(record.stop())]
    } else {
        let mut span = record.span();
        span.end += 1;
        vec![span]
    }
}

fn is_footprint_linked(r1: &BreakpointRecord, r2: &BreakpointRecord, window: i64) -> bool {
    if r1.chrom != r2.chrom {
        return false;
    }
    let f1 = primary_footprints(r1);
    let f2 = primary_footprints(r2);
    f1.iter()
        .any(|x| f2.iter().any(|y| get_int_range_distance(x, y) <= window))
}

/// Test whether two records are called in a sufficiently similar set of samples
///
/// Records without any called samples are not restricted by this test.
///
fn samples_overlap(r1: &BreakpointRecord, r2: &BreakpointRecord, settings: &LinkSettings) -> bool {
    let called1 = r1.called_sample_indices();
    let called2 = r2.called_sample_indices();
    if called1.is_empty() || called2.is_empty() {
        return true;
    }

    let shared = called1.iter().filter(|x| called2.contains(x)).count() as f64;
    let frac1 = shared / called1.len() as f64;
    let frac2 = shared / called2.len() as f64;
    let (low, high) = if frac1 < frac2 {
        (frac1, frac2)
    } else {
        (frac2, frac1)
    };
    low >= settings.min_sample_overlap && high >= settings.max_sample_overlap
}

/// Linkage criteria for complex SV candidates
///
/// Records are linked when their breakpoint footprints are within the link window, they are not
/// both CNVs, and they are called in overlapping samples.
///
pub fn is_complex_linked(
    r1: &BreakpointRecord,
    r2: &BreakpointRecord,
    settings: &LinkSettings,
) -> bool {
    if r1.is_cnv() && r2.is_cnv() {
        return false;
    }
    is_footprint_linked(r1, r2, settings.window) && samples_overlap(r1, r2, settings)
}

/// Return true if the cluster should be sent to complex SV resolution
///
/// Clusters with only CNV records have nothing to resolve, and are left in the input stream.
///
pub fn is_resolvable_cluster(cluster: &[BreakpointRecord]) -> bool {
    cluster.iter().any(|x| !x.is_cnv())
}

/// Lazily cluster a genome sorted record stream into complex SV candidates
///
pub fn link_complex_records<I>(
    records: I,
    settings: LinkSettings,
) -> SlinkClusters<BreakpointRecord, I::IntoIter, impl Fn(&BreakpointRecord, &BreakpointRecord) -> bool>
where
    I: IntoIterator<Item = BreakpointRecord>,
{
    let window = settings.window;
    cluster_nodes_by(records, window, move |r1: &BreakpointRecord, r2: &BreakpointRecord| {
        debug_assert!(r2.pos_a() >= r1.pos_a() || r1.chrom != r2.chrom);
        is_complex_linked(r1, r2, &settings)
    })
}
