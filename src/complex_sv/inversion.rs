//! Resolve an inversion breakpoint pair into a simple or complex inversion
//!

use itertools::Itertools;
use log::debug;

use super::cluster_type::ClusterPartition;
use super::{ClassifierSettings, RecordUpdate, Resolution};
use crate::breakpoint_record::{BreakpointRecord, Strands, SvType};
use crate::genome_regions::GenomeRegions;
use crate::int_range::{IntRange, get_recip_overlap};

const UNKNOWN_INVERSION_TYPE: &str = "UNK";

/// Classification of the sequence change between the FF and RR breakpoints on one side of the
/// inversion
///
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Flank {
    /// Breakpoints are close enough to be treated as a single junction
    Clean,

    /// Deleted flank, optionally with the index of the confirming DEL record
    Del(Option<usize>),

    /// Duplicated flank, with the index of the confirming DUP record
    Dup(usize),

    /// Duplicated flank geometry without a confirming DUP record
    UnconfirmedDup,
}

impl Flank {
    fn label(&self) -> &'static str {
        match self {
            Flank::Del(_) => "del",
            Flank::Dup(_) => "dup",
            _ => "",
        }
    }

    fn cnv_index(&self) -> Option<usize> {
        match self {
            Flank::Del(x) => *x,
            Flank::Dup(x) => Some(*x),
            _ => None,
        }
    }
}

/// Classify one inversion flank
///
/// * `dist` - RR breakend position minus FF breakend position on this flank, positive values
///   indicate a deletion between the breakends
///
fn classify_flank(
    chrom: &str,
    dist: i64,
    range: IntRange,
    cnvs: &[&BreakpointRecord],
    settings: &ClassifierSettings,
) -> Flank {
    if dist.abs() < settings.min_bkpt_cnv_size {
        return Flank::Clean;
    }

    let flank_svtype = if dist > 0 { SvType::Del } else { SvType::Dup };
    let confirming_cnv = cnvs.iter().position(|x| {
        x.svtype == flank_svtype
            && x.chrom == chrom
            && get_recip_overlap(&x.span(), &range) >= settings.min_cnv_recip_overlap
    });

    match (flank_svtype, confirming_cnv) {
        (SvType::Del, x) => Flank::Del(x),
        (_, Some(x)) => Flank::Dup(x),
        (_, None) => Flank::UnconfirmedDup,
    }
}

/// Classify an inversion from its breakpoints and any CNVs in the same cluster
///
/// Returns the complex type label, and the indexes of all CNVs which confirm a flank.
///
fn classify_complex_inversion(
    ff: &BreakpointRecord,
    rr: &BreakpointRecord,
    cnvs: &[&BreakpointRecord],
    settings: &ClassifierSettings,
) -> (String, Vec<usize>) {
    if ff.chrom != rr.chrom || !ff.span().intersect_range(&rr.span()) {
        return (UNKNOWN_INVERSION_TYPE.to_string(), Vec::new());
    }

    let flank5 = classify_flank(
        &ff.chrom,
        rr.pos - ff.pos,
        IntRange::from_span(ff.pos, rr.pos),
        cnvs,
        settings,
    );
    let flank3 = classify_flank(
        &ff.chrom,
        rr.stop() - ff.stop(),
        IntRange::from_span(ff.stop(), rr.stop()),
        cnvs,
        settings,
    );

    match (flank5, flank3) {
        (Flank::UnconfirmedDup, Flank::Clean) => ("DUP5/INS3".to_string(), Vec::new()),
        (Flank::Clean, Flank::UnconfirmedDup) => ("DUP3/INS5".to_string(), Vec::new()),
        (Flank::UnconfirmedDup, _) | (_, Flank::UnconfirmedDup) => {
            (UNKNOWN_INVERSION_TYPE.to_string(), Vec::new())
        }
        (f5, f3) => {
            let cpx_type = format!("{}INV{}", f5.label(), f3.label());
            let cnv_indexes = [f5.cnv_index(), f3.cnv_index()]
                .into_iter()
                .flatten()
                .unique()
                .collect();
            (cpx_type, cnv_indexes)
        }
    }
}

/// Describe the sequence segments of a complex inversion as '<TYPE>_<chrom>:<start>-<end>'
/// intervals in 5' to 3' order
///
fn make_inversion_intervals(
    ff: &BreakpointRecord,
    rr: &BreakpointRecord,
    cpx_type: &str,
) -> Vec<String> {
    let chrom = &ff.chrom;
    let interval = |svtype: &str, start: i64, end: i64| format!("{svtype}_{chrom}:{start}-{end}");

    let mut intervals = Vec::new();
    if cpx_type.starts_with("del") {
        intervals.push(interval("DEL", ff.pos, rr.pos));
    } else if cpx_type.starts_with("dup") {
        intervals.push(interval("DUP", rr.pos, ff.pos));
    }

    intervals.push(interval("INV", rr.pos, ff.stop()));

    if cpx_type.ends_with("del") {
        intervals.push(interval("DEL", ff.stop(), rr.stop()));
    } else if cpx_type.ends_with("dup") {
        intervals.push(interval("DUP", rr.stop(), ff.stop()));
    }
    intervals
}

/// Resolve a CANDIDATE_INVERSION cluster
///
/// Only the two inversion breakpoints and any CNVs confirming an inversion flank become members
/// of the resolved variant.
///
pub fn resolve_inversion(
    records: &[BreakpointRecord],
    settings: &ClassifierSettings,
    mei_regions: &GenomeRegions<()>,
) -> Resolution {
    let partition = ClusterPartition::new(records);
    assert_eq!(partition.inversions.len(), 2);
    let (inv1, inv2) = (partition.inversions[0], partition.inversions[1]);

    let (ff, rr) = match (inv1.strands, inv2.strands) {
        (Some(Strands::PlusPlus), Some(Strands::MinusMinus)) => (inv1, inv2),
        (Some(Strands::MinusMinus), Some(Strands::PlusPlus)) => (inv2, inv1),
        _ => {
            debug!(
                "Inversion pair without ++/-- strands treated as unresolved: {} {}",
                inv1.id, inv2.id
            );
            return Resolution::Unresolved {
                cpx_type: UNKNOWN_INVERSION_TYPE.to_string(),
                members: vec![inv1.clone(), inv2.clone()],
            };
        }
    };

    let (mut cpx_type, cnv_indexes) =
        classify_complex_inversion(ff, rr, &partition.cnvs, settings);

    let mut members = vec![ff.clone(), rr.clone()];
    members.extend(cnv_indexes.iter().map(|&i| partition.cnvs[i].clone()));

    if cpx_type == UNKNOWN_INVERSION_TYPE {
        return Resolution::Unresolved { cpx_type, members };
    }

    let is_insertion = cpx_type.contains("INS");
    if is_insertion {
        //   C B   A D
        // -->|<----|-->
        let (source, sink) = if cpx_type == "DUP5/INS3" {
            (
                IntRange::from_pair(rr.pos, ff.pos),
                IntRange::from_pair(ff.stop(), rr.stop()),
            )
        } else {
            (
                IntRange::from_pair(rr.stop(), ff.stop()),
                IntRange::from_pair(ff.pos, rr.pos),
            )
        };

        let mei_coverage = mei_regions.coverage_fraction(&ff.chrom, source.start, source.end);
        if mei_coverage >= settings.min_mei_coverage {
            let inserted_side = cpx_type.split('/').nth(1).unwrap_or_default();
            cpx_type = format!("MEI_{inserted_side}");
        }

        let mut update = RecordUpdate::new(SvType::Ins, Some(cpx_type));
        update.chrom = Some(ff.chrom.clone());
        update.chr2 = Some(ff.chrom.clone());
        update.pos = Some(sink.start);
        update.end = Some(sink.end);
        update.svlen = Some(source.size().abs());
        update.source = Some(format!(
            "INV_{}:{}-{}",
            ff.chrom, source.start, source.end
        ));
        Resolution::Resolved { update, members }
    } else {
        let svtype = if cpx_type == "INV" {
            SvType::Inv
        } else {
            SvType::Cpx
        };
        let start = std::cmp::min(ff.pos, rr.pos);
        let end = std::cmp::max(ff.stop(), rr.stop());

        let mut update = RecordUpdate::new(svtype, Some(cpx_type.clone()));
        update.chrom = Some(ff.chrom.clone());
        update.chr2 = Some(ff.chrom.clone());
        update.pos = Some(start);
        update.end = Some(end);
        update.svlen = Some(end - start);
        update.cpx_intervals = make_inversion_intervals(ff, rr, &cpx_type);
        Resolution::Resolved { update, members }
    }
}
