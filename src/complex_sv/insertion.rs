//! Resolve insertions signaled by breakend pairs, and pass through resolved insertion calls
//!

use strum::Display;

use super::cluster_type::{ClusterPartition, ClusterType};
use super::translocation::get_plus_minus;
use super::{ClassifierSettings, RecordUpdate, Resolution};
use crate::breakpoint_record::{BreakpointRecord, SvType};

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum InsertionClass {
    /// Sequence from the B breakends is inserted at the A breakends
    #[strum(serialize = "INS_B2A")]
    B2A,

    /// Sequence from the A breakends is inserted at the B breakends
    #[strum(serialize = "INS_A2B")]
    A2B,

    #[strum(serialize = "INS_UNCLASSIFIED")]
    Unclassified,
}

/// Classify a pair of intrachromosomal breakends as an insertion
///
pub fn classify_insertion(
    plus: &BreakpointRecord,
    minus: &BreakpointRecord,
    mh_buffer: i64,
) -> InsertionClass {
    let greater = |p1: i64, p2: i64| p1 > p2 - mh_buffer;

    let (plus_a, plus_b) = (plus.pos, plus.stop());
    let (minus_a, minus_b) = (minus.pos, minus.stop());

    if greater(minus_a, plus_a) && greater(minus_b, plus_b) {
        InsertionClass::B2A
    } else if greater(plus_a, minus_a) && greater(plus_b, minus_b) {
        InsertionClass::A2B
    } else {
        InsertionClass::Unclassified
    }
}

/// Resolve a CANDIDATE_INSERTION cluster
///
pub fn resolve_breakend_insertion(
    records: &[BreakpointRecord],
    settings: &ClassifierSettings,
) -> Resolution {
    let partition = ClusterPartition::new(records);
    assert_eq!(partition.breakends.len(), 2);
    assert!(partition.insertions.is_empty());
    let (plus, minus) = get_plus_minus(partition.breakends[0], partition.breakends[1]);
    let members = records.to_vec();

    let class = classify_insertion(plus, minus, settings.mh_buffer);
    let (sink_start, sink_end, source_start, source_end) = match class {
        InsertionClass::B2A => (plus.pos, minus.pos, plus.stop(), minus.stop()),
        InsertionClass::A2B => (minus.stop(), plus.stop(), minus.pos, plus.pos),
        InsertionClass::Unclassified => {
            return Resolution::Unresolved {
                cpx_type: class.to_string(),
                members,
            };
        }
    };

    // Large deletions at the insertion site are not reported as insertions
    if sink_end - sink_start >= settings.max_insertion_sink_size {
        return Resolution::Unresolved {
            cpx_type: ClusterType::CandidateInsertion.to_string(),
            members,
        };
    }

    let chrom = &plus.chrom;
    let mut update = RecordUpdate::new(SvType::Ins, Some(class.to_string()));
    update.source = Some(format!("INS_{chrom}:{source_start}-{source_end}"));
    update.chrom = Some(chrom.clone());
    update.pos = Some(sink_start);
    update.end = Some(sink_end);
    update.chr2 = Some(chrom.clone());
    update.svlen = Some((source_end - source_start).abs());

    Resolution::Resolved { update, members }
}

/// Resolve a RESOLVED_INSERTION cluster
///
/// A lone insertion is reported as-is with its ALT symbol as the complex type, and a lone
/// duplication without breakends is reported as a duplication.
///
pub fn resolve_simple_insertion(records: &[BreakpointRecord]) -> Resolution {
    let partition = ClusterPartition::new(records);
    let members = records.to_vec();

    let (source_record, svtype, cpx_type) = match (
        partition.insertions.as_slice(),
        partition.cnvs.as_slice(),
        partition.breakends.is_empty(),
    ) {
        ([insertion], [], _) => {
            let cpx_type = insertion.alt().trim_matches(['<', '>']).to_string();
            (*insertion, SvType::Ins, Some(cpx_type))
        }
        (_, [cnv], true) if cnv.svtype == SvType::Dup => (*cnv, SvType::Dup, None),
        _ => {
            return Resolution::Unresolved {
                cpx_type: ClusterType::ResolvedInsertion.to_string(),
                members,
            };
        }
    };

    let mut update = RecordUpdate::new(svtype, cpx_type);
    update.alt = Some(source_record.alt().to_string());
    update.chrom = Some(source_record.chrom.clone());
    update.pos = Some(source_record.pos);
    update.end = source_record.end();
    update.chr2 = Some(source_record.chr2.clone());
    update.svlen = source_record.svlen;
    Resolution::Resolved { update, members }
}
