//! Partition breakpoint clusters by structural role and assign the cluster type
//!
use strum::{Display, IntoStaticStr};

use crate::breakpoint_record::{BreakpointRecord, Strands, SvType};

/// Structural composition of a breakpoint cluster, used to select the resolution method
///
#[derive(Clone, Copy, Debug, Display, Eq, IntoStaticStr, PartialEq)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ClusterType {
    CandidateInversion,
    MatchedStrands,
    TlocWithCnv,
    CandidateTranslocation,
    StrandMismatchTloc,
    InsWithCnv,
    CandidateInsertion,
    StrandMismatchIns,
    MultipleResolvedInsertions,
    ErrorCnvOnly,
    ResolvedInsertion,
    SingleEnder,
    MixedBreakends,
}

impl ClusterType {
    /// True for cluster types which have a resolution method
    ///
    pub fn is_resolvable(&self) -> bool {
        matches!(
            self,
            ClusterType::CandidateInversion
                | ClusterType::CandidateTranslocation
                | ClusterType::CandidateInsertion
                | ClusterType::ResolvedInsertion
        )
    }
}

/// Records of a cluster split by structural role
///
/// A record can appear in more than one partition, for instance an interchromosomal INV record is
/// both an inversion and a translocation.
///
pub struct ClusterPartition<'a> {
    pub inversions: Vec<&'a BreakpointRecord>,
    pub tlocs: Vec<&'a BreakpointRecord>,
    pub breakends: Vec<&'a BreakpointRecord>,
    pub insertions: Vec<&'a BreakpointRecord>,
    pub cnvs: Vec<&'a BreakpointRecord>,
}

fn select_records<'a>(
    records: &'a [BreakpointRecord],
    f: impl Fn(&BreakpointRecord) -> bool,
) -> Vec<&'a BreakpointRecord> {
    records.iter().filter(|&x| f(x)).collect()
}

impl<'a> ClusterPartition<'a> {
    pub fn new(records: &'a [BreakpointRecord]) -> Self {
        Self {
            inversions: select_records(records, |x| x.svtype == SvType::Inv),
            tlocs: select_records(records, |x| x.is_interchromosomal()),
            breakends: select_records(records, |x| {
                !x.is_interchromosomal() && x.svtype == SvType::Bnd
            }),
            insertions: select_records(records, |x| x.svtype == SvType::Ins),
            cnvs: select_records(records, |x| x.is_cnv()),
        }
    }

    fn counts(&self) -> [usize; 4] {
        [
            self.inversions.len(),
            self.tlocs.len(),
            self.breakends.len(),
            self.insertions.len(),
        ]
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum PartitionKind {
    Inversion,
    Translocation,
    Breakend,
    Insertion,
}

/// Summary of the partition counts
///
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Composition {
    /// Exactly one partition has two records, and all others are empty
    Paired(PartitionKind),
    Empty,
    Single,
    Mixed,
}

fn get_composition(counts: [usize; 4]) -> Composition {
    use PartitionKind::*;
    match counts {
        [2, 0, 0, 0] => Composition::Paired(Inversion),
        [0, 2, 0, 0] => Composition::Paired(Translocation),
        [0, 0, 2, 0] => Composition::Paired(Breakend),
        [0, 0, 0, 2] => Composition::Paired(Insertion),
        [0, 0, 0, 0] => Composition::Empty,
        _ if counts.iter().sum::<usize>() == 1 => Composition::Single,
        _ => Composition::Mixed,
    }
}

/// Get the sorted strand pair of two records, or None if either strand is missing
///
fn sorted_strand_pair(r1: &BreakpointRecord, r2: &BreakpointRecord) -> Option<(Strands, Strands)> {
    let s1 = r1.strands?;
    let s2 = r2.strands?;
    Some(if s1 <= s2 { (s1, s2) } else { (s2, s1) })
}

fn is_valid_tloc_strands(r1: &BreakpointRecord, r2: &BreakpointRecord) -> bool {
    matches!(
        sorted_strand_pair(r1, r2),
        Some((Strands::PlusPlus, Strands::MinusMinus))
            | Some((Strands::PlusMinus, Strands::MinusPlus))
    )
}

fn is_valid_ins_strands(r1: &BreakpointRecord, r2: &BreakpointRecord) -> bool {
    sorted_strand_pair(r1, r2) == Some((Strands::PlusMinus, Strands::MinusPlus))
}

pub fn get_cluster_type(partition: &ClusterPartition) -> ClusterType {
    let has_cnv = !partition.cnvs.is_empty();
    match get_composition(partition.counts()) {
        Composition::Paired(PartitionKind::Inversion) => {
            let invs = &partition.inversions;
            if invs[0].strands == invs[1].strands {
                ClusterType::MatchedStrands
            } else {
                ClusterType::CandidateInversion
            }
        }
        Composition::Paired(PartitionKind::Translocation) => {
            let tlocs = &partition.tlocs;
            if has_cnv {
                ClusterType::TlocWithCnv
            } else if is_valid_tloc_strands(tlocs[0], tlocs[1]) {
                ClusterType::CandidateTranslocation
            } else {
                ClusterType::StrandMismatchTloc
            }
        }
        Composition::Paired(PartitionKind::Breakend) => {
            let bnds = &partition.breakends;
            if has_cnv {
                ClusterType::InsWithCnv
            } else if is_valid_ins_strands(bnds[0], bnds[1]) {
                ClusterType::CandidateInsertion
            } else {
                ClusterType::StrandMismatchIns
            }
        }
        Composition::Paired(PartitionKind::Insertion) => ClusterType::MultipleResolvedInsertions,
        Composition::Empty => ClusterType::ErrorCnvOnly,
        Composition::Single => {
            if partition.insertions.len() == 1 {
                ClusterType::ResolvedInsertion
            } else {
                ClusterType::SingleEnder
            }
        }
        Composition::Mixed => {
            if partition.insertions.len() == 1 && !partition.breakends.is_empty() {
                ClusterType::ResolvedInsertion
            } else {
                ClusterType::MixedBreakends
            }
        }
    }
}
