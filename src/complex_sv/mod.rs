//! Classify clusters of linked breakpoint records into complex SVs
//!

mod cluster_type;
mod insertion;
mod inversion;
mod translocation;

use log::debug;

pub use self::cluster_type::{ClusterPartition, ClusterType, get_cluster_type};
use self::insertion::{resolve_breakend_insertion, resolve_simple_insertion};
use self::inversion::resolve_inversion;
use self::translocation::resolve_translocation;
use crate::breakpoint_record::{BreakpointRecord, SvType, is_carrier_gt};
use crate::genome_regions::{ChromArms, GenomeRegions};

/// Number of times a cluster is re-typed after removing split-read-only members
const MAX_EVIDENCE_RETRIES: usize = 1;

/// Thresholds used to classify and resolve complex SV clusters
///
#[derive(Clone, Debug)]
pub struct ClassifierSettings {
    /// Breakpoint position tolerance for micro-homology
    pub mh_buffer: i64,

    /// Minimum distance between matched inversion breakpoints to require a confirming CNV
    pub min_bkpt_cnv_size: i64,

    /// Minimum reciprocal overlap of a CNV with the inversion flank it confirms
    pub min_cnv_recip_overlap: f64,

    /// Largest insertion site accepted for a breakend insertion
    pub max_insertion_sink_size: i64,

    /// Fraction of an insertion source covered by mobile elements to label it as an MEI
    pub min_mei_coverage: f64,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            mh_buffer: 50,
            min_bkpt_cnv_size: 300,
            min_cnv_recip_overlap: 0.5,
            max_insertion_sink_size: 100,
            min_mei_coverage: 0.5,
        }
    }
}

/// Reference annotations used during classification
///
pub struct ClassifierReferences {
    pub arms: ChromArms,
    pub mei_regions: GenomeRegions<()>,
}

/// Fields to write onto the synthesized record of a resolved cluster
///
/// The ALT allele is always written first, because setting it clears END.
///
#[derive(Clone, Debug)]
pub struct RecordUpdate {
    pub svtype: SvType,
    pub cpx_type: Option<String>,

    /// Explicit ALT allele, the symbolic allele of `svtype` is used if this is None
    pub alt: Option<String>,

    pub chrom: Option<String>,
    pub pos: Option<i64>,
    pub end: Option<i64>,
    pub chr2: Option<String>,
    pub svlen: Option<i64>,
    pub source: Option<String>,
    pub cpx_intervals: Vec<String>,
}

impl RecordUpdate {
    pub fn new(svtype: SvType, cpx_type: Option<String>) -> Self {
        Self {
            svtype,
            cpx_type,
            alt: None,
            chrom: None,
            pos: None,
            end: None,
            chr2: None,
            svlen: None,
            source: None,
            cpx_intervals: Vec::new(),
        }
    }

    pub fn apply(&self, record: &mut BreakpointRecord) {
        match &self.alt {
            Some(alt) => {
                record.set_alt(alt);
                record.svtype = self.svtype;
            }
            None => record.set_alt_symbol(self.svtype),
        }

        record.cpx_type = self.cpx_type.clone();
        if let Some(chrom) = &self.chrom {
            record.chrom = chrom.clone();
        }
        if let Some(pos) = self.pos {
            record.pos = pos;
        }
        if let Some(chr2) = &self.chr2 {
            record.chr2 = chr2.clone();
        }
        record.svlen = self.svlen;
        record.source = self.source.clone();
        record.cpx_intervals = self.cpx_intervals.clone();

        if let Some(end) = self.end {
            record.set_end(end);
        }
    }
}

/// Outcome of a type-specific resolution method
///
#[derive(Debug)]
pub enum Resolution {
    Resolved {
        update: RecordUpdate,

        /// Records consumed by the resolved variant
        members: Vec<BreakpointRecord>,
    },
    Unresolved {
        cpx_type: String,
        members: Vec<BreakpointRecord>,
    },
}

/// Classifier output for one cluster
///
#[derive(Debug)]
pub struct ComplexVariant {
    pub cluster_type: ClusterType,

    /// Synthesized record, with SVTYPE=UNR if the cluster could not be resolved
    pub record: BreakpointRecord,

    /// Input records consumed by this variant
    pub members: Vec<BreakpointRecord>,
}

impl ComplexVariant {
    pub fn is_unresolved(&self) -> bool {
        self.record.svtype == SvType::Unr
    }

    pub fn cpx_type(&self) -> &str {
        self.record.cpx_type.as_deref().unwrap_or("")
    }

    pub fn member_ids(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(|x| x.id.as_str())
    }

    /// Convert members of an unresolved variant into output records sharing the `event` id
    ///
    pub fn get_unresolved_records(&self, event: &str) -> Vec<BreakpointRecord> {
        self.members
            .iter()
            .map(|x| {
                let mut record = x.clone();
                record.event = Some(event.to_string());
                record.cpx_type = self.record.cpx_type.clone();
                record.unresolved = true;
                record
            })
            .collect()
    }
}

/// Clear any complex SV annotation inherited from the input
///
fn reset_complex_fields(record: &mut BreakpointRecord) {
    record.cpx_type = None;
    record.cpx_intervals.clear();
    record.source = None;
    record.members.clear();
    record.event = None;
    record.unresolved = false;
}

/// For each sample take the first carrier genotype found among the cluster records
///
fn set_best_genotypes(record: &mut BreakpointRecord, cluster: &[BreakpointRecord]) {
    for sample_index in 0..record.samples.len() {
        if let Some(carrier) = cluster
            .iter()
            .find(|x| x.sample_gt(sample_index).is_some_and(is_carrier_gt))
        {
            record.copy_sample_from(carrier, sample_index);
        }
    }
}

/// Set algorithm provenance, member ids and varGQ of the record from all members
///
fn merge_member_annotations(record: &mut BreakpointRecord, members: &[BreakpointRecord]) {
    record.algorithms.clear();
    for member in members.iter() {
        record.algorithms.extend(member.algorithms.iter().cloned());
    }

    let mut member_ids = members.iter().map(|x| x.id.clone()).collect::<Vec<_>>();
    member_ids.sort();
    member_ids.dedup();
    record.members = member_ids;

    record.var_gq = members
        .iter()
        .filter_map(|x| x.var_gq)
        .reduce(f64::max)
        .or(record.var_gq);
}

/// Type the cluster, removing split-read-only records for one retry if the first type isn't
/// resolvable
///
fn get_filtered_cluster_type(cluster: &[BreakpointRecord]) -> (ClusterType, Vec<BreakpointRecord>) {
    let mut records = cluster.to_vec();
    let mut retry_count = 0;
    loop {
        let cluster_type = get_cluster_type(&ClusterPartition::new(&records));
        if cluster_type.is_resolvable() || retry_count == MAX_EVIDENCE_RETRIES {
            return (cluster_type, records);
        }

        let filtered_records = records
            .iter()
            .filter(|x| !x.is_sr_only())
            .cloned()
            .collect::<Vec<_>>();
        if filtered_records.is_empty() || filtered_records.len() == records.len() {
            return (cluster_type, records);
        }

        debug!(
            "Retyping cluster {cluster_type} after removing {} split-read-only records",
            records.len() - filtered_records.len()
        );
        records = filtered_records;
        retry_count += 1;
    }
}

/// Classify one cluster of linked breakpoint records and synthesize its output record
///
/// The cluster must be non-empty.
///
pub fn resolve_cluster(
    cluster: &[BreakpointRecord],
    settings: &ClassifierSettings,
    refs: &ClassifierReferences,
) -> ComplexVariant {
    assert!(!cluster.is_empty(), "Can't resolve an empty cluster");

    // Output records are always based on the first record left after split-read filtering
    let (cluster_type, records) = get_filtered_cluster_type(cluster);
    let base_record = &records[0];

    let resolution = match cluster_type {
        ClusterType::CandidateInversion => resolve_inversion(&records, settings, &refs.mei_regions),
        ClusterType::CandidateTranslocation => resolve_translocation(&records, settings, &refs.arms),
        ClusterType::CandidateInsertion => resolve_breakend_insertion(&records, settings),
        ClusterType::ResolvedInsertion => resolve_simple_insertion(&records),
        _ => Resolution::Unresolved {
            cpx_type: cluster_type.to_string(),
            members: records.clone(),
        },
    };

    let (record, members) = match resolution {
        Resolution::Resolved { update, members } => {
            let mut record = base_record.clone();
            reset_complex_fields(&mut record);
            set_best_genotypes(&mut record, &records);
            update.apply(&mut record);
            (record, members)
        }
        Resolution::Unresolved { cpx_type, members } => {
            let mut record = base_record.clone();
            reset_complex_fields(&mut record);
            set_best_genotypes(&mut record, &records);
            let end = record.end();
            record.set_alt_symbol(SvType::Unr);
            if let Some(end) = end {
                record.set_end(end);
            }
            record.cpx_type = Some(cpx_type);
            (record, members)
        }
    };

    let mut variant = ComplexVariant {
        cluster_type,
        record,
        members,
    };
    merge_member_annotations(&mut variant.record, &variant.members);

    debug!(
        "Cluster {:?} typed as {cluster_type}, resolved to {} {}",
        cluster.iter().map(|x| x.id.as_str()).collect::<Vec<_>>(),
        variant.record.svtype,
        variant.cpx_type(),
    );
    variant
}
