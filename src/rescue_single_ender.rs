//! Rescue single-ended inversions by scanning discordant pairs for the missing strand
//!

use std::collections::{BTreeSet, HashMap};

use log::debug;
use simple_error::SimpleResult;

use crate::breakpoint_record::{BreakpointRecord, Strand, Strands};
use crate::discordant_pairs::{DiscordantPair, PairEvidenceSource};
use crate::genome_regions::GenomeRegions;
use crate::genome_slink::{LinkageSettings, cluster_nodes};

/// Algorithm name given to records synthesized from pair evidence
pub const RESCUE_ALGORITHM: &str = "rescue";

#[derive(Clone, Debug)]
pub struct RescueSettings {
    /// Window around the record start to search for pairs
    pub window: i64,

    /// Clustering distance for fetched pairs
    pub distance: i64,

    /// Min pairs required to count a sample as supporting the missing strand
    pub min_pairs_per_sample: usize,

    /// Min fraction of called samples which must support the missing strand
    pub min_sample_fraction: f64,
}

impl Default for RescueSettings {
    fn default() -> Self {
        Self {
            window: 500,
            distance: 300,
            min_pairs_per_sample: 4,
            min_sample_fraction: 0.5,
        }
    }
}

/// Get the representative (start, end) coordinates of the pairs on `strand`
///
/// The outermost pair coordinates are used, which is the max for '+' and the min for '-'.
///
fn get_strand_coordinates(pairs: &[&DiscordantPair], strand: Strand) -> Option<(i64, i64)> {
    let strand_pairs = pairs.iter().filter(|x| x.strand_a == strand);
    let coords = strand_pairs.map(|x| (x.pos_a, x.pos_b));
    match strand {
        Strand::Plus => coords.reduce(|a, b| (a.0.max(b.0), a.1.max(b.1))),
        Strand::Minus => coords.reduce(|a, b| (a.0.min(b.0), a.1.min(b.1))),
    }
}

/// Test if the cluster's representative coordinates are close to the record's breakpoints
///
/// Only pairs on the record's own strand are used, so a cluster without them never matches.
///
fn is_matching_cluster(
    record: &BreakpointRecord,
    cluster: &[&DiscordantPair],
    record_strand: Strand,
    window: i64,
) -> bool {
    match get_strand_coordinates(cluster, record_strand) {
        Some((start, end)) => {
            (record.pos - start).abs() < window && (record.stop() - end).abs() < window
        }
        None => false,
    }
}

/// Build the missing strand record from its supporting pairs
///
fn make_rescued_record(
    record: &BreakpointRecord,
    supporting_pairs: &[&DiscordantPair],
    missing_strand: Strand,
) -> Option<BreakpointRecord> {
    let (start, end) = get_strand_coordinates(supporting_pairs, missing_strand)?;

    let mut rescued = record.clone();
    rescued.id = format!("{}_OPPSTRAND", record.id);
    rescued.pos = start;
    rescued.set_end(end);
    rescued.strands = Some(Strands::from_pair(missing_strand, missing_strand));
    rescued.svlen = Some(end - start);
    rescued.algorithms = BTreeSet::from([RESCUE_ALGORITHM.to_string()]);
    Some(rescued)
}

/// Search for discordant pair support of the missing strand of a single-ended inversion
///
/// Returns the synthesized record for the missing strand, or None if support is insufficient.
/// Errors from the pair evidence source are returned as-is.
///
/// The record must be a '++' or '--' inversion breakpoint.
///
pub fn rescue_single_ender(
    record: &BreakpointRecord,
    sample_names: &[String],
    pair_source: &mut dyn PairEvidenceSource,
    blacklist: Option<&GenomeRegions<()>>,
    settings: &RescueSettings,
) -> SimpleResult<Option<BreakpointRecord>> {
    let record_strand = match record.strands {
        Some(Strands::PlusPlus) => Strand::Plus,
        Some(Strands::MinusMinus) => Strand::Minus,
        strands => {
            panic!("Invalid inversion orientation {strands:?} in record {}", record.id);
        }
    };
    let missing_strand = record_strand.opposite();

    let called = record.called_samples(sample_names);
    if called.is_empty() {
        return Ok(None);
    }

    let mut pairs = pair_source
        .fetch_pairs(
            &record.chrom,
            record.pos - settings.window - 1,
            record.pos + settings.window,
        )?
        .into_iter()
        .filter(|x| called.contains(&x.sample) && x.is_inversion())
        .filter(|x| {
            blacklist.is_none_or(|b| {
                !(b.intersect_pos(&x.chrom_a, x.pos_a - 1) || b.intersect_pos(&x.chrom_b, x.pos_b - 1))
            })
        })
        .collect::<Vec<_>>();
    pairs.sort_by_key(|x| x.pos_a);

    let linkage_settings = LinkageSettings {
        distance: settings.distance,
        ..Default::default()
    };

    // Select the largest matching cluster, taking the first on ties
    let mut best_cluster: Option<Vec<DiscordantPair>> = None;
    for cluster in cluster_nodes(pairs, linkage_settings) {
        let cluster_refs = cluster.iter().collect::<Vec<_>>();
        if !is_matching_cluster(record, &cluster_refs, record_strand, settings.window) {
            continue;
        }
        if best_cluster
            .as_ref()
            .is_none_or(|x| cluster.len() > x.len())
        {
            best_cluster = Some(cluster);
        }
    }
    let Some(best_cluster) = best_cluster else {
        return Ok(None);
    };

    let supporting_pairs = best_cluster
        .iter()
        .filter(|x| x.strand_a == missing_strand)
        .collect::<Vec<_>>();

    let mut sample_support = HashMap::new();
    for pair in supporting_pairs.iter() {
        *sample_support.entry(pair.sample.as_str()).or_insert(0) += 1;
    }
    let supported_sample_count = called
        .iter()
        .filter(|x| {
            sample_support.get(x.as_str()).copied().unwrap_or(0) >= settings.min_pairs_per_sample
        })
        .count();
    let supported_fraction = supported_sample_count as f64 / called.len() as f64;

    debug!(
        "Single-ender {}: {supported_sample_count} of {} called samples support the opposite strand",
        record.id,
        called.len()
    );

    Ok(if supported_fraction >= settings.min_sample_fraction {
        make_rescued_record(record, &supporting_pairs, missing_strand)
    } else {
        None
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breakpoint_record::SvType;
    use crate::breakpoint_record::test_utils::*;
    use crate::discordant_pairs::test_utils::MemoryPairSource;

    fn get_sample_names() -> Vec<String> {
        vec!["s1".to_string(), "s2".to_string()]
    }

    fn get_pairs(sample: &str, strand: &str, count: i64, pos_a: i64, pos_b: i64) -> Vec<DiscordantPair> {
        (0..count)
            .map(|i| {
                let line = format!(
                    "chr1\t{}\t{strand}\tchr1\t{}\t{strand}\t{sample}",
                    pos_a + i * 10,
                    pos_b + i * 10
                );
                DiscordantPair::parse(&line).unwrap()
            })
            .collect()
    }

    fn get_single_ender() -> BreakpointRecord {
        let mut record =
            get_test_record("inv1", SvType::Inv, "chr1", 10_000, "chr1", 20_000, Some("--"));
        set_test_genotypes(&mut record, &["0/1", "0/1"]);
        record
    }

    fn rescue(
        record: &BreakpointRecord,
        pairs: Vec<DiscordantPair>,
        blacklist: Option<&GenomeRegions<()>>,
        settings: &RescueSettings,
    ) -> Option<BreakpointRecord> {
        let mut source = MemoryPairSource::new(pairs);
        rescue_single_ender(record, &get_sample_names(), &mut source, blacklist, settings).unwrap()
    }

    #[test]
    fn test_rescue_both_samples() {
        let record = get_single_ender();
        let mut pairs = get_pairs("s1", "+", 4, 9900, 19_900);
        pairs.extend(get_pairs("s2", "+", 5, 9920, 19_920));
        pairs.extend(get_pairs("s1", "-", 2, 10_010, 20_010));

        let rescued = rescue(&record, pairs, None, &RescueSettings::default()).unwrap();

        assert_eq!(rescued.id, "inv1_OPPSTRAND");
        assert_eq!(rescued.strands, Some(Strands::PlusPlus));
        assert_eq!(rescued.pos, 9960);
        assert_eq!(rescued.end(), Some(19_960));
        assert_eq!(rescued.svlen, Some(10_000));
        assert_eq!(
            rescued.algorithms.iter().collect::<Vec<_>>(),
            vec![RESCUE_ALGORITHM]
        );
    }

    #[test]
    fn test_rescue_one_of_two_samples() {
        let record = get_single_ender();
        let mut pairs = get_pairs("s1", "+", 4, 9900, 19_900);
        pairs.extend(get_pairs("s2", "+", 3, 9920, 19_920));
        pairs.extend(get_pairs("s1", "-", 2, 10_010, 20_010));

        let rescued = rescue(&record, pairs.clone(), None, &RescueSettings::default());
        assert!(rescued.is_some());

        let settings = RescueSettings {
            min_sample_fraction: 0.6,
            ..Default::default()
        };
        let rescued = rescue(&record, pairs, None, &settings);
        assert!(rescued.is_none());
    }

    #[test]
    fn test_rescue_opposite_strand_only() {
        // Pairs support only the missing strand, so nothing anchors them to the record
        let record = get_single_ender();
        let mut pairs = get_pairs("s1", "+", 6, 9900, 19_900);
        pairs.extend(get_pairs("s2", "+", 6, 9920, 19_920));

        let rescued = rescue(&record, pairs, None, &RescueSettings::default());
        assert!(rescued.is_none());
    }

    #[test]
    fn test_rescue_uncalled_samples_ignored() {
        let mut record = get_single_ender();
        set_test_genotypes(&mut record, &["0/1", "0/0"]);
        let mut pairs = get_pairs("s2", "+", 6, 9900, 19_900);
        pairs.extend(get_pairs("s1", "-", 2, 10_010, 20_010));

        let rescued = rescue(&record, pairs, None, &RescueSettings::default());
        assert!(rescued.is_none());
    }

    #[test]
    fn test_rescue_distant_cluster() {
        let record = get_single_ender();
        let mut pairs = get_pairs("s1", "+", 6, 9900, 25_000);
        pairs.extend(get_pairs("s1", "-", 2, 10_010, 25_100));

        let rescued = rescue(&record, pairs, None, &RescueSettings::default());
        assert!(rescued.is_none());
    }

    #[test]
    fn test_rescue_blacklist() {
        let mut record = get_single_ender();
        set_test_genotypes(&mut record, &["0/1", "0/0"]);
        let mut pairs = get_pairs("s1", "+", 4, 9900, 19_900);
        pairs.extend(get_pairs("s1", "-", 2, 10_010, 20_010));

        let mut blacklist = GenomeRegions::new();
        blacklist.add_region_value("chr1", 19_000, 19_905, ());

        let rescued = rescue(&record, pairs.clone(), None, &RescueSettings::default());
        assert!(rescued.is_some());

        let rescued = rescue(&record, pairs, Some(&blacklist), &RescueSettings::default());
        assert!(rescued.is_none());
    }

    #[test]
    fn test_rescue_source_error() {
        let record = get_single_ender();
        let mut source = MemoryPairSource::from_lines(&["chr1\t9900\t+\tchr1\t19900\t*\ts1"]);
        let result = rescue_single_ender(
            &record,
            &get_sample_names(),
            &mut source,
            None,
            &RescueSettings::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    #[should_panic]
    fn test_rescue_invalid_strands() {
        let mut record = get_single_ender();
        record.strands = Some(Strands::PlusMinus);
        rescue(&record, Vec::new(), None, &RescueSettings::default());
    }
}
