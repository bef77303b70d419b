//! Complex SV resolution run over a sorted breakpoint VCF
//!

use std::collections::HashSet;

use camino::Utf8Path;
use itertools::process_results;
use log::info;
use simple_error::SimpleResult;

use crate::breakpoint_record::{BreakpointRecord, SvType};
use crate::chrom_list::ChromList;
use crate::cli::{ResolveSettings, write_resolve_settings};
use crate::complex_sv::{ClassifierReferences, ClassifierSettings, ComplexVariant, resolve_cluster};
use crate::discordant_pairs::{PairEvidenceSource, TabixPairSource};
use crate::genome_regions::{ChromArms, GenomeRegions};
use crate::link_complex::{LinkSettings, is_resolvable_cluster, link_complex_records};
use crate::reconcile::merge_records;
use crate::rescue_single_ender::{RescueSettings, rescue_single_ender};
use crate::run_stats::{ResolveRunStats, write_resolve_run_stats};
use crate::vcf_utils::{VcfReader, VcfWriter};

pub const RESOLVED_VCF_FILENAME: &str = "resolved.vcf.gz";
pub const UNRESOLVED_VCF_FILENAME: &str = "unresolved.vcf.gz";
pub const RUN_STATS_FILENAME: &str = "run_stats.json";
pub const SETTINGS_FILENAME: &str = "resolve.settings.json";

const UNRESOLVED_EVENT_PREFIX: &str = "UNRESOLVED_";

/// Discordant pair evidence and settings used to rescue single-ended inversions
///
pub struct RescueContext<'a> {
    pub pair_source: &'a mut dyn PairEvidenceSource,
    pub blacklist: Option<&'a GenomeRegions<()>>,
    pub settings: &'a RescueSettings,
}

/// Records synthesized by the classification pass
///
#[derive(Default)]
pub struct ClassifiedRecords {
    /// Resolved complex SV records and the member records of unresolved clusters
    pub synthesized: Vec<BreakpointRecord>,

    /// Ids of all input records replaced by `synthesized`
    pub consumed_ids: HashSet<String>,
}

/// Deterministic ids for resolved variants and unresolved cluster events
///
struct VariantIdGenerator {
    prefix: String,
    resolved_count: usize,
    unresolved_count: usize,
}

impl VariantIdGenerator {
    fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            resolved_count: 0,
            unresolved_count: 0,
        }
    }

    fn next_resolved_id(&mut self) -> String {
        self.resolved_count += 1;
        format!("{}{}", self.prefix, self.resolved_count)
    }

    fn next_unresolved_event(&mut self) -> String {
        self.unresolved_count += 1;
        format!("{UNRESOLVED_EVENT_PREFIX}{}", self.unresolved_count)
    }
}

struct ClusterResolver<'a> {
    classifier_settings: &'a ClassifierSettings,
    refs: &'a ClassifierReferences,
    id_generator: VariantIdGenerator,
    output: ClassifiedRecords,
    stats: &'a mut ResolveRunStats,
}

impl ClusterResolver<'_> {
    fn add_variant(&mut self, variant: ComplexVariant) {
        self.output
            .consumed_ids
            .extend(variant.member_ids().map(|x| x.to_string()));

        let cpx_type = variant.cpx_type().to_string();
        if variant.is_unresolved() {
            let event = self.id_generator.next_unresolved_event();
            self.stats.add_unresolved(&cpx_type);
            self.output
                .synthesized
                .extend(variant.get_unresolved_records(&event));
        } else {
            let mut record = variant.record;
            record.id = self.id_generator.next_resolved_id();
            self.stats.add_resolved(&cpx_type);
            self.output.synthesized.push(record);
        }
    }

    fn resolve(&mut self, cluster: &[BreakpointRecord]) {
        let variant = resolve_cluster(cluster, self.classifier_settings, self.refs);
        self.add_variant(variant);
    }
}

/// Classify all complex SV candidate clusters from a genome sorted record stream
///
/// Returns the synthesized records to merge back into the stream, and the ids of the records
/// they replace. Pair evidence errors from single-ender rescue stop classification.
///
pub fn classify_records<I>(
    records: I,
    sample_names: &[String],
    link_settings: LinkSettings,
    classifier_settings: &ClassifierSettings,
    refs: &ClassifierReferences,
    mut rescue: Option<RescueContext>,
    prefix: &str,
    stats: &mut ResolveRunStats,
) -> SimpleResult<ClassifiedRecords>
where
    I: IntoIterator<Item = BreakpointRecord>,
{
    let mut resolver = ClusterResolver {
        classifier_settings,
        refs,
        id_generator: VariantIdGenerator::new(prefix),
        output: ClassifiedRecords::default(),
        stats,
    };

    for mut cluster in link_complex_records(records, link_settings) {
        resolver.stats.cluster_count += 1;
        if !is_resolvable_cluster(&cluster) {
            resolver.stats.cnv_only_cluster_count += 1;
            continue;
        }

        if let Some(rescue) = rescue.as_mut()
            && cluster.len() == 1
            && cluster[0].svtype == SvType::Inv
        {
            resolver.stats.rescue_attempt_count += 1;
            if let Some(opposite) = rescue_single_ender(
                &cluster[0],
                sample_names,
                &mut *rescue.pair_source,
                rescue.blacklist,
                rescue.settings,
            )? {
                resolver.stats.rescue_success_count += 1;
                cluster.push(opposite);
            }
        }

        // Insertions linked only to each other are resolved separately
        if cluster.iter().all(|x| x.svtype == SvType::Ins) {
            for record in cluster.iter() {
                resolver.resolve(std::slice::from_ref(record));
            }
        } else {
            resolver.resolve(&cluster);
        }
    }

    Ok(resolver.output)
}

fn load_classifier_references(settings: &ResolveSettings) -> ClassifierReferences {
    info!("Reading cytobands from '{}'", settings.cytobands_filename);
    let arms = ChromArms::from_cytoband_bed(&settings.cytobands_filename);

    info!("Reading mobile element regions from '{}'", settings.mei_bed_filename);
    let mei_regions = GenomeRegions::<()>::from_bed(&settings.mei_bed_filename, "mobile element");

    ClassifierReferences { arms, mei_regions }
}

fn get_pair_source(settings: &ResolveSettings) -> SimpleResult<Option<TabixPairSource>> {
    let group = &settings.pair_input_group;
    Ok(if let Some(filename) = &group.discfile {
        Some(TabixPairSource::from_paths(std::slice::from_ref(filename)))
    } else if let Some(list_filename) = &group.discfile_list {
        Some(TabixPairSource::from_list_file(list_filename)?)
    } else {
        None
    })
}

fn write_output_vcfs(
    vcf_filename: &Utf8Path,
    output_dir: &Utf8Path,
    chrom_list: &ChromList,
    classified: ClassifiedRecords,
    stats: &mut ResolveRunStats,
) -> SimpleResult<()> {
    let reader = VcfReader::from_path(vcf_filename)?;
    let header = reader.get_output_header(chrom_list);

    let mut resolved_writer = VcfWriter::new(&output_dir.join(RESOLVED_VCF_FILENAME), &header);
    let mut unresolved_writer = VcfWriter::new(&output_dir.join(UNRESOLVED_VCF_FILENAME), &header);

    let ClassifiedRecords {
        synthesized,
        consumed_ids,
    } = classified;

    // The input is scanned again here, so that original records don't need to be held in memory
    process_results(reader, |originals| -> SimpleResult<()> {
        for record in merge_records(originals, synthesized, consumed_ids, chrom_list) {
            if record.unresolved {
                unresolved_writer.write_record(&record)?;
            } else {
                resolved_writer.write_record(&record)?;
            }
        }
        Ok(())
    })??;

    stats.resolved_output_record_count = resolved_writer.finish();
    stats.unresolved_output_record_count = unresolved_writer.finish();
    Ok(())
}

pub fn run_resolve(settings: &ResolveSettings) -> SimpleResult<()> {
    write_resolve_settings(&settings.output_dir, settings);

    let refs = load_classifier_references(settings);
    let pe_blacklist = settings
        .pe_blacklist_filename
        .as_ref()
        .map(|x| GenomeRegions::<()>::from_bed(x, "discordant pair blacklist"));
    let mut pair_source = get_pair_source(settings)?;
    if pair_source.is_none() {
        info!("No discordant pair evidence provided, single-ender rescue is disabled");
    }

    let rescue_settings = settings.get_rescue_settings();
    let rescue = pair_source.as_mut().map(|x| RescueContext {
        pair_source: x,
        blacklist: pe_blacklist.as_ref(),
        settings: &rescue_settings,
    });

    let mut stats = ResolveRunStats::default();

    info!("Classifying complex SV clusters from '{}'", settings.vcf_filename);
    let reader = VcfReader::from_path(&settings.vcf_filename)?;
    let sample_names = reader.sample_names.clone();

    // Contig ranks follow the header, followed by any other chromosomes in input order
    let mut chrom_list = reader.get_chrom_list();
    let mut input_record_count = 0;
    let classified = process_results(reader, |records| {
        let records = records.inspect(|x| {
            chrom_list.add_chrom(&x.chrom, 0);
            input_record_count += 1;
        });
        classify_records(
            records,
            &sample_names,
            settings.get_link_settings(),
            &settings.get_classifier_settings(),
            &refs,
            rescue,
            &settings.prefix,
            &mut stats,
        )
    })??;
    stats.input_record_count = input_record_count;
    info!(
        "Classified {} clusters into {} resolved and {} unresolved variants",
        stats.cluster_count, stats.resolved_variant_count, stats.unresolved_variant_count
    );

    info!("Writing resolved and unresolved records");
    write_output_vcfs(
        &settings.vcf_filename,
        &settings.output_dir,
        &chrom_list,
        classified,
        &mut stats,
    )?;

    write_resolve_run_stats(&settings.output_dir, &stats);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breakpoint_record::test_utils::*;
    use crate::breakpoint_record::Strand;
    use crate::discordant_pairs::DiscordantPair;
    use crate::discordant_pairs::test_utils::MemoryPairSource;

    fn get_test_refs() -> ClassifierReferences {
        let mut arms = ChromArms::new();
        arms.add_region_value("chr1", 0, 100_000, 'p');
        ClassifierReferences {
            arms,
            mei_regions: GenomeRegions::new(),
        }
    }

    fn classify(
        records: Vec<BreakpointRecord>,
        rescue: Option<RescueContext>,
    ) -> (ClassifiedRecords, ResolveRunStats) {
        let mut stats = ResolveRunStats::default();
        let sample_names = vec!["s1".to_string()];
        let classified = classify_records(
            records,
            &sample_names,
            LinkSettings::default(),
            &ClassifierSettings::default(),
            &get_test_refs(),
            rescue,
            "CPX_",
            &mut stats,
        )
        .unwrap();
        (classified, stats)
    }

    #[test]
    fn test_classify_records() {
        let records = vec![
            get_test_record("del1", SvType::Del, "chr1", 100, "chr1", 500, None),
            get_test_record("ff", SvType::Inv, "chr1", 10_000, "chr1", 20_000, Some("++")),
            get_test_record("rr", SvType::Inv, "chr1", 10_010, "chr1", 20_010, Some("--")),
            get_test_record("bnd", SvType::Bnd, "chr1", 40_000, "chr1", 60_000, Some("+-")),
            get_test_record("bnd2", SvType::Bnd, "chr1", 40_010, "chr1", 60_010, Some("+-")),
        ];

        let (classified, stats) = classify(records, None);
        assert_eq!(stats.cluster_count, 3);
        assert_eq!(stats.cnv_only_cluster_count, 1);
        assert_eq!(stats.resolved_variant_count, 1);
        assert_eq!(stats.unresolved_variant_count, 1);

        let ids = classified
            .synthesized
            .iter()
            .map(|x| x.id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["CPX_1", "bnd", "bnd2"]);
        assert_eq!(classified.synthesized[0].cpx_type.as_deref(), Some("INV"));
        assert_eq!(
            classified.synthesized[1].event.as_deref(),
            Some("UNRESOLVED_1")
        );
        assert!(classified.synthesized[2].unresolved);

        let mut consumed = classified.consumed_ids.into_iter().collect::<Vec<_>>();
        consumed.sort();
        assert_eq!(consumed, vec!["bnd", "bnd2", "ff", "rr"]);
    }

    #[test]
    fn test_separate_insertions() {
        let mut ins1 = get_test_record("ins1", SvType::Ins, "chr1", 1000, "chr1", 1001, None);
        ins1.set_alt("<INS:ME:ALU>");
        ins1.set_end(1001);
        let mut ins2 = get_test_record("ins2", SvType::Ins, "chr1", 1100, "chr1", 1101, None);
        ins2.set_alt("<INS:ME:SVA>");
        ins2.set_end(1101);

        let (classified, stats) = classify(vec![ins1, ins2], None);
        assert_eq!(stats.cluster_count, 1);
        assert_eq!(stats.resolved_variant_count, 2);
        let cpx_types = classified
            .synthesized
            .iter()
            .map(|x| x.cpx_type.as_deref().unwrap())
            .collect::<Vec<_>>();
        assert_eq!(cpx_types, vec!["INS:ME:ALU", "INS:ME:SVA"]);
    }

    #[test]
    fn test_single_ender_rescue() {
        let mut record = get_test_record("inv", SvType::Inv, "chr1", 10_000, "chr1", 20_000, Some("--"));
        set_test_genotypes(&mut record, &["0/1"]);

        let get_pair = |pos_a: i64, pos_b: i64, strand: Strand| DiscordantPair {
            chrom_a: "chr1".to_string(),
            pos_a,
            strand_a: strand,
            chrom_b: "chr1".to_string(),
            pos_b,
            strand_b: strand,
            sample: "s1".to_string(),
        };
        let mut pairs = (0..4)
            .map(|i| get_pair(9950 + i, 19_950 + i, Strand::Plus))
            .collect::<Vec<_>>();
        pairs.extend((0..2).map(|i| get_pair(10_010 + i, 20_010 + i, Strand::Minus)));
        let mut pair_source = MemoryPairSource::new(pairs);
        let rescue_settings = RescueSettings::default();
        let rescue = RescueContext {
            pair_source: &mut pair_source,
            blacklist: None,
            settings: &rescue_settings,
        };

        let (classified, stats) = classify(vec![record], Some(rescue));
        assert_eq!(stats.rescue_attempt_count, 1);
        assert_eq!(stats.rescue_success_count, 1);
        assert_eq!(classified.synthesized.len(), 1);

        let inversion = &classified.synthesized[0];
        assert_eq!(inversion.svtype, SvType::Inv);
        assert_eq!(inversion.members, vec!["inv", "inv_OPPSTRAND"]);
        assert!(inversion.algorithms.contains("rescue"));
    }
}
