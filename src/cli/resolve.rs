use camino::{Utf8Path, Utf8PathBuf};
use clap::Args;
use const_format::concatcp;
use serde::{Deserialize, Serialize};
use simple_error::{SimpleResult, bail};
use unwrap::unwrap;

use super::utils::{check_fraction, check_optional_filename, check_required_filename};
use crate::complex_sv::ClassifierSettings;
use crate::link_complex::LinkSettings;
use crate::resolve::SETTINGS_FILENAME;
use crate::rescue_single_ender::RescueSettings;

/// Discordant pair evidence used to rescue single-ended inversions
#[derive(Args, Default, Deserialize, Serialize)]
#[group(required = false, multiple = false)]
pub struct PairInputGroup {
    /// Tabix indexed discordant pair file, with columns 'chrA posA strandA chrB posB strandB
    /// sample'. Single-ender rescue is disabled without pair evidence.
    ///
    #[arg(long, value_name = "FILE")]
    pub discfile: Option<Utf8PathBuf>,

    /// File listing one tabix indexed discordant pair file per line
    #[arg(long, value_name = "FILE")]
    pub discfile_list: Option<Utf8PathBuf>,
}

#[derive(Args, Default, Deserialize, Serialize)]
pub struct ResolveSettings {
    /// Directory for all resolve command output (must not already exist)
    #[arg(long, value_name = "DIR", default_value = concatcp!(env!("CARGO_PKG_NAME"), "_resolve_output"))]
    pub output_dir: Utf8PathBuf,

    /// Sorted VCF of standardized breakpoint and CNV records (required)
    #[arg(long = "vcf", value_name = "FILE")]
    pub vcf_filename: Utf8PathBuf,

    /// Cytoband BED file, used to check chromosome arms of reciprocal translocations (required)
    #[arg(long = "cytobands", value_name = "FILE")]
    pub cytobands_filename: Utf8PathBuf,

    /// Mobile element BED file, used to classify dispersed inverted insertions (required)
    #[arg(long = "mei-bed", value_name = "FILE")]
    pub mei_bed_filename: Utf8PathBuf,

    #[command(flatten)]
    pub pair_input_group: PairInputGroup,

    /// BED file of regions to exclude from discordant pair rescan. Any pair with either read in
    /// these regions is ignored.
    ///
    #[arg(long = "pe-blacklist", value_name = "FILE")]
    pub pe_blacklist_filename: Option<Utf8PathBuf>,

    /// Min discordant pairs for a sample to support the missing strand of a single-ender
    #[arg(long, default_value_t = 4)]
    pub min_rescan_pe_support: usize,

    /// Window around the single-ender start to search for discordant pairs
    #[arg(long, default_value_t = 500)]
    pub rescan_window: i64,

    /// Clustering distance for discordant pairs during rescan
    #[arg(long, default_value_t = 300)]
    pub rescan_cluster_distance: i64,

    /// Min fraction of called samples supporting the missing strand of a single-ender
    #[arg(long, default_value_t = 0.5)]
    pub min_rescan_sample_frac: f64,

    /// Max distance between breakpoints of records linked into one complex SV candidate
    #[arg(long, default_value_t = 300)]
    pub link_window: i64,

    /// Min fraction of shared called samples for both records in a candidate link
    #[arg(long, default_value_t = 0.5)]
    pub min_link_sample_overlap: f64,

    /// Min fraction of shared called samples for at least one record in a candidate link
    #[arg(long, default_value_t = 0.8)]
    pub max_link_sample_overlap: f64,

    /// Breakpoint position tolerance used to classify translocations and insertions
    #[arg(hide = true, long, default_value_t = 50)]
    pub mh_buffer: i64,

    /// Id prefix for resolved variants
    #[arg(long, default_value = "CPX_")]
    pub prefix: String,
}

impl ResolveSettings {
    pub fn get_link_settings(&self) -> LinkSettings {
        LinkSettings {
            window: self.link_window,
            min_sample_overlap: self.min_link_sample_overlap,
            max_sample_overlap: self.max_link_sample_overlap,
        }
    }

    pub fn get_classifier_settings(&self) -> ClassifierSettings {
        ClassifierSettings {
            mh_buffer: self.mh_buffer,
            ..Default::default()
        }
    }

    pub fn get_rescue_settings(&self) -> RescueSettings {
        RescueSettings {
            window: self.rescan_window,
            distance: self.rescan_cluster_distance,
            min_pairs_per_sample: self.min_rescan_pe_support,
            min_sample_fraction: self.min_rescan_sample_frac,
        }
    }
}

/// Resolved variant ids are always separated from their number by an underscore
///
fn fix_prefix(prefix: String) -> String {
    if prefix.ends_with('_') {
        prefix
    } else {
        prefix + "_"
    }
}

fn check_settings_values(settings: &ResolveSettings) -> SimpleResult<()> {
    check_fraction(settings.min_rescan_sample_frac, "min-rescan-sample-frac")?;
    check_fraction(settings.min_link_sample_overlap, "min-link-sample-overlap")?;
    check_fraction(settings.max_link_sample_overlap, "max-link-sample-overlap")?;

    if settings.rescan_window <= 0 {
        bail!("--rescan-window argument must be greater than 0");
    }
    if settings.rescan_cluster_distance < 0 {
        bail!("--rescan-cluster-distance argument must not be negative");
    }
    if settings.link_window < 0 {
        bail!("--link-window argument must not be negative");
    }
    if settings.mh_buffer < 0 {
        bail!("--mh-buffer argument must not be negative");
    }
    if settings.prefix.is_empty() {
        bail!("--prefix argument must not be empty");
    }
    Ok(())
}

pub fn validate_and_fix_resolve_settings(
    mut settings: ResolveSettings,
) -> SimpleResult<ResolveSettings> {
    check_required_filename(&settings.vcf_filename, "input VCF")?;
    check_required_filename(&settings.cytobands_filename, "cytoband")?;
    check_required_filename(&settings.mei_bed_filename, "mobile element BED")?;

    let group = &settings.pair_input_group;
    check_optional_filename(group.discfile.as_deref(), "discordant pair")?;
    check_optional_filename(group.discfile_list.as_deref(), "discordant pair list")?;
    check_optional_filename(
        settings.pe_blacklist_filename.as_deref(),
        "discordant pair blacklist",
    )?;

    check_settings_values(&settings)?;

    settings.prefix = fix_prefix(settings.prefix);
    Ok(settings)
}

/// Write resolve settings out in json format
pub fn write_resolve_settings(output_dir: &Utf8Path, settings: &ResolveSettings) {
    use log::info;

    let filename = output_dir.join(SETTINGS_FILENAME);

    info!("Writing resolve settings to file: '{filename}'");

    let f = unwrap!(
        std::fs::File::create(&filename),
        "Unable to create resolve settings json file: '{filename}'"
    );

    unwrap!(
        serde_json::to_writer_pretty(&f, &settings),
        "Unable to write resolve settings json file: '{filename}'"
    );
}
