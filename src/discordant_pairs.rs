//! Discordant read pair evidence used to rescue single-ended inversions
//!

use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, warn};
use rust_htslib::tbx::{self, Read};
use simple_error::{SimpleResult, bail};
use unwrap::unwrap;

use crate::breakpoint_record::Strand;
use crate::genome_slink::GenomeNode;

/// A discordant read pair, as scraped into the tab-delimited pair evidence file
///
/// Columns are `chrA posA strandA chrB posB strandB sample`.
///
#[derive(Clone, Debug, PartialEq)]
pub struct DiscordantPair {
    pub chrom_a: String,
    pub pos_a: i64,
    pub strand_a: Strand,
    pub chrom_b: String,
    pub pos_b: i64,
    pub strand_b: Strand,
    pub sample: String,
}

impl DiscordantPair {
    pub fn parse(line: &str) -> SimpleResult<Self> {
        let words = line.split_whitespace().collect::<Vec<_>>();
        if words.len() < 7 {
            bail!("Expected 7 columns in discordant pair line: '{line}'");
        }

        let parse_pos = |x: &str| -> SimpleResult<i64> {
            match x.parse::<i64>() {
                Ok(x) => Ok(x),
                Err(_) => bail!("Invalid position '{x}' in discordant pair line: '{line}'"),
            }
        };
        let parse_strand = |x: &str| -> SimpleResult<Strand> {
            match x.parse::<Strand>() {
                Ok(x) => Ok(x),
                Err(_) => bail!("Invalid strand '{x}' in discordant pair line: '{line}'"),
            }
        };

        Ok(Self {
            chrom_a: words[0].to_string(),
            pos_a: parse_pos(words[1])?,
            strand_a: parse_strand(words[2])?,
            chrom_b: words[3].to_string(),
            pos_b: parse_pos(words[4])?,
            strand_b: parse_strand(words[5])?,
            sample: words[6].to_string(),
        })
    }

    /// True for intrachromosomal pairs with both reads on the same strand
    pub fn is_inversion(&self) -> bool {
        self.chrom_a == self.chrom_b && self.strand_a == self.strand_b
    }
}

impl GenomeNode for DiscordantPair {
    fn chrom_a(&self) -> &str {
        &self.chrom_a
    }

    fn pos_a(&self) -> i64 {
        self.pos_a
    }

    fn chrom_b(&self) -> &str {
        &self.chrom_b
    }

    fn pos_b(&self) -> i64 {
        self.pos_b
    }
}

/// Source of discordant pairs for a genomic region
///
pub trait PairEvidenceSource {
    /// Get all pairs with the first read in the zero-indexed, half-open range `[start, end)` of
    /// `chrom`
    ///
    /// A chromosome without any pair evidence returns no pairs.
    ///
    fn fetch_pairs(
        &mut self,
        chrom: &str,
        start: i64,
        end: i64,
    ) -> SimpleResult<Vec<DiscordantPair>>;
}

/// Pair evidence from one or more tabix indexed pair files
///
/// Queries are run against every file and the results concatenated.
///
pub struct TabixPairSource {
    readers: Vec<(Utf8PathBuf, tbx::Reader)>,
}

impl TabixPairSource {
    pub fn from_paths(filenames: &[Utf8PathBuf]) -> Self {
        let readers = filenames
            .iter()
            .map(|filename| {
                let reader = unwrap!(
                    tbx::Reader::from_path(filename),
                    "Unable to open tabix indexed discordant pair file: '{filename}'"
                );
                (filename.clone(), reader)
            })
            .collect();
        Self { readers }
    }

    /// Read a list of pair files, one per line, with an optional index filename in the second
    /// column
    ///
    /// Indexes are always expected at the default '.tbi' location next to each pair file.
    ///
    pub fn from_list_file(list_filename: &Utf8Path) -> SimpleResult<Self> {
        let content = unwrap!(
            std::fs::read_to_string(list_filename),
            "Unable to read discordant pair file list: '{list_filename}'"
        );

        let mut filenames = Vec::new();
        for line in content.lines() {
            let mut words = line.split_whitespace();
            let Some(filename) = words.next() else {
                continue;
            };
            if let Some(index_filename) = words.next() {
                let default_index = format!("{filename}.tbi");
                if index_filename != default_index {
                    warn!(
                        "Ignoring index '{index_filename}' for discordant pair file '{filename}', expected index at '{default_index}'"
                    );
                }
            }
            filenames.push(Utf8PathBuf::from(filename));
        }

        if filenames.is_empty() {
            bail!("No discordant pair files found in list: '{list_filename}'");
        }
        Ok(Self::from_paths(&filenames))
    }
}

fn fetch_reader_pairs(
    filename: &Utf8Path,
    reader: &mut tbx::Reader,
    chrom: &str,
    start: i64,
    end: i64,
) -> SimpleResult<Vec<DiscordantPair>> {
    let Ok(tid) = reader.tid(chrom) else {
        debug!("Chromosome '{chrom}' not found in discordant pair file index: '{filename}'");
        return Ok(Vec::new());
    };
    if let Err(e) = reader.fetch(tid, start.max(0) as u64, end.max(0) as u64) {
        bail!("Failed to fetch {chrom}:{start}-{end} from discordant pair file '{filename}': {e}");
    }

    let mut pairs = Vec::new();
    for record in reader.records() {
        let record = match record {
            Ok(x) => x,
            Err(e) => bail!("Failed to read discordant pair file '{filename}': {e}"),
        };
        let line = String::from_utf8_lossy(&record);
        pairs.push(DiscordantPair::parse(&line)?);
    }
    Ok(pairs)
}

impl PairEvidenceSource for TabixPairSource {
    fn fetch_pairs(
        &mut self,
        chrom: &str,
        start: i64,
        end: i64,
    ) -> SimpleResult<Vec<DiscordantPair>> {
        if end <= start {
            return Ok(Vec::new());
        }

        let mut pairs = Vec::new();
        for (filename, reader) in self.readers.iter_mut() {
            pairs.extend(fetch_reader_pairs(filename, reader, chrom, start, end)?);
        }
        Ok(pairs)
    }
}
