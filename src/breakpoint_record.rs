use std::collections::BTreeSet;
use std::fmt;

use simple_error::{SimpleResult, bail};
use strum::{Display, EnumString, IntoStaticStr};

use crate::genome_slink::GenomeNode;
use crate::int_range::IntRange;

/// SV type declared in the SVTYPE field
///
/// Standardized input records use DEL, DUP, INV, BND and INS. The remaining types are only
/// produced by complex SV resolution, but are accepted on input so that resolved output can be
/// read back in.
///
#[derive(Clone, Copy, Debug, Display, EnumString, Eq, Hash, IntoStaticStr, PartialEq)]
#[strum(serialize_all = "UPPERCASE")]
pub enum SvType {
    Del,
    Dup,
    Inv,
    Bnd,
    Ins,
    Ctx,
    Cpx,
    Unr,
}

impl SvType {
    pub fn is_cnv(&self) -> bool {
        matches!(self, SvType::Del | SvType::Dup)
    }
}

/// Single breakend strand
#[derive(Clone, Copy, Debug, Display, EnumString, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Strand {
    #[strum(serialize = "+")]
    Plus,
    #[strum(serialize = "-")]
    Minus,
}

impl Strand {
    pub fn opposite(&self) -> Self {
        match self {
            Strand::Plus => Strand::Minus,
            Strand::Minus => Strand::Plus,
        }
    }
}

/// Breakpoint strand pair, given as the STRANDS INFO field
///
/// Variant order matches the lexical order of the encoded strings, so sorting a pair of
/// breakpoints by strands always puts the '+' leading breakpoint first.
///
#[derive(
    Clone, Copy, Debug, Display, EnumString, Eq, Hash, IntoStaticStr, Ord, PartialEq, PartialOrd,
)]
pub enum Strands {
    #[strum(serialize = "++")]
    PlusPlus,
    #[strum(serialize = "+-")]
    PlusMinus,
    #[strum(serialize = "-+")]
    MinusPlus,
    #[strum(serialize = "--")]
    MinusMinus,
}

impl Strands {
    pub fn from_pair(a: Strand, b: Strand) -> Self {
        match (a, b) {
            (Strand::Plus, Strand::Plus) => Strands::PlusPlus,
            (Strand::Plus, Strand::Minus) => Strands::PlusMinus,
            (Strand::Minus, Strand::Plus) => Strands::MinusPlus,
            (Strand::Minus, Strand::Minus) => Strands::MinusMinus,
        }
    }

    pub fn first(&self) -> Strand {
        match self {
            Strands::PlusPlus | Strands::PlusMinus => Strand::Plus,
            Strands::MinusPlus | Strands::MinusMinus => Strand::Minus,
        }
    }

    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

/// Parse the STRANDS field
///
/// A malformed strand string is an input contract violation.
///
pub fn parse_strands(s: &str) -> SimpleResult<Strands> {
    match s.parse::<Strands>() {
        Ok(x) => Ok(x),
        Err(_) => bail!("Invalid STRANDS value '{s}'"),
    }
}

/// Return true if the genotype string contains a non-reference allele
///
pub fn is_carrier_gt(gt: &str) -> bool {
    gt.split(['/', '|'])
        .any(|allele| !allele.is_empty() && allele != "0" && allele != ".")
}

/// An SV breakpoint call from the standardized input stream, or a record synthesized from them
///
/// Coordinates are stored as given in the VCF: `pos` is the 1-indexed POS column and `end` is
/// the END INFO field.
///
#[derive(Clone, PartialEq)]
pub struct BreakpointRecord {
    pub chrom: String,
    pub pos: i64,
    pub id: String,
    pub ref_allele: String,

    /// Use `set_alt` to update this value, see the notes on END clearing below
    alt: String,

    /// QUAL column, None if missing
    pub qual: Option<f32>,

    /// FILTER column labels, empty if missing
    pub filter: Vec<String>,

    pub svtype: SvType,
    pub chr2: String,

    /// END is cleared whenever the ALT allele is reassigned
    end: Option<i64>,

    pub strands: Option<Strands>,
    pub svlen: Option<i64>,
    pub algorithms: BTreeSet<String>,
    pub evidence: Option<Vec<String>>,
    pub var_gq: Option<f64>,

    pub cpx_type: Option<String>,
    pub cpx_intervals: Vec<String>,
    pub source: Option<String>,
    pub members: Vec<String>,
    pub event: Option<String>,
    pub unresolved: bool,

    /// All other INFO fields in input order, passed through without interpretation
    pub other_info: Vec<(String, Option<String>)>,

    /// FORMAT keys, and the matching values for each sample
    pub format: Vec<String>,
    pub samples: Vec<Vec<String>>,
}

impl BreakpointRecord {
    pub fn new(chrom: &str, pos: i64, id: &str, svtype: SvType) -> Self {
        Self {
            chrom: chrom.to_string(),
            pos,
            id: id.to_string(),
            ref_allele: "N".to_string(),
            alt: format!("<{svtype}>"),
            qual: None,
            filter: Vec::new(),
            svtype,
            chr2: chrom.to_string(),
            end: None,
            strands: None,
            svlen: None,
            algorithms: BTreeSet::new(),
            evidence: None,
            var_gq: None,
            cpx_type: None,
            cpx_intervals: Vec::new(),
            source: None,
            members: Vec::new(),
            event: None,
            unresolved: false,
            other_info: Vec::new(),
            format: Vec::new(),
            samples: Vec::new(),
        }
    }

    pub fn alt(&self) -> &str {
        &self.alt
    }

    /// Set the ALT allele
    ///
    /// This clears END, so any span update for the record must be written after this call.
    ///
    pub fn set_alt(&mut self, alt: &str) {
        self.alt = alt.to_string();
        self.end = None;
    }

    /// Set the ALT allele to the symbolic allele of `svtype`, and update SVTYPE to match
    ///
    /// As with `set_alt`, this clears END.
    ///
    pub fn set_alt_symbol(&mut self, svtype: SvType) {
        self.set_alt(&format!("<{svtype}>"));
        self.svtype = svtype;
    }

    pub fn end(&self) -> Option<i64> {
        self.end
    }

    pub fn set_end(&mut self, end: i64) {
        self.end = Some(end);
    }

    /// End position of the record, falling back to POS when END is not set
    ///
    pub fn stop(&self) -> i64 {
        self.end.unwrap_or(self.pos)
    }

    pub fn is_interchromosomal(&self) -> bool {
        self.chrom != self.chr2
    }

    pub fn is_cnv(&self) -> bool {
        self.svtype.is_cnv()
    }

    /// True if the record is supported by split reads only
    ///
    pub fn is_sr_only(&self) -> bool {
        match &self.evidence {
            Some(x) => x.len() == 1 && x[0] == "SR",
            None => false,
        }
    }

    /// The [POS,END) span of an intrachromosomal record
    ///
    pub fn span(&self) -> IntRange {
        IntRange::from_span(self.pos, self.stop())
    }

    pub fn get_info(&self, key: &str) -> Option<&Option<String>> {
        self.other_info
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn remove_info(&mut self, key: &str) {
        self.other_info.retain(|(k, _)| k != key);
    }

    fn format_index(&self, key: &str) -> Option<usize> {
        self.format.iter().position(|x| x == key)
    }

    /// Genotype string for the given sample, if a GT field is present
    ///
    pub fn sample_gt(&self, sample_index: usize) -> Option<&str> {
        let gt_index = self.format_index("GT")?;
        self.samples
            .get(sample_index)?
            .get(gt_index)
            .map(|x| x.as_str())
    }

    /// Indices of all samples with a non-reference genotype
    ///
    pub fn called_sample_indices(&self) -> Vec<usize> {
        (0..self.samples.len())
            .filter(|&i| self.sample_gt(i).is_some_and(is_carrier_gt))
            .collect()
    }

    /// Names of all samples with a non-reference genotype
    ///
    pub fn called_samples(&self, sample_names: &[String]) -> BTreeSet<String> {
        self.called_sample_indices()
            .into_iter()
            .filter_map(|i| sample_names.get(i).cloned())
            .collect()
    }

    /// Replace one sample's FORMAT values with those from another record
    ///
    /// Values are transferred by FORMAT key, keys missing from `other` are set to missing.
    ///
    pub fn copy_sample_from(&mut self, other: &BreakpointRecord, sample_index: usize) {
        let Some(other_values) = other.samples.get(sample_index) else {
            return;
        };
        let values = self
            .format
            .iter()
            .map(|key| match other.format_index(key) {
                Some(i) => other_values
                    .get(i)
                    .cloned()
                    .unwrap_or_else(|| ".".to_string()),
                None => ".".to_string(),
            })
            .collect::<Vec<_>>();
        if let Some(x) = self.samples.get_mut(sample_index) {
            *x = values;
        }
    }
}

impl fmt::Debug for BreakpointRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "BreakpointRecord: {} {}:{} {} {}:{} strands: {:?}",
            self.id, self.chrom, self.pos, self.svtype, self.chr2, self.stop(), self.strands,
        )
    }
}

impl GenomeNode for BreakpointRecord {
    fn chrom_a(&self) -> &str {
        &self.chrom
    }

    fn pos_a(&self) -> i64 {
        self.pos
    }

    fn chrom_b(&self) -> &str {
        &self.chr2
    }

    fn pos_b(&self) -> i64 {
        self.stop()
    }

    fn strands(&self) -> Option<&str> {
        self.strands.as_ref().map(|x| x.as_str())
    }
}
