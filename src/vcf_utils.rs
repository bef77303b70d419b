//! VCF input and output for breakpoint records
//!

use std::collections::HashSet;

use camino::{Utf8Path, Utf8PathBuf};
use itertools::Itertools;
use log::info;
use rust_htslib::bcf::header::{HeaderRecord, HeaderView};
use rust_htslib::bcf::record::{GenotypeAllele, Numeric};
use rust_htslib::bcf::{self, Read};
use simple_error::{SimpleError, SimpleResult, bail};
use unwrap::unwrap;

use crate::breakpoint_record::{BreakpointRecord, SvType, parse_strands};
use crate::chrom_list::ChromList;
use crate::globals::{PROGRAM_NAME, PROGRAM_VERSION};

// Imported non-public constants from rust-htslib
const VECTOR_END_INTEGER: i32 = i32::MIN + 1;
const VECTOR_END_FLOAT_BITS: u32 = 0x7F80_0002;

/// Header lines describing the fields added by complex SV resolution
///
/// Each line is only added to an output header if the same ID has not already been defined.
///
const COMPLEX_SV_HEADER_LINES: &[&str] = &[
    r#"##ALT=<ID=CTX,Description="Reciprocal chromosomal translocation">"#,
    r#"##ALT=<ID=CPX,Description="Complex SV">"#,
    r#"##ALT=<ID=INS,Description="Insertion">"#,
    r#"##ALT=<ID=UNR,Description="Unresolved breakend or complex SV">"#,
    r#"##INFO=<ID=SOURCE,Number=1,Type=String,Description="Source of inserted sequence.">"#,
    r#"##INFO=<ID=CPX_TYPE,Number=1,Type=String,Description="Class of complex variant.">"#,
    r#"##INFO=<ID=CPX_INTERVALS,Number=.,Type=String,Description="Genomic intervals constituting complex variant.">"#,
    r#"##INFO=<ID=EVENT,Number=1,Type=String,Description="ID of event associated to breakend">"#,
    r#"##INFO=<ID=UNRESOLVED,Number=0,Type=Flag,Description="Variant is unresolved.">"#,
    r#"##INFO=<ID=MEMBERS,Number=.,Type=String,Description="IDs of cluster's constituent records.">"#,
];

/// Get the (type, ID) key of a structured meta-information line such as `##INFO=<ID=END,...>`
///
fn get_meta_line_key(line: &str) -> Option<(String, String)> {
    let (meta_type, content) = line.strip_prefix("##")?.split_once("=<")?;
    let id = content
        .split(',')
        .find_map(|x| x.strip_prefix("ID="))?
        .trim_end_matches('>');
    Some((meta_type.to_string(), id.to_string()))
}

/// Get the (type, ID) keys of all structured lines already defined in a header
///
fn get_defined_keys(header: &HeaderView) -> HashSet<(String, String)> {
    let mut keys = HashSet::new();
    for header_record in header.header_records() {
        match header_record {
            HeaderRecord::Filter { key, values }
            | HeaderRecord::Info { key, values }
            | HeaderRecord::Format { key, values }
            | HeaderRecord::Contig { key, values }
            | HeaderRecord::Structured { key, values } => {
                if let Some(id) = values.get("ID") {
                    keys.insert((key, id.clone()));
                }
            }
            _ => {}
        }
    }
    keys
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum ValueType {
    Integer,
    Float,
    Flag,
    String,
}

impl ValueType {
    fn from_label(label: &str) -> Self {
        match label {
            "Integer" => Self::Integer,
            "Float" => Self::Float,
            "Flag" => Self::Flag,
            _ => Self::String,
        }
    }
}

/// INFO and FORMAT value types for every field defined in a VCF header, in header order
///
#[derive(Default)]
struct HeaderFieldTypes {
    info: Vec<(String, ValueType)>,
    format: Vec<(String, ValueType)>,
}

impl HeaderFieldTypes {
    fn new(header: &HeaderView) -> Self {
        let mut field_types = Self::default();
        for header_record in header.header_records() {
            let (fields, values) = match &header_record {
                HeaderRecord::Info { values, .. } => (&mut field_types.info, values),
                HeaderRecord::Format { values, .. } => (&mut field_types.format, values),
                _ => continue,
            };
            if let (Some(id), Some(label)) = (values.get("ID"), values.get("Type")) {
                fields.push((id.clone(), ValueType::from_label(label)));
            }
        }
        field_types
    }

    fn get_info_type(&self, key: &str) -> Option<ValueType> {
        self.info.iter().find(|(k, _)| k == key).map(|(_, t)| *t)
    }

    fn get_format_type(&self, key: &str) -> Option<ValueType> {
        self.format.iter().find(|(k, _)| k == key).map(|(_, t)| *t)
    }
}

fn is_float_vector_end(x: f32) -> bool {
    x.to_bits() == VECTOR_END_FLOAT_BITS
}

fn format_int_values(values: &[i32]) -> String {
    let s = values
        .iter()
        .filter(|&&x| x != VECTOR_END_INTEGER)
        .map(|x| {
            if x.is_missing() {
                ".".to_string()
            } else {
                x.to_string()
            }
        })
        .join(",");
    if s.is_empty() { ".".to_string() } else { s }
}

fn format_float_values(values: &[f32]) -> String {
    let s = values
        .iter()
        .filter(|&&x| !is_float_vector_end(x))
        .map(|x| {
            if x.is_missing() {
                ".".to_string()
            } else {
                x.to_string()
            }
        })
        .join(",");
    if s.is_empty() { ".".to_string() } else { s }
}

fn parse_int_values(key: &str, value: &str) -> SimpleResult<Vec<i32>> {
    let mut values = Vec::new();
    for x in value.split(',') {
        if x == "." {
            values.push(i32::missing());
        } else {
            match x.parse::<i32>() {
                Ok(x) => values.push(x),
                Err(_) => bail!("Invalid integer value for field '{key}': '{value}'"),
            }
        }
    }
    Ok(values)
}

fn parse_float_values(key: &str, value: &str) -> SimpleResult<Vec<f32>> {
    let mut values = Vec::new();
    for x in value.split(',') {
        if x == "." {
            values.push(f32::missing());
        } else {
            match x.parse::<f32>() {
                Ok(x) => values.push(x),
                Err(_) => bail!("Invalid float value for field '{key}': '{value}'"),
            }
        }
    }
    Ok(values)
}

fn parse_list(value: Option<&str>) -> Vec<String> {
    match value {
        Some(x) if x != "." => x.split(',').map(|x| x.to_string()).collect(),
        _ => Vec::new(),
    }
}

fn parse_int(key: &str, value: Option<&str>) -> SimpleResult<i64> {
    match value.map(|x| x.parse::<i64>()) {
        Some(Ok(x)) => Ok(x),
        _ => bail!("Invalid {key} value: '{}'", value.unwrap_or("")),
    }
}

/// Parse a VCF genotype string such as '0/1' or '1|0'
///
fn parse_genotype(gt: &str) -> SimpleResult<Vec<GenotypeAllele>> {
    let mut alleles = Vec::new();
    let mut is_phased = false;
    let mut rest = gt;
    loop {
        let end = rest.find(['/', '|']).unwrap_or(rest.len());
        let allele = match (&rest[..end], is_phased) {
            (".", false) => GenotypeAllele::UnphasedMissing,
            (".", true) => GenotypeAllele::PhasedMissing,
            (x, _) => {
                let index = match x.parse::<i32>() {
                    Ok(x) => x,
                    Err(_) => bail!("Invalid genotype: '{gt}'"),
                };
                if is_phased {
                    GenotypeAllele::Phased(index)
                } else {
                    GenotypeAllele::Unphased(index)
                }
            }
        };
        alleles.push(allele);
        if end == rest.len() {
            break;
        }
        is_phased = rest[end..].starts_with('|');
        rest = &rest[end + 1..];
    }
    Ok(alleles)
}

fn htslib_error(e: rust_htslib::errors::Error, context: &str) -> SimpleError {
    SimpleError::new(format!("{context}: {e}"))
}

/// Get an INFO value in VCF text form
///
/// Returns None if the field is not set in the record. A set flag is returned as `Some(None)`.
///
fn get_info_text(
    rec: &bcf::Record,
    key: &str,
    value_type: ValueType,
) -> SimpleResult<Option<Option<String>>> {
    let context = format!("Can't read INFO field '{key}'");
    let mut info = rec.info(key.as_bytes());
    let value = match value_type {
        ValueType::Flag => {
            let is_set = info.flag().map_err(|e| htslib_error(e, &context))?;
            return Ok(is_set.then_some(None));
        }
        ValueType::Integer => info
            .integer()
            .map_err(|e| htslib_error(e, &context))?
            .map(|x| format_int_values(&x)),
        ValueType::Float => info
            .float()
            .map_err(|e| htslib_error(e, &context))?
            .map(|x| format_float_values(&x)),
        ValueType::String => info
            .string()
            .map_err(|e| htslib_error(e, &context))?
            .map(|x| x.iter().map(|v| String::from_utf8_lossy(v)).join(",")),
    };
    Ok(value.map(Some))
}

/// Get the per-sample values of a FORMAT field in VCF text form
///
/// Returns None if the field is not present in the record.
///
fn get_format_text(rec: &bcf::Record, key: &str, value_type: ValueType) -> Option<Vec<String>> {
    if key == "GT" {
        let genotypes = rec.genotypes().ok()?;
        return Some(
            (0..rec.sample_count() as usize)
                .map(|i| genotypes.get(i).to_string())
                .collect(),
        );
    }

    let format = rec.format(key.as_bytes());
    match value_type {
        ValueType::Integer => {
            let values = format.integer().ok()?;
            Some(values.iter().map(|x| format_int_values(x)).collect())
        }
        ValueType::Float => {
            let values = format.float().ok()?;
            Some(values.iter().map(|x| format_float_values(x)).collect())
        }
        ValueType::String => {
            let values = format.string().ok()?;
            Some(
                values
                    .iter()
                    .map(|x| String::from_utf8_lossy(x).to_string())
                    .collect(),
            )
        }
        ValueType::Flag => None,
    }
}

/// Set one INFO field of a breakpoint record from its VCF text form
///
fn set_record_info(
    record: &mut BreakpointRecord,
    key: &str,
    value: Option<String>,
) -> SimpleResult<()> {
    let id = record.id.clone();
    let value = value.as_deref();
    match key {
        "SVTYPE" => {}
        "END" => record.set_end(parse_int(key, value)?),
        "CHR2" => {
            if let Some(x) = value {
                record.chr2 = x.to_string();
            }
        }
        "STRANDS" => match value {
            Some(x) => record.strands = Some(parse_strands(x)?),
            None => bail!("Missing STRANDS value in VCF record '{id}'"),
        },
        "SVLEN" => record.svlen = Some(parse_int(key, value)?),
        "ALGORITHMS" => record.algorithms = parse_list(value).into_iter().collect(),
        "EVIDENCE" => record.evidence = Some(parse_list(value)),
        "varGQ" => {
            record.var_gq = match value.map(|x| x.parse::<f64>()) {
                Some(Ok(x)) => Some(x),
                _ => bail!("Invalid varGQ value in VCF record '{id}'"),
            }
        }
        "CPX_TYPE" => record.cpx_type = value.map(|x| x.to_string()),
        "CPX_INTERVALS" => record.cpx_intervals = parse_list(value),
        "SOURCE" => record.source = value.map(|x| x.to_string()),
        "MEMBERS" => record.members = parse_list(value),
        "EVENT" => record.event = value.map(|x| x.to_string()),
        "UNRESOLVED" => record.unresolved = true,
        _ => record
            .other_info
            .push((key.to_string(), value.map(|x| x.to_string()))),
    }
    Ok(())
}

/// Convert a bcf record into a breakpoint record
///
fn get_breakpoint_record(
    rec: &bcf::Record,
    field_types: &HeaderFieldTypes,
) -> SimpleResult<BreakpointRecord> {
    let header = rec.header();
    let chrom = match rec.rid().map(|x| header.rid2name(x)) {
        Some(Ok(x)) => String::from_utf8_lossy(x).to_string(),
        _ => bail!("Can't find chromosome name for VCF record"),
    };
    let pos = rec.pos() + 1;
    let id = String::from_utf8_lossy(&rec.id()).to_string();

    let svtype = match get_info_text(rec, "SVTYPE", ValueType::String)? {
        Some(Some(x)) => match x.parse::<SvType>() {
            Ok(x) => x,
            Err(_) => bail!("Unknown SVTYPE '{x}' in VCF record '{id}'"),
        },
        _ => bail!("Missing SVTYPE in VCF record '{id}'"),
    };

    let mut record = BreakpointRecord::new(&chrom, pos, &id, svtype);

    let alleles = rec
        .alleles()
        .into_iter()
        .map(|x| String::from_utf8_lossy(x).to_string())
        .collect::<Vec<_>>();
    if let Some((ref_allele, alt_alleles)) = alleles.split_first() {
        record.ref_allele = ref_allele.clone();
        record.set_alt(&if alt_alleles.is_empty() {
            ".".to_string()
        } else {
            alt_alleles.join(",")
        });
    }

    let qual = rec.qual();
    record.qual = (!qual.is_missing()).then_some(qual);
    record.filter = rec
        .filters()
        .map(|x| String::from_utf8_lossy(&header.id_to_name(x)).to_string())
        .collect();

    for (key, value_type) in field_types.info.iter() {
        if let Some(value) = get_info_text(rec, key, *value_type)? {
            set_record_info(&mut record, key, value)?;
        }
    }

    // GT is always the leading FORMAT key when present
    let format_keys = field_types
        .format
        .iter()
        .sorted_by_key(|(k, _)| k != "GT")
        .collect::<Vec<_>>();
    let sample_count = rec.sample_count() as usize;
    let mut samples = vec![Vec::new(); sample_count];
    for (key, value_type) in format_keys {
        if let Some(values) = get_format_text(rec, key, *value_type) {
            record.format.push(key.clone());
            for (sample, value) in samples.iter_mut().zip(values) {
                sample.push(value);
            }
        }
    }
    if !record.format.is_empty() {
        record.samples = samples;
    }

    Ok(record)
}

/// Get all INFO fields of a breakpoint record in VCF text form, in output order
///
fn get_info_fields(record: &BreakpointRecord) -> Vec<(String, Option<String>)> {
    let mut fields = Vec::new();
    let mut add = |key: &str, value: String| fields.push((key.to_string(), Some(value)));
    if let Some(end) = record.end() {
        add("END", end.to_string());
    }
    add("SVTYPE", record.svtype.to_string());
    add("CHR2", record.chr2.clone());
    if let Some(svlen) = record.svlen {
        add("SVLEN", svlen.to_string());
    }
    if let Some(strands) = record.strands {
        add("STRANDS", strands.to_string());
    }
    if !record.algorithms.is_empty() {
        add("ALGORITHMS", record.algorithms.iter().join(","));
    }
    if let Some(evidence) = &record.evidence {
        add("EVIDENCE", evidence.join(","));
    }
    if let Some(var_gq) = record.var_gq {
        add("varGQ", var_gq.to_string());
    }
    fields.extend(record.other_info.iter().cloned());

    let mut add = |key: &str, value: String| fields.push((key.to_string(), Some(value)));
    if let Some(x) = &record.source {
        add("SOURCE", x.clone());
    }
    if let Some(x) = &record.cpx_type {
        add("CPX_TYPE", x.clone());
    }
    if !record.cpx_intervals.is_empty() {
        add("CPX_INTERVALS", record.cpx_intervals.join(","));
    }
    if !record.members.is_empty() {
        add("MEMBERS", record.members.join(","));
    }
    if let Some(x) = &record.event {
        add("EVENT", x.clone());
    }
    if record.unresolved {
        fields.push(("UNRESOLVED".to_string(), None));
    }
    fields
}

fn push_info(
    rec: &mut bcf::Record,
    key: &str,
    value: Option<&str>,
    value_type: ValueType,
) -> SimpleResult<()> {
    let tag = key.as_bytes();
    let result = match (value_type, value) {
        (ValueType::Flag, _) => rec.push_info_flag(tag),
        (_, None) => bail!("Missing value for INFO field '{key}'"),
        (ValueType::Integer, Some(x)) => rec.push_info_integer(tag, &parse_int_values(key, x)?),
        (ValueType::Float, Some(x)) => rec.push_info_float(tag, &parse_float_values(key, x)?),
        (ValueType::String, Some(x)) => rec.push_info_string(tag, &[x.as_bytes()]),
    };
    result.map_err(|e| htslib_error(e, &format!("Can't write INFO field '{key}'")))
}

/// Flatten per-sample values to the fixed width layout used for bcf FORMAT fields
///
fn flatten_sample_values<T: Copy>(values: Vec<Vec<T>>, vector_end: T) -> Vec<T> {
    let width = values.iter().map(|x| x.len()).max().unwrap_or(0);
    values
        .into_iter()
        .flat_map(|mut x| {
            x.resize(width, vector_end);
            x
        })
        .collect()
}

fn push_format(
    rec: &mut bcf::Record,
    key: &str,
    values: &[&str],
    value_type: ValueType,
) -> SimpleResult<()> {
    let tag = key.as_bytes();
    let result = if key == "GT" {
        let genotypes = values
            .iter()
            .map(|x| parse_genotype(x))
            .collect::<SimpleResult<Vec<_>>>()?;
        let ploidy = genotypes.iter().map(|x| x.len()).max().unwrap_or(0);
        let alleles = genotypes
            .into_iter()
            .flat_map(|mut x| {
                x.resize(ploidy, GenotypeAllele::UnphasedMissing);
                x
            })
            .collect::<Vec<_>>();
        rec.push_genotypes(&alleles)
    } else {
        match value_type {
            ValueType::Integer => {
                let values = values
                    .iter()
                    .map(|x| parse_int_values(key, x))
                    .collect::<SimpleResult<Vec<_>>>()?;
                rec.push_format_integer(tag, &flatten_sample_values(values, VECTOR_END_INTEGER))
            }
            ValueType::Float => {
                let values = values
                    .iter()
                    .map(|x| parse_float_values(key, x))
                    .collect::<SimpleResult<Vec<_>>>()?;
                let vector_end = f32::from_bits(VECTOR_END_FLOAT_BITS);
                rec.push_format_float(tag, &flatten_sample_values(values, vector_end))
            }
            ValueType::String => {
                let values = values.iter().map(|x| x.as_bytes()).collect::<Vec<_>>();
                rec.push_format_string(tag, &values)
            }
            ValueType::Flag => bail!("Unsupported flag type for FORMAT field '{key}'"),
        }
    };
    result.map_err(|e| htslib_error(e, &format!("Can't write FORMAT field '{key}'")))
}

/// Reader over a sorted VCF or BCF file of breakpoint records
///
pub struct VcfReader {
    filename: Utf8PathBuf,
    reader: bcf::Reader,
    rec: bcf::Record,
    field_types: HeaderFieldTypes,
    pub sample_names: Vec<String>,
}

impl VcfReader {
    pub fn from_path(filename: &Utf8Path) -> SimpleResult<Self> {
        let reader = match bcf::Reader::from_path(filename) {
            Ok(x) => x,
            Err(e) => bail!("Unable to open VCF file '{filename}': {e}"),
        };
        let header = reader.header();
        let field_types = HeaderFieldTypes::new(header);
        let sample_names = header
            .samples()
            .into_iter()
            .map(|x| String::from_utf8_lossy(x).to_string())
            .collect();
        let rec = reader.empty_record();

        Ok(Self {
            filename: filename.to_owned(),
            reader,
            rec,
            field_types,
            sample_names,
        })
    }

    /// Build the contig rank table from the header contig definitions
    ///
    pub fn get_chrom_list(&self) -> ChromList {
        let mut chrom_list = ChromList::default();
        for header_record in self.reader.header().header_records() {
            if let HeaderRecord::Contig { values, .. } = header_record
                && let Some(label) = values.get("ID")
            {
                let length = values
                    .get("length")
                    .and_then(|x| x.parse::<u64>().ok())
                    .unwrap_or(0);
                chrom_list.add_chrom(label, length);
            }
        }
        chrom_list
    }

    /// Get the output header for resolved records from this file
    ///
    /// Complex SV ALT and INFO definitions are added when missing, together with a contig entry
    /// for any chromosome in `chrom_list` which the input header does not define.
    ///
    pub fn get_output_header(&self, chrom_list: &ChromList) -> bcf::Header {
        let template = self.reader.header();
        let mut header = bcf::Header::from_template(template);

        let defined_keys = get_defined_keys(template);
        for &line in COMPLEX_SV_HEADER_LINES {
            if let Some(key) = get_meta_line_key(line)
                && !defined_keys.contains(&key)
            {
                header.push_record(line.as_bytes());
            }
        }

        for chrom_info in chrom_list.data.iter() {
            if template.name2rid(chrom_info.label.as_bytes()).is_err() {
                header.push_record(format!("##contig=<ID={}>", chrom_info.label).as_bytes());
            }
        }

        let cmdline = std::env::args().join(" ");
        header.push_record(
            format!("##{PROGRAM_NAME}_cmdline=\"{PROGRAM_VERSION} {cmdline}\"").as_bytes(),
        );
        header
    }
}

impl Iterator for VcfReader {
    type Item = SimpleResult<BreakpointRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let result = match self.reader.read(&mut self.rec)? {
            Ok(()) => get_breakpoint_record(&self.rec, &self.field_types),
            Err(e) => Err(htslib_error(e, "Failed to parse variant record")),
        };
        Some(result.map_err(|e| SimpleError::new(format!("In VCF file '{}': {e}", self.filename))))
    }
}

/// VCF writer, output is bgzf-compressed and tabix indexed if the filename ends in '.gz'
///
pub struct VcfWriter {
    filename: Utf8PathBuf,
    writer: bcf::Writer,
    field_types: HeaderFieldTypes,
    is_bgzf: bool,
    record_count: usize,
}

impl VcfWriter {
    pub fn new(filename: &Utf8Path, header: &bcf::Header) -> Self {
        let is_bgzf = filename.as_str().ends_with(".gz");
        let writer = unwrap!(
            bcf::Writer::from_path(filename, header, !is_bgzf, bcf::Format::Vcf),
            "Unable to create VCF file: '{filename}'"
        );
        let field_types = HeaderFieldTypes::new(writer.header());
        Self {
            filename: filename.to_owned(),
            writer,
            field_types,
            is_bgzf,
            record_count: 0,
        }
    }

    fn get_bcf_record(&self, record: &BreakpointRecord) -> SimpleResult<bcf::Record> {
        let header = self.writer.header();
        let mut rec = self.writer.empty_record();

        let rid = match header.name2rid(record.chrom.as_bytes()) {
            Ok(x) => x,
            Err(_) => bail!(
                "Chromosome '{}' of record '{}' is not defined in the output header",
                record.chrom,
                record.id
            ),
        };
        rec.set_rid(Some(rid));
        rec.set_pos(record.pos - 1);
        rec.set_id(record.id.as_bytes())
            .map_err(|e| htslib_error(e, "Can't set record ID"))?;

        let mut alleles = vec![record.ref_allele.as_bytes()];
        if record.alt() != "." {
            alleles.extend(record.alt().split(',').map(|x| x.as_bytes()));
        }
        rec.set_alleles(&alleles)
            .map_err(|e| htslib_error(e, "Can't set record alleles"))?;

        rec.set_qual(record.qual.unwrap_or_else(f32::missing));
        for filter in record.filter.iter() {
            let filter_id = match header.name_to_id(filter.as_bytes()) {
                Ok(x) => x,
                Err(_) => bail!("FILTER '{filter}' is not defined in the output header"),
            };
            rec.push_filter(&filter_id)
                .map_err(|e| htslib_error(e, "Can't set record filter"))?;
        }

        for (key, value) in get_info_fields(record) {
            let Some(value_type) = self.field_types.get_info_type(&key) else {
                bail!("INFO field '{key}' is not defined in the output header");
            };
            push_info(&mut rec, &key, value.as_deref(), value_type)?;
        }

        for (format_index, key) in record.format.iter().enumerate() {
            let Some(value_type) = self.field_types.get_format_type(key) else {
                bail!("FORMAT field '{key}' is not defined in the output header");
            };
            let values = record
                .samples
                .iter()
                .map(|x| x.get(format_index).map(|v| v.as_str()).unwrap_or("."))
                .collect::<Vec<_>>();
            push_format(&mut rec, key, &values, value_type)?;
        }

        Ok(rec)
    }

    pub fn write_record(&mut self, record: &BreakpointRecord) -> SimpleResult<()> {
        let rec = self
            .get_bcf_record(record)
            .map_err(|e| SimpleError::new(format!("In record '{}': {e}", record.id)))?;
        if let Err(e) = self.writer.write(&rec) {
            bail!("Unable to write record to VCF file '{}': {e}", self.filename);
        }
        self.record_count += 1;
        Ok(())
    }

    /// Close the file, and index it if compressed
    ///
    /// Returns the number of records written.
    ///
    pub fn finish(self) -> usize {
        let Self {
            filename,
            writer,
            is_bgzf,
            record_count,
            ..
        } = self;
        drop(writer);

        if is_bgzf {
            unwrap!(
                bcf::index::build(&filename, None, 1, bcf::index::Type::Tbx),
                "Unable to index VCF file: '{filename}'"
            );
        }
        info!("Wrote {record_count} records to VCF file: '{filename}'");
        record_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breakpoint_record::Strands;
    use crate::breakpoint_record::test_utils::set_test_genotypes;

    const TEST_VCF_HEADER: &str = r#"##fileformat=VCFv4.2
##contig=<ID=chr2,length=1000>
##contig=<ID=chr1,length=20000>
##FILTER=<ID=PASS,Description="All filters passed">
##ALT=<ID=INV,Description="Inversion">
##ALT=<ID=INS,Description="Insertion">
##INFO=<ID=END,Number=1,Type=Integer,Description="End position">
##INFO=<ID=SVTYPE,Number=1,Type=String,Description="SV type">
##INFO=<ID=CHR2,Number=1,Type=String,Description="Second chromosome">
##INFO=<ID=STRANDS,Number=1,Type=String,Description="Breakpoint strands">
##INFO=<ID=SVLEN,Number=1,Type=Integer,Description="SV length">
##INFO=<ID=ALGORITHMS,Number=.,Type=String,Description="Source algorithms">
##INFO=<ID=EVIDENCE,Number=.,Type=String,Description="Supporting evidence">
##INFO=<ID=CIPOS,Number=2,Type=Integer,Description="POS confidence interval">
##INFO=<ID=varGQ,Number=1,Type=Integer,Description="Variant quality">
##FORMAT=<ID=GT,Number=1,Type=String,Description="Genotype">
##FORMAT=<ID=GQ,Number=1,Type=Integer,Description="Genotype quality">
#CHROM	POS	ID	REF	ALT	QUAL	FILTER	INFO	FORMAT	s1	s2
"#;

    const TEST_VCF_RECORD: &str = "chr1\t1000\tsv1\tN\t<INV>\t.\tPASS\t\
        END=5000;SVTYPE=INV;CHR2=chr1;STRANDS=++;SVLEN=4000;ALGORITHMS=manta,delly;\
        EVIDENCE=PE,SR;CIPOS=-10,10;varGQ=999\tGT:GQ\t0/1:99\t0/0:50\n";

    fn get_test_dir(label: &str) -> Utf8PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "{PROGRAM_NAME}_vcf_utils_{}_{label}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        Utf8PathBuf::from_path_buf(dir).unwrap()
    }

    fn write_test_vcf(dir: &Utf8Path, records: &str) -> Utf8PathBuf {
        let filename = dir.join("input.vcf");
        std::fs::write(&filename, format!("{TEST_VCF_HEADER}{records}")).unwrap();
        filename
    }

    #[test]
    fn test_read_vcf_record() {
        let dir = get_test_dir("read");
        let filename = write_test_vcf(&dir, TEST_VCF_RECORD);
        let reader = VcfReader::from_path(&filename).unwrap();
        assert_eq!(reader.sample_names, vec!["s1".to_string(), "s2".to_string()]);

        let records = reader.collect::<SimpleResult<Vec<_>>>().unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];

        assert_eq!(record.chrom, "chr1");
        assert_eq!(record.pos, 1000);
        assert_eq!(record.id, "sv1");
        assert_eq!(record.alt(), "<INV>");
        assert_eq!(record.end(), Some(5000));
        assert_eq!(record.svtype, SvType::Inv);
        assert_eq!(record.strands, Some(Strands::PlusPlus));
        assert_eq!(record.algorithms.len(), 2);
        assert_eq!(record.evidence, Some(vec!["PE".to_string(), "SR".to_string()]));
        assert_eq!(record.var_gq, Some(999.0));
        assert_eq!(record.qual, None);
        assert_eq!(record.filter, vec!["PASS".to_string()]);
        assert_eq!(record.get_info("CIPOS"), Some(&Some("-10,10".to_string())));
        assert_eq!(record.format, vec!["GT".to_string(), "GQ".to_string()]);
        assert_eq!(record.sample_gt(0), Some("0/1"));
        assert_eq!(record.called_sample_indices(), vec![0]);
    }

    #[test]
    fn test_read_errors() {
        let dir = get_test_dir("errors");
        let filename = write_test_vcf(
            &dir,
            "chr1\t1000\tsv1\tN\t<INV>\t.\tPASS\tEND=5000;SVTYPE=INV;STRANDS=+\tGT\t0/1\t0/0\n",
        );
        let reader = VcfReader::from_path(&filename).unwrap();
        assert!(reader.collect::<SimpleResult<Vec<_>>>().is_err());

        let filename = write_test_vcf(&dir, "chr1\t1000\tsv1\tN\t<INV>\t.\tPASS\tEND=5000\tGT\t0/1\t0/0\n");
        let reader = VcfReader::from_path(&filename).unwrap();
        assert!(reader.collect::<SimpleResult<Vec<_>>>().is_err());

        assert!(VcfReader::from_path(&dir.join("missing.vcf")).is_err());
    }

    #[test]
    fn test_get_chrom_list() {
        let dir = get_test_dir("chroms");
        let filename = write_test_vcf(&dir, "");
        let reader = VcfReader::from_path(&filename).unwrap();
        let chrom_list = reader.get_chrom_list();
        assert_eq!(chrom_list.rank("chr2"), Some(0));
        assert_eq!(chrom_list.rank("chr1"), Some(1));
        assert_eq!(chrom_list.data[1].length, 20000);
    }

    #[test]
    fn test_write_complex_record() {
        let dir = get_test_dir("write");
        let filename = write_test_vcf(&dir, TEST_VCF_RECORD);
        let reader = VcfReader::from_path(&filename).unwrap();
        let header = reader.get_output_header(&reader.get_chrom_list());
        let mut record = reader
            .collect::<SimpleResult<Vec<_>>>()
            .unwrap()
            .remove(0);

        record.set_alt_symbol(SvType::Cpx);
        record.set_end(4500);
        record.cpx_type = Some("delINV".to_string());
        record.cpx_intervals = vec!["DEL_chr1:1000-1200".to_string(), "INV_chr1:1200-4500".to_string()];
        record.members = vec!["sv1".to_string(), "sv2".to_string()];
        record.samples[1][0] = "0|1".to_string();

        let mut unresolved = record.clone();
        unresolved.id = "sv3".to_string();
        unresolved.set_alt_symbol(SvType::Unr);
        unresolved.cpx_type = Some("MATCHED_STRANDS".to_string());
        unresolved.event = Some("UNRESOLVED_1".to_string());
        unresolved.unresolved = true;

        let output_filename = dir.join("output.vcf");
        let mut writer = VcfWriter::new(&output_filename, &header);
        writer.write_record(&record).unwrap();
        writer.write_record(&unresolved).unwrap();
        assert_eq!(writer.finish(), 2);

        let records = VcfReader::from_path(&output_filename)
            .unwrap()
            .collect::<SimpleResult<Vec<_>>>()
            .unwrap();
        assert_eq!(records.len(), 2);

        let r0 = &records[0];
        assert_eq!(r0.alt(), "<CPX>");
        assert_eq!(r0.svtype, SvType::Cpx);
        assert_eq!(r0.end(), Some(4500));
        assert_eq!(r0.cpx_type.as_deref(), Some("delINV"));
        assert_eq!(r0.cpx_intervals, record.cpx_intervals);
        assert_eq!(r0.members, record.members);
        assert_eq!(r0.algorithms, record.algorithms);
        assert_eq!(r0.get_info("CIPOS"), Some(&Some("-10,10".to_string())));
        assert_eq!(r0.sample_gt(1), Some("0|1"));
        assert_eq!(r0.samples[0], vec!["0/1".to_string(), "99".to_string()]);
        assert!(!r0.unresolved);

        let r1 = &records[1];
        assert!(r1.unresolved);
        assert_eq!(r1.event.as_deref(), Some("UNRESOLVED_1"));
        assert_eq!(r1.end(), None);
    }

    #[test]
    fn test_write_indexed_vcf() {
        let dir = get_test_dir("indexed");
        let filename = write_test_vcf(&dir, TEST_VCF_RECORD);
        let reader = VcfReader::from_path(&filename).unwrap();
        let header = reader.get_output_header(&reader.get_chrom_list());
        let records = reader.collect::<SimpleResult<Vec<_>>>().unwrap();

        let output_filename = dir.join("output.vcf.gz");
        let mut writer = VcfWriter::new(&output_filename, &header);
        for record in records.iter() {
            writer.write_record(record).unwrap();
        }
        assert_eq!(writer.finish(), 1);
        assert!(Utf8PathBuf::from(format!("{output_filename}.tbi")).exists());
    }

    #[test]
    fn test_undefined_output_chrom() {
        let dir = get_test_dir("undefined_chrom");
        let filename = write_test_vcf(&dir, "");
        let reader = VcfReader::from_path(&filename).unwrap();

        let mut chrom_list = reader.get_chrom_list();
        chrom_list.add_chrom("chr3", 0);
        let header = reader.get_output_header(&chrom_list);

        // Output records must carry one genotype column per header sample
        let mut record = BreakpointRecord::new("chr3", 100, "a", SvType::Ins);
        record.set_end(101);
        set_test_genotypes(&mut record, &["0/1", "0/0"]);
        let mut writer = VcfWriter::new(&dir.join("chr3.vcf"), &header);
        writer.write_record(&record).unwrap();

        let mut record = BreakpointRecord::new("chr4", 100, "b", SvType::Ins);
        record.set_end(101);
        set_test_genotypes(&mut record, &["0/1", "0/0"]);
        assert!(writer.write_record(&record).is_err());
    }

    #[test]
    fn test_parse_genotype() {
        assert_eq!(
            parse_genotype("0/1").unwrap(),
            vec![GenotypeAllele::Unphased(0), GenotypeAllele::Unphased(1)]
        );
        assert_eq!(
            parse_genotype("1|.").unwrap(),
            vec![GenotypeAllele::Unphased(1), GenotypeAllele::PhasedMissing]
        );
        assert!(parse_genotype("0/x").is_err());
    }

    #[test]
    fn test_format_values() {
        assert_eq!(format_int_values(&[1, i32::missing(), VECTOR_END_INTEGER]), "1,.");
        assert_eq!(format_int_values(&[VECTOR_END_INTEGER]), ".");
        assert_eq!(parse_int_values("CIPOS", "-10,.").unwrap(), vec![-10, i32::missing()]);
        assert!(parse_int_values("CIPOS", "-10,a").is_err());
    }
}
