//! Classify and resolve reciprocal translocation breakpoint pairs
//!

use strum::Display;

use super::cluster_type::ClusterPartition;
use super::{ClassifierSettings, RecordUpdate, Resolution};
use crate::breakpoint_record::{BreakpointRecord, SvType};
use crate::genome_regions::ChromArms;

/// Translocation classes, the labels are used as the complex SV type
///
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum TranslocationClass {
    #[strum(serialize = "TLOC_MISMATCH_CHROM")]
    MismatchChrom,
    #[strum(serialize = "CTX_PP/QQ")]
    PpQq,
    #[strum(serialize = "CTX_PQ/QP")]
    PqQp,
    #[strum(serialize = "CTX_INS_B2A")]
    InsB2A,
    #[strum(serialize = "CTX_INS_A2B")]
    InsA2B,
    #[strum(serialize = "CTX_INV_INS_B2A")]
    InvInsB2A,
    #[strum(serialize = "CTX_INV_INS_A2B")]
    InvInsA2B,
    #[strum(serialize = "CTX_UNR")]
    Unresolved,
}

/// Sort a breakpoint pair by strand string
///
/// The first record returned is the 'plus' record, with chromosome A on the forward strand.
///
pub fn get_plus_minus<'a>(
    r1: &'a BreakpointRecord,
    r2: &'a BreakpointRecord,
) -> (&'a BreakpointRecord, &'a BreakpointRecord) {
    if r1.strands <= r2.strands {
        (r1, r2)
    } else {
        (r2, r1)
    }
}

/// Classify a pair of interchromosomal breakpoints
///
/// Chromosome A is the primary chromosome of both breakpoints and chromosome B the secondary.
/// Position comparisons allow for `mh_buffer` bases of micro-homology.
///
pub fn classify_simple_translocation(
    plus: &BreakpointRecord,
    minus: &BreakpointRecord,
    mh_buffer: i64,
) -> TranslocationClass {
    use TranslocationClass::*;

    if plus.chrom != minus.chrom || plus.chr2 != minus.chr2 {
        return MismatchChrom;
    }

    let plus_a = plus.pos;
    let minus_a = minus.pos;
    let plus_b = plus.stop();
    let minus_b = minus.stop();

    let greater = |p1: i64, p2: i64| p1 > p2 - mh_buffer;

    if plus.strands.map(|x| x.as_str()) == Some("+-") {
        if greater(minus_a, plus_a) && greater(plus_b, minus_b) {
            return PpQq;
        }
        if greater(minus_a, plus_a) && greater(minus_b, plus_b) {
            return InsB2A;
        }
        if greater(plus_a, minus_a) && greater(plus_b, minus_b) {
            return InsA2B;
        }
    } else {
        if greater(minus_a, plus_a) && greater(minus_b, plus_b) {
            return PqQp;
        }
        if greater(minus_a, plus_a) && greater(plus_b, minus_b) {
            return InvInsB2A;
        }
        if greater(plus_a, minus_a) && greater(minus_b, plus_b) {
            return InvInsA2B;
        }
    }
    Unresolved
}

/// Get the sink (insertion site) and source (inserted sequence) coordinates of a translocation
/// insertion class, as (sink_chrom, sink_start, sink_end, source_chrom, source_start, source_end)
///
fn get_insertion_coordinates(
    class: TranslocationClass,
    plus: &BreakpointRecord,
    minus: &BreakpointRecord,
) -> Option<(String, i64, i64, String, i64, i64)> {
    use TranslocationClass::*;

    let (sink_start, sink_end, source_start, source_end) = match class {
        InsB2A => (plus.pos, minus.pos, plus.stop(), minus.stop()),
        InvInsB2A => (plus.pos, minus.pos, minus.stop(), plus.stop()),
        InsA2B => (minus.stop(), plus.stop(), minus.pos, plus.pos),
        InvInsA2B => (plus.stop(), minus.stop(), minus.pos, plus.pos),
        MismatchChrom | PpQq | PqQp | Unresolved => {
            return None;
        }
    };

    let (sink_chrom, source_chrom) = match class {
        InsB2A | InvInsB2A => (plus.chrom.clone(), plus.chr2.clone()),
        _ => (plus.chr2.clone(), plus.chrom.clone()),
    };
    Some((
        sink_chrom,
        sink_start,
        sink_end,
        source_chrom,
        source_start,
        source_end,
    ))
}

/// Check chromosome arm consistency of a reciprocal translocation
///
/// Arms are looked up for both breakends of the plus record. Any missing arm is treated as a
/// mismatch.
///
fn is_arm_consistent(class: TranslocationClass, plus: &BreakpointRecord, arms: &ChromArms) -> bool {
    let arm_a = arms.get_arm(&plus.chrom, plus.pos);
    let arm_b = arms.get_arm(&plus.chr2, plus.stop());
    match (arm_a, arm_b) {
        (Some(a), Some(b)) => match class {
            TranslocationClass::PpQq => a == b,
            _ => a != b,
        },
        _ => false,
    }
}

/// Resolve a CANDIDATE_TRANSLOCATION cluster
///
pub fn resolve_translocation(
    records: &[BreakpointRecord],
    settings: &ClassifierSettings,
    arms: &ChromArms,
) -> Resolution {
    use TranslocationClass::*;

    let partition = ClusterPartition::new(records);
    assert_eq!(partition.tlocs.len(), 2);
    let (plus, minus) = get_plus_minus(partition.tlocs[0], partition.tlocs[1]);

    let class = classify_simple_translocation(plus, minus, settings.mh_buffer);
    let cpx_type = class.to_string();
    let members = records.to_vec();

    match class {
        MismatchChrom | Unresolved => Resolution::Unresolved { cpx_type, members },
        PpQq | PqQp => {
            if plus.pos == minus.pos && plus.stop() == minus.stop() {
                Resolution::Unresolved {
                    cpx_type: cpx_type + "_DUPLICATE_COORDS",
                    members,
                }
            } else if is_arm_consistent(class, plus, arms) {
                let mut update = RecordUpdate::new(SvType::Ctx, Some(cpx_type));
                update.chrom = Some(plus.chrom.clone());
                update.pos = Some(plus.pos);
                update.chr2 = Some(plus.chr2.clone());
                update.end = Some(plus.stop());
                update.svlen = Some(-1);
                Resolution::Resolved {
                    update,
                    members,
                }
            } else {
                Resolution::Unresolved {
                    cpx_type: cpx_type + "_MISMATCH",
                    members,
                }
            }
        }
        InsB2A | InsA2B | InvInsB2A | InvInsA2B => {
            let (sink_chrom, sink_start, sink_end, source_chrom, source_start, source_end) =
                get_insertion_coordinates(class, plus, minus).unwrap();

            let source_type = if matches!(class, InvInsB2A | InvInsA2B) {
                "INV"
            } else {
                "INS"
            };
            let source = format!("{source_type}_{source_chrom}:{source_start}-{source_end}");

            let mut update = RecordUpdate::new(SvType::Ins, Some(cpx_type));
            update.chrom = Some(sink_chrom);
            update.pos = Some(sink_start);
            update.end = Some(sink_end);
            update.chr2 = Some(source_chrom);
            update.svlen = Some((source_end - source_start).abs());
            update.source = Some(source);
            Resolution::Resolved {
                update,
                members,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breakpoint_record::test_utils::*;

    const MH_BUFFER: i64 = 50;

    fn tloc_pair(
        plus_strands: &str,
        plus_a: i64,
        plus_b: i64,
        minus_a: i64,
        minus_b: i64,
    ) -> Vec<BreakpointRecord> {
        let minus_strands = if plus_strands == "+-" { "-+" } else { "--" };
        vec![
            get_test_record("p", SvType::Bnd, "chr1", plus_a, "chr5", plus_b, Some(plus_strands)),
            get_test_record("m", SvType::Bnd, "chr1", minus_a, "chr5", minus_b, Some(minus_strands)),
        ]
    }

    fn get_test_arms() -> ChromArms {
        let mut arms = ChromArms::new();
        arms.add_region_value("chr1", 0, 10_000, 'p');
        arms.add_region_value("chr1", 10_000, 20_000, 'q');
        arms.add_region_value("chr5", 0, 10_000, 'p');
        arms.add_region_value("chr5", 10_000, 20_000, 'q');
        arms
    }

    #[test]
    fn test_plus_minus_order() {
        let records = tloc_pair("+-", 1000, 5000, 1010, 5010);
        let (plus, minus) = get_plus_minus(&records[1], &records[0]);
        assert_eq!(plus.id, "p");
        assert_eq!(minus.id, "m");
    }

    #[test]
    fn test_classify_simple_translocation() {
        let classify = |records: &[BreakpointRecord]| {
            classify_simple_translocation(&records[0], &records[1], MH_BUFFER)
        };

        assert_eq!(
            classify(&tloc_pair("+-", 1000, 5010, 1010, 5000)),
            TranslocationClass::PpQq
        );
        assert_eq!(
            classify(&tloc_pair("+-", 1000, 5000, 1010, 8000)),
            TranslocationClass::InsB2A
        );
        assert_eq!(
            classify(&tloc_pair("+-", 4000, 5000, 1000, 4900)),
            TranslocationClass::InsA2B
        );
        assert_eq!(
            classify(&tloc_pair("++", 1000, 5000, 1010, 5010)),
            TranslocationClass::PqQp
        );
        assert_eq!(
            classify(&tloc_pair("++", 1000, 8000, 1010, 5000)),
            TranslocationClass::InvInsB2A
        );
        assert_eq!(
            classify(&tloc_pair("++", 4000, 5000, 1000, 8000)),
            TranslocationClass::InvInsA2B
        );

        let mut records = tloc_pair("+-", 1000, 5000, 1010, 5010);
        records[1].chr2 = "chr6".to_string();
        assert_eq!(classify(&records), TranslocationClass::MismatchChrom);
    }

    /// Check that every breakpoint geometry on a small coordinate grid receives the first class
    /// whose position predicates hold, and that CTX_UNR is only returned if none hold
    ///
    #[test]
    fn test_exhaustive_translocation_grid() {
        let coords = [0, 30, 49, 50, 51, 100, 200];
        let greater = |p1: i64, p2: i64| p1 > p2 - MH_BUFFER;
        for plus_strands in ["+-", "++"] {
            for &plus_a in &coords {
                for &plus_b in &coords {
                    for &minus_a in &coords {
                        for &minus_b in &coords {
                            let records = tloc_pair(plus_strands, plus_a, plus_b, minus_a, minus_b);
                            let class = classify_simple_translocation(
                                &records[0],
                                &records[1],
                                MH_BUFFER,
                            );

                            let m_over_p_a = greater(minus_a, plus_a);
                            let p_over_m_a = greater(plus_a, minus_a);
                            let m_over_p_b = greater(minus_b, plus_b);
                            let p_over_m_b = greater(plus_b, minus_b);

                            let expected = if plus_strands == "+-" {
                                if m_over_p_a && p_over_m_b {
                                    TranslocationClass::PpQq
                                } else if m_over_p_a && m_over_p_b {
                                    TranslocationClass::InsB2A
                                } else if p_over_m_a && p_over_m_b {
                                    TranslocationClass::InsA2B
                                } else {
                                    TranslocationClass::Unresolved
                                }
                            } else if m_over_p_a && m_over_p_b {
                                TranslocationClass::PqQp
                            } else if m_over_p_a && p_over_m_b {
                                TranslocationClass::InvInsB2A
                            } else if p_over_m_a && m_over_p_b {
                                TranslocationClass::InvInsA2B
                            } else {
                                TranslocationClass::Unresolved
                            };
                            assert_eq!(class, expected);

                            // With the buffer, at least one ordering holds on each chromosome
                            assert!(m_over_p_a || p_over_m_a);
                            assert!(m_over_p_b || p_over_m_b);

                            assert_eq!(
                                get_insertion_coordinates(class, &records[0], &records[1])
                                    .is_some(),
                                class.to_string().contains("INS")
                            );
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_reciprocal_translocation() {
        let arms = get_test_arms();
        let settings = ClassifierSettings::default();

        let records = tloc_pair("+-", 1000, 5010, 1010, 5000);
        match resolve_translocation(&records, &settings, &arms) {
            Resolution::Resolved { update, .. } => {
                assert_eq!(update.svtype, SvType::Ctx);
                assert_eq!(update.cpx_type.as_deref(), Some("CTX_PP/QQ"));
                assert_eq!(update.chrom.as_deref(), Some("chr1"));
                assert_eq!(update.pos, Some(1000));
                assert_eq!(update.chr2.as_deref(), Some("chr5"));
                assert_eq!(update.end, Some(5010));
                assert_eq!(update.svlen, Some(-1));
            }
            _ => panic!("Expected resolved translocation"),
        }

        // Arm mismatch
        let records = tloc_pair("+-", 1000, 15_010, 1010, 15_000);
        match resolve_translocation(&records, &settings, &arms) {
            Resolution::Unresolved { cpx_type, members } => {
                assert_eq!(cpx_type, "CTX_PP/QQ_MISMATCH");
                assert_eq!(members.len(), 2);
            }
            _ => panic!("Expected unresolved translocation"),
        }

        // PQ/QP requires an arm mismatch
        let records = tloc_pair("++", 1000, 15_000, 1010, 15_010);
        assert!(matches!(
            resolve_translocation(&records, &settings, &arms),
            Resolution::Resolved { .. }
        ));

        // Missing arm annotation
        let records = tloc_pair("+-", 1000, 25_010, 1010, 25_000);
        assert!(matches!(
            resolve_translocation(&records, &settings, &arms),
            Resolution::Unresolved { .. }
        ));
    }

    #[test]
    fn test_duplicate_coords() {
        let records = tloc_pair("++", 1000, 5000, 1000, 5000);
        match resolve_translocation(&records, &ClassifierSettings::default(), &get_test_arms()) {
            Resolution::Unresolved { cpx_type, .. } => {
                assert_eq!(cpx_type, "CTX_PQ/QP_DUPLICATE_COORDS");
            }
            _ => panic!("Expected unresolved translocation"),
        }
    }

    #[test]
    fn test_translocation_insertion() {
        let records = tloc_pair("+-", 1000, 5000, 1010, 8000);
        match resolve_translocation(&records, &ClassifierSettings::default(), &get_test_arms()) {
            Resolution::Resolved { update, .. } => {
                assert_eq!(update.svtype, SvType::Ins);
                assert_eq!(update.cpx_type.as_deref(), Some("CTX_INS_B2A"));
                assert_eq!(update.chrom.as_deref(), Some("chr1"));
                assert_eq!(update.pos, Some(1000));
                assert_eq!(update.end, Some(1010));
                assert_eq!(update.chr2.as_deref(), Some("chr5"));
                assert_eq!(update.svlen, Some(3000));
                assert_eq!(update.source.as_deref(), Some("INS_chr5:5000-8000"));
            }
            _ => panic!("Expected resolved insertion"),
        }

        let records = tloc_pair("++", 4000, 5000, 1000, 8000);
        match resolve_translocation(&records, &ClassifierSettings::default(), &get_test_arms()) {
            Resolution::Resolved { update, .. } => {
                assert_eq!(update.cpx_type.as_deref(), Some("CTX_INV_INS_A2B"));
                assert_eq!(update.chrom.as_deref(), Some("chr5"));
                assert_eq!(update.pos, Some(5000));
                assert_eq!(update.end, Some(8000));
                assert_eq!(update.chr2.as_deref(), Some("chr1"));
                assert_eq!(update.source.as_deref(), Some("INV_chr1:1000-4000"));
            }
            _ => panic!("Expected resolved insertion"),
        }
    }
}
