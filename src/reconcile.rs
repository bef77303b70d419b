//! Merge synthesized complex SV records back into the sorted input record stream
//!

use std::cmp::Ordering;
use std::collections::{HashSet, VecDeque};

use crate::breakpoint_record::BreakpointRecord;
use crate::chrom_list::ChromList;

/// INFO fields removed from every output record
const STRIPPED_INFO_KEYS: [&str; 3] = ["CIPOS", "CIEND", "RMSSTD"];

fn compare_records(chrom_list: &ChromList, r1: &BreakpointRecord, r2: &BreakpointRecord) -> Ordering {
    chrom_list.compare_pos(&r1.chrom, r1.pos, &r2.chrom, r2.pos)
}

/// Remove fields which are no longer valid on an output record
///
/// STRANDS is dropped from resolved complex records, and the breakpoint confidence fields are
/// dropped from all records.
///
pub fn clean_output_record(record: &mut BreakpointRecord) {
    if record.cpx_type.is_some() && !record.unresolved {
        record.strands = None;
    }
    for key in STRIPPED_INFO_KEYS {
        record.remove_info(key);
    }
}

/// Iterator merging the sorted original records with the synthesized records
///
/// Original records with a consumed id are skipped. When an original and a synthesized record
/// have the same position, the original is returned first.
///
pub struct MergedRecords<'a, I> {
    chrom_list: &'a ChromList,
    originals: I,
    next_original: Option<BreakpointRecord>,
    synthesized: VecDeque<BreakpointRecord>,
    consumed_ids: HashSet<String>,
}

impl<I> MergedRecords<'_, I>
where
    I: Iterator<Item = BreakpointRecord>,
{
    fn fill_next_original(&mut self) {
        if self.next_original.is_some() {
            return;
        }
        self.next_original = self
            .originals
            .by_ref()
            .find(|x| !self.consumed_ids.contains(&x.id));
    }
}

impl<I> Iterator for MergedRecords<'_, I>
where
    I: Iterator<Item = BreakpointRecord>,
{
    type Item = BreakpointRecord;

    fn next(&mut self) -> Option<Self::Item> {
        self.fill_next_original();

        let use_synthesized = match (&self.next_original, self.synthesized.front()) {
            (Some(original), Some(synthesized)) => {
                compare_records(self.chrom_list, synthesized, original) == Ordering::Less
            }
            (None, Some(_)) => true,
            (_, None) => false,
        };

        let mut record = if use_synthesized {
            self.synthesized.pop_front()
        } else {
            self.next_original.take()
        }?;
        clean_output_record(&mut record);
        Some(record)
    }
}

/// Merge synthesized records into the original record stream
///
/// `originals` must be sorted in `chrom_list` order. The synthesized records are stably sorted
/// before merging.
///
pub fn merge_records<I>(
    originals: I,
    mut synthesized: Vec<BreakpointRecord>,
    consumed_ids: HashSet<String>,
    chrom_list: &ChromList,
) -> MergedRecords<'_, I::IntoIter>
where
    I: IntoIterator<Item = BreakpointRecord>,
{
    synthesized.sort_by(|a, b| compare_records(chrom_list, a, b));
    MergedRecords {
        chrom_list,
        originals: originals.into_iter(),
        next_original: None,
        synthesized: synthesized.into(),
        consumed_ids,
    }
}
