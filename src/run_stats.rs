//! Track stats for the whole resolve run
//!

use std::collections::BTreeMap;
use std::fs::File;

use camino::Utf8Path;
use log::info;
use serde::{Deserialize, Serialize};
use unwrap::unwrap;

use crate::resolve::RUN_STATS_FILENAME;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ResolveRunStats {
    pub input_record_count: usize,

    /// Total linked clusters, including CNV-only clusters
    pub cluster_count: usize,

    /// CNV-only clusters, which are passed through without classification
    pub cnv_only_cluster_count: usize,

    pub rescue_attempt_count: usize,
    pub rescue_success_count: usize,

    pub resolved_variant_count: usize,
    pub unresolved_variant_count: usize,

    /// Resolved variant counts for each complex SV type
    pub resolved_cpx_types: BTreeMap<String, usize>,

    /// Unresolved cluster counts for each unresolved category
    pub unresolved_cpx_types: BTreeMap<String, usize>,

    pub resolved_output_record_count: usize,
    pub unresolved_output_record_count: usize,
}

impl ResolveRunStats {
    pub fn add_resolved(&mut self, cpx_type: &str) {
        self.resolved_variant_count += 1;
        *self
            .resolved_cpx_types
            .entry(cpx_type.to_string())
            .or_default() += 1;
    }

    pub fn add_unresolved(&mut self, cpx_type: &str) {
        self.unresolved_variant_count += 1;
        *self
            .unresolved_cpx_types
            .entry(cpx_type.to_string())
            .or_default() += 1;
    }
}

/// Write run_stats structure out in json format
pub fn write_resolve_run_stats(output_dir: &Utf8Path, run_stats: &ResolveRunStats) {
    let filename = output_dir.join(RUN_STATS_FILENAME);

    info!("Writing run statistics to file: '{filename}'");

    let f = unwrap!(
        File::create(&filename),
        "Unable to create run statistics json file: '{filename}'"
    );

    unwrap!(
        serde_json::to_writer_pretty(&f, &run_stats),
        "Unable to write run statistics json file: '{filename}'"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpx_type_tally() {
        let mut stats = ResolveRunStats::default();
        stats.add_resolved("INV");
        stats.add_resolved("INV");
        stats.add_resolved("delINV");
        stats.add_unresolved("MATCHED_STRANDS");

        assert_eq!(stats.resolved_variant_count, 3);
        assert_eq!(stats.resolved_cpx_types.get("INV"), Some(&2));
        assert_eq!(stats.unresolved_variant_count, 1);

        let json = serde_json::to_string(&stats).unwrap();
        let stats2: ResolveRunStats = serde_json::from_str(&json).unwrap();
        assert_eq!(stats2.resolved_cpx_types, stats.resolved_cpx_types);
    }
}
