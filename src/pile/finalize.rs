use crate::{
    pile::{
        chrom::{an_multipliers, ChromosomeClass},
        metadata::SampleCounts,
        rows::{FinalRow, MergedPileRow},
        table::{for_each_batch, TableWriter},
    },
    utils::Result,
};
use std::path::Path;

/// Derives allele numbers and depth statistics for the merged pile of one region.
#[derive(Debug, Clone, Copy)]
pub struct Finalizer {
    counts: SampleCounts,
    class: ChromosomeClass,
}

impl Finalizer {
    pub fn new(counts: SampleCounts, class: ChromosomeClass) -> Self {
        Self { counts, class }
    }

    pub fn for_contig(counts: SampleCounts, contig: &str) -> Self {
        Self::new(counts, ChromosomeClass::from_contig(contig))
    }

    /// `None` for rows without any counted alternate allele.
    pub fn finalize_row(&self, row: MergedPileRow) -> Option<FinalRow> {
        if row.xx.counts.ac == 0 && row.xy.counts.ac == 0 {
            return None;
        }

        let xx_n = self.counts.xx as i64 - i64::from(row.xx.n_dp_discarded);
        let xy_n = self.counts.xy as i64 - i64::from(row.xy.n_dp_discarded);
        let (xx_mult, xy_mult) = an_multipliers(self.class, row.pos);
        let (dp_mean, dp_std) = depth_stats(row.n_samples, row.dp_sum, row.dp2_sum);

        Some(FinalRow {
            pos: row.pos,
            ref_allele: row.ref_allele,
            alt: row.alt,
            xx_an: xx_n * xx_mult,
            xx: row.xx.counts,
            xy_an: xy_n * xy_mult,
            xy: row.xy.counts,
            dp_mean,
            dp_std,
        })
    }

    pub fn finalize_rows(&self, rows: impl IntoIterator<Item = MergedPileRow>) -> Vec<FinalRow> {
        rows.into_iter()
            .filter_map(|row| self.finalize_row(row))
            .collect()
    }

    /// Streams a merged pile table into a result table, returning the number of rows kept.
    pub fn finalize_file(&self, merged: &Path, out: &Path) -> Result<usize> {
        let mut writer = TableWriter::<FinalRow>::create(out)?;
        for_each_batch(merged, |rows: Vec<MergedPileRow>| {
            writer.extend(self.finalize_rows(rows))
        })?;
        writer.finish()
    }
}

/// Population mean and standard deviation from the running sums.
///
/// Rounding can push the variance of a constant depth slightly below zero; it is clamped.
pub fn depth_stats(n_samples: u32, dp_sum: f64, dp2_sum: f64) -> (f64, f64) {
    let n = f64::from(n_samples);
    let mean = dp_sum / n;
    let variance = (dp2_sum - 2.0 * mean * dp_sum + n * mean * mean) / n;
    (mean, variance.max(0.0).sqrt())
}
