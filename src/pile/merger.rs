//! Group-by-sum of pile rows over `(pos, ref, alt)`.

use crate::{
    pile::{
        rows::{MergedPileRow, PileRow, SexCounts},
        table::{for_each_batch, write_table},
    },
    utils::Result,
};
use std::{collections::BTreeMap, path::Path};

type PileKey = (i64, String, String);

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Totals {
    xx: SexCounts,
    xy: SexCounts,
    n_samples: u32,
    dp_sum: f64,
    dp2_sum: f64,
}

impl Totals {
    fn add(&mut self, other: &Totals) {
        self.xx.add(&other.xx);
        self.xy.add(&other.xy);
        self.n_samples += other.n_samples;
        self.dp_sum += other.dp_sum;
        self.dp2_sum += other.dp2_sum;
    }
}

/// Aggregation context owned by a single merge task.
///
/// Accepts per-file pile rows and already merged rows alike, so merging partial merges
/// gives the same sums as merging everything at once.
#[derive(Debug, Default)]
pub struct PileAggregator {
    groups: BTreeMap<PileKey, Totals>,
}

impl PileAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_pile_row(&mut self, row: PileRow) {
        let dp = f64::from(row.dp);
        let totals = Totals {
            xx: row.xx,
            xy: row.xy,
            n_samples: 1,
            dp_sum: dp,
            dp2_sum: dp * dp,
        };
        self.add((row.pos, row.ref_allele, row.alt), &totals);
    }

    pub fn add_merged_row(&mut self, row: MergedPileRow) {
        let totals = Totals {
            xx: row.xx,
            xy: row.xy,
            n_samples: row.n_samples,
            dp_sum: row.dp_sum,
            dp2_sum: row.dp2_sum,
        };
        self.add((row.pos, row.ref_allele, row.alt), &totals);
    }

    fn add(&mut self, key: PileKey, totals: &Totals) {
        self.groups.entry(key).or_default().add(totals);
    }

    pub fn add_pile_file(&mut self, path: &Path) -> Result<()> {
        for_each_batch(path, |rows: Vec<PileRow>| {
            rows.into_iter().for_each(|row| self.add_pile_row(row));
            Ok(())
        })
    }

    pub fn add_merged_file(&mut self, path: &Path) -> Result<()> {
        for_each_batch(path, |rows: Vec<MergedPileRow>| {
            rows.into_iter().for_each(|row| self.add_merged_row(row));
            Ok(())
        })
    }

    /// Rows sorted by `(pos, ref, alt)`.
    pub fn finish(self) -> Vec<MergedPileRow> {
        self.groups
            .into_iter()
            .map(|((pos, ref_allele, alt), totals)| MergedPileRow {
                pos,
                ref_allele,
                alt,
                xx: totals.xx,
                xy: totals.xy,
                n_samples: totals.n_samples,
                dp_sum: totals.dp_sum,
                dp2_sum: totals.dp2_sum,
            })
            .collect()
    }

    pub fn write(self, path: &Path) -> Result<usize> {
        let n_rows = write_table(path, self.finish())?;
        log::debug!("Merged {} distinct alleles into {}", n_rows, path.display());
        Ok(n_rows)
    }
}

/// Merges the per-file piles of one region into a single sorted table.
pub fn merge_piles(piles: &[impl AsRef<Path>], out: &Path) -> Result<usize> {
    let mut aggregator = PileAggregator::new();
    for pile in piles {
        aggregator.add_pile_file(pile.as_ref())?;
    }
    aggregator.write(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pile::{genotype::CountTriple, table::read_table};
    use tempfile::tempdir;

    fn row(pos: i64, alt: &str, xx: CountTriple, xy: CountTriple, dp: i32) -> PileRow {
        PileRow {
            pos,
            ref_allele: "A".into(),
            alt: alt.into(),
            xx: SexCounts {
                counts: xx,
                n_dp_discarded: 0,
            },
            xy: SexCounts {
                counts: xy,
                n_dp_discarded: 0,
            },
            dp,
        }
    }

    fn sample_rows() -> Vec<PileRow> {
        vec![
            row(300, "T", CountTriple::HET, CountTriple::ZERO, 12),
            row(100, "G", CountTriple::HET, CountTriple::ZERO, 20),
            row(100, "G", CountTriple::ZERO, CountTriple::HOM_ALT, 30),
            row(100, "C", CountTriple::ZERO, CountTriple::HEMI, 8),
            row(300, "T", CountTriple::HOM_ALT, CountTriple::ZERO, 16),
        ]
    }

    fn merge_all(rows: Vec<PileRow>) -> Vec<MergedPileRow> {
        let mut aggregator = PileAggregator::new();
        rows.into_iter().for_each(|r| aggregator.add_pile_row(r));
        aggregator.finish()
    }

    #[test]
    fn test_groups_are_summed_and_sorted() {
        let merged = merge_all(sample_rows());
        let keys: Vec<(i64, &str)> = merged.iter().map(|r| (r.pos, r.alt.as_str())).collect();
        assert_eq!(keys, vec![(100, "C"), (100, "G"), (300, "T")]);

        let g = &merged[1];
        assert_eq!(g.xx.counts, CountTriple::HET);
        assert_eq!(g.xy.counts, CountTriple::HOM_ALT);
        assert_eq!(g.n_samples, 2);
        assert_eq!(g.dp_sum, 50.0);
        assert_eq!(g.dp2_sum, 1300.0);
    }

    #[test]
    fn test_order_of_rows_does_not_matter() {
        let mut reversed = sample_rows();
        reversed.reverse();
        assert_eq!(merge_all(sample_rows()), merge_all(reversed));
    }

    #[test]
    fn test_merging_partial_merges_matches_single_merge() {
        let rows = sample_rows();
        let expected = merge_all(rows.clone());

        let mut combined = PileAggregator::new();
        for chunk in rows.chunks(2) {
            for merged in merge_all(chunk.to_vec()) {
                combined.add_merged_row(merged);
            }
        }
        assert_eq!(combined.finish(), expected);
    }

    #[test]
    fn test_single_sample_piles_match_cohort_pile() -> Result<()> {
        let dir = tempdir()?;
        let rows = sample_rows();

        let mut single_paths = Vec::new();
        for (i, r) in rows.iter().enumerate() {
            let path = dir.path().join(format!("sample{}.parquet", i));
            write_table(&path, vec![r.clone()])?;
            single_paths.push(path);
        }
        let cohort_path = dir.path().join("cohort.parquet");
        write_table(&cohort_path, rows)?;

        let from_singles = dir.path().join("singles_merged.parquet");
        let from_cohort = dir.path().join("cohort_merged.parquet");
        merge_piles(&single_paths, &from_singles)?;
        merge_piles(&[&cohort_path], &from_cohort)?;

        assert_eq!(
            read_table::<MergedPileRow>(&from_singles)?,
            read_table::<MergedPileRow>(&from_cohort)?
        );
        Ok(())
    }

    #[test]
    fn test_empty_pile_is_neutral() -> Result<()> {
        let dir = tempdir()?;
        let pile = dir.path().join("pile.parquet");
        let empty = dir.path().join("empty.parquet");
        write_table(&pile, sample_rows())?;
        write_table::<PileRow>(&empty, Vec::new())?;

        let out = dir.path().join("merged.parquet");
        merge_piles(&[&pile, &empty], &out)?;
        assert_eq!(read_table::<MergedPileRow>(&out)?, merge_all(sample_rows()));
        Ok(())
    }

    #[test]
    fn test_discarded_counts_are_summed() {
        let mut low_depth = row(100, "G", CountTriple::ZERO, CountTriple::ZERO, 3);
        low_depth.xx.n_dp_discarded = 1;
        let merged = merge_all(vec![low_depth.clone(), low_depth]);
        assert_eq!(merged[0].xx.n_dp_discarded, 2);
        assert_eq!(merged[0].n_samples, 2);
    }
}
