//! Row types of the three tables: per-file piles, merged piles and finalized results.

use crate::{
    pile::{
        chrom::Sex,
        genotype::{CountTriple, Observation},
        table::{column, TableRow},
    },
    utils::Result,
};
use arrow::{
    array::{ArrayRef, Float64Array, Int32Array, Int64Array, StringArray, UInt32Array},
    datatypes::{DataType, Field, Schema, SchemaRef},
    record_batch::RecordBatch,
};
use std::sync::Arc;

/// Counts contributed to one sex's columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SexCounts {
    pub counts: CountTriple,
    pub n_dp_discarded: u32,
}

impl SexCounts {
    pub fn add(&mut self, other: &SexCounts) {
        self.counts.ac += other.counts.ac;
        self.counts.ac_hom += other.counts.ac_hom;
        self.counts.ac_hemi += other.counts.ac_hemi;
        self.n_dp_discarded += other.n_dp_discarded;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PileRow {
    pub pos: i64,
    pub ref_allele: String,
    pub alt: String,
    pub xx: SexCounts,
    pub xy: SexCounts,
    pub dp: i32,
}

impl PileRow {
    /// Low depth discards the observation from the allele number; a failed quality filter only zeroes the counts.
    pub fn from_observation(
        pos: i64,
        ref_allele: &str,
        observation: &Observation,
        sex: Sex,
        dp: i32,
        min_dp: i32,
    ) -> Self {
        let own = if dp < min_dp {
            SexCounts {
                counts: CountTriple::ZERO,
                n_dp_discarded: 1,
            }
        } else if observation.pass {
            SexCounts {
                counts: observation.counts,
                n_dp_discarded: 0,
            }
        } else {
            SexCounts::default()
        };
        let (xx, xy) = match sex {
            Sex::XX => (own, SexCounts::default()),
            Sex::XY => (SexCounts::default(), own),
        };
        Self {
            pos,
            ref_allele: ref_allele.to_string(),
            alt: observation.allele.to_string(),
            xx,
            xy,
            dp,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergedPileRow {
    pub pos: i64,
    pub ref_allele: String,
    pub alt: String,
    pub xx: SexCounts,
    pub xy: SexCounts,
    pub n_samples: u32,
    pub dp_sum: f64,
    pub dp2_sum: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FinalRow {
    pub pos: i64,
    pub ref_allele: String,
    pub alt: String,
    pub xx_an: i64,
    pub xx: CountTriple,
    pub xy_an: i64,
    pub xy: CountTriple,
    pub dp_mean: f64,
    pub dp_std: f64,
}

fn key_fields() -> Vec<Field> {
    vec![
        Field::new("pos", DataType::Int64, false),
        Field::new("ref", DataType::Utf8, false),
        Field::new("alt", DataType::Utf8, false),
    ]
}

fn triple_fields(prefix: &str) -> Vec<Field> {
    ["AC", "AC_hom", "AC_hemi"]
        .iter()
        .map(|name| Field::new(format!("{}_{}", prefix, name), DataType::UInt32, false))
        .collect()
}

fn sex_count_fields(prefix: &str) -> Vec<Field> {
    let mut fields = triple_fields(prefix);
    fields.push(Field::new(
        format!("{}_n_DP_discarded", prefix),
        DataType::UInt32,
        false,
    ));
    fields
}

fn u32_column<T>(rows: &[T], value: impl Fn(&T) -> u32) -> ArrayRef {
    Arc::new(UInt32Array::from_iter_values(rows.iter().map(value)))
}

fn key_columns<T>(rows: &[T], key: impl Fn(&T) -> (i64, &str, &str)) -> Vec<ArrayRef> {
    vec![
        Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| key(r).0))),
        Arc::new(StringArray::from_iter_values(rows.iter().map(|r| key(r).1))),
        Arc::new(StringArray::from_iter_values(rows.iter().map(|r| key(r).2))),
    ]
}

fn triple_columns<T>(rows: &[T], triple: impl Fn(&T) -> CountTriple) -> Vec<ArrayRef> {
    vec![
        u32_column(rows, |r| triple(r).ac),
        u32_column(rows, |r| triple(r).ac_hom),
        u32_column(rows, |r| triple(r).ac_hemi),
    ]
}

fn sex_count_columns<T>(rows: &[T], counts: impl Fn(&T) -> SexCounts) -> Vec<ArrayRef> {
    let mut columns = triple_columns(rows, |r| counts(r).counts);
    columns.push(u32_column(rows, |r| counts(r).n_dp_discarded));
    columns
}

struct KeyColumns<'b> {
    pos: &'b Int64Array,
    ref_allele: &'b StringArray,
    alt: &'b StringArray,
}

impl<'b> KeyColumns<'b> {
    fn read(batch: &'b RecordBatch) -> Result<Self> {
        Ok(Self {
            pos: column(batch, "pos")?,
            ref_allele: column(batch, "ref")?,
            alt: column(batch, "alt")?,
        })
    }

    fn key(&self, i: usize) -> (i64, String, String) {
        (
            self.pos.value(i),
            self.ref_allele.value(i).to_string(),
            self.alt.value(i).to_string(),
        )
    }
}

struct TripleColumns<'b> {
    ac: &'b UInt32Array,
    ac_hom: &'b UInt32Array,
    ac_hemi: &'b UInt32Array,
}

impl<'b> TripleColumns<'b> {
    fn read(batch: &'b RecordBatch, prefix: &str) -> Result<Self> {
        Ok(Self {
            ac: column(batch, &format!("{}_AC", prefix))?,
            ac_hom: column(batch, &format!("{}_AC_hom", prefix))?,
            ac_hemi: column(batch, &format!("{}_AC_hemi", prefix))?,
        })
    }

    fn triple(&self, i: usize) -> CountTriple {
        CountTriple::new(self.ac.value(i), self.ac_hom.value(i), self.ac_hemi.value(i))
    }
}

struct SexCountColumns<'b> {
    triple: TripleColumns<'b>,
    n_dp_discarded: &'b UInt32Array,
}

impl<'b> SexCountColumns<'b> {
    fn read(batch: &'b RecordBatch, prefix: &str) -> Result<Self> {
        Ok(Self {
            triple: TripleColumns::read(batch, prefix)?,
            n_dp_discarded: column(batch, &format!("{}_n_DP_discarded", prefix))?,
        })
    }

    fn counts(&self, i: usize) -> SexCounts {
        SexCounts {
            counts: self.triple.triple(i),
            n_dp_discarded: self.n_dp_discarded.value(i),
        }
    }
}

impl TableRow for PileRow {
    fn schema() -> SchemaRef {
        let mut fields = key_fields();
        fields.extend(sex_count_fields("XX"));
        fields.extend(sex_count_fields("XY"));
        fields.push(Field::new("DP", DataType::Int32, false));
        Arc::new(Schema::new(fields))
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch> {
        let mut columns = key_columns(rows, |r| (r.pos, r.ref_allele.as_str(), r.alt.as_str()));
        columns.extend(sex_count_columns(rows, |r| r.xx));
        columns.extend(sex_count_columns(rows, |r| r.xy));
        columns.push(Arc::new(Int32Array::from_iter_values(rows.iter().map(|r| r.dp))));
        Ok(RecordBatch::try_new(Self::schema(), columns)?)
    }

    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
        let keys = KeyColumns::read(batch)?;
        let xx = SexCountColumns::read(batch, "XX")?;
        let xy = SexCountColumns::read(batch, "XY")?;
        let dp: &Int32Array = column(batch, "DP")?;
        Ok((0..batch.num_rows())
            .map(|i| {
                let (pos, ref_allele, alt) = keys.key(i);
                PileRow {
                    pos,
                    ref_allele,
                    alt,
                    xx: xx.counts(i),
                    xy: xy.counts(i),
                    dp: dp.value(i),
                }
            })
            .collect())
    }
}

impl TableRow for MergedPileRow {
    fn schema() -> SchemaRef {
        let mut fields = key_fields();
        fields.extend(sex_count_fields("XX"));
        fields.extend(sex_count_fields("XY"));
        fields.push(Field::new("n_samples", DataType::UInt32, false));
        fields.push(Field::new("DP_sum", DataType::Float64, false));
        fields.push(Field::new("DP2_sum", DataType::Float64, false));
        Arc::new(Schema::new(fields))
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch> {
        let mut columns = key_columns(rows, |r| (r.pos, r.ref_allele.as_str(), r.alt.as_str()));
        columns.extend(sex_count_columns(rows, |r| r.xx));
        columns.extend(sex_count_columns(rows, |r| r.xy));
        columns.push(u32_column(rows, |r| r.n_samples));
        columns.push(Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.dp_sum))));
        columns.push(Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.dp2_sum))));
        Ok(RecordBatch::try_new(Self::schema(), columns)?)
    }

    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
        let keys = KeyColumns::read(batch)?;
        let xx = SexCountColumns::read(batch, "XX")?;
        let xy = SexCountColumns::read(batch, "XY")?;
        let n_samples: &UInt32Array = column(batch, "n_samples")?;
        let dp_sum: &Float64Array = column(batch, "DP_sum")?;
        let dp2_sum: &Float64Array = column(batch, "DP2_sum")?;
        Ok((0..batch.num_rows())
            .map(|i| {
                let (pos, ref_allele, alt) = keys.key(i);
                MergedPileRow {
                    pos,
                    ref_allele,
                    alt,
                    xx: xx.counts(i),
                    xy: xy.counts(i),
                    n_samples: n_samples.value(i),
                    dp_sum: dp_sum.value(i),
                    dp2_sum: dp2_sum.value(i),
                }
            })
            .collect())
    }
}

impl TableRow for FinalRow {
    fn schema() -> SchemaRef {
        let mut fields = key_fields();
        fields.push(Field::new("XX_AN", DataType::Int64, false));
        fields.extend(triple_fields("XX"));
        fields.push(Field::new("XY_AN", DataType::Int64, false));
        fields.extend(triple_fields("XY"));
        fields.push(Field::new("DP_mean", DataType::Float64, false));
        fields.push(Field::new("DP_std", DataType::Float64, false));
        Arc::new(Schema::new(fields))
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch> {
        let mut columns = key_columns(rows, |r| (r.pos, r.ref_allele.as_str(), r.alt.as_str()));
        columns.push(Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.xx_an))));
        columns.extend(triple_columns(rows, |r| r.xx));
        columns.push(Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.xy_an))));
        columns.extend(triple_columns(rows, |r| r.xy));
        columns.push(Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.dp_mean))));
        columns.push(Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.dp_std))));
        Ok(RecordBatch::try_new(Self::schema(), columns)?)
    }

    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
        let keys = KeyColumns::read(batch)?;
        let xx_an: &Int64Array = column(batch, "XX_AN")?;
        let xx = TripleColumns::read(batch, "XX")?;
        let xy_an: &Int64Array = column(batch, "XY_AN")?;
        let xy = TripleColumns::read(batch, "XY")?;
        let dp_mean: &Float64Array = column(batch, "DP_mean")?;
        let dp_std: &Float64Array = column(batch, "DP_std")?;
        Ok((0..batch.num_rows())
            .map(|i| {
                let (pos, ref_allele, alt) = keys.key(i);
                FinalRow {
                    pos,
                    ref_allele,
                    alt,
                    xx_an: xx_an.value(i),
                    xx: xx.triple(i),
                    xy_an: xy_an.value(i),
                    xy: xy.triple(i),
                    dp_mean: dp_mean.value(i),
                    dp_std: dp_std.value(i),
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observation(counts: CountTriple, pass: bool) -> Observation<'static> {
        Observation {
            allele: "G",
            counts,
            pass,
        }
    }

    #[test]
    fn test_passing_observation_writes_counts_to_own_sex() {
        let row = PileRow::from_observation(100, "A", &observation(CountTriple::HOM_ALT, true), Sex::XY, 20, 10);
        assert_eq!(row.alt, "G");
        assert_eq!(row.xy.counts, CountTriple::HOM_ALT);
        assert_eq!(row.xy.n_dp_discarded, 0);
        assert_eq!(row.xx, SexCounts::default());
        assert_eq!(row.dp, 20);
    }

    #[test]
    fn test_failed_quality_zeroes_counts_without_discard() {
        let row = PileRow::from_observation(100, "A", &observation(CountTriple::HET, false), Sex::XX, 20, 10);
        assert_eq!(row.xx, SexCounts::default());
        assert_eq!(row.xy, SexCounts::default());
    }

    #[test]
    fn test_low_depth_discards_regardless_of_pass() {
        for pass in [true, false] {
            for counts in [CountTriple::ZERO, CountTriple::HET, CountTriple::HOM_ALT, CountTriple::HEMI] {
                let row = PileRow::from_observation(100, "A", &observation(counts, pass), Sex::XX, 3, 10);
                assert_eq!(row.xx.counts, CountTriple::ZERO);
                assert_eq!(row.xx.n_dp_discarded, 1);
                assert_eq!(row.xy, SexCounts::default());
            }
        }
    }

    #[test]
    fn test_depth_at_threshold_is_kept() {
        let row = PileRow::from_observation(100, "A", &observation(CountTriple::HET, true), Sex::XX, 10, 10);
        assert_eq!(row.xx.counts, CountTriple::HET);
        assert_eq!(row.xx.n_dp_discarded, 0);
    }

    #[test]
    fn test_pile_schema_column_names() {
        let names: Vec<String> = PileRow::schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect();
        assert_eq!(
            names,
            vec![
                "pos", "ref", "alt", "XX_AC", "XX_AC_hom", "XX_AC_hemi", "XX_n_DP_discarded", "XY_AC",
                "XY_AC_hom", "XY_AC_hemi", "XY_n_DP_discarded", "DP"
            ]
        );
    }

    #[test]
    fn test_final_batch_preserves_values() -> Result<()> {
        let rows = vec![FinalRow {
            pos: 100,
            ref_allele: "A".into(),
            alt: "G".into(),
            xx_an: 2,
            xx: CountTriple::HET,
            xy_an: 2,
            xy: CountTriple::HOM_ALT,
            dp_mean: 20.0,
            dp_std: 0.0,
        }];
        let batch = FinalRow::to_batch(&rows)?;
        assert_eq!(batch.num_columns(), 13);
        assert_eq!(FinalRow::from_batch(&batch)?, rows);
        Ok(())
    }
}
