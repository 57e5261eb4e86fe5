use crate::{
    pile::{
        chrom::{ChromosomeClass, Sex},
        genotype::{format_genotype, Classification, ClassifierParams, GenotypeClassifier},
        rows::PileRow,
        table::TableWriter,
        vcf_reader::{VariantRecord, VariantSource},
    },
    utils::{Error, Region, Result},
};
use clap::ValueEnum;
use std::path::Path;

pub const DEFAULT_MIN_DP: i32 = 10;

/// What to do with genotype calls that are neither haploid nor diploid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum UnsupportedPolicy {
    #[default]
    Fail,
    Skip,
}

#[derive(Debug, Clone, Copy)]
pub struct CountParams {
    pub classifier: ClassifierParams,
    pub min_dp: i32,
    pub on_unsupported: UnsupportedPolicy,
}

impl Default for CountParams {
    fn default() -> Self {
        Self {
            classifier: ClassifierParams::default(),
            min_dp: DEFAULT_MIN_DP,
            on_unsupported: UnsupportedPolicy::default(),
        }
    }
}

/// Turns the records of one region of one file into pile rows.
pub struct RegionCounter<'a> {
    classifier: GenotypeClassifier,
    params: CountParams,
    samples: &'a [(String, Sex)],
    contig: &'a str,
    class: ChromosomeClass,
}

impl<'a> RegionCounter<'a> {
    /// `samples` must be in the header order of the file being counted.
    pub fn new(samples: &'a [(String, Sex)], region: &'a Region, params: CountParams) -> Self {
        Self {
            classifier: GenotypeClassifier::new(params.classifier),
            params,
            samples,
            contig: &region.contig,
            class: ChromosomeClass::from_contig(&region.contig),
        }
    }

    pub fn count_record(
        &self,
        record: &VariantRecord,
        mut emit: impl FnMut(PileRow) -> Result<()>,
    ) -> Result<()> {
        if record.samples.len() != self.samples.len() {
            return Err(format!(
                "Record at {}:{} has {} samples, expected {}",
                self.contig,
                record.pos,
                record.samples.len(),
                self.samples.len()
            )
            .into());
        }

        for (fields, (sample, sex)) in record.samples.iter().zip(self.samples) {
            let classification = self.classifier.classify(
                fields,
                *sex,
                self.class,
                record.pos,
                &record.ref_allele,
                &record.alts,
            );
            match classification {
                Classification::Observed { dp, observations } => {
                    for observation in &observations {
                        emit(PileRow::from_observation(
                            record.pos,
                            &record.ref_allele,
                            observation,
                            *sex,
                            dp,
                            self.params.min_dp,
                        ))?;
                    }
                }
                Classification::Skipped => {}
                Classification::Unsupported => {
                    let err = Error::UnsupportedGenotype {
                        sample: sample.clone(),
                        contig: self.contig.to_string(),
                        pos: record.pos,
                        genotype: format_genotype(&fields.gt),
                    };
                    match self.params.on_unsupported {
                        UnsupportedPolicy::Fail => return Err(err),
                        UnsupportedPolicy::Skip => log::warn!("Skipping: {}", err),
                    }
                }
            }
        }
        Ok(())
    }

    pub fn count_records(
        &self,
        records: impl Iterator<Item = Result<VariantRecord>>,
        mut emit: impl FnMut(PileRow) -> Result<()>,
    ) -> Result<usize> {
        let mut n_records = 0;
        for record in records {
            self.count_record(&record?, &mut emit)?;
            n_records += 1;
        }
        Ok(n_records)
    }
}

/// Counts one region of one variant file into a pile table at `out`.
pub fn count_region(
    source: &mut VariantSource,
    region: &Region,
    samples: &[(String, Sex)],
    params: CountParams,
    out: &Path,
) -> Result<usize> {
    let counter = RegionCounter::new(samples, region, params);
    let mut writer = TableWriter::<PileRow>::create(out)?;
    let n_records = counter.count_records(source.fetch(region)?, |row| writer.push(row))?;
    let n_rows = writer.finish()?;
    log::debug!(
        "{} in {}: {} records, {} pile rows",
        region,
        source.path.display(),
        n_records,
        n_rows
    );
    Ok(n_rows)
}
