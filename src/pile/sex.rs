//! Sex inference from heterozygosity in the non-PAR part of chromosome X.

use crate::{
    pile::{
        chrom::{in_non_par_x, Sex, PAR1_END, PAR2_X_BEGIN},
        counter::UnsupportedPolicy,
        genotype::format_genotype,
        vcf_reader::VariantSource,
    },
    utils::{Error, Region, Result},
};
use clap::ValueEnum;

/// Samples whose non-PAR X heterozygous fraction falls below this are XY.
pub const FRACTION_LIMIT: f64 = 0.2;

const X_CONTIG_NAMES: [&str; 2] = ["chrX", "X"];

/// Sex assigned to a sample without any informative non-PAR X genotype.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum UndeterminedSexPolicy {
    #[default]
    Xx,
    Xy,
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Zygosity {
    Missing,
    Hom,
    Het,
}

fn zygosity(gt: &[Option<u32>]) -> Option<Zygosity> {
    match *gt {
        [None] | [None, None] => Some(Zygosity::Missing),
        [a, b] if a == b => Some(Zygosity::Hom),
        [_, _] => Some(Zygosity::Het),
        [Some(a)] if a > 1 => Some(Zygosity::Het),
        _ => None,
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ZygosityCounts {
    pub het: u32,
    pub hom: u32,
}

impl ZygosityCounts {
    /// Returns false for a call shape that cannot be classified.
    fn observe(&mut self, gt: &[Option<u32>]) -> bool {
        match zygosity(gt) {
            Some(Zygosity::Missing) => {}
            Some(Zygosity::Hom) => self.hom += 1,
            Some(Zygosity::Het) => self.het += 1,
            None => return false,
        }
        true
    }

    pub fn het_fraction(&self) -> Option<f64> {
        let total = self.het + self.hom;
        (total > 0).then(|| f64::from(self.het) / f64::from(total))
    }
}

pub fn infer_sex_from_counts(counts: &ZygosityCounts) -> Option<Sex> {
    counts.het_fraction().map(|fraction| {
        if fraction < FRACTION_LIMIT {
            Sex::XY
        } else {
            Sex::XX
        }
    })
}

fn non_par_x_region(source: &VariantSource) -> Result<Option<Region>> {
    match X_CONTIG_NAMES.iter().find(|name| source.has_contig(name)) {
        Some(name) => Ok(Some(Region::new(
            *name,
            Some(PAR1_END as u64 + 1),
            Some(PAR2_X_BEGIN as u64 - 1),
        )?)),
        None => Ok(None),
    }
}

/// Infers the sex of every sample in `source`, in header order.
pub fn infer_samples_sex(
    source: &mut VariantSource,
    undetermined: UndeterminedSexPolicy,
    on_unsupported: UnsupportedPolicy,
) -> Result<Vec<(String, Sex)>> {
    let samples = source.samples().to_vec();
    let mut counts = vec![ZygosityCounts::default(); samples.len()];

    match non_par_x_region(source)? {
        Some(region) => {
            let path = source.path.clone();
            for record in source.fetch(&region)? {
                let record = record?;
                if !in_non_par_x(record.pos) {
                    continue;
                }
                for ((sample, fields), sample_counts) in
                    samples.iter().zip(&record.samples).zip(counts.iter_mut())
                {
                    if sample_counts.observe(&fields.gt) {
                        continue;
                    }
                    let err = Error::UnsupportedGenotype {
                        sample: sample.clone(),
                        contig: region.contig.clone(),
                        pos: record.pos,
                        genotype: format_genotype(&fields.gt),
                    };
                    match on_unsupported {
                        UnsupportedPolicy::Fail => return Err(err),
                        UnsupportedPolicy::Skip => {
                            log::warn!("Ignoring for sex inference in {}: {}", path.display(), err)
                        }
                    }
                }
            }
        }
        None => log::warn!(
            "{} has no chrX contig, sex cannot be inferred from genotypes",
            source.path.display()
        ),
    }

    let source: &VariantSource = source;
    samples
        .into_iter()
        .zip(counts)
        .map(|(sample, sample_counts)| {
            let sex = match infer_sex_from_counts(&sample_counts) {
                Some(sex) => sex,
                None => resolve_undetermined(&sample, source, undetermined)?,
            };
            log::debug!(
                "Sample {} in {}: {} het / {} hom on non-PAR X -> {}",
                sample,
                source.path.display(),
                sample_counts.het,
                sample_counts.hom,
                sex
            );
            Ok((sample, sex))
        })
        .collect()
}

fn resolve_undetermined(
    sample: &str,
    source: &VariantSource,
    policy: UndeterminedSexPolicy,
) -> Result<Sex> {
    let sex = match policy {
        UndeterminedSexPolicy::Xx => Sex::XX,
        UndeterminedSexPolicy::Xy => Sex::XY,
        UndeterminedSexPolicy::Fail => {
            return Err(Error::UndeterminedSex {
                sample: sample.to_string(),
                path: source.path.clone(),
            })
        }
    };
    log::warn!(
        "No informative non-PAR X genotypes for sample {} in {}, assuming {}",
        sample,
        source.path.display(),
        sex
    );
    Ok(sex)
}
