use crate::pile::{
    chrom::{ploidy_rule, ChromosomeClass, Ploidy, Sex},
    vcf_reader::SampleFields,
};
use arrayvec::ArrayVec;
use itertools::Itertools;

pub const DEFAULT_MIN_GQ: i32 = 20;
pub const DEFAULT_MIN_AB: f64 = 0.2;

/// Alleles that never count as a real alternate: spanning deletions and gVCF reference blocks.
const PLACEHOLDER_ALLELES: [&str; 3] = ["*", "<NON_REF>", "<*>"];

/// Allele copies, homozygous-alt events and hemizygous events added by one observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CountTriple {
    pub ac: u32,
    pub ac_hom: u32,
    pub ac_hemi: u32,
}

impl CountTriple {
    pub const ZERO: Self = Self::new(0, 0, 0);
    pub const HET: Self = Self::new(1, 0, 0);
    pub const HOM_ALT: Self = Self::new(2, 1, 0);
    pub const HEMI: Self = Self::new(1, 0, 1);

    pub const fn new(ac: u32, ac_hom: u32, ac_hemi: u32) -> Self {
        Self { ac, ac_hom, ac_hemi }
    }
}

/// Shape of a genotype call; allele indices are 1-based into the ALT list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenotypeCall {
    HomRef,
    Het(u32),
    HomAlt(u32),
    MultiHet(u32, u32),
    HemiRef,
    Hemi(u32),
    Unsupported,
}

impl GenotypeCall {
    /// A half-missing diploid call resolves to its known allele: `./0` is hom-ref, `./a` is het.
    pub fn from_alleles(gt: &[Option<u32>]) -> Self {
        match *gt {
            [Some(0), Some(0)] | [None, None] => GenotypeCall::HomRef,
            [Some(0), None] | [None, Some(0)] => GenotypeCall::HomRef,
            [Some(a), None] | [None, Some(a)] => GenotypeCall::Het(a),
            [Some(0), Some(a)] | [Some(a), Some(0)] => GenotypeCall::Het(a),
            [Some(a), Some(b)] if a == b => GenotypeCall::HomAlt(a),
            [Some(a), Some(b)] => GenotypeCall::MultiHet(a, b),
            [Some(0)] | [None] => GenotypeCall::HemiRef,
            [Some(a)] => GenotypeCall::Hemi(a),
            _ => GenotypeCall::Unsupported,
        }
    }
}

pub fn format_genotype(gt: &[Option<u32>]) -> String {
    if gt.is_empty() {
        return "<empty>".to_string();
    }
    gt.iter()
        .map(|allele| allele.map_or(".".to_string(), |a| a.to_string()))
        .join("/")
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation<'r> {
    pub allele: &'r str,
    pub counts: CountTriple,
    pub pass: bool,
}

pub type Observations<'r> = ArrayVec<Observation<'r>, 2>;

#[derive(Debug, PartialEq)]
pub enum Classification<'r> {
    Observed {
        dp: i32,
        observations: Observations<'r>,
    },
    /// No depth, or the ploidy rule excludes this sample here.
    Skipped,
    Unsupported,
}

#[derive(Debug, Clone, Copy)]
pub struct ClassifierParams {
    pub min_gq: i32,
    pub min_ab: f64,
}

impl Default for ClassifierParams {
    fn default() -> Self {
        Self {
            min_gq: DEFAULT_MIN_GQ,
            min_ab: DEFAULT_MIN_AB,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GenotypeClassifier {
    params: ClassifierParams,
}

impl GenotypeClassifier {
    pub fn new(params: ClassifierParams) -> Self {
        Self { params }
    }

    pub fn classify<'r>(
        &self,
        sample: &SampleFields,
        sex: Sex,
        class: ChromosomeClass,
        pos: i64,
        ref_allele: &'r str,
        alts: &'r [String],
    ) -> Classification<'r> {
        // Without depth the genotype quality is not trusted
        let Some(dp) = sample.dp else {
            return Classification::Skipped;
        };
        let pass = sample.gq.unwrap_or(0) >= self.params.min_gq;

        let (het, hom_alt) = match ploidy_rule(class, sex, pos) {
            Ploidy::Excluded => return Classification::Skipped,
            Ploidy::Hemizygous => (CountTriple::HEMI, CountTriple::HEMI),
            Ploidy::Diploid => (CountTriple::HET, CountTriple::HOM_ALT),
        };

        let mut observations = Observations::new();
        match GenotypeCall::from_alleles(&sample.gt) {
            GenotypeCall::HomRef | GenotypeCall::HemiRef => observations.push(Observation {
                allele: ref_allele,
                counts: CountTriple::ZERO,
                pass,
            }),
            GenotypeCall::Het(a) => {
                let balanced = self.allele_balance_passes(sample.ad.as_deref(), a);
                push_alt(&mut observations, alts, a, het, pass && balanced, pos);
            }
            GenotypeCall::HomAlt(a) => push_alt(&mut observations, alts, a, hom_alt, pass, pos),
            GenotypeCall::MultiHet(a1, a2) => {
                push_alt(&mut observations, alts, a1, het, pass, pos);
                push_alt(&mut observations, alts, a2, het, pass, pos);
            }
            GenotypeCall::Hemi(a) => {
                push_alt(&mut observations, alts, a, CountTriple::HEMI, pass, pos)
            }
            GenotypeCall::Unsupported => return Classification::Unsupported,
        }

        observations.retain(|obs| !PLACEHOLDER_ALLELES.contains(&obs.allele));
        Classification::Observed { dp, observations }
    }

    /// Allele balance `AD[allele] / sum(AD)` must exceed `min_ab`; absent or malformed AD fails.
    fn allele_balance_passes(&self, ad: Option<&[i32]>, allele: u32) -> bool {
        let Some(ad) = ad else {
            return false;
        };
        if ad.iter().any(|&depth| depth < 0) {
            return false;
        }
        let total: i64 = ad.iter().map(|&depth| i64::from(depth)).sum();
        match ad.get(allele as usize) {
            Some(&depth) if total > 0 => depth as f64 / total as f64 > self.params.min_ab,
            _ => false,
        }
    }
}

fn push_alt<'r>(
    observations: &mut Observations<'r>,
    alts: &'r [String],
    allele_idx: u32,
    counts: CountTriple,
    pass: bool,
    pos: i64,
) {
    match (allele_idx as usize).checked_sub(1).and_then(|idx| alts.get(idx)) {
        Some(allele) => observations.push(Observation {
            allele: allele.as_str(),
            counts,
            pass,
        }),
        None => log::trace!(
            "Allele index {} at position {} exceeds the {} ALT alleles",
            allele_idx,
            pos,
            alts.len()
        ),
    }
}
