//! Chromosome classes, GRCh38 pseudo-autosomal boundaries and the ploidy rules derived from them.

use std::fmt;

// PAR1 shares its coordinates between X and Y (1-based, inclusive)
pub const PAR1_BEGIN: i64 = 10_001;
pub const PAR1_END: i64 = 2_781_479;

pub const PAR2_X_BEGIN: i64 = 155_701_383;
pub const PAR2_X_END: i64 = 156_030_895;

pub const PAR2_Y_BEGIN: i64 = 56_887_903;
pub const PAR2_Y_END: i64 = 57_217_415;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Sex {
    XX,
    XY,
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sex::XX => write!(f, "XX"),
            Sex::XY => write!(f, "XY"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChromosomeClass {
    Autosome,
    ChrX,
    ChrY,
    Mitochondrial,
}

impl ChromosomeClass {
    pub fn from_contig(contig: &str) -> Self {
        match contig {
            "chrX" | "X" => ChromosomeClass::ChrX,
            "chrY" | "Y" => ChromosomeClass::ChrY,
            "chrM" | "M" | "MT" | "chrMT" => ChromosomeClass::Mitochondrial,
            _ => ChromosomeClass::Autosome,
        }
    }
}

/// How a sample's call at a position contributes to the allele counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ploidy {
    Diploid,
    Hemizygous,
    Excluded,
}

pub fn in_non_par_x(pos: i64) -> bool {
    PAR1_END < pos && pos < PAR2_X_BEGIN
}

/// Includes the unique Y segment that trails PAR2.
pub fn in_non_par_y(pos: i64) -> bool {
    (PAR1_END < pos && pos < PAR2_Y_BEGIN) || pos > PAR2_Y_END
}

pub fn ploidy_rule(class: ChromosomeClass, sex: Sex, pos: i64) -> Ploidy {
    match (class, sex) {
        (ChromosomeClass::ChrY, Sex::XX) => Ploidy::Excluded,
        (ChromosomeClass::ChrY, Sex::XY) if in_non_par_y(pos) => Ploidy::Hemizygous,
        (ChromosomeClass::ChrY, Sex::XY) => Ploidy::Excluded,
        (ChromosomeClass::ChrX, Sex::XY) if in_non_par_x(pos) => Ploidy::Hemizygous,
        _ => Ploidy::Diploid,
    }
}

/// Chromosome copies per XX and XY sample used to turn sample counts into allele numbers.
pub fn an_multipliers(class: ChromosomeClass, pos: i64) -> (i64, i64) {
    match class {
        ChromosomeClass::Mitochondrial => (1, 1),
        ChromosomeClass::ChrY => (0, 1),
        ChromosomeClass::ChrX if in_non_par_x(pos) => (2, 1),
        ChromosomeClass::ChrX | ChromosomeClass::Autosome => (2, 2),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chromosome_class_from_contig() {
        assert_eq!(ChromosomeClass::from_contig("chrX"), ChromosomeClass::ChrX);
        assert_eq!(ChromosomeClass::from_contig("Y"), ChromosomeClass::ChrY);
        assert_eq!(ChromosomeClass::from_contig("MT"), ChromosomeClass::Mitochondrial);
        assert_eq!(ChromosomeClass::from_contig("chr17"), ChromosomeClass::Autosome);
        assert_eq!(ChromosomeClass::from_contig("chrX_alt"), ChromosomeClass::Autosome);
    }

    #[test]
    fn test_non_par_x_boundaries_are_exclusive() {
        assert!(!in_non_par_x(PAR1_END));
        assert!(in_non_par_x(PAR1_END + 1));
        assert!(in_non_par_x(PAR2_X_BEGIN - 1));
        assert!(!in_non_par_x(PAR2_X_BEGIN));
        assert!(!in_non_par_x(PAR2_X_END + 1));
    }

    #[test]
    fn test_non_par_y_includes_trailing_segment() {
        assert!(!in_non_par_y(PAR1_BEGIN));
        assert!(in_non_par_y(PAR1_END + 1));
        assert!(!in_non_par_y(PAR2_Y_BEGIN));
        assert!(!in_non_par_y(PAR2_Y_END));
        assert!(in_non_par_y(PAR2_Y_END + 1));
    }

    #[test]
    fn test_ploidy_rule() {
        let non_par_x = 50_000_000;
        let par_x = PAR1_BEGIN + 5;
        let non_par_y = 20_000_000;
        let par_y = PAR2_Y_BEGIN + 10;

        assert_eq!(ploidy_rule(ChromosomeClass::Autosome, Sex::XY, 100), Ploidy::Diploid);
        assert_eq!(ploidy_rule(ChromosomeClass::Mitochondrial, Sex::XY, 100), Ploidy::Diploid);
        assert_eq!(ploidy_rule(ChromosomeClass::ChrX, Sex::XX, non_par_x), Ploidy::Diploid);
        assert_eq!(ploidy_rule(ChromosomeClass::ChrX, Sex::XY, non_par_x), Ploidy::Hemizygous);
        assert_eq!(ploidy_rule(ChromosomeClass::ChrX, Sex::XY, par_x), Ploidy::Diploid);
        assert_eq!(ploidy_rule(ChromosomeClass::ChrY, Sex::XX, non_par_y), Ploidy::Excluded);
        assert_eq!(ploidy_rule(ChromosomeClass::ChrY, Sex::XY, non_par_y), Ploidy::Hemizygous);
        assert_eq!(ploidy_rule(ChromosomeClass::ChrY, Sex::XY, par_y), Ploidy::Excluded);
    }

    #[test]
    fn test_an_multipliers() {
        assert_eq!(an_multipliers(ChromosomeClass::Autosome, 1), (2, 2));
        assert_eq!(an_multipliers(ChromosomeClass::Mitochondrial, 1), (1, 1));
        assert_eq!(an_multipliers(ChromosomeClass::ChrY, 20_000_000), (0, 1));
        assert_eq!(an_multipliers(ChromosomeClass::ChrX, 50_000_000), (2, 1));
        assert_eq!(an_multipliers(ChromosomeClass::ChrX, PAR1_END), (2, 2));
    }
}
