use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid region '{region}': {reason}")]
    RegionFormat { region: String, reason: String },

    #[error("Unsupported genotype {genotype} for sample {sample} at {contig}:{pos}")]
    UnsupportedGenotype {
        sample: String,
        contig: String,
        pos: i64,
        genotype: String,
    },

    #[error("VCF file {} is not indexed (.tbi or .csi not found)", .0.display())]
    MissingIndex(PathBuf),

    #[error("Sex of sample {sample} in {} could not be inferred: no informative chrX non-PAR genotypes", .path.display())]
    UndeterminedSex { sample: String, path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Htslib(#[from] rust_htslib::errors::Error),

    #[error(transparent)]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error(transparent)]
    Arrow(#[from] arrow::error::ArrowError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Version(#[from] semver::Error),

    #[error("{0}")]
    Msg(String),
}

impl Error {
    pub fn region_format(region: &str, reason: impl Into<String>) -> Self {
        Error::RegionFormat {
            region: region.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Msg(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Msg(msg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_error_names_offending_string() {
        let err = Error::region_format("chr1:x", "begin must be a positive integer");
        assert_eq!(
            err.to_string(),
            "Invalid region 'chr1:x': begin must be a positive integer"
        );
    }

    #[test]
    fn missing_index_message_matches_reader_wording() {
        let err = Error::MissingIndex(PathBuf::from("cohort.vcf.gz"));
        assert_eq!(
            err.to_string(),
            "VCF file cohort.vcf.gz is not indexed (.tbi or .csi not found)"
        );
    }

    #[test]
    fn string_errors_convert_to_messages() {
        let err: Error = format!("Failed to open {}", "x").into();
        assert!(matches!(err, Error::Msg(ref m) if m == "Failed to open x"));
    }
}
