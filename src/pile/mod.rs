pub mod chrom;
pub mod counter;
pub mod dataset;
pub mod finalize;
pub mod genotype;
pub mod merger;
pub mod metadata;
pub mod rows;
pub mod sex;
pub mod table;
pub mod vcf_reader;
