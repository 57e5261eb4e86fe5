use crate::utils::Result;
use rust_htslib::{
    bcf::{header::Header, index, record::GenotypeAllele, Format, Writer},
    bgzf,
};
use std::{io::Write, path::Path};

/// Contigs with GRCh38 lengths so PAR coordinates fit.
pub const GRCH38_CONTIGS: [(&str, u64); 4] = [
    ("chr1", 248_956_422),
    ("chrX", 156_040_895),
    ("chrY", 57_227_415),
    ("chrM", 16_569),
];

const COUNT_FORMATS: [&str; 4] = [
    r#"##FORMAT=<ID=GT,Number=1,Type=String,Description="Genotype">"#,
    r#"##FORMAT=<ID=DP,Number=1,Type=Integer,Description="Read Depth">"#,
    r#"##FORMAT=<ID=GQ,Number=1,Type=Integer,Description="Genotype Quality">"#,
    r#"##FORMAT=<ID=AD,Number=R,Type=Integer,Description="Allelic depths">"#,
];

#[derive(Default)]
pub struct TestVcfBuilder {
    contigs: Vec<(String, u64)>,
    header_lines: Vec<String>,
    samples: Vec<String>,
    records: Vec<TestVcfRecord>,
}

/// A record on contig `rid` at 1-based `pos`; genotypes are flattened over samples with a fixed ploidy.
#[derive(Default)]
pub struct TestVcfRecord {
    rid: u32,
    pos: i64,
    alleles: Vec<Vec<u8>>,
    genotypes: Vec<GenotypeAllele>,
    format: Vec<(String, Vec<i32>)>,
}

impl TestVcfRecord {
    pub fn new() -> Self {
        Self {
            pos: 1,
            alleles: vec![b"A".to_vec(), b"G".to_vec()],
            ..Default::default()
        }
    }

    pub fn rid(mut self, rid: u32) -> Self {
        self.rid = rid;
        self
    }

    pub fn pos(mut self, pos: i64) -> Self {
        self.pos = pos;
        self
    }

    pub fn alleles<T: AsRef<[u8]>>(mut self, alleles: &[T]) -> Self {
        self.alleles = alleles.iter().map(|a| a.as_ref().to_vec()).collect();
        self
    }

    pub fn genotype(mut self, genotypes: &[GenotypeAllele]) -> Self {
        self.genotypes = genotypes.to_vec();
        self
    }

    pub fn format_integer<K: ToString>(mut self, key: K, values: &[i32]) -> Self {
        self.format.push((key.to_string(), values.to_vec()));
        self
    }
}

impl TestVcfBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// GRCh38 sex chromosome contigs plus DP/GQ/AD FORMAT definitions.
    pub fn with_count_defaults() -> Self {
        let mut builder = Self::new();
        for (name, length) in GRCH38_CONTIGS {
            builder = builder.contig(name, length);
        }
        for line in &COUNT_FORMATS[1..] {
            builder = builder.header_line(line.trim_start_matches("##"));
        }
        builder
    }

    pub fn contig<S: ToString>(mut self, name: S, length: u64) -> Self {
        self.contigs.push((name.to_string(), length));
        self
    }

    pub fn sample<S: ToString>(mut self, name: S) -> Self {
        self.samples.push(name.to_string());
        self
    }

    pub fn record(mut self, record: TestVcfRecord) -> Self {
        self.records.push(record);
        self
    }

    pub fn header_line<S: ToString>(mut self, line: S) -> Self {
        self.header_lines.push(line.to_string());
        self
    }

    pub fn build_header(&self) -> Header {
        let mut header = Header::new();
        header.push_record(br#"##fileformat=VCFv4.3"#);

        for (name, length) in &self.contigs {
            header.push_record(format!("##contig=<ID={},length={}>", name, length).as_bytes());
        }

        for line in &self.header_lines {
            header.push_record(format!("##{}", line).as_bytes());
        }

        header.push_record(COUNT_FORMATS[0].as_bytes());

        for sample in &self.samples {
            header.push_sample(sample.as_bytes());
        }

        header
    }

    /// Writes a bgzipped VCF to `path`, tabix-indexed when `with_index` is set.
    pub fn write(self, path: &Path, with_index: bool) -> Result<()> {
        let header = self.build_header();
        {
            let mut writer = Writer::from_path(path, &header, false, Format::Vcf)?;
            for rec in &self.records {
                let mut record = writer.empty_record();
                record.set_rid(Some(rec.rid));
                record.set_pos(rec.pos - 1);

                let allele_refs: Vec<&[u8]> = rec.alleles.iter().map(|a| a.as_slice()).collect();
                record.set_alleles(&allele_refs)?;

                if !rec.genotypes.is_empty() {
                    record.push_genotypes(&rec.genotypes)?;
                }
                for (key, values) in &rec.format {
                    record.push_format_integer(key.as_bytes(), values)?;
                }
                writer.write(&record)?;
            }
        }
        if with_index {
            index::build(path, None::<&Path>, 1, index::Type::Tbx).map_err(|e| e.msg)?;
        }
        Ok(())
    }
}

/// Writes whitespace-separated VCF body text behind the default count header, bgzipped and
/// tabix-indexed. Lets fixtures mix haploid and diploid calls, which the record builder cannot.
pub fn write_vcf_text(path: &Path, body: &str, with_index: bool) -> Result<()> {
    let mut text = String::from("##fileformat=VCFv4.3\n");
    for (name, length) in GRCH38_CONTIGS {
        text.push_str(&format!("##contig=<ID={},length={}>\n", name, length));
    }
    for line in body.lines().map(str::trim).filter(|l| l.starts_with("##")) {
        text.push_str(line);
        text.push('\n');
    }
    if !body.contains("##FORMAT=<ID=DP,") {
        for line in COUNT_FORMATS {
            text.push_str(line);
            text.push('\n');
        }
    } else {
        text.push_str(COUNT_FORMATS[0]);
        text.push('\n');
    }
    for line in body.lines().map(str::trim) {
        if line.is_empty() || line.starts_with("##") {
            continue;
        }
        text.push_str(&line.split_whitespace().collect::<Vec<_>>().join("\t"));
        text.push('\n');
    }

    {
        let mut writer = bgzf::Writer::from_path(path)?;
        writer.write_all(text.as_bytes())?;
    }
    if with_index {
        index::build(path, None::<&Path>, 1, index::Type::Tbx).map_err(|e| e.msg)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_htslib::bcf::{self, Read};
    use tempfile::tempdir;

    #[test]
    fn test_vcf_builder_writes_indexed_file() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("cohort.vcf.gz");
        TestVcfBuilder::with_count_defaults()
            .sample("S1")
            .record(
                TestVcfRecord::new()
                    .pos(100)
                    .alleles(&["A", "T"])
                    .genotype(&[GenotypeAllele::Unphased(0), GenotypeAllele::Unphased(1)])
                    .format_integer("DP", &[20]),
            )
            .write(&path, true)?;

        assert!(dir.path().join("cohort.vcf.gz.tbi").exists());
        let mut reader = bcf::Reader::from_path(&path)?;
        let mut record = reader.empty_record();
        reader.read(&mut record).unwrap()?;
        assert_eq!(record.pos(), 99);
        assert_eq!(record.format(b"DP").integer()?[0], &[20]);
        Ok(())
    }

    #[test]
    fn test_vcf_text_keeps_mixed_ploidy() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("mixed.vcf.gz");
        write_vcf_text(
            &path,
            "#CHROM POS ID REF ALT QUAL FILTER INFO FORMAT S1 S2
             chrX 3000000 . C T . PASS . GT:DP 1:12 0/1:30",
            true,
        )?;

        let mut reader = bcf::IndexedReader::from_path(&path)?;
        let mut record = reader.empty_record();
        reader.read(&mut record).unwrap()?;
        let genotypes = record.genotypes()?;
        assert_eq!(genotypes.get(0).len(), 1);
        assert_eq!(genotypes.get(1).len(), 2);
        Ok(())
    }
}
