use crate::utils::{Error, Region, Result};
use rust_htslib::{
    bcf::{
        self,
        header::HeaderView,
        record::{GenotypeAllele, Numeric},
        Read,
    },
    bgzf,
};
use std::{
    ffi::OsString,
    fs::File,
    io::{BufRead, BufReader, Read as ReadIo},
    path::{Path, PathBuf},
};

/// rust-htslib's own `NumericUtils` (which provides `is_vector_end`) is private.
trait NumericUtils {
    fn is_vector_end(&self) -> bool;
}

impl NumericUtils for i32 {
    fn is_vector_end(&self) -> bool {
        *self == rust_htslib::htslib::bcf_int32_vector_end
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReadMode {
    Indexed,
    /// Linear scan with manual interval filtering, only for explicitly requested debug runs.
    Streaming,
}

/// Per-sample FORMAT values; `None` where the value is absent or unparsable.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SampleFields {
    pub gt: Vec<Option<u32>>,
    pub dp: Option<i32>,
    pub gq: Option<i32>,
    pub ad: Option<Vec<i32>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariantRecord {
    /// 1-based
    pub pos: i64,
    pub ref_allele: String,
    pub alts: Vec<String>,
    pub samples: Vec<SampleFields>,
}

enum ReaderBackend {
    Indexed(bcf::IndexedReader),
    Stream(bcf::Reader),
}

impl ReaderBackend {
    fn header(&self) -> &HeaderView {
        match self {
            ReaderBackend::Indexed(reader) => reader.header(),
            ReaderBackend::Stream(reader) => reader.header(),
        }
    }

    fn empty_record(&self) -> bcf::Record {
        match self {
            ReaderBackend::Indexed(reader) => reader.empty_record(),
            ReaderBackend::Stream(reader) => reader.empty_record(),
        }
    }

    fn read(&mut self, record: &mut bcf::Record) -> Option<rust_htslib::errors::Result<()>> {
        match self {
            ReaderBackend::Indexed(reader) => reader.read(record),
            ReaderBackend::Stream(reader) => reader.read(record),
        }
    }
}

fn add_extension(path: &Path, ext: &str) -> PathBuf {
    let mut out = path.to_path_buf();
    let new_ext: OsString = match path.extension() {
        Some(old) => {
            let mut s = old.to_os_string();
            s.push(".");
            s.push(ext);
            s
        }
        None => OsString::from(ext),
    };
    out.set_extension(new_ext);
    out
}

fn is_indexed_local(file: &Path) -> bool {
    add_extension(file, "csi").exists() || add_extension(file, "tbi").exists()
}

fn is_bcf(file: &Path) -> bool {
    file.extension().is_some_and(|ext| ext == "bcf")
}

pub fn validate_bgzip_vcf(file: &Path) -> Result<()> {
    let mut f =
        File::open(file).map_err(|e| format!("Failed to open file {}: {}", file.display(), e))?;
    let mut buffer = [0u8; 2];
    f.read_exact(&mut buffer)
        .map_err(|e| format!("Failed to read from {}: {}", file.display(), e))?;

    const GZIP_MAGIC_NUMBER: [u8; 2] = [0x1f, 0x8b];
    if buffer != GZIP_MAGIC_NUMBER {
        return Err(format!(
            "File {} does not appear to be gzip/bgzip compressed",
            file.display()
        )
        .into());
    }

    let mut bgzf_reader = BufReader::new(
        bgzf::Reader::from_path(file)
            .map_err(|e| format!("Failed to open bgzip reader for {}: {}", file.display(), e))?,
    );
    let mut first_line = String::new();
    match bgzf_reader.read_line(&mut first_line) {
        Ok(0) => Err(format!("File {} is empty", file.display()).into()),
        Ok(_) if !first_line.starts_with("##fileformat=VCFv") => Err(format!(
            "File {} is not a valid VCF file (missing '##fileformat' header)",
            file.display()
        )
        .into()),
        Ok(_) => Ok(()),
        Err(e) => Err(format!(
            "Failed to decompress and read from {}: {}. The file may be corrupted.",
            file.display(),
            e
        )
        .into()),
    }
}

fn validate_indexed_input(file: &Path) -> Result<()> {
    if !is_indexed_local(file) {
        return Err(Error::MissingIndex(file.to_path_buf()));
    }
    if is_bcf(file) {
        return Ok(());
    }
    validate_bgzip_vcf(file)
}

/// A variant file opened for region fetches, decoding GT/DP/GQ/AD for every sample.
pub struct VariantSource {
    backend: ReaderBackend,
    header: HeaderView,
    samples: Vec<String>,
    pub path: PathBuf,
}

impl VariantSource {
    pub fn open(path: &Path, mode: ReadMode) -> Result<Self> {
        log::debug!("Opening variant file {} ({:?})", path.display(), mode);
        let backend = match mode {
            ReadMode::Indexed => {
                validate_indexed_input(path)?;
                let reader = bcf::IndexedReader::from_path(path)
                    .map_err(|e| format!("Failed to open VCF file {}: {}", path.display(), e))?;
                ReaderBackend::Indexed(reader)
            }
            ReadMode::Streaming => {
                log::warn!(
                    "Reading {} without an index: every fetch scans the whole file",
                    path.display()
                );
                ReaderBackend::Stream(open_stream(path)?)
            }
        };
        let header = backend.header().clone();
        let samples = header
            .samples()
            .iter()
            .map(|s| String::from_utf8_lossy(s).into_owned())
            .collect();

        Ok(Self {
            backend,
            header,
            samples,
            path: path.to_path_buf(),
        })
    }

    /// Sample identifiers in header order.
    pub fn samples(&self) -> &[String] {
        &self.samples
    }

    pub fn has_contig(&self, contig: &str) -> bool {
        self.header.name2rid(contig.as_bytes()).is_ok()
    }

    /// Records overlapping `region`, in file order. An unknown contig yields nothing.
    pub fn fetch(&mut self, region: &Region) -> Result<Records<'_>> {
        let rid = match self.header.name2rid(region.contig.as_bytes()) {
            Ok(rid) => rid,
            Err(_) => {
                log::warn!(
                    "Skipping {}: contig '{}' not found in the header of {}",
                    region,
                    region.contig,
                    self.path.display()
                );
                return Ok(Records::exhausted(self, region));
            }
        };

        if let ReaderBackend::Indexed(reader) = &mut self.backend {
            let (begin0, end) = region.zero_based_window();
            // Fetches may overshoot by one base; `Records` filters on exact overlap
            if let Err(e) = reader.fetch(rid, begin0, end) {
                log::debug!(
                    "No indexed records for {} in {}: {}",
                    region,
                    self.path.display(),
                    e
                );
                return Ok(Records::exhausted(self, region));
            }
        } else {
            self.backend = ReaderBackend::Stream(open_stream(&self.path)?);
        }

        let record = self.backend.empty_record();
        Ok(Records {
            backend: Some(&mut self.backend),
            record,
            rid,
            region: region.clone(),
            n_samples: self.samples.len(),
        })
    }
}

fn open_stream(path: &Path) -> Result<bcf::Reader> {
    bcf::Reader::from_path(path)
        .map_err(|e| format!("Failed to open VCF file {}: {}", path.display(), e).into())
}

pub struct Records<'a> {
    backend: Option<&'a mut ReaderBackend>,
    record: bcf::Record,
    rid: u32,
    region: Region,
    n_samples: usize,
}

impl<'a> Records<'a> {
    fn exhausted(source: &'a mut VariantSource, region: &Region) -> Self {
        Records {
            record: source.backend.empty_record(),
            backend: None,
            rid: 0,
            region: region.clone(),
            n_samples: 0,
        }
    }
}

impl Iterator for Records<'_> {
    type Item = Result<VariantRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let backend = self.backend.as_mut()?;
        loop {
            match backend.read(&mut self.record) {
                None => return None,
                Some(Err(e)) => return Some(Err(e.into())),
                Some(Ok(())) => {
                    if self.record.rid() != Some(self.rid) {
                        continue;
                    }
                    let start = self.record.pos().max(0) as u64;
                    let stop = start + self.record.rlen().max(1) as u64;
                    if self.region.overlaps(start, stop) {
                        return Some(decode_record(&self.record, self.n_samples));
                    }
                }
            }
        }
    }
}

fn decode_record(record: &bcf::Record, n_samples: usize) -> Result<VariantRecord> {
    let alleles = record.alleles();
    let (ref_allele, alts) = match alleles.split_first() {
        Some((ref_allele, alts)) => (
            String::from_utf8_lossy(ref_allele).into_owned(),
            alts.iter()
                .map(|a| String::from_utf8_lossy(a).into_owned())
                .collect(),
        ),
        None => {
            return Err(format!("Record at position {} has no REF allele", record.pos() + 1).into())
        }
    };

    let gts = decode_genotypes(record, n_samples);
    let dps = scalar_field(record, b"DP", n_samples);
    let gqs = scalar_field(record, b"GQ", n_samples);
    let ads = depth_lists(record, b"AD", n_samples);

    let samples = gts
        .into_iter()
        .zip(dps)
        .zip(gqs)
        .zip(ads)
        .map(|(((gt, dp), gq), ad)| SampleFields { gt, dp, gq, ad })
        .collect();

    Ok(VariantRecord {
        pos: record.pos() + 1,
        ref_allele,
        alts,
        samples,
    })
}

fn decode_genotypes(record: &bcf::Record, n_samples: usize) -> Vec<Vec<Option<u32>>> {
    let Ok(genotypes) = record.genotypes() else {
        return vec![Vec::new(); n_samples];
    };
    (0..n_samples)
        .map(|i| {
            genotypes
                .get(i)
                .iter()
                .map(|allele| match allele {
                    GenotypeAllele::Phased(idx) | GenotypeAllele::Unphased(idx) => {
                        u32::try_from(*idx).ok()
                    }
                    GenotypeAllele::PhasedMissing | GenotypeAllele::UnphasedMissing => None,
                })
                .collect()
        })
        .collect()
}

/// First value of a single-valued FORMAT field declared as Integer or as String.
fn scalar_field(record: &bcf::Record, tag: &[u8], n_samples: usize) -> Vec<Option<i32>> {
    if let Ok(values) = record.format(tag).integer() {
        return values
            .iter()
            .map(|v| {
                v.first()
                    .copied()
                    .filter(|x| !x.is_missing() && !x.is_vector_end())
            })
            .collect();
    }
    if let Ok(values) = record.format(tag).string() {
        return values
            .iter()
            .map(|v| {
                std::str::from_utf8(v)
                    .ok()
                    .and_then(|s| s.trim().parse().ok())
            })
            .collect();
    }
    vec![None; n_samples]
}

/// Per-allele depths; any missing entry makes the whole list unusable.
fn depth_lists(record: &bcf::Record, tag: &[u8], n_samples: usize) -> Vec<Option<Vec<i32>>> {
    let Ok(values) = record.format(tag).integer() else {
        return vec![None; n_samples];
    };
    values
        .iter()
        .map(|v| {
            let depths: Vec<i32> = v
                .iter()
                .copied()
                .take_while(|x| !x.is_vector_end())
                .collect();
            if depths.is_empty() || depths.iter().any(|x| x.is_missing()) {
                None
            } else {
                Some(depths)
            }
        })
        .collect()
}
