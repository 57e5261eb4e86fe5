use crate::{
    pile::{
        counter::{CountParams, UnsupportedPolicy, DEFAULT_MIN_DP},
        genotype::{ClassifierParams, DEFAULT_MIN_AB, DEFAULT_MIN_GQ},
        metadata::INFO_FILE,
        sex::UndeterminedSexPolicy,
        vcf_reader::ReadMode,
    },
    utils::{find_input_files, vcf_file_stem, Region, Result},
};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use log::{Level, LevelFilter};
use owo_colors::{
    colors::{Blue, Green, Magenta, Red, Yellow},
    OwoColorize, Stream, Style,
};
use std::{
    collections::HashSet,
    io::Write,
    path::{Path, PathBuf},
};

pub const FULL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Chromosomes counted when no region is given.
pub const DEFAULT_CONTIGS: [&str; 25] = [
    "chr1", "chr2", "chr3", "chr4", "chr5", "chr6", "chr7", "chr8", "chr9", "chr10", "chr11",
    "chr12", "chr13", "chr14", "chr15", "chr16", "chr17", "chr18", "chr19", "chr20", "chr21",
    "chr22", "chrX", "chrY", "chrM",
];

#[derive(Parser)]
#[command(name="varpile",
          version=FULL_VERSION,
          about="Sex-stratified allele counts across cohorts of VCF files",
          long_about = None,
          disable_help_subcommand = true,
          help_template = "{name} {version}\n{about-section}\n{usage-heading}\n    {usage}\n\n{all-args}{after-help}",
          )]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
    /// Enable or disable color output in logging
    #[arg(long, value_enum, default_value_t = Color::Auto, global = true, help_heading = "Advanced")]
    color: Color,

    /// Specify multiple times to increase verbosity level (e.g., -vv for more verbosity)
    #[arg(
        short = 'v',
        long = "verbose",
        action = ArgAction::Count,
        global = true
    )]
    pub verbosity: u8,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[clap(about = "Count alleles per region across VCF files")]
    Count(CountArgs),
    #[clap(about = "Merge several count datasets into one")]
    Merge(MergeArgs),
    #[clap(about = "Compute allele numbers and depth statistics")]
    Finalize(FinalizeArgs),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Count(_) => "count",
            Command::Merge(_) => "merge",
            Command::Finalize(_) => "finalize",
        }
    }

    /// Directory the command writes its dataset to.
    pub fn output(&self) -> &Path {
        match self {
            Command::Count(args) => &args.output,
            Command::Merge(args) => &args.output,
            Command::Finalize(args) => &args.output,
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(arg_required_else_help(true))]
pub struct CountArgs {
    /// VCF/BCF files, or directories containing them
    #[arg(value_name = "PATHS", required = true, value_parser = check_file_exists)]
    pub paths: Vec<PathBuf>,

    /// Output directory, replaced if it exists
    #[arg(
        short = 'o',
        long = "output",
        value_name = "DIR",
        value_parser = check_prefix_path,
        required = true
    )]
    pub output: PathBuf,

    /// Comma-separated regions contig[:begin[-end]], 1-based [chr1..chr22,chrX,chrY,chrM]
    #[arg(
        short = 'r',
        long = "regions",
        value_name = "REGIONS",
        value_delimiter = ',',
        value_parser = parse_region
    )]
    pub regions: Option<Vec<Region>>,

    /// Observations with a lower depth are discarded from the allele number
    #[arg(long = "min-DP", value_name = "MIN_DP", default_value_t = DEFAULT_MIN_DP)]
    pub min_dp: i32,

    /// Minimum genotype quality for a call to be counted
    #[arg(long = "min-GQ", value_name = "MIN_GQ", default_value_t = DEFAULT_MIN_GQ)]
    pub min_gq: i32,

    /// Heterozygous calls need an allele balance above this value
    #[arg(
        long = "min-AB",
        value_name = "MIN_AB",
        default_value_t = DEFAULT_MIN_AB,
        value_parser = ensure_unit_float
    )]
    pub min_ab: f64,

    /// Number of threads
    #[arg(
        short = '@',
        long = "threads",
        value_name = "THREADS",
        default_value = "1",
        value_parser = threads_in_range
    )]
    pub threads: usize,

    /// Keep the per-file piles after merging
    #[arg(long = "debug")]
    pub debug: bool,

    /// Genotypes that are neither haploid nor diploid abort the run or are skipped
    #[arg(
        long = "on-unsupported",
        value_enum,
        default_value_t = UnsupportedPolicy::Fail,
        help_heading = "Advanced"
    )]
    pub on_unsupported: UnsupportedPolicy,

    /// Sex assumed for samples without informative chrX genotypes, or fail
    #[arg(
        long = "undetermined-sex",
        value_enum,
        default_value_t = UndeterminedSexPolicy::Xx,
        help_heading = "Advanced"
    )]
    pub undetermined_sex: UndeterminedSexPolicy,

    /// Scan inputs linearly instead of requiring a tabix/CSI index (slow, for debugging)
    #[arg(long = "no-index", help_heading = "Advanced")]
    pub no_index: bool,
}

impl CountArgs {
    pub fn regions(&self) -> Result<Vec<Region>> {
        match &self.regions {
            Some(regions) => Ok(regions.clone()),
            None => DEFAULT_CONTIGS.iter().map(|c| Region::contig(*c)).collect(),
        }
    }

    pub fn input_files(&self) -> Result<Vec<PathBuf>> {
        find_input_files(&self.paths)
    }

    pub fn read_mode(&self) -> ReadMode {
        if self.no_index {
            ReadMode::Streaming
        } else {
            ReadMode::Indexed
        }
    }

    pub fn count_params(&self) -> CountParams {
        CountParams {
            classifier: ClassifierParams {
                min_gq: self.min_gq,
                min_ab: self.min_ab,
            },
            min_dp: self.min_dp,
            on_unsupported: self.on_unsupported,
        }
    }

    pub fn preflight(&self) -> Result<()> {
        let files = self.input_files()?;
        if files.is_empty() {
            return Err("No VCF files found in the input paths".into());
        }
        let mut stems = HashSet::new();
        for file in &files {
            if !stems.insert(vcf_file_stem(file)) {
                return Err(format!(
                    "Input file names must be unique without their extension: {}",
                    file.display()
                )
                .into());
            }
        }
        if let Some(regions) = &self.regions {
            let unique: HashSet<&Region> = regions.iter().collect();
            if unique.len() != regions.len() {
                return Err("Regions must not be repeated".into());
            }
        }
        check_not_inside(&self.output, &self.paths)
    }
}

#[derive(Parser, Debug, Clone)]
#[command(arg_required_else_help(true))]
pub struct MergeArgs {
    /// Count datasets to combine
    #[arg(value_name = "DATASETS", required = true, value_parser = check_dataset_dir)]
    pub datasets: Vec<PathBuf>,

    /// Output directory, replaced if it exists
    #[arg(
        short = 'o',
        long = "output",
        value_name = "DIR",
        value_parser = check_prefix_path,
        required = true
    )]
    pub output: PathBuf,

    /// Number of threads
    #[arg(
        short = '@',
        long = "threads",
        value_name = "THREADS",
        default_value = "1",
        value_parser = threads_in_range
    )]
    pub threads: usize,
}

impl MergeArgs {
    pub fn preflight(&self) -> Result<()> {
        if self.datasets.len() < 2 {
            log::warn!("Only one dataset given, merge will copy it");
        }
        check_not_inside(&self.output, &self.datasets)
    }
}

#[derive(Parser, Debug, Clone)]
#[command(arg_required_else_help(true))]
pub struct FinalizeArgs {
    /// Count dataset produced by count or merge
    #[arg(value_name = "DATASET", value_parser = check_dataset_dir)]
    pub dataset: PathBuf,

    /// Output directory, replaced if it exists
    #[arg(
        short = 'o',
        long = "output",
        value_name = "DIR",
        value_parser = check_prefix_path,
        required = true
    )]
    pub output: PathBuf,

    /// Number of threads
    #[arg(
        short = '@',
        long = "threads",
        value_name = "THREADS",
        default_value = "1",
        value_parser = threads_in_range
    )]
    pub threads: usize,
}

impl FinalizeArgs {
    pub fn preflight(&self) -> Result<()> {
        check_not_inside(&self.output, std::slice::from_ref(&self.dataset))
    }
}

/// The output directory is deleted up front, so it must not hold any input.
fn check_not_inside(output: &Path, inputs: &[PathBuf]) -> Result<()> {
    let Ok(output) = output.canonicalize() else {
        return Ok(());
    };
    for input in inputs {
        if let Ok(input) = input.canonicalize() {
            if input.starts_with(&output) {
                return Err(format!(
                    "Output directory {} contains the input {}",
                    output.display(),
                    input.display()
                )
                .into());
            }
        }
    }
    Ok(())
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Color {
    Always,
    Auto,
    Never,
}

impl Color {
    fn apply(self) {
        match self {
            Color::Always => owo_colors::set_override(true),
            Color::Auto => {}
            Color::Never => owo_colors::set_override(false),
        }
    }
}

pub fn init_verbose(args: &Cli) {
    args.color.apply();

    let filter_level: LevelFilter = match args.verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    env_logger::Builder::from_default_env()
        .format(format_log)
        .filter_level(filter_level)
        .init();
}

#[inline(always)]
fn level_style(level: Level) -> (&'static str, Style) {
    match level {
        Level::Error => ("ERROR", Style::new().fg::<Red>().bold()),
        Level::Warn => ("WARN", Style::new().fg::<Yellow>()),
        Level::Info => ("INFO", Style::new().fg::<Green>()),
        Level::Debug => ("DEBUG", Style::new().fg::<Blue>()),
        Level::Trace => ("TRACE", Style::new().fg::<Magenta>()),
    }
}

fn format_log(buf: &mut env_logger::fmt::Formatter, record: &log::Record) -> std::io::Result<()> {
    let (label, style) = level_style(record.level());
    let ts = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
    let painted_label = label.if_supports_color(Stream::Stderr, |t| style.style(t));
    writeln!(buf, "{ts} [{}] - {}", painted_label, record.args())
}

fn check_prefix_path(s: &str) -> Result<PathBuf> {
    let path = Path::new(s);
    if let Some(parent_dir) = path.parent() {
        if !parent_dir.as_os_str().is_empty() && !parent_dir.exists() {
            return Err(format!("Path does not exist: {}", parent_dir.display()).into());
        }
    }
    Ok(PathBuf::from(s))
}

fn threads_in_range(s: &str) -> Result<usize> {
    let thread: usize = s
        .parse()
        .map_err(|_| format!("`{}` is not a valid thread number", s))?;
    if thread >= 1 {
        Ok(thread)
    } else {
        Err("Number of threads must be at least 1".into())
    }
}

fn check_file_exists(s: &str) -> Result<PathBuf> {
    let path = Path::new(s);
    if !path.exists() {
        Err(format!("File does not exist: {}", path.display()).into())
    } else {
        Ok(path.to_path_buf())
    }
}

fn check_dataset_dir(s: &str) -> Result<PathBuf> {
    let path = check_file_exists(s)?;
    if !path.join(INFO_FILE).is_file() {
        return Err(format!("{} is not a count dataset (no {})", path.display(), INFO_FILE).into());
    }
    Ok(path)
}

fn ensure_unit_float(s: &str) -> Result<f64> {
    let value = s
        .parse::<f64>()
        .map_err(|e| format!("Could not parse float: {}", e))?;
    if !(0.0..=1.0).contains(&value) {
        Err(format!("The value must be between 0.0 and 1.0, got: {}", value).into())
    } else {
        Ok(value)
    }
}

fn parse_region(s: &str) -> Result<Region> {
    Region::from_string(s)
}
