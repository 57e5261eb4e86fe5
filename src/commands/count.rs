use super::{initialize_thread_pool, progress_bar};
use crate::{
    cli::CountArgs,
    pile::{
        chrom::Sex,
        counter::{count_region, CountParams},
        dataset::{file_pile_path, merged_pile_path, recreate_dir, region_dir},
        merger::merge_piles,
        metadata::{RunInfo, SampleCounts},
        sex::infer_samples_sex,
        vcf_reader::{ReadMode, VariantSource},
    },
    utils::{vcf_file_stem, Region, Result},
};
use rayon::prelude::*;
use std::{
    fs,
    path::{Path, PathBuf},
};

/// A variant file with the inferred sex of its samples.
struct InputFile {
    path: PathBuf,
    stem: String,
    samples: Vec<(String, Sex)>,
}

pub fn count(args: CountArgs) -> Result<()> {
    let paths = args.input_files()?;
    let regions = args.regions()?;
    let params = args.count_params();
    let mode = args.read_mode();
    log::info!(
        "Counting {} files over {} regions",
        paths.len(),
        regions.len()
    );

    let pool = initialize_thread_pool(args.threads)?;

    let inputs = pool.install(|| infer_sexes(&paths, &args, mode))?;
    let sample_number = SampleCounts::from_sexes(
        inputs
            .iter()
            .flat_map(|input| input.samples.iter().map(|(_, sex)| sex)),
    );
    log::info!(
        "Identified {} XX and {} XY samples",
        sample_number.xx,
        sample_number.xy
    );

    recreate_dir(&args.output)?;
    RunInfo::new(args.min_dp, sample_number).write(&args.output)?;

    for region in &regions {
        pool.install(|| count_files(&inputs, region, &args.output, params, mode))?;
        log::info!("Merging files for {}", region);
        let piles: Vec<PathBuf> = inputs
            .iter()
            .map(|input| file_pile_path(&args.output, region, &input.stem))
            .collect();
        merge_piles(&piles, &merged_pile_path(&args.output, region))?;
        if !args.debug {
            remove_file_piles(&inputs, &args.output, region)?;
        }
    }
    Ok(())
}

fn infer_sexes(paths: &[PathBuf], args: &CountArgs, mode: ReadMode) -> Result<Vec<InputFile>> {
    let pb = progress_bar(paths.len(), "Inferring sex");
    let inputs = paths
        .par_iter()
        .map(|path| -> Result<InputFile> {
            let mut source = VariantSource::open(path, mode)?;
            let samples =
                infer_samples_sex(&mut source, args.undetermined_sex, args.on_unsupported)?;
            pb.inc(1);
            Ok(InputFile {
                path: path.clone(),
                stem: vcf_file_stem(path),
                samples,
            })
        })
        .collect::<Result<Vec<_>>>();
    pb.finish_and_clear();
    inputs
}

fn count_files(
    inputs: &[InputFile],
    region: &Region,
    output: &Path,
    params: CountParams,
    mode: ReadMode,
) -> Result<()> {
    let pb = progress_bar(inputs.len(), region.to_string());
    let result = inputs.par_iter().try_for_each(|input| -> Result<()> {
        let out = file_pile_path(output, region, &input.stem);
        if let Some(dir) = out.parent() {
            fs::create_dir_all(dir)
                .map_err(|e| format!("Failed to create {}: {}", dir.display(), e))?;
        }
        let mut source = VariantSource::open(&input.path, mode)?;
        count_region(&mut source, region, &input.samples, params, &out)?;
        pb.inc(1);
        Ok(())
    });
    pb.finish_and_clear();
    result
}

fn remove_file_piles(inputs: &[InputFile], output: &Path, region: &Region) -> Result<()> {
    for input in inputs {
        let dir = region_dir(output, region).join(&input.stem);
        fs::remove_dir_all(&dir)
            .map_err(|e| format!("Failed to remove {}: {}", dir.display(), e))?;
    }
    Ok(())
}
