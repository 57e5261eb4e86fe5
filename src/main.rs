use clap::Parser;
use std::{env, time};
use varpile::{
    cli::{init_verbose, Cli, Command, FULL_VERSION},
    commands::{count, finalize, merge},
    utils::{handle_error_and_exit, Result},
};

/// htslib complaints about indices and malformed records are only shown at trace verbosity.
fn configure_htslib_logging(verbosity: u8) {
    if verbosity >= 3 || env::var_os("VARPILE_ENABLE_HTSLIB_LOGGING").is_some() {
        log::debug!("Keeping htslib logging enabled");
        return;
    }
    unsafe {
        use rust_htslib::htslib::{htsLogLevel_HTS_LOG_OFF, hts_set_log_level};
        hts_set_log_level(htsLogLevel_HTS_LOG_OFF);
    }
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Count(args) => {
            args.preflight()?;
            count::count(args)
        }
        Command::Merge(args) => {
            args.preflight()?;
            merge::merge(args)
        }
        Command::Finalize(args) => {
            args.preflight()?;
            finalize::finalize(args)
        }
    }
}

fn runner() -> Result<()> {
    let cli = Cli::parse();
    init_verbose(&cli);
    configure_htslib_logging(cli.verbosity);

    let name = cli.command.name();
    let output = cli.command.output().to_path_buf();
    log::info!("varpile {} {}", FULL_VERSION, name);
    log::trace!("{:#?}", cli.command);

    let start_timer = time::Instant::now();
    run(cli.command)?;
    log::info!(
        "{} wrote {} in {:.2?}",
        name,
        output.display(),
        start_timer.elapsed()
    );
    Ok(())
}

fn main() {
    if let Err(e) = runner() {
        handle_error_and_exit(e);
    }
}
