mod error;
mod input_files;
mod region;

#[cfg(test)]
pub mod test_util;

pub use error::{Error, Result};
pub use input_files::{find_input_files, is_vcf, vcf_file_stem, SUPPORTED_EXTENSIONS};
pub use region::Region;

pub fn handle_error_and_exit(err: Error) -> ! {
    log::error!("{:#}", err);
    std::process::exit(1);
}
