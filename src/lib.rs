pub mod cli;
pub mod commands;
pub mod pile;
pub mod utils;
