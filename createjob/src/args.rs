use std::path::PathBuf;

use clap::Parser;

/// Run a word-count job over a fixed set of books.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Service endpoint
    #[arg(long, env = "MANTA_URL")]
    pub url: String,

    /// Account that owns the job and the input objects
    #[arg(long, env = "SDC_ACCOUNT")]
    pub account: String,

    /// Key id named in the Authorization header
    #[arg(long, env = "SDC_KEY_ID")]
    pub key_id: String,

    /// File holding the signing secret
    #[arg(long, env = "SDC_KEY_FILE")]
    pub key_file: PathBuf,

    /// Seconds to wait for the job before fetching its output
    #[arg(long, default_value_t = 10)]
    pub wait_secs: u64,
}

pub fn parse_args() -> Args {
    Args::parse()
}
