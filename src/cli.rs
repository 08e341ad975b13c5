// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// Two flags are required: the url to mirror and the directory to mirror it
// into. The rest tune the traversal and the output.
// =============================================================================

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::mirror::MirrorConfig;

// #[derive(Parser)] tells clap to automatically generate parsing code
#[derive(Parser, Debug)]
#[command(
    name = "dir-mirror",
    version,
    about = "Downloads files from a url and creates the respective directories",
    long_about = "dir-mirror walks an HTML directory listing (Apache, nginx, python http.server, ...) \
                  and mirrors every file and sub-directory it links to into a local directory."
)]
pub struct Cli {
    /// URL to mirror: a directory listing (ending in '/') or a single file
    #[arg(short = 'u', long)]
    pub url: String,

    /// Existing directory to save files in
    #[arg(short = 'd', long)]
    pub directory: PathBuf,

    /// Maximum number of requests in flight
    #[arg(short = 'c', long, default_value_t = 4, value_parser = clap::value_parser!(u16).range(1..))]
    pub concurrency: u16,

    /// Per-request timeout in seconds
    ///
    /// Applies to waiting for a response, and to each pause while a body
    /// is being downloaded (not to the total download time).
    #[arg(short = 't', long, default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: u64,

    /// Do not descend more than N directory levels below the root
    #[arg(long, value_name = "N")]
    pub max_depth: Option<usize>,

    /// Output the run report in JSON format instead of a table
    #[arg(long)]
    pub json: bool,

    /// Log every request (debug level)
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

impl Cli {
    pub fn mirror_config(&self) -> MirrorConfig {
        MirrorConfig {
            concurrency: usize::from(self.concurrency),
            timeout: Duration::from_secs(self.timeout),
            max_depth: self.max_depth,
        }
    }
}
