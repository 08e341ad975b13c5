// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Check the destination directory (before touching the network)
// 3. Fetch the root url; if that fails there is nothing to mirror
// 4. Hand the root response to the traversal engine
// 5. Print the report and exit with a code that says how it went
//
// Exit codes:
//   0 = everything mirrored
//   1 = destination directory does not exist
//   2 = unexpected internal error
//   3 = root url could not be fetched
//   4 = mirrored, but some files or directories failed
// =============================================================================

mod cli;
mod fetch;
mod logging;
mod mirror;

use anyhow::Result;
use clap::Parser;
use url::Url;

use cli::Cli;
use fetch::Fetcher;
use mirror::{FailureKind, Mirror, Report};

const EXIT_OK: i32 = 0;
const EXIT_INVALID_DESTINATION: i32 = 1;
const EXIT_INTERNAL_ERROR: i32 = 2;
const EXIT_ROOT_FETCH_FAILED: i32 = 3;
const EXIT_PARTIAL: i32 = 4;

// The #[tokio::main] attribute builds the async runtime around our main
#[tokio::main]
async fn main() {
    // Run the application and turn its outcome into a process exit code
    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            // {:#} prints the whole anyhow context chain on one line
            eprintln!("Error: {:#}", e);
            EXIT_INTERNAL_ERROR
        }
    };

    std::process::exit(exit_code);
}

// This is the main application logic
//
// Returns:
//   Ok(0) = everything mirrored
//   Ok(1) = destination directory does not exist
//   Ok(3) = root url invalid or could not be fetched
//   Ok(4) = mirrored with some failed branches
//   Err   = unexpected error (mapped to exit code 2 by main)
async fn run() -> Result<i32> {
    // Parse command-line arguments; clap handles --help and --version
    let cli = Cli::parse();

    // Logs go to stderr, so stdout stays clean for the summary or JSON
    logging::init(cli.verbose);

    // Must fail before any request is made
    if !cli.directory.is_dir() {
        eprintln!("Directory doesn't exist: {}", cli.directory.display());
        return Ok(EXIT_INVALID_DESTINATION);
    }

    let root_url = match Url::parse(&cli.url) {
        Ok(url) => url,
        Err(e) => {
            eprintln!("Invalid URL '{}': {}", cli.url, e);
            return Ok(EXIT_ROOT_FETCH_FAILED);
        }
    };

    // One client for the whole run (connection pooling)
    let config = cli.mirror_config();
    let fetcher = Fetcher::new(config.timeout)?;

    // A failed root fetch stops the run: no directory is created and no
    // traversal task is started
    let root = match fetcher.fetch(&root_url).await {
        Ok(root) => root,
        Err(e) => {
            eprintln!("Invalid URL: {}", e);
            return Ok(EXIT_ROOT_FETCH_FAILED);
        }
    };

    if !cli.json {
        println!("🔍 Mirroring {}", root.final_url());
        println!("📁 Into {}", cli.directory.display());
    }

    // Walk the tree; branch failures are collected, never returned
    let report = Mirror::new(fetcher, config).run(root, &cli.directory).await;

    print_report(&report, cli.json)?;

    // Partial failures get their own exit code so scripts can tell
    if report.is_complete() {
        Ok(EXIT_OK)
    } else {
        Ok(EXIT_PARTIAL)
    }
}

// Prints the report either as a table or JSON
//
// Parameters:
//   report: the outcome of the mirror run
//   json: whether to output JSON format
fn print_report(report: &Report, json: bool) -> Result<()> {
    if json {
        let json_output = serde_json::to_string_pretty(report)?;
        println!("{}", json_output);
    } else {
        print_table(report);
    }
    Ok(())
}

// Only failures get a table row; successful files were already logged
fn print_table(report: &Report) {
    if !report.failures.is_empty() {
        println!();
        println!("{:<60} {:<12} {:<30}", "URL", "PROBLEM", "MESSAGE");
        println!("{}", "=".repeat(102));

        for failure in &report.failures {
            // Truncate long urls by characters, never inside a UTF-8 sequence
            let url_display = if failure.url.chars().count() > 57 {
                let head: String = failure.url.chars().take(57).collect();
                format!("{}...", head)
            } else {
                failure.url.clone()
            };

            println!(
                "{:<60} {:<12} {:<30}",
                url_display,
                format_kind(failure.kind),
                failure.message
            );
        }
    }

    println!();
    println!("📊 Summary:");
    println!("   📁 Directories: {}", report.directories);
    println!("   📄 Files: {} ({} bytes)", report.files.len(), report.bytes_written());
    println!("   ❌ Failed: {}", report.error_count());
}

// Short label for the PROBLEM column
fn format_kind(kind: FailureKind) -> &'static str {
    match kind {
        FailureKind::Fetch => "FETCH",
        FailureKind::Filesystem => "FILESYSTEM",
        FailureKind::NameCollision => "COLLISION",
        FailureKind::DepthLimit => "SKIPPED",
    }
}
