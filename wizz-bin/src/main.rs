//! `wizz` fetches many URLs at once without overwhelming the servers behind
//! them.
//!
//! Requests are paced per host, transient failures are retried with
//! backoff, and one result per URL is printed in input order.
//!
//! Fetch a couple of endpoints:
//! ```sh
//! wizz https://api.example.com/items/1 https://api.example.com/items/2
//! ```
//!
//! Read URLs from a file, at most two requests per second:
//! ```sh
//! wizz --rps 2 --input-file urls.txt
//! ```
//!
//! Print every result as JSON, `null` for URLs without a result:
//! ```sh
//! cat urls.txt | wizz --format json --input-file -
//! ```
#![warn(clippy::all, clippy::pedantic)]
#![warn(
    absolute_paths_not_starting_with_crate,
    rustdoc::invalid_html_tags,
    missing_copy_implementations,
    missing_debug_implementations,
    semicolon_in_expressions_from_macros,
    unreachable_pub,
    unused_extern_crates,
    variant_size_differences,
    clippy::missing_const_for_fn
)]
#![deny(anonymous_parameters, macro_use_extern_crate)]
#![deny(missing_docs)]

use std::io::{self, ErrorKind};
use std::path::PathBuf;

use anyhow::{Error, Result, bail};
use clap::Parser;
use log::{error, info};
use wizz_lib::{Client, FetchResult};

mod client;
mod formatters;
mod input_file;
mod options;
mod progress;
mod verbosity;

use crate::formatters::{log::init_logging, output::write_results};
use crate::options::{Config, WIZZ_CONFIG_FILE, WizzOptions};
use crate::progress::Progress;

/// A C-like enum that can be cast to `i32` and used as process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExitCode {
    Success = 0,
    // NOTE: exit code 1 is used for any `Result::Err` bubbled up to `main()`
    // using the `?` operator, and for interrupted runs.
    UnexpectedFailure = 1,
    FetchFailure = 2,
    ConfigFile = 3,
}

fn main() -> Result<()> {
    // std::process::exit doesn't guarantee that all destructors will be run,
    // therefore we wrap the main code in another function to ensure that.
    // See: https://doc.rust-lang.org/stable/std/process/fn.exit.html
    let exit_code = run_main()?;
    std::process::exit(exit_code);
}

/// Merge all provided config options into one.
/// This includes a potential config file, command-line- and environment variables
fn load_config() -> Result<WizzOptions> {
    let mut opts = WizzOptions::parse();

    init_logging(&opts.config.verbose);

    // Load a potentially existing config file and merge it into the config from
    // the CLI
    if let Some(config_file) = &opts.config_file {
        match Config::load_from_file(config_file) {
            Ok(c) => opts.config.merge(c),
            Err(e) => {
                bail!(
                    "Cannot load configuration file `{}`: {e:?}",
                    config_file.display()
                );
            }
        }
    } else {
        // Without an explicit config file, fall back to the default one in
        // the current directory. It must be valid if it exists.
        let default_config = PathBuf::from(WIZZ_CONFIG_FILE);
        if default_config.is_file() {
            match Config::load_from_file(&default_config) {
                Ok(c) => opts.config.merge(c),
                Err(e) => {
                    bail!(
                        "Cannot load default configuration file `{}`: {e:?}",
                        default_config.display()
                    );
                }
            }
        }
    }

    Ok(opts)
}

/// Set up runtime and call wizz entrypoint
fn run_main() -> Result<i32> {
    use std::process::exit;

    let opts = match load_config() {
        Ok(opts) => opts,
        Err(e) => {
            error!("Error while loading config: {e}");
            exit(ExitCode::ConfigFile as i32);
        }
    };

    let runtime = match opts.config.threads {
        Some(threads) => {
            // We define our own runtime instead of the `tokio::main` attribute
            // since we want to make the number of threads configurable
            tokio::runtime::Builder::new_multi_thread()
                .worker_threads(threads)
                .enable_all()
                .build()?
        }
        None => tokio::runtime::Runtime::new()?,
    };

    match runtime.block_on(run(&opts)) {
        Err(e) if Some(ErrorKind::BrokenPipe) == underlying_io_error_kind(&e) => {
            exit(ExitCode::Success as i32);
        }
        res => res,
    }
}

/// Check if the given error can be traced back to an `io::ErrorKind`
/// This is helpful for troubleshooting the root cause of an error.
/// Code is taken from the anyhow documentation.
fn underlying_io_error_kind(error: &Error) -> Option<io::ErrorKind> {
    for cause in error.chain() {
        if let Some(io_error) = cause.downcast_ref::<io::Error>() {
            return Some(io_error.kind());
        }
    }
    None
}

/// Fetch all URLs and print their results
async fn run(opts: &WizzOptions) -> Result<i32> {
    let urls = opts.urls()?;
    let client = client::create(&opts.config)?;

    info!("Fetching {} URLs", urls.len());
    let progress = Progress::new(urls.len(), opts.config.no_progress);

    let interrupt = async {
        // Without a signal handler, never interrupt
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };
    let Some(results) = fetch_all(&client, &urls, &progress, interrupt).await else {
        progress.finish();
        info!("Interrupted, no results were written");
        return Ok(ExitCode::UnexpectedFailure as i32);
    };
    progress.finish();

    write_results(&mut io::stdout().lock(), &results, &opts.config.format)?;

    let failures = results.iter().filter(|result| result.is_none()).count();
    if failures > 0 {
        error!("{failures} of {} URLs could not be fetched", urls.len());
        return Ok(ExitCode::FetchFailure as i32);
    }

    Ok(ExitCode::Success as i32)
}

/// Fetch all URLs, unless `interrupt` completes first
async fn fetch_all<F>(
    client: &Client,
    urls: &[String],
    progress: &Progress,
    interrupt: F,
) -> Option<Vec<FetchResult>>
where
    F: Future<Output = ()>,
{
    tokio::select! {
        biased;
        () = interrupt => None,
        results = client.fetch_all_with_progress(urls, |_| progress.update()) => Some(results),
    }
}
