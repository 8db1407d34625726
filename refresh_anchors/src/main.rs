//! Refresh Anchors - Ghosts of History maintenance
//!
//! Pushes the expiration time of every ARCore cloud anchor to 2030 so the
//! service does not discard them. Anchors live for at most a year unless
//! refreshed, so this has to run at least once a year.
//!
//! Needs `oauth2l` on PATH and the service account key file in the working
//! directory.
//!
//! Exit codes:
//! - 0: All anchors on the listed page expire in the target year
//! - 1: Error occurred

mod anchor;
mod api;
mod error;
mod refresh;
mod token;

use std::time::Duration;

use clap::Parser;
use env_logger::{Env, Target};
use log::{error, info};

use crate::api::{ArcoreClient, ListOrder, DEFAULT_API_BASE_URL};
use crate::error::RefreshError;
use crate::refresh::{
    RefreshOptions, RefreshStats, Refresher, DEFAULT_PAGE_SIZE, DEFAULT_TARGET_YEAR,
};
use crate::token::{OAuth2l, DEFAULT_KEY_FILE, DEFAULT_PROGRAM, DEFAULT_SCOPE};

#[derive(Parser, Debug)]
#[command(name = "refresh_anchors")]
#[command(about = "Move the expiration of all ARCore cloud anchors to 2030")]
struct Args {
    /// Base URL of the ARCore API
    #[arg(long, default_value = DEFAULT_API_BASE_URL)]
    api_base_url: String,

    /// Service account key file handed to oauth2l
    #[arg(long, default_value = DEFAULT_KEY_FILE)]
    key_file: String,

    /// OAuth scope requested from oauth2l
    #[arg(long, default_value = DEFAULT_SCOPE)]
    scope: String,

    /// Credential tool to run
    #[arg(long, default_value = DEFAULT_PROGRAM)]
    oauth2l_bin: String,

    /// Anchors fetched per pass
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    page_size: u32,

    /// Order of the anchor listing
    #[arg(long, value_enum, default_value_t = ListOrder::Descending)]
    order: ListOrder,

    /// Year every anchor should expire in
    #[arg(long, default_value_t = DEFAULT_TARGET_YEAR)]
    target_year: i32,

    /// Stop with an error after this many passes
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    max_passes: Option<u32>,

    /// HTTP request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    /// List stale anchors without patching them
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .target(Target::Stdout)
        .init();

    let exit_code = match run().await {
        Ok(()) => 0,
        Err(e) => {
            error!("{}", e);
            1
        }
    };

    std::process::exit(exit_code);
}

async fn run() -> Result<(), RefreshError> {
    let args = Args::parse();

    info!("=== Refreshing anchors ===");
    info!("API: {}", args.api_base_url);

    let oauth2l = OAuth2l {
        program: args.oauth2l_bin.clone(),
        key_file: args.key_file.clone(),
        scope: args.scope.clone(),
    };
    let token = oauth2l.fetch().await?;

    let client = ArcoreClient::new(
        &args.api_base_url,
        token,
        Duration::from_secs(args.timeout_secs),
    )?;
    let options = RefreshOptions {
        page_size: args.page_size,
        order: args.order,
        target_year: args.target_year,
        max_passes: args.max_passes,
        dry_run: args.dry_run,
    };

    let stats = Refresher::new(client, options).run().await?;
    print_final_summary(&stats, &args);
    Ok(())
}

fn print_final_summary(stats: &RefreshStats, args: &Args) {
    println!();
    println!("FINAL SUMMARY");
    println!("=============");
    println!("Passes: {}", stats.passes);

    if args.dry_run {
        println!("Would update: {}", stats.last_stale);
        return;
    }

    println!("Patched: {}", stats.patched);
    if stats.failed_patches > 0 {
        println!("Rejected patches: {}", stats.failed_patches);
    }
    if !stats.skipped.is_empty() {
        println!("Skipped: {}", stats.skipped.len());
        for name in &stats.skipped {
            println!("   {}", name);
        }
    }

    println!();
    println!("{}", closing_line(stats, args.target_year));
}

fn closing_line(stats: &RefreshStats, year: i32) -> String {
    if stats.skipped.is_empty() {
        format!("All anchors have their time to live in {}. No work to be done.", year)
    } else {
        format!(
            "{} anchors could not be moved to {}; all others have their time to live in {}.",
            stats.skipped.len(),
            year,
            year
        )
    }
}
