//! Scan-and-patch loop that pushes every anchor's expiration into the target year.
//!
//! Each pass re-fetches the first page of the listing. Patched anchors are
//! expected to leave that window, exposing the next stale ones. The loop
//! ends after the first pass that sends no patch.

use std::collections::BTreeSet;

use log::{info, warn};

use crate::api::{AnchorApi, ListOrder};
use crate::error::RefreshError;

pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const DEFAULT_TARGET_YEAR: i32 = 2030;

#[derive(Debug, Clone)]
pub struct RefreshOptions {
    pub page_size: u32,
    pub order: ListOrder,
    pub target_year: i32,
    /// Give up after this many passes that sent patches, unless the
    /// listing that follows them is clean. `None` loops until a pass is clean.
    pub max_passes: Option<u32>,
    /// Report stale anchors without patching them.
    pub dry_run: bool,
}

impl Default for RefreshOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            order: ListOrder::default(),
            target_year: DEFAULT_TARGET_YEAR,
            max_passes: None,
            dry_run: false,
        }
    }
}

/// What a single pass over the first page did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PassOutcome {
    pub anchors_seen: usize,
    /// Anchors not yet in the target year.
    pub stale: usize,
    /// Patch requests sent, whatever their response.
    pub patched: usize,
    /// Patch responses outside 2xx.
    pub failed_patches: usize,
    /// Names of anchors whose expiration could not be rewritten.
    pub skipped: Vec<String>,
}

impl PassOutcome {
    pub fn updated_any(&self) -> bool {
        self.patched > 0
    }
}

#[derive(Debug, Default)]
pub struct RefreshStats {
    pub passes: u32,
    /// Passes that sent at least one patch.
    pub patching_passes: u32,
    pub patched: usize,
    pub failed_patches: usize,
    /// Stale anchors found by the last pass.
    pub last_stale: usize,
    pub skipped: BTreeSet<String>,
}

impl RefreshStats {
    fn record(&mut self, outcome: &PassOutcome) {
        self.passes += 1;
        if outcome.updated_any() {
            self.patching_passes += 1;
        }
        self.patched += outcome.patched;
        self.failed_patches += outcome.failed_patches;
        self.last_stale = outcome.stale;
        self.skipped.extend(outcome.skipped.iter().cloned());
    }
}

pub struct Refresher<A> {
    api: A,
    options: RefreshOptions,
}

impl<A: AnchorApi> Refresher<A> {
    pub fn new(api: A, options: RefreshOptions) -> Self {
        Self { api, options }
    }

    #[cfg(test)]
    pub fn api(&self) -> &A {
        &self.api
    }

    /// Runs passes until one of them patches nothing.
    pub async fn run(&self) -> Result<RefreshStats, RefreshError> {
        let mut stats = RefreshStats::default();

        loop {
            let limit_reached = self
                .options
                .max_passes
                .is_some_and(|max| stats.patching_passes >= max);

            info!("=== Pass {} ===", stats.passes + 1);
            let outcome = self.scan(!limit_reached).await?;
            stats.record(&outcome);

            if limit_reached && outcome.stale > 0 {
                return Err(RefreshError::PassLimitReached(stats.patching_passes));
            }
            if !outcome.updated_any() {
                break;
            }
        }

        Ok(stats)
    }

    /// Fetches the first page and patches every stale anchor on it.
    pub async fn run_pass(&self) -> Result<PassOutcome, RefreshError> {
        self.scan(true).await
    }

    async fn scan(&self, patch: bool) -> Result<PassOutcome, RefreshError> {
        let year = self.options.target_year;
        let anchors = self
            .api
            .list_anchors(self.options.page_size, self.options.order)
            .await?;

        let mut outcome = PassOutcome {
            anchors_seen: anchors.len(),
            ..PassOutcome::default()
        };
        info!("Fetched {} anchors", outcome.anchors_seen);

        for anchor in &anchors {
            let new_expire_time = match anchor.refreshed_expire_time(year) {
                Ok(Some(value)) => value,
                Ok(None) => continue,
                Err(e) => {
                    warn!("Skipping {}: {}", anchor.name, e);
                    outcome.skipped.push(anchor.name.clone());
                    continue;
                }
            };
            outcome.stale += 1;

            if self.options.dry_run || !patch {
                info!(
                    "Would update expire time of {} from {} to {}",
                    anchor.name, anchor.expire_time, new_expire_time
                );
                continue;
            }

            info!(
                "Expire time of {} is {}, updating to {}",
                anchor.name, anchor.expire_time, year
            );
            let status = self
                .api
                .patch_expire_time(anchor.id(), &new_expire_time)
                .await?;
            outcome.patched += 1;

            if status.is_success() {
                info!("{}", status.as_u16());
            } else {
                outcome.failed_patches += 1;
                warn!("{} (patch of {} not applied)", status.as_u16(), anchor.name);
            }
        }

        Ok(outcome)
    }
}
