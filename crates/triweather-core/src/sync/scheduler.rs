//! Background refresh scheduling.
//!
//! Two independent loops run on top of the coordinator:
//! - Auto-refresh: every `refresh_interval`, refresh all tracked locations
//!   (cache-busting, fire-and-continue). Skipped while any fetch is in
//!   flight so ticks never pile up behind a slow network.
//! - Staleness sweep: every five minutes, re-fetch any location whose
//!   published record is older than the staleness threshold or missing
//!   entirely. Uses plain fetches, so fresh cache entries still satisfy it.
//!
//! Each loop is guarded by its own cancellation token; `apply_settings`
//! re-arms the auto-refresh loop so a changed interval takes effect
//! immediately instead of after the old interval elapses.

use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use tracing::{debug, info};

use crate::cancel::CancellationToken;
use crate::config::SyncConfig;
use crate::sync::coordinator::FetchCoordinator;
use crate::types::Location;

/// User-tunable scheduling knobs.
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    /// Interval between auto-refresh passes.
    pub refresh_interval: Duration,
    /// Master switch for the auto-refresh loop. The staleness sweep runs
    /// regardless.
    pub auto_refresh_enabled: bool,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            refresh_interval: SyncConfig::DEFAULT_REFRESH_INTERVAL,
            auto_refresh_enabled: true,
        }
    }
}

/// Drives periodic refreshes of every tracked location.
pub struct RefreshScheduler {
    coordinator: Arc<FetchCoordinator>,
    locations: RwLock<Vec<Location>>,
    settings: Mutex<SchedulerSettings>,
    refresh_cancel: Mutex<Option<CancellationToken>>,
    sweep_cancel: Mutex<Option<CancellationToken>>,
}

impl RefreshScheduler {
    pub fn new(coordinator: Arc<FetchCoordinator>) -> Self {
        Self {
            coordinator,
            locations: RwLock::new(Vec::new()),
            settings: Mutex::new(SchedulerSettings::default()),
            refresh_cancel: Mutex::new(None),
            sweep_cancel: Mutex::new(None),
        }
    }

    /// Replace the set of tracked locations. Takes effect on the next tick of
    /// either loop.
    pub fn set_locations(&self, locations: Vec<Location>) {
        *self.locations.write().unwrap() = locations;
    }

    /// Snapshot of the tracked locations.
    pub fn locations(&self) -> Vec<Location> {
        self.locations.read().unwrap().clone()
    }

    /// Start both background loops. Idempotent per loop: a running loop is
    /// cancelled and re-armed.
    pub fn start(self: &Arc<Self>) {
        self.arm_refresh_loop();
        self.arm_sweep_loop();
    }

    /// Apply new settings and re-arm the auto-refresh loop so the change
    /// takes effect now rather than after the previous interval.
    pub fn apply_settings(self: &Arc<Self>, settings: SchedulerSettings) {
        info!(
            "Scheduler settings: auto_refresh={} interval={:?}",
            settings.auto_refresh_enabled, settings.refresh_interval
        );
        *self.settings.lock().unwrap() = settings;
        self.arm_refresh_loop();
    }

    /// Stop both loops. Already-started fetches run to completion.
    pub fn shutdown(&self) {
        if let Some(token) = self.refresh_cancel.lock().unwrap().take() {
            token.cancel();
        }
        if let Some(token) = self.sweep_cancel.lock().unwrap().take() {
            token.cancel();
        }
    }

    fn arm_refresh_loop(self: &Arc<Self>) {
        let mut slot = self.refresh_cancel.lock().unwrap();
        if let Some(token) = slot.take() {
            token.cancel();
        }

        let settings = self.settings.lock().unwrap().clone();
        if !settings.auto_refresh_enabled {
            debug!("Auto-refresh disabled");
            return;
        }

        let token = CancellationToken::new();
        *slot = Some(token.clone());
        drop(slot);

        let this = Arc::clone(self);
        let interval = settings.refresh_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // First tick of tokio's interval fires immediately; consume it so
            // the first refresh happens one full interval from arming.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                if token.is_cancelled() {
                    break;
                }

                if this.coordinator.any_fetch_in_flight() {
                    debug!("Skipping auto-refresh tick: fetch already in flight");
                    continue;
                }

                let locations = this.locations.read().unwrap().clone();
                if locations.is_empty() {
                    continue;
                }

                debug!("Auto-refresh tick: {} locations", locations.len());
                this.coordinator.refresh_all_weather_data(&locations).await;
            }
        });
    }

    fn arm_sweep_loop(self: &Arc<Self>) {
        let mut slot = self.sweep_cancel.lock().unwrap();
        if let Some(token) = slot.take() {
            token.cancel();
        }

        let token = CancellationToken::new();
        *slot = Some(token.clone());
        drop(slot);

        let this = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(SyncConfig::STALENESS_SWEEP_INTERVAL);
            ticker.tick().await;

            loop {
                ticker.tick().await;
                if token.is_cancelled() {
                    break;
                }

                if this.coordinator.any_fetch_in_flight() {
                    continue;
                }

                let locations = this.locations.read().unwrap().clone();
                for location in locations {
                    let stale = match this.coordinator.get_location_weather_data(&location.id) {
                        Some(record) => record.is_stale(SyncConfig::STALENESS_THRESHOLD),
                        None => true,
                    };
                    if stale {
                        debug!("Staleness sweep refetching {}", location.name);
                        // Plain fetch: a still-fresh cache entry satisfies it
                        if let Err(e) = this.coordinator.fetch_weather_data(&location).await {
                            debug!("Staleness refetch failed for {}: {}", location.name, e);
                        }
                    }
                }
            }
        });
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
