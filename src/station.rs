use std::{future::Future, time::Duration};

use tokio::time::{self, MissedTickBehavior};
use tracing::info;

use crate::{sensors::SamplingScheduler, settings::SettingsService};

/// The node's main loop.
///
/// Every tick polls the sampling scheduler and then the settings service.
/// Neither poll blocks on its own, so HTTP handlers on the same runtime keep
/// getting turns between ticks.
pub struct Station {
    scheduler: SamplingScheduler,
    settings: SettingsService,
    tick: Duration,
}

impl Station {
    pub fn new(scheduler: SamplingScheduler, settings: SettingsService, tick: Duration) -> Self {
        Self {
            scheduler,
            settings,
            tick,
        }
    }

    pub fn scheduler(&self) -> &SamplingScheduler {
        &self.scheduler
    }

    pub fn settings(&self) -> &SettingsService {
        &self.settings
    }

    /// One loop iteration.
    pub async fn step(&mut self) {
        self.scheduler.poll().await;
        self.settings.poll();
    }

    /// Runs until `shutdown` completes, then hands the station back.
    /// Spawn this via `tokio::spawn`.
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) -> Self {
        info!(
            tick = ?self.tick,
            sample_interval = ?self.scheduler.interval(),
            "Station loop started"
        );

        let mut ticker = time::interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => self.step().await,
            }
        }

        info!(cycles = self.scheduler.cycles(), "Station loop stopped");
        self
    }
}
