use crate::challenge::ChallengeDetector;
use crate::config::Settings;
use crate::detail::{DetailFetcher, DetailStats};
use crate::log::ActivityLogger;
use crate::pacing::Pacer;
use crate::reconcile::{interleave, reconcile, Reconciled};
use crate::render::Renderer;
use crate::store::DatasetStore;
use crate::types::*;
use crate::walk::{StopReason, Walker};
use crate::error::*;
use chrono::Local;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// What one region's harvest produced.
#[derive(Debug, Clone)]
pub struct HarvestReport {
    pub region: Region,
    pub pages_visited: u32,
    pub stop: StopReason,
    pub reused: usize,
    pub fetched: usize,
    pub details: DetailStats,
    /// Dataset path; `None` when nothing was collected and nothing written.
    pub saved_to: Option<PathBuf>,
    pub elapsed: Duration,
}

impl HarvestReport {
    pub fn total(&self) -> usize {
        self.reused + self.fetched
    }

    /// Nothing was collected for the region.
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    fn summary_line(&self) -> String {
        format!(
            "{} listings ({} reused, {} fetched, {} described) from {} pages in {}ms; {}",
            self.total(),
            self.reused,
            self.fetched,
            self.details.described,
            self.pages_visited,
            self.elapsed.as_millis(),
            self.stop
        )
    }
}

/// Drives walk, reconcile, detail fetch and save for one region at a time.
pub struct Harvester<'a, R: Renderer + ?Sized, S: DatasetStore> {
    renderer: &'a mut R,
    store: &'a S,
    settings: &'a Settings,
    logger: Option<&'a ActivityLogger>,
    pacer: Pacer,
    detector: ChallengeDetector,
}

impl<'a, R: Renderer + ?Sized, S: DatasetStore> Harvester<'a, R, S> {
    pub fn new(renderer: &'a mut R, store: &'a S, settings: &'a Settings) -> Self {
        Self {
            renderer,
            store,
            settings,
            logger: None,
            pacer: Pacer::new(settings.pacing.clone()),
            detector: ChallengeDetector::new(settings.policy.challenge.clone()),
        }
    }

    pub fn with_logger(mut self, logger: &'a ActivityLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Harvest one region and replace its dataset.
    ///
    /// Page-level failures end the walk with partial results; only a failed save
    /// is an error.
    pub fn harvest(&mut self, region: &Region) -> Result<HarvestReport> {
        let started = Instant::now();
        let run_at = Local::now();
        info!(renderer = self.renderer.name(), "harvesting {region}");

        let prior = if self.settings.fresh {
            Vec::new()
        } else {
            self.load_prior(region)
        };

        let base = self.settings.site.base_url()?;
        let index_url = self.settings.site.index_url(region);
        let limits = &self.settings.limits;
        let walked = Walker::new(
            &mut *self.renderer,
            &self.settings.policy,
            &self.detector,
            &self.pacer,
            base,
        )
        .walk(&index_url, limits.target_count, limits.max_pages);

        let split = if self.settings.fresh {
            Reconciled::all_fresh(walked.listings)
        } else {
            reconcile(walked.listings, &prior)
        };
        let Reconciled { reused, to_fetch, order } = split;

        let (fetched, details) = DetailFetcher::new(
            &mut *self.renderer,
            &self.settings.policy,
            &self.detector,
            &self.pacer,
            limits.min_description_chars,
        )
        .progress_every(limits.progress_every)
        .fetch_details(to_fetch);

        let mut report = HarvestReport {
            region: region.clone(),
            pages_visited: walked.pages_visited,
            stop: walked.stop,
            reused: reused.len(),
            fetched: fetched.len(),
            details,
            saved_to: None,
            elapsed: Duration::ZERO,
        };

        if report.is_empty() {
            report.elapsed = started.elapsed();
            warn!("no listings collected for {region}; dataset left untouched");
            self.activity_error(region, &format!("no listings collected; {}", report.stop));
            return Ok(report);
        }

        let rows: Vec<Listing> = interleave(&order, reused, fetched)
            .into_iter()
            .map(|mut l| {
                l.source_region = Some(region.clone());
                l.collected_at = Some(run_at);
                l
            })
            .collect();

        match self.store.save(region, &rows) {
            Ok(path) => {
                info!("saved {} rows to {}", rows.len(), path.display());
                report.saved_to = Some(path);
            }
            Err(e) => {
                self.activity_error(region, &format!("save failed: {e}"));
                return Err(e);
            }
        }

        report.elapsed = started.elapsed();
        info!("{region}: {}", report.summary_line());
        self.activity_info(region, &report.summary_line());
        Ok(report)
    }

    /// Harvest each region in turn with a cooldown in between.
    pub fn run_regions(&mut self, regions: &[Region]) -> Vec<(Region, Result<HarvestReport>)> {
        let mut out = Vec::with_capacity(regions.len());
        for (idx, region) in regions.iter().enumerate() {
            if idx > 0 {
                let waited = self.pacer.pause(self.settings.pacing.region_cooldown);
                info!("cooled down {}s before {region}", waited.as_secs());
            }
            let result = self.harvest(region);
            if let Err(e) = &result {
                warn!("harvest of {region} failed: {e}");
            }
            out.push((region.clone(), result));
        }
        out
    }

    fn load_prior(&self, region: &Region) -> Vec<Listing> {
        match self.store.load(region) {
            Ok(rows) => {
                if !rows.is_empty() {
                    info!("{} prior rows for {region}", rows.len());
                }
                rows
            }
            Err(e) => {
                warn!("prior dataset for {region} unreadable, starting empty: {e}");
                Vec::new()
            }
        }
    }

    // Activity logging never fails the harvest.
    fn activity_info(&self, region: &Region, details: &str) {
        if let Some(log) = self.logger {
            let _ = log.info(Some(region.name()), "harvest", Some(details));
        }
    }

    fn activity_error(&self, region: &Region, details: &str) {
        if let Some(log) = self.logger {
            let _ = log.error(Some(region.name()), "harvest", Some(details));
        }
    }
}
