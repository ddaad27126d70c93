//! The dashboard controller.
//!
//! `Dashboard` owns everything that changes while the page is up: the chart,
//! the refresh policy, the last-refresh marker and the single pending timer.
//! Clones share one instance; separate `create` calls are fully independent.

use crate::chart::ChartRenderer;
use crate::clock::Clock;
use crate::config::Config;
use crate::fetcher::{FetchError, Fetcher};
use crate::models::{DashboardView, DataSource, StatusView, VisibilityEvent};
use crate::reconciler;
use crate::schedule::RefreshPolicy;
use crate::svg::{self, RenderError};
use crate::timer::{Task, Timer};
use chrono::{DateTime, Utc};
use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicU64, Ordering},
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct Dashboard {
    inner: Arc<Inner>,
}

struct Inner {
    config: Config,
    places: Vec<String>,
    fetcher: Fetcher,
    timer: Arc<dyn Timer>,
    clock: Arc<dyn Clock>,
    mock_forced: AtomicBool,
    started: AtomicBool,
    disposed: AtomicBool,
    refresh_seq: AtomicU64,
    view: Mutex<ViewState>,
}

struct ViewState {
    renderer: ChartRenderer,
    policy: RefreshPolicy,
    source: Option<DataSource>,
    applied_seq: u64,
    refresh_count: u64,
    last_refresh: Option<DateTime<Utc>>,
    next_refresh: Option<DateTime<Utc>>,
    last_updated_utc: Option<String>,
}

/// What a single refresh did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshOutcome {
    pub source: DataSource,
    /// False when a newer refresh finished first and this result was dropped.
    pub applied: bool,
}

impl Dashboard {
    pub fn create(
        config: Config,
        timer: Arc<dyn Timer>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, FetchError> {
        let fetcher = Fetcher::new(&config)?;
        let view = ViewState {
            renderer: ChartRenderer::new(config.mode),
            policy: config.policy(),
            source: None,
            applied_seq: 0,
            refresh_count: 0,
            last_refresh: None,
            next_refresh: None,
            last_updated_utc: None,
        };
        Ok(Self {
            inner: Arc::new(Inner {
                places: config.place_names(),
                mock_forced: AtomicBool::new(config.force_mock),
                config,
                fetcher,
                timer,
                clock,
                started: AtomicBool::new(false),
                disposed: AtomicBool::new(false),
                refresh_seq: AtomicU64::new(0),
                view: Mutex::new(view),
            }),
        })
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Runs the first refresh and arms the timer. Later calls are no-ops.
    pub async fn start(&self) {
        if self.is_disposed() || self.inner.started.swap(true, Ordering::SeqCst) {
            return;
        }
        info!(url = %self.inner.fetcher.url(), "dashboard starting");
        self.refresh().await;
        self.arm_next().await;
    }

    /// Cancels the pending timer; nothing re-arms afterwards.
    pub async fn dispose(&self) {
        // Held across the flag and the cancel so an in-flight `arm_next`
        // either sees the flag or arms before the cancel.
        let mut view = self.inner.view.lock().await;
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.timer.cancel();
        view.next_refresh = None;
        info!("dashboard disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    pub fn pending_timers(&self) -> usize {
        self.inner.timer.pending()
    }

    pub async fn refresh(&self) -> RefreshOutcome {
        let inner = &self.inner;
        let seq = inner.refresh_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let now = inner.clock.now();

        let fetched = if inner.mock_forced.load(Ordering::SeqCst) {
            inner.fetcher.mock_snapshot(now)
        } else {
            inner.fetcher.fetch_snapshot(now).await
        };
        let finished = inner.clock.now();

        let mut view = inner.view.lock().await;
        if seq < view.applied_seq {
            debug!(seq, applied = view.applied_seq, "dropping stale refresh");
            return RefreshOutcome {
                source: fetched.source,
                applied: false,
            };
        }

        let snapshot = fetched.snapshot;
        let unknown: Vec<&str> = snapshot
            .series_by_place
            .keys()
            .map(String::as_str)
            .filter(|place| !inner.places.iter().any(|known| known == place))
            .collect();
        if !unknown.is_empty() {
            warn!(?unknown, "snapshot has places outside the configured list, not charted");
        }
        view.renderer
            .render(&snapshot.labels, &inner.places, &snapshot.series_by_place);
        view.applied_seq = seq;
        view.source = Some(fetched.source);
        view.last_updated_utc = Some(snapshot.last_updated_utc);
        view.refresh_count += 1;
        if view.last_refresh.is_none_or(|last| finished > last) {
            view.last_refresh = Some(finished);
        }

        info!(
            source = ?fetched.source,
            labels = snapshot.labels.len(),
            refreshes = view.refresh_count,
            "dashboard refreshed"
        );
        RefreshOutcome {
            source: fetched.source,
            applied: true,
        }
    }

    /// Schedules the next refresh, replacing any pending one.
    pub async fn arm_next(&self) {
        let mut view = self.inner.view.lock().await;
        if self.is_disposed() {
            return;
        }

        let now = self.inner.clock.now();
        let delay = view.policy.delay_from(now);
        view.next_refresh = chrono::Duration::from_std(delay)
            .ok()
            .and_then(|delay| now.checked_add_signed(delay));

        self.inner.timer.arm(delay, self.clone().scheduled_refresh());
        info!(
            delay_ms = delay.as_millis() as u64,
            policy = view.policy.name(),
            next = ?view.next_refresh,
            "next refresh scheduled"
        );
    }

    fn scheduled_refresh(self) -> Task {
        Box::pin(async move {
            if self.is_disposed() {
                return;
            }
            debug!("scheduled refresh firing");
            self.refresh().await;
            self.arm_next().await;
        })
    }

    /// Handles a page visibility or focus report. Returns whether it refreshed.
    pub async fn on_visibility(&self, event: VisibilityEvent) -> bool {
        if self.is_disposed() {
            return false;
        }
        let now = self.inner.clock.now();
        let last_refresh = self.inner.view.lock().await.last_refresh;
        if !reconciler::should_refresh(now, self.inner.config.timezone, last_refresh) {
            debug!(?event, "visibility report, no catch-up needed");
            return false;
        }

        info!(?event, "page returned at a refresh mark, refreshing now");
        self.refresh().await;
        true
    }

    pub fn set_mock(&self, enabled: bool) {
        let previous = self.inner.mock_forced.swap(enabled, Ordering::SeqCst);
        if previous != enabled {
            info!(enabled, "mock data override changed");
        }
    }

    pub fn mock_forced(&self) -> bool {
        self.inner.mock_forced.load(Ordering::SeqCst)
    }

    /// Switches between fixed-interval and wall-clock scheduling, re-arming
    /// when the policy actually changes on a running dashboard.
    pub async fn set_dev_mode(&self, enabled: bool) {
        let policy = if enabled {
            RefreshPolicy::FixedInterval(self.inner.config.dev_interval)
        } else {
            RefreshPolicy::WallClock {
                timezone: self.inner.config.timezone,
            }
        };

        {
            let mut view = self.inner.view.lock().await;
            if view.policy == policy {
                return;
            }
            view.policy = policy;
        }
        info!(policy = policy.name(), "refresh policy changed");

        if self.inner.started.load(Ordering::SeqCst) {
            self.arm_next().await;
        }
    }

    pub async fn view(&self) -> DashboardView {
        let inner = &self.inner;
        let now = inner.clock.now();
        let view = inner.view.lock().await;
        let chart = view.renderer.chart();

        DashboardView {
            title: inner.config.title.clone(),
            mode: view.renderer.mode(),
            policy: view.policy.name(),
            timezone: inner.config.timezone.name().to_string(),
            now: now
                .with_timezone(&inner.config.timezone)
                .format("%A, %B %-d, %Y %-I:%M:%S %p %Z")
                .to_string(),
            status: StatusView::from_source(view.source),
            mock_forced: self.mock_forced(),
            last_refresh_at: view.last_refresh,
            next_refresh_at: view.next_refresh,
            countdown_secs: view
                .next_refresh
                .map(|next| (next - now).num_seconds().max(0)),
            last_updated_utc: view.last_updated_utc.clone(),
            refresh_count: view.refresh_count,
            total: chart.map_or(0, |chart| chart.totals().iter().sum()),
            chart: chart.cloned(),
            chart_svg: svg::render_chart(chart).unwrap_or_else(|err| {
                warn!(error = %err, "chart rendering failed");
                String::new()
            }),
        }
    }

    /// The current chart alone, as SVG.
    pub async fn chart_svg(&self) -> Result<String, RenderError> {
        svg::render_chart(self.inner.view.lock().await.renderer.chart())
    }
}
