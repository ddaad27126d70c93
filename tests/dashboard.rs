use axum::{Json, Router, routing::get};
use chrono::{DateTime, TimeZone, Utc};
use occupancy_dashboard::{
    Config, Dashboard,
    chart::RenderMode,
    clock::ManualClock,
    config::PlaceConfig,
    models::{DataSource, VisibilityEvent},
    timer::{ManualTimer, Timer},
};
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

struct Harness {
    dashboard: Dashboard,
    timer: Arc<ManualTimer>,
    clock: Arc<ManualClock>,
}

fn chicago(hour: u32, minute: u32, second: u32) -> DateTime<Utc> {
    chrono_tz::America::Chicago
        .with_ymd_and_hms(2026, 1, 5, hour, minute, second)
        .unwrap()
        .with_timezone(&Utc)
}

fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}/api/hourly_breakdown")
}

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    format!("http://{addr}/api/hourly_breakdown")
}

/// Upstream returning one count per area, counting how often it is polled.
async fn upstream(hits: Arc<AtomicUsize>) -> String {
    let app = Router::new().route(
        "/api/hourly_breakdown",
        get(move || {
            let hits = Arc::clone(&hits);
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
                Json(json!({
                    "labels": ["Main Gym", "Track"],
                    "places": ["Main Gym", "Track"],
                    "seriesByPlace": {"Main Gym": [21], "Track": [4]},
                    "last_updated_utc": "2026-01-05T14:00:00"
                }))
            }
        }),
    );
    serve(app).await
}

fn harness(config: Config, now: DateTime<Utc>) -> Harness {
    let timer = Arc::new(ManualTimer::new());
    let clock = Arc::new(ManualClock::new(now));
    let dashboard = Dashboard::create(config, timer.clone(), clock.clone()).unwrap();
    Harness {
        dashboard,
        timer,
        clock,
    }
}

fn config(api_url: String) -> Config {
    Config {
        api_url,
        places: vec![
            PlaceConfig::new("Main Gym", 1, 30),
            PlaceConfig::new("Track", 0, 10),
        ],
        ..Config::default()
    }
}

#[tokio::test]
async fn start_renders_and_arms_to_the_next_mark() {
    let hits = Arc::new(AtomicUsize::new(0));
    let h = harness(config(upstream(hits.clone()).await), chicago(14, 7, 0));

    h.dashboard.start().await;

    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(h.timer.pending(), 1);
    assert_eq!(h.timer.pending_delay(), Some(Duration::from_secs(8 * 60)));

    let view = h.dashboard.view().await;
    assert_eq!(view.status.kind, "live");
    assert_eq!(view.next_refresh_at, Some(chicago(14, 15, 0)));
    assert_eq!(view.countdown_secs, Some(480));
    let chart = view.chart.expect("chart rendered");
    assert_eq!(chart.labels, vec!["Main Gym", "Track"]);
    assert_eq!(chart.datasets[0].data, vec![21, 4]);
    assert_eq!(view.total, 25);
}

#[tokio::test]
async fn scheduled_refreshes_keep_exactly_one_timer() {
    let hits = Arc::new(AtomicUsize::new(0));
    let h = harness(config(upstream(hits.clone()).await), chicago(14, 7, 0));
    h.dashboard.start().await;

    for round in 1..=5u64 {
        let delay = h.timer.pending_delay().expect("armed");
        let task = h.timer.fire().expect("armed task");
        assert_eq!(h.timer.pending(), 0);

        h.clock.advance(delay);
        task.await;

        assert_eq!(h.timer.pending(), 1, "round {round}");
        assert_eq!(h.timer.pending_delay(), Some(Duration::from_secs(15 * 60)));
        assert_eq!(h.dashboard.view().await.refresh_count, round + 1);
    }

    assert_eq!(hits.load(Ordering::SeqCst), 6);
    let view = h.dashboard.view().await;
    assert_eq!(view.chart.map(|chart| chart.datasets.len()), Some(1));
    assert_eq!(view.next_refresh_at, Some(chicago(15, 30, 0)));
}

#[tokio::test]
async fn failed_fetch_rearms_on_schedule() {
    let h = harness(config(closed_port_url()), chicago(9, 0, 30));
    h.dashboard.start().await;

    let view = h.dashboard.view().await;
    assert_eq!(view.status.kind, "mock");
    assert_eq!(
        h.timer.pending_delay(),
        Some(Duration::from_secs(14 * 60 + 30))
    );

    let task = h.timer.fire().unwrap();
    h.clock.set(chicago(9, 15, 0));
    task.await;
    assert_eq!(h.timer.pending_delay(), Some(Duration::from_secs(15 * 60)));
    assert_eq!(h.timer.armed_delays().len(), 2);
}

#[tokio::test]
async fn forced_mock_skips_the_network() {
    let hits = Arc::new(AtomicUsize::new(0));
    let mut cfg = config(upstream(hits.clone()).await);
    cfg.force_mock = true;
    let h = harness(cfg, chicago(10, 20, 0));

    let outcome = h.dashboard.refresh().await;
    assert_eq!(outcome.source, DataSource::Mock);
    assert!(outcome.applied);
    assert_eq!(hits.load(Ordering::SeqCst), 0);

    let chart = h.dashboard.view().await.chart.unwrap();
    assert_eq!(chart.labels, vec!["06:00", "07:00", "08:00", "09:00", "10:00"]);

    h.dashboard.set_mock(false);
    assert_eq!(h.dashboard.refresh().await.source, DataSource::Live);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn stacked_mode_renders_configured_places() {
    let hits = Arc::new(AtomicUsize::new(0));
    let mut cfg = config(upstream(hits).await);
    cfg.mode = RenderMode::Stacked;
    cfg.places.push(PlaceConfig::new("Lobby", 0, 5));
    let h = harness(cfg, chicago(14, 7, 0));

    h.dashboard.refresh().await;
    let chart = h.dashboard.view().await.chart.unwrap();
    let names: Vec<&str> = chart.datasets.iter().map(|d| d.label.as_str()).collect();
    assert_eq!(names, vec!["Main Gym", "Track", "Lobby"]);
    assert_eq!(chart.footers, vec!["Total: 21", "Total: 4"]);
}

#[tokio::test]
async fn visibility_catch_up_respects_the_elapsed_threshold() {
    let hits = Arc::new(AtomicUsize::new(0));
    let h = harness(config(upstream(hits.clone()).await), chicago(14, 5, 0));
    h.dashboard.refresh().await;

    h.clock.set(chicago(14, 15, 0));
    assert!(!h.dashboard.on_visibility(VisibilityEvent::Visible).await);
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    h.clock.set(chicago(14, 5, 0) + chrono::Duration::seconds(14 * 60 + 30));
    assert!(!h.dashboard.on_visibility(VisibilityEvent::Focus).await);

    h.clock.set(chicago(14, 30, 2));
    assert!(h.dashboard.on_visibility(VisibilityEvent::Focus).await);
    assert_eq!(hits.load(Ordering::SeqCst), 2);
    assert_eq!(
        h.dashboard.view().await.last_refresh_at,
        Some(chicago(14, 30, 2))
    );
    assert_eq!(h.timer.pending(), 0);
}

#[tokio::test]
async fn dev_mode_switches_to_fixed_interval() {
    let hits = Arc::new(AtomicUsize::new(0));
    let mut cfg = config(upstream(hits).await);
    cfg.dev_interval = Duration::from_secs(30);
    let h = harness(cfg, chicago(14, 7, 0));
    h.dashboard.start().await;
    assert_eq!(h.timer.pending_delay(), Some(Duration::from_secs(8 * 60)));

    h.dashboard.set_dev_mode(true).await;
    assert_eq!(h.timer.pending(), 1);
    assert_eq!(h.timer.pending_delay(), Some(Duration::from_secs(30)));
    assert_eq!(h.dashboard.view().await.policy, "fixed_interval");

    h.dashboard.set_dev_mode(true).await;
    assert_eq!(h.timer.armed_delays().len(), 2);
}

#[tokio::test]
async fn dispose_cancels_and_blocks_rearming() {
    let hits = Arc::new(AtomicUsize::new(0));
    let h = harness(config(upstream(hits.clone()).await), chicago(14, 7, 0));
    h.dashboard.start().await;
    let task = h.timer.fire().unwrap();
    h.dashboard.arm_next().await;
    assert_eq!(h.timer.pending(), 1);

    h.dashboard.dispose().await;
    assert_eq!(h.timer.pending(), 0);
    assert!(h.dashboard.view().await.next_refresh_at.is_none());

    // A task that was already handed out by the timer neither polls nor re-arms.
    task.await;
    assert_eq!(h.timer.pending(), 0);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(h.dashboard.view().await.refresh_count, 1);
    assert!(!h.dashboard.on_visibility(VisibilityEvent::Visible).await);
}

#[tokio::test]
async fn dispose_racing_a_scheduled_round_leaves_no_timer() {
    let hits = Arc::new(AtomicUsize::new(0));
    let h = harness(config(upstream(hits).await), chicago(14, 7, 0));
    h.dashboard.start().await;

    let round = tokio::spawn(h.timer.fire().unwrap());
    let disposer = tokio::spawn({
        let dashboard = h.dashboard.clone();
        async move { dashboard.dispose().await }
    });
    round.await.unwrap();
    disposer.await.unwrap();

    assert!(h.dashboard.is_disposed());
    assert_eq!(h.timer.pending(), 0);
    assert!(h.dashboard.view().await.next_refresh_at.is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn arm_and_dispose_from_two_threads_never_leave_a_live_timer() {
    for _ in 0..50 {
        let h = harness(config(closed_port_url()), chicago(14, 7, 0));
        let armer = tokio::spawn({
            let dashboard = h.dashboard.clone();
            async move { dashboard.arm_next().await }
        });
        let disposer = tokio::spawn({
            let dashboard = h.dashboard.clone();
            async move { dashboard.dispose().await }
        });
        armer.await.unwrap();
        disposer.await.unwrap();

        assert_eq!(h.timer.pending(), 0);
        assert!(h.dashboard.view().await.next_refresh_at.is_none());
    }
}

#[tokio::test]
async fn slower_older_refresh_never_overwrites_a_newer_one() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    let app = Router::new().route(
        "/api/hourly_breakdown",
        get(move || {
            let counter = Arc::clone(&counter);
            async move {
                let first = counter.fetch_add(1, Ordering::SeqCst) == 0;
                if first {
                    tokio::time::sleep(Duration::from_millis(300)).await;
                }
                let count = if first { 1 } else { 2 };
                Json(json!({
                    "labels": ["06:00"],
                    "places": ["Track"],
                    "seriesByPlace": {"Track": [count]},
                    "last_updated_utc": "2026-01-05T12:00:00"
                }))
            }
        }),
    );
    let h = harness(config(serve(app).await), chicago(14, 5, 0));

    let older = tokio::spawn({
        let dashboard = h.dashboard.clone();
        async move { dashboard.refresh().await }
    });
    while hits.load(Ordering::SeqCst) == 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    h.clock.set(chicago(14, 6, 0));
    let newer = h.dashboard.refresh().await;
    assert!(newer.applied);

    let older = older.await.unwrap();
    assert_eq!(older.source, DataSource::Live);
    assert!(!older.applied);

    let view = h.dashboard.view().await;
    assert_eq!(view.chart.unwrap().datasets[0].data, vec![2]);
    assert_eq!(view.refresh_count, 1);
    assert_eq!(view.last_refresh_at, Some(chicago(14, 6, 0)));

    h.clock.set(chicago(14, 5, 30));
    assert!(h.dashboard.refresh().await.applied);
    assert_eq!(
        h.dashboard.view().await.last_refresh_at,
        Some(chicago(14, 6, 0))
    );
}

#[tokio::test]
async fn default_places_chart_every_backend_area() {
    let app = Router::new().route(
        "/api/hourly_breakdown",
        get(|| async {
            Json(json!({
                "labels": ["Main Gym", "Weight Room", "Multipurpose Gym", "Track",
                           "Aerobics Room", "Table Tennis", "Lobby"],
                "places": ["Main Gym", "Weight Room", "Multipurpose Gym", "Track",
                           "Aerobics Room", "Table Tennis", "Lobby"],
                "seriesByPlace": {
                    "Main Gym": [10], "Weight Room": [20], "Multipurpose Gym": [5],
                    "Track": [7], "Aerobics Room": [3], "Table Tennis": [2], "Lobby": [9]
                },
                "last_updated_utc": "2026-01-05T14:00:00"
            }))
        }),
    );
    let cfg = Config {
        api_url: serve(app).await,
        ..Config::default()
    };
    let h = harness(cfg, chicago(14, 7, 0));

    assert_eq!(h.dashboard.refresh().await.source, DataSource::Live);
    let view = h.dashboard.view().await;
    assert_eq!(view.status.kind, "live");
    assert_eq!(view.total, 56);
    let chart = view.chart.unwrap();
    assert_eq!(chart.datasets[0].data, vec![10, 20, 5, 7, 3, 2, 9]);
    assert_eq!(chart.x_title, "Area");
}

#[tokio::test]
async fn independent_dashboards_do_not_share_state() {
    let first = harness(config(closed_port_url()), chicago(14, 7, 0));
    let second = harness(config(closed_port_url()), chicago(14, 7, 0));

    first.dashboard.start().await;
    assert_eq!(first.timer.pending(), 1);
    assert_eq!(second.timer.pending(), 0);
    assert_eq!(second.dashboard.view().await.refresh_count, 0);
    assert_eq!(second.dashboard.view().await.status.kind, "pending");
}
