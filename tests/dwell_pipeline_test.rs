//! End-to-end tests for the gaze typing pipeline: detections in, commits out.

use gazetype::config::Config;
use gazetype::events::{EventSender, GazeEvent};
use gazetype::feed::{self, FeedError};
use gazetype::{
    Action, CalibrationPhase, DetectionBatch, GazeTyper, HitTester, InteractiveTarget, Point, Rect,
    SurfaceGeometry,
};
use std::io::Cursor;
use std::time::{Duration, Instant};

/// Model, render and target space all 384x384, so coordinates pass through.
fn identity_config() -> Config {
    let mut config = Config::default();
    config.calibration.enabled = false;
    config.surface.render_width = 384.0;
    config.surface.render_height = 384.0;
    config.surface.placement = Rect::new(0.0, 0.0, 384.0, 384.0);
    config
}

fn targets() -> Vec<InteractiveTarget> {
    vec![
        InteractiveTarget::new("a", "A", Action::AppendChar { ch: 'A' }, Rect::new(100.0, 100.0, 20.0, 20.0)),
        InteractiveTarget::new("b", "B", Action::AppendChar { ch: 'B' }, Rect::new(200.0, 100.0, 20.0, 20.0)),
        InteractiveTarget::new("del", "Del", Action::DeleteLast, Rect::new(300.0, 100.0, 20.0, 20.0)),
    ]
}

/// One confident detection centered on (x, y).
fn gaze_at(x: f32, y: f32) -> DetectionBatch {
    DetectionBatch::new(vec![x - 5.0, y - 5.0, 10.0, 10.0, 0.9, 0.0], 6).unwrap()
}

fn ms(t0: Instant, ms: u64) -> Instant {
    t0 + Duration::from_millis(ms)
}

fn typer(config: &Config, targets: &[InteractiveTarget]) -> GazeTyper {
    GazeTyper::from_config(config, targets, EventSender::disconnected())
}

#[test]
fn test_single_detection_commits_after_dwell() {
    let config = identity_config();
    let surface = config.surface.geometry();
    let targets = targets();
    let mut typer = typer(&config, &targets);
    let t0 = Instant::now();

    let batch = DetectionBatch::new(vec![100.0, 100.0, 10.0, 10.0, 0.5, 0.0], 6).unwrap();
    let report = typer.process_frame(&batch, &surface, &targets, t0);
    let gaze = report.gaze.unwrap();
    assert!((gaze.x - 105.0).abs() < 1e-4);
    assert!((gaze.y - 105.0).abs() < 1e-4);
    assert_eq!(report.hit.as_deref(), Some("a"));

    let report = typer.process_frame(&batch, &surface, &targets, ms(t0, 1999));
    assert!(report.commits.is_empty());

    let report = typer.process_frame(&batch, &surface, &targets, ms(t0, 2000));
    assert_eq!(report.commits.len(), 1);
    assert_eq!(report.commits[0].target_id, "a");
    assert_eq!(typer.buffer().as_str(), "A");
}

#[test]
fn test_timer_commits_without_new_frames() {
    let config = identity_config();
    let surface = config.surface.geometry();
    let targets = targets();
    let mut typer = typer(&config, &targets);
    let t0 = Instant::now();

    typer.process_frame(&gaze_at(110.0, 110.0), &surface, &targets, t0);
    assert_eq!(typer.next_deadline(), Some(ms(t0, 2000)));
    assert!(typer.poll(ms(t0, 1000)).commits.is_empty());

    let report = typer.poll(ms(t0, 2000));
    assert_eq!(report.commits.len(), 1);
    assert!(typer.dwell().is_idle());
    assert_eq!(typer.next_deadline(), None);
}

#[test]
fn test_empty_batch_forces_idle() {
    let config = identity_config();
    let surface = config.surface.geometry();
    let targets = targets();
    let mut typer = typer(&config, &targets);
    let t0 = Instant::now();

    typer.process_frame(&gaze_at(110.0, 110.0), &surface, &targets, t0);
    assert!(!typer.dwell().is_idle());

    let report = typer.process_frame(&DetectionBatch::empty(), &surface, &targets, ms(t0, 1500));
    assert_eq!(report.gaze, None);
    assert!(typer.dwell().is_idle());
    assert!(typer.poll(ms(t0, 5000)).commits.is_empty());
    assert_eq!(typer.buffer().as_str(), "");
}

#[test]
fn test_low_confidence_is_no_signal() {
    let config = identity_config();
    let surface = config.surface.geometry();
    let targets = targets();
    let mut typer = typer(&config, &targets);
    let t0 = Instant::now();

    typer.process_frame(&gaze_at(110.0, 110.0), &surface, &targets, t0);
    let faint = DetectionBatch::new(vec![105.0, 105.0, 10.0, 10.0, 0.1, 0.0], 6).unwrap();
    let report = typer.process_frame(&faint, &surface, &targets, ms(t0, 100));
    assert_eq!(report.gaze, None);
    assert!(typer.dwell().is_idle());
}

#[test]
fn test_switching_targets_drops_stale_commit() {
    let config = identity_config();
    let surface = config.surface.geometry();
    let targets = targets();
    let mut typer = typer(&config, &targets);
    let t0 = Instant::now();

    typer.process_frame(&gaze_at(110.0, 110.0), &surface, &targets, t0);
    typer.process_frame(&gaze_at(210.0, 110.0), &surface, &targets, ms(t0, 1500));

    // A's original deadline passes without a commit
    let report = typer.process_frame(&gaze_at(210.0, 110.0), &surface, &targets, ms(t0, 2000));
    assert!(report.commits.is_empty());
    let report = typer.process_frame(&gaze_at(210.0, 110.0), &surface, &targets, ms(t0, 3499));
    assert!(report.commits.is_empty());

    let report = typer.process_frame(&gaze_at(210.0, 110.0), &surface, &targets, ms(t0, 3500));
    let ids: Vec<&str> = report.commits.iter().map(|c| c.target_id.as_str()).collect();
    assert_eq!(ids, vec!["b"]);
    assert_eq!(typer.buffer().as_str(), "B");
}

#[test]
fn test_gap_between_keys_cancels() {
    let config = identity_config();
    let surface = config.surface.geometry();
    let targets = targets();
    let mut typer = typer(&config, &targets);
    let t0 = Instant::now();

    typer.process_frame(&gaze_at(110.0, 110.0), &surface, &targets, t0);
    let report = typer.process_frame(&gaze_at(160.0, 110.0), &surface, &targets, ms(t0, 100));
    assert!(report.gaze.is_some());
    assert_eq!(report.hit, None);
    assert!(typer.dwell().is_idle());
}

#[test]
fn test_hidden_target_never_hit() {
    let config = identity_config();
    let surface = config.surface.geometry();
    let mut targets = targets();
    targets[0].visible = false;
    let mut typer = typer(&config, &targets);
    let t0 = Instant::now();

    let report = typer.process_frame(&gaze_at(110.0, 110.0), &surface, &targets, t0);
    assert_eq!(report.hit, None);
    assert!(typer.dwell().is_idle());
}

#[test]
fn test_delete_on_empty_buffer() {
    let config = identity_config();
    let surface = config.surface.geometry();
    let targets = targets();
    let mut typer = typer(&config, &targets);
    let t0 = Instant::now();

    typer.process_frame(&gaze_at(310.0, 110.0), &surface, &targets, t0);
    let report = typer.process_frame(&gaze_at(310.0, 110.0), &surface, &targets, ms(t0, 2000));
    assert_eq!(report.commits.len(), 1);
    assert_eq!(report.commits[0].buffer, "");
}

#[test]
fn test_event_order() {
    let config = identity_config();
    let surface = config.surface.geometry();
    let targets = targets();
    let (tx, rx) = flume::unbounded();
    let mut typer = GazeTyper::from_config(&config, &targets, EventSender::new(tx));
    let t0 = Instant::now();

    typer.process_frame(&gaze_at(110.0, 110.0), &surface, &targets, t0);
    typer.process_frame(&gaze_at(110.0, 110.0), &surface, &targets, ms(t0, 2000));

    let events: Vec<GazeEvent> = rx.try_iter().collect();
    let kinds: Vec<&str> = events
        .iter()
        .map(|e| match e {
            GazeEvent::Cursor { .. } => "cursor",
            GazeEvent::HoverEntered { .. } => "entered",
            GazeEvent::HoverLeft { .. } => "left",
            GazeEvent::Committed(_) => "committed",
            GazeEvent::Calibration { .. } => "calibration",
        })
        .collect();
    assert_eq!(
        kinds,
        vec!["calibration", "cursor", "entered", "cursor", "committed", "left", "entered"]
    );
}

#[test]
fn test_calibration_gates_typing() {
    let mut config = identity_config();
    config.calibration.enabled = true;
    let surface = config.surface.geometry();
    let mut targets = targets();
    targets.push(InteractiveTarget::new(
        "g",
        "G",
        Action::AppendChar { ch: 'G' },
        Rect::new(0.0, 0.0, 50.0, 50.0),
    ));
    let mut typer = typer(&config, &targets);
    let t0 = Instant::now();

    assert!(typer.begin_calibration());
    assert_eq!(typer.calibration().phase(), CalibrationPhase::AwaitingManualTrigger);

    // No timeout while waiting for the operator
    let report = typer.process_frame(&gaze_at(110.0, 110.0), &surface, &targets, ms(t0, 60_000));
    assert_eq!(report.gaze, None);

    assert!(typer.trigger_calibration(ms(t0, 60_000)));
    assert_eq!(typer.calibration().phase(), CalibrationPhase::Dwelling);
    assert_eq!(typer.next_deadline(), Some(ms(t0, 62_000)));

    let report = typer.poll(ms(t0, 62_000));
    assert!(report.calibrated);
    assert!(typer.is_ready());
    // The anchor is a no-op target
    assert_eq!(typer.buffer().as_str(), "");
    assert_eq!(typer.calibration().anchor().rect, Rect::new(0.0, 0.0, 50.0, 50.0));

    typer.process_frame(&gaze_at(110.0, 110.0), &surface, &targets, ms(t0, 63_000));
    typer.process_frame(&gaze_at(110.0, 110.0), &surface, &targets, ms(t0, 65_000));
    assert_eq!(typer.buffer().as_str(), "A");
}

#[test]
fn test_independent_instances() {
    let config = identity_config();
    let surface = config.surface.geometry();
    let targets = targets();
    let mut first = typer(&config, &targets);
    let mut second = typer(&config, &targets);
    let t0 = Instant::now();

    first.process_frame(&gaze_at(110.0, 110.0), &surface, &targets, t0);
    second.process_frame(&gaze_at(210.0, 110.0), &surface, &targets, t0);
    first.poll(ms(t0, 2000));
    second.poll(ms(t0, 2000));
    assert_eq!(first.buffer().as_str(), "A");
    assert_eq!(second.buffer().as_str(), "B");
}

#[test]
fn test_surface_placement_offset() {
    let mut config = identity_config();
    config.surface.placement = Rect::new(100.0, 100.0, 192.0, 192.0);
    let surface: SurfaceGeometry = config.surface.geometry();
    let targets = targets();
    let mut typer = typer(&config, &targets);

    // Model (20, 20) -> render (20, 20) -> target (110, 110)
    let report = typer.process_frame(&gaze_at(20.0, 20.0), &surface, &targets, Instant::now());
    assert_eq!(report.hit.as_deref(), Some("a"));
}

const FEED: &str = r#"
# operator confirms at t=0, anchor dwell completes at t=2000
{"t_ms":0,"trigger":true}
{"t_ms":2500,"data":[205,75,10,10,0.9,0],"shape":[1,1,6]}
{"t_ms":3500,"data":[205,75,10,10,0.9,0],"shape":[1,1,6]}
{"t_ms":4500,"data":[205,75,10,10,0.9,0],"shape":[1,1,6]}
{"t_ms":4600,"press":"key-I"}
{"t_ms":4700,"data":[],"shape":[1,0,6]}
"#;

#[test]
fn test_replay_default_keyboard() {
    // Model (210, 80) on a 640x480 render lands on key H at (350, 100)
    let config = Config::default();
    let targets = config.keyboard.build_targets();
    let mut typer = typer(&config, &targets);

    let summary = feed::replay(
        Cursor::new(FEED),
        &mut typer,
        &config.surface.geometry(),
        &targets,
        config.detection.default_stride,
        Instant::now(),
    )
    .unwrap();

    assert!(summary.calibrated);
    assert_eq!(summary.frames, 4);
    let ids: Vec<&str> = summary.commits.iter().map(|c| c.target_id.as_str()).collect();
    assert_eq!(ids, vec!["key-H", "key-I"]);
    assert_eq!(summary.buffer, "HI");
    assert!(typer.dwell().is_idle());
}

#[test]
fn test_replay_reports_bad_line() {
    let config = identity_config();
    let targets = targets();
    let mut typer = typer(&config, &targets);

    let err = feed::replay(
        Cursor::new("{\"t_ms\":0,\"data\":[]}\n{oops\n"),
        &mut typer,
        &config.surface.geometry(),
        &targets,
        6,
        Instant::now(),
    )
    .unwrap_err();
    assert!(matches!(err, FeedError::Parse { line: 2, .. }));
}

#[test]
fn test_replay_timestamps_relative_to_first_record() {
    let config = identity_config();
    let targets = targets();
    let mut typer = typer(&config, &targets);
    let feed = "{\"t_ms\":10000,\"data\":[105,105,10,10,0.9,0]}\n\
                {\"t_ms\":11999,\"data\":[105,105,10,10,0.9,0]}\n";

    let start = Instant::now();
    let summary = feed::replay(
        Cursor::new(feed),
        &mut typer,
        &config.surface.geometry(),
        &targets,
        6,
        start,
    )
    .unwrap();
    assert!(summary.commits.is_empty());
    assert_eq!(typer.dwell().session().unwrap().started_at, start);
    assert_eq!(typer.next_deadline(), Some(ms(start, 2000)));
}

/// Buckets targets into fixed-width columns before scanning, keeping list
/// order inside the bucket.
struct ColumnIndex {
    column_width: f32,
}

impl HitTester for ColumnIndex {
    fn hit<'a>(&self, point: Point, targets: &'a [InteractiveTarget]) -> Option<&'a InteractiveTarget> {
        let column = (point.x / self.column_width).floor();
        targets.iter().find(|t| {
            let first = (t.rect.x / self.column_width).floor();
            let last = (t.rect.right() / self.column_width).floor();
            t.visible && column >= first && column <= last && t.rect.contains(point)
        })
    }
}

#[test]
fn test_custom_hit_tester() {
    let config = identity_config();
    let surface = config.surface.geometry();
    // "a" and "b" share the edge x = 120
    let targets = vec![
        InteractiveTarget::new("a", "A", Action::AppendChar { ch: 'A' }, Rect::new(100.0, 100.0, 20.0, 20.0)),
        InteractiveTarget::new("b", "B", Action::AppendChar { ch: 'B' }, Rect::new(120.0, 100.0, 20.0, 20.0)),
    ];
    let mut typer = typer(&config, &targets).with_hit_tester(ColumnIndex { column_width: 50.0 });
    let t0 = Instant::now();

    let report = typer.process_frame(&gaze_at(120.0, 110.0), &surface, &targets, t0);
    assert_eq!(report.hit.as_deref(), Some("a"));
    let report = typer.process_frame(&gaze_at(130.0, 110.0), &surface, &targets, ms(t0, 100));
    assert_eq!(report.hit.as_deref(), Some("b"));

    let report = typer.process_frame(&gaze_at(130.0, 110.0), &surface, &targets, ms(t0, 2100));
    assert_eq!(report.commits.len(), 1);
    assert_eq!(typer.buffer().as_str(), "B");
}
