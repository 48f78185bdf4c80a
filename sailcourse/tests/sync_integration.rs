//! Integration tests for the sync pipeline.
//!
//! These tests verify the complete edit flow including:
//! - local edit → coalescing queue → whole-course PUT
//! - drag and wind-change geometry carried into the network write
//! - remote pushes landing in the shared session
//!
//! Run with: `cargo test --test sync_integration`

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use sailcourse::geo::{self, LatLon};
use sailcourse::model::{Course, Mark, MarkKind};
use sailcourse::queue::QueueConfig;
use sailcourse::sync::{
    start_sync, ApiError, Command, CommandSender, CourseApi, PushMessage, SyncController,
};

// ============================================================================
// Helper Functions
// ============================================================================

/// Course API double that records every PUT body.
#[derive(Default)]
struct RecordingApi {
    puts: Mutex<Vec<Course>>,
}

impl CourseApi for RecordingApi {
    fn courses_for_club(
        &self,
        _club_id: String,
    ) -> impl Future<Output = Result<Vec<Course>, ApiError>> + Send {
        async move { Ok(Vec::new()) }
    }

    fn put_course(&self, course: Course) -> impl Future<Output = Result<(), ApiError>> + Send {
        self.puts.lock().push(course);
        async move { Ok(()) }
    }

    fn post_course(&self, course: Course) -> impl Future<Output = Result<Course, ApiError>> + Send {
        async move { Ok(course) }
    }

    fn delete_course(
        &self,
        _course_id: String,
    ) -> impl Future<Output = Result<(), ApiError>> + Send {
        async move { Ok(()) }
    }
}

#[derive(Default)]
struct RecordingSender {
    sent: Mutex<Vec<Command>>,
}

impl CommandSender for RecordingSender {
    fn send(&self, command: Command) {
        self.sent.lock().push(command);
    }
}

fn mark(id: &str, kind: MarkKind, lat: f64, lon: f64, parent: &str) -> Mark {
    Mark {
        id: id.to_string(),
        kind,
        name: id.to_uppercase(),
        position: LatLon::new(lat, lon),
        parent_id: parent.to_string(),
    }
}

/// A windward-leeward course off the San Francisco city front.
fn cityfront_course() -> Course {
    let committee = mark("rc", MarkKind::Fixed, 37.8080, -122.4420, "");
    let windward = mark("w1", MarkKind::Relative, 37.8125, -122.4420, "rc");
    let leeward = mark("l1", MarkKind::Relative, 37.8070, -122.4420, "rc");
    Course {
        id: "cityfront".to_string(),
        name: "Cityfront Windward-Leeward".to_string(),
        wind: 0.0,
        club_id: "stfyc".to_string(),
        marks: vec![committee, windward, leeward],
        last_modified: Utc::now(),
    }
}

/// Opt into log output with e.g. `RUST_LOG=sailcourse=debug`.
fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

fn start() -> (
    Arc<RecordingApi>,
    SyncController<RecordingApi, Arc<RecordingSender>>,
    CancellationToken,
) {
    init_tracing();
    let api = Arc::new(RecordingApi::default());
    let shutdown = CancellationToken::new();
    let config = QueueConfig {
        drain_interval: Duration::from_millis(20),
    };
    let (controller, _activity) = start_sync(
        "it-session",
        Arc::clone(&api),
        Arc::new(RecordingSender::default()),
        config,
        shutdown.clone(),
    );
    (api, controller, shutdown)
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(60)).await;
}

// ============================================================================
// Integration Tests
// ============================================================================

/// An edit burst produces exactly one whole-course write with the final
/// state.
#[tokio::test]
async fn test_edit_burst_collapses_to_one_write() {
    let (api, controller, shutdown) = start();

    let mut course = cityfront_course();
    controller.apply_local_edit(course.clone());
    settle().await;
    api.puts.lock().clear();

    for step in 1..=5 {
        course.name = format!("Cityfront rev {}", step);
        controller.apply_local_edit(course.clone());
    }
    settle().await;

    let puts = api.puts.lock();
    assert_eq!(puts.len(), 1);
    assert_eq!(puts[0].name, "Cityfront rev 5");
    assert_eq!(puts[0].marks.len(), 3);

    shutdown.cancel();
}

/// Dragging the committee boat moves the whole course rigidly, and the
/// write carries the translated children.
#[tokio::test]
async fn test_committee_boat_drag_translates_the_course() {
    let (api, controller, shutdown) = start();
    controller.apply_local_edit(cityfront_course());
    settle().await;
    api.puts.lock().clear();

    let new_rc = LatLon::new(37.8100, -122.4500);
    assert!(controller.apply_mark_move("cityfront", "rc", new_rc));
    settle().await;

    let puts = api.puts.lock();
    assert_eq!(puts.len(), 1);
    let written = &puts[0];
    let rc = written.mark("rc").unwrap();
    let w1 = written.mark("w1").unwrap();
    assert_eq!(rc.position, new_rc);
    // Same delta applied to the child: +0.0020 lat, -0.0080 lon.
    assert!((w1.position.lat - 37.8145).abs() < 1e-9);
    assert!((w1.position.lon - (-122.4500)).abs() < 1e-9);

    shutdown.cancel();
}

/// A wind shift rotates the relative marks around the committee boat while
/// preserving their offset distances.
#[tokio::test]
async fn test_wind_shift_preserves_offsets() {
    let (_api, controller, shutdown) = start();
    let course = cityfront_course();
    let rc = course.mark("rc").unwrap().position;
    let before = geo::distance(rc, course.mark("w1").unwrap().position);
    controller.apply_local_edit(course);

    controller.apply_wind_change("cityfront", 25.0);

    let shifted = controller.course("cityfront").unwrap();
    assert_eq!(shifted.wind, 25.0);
    let after = geo::distance(rc, shifted.mark("w1").unwrap().position);
    assert!((before - after).abs() < 1.0, "offset drifted: {} -> {}", before, after);
    // The committee boat itself never moves on a wind change.
    assert_eq!(shifted.mark("rc").unwrap().position, rc);

    shutdown.cancel();
}

/// Remote pushes replace the local copy and refresh its modification
/// stamp; peer positions accumulate in the session.
#[tokio::test]
async fn test_remote_pushes_update_the_session() {
    let (_api, controller, shutdown) = start();
    controller.apply_local_edit(cityfront_course());

    let mut pushed = cityfront_course();
    pushed.wind = 210.0;
    controller.handle_push(PushMessage::Course { course: pushed });
    assert_eq!(controller.course("cityfront").unwrap().wind, 210.0);

    controller.handle_push(PushMessage::Position {
        position_id: "p1".to_string(),
        name: "Race Committee".to_string(),
        velocity: 0.0,
        heading: 0.0,
        latitude: 37.8080,
        longitude: -122.4420,
    });
    assert_eq!(controller.locations().len(), 1);

    shutdown.cancel();
}
