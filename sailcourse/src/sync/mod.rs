//! Course synchronization.
//!
//! The [`SyncController`] applies every local edit to the shared session
//! immediately (optimistic, no rollback) and enqueues a coalescing sync
//! event; the [`NetworkSink`] drains those events into whole-course writes
//! against the course service. Inbound pushes from the duplex channel
//! replace courses wholesale and upsert peer locations.
//!
//! Edits are never field patches on the wire. Each drained event resolves
//! to the current full course from the session, so rapid edits collapse
//! into one `PUT` carrying the latest state.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::geo::LatLon;
use crate::layout;
use crate::model::{Course, Location, Mark};
use crate::queue::{CoalescingQueue, EventSink, QueueConfig, QueueHandle};

pub mod events;
pub mod http;
pub mod socket;

pub use events::{SyncEvent, SyncEventTag};
pub use http::{ApiError, CourseApi, ReqwestCourseApi};
pub use socket::{Command, CommandSender, PushMessage, SocketClient, SocketError};

/// Mutable session state shared between the controller and the drain sink.
#[derive(Debug)]
pub struct Session {
    /// Opaque id identifying this client to the service.
    pub session_id: String,
    /// Courses known locally. Local edits land here before the network
    /// write; remote pushes replace entries wholesale.
    pub courses: Vec<Course>,
    /// Latest reported peer positions, keyed by position id.
    pub locations: HashMap<String, Location>,
    /// Courses this session has joined on the duplex channel.
    pub joined_courses: HashSet<String>,
}

impl Session {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            courses: Vec::new(),
            locations: HashMap::new(),
            joined_courses: HashSet::new(),
        }
    }

    fn course_mut(&mut self, course_id: &str) -> Option<&mut Course> {
        self.courses.iter_mut().find(|c| c.id == course_id)
    }
}

/// Shared handle to the session.
pub type SharedSession = Arc<Mutex<Session>>;

/// Drain sink that turns coalesced events into course service writes.
///
/// Each event is resolved to the current full course in the session at
/// drain time, so a write always carries the latest local state. Failed
/// writes are logged and dropped; local state is never rolled back.
pub struct NetworkSink<A: CourseApi> {
    api: Arc<A>,
    session: SharedSession,
    activity_tx: watch::Sender<bool>,
}

impl<A: CourseApi> NetworkSink<A> {
    fn resolve(&self, event: &SyncEvent) -> Option<Course> {
        let session = self.session.lock();
        match event {
            SyncEvent::UpdateCourse(course) => Some(
                session
                    .courses
                    .iter()
                    .find(|c| c.id == course.id)
                    .cloned()
                    .unwrap_or_else(|| course.clone()),
            ),
            SyncEvent::MoveMark { course_id, .. } | SyncEvent::UpdateMarks { course_id, .. } => {
                session.courses.iter().find(|c| c.id == *course_id).cloned()
            }
        }
    }
}

impl<A: CourseApi> EventSink<SyncEvent> for NetworkSink<A> {
    fn pending_changed(&self, count: usize) {
        let _ = self.activity_tx.send(count > 0);
    }

    fn dispatch(&self, event: SyncEvent) {
        let Some(course) = self.resolve(&event) else {
            warn!("dropping sync event addressing an unknown course");
            return;
        };
        let api = Arc::clone(&self.api);
        tokio::spawn(async move {
            if let Err(error) = api.put_course(course).await {
                warn!(%error, "course write failed");
            }
        });
    }
}

/// Applies local edits and routes them to the network.
///
/// Every mutation takes effect in the shared session before the enqueue
/// returns; the eventual write happens on the queue's drain cadence.
pub struct SyncController<A: CourseApi, C: CommandSender> {
    api: Arc<A>,
    session: SharedSession,
    queue: QueueHandle<SyncEvent>,
    commands: C,
}

impl<A: CourseApi, C: CommandSender> SyncController<A, C> {
    /// Replaces (or inserts) a course locally and schedules a whole-course
    /// write. Used for metadata edits and mark add/delete.
    pub fn apply_local_edit(&self, course: Course) {
        {
            let mut session = self.session.lock();
            match session.course_mut(&course.id) {
                Some(existing) => *existing = course.clone(),
                None => session.courses.push(course.clone()),
            }
        }
        self.queue.enqueue(SyncEvent::UpdateCourse(course));
    }

    /// Adds a mark to a course.
    pub fn apply_mark_add(&self, course_id: &str, mark: Mark) {
        let updated = {
            let mut session = self.session.lock();
            let Some(course) = session.course_mut(course_id) else {
                warn!(course_id, "mark add for unknown course ignored");
                return;
            };
            course.marks.push(mark);
            course.clone()
        };
        self.queue.enqueue(SyncEvent::UpdateCourse(updated));
    }

    /// Deletes a mark from a course. Children of the deleted mark keep
    /// their stored positions and become effectively fixed.
    pub fn apply_mark_delete(&self, course_id: &str, mark_id: &str) {
        let updated = {
            let mut session = self.session.lock();
            let Some(course) = session.course_mut(course_id) else {
                warn!(course_id, "mark delete for unknown course ignored");
                return;
            };
            course.marks.retain(|m| m.id != mark_id);
            course.clone()
        };
        self.queue.enqueue(SyncEvent::UpdateCourse(updated));
    }

    /// Moves a mark to a new absolute position. Dragging a fixed mark
    /// translates its children rigidly along with it.
    ///
    /// Returns false if the course or mark is unknown.
    pub fn apply_mark_move(&self, course_id: &str, mark_id: &str, position: LatLon) -> bool {
        let moved = {
            let mut session = self.session.lock();
            let Some(course) = session.course_mut(course_id) else {
                return false;
            };
            layout::drag_mark(&mut course.marks, mark_id, position)
        };
        if moved {
            self.queue.enqueue(SyncEvent::MoveMark {
                course_id: course_id.to_string(),
                mark_id: mark_id.to_string(),
                position,
            });
        }
        moved
    }

    /// Changes a course's wind direction, rotating every relative mark
    /// around its parent by the delta. A zero delta is a no-op and
    /// schedules nothing.
    pub fn apply_wind_change(&self, course_id: &str, new_wind: f64) {
        let updated = {
            let mut session = self.session.lock();
            let Some(course) = session.course_mut(course_id) else {
                warn!(course_id, "wind change for unknown course ignored");
                return;
            };
            let delta = new_wind - course.wind;
            if delta == 0.0 {
                return;
            }
            layout::rotate_relative_marks(&mut course.marks, delta);
            course.wind = new_wind;
            course.clone()
        };
        self.queue.enqueue(SyncEvent::UpdateMarks {
            course_id: updated.id.clone(),
            marks: updated.marks.clone(),
            wind: updated.wind,
        });
    }

    /// Applies a remote course push. Only known courses are replaced;
    /// pushes for courses this session never loaded are ignored. The
    /// local modification stamp is refreshed so the push wins any
    /// staleness comparison.
    pub fn apply_remote_push(&self, mut course: Course) {
        let mut session = self.session.lock();
        match session.course_mut(&course.id) {
            Some(existing) => {
                course.last_modified = Utc::now();
                *existing = course;
            }
            None => {
                debug!(course_id = %course.id, "push for unknown course ignored");
            }
        }
    }

    /// Routes one inbound push message.
    pub fn handle_push(&self, push: PushMessage) {
        match push {
            PushMessage::Position {
                position_id,
                name,
                velocity,
                heading,
                latitude,
                longitude,
            } => {
                let location = Location {
                    name,
                    velocity,
                    heading,
                    coordinate: LatLon::new(latitude, longitude),
                };
                self.session.lock().locations.insert(position_id, location);
            }
            PushMessage::Course { course } => self.apply_remote_push(course),
            PushMessage::Unknown => {
                debug!("ignoring unknown push command");
            }
        }
    }

    /// Joins a course's live update feed.
    pub fn join_course(&self, course_id: &str) {
        let session_id = {
            let mut session = self.session.lock();
            session.joined_courses.insert(course_id.to_string());
            session.session_id.clone()
        };
        self.commands.send(Command::Join {
            session_id,
            course_id: course_id.to_string(),
        });
    }

    /// Leaves a course's live update feed.
    pub fn leave_course(&self, course_id: &str) {
        let session_id = {
            let mut session = self.session.lock();
            session.joined_courses.remove(course_id);
            session.session_id.clone()
        };
        self.commands.send(Command::Leave {
            session_id,
            course_id: course_id.to_string(),
        });
    }

    /// Broadcasts this client's own position.
    pub fn send_position(&self, name: &str, velocity: f64, heading: f64, position: LatLon) {
        let session_id = self.session.lock().session_id.clone();
        self.commands.send(Command::Position {
            session_id,
            name: name.to_string(),
            velocity,
            heading,
            latitude: position.lat,
            longitude: position.lon,
        });
    }

    /// Replaces the local course list with the club's current courses.
    pub async fn refresh_courses(&self, club_id: &str) -> Result<(), ApiError> {
        let courses = self.api.courses_for_club(club_id.to_string()).await?;
        info!(club_id, count = courses.len(), "loaded club courses");
        self.session.lock().courses = courses;
        Ok(())
    }

    /// Creates a course on the service and stores the returned copy.
    pub async fn create_course(&self, course: Course) -> Result<Course, ApiError> {
        let created = self.api.post_course(course).await?;
        self.session.lock().courses.push(created.clone());
        Ok(created)
    }

    /// Deletes a course remotely and locally.
    pub async fn delete_course(&self, course_id: &str) -> Result<(), ApiError> {
        self.api.delete_course(course_id.to_string()).await?;
        let mut session = self.session.lock();
        session.courses.retain(|c| c.id != course_id);
        session.joined_courses.remove(course_id);
        Ok(())
    }

    /// Snapshot of a course by id.
    pub fn course(&self, course_id: &str) -> Option<Course> {
        self.session
            .lock()
            .courses
            .iter()
            .find(|c| c.id == course_id)
            .cloned()
    }

    /// Snapshot of all known courses.
    pub fn courses(&self) -> Vec<Course> {
        self.session.lock().courses.clone()
    }

    /// Snapshot of the latest peer locations.
    pub fn locations(&self) -> HashMap<String, Location> {
        self.session.lock().locations.clone()
    }

    /// The shared session handle, for wiring additional observers.
    pub fn session(&self) -> SharedSession {
        Arc::clone(&self.session)
    }
}

/// Wires the controller, sink and queue together and spawns the drain
/// loop. The returned watch receiver reports whether any writes are
/// pending, suitable for a network-activity indicator.
pub fn start_sync<A: CourseApi, C: CommandSender>(
    session_id: impl Into<String>,
    api: Arc<A>,
    commands: C,
    config: QueueConfig,
    shutdown: CancellationToken,
) -> (SyncController<A, C>, watch::Receiver<bool>) {
    let session: SharedSession = Arc::new(Mutex::new(Session::new(session_id)));
    let (activity_tx, activity_rx) = watch::channel(false);

    let sink = Arc::new(NetworkSink {
        api: Arc::clone(&api),
        session: Arc::clone(&session),
        activity_tx,
    });
    let (queue, handle) = CoalescingQueue::new(config, sink);
    tokio::spawn(queue.run(shutdown));

    let controller = SyncController {
        api,
        session,
        queue: handle,
        commands,
    };
    (controller, activity_rx)
}
