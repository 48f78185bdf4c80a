//! Course mutation events fed through the coalescing queue.

use crate::geo::LatLon;
use crate::model::{Course, Mark};
use crate::queue::Coalesce;

/// A locally originated course mutation awaiting network propagation.
///
/// Closed sum type; each variant carries everything the drain handler
/// needs to build the full-course write.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// Whole-course replacement (metadata edits, mark add/delete).
    UpdateCourse(Course),
    /// A single mark moved to a new absolute position.
    MoveMark {
        course_id: String,
        mark_id: String,
        position: LatLon,
    },
    /// The full mark set changed together (drag finished, wind rotated).
    UpdateMarks {
        course_id: String,
        marks: Vec<Mark>,
        wind: f64,
    },
}

/// Coalescing key. Deduplication is by tag alone: payloads for the same
/// tag collapse to the most recent one regardless of which course they
/// address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncEventTag {
    UpdateCourse,
    MoveMark,
    UpdateMarks,
}

impl Coalesce for SyncEvent {
    type Tag = SyncEventTag;

    fn tag(&self) -> SyncEventTag {
        match self {
            SyncEvent::UpdateCourse(_) => SyncEventTag::UpdateCourse,
            SyncEvent::MoveMark { .. } => SyncEventTag::MoveMark,
            SyncEvent::UpdateMarks { .. } => SyncEventTag::UpdateMarks,
        }
    }
}
