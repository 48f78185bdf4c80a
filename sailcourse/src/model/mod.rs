//! Course, mark and peer-location data model.
//!
//! Wire shapes match the course service JSON exactly: marks are flat
//! (`latitude`/`longitude`, `type`, `parent`) and courses carry `wind`,
//! `clubID` and an ISO-8601 `lastModified`. Internally marks hold a
//! [`LatLon`] so the geometry code never touches raw field pairs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::LatLon;

/// Whether a mark is positioned absolutely or relative to a parent mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkKind {
    /// Positioned directly; does not move when the wind direction changes.
    Fixed,
    /// Defined as a polar offset from a parent mark; rotated around the
    /// parent when the wind direction changes.
    Relative,
}

/// A navigational mark on a racecourse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "MarkWire", into = "MarkWire")]
pub struct Mark {
    /// Unique within its course.
    pub id: String,
    pub kind: MarkKind,
    pub name: String,
    /// Stored absolute position. For `Relative` marks this is a cache of
    /// the implicit polar offset from the parent; wind changes rewrite it.
    pub position: LatLon,
    /// Id of the parent mark; empty means none.
    pub parent_id: String,
}

impl Mark {
    /// Returns true if the mark declares a parent.
    pub fn has_parent(&self) -> bool {
        !self.parent_id.is_empty()
    }
}

/// Flat wire representation of a mark.
#[derive(Serialize, Deserialize)]
struct MarkWire {
    #[serde(default)]
    id: String,
    #[serde(rename = "type")]
    kind: MarkKind,
    #[serde(default)]
    name: String,
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    parent: String,
}

impl From<MarkWire> for Mark {
    fn from(w: MarkWire) -> Self {
        Mark {
            id: w.id,
            kind: w.kind,
            name: w.name,
            position: LatLon::new(w.latitude, w.longitude),
            parent_id: w.parent,
        }
    }
}

impl From<Mark> for MarkWire {
    fn from(m: Mark) -> Self {
        MarkWire {
            id: m.id,
            kind: m.kind,
            name: m.name,
            latitude: m.position.lat,
            longitude: m.position.lon,
            parent: m.parent_id,
        }
    }
}

/// A racecourse: a named, ordered set of marks plus the wind direction the
/// layout was built against.
///
/// Mutations crossing the sync boundary are always whole-course
/// replacements, never field patches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub name: String,
    /// Wind direction in degrees, `[0, 360)`.
    pub wind: f64,
    #[serde(rename = "clubID")]
    pub club_id: String,
    pub marks: Vec<Mark>,
    #[serde(rename = "lastModified")]
    pub last_modified: DateTime<Utc>,
}

impl Course {
    /// Looks up a mark by id.
    pub fn mark(&self, mark_id: &str) -> Option<&Mark> {
        self.marks.iter().find(|m| m.id == mark_id)
    }

    /// Looks up a mark by id, mutably.
    pub fn mark_mut(&mut self, mark_id: &str) -> Option<&mut Mark> {
        self.marks.iter_mut().find(|m| m.id == mark_id)
    }

    /// Resolves a mark's parent. "Parent not found" is a normal outcome:
    /// derivation for such marks is skipped and the stored position stands.
    pub fn parent_of(&self, mark: &Mark) -> Option<&Mark> {
        if !mark.has_parent() {
            return None;
        }
        self.marks.iter().find(|m| m.id == mark.parent_id)
    }
}

/// A remote peer's reported position. Ephemeral; replaced wholesale on
/// every inbound push and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    /// Speed over ground in knots.
    pub velocity: f64,
    /// Heading in degrees.
    pub heading: f64,
    pub coordinate: LatLon,
}

/// Application-level error body returned by the course service on a 2xx
/// transport status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: bool,
    #[serde(default)]
    pub reason: String,
}
