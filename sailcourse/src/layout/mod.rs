//! Wind-relative mark layout.
//!
//! Keeps mark absolute coordinates consistent with the declared
//! wind-relative layout and produces the leg-line geometry the map draws.
//! Marks whose parent cannot be resolved keep their last stored position;
//! derivation simply skips them.

use tracing::debug;

use crate::geo::{self, LatLon};
use crate::model::{Mark, MarkKind};
use crate::units::{round_significant, SailingUnit};

fn find_mark<'a>(marks: &'a [Mark], id: &str) -> Option<&'a Mark> {
    if id.is_empty() {
        return None;
    }
    marks.iter().find(|m| m.id == id)
}

/// Along-wind heading for the first leg segment: straight downwind when the
/// wind-relative bearing points behind the axis, otherwise straight upwind.
fn leg_heading(relative_bearing: f64, wind: f64) -> f64 {
    let normalized = geo::normalize_signed_180(relative_bearing);
    if normalized > -90 && normalized < 90 {
        wind
    } else {
        wind + 180.0
    }
}

/// Along-wind-axis component of a mark's offset from its parent.
///
/// Rotates the offset into wind-relative space and measures the latitude
/// component while pinning the parent longitude. Small-scale approximation,
/// fine at racecourse distances.
fn along_axis_distance(parent: LatLon, mark: LatLon, wind: f64) -> (f64, f64) {
    let d = geo::distance(parent, mark);
    let relative_bearing = geo::bearing(parent, mark) - wind;
    let rotated = geo::destination(parent, d, relative_bearing);
    let d1 = geo::distance(parent, LatLon::new(rotated.lat, parent.lon));
    (d1, relative_bearing)
}

/// Builds the two-segment leg polylines for every mark with a resolvable
/// parent: an along-wind leg from the parent, then a cross-wind leg to the
/// mark.
pub fn leg_lines(wind: f64, marks: &[Mark]) -> Vec<[LatLon; 2]> {
    let mut lines = Vec::new();
    for mark in marks {
        let Some(parent) = find_mark(marks, &mark.parent_id) else {
            continue;
        };
        let (d1, relative_bearing) = along_axis_distance(parent.position, mark.position, wind);
        let heading = leg_heading(relative_bearing, wind);
        let waypoint = geo::destination(parent.position, d1, heading);

        lines.push([parent.position, waypoint]);
        lines.push([waypoint, mark.position]);
    }
    lines
}

/// Rotates every `Relative` mark with a resolvable parent around that
/// parent by `delta_deg`, rewriting the stored absolute positions.
///
/// Callers fire this only when the wind actually changed (`delta != 0`).
/// Parents are resolved against the slice as it mutates, matching how the
/// layout has always behaved for chained relative marks.
pub fn rotate_relative_marks(marks: &mut [Mark], delta_deg: f64) {
    for i in 0..marks.len() {
        if marks[i].kind != MarkKind::Relative {
            continue;
        }
        let Some(parent_pos) = find_mark(marks, &marks[i].parent_id).map(|p| p.position) else {
            debug!(mark_id = %marks[i].id, "skipping rotation, parent not found");
            continue;
        };
        let d = geo::distance(parent_pos, marks[i].position);
        let angle = geo::bearing(parent_pos, marks[i].position) + delta_deg;
        marks[i].position = geo::destination(parent_pos, d, angle);
    }
}

/// Resolves a forward/port offset from a parent into an absolute position:
/// forward along the wind axis, then port perpendicular to it.
///
/// Both distances must already be in meters.
pub fn place_relative(parent: LatLon, wind: f64, forward_m: f64, port_m: f64) -> LatLon {
    let ahead = geo::destination(parent, forward_m, wind);
    geo::destination(ahead, port_m, wind - 90.0)
}

/// Inverse of [`place_relative`]: re-derives `(forward_m, port_m)` from a
/// mark's stored absolute position.
pub fn relative_offsets(parent: LatLon, mark: LatLon, wind: f64) -> (f64, f64) {
    let (forward, relative_bearing) = along_axis_distance(parent, mark, wind);
    let heading = leg_heading(relative_bearing, wind);
    let waypoint = geo::destination(parent, forward, heading);
    let port = geo::distance(waypoint, mark);
    (forward, port)
}

/// Moves a mark to a new absolute position.
///
/// Dragging a `Fixed` mark rigidly translates every mark parented to it by
/// the same `(Δlat, Δlon)`. Dragging a `Relative` mark moves only that
/// mark. Returns false when the mark id is unknown.
pub fn drag_mark(marks: &mut [Mark], mark_id: &str, new_pos: LatLon) -> bool {
    let Some(index) = marks.iter().position(|m| m.id == mark_id) else {
        return false;
    };
    let old_pos = marks[index].position;
    let d_lat = new_pos.lat - old_pos.lat;
    let d_lon = new_pos.lon - old_pos.lon;
    marks[index].position = new_pos;

    if marks[index].kind == MarkKind::Fixed {
        let dragged_id = marks[index].id.clone();
        for child in marks.iter_mut().filter(|m| m.parent_id == dragged_id) {
            child.position =
                LatLon::new(child.position.lat + d_lat, child.position.lon + d_lon);
        }
    }
    true
}

/// Wind-relative bearing from a mark's parent to `point`, normalized to an
/// integer in `[-180, 180)`. Zero when the parent cannot be resolved.
pub fn wind_relative_bearing(marks: &[Mark], parent_id: &str, wind: f64, point: LatLon) -> i32 {
    match find_mark(marks, parent_id) {
        Some(parent) => geo::normalize_signed_180(geo::bearing(parent.position, point) - wind),
        None => 0,
    }
}

/// Distance in meters from a mark's parent to `point`. Zero when the
/// parent cannot be resolved.
pub fn offset_distance(marks: &[Mark], parent_id: &str, point: LatLon) -> f64 {
    match find_mark(marks, parent_id) {
        Some(parent) => geo::distance(parent.position, point),
        None => 0.0,
    }
}

/// Human-readable drag readout for a mark being moved to `point`.
///
/// Fixed marks show only coordinates; relative marks also show the
/// wind-relative bearing and the offset distance, in feet/meters below
/// 550 ft and miles/kilometers above.
pub fn move_summary(mark: &Mark, marks: &[Mark], wind: f64, point: LatLon) -> String {
    if mark.kind == MarkKind::Fixed {
        return format!("{:.4}, {:.4}", point.lat, point.lon);
    }

    let meters = offset_distance(marks, &mark.parent_id, point);
    let bearing = wind_relative_bearing(marks, &mark.parent_id, wind, point);
    let feet = SailingUnit::Meters.convert(meters, SailingUnit::Feet);
    let distance = if feet > 550.0 {
        format!("{:.2}mi ({:.2}km)", feet / 5280.0, meters / 1000.0)
    } else {
        format!("{:.2}ft ({:.2}m)", feet, meters)
    };

    format!("{}º\n{}\n{:.4}, {:.4}", bearing, distance, point.lat, point.lon)
}

/// Axis-aligned bounding box over a set of marks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    /// Center point, used for the initial map camera.
    pub fn center(&self) -> LatLon {
        LatLon::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lon + self.max_lon) / 2.0,
        )
    }
}

/// Bounding box of all mark positions, or `None` for an empty course.
pub fn bounding_box(marks: &[Mark]) -> Option<BoundingBox> {
    let first = marks.first()?.position;
    let mut bounds = BoundingBox {
        min_lat: first.lat,
        max_lat: first.lat,
        min_lon: first.lon,
        max_lon: first.lon,
    };
    for mark in &marks[1..] {
        bounds.min_lat = bounds.min_lat.min(mark.position.lat);
        bounds.max_lat = bounds.max_lat.max(mark.position.lat);
        bounds.min_lon = bounds.min_lon.min(mark.position.lon);
        bounds.max_lon = bounds.max_lon.max(mark.position.lon);
    }
    Some(bounds)
}

/// Re-derives the display forward/port distances for an existing relative
/// mark, rounded to 4 significant digits in the requested units.
pub fn display_offsets(
    parent: LatLon,
    mark: LatLon,
    wind: f64,
    forward_unit: SailingUnit,
    port_unit: SailingUnit,
) -> (f64, f64) {
    let (forward_m, port_m) = relative_offsets(parent, mark, wind);
    (
        round_significant(forward_unit.from_meters(forward_m), 4),
        round_significant(port_unit.from_meters(port_m), 4),
    )
}
