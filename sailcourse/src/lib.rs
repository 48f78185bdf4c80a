//! Sailcourse - collaborative racecourse editing core
//!
//! This library provides the domain model, spherical geometry and network
//! synchronization for a sailing racecourse editor: courses made of fixed
//! and wind-relative marks, leg-line layout, unit presentation, and an
//! event-coalescing sync pipeline against a shared course service.

pub mod geo;
pub mod layout;
pub mod model;
pub mod queue;
pub mod sync;
pub mod units;

pub use geo::{GeoError, LatLon};
pub use model::{Course, Location, Mark, MarkKind};
pub use sync::{start_sync, SyncController};
