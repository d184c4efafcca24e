//! Occupancy & billing engine for a multi-entrance parking garage.
//!
//! Vehicles enter through an entrance, get assigned a vacant space that
//! fits their size class, accrue time-based fees under a tiered rate
//! policy (flat rate, hourly overage, daily rate, carry-over of paid
//! hours across continuous re-entries), and are billed on exit. Front
//! ends of any kind drive the [`engine::Engine`] operations; persistence
//! and transport live outside this crate.

pub mod clock;
pub mod engine;
pub mod limits;
pub mod model;
pub mod observability;
pub mod rates;
