//! Metric names recorded by the engine. The embedding front end installs
//! whatever `metrics` recorder/exporter it wants; without one these are
//! no-ops.

/// Counter: vehicles admitted.
pub const ENTRIES_TOTAL: &str = "valet_entries_total";

/// Counter: vehicles checked out.
pub const EXITS_TOTAL: &str = "valet_exits_total";

/// Counter: amount billed at checkout, in rate-card currency units.
pub const REVENUE_TOTAL: &str = "valet_revenue_total";

/// Counter: tickets reactivated under the continuity window instead of
/// freshly issued.
pub const TICKETS_REUSED_TOTAL: &str = "valet_tickets_reused_total";

/// Histogram: elapsed hours per ended session.
pub const SESSION_HOURS: &str = "valet_session_hours";
