use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unix milliseconds — the only time type.
pub type Ms = i64;

/// Hours elapsed between two instants, from whole seconds, rounded to
/// 3 decimal places (half-up at the 4th decimal). All billing arithmetic
/// consumes hours in this form.
pub fn hours_between(start: Ms, end: Ms) -> f64 {
    debug_assert!(start <= end, "elapsed interval must not be negative");
    let secs = (end - start) / 1000;
    round_milli_hours(secs as f64 / 3600.0)
}

/// Round to 3 decimal places, half-up at the 4th decimal.
pub fn round_milli_hours(hours: f64) -> f64 {
    (hours * 1000.0 + 0.5).floor() / 1000.0
}

/// Size class shared by vehicles and spaces. The ordering is the parking
/// rule: a vehicle fits any space of its own class or larger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Size {
    Small,
    Medium,
    Large,
}

impl Size {
    pub fn fits_in(self, space: Size) -> bool {
        self <= space
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: Ulid,
    /// Unique registration plate.
    pub plate: String,
    pub size: Size,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entrance {
    pub id: Ulid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Space {
    pub id: Ulid,
    pub name: String,
    pub size: Size,
}

/// Join of (entrance, space) with the walking distance between them.
/// Unique per pair — a space cannot be assigned twice to the same entrance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntranceSpace {
    pub entrance_id: Ulid,
    pub space_id: Ulid,
    pub distance: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TicketStatus {
    Active,
    Completed,
}

/// Billing record for one continuous (or reuse-linked) parking episode of
/// a vehicle. Carries the cumulative counters the rate engine reconciles
/// against across repeated sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: Ulid,
    /// Monotonic issue sequence, printed on the physical ticket.
    pub number: u64,
    pub vehicle_id: Ulid,
    pub status: TicketStatus,
    pub created_at: Ms,
    /// Set only while the ticket is Completed.
    pub completed_at: Option<Ms>,
    /// The Started session, if any. Updated transactionally on session
    /// start/stop instead of being re-derived by scanning.
    pub current_session: Option<Ulid>,
    /// Total amount billed across all sessions of this ticket.
    pub total_cost: i64,
    /// Unrounded elapsed hours billed so far.
    pub actual_hours: f64,
    /// Ceiling-rounded hours already charged for.
    pub paid_hours: f64,
    /// `paid_hours - actual_hours`: paid-but-unused buffer that absorbs
    /// short follow-up sessions at no extra charge.
    pub remaining_hours: f64,
}

impl Ticket {
    pub fn issue(id: Ulid, number: u64, vehicle_id: Ulid, now: Ms) -> Self {
        Self {
            id,
            number,
            vehicle_id,
            status: TicketStatus::Active,
            created_at: now,
            completed_at: None,
            current_session: None,
            total_cost: 0,
            actual_hours: 0.0,
            paid_hours: 0.0,
            remaining_hours: 0.0,
        }
    }

    /// Flip a Completed ticket back to Active, keeping every cumulative
    /// counter — the vehicle is treated as never having left.
    pub fn reactivate(&mut self) {
        self.status = TicketStatus::Active;
        self.completed_at = None;
    }

    /// Fold a just-ended session into the cumulative counters and close
    /// the ticket.
    pub fn apply_checkout(&mut self, session: &ParkingSession, now: Ms) {
        self.total_cost += session.cost;
        self.actual_hours += session.paid_hours;
        self.paid_hours += session.paid_hours.ceil();
        self.remaining_hours = self.paid_hours - self.actual_hours;
        self.status = TicketStatus::Completed;
        self.completed_at = Some(now);
        self.current_session = None;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    Started,
    Ended,
}

/// One physical occupancy interval of a single space under a single
/// ticket. A space is occupied iff it has a Started session — there is no
/// independent "occupied" flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParkingSession {
    pub id: Ulid,
    pub ticket_id: Ulid,
    pub entrance_id: Ulid,
    pub space_id: Ulid,
    pub status: SessionStatus,
    pub started_at: Ms,
    pub ended_at: Option<Ms>,
    pub cost: i64,
    /// Elapsed hours of this session.
    pub total_hours: f64,
    /// Hours actually charged in this session.
    pub paid_hours: f64,
}

impl ParkingSession {
    pub fn start(id: Ulid, ticket_id: Ulid, entrance_id: Ulid, space_id: Ulid, now: Ms) -> Self {
        Self {
            id,
            ticket_id,
            entrance_id,
            space_id,
            status: SessionStatus::Started,
            started_at: now,
            ended_at: None,
            cost: 0,
            total_hours: 0.0,
            paid_hours: 0.0,
        }
    }
}

// ── Query result types ───────────────────────────────────────────

/// A space joined to an entrance, with the distance of that link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceWithDistance {
    pub space: Space,
    pub distance: u32,
}

/// Result of a successful vehicle entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub ticket: Ticket,
    pub space: Space,
    pub session: ParkingSession,
}

/// Result of a successful vehicle exit: the finalized ticket and the
/// session it just paid for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkout {
    pub ticket: Ticket,
    pub session: ParkingSession,
}
