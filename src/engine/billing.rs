use serde::{Deserialize, Serialize};

use crate::model::{Ms, ParkingSession, Size, Ticket, hours_between};
use crate::rates::RateCard;

// ── Tiered-rate algorithm ─────────────────────────────────────────

/// Priced outcome of one session, before anything is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Incremental charge for this session.
    pub cost: i64,
    /// Elapsed hours of the session.
    pub total_hours: f64,
    /// Hours the session is actually charged for. Folded into the
    /// ticket's cumulative counters at checkout.
    pub hours_being_paid: f64,
}

/// Price the ticket's current session as of `end_time`. Pure — callable
/// for previews without touching ticket or session state.
///
/// Tiers, in order:
/// 1. Carry-over: hours already paid for but unused on the ticket absorb
///    the whole session at no charge.
/// 2. Daily: once the ticket's rounded cumulative hours reach 24, bill
///    whole days plus hourly remainder against the ticket's entire
///    history, crediting everything already billed.
/// 3. Sub-daily: hourly on the unpaid remainder, with the flat rate
///    covering the first allotment until prior sessions have exhausted it.
pub fn quote(
    ticket: &Ticket,
    session: &ParkingSession,
    space_size: Size,
    rates: &RateCard,
    end_time: Ms,
) -> Quote {
    let total_hours = hours_between(session.started_at, end_time);

    if ticket.remaining_hours >= total_hours {
        return Quote {
            cost: 0,
            total_hours,
            hours_being_paid: total_hours,
        };
    }

    let rounded_total_hours = (ticket.actual_hours + total_hours).ceil();
    let unpaid_hours = total_hours - ticket.remaining_hours;
    let hourly = rates.hourly(space_size);

    let cost = if rounded_total_hours >= 24.0 {
        let days = (rounded_total_hours / 24.0).floor();
        days as i64 * rates.daily_rate
            + (rounded_total_hours - days * 24.0) as i64 * hourly
            - ticket.total_cost
    } else {
        let rounded_unpaid_hours = unpaid_hours.ceil();
        if ticket.paid_hours >= rates.flat_rate_hours {
            rounded_unpaid_hours as i64 * hourly
        } else {
            let excess = (rounded_unpaid_hours - rates.flat_rate_hours).max(0.0);
            excess as i64 * hourly + rates.flat_rate
        }
    };

    Quote {
        cost,
        total_hours,
        hours_being_paid: unpaid_hours,
    }
}
