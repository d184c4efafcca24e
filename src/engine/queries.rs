use ulid::Ulid;

use crate::model::*;

use super::billing::{Quote, quote};
use super::{Engine, EngineError};

impl Engine {
    // ── Space catalog ────────────────────────────────────────

    /// All spaces linked to the entrance, with their distances. An unknown
    /// entrance yields an empty list; existence is the caller's check.
    pub fn spaces_for_entrance(&self, entrance_id: &Ulid) -> Vec<SpaceWithDistance> {
        self.store
            .assignments_for(entrance_id)
            .into_iter()
            .filter_map(|link| {
                self.store.space(&link.space_id).map(|space| SpaceWithDistance {
                    space,
                    distance: link.distance,
                })
            })
            .collect()
    }

    // ── Occupancy ────────────────────────────────────────────

    /// A space is vacant iff no Started session holds it. The occupancy
    /// index is maintained transactionally with session start/stop, so
    /// this is a plain lookup rather than a scan.
    pub fn is_vacant(&self, space_id: &Ulid) -> bool {
        self.store.is_vacant(space_id)
    }

    pub fn is_occupied(&self, space_id: &Ulid) -> bool {
        !self.is_vacant(space_id)
    }

    // ── Space selection ──────────────────────────────────────

    /// Pick a space for a vehicle coming through the entrance: linked →
    /// size-compatible → vacant, then the candidate with the largest
    /// distance (ties broken arbitrarily). Returns None when nothing
    /// qualifies — that is a capacity signal, not an error.
    pub fn select_space(&self, entrance_id: &Ulid, vehicle_size: Size) -> Option<SpaceWithDistance> {
        self.spaces_for_entrance(entrance_id)
            .into_iter()
            .filter(|candidate| vehicle_size.fits_in(candidate.space.size))
            .filter(|candidate| self.is_vacant(&candidate.space.id))
            .max_by_key(|candidate| candidate.distance)
    }

    // ── Tickets ──────────────────────────────────────────────

    /// The vehicle's single Active ticket, if any. The active-ticket index
    /// guarantees at most one; were the invariant ever violated at the
    /// store, the index still resolves to one winner.
    pub async fn active_ticket_for(&self, vehicle_id: &Ulid) -> Option<Ticket> {
        let ticket_id = self.store.active_ticket_id(vehicle_id)?;
        let shared = self.store.ticket(&ticket_id)?;
        let guard = shared.read().await;
        Some(guard.clone())
    }

    /// The vehicle's most recently completed ticket, by `completed_at`
    /// descending, considering only tickets that actually completed.
    pub(super) async fn latest_completed_ticket(&self, vehicle_id: &Ulid) -> Option<Ticket> {
        let mut latest: Option<Ticket> = None;
        for id in self.store.ticket_ids_for_vehicle(vehicle_id) {
            let Some(shared) = self.store.ticket(&id) else {
                continue;
            };
            let guard = shared.read().await;
            if guard.status != TicketStatus::Completed || guard.completed_at.is_none() {
                continue;
            }
            if latest
                .as_ref()
                .is_none_or(|best| guard.completed_at > best.completed_at)
            {
                latest = Some(guard.clone());
            }
        }
        latest
    }

    // ── Cost preview ─────────────────────────────────────────

    /// Price the vehicle's active session as of now, without mutating
    /// anything. What `exit` would charge if the vehicle left right away.
    pub async fn preview_cost(&self, vehicle_id: &Ulid) -> Result<Quote, EngineError> {
        if self.store.vehicle(vehicle_id).is_none() {
            return Err(EngineError::VehicleNotFound(*vehicle_id));
        }
        let ticket = self
            .active_ticket_for(vehicle_id)
            .await
            .ok_or(EngineError::NotParked(*vehicle_id))?;
        let session_id = ticket
            .current_session
            .ok_or(EngineError::NoActiveSession(ticket.id))?;
        let shared = self
            .store
            .session(&session_id)
            .ok_or(EngineError::NoActiveSession(ticket.id))?;
        let session = shared.read().await.clone();
        let space = self
            .store
            .space(&session.space_id)
            .ok_or(EngineError::SpaceNotFound(session.space_id))?;

        Ok(quote(
            &ticket,
            &session,
            space.size,
            &self.rates,
            self.clock.now_ms(),
        ))
    }

    // ── Registry lookups ─────────────────────────────────────

    pub fn vehicle(&self, id: &Ulid) -> Option<Vehicle> {
        self.store.vehicle(id)
    }

    pub fn entrance(&self, id: &Ulid) -> Option<Entrance> {
        self.store.entrance(id)
    }

    pub fn space(&self, id: &Ulid) -> Option<Space> {
        self.store.space(id)
    }

    pub fn entrance_count(&self) -> usize {
        self.store.entrance_count()
    }

    /// Snapshot of a ticket by id.
    pub async fn ticket(&self, id: &Ulid) -> Option<Ticket> {
        let shared = self.store.ticket(id)?;
        let guard = shared.read().await;
        Some(guard.clone())
    }

    /// Snapshot of a session by id.
    pub async fn session(&self, id: &Ulid) -> Option<ParkingSession> {
        let shared = self.store.session(id)?;
        let guard = shared.read().await;
        Some(guard.clone())
    }
}
