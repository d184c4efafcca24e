use tracing::{debug, info};
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;
use crate::observability;

use super::billing::quote;
use super::{Engine, EngineError};

/// How `ticket_for` produced the ticket, so a failed entry can be rolled
/// back to the exact prior state.
pub(super) enum TicketProvenance {
    Fresh,
    Reused { completed_at: Ms },
}

impl Engine {
    // ── Registry ─────────────────────────────────────────────

    pub fn register_vehicle(&self, plate: &str, size: Size) -> Result<Vehicle, EngineError> {
        if plate.len() > MAX_PLATE_LEN {
            return Err(EngineError::LimitExceeded("plate too long"));
        }
        let vehicle = Vehicle {
            id: Ulid::new(),
            plate: plate.to_owned(),
            size,
        };
        self.store.insert_vehicle(vehicle.clone())?;
        Ok(vehicle)
    }

    pub fn create_entrance(&self, name: &str) -> Result<Entrance, EngineError> {
        if name.len() > MAX_NAME_LEN {
            return Err(EngineError::LimitExceeded("entrance name too long"));
        }
        let entrance = Entrance {
            id: Ulid::new(),
            name: name.to_owned(),
        };
        self.store.insert_entrance(entrance.clone());
        Ok(entrance)
    }

    pub fn create_space(&self, name: &str, size: Size) -> Result<Space, EngineError> {
        if name.len() > MAX_NAME_LEN {
            return Err(EngineError::LimitExceeded("space name too long"));
        }
        let space = Space {
            id: Ulid::new(),
            name: name.to_owned(),
            size,
        };
        self.store.insert_space(space.clone());
        Ok(space)
    }

    /// Link a space to an entrance at the given distance. Each pair can
    /// be assigned once.
    pub fn assign_space(
        &self,
        entrance_id: Ulid,
        space_id: Ulid,
        distance: u32,
    ) -> Result<EntranceSpace, EngineError> {
        if self.store.entrance(&entrance_id).is_none() {
            return Err(EngineError::EntranceNotFound(entrance_id));
        }
        if self.store.space(&space_id).is_none() {
            return Err(EngineError::SpaceNotFound(space_id));
        }
        let link = EntranceSpace {
            entrance_id,
            space_id,
            distance,
        };
        self.store.assign(link)?;
        Ok(link)
    }

    // ── Ticket ledger ────────────────────────────────────────

    /// Issue or reuse a ticket for an entering vehicle. A ticket completed
    /// within the continuity window is reactivated with its counters
    /// intact; otherwise a fresh one is issued. Either way the vehicle's
    /// active-ticket slot is claimed atomically — a vehicle that is
    /// already parked fails here.
    pub(super) async fn ticket_for(
        &self,
        vehicle: &Vehicle,
    ) -> Result<(Ticket, TicketProvenance), EngineError> {
        let now = self.clock.now_ms();

        if let Some(previous) = self.latest_completed_ticket(&vehicle.id).await
            && let Some(completed_at) = previous.completed_at
            && now - completed_at <= self.rates.continuity_window
        {
            self.store.activate_ticket(vehicle.id, previous.id)?;
            let shared = match self.store.ticket(&previous.id) {
                Some(shared) => shared,
                None => {
                    self.store.release_vehicle(&vehicle.id);
                    return Err(EngineError::TicketNotFound(previous.id));
                }
            };
            let mut guard = shared.write().await;
            guard.reactivate();
            metrics::counter!(observability::TICKETS_REUSED_TOTAL).increment(1);
            debug!(
                vehicle = %vehicle.plate,
                ticket = guard.number,
                "reusing ticket completed within the continuity window"
            );
            return Ok((guard.clone(), TicketProvenance::Reused { completed_at }));
        }

        let id = Ulid::new();
        self.store.activate_ticket(vehicle.id, id)?;
        let ticket = Ticket::issue(id, self.store.next_ticket_number(), vehicle.id, now);
        self.store.insert_ticket(ticket.clone());
        Ok((ticket, TicketProvenance::Fresh))
    }

    /// Roll `ticket_for` back after a failed entry, so the vehicle is not
    /// left holding an active ticket with no session.
    pub(super) async fn abandon_entry(
        &self,
        ticket_id: Ulid,
        vehicle_id: Ulid,
        provenance: TicketProvenance,
    ) {
        match provenance {
            TicketProvenance::Fresh => {
                self.store.remove_ticket(&ticket_id, &vehicle_id);
            }
            TicketProvenance::Reused { completed_at } => {
                if let Some(shared) = self.store.ticket(&ticket_id) {
                    let mut guard = shared.write().await;
                    guard.status = TicketStatus::Completed;
                    guard.completed_at = Some(completed_at);
                }
            }
        }
        self.store.release_vehicle(&vehicle_id);
    }

    /// Fold the ended session into the ticket's cumulative counters, mark
    /// it Completed and release the vehicle's active-ticket slot.
    pub(super) async fn complete_checkout(
        &self,
        ticket_id: Ulid,
        session: &ParkingSession,
    ) -> Result<Ticket, EngineError> {
        let ended_at = session
            .ended_at
            .ok_or(EngineError::SessionNotEnded(session.id))?;
        let shared = self
            .store
            .ticket(&ticket_id)
            .ok_or(EngineError::TicketNotFound(ticket_id))?;
        let mut guard = shared.write().await;
        if guard.current_session != Some(session.id) {
            return Err(EngineError::NoActiveSession(ticket_id));
        }
        guard.apply_checkout(session, ended_at);
        self.store.release_vehicle(&guard.vehicle_id);
        Ok(guard.clone())
    }

    // ── Session lifecycle ────────────────────────────────────

    /// Open a Started session for (ticket, entrance, space). The space is
    /// claimed in the occupancy index in the same step, so two entries
    /// that both selected this space cannot both start on it.
    pub async fn start_session(
        &self,
        ticket_id: Ulid,
        entrance_id: Ulid,
        space_id: Ulid,
    ) -> Result<ParkingSession, EngineError> {
        if self.store.entrance(&entrance_id).is_none() {
            return Err(EngineError::EntranceNotFound(entrance_id));
        }
        if self.store.space(&space_id).is_none() {
            return Err(EngineError::SpaceNotFound(space_id));
        }
        let shared = self
            .store
            .ticket(&ticket_id)
            .ok_or(EngineError::TicketNotFound(ticket_id))?;
        let mut guard = shared.write().await;
        if guard.current_session.is_some() {
            return Err(EngineError::SessionAlreadyStarted(ticket_id));
        }

        let session = ParkingSession::start(
            Ulid::new(),
            ticket_id,
            entrance_id,
            space_id,
            self.clock.now_ms(),
        );
        self.store.claim_space(space_id, session.id)?;
        self.store.insert_session(session.clone());
        guard.current_session = Some(session.id);
        Ok(session)
    }

    /// End the ticket's current session: price it as of now, fix the cost
    /// and hour fields, and free the space.
    pub async fn stop_session(&self, ticket_id: Ulid) -> Result<ParkingSession, EngineError> {
        let now = self.clock.now_ms();
        let shared_ticket = self
            .store
            .ticket(&ticket_id)
            .ok_or(EngineError::TicketNotFound(ticket_id))?;
        let ticket = shared_ticket.read().await.clone();
        let session_id = ticket
            .current_session
            .ok_or(EngineError::NoActiveSession(ticket_id))?;
        let shared_session = self
            .store
            .session(&session_id)
            .ok_or(EngineError::NoActiveSession(ticket_id))?;
        let mut session = shared_session.write().await;
        let space = self
            .store
            .space(&session.space_id)
            .ok_or(EngineError::SpaceNotFound(session.space_id))?;

        let priced = quote(&ticket, &session, space.size, &self.rates, now);
        session.ended_at = Some(now);
        session.cost = priced.cost;
        session.total_hours = priced.total_hours;
        session.paid_hours = priced.hours_being_paid;
        session.status = SessionStatus::Ended;
        self.store.release_space(&session.space_id);
        Ok(session.clone())
    }

    // ── Entry / exit ─────────────────────────────────────────

    /// Admit a vehicle through an entrance: pick a space, issue or reuse
    /// a ticket, open a session.
    pub async fn enter(&self, entrance_id: Ulid, vehicle_id: Ulid) -> Result<Entry, EngineError> {
        if self.store.entrance_count() < MIN_OPEN_ENTRANCES {
            return Err(EngineError::ParkingClosed(MIN_OPEN_ENTRANCES));
        }
        let vehicle = self
            .store
            .vehicle(&vehicle_id)
            .ok_or(EngineError::VehicleNotFound(vehicle_id))?;
        if self.store.entrance(&entrance_id).is_none() {
            return Err(EngineError::EntranceNotFound(entrance_id));
        }
        let picked = self
            .select_space(&entrance_id, vehicle.size)
            .ok_or(EngineError::NoSpaceAvailable)?;

        let (ticket, provenance) = self.ticket_for(&vehicle).await?;
        let session = match self
            .start_session(ticket.id, entrance_id, picked.space.id)
            .await
        {
            Ok(session) => session,
            Err(err) => {
                // Lost the space between selection and claim; leave no
                // active ticket behind.
                self.abandon_entry(ticket.id, vehicle.id, provenance).await;
                return Err(err);
            }
        };

        metrics::counter!(observability::ENTRIES_TOTAL).increment(1);
        info!(
            vehicle = %vehicle.plate,
            space = %picked.space.name,
            ticket = ticket.number,
            "vehicle entered"
        );

        let ticket = self
            .ticket(&ticket.id)
            .await
            .ok_or(EngineError::TicketNotFound(ticket.id))?;
        Ok(Entry {
            ticket,
            space: picked.space,
            session,
        })
    }

    /// Check a vehicle out: end its session, bill it, finalize the ticket.
    pub async fn exit(&self, vehicle_id: Ulid) -> Result<Checkout, EngineError> {
        let vehicle = self
            .store
            .vehicle(&vehicle_id)
            .ok_or(EngineError::VehicleNotFound(vehicle_id))?;
        let ticket = self
            .active_ticket_for(&vehicle_id)
            .await
            .ok_or(EngineError::NotParked(vehicle_id))?;

        let session = self.stop_session(ticket.id).await?;
        let ticket = self.complete_checkout(ticket.id, &session).await?;

        metrics::counter!(observability::EXITS_TOTAL).increment(1);
        metrics::counter!(observability::REVENUE_TOTAL).increment(session.cost.max(0) as u64);
        metrics::histogram!(observability::SESSION_HOURS).record(session.total_hours);
        info!(
            vehicle = %vehicle.plate,
            ticket = ticket.number,
            cost = session.cost,
            hours = session.total_hours,
            "vehicle exited"
        );

        Ok(Checkout { ticket, session })
    }
}
