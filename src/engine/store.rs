use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::RwLock;
use ulid::Ulid;

use crate::model::*;

use super::EngineError;

pub type Shared<T> = Arc<RwLock<T>>;

/// In-process entity stores for the garage, plus the two uniqueness
/// indexes that back the safety-critical invariants: one Started session
/// per space, one Active ticket per vehicle. The indexes are claimed with
/// atomic entry operations, so a check-then-act race between two requests
/// resolves at the store instead of double-admitting.
pub struct GarageStore {
    vehicles: DashMap<Ulid, Vehicle>,
    plates: DashMap<String, Ulid>,
    entrances: DashMap<Ulid, Entrance>,
    spaces: DashMap<Ulid, Space>,
    /// Entrance → its space links.
    assignments: DashMap<Ulid, Vec<EntranceSpace>>,
    tickets: DashMap<Ulid, Shared<Ticket>>,
    tickets_by_vehicle: DashMap<Ulid, Vec<Ulid>>,
    sessions: DashMap<Ulid, Shared<ParkingSession>>,
    /// Space → its Started session. Present iff the space is occupied.
    occupancy: DashMap<Ulid, Ulid>,
    /// Vehicle → its Active ticket.
    active_tickets: DashMap<Ulid, Ulid>,
    ticket_seq: AtomicU64,
}

impl Default for GarageStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GarageStore {
    pub fn new() -> Self {
        Self {
            vehicles: DashMap::new(),
            plates: DashMap::new(),
            entrances: DashMap::new(),
            spaces: DashMap::new(),
            assignments: DashMap::new(),
            tickets: DashMap::new(),
            tickets_by_vehicle: DashMap::new(),
            sessions: DashMap::new(),
            occupancy: DashMap::new(),
            active_tickets: DashMap::new(),
            ticket_seq: AtomicU64::new(1),
        }
    }

    // ── Vehicles ─────────────────────────────────────────────

    pub fn insert_vehicle(&self, vehicle: Vehicle) -> Result<(), EngineError> {
        match self.plates.entry(vehicle.plate.clone()) {
            Entry::Occupied(_) => Err(EngineError::PlateTaken(vehicle.plate)),
            Entry::Vacant(slot) => {
                slot.insert(vehicle.id);
                self.vehicles.insert(vehicle.id, vehicle);
                Ok(())
            }
        }
    }

    pub fn vehicle(&self, id: &Ulid) -> Option<Vehicle> {
        self.vehicles.get(id).map(|e| e.value().clone())
    }

    // ── Entrances & spaces ───────────────────────────────────

    pub fn insert_entrance(&self, entrance: Entrance) {
        self.entrances.insert(entrance.id, entrance);
    }

    pub fn entrance(&self, id: &Ulid) -> Option<Entrance> {
        self.entrances.get(id).map(|e| e.value().clone())
    }

    pub fn entrance_count(&self) -> usize {
        self.entrances.len()
    }

    pub fn insert_space(&self, space: Space) {
        self.spaces.insert(space.id, space);
    }

    pub fn space(&self, id: &Ulid) -> Option<Space> {
        self.spaces.get(id).map(|e| e.value().clone())
    }

    // ── Entrance-space links ─────────────────────────────────

    /// Link a space to an entrance. The (entrance, space) pair is unique;
    /// the duplicate check runs under the entry's shard lock.
    pub fn assign(&self, link: EntranceSpace) -> Result<(), EngineError> {
        let mut links = self.assignments.entry(link.entrance_id).or_default();
        if links.iter().any(|l| l.space_id == link.space_id) {
            return Err(EngineError::AlreadyAssigned {
                entrance: link.entrance_id,
                space: link.space_id,
            });
        }
        links.push(link);
        Ok(())
    }

    pub fn assignments_for(&self, entrance_id: &Ulid) -> Vec<EntranceSpace> {
        self.assignments
            .get(entrance_id)
            .map(|e| e.value().clone())
            .unwrap_or_default()
    }

    // ── Tickets ──────────────────────────────────────────────

    pub fn next_ticket_number(&self) -> u64 {
        self.ticket_seq.fetch_add(1, Ordering::Relaxed)
    }

    pub fn insert_ticket(&self, ticket: Ticket) -> Shared<Ticket> {
        let id = ticket.id;
        let vehicle_id = ticket.vehicle_id;
        let shared = Arc::new(RwLock::new(ticket));
        self.tickets.insert(id, shared.clone());
        self.tickets_by_vehicle
            .entry(vehicle_id)
            .or_default()
            .push(id);
        shared
    }

    pub fn ticket(&self, id: &Ulid) -> Option<Shared<Ticket>> {
        self.tickets.get(id).map(|e| e.value().clone())
    }

    pub fn ticket_ids_for_vehicle(&self, vehicle_id: &Ulid) -> Vec<Ulid> {
        self.tickets_by_vehicle
            .get(vehicle_id)
            .map(|e| e.value().clone())
            .unwrap_or_default()
    }

    /// Undo of `insert_ticket`, for rolling back an entry that lost the
    /// occupancy race after issuing a fresh ticket.
    pub fn remove_ticket(&self, id: &Ulid, vehicle_id: &Ulid) {
        self.tickets.remove(id);
        if let Some(mut ids) = self.tickets_by_vehicle.get_mut(vehicle_id) {
            ids.retain(|t| t != id);
        }
    }

    // ── Sessions ─────────────────────────────────────────────

    pub fn insert_session(&self, session: ParkingSession) -> Shared<ParkingSession> {
        let id = session.id;
        let shared = Arc::new(RwLock::new(session));
        self.sessions.insert(id, shared.clone());
        shared
    }

    pub fn session(&self, id: &Ulid) -> Option<Shared<ParkingSession>> {
        self.sessions.get(id).map(|e| e.value().clone())
    }

    // ── Uniqueness acquires ──────────────────────────────────

    /// Claim a space for a Started session. Fails if any session already
    /// holds it — this is the constraint that closes the select-then-start
    /// race window.
    pub fn claim_space(&self, space_id: Ulid, session_id: Ulid) -> Result<(), EngineError> {
        match self.occupancy.entry(space_id) {
            Entry::Occupied(_) => Err(EngineError::SpaceOccupied(space_id)),
            Entry::Vacant(slot) => {
                slot.insert(session_id);
                Ok(())
            }
        }
    }

    pub fn release_space(&self, space_id: &Ulid) {
        self.occupancy.remove(space_id);
    }

    pub fn is_vacant(&self, space_id: &Ulid) -> bool {
        !self.occupancy.contains_key(space_id)
    }

    /// Claim the vehicle's single Active-ticket slot.
    pub fn activate_ticket(&self, vehicle_id: Ulid, ticket_id: Ulid) -> Result<(), EngineError> {
        match self.active_tickets.entry(vehicle_id) {
            Entry::Occupied(_) => Err(EngineError::AlreadyParked(vehicle_id)),
            Entry::Vacant(slot) => {
                slot.insert(ticket_id);
                Ok(())
            }
        }
    }

    pub fn release_vehicle(&self, vehicle_id: &Ulid) {
        self.active_tickets.remove(vehicle_id);
    }

    pub fn active_ticket_id(&self, vehicle_id: &Ulid) -> Option<Ulid> {
        self.active_tickets.get(vehicle_id).map(|e| *e.value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn space_claim_is_exclusive() {
        let store = GarageStore::new();
        let space = Ulid::new();
        store.claim_space(space, Ulid::new()).unwrap();
        assert!(matches!(
            store.claim_space(space, Ulid::new()),
            Err(EngineError::SpaceOccupied(_))
        ));
        assert!(!store.is_vacant(&space));

        store.release_space(&space);
        assert!(store.is_vacant(&space));
        store.claim_space(space, Ulid::new()).unwrap();
    }

    #[test]
    fn one_active_ticket_per_vehicle() {
        let store = GarageStore::new();
        let vehicle = Ulid::new();
        store.activate_ticket(vehicle, Ulid::new()).unwrap();
        assert!(matches!(
            store.activate_ticket(vehicle, Ulid::new()),
            Err(EngineError::AlreadyParked(_))
        ));
        store.release_vehicle(&vehicle);
        assert_eq!(store.active_ticket_id(&vehicle), None);
    }

    #[test]
    fn duplicate_assignment_rejected() {
        let store = GarageStore::new();
        let entrance = Ulid::new();
        let space = Ulid::new();
        store
            .assign(EntranceSpace {
                entrance_id: entrance,
                space_id: space,
                distance: 10,
            })
            .unwrap();
        let dup = store.assign(EntranceSpace {
            entrance_id: entrance,
            space_id: space,
            distance: 99,
        });
        assert!(matches!(dup, Err(EngineError::AlreadyAssigned { .. })));
        assert_eq!(store.assignments_for(&entrance).len(), 1);
    }

    #[test]
    fn duplicate_plate_rejected() {
        let store = GarageStore::new();
        store
            .insert_vehicle(Vehicle {
                id: Ulid::new(),
                plate: "AAA-111".into(),
                size: Size::Small,
            })
            .unwrap();
        let dup = store.insert_vehicle(Vehicle {
            id: Ulid::new(),
            plate: "AAA-111".into(),
            size: Size::Large,
        });
        assert!(matches!(dup, Err(EngineError::PlateTaken(_))));
    }

    #[test]
    fn ticket_numbers_are_monotonic() {
        let store = GarageStore::new();
        let a = store.next_ticket_number();
        let b = store.next_ticket_number();
        assert!(b > a);
    }

    #[test]
    fn remove_ticket_unlinks_vehicle() {
        let store = GarageStore::new();
        let vehicle = Ulid::new();
        let ticket = Ticket::issue(Ulid::new(), 1, vehicle, 0);
        let id = ticket.id;
        store.insert_ticket(ticket);
        assert_eq!(store.ticket_ids_for_vehicle(&vehicle), vec![id]);

        store.remove_ticket(&id, &vehicle);
        assert!(store.ticket(&id).is_none());
        assert!(store.ticket_ids_for_vehicle(&vehicle).is_empty());
    }
}
