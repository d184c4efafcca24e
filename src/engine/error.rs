use thiserror::Error;
use ulid::Ulid;

/// Transport-agnostic error class. Front ends map these onto their own
/// status codes (404 / 400 / 405 for HTTP).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    BadRequest,
    MethodNotAllowed,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("vehicle {0} not found")]
    VehicleNotFound(Ulid),
    #[error("entrance {0} not found")]
    EntranceNotFound(Ulid),
    #[error("space {0} not found")]
    SpaceNotFound(Ulid),
    #[error("ticket {0} not found")]
    TicketNotFound(Ulid),

    #[error("plate {0:?} is already registered")]
    PlateTaken(String),
    #[error("space {space} is already assigned to entrance {entrance}")]
    AlreadyAssigned { entrance: Ulid, space: Ulid },
    #[error("space {0} is already occupied")]
    SpaceOccupied(Ulid),
    #[error("cannot start a new session: ticket {0} already has an active one")]
    SessionAlreadyStarted(Ulid),
    #[error("ticket {0} does not have an active session")]
    NoActiveSession(Ulid),
    #[error("session {0} has not ended")]
    SessionNotEnded(Ulid),
    #[error("vehicle {0} is already parked")]
    AlreadyParked(Ulid),
    #[error("vehicle {0} is not parked")]
    NotParked(Ulid),
    #[error("limit exceeded: {0}")]
    LimitExceeded(&'static str),

    #[error("parking closed: fewer than {0} entrances are open")]
    ParkingClosed(usize),
    #[error("no parking space available, please try another entrance")]
    NoSpaceAvailable,
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::VehicleNotFound(_)
            | EngineError::EntranceNotFound(_)
            | EngineError::SpaceNotFound(_)
            | EngineError::TicketNotFound(_) => ErrorKind::NotFound,
            EngineError::PlateTaken(_)
            | EngineError::AlreadyAssigned { .. }
            | EngineError::SpaceOccupied(_)
            | EngineError::SessionAlreadyStarted(_)
            | EngineError::NoActiveSession(_)
            | EngineError::SessionNotEnded(_)
            | EngineError::AlreadyParked(_)
            | EngineError::NotParked(_)
            | EngineError::LimitExceeded(_) => ErrorKind::BadRequest,
            EngineError::ParkingClosed(_) | EngineError::NoSpaceAvailable => {
                ErrorKind::MethodNotAllowed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_the_taxonomy() {
        let id = Ulid::new();
        assert_eq!(EngineError::SpaceNotFound(id).kind(), ErrorKind::NotFound);
        assert_eq!(EngineError::SpaceOccupied(id).kind(), ErrorKind::BadRequest);
        assert_eq!(EngineError::NotParked(id).kind(), ErrorKind::BadRequest);
        assert_eq!(
            EngineError::ParkingClosed(3).kind(),
            ErrorKind::MethodNotAllowed
        );
        assert_eq!(
            EngineError::NoSpaceAvailable.kind(),
            ErrorKind::MethodNotAllowed
        );
    }
}
