//! Single-slot matchmaking
//!
//! At most one client waits at a time. The next distinct requester is paired
//! with it and becomes the session initiator.

use crate::protocol::{ClientId, Role, SessionId};
use crate::registry::Registry;
use crate::session::SessionRoom;
use serde::{Deserialize, Serialize};

/// Result of a pairing request, from the requester's point of view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairingOutcome {
    /// Nobody was waiting; the requester now occupies the waiting slot
    Parked,
    /// A session was formed with the previous occupant
    Paired {
        session_id: SessionId,
        partner: ClientId,
        role: Role,
    },
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Matchmaker {
    waiting: Option<ClientId>,
}

impl Matchmaker {
    pub fn waiting(&self) -> Option<ClientId> {
        self.waiting
    }

    pub fn request_pairing(
        &mut self,
        registry: &mut Registry,
        rooms: &mut SessionRoom,
        requester: ClientId,
    ) -> PairingOutcome {
        let partner = match self.waiting.take() {
            Some(occupant) if occupant != requester && registry.contains(&occupant) => occupant,
            Some(occupant) if occupant != requester => {
                tracing::warn!(%occupant, "discarding waiting client that is no longer connected");
                self.waiting = Some(requester);
                return PairingOutcome::Parked;
            }
            _ => {
                self.waiting = Some(requester);
                return PairingOutcome::Parked;
            }
        };

        let session_id = rooms.create(registry, requester, partner);
        PairingOutcome::Paired {
            session_id,
            partner,
            role: Role::Initiator,
        }
    }

    /// Clear the waiting slot if `id` occupies it
    pub fn cancel(&mut self, id: &ClientId) -> bool {
        if self.waiting.as_ref() == Some(id) {
            self.waiting = None;
            true
        } else {
            false
        }
    }
}
