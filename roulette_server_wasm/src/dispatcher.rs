//! Routing of inbound client events
//!
//! [`Hub`] owns every piece of mutable server state. Each method is one
//! complete, synchronous transition; callers serialize access to the hub.

use crate::matchmaker::{Matchmaker, PairingOutcome};
use crate::presence;
use crate::protocol::{ClientEvent, ClientId, Role, ServerEvent};
use crate::registry::Registry;
use crate::session::SessionRoom;
use serde::{Deserialize, Serialize};

/// Limits applied while dispatching
#[derive(Debug, Clone, Copy)]
pub struct HubLimits {
    pub max_name_chars: usize,
}

impl Default for HubLimits {
    fn default() -> Self {
        Self { max_name_chars: 32 }
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Hub {
    registry: Registry,
    matchmaker: Matchmaker,
    rooms: SessionRoom,
    #[serde(skip)]
    limits: HubLimits,
}

impl Hub {
    pub fn new(limits: HubLimits) -> Self {
        Self {
            limits,
            ..Default::default()
        }
    }

    pub fn set_limits(&mut self, limits: HubLimits) {
        self.limits = limits;
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn matchmaker(&self) -> &Matchmaker {
        &self.matchmaker
    }

    pub fn rooms(&self) -> &SessionRoom {
        &self.rooms
    }

    pub fn online_count(&self) -> usize {
        self.registry.len()
    }

    pub fn is_connected(&self, id: &ClientId) -> bool {
        self.registry.contains(id)
    }

    /// Register a new client and broadcast the new count
    pub fn connect(&mut self, now: u64) -> ClientId {
        let id = ClientId::new_v4();
        self.registry.add(id, now);
        tracing::info!(client_id = %id, online = self.registry.len(), "client connected");
        presence::broadcast_count(&mut self.registry);
        id
    }

    /// Drain the client's mailbox, marking it as alive
    pub fn poll(&mut self, id: &ClientId, now: u64) -> Vec<ServerEvent> {
        self.registry.touch(id, now);
        self.registry.drain(id)
    }

    /// Apply one inbound event from a connected client
    pub fn dispatch(&mut self, from: ClientId, event: ClientEvent, now: u64) {
        if !self.registry.contains(&from) {
            tracing::debug!(client_id = %from, "ignoring event from unknown client");
            return;
        }
        self.registry.touch(&from, now);

        match event {
            ClientEvent::SetName { name } => {
                self.registry.set_name(&from, &name, self.limits.max_name_chars);
            }
            ClientEvent::FindPartner => self.find_partner(from),
            ClientEvent::CancelSearch => {
                if self.matchmaker.cancel(&from) {
                    tracing::debug!(client_id = %from, "search cancelled");
                }
            }
            ClientEvent::Signal { session_id, data } => {
                self.rooms.relay(&mut self.registry, &session_id, &from, data);
            }
            ClientEvent::Leave { session_id } => {
                self.rooms.leave(&mut self.registry, &session_id, &from);
            }
            ClientEvent::KeepAlive => {}
        }
    }

    fn find_partner(&mut self, from: ClientId) {
        let current = self
            .registry
            .get(&from)
            .and_then(|c| c.current_session.clone());
        if let Some(session_id) = current {
            self.rooms.leave(&mut self.registry, &session_id, &from);
        }

        match self
            .matchmaker
            .request_pairing(&mut self.registry, &mut self.rooms, from)
        {
            PairingOutcome::Parked => {
                tracing::debug!(client_id = %from, "waiting for partner");
                self.registry.deliver(&from, ServerEvent::Waiting);
            }
            PairingOutcome::Paired {
                session_id,
                partner,
                role,
            } => {
                tracing::info!(%session_id, initiator = %from, responder = %partner, "partner found");
                let partner_role = match role {
                    Role::Initiator => Role::Responder,
                    Role::Responder => Role::Initiator,
                };
                let own_name = self.registry.display_name(&from);
                let partner_name = self.registry.display_name(&partner);
                self.registry.deliver(
                    &from,
                    ServerEvent::PartnerFound {
                        session_id: session_id.clone(),
                        role,
                        partner_name,
                    },
                );
                self.registry.deliver(
                    &partner,
                    ServerEvent::PartnerFound {
                        session_id,
                        role: partner_role,
                        partner_name: own_name,
                    },
                );
            }
        }
    }

    /// Remove a client, unwinding its session or waiting slot. Returns
    /// `false` if it was not connected.
    pub fn disconnect(&mut self, id: &ClientId) -> bool {
        let Some(connection) = self.registry.remove(id) else {
            return false;
        };
        if self.matchmaker.cancel(id) {
            tracing::debug!(client_id = %id, "waiting client disconnected");
        }
        self.rooms
            .dissolve_on_disconnect(&mut self.registry, id, connection.current_session.as_ref());
        tracing::info!(client_id = %id, online = self.registry.len(), "client disconnected");
        presence::broadcast_count(&mut self.registry);
        true
    }

    /// Disconnect every client whose last activity is older than `cutoff`
    pub fn reap_idle(&mut self, cutoff: u64) -> usize {
        let idle = self.registry.idle_since(cutoff);
        for id in &idle {
            tracing::info!(client_id = %id, "client timed out");
            self.disconnect(id);
        }
        idle.len()
    }
}
