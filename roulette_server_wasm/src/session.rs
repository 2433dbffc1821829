//! Two-member session rooms and signal relay

use crate::protocol::{ClientId, ServerEvent, SessionId, SignalPayload};
use crate::registry::Registry;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One active pairing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub initiator: ClientId,
    pub responder: ClientId,
}

impl Session {
    pub fn has_member(&self, id: &ClientId) -> bool {
        self.initiator == *id || self.responder == *id
    }

    /// The member that is not `id`, if `id` is a member
    pub fn other(&self, id: &ClientId) -> Option<ClientId> {
        if self.initiator == *id {
            Some(self.responder)
        } else if self.responder == *id {
            Some(self.initiator)
        } else {
            None
        }
    }
}

/// Owner of the session table and the only writer of `current_session`
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct SessionRoom {
    sessions: HashMap<SessionId, Session>,
    /// Sequence number of the last session created
    #[serde(default)]
    last_seq: u64,
}

impl SessionRoom {
    /// Record a new session and attach both members to it
    pub fn create(
        &mut self,
        registry: &mut Registry,
        initiator: ClientId,
        responder: ClientId,
    ) -> SessionId {
        assert_ne!(initiator, responder, "session members must be distinct");
        self.last_seq += 1;
        let session_id = SessionId::new(initiator, responder, self.last_seq);
        for member in [initiator, responder] {
            if let Some(client) = registry.get_mut(&member) {
                client.current_session = Some(session_id.clone());
            }
        }
        let previous = self.sessions.insert(
            session_id.clone(),
            Session {
                initiator,
                responder,
            },
        );
        assert!(previous.is_none(), "session {session_id} created twice");
        session_id
    }

    pub fn get(&self, session_id: &SessionId) -> Option<&Session> {
        self.sessions.get(session_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Forward `data` to the other member. Unknown sessions and foreign
    /// senders are dropped.
    pub fn relay(
        &self,
        registry: &mut Registry,
        session_id: &SessionId,
        from: &ClientId,
        data: SignalPayload,
    ) {
        let Some(to) = self.sessions.get(session_id).and_then(|s| s.other(from)) else {
            tracing::debug!(%session_id, %from, "dropping signal for unknown or foreign session");
            return;
        };
        tracing::debug!(%session_id, %from, %to, "relaying signal");
        registry.deliver(&to, ServerEvent::Signal { data });
    }

    /// Dissolve a session on behalf of one of its members. Returns `false`
    /// if the session was already gone or `from` is not a member.
    pub fn leave(
        &mut self,
        registry: &mut Registry,
        session_id: &SessionId,
        from: &ClientId,
    ) -> bool {
        if !self.sessions.get(session_id).is_some_and(|s| s.has_member(from)) {
            tracing::debug!(%session_id, %from, "ignoring leave for unknown or foreign session");
            return false;
        }
        let Some(session) = self.sessions.remove(session_id) else {
            return false;
        };
        for member in [session.initiator, session.responder] {
            if let Some(client) = registry.get_mut(&member) {
                if client.current_session.as_ref() == Some(session_id) {
                    client.current_session = None;
                }
            }
        }
        if let Some(other) = session.other(from) {
            registry.deliver(&other, ServerEvent::PartnerLeft);
        }
        tracing::info!(%session_id, %from, "session dissolved");
        true
    }

    /// Dissolve whatever session a disconnecting client belonged to
    pub fn dissolve_on_disconnect(
        &mut self,
        registry: &mut Registry,
        id: &ClientId,
        current_session: Option<&SessionId>,
    ) -> bool {
        match current_session {
            Some(session_id) => self.leave(registry, session_id, id),
            None => false,
        }
    }
}
