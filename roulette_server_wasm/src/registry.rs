//! Connected clients and their mailboxes

use crate::protocol::{ClientId, ServerEvent, SessionId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// One connected client
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ClientConnection {
    pub display_name: Option<String>,
    /// Key into the session table; resolved by lookup, never owned
    pub current_session: Option<SessionId>,
    /// Unix millis of the last poll or event
    pub last_seen: u64,
    /// Pending events to be delivered to this client
    mailbox: VecDeque<ServerEvent>,
}

impl ClientConnection {
    pub fn is_free(&self) -> bool {
        self.current_session.is_none()
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Registry {
    clients: HashMap<ClientId, ClientConnection>,
}

impl Registry {
    pub fn add(&mut self, id: ClientId, now: u64) {
        let connection = ClientConnection {
            last_seen: now,
            ..Default::default()
        };
        let previous = self.clients.insert(id, connection);
        assert!(previous.is_none(), "client {id} registered twice");
    }

    pub fn remove(&mut self, id: &ClientId) -> Option<ClientConnection> {
        self.clients.remove(id)
    }

    /// Set or clear a display name. Unknown clients are ignored.
    pub fn set_name(&mut self, id: &ClientId, name: &str, max_chars: usize) {
        let Some(client) = self.clients.get_mut(id) else {
            return;
        };
        let name: String = name.trim().chars().take(max_chars).collect();
        client.display_name = (!name.is_empty()).then_some(name);
    }

    pub fn get(&self, id: &ClientId) -> Option<&ClientConnection> {
        self.clients.get(id)
    }

    pub fn get_mut(&mut self, id: &ClientId) -> Option<&mut ClientConnection> {
        self.clients.get_mut(id)
    }

    pub fn contains(&self, id: &ClientId) -> bool {
        self.clients.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &ClientId> {
        self.clients.keys()
    }

    pub fn display_name(&self, id: &ClientId) -> Option<String> {
        self.clients.get(id).and_then(|c| c.display_name.clone())
    }

    pub fn touch(&mut self, id: &ClientId, now: u64) {
        if let Some(client) = self.clients.get_mut(id) {
            client.last_seen = client.last_seen.max(now);
        }
    }

    /// Queue an event for a client. Returns `false` if the client is gone,
    /// in which case the event is dropped.
    pub fn deliver(&mut self, to: &ClientId, event: ServerEvent) -> bool {
        match self.clients.get_mut(to) {
            Some(client) => {
                client.mailbox.push_back(event);
                true
            }
            None => false,
        }
    }

    /// Take every queued event for a client, oldest first
    pub fn drain(&mut self, id: &ClientId) -> Vec<ServerEvent> {
        self.clients
            .get_mut(id)
            .map(|c| c.mailbox.drain(..).collect())
            .unwrap_or_default()
    }

    /// Clients whose last activity is older than `cutoff`
    pub fn idle_since(&self, cutoff: u64) -> Vec<ClientId> {
        self.clients
            .iter()
            .filter(|(_, c)| c.last_seen < cutoff)
            .map(|(id, _)| *id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_name_trims_and_truncates() {
        let mut registry = Registry::default();
        let id = ClientId::new_v4();
        registry.add(id, 0);

        registry.set_name(&id, "  Grace Hopper  ", 5);
        assert_eq!(registry.display_name(&id).as_deref(), Some("Grace"));

        registry.set_name(&id, "   ", 5);
        assert_eq!(registry.display_name(&id), None);
    }

    #[test]
    fn set_name_on_unknown_client_is_ignored() {
        let mut registry = Registry::default();
        registry.set_name(&ClientId::new_v4(), "ghost", 32);
        assert!(registry.is_empty());
    }

    #[test]
    fn deliver_to_gone_client_is_dropped() {
        let mut registry = Registry::default();
        let id = ClientId::new_v4();
        registry.add(id, 0);
        assert!(registry.deliver(&id, ServerEvent::Waiting));
        registry.remove(&id);
        assert!(!registry.deliver(&id, ServerEvent::Waiting));
        assert!(registry.drain(&id).is_empty());
    }

    #[test]
    fn drain_returns_events_in_order() {
        let mut registry = Registry::default();
        let id = ClientId::new_v4();
        registry.add(id, 0);
        registry.deliver(&id, ServerEvent::Waiting);
        registry.deliver(&id, ServerEvent::PartnerLeft);
        assert_eq!(
            registry.drain(&id),
            vec![ServerEvent::Waiting, ServerEvent::PartnerLeft]
        );
        assert!(registry.drain(&id).is_empty());
    }

    #[test]
    fn idle_since_ignores_recent_clients() {
        let mut registry = Registry::default();
        let stale = ClientId::new_v4();
        let fresh = ClientId::new_v4();
        registry.add(stale, 100);
        registry.add(fresh, 100);
        registry.touch(&fresh, 5_000);
        assert_eq!(registry.idle_since(1_000), vec![stale]);
    }

    #[test]
    #[should_panic(expected = "registered twice")]
    fn duplicate_identity_is_an_invariant_violation() {
        let mut registry = Registry::default();
        let id = ClientId::new_v4();
        registry.add(id, 0);
        registry.add(id, 0);
    }
}
