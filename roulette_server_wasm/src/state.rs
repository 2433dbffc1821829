//! Server state management for the WASM signaling server
//!
//! [`ServerState`] is a cheap handle to the single [`Hub`] of this instance.
//! Every request runs as one synchronous transaction on the hub: expired
//! clients are reaped first, then the request is applied. When a state file
//! is configured the hub is reloaded before and saved after each transaction,
//! so instances created per request by the host still see one shared state.
//! Read-only queries reload the file but never reap or save.

use crate::config::Config;
use crate::dispatcher::Hub;
use crate::error::SignalingError;
use crate::protocol::{ClientEvent, ClientId, ServerEvent};
use std::cell::RefCell;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

fn system_now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Hub snapshot stored on disk between instances
#[derive(Debug, Clone)]
struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    /// Missing file means no snapshot yet
    fn load(&self) -> Result<Option<Hub>, SignalingError> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write to a sibling temp file and rename it over the snapshot, so
    /// readers see either the old or the new state, never a partial one
    fn save(&self, hub: &Hub) -> Result<(), SignalingError> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer(&mut tmp, hub)?;
        tmp.flush()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

/// Handle to the server state shared by all requests of an instance
#[derive(Clone)]
pub struct ServerState {
    hub: Rc<RefCell<Hub>>,
    config: Rc<Config>,
    snapshot: Option<SnapshotFile>,
    clock: fn() -> u64,
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl ServerState {
    pub fn new(config: Config) -> Self {
        let snapshot = config.state_file.clone().map(|path| SnapshotFile { path });
        Self {
            hub: Rc::new(RefCell::new(Hub::new(config.hub_limits()))),
            config: Rc::new(config),
            snapshot,
            clock: system_now_ms,
        }
    }

    /// Replace the wall clock, in unix milliseconds
    pub fn with_clock(mut self, clock: fn() -> u64) -> Self {
        self.clock = clock;
        self
    }

    /// Pick up the latest snapshot. An unreadable file leaves the
    /// in-memory hub as it is.
    fn reload(&self, hub: &mut Hub) {
        let Some(snapshot) = &self.snapshot else {
            return;
        };
        match snapshot.load() {
            Ok(Some(mut loaded)) => {
                loaded.set_limits(self.config.hub_limits());
                *hub = loaded;
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(
                    path = %snapshot.path.display(),
                    error = %e,
                    "unreadable state file, keeping in-memory state"
                );
            }
        }
    }

    /// Run one serialized transition on the hub
    fn transact<R>(&self, f: impl FnOnce(&mut Hub, u64) -> R) -> R {
        let now = (self.clock)();
        let mut hub = self.hub.borrow_mut();
        self.reload(&mut hub);

        let reaped = hub.reap_idle(now.saturating_sub(self.config.client_timeout_ms()));
        if reaped > 0 {
            tracing::debug!(reaped, "reaped idle clients");
        }

        let result = f(&mut hub, now);

        if let Some(snapshot) = &self.snapshot {
            if let Err(e) = snapshot.save(&hub) {
                tracing::warn!(path = %snapshot.path.display(), error = %e, "failed to save state file");
            }
        }
        result
    }

    /// Read the hub without reaping or saving
    fn inspect<R>(&self, f: impl FnOnce(&Hub) -> R) -> R {
        let mut hub = self.hub.borrow_mut();
        self.reload(&mut hub);
        f(&hub)
    }

    /// Connect or poll for events
    ///
    /// If `client_id` is `None` or no longer connected, a new client is
    /// registered. Returns the client's id and its pending events.
    pub fn join_or_poll(&self, client_id: Option<ClientId>) -> (ClientId, Vec<ServerEvent>) {
        self.transact(|hub, now| {
            let id = match client_id {
                Some(id) if hub.is_connected(&id) => id,
                _ => hub.connect(now),
            };
            let events = hub.poll(&id, now);
            (id, events)
        })
    }

    /// Apply an inbound event from a connected client
    pub fn submit(&self, client_id: ClientId, event: ClientEvent) -> Result<(), SignalingError> {
        self.transact(|hub, now| {
            if !hub.is_connected(&client_id) {
                return Err(SignalingError::UnknownClient);
            }
            hub.dispatch(client_id, event, now);
            Ok(())
        })
    }

    /// Disconnect a client from the server
    pub fn remove_client(&self, client_id: &ClientId) -> Result<(), SignalingError> {
        self.transact(|hub, _| {
            if hub.disconnect(client_id) {
                Ok(())
            } else {
                Err(SignalingError::UnknownClient)
            }
        })
    }

    pub fn online_count(&self) -> usize {
        self.inspect(|hub| hub.online_count())
    }

    /// Current waiting-slot occupant
    pub fn waiting(&self) -> Option<ClientId> {
        self.inspect(|hub| hub.matchmaker().waiting())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn unknown_poll_id_connects_a_new_client() {
        let state = ServerState::default();
        let stale = ClientId::new_v4();
        let (id, events) = state.join_or_poll(Some(stale));
        assert_ne!(id, stale);
        assert_eq!(events, vec![ServerEvent::OnlineUsers { count: 1 }]);
    }

    #[test]
    fn submit_from_unknown_client_fails() {
        let state = ServerState::default();
        let result = state.submit(ClientId::new_v4(), ClientEvent::FindPartner);
        assert_matches!(result, Err(SignalingError::UnknownClient));
    }

    #[test]
    fn remove_client_twice_reports_unknown() {
        let state = ServerState::default();
        let (id, _) = state.join_or_poll(None);
        assert!(state.remove_client(&id).is_ok());
        assert_matches!(state.remove_client(&id), Err(SignalingError::UnknownClient));
        assert_eq!(state.online_count(), 0);
    }

    #[test]
    fn clones_share_one_hub() {
        let state = ServerState::default();
        let other = state.clone();
        state.join_or_poll(None);
        assert_eq!(other.online_count(), 1);
    }

    #[test]
    fn snapshot_is_shared_between_instances() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            state_file: Some(dir.path().join("state.json")),
            ..Config::default()
        };

        let first = ServerState::new(config.clone());
        let (a, _) = first.join_or_poll(None);
        first.submit(a, ClientEvent::FindPartner).unwrap();

        let second = ServerState::new(config);
        assert_eq!(second.online_count(), 1);
        assert_eq!(second.waiting(), Some(a));

        let (b, _) = second.join_or_poll(None);
        second.submit(b, ClientEvent::FindPartner).unwrap();
        let (_, events) = first.join_or_poll(Some(a));
        assert_matches!(events.last(), Some(ServerEvent::PartnerFound { .. }));
    }

    #[test]
    fn corrupt_snapshot_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{ not json").unwrap();

        let state = ServerState::new(Config {
            state_file: Some(path),
            ..Config::default()
        });
        assert_eq!(state.online_count(), 0);
    }

    #[test]
    fn truncated_snapshot_keeps_in_memory_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let config = Config {
            state_file: Some(path.clone()),
            ..Config::default()
        };
        let state = ServerState::new(config.clone());
        let (a, _) = state.join_or_poll(None);
        let (b, _) = state.join_or_poll(None);
        state.submit(a, ClientEvent::FindPartner).unwrap();
        state.submit(b, ClientEvent::FindPartner).unwrap();

        let written = std::fs::read(&path).unwrap();
        std::fs::write(&path, &written[..written.len() / 2]).unwrap();

        assert_eq!(state.online_count(), 2);
        let (polled, events) = state.join_or_poll(Some(a));
        assert_eq!(polled, a);
        assert_matches!(events.last(), Some(ServerEvent::PartnerFound { .. }));

        // the next transaction rewrites a complete snapshot
        assert_eq!(ServerState::new(config).online_count(), 2);
        assert_eq!(dir.path().read_dir().unwrap().count(), 1);
    }

    #[test]
    fn queries_do_not_reap_or_save() {
        fn start() -> u64 {
            1_000_000
        }
        fn later() -> u64 {
            1_000_000 + 60_000
        }

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let early = ServerState::new(Config {
            state_file: Some(path.clone()),
            ..Config::default()
        })
        .with_clock(start);
        let (a, _) = early.join_or_poll(None);
        let (b, _) = early.join_or_poll(None);
        early.submit(a, ClientEvent::FindPartner).unwrap();
        early.submit(b, ClientEvent::FindPartner).unwrap();
        early.join_or_poll(Some(a));
        let before = std::fs::read(&path).unwrap();

        let late = early.clone().with_clock(later);
        assert_eq!(late.online_count(), 2);
        assert_eq!(late.waiting(), None);
        assert_eq!(std::fs::read(&path).unwrap(), before);

        let (polled, events) = early.join_or_poll(Some(a));
        assert_eq!(polled, a);
        assert!(events.is_empty());
    }
}
