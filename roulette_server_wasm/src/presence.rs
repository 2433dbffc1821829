//! Live count of connected clients

use crate::protocol::{ClientId, ServerEvent};
use crate::registry::Registry;

/// Send the current registry size to every connected client
pub fn broadcast_count(registry: &mut Registry) {
    let count = registry.len();
    let ids: Vec<ClientId> = registry.ids().copied().collect();
    for id in &ids {
        registry.deliver(id, ServerEvent::OnlineUsers { count });
    }
    tracing::debug!(count, "broadcast online users");
}
