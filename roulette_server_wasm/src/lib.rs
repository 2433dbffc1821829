//! WASI-compatible random pairing and WebRTC signaling relay using wstd
//!
//! Anonymous clients connect, ask for a partner and are paired two at a
//! time. The server relays the handshake messages each pair needs to open a
//! direct peer-to-peer connection; media never passes through it.
//!
//! # Protocol
//!
//! WASI HTTP has no WebSocket upgrade, so the server uses HTTP long-polling:
//!
//! - **GET /poll** - Connect; returns a fresh client id and pending events
//! - **GET /poll?client_id={id}** - Poll for events
//! - **POST /event** - Send an event (X-Client-Id header required)
//! - **POST /disconnect** - Leave (X-Client-Id header required)
//! - **GET /health** - Health check
//!
//! A client that does not poll within the configured timeout is disconnected.
//!
//! ## Response Format (server → client)
//!
//! ```json
//! {"client_id": "<uuid>", "events": [{"event": "online_users", "count": 2}]}
//! ```
//!
//! Events:
//! - `{"event": "online_users", "count": n}` - Connected client count
//! - `{"event": "waiting"}` - Parked, no partner yet
//! - `{"event": "partner_found", "session_id": "..", "role": "initiator", "partner_name": ".."}`
//! - `{"event": "signal", "data": ...}` - Relayed payload from the partner
//! - `{"event": "partner_left"}` - Partner left or disconnected
//!
//! ## Events (client → server)
//!
//! POST to /event with X-Client-Id header and JSON body:
//! - `{"type": "set_name", "name": ".."}`
//! - `{"type": "find_partner"}`
//! - `{"type": "cancel_search"}`
//! - `{"type": "signal", "session_id": "..", "data": ...}`
//! - `{"type": "leave", "session_id": ".."}`
//! - `{"type": "keep_alive"}`
//!
//! # Example
//!
//! ```bash
//! # Start the server
//! wasmtime serve -S common --addr 127.0.0.1:3536 roulette-signaling-wasm.wasm
//!
//! # Connect (returns client_id and initial events)
//! curl http://127.0.0.1:3536/poll
//!
//! # Look for a partner
//! curl -X POST -H "X-Client-Id: <your-id>" -d '{"type":"find_partner"}' \
//!   http://127.0.0.1:3536/event
//!
//! # Poll for new events
//! curl "http://127.0.0.1:3536/poll?client_id=<your-id>"
//! ```

#![forbid(unsafe_code)]

pub mod config;
pub mod dispatcher;
pub mod error;
#[cfg(target_os = "wasi")]
pub mod handler;
pub mod matchmaker;
pub mod presence;
pub mod protocol;
pub mod registry;
pub mod routes;
pub mod session;
pub mod state;

pub use config::Config;
pub use dispatcher::Hub;
pub use error::SignalingError;
#[cfg(target_os = "wasi")]
pub use handler::handle_request;
pub use protocol::{ClientEvent, ClientId, Role, ServerEvent, SessionId, SignalPayload};
pub use state::ServerState;
