//! Transport-independent request routing
//!
//! Turns the method, path, query, `X-Client-Id` header and body of an HTTP
//! request into a [`Reply`]. The WASI handler only adapts types.

use crate::error::{ClientRequestError, SignalingError};
use crate::protocol::{ClientEvent, ClientId, PollResponse};
use crate::state::ServerState;

pub const CLIENT_ID_HEADER: &str = "x-client-id";

const INFO_TEXT: &str = "Roulette WASI Signaling Server (Long-Polling)\n\
    \n\
    Endpoints:\n\
    - GET /health - Health check\n\
    - GET /poll?client_id={id} - Connect (no id) or poll for events\n\
    - POST /event - Send an event (X-Client-Id header required)\n\
    - POST /disconnect - Leave the server (X-Client-Id header required)\n\
    \n\
    Events (POST /event body):\n\
    {\"type\":\"set_name\",\"name\":\"...\"}\n\
    {\"type\":\"find_partner\"}\n\
    {\"type\":\"cancel_search\"}\n\
    {\"type\":\"signal\",\"session_id\":\"...\",\"data\":...}\n\
    {\"type\":\"leave\",\"session_id\":\"...\"}\n\
    {\"type\":\"keep_alive\"}\n\
    \n\
    Response format: {\"client_id\": \"uuid\", \"events\": [...]}\n";

/// Recognised endpoints
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Preflight,
    Health,
    Info,
    Poll { client_id: Option<ClientId> },
    Event,
    Disconnect,
    NotFound,
}

/// A response ready to be written by the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl Reply {
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: "text/plain",
            body: body.into(),
        }
    }

    fn json(body: String) -> Self {
        Self {
            status: 200,
            content_type: "application/json",
            body,
        }
    }

    fn ok() -> Self {
        Self::text(200, "OK")
    }
}

/// Get query parameter from URI
fn get_query_param<'a>(query: Option<&'a str>, key: &str) -> Option<&'a str> {
    query?.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        (k == key).then_some(v)
    })
}

pub fn route(method: &str, path: &str, query: Option<&str>) -> Route {
    let path = path.trim_end_matches('/');
    match (method, path) {
        ("OPTIONS", _) => Route::Preflight,
        ("GET", "/health") => Route::Health,
        ("GET", "/poll") => Route::Poll {
            client_id: get_query_param(query, "client_id").and_then(|s| s.parse().ok()),
        },
        ("GET", "") => Route::Info,
        ("POST", "/event") => Route::Event,
        ("POST", "/disconnect") => Route::Disconnect,
        _ => Route::NotFound,
    }
}

pub fn parse_client_id(header: Option<&str>) -> Result<ClientId, ClientRequestError> {
    header
        .and_then(|v| v.trim().parse().ok())
        .ok_or(ClientRequestError::MissingClientId)
}

/// Connect or drain the mailbox of a client
pub fn poll(state: &ServerState, client_id: Option<ClientId>) -> Reply {
    let (client_id, events) = state.join_or_poll(client_id);
    match serde_json::to_string(&PollResponse { client_id, events }) {
        Ok(body) => Reply::json(body),
        Err(e) => Reply::text(500, format!("Failed to encode events: {e}")),
    }
}

/// Apply one `POST /event` body
pub fn submit_event(state: &ServerState, header: Option<&str>, body: &str) -> Reply {
    let parsed = parse_client_id(header)
        .and_then(|id| Ok((id, body.parse::<ClientEvent>()?)));
    let (client_id, event) = match parsed {
        Ok(parsed) => parsed,
        Err(e) => return Reply::text(400, e.to_string()),
    };
    match state.submit(client_id, event) {
        Ok(()) => Reply::ok(),
        Err(SignalingError::UnknownClient) => Reply::text(404, "Client not found"),
        Err(e) => Reply::text(500, e.to_string()),
    }
}

pub fn disconnect(state: &ServerState, header: Option<&str>) -> Reply {
    let client_id = match parse_client_id(header) {
        Ok(id) => id,
        Err(e) => return Reply::text(400, e.to_string()),
    };
    match state.remove_client(&client_id) {
        Ok(()) => Reply::ok(),
        Err(SignalingError::UnknownClient) => Reply::text(404, "Client not found"),
        Err(e) => Reply::text(500, e.to_string()),
    }
}

/// Reply for a request whose body has already been read
pub fn respond(
    state: &ServerState,
    route: Route,
    client_header: Option<&str>,
    body: &str,
) -> Reply {
    match route {
        Route::Preflight => Reply::text(204, ""),
        Route::Health => Reply::ok(),
        Route::Info => Reply::text(200, INFO_TEXT),
        Route::Poll { client_id } => poll(state, client_id),
        Route::Event => submit_event(state, client_header, body),
        Route::Disconnect => disconnect(state, client_header),
        Route::NotFound => Reply::text(404, "Not Found"),
    }
}
