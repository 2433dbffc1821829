//! HTTP long-polling handler for the WASI component
//!
//! Adapts `wstd` requests to [`routes`](crate::routes) and writes the reply
//! back with permissive CORS headers.

use crate::error::ClientRequestError;
use crate::routes::{self, CLIENT_ID_HEADER, Reply, Route};
use crate::state::ServerState;
use wstd::http::{Body, Request, Response};

fn into_response(reply: Reply, route: &Route) -> Result<Response<Body>, wstd::http::Error> {
    let mut builder = Response::builder()
        .status(reply.status)
        .header("access-control-allow-origin", "*");

    if *route == Route::Preflight {
        builder = builder
            .header("access-control-allow-methods", "GET, POST, OPTIONS")
            .header("access-control-allow-headers", "content-type, x-client-id")
            .header("access-control-max-age", "86400");
        return Ok(builder.body(Body::empty())?);
    }

    Ok(builder
        .header("content-type", reply.content_type)
        .body(Body::from(reply.body))?)
}

/// Handle an HTTP request - main router
pub async fn handle_request(
    request: Request<Body>,
    state: &ServerState,
) -> Result<Response<Body>, wstd::http::Error> {
    let route = routes::route(
        request.method().as_str(),
        request.uri().path(),
        request.uri().query(),
    );
    let client_header = request
        .headers()
        .get(CLIENT_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let body = match route {
        Route::Event => {
            let mut body = request.into_body();
            match body.str_contents().await {
                Ok(s) => s.to_owned(),
                Err(e) => {
                    let err = ClientRequestError::Body(format!("{e:?}"));
                    tracing::debug!(error = %err, "rejecting event");
                    return into_response(Reply::text(400, err.to_string()), &route);
                }
            }
        }
        _ => String::new(),
    };

    let reply = routes::respond(state, route.clone(), client_header.as_deref(), &body);
    if reply.status >= 400 {
        tracing::debug!(status = reply.status, ?route, "request rejected");
    }
    into_response(reply, &route)
}
