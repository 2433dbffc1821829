//! WASI HTTP server entry point for the long-polling signaling server
//!
//! This module provides the main entry point when running as a WASI HTTP component
//! using `wasmtime serve`.

#[cfg(target_os = "wasi")]
use roulette_server_wasm::{Config, ServerState, handle_request};
#[cfg(target_os = "wasi")]
use std::cell::RefCell;
#[cfg(target_os = "wasi")]
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
#[cfg(target_os = "wasi")]
use wstd::http::{Body, Request, Response};

// Thread-local state for the server (WASI is single-threaded)
#[cfg(target_os = "wasi")]
thread_local! {
    static STATE: RefCell<Option<ServerState>> = const { RefCell::new(None) };
}

#[cfg(target_os = "wasi")]
fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("roulette_server_wasm=info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

#[cfg(target_os = "wasi")]
fn get_or_init_state() -> ServerState {
    STATE.with(|s| {
        s.borrow_mut()
            .get_or_insert_with(|| {
                init_tracing();
                let config = Config::from_env().unwrap_or_else(|e| {
                    tracing::error!(error = %e, "invalid configuration, using defaults");
                    Config::default()
                });
                tracing::info!(?config, "signaling server instance started");
                ServerState::new(config)
            })
            .clone()
    })
}

/// The main HTTP handler for WASI
///
/// This function is called by the WASI runtime for each incoming HTTP request.
#[cfg(target_os = "wasi")]
#[wstd::http_server]
async fn main(request: Request<Body>) -> Result<Response<Body>, wstd::http::Error> {
    let state = get_or_init_state();
    handle_request(request, &state).await
}

#[cfg(not(target_os = "wasi"))]
fn main() {
    eprintln!(
        "roulette-signaling-wasm is a WASI HTTP component; build it for wasm32-wasip2 and run it with `wasmtime serve`"
    );
    std::process::exit(1);
}
