//! # uplink: Upload Relay
//!
//! A single-endpoint HTTP proxy for browser file uploads. Clients POST a base64-encoded
//! file payload to `/api/upload`; the relay attaches a server-held bearer credential,
//! repackages the payload per the configured downstream contract, forwards it to the
//! workflow endpoint, and relays the downstream status and JSON body back verbatim.
//!
//! The relay exists so the credential never reaches the browser: the page talks to this
//! service cross-origin (hence the permissive CORS layer), and only this service talks to
//! the downstream API.
//!
//! ## Request Flow
//!
//! Each invocation is independent - received, validated, forwarded, responded - with no
//! retries, no queues, and no state shared between requests beyond the read-only
//! configuration. The only suspension point is the outbound network call; no timeout is
//! imposed beyond client and runtime defaults.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use uplink::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = uplink::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     uplink::telemetry::init_telemetry()?;
//!
//!     Application::new(config)?
//!         .serve(async {
//!             tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!         })
//!         .await
//! }
//! ```

pub mod api;
pub mod config;
pub mod errors;
pub mod forward;
pub mod telemetry;

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, info};

pub use config::Config;
use config::CorsOrigin;
use forward::Forwarder;

/// Application state shared across request handlers.
///
/// Holds the read-only configuration (including the bearer credential) and the forwarder
/// with its shared HTTP client. Nothing in here is mutated after startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub forwarder: Forwarder,
}

/// Create CORS layer from configuration.
///
/// Methods and headers are fixed to what the upload flow needs (`POST, OPTIONS` and
/// `Content-Type`); only the origin list and preflight max-age come from config.
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let mut cors = CorsLayer::new()
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    let wildcard = config.cors.allowed_origins.iter().any(|origin| matches!(origin, CorsOrigin::Wildcard));
    cors = if wildcard {
        cors.allow_origin(Any)
    } else {
        let mut origins = Vec::new();
        for origin in &config.cors.allowed_origins {
            if let CorsOrigin::Url(url) = origin {
                // Origin header values carry no trailing slash
                origins.push(url.as_str().trim_end_matches('/').parse::<HeaderValue>()?);
            }
        }
        cors.allow_origin(origins)
    };

    if let Some(max_age) = config.cors.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the application router with the upload endpoint and middleware.
///
/// `OPTIONS` is answered explicitly so preflights (and plain OPTIONS probes) always get a
/// 200/empty response; any method other than POST or OPTIONS falls through to the JSON 405.
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let cors = create_cors_layer(&state.config)?;

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .route(
            "/api/upload",
            post(api::handlers::upload::upload)
                .options(api::handlers::upload::preflight)
                .fallback(api::handlers::upload::method_not_allowed),
        )
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    Ok(router)
}

/// The assembled application: configuration plus the router ready to serve.
pub struct Application {
    router: Router,
    config: Config,
}

impl Application {
    /// Build the forwarder, shared state, and router from configuration.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let forwarder = Forwarder::new(config.downstream.clone());
        let state = AppState {
            config: config.clone(),
            forwarder,
        };
        let router = build_router(state)?;
        Ok(Self { router, config })
    }

    /// Bind and serve until the shutdown future resolves.
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!("upload relay listening on http://{}", bind_addr);

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        Ok(())
    }
}
