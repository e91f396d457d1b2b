//! HTTP server: shared state, route table and startup.

pub mod error;
pub mod handlers;

use crate::config::{Config, RouteConfig, RoutesConfig};
use crate::llm::{
    BackendKind, GeneratedSql, InferenceAdapter, InferenceBackend, LocalSeq2SeqModel,
    RemoteChatClient,
};
use crate::prompt::build_chat_prompt;
use crate::types::{Result, SchemaDescription, Text2SqlError};
use axum::body::Body;
use axum::http::{Method, Request};
use axum::routing::{get, post};
use axum::Router;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, info_span, warn};
use uuid::Uuid;

pub use error::{ApiError, ErrorResponse, GENERIC_FAILURE_MESSAGE};

/// Generation routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteName {
    Simple,
    Complex,
    Gpt,
    Groq,
    Convert,
}

impl RouteName {
    /// All generation routes.
    pub const ALL: [RouteName; 5] = [
        Self::Simple,
        Self::Complex,
        Self::Gpt,
        Self::Groq,
        Self::Convert,
    ];

    /// Name as used in configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Complex => "complex",
            Self::Gpt => "gpt",
            Self::Groq => "groq",
            Self::Convert => "convert",
        }
    }

    /// URL path.
    pub fn path(&self) -> &'static str {
        match self {
            Self::Simple => "/text-to-sql/simple",
            Self::Complex => "/text-to-sql/complex",
            Self::Gpt => "/text-to-sql/gpt",
            Self::Groq => "/text-to-sql/groq",
            Self::Convert => "/convert",
        }
    }

    /// Route binding in configuration.
    pub fn binding<'a>(&self, routes: &'a RoutesConfig) -> &'a RouteConfig {
        match self {
            Self::Simple => &routes.simple,
            Self::Complex => &routes.complex,
            Self::Gpt => &routes.gpt,
            Self::Groq => &routes.groq,
            Self::Convert => &routes.convert,
        }
    }
}

impl fmt::Display for RouteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RouteName {
    type Err = Text2SqlError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| Text2SqlError::invalid_input(format!("unknown route: {}", s)))
    }
}

/// Process-wide state shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    adapter: InferenceAdapter,
    backends: Arc<HashMap<BackendKind, Arc<dyn InferenceBackend>>>,
    routes: Arc<RoutesConfig>,
}

impl AppState {
    /// Assemble state from already constructed backends.
    pub fn new(
        adapter: InferenceAdapter,
        backends: Vec<Arc<dyn InferenceBackend>>,
        routes: RoutesConfig,
    ) -> Self {
        let backends = backends.into_iter().map(|b| (b.kind(), b)).collect();
        Self {
            adapter,
            backends: Arc::new(backends),
            routes: Arc::new(routes),
        }
    }

    /// Construct every configured backend.
    ///
    /// Loading the local model is blocking and runs on the blocking pool.
    ///
    /// # Errors
    ///
    /// Returns `Text2SqlError::ConfigError` if a backend cannot be built
    pub async fn from_config(config: &Config) -> Result<Self> {
        let mut backends: Vec<Arc<dyn InferenceBackend>> = Vec::new();

        if let Some(local) = config.local.clone() {
            let model = tokio::task::spawn_blocking(move || LocalSeq2SeqModel::load(&local))
                .await
                .map_err(|e| Text2SqlError::config(format!("model loader failed: {}", e)))??;
            backends.push(Arc::new(model));
        }

        for (kind, api) in [
            (BackendKind::Remote, &config.remote),
            (BackendKind::Groq, &config.groq),
        ] {
            if let Some(api) = api {
                let client = RemoteChatClient::new(kind, api)?;
                info!(
                    backend = kind.as_str(),
                    endpoint = client.endpoint(),
                    model = %api.model,
                    "chat backend ready"
                );
                backends.push(Arc::new(client));
            }
        }

        Ok(Self::new(
            InferenceAdapter::new(config.server.inference_timeout()),
            backends,
            config.routes.clone(),
        ))
    }

    /// Check whether the backend bound to `route` is available.
    pub fn serves(&self, route: RouteName) -> bool {
        self.backends
            .contains_key(&route.binding(&self.routes).backend)
    }

    /// Build the route's prompt and run it through its backend.
    ///
    /// # Errors
    ///
    /// - `Text2SqlError::InvalidInput` if `query` is empty
    /// - `Text2SqlError::ConfigError` if the route's backend is not configured
    /// - inference errors from `InferenceAdapter::infer`
    pub async fn generate(
        &self,
        route: RouteName,
        query: &str,
        schema: Option<&SchemaDescription>,
    ) -> Result<GeneratedSql> {
        let binding = route.binding(&self.routes);
        let prompt = build_chat_prompt(query, schema, binding.variant())?;
        let backend = self.backends.get(&binding.backend).ok_or_else(|| {
            Text2SqlError::config(format!(
                "route {} requires the {} backend",
                route,
                binding.backend.as_str()
            ))
        })?;

        self.adapter
            .infer(&prompt, backend.as_ref(), binding.max_output_tokens)
            .await
    }
}

/// Build the HTTP router.
///
/// Generation routes whose backend is missing are left unmounted.
pub fn router(state: AppState) -> Router {
    let mut app = Router::new().route("/health", get(handlers::health));

    for route in RouteName::ALL {
        if !state.serves(route) {
            warn!(
                route = route.path(),
                backend = route.binding(&state.routes).backend.as_str(),
                "backend not configured, route disabled"
            );
            continue;
        }
        let handler = match route {
            RouteName::Simple => post(handlers::simple),
            RouteName::Complex => post(handlers::complex),
            RouteName::Gpt => post(handlers::gpt),
            RouteName::Groq => post(handlers::groq),
            RouteName::Convert => post(handlers::convert),
        };
        app = app.route(route.path(), handler);
    }

    app.with_state(state)
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                info_span!(
                    "http_request",
                    method = %req.method(),
                    uri = %req.uri(),
                    request_id = %Uuid::new_v4(),
                )
            }),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers(Any),
        )
}

/// Build state from `config` and serve until Ctrl-C.
///
/// # Errors
///
/// Returns backend construction errors or I/O errors from the listener
pub async fn serve(config: &Config) -> Result<()> {
    let state = AppState::from_config(config).await?;
    let app = router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("text2sql listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
