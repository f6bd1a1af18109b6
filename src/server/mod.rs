//! Read-only HTTP API over an enumerated route set

use axum::{routing::get, Router};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::enumerate::RouteDescriptor;
use crate::modules::ModuleEntry;

pub mod routes;

/// Server state
pub struct AppState {
    pub modules: Vec<ModuleEntry>,
    /// Keyed by `(module, subpath)`
    pub routes: BTreeMap<(String, String), RouteDescriptor>,
}

impl AppState {
    pub fn new(modules: Vec<ModuleEntry>, routes: Vec<RouteDescriptor>) -> Self {
        let routes = routes
            .into_iter()
            .map(|route| ((route.module.clone(), route.subpath.clone()), route))
            .collect();
        Self { modules, routes }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/modules", get(routes::list_modules))
        .route("/routes", get(routes::list_routes))
        .route("/routes/{module}/{*subpath}", get(routes::get_route))
        .with_state(state)
}

pub async fn start_server(port: u16, state: AppState) -> anyhow::Result<()> {
    let app = router(Arc::new(state));

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    tracing::info!("Starting route server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
