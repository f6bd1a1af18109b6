use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::enumerate::RouteDescriptor;
use crate::server::AppState;

#[derive(Deserialize)]
pub struct RouteParams {
    /// Only list routes of this module
    pub module: Option<String>,
}

#[derive(Serialize)]
pub struct ModuleSummary {
    pub name: String,
    pub root: u32,
    pub routes: usize,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub async fn list_modules(State(state): State<Arc<AppState>>) -> Json<Vec<ModuleSummary>> {
    let modules = state
        .modules
        .iter()
        .map(|m| ModuleSummary {
            name: m.name.clone(),
            root: m.root.raw(),
            routes: state.routes.keys().filter(|(module, _)| module == &m.name).count(),
        })
        .collect();
    Json(modules)
}

pub async fn list_routes(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RouteParams>,
) -> Json<Vec<String>> {
    let keys = state
        .routes
        .values()
        .filter(|route| params.module.as_ref().is_none_or(|m| &route.module == m))
        .map(RouteDescriptor::key)
        .collect();
    Json(keys)
}

pub async fn get_route(
    State(state): State<Arc<AppState>>,
    Path((module, subpath)): Path<(String, String)>,
) -> Result<Json<RouteDescriptor>, (StatusCode, Json<ErrorResponse>)> {
    let subpath = subpath.trim_matches('/').to_string();
    match state.routes.get(&(module, subpath)) {
        Some(route) => Ok(Json(route.clone())),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "route not found".to_string(),
            }),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::Category;
    use crate::enumerate::RouteEnumerator;
    use crate::ids::DeclHandle;
    use crate::modules::{discover_modules, DEFAULT_MODULE_SCAN_LIMIT};
    use crate::store::{DeclSnapshot, MemoryStore, StoreSnapshot};

    fn state() -> Arc<AppState> {
        let store = MemoryStore::from_snapshot(
            StoreSnapshot::new()
                .module("a", 1)
                .module("empty", 9)
                .decl(DeclSnapshot::new(1, Category::Namespace, "a", "a").with_members(&[2, 3]))
                .decl(DeclSnapshot::new(2, Category::Function, "f", "a.f"))
                .decl(DeclSnapshot::new(3, Category::Namespace, "mem", "a.mem").with_members(&[4]))
                .decl(DeclSnapshot::new(4, Category::Container, "Allocator", "a.mem.Allocator"))
                .decl(DeclSnapshot::new(9, Category::Namespace, "empty", "empty")),
        )
        .unwrap();
        let modules = discover_modules(&store, DEFAULT_MODULE_SCAN_LIMIT).unwrap();
        let routes = RouteEnumerator::new(&store).enumerate(&modules).unwrap().routes;
        Arc::new(AppState::new(modules, routes))
    }

    #[tokio::test]
    async fn test_list_modules_counts_routes() {
        let Json(modules) = list_modules(State(state())).await;
        assert_eq!(modules.len(), 2);
        assert_eq!(modules[0].name, "a");
        assert_eq!(modules[0].routes, 3);
        assert_eq!(modules[1].name, "empty");
        assert_eq!(modules[1].routes, 0);
    }

    #[tokio::test]
    async fn test_list_routes_filters_by_module() {
        let Json(all) = list_routes(State(state()), Query(RouteParams { module: None })).await;
        assert_eq!(all, vec!["a/f", "a/mem", "a/mem/Allocator"]);

        let Json(none) = list_routes(
            State(state()),
            Query(RouteParams {
                module: Some("empty".into()),
            }),
        )
        .await;
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_get_route() {
        let Json(route) = get_route(State(state()), Path(("a".into(), "mem/Allocator".into())))
            .await
            .unwrap();
        assert_eq!(route.record.fqn, "a.mem.Allocator");
        assert_eq!(route.record.original_handle, DeclHandle(4));

        let missing = get_route(State(state()), Path(("a".into(), "nope".into()))).await;
        assert_eq!(missing.unwrap_err().0, StatusCode::NOT_FOUND);
    }
}
