//! Router builder for the bookshelf HTTP server

use axum::{
    extract::{OriginalUri, Request},
    http::{HeaderValue, Method},
    routing::get,
    Router,
};
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use uuid::{NoContext, Timestamp, Uuid};

use bookshelf_kernel::ModuleRegistry;

use crate::error::AppError;

/// Path a module's router is nested under
pub fn mount_path(module_name: &str) -> String {
    format!("/{}", module_name)
}

/// Builder for constructing the main HTTP router
///
/// Layers only wrap routes that exist when they are added, so mount every
/// route before calling the `with_*` middleware methods.
pub struct RouterBuilder {
    router: Router,
}

impl RouterBuilder {
    /// Create a new router builder
    pub fn new() -> Self {
        Self {
            router: Router::new(),
        }
    }

    /// Add a route to the router
    pub fn route(mut self, path: &str, route: axum::routing::MethodRouter) -> Self {
        self.router = self.router.route(path, route);
        self
    }

    /// Mount a module's router under `/{module_name}`
    pub fn mount_module(mut self, module_name: &str, module_router: Router) -> Self {
        self.router = self.router.nest(&mount_path(module_name), module_router);
        self
    }

    /// Report unmatched paths and unsupported methods as `not_found` errors
    ///
    /// Call after every route is mounted; only existing routes get the
    /// method fallback.
    pub fn with_fallbacks(mut self) -> Self {
        self.router = self
            .router
            .method_not_allowed_fallback(method_not_allowed)
            .fallback(route_not_found);
        self
    }

    /// Add tracing middleware
    pub fn with_tracing(mut self) -> Self {
        self.router = self.router.layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_request(DefaultOnRequest::new().level(tracing::Level::INFO))
                .on_response(DefaultOnResponse::new().level(tracing::Level::INFO)),
        );
        self
    }

    /// Add CORS middleware
    pub fn with_cors(mut self) -> Self {
        self.router = self.router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
        self
    }

    /// Add request ID middleware; the ID is echoed back on the response
    pub fn with_request_id(mut self) -> Self {
        self.router = self
            .router
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7));
        self
    }

    /// Add timeout middleware
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.router = self
            .router
            .layer(TimeoutLayer::new(Duration::from_millis(timeout_ms)));
        self
    }

    /// Serve an OpenAPI document merged from every module at `/docs/openapi.json`
    pub fn with_openapi(mut self, registry: &ModuleRegistry) -> Self {
        let openapi_spec = merged_openapi(registry);
        self.router = self.router.route(
            "/docs/openapi.json",
            get(move || async move { axum::Json(openapi_spec.clone()) }),
        );
        self
    }

    /// Build the final router
    pub fn build(self) -> Router {
        self.router
    }
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Merge the base document with each module's paths and schemas
pub fn merged_openapi(registry: &ModuleRegistry) -> serde_json::Value {
    let mut openapi_spec = serde_json::json!({
        "openapi": "3.0.3",
        "info": {
            "title": "Bookshelf API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Book catalog keyed by ISBN"
        },
        "paths": {},
        "components": {
            "schemas": {}
        }
    });

    openapi_spec["components"]["schemas"]["ErrorResponse"] = serde_json::json!({
        "type": "object",
        "properties": {
            "error": {
                "type": "object",
                "properties": {
                    "message": { "type": "string" },
                    "status": { "type": "integer" },
                    "code": { "type": "string" },
                    "details": {
                        "type": "array",
                        "items": { "type": "string" }
                    },
                    "trace_id": { "type": "string" },
                    "timestamp": { "type": "string" }
                },
                "required": ["message", "status", "code", "trace_id", "timestamp"]
            }
        },
        "required": ["error"]
    });

    openapi_spec["paths"]["/healthz"] = serde_json::json!({
        "get": {
            "summary": "Health check",
            "responses": {
                "200": {
                    "description": "OK",
                    "content": {
                        "text/plain": {
                            "schema": { "type": "string" }
                        }
                    }
                }
            }
        }
    });

    for module in registry.modules() {
        let Some(module_spec) = module.openapi() else {
            continue;
        };
        let prefix = mount_path(module.name());

        if let Some(paths) = module_spec.get("paths").and_then(|p| p.as_object()) {
            for (path, path_item) in paths {
                let prefixed_path = if path == "/" {
                    prefix.clone()
                } else {
                    format!("{}{}", prefix, path)
                };
                openapi_spec["paths"][prefixed_path] = path_item.clone();
            }
        }

        if let Some(schemas) = module_spec
            .get("components")
            .and_then(|c| c.get("schemas"))
            .and_then(|s| s.as_object())
        {
            for (schema_name, schema_def) in schemas {
                openapi_spec["components"]["schemas"][schema_name] = schema_def.clone();
            }
        }
    }

    openapi_spec
}

async fn route_not_found(OriginalUri(uri): OriginalUri) -> AppError {
    AppError::not_found(format!("no route for {}", uri.path()))
}

async fn method_not_allowed(method: Method, OriginalUri(uri): OriginalUri) -> AppError {
    AppError::not_found(format!("no route for {} {}", method, uri.path()))
}

/// Request ID generator producing time-ordered UUIDs
#[derive(Clone, Copy)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let request_id = Uuid::new_v7(Timestamp::now(NoContext))
            .to_string()
            .parse::<HeaderValue>()
            .ok()?;
        Some(RequestId::new(request_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use bookshelf_kernel::Module;
    use std::sync::Arc;
    use tower::ServiceExt;

    struct ShelfModule;

    #[async_trait]
    impl Module for ShelfModule {
        fn name(&self) -> &'static str {
            "shelves"
        }

        fn routes(&self) -> Router {
            Router::new()
                .route("/", get(|| async { "all shelves" }))
                .route("/{id}", get(|| async { "one shelf" }))
        }

        fn openapi(&self) -> Option<serde_json::Value> {
            Some(serde_json::json!({
                "paths": {
                    "/": { "get": { "summary": "List shelves" } },
                    "/{id}": { "get": { "summary": "Get shelf" } }
                },
                "components": {
                    "schemas": {
                        "Shelf": { "type": "object" }
                    }
                }
            }))
        }
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_router_builder_basic() {
        let router = RouterBuilder::new()
            .route("/test", get(|| async { "test" }))
            .build();

        let response = router.oneshot(get_request("/test")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_module_mounting() {
        let module_router = Router::new()
            .route("/", get(|| async { "module" }))
            .route("/{id}", get(|| async { "item" }));

        let router = RouterBuilder::new()
            .mount_module("test", module_router)
            .build();

        let response = router
            .clone()
            .oneshot(get_request("/test"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = router.oneshot(get_request("/test/42")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_request_id_is_propagated() {
        let router = RouterBuilder::new()
            .route("/health", get(|| async { "ok" }))
            .with_tracing()
            .with_cors()
            .with_request_id()
            .with_timeout(5000)
            .build();

        let response = router.oneshot(get_request("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let request_id = response
            .headers()
            .get("x-request-id")
            .expect("x-request-id header")
            .to_str()
            .unwrap();
        assert!(Uuid::parse_str(request_id).is_ok());
    }

    #[tokio::test]
    async fn test_fallbacks_use_error_envelope() {
        let router = RouterBuilder::new()
            .mount_module("shelves", ShelfModule.routes())
            .with_fallbacks()
            .build();

        let response = router
            .clone()
            .oneshot(get_request("/nowhere"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"]["code"], "not_found");

        let request = Request::builder()
            .method("POST")
            .uri("/shelves/42")
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"]["status"], 404);
        assert_eq!(json["error"]["message"], "no route for POST /shelves/42");
    }

    #[test]
    fn test_openapi_merges_module_paths_under_mount_path() {
        let mut registry = ModuleRegistry::new();
        registry.register(Arc::new(ShelfModule));

        let spec = merged_openapi(&registry);

        assert!(spec["paths"]["/healthz"].is_object());
        assert_eq!(spec["paths"]["/shelves"]["get"]["summary"], "List shelves");
        assert_eq!(spec["paths"]["/shelves/{id}"]["get"]["summary"], "Get shelf");
        assert!(spec["components"]["schemas"]["Shelf"].is_object());
        assert!(spec["components"]["schemas"]["ErrorResponse"].is_object());
    }

    #[tokio::test]
    async fn test_openapi_document_is_served() {
        let mut registry = ModuleRegistry::new();
        registry.register(Arc::new(ShelfModule));

        let router = RouterBuilder::new().with_openapi(&registry).build();
        let response = router
            .oneshot(get_request("/docs/openapi.json"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let spec: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(spec["openapi"], "3.0.3");
    }
}
