//! Router builder for the shelf HTTP server

use axum::{routing::get, Router};
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};

use shelf_kernel::ModuleRegistry;

use crate::MakeRequestUuid;

/// Join an API prefix and a module name into a mount path.
///
/// `("", "books")` gives `/books`; `("/api/", "books")` gives `/api/books`.
pub fn module_path(api_prefix: &str, module_name: &str) -> String {
    let prefix = api_prefix.trim_end_matches('/');
    if prefix.is_empty() {
        format!("/{}", module_name)
    } else if prefix.starts_with('/') {
        format!("{}/{}", prefix, module_name)
    } else {
        format!("/{}/{}", prefix, module_name)
    }
}

/// Builder for constructing the main HTTP router
pub struct RouterBuilder {
    router: Router,
    api_prefix: String,
}

impl RouterBuilder {
    /// Create a new router builder mounting modules at the root
    pub fn new() -> Self {
        Self::with_prefix("")
    }

    /// Create a new router builder mounting modules under `api_prefix`
    pub fn with_prefix(api_prefix: impl Into<String>) -> Self {
        Self {
            router: Router::new(),
            api_prefix: api_prefix.into(),
        }
    }

    /// Add a route to the router
    pub fn route(mut self, path: &str, route: axum::routing::MethodRouter) -> Self {
        self.router = self.router.route(path, route);
        self
    }

    /// Mount a module's router under `{api_prefix}/{module_name}`
    pub fn mount_module(mut self, module_name: &str, module_router: Router) -> Self {
        let path = module_path(&self.api_prefix, module_name);
        self.router = self.router.nest(&path, module_router);
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

    /// Add request ID middleware; the id is echoed back on the response
    pub fn with_request_id(mut self) -> Self {
        self.router = self
            .router
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));
        self
    }

    /// Add timeout middleware
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.router = self
            .router
            .layer(TimeoutLayer::new(Duration::from_millis(timeout_ms)));
        self
    }

    /// Add OpenAPI documentation by collecting specs from all modules
    pub fn with_openapi(mut self, registry: &ModuleRegistry) -> Self {
        // Start with base OpenAPI spec
        let mut openapi_spec = serde_json::json!({
            "openapi": "3.1.0",
            "info": {
                "title": "Shelf API",
                "version": "1.0.0",
                "description": "Book inventory and rental ledger"
            },
            "paths": {},
            "components": {
                "schemas": {}
            }
        });

        // Add common error response schema
        openapi_spec["components"]["schemas"]["ErrorResponse"] = serde_json::json!({
            "type": "object",
            "properties": {
                "error": {
                    "type": "object",
                    "properties": {
                        "code": { "type": "string" },
                        "message": { "type": "string" },
                        "details": { "type": "array", "items": { "type": "object" } },
                        "trace_id": { "type": "string" },
                        "timestamp": { "type": "string" }
                    },
                    "required": ["code", "message", "trace_id", "timestamp"]
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
                        "content": { "text/plain": { "schema": { "type": "string" } } }
                    }
                }
            }
        });

        // Collect OpenAPI specs from all modules
        for module in registry.modules() {
            let Some(module_spec) = module.openapi() else {
                continue;
            };
            let mount = module_path(&self.api_prefix, module.name());

            if let Some(paths) = module_spec.get("paths").and_then(|p| p.as_object()) {
                for (path, path_item) in paths {
                    // Module paths are relative to the module mount; "/" is the mount itself
                    let full_path = if path == "/" {
                        mount.clone()
                    } else {
                        format!("{}{}", mount, path)
                    };
                    openapi_spec["paths"][full_path] = path_item.clone();
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

        // Deserialize our JSON spec into a proper utoipa OpenApi object
        // This allows SwaggerUI to serve it correctly
        let openapi_obj: utoipa::openapi::OpenApi = serde_json::from_value(openapi_spec.clone())
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "merged OpenAPI document is invalid, serving a stub");
                utoipa::openapi::OpenApiBuilder::new()
                    .info(
                        utoipa::openapi::InfoBuilder::new()
                            .title("Shelf API")
                            .version("1.0.0")
                            .build(),
                    )
                    .build()
            });

        // Mount Swagger UI at /swagger-ui with our merged OpenAPI spec
        self.router = self.router.merge(
            utoipa_swagger_ui::SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi_obj),
        );

        // Also serve the raw JSON spec at /docs/openapi.json for external consumers
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

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    async fn get_status(router: Router, uri: &str) -> StatusCode {
        router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[test]
    fn test_module_path_joins_prefix() {
        assert_eq!(module_path("", "books"), "/books");
        assert_eq!(module_path("/api", "books"), "/api/books");
        assert_eq!(module_path("/api/", "books"), "/api/books");
        assert_eq!(module_path("v1", "rentals"), "/v1/rentals");
    }

    #[tokio::test]
    async fn test_module_mounting_at_root() {
        let module_router = Router::new()
            .route("/", get(|| async { "module" }))
            .route("/{id}", get(|| async { "item" }));

        let router = RouterBuilder::new()
            .mount_module("books", module_router)
            .build();

        assert_eq!(get_status(router.clone(), "/books").await, StatusCode::OK);
        assert_eq!(get_status(router.clone(), "/books/42").await, StatusCode::OK);
        assert_eq!(get_status(router, "/other").await, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_module_mounting_under_prefix() {
        let module_router = Router::new().route("/", get(|| async { "module" }));

        let router = RouterBuilder::with_prefix("/api")
            .mount_module("rentals", module_router)
            .build();

        assert_eq!(get_status(router.clone(), "/api/rentals").await, StatusCode::OK);
        assert_eq!(get_status(router, "/rentals").await, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_request_id_is_echoed() {
        let router = RouterBuilder::new()
            .route("/health", get(|| async { "ok" }))
            .with_tracing()
            .with_cors()
            .with_request_id()
            .with_timeout(5000)
            .build();

        let response = router
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let request_id = response.headers().get("x-request-id").unwrap();
        assert!(uuid::Uuid::parse_str(request_id.to_str().unwrap()).is_ok());
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"ok");
    }
}
