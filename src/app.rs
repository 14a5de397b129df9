use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::AppConfig;
use crate::database::{DatabaseManager, DatabaseRouter};
use crate::handlers::{elevated, protected, public};
use crate::middleware::{resolve_tenant_middleware, route_database_middleware, session_middleware};
use crate::schema::{DeclarationSource, SchemaSynthesizer, TypeFamilies};
use crate::services::{TenantProvisioner, TenantRegistry, TenantResolver};

/// Shared services handed to every middleware and handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub databases: Arc<DatabaseManager>,
    pub registry: Arc<TenantRegistry>,
    pub resolver: TenantResolver,
    pub router: DatabaseRouter,
    pub provisioner: Arc<TenantProvisioner>,
}

impl AppState {
    /// Wire the services for `config`. The provisioner listens to registry
    /// events, so registering a tenant provisions its database.
    pub fn new(config: AppConfig, source: Arc<dyn DeclarationSource>) -> Self {
        let databases = Arc::new(DatabaseManager::new(config.database.clone()));
        let synthesizer = SchemaSynthesizer::new(TypeFamilies::from_config(&config.tenancy));
        let provisioner = Arc::new(TenantProvisioner::new(databases.clone(), source, synthesizer));

        let registry = Arc::new(
            TenantRegistry::new(
                databases.clone(),
                Duration::from_secs(config.tenancy.registry_cache_ttl_secs),
            )
            .with_listener(provisioner.clone()),
        );

        Self {
            config: Arc::new(config),
            resolver: TenantResolver::new(registry.clone()),
            router: DatabaseRouter::new(databases.clone()),
            databases,
            registry,
            provisioner,
        }
    }
}

/// Full HTTP application. Layers run outermost first: trace, CORS, session,
/// tenant resolution, database routing, then the handler.
pub fn app(state: AppState) -> Router {
    let router = Router::new()
        // Public
        .route("/", get(public::root))
        .route("/health", get(public::health))
        // Tenant-scoped
        .merge(tenant_routes())
        // Root
        .merge(root_routes())
        .layer(from_fn_with_state(state.clone(), route_database_middleware))
        .layer(from_fn_with_state(state.clone(), resolve_tenant_middleware))
        .layer(from_fn_with_state(state.clone(), session_middleware));

    let router = if state.config.security.enable_cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    };

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

fn tenant_routes() -> Router<AppState> {
    Router::new()
        .route("/api/tenant", get(protected::tenant::current))
        .route(
            "/api/data/:type",
            get(protected::data::schema_get).post(protected::data::schema_post),
        )
}

fn root_routes() -> Router<AppState> {
    use elevated::root::tenant;

    Router::new()
        .route("/api/root/tenant", get(tenant::tenant_list).post(tenant::tenant_create))
        .route(
            "/api/root/tenant/:slug",
            get(tenant::tenant_show).put(tenant::tenant_update),
        )
        .route("/api/root/tenant/:slug/provision", post(tenant::tenant_provision))
}
