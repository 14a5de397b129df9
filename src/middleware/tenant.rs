use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use tracing::debug;

use super::auth::Session;
use crate::app::AppState;
use crate::auth::AuthUser;
use crate::database::models::TenantRecord;
use crate::database::BoundDatabase;
use crate::error::ApiError;

/// Resolver output for a request; set by `resolve_tenant_middleware`
#[derive(Clone, Debug)]
pub struct TenantResolution(pub Option<TenantRecord>);

/// Connection bound for the request; set by `route_database_middleware`
#[derive(Clone, Debug)]
pub struct TenantDb(pub BoundDatabase);

/// Resolve the request's tenant from the session principal, then the routing
/// header. Must run after `session_middleware`.
pub async fn resolve_tenant_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let session = request
        .extensions()
        .get::<Session>()
        .cloned()
        .ok_or(ApiError::PipelineMisconfigured("session middleware"))?;

    let header = request
        .headers()
        .get(state.config.tenancy.header_name.as_str())
        .and_then(|value| value.to_str().ok());

    let tenant = state.resolver.resolve(session.0.as_ref(), header).await?;
    if let Some(tenant) = &tenant {
        debug!("Resolved tenant: {}", tenant.slug);
    }

    request.extensions_mut().insert(TenantResolution(tenant));
    Ok(next.run(request).await)
}

/// Bind the resolved tenant's database for the rest of the request. Must run
/// after `resolve_tenant_middleware`.
pub async fn route_database_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let resolution = request
        .extensions()
        .get::<TenantResolution>()
        .cloned()
        .ok_or(ApiError::PipelineMisconfigured("tenant resolution middleware"))?;

    let response = state
        .router
        .with_tenant(resolution.0.as_ref(), |bound| async move {
            request.extensions_mut().insert(TenantDb(bound));
            next.run(request).await
        })
        .await?;

    Ok(response)
}

/// Extractor for routes that only work with a tenant bound
pub struct RequiredTenant {
    pub tenant: TenantRecord,
    pub db: BoundDatabase,
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for RequiredTenant {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let TenantDb(db) = parts
            .extensions
            .get::<TenantDb>()
            .cloned()
            .ok_or(ApiError::PipelineMisconfigured("database routing middleware"))?;

        match parts.extensions.get::<TenantResolution>() {
            Some(TenantResolution(Some(tenant))) => Ok(Self {
                tenant: tenant.clone(),
                db,
            }),
            Some(TenantResolution(None)) => Err(ApiError::TenantMissing),
            None => Err(ApiError::PipelineMisconfigured("tenant resolution middleware")),
        }
    }
}

/// Extractor for the tenant management routes
pub struct RootUser(pub AuthUser);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for RootUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<Session>() {
            Some(Session(Some(user))) if user.is_root() => Ok(Self(user.clone())),
            Some(Session(Some(_))) => Err(ApiError::forbidden("Root access required")),
            Some(Session(None)) => Err(ApiError::unauthorized("Missing Authorization header")),
            None => Err(ApiError::PipelineMisconfigured("session middleware")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, middleware::from_fn_with_state, routing::get, Router};
    use axum::http::StatusCode;
    use std::sync::Arc;
    use tower::ServiceExt;

    use crate::config::AppConfig;
    use crate::database::DatabaseRouter;
    use crate::middleware::session_middleware;
    use crate::schema::{AttributeKind, ContentTypeDeclaration, StaticDeclarationSource};
    use crate::services::NewTenant;
    use crate::types::TenantSlug;

    async fn bound_tenant() -> String {
        match DatabaseRouter::current() {
            Some(bound) => bound.describe().tenant.unwrap_or_else(|| "registry".to_string()),
            None => "unbound".to_string(),
        }
    }

    async fn needs_tenant(RequiredTenant { tenant, .. }: RequiredTenant) -> String {
        tenant.slug.to_string()
    }

    fn state(root: &tempfile::TempDir) -> AppState {
        let source = StaticDeclarationSource::new(vec![
            ContentTypeDeclaration::new("blog").with_attribute("title", AttributeKind::ShortText),
        ])
        .unwrap();
        AppState::new(AppConfig::for_data_root(root.path()), Arc::new(source))
    }

    fn pipeline(state: AppState) -> Router {
        Router::new()
            .route("/bound", get(bound_tenant))
            .route("/tenant", get(needs_tenant))
            .layer(from_fn_with_state(state.clone(), route_database_middleware))
            .layer(from_fn_with_state(state.clone(), resolve_tenant_middleware))
            .layer(from_fn_with_state(state.clone(), session_middleware))
            .with_state(state)
    }

    async fn call(router: Router, uri: &str, tenant: Option<&str>) -> (StatusCode, String) {
        let mut request = axum::http::Request::builder().uri(uri);
        if let Some(tenant) = tenant {
            request = request.header("x-tenant", tenant);
        }
        let response = router.oneshot(request.body(Body::empty()).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn handlers_see_the_routed_database() {
        let root = tempfile::tempdir().unwrap();
        let state = state(&root);
        state
            .registry
            .register(NewTenant::new(TenantSlug::parse("acme").unwrap()))
            .await
            .unwrap();
        let router = pipeline(state);

        assert_eq!(call(router.clone(), "/bound", None).await, (StatusCode::OK, "registry".to_string()));
        assert_eq!(call(router.clone(), "/bound", Some("acme")).await, (StatusCode::OK, "acme".to_string()));
        assert_eq!(call(router, "/tenant", Some("acme")).await, (StatusCode::OK, "acme".to_string()));

        // Nothing leaks out of the request scope
        assert!(DatabaseRouter::current().is_none());
    }

    #[tokio::test]
    async fn tenant_route_without_tenant_is_rejected() {
        let root = tempfile::tempdir().unwrap();
        let (status, body) = call(pipeline(state(&root)), "/tenant", None).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(body.contains("TENANT_MISSING"));
    }

    #[tokio::test]
    async fn missing_stage_is_reported_not_skipped() {
        let root = tempfile::tempdir().unwrap();
        let state = state(&root);
        // Routing without resolution in front of it
        let router = Router::new()
            .route("/tenant", get(needs_tenant))
            .layer(from_fn_with_state(state.clone(), route_database_middleware))
            .with_state(state);

        let (status, body) = call(router, "/tenant", Some("acme")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.contains("PIPELINE_MISCONFIGURED"));
    }
}
