pub mod auth;
pub mod response;
pub mod tenant;

pub use auth::{session_middleware, Session};
pub use response::{ApiResponse, ApiResult};
pub use tenant::{
    resolve_tenant_middleware, route_database_middleware, RequiredTenant, RootUser, TenantDb, TenantResolution,
};
