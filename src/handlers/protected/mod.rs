// handlers/protected/mod.rs - Tenant-scoped handlers
//
// Every handler here extracts `RequiredTenant`, so a request that resolved
// no tenant is rejected with TENANT_MISSING before any database access.

pub mod data;
pub mod tenant;
