pub mod error;
pub mod events;
pub mod provisioner;
pub mod resolver;
pub mod tenant_registry;

pub use error::TenantError;
pub use events::{TenantEvent, TenantEventListener};
pub use provisioner::{
    FailedTable, JoinTablePlanner, JoinTableRequirement, ProvisionReport, TableWarning, TenantProvisioner,
};
pub use resolver::TenantResolver;
pub use tenant_registry::{NewTenant, TenantRegistry};
