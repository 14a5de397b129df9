// handlers/elevated/root/tenant/provision.rs - POST /api/root/tenant/:slug/provision

use axum::extract::{Path, State};

use super::parse_slug;
use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult, RootUser};
use crate::services::ProvisionReport;

/// Run the provisioner for a registered tenant and return its report.
/// Responds 207 when some tables failed.
pub async fn tenant_provision(
    State(state): State<AppState>,
    _root: RootUser,
    Path(slug): Path<String>,
) -> ApiResult<ProvisionReport> {
    let tenant = state.registry.get(&parse_slug(&slug)?).await?;
    let report = state.provisioner.provision_current(&tenant.slug).await?;

    if report.is_success() {
        Ok(ApiResponse::success(report))
    } else {
        Ok(ApiResponse::multi_status(report))
    }
}
