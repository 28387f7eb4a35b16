use crate::error::{IntakeError, Result};
use crate::oracle::ExistenceOracle;
use crate::request::ActionRequest;
use crate::workspace::Workspace;

/// Check that `request` can be materialized at its requested version.
///
/// The checkout slot is reset first so a stale clone from an earlier request
/// cannot mask a failure. Oracle failures are terminal; nothing is retried.
pub fn validate(
    oracle: &impl ExistenceOracle,
    request: &ActionRequest,
    workspace: &Workspace,
) -> Result<()> {
    workspace.reset()?;
    tracing::info!(name = %request.name, version = %request.version, "checking action is available");

    oracle
        .resolve(&request.name, &request.version, &workspace.checkout_dir())
        .map_err(|cause| IntakeError::ValidationFailed {
            name: request.name.clone(),
            version: request.version.clone(),
            cause,
        })?;

    if workspace.strip_vcs_metadata()? {
        tracing::debug!(name = %request.name, "stripped version-control metadata");
    }
    Ok(())
}

/// Validate every request in order, stopping at the first failure.
pub fn validate_all(
    oracle: &impl ExistenceOracle,
    requests: &[ActionRequest],
    workspace: &Workspace,
) -> Result<()> {
    for request in requests {
        validate(oracle, request, workspace)?;
    }
    Ok(())
}
