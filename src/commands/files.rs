//! File Commands
//!
//! Listing of contract files uploaded to the backend.

use contract_risk_pipeline::ContractFile;

use crate::models::response::CommandResponse;
use crate::state::AppState;
use crate::utils::error::AppError;

/// List contract files. Scoped to the current user unless `all_users`.
pub async fn list_contract_files(
    state: &AppState,
    all_users: bool,
) -> CommandResponse<Vec<ContractFile>> {
    let uid = if all_users { None } else { Some(state.user_id()) };
    match state.files().list_files(uid).await {
        Ok(files) => CommandResponse::ok(files),
        Err(e) => {
            tracing::warn!("File listing failed: {}", e);
            CommandResponse::err(AppError::from(e).to_string())
        }
    }
}
