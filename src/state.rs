//! Application State
//!
//! Services shared by every command: the effective configuration, the user
//! identity, the session controller and the file listing client.

use std::sync::Arc;

use contract_risk_pipeline::{
    build_http_client, endpoint_url, FileListingClient, HttpPipelineTransport, PipelineTransport,
};

use crate::models::settings::AppConfig;
use crate::services::identity::UserIdentity;
use crate::services::session_controller::SessionController;
use crate::utils::error::{AppError, AppResult};

pub struct AppState {
    config: AppConfig,
    identity: Arc<dyn UserIdentity>,
    controller: Arc<SessionController>,
    files: FileListingClient,
}

impl AppState {
    /// Wire services against the real backend described by `config`.
    pub fn from_config(config: AppConfig, identity: Arc<dyn UserIdentity>) -> AppResult<Self> {
        config.validate().map_err(AppError::config)?;

        let timeout = config.request_timeout();
        let transport = HttpPipelineTransport::from_settings(
            &config.backend_url,
            &config.chat_path,
            config.proxy.as_ref(),
            timeout,
        )?;

        // Listing is a short request; it never shares the stream timeout.
        let files_client = build_http_client(config.proxy.as_ref(), None)?;
        let files_url = endpoint_url(&config.backend_url, &config.files_path)?;
        let files = FileListingClient::new(files_client, files_url);

        Ok(Self::with_transport(config, identity, Arc::new(transport), files))
    }

    /// Wire services against an arbitrary transport.
    pub fn with_transport(
        config: AppConfig,
        identity: Arc<dyn UserIdentity>,
        transport: Arc<dyn PipelineTransport>,
        files: FileListingClient,
    ) -> Self {
        let controller =
            SessionController::new(transport).with_stage_clear_grace(config.stage_clear_grace());
        Self {
            config,
            identity,
            controller: Arc::new(controller),
            files,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn user_id(&self) -> &str {
        self.identity.user_id()
    }

    pub fn controller(&self) -> Arc<SessionController> {
        Arc::clone(&self.controller)
    }

    pub fn files(&self) -> &FileListingClient {
        &self.files
    }
}
