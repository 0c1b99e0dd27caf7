use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use forumbot_chat::{GatewayError, MaxGateway, Router, RouterSettings, SurveyService, UpdatePoller};
use forumbot_core::config::{AppConfig, ConfigError, LoadOptions};
use forumbot_store::{CsvFeedbackLog, DialogStore, UserRegistry};

pub struct Application {
    pub config: AppConfig,
    pub router: Arc<Router>,
    pub poller: UpdatePoller,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("gateway setup failed: {0}")]
    Gateway(#[from] GatewayError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!("starting application bootstrap");

    let users = Arc::new(UserRegistry::open(config.storage.users_path()));
    let dialogs = Arc::new(DialogStore::open(config.storage.dialogs_path()));
    let feedback_log = Arc::new(CsvFeedbackLog::new(config.storage.feedback_path()));
    info!(
        registered_users = users.len().await,
        active_dialogs = dialogs.active_dialogs().await,
        data_dir = %config.storage.data_dir.display(),
        "storage opened"
    );

    let gateway = Arc::new(MaxGateway::new(
        config.gateway.api_base_url.clone(),
        config.gateway.bot_token.clone(),
        Duration::from_secs(config.gateway.request_timeout_secs),
    )?);

    let survey = SurveyService::new(dialogs, feedback_log, gateway.clone());
    let router = Arc::new(Router::new(
        users,
        survey,
        gateway,
        RouterSettings {
            registration_url: config.content.registration_url.clone(),
            question_form_url: config.content.question_form_url.clone(),
            track_images: config.content.track_images.clone(),
            admin_id: config.broadcast.admin_id,
            send_delay: Duration::from_millis(config.broadcast.send_delay_ms),
        },
    ));

    let poller = UpdatePoller::new(
        config.gateway.api_base_url.clone(),
        config.gateway.bot_token.clone(),
        Duration::from_secs(config.gateway.poll_timeout_secs),
        router.clone(),
    )?;

    Ok(Application { config, router, poller })
}
