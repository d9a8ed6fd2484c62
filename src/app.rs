use crate::application::use_cases::flows::LlmRequirementFlows;
use crate::application::use_cases::workspace::Workspace;
use crate::domain::error::Result;
use crate::infrastructure::config::{AppConfig, ConfigService};
use crate::infrastructure::llm_clients::RouterClient;
use crate::interfaces::http::start_server;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

pub fn run() {
    let _ = dotenvy::dotenv();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    if let Err(e) = serve() {
        error!(error = %e, "reqpilot stopped");
        std::process::exit(1);
    }
}

fn serve() -> Result<()> {
    let config = AppConfig::load()?;
    let llm_config = ConfigService::new().resolve_llm_config(&config.llm);
    info!(
        provider = %llm_config.provider,
        model = %llm_config.model,
        base_url = %llm_config.base_url,
        "LLM configured"
    );

    let flows = Arc::new(LlmRequirementFlows::new(
        Arc::new(RouterClient::new()),
        llm_config,
    ));
    let workspace = Arc::new(Workspace::new(flows, config.ingestion.chunk_size));

    actix_web::rt::System::new().block_on(async move {
        let server = start_server(workspace, &config.http)?;
        server.await
    })?;
    Ok(())
}
