use std::process::ExitCode;
use std::sync::Arc;

use mailroom::agent::llm::ChatClient;
use mailroom::agent::tools::ToolRegistry;
use mailroom::workflow;
use mailroom::TokenCache;

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let client = match ChatClient::from_env() {
        Ok(client) => client,
        Err(e) => {
            log::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let cache = Arc::new(TokenCache::from_registry());
    let registry = ToolRegistry::new(cache);

    match workflow::run_daily_triage(&client, &registry).await {
        Ok(report) => {
            println!("{}", report.body);
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("daily triage failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
