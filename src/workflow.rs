//! The daily triage workflow: two sequential steps.
//!
//! Step 1 runs the concierge agent over the inbox and calendar; step 2
//! formats its text output into the delivered report. Retries belong to
//! the engine driving the steps, not to this layer — a failed step
//! surfaces its error and the engine re-runs it. Duplicate drafts or
//! events on a re-run are tolerated; nothing here carries an idempotency
//! key.

use chrono::Utc;
use serde::Serialize;

use crate::agent::llm::ChatClient;
use crate::agent::tools::ToolRegistry;
use crate::agent::{Agent, AgentError};

/// Final output of a triage run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriageReport {
    pub generated_at: String,
    pub body: String,
}

const CONCIERGE_INSTRUCTIONS: &str = "\
You are an inbox concierge. Work through the user's recent email and \
today's calendar, then report back.

- List recent messages, read the ones that look substantive, and file \
them under a fitting label (create the label if needed).
- Draft a short reply when a message clearly asks for one. Never draft \
twice for the same thread.
- Check today's calendar; when an email asks for a meeting, add a \
tentative event.
- Finish with a concise briefing: what arrived, what you filed, what \
you drafted, what's on the calendar.";

pub fn concierge_agent() -> Agent {
    Agent::new("concierge", CONCIERGE_INSTRUCTIONS.to_string())
}

/// Step 1: run the agent over today's inbox and calendar.
pub async fn triage_step(
    client: &ChatClient,
    registry: &ToolRegistry,
) -> Result<String, AgentError> {
    let today = Utc::now().format("%A, %B %-d, %Y");
    let prompt = format!(
        "Today is {}. Triage my inbox and tell me what needs my attention.",
        today
    );
    log::info!("workflow step 1/2: triage");
    concierge_agent().run(client, registry, &prompt).await
}

/// Step 2: format the agent's text into the delivered report.
pub fn format_step(raw: &str) -> TriageReport {
    let generated_at = Utc::now().to_rfc3339();
    let body = format!("# Daily triage\n\n_{}_\n\n{}", generated_at, raw.trim());
    TriageReport { generated_at, body }
}

/// Run both steps in order.
pub async fn run_daily_triage(
    client: &ChatClient,
    registry: &ToolRegistry,
) -> Result<TriageReport, AgentError> {
    let raw = triage_step(client, registry).await?;
    log::info!("workflow step 2/2: format");
    Ok(format_step(&raw))
}
