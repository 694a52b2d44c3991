use owo_colors::OwoColorize;
use serde_json::json;

use super::CommandOutput;
use crate::config::Config;
use crate::error::{Result, TaskboardError};
use crate::service::HttpTicketService;

/// Show the user the configured token belongs to
pub async fn cmd_whoami(output_json: bool) -> Result<()> {
    let config = Config::load()?;
    let credential = config.credential().ok_or(TaskboardError::NotAuthenticated)?;
    let service = HttpTicketService::from_config(&config)?;
    let user = service.fetch_current_user(&credential).await?;

    let text = format!(
        "{} ({}) {}",
        user.email.bold(),
        user.role.cyan(),
        format!("id {}", user.id).dimmed()
    );

    CommandOutput::new(json!({
        "id": user.id,
        "email": user.email,
        "role": user.role,
        "server_url": service.base_url().as_str(),
    }))
    .with_text(text)
    .print(output_json)
}
