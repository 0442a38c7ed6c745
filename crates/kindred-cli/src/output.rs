use kindred_db::ApiReply;
use serde::Serialize;

use crate::cli::OutputFormat;

/// Render a serializable response to a string in the requested format.
pub fn render<T: Serialize>(value: &T, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(value)?),
        OutputFormat::Raw => Ok(serde_json::to_string(value)?),
    }
}

/// Print a serializable response in the requested format.
pub fn output<T: Serialize>(value: &T, format: OutputFormat) -> anyhow::Result<()> {
    let rendered = render(value, format)?;
    println!("{rendered}");
    Ok(())
}

/// Print a surface reply body and report whether it succeeded.
pub fn reply(reply: &ApiReply, format: OutputFormat) -> anyhow::Result<bool> {
    output(&reply.body, format)?;
    if !reply.is_success() {
        tracing::warn!(status = reply.status.code(), "request failed");
    }
    Ok(reply.is_success())
}
