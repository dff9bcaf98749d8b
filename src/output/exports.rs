use anyhow::Result;
use std::io::Write;

use crate::insights::RunInsights;

/// Writes the insights as JSON, durations in seconds.
pub fn export_json(insights: &RunInsights, pretty: bool, output: &mut dyn Write) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(insights)?
    } else {
        serde_json::to_string(insights)?
    };
    writeln!(output, "{json}")?;
    Ok(())
}
