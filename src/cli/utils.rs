use serde_json::{json, Value};

use crate::cli::OutputFormat;
use crate::database::migrator::MigrationStatus;

/// Output a success message in the appropriate format
pub fn output_success(
    output_format: &OutputFormat,
    message: &str,
    data: Option<Value>,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });
            if let (Some(Value::Object(extra)), Some(object)) = (data, response.as_object_mut()) {
                object.extend(extra);
            }
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("OK {}", message);
        }
    }
    Ok(())
}

/// Print one line per migration: applied time or `Pending`.
pub fn output_status(output_format: &OutputFormat, statuses: &[MigrationStatus]) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let rows: Vec<Value> = statuses
                .iter()
                .map(|s| {
                    json!({
                        "version": s.version,
                        "name": s.name,
                        "applied_at": s.applied_at,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&json!({ "migrations": rows }))?);
        }
        OutputFormat::Text => {
            println!("    {:<24} {:<20} Migration", "Applied At", "Version");
            println!("    {}", "=".repeat(72));
            for status in statuses {
                let applied = status
                    .applied_at
                    .map(|at| at.format("%a %b %e %H:%M:%S %Y").to_string())
                    .unwrap_or_else(|| "Pending".to_string());
                println!("    {:<24} {:<20} {}", applied, status.version, status.name);
            }
        }
    }
    Ok(())
}
