use serde::Serialize;
use serde_json::json;

use crate::cli::OutputFormat;

/// Confirmation line in text mode, `{success, message, data}` in JSON mode
pub fn output_success<T: Serialize>(output_format: OutputFormat, message: &str, data: Option<T>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({ "success": true, "message": message });
            if let Some(data) = data {
                response["data"] = serde_json::to_value(data)?;
            }
            output_json(&response)
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
            Ok(())
        }
    }
}

/// Nothing to list: `{<collection>: []}` in JSON mode so scripts can still parse it
pub fn output_empty_collection(output_format: OutputFormat, collection: &str, message: &str) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => output_json(&json!({ collection: [] })),
        OutputFormat::Text => {
            println!("{}", message);
            Ok(())
        }
    }
}

pub fn output_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
