use bmcprobe_core::attributes::Scalar;
use bmcprobe_core::explore::Fetch;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::Settings;
use crate::prelude::{println, *};
use crate::transport::RedfishClient;

/// Chassis queried when none is given. Dell's embedded system chassis.
pub const DEFAULT_CHASSIS: &str = "System.Embedded.1";

/// Fields shown in a chassis summary, in display order.
pub const SUMMARY_FIELDS: &[&str] = &["Manufacturer", "Model", "SKU", "SerialNumber"];

/// Shown for summary fields the chassis does not report.
pub const UNKNOWN: &str = "UNKNOWN";

/// Options for the chassis command
#[derive(Debug, clap::Args, Serialize, Deserialize, Clone)]
pub struct ChassisOptions {
    /// Chassis id, the last segment of its resource path
    #[arg(default_value = DEFAULT_CHASSIS)]
    pub id: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ChassisField {
    pub name: String,
    pub value: String,
}

/// Identity fields of one chassis
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ChassisSummary {
    pub id: String,
    pub fields: Vec<ChassisField>,
}

/// Pick the summary fields out of a chassis document.
pub fn summarize(id: &str, document: &Value) -> ChassisSummary {
    let fields = SUMMARY_FIELDS
        .iter()
        .map(|name| ChassisField {
            name: name.to_string(),
            value: document
                .get(*name)
                .and_then(Scalar::from_json)
                .map(|value| value.to_string())
                .unwrap_or_else(|| UNKNOWN.to_string()),
        })
        .collect();

    ChassisSummary {
        id: id.to_string(),
        fields,
    }
}

pub async fn chassis_data(settings: &Settings, id: &str) -> Result<ChassisSummary> {
    let controller = settings.controller()?;
    let client = RedfishClient::new(&controller, settings.timeout)?;

    let document = client
        .fetch(&f!("Chassis/{id}"))
        .await
        .with_context(|| f!("Failed to read chassis {id} from {controller}"))?;

    Ok(summarize(id, &document))
}

fn format_summary_text(summary: &ChassisSummary) -> String {
    summary
        .fields
        .iter()
        .map(|field| f!("{:15}: {}\n", field.name, field.value))
        .collect()
}

/// Handle the chassis command
pub async fn run(options: ChassisOptions, settings: &Settings) -> Result<()> {
    let summary = chassis_data(settings, &options.id).await?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{}", format_summary_text(&summary));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_summarize_all_fields() {
        let document = json!({
            "Manufacturer": "Dell Inc.",
            "Model": "PowerEdge R740",
            "SKU": "7X9K2",
            "SerialNumber": "CN7475",
            "PowerState": "On",
        });

        let summary = summarize("System.Embedded.1", &document);

        let values: Vec<&str> = summary.fields.iter().map(|f| f.value.as_str()).collect();
        assert_eq!(values, vec!["Dell Inc.", "PowerEdge R740", "7X9K2", "CN7475"]);
    }

    #[test]
    fn test_summarize_missing_fields_are_unknown() {
        let document = json!({"Model": "PowerEdge R640", "SKU": {"nested": true}});

        let summary = summarize("1", &document);

        assert_eq!(summary.fields[0].value, UNKNOWN);
        assert_eq!(summary.fields[1].value, "PowerEdge R640");
        assert_eq!(summary.fields[2].value, UNKNOWN);
        assert_eq!(summary.fields[3].value, UNKNOWN);
    }

    #[test]
    fn test_format_summary_text() {
        let summary = summarize("1", &json!({"Manufacturer": "Dell Inc."}));

        let text = format_summary_text(&summary);

        assert_eq!(
            text,
            "Manufacturer   : Dell Inc.\nModel          : UNKNOWN\nSKU            : UNKNOWN\nSerialNumber   : UNKNOWN\n"
        );
    }
}
