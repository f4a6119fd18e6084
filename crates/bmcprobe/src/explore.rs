use std::collections::BTreeMap;

use bmcprobe_core::attributes::Attributes;
use bmcprobe_core::explore::{ExploreState, Explorer};
use bmcprobe_core::model::{Inventory, Record, System};
use colored::Colorize;
use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::prelude::{eprintln, println, *};
use crate::store::{save_inventory, SqliteStore};
use crate::transport::RedfishClient;

/// Options for exploring a controller
#[derive(Debug, clap::Args, Serialize, Deserialize, Clone)]
pub struct ExploreOptions {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Save the explored systems to the inventory store
    #[arg(long)]
    pub save: bool,
}

/// Walk the controller's Redfish service and return what was found.
pub async fn explore_data(settings: &Settings) -> Result<Inventory> {
    let controller = settings.controller()?;
    let client = RedfishClient::new(&controller, settings.timeout)?;

    if settings.verbose {
        println!("Exploring {controller}...");
    }

    let mut explorer = Explorer::new(client);
    match explorer.explore().await {
        ExploreState::Aborted => Err(eyre!(
            "Exploration of {} aborted: the service root is unreachable or lists no systems",
            controller
        )),
        _ => Ok(explorer.into_inventory()),
    }
}

fn attribute_table(attributes: &Attributes) -> prettytable::Table {
    let mut table = new_table(prettytable::row!["Attribute", "Value"]);
    for (key, value) in attributes {
        table.add_row(prettytable::row![key, value]);
    }
    table
}

fn record_table(records: &BTreeMap<String, Record>) -> prettytable::Table {
    let mut table = new_table(prettytable::row!["Id", "Attributes"]);
    for (id, record) in records {
        table.add_row(prettytable::row![id, record.attributes]);
    }
    table
}

fn disk_table(disks: &[Record]) -> prettytable::Table {
    let mut table = new_table(prettytable::row!["#", "Attributes"]);
    for (idx, disk) in disks.iter().enumerate() {
        table.add_row(prettytable::row![idx, disk.attributes]);
    }
    table
}

fn push_section(result: &mut String, title: &str, count: usize, table: prettytable::Table) {
    result.push_str(&f!("\n{} ({count})\n", title.green().bold()));
    if count == 0 {
        result.push_str(&f!("  {}\n", "None found.".yellow()));
    } else {
        result.push_str(&table.to_string());
    }
}

fn format_system_text(system: &System) -> String {
    let mut result = String::new();

    result.push_str(&f!("\n{}\n", "=".repeat(80).bright_cyan()));
    result.push_str(&f!("{}\n", f!("SYSTEM {}", system.id).bright_cyan().bold()));
    result.push_str(&f!("{}\n", "=".repeat(80).bright_cyan()));

    let memory = system
        .memory_gib
        .map(|gib| f!("{gib} GiB"))
        .unwrap_or_else(|| "UNKNOWN".to_string());
    result.push_str(&f!("{}: {}\n\n", "Memory".green(), memory));
    result.push_str(&attribute_table(&system.attributes).to_string());

    push_section(
        &mut result,
        "Processors",
        system.processors.len(),
        record_table(&system.processors),
    );
    push_section(
        &mut result,
        "Network interfaces",
        system.network_interfaces.len(),
        record_table(&system.network_interfaces),
    );
    push_section(
        &mut result,
        "Storage controllers",
        system.storage_controllers.len(),
        record_table(&system.storage_controllers),
    );
    push_section(&mut result, "Disks", system.disks.len(), disk_table(&system.disks));

    result
}

/// Human-readable rendering of an inventory.
pub fn format_inventory_text(inventory: &Inventory) -> String {
    let mut result = String::new();

    if let Some(version) = &inventory.api_version {
        result.push_str(&f!("{}: {}\n", "Redfish version".green(), version));
    }
    result.push_str(&f!("Found {} system(s)\n", inventory.systems.len()));

    for system in inventory.systems.values() {
        result.push_str(&format_system_text(system));
    }

    if !inventory.skipped.is_empty() {
        result.push_str(&f!(
            "\n{} {}\n",
            "Skipped unreachable systems:".yellow(),
            inventory.skipped.join(", ")
        ));
    }

    result
}

/// Handle the explore command
pub async fn run(options: ExploreOptions, settings: &Settings) -> Result<()> {
    let inventory = explore_data(settings).await?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&inventory)?);
    } else {
        print!("{}", format_inventory_text(&inventory));
    }

    if options.save {
        let mut store = SqliteStore::open(&settings.db_path)?;
        let summary = save_inventory(&mut store, &inventory)?;
        store.close()?;
        eprintln!(
            "Saved to {}: {} created, {} updated",
            settings.db_path.display(),
            summary.created,
            summary.updated
        );
        if summary.duplicates > 0 {
            eprintln!(
                "{} {} system(s) shared a tag with another system and replaced it",
                "Warning:".yellow(),
                summary.duplicates
            );
        }
    }

    Ok(())
}
