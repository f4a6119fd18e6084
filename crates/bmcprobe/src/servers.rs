use crate::config::Settings;
use crate::prelude::{println, *};
use crate::store::{InventoryStore, ServerRecord, SqliteStore};

/// Inventory store commands
#[derive(Debug, clap::Subcommand)]
pub enum Commands {
    /// List stored servers
    #[clap(name = "list")]
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one stored server
    #[clap(name = "get")]
    Get {
        /// Server id
        id: i64,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete one stored server
    #[clap(name = "delete")]
    Delete {
        /// Server id
        id: i64,
    },
}

fn print_servers(servers: &[ServerRecord]) {
    if servers.is_empty() {
        println!("No servers stored.");
        return;
    }

    let mut table = new_table(prettytable::row!["Id", "Tag", "System", "Memory (GiB)"]);
    for server in servers {
        let memory = server
            .memory_gib
            .map(|gib| gib.to_string())
            .unwrap_or_else(|| "N/A".to_string());
        table.add_row(prettytable::row![server.id, server.tag, server.system_id, memory]);
    }
    table.printstd();
}

fn print_server(server: &ServerRecord) {
    println!("{:15}: {}", "Id", server.id);
    println!("{:15}: {}", "Tag", server.tag);
    println!("{:15}: {}", "System", server.system_id);
    for (key, value) in &server.attributes {
        println!("{:15}: {}", key, value);
    }
}

/// Run inventory store commands
pub fn run(cmd: Commands, settings: &Settings) -> Result<()> {
    let store = SqliteStore::open(&settings.db_path)?;

    match cmd {
        Commands::List { json } => {
            let servers = store.list()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&servers)?);
            } else {
                print_servers(&servers);
            }
        }
        Commands::Get { id, json } => {
            let server = store
                .read(id)?
                .ok_or_else(|| eyre!("No server with id {}", id))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&server)?);
            } else {
                print_server(&server);
            }
        }
        Commands::Delete { id } => {
            if !store.delete(id)? {
                return Err(eyre!("No server with id {}", id));
            }
            println!("Deleted server {id}");
        }
    }

    store.close()?;
    Ok(())
}
