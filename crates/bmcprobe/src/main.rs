use std::path::PathBuf;

use crate::prelude::{println, *};
use clap::Parser;

mod chassis;
mod config;
mod error;
mod explore;
mod prelude;
mod servers;
mod store;
mod transport;

#[derive(Debug, clap::Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Explore the hardware inventory of Redfish management controllers"
)]
pub struct App {
    #[command(subcommand)]
    pub command: SubCommands,

    #[clap(flatten)]
    global: Global,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// Configuration file (TOML)
    #[clap(long, env = "BMCPROBE_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Controller host name or address
    #[clap(long, env = "BMC_HOST", global = true)]
    host: Option<String>,

    /// Controller user
    #[clap(long, env = "BMC_USER", global = true)]
    user: Option<String>,

    /// Controller password
    #[clap(long, env = "BMC_PASSWORD", global = true, hide_env_values = true)]
    password: Option<String>,

    /// Controller HTTPS port
    #[clap(long, env = "BMC_PORT", global = true)]
    port: Option<u16>,

    /// URL scheme used to reach the controller
    #[clap(long, env = "BMC_SCHEME", global = true)]
    scheme: Option<String>,

    /// Request timeout in seconds
    #[clap(long, env = "BMC_TIMEOUT", global = true)]
    timeout: Option<u64>,

    /// Inventory database path
    #[clap(long, env = "BMCPROBE_DB", global = true)]
    db: Option<PathBuf>,

    /// Whether to display additional information.
    #[clap(long, env = "BMCPROBE_VERBOSE", global = true, default_value = "false")]
    verbose: bool,
}

#[derive(Debug, clap::Parser)]
pub enum SubCommands {
    /// Walk the controller's Redfish service and print its hardware inventory
    Explore(crate::explore::ExploreOptions),

    /// Print the identity of one chassis
    Chassis(crate::chassis::ChassisOptions),

    /// Inventory store operations
    #[clap(subcommand)]
    Servers(crate::servers::Commands),

    /// Mask a secret the way credentials are shown in logs
    Obscure(ObscureOptions),
}

#[derive(Debug, clap::Args)]
pub struct ObscureOptions {
    /// Text to obscure
    text: String,

    /// Characters kept at each end
    #[arg(short, long, default_value = "1")]
    num: usize,

    /// Mask character
    #[arg(short, long, default_value = "*")]
    symbol: char,
}

fn init_logging(debug: bool) {
    let level = if debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
    log::debug!("Debug mode enabled");
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let app = App::parse();
    let settings = config::Settings::load(&app.global)?;
    init_logging(settings.debug || settings.verbose);

    match app.command {
        SubCommands::Explore(options) => crate::explore::run(options, &settings).await,
        SubCommands::Chassis(options) => crate::chassis::run(options, &settings).await,
        SubCommands::Servers(cmd) => crate::servers::run(cmd, &settings),
        SubCommands::Obscure(options) => {
            println!(
                "{}",
                bmcprobe_core::obscure::obscure(&options.text, options.num, options.symbol)
            );
            Ok(())
        }
    }
}
