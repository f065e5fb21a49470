use clap::Parser;

#[derive(Parser, Debug, Clone, Default)]
#[command(
    name = "map-sync",
    version,
    about = "Street + satellite marker controller driven from the terminal"
)]
pub struct Args {
    /// Base URL of the location store (overrides MAP_SYNC_STORE_URL).
    #[arg(long)]
    pub store_url: Option<String>,
    /// Start with an empty list instead of fetching saved locations.
    #[arg(long, default_value_t = false)]
    pub skip_initial_load: bool,
}
