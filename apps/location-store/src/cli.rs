use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "location-store",
    version,
    about = "CSV-backed store for marked map locations"
)]
pub struct Args {
    /// Address to listen on (overrides LOCATION_STORE_HTTP_BIND).
    #[arg(long)]
    pub bind: Option<String>,
    /// CSV file holding the saved locations (overrides LOCATION_STORE_CSV_PATH).
    #[arg(long)]
    pub csv_path: Option<PathBuf>,
}
