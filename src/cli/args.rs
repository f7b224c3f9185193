use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "cogcat",
    version,
    about = "Normalize rasters to COGs and publish them as a STAC collection/item"
)]
pub struct CliArgs {
    /// Input rasters, containers or subdataset strings (space- or comma-separated)
    #[arg(required = true)]
    pub inputs: Vec<String>,

    /// Catalog root where `assets/` and `items/` are written
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Collection identifier
    #[arg(long, default_value = "LS-DF")]
    pub collection_id: String,

    /// Item identifier (<SERVICE_UID>_<YYYYMMDD> or <SERVICE_UID>_<YYYYMMDDTHHMMSS>d<mmm>)
    #[arg(long, conflicts_with = "auto_item_id")]
    pub item_id: Option<String>,

    /// Generate an ad-hoc item id from --service-uid and the current UTC time
    #[arg(long, default_value_t = false)]
    pub auto_item_id: bool,

    /// Service UID used for generated item ids (e.g., LS-DF-SB-S1)
    #[arg(long)]
    pub service_uid: Option<String>,

    /// JSON file with catalog parameters (CRS, thumbnail, processing info)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// JSON file replacing the built-in collection registry
    #[arg(long)]
    pub registry: Option<PathBuf>,

    /// Enable logging (filter with RUST_LOG)
    #[arg(long, default_value_t = false)]
    pub log: bool,
}
