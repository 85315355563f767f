use super::Parser;

/// Session server for the demo login routes.
#[derive(Parser, Debug)]
#[command(name = "countersign")]
pub struct Cli {
    /// Settings file, TOML.
    #[arg(long)]
    pub settings: Option<String>,
    /// Bind address, overrides `http.address`.
    #[arg(long)]
    pub address: Option<String>,
}
