//! Configuration display.

use std::path::Path;

use anyhow::Result;
use interalpha_config::{ConfigLoader, InterAlphaConfig};

pub fn show(config: &InterAlphaConfig, explicit: Option<&Path>) -> Result<()> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = explicit {
        loader = loader.with_config_file(path);
    }
    let sources = loader.sources();
    if sources.is_empty() {
        println!("# No config files found; built-in defaults and IA_* variables apply.");
    } else {
        for source in sources {
            println!("# source: {}", source.display());
        }
    }
    print!("{}", config.to_toml()?);
    Ok(())
}
