//! Template command - resolve and validate the renderer document.

use std::path::PathBuf;

use console::style;

use pinpoint::asset::AssetHtmlLoader;

use super::common::{asset_source, load_config, runtime};
use crate::error::CliError;

/// Run the template command.
pub fn run(directory: Option<PathBuf>, print: bool) -> Result<(), CliError> {
    let config = load_config();
    let loader = AssetHtmlLoader::with_name(
        asset_source(directory, &config),
        config.assets.template.clone(),
    );

    let html = runtime()?.block_on(loader.load_template())?;

    if print {
        println!("{}", html);
        return Ok(());
    }

    println!("{}", style("Renderer template").bold());
    println!("  Source: {}", loader.source_description());
    println!("  Name:   {}", loader.name());
    println!("  Size:   {} bytes, {} lines", html.len(), html.lines().count());
    println!("  Status: {}", style("valid").green());
    Ok(())
}
