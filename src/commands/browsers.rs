use colored::Colorize;

use crate::cli::Cli;
use crate::error::Result;
use crate::session::discover_all;

pub async fn run(cli: &Cli) -> Result<()> {
    let installs = discover_all();

    if cli.json {
        let entries: Vec<_> = installs
            .iter()
            .map(|install| {
                serde_json::json!({
                    "name": install.kind.name(),
                    "path": install.path.display().to_string(),
                    "version": install.version,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if installs.is_empty() {
        println!("{}", "No Chromium-family browsers found.".dimmed());
        println!("Install Chrome, Brave, or Edge, or set browser.path in the config.");
        return Ok(());
    }

    for install in &installs {
        let version = install.version.as_deref().unwrap_or("unknown version");
        println!(
            "{} {} {} {}",
            "✓".green(),
            install.kind.name().bold(),
            version,
            install.path.display().to_string().dimmed()
        );
    }

    Ok(())
}
