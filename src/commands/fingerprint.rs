use std::path::Path;

use colored::Colorize;

use crate::cli::{Cli, FingerprintCommands};
use crate::error::{MaskfleetError, Result};
use crate::fingerprint::{
    similarity, uniqueness, validate, Fingerprint, FingerprintGenerator, FingerprintOverrides,
};

pub async fn run(cli: &Cli, command: &FingerprintCommands) -> Result<()> {
    match command {
        FingerprintCommands::Generate {
            platform,
            seed,
            overrides,
            output,
            pretty,
        } => {
            generate(
                cli,
                platform.as_deref(),
                *seed,
                overrides.as_deref(),
                output.as_deref(),
                *pretty,
            )
            .await
        }
        FingerprintCommands::Validate { file } => validate_file(cli, file).await,
        FingerprintCommands::Similarity { a, b } => similarity_files(cli, a, b).await,
        FingerprintCommands::Uniqueness { file, population } => {
            uniqueness_files(cli, file, population).await
        }
    }
}

fn load_fingerprint(path: &Path) -> Result<Fingerprint> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        MaskfleetError::InvalidFingerprint(format!("cannot read {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        MaskfleetError::InvalidFingerprint(format!("cannot parse {}: {}", path.display(), e))
    })
}

async fn generate(
    cli: &Cli,
    platform: Option<&str>,
    seed: Option<u64>,
    overrides_path: Option<&Path>,
    output: Option<&Path>,
    pretty: bool,
) -> Result<()> {
    let mut overrides = match overrides_path {
        Some(path) => {
            let content = std::fs::read_to_string(path)?;
            serde_json::from_str::<FingerprintOverrides>(&content).map_err(|e| {
                MaskfleetError::InvalidFingerprint(format!(
                    "cannot parse overrides {}: {}",
                    path.display(),
                    e
                ))
            })?
        }
        None => FingerprintOverrides::default(),
    };

    // --platform wins over the overrides file.
    if let Some(name) = platform {
        overrides.platform = Some(
            name.parse()
                .map_err(MaskfleetError::InvalidFingerprint)?,
        );
    }

    let mut generator = match seed {
        Some(seed) => FingerprintGenerator::with_seed(seed),
        None => FingerprintGenerator::new(),
    };
    let fingerprint = generator.generate(Some(&overrides));

    let json = if pretty || output.is_none() {
        serde_json::to_string_pretty(&fingerprint)?
    } else {
        serde_json::to_string(&fingerprint)?
    };

    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            std::fs::write(path, &json)?;
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({ "status": "written", "path": path.display().to_string() })
                );
            } else {
                println!("{} Fingerprint written to {}", "✓".green(), path.display());
            }
        }
        None => println!("{}", json),
    }

    Ok(())
}

async fn validate_file(cli: &Cli, file: &Path) -> Result<()> {
    let fingerprint = load_fingerprint(file)?;
    let report = validate(&fingerprint);

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        if report.is_valid {
            println!("{} Fingerprint is consistent", "✓".green());
        } else {
            println!("{} Fingerprint is inconsistent", "✗".red());
        }
        for issue in &report.errors {
            println!("  {} {}: {}", "✗".red(), issue.field.bold(), issue.message);
        }
        for issue in &report.warnings {
            println!(
                "  {} {}: {}",
                "!".yellow(),
                issue.field.bold(),
                issue.message
            );
        }
        println!("  score: {}", report.score);
    }

    if !report.is_valid {
        std::process::exit(1);
    }
    Ok(())
}

async fn similarity_files(cli: &Cli, a: &Path, b: &Path) -> Result<()> {
    let fp_a = load_fingerprint(a)?;
    let fp_b = load_fingerprint(b)?;
    let score = similarity(&fp_a, &fp_b);

    if cli.json {
        println!("{}", serde_json::json!({ "similarity": score }));
    } else {
        println!("{:.4}", score);
    }
    Ok(())
}

async fn uniqueness_files(cli: &Cli, file: &Path, population: &[std::path::PathBuf]) -> Result<()> {
    let fingerprint = load_fingerprint(file)?;
    let others: Vec<Fingerprint> = population
        .iter()
        .map(|p| load_fingerprint(p))
        .collect::<Result<_>>()?;

    let score = uniqueness(&fingerprint, &others);

    if cli.json {
        println!(
            "{}",
            serde_json::json!({ "uniqueness": score, "populationSize": others.len() })
        );
    } else {
        println!("{:.1}", score);
    }
    Ok(())
}
