//! Siteconf CLI
//!
//! Entry point for the `siteconf` command-line tool.

use clap::{Parser, Subcommand};
use siteconf::{Layer, ResolvedConfig, Schema};
use std::path::{Path, PathBuf};
use std::process;

/// Environment variable prefix for the optional env override layer
const ENV_PREFIX: &str = "SITECONF";

#[derive(Parser)]
#[command(name = "siteconf")]
#[command(about = "Layered site-configuration resolver", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a base layer plus override layers into one configuration
    Resolve {
        /// Path to the base layer (site defaults)
        #[arg(long, short = 'b')]
        base: PathBuf,

        /// Override layer, lowest to highest precedence (repeatable)
        #[arg(long = "overlay", short = 'o')]
        overlays: Vec<PathBuf>,

        /// Apply SITECONF_* environment variables as the final layer
        #[arg(long)]
        env: bool,

        /// Write the resolved configuration to this file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Check a single layer against the schema
    Verify {
        /// Path to the layer file
        config: PathBuf,
    },

    /// List the recognized settings
    Keys {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Resolve {
            base,
            overlays,
            env,
            output,
            json,
        } => {
            run_resolve(base, overlays, env, output, json);
        }
        Commands::Verify { config } => {
            run_verify(config);
        }
        Commands::Keys { json } => {
            run_keys(json);
        }
    }
}

fn run_resolve(
    base_path: PathBuf,
    overlay_paths: Vec<PathBuf>,
    env: bool,
    output: Option<PathBuf>,
    json_output: bool,
) {
    let schema = Schema::site();

    // Layers load strictly in sequence; order is precedence.
    let base = load_layer("base", &base_path);

    let mut overlays = Vec::with_capacity(overlay_paths.len() + 1);
    for path in &overlay_paths {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "overlay".to_string());
        overlays.push(load_layer(&name, path));
    }
    if env {
        overlays.push(Layer::from_env("env", ENV_PREFIX));
    }

    let config = match ResolvedConfig::resolve(&schema, &base, &overlays) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Resolution failed: {}", e);
            process::exit(1);
        }
    };

    if let Some(path) = output {
        if let Err(e) = config.write_to_file(&path) {
            eprintln!("Error writing resolved configuration: {}", e);
            process::exit(1);
        }
        eprintln!("Wrote resolved configuration to: {}", path.display());
        return;
    }

    if json_output {
        match config.to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing output: {}", e);
                process::exit(1);
            }
        }
    } else {
        println!("Resolved {} settings from {} layer(s):\n", config.settings().len(), config.sources().len());
        for source in config.sources() {
            match (&source.path, &source.digest) {
                (Some(path), Some(digest)) => {
                    println!("  layer {} ({}) sha256:{}", source.name, path, &digest[..12]);
                }
                _ => println!("  layer {}", source.name),
            }
        }
        println!();
        for (key, value) in config.settings() {
            println!("  {} = {}", key, value);
        }
    }
}

fn run_verify(path: PathBuf) {
    let schema = Schema::site();
    let layer = load_layer("config", &path);

    match ResolvedConfig::resolve(&schema, &layer, &[]) {
        Ok(config) => {
            println!("Configuration valid: {}", path.display());
            println!();
            println!("  Site: {}", config.get_str("site_name").unwrap_or(""));
            println!("  URL: {}", config.get_str("site_url").unwrap_or(""));
            println!("  Theme: {}", config.get_str("theme_path").unwrap_or(""));
            if let Some(plugins) = config.get_str_list("plugins") {
                if !plugins.is_empty() {
                    println!("  Plugins: {}", plugins.join(", "));
                }
            }
            println!(
                "  Feeds: {}",
                if config.get_bool("show_feed").unwrap_or(false) {
                    "enabled"
                } else {
                    "disabled"
                }
            );
        }
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            process::exit(1);
        }
    }
}

fn run_keys(json_output: bool) {
    let schema = Schema::site();

    if json_output {
        let output: Vec<serde_json::Value> = schema
            .iter()
            .map(|s| {
                serde_json::json!({
                    "name": s.name,
                    "type": s.kind.as_str(),
                    "default": s.default,
                    "required": s.required,
                    "nullable": s.nullable,
                    "path": s.path,
                })
            })
            .collect();

        match serde_json::to_string_pretty(&output) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing output: {}", e);
                process::exit(1);
            }
        }
    } else {
        println!("Recognized settings ({} total):\n", schema.len());
        for setting in schema.iter() {
            let mut flags = Vec::new();
            if setting.required {
                flags.push("required");
            }
            if setting.nullable {
                flags.push("nullable");
            }
            if setting.path {
                flags.push("path");
            }
            let flags = if flags.is_empty() {
                String::new()
            } else {
                format!(" [{}]", flags.join(", "))
            };
            println!(
                "  {} ({}){} default: {}",
                setting.name, setting.kind, flags, setting.default
            );
        }
    }
}

fn load_layer(name: &str, path: &Path) -> Layer {
    match Layer::from_toml_file(name, path) {
        Ok(layer) => layer,
        Err(e) => {
            eprintln!("Error loading layer '{}': {}", path.display(), e);
            process::exit(1);
        }
    }
}
