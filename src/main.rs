//! storagecfg - Main entry point
//!
//! Thin driver over the library: load the options and the document, compile,
//! print the requested view.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use storagecfg::cli::{Cli, Commands, OutputFormat};
use storagecfg::config::{self, CompileOptions, PrefixPolicy};
use storagecfg::document::{self, CompiledDocument};
use storagecfg::engine::codegen;

/// Initialize tracing; RUST_LOG overrides the default `info` level
fn init_logger() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_logger();

    let cli = Cli::parse_args();
    debug!("CLI arguments parsed");

    if let Err(e) = run(cli) {
        error!("{:#}", e);
        eprintln!("✗ {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let options = load_options(cli.options.as_deref(), cli.allow_shared_prefix)?;

    match cli.command {
        Commands::Validate { document } => {
            let compiled = compile_file(&document, &options)?;
            println!(
                "✓ Document is valid: {} components, {} operations",
                compiled.plan().len(),
                compiled.operations().len()
            );
        }
        Commands::Plan { document } => {
            let compiled = compile_file(&document, &options)?;
            for (i, desc) in compiled.plan().descriptors().iter().enumerate() {
                println!(
                    "{}. {} ({}, {})",
                    i + 1,
                    desc.identifier(),
                    desc.component_type(),
                    desc.component_type().role()
                );
            }
        }
        Commands::Emit { document, format } => {
            let compiled = compile_file(&document, &options)?;
            let sequence = compiled.operations();
            match format {
                OutputFormat::Text => println!("{}", sequence.summary()),
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::to_string_pretty(sequence)
                        .context("Failed to serialize operations to JSON")?
                ),
                OutputFormat::Cpp => println!("{}", codegen::render_cpp(sequence)),
            }
        }
        Commands::Route { document, path } => {
            let compiled = compile_file(&document, &options)?;
            let registry = compiled.instantiate()?;
            let (handle, relative) = registry.route(&path)?;
            println!("{} -> {} ({})", path, handle.identifier(), relative);
        }
    }

    Ok(())
}

fn load_options(path: Option<&Path>, allow_shared_prefix: bool) -> Result<CompileOptions> {
    let mut options = match path {
        Some(path) => {
            info!("Loading compile options from: {:?}", path);
            CompileOptions::load_from_file(path)?
        }
        None => CompileOptions::default(),
    };
    if allow_shared_prefix {
        options.prefix_policy = PrefixPolicy::Shared;
    }
    options.validate()?;
    debug!("Prefix policy: {}", options.prefix_policy);
    Ok(options)
}

fn compile_file(path: &Path, options: &CompileOptions) -> Result<CompiledDocument> {
    info!("Compiling document: {:?}", path);
    let root = config::load_document(path)?;
    document::compile(&root, options).with_context(|| format!("Invalid document {:?}", path))
}
