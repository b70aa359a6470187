use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::Context;
use clap::Parser;

/// Generates `vulkan/vulkan.hpp` from the Vulkan XML registry.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Path of the registry document.
    #[arg(default_value = "vk.xml")]
    registry: PathBuf,
}

const OUTPUT: &str = "vulkan/vulkan.hpp";

fn run(args: &Args) -> anyhow::Result<()> {
    log::info!("loading {}", args.registry.display());
    let xml = fs::read(&args.registry)
        .with_context(|| format!("failed to read {}", args.registry.display()))?;
    let header = vkhpp_generator::generate(&xml)?;

    let output = Path::new(OUTPUT);
    if let Some(dir) = output.parent() {
        fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    }
    fs::write(output, header).with_context(|| format!("failed to write {}", output.display()))?;
    log::info!("wrote {}", output.display());
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    match std::panic::catch_unwind(|| run(&args)) {
        Ok(Ok(())) => {}
        Ok(Err(error)) => {
            eprintln!("caught exception: {:#}", error);
            process::exit(1);
        }
        Err(panic) => {
            let message = panic.downcast_ref::<&str>().map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown error".to_owned());
            eprintln!("caught exception: {}", message);
            process::exit(1);
        }
    }
}
