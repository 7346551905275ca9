//! # vlab CLI
//!
//! Demo de mezcla HCl + NaOH y utilidades para crear muestras y listar el
//! catálogo de contenedores.
mod report;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use vlab_adapters::{LlmReasoningBackend, ScriptedBackend};
use vlab_core::{CombineAction, CombineActionParameters, ContainerContext, EngineConfig, ReasoningBackend,
                SampleContext, SimulationEngine};
use vlab_domain::Quantity;
use vlab_policies::{ContainerCatalog, InMemoryCatalog};

#[derive(Parser)]
#[command(name = "vlab")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Container catalog in JSON (defaults to the built-in laboratory set)
    #[arg(long, global = true, env = "VLAB_CATALOG")]
    catalog: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mix 1 L of hydrochloric acid with 1 L of sodium hydroxide
    Demo {
        /// Use the canned neutralization answer instead of the LLM
        #[arg(long)]
        offline: bool,

        /// Skip the reasoning backend and mix volumes only
        #[arg(long)]
        no_simulate: bool,
    },

    /// Create a sample from a material description and print it
    Sample {
        #[arg(long)]
        name: String,

        /// Material format, e.g. "37% HCl in water"
        #[arg(long)]
        material: String,

        /// Optional declared volume, e.g. "500 mL"
        #[arg(long)]
        volume: Option<String>,
    },

    /// List the container catalog
    Containers,
}

/// `RUST_LOG` manda; sin él (o si no se entiende), info o debug con `--verbose`.
fn log_filter(verbose: bool, rust_log: Option<&str>) -> EnvFilter {
    rust_log.and_then(|directives| EnvFilter::try_new(directives).ok())
            .unwrap_or_else(|| EnvFilter::new(if verbose { "debug" } else { "info" }))
}

fn load_catalog(path: Option<&PathBuf>) -> Result<InMemoryCatalog, Box<dyn std::error::Error>> {
    Ok(match path {
        Some(p) => InMemoryCatalog::from_json_file(p)?,
        None => InMemoryCatalog::laboratory_default()?,
    })
}

fn build_engine(catalog: InMemoryCatalog, backend: Arc<dyn ReasoningBackend>)
                -> Result<SimulationEngine, Box<dyn std::error::Error>> {
    let engine = SimulationEngine::builder().shared_backend(backend)
                                            .catalog(catalog)
                                            .config(EngineConfig::from_env())
                                            .build()?;
    Ok(engine)
}

async fn run_demo(engine: &SimulationEngine, simulate: bool) -> Result<(), Box<dyn std::error::Error>> {
    println!("\n=== Mixing Simulation Demo ===");
    let acid = engine.create_sample("Hydrochloric Acid", &SampleContext::new("100% HCl"))?;
    println!("Acid:\n{}", report::render_sample(&acid));
    let base = engine.create_sample("Sodium Hydroxide", &SampleContext::new("100% NaOH"))?;
    println!("Base:\n{}", report::render_sample(&base));

    let params = CombineActionParameters::new().with_volume(acid.name(), Quantity::liters(1.0)?)
                                               .with_volume(base.name(), Quantity::liters(1.0)?);
    let action = CombineAction::new("Combine", vec![acid, base], params);

    let container = engine.determine_container("combine", &ContainerContext::for_action(&action))?;
    println!("{}", report::render_container(&container));

    let result = action.with_container(container).execute(engine, simulate).await;
    println!("{}", report::render_combine_result(&result));
    tracing::info!(status = ?result.status, events = result.events.len(), "combine finished");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let filter = log_filter(cli.verbose, std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref());
    tracing_subscriber::fmt().with_env_filter(filter).try_init().map_err(|e| -> Box<dyn std::error::Error> { e })?;

    let catalog = load_catalog(cli.catalog.as_ref())?;
    match cli.command {
        Commands::Demo { offline, no_simulate } => {
            let backend: Arc<dyn ReasoningBackend> = if offline {
                Arc::new(ScriptedBackend::neutralization())
            } else {
                Arc::new(LlmReasoningBackend::from_env())
            };
            log::info!("running demo with backend '{}'", backend.name());
            let engine = build_engine(catalog, backend)?;
            run_demo(&engine, !no_simulate).await?;
        }
        Commands::Sample { name, material, volume } => {
            let engine = build_engine(catalog, Arc::new(ScriptedBackend::neutralization()))?;
            let mut context = SampleContext::new(material);
            if let Some(volume) = volume {
                context = context.with_extra(vlab_core::engine::EXTRA_TOTAL_VOLUME, serde_json::Value::String(volume));
            }
            let sample = engine.create_sample(&name, &context)?;
            println!("{}", report::render_sample(&sample));
        }
        Commands::Containers => {
            for (i, spec) in catalog.entries().iter().enumerate() {
                println!("[{}] {}\n", i + 1, report::render_container(spec));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn test_rust_log_overrides_default_level() {
        assert_eq!(log_filter(false, Some("debug")).max_level_hint(), Some(LevelFilter::DEBUG));
        assert_eq!(log_filter(true, Some("warn")).max_level_hint(), Some(LevelFilter::WARN));
    }

    #[test]
    fn test_default_level_follows_verbose_flag() {
        assert_eq!(log_filter(false, None).max_level_hint(), Some(LevelFilter::INFO));
        assert_eq!(log_filter(true, None).max_level_hint(), Some(LevelFilter::DEBUG));
    }
}
