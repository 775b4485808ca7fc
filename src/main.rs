use clap::Parser;
use rewards_bootstrap::bootstrap::{bootstrap, Bootstrap};
use rewards_bootstrap::cli::{Cli, Commands};
use rewards_bootstrap::infra::secrets::redact_secret;
use rewards_bootstrap::logging;
use rewards_bootstrap::server::HttpServer;
use serde_json::json;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    logging::init(cli.global.log_format);

    match cli.command {
        Commands::Resolve(opts) => {
            let boot = bootstrap(&cli.global.bootstrap_options()).await?;
            if opts.json {
                println!("{}", serde_json::to_string_pretty(&resolution_json(&boot))?);
            } else {
                print_resolution(&boot);
            }
        }
        Commands::Serve => {
            info!("Starting Rewards API");
            let boot = bootstrap(&cli.global.bootstrap_options()).await?;
            HttpServer::new(&boot).run_until_shutdown().await?;
        }
        Commands::Version => {
            println!("rewards-bootstrap {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

fn resolution_json(boot: &Bootstrap) -> serde_json::Value {
    let resolution = &boot.resolution;
    let properties: serde_json::Map<String, serde_json::Value> = resolution
        .properties
        .iter()
        .map(|(k, v)| (k.to_string(), json!(redact_secret(v))))
        .collect();
    let layers: Vec<_> = boot
        .environment
        .property_sources()
        .iter()
        .map(|s| json!({ "name": s.name(), "properties": s.properties().len() }))
        .collect();

    json!({
        "profile": resolution.profile.as_ref().map(|p| p.as_str()),
        "primaryTier": resolution.primary_tier.map(|t| t.as_str()),
        "directOverride": resolution.direct_override,
        "properties": properties,
        "layers": layers,
    })
}

fn print_resolution(boot: &Bootstrap) {
    let resolution = &boot.resolution;
    println!(
        "profile:         {}",
        resolution.profile.as_ref().map_or("<none>", |p| p.as_str())
    );
    println!(
        "primary tier:    {}",
        resolution.primary_tier.map_or("<none>", |t| t.as_str())
    );
    println!("direct override: {}", resolution.direct_override);

    println!("layers:");
    for source in boot.environment.property_sources().iter() {
        println!("  {} ({} properties)", source.name(), source.properties().len());
    }

    if !resolution.is_empty() {
        println!("resolved properties:");
        for (key, value) in resolution.properties.iter() {
            println!("  {key} = {}", redact_secret(value));
        }
    }
}
