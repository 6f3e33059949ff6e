//! lobup - upload encrypted Win32 application packages
//!
//! This is the CLI front end. It loads configuration, builds the registry and
//! storage clients, and drives the upload pipeline while rendering its events.

mod cli;
mod display;
mod error;
mod events;
mod logging;

use crate::cli::{Cli, Commands};
use crate::display::OutputRenderer;
use crate::error::CliError;
use crate::events::EventHandler;
use clap::Parser;
use lobup_config::Config;
use lobup_events::EventReceiver;
use lobup_net::{AccessToken, BlobClient, NetClient, NetConfig, RegistryClient};
use lobup_types::AppAttributes;
use lobup_upload::{CancellationToken, PipelineSettings, UploadOutcome, UploadPipeline, UploadRequest};
use std::future::Future;
use std::path::Path;
use std::process;
use tokio::select;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    // Parse command line arguments first to check for JSON mode
    let cli = Cli::parse();
    let json_mode = cli.global.json;

    logging::init_tracing(json_mode, cli.global.debug);

    if let Err(e) = run(cli).await {
        error!("Application error: {}", e);
        if json_mode {
            println!("{}", OutputRenderer::error_json(&e));
        } else {
            eprintln!("Error: {e}");
        }
        process::exit(e.exit_code());
    }
}

/// Main application logic
async fn run(cli: Cli) -> Result<(), CliError> {
    info!("Starting lobup v{}", env!("CARGO_PKG_VERSION"));

    // 1. Start with file config (or defaults)
    let mut config = Config::load_or_default(cli.global.config.as_deref()).await?;

    // 2. Merge environment variables
    config.merge_env()?;

    // 3. Apply CLI flags (highest precedence)
    apply_cli_config(&mut config, &cli.command)?;

    let colors_enabled = !cli.global.no_color && console::Term::stderr().features().colors_supported();
    let renderer = OutputRenderer::new(cli.global.json, colors_enabled);

    match cli.command {
        Commands::Upload {
            archive,
            app,
            token,
            ..
        } => {
            let token = token.ok_or_else(|| {
                CliError::InvalidArguments(
                    "a registry token is required (--token or LOBUP_TOKEN)".to_string(),
                )
            })?;
            let attributes = load_attributes(&app).await?;
            let request = UploadRequest {
                archive,
                attributes,
            };

            let mut event_handler = EventHandler::new(colors_enabled, cli.global.json);
            let outcome = upload(&config, token, request, &mut event_handler).await?;
            renderer.render_outcome(&outcome)?;
        }
        Commands::Inspect { archive } => {
            let extracted = lobup_package::extract(&archive, &config.scratch_root()).await?;
            let rendered = renderer.render_package(&extracted);
            if let Err(e) = extracted.scratch.remove().await {
                warn!(error = %e, "failed to remove scratch directory");
            }
            rendered?;
        }
    }

    info!("Command completed successfully");
    Ok(())
}

/// Build the clients and run the pipeline, rendering events as they arrive
async fn upload(
    config: &Config,
    token: String,
    request: UploadRequest,
    event_handler: &mut EventHandler,
) -> Result<UploadOutcome, CliError> {
    let net = NetClient::new(NetConfig::from(config))?;
    let registry = RegistryClient::new(
        net.clone(),
        config.registry.base_url.clone(),
        AccessToken::new(token),
    );
    let blob = BlobClient::new(net);

    let (event_sender, event_receiver) = lobup_events::channel();
    let pipeline = UploadPipeline::new(registry, blob, PipelineSettings::from(config))
        .with_events(event_sender);

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling upload");
            interrupt.cancel();
        }
    });

    let run = async {
        pipeline
            .run(&request, &cancel)
            .await
            .map_err(CliError::from)
    };
    execute_with_events(run, event_receiver, event_handler).await
}

/// Drive `command` to completion while handling events concurrently
async fn execute_with_events<T>(
    command: impl Future<Output = Result<T, CliError>>,
    mut event_receiver: EventReceiver,
    event_handler: &mut EventHandler,
) -> Result<T, CliError> {
    let mut command_future = Box::pin(command);

    loop {
        select! {
            result = &mut command_future => {
                // Drain any remaining events
                while let Ok(event) = event_receiver.try_recv() {
                    event_handler.handle_event(&event);
                }
                return result;
            }

            event = event_receiver.recv() => {
                match event {
                    Some(event) => event_handler.handle_event(&event),
                    None => { /* Channel closed: keep waiting for command to finish */ }
                }
            }
        }
    }
}

/// Read application attributes from a TOML or JSON descriptor
async fn load_attributes(path: &Path) -> Result<AppAttributes, CliError> {
    let contents = tokio::fs::read_to_string(path).await?;
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        serde_json::from_str(&contents).map_err(|e| {
            CliError::InvalidArguments(format!("{}: {e}", path.display()))
        })
    } else {
        toml::from_str(&contents).map_err(|e| {
            CliError::InvalidArguments(format!("{}: {e}", path.display()))
        })
    }
}

/// Apply CLI configuration overrides (highest precedence)
fn apply_cli_config(config: &mut Config, command: &Commands) -> Result<(), CliError> {
    if let Commands::Upload {
        registry_url,
        chunk_size,
        ..
    } = command
    {
        if let Some(url) = registry_url {
            config.registry.base_url.clone_from(url);
        }
        if let Some(size) = chunk_size {
            config.upload.chunk_size = *size;
            config.upload.large_file_chunk_size = *size;
        }
    }

    config.validate()?;
    Ok(())
}
