//! lumo-svcctl - control a service on a remote Windows host.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use lumo_svcctl::audit::{AuditEntry, AuditLogger};
use lumo_svcctl::config::Settings;
use lumo_svcctl::context::OperationContext;
use lumo_svcctl::controller::{GatedController, OperationKind, OperationOutcome, ServiceController};
use lumo_svcctl::error::{ControlError, TransportErrorKind};
use lumo_svcctl::executor::{host_reachable, CommandLineExecutor};
use lumo_svcctl::storage::{InventoryStore, Storage};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const NAME: &str = env!("CARGO_PKG_NAME");

#[derive(Parser, Debug)]
#[command(name = "lumo-svcctl", version, about = "Control services on remote Windows hosts")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "/etc/lumo/svcctl.toml")]
    config: PathBuf,

    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand, Debug)]
enum Action {
    /// Stop a service
    Stop(Target),
    /// Start a service
    Start(Target),
    /// Stop a running service and start it again
    Restart(Target),
    /// Print the current status of a service
    Status(Target),
}

#[derive(clap::Args, Debug)]
struct Target {
    /// Server id from the inventory
    #[arg(long = "host")]
    host_id: String,

    /// Service name as the remote service manager knows it
    service: String,
}

impl Action {
    fn target(&self) -> &Target {
        match self {
            Self::Stop(t) | Self::Start(t) | Self::Restart(t) | Self::Status(t) => t,
        }
    }

    fn operation(&self) -> Option<OperationKind> {
        match self {
            Self::Stop(_) => Some(OperationKind::Stop),
            Self::Start(_) => Some(OperationKind::Start),
            Self::Restart(_) => Some(OperationKind::Restart),
            Self::Status(_) => None,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match Settings::load(&cli.config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(&settings) {
        eprintln!("Error initializing logging: {}", e);
        return ExitCode::FAILURE;
    }

    info!(version = VERSION, config = %cli.config.display(), "Starting {}", NAME);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to create Tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(async_main(settings, cli.action)) {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "Request failed");
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn async_main(settings: Settings, action: Action) -> Result<ExitCode, ControlError> {
    let store = InventoryStore::from_settings(&settings)?;
    let target = action.target();
    let server = store.get_server(&target.host_id).await?;
    let identity = store
        .get_service(&target.host_id, &target.service)
        .await?
        .identity();

    if !host_reachable(&server.address, server.port, settings.remote.probe_timeout()).await {
        return Err(ControlError::transport(TransportErrorKind::Unreachable {
            address: server.address.clone(),
            port: server.port,
        }));
    }

    let executor = CommandLineExecutor::for_server(&settings.remote, &server);
    let controller = GatedController::new(ServiceController::from_settings(&settings));

    let root = OperationContext::new();
    let ctx = root.with_timeout(settings.control.request_timeout());
    let canceller = root.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling operation");
            canceller.cancel();
        }
    });

    let Some(kind) = action.operation() else {
        let status = controller
            .controller()
            .query(&ctx, &identity, &executor)
            .await?;
        print_json(&serde_json::json!({
            "host_id": identity.host_id,
            "service": identity.service_name,
            "display_name": identity.display_name,
            "status": status,
        }))?;
        return Ok(ExitCode::SUCCESS);
    };

    let audit = if settings.audit.enabled {
        AuditLogger::new(&settings.audit.log_path)?
    } else {
        AuditLogger::disabled()
    };

    let request_id = Uuid::new_v4();
    let started = Instant::now();
    info!(
        request_id = %request_id,
        host_id = %identity.host_id,
        service = %identity.service_name,
        operation = %kind,
        "Executing service operation"
    );

    let outcome = controller
        .execute(&ctx, kind, &identity, &executor, &store)
        .await;

    let entry = AuditEntry::new(request_id, kind, &identity, outcome.clone(), started.elapsed());
    if let Err(e) = audit.log(&entry) {
        warn!(request_id = %request_id, error = %e, "Failed to write audit entry");
    }

    print_json(&outcome)?;
    Ok(exit_code(&outcome))
}

fn exit_code(outcome: &OperationOutcome) -> ExitCode {
    match outcome {
        OperationOutcome::Succeeded { .. } | OperationOutcome::AlreadyInTargetState { .. } => {
            ExitCode::SUCCESS
        }
        OperationOutcome::Conflict { .. } => ExitCode::from(2),
        OperationOutcome::InvalidState { .. } => ExitCode::from(3),
        OperationOutcome::Failed { .. } => ExitCode::FAILURE,
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), ControlError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Initialize logging based on settings.
///
/// Logs go to stderr so stdout carries only the JSON result.
fn init_logging(settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));

    match settings.logging.format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .try_init()?;
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty().with_writer(std::io::stderr))
                .try_init()?;
        }
    }

    Ok(())
}
