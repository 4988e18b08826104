//! Alibi — incident management backbone for camera surveillance networks.
//!
//! # Usage
//!
//! ```bash
//! alibi serve
//! alibi simulator start --scenario normal_day --rate 30 --seed 7
//! alibi simulator replay events.jsonl
//! alibi users add --username jdoe --role operator
//! ```
//!
//! # Environment variables
//!
//! - `ALIBI_DATA_DIR`: directory holding the JSONL logs, `users.json`,
//!   `.jwt_secret` and `settings.json` (default: `./data`).
//! - `ALIBI_CONFIG`: path to a settings JSON file, overriding
//!   `<data_dir>/settings.json`.
//! - `ALIBI_JWT_SECRET`: overrides the on-disk signing secret.
//! - `ALIBI_LOG_LEVEL`: tracing filter (default: `info`).
//! - `ALIBI_LLM_API_KEY`: bearer credential for the optional LLM backend.

use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info};

use alibi::context::AppContext;
use alibi::simulator::{ScenarioPreset, SimulatorParams};
use alibi::types::Role;

#[derive(Parser, Debug)]
#[command(name = "alibi")]
#[command(about = "Incident management backbone for camera surveillance networks")]
#[command(version)]
struct CliArgs {
    #[command(subcommand)]
    command: Command,

    /// Directory holding the JSONL logs and settings (overrides ALIBI_DATA_DIR).
    #[arg(long, global = true, env = "ALIBI_DATA_DIR", default_value = "./data")]
    data_dir: std::path::PathBuf,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server.
    Serve {
        /// Override the bind address from settings.json (host:port).
        #[arg(long)]
        addr: Option<String>,
    },
    /// Control the event simulator.
    Simulator {
        #[command(subcommand)]
        action: SimulatorAction,
    },
    /// Manage users.
    Users {
        #[command(subcommand)]
        action: UsersAction,
    },
}

#[derive(Subcommand, Debug)]
enum SimulatorAction {
    /// Start the generator.
    Start {
        #[arg(long, default_value = "normal_day")]
        scenario: String,
        #[arg(long, default_value_t = 30.0)]
        rate: f64,
        #[arg(long, default_value_t = 1)]
        seed: u64,
    },
    /// Stop the generator.
    Stop,
    /// Replay a JSONL file through ingestion.
    Replay {
        file: std::path::PathBuf,
    },
}

#[derive(Subcommand, Debug)]
enum UsersAction {
    /// Add a user.
    Add {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        #[arg(long, default_value = "operator")]
        role: String,
    },
    /// Disable a user.
    Disable {
        #[arg(long)]
        username: String,
    },
    /// Reset a user's password.
    Reset {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
}

fn parse_scenario(raw: &str) -> Option<ScenarioPreset> {
    match raw {
        "quiet_shift" => Some(ScenarioPreset::QuietShift),
        "normal_day" => Some(ScenarioPreset::NormalDay),
        "busy_evening" => Some(ScenarioPreset::BusyEvening),
        "security_incident" => Some(ScenarioPreset::SecurityIncident),
        "mixed_events" => Some(ScenarioPreset::MixedEvents),
        _ => None,
    }
}

fn parse_role(raw: &str) -> Option<Role> {
    match raw {
        "operator" => Some(Role::Operator),
        "supervisor" => Some(Role::Supervisor),
        "admin" => Some(Role::Admin),
        _ => None,
    }
}

fn init_tracing(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();
    let log_level = std::env::var("ALIBI_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    init_tracing(&log_level);

    let ctx = match AppContext::open(&args.data_dir) {
        Ok(ctx) => Arc::new(ctx),
        Err(e) => {
            error!("failed to open application context: {e:#}");
            return ExitCode::from(3);
        }
    };

    match args.command {
        Command::Serve { addr } => run_serve(ctx, addr).await,
        Command::Simulator { action } => run_simulator(ctx, action).await,
        Command::Users { action } => run_users(ctx, action).await,
    }
}

async fn run_serve(ctx: Arc<AppContext>, addr_override: Option<String>) -> ExitCode {
    let addr = addr_override.unwrap_or_else(|| {
        let settings = ctx.settings.load();
        format!("{}:{}", settings.api.host, settings.api.port)
    });

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("failed to bind {addr}: {e}");
            return ExitCode::from(3);
        }
    };

    info!(%addr, "alibi listening");
    let app = alibi::api::create_app(ctx.clone());
    let supervisor = ctx.supervisor.clone();

    let heartbeat_hub = ctx.hub.clone();
    let heartbeat_cancel = supervisor.token();
    tokio::spawn(async move { heartbeat_hub.run_heartbeat(heartbeat_cancel).await });

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            supervisor.wait_for_shutdown_signal().await;
        })
        .await;

    ctx.hub.publish_shutdown();
    match result {
        Ok(()) => {
            info!("alibi shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("server error: {e}");
            ExitCode::from(3)
        }
    }
}

async fn run_simulator(ctx: Arc<AppContext>, action: SimulatorAction) -> ExitCode {
    match action {
        SimulatorAction::Start { scenario, rate, seed } => {
            let Some(scenario) = parse_scenario(&scenario) else {
                error!("unknown scenario {scenario}");
                return ExitCode::from(2);
            };
            let settings = Arc::new((*ctx.settings.load()).clone());
            let params = SimulatorParams {
                scenario,
                rate_per_minute: rate,
                seed,
            };
            match ctx
                .simulator
                .start(params, ctx.store.clone(), ctx.hub.clone(), settings, ctx.llm.clone(), ctx.clock.clone())
                .await
            {
                Ok(()) => {
                    info!("simulator started");
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    error!("failed to start simulator: {e}");
                    ExitCode::from(3)
                }
            }
        }
        SimulatorAction::Stop => match ctx.simulator.stop().await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("failed to stop simulator: {e}");
                ExitCode::from(3)
            }
        },
        SimulatorAction::Replay { file } => {
            let blob = match std::fs::read_to_string(&file) {
                Ok(blob) => blob,
                Err(e) => {
                    error!("failed to read {}: {e}", file.display());
                    return ExitCode::from(2);
                }
            };
            let settings = ctx.settings.load();
            let report = ctx
                .simulator
                .replay(&blob, &ctx.store, &ctx.hub, &settings, ctx.llm.as_ref())
                .await;
            info!(accepted = report.accepted, errors = report.errors.len(), "replay complete");
            for error in &report.errors {
                error!("replay error: {error}");
            }
            ExitCode::SUCCESS
        }
    }
}

async fn run_users(ctx: Arc<AppContext>, action: UsersAction) -> ExitCode {
    match action {
        UsersAction::Add { username, password, role } => {
            let Some(role) = parse_role(&role) else {
                error!("unknown role {role}");
                return ExitCode::from(2);
            };
            match ctx.identity.users.add(&username, &password, role) {
                Ok(()) => {
                    info!("user {username} created");
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    error!("failed to create user: {e}");
                    ExitCode::from(4)
                }
            }
        }
        UsersAction::Disable { username } => match ctx.identity.users.set_enabled(&username, false) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("failed to disable user: {e}");
                ExitCode::from(4)
            }
        },
        UsersAction::Reset { username, password } => match ctx.identity.users.set_password(&username, &password) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("failed to reset password: {e}");
                ExitCode::from(4)
            }
        },
    }
}
