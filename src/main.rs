use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use registro_client::config::{ClientConfig, ConfigError};
use registro_client::notify::StderrNotifier;
use registro_client::records::{self, ClientProfile, TherapySession};
use registro_client::state::token::FilePersistence;
use registro_client::{RegisterProfile, Role, RouteDecision, SessionError, SessionGate};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("not logged in; run `registro login` first")]
    NotLoggedIn,
    #[error("backend unreachable: {0}")]
    Unreachable(String),
    #[error("failed to read {path}: {source}")]
    ReadInput { path: PathBuf, source: std::io::Error },
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "registro", about = "Registro Violeta session gate and records CLI")]
struct Cli {
    /// Backend base URL. Falls back to REGISTRO_API_URL, then http://localhost:8001.
    #[arg(long, env = "REGISTRO_BACKEND_URL")]
    base_url: Option<String>,

    /// File holding the persisted bearer token.
    #[arg(long, env = "REGISTRO_TOKEN_FILE", default_value = ".registro_token")]
    token_file: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Probe backend liveness.
    Health,
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "REGISTRO_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Register(RegisterArgs),
    /// Print the identity behind the stored credential.
    Whoami,
    Logout,
    Sessions(SessionsCommand),
    Profiles(ProfilesCommand),
}

#[derive(Args, Debug)]
struct RegisterArgs {
    #[arg(long)]
    email: String,
    #[arg(long, env = "REGISTRO_PASSWORD", hide_env_values = true)]
    password: String,
    #[arg(long)]
    name: String,
    #[arg(long)]
    surname: String,
    /// terapeuta, psicologo, abogado or admin.
    #[arg(long, default_value = "terapeuta")]
    role: Role,
    #[arg(long)]
    organization: String,
}

#[derive(Args, Debug)]
struct SessionsCommand {
    #[command(subcommand)]
    command: SessionsSubcommand,
}

#[derive(Subcommand, Debug)]
enum SessionsSubcommand {
    List {
        #[arg(long)]
        client_code: Option<String>,
    },
    Get {
        id: String,
    },
    /// Create a session record from a JSON file (`-` for stdin).
    Create {
        #[arg(long)]
        file: PathBuf,
    },
}

#[derive(Args, Debug)]
struct ProfilesCommand {
    #[command(subcommand)]
    command: ProfilesSubcommand,
}

#[derive(Subcommand, Debug)]
enum ProfilesSubcommand {
    List,
    /// Create a client profile from a JSON file (`-` for stdin).
    Create {
        #[arg(long)]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match cli.base_url.as_deref() {
        Some(url) => ClientConfig::with_base_url(url)?,
        None => ClientConfig::from_env()?,
    };
    let persistence = Box::new(FilePersistence::new(&cli.token_file));
    let gate = SessionGate::from_config(&config, persistence, Arc::new(StderrNotifier))?;
    tracing::debug!(
        base_url = %config.base_url,
        token_file = %cli.token_file.display(),
        stored_credential = gate.has_credential(),
        "starting"
    );

    match cli.command {
        Command::Health => run_health(&gate).await,
        Command::Login { email, password } => {
            let identity = gate.login(&email, &password).await?;
            print_json(&identity)
        }
        Command::Register(args) => run_register(&gate, args).await,
        Command::Whoami => {
            require_session(&gate).await?;
            print_json(&gate.identity())
        }
        Command::Logout => {
            let changed = gate.logout();
            print_json(&json!({ "logged_out": changed }))
        }
        Command::Sessions(cmd) => run_sessions(&gate, cmd).await,
        Command::Profiles(cmd) => run_profiles(&gate, cmd).await,
    }
}

async fn run_health(gate: &SessionGate) -> Result<(), CliError> {
    let report = gate.check_health().await;
    print_json(&report)?;
    if report.reachable {
        Ok(())
    } else {
        Err(CliError::Unreachable(report.detail.unwrap_or_default()))
    }
}

async fn run_register(gate: &SessionGate, args: RegisterArgs) -> Result<(), CliError> {
    let profile = RegisterProfile {
        email: args.email,
        password: args.password,
        name: args.name,
        surname: args.surname,
        role: args.role,
        organization: args.organization,
    };
    gate.register(&profile).await?;
    print_json(&json!({ "registered": profile.email }))
}

async fn run_sessions(gate: &SessionGate, cmd: SessionsCommand) -> Result<(), CliError> {
    require_session(gate).await?;
    match cmd.command {
        SessionsSubcommand::List { client_code } => {
            print_json(&records::list_sessions(gate, client_code.as_deref()).await?)
        }
        SessionsSubcommand::Get { id } => print_json(&records::get_session(gate, &id).await?),
        SessionsSubcommand::Create { file } => {
            let session: TherapySession = read_payload(&file)?;
            print_json(&records::create_session(gate, &session).await?)
        }
    }
}

async fn run_profiles(gate: &SessionGate, cmd: ProfilesCommand) -> Result<(), CliError> {
    require_session(gate).await?;
    match cmd.command {
        ProfilesSubcommand::List => print_json(&records::list_profiles(gate).await?),
        ProfilesSubcommand::Create { file } => {
            let profile: ClientProfile = read_payload(&file)?;
            print_json(&records::create_profile(gate, &profile).await?)
        }
    }
}

/// Resolve the stored credential and apply the gatekeeper.
async fn require_session(gate: &SessionGate) -> Result<(), CliError> {
    gate.bootstrap().await;
    match gate.route_decision() {
        RouteDecision::Render => Ok(()),
        RouteDecision::Loading | RouteDecision::Redirect { .. } => Err(CliError::NotLoggedIn),
    }
}

fn read_payload<T: DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let read_err = |source: std::io::Error| CliError::ReadInput { path: path.to_path_buf(), source };
    let raw = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf).map_err(read_err)?;
        buf
    } else {
        std::fs::read_to_string(path).map_err(read_err)?
    };
    Ok(serde_json::from_str(&raw)?)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
