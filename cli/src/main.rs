use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use tracing::warn;
use wms_gateway::{
    AuthClient, Gateway, GatewayConfig, GatewayError, Method, NewUser, Report, Resource, Resources, SessionStore,
};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("missing credentials; pass --username/--password or set WMS_USERNAME/WMS_PASSWORD")]
    MissingCredentials,
    #[error("not authorized: {0}; sign in again")]
    Unauthorized(String),
    #[error("{0}")]
    Gateway(GatewayError),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

impl From<GatewayError> for CliError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Authorization(reason) => Self::Unauthorized(reason),
            other => Self::Gateway(other),
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "wms-cli", about = "Warehouse management API CLI")]
struct Cli {
    #[arg(long, env = "WMS_API_BASE_URL", default_value = "http://localhost:3000")]
    base_url: String,

    #[arg(long, env = "WMS_AUTH_PREFIX", default_value = "/auth")]
    auth_prefix: String,

    #[arg(long, env = "WMS_USERNAME")]
    username: Option<String>,

    #[arg(long, env = "WMS_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and print the session user.
    Signin,
    /// Register a new account; the backend then sends an OTP.
    Signup(SignupArgs),
    /// Confirm a one-time password.
    VerifyOtp {
        #[arg(long)]
        username: String,
        #[arg(long)]
        otp: String,
    },
    /// Raw request against any route.
    Api(ApiCommand),
    /// CRUD on a named resource (warehouse, customer, inventory, staff, logs, ...).
    Resource(ResourceCommand),
    /// Fetch a report (stock-summary, low-capacity-alerts).
    Report { report: String },
}

#[derive(Args, Debug)]
struct SignupArgs {
    #[arg(long)]
    username: String,
    #[arg(long)]
    email: String,
    #[arg(long, env = "WMS_SIGNUP_PASSWORD", hide_env_values = true)]
    password: String,
    #[arg(long)]
    role: Option<String>,
}

#[derive(Args, Debug)]
struct ApiCommand {
    #[command(subcommand)]
    command: ApiSubcommand,
}

#[derive(Subcommand, Debug)]
enum ApiSubcommand {
    Get {
        path: String,
    },
    Post {
        path: String,
        #[arg(long)]
        data: String,
    },
    Patch {
        path: String,
        #[arg(long)]
        data: String,
    },
    Delete {
        path: String,
    },
}

#[derive(Args, Debug)]
struct ResourceCommand {
    #[command(subcommand)]
    command: ResourceSubcommand,
}

#[derive(Subcommand, Debug)]
enum ResourceSubcommand {
    List {
        resource: String,
    },
    Create {
        resource: String,
        #[arg(long)]
        data: String,
    },
    Update {
        resource: String,
        id: String,
        #[arg(long)]
        data: String,
    },
    Delete {
        resource: String,
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = GatewayConfig::from_lookup(|key| match key {
        "WMS_API_BASE_URL" => Some(cli.base_url.clone()),
        "WMS_AUTH_PREFIX" => Some(cli.auth_prefix.clone()),
        other => std::env::var(other).ok(),
    })?;
    let gateway = Gateway::from_config(SessionStore::new(), &config)?;

    let mut ended = gateway.session_ended();
    tokio::spawn(async move {
        if let Ok(signal) = ended.recv().await {
            warn!(reason = %signal.reason, "session ended");
        }
    });

    match cli.command {
        Command::Signin => {
            sign_in(cli.username.as_deref(), cli.password.as_deref(), &gateway, &config).await?;
            println!("signed in as {}", gateway.session().username().unwrap_or_default());
            Ok(())
        }
        Command::Signup(args) => {
            let user = NewUser { username: args.username, email: args.email, password: args.password, role: args.role };
            let body = AuthClient::new(&gateway, &config)
                .sign_up(&user)
                .await?;
            print_json(&body)
        }
        Command::VerifyOtp { username, otp } => {
            AuthClient::new(&gateway, &config)
                .verify_otp(&username, &otp)
                .await?;
            println!("verified {username}");
            Ok(())
        }
        Command::Api(api) => {
            sign_in(cli.username.as_deref(), cli.password.as_deref(), &gateway, &config).await?;
            run_api(&gateway, api).await
        }
        Command::Resource(resource) => {
            sign_in(cli.username.as_deref(), cli.password.as_deref(), &gateway, &config).await?;
            run_resource(&gateway, resource).await
        }
        Command::Report { report } => {
            sign_in(cli.username.as_deref(), cli.password.as_deref(), &gateway, &config).await?;
            let report = report
                .parse::<Report>()
                .map_err(CliError::InvalidArgument)?;
            let body = Resources::new(&gateway).report(report).await?;
            print_json(&body)
        }
    }
}

async fn sign_in(
    username: Option<&str>,
    password: Option<&str>,
    gateway: &Gateway,
    config: &GatewayConfig,
) -> Result<(), CliError> {
    let (Some(username), Some(password)) = (username, password) else {
        return Err(CliError::MissingCredentials);
    };
    AuthClient::new(gateway, config)
        .sign_in(username, password)
        .await?;
    Ok(())
}

async fn run_api(gateway: &Gateway, api: ApiCommand) -> Result<(), CliError> {
    let (method, path, body) = match api.command {
        ApiSubcommand::Get { path } => (Method::GET, path, None),
        ApiSubcommand::Post { path, data } => (Method::POST, path, Some(parse_data(&data)?)),
        ApiSubcommand::Patch { path, data } => (Method::PATCH, path, Some(parse_data(&data)?)),
        ApiSubcommand::Delete { path } => (Method::DELETE, path, None),
    };
    let json = gateway
        .request(method, &normalize_path(&path), body)
        .await?;
    print_json(&json)
}

async fn run_resource(gateway: &Gateway, resource: ResourceCommand) -> Result<(), CliError> {
    let resources = Resources::new(gateway);
    let json = match resource.command {
        ResourceSubcommand::List { resource } => resources.list(parse_resource(&resource)?).await?,
        ResourceSubcommand::Create { resource, data } => {
            resources
                .create(parse_resource(&resource)?, parse_data(&data)?)
                .await?
        }
        ResourceSubcommand::Update { resource, id, data } => {
            resources
                .update(parse_resource(&resource)?, &id, parse_data(&data)?)
                .await?
        }
        ResourceSubcommand::Delete { resource, id } => {
            resources
                .delete(parse_resource(&resource)?, &id)
                .await?
        }
    };
    print_json(&json)
}

fn parse_resource(raw: &str) -> Result<Resource, CliError> {
    raw.parse::<Resource>()
        .map_err(CliError::InvalidArgument)
}

fn parse_data(raw: &str) -> Result<Value, CliError> {
    let value = serde_json::from_str::<Value>(raw)?;
    if !value.is_object() && !value.is_array() {
        return Err(CliError::InvalidArgument("--data must be a JSON object or array".to_owned()));
    }
    Ok(value)
}

fn normalize_path(path: &str) -> String {
    if path.starts_with('/') { path.to_owned() } else { format!("/{path}") }
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
