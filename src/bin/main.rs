use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;
use circleci_auth::config::{self, ConfigKey, mask_token};
use circleci_auth::model::User;
use circleci_auth::{
    CircleClient, DEFAULT_BASE_URL, GetCurrentUserResponse, SecurityProvider, SecurityResolver,
    SecurityScheme, StaticKeyHandler, StaticSecuritySource,
};

#[derive(Parser)]
#[command(name = "circleci-auth")]
#[command(about = "CircleCI API authentication toolkit")]
struct Cli {
    /// Config file (default: ~/.circleci/config.yml)
    #[arg(long, global = true, env = "CIRCLECI_CONFIG")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read or change the CLI configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Show the user owning the configured token
    Me {
        #[arg(long, default_value = DEFAULT_BASE_URL)]
        base_url: String,
        /// Schemes to attach (repeatable)
        #[arg(long = "scheme", value_enum, default_values_t = [SchemeArg::Header])]
        schemes: Vec<SchemeArg>,
        /// Output in JSON format
        #[arg(long, conflicts_with = "yaml")]
        json: bool,
        /// Output in YAML format
        #[arg(long)]
        yaml: bool,
    },
    /// Run a stub API server that authenticates GET /api/v2/me
    Serve {
        #[arg(long, default_value = "127.0.0.1:8080")]
        bind: String,
        /// Accepted API keys, comma separated
        #[arg(long = "api-key", env = "CIRCLECI_AUTH_API_KEYS", value_delimiter = ',', required = true)]
        api_keys: Vec<String>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Set a configuration value
    Set { key: ConfigKey, value: String },
    /// Print the configuration (token masked)
    Show,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SchemeArg {
    Header,
    Query,
    Basic,
}

impl From<SchemeArg> for SecurityScheme {
    fn from(arg: SchemeArg) -> Self {
        match arg {
            SchemeArg::Header => SecurityScheme::ApiKeyHeader,
            SchemeArg::Query => SecurityScheme::ApiKeyQuery,
            SchemeArg::Basic => SecurityScheme::BasicAuth,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("circleci_auth=info".parse()?))
        .with_max_level(Level::INFO)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { action } => match action {
            ConfigAction::Set { key, value } => {
                let config_path = config_path(cli.config)?;
                let mut cfg = config::load_config(&config_path)?;
                cfg.set(key, value);
                config::save_config(&config_path, &cfg)?;
                println!("Updated {}", config_path.display());
            }
            ConfigAction::Show => {
                let config_path = config_path(cli.config)?;
                let cfg = config::load_config(&config_path)?;
                println!("Config: {}", config_path.display());
                println!(
                    "  apiToken:           {}",
                    cfg.get(ConfigKey::ApiToken)
                        .map(mask_token)
                        .unwrap_or_else(|| "-".to_string())
                );
                println!(
                    "  defaultProjectSlug: {}",
                    cfg.get(ConfigKey::DefaultProjectSlug).unwrap_or("-")
                );
            }
        },
        Commands::Me {
            base_url,
            schemes,
            json,
            yaml,
        } => {
            let cfg = config::load_config(&config_path(cli.config)?)?;
            let source = match cfg.resolve_token() {
                Some(token) => StaticSecuritySource::new(token),
                None => StaticSecuritySource::empty(),
            };
            let schemes: Vec<SecurityScheme> = schemes.into_iter().map(Into::into).collect();
            info!("Calling {} with schemes {:?}", base_url, schemes);

            let client = CircleClient::new(&base_url, SecurityProvider::new(Arc::new(source)))?
                .with_schemes(schemes);

            match client.get_current_user().await? {
                GetCurrentUserResponse::Ok(user) => {
                    print!("{}", render_user(&user, OutputFormat::from_flags(json, yaml))?);
                }
                GetCurrentUserResponse::Unauthorized(err) => {
                    anyhow::bail!("Unauthorized: {}", err.message);
                }
                GetCurrentUserResponse::Unexpected { status, body } => {
                    anyhow::bail!("Unexpected response {}: {}", status, body);
                }
            }
        }
        Commands::Serve { bind, api_keys } => {
            let handler = StaticKeyHandler::from_keys(api_keys.iter().filter(|k| !k.is_empty()));
            if handler.is_empty() {
                anyhow::bail!("At least one non-empty --api-key is required");
            }
            info!("Stub server accepting {} API key(s)", handler.len());

            let router = circleci_auth::server::create_stub_router(SecurityResolver::new(Arc::new(handler)));
            let listener = tokio::net::TcpListener::bind(&bind).await?;
            info!("Stub API listening on http://{}/api/v2/me", bind);

            axum::serve(listener, router).await?;
        }
    }

    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
    Yaml,
}

impl OutputFormat {
    fn from_flags(json: bool, yaml: bool) -> Self {
        if json {
            Self::Json
        } else if yaml {
            Self::Yaml
        } else {
            Self::Text
        }
    }
}

fn render_user(user: &User, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Json => format!("{}\n", serde_json::to_string_pretty(user)?),
        OutputFormat::Yaml => serde_yaml::to_string(user)?,
        OutputFormat::Text => format!(
            "  ID:    {}\n  Login: {}\n  Name:  {}\n",
            user.id, user.login, user.name
        ),
    })
}

fn config_path(explicit: Option<PathBuf>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path),
        None => config::resolve_config_path(),
    }
}
