use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;
use sso_service::token::unix_now;
use sso_service::{
    Configuration, TokenEngine, TokenValidator, ValidatorConfiguration, create_engine,
    resolve_config_path,
};

#[derive(Parser)]
#[command(name = "sso-service")]
#[command(about = "Single sign-on token service")]
struct Cli {
    /// Configuration file (defaults to $SSO_CONFIG, then ./sso.json)
    #[arg(short, long, global = true, env = "SSO_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the configuration and the signing key, then exit
    CheckConfig,
    /// Authenticate a user and print the issued tokens
    Issue {
        #[arg(short, long)]
        user: String,
        #[arg(short, long, env = "SSO_PASSWORD")]
        password: String,
    },
    /// Verify an access token with a public key
    Verify {
        #[arg(long)]
        public_key: PathBuf,
        /// The access token, without the "Bearer " prefix
        token: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("sso_service=info".parse()?)
                .add_directive("ldap3=warn".parse()?),
        )
        .with_max_level(Level::INFO)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::CheckConfig => {
            let path = resolve_config_path(cli.config.as_deref())?;
            info!("Checking configuration {}", path.display());
            let handle = create_engine(&path)?;
            let engine = handle.current().await;
            let kinds: Vec<String> = engine
                .provider_kinds()
                .iter()
                .map(ToString::to_string)
                .collect();
            println!("Configuration {} is valid", path.display());
            println!("  Issuer: {}", engine.issuer());
            println!("  Providers: {}", kinds.join(", "));
        }
        Commands::Issue { user, password } => {
            let path = resolve_config_path(cli.config.as_deref())?;
            let configuration = Configuration::load(&path)?;
            let engine = TokenEngine::new(&configuration)?;

            let identity = engine
                .authenticate(&user, &password)
                .await
                .with_context(|| format!("Authentication failed for {}", user))?;
            let response = engine.enroll(identity).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Commands::Verify { public_key, token } => {
            let validator = TokenValidator::new(&ValidatorConfiguration::new(public_key))?;
            let authorization = format!("Bearer {}", token);
            let identity = validator
                .identify_authorization(Some(&authorization), unix_now())?;
            println!("User: {}", identity.user_name());
            println!("Roles: {}", identity.roles().join(", "));
        }
    }

    Ok(())
}
