//! Tool to validate Mini App init data with the bot token.
//!
//! Init data is read from the first argument or from stdin.
//! Parsed init data is printed to stdout as JSON if it's valid.

#![cfg(feature = "executable")]

use std::{
    io::{Read as _, Write as _},
    time::Duration,
};

use color_eyre::{
    Result,
    eyre::{WrapErr as _, eyre},
};
use dotenvy::dotenv;
use tracing::{Level, info, instrument};
use tracing_subscriber::{EnvFilter, FmtSubscriber, filter::LevelFilter};

fn main() -> Result<()> {
    color_eyre::install()?;
    init_logger().wrap_err("Failed to initialize logger")?;

    let _ignored = dotenv();
    let config = Config::from_env()?;

    let raw = read_init_data().wrap_err("Failed to read init data")?;
    let init_data = run(&config, raw.trim())?;

    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &init_data)
        .wrap_err("Failed to print init data")?;
    writeln!(stdout)?;
    Ok(())
}

/// Validate `raw` init data according to `config`.
#[instrument(skip_all)]
fn run(config: &Config, raw: &str) -> Result<miniapp_data_model::InitData> {
    let init_data = miniapp_auth::validate_now(raw, &config.bot_token, config.max_age)
        .wrap_err("Init data is invalid")?;
    info!(
        user_id = init_data.user.as_ref().map(|user| user.id),
        auth_date = init_data.auth_date,
        "Init data is valid"
    );
    Ok(init_data)
}

/// Configuration read from the environment.
struct Config {
    /// Token of the bot the Mini App belongs to.
    bot_token: String,
    /// Maximal age of init data. [`None`] disables the check.
    max_age: Option<Duration>,
}

impl Config {
    /// Read configuration from environment variables.
    fn from_env() -> Result<Self> {
        Ok(Self {
            bot_token: read_env_var("BOT_TOKEN")?,
            max_age: read_max_age_env_var()?,
        })
    }
}

/// Read maximal init data age from environment variable or use default value.
fn read_max_age_env_var() -> Result<Option<Duration>> {
    /// Environment variable to set maximal age in seconds.
    const MAX_AGE_ENV_VAR: &str = "INIT_DATA_MAX_AGE_SECS";
    /// Default maximal age, one day.
    const MAX_AGE_DEFAULT_VALUE: u64 = 24 * 60 * 60;

    let secs = match std::env::var(MAX_AGE_ENV_VAR) {
        Ok(var) if var.is_empty() => {
            info!("`{MAX_AGE_ENV_VAR}` environment variable is empty. Using default value {MAX_AGE_DEFAULT_VALUE}");
            MAX_AGE_DEFAULT_VALUE
        }
        Ok(var) => var.parse().wrap_err_with(|| {
            format!("Failed to parse `{MAX_AGE_ENV_VAR}` environment variable as integer")
        })?,
        Err(std::env::VarError::NotPresent) => {
            info!("`{MAX_AGE_ENV_VAR}` environment variable is not set. Using default value {MAX_AGE_DEFAULT_VALUE}");
            MAX_AGE_DEFAULT_VALUE
        }
        Err(std::env::VarError::NotUnicode(_)) => {
            return Err(eyre!(
                "`{MAX_AGE_ENV_VAR}` environment variable is not in unicode format"
            ));
        }
    };

    if secs == 0 {
        info!("Init data age check is disabled");
        return Ok(None);
    }
    Ok(Some(Duration::from_secs(secs)))
}

/// Read `var` environment variable.
fn read_env_var(var: &str) -> Result<String> {
    std::env::var(var).wrap_err_with(|| format!("Expected `{var}` environment variable"))
}

/// Read init data from the first argument or from stdin if there are no arguments.
fn read_init_data() -> Result<String> {
    if let Some(raw) = std::env::args().nth(1) {
        return Ok(raw);
    }

    let mut raw = String::new();
    std::io::stdin()
        .read_to_string(&mut raw)
        .wrap_err("Failed to read stdin")?;
    Ok(raw)
}

/// Initialize logger.
///
/// Logs go to stderr to keep stdout for the result.
fn init_logger() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::TRACE)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).wrap_err("Failed to set global logger")
}
