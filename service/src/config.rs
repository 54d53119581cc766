use clap::builder::TypedValueParser as _;
use clap::Parser;
use dotenvy::dotenv;
use log::LevelFilter;
use wxopen_auth::credential::{PlatformKind, RetrySettings, ReturnCode};
use wxopen_auth::session::SessionSettings;

/// Upper bound for `--session-ttl-days`, about a century.
const MAX_SESSION_TTL_DAYS: i64 = 36_500;

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap()),
        )]
    pub log_level_filter: LevelFilter,

    /// Days a mini-program session stays valid after creation or its last read
    #[arg(
        long,
        env,
        default_value_t = SessionSettings::DEFAULT_TTL_DAYS,
        value_parser = clap::value_parser!(i64).range(1..=MAX_SESSION_TTL_DAYS),
    )]
    pub session_ttl_days: i64,

    /// Prefix applied to session keys in the shared cache
    #[arg(long, env, default_value = SessionSettings::DEFAULT_KEY_PREFIX)]
    pub session_key_prefix: String,

    /// Platform whose first registered AppId is used when a call names none
    #[arg(
        long,
        env,
        default_value_t = PlatformKind::WxOpen,
        value_parser = clap::builder::PossibleValuesParser::new(["mp", "wx_open", "open", "work"])
            .map(|s| s.parse::<PlatformKind>().unwrap()),
        )]
    pub platform: PlatformKind,

    /// Platform errcodes that mean the access token was rejected and should be refreshed
    #[arg(
        long,
        env,
        value_delimiter = ',',
        use_value_delimiter = true,
        default_value = "40001"
    )]
    pub invalid_credential_codes: Vec<i32>,

    /// Return invalid-credential results to the caller instead of refreshing and retrying once
    #[arg(long, env)]
    pub disable_credential_retry: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    /// Settings for the session store.
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            ttl: chrono::Duration::days(self.session_ttl_days),
            key_prefix: self.session_key_prefix.clone(),
        }
    }

    /// Settings for the access token retry wrapper.
    pub fn retry_settings(&self) -> RetrySettings {
        RetrySettings {
            platform: self.platform,
            invalid_credential_codes: self
                .invalid_credential_codes
                .iter()
                .copied()
                .map(ReturnCode)
                .collect(),
            retry_on_failure: !self.disable_credential_retry,
        }
    }
}
