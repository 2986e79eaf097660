use clap::{Parser, ValueEnum};
use dotenvy::dotenv;
use log::LevelFilter;
use std::fmt;

/// Default Google endpoints used when no explicit endpoint is configured.
pub const DEFAULT_AUTHORIZE_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/auth";
pub const DEFAULT_TOKEN_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/token";
pub const DEFAULT_USER_INFO_ENDPOINT: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ProviderChoice {
    Google,
    Generic,
}

impl fmt::Display for ProviderChoice {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ProviderChoice::Google => write!(f, "google"),
            ProviderChoice::Generic => write!(f, "generic"),
        }
    }
}

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Which identity provider variant to sign in with.
    #[arg(long, env, value_enum, default_value_t = ProviderChoice::Google)]
    pub provider: ProviderChoice,

    /// Name reported as the authentication method for the generic provider.
    #[arg(long, env)]
    pub provider_name: Option<String>,

    /// The OAuth client ID issued by the identity provider.
    #[arg(long, env)]
    client_id: Option<String>,

    /// The OAuth client secret issued by the identity provider.
    #[arg(long, env, hide_env_values = true)]
    client_secret: Option<String>,

    /// Absolute URL the provider redirects back to after consent.
    #[arg(long, env)]
    callback_url: Option<String>,

    /// A list of OAuth scopes to request. Empty uses the provider's defaults.
    #[arg(long, env, value_delimiter = ',', use_value_delimiter = true)]
    pub scopes: Vec<String>,

    /// The provider's authorization endpoint.
    #[arg(long, env, default_value = DEFAULT_AUTHORIZE_ENDPOINT)]
    pub authorize_endpoint: String,

    /// The provider's token endpoint.
    #[arg(long, env, default_value = DEFAULT_TOKEN_ENDPOINT)]
    pub token_endpoint: String,

    /// The provider's user info endpoint.
    #[arg(long, env, default_value = DEFAULT_USER_INFO_ENDPOINT)]
    pub user_info_endpoint: String,

    /// Hosted domain hint sent to providers that support one.
    #[arg(long, env)]
    pub domain_restriction: Option<String>,

    /// Email suffixes allowed to sign in. Empty allows every email.
    #[arg(long, env, value_delimiter = ',', use_value_delimiter = true)]
    pub allowed_email_suffixes: Vec<String>,

    /// Timeout in seconds for each call to the identity provider
    #[arg(long, env, default_value_t = 30)]
    pub http_timeout_secs: u64,

    /// Seconds an issued authorization state stays valid
    #[arg(long, env, default_value_t = 600)]
    pub state_ttl_secs: i64,

    /// Where to send the browser after a first-time sign-in or any failure.
    #[arg(long, env, default_value = "/")]
    pub default_redirect: String,

    /// Where to send an already signed-in user who linked another provider.
    #[arg(long, env, default_value = "/account/#identityProviders")]
    pub identity_providers_redirect: String,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(short, long, env, default_value_t = LevelFilter::Info)]
    pub log_level_filter: LevelFilter,
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

    pub fn client_id(&self) -> Option<String> {
        self.client_id.clone()
    }

    pub fn client_secret(&self) -> Option<String> {
        self.client_secret.clone()
    }

    pub fn callback_url(&self) -> Option<String> {
        self.callback_url.clone()
    }

    pub fn set_callback_url(mut self, callback_url: String) -> Self {
        self.callback_url = Some(callback_url);
        self
    }
}
