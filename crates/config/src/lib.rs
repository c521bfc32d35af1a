//! Configuration loading and validation.
//!
//! Sources are layered, lowest precedence first:
//!
//! 1. built-in defaults,
//! 2. a TOML file (explicit path, or `malmeta.toml` in the platform config
//!    directory),
//! 3. `MALMETA_`-prefixed environment variables (`__` separates nested keys,
//!    e.g. `MALMETA_RETRY__COOLDOWN_SECS=30`),
//! 4. the account variables `MAL_USERNAME` and `MAL_CLIENT_ID`.
//!
//! Loading validates everything up front, so a misconfigured process fails
//! before it makes a single request.

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::{OptionExt, ResultExt};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use malmeta_api::{Backoff, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

const CONFIG_FILE: &str = "malmeta.toml";
const ENV_PREFIX: &str = "MALMETA_";
const ACCOUNT_VARS: [&str; 2] = ["MAL_USERNAME", "MAL_CLIENT_ID"];
const DEFAULT_API_BASE: &str = "https://api.myanimelist.net/v2";
const DEFAULT_TOKEN_ENDPOINT: &str = "https://myanimelist.net/v1/oauth2/token";
const DATABASE_FILE: &str = "metadata.sqlite";
const TOKEN_FILE: &str = "token.json";

/// Retry limits and delays as they appear in the configuration file.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub courtesy_delay_secs: u64,
    pub cooldown_secs: u64,
    pub backoff_secs: u64,
    pub max_attempts: u32,
    pub max_generic_retries: u32,
    pub max_alt_title_retries: u32,
}
impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            courtesy_delay_secs: 1,
            cooldown_secs: 60,
            backoff_secs: 5,
            max_attempts: 3,
            max_generic_retries: 5,
            max_alt_title_retries: 3,
        }
    }
}
impl From<RetrySettings> for RetryPolicy {
    fn from(settings: RetrySettings) -> Self {
        Self {
            courtesy_delay: Duration::from_secs(settings.courtesy_delay_secs),
            cooldown: Duration::from_secs(settings.cooldown_secs),
            max_alt_title_retries: settings.max_alt_title_retries,
            max_generic_retries: settings.max_generic_retries,
            backoff: Backoff {
                max_attempts: settings.max_attempts,
                delay: Duration::from_secs(settings.backoff_secs),
            },
        }
    }
}

/// Configuration as merged from all sources, before validation.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
struct Sources {
    username: Option<String>,
    client_id: Option<String>,
    api_base: String,
    token_endpoint: String,
    database: Option<PathBuf>,
    token_file: Option<PathBuf>,
    retry: RetrySettings,
}
impl Default for Sources {
    fn default() -> Self {
        Self {
            username: None,
            client_id: None,
            api_base: DEFAULT_API_BASE.to_string(),
            token_endpoint: DEFAULT_TOKEN_ENDPOINT.to_string(),
            database: None,
            token_file: None,
            retry: RetrySettings::default(),
        }
    }
}

/// Validated configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Account whose token is used for every request.
    pub username: String,
    /// Application client ID, sent as a header and required for token refreshes.
    pub client_id: String,
    /// Base of the API, without a trailing slash.
    pub api_base: Url,
    pub token_endpoint: Url,
    /// SQLite summary cache.
    pub database: PathBuf,
    /// OAuth2 token pair of the account.
    pub token_file: PathBuf,
    pub retry: RetryPolicy,
}

impl Config {
    /// Load configuration from every source. `file` overrides the default
    /// configuration file location, and must exist if given.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        if let Some(file) = file
            && !file.is_file()
        {
            exn::bail!(ErrorKind::FileNotFound(file.to_path_buf()));
        }
        let file = file.map(Path::to_path_buf).or_else(|| project_dirs().map(|d| d.config_dir().join(CONFIG_FILE)));
        Self::from_figment(&Self::figment(file.as_deref()))
    }

    /// All configuration sources, merged in order of precedence.
    pub fn figment(file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Sources::default()));
        if let Some(file) = file {
            tracing::debug!(path = %file.display(), "Reading configuration file");
            figment = figment.merge(Toml::file(file));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__")).merge(
            Env::raw()
                .only(&ACCOUNT_VARS)
                .map(|key| key.as_str().to_ascii_lowercase().trim_start_matches("mal_").to_string().into()),
        )
    }

    /// Extract and validate configuration from a prepared [`Figment`].
    pub fn from_figment(figment: &Figment) -> Result<Self> {
        let sources: Sources = figment.extract().or_raise(|| ErrorKind::Load)?;
        let username = sources
            .username
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .ok_or_raise(|| ErrorKind::MissingUsername)?;
        let client_id = sources
            .client_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or_raise(|| ErrorKind::MissingClientId)?;
        if sources.retry.max_attempts == 0 {
            exn::bail!(ErrorKind::InvalidRetry("max_attempts must be at least 1"));
        }
        let api_base = Url::parse(sources.api_base.trim_end_matches('/')).or_raise(|| ErrorKind::InvalidUrl("api_base"))?;
        let token_endpoint = Url::parse(&sources.token_endpoint).or_raise(|| ErrorKind::InvalidUrl("token_endpoint"))?;
        let database = match sources.database {
            Some(path) => path,
            None => data_dir()?.join(DATABASE_FILE),
        };
        let token_file = match sources.token_file {
            Some(path) => path,
            None => data_dir()?.join(&username).join(TOKEN_FILE),
        };
        Ok(Self {
            username,
            client_id,
            api_base,
            token_endpoint,
            database,
            token_file,
            retry: sources.retry.into(),
        })
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "malmeta")
}

fn data_dir() -> Result<PathBuf> {
    project_dirs().map(|dirs| dirs.data_dir().to_path_buf()).ok_or_raise(|| ErrorKind::NoDataDirectory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::ops::Deref;

    fn from_toml(toml: &str) -> Result<Config> {
        let figment = Figment::from(Serialized::defaults(Sources::default()))
            .merge(Serialized::default("client_id", "test-client"))
            .merge(Toml::string(toml));
        Config::from_figment(&figment)
    }

    #[test]
    fn test_minimal() {
        let config = from_toml(
            r#"
                username = "purplepinapples"
                database = "/tmp/cache.sqlite"
                token_file = "/tmp/token.json"
            "#,
        )
        .unwrap();
        assert_eq!(config.username, "purplepinapples");
        assert_eq!(config.api_base.as_str(), "https://api.myanimelist.net/v2");
        assert_eq!(config.token_endpoint.as_str(), DEFAULT_TOKEN_ENDPOINT);
        assert_eq!(config.database, PathBuf::from("/tmp/cache.sqlite"));
        assert_eq!(config.retry, RetryPolicy::default());
        assert_eq!(config.client_id, "test-client");
    }

    #[test]
    fn test_default_token_file_is_per_account() {
        let Some(dirs) = project_dirs() else {
            return;
        };
        let config = from_toml(r#"username = "someone""#).unwrap();
        assert_eq!(config.token_file, dirs.data_dir().join("someone").join(TOKEN_FILE));
        assert_eq!(config.database, dirs.data_dir().join(DATABASE_FILE));
    }

    #[rstest]
    #[case("")]
    #[case(r#"username = """#)]
    #[case(r#"username = "   ""#)]
    fn test_missing_username(#[case] toml: &str) {
        let err = from_toml(toml).unwrap_err();
        assert!(matches!(err.deref(), ErrorKind::MissingUsername));
    }

    #[rstest]
    #[case(None)]
    #[case(Some(""))]
    #[case(Some("   "))]
    fn test_missing_client_id(#[case] client_id: Option<&str>) {
        let mut figment = Figment::from(Serialized::defaults(Sources::default()))
            .merge(Toml::string("username = \"u\"\ndatabase = \"db\"\ntoken_file = \"t\""));
        if let Some(client_id) = client_id {
            figment = figment.merge(Serialized::default("client_id", client_id));
        }
        let err = Config::from_figment(&figment).unwrap_err();
        assert!(matches!(err.deref(), ErrorKind::MissingClientId));
    }

    #[test]
    fn test_retry_settings() {
        let config = from_toml(
            r#"
                username = "u"
                database = "db"
                token_file = "token.json"

                [retry]
                cooldown_secs = 10
                max_attempts = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.retry.cooldown, Duration::from_secs(10));
        assert_eq!(config.retry.backoff.max_attempts, 5);
        // Unspecified settings keep their defaults.
        assert_eq!(config.retry.courtesy_delay, Duration::from_secs(1));
        assert_eq!(config.retry.max_generic_retries, 5);
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let err = from_toml("username = \"u\"\n[retry]\nmax_attempts = 0").unwrap_err();
        assert!(matches!(err.deref(), ErrorKind::InvalidRetry(_)));
    }

    #[rstest]
    #[case(r#"api_base = "not a url""#, "api_base")]
    #[case(r#"token_endpoint = "::""#, "token_endpoint")]
    fn test_invalid_urls(#[case] line: &str, #[case] field: &'static str) {
        let err = from_toml(&format!("username = \"u\"\ndatabase = \"db\"\ntoken_file = \"t\"\n{line}")).unwrap_err();
        assert_eq!(*err, ErrorKind::InvalidUrl(field));
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let config =
            from_toml("username = \"u\"\ndatabase = \"db\"\ntoken_file = \"t\"\napi_base = \"http://127.0.0.1:8080/v2/\"")
                .unwrap();
        assert_eq!(config.api_base.as_str(), "http://127.0.0.1:8080/v2");
    }

    #[test]
    fn test_explicit_file_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("missing.toml"))).unwrap_err();
        assert!(matches!(err.deref(), ErrorKind::FileNotFound(_)));
    }

    #[test]
    fn test_file_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "username = \"from-file\"\nclient_id = \"c\"\ndatabase = \"db\"\ntoken_file = \"t\"\n").unwrap();
        let config = Config::from_figment(&Config::figment(Some(&path))).unwrap();
        // The MAL_USERNAME environment variable would take precedence if set.
        if std::env::var_os("MAL_USERNAME").is_none() {
            assert_eq!(config.username, "from-file");
        }
    }

    #[test]
    fn test_retry_settings_into_policy() {
        let policy = RetryPolicy::from(RetrySettings::default());
        assert_eq!(policy, RetryPolicy::default());
    }
}
