use std::{env, str::FromStr, time::Duration};

use url::Url;

use crate::policy::{Policy, DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_PENDING_CHECK_TTL};

use super::env::{
    AppConfig, BackendConfig, BridgeConfig, ConfigError, DirectoryConfig, LoggingConfig,
    SurfaceConfig,
};

const DEFAULT_BACKEND_URL: &str = "http://localhost:5000/";
const DEFAULT_MAX_INBOUND_FRAME: usize = 4 * 1024 * 1024;

pub fn load_config() -> Result<AppConfig, ConfigError> {
    AppConfig::from_lookup(|key| env::var(key).ok())
}

impl AppConfig {
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let base_url = match get("CLASSIFIER_BASE_URL") {
            Some(raw) => parse_url("CLASSIFIER_BASE_URL", &raw)?,
            None => parse_url("CLASSIFIER_BASE_URL", DEFAULT_BACKEND_URL)?,
        };
        let backend = BackendConfig {
            base_url: with_trailing_slash(base_url),
            request_timeout: Duration::from_millis(parse_or(
                "CLASSIFIER_TIMEOUT_MS",
                get("CLASSIFIER_TIMEOUT_MS"),
                5_000u64,
            )?),
            report_timeout: Duration::from_millis(parse_or(
                "REPORT_TIMEOUT_MS",
                get("REPORT_TIMEOUT_MS"),
                30_000u64,
            )?),
        };

        let confidence_threshold = parse_or(
            "CONFIDENCE_THRESHOLD",
            get("CONFIDENCE_THRESHOLD"),
            DEFAULT_CONFIDENCE_THRESHOLD,
        )?;
        if !(0.0..=1.0).contains(&confidence_threshold) {
            return Err(ConfigError::Invalid {
                key: "CONFIDENCE_THRESHOLD",
                reason: format!("{confidence_threshold} is outside [0, 1]"),
            });
        }
        let policy = Policy {
            confidence_threshold,
            pending_check_ttl: Duration::from_secs(parse_or(
                "PENDING_CHECK_TTL_SECS",
                get("PENDING_CHECK_TTL_SECS"),
                DEFAULT_PENDING_CHECK_TTL.as_secs(),
            )?),
        };

        let warning_page = get("WARNING_PAGE_URL").ok_or(ConfigError::Missing("WARNING_PAGE_URL"))?;
        let surface = SurfaceConfig {
            warning_page: parse_url("WARNING_PAGE_URL", &warning_page)?,
        };

        let bridge = BridgeConfig {
            max_inbound_frame: parse_or(
                "MAX_INBOUND_FRAME_BYTES",
                get("MAX_INBOUND_FRAME_BYTES"),
                DEFAULT_MAX_INBOUND_FRAME,
            )?,
        };

        let directories = DirectoryConfig {
            logs_dir: get("LOGS_DIR").unwrap_or_else(|| "logs".to_string()),
        };

        let logging = LoggingConfig {
            level: get("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        };

        Ok(Self {
            backend,
            policy,
            surface,
            bridge,
            directories,
            logging,
        })
    }
}

fn parse_or<T: FromStr>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match raw {
        Some(value) => value.parse::<T>().map_err(|err| ConfigError::Invalid {
            key,
            reason: format!("{value:?}: {err}"),
        }),
        None => Ok(default),
    }
}

fn parse_url(key: &'static str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|err| ConfigError::Invalid {
        key,
        reason: format!("{raw:?}: {err}"),
    })
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    const WARNING: (&str, &str) = ("WARNING_PAGE_URL", "chrome-extension://abc/warning.html");

    #[test]
    fn defaults_apply() {
        let config = load(&[WARNING]).unwrap();
        assert_eq!(config.backend.base_url.as_str(), "http://localhost:5000/");
        assert_eq!(config.backend.request_timeout, Duration::from_secs(5));
        assert_eq!(config.policy.confidence_threshold, 0.7);
        assert_eq!(config.policy.pending_check_ttl, Duration::from_secs(30));
        assert_eq!(config.bridge.max_inbound_frame, 4 * 1024 * 1024);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn warning_page_is_required() {
        assert!(matches!(
            load(&[]),
            Err(ConfigError::Missing("WARNING_PAGE_URL"))
        ));
    }

    #[test]
    fn threshold_must_be_a_probability() {
        let err = load(&[WARNING, ("CONFIDENCE_THRESHOLD", "1.5")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: "CONFIDENCE_THRESHOLD",
                ..
            }
        ));
    }

    #[test]
    fn base_url_gets_trailing_slash() {
        let config = load(&[WARNING, ("CLASSIFIER_BASE_URL", "https://guard.example/api")]).unwrap();
        assert_eq!(
            config.backend.base_url.join("predict").unwrap().as_str(),
            "https://guard.example/api/predict"
        );
    }

    #[test]
    fn garbage_timeout_is_rejected() {
        assert!(load(&[WARNING, ("CLASSIFIER_TIMEOUT_MS", "soon")]).is_err());
    }
}
