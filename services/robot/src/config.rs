use secrecy::SecretString;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Defines the supported backend providers for the game oracle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Provider {
    OpenAI,
    Gemini,
}

impl Provider {
    /// Base URL of the provider's OpenAI-compatible endpoint.
    pub fn api_base(&self) -> &'static str {
        match self {
            Provider::OpenAI => "https://api.openai.com/v1/",
            Provider::Gemini => "https://generativelanguage.googleapis.com/v1beta/openai",
        }
    }
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub wamp_url: String,
    pub wamp_realm: String,
    pub provider: Provider,
    pub api_key: SecretString,
    pub chat_model: String,
    pub llm_timeout: Duration,
    pub gestures_path: PathBuf,
    pub seconds_per_word: f64,
    pub stt_topic: String,
    pub log_level: Level,
}

/// Upper bound for `LLM_TIMEOUT_SECS`.
const MAX_LLM_TIMEOUT_SECS: f64 = 600.0;
/// Upper bound for `SECONDS_PER_WORD`.
const MAX_SECONDS_PER_WORD: f64 = 10.0;

fn parse_positive_f64(var: &str, default: f64, max: f64) -> Result<f64, ConfigError> {
    match std::env::var(var) {
        Err(_) => Ok(default),
        Ok(raw) => match raw.parse::<f64>() {
            Ok(v) if v.is_finite() && v > 0.0 && v <= max => Ok(v),
            _ => Err(ConfigError::InvalidValue(
                var.to_string(),
                format!("'{}' is not a number in (0, {}]", raw, max),
            )),
        },
    }
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let wamp_url = std::env::var("WAMP_URL")
            .unwrap_or_else(|_| "ws://wamp.robotsindeklas.nl".to_string());
        if !(wamp_url.starts_with("ws://") || wamp_url.starts_with("wss://")) {
            return Err(ConfigError::InvalidValue(
                "WAMP_URL".to_string(),
                format!("'{}' is not a WebSocket URL", wamp_url),
            ));
        }

        let wamp_realm = std::env::var("WAMP_REALM")
            .map_err(|_| ConfigError::MissingVar("WAMP_REALM".to_string()))?;

        let provider_str = std::env::var("LLM_PROVIDER").unwrap_or_else(|_| "openai".to_string());
        let provider = match provider_str.to_lowercase().as_str() {
            "gemini" => Provider::Gemini,
            _ => Provider::OpenAI,
        };

        let key_var = match provider {
            Provider::OpenAI => "OPENAI_API_KEY",
            Provider::Gemini => "GEMINI_API_KEY",
        };
        let api_key = std::env::var(key_var).map_err(|_| {
            ConfigError::MissingVar(format!(
                "{} must be set for '{}' provider",
                key_var,
                provider_str.to_lowercase()
            ))
        })?;

        let chat_model =
            std::env::var("CHAT_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());

        let timeout_secs = parse_positive_f64("LLM_TIMEOUT_SECS", 10.0, MAX_LLM_TIMEOUT_SECS)?;
        let llm_timeout = Duration::try_from_secs_f64(timeout_secs).map_err(|e| {
            ConfigError::InvalidValue("LLM_TIMEOUT_SECS".to_string(), e.to_string())
        })?;
        let seconds_per_word =
            parse_positive_f64("SECONDS_PER_WORD", 0.4, MAX_SECONDS_PER_WORD)?;

        let gestures_path = std::env::var("GESTURES_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./gestures.json"));

        let stt_topic =
            std::env::var("STT_TOPIC").unwrap_or_else(|_| "rie.dialogue.stt.stream".to_string());

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            wamp_url,
            wamp_realm,
            provider,
            api_key: SecretString::from(api_key),
            chat_model,
            llm_timeout,
            gestures_path,
            seconds_per_word,
            stt_topic,
            log_level,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use serial_test::serial;
    use std::env;

    fn clear_env_vars() {
        unsafe {
            env::remove_var("WAMP_URL");
            env::remove_var("WAMP_REALM");
            env::remove_var("LLM_PROVIDER");
            env::remove_var("OPENAI_API_KEY");
            env::remove_var("GEMINI_API_KEY");
            env::remove_var("CHAT_MODEL");
            env::remove_var("LLM_TIMEOUT_SECS");
            env::remove_var("GESTURES_PATH");
            env::remove_var("SECONDS_PER_WORD");
            env::remove_var("STT_TOPIC");
            env::remove_var("RUST_LOG");
        }
    }

    fn set_minimal_env_openai() {
        unsafe {
            env::set_var("WAMP_REALM", "rie.test");
            env::set_var("OPENAI_API_KEY", "test-openai-key");
        }
    }

    #[test]
    fn test_config_error_display() {
        let missing_var = ConfigError::MissingVar("TEST_VAR".to_string());
        assert_eq!(
            format!("{}", missing_var),
            "Missing environment variable: TEST_VAR"
        );

        let invalid_value =
            ConfigError::InvalidValue("TEST_VAR".to_string(), "bad_value".to_string());
        assert_eq!(
            format!("{}", invalid_value),
            "Invalid value for environment variable TEST_VAR: bad_value"
        );
    }

    #[test]
    fn test_provider_api_base() {
        assert!(Provider::OpenAI.api_base().contains("api.openai.com"));
        assert!(Provider::Gemini.api_base().contains("generativelanguage"));
    }

    #[test]
    #[serial]
    fn test_config_from_env_minimal_openai() {
        clear_env_vars();
        set_minimal_env_openai();

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.wamp_url, "ws://wamp.robotsindeklas.nl");
        assert_eq!(config.wamp_realm, "rie.test");
        assert_eq!(config.provider, Provider::OpenAI);
        assert_eq!(config.api_key.expose_secret(), "test-openai-key");
        assert_eq!(config.chat_model, "gpt-4o-mini");
        assert_eq!(config.llm_timeout, Duration::from_secs(10));
        assert_eq!(config.gestures_path, PathBuf::from("./gestures.json"));
        assert_eq!(config.seconds_per_word, 0.4);
        assert_eq!(config.stt_topic, "rie.dialogue.stt.stream");
        assert_eq!(config.log_level, Level::INFO);
    }

    #[test]
    #[serial]
    fn test_config_from_env_gemini_provider() {
        clear_env_vars();
        unsafe {
            env::set_var("WAMP_REALM", "rie.test");
            env::set_var("LLM_PROVIDER", "gemini");
            env::set_var("GEMINI_API_KEY", "test-gemini-key");
        }

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.provider, Provider::Gemini);
        assert_eq!(config.api_key.expose_secret(), "test-gemini-key");
    }

    #[test]
    #[serial]
    fn test_config_from_env_custom_values() {
        clear_env_vars();
        set_minimal_env_openai();
        unsafe {
            env::set_var("WAMP_URL", "wss://robot.local:8080/ws");
            env::set_var("CHAT_MODEL", "gpt-4o");
            env::set_var("LLM_TIMEOUT_SECS", "2.5");
            env::set_var("GESTURES_PATH", "/etc/robot/gestures.json");
            env::set_var("SECONDS_PER_WORD", "0.35");
            env::set_var("STT_TOPIC", "custom.stt");
            env::set_var("RUST_LOG", "debug");
        }

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.wamp_url, "wss://robot.local:8080/ws");
        assert_eq!(config.chat_model, "gpt-4o");
        assert_eq!(config.llm_timeout, Duration::from_millis(2500));
        assert_eq!(config.gestures_path, PathBuf::from("/etc/robot/gestures.json"));
        assert_eq!(config.seconds_per_word, 0.35);
        assert_eq!(config.stt_topic, "custom.stt");
        assert_eq!(config.log_level, Level::DEBUG);
    }

    #[test]
    #[serial]
    fn test_config_missing_realm() {
        clear_env_vars();
        unsafe {
            env::set_var("OPENAI_API_KEY", "test-openai-key");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::MissingVar(var) => assert_eq!(var, "WAMP_REALM"),
            _ => panic!("Expected MissingVar for WAMP_REALM"),
        }
    }

    #[test]
    #[serial]
    fn test_config_missing_provider_key() {
        clear_env_vars();
        unsafe {
            env::set_var("WAMP_REALM", "rie.test");
            env::set_var("LLM_PROVIDER", "gemini");
            env::set_var("OPENAI_API_KEY", "wrong-provider-key");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::MissingVar(msg) => assert!(msg.contains("GEMINI_API_KEY")),
            _ => panic!("Expected MissingVar for GEMINI_API_KEY"),
        }
    }

    #[test]
    #[serial]
    fn test_config_invalid_numbers() {
        clear_env_vars();
        set_minimal_env_openai();
        unsafe {
            env::set_var("SECONDS_PER_WORD", "-1");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "SECONDS_PER_WORD"),
            _ => panic!("Expected InvalidValue for SECONDS_PER_WORD"),
        }
    }

    #[test]
    #[serial]
    fn test_config_rejects_huge_numbers() {
        for var in ["SECONDS_PER_WORD", "LLM_TIMEOUT_SECS"] {
            clear_env_vars();
            set_minimal_env_openai();
            unsafe {
                env::set_var(var, "1e300");
            }
            match Config::from_env().unwrap_err() {
                ConfigError::InvalidValue(bad, _) => assert_eq!(bad, var),
                _ => panic!("Expected InvalidValue for {var}"),
            }
        }
    }

    #[test]
    #[serial]
    fn test_config_invalid_url_and_log_level() {
        clear_env_vars();
        set_minimal_env_openai();
        unsafe {
            env::set_var("WAMP_URL", "http://not-a-socket");
        }
        match Config::from_env().unwrap_err() {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "WAMP_URL"),
            _ => panic!("Expected InvalidValue for WAMP_URL"),
        }

        clear_env_vars();
        set_minimal_env_openai();
        unsafe {
            env::set_var("RUST_LOG", "not-a-level");
        }
        match Config::from_env().unwrap_err() {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "RUST_LOG"),
            _ => panic!("Expected InvalidValue for RUST_LOG"),
        }
    }
}
