use super::parsing::{
    env_optional, env_or_default, parse_bool, parse_cors_origins, parse_environment, parse_f64,
    parse_u16, parse_u32, parse_u64,
};
use super::secret::load_or_create_secret_key;
use super::types::{
    AiSettings, ApiSettings, ConfigError, CorsSettings, DatabaseSettings, ExamSettings,
    RuntimeSettings, ScoringSettings, SecuritySettings, ServerHost, ServerPort, ServerSettings,
    Settings, TelemetrySettings,
};

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let host = env_or_default("FLUENTPASS_HOST", "0.0.0.0");
        let port = env_or_default("FLUENTPASS_PORT", "8000");

        let environment = parse_environment(
            env_optional("FLUENTPASS_ENV").or_else(|| env_optional("ENVIRONMENT")),
        );
        let strict_config = env_optional("FLUENTPASS_STRICT_CONFIG")
            .map(|value| parse_bool(&value))
            .unwrap_or(false)
            || environment.is_production();

        let project_name = env_or_default("PROJECT_NAME", "FluentPass API");
        let version = env_or_default("VERSION", env!("CARGO_PKG_VERSION"));
        let api_v1_str = env_or_default("API_V1_STR", "/api/v1");

        let secret_key = match env_optional("SECRET_KEY") {
            Some(value) => value,
            None => load_or_create_secret_key(),
        };

        let access_token_expire_minutes = parse_u64(
            "ACCESS_TOKEN_EXPIRE_MINUTES",
            env_or_default("ACCESS_TOKEN_EXPIRE_MINUTES", "10080"),
        )?;
        let algorithm = env_or_default("ALGORITHM", "HS256");

        let cors_origins = parse_cors_origins(env_optional("BACKEND_CORS_ORIGINS"))?;

        let postgres_server = env_or_default("POSTGRES_SERVER", "localhost");
        let postgres_port = parse_u16("POSTGRES_PORT", env_or_default("POSTGRES_PORT", "5432"))?;
        let postgres_user = env_or_default("POSTGRES_USER", "fluentpass");
        let postgres_password = env_or_default("POSTGRES_PASSWORD", "");
        let postgres_db = env_or_default("POSTGRES_DB", "fluentpass_db");
        let database_url = env_optional("DATABASE_URL");

        let openai_api_key = env_or_default("OPENAI_API_KEY", "");
        let openai_base_url = env_or_default("OPENAI_BASE_URL", "");
        let ai_model = env_or_default("AI_MODEL", "gpt-4o");
        let ai_max_tokens = parse_u32("AI_MAX_TOKENS", env_or_default("AI_MAX_TOKENS", "8000"))?;
        let ai_temperature =
            parse_f64("AI_TEMPERATURE", env_or_default("AI_TEMPERATURE", "0.4"))?;
        let ai_request_timeout =
            parse_u64("AI_REQUEST_TIMEOUT", env_or_default("AI_REQUEST_TIMEOUT", "120"))?;

        let scoring_base_url = env_or_default("SCORING_API_URL", "");
        let scoring_api_key = env_or_default("SCORING_API_KEY", "");
        let scoring_timeout_seconds = parse_u64(
            "SCORING_TIMEOUT_SECONDS",
            env_or_default("SCORING_TIMEOUT_SECONDS", "30"),
        )?;
        let scoring_max_retries =
            parse_u32("SCORING_MAX_RETRIES", env_or_default("SCORING_MAX_RETRIES", "3"))?;

        let auto_save_interval_seconds = parse_u64(
            "AUTO_SAVE_INTERVAL_SECONDS",
            env_or_default("AUTO_SAVE_INTERVAL_SECONDS", "30"),
        )?;
        let difficulty = env_or_default("EXAM_DIFFICULTY", "telc-b2");

        let log_level = env_or_default("FLUENTPASS_LOG_LEVEL", "info");
        let json = env_optional("FLUENTPASS_LOG_JSON")
            .map(|value| parse_bool(&value))
            .unwrap_or(false);
        let prometheus_enabled =
            env_optional("PROMETHEUS_ENABLED").map(|value| parse_bool(&value)).unwrap_or(false);

        let settings = Self {
            server: ServerSettings {
                host: ServerHost::parse(host)?,
                port: ServerPort::parse(port)?,
            },
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings { project_name, version, api_v1_str },
            security: SecuritySettings { secret_key, access_token_expire_minutes, algorithm },
            cors: CorsSettings { origins: cors_origins },
            database: DatabaseSettings {
                postgres_server,
                postgres_port,
                postgres_user,
                postgres_password,
                postgres_db,
                database_url,
            },
            ai: AiSettings {
                openai_api_key,
                openai_base_url,
                ai_model,
                ai_max_tokens,
                ai_temperature,
                ai_request_timeout,
            },
            scoring: ScoringSettings {
                base_url: scoring_base_url,
                api_key: scoring_api_key,
                timeout_seconds: scoring_timeout_seconds,
                max_retries: scoring_max_retries,
            },
            exam: ExamSettings { auto_save_interval_seconds, difficulty },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate()?;
        Ok(settings)
    }

    pub(crate) fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host.0, self.server.port.0)
    }

    pub(crate) fn server_host(&self) -> &str {
        &self.server.host.0
    }

    pub(crate) fn server_port(&self) -> u16 {
        self.server.port.0
    }

    pub(crate) fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub(crate) fn security(&self) -> &SecuritySettings {
        &self.security
    }

    pub(crate) fn cors(&self) -> &CorsSettings {
        &self.cors
    }

    pub(crate) fn database(&self) -> &DatabaseSettings {
        &self.database
    }

    pub(crate) fn ai(&self) -> &AiSettings {
        &self.ai
    }

    pub(crate) fn scoring(&self) -> &ScoringSettings {
        &self.scoring
    }

    pub(crate) fn exam(&self) -> &ExamSettings {
        &self.exam
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.exam.auto_save_interval_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "AUTO_SAVE_INTERVAL_SECONDS",
                value: "0".to_string(),
            });
        }

        if self.ai.ai_request_timeout == 0 {
            return Err(ConfigError::InvalidValue {
                field: "AI_REQUEST_TIMEOUT",
                value: "0".to_string(),
            });
        }

        if self.scoring.timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "SCORING_TIMEOUT_SECONDS",
                value: "0".to_string(),
            });
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if self.database.database_url.is_none() && self.database.postgres_password.is_empty() {
            return Err(ConfigError::MissingSecret("POSTGRES_PASSWORD"));
        }
        if self.ai.openai_api_key.is_empty() {
            return Err(ConfigError::MissingSecret("OPENAI_API_KEY"));
        }
        if self.ai.openai_base_url.is_empty() {
            return Err(ConfigError::MissingSecret("OPENAI_BASE_URL"));
        }
        if self.scoring.base_url.is_empty() {
            return Err(ConfigError::MissingSecret("SCORING_API_URL"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_uses_defaults_outside_strict_mode() {
        let _guard = crate::test_support::env_lock();
        crate::test_support::set_test_env();

        let settings = Settings::load().expect("settings");
        assert_eq!(settings.exam().auto_save_interval_seconds, 30);
        assert_eq!(settings.exam().difficulty, "telc-b2");
        assert_eq!(settings.scoring().max_retries, 3);
    }

    #[test]
    fn zero_autosave_interval_is_rejected() {
        let _guard = crate::test_support::env_lock();
        crate::test_support::set_test_env();
        std::env::set_var("AUTO_SAVE_INTERVAL_SECONDS", "0");

        let result = Settings::load();
        std::env::remove_var("AUTO_SAVE_INTERVAL_SECONDS");
        assert!(result.is_err());
    }
}
