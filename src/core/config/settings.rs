use super::parsing::{
    env_optional, env_or_default, parse_bool, parse_cors_origins, parse_environment, parse_u16,
    parse_u32, parse_u64,
};
use super::secret::load_or_create_secret_key;
use super::types::{
    AiSettings, ApiSettings, CanvasSettings, ConfigError, CorsSettings, DatabaseSettings,
    RuntimeSettings, SecuritySettings, ServerHost, ServerPort, ServerSettings, Settings,
    TelemetrySettings,
};

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let host = env_or_default("MARKPILOT_HOST", "0.0.0.0");
        let port = env_or_default("MARKPILOT_PORT", "8000");

        let environment = parse_environment(
            env_optional("MARKPILOT_ENV").or_else(|| env_optional("ENVIRONMENT")),
        );
        let strict_config = env_optional("MARKPILOT_STRICT_CONFIG")
            .map(|value| parse_bool(&value))
            .unwrap_or(false)
            || environment.is_production();

        let project_name = env_or_default("PROJECT_NAME", "MarkPilot API");
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
        let postgres_user = env_or_default("POSTGRES_USER", "markpilot");
        let postgres_password = env_or_default("POSTGRES_PASSWORD", "");
        let postgres_db = env_or_default("POSTGRES_DB", "markpilot_db");
        let database_url = env_optional("DATABASE_URL");

        let canvas_default_instance_url = env_or_default(
            "CANVAS_DEFAULT_INSTANCE_URL",
            "https://canvas.instructure.com",
        );
        let canvas_request_timeout_seconds = parse_u64(
            "CANVAS_REQUEST_TIMEOUT_SECONDS",
            env_or_default("CANVAS_REQUEST_TIMEOUT_SECONDS", "30"),
        )?;
        let canvas_per_page =
            parse_u32("CANVAS_PER_PAGE", env_or_default("CANVAS_PER_PAGE", "100"))?;
        let canvas_max_pages =
            parse_u32("CANVAS_MAX_PAGES", env_or_default("CANVAS_MAX_PAGES", "20"))?;

        let openai_api_key = env_or_default("OPENAI_API_KEY", "");
        let openai_base_url =
            env_or_default("OPENAI_BASE_URL", "https://api.openai.com/v1");
        let ai_model = env_or_default("AI_MODEL", "gpt-4o");
        let ai_max_tokens = parse_u32("AI_MAX_TOKENS", env_or_default("AI_MAX_TOKENS", "2000"))?;
        let ai_request_timeout =
            parse_u64("AI_REQUEST_TIMEOUT", env_or_default("AI_REQUEST_TIMEOUT", "120"))?;

        let log_level = env_or_default("MARKPILOT_LOG_LEVEL", "info");
        let json = env_optional("MARKPILOT_LOG_JSON")
            .map(|value| parse_bool(&value))
            .unwrap_or(false);
        let prometheus_enabled = env_optional("PROMETHEUS_ENABLED")
            .map(|value| parse_bool(&value))
            .unwrap_or(false);

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
            canvas: CanvasSettings {
                default_instance_url: canvas_default_instance_url,
                request_timeout_seconds: canvas_request_timeout_seconds,
                per_page: canvas_per_page,
                max_pages: canvas_max_pages,
            },
            ai: AiSettings {
                openai_api_key,
                openai_base_url,
                ai_model,
                ai_max_tokens,
                ai_request_timeout,
            },
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

    pub(crate) fn canvas(&self) -> &CanvasSettings {
        &self.canvas
    }

    pub(crate) fn ai(&self) -> &AiSettings {
        &self.ai
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.canvas.per_page == 0 {
            return Err(ConfigError::InvalidValue {
                field: "CANVAS_PER_PAGE",
                value: "0".to_string(),
            });
        }
        if self.canvas.max_pages == 0 {
            return Err(ConfigError::InvalidValue {
                field: "CANVAS_MAX_PAGES",
                value: "0".to_string(),
            });
        }
        if self.canvas.default_instance_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "CANVAS_DEFAULT_INSTANCE_URL",
                value: String::from("<empty>"),
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

        Ok(())
    }
}
