//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（config.toml / config.local.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::{AppConfig, GenerationProvider};
use crate::domain::scene::PromptStyle;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["config", "config.local"];

/// 环境变量前缀
const ENV_PREFIX: &str = "MANVEL";

/// 加载应用配置
///
/// 按优先级从高到低合并配置：
/// 1. 环境变量（前缀 `MANVEL_`，层级分隔符 `__`）
/// 2. 配置文件（config.toml 或 config.local.toml）
/// 3. 默认值
///
/// # 环境变量示例
/// - `MANVEL_SERVER__PORT=9000`
/// - `MANVEL_GENERATION__URL=http://image-server:8000/v1`
/// - `MANVEL_GENERATION__PROVIDER=fake`
/// - `MANVEL_WORKFLOW__MAX_CONCURRENT=4`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// # 参数
/// - `config_path` - 可选的配置文件路径，如果为 None 则使用默认搜索路径
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. 默认值（最低优先级）
    builder = builder
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 8080)?
        .set_default("database.path", "data/manvel.db")?
        .set_default("database.max_connections", 5)?
        .set_default("generation.provider", "http")?
        .set_default("generation.url", "http://localhost:8000/v1")?
        .set_default("generation.api_key", "")?
        .set_default("generation.model", "gemini-2.5-flash-image")?
        .set_default("generation.timeout_secs", 60)?
        .set_default("workflow.max_concurrent", 2)?
        .set_default("workflow.queue_capacity", 64)?
        .set_default("workflow.portrait_size", 1024)?
        .set_default("workflow.scene_width", 1024)?
        .set_default("workflow.scene_height", 768)?
        .set_default("workflow.reference_strength", 0.6)?
        .set_default("workflow.style", "anime")?
        .set_default("log.level", "info")?
        .set_default("log.json", false)?;

    // 2. 配置文件
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 3. 环境变量（最高优先级），例如 MANVEL_GENERATION__URL
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;

    let app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// 验证配置有效性
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "Server port cannot be 0".to_string(),
        ));
    }

    if config.database.path.is_empty() {
        return Err(ConfigError::ValidationError(
            "Database path cannot be empty".to_string(),
        ));
    }

    if config.generation.provider == GenerationProvider::Http && config.generation.url.is_empty() {
        return Err(ConfigError::ValidationError(
            "Generation URL cannot be empty for the http provider".to_string(),
        ));
    }

    let workflow = &config.workflow;
    if workflow.max_concurrent == 0 {
        return Err(ConfigError::ValidationError(
            "workflow.max_concurrent must be at least 1".to_string(),
        ));
    }
    if workflow.queue_capacity == 0 {
        return Err(ConfigError::ValidationError(
            "workflow.queue_capacity must be at least 1".to_string(),
        ));
    }
    if !(workflow.reference_strength > 0.0 && workflow.reference_strength <= 1.0) {
        return Err(ConfigError::ValidationError(format!(
            "workflow.reference_strength must be in (0, 1], got {}",
            workflow.reference_strength
        )));
    }
    if workflow.portrait_size == 0 || workflow.scene_width == 0 || workflow.scene_height == 0 {
        return Err(ConfigError::ValidationError(
            "Image sizes cannot be 0".to_string(),
        ));
    }
    if PromptStyle::from_str(&workflow.style).is_none() {
        return Err(ConfigError::ValidationError(format!(
            "Unknown workflow.style: {}",
            workflow.style
        )));
    }

    Ok(())
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    tracing::info!("Server: {}", config.server.addr());
    tracing::info!("Database: {}", config.database.path);
    tracing::info!("Database Max Connections: {}", config.database.max_connections);
    tracing::info!("Generation Provider: {:?}", config.generation.provider);
    if config.generation.provider == GenerationProvider::Http {
        tracing::info!("Generation URL: {}", config.generation.url);
        tracing::info!("Generation Model: {}", config.generation.model);
        tracing::info!("Generation Timeout: {}s", config.generation.timeout_secs);
    }
    tracing::info!(
        "Workflow: max_concurrent={}, queue_capacity={}, style={}",
        config.workflow.max_concurrent,
        config.workflow.queue_capacity,
        config.workflow.style
    );
    match &config.rules.path {
        Some(path) => tracing::info!("Rules: {}", path.display()),
        None => tracing::info!("Rules: built-in"),
    }
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("=================================");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_validation_passes_for_default_config() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_validation_error_for_zero_port() {
        let mut config = AppConfig::default();
        config.server.port = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_empty_db_path() {
        let mut config = AppConfig::default();
        config.database.path = String::new();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_empty_url_only_matters_for_http_provider() {
        let mut config = AppConfig::default();
        config.generation.url = String::new();
        assert!(validate_config(&config).is_err());

        config.generation.provider = GenerationProvider::Fake;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validation_error_for_workflow_limits() {
        let mut config = AppConfig::default();
        config.workflow.max_concurrent = 0;
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.workflow.queue_capacity = 0;
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.workflow.reference_strength = 1.5;
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.workflow.style = "pixel".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 9090

[generation]
provider = "fake"

[workflow]
queue_capacity = 8
reference_strength = 0.4
"#
        )
        .unwrap();

        let config = load_config_from_path(Some(file.path())).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.generation.provider, GenerationProvider::Fake);
        assert_eq!(config.workflow.queue_capacity, 8);
        assert!((config.workflow.reference_strength - 0.4).abs() < f32::EPSILON);
        assert_eq!(config.workflow.max_concurrent, 2);
    }

    #[test]
    fn test_load_from_file_rejects_invalid_values() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[workflow]\nmax_concurrent = 0").unwrap();

        let result = load_config_from_path(Some(file.path()));
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }
}
