//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;
use std::path::PathBuf;

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// 服务器配置
    #[serde(default)]
    pub server: ServerConfig,

    /// 数据库配置
    #[serde(default)]
    pub database: DatabaseConfig,

    /// 图像生成服务配置
    #[serde(default)]
    pub generation: GenerationConfig,

    /// 生成流程配置
    #[serde(default)]
    pub workflow: WorkflowConfig,

    /// 启发式规则配置
    #[serde(default)]
    pub rules: RulesConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,

    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    /// 获取服务器地址
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// 数据库配置
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// 数据库文件路径
    #[serde(default = "default_db_path")]
    pub path: String,

    /// 最大连接数
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> String {
    "data/manvel.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

impl DatabaseConfig {
    /// 获取数据库 URL
    pub fn database_url(&self) -> String {
        format!("sqlite:{}?mode=rwc", self.path)
    }
}

/// 图像生成服务类型
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationProvider {
    /// 外部 HTTP 服务
    #[default]
    Http,
    /// 本地占位实现，不调用外部服务
    Fake,
}

/// 图像生成服务配置
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationConfig {
    #[serde(default)]
    pub provider: GenerationProvider,

    /// 服务基础 URL
    #[serde(default = "default_generation_url")]
    pub url: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_generation_model")]
    pub model: String,

    /// 请求超时时间（秒）
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,
}

fn default_generation_url() -> String {
    "http://localhost:8000/v1".to_string()
}

fn default_generation_model() -> String {
    "gemini-2.5-flash-image".to_string()
}

fn default_generation_timeout() -> u64 {
    60
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: GenerationProvider::default(),
            url: default_generation_url(),
            api_key: String::new(),
            model: default_generation_model(),
            timeout_secs: default_generation_timeout(),
        }
    }
}

/// 生成流程配置
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowConfig {
    /// 同时执行的最大流程数
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// 等待队列容量，满时拒绝新任务
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// 角色参考图边长
    #[serde(default = "default_portrait_size")]
    pub portrait_size: u32,

    #[serde(default = "default_scene_width")]
    pub scene_width: u32,

    #[serde(default = "default_scene_height")]
    pub scene_height: u32,

    /// 图生图参考强度 (0, 1]
    #[serde(default = "default_reference_strength")]
    pub reference_strength: f32,

    /// 画风: anime / realistic / cartoon / painting
    #[serde(default = "default_style")]
    pub style: String,
}

fn default_max_concurrent() -> usize {
    2
}

fn default_queue_capacity() -> usize {
    64
}

fn default_portrait_size() -> u32 {
    1024
}

fn default_scene_width() -> u32 {
    1024
}

fn default_scene_height() -> u32 {
    768
}

fn default_reference_strength() -> f32 {
    0.6
}

fn default_style() -> String {
    "anime".to_string()
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            queue_capacity: default_queue_capacity(),
            portrait_size: default_portrait_size(),
            scene_width: default_scene_width(),
            scene_height: default_scene_height(),
            reference_strength: default_reference_strength(),
            style: default_style(),
        }
    }
}

/// 启发式规则配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RulesConfig {
    /// 规则表 TOML 文件；未设置时使用内置规则
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.addr(), "0.0.0.0:8080");
        assert_eq!(config.database.database_url(), "sqlite:data/manvel.db?mode=rwc");
        assert_eq!(config.generation.provider, GenerationProvider::Http);
        assert_eq!(config.workflow.scene_height, 768);
        assert!(config.rules.path.is_none());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [generation]
            provider = "fake"

            [workflow]
            max_concurrent = 4
            "#,
        )
        .unwrap();

        assert_eq!(config.generation.provider, GenerationProvider::Fake);
        assert_eq!(config.generation.timeout_secs, 60);
        assert_eq!(config.workflow.max_concurrent, 4);
        assert_eq!(config.workflow.queue_capacity, 64);
        assert_eq!(config.log.level, "info");
    }
}
