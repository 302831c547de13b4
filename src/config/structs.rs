use serde::{Deserialize, Serialize};

/// 静态配置（从 TOML 加载，启动时使用）
///
/// - server: 服务器地址、端口、路由前缀
/// - database: 数据库连接与重试
/// - logging: 日志配置
/// - links: 报名/售卖链接生成
/// - orders: 订单号与购物车限制
/// - registration: 公开报名接口限流
/// - notifications: 欢迎消息投递
/// - cors: 跨域配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StaticConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub links: LinksConfig,
    #[serde(default)]
    pub orders: OrdersConfig,
    #[serde(default)]
    pub registration: RegistrationConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
    #[serde(default)]
    pub cors: CorsConfig,
}

impl StaticConfig {
    /// 从 TOML 文件和环境变量加载配置
    ///
    /// 优先级：ENV > config.toml > 默认值
    /// ENV 前缀：FL，分隔符：__
    /// 示例：FL__SERVER__PORT=9999
    pub fn load(path: Option<&str>) -> Self {
        use config::{Config, Environment, File};

        let path = path.unwrap_or("config.toml");

        let builder = Config::builder()
            // 1. 从 TOML 文件加载（可选）
            .add_source(File::with_name(path).required(false))
            // 2. 从环境变量覆盖，前缀 FL，分隔符 __
            .add_source(
                Environment::with_prefix("FL")
                    .separator("__")
                    .try_parsing(true),
            );

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<StaticConfig>() {
                Ok(config) => {
                    if std::path::Path::new(path).exists() {
                        eprintln!("[INFO] Configuration loaded from: {}", path);
                    }
                    if let Err(e) = super::validate_config(&config) {
                        eprintln!("[WARN] Configuration is invalid ({}), using defaults", e);
                        return Self::default();
                    }
                    config
                }
                Err(e) => {
                    eprintln!("[ERROR] Failed to deserialize config: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("[ERROR] Failed to build config: {}", e);
                Self::default()
            }
        }
    }

    /// 生成示例 TOML 配置文件
    pub fn generate_sample_config() -> String {
        let sample_config = Self::default();
        toml::to_string_pretty(&sample_config)
            .unwrap_or_else(|e| format!("Error generating sample config: {}", e))
    }

    /// 保存配置到 TOML 文件
    pub fn save_to_file<P: AsRef<std::path::Path>>(
        &self,
        path: P,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;

        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    #[serde(default = "default_cpu_count")]
    pub cpu_count: usize,
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
    #[serde(default = "default_health_prefix")]
    pub health_prefix: String,
}

/// 数据库连接配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_database_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_database_timeout")]
    pub timeout: u64,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default = "default_log_file")]
    pub file: Option<String>,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
    #[serde(default = "default_enable_rotation")]
    pub enable_rotation: bool,
}

/// 链接生成配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinksConfig {
    /// 对外可访问的站点根地址
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
    #[serde(default = "default_selling_path")]
    pub selling_path: String,
    #[serde(default = "default_portal_path")]
    pub portal_path: String,
    #[serde(default = "default_join_path")]
    pub join_path: String,
    /// magic link 随机字节数（base64url 编码前）
    #[serde(default = "default_magic_code_bytes")]
    pub magic_code_bytes: usize,
    #[serde(default = "default_seller_code_length")]
    pub seller_code_length: usize,
}

/// 订单配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrdersConfig {
    #[serde(default = "default_number_prefix")]
    pub number_prefix: String,
    #[serde(default = "default_number_width")]
    pub number_width: usize,
    #[serde(default = "default_max_items")]
    pub max_items: usize,
}

/// 公开报名接口限流
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationConfig {
    #[serde(default = "default_rate_limit_per_second")]
    pub rate_limit_per_second: u64,
    #[serde(default = "default_rate_limit_burst")]
    pub rate_limit_burst: u32,
}

/// 欢迎消息投递配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// 为空时只记录日志
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default = "default_notification_timeout")]
    pub timeout_secs: u64,
}

/// CORS 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    #[serde(default = "default_cors_max_age")]
    pub max_age: usize,
}

// ============================================================
// Default value functions for static config
// ============================================================

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8080
}

fn default_cpu_count() -> usize {
    num_cpus::get()
}

fn default_api_prefix() -> String {
    "/api/v1".to_string()
}

fn default_health_prefix() -> String {
    "/health".to_string()
}

fn default_database_url() -> String {
    "fundlinker.db".to_string()
}

fn default_database_pool_size() -> u32 {
    10
}

fn default_database_timeout() -> u64 {
    30
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    100
}

fn default_retry_max_delay_ms() -> u64 {
    2000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_log_file() -> Option<String> {
    None
}

fn default_max_backups() -> u32 {
    5
}

fn default_enable_rotation() -> bool {
    true
}

fn default_public_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_selling_path() -> String {
    "/s".to_string()
}

fn default_portal_path() -> String {
    "/portal".to_string()
}

fn default_join_path() -> String {
    "/join".to_string()
}

fn default_magic_code_bytes() -> usize {
    24
}

fn default_seller_code_length() -> usize {
    8
}

fn default_number_prefix() -> String {
    "FR".to_string()
}

fn default_number_width() -> usize {
    6
}

fn default_max_items() -> usize {
    100
}

fn default_rate_limit_per_second() -> u64 {
    2
}

fn default_rate_limit_burst() -> u32 {
    10
}

fn default_notification_timeout() -> u64 {
    5
}

fn default_cors_max_age() -> usize {
    3600
}

// ============================================================
// Default implementations
// ============================================================

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            cpu_count: default_cpu_count(),
            api_prefix: default_api_prefix(),
            health_prefix: default_health_prefix(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            pool_size: default_database_pool_size(),
            timeout: default_database_timeout(),
            retry_count: default_retry_count(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: default_log_file(),
            max_backups: default_max_backups(),
            enable_rotation: default_enable_rotation(),
        }
    }
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            public_base_url: default_public_base_url(),
            selling_path: default_selling_path(),
            portal_path: default_portal_path(),
            join_path: default_join_path(),
            magic_code_bytes: default_magic_code_bytes(),
            seller_code_length: default_seller_code_length(),
        }
    }
}

impl Default for OrdersConfig {
    fn default() -> Self {
        Self {
            number_prefix: default_number_prefix(),
            number_width: default_number_width(),
            max_items: default_max_items(),
        }
    }
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            rate_limit_per_second: default_rate_limit_per_second(),
            rate_limit_burst: default_rate_limit_burst(),
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_secs: default_notification_timeout(),
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            allowed_origins: Vec::new(),
            max_age: default_cors_max_age(),
        }
    }
}
