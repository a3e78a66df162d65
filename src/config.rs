use config::{Config, ConfigError, Environment, File, FileFormat};
use scraper::Selector;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

pub const DEFAULT_CONFIG_PATH: &str = "config/default";
pub const ENV_PREFIX: &str = "STOCKWATCH";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    pub bot: BotConfig,
    pub scraper: ScraperConfig,
    pub extractor: ExtractorConfig,
    pub scheduler: SchedulerConfig,
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BotConfig {
    /// YAML file holding `token: <bot token>`
    pub token_file: String,
    pub api_url: String,
    /// Long-poll timeout passed to getUpdates
    pub poll_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub delivery_concurrency: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScraperConfig {
    pub url: String,
    pub base_url: String,
    pub user_agent: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractorConfig {
    pub item_selector: String,
    pub title_selector: String,
    pub price_selector: String,
    pub link_selector: String,
    pub actions_selector: String,
    pub available_label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchedulerConfig {
    pub scan_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub busy_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    pub level: String,
    /// Daily rolling log files are written here when set
    pub directory: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bot: BotConfig {
                token_file: "token.yml".to_string(),
                api_url: "https://api.telegram.org".to_string(),
                poll_timeout_secs: 30,
                request_timeout_secs: 10,
                delivery_concurrency: 8,
            },
            scraper: ScraperConfig {
                url: "https://www.amd.com/de/direct-buy/de".to_string(),
                base_url: "https://www.amd.com".to_string(),
                user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/89.0.4389.128 Safari/537.36".to_string(),
                request_timeout_secs: 5,
            },
            extractor: ExtractorConfig {
                item_selector: "div.shop-content".to_string(),
                title_selector: "div.shop-title".to_string(),
                price_selector: "div.shop-price".to_string(),
                link_selector: "div.shop-full-specs-link a[href]".to_string(),
                actions_selector: "div.shop-links".to_string(),
                available_label: "Add to cart".to_string(),
            },
            scheduler: SchedulerConfig {
                scan_interval_secs: 30,
            },
            database: DatabaseConfig {
                url: "sqlite://bot_data.db".to_string(),
                max_connections: 5,
                acquire_timeout_secs: 30,
                busy_timeout_secs: 5,
            },
            server: ServerConfig {
                enabled: false,
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                directory: None,
            },
        }
    }
}

impl AppConfig {
    /// Layers built-in defaults, the config file and `STOCKWATCH__*` variables.
    ///
    /// An explicitly passed path must exist; the default path is optional.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let (path, required) = match path {
            Some(path) => (path, true),
            None => (DEFAULT_CONFIG_PATH, false),
        };

        let s = Config::builder()
            .add_source(Config::try_from(&AppConfig::default())?)
            .add_source(File::with_name(path).required(required))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        let config: AppConfig = s.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        // Scraper
        if Url::parse(&self.scraper.url).is_err() {
            return Err(ConfigError::Message("Invalid scraper url format".into()));
        }

        if Url::parse(&self.scraper.base_url).is_err() {
            return Err(ConfigError::Message("Invalid scraper base_url format".into()));
        }

        if self.scraper.request_timeout_secs == 0 {
            return Err(ConfigError::Message(
                "Scraper request_timeout_secs must be greater than 0".into(),
            ));
        }

        // Extractor
        for selector in [
            &self.extractor.item_selector,
            &self.extractor.title_selector,
            &self.extractor.price_selector,
            &self.extractor.link_selector,
            &self.extractor.actions_selector,
        ] {
            if Selector::parse(selector).is_err() {
                return Err(ConfigError::Message(
                    format!("Invalid extractor selector '{}'", selector),
                ));
            }
        }

        if self.extractor.available_label.trim().is_empty() {
            return Err(ConfigError::Message("Extractor available_label must not be empty".into()));
        }

        // Scheduler
        if self.scheduler.scan_interval_secs == 0 {
            return Err(ConfigError::Message(
                "Scheduler scan_interval_secs must be greater than 0".into(),
            ));
        }

        // Bot
        if Url::parse(&self.bot.api_url).is_err() {
            return Err(ConfigError::Message("Invalid bot api_url format".into()));
        }

        if self.bot.token_file.trim().is_empty() {
            return Err(ConfigError::Message("Bot token_file must be set".into()));
        }

        if self.bot.request_timeout_secs == 0 {
            return Err(ConfigError::Message(
                "Bot request_timeout_secs must be greater than 0".into(),
            ));
        }

        if self.bot.delivery_concurrency == 0 {
            return Err(ConfigError::Message(
                "Bot delivery_concurrency must be greater than 0".into(),
            ));
        }

        // Database
        if self.database.max_connections == 0 {
            return Err(ConfigError::Message(
                "Database max_connections must be greater than 0".into(),
            ));
        }

        // Server
        if self.server.enabled && self.server.port == 0 {
            return Err(ConfigError::Message("Server port must be greater than 0".into()));
        }

        Ok(())
    }
}

impl ScraperConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl SchedulerConfig {
    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }
}

impl BotConfig {
    /// Reads the bot token from the YAML token file.
    pub fn load_token(&self) -> Result<String, ConfigError> {
        let token_source = Config::builder()
            .add_source(File::new(&self.token_file, FileFormat::Yaml))
            .build()?;

        let token = token_source.get_string("token")?;
        if token.trim().is_empty() {
            return Err(ConfigError::Message(format!("Empty token in {}", self.token_file)));
        }

        Ok(token.trim().to_string())
    }
}
