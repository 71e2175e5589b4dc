//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{
    net::SocketAddr,
    num::{NonZeroU32, NonZeroUsize},
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::domain::{comments::CommentLimits, ids::NotionId, profile::Profile};

mod cli;

pub use cli::{
    CliArgs, Command, ExportArgs, ServeArgs, ServeOverrides, SourceOverrides, TreeArgs,
};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "folio";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_NOTION_API_BASE_URL: &str = "https://api.notion.com";
const DEFAULT_NOTION_API_VERSION: &str = "2025-09-03";
const DEFAULT_NOTION_MIN_REQUEST_INTERVAL_MS: u64 = 334;
const DEFAULT_NOTION_MAX_RETRIES: u32 = 3;
const DEFAULT_NOTION_RETRY_BASE_DELAY_MS: u64 = 500;
const DEFAULT_NOTION_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_NOTION_PAGE_SIZE: u64 = 100;
const MAX_NOTION_PAGE_SIZE: u64 = 100;
const DEFAULT_NOTION_MAX_DEPTH: u32 = 8;
const DEFAULT_NOTION_CHILD_CONCURRENCY: u64 = 4;
const DEFAULT_SITE_BASE_URL: &str = "http://localhost:3000";
const DEFAULT_SITE_TITLE: &str = "Folio";
const DEFAULT_POSTS_PER_PAGE: u64 = 10;
const DEFAULT_CACHE_REVALIDATE_SECS: u64 = 3600;
const DEFAULT_CACHE_CAPACITY: usize = 256;
const DEFAULT_API_RATE_LIMIT_WINDOW_SECS: u64 = 60;
const DEFAULT_API_RATE_LIMIT_MAX_REQUESTS: u64 = 30;

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub notion: NotionSettings,
    pub kv: KvSettings,
    pub comments: CommentSettings,
    pub site: SiteSettings,
    pub cache: CacheSettings,
    pub api_rate_limit: ApiRateLimitSettings,
    pub profile: Profile,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Clone)]
pub struct NotionSettings {
    pub token: String,
    /// Posts listing is empty while unset.
    pub data_source_id: Option<NotionId>,
    pub api_base_url: Url,
    pub api_version: String,
    pub min_request_interval: Duration,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    pub request_timeout: Duration,
    pub page_size: NonZeroU32,
    pub max_depth: u32,
    pub child_concurrency: NonZeroU32,
}

impl std::fmt::Debug for NotionSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotionSettings")
            .field("token", &"<redacted>")
            .field("data_source_id", &self.data_source_id)
            .field("api_base_url", &self.api_base_url.as_str())
            .field("api_version", &self.api_version)
            .field("min_request_interval", &self.min_request_interval)
            .field("max_retries", &self.max_retries)
            .field("retry_base_delay", &self.retry_base_delay)
            .field("request_timeout", &self.request_timeout)
            .field("page_size", &self.page_size)
            .field("max_depth", &self.max_depth)
            .field("child_concurrency", &self.child_concurrency)
            .finish()
    }
}

#[derive(Clone)]
pub enum KvSettings {
    /// Process-local store; contents are lost on restart.
    Memory,
    Rest { url: Url, token: String },
}

impl std::fmt::Debug for KvSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KvSettings::Memory => f.write_str("Memory"),
            KvSettings::Rest { url, .. } => f
                .debug_struct("Rest")
                .field("url", &url.as_str())
                .field("token", &"<redacted>")
                .finish(),
        }
    }
}

#[derive(Clone)]
pub struct CommentSettings {
    pub admin_password: Option<String>,
    pub limits: CommentLimits,
}

impl std::fmt::Debug for CommentSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommentSettings")
            .field("admin_password", &self.admin_password.as_ref().map(|_| "<redacted>"))
            .field("limits", &self.limits)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct SiteSettings {
    pub base_url: Url,
    pub title: String,
    pub author: String,
    pub description: String,
    pub posts_per_page: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub revalidate: Duration,
    pub capacity: NonZeroUsize,
}

#[derive(Debug, Clone)]
pub struct ApiRateLimitSettings {
    pub window_seconds: NonZeroU32,
    pub max_requests: NonZeroU32,
    /// Key clients by `x-forwarded-for` instead of the socket peer.
    pub trust_forwarded_for: bool,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("FOLIO").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    raw.apply_source_overrides(&cli.source);
    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Export(args)) => {
            if let Some(url) = args.site_base_url.as_ref() {
                raw.site.base_url = Some(url.clone());
            }
        }
        Some(Command::Tree(args)) => {
            if let Some(depth) = args.max_depth {
                raw.notion.max_depth = Some(depth);
            }
        }
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    notion: RawNotionSettings,
    kv: RawKvSettings,
    comments: RawCommentSettings,
    site: RawSiteSettings,
    cache: RawCacheSettings,
    api_rate_limit: RawApiRateLimitSettings,
    profile: Profile,
}

impl RawSettings {
    fn apply_source_overrides(&mut self, overrides: &SourceOverrides) {
        if let Some(token) = overrides.notion_token.as_ref() {
            self.notion.token = Some(token.clone());
        }
        if let Some(id) = overrides.notion_data_source_id.as_ref() {
            self.notion.data_source_id = Some(id.clone());
        }
        if let Some(url) = overrides.kv_rest_url.as_ref() {
            self.kv.rest_url = Some(url.clone());
        }
        if let Some(token) = overrides.kv_rest_token.as_ref() {
            self.kv.rest_token = Some(token.clone());
        }
        if let Some(password) = overrides.admin_password.as_ref() {
            self.comments.admin_password = Some(password.clone());
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }

    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(url) = overrides.site_base_url.as_ref() {
            self.site.base_url = Some(url.clone());
        }
        if let Some(seconds) = overrides.cache_revalidate_seconds {
            self.cache.revalidate_seconds = Some(seconds);
        }
        if let Some(window) = overrides.api_rate_limit_window_seconds {
            self.api_rate_limit.window_seconds = Some(window);
        }
        if let Some(max) = overrides.api_rate_limit_max_requests {
            self.api_rate_limit.max_requests = Some(max);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            notion,
            kv,
            comments,
            site,
            cache,
            api_rate_limit,
            profile,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            notion: build_notion_settings(notion)?,
            kv: build_kv_settings(kv)?,
            comments: build_comment_settings(comments)?,
            site: build_site_settings(site)?,
            cache: build_cache_settings(cache)?,
            api_rate_limit: build_api_rate_limit_settings(api_rate_limit)?,
            profile,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_notion_settings(notion: RawNotionSettings) -> Result<NotionSettings, LoadError> {
    let token = non_blank(notion.token)
        .ok_or_else(|| LoadError::invalid("notion.token", "a Notion integration token is required"))?;

    let data_source_id = non_blank(notion.data_source_id)
        .map(|raw| {
            NotionId::parse(&raw)
                .map_err(|err| LoadError::invalid("notion.data_source_id", err.to_string()))
        })
        .transpose()?;

    let api_base_url = parse_url(
        notion.api_base_url.as_deref(),
        DEFAULT_NOTION_API_BASE_URL,
        "notion.api_base_url",
    )?;

    let api_version = non_blank(notion.api_version)
        .unwrap_or_else(|| DEFAULT_NOTION_API_VERSION.to_string());

    let page_size = notion.page_size.unwrap_or(DEFAULT_NOTION_PAGE_SIZE);
    if page_size > MAX_NOTION_PAGE_SIZE {
        return Err(LoadError::invalid(
            "notion.page_size",
            format!("must not exceed {MAX_NOTION_PAGE_SIZE}"),
        ));
    }

    Ok(NotionSettings {
        token,
        data_source_id,
        api_base_url,
        api_version,
        min_request_interval: Duration::from_millis(
            notion
                .min_request_interval_ms
                .unwrap_or(DEFAULT_NOTION_MIN_REQUEST_INTERVAL_MS),
        ),
        max_retries: notion.max_retries.unwrap_or(DEFAULT_NOTION_MAX_RETRIES),
        retry_base_delay: Duration::from_millis(
            notion
                .retry_base_delay_ms
                .unwrap_or(DEFAULT_NOTION_RETRY_BASE_DELAY_MS),
        ),
        request_timeout: Duration::from_secs(non_zero_u32(
            notion
                .request_timeout_seconds
                .unwrap_or(DEFAULT_NOTION_REQUEST_TIMEOUT_SECS),
            "notion.request_timeout_seconds",
        )?
        .get()
        .into()),
        page_size: non_zero_u32(page_size, "notion.page_size")?,
        max_depth: notion.max_depth.unwrap_or(DEFAULT_NOTION_MAX_DEPTH),
        child_concurrency: non_zero_u32(
            notion
                .child_concurrency
                .unwrap_or(DEFAULT_NOTION_CHILD_CONCURRENCY),
            "notion.child_concurrency",
        )?,
    })
}

fn build_kv_settings(kv: RawKvSettings) -> Result<KvSettings, LoadError> {
    match (non_blank(kv.rest_url), non_blank(kv.rest_token)) {
        (None, None) => Ok(KvSettings::Memory),
        (Some(url), Some(token)) => {
            let url = Url::parse(&url)
                .map_err(|err| LoadError::invalid("kv.rest_url", format!("invalid url: {err}")))?;
            Ok(KvSettings::Rest { url, token })
        }
        (Some(_), None) => Err(LoadError::invalid(
            "kv.rest_token",
            "required when kv.rest_url is set",
        )),
        (None, Some(_)) => Err(LoadError::invalid(
            "kv.rest_url",
            "required when kv.rest_token is set",
        )),
    }
}

fn build_comment_settings(comments: RawCommentSettings) -> Result<CommentSettings, LoadError> {
    let defaults = CommentLimits::default();
    let max_username_chars = non_zero_usize(
        comments
            .max_username_chars
            .unwrap_or(defaults.max_username_chars),
        "comments.max_username_chars",
    )?;
    let max_content_chars = non_zero_usize(
        comments
            .max_content_chars
            .unwrap_or(defaults.max_content_chars),
        "comments.max_content_chars",
    )?;

    Ok(CommentSettings {
        admin_password: non_blank(comments.admin_password),
        limits: CommentLimits {
            max_username_chars: max_username_chars.get(),
            max_content_chars: max_content_chars.get(),
        },
    })
}

fn build_site_settings(site: RawSiteSettings) -> Result<SiteSettings, LoadError> {
    let base_url = parse_url(
        site.base_url.as_deref(),
        DEFAULT_SITE_BASE_URL,
        "site.base_url",
    )?;
    if !matches!(base_url.scheme(), "http" | "https") {
        return Err(LoadError::invalid(
            "site.base_url",
            "scheme must be http or https",
        ));
    }

    Ok(SiteSettings {
        base_url,
        title: non_blank(site.title).unwrap_or_else(|| DEFAULT_SITE_TITLE.to_string()),
        author: site.author.unwrap_or_default(),
        description: site.description.unwrap_or_default(),
        posts_per_page: non_zero_u32(
            site.posts_per_page.unwrap_or(DEFAULT_POSTS_PER_PAGE),
            "site.posts_per_page",
        )?,
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let capacity = non_zero_usize(
        cache.capacity.unwrap_or(DEFAULT_CACHE_CAPACITY),
        "cache.capacity",
    )?;

    Ok(CacheSettings {
        revalidate: Duration::from_secs(
            cache
                .revalidate_seconds
                .unwrap_or(DEFAULT_CACHE_REVALIDATE_SECS),
        ),
        capacity,
    })
}

fn build_api_rate_limit_settings(
    rate_limit: RawApiRateLimitSettings,
) -> Result<ApiRateLimitSettings, LoadError> {
    let window_seconds_val = rate_limit
        .window_seconds
        .unwrap_or(DEFAULT_API_RATE_LIMIT_WINDOW_SECS);
    let window_seconds = non_zero_u32(window_seconds_val, "api_rate_limit.window_seconds")?;

    let max_requests_val = rate_limit
        .max_requests
        .unwrap_or(DEFAULT_API_RATE_LIMIT_MAX_REQUESTS);
    let max_requests = non_zero_u32(max_requests_val, "api_rate_limit.max_requests")?;

    Ok(ApiRateLimitSettings {
        window_seconds,
        max_requests,
        trust_forwarded_for: rate_limit.trust_forwarded_for.unwrap_or(false),
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawNotionSettings {
    token: Option<String>,
    data_source_id: Option<String>,
    api_base_url: Option<String>,
    api_version: Option<String>,
    min_request_interval_ms: Option<u64>,
    max_retries: Option<u32>,
    retry_base_delay_ms: Option<u64>,
    request_timeout_seconds: Option<u64>,
    page_size: Option<u64>,
    max_depth: Option<u32>,
    child_concurrency: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawKvSettings {
    rest_url: Option<String>,
    rest_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCommentSettings {
    admin_password: Option<String>,
    max_username_chars: Option<usize>,
    max_content_chars: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSiteSettings {
    base_url: Option<String>,
    title: Option<String>,
    author: Option<String>,
    description: Option<String>,
    posts_per_page: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    revalidate_seconds: Option<u64>,
    capacity: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawApiRateLimitSettings {
    window_seconds: Option<u64>,
    max_requests: Option<u64>,
    trust_forwarded_for: Option<bool>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn parse_url(value: Option<&str>, default: &str, key: &'static str) -> Result<Url, LoadError> {
    let raw = value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(default);
    Url::parse(raw).map_err(|err| LoadError::invalid(key, format!("invalid url `{raw}`: {err}")))
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

fn non_zero_usize(value: usize, key: &'static str) -> Result<NonZeroUsize, LoadError> {
    NonZeroUsize::new(value).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[cfg(test)]
mod tests;
