use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the Folio binary.
#[derive(Debug, Parser)]
#[command(name = "folio", version, about = "Folio: a Notion-backed blog server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "FOLIO_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub source: SourceOverrides,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the Folio HTTP server.
    Serve(Box<ServeArgs>),
    /// Pre-render every public page into a directory.
    Export(ExportArgs),
    /// Fetch a page's block tree and print it as JSON.
    Tree(TreeArgs),
}

/// Credentials and endpoints, usually supplied by the hosting environment.
#[derive(Debug, Args, Default, Clone)]
pub struct SourceOverrides {
    /// Notion integration token.
    #[arg(
        long = "notion-token",
        env = "NOTION_TOKEN",
        value_name = "TOKEN",
        global = true,
        hide_env_values = true
    )]
    pub notion_token: Option<String>,

    /// Notion data source holding the posts.
    #[arg(
        long = "notion-data-source-id",
        env = "NOTION_DATA_SOURCE_ID",
        value_name = "ID",
        global = true
    )]
    pub notion_data_source_id: Option<String>,

    /// REST endpoint of the key-value store.
    #[arg(
        long = "kv-rest-url",
        env = "KV_REST_API_URL",
        value_name = "URL",
        global = true
    )]
    pub kv_rest_url: Option<String>,

    /// Bearer token for the key-value store.
    #[arg(
        long = "kv-rest-token",
        env = "KV_REST_API_TOKEN",
        value_name = "TOKEN",
        global = true,
        hide_env_values = true
    )]
    pub kv_rest_token: Option<String>,

    /// Password that may edit or delete any comment.
    #[arg(
        long = "admin-password",
        env = "ADMIN_PASSWORD",
        value_name = "PASSWORD",
        global = true,
        hide_env_values = true
    )]
    pub admin_password: Option<String>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the public base URL used in links and the sitemap.
    #[arg(long = "site-base-url", value_name = "URL")]
    pub site_base_url: Option<String>,

    /// Override how long fetched content is served before it is refreshed.
    #[arg(long = "cache-revalidate-seconds", value_name = "SECONDS")]
    pub cache_revalidate_seconds: Option<u64>,

    /// Override the API rate limit window size.
    #[arg(long = "api-rate-limit-window-seconds", value_name = "SECONDS")]
    pub api_rate_limit_window_seconds: Option<u64>,

    /// Override the API rate limit request ceiling.
    #[arg(long = "api-rate-limit-max-requests", value_name = "COUNT")]
    pub api_rate_limit_max_requests: Option<u64>,
}

#[derive(Debug, Args, Clone)]
pub struct ExportArgs {
    /// Override the public base URL used in links and the sitemap.
    #[arg(long = "site-base-url", value_name = "URL")]
    pub site_base_url: Option<String>,

    /// Directory to write the rendered site into.
    #[arg(value_name = "DIR", value_hint = ValueHint::DirPath)]
    pub dir: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct TreeArgs {
    /// Override how deep nested children are fetched.
    #[arg(long = "max-depth", value_name = "DEPTH")]
    pub max_depth: Option<u32>,

    /// Page or block id, with or without hyphens.
    #[arg(value_name = "ID")]
    pub id: String,
}
