use std::{future::IntoFuture, net::SocketAddr, process, sync::Arc, time::Duration};

use folio::{
    application::{
        blocks::BlockTreeLoader,
        comments::CommentService,
        error::AppError,
        export::SiteExporter,
        posts::{PostCacheConfig, PostService},
        repos::{CommentsRepo, ContentSource, ViewsRepo},
        views::ViewService,
    },
    config,
    domain::ids::NotionId,
    infra::{
        error::InfraError,
        http::{self, ApiRateLimiter, HttpState},
        kv::{MemoryStore, UpstashStore},
        notion::{NotionClient, NotionClientConfig},
        telemetry,
    },
};
use tokio::sync::Notify;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    if settings.notion.data_source_id.is_none() {
        warn!(
            target = "folio::startup",
            "No Notion data source configured; the post listing will be empty"
        );
    }

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Export(args) => run_export(settings, args).await,
        config::Command::Tree(args) => run_tree(settings, args).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let posts = build_post_service(&settings)?;
    let (views_repo, comments_repo) = build_kv_store(&settings.kv)?;

    let limits = &settings.api_rate_limit;
    let rate_limiter = Arc::new(
        ApiRateLimiter::new(
            Duration::from_secs(u64::from(limits.window_seconds.get())),
            limits.max_requests.get(),
        )
        .trust_forwarded_for(limits.trust_forwarded_for),
    );

    let state = HttpState {
        posts,
        views: Arc::new(ViewService::new(views_repo)),
        comments: Arc::new(CommentService::new(
            comments_repo,
            settings.comments.admin_password.clone(),
            settings.comments.limits,
        )),
        site: Arc::new(settings.site.clone()),
        profile: Arc::new(settings.profile.clone()),
        rate_limiter,
    };

    serve_http(&settings.server, state).await
}

async fn run_export(settings: config::Settings, args: config::ExportArgs) -> Result<(), AppError> {
    let posts = build_post_service(&settings)?;
    let exporter = SiteExporter::new(
        posts,
        Arc::new(settings.site.clone()),
        Arc::new(settings.profile.clone()),
    );

    info!(
        target = "folio::export",
        dir = %args.dir.display(),
        "Starting export"
    );

    let summary = exporter
        .export(&args.dir)
        .await
        .map_err(|err| AppError::unexpected(format!("export failed: {err}")))?;

    info!(
        target = "folio::export",
        posts = summary.posts,
        index_pages = summary.index_pages,
        files = summary.files,
        "Export completed"
    );
    Ok(())
}

async fn run_tree(settings: config::Settings, args: config::TreeArgs) -> Result<(), AppError> {
    let id = NotionId::parse(&args.id)?;
    let posts = build_post_service(&settings)?;

    let blocks = posts.block_tree(&id).await.map_err(AppError::from)?;
    let json = serde_json::to_string_pretty(&blocks)
        .map_err(|err| AppError::unexpected(format!("failed to encode block tree: {err}")))?;
    println!("{json}");
    Ok(())
}

fn build_post_service(settings: &config::Settings) -> Result<Arc<PostService>, AppError> {
    let client = NotionClient::new(NotionClientConfig::from(&settings.notion))
        .map_err(|err| AppError::from(InfraError::client(err.to_string())))?;
    let source: Arc<dyn ContentSource> = Arc::new(client);

    let loader = BlockTreeLoader::new(
        source.clone(),
        settings.notion.max_depth,
        settings.notion.child_concurrency.get() as usize,
    );

    Ok(Arc::new(PostService::new(
        source,
        loader,
        settings.site.posts_per_page.get() as usize,
        PostCacheConfig {
            revalidate: settings.cache.revalidate,
            capacity: settings.cache.capacity,
        },
    )))
}

fn build_kv_store(
    kv: &config::KvSettings,
) -> Result<(Arc<dyn ViewsRepo>, Arc<dyn CommentsRepo>), AppError> {
    match kv {
        config::KvSettings::Memory => {
            warn!(
                target = "folio::startup",
                "No KV endpoint configured; views and comments are kept in memory"
            );
            let store = Arc::new(MemoryStore::default());
            Ok((store.clone(), store))
        }
        config::KvSettings::Rest { url, token } => {
            let store = Arc::new(
                UpstashStore::new(url.clone(), token.clone())
                    .map_err(|err| AppError::from(InfraError::client(err.to_string())))?,
            );
            Ok((store.clone(), store))
        }
    }
}

async fn serve_http(server: &config::ServerSettings, state: HttpState) -> Result<(), AppError> {
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(target = "folio::http", addr = %server.addr, "Listening");

    let shutdown = Arc::new(Notify::new());
    let drain = shutdown.clone();
    let serve = axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move { drain.notified().await })
    .into_future();
    tokio::pin!(serve);

    tokio::select! {
        result = &mut serve => {
            return result.map_err(|err| AppError::unexpected(format!("server error: {err}")));
        }
        () = shutdown_signal() => {
            info!(target = "folio::http", "Shutdown requested; draining connections");
            shutdown.notify_one();
        }
    }

    match tokio::time::timeout(server.graceful_shutdown, serve).await {
        Ok(result) => result.map_err(|err| AppError::unexpected(format!("server error: {err}"))),
        Err(_) => {
            warn!(
                target = "folio::http",
                timeout_secs = server.graceful_shutdown.as_secs(),
                "Graceful shutdown timed out; dropping open connections"
            );
            Ok(())
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
