use super::*;

fn raw_with_token() -> RawSettings {
    let mut raw = RawSettings::default();
    raw.notion.token = Some("secret_test".to_string());
    raw
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = raw_with_token();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());

    let overrides = ServeOverrides {
        server_port: Some(4321),
        ..Default::default()
    };
    let source = SourceOverrides {
        log_level: Some("debug".to_string()),
        ..Default::default()
    };

    raw.apply_source_overrides(&source);
    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn defaults_are_applied() {
    let settings = Settings::from_raw(raw_with_token()).expect("valid settings");

    assert_eq!(settings.cache.revalidate, Duration::from_secs(3600));
    assert_eq!(settings.site.posts_per_page.get(), 10);
    assert_eq!(settings.notion.page_size.get(), 100);
    assert_eq!(settings.notion.api_version, DEFAULT_NOTION_API_VERSION);
    assert!(settings.notion.data_source_id.is_none());
    assert!(matches!(settings.kv, KvSettings::Memory));
    assert_eq!(settings.comments.limits, CommentLimits::default());
    assert!(matches!(settings.logging.format, LogFormat::Compact));
    assert!(!settings.api_rate_limit.trust_forwarded_for);
}

#[test]
fn forwarded_for_trust_is_read_from_toml() {
    let raw: RawSettings = Config::builder()
        .add_source(config::File::from_str(
            r#"
            [notion]
            token = "secret_test"

            [api_rate_limit]
            trust_forwarded_for = true
            "#,
            config::FileFormat::Toml,
        ))
        .build()
        .expect("config builds")
        .try_deserialize()
        .expect("raw settings");

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.api_rate_limit.trust_forwarded_for);
    assert_eq!(settings.api_rate_limit.max_requests.get(), 30);
}

#[test]
fn missing_notion_token_is_fatal() {
    let err = Settings::from_raw(RawSettings::default()).expect_err("token required");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "notion.token",
            ..
        }
    ));
}

#[test]
fn data_source_id_is_normalized() {
    let mut raw = raw_with_token();
    raw.notion.data_source_id = Some("0123456789ABCDEF0123456789abcdef".to_string());

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(
        settings
            .notion
            .data_source_id
            .as_ref()
            .map(NotionId::as_str),
        Some("01234567-89ab-cdef-0123-456789abcdef")
    );
}

#[test]
fn malformed_data_source_id_is_rejected() {
    let mut raw = raw_with_token();
    raw.notion.data_source_id = Some("not-an-id".to_string());
    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn kv_requires_url_and_token_together() {
    let mut raw = raw_with_token();
    raw.kv.rest_url = Some("https://kv.example.com".to_string());
    let err = Settings::from_raw(raw.clone()).expect_err("token missing");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "kv.rest_token",
            ..
        }
    ));

    raw.kv.rest_token = Some("kv-token".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    match settings.kv {
        KvSettings::Rest { url, token } => {
            assert_eq!(url.as_str(), "https://kv.example.com/");
            assert_eq!(token, "kv-token");
        }
        KvSettings::Memory => panic!("expected REST backend"),
    }
}

#[test]
fn page_size_is_capped() {
    let mut raw = raw_with_token();
    raw.notion.page_size = Some(101);
    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn blank_admin_password_is_ignored() {
    let mut raw = raw_with_token();
    raw.comments.admin_password = Some("   ".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.comments.admin_password.is_none());
}

#[test]
fn secrets_are_redacted_in_debug_output() {
    let mut raw = raw_with_token();
    raw.comments.admin_password = Some("hunter2".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");

    let rendered = format!("{settings:?}");
    assert!(!rendered.contains("secret_test"));
    assert!(!rendered.contains("hunter2"));
}

#[test]
fn profile_section_is_deserialized() {
    let raw: RawSettings = Config::builder()
        .add_source(config::File::from_str(
            r#"
            [notion]
            token = "secret_test"

            [profile]
            name = "Ada"
            headline = "Engineer"

            [[profile.skills]]
            name = "Backend"
            items = ["Rust", "PostgreSQL"]
            "#,
            config::FileFormat::Toml,
        ))
        .build()
        .expect("config builds")
        .try_deserialize()
        .expect("raw settings");

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.profile.name, "Ada");
    assert_eq!(settings.profile.skills[0].items, vec!["Rust", "PostgreSQL"]);
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["folio"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_serve_overrides() {
    let args = CliArgs::parse_from([
        "folio",
        "serve",
        "--server-host",
        "0.0.0.0",
        "--notion-token",
        "secret_cli",
    ]);

    assert_eq!(args.source.notion_token.as_deref(), Some("secret_cli"));
    match args.command.expect("serve command") {
        Command::Serve(serve) => {
            assert_eq!(serve.overrides.server_host.as_deref(), Some("0.0.0.0"));
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_export_arguments() {
    let args = CliArgs::parse_from(["folio", "export", "/tmp/site"]);

    match args.command.expect("export command") {
        Command::Export(export) => {
            assert_eq!(export.dir, std::path::Path::new("/tmp/site"));
            assert!(export.site_base_url.is_none());
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_tree_arguments() {
    let args = CliArgs::parse_from([
        "folio",
        "tree",
        "--max-depth",
        "2",
        "0123456789abcdef0123456789abcdef",
    ]);

    match args.command.expect("tree command") {
        Command::Tree(tree) => {
            assert_eq!(tree.max_depth, Some(2));
            assert_eq!(tree.id, "0123456789abcdef0123456789abcdef");
        }
        _ => panic!("wrong command parsed"),
    }
}
