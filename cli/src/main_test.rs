use super::*;

#[test]
fn posts_defaults_to_published_feed() {
    let cli = Cli::try_parse_from(["cms", "posts"]).unwrap();
    assert!(matches!(cli.command, Command::Posts { feed: FeedArg::Published }));
}

#[test]
fn posts_accepts_named_feed() {
    let cli = Cli::try_parse_from(["cms", "posts", "trending"]).unwrap();
    let Command::Posts { feed } = cli.command else { panic!("expected posts") };
    assert_eq!(PostFeed::from(feed), PostFeed::Trending);
}

#[test]
fn comment_parses_optional_identity_and_parent() {
    let cli = Cli::try_parse_from(["cms", "comment", "4", "--message", "Great read", "--parent", "9"]).unwrap();
    let Command::Comment(args) = cli.command else { panic!("expected comment") };
    assert_eq!(args.post_id, 4);
    assert_eq!(args.parent, Some(9));
    assert_eq!(args.name, None);
}

#[test]
fn base_url_flag_overrides_environment_config() {
    let cli = Cli::try_parse_from(["cms", "--base-url", "https://blog.example.com/", "--token-file", "/tmp/t.json", "categories"])
        .unwrap();
    let config = resolve_config(&cli, ClientConfig::new("http://127.0.0.1:8000").unwrap()).unwrap();
    assert_eq!(config.base_url, "https://blog.example.com");
    assert_eq!(config.token_file, PathBuf::from("/tmp/t.json"));
}

#[test]
fn invalid_base_url_flag_is_rejected() {
    let cli = Cli::try_parse_from(["cms", "--base-url", "blog.example.com", "health"]).unwrap();
    let err = resolve_config(&cli, ClientConfig::new("http://127.0.0.1:8000").unwrap()).unwrap_err();
    assert!(matches!(err, CliError::Config(ConfigError::InvalidBaseUrl(_))));
}

#[test]
fn logout_does_not_report_session_expiry() {
    let logout = Cli::try_parse_from(["cms", "logout"]).unwrap();
    let whoami = Cli::try_parse_from(["cms", "whoami"]).unwrap();
    assert!(!reports_expiry(&logout.command));
    assert!(reports_expiry(&whoami.command));
}

fn media_config() -> ClientConfig {
    ClientConfig::new("https://blog.example.com").unwrap()
}

#[test]
fn post_media_paths_become_absolute() {
    let mut detail: PostDetail = serde_json::from_value(serde_json::json!({
        "id": 1,
        "title": "Hello",
        "slug": "hello",
        "featured_image": "/media/posts/hello.png",
        "author": { "id": 2, "email": "a@example.com", "profile_image": "media/profiles/a.png" },
        "comments": [{
            "id": 3, "post": 1, "message": "hi", "author_image": "",
            "replies": [{ "id": 4, "post": 1, "message": "yo", "author_image": "https://cdn.example.com/b.png" }]
        }]
    }))
    .unwrap();

    resolve_detail_media(&media_config(), &mut detail);

    assert_eq!(detail.post.featured_image.as_deref(), Some("https://blog.example.com/media/posts/hello.png"));
    assert_eq!(
        detail.post.author.unwrap().profile_image.as_deref(),
        Some("https://blog.example.com/media/profiles/a.png")
    );
    assert_eq!(detail.comments[0].author_image.as_deref(), Some(""));
    assert_eq!(detail.comments[0].replies[0].author_image.as_deref(), Some("https://cdn.example.com/b.png"));
}

#[test]
fn missing_profile_image_stays_missing() {
    let mut user: User =
        serde_json::from_value(serde_json::json!({ "id": 2, "email": "a@example.com" })).unwrap();
    resolve_user_media(&media_config(), &mut user);
    assert_eq!(user.profile_image, None);
}
