//! `cms`: command-line front end for the CMS blog API.
//!
//! Tokens persist in a JSON file (`CMS_TOKEN_FILE`, default
//! `~/.cms/tokens.json`) so a `login` carries over to later invocations.
//! When the client gives up on a session the command reports it on stderr
//! and asks the user to sign in again (except `logout`, which ends the
//! session anyway). Media paths in printed output are made absolute.

#[cfg(test)]
#[path = "main_test.rs"]
mod main_test;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use cms_client::net::api::SessionEvent;
use cms_client::net::blog::PostFeed;
use cms_client::net::error::TransportError;
use cms_client::net::types::{Comment, ContactMessage, NewComment, NewUser, Post, PostDetail, User};
use cms_client::{
    ApiClient, AuthError, AuthSession, BlogApi, ClientConfig, ConfigError, FileTokenStore, HttpError, ReqwestTransport,
};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("http client setup failed: {0}")]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Http(#[from] HttpError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("missing --{0}; sign in or pass it explicitly")]
    MissingArgument(&'static str),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "cms", about = "CMS blog API client")]
struct Cli {
    #[arg(long, env = "CMS_BASE_URL")]
    base_url: Option<String>,

    #[arg(long, env = "CMS_TOKEN_FILE")]
    token_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check that the API is reachable.
    Health,
    Login {
        #[arg(long, env = "CMS_EMAIL")]
        email: String,
        #[arg(long, env = "CMS_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Logout,
    Register(RegisterArgs),
    /// Show the signed-in user.
    Whoami,
    Posts {
        #[arg(value_enum, default_value_t = FeedArg::Published)]
        feed: FeedArg,
    },
    Post {
        id: i64,
        /// List related posts instead of the post itself.
        #[arg(long, default_value_t = false)]
        related: bool,
        /// Count a view before fetching.
        #[arg(long, default_value_t = false)]
        view: bool,
    },
    Like {
        post_id: i64,
        #[arg(long, default_value_t = false)]
        undo: bool,
    },
    Comments {
        post_id: i64,
    },
    Comment(CommentArgs),
    Contact(ContactArgs),
    Categories,
    Tags {
        #[arg(long, default_value_t = false)]
        popular: bool,
    },
    /// Analytics overview and moderation queue (admin or staff only).
    Dashboard,
}

#[derive(Args, Debug)]
struct RegisterArgs {
    #[arg(long)]
    first_name: String,
    #[arg(long)]
    last_name: String,
    #[arg(long)]
    email: String,
    #[arg(long, env = "CMS_PASSWORD", hide_env_values = true)]
    password: String,
}

#[derive(Args, Debug)]
struct CommentArgs {
    post_id: i64,
    #[arg(long)]
    message: String,
    /// Defaults to the signed-in user's name.
    #[arg(long)]
    name: Option<String>,
    /// Defaults to the signed-in user's email.
    #[arg(long)]
    email: Option<String>,
    /// Reply to this comment.
    #[arg(long)]
    parent: Option<i64>,
}

#[derive(Args, Debug)]
struct ContactArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    subject: String,
    #[arg(long)]
    message: String,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum FeedArg {
    Published,
    Featured,
    Trending,
    Recent,
}

impl From<FeedArg> for PostFeed {
    fn from(feed: FeedArg) -> Self {
        match feed {
            FeedArg::Published => Self::Published,
            FeedArg::Featured => Self::Featured,
            FeedArg::Trending => Self::Trending,
            FeedArg::Recent => Self::Recent,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = resolve_config(&cli, ClientConfig::from_env()?)?;
    tracing::debug!(base_url = %config.base_url, token_file = %config.token_file.display(), "starting");

    let store = Arc::new(FileTokenStore::new(config.token_file.clone()));
    let transport = Arc::new(ReqwestTransport::new(config.clone())?);
    let client = Arc::new(ApiClient::new(transport, store));
    let mut expired = client.subscribe();
    let session = AuthSession::new(client.clone());
    let blog = BlogApi::new(client);

    let notify_expiry = reports_expiry(&cli.command);
    let result = run(&session, &blog, &config, cli.command).await;
    if notify_expiry {
        report_expiry(&mut expired);
    }
    result
}

/// `logout` clears the session itself; an expiry it triggers is not news.
fn reports_expiry(command: &Command) -> bool {
    !matches!(command, Command::Logout)
}

/// Apply command-line overrides on top of the environment config.
fn resolve_config(cli: &Cli, mut config: ClientConfig) -> Result<ClientConfig, CliError> {
    if let Some(base_url) = cli.base_url.as_deref() {
        config.base_url = ClientConfig::new(base_url)?.base_url;
    }
    if let Some(token_file) = &cli.token_file {
        config.token_file.clone_from(token_file);
    }
    Ok(config)
}

async fn run(session: &AuthSession, blog: &BlogApi, config: &ClientConfig, command: Command) -> Result<(), CliError> {
    match command {
        Command::Health => print_json(&blog.health().await?),
        Command::Login { email, password } => {
            let mut user = session.login(&email, &password).await?;
            resolve_user_media(config, &mut user);
            print_json(&user)
        }
        Command::Logout => {
            session.logout().await?;
            println!("signed out");
            Ok(())
        }
        Command::Register(args) => run_register(session, args).await,
        Command::Whoami => {
            let mut user = session.initialize().await?.ok_or(AuthError::NotSignedIn)?;
            resolve_user_media(config, &mut user);
            print_json(&user)
        }
        Command::Posts { feed } => {
            let mut posts = blog.posts(feed.into()).await?;
            posts.iter_mut().for_each(|p| resolve_post_media(config, p));
            print_json(&posts)
        }
        Command::Post { id, related, view } => {
            if view {
                blog.increment_views(id).await?;
            }
            if related {
                let mut posts = blog.related_posts(id).await?;
                posts.iter_mut().for_each(|p| resolve_post_media(config, p));
                print_json(&posts)
            } else {
                let mut detail = blog.post(id).await?;
                resolve_detail_media(config, &mut detail);
                print_json(&detail)
            }
        }
        Command::Like { post_id, undo } => {
            let state = if undo { blog.unlike_post(post_id).await? } else { blog.like_post(post_id).await? };
            print_json(&state)
        }
        Command::Comments { post_id } => {
            let mut comments = blog.comments(post_id).await?;
            comments.iter_mut().for_each(|c| resolve_comment_media(config, c));
            print_json(&comments)
        }
        Command::Comment(args) => run_comment(session, blog, args).await,
        Command::Contact(args) => {
            blog.submit_contact(&ContactMessage {
                name: args.name,
                email: args.email,
                subject: args.subject,
                message: args.message,
            })
            .await?;
            println!("message sent");
            Ok(())
        }
        Command::Categories => print_json(&blog.categories().await?),
        Command::Tags { popular } => {
            let tags = if popular { blog.popular_tags().await? } else { blog.tags().await? };
            print_json(&tags)
        }
        Command::Dashboard => run_dashboard(session, blog).await,
    }
}

async fn run_register(session: &AuthSession, args: RegisterArgs) -> Result<(), CliError> {
    let new_user = NewUser {
        first_name: args.first_name,
        last_name: args.last_name,
        email: args.email,
        password: args.password,
    };
    match session.register(&new_user).await {
        Ok(registration) => {
            if !registration.authenticated {
                eprintln!("account created; run `cms login` to sign in");
            }
            print_json(&registration.user)
        }
        Err(AuthError::Invalid(payload)) => {
            print_json(payload.as_value())?;
            Err(AuthError::Invalid(payload).into())
        }
        Err(err) => Err(err.into()),
    }
}

async fn run_comment(session: &AuthSession, blog: &BlogApi, args: CommentArgs) -> Result<(), CliError> {
    let (name, email) = match (args.name, args.email) {
        (Some(name), Some(email)) => (name, email),
        (name, email) => {
            let user = session.initialize().await?;
            let name = name.or_else(|| user.as_ref().map(User::full_name).filter(|n| !n.is_empty()));
            let email = email.or_else(|| user.map(|u| u.email));
            (name.ok_or(CliError::MissingArgument("name"))?, email.ok_or(CliError::MissingArgument("email"))?)
        }
    };
    let comment = blog
        .create_comment(&NewComment { post: args.post_id, name, email, message: args.message, parent: args.parent })
        .await?;
    eprintln!("comment submitted for moderation");
    print_json(&comment)
}

#[derive(Serialize)]
struct DashboardView<T: Serialize, U: Serialize> {
    overview: T,
    pending_comments: U,
}

async fn run_dashboard(session: &AuthSession, blog: &BlogApi) -> Result<(), CliError> {
    session.initialize().await?;
    let user = session.require_dashboard_access()?;
    tracing::debug!(user_id = user.id, "dashboard access granted");
    let overview = blog.analytics_overview().await?;
    let pending_comments = blog.pending_comments().await?;
    print_json(&DashboardView { overview, pending_comments })
}

fn report_expiry(events: &mut broadcast::Receiver<SessionEvent>) {
    while let Ok(SessionEvent::Expired(reason)) = events.try_recv() {
        tracing::debug!(?reason, "session expired");
        eprintln!("session expired; run `cms login` to sign in again");
    }
}

// =============================================================================
// media paths
// =============================================================================

fn absolutize(config: &ClientConfig, path: &mut Option<String>) {
    if let Some(p) = path.as_mut().filter(|p| !p.is_empty()) {
        *p = config.media_url(p);
    }
}

fn resolve_user_media(config: &ClientConfig, user: &mut User) {
    absolutize(config, &mut user.profile_image);
}

fn resolve_post_media(config: &ClientConfig, post: &mut Post) {
    absolutize(config, &mut post.featured_image);
    if let Some(author) = post.author.as_mut() {
        resolve_user_media(config, author);
    }
}

fn resolve_comment_media(config: &ClientConfig, comment: &mut Comment) {
    absolutize(config, &mut comment.author_image);
    comment.replies.iter_mut().for_each(|r| resolve_comment_media(config, r));
}

fn resolve_detail_media(config: &ClientConfig, detail: &mut PostDetail) {
    resolve_post_media(config, &mut detail.post);
    detail.comments.iter_mut().for_each(|c| resolve_comment_media(config, c));
}

fn print_json(value: &impl Serialize) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
