//! CLI commands

use anidex_http::ApiClient;
use anidex_http::types::{AnimeFilters, ListName, NewComment, RegisterRequest, SortBy, SortOrder};
use anidex_session::{
    AuthorizedClient, FileStorage, RefreshCookie, Session, SessionError, SessionPhase,
};
use anyhow::{Context, Result, bail};
use clap::{Subcommand, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::AppConfig;

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in and keep the session for later commands
    Login {
        username: String,

        /// Password (prompting is not supported; prefer the environment variable)
        #[arg(long, env = "ANIDEX_PASSWORD", hide_env_values = true)]
        password: String,

        /// Do not persist the access token between runs
        #[arg(long)]
        no_remember: bool,
    },

    /// Create an account
    Register {
        username: String,

        #[arg(long)]
        email: String,

        #[arg(long, env = "ANIDEX_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Sign out and forget the stored session
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Restore the stored session and report its state
    Status,

    /// Browse the catalogue
    Anime {
        #[command(subcommand)]
        command: AnimeCommands,
    },

    /// Manage your anime lists
    Lists {
        #[command(subcommand)]
        command: ListCommands,
    },

    /// Read and write comments
    Comments {
        #[command(subcommand)]
        command: CommentCommands,
    },
}

#[derive(Subcommand)]
pub enum AnimeCommands {
    /// Filtered catalogue page
    List {
        #[arg(long)]
        sort: Option<SortKey>,

        #[arg(long)]
        order: Option<Order>,

        #[arg(long)]
        status: Option<String>,

        #[arg(long)]
        kind: Option<String>,

        #[arg(long)]
        rating: Option<String>,

        /// Repeat for several genres
        #[arg(long = "genre")]
        genres: Vec<String>,

        #[arg(long)]
        start_year: Option<u16>,

        #[arg(long)]
        end_year: Option<u16>,

        #[arg(long)]
        page: Option<u32>,

        #[arg(long)]
        limit: Option<u32>,
    },

    /// Search by title
    Search { name: String },

    /// Show one title
    Show { id: String },
}

#[derive(Subcommand)]
pub enum ListCommands {
    /// Show the ids in a list ("Watching", "Completed", "On Hold", "Dropped", "Plan to Watch")
    Show { name: ListName },

    /// Put a title into a list
    Add { name: ListName, anime_id: u64 },

    /// Remove a title from every list
    Remove { anime_id: u64 },

    /// Empty all lists
    Clear,
}

#[derive(Subcommand)]
pub enum CommentCommands {
    /// Latest comments across the site
    Latest,

    /// Comments on one title
    For { anime_id: String },

    /// Post a comment, or a reply with --reply-to
    Post {
        anime_id: String,
        text: String,

        #[arg(long)]
        reply_to: Option<String>,
    },

    Like { comment_id: String },

    Dislike { comment_id: String },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum SortKey {
    Score,
    Date,
    Name,
}

impl From<SortKey> for SortBy {
    fn from(key: SortKey) -> Self {
        match key {
            SortKey::Score => SortBy::Score,
            SortKey::Date => SortBy::Date,
            SortKey::Name => SortBy::Name,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Order {
    Asc,
    Desc,
}

impl From<Order> for SortOrder {
    fn from(order: Order) -> Self {
        match order {
            Order::Asc => SortOrder::Asc,
            Order::Desc => SortOrder::Desc,
        }
    }
}

/// Everything a command needs: the session, its client and where it persists
struct App {
    session: Session,
    client: AuthorizedClient,
    storage: Arc<FileStorage>,
}

impl App {
    fn open(config: &AppConfig, state_dir: PathBuf) -> Result<Self> {
        let mut api = ApiClient::builder()
            .base_url(&config.api.base_url)
            .timeout(Duration::from_secs(config.api.timeout_secs));
        if let Some(agent) = &config.api.user_agent {
            api = api.user_agent(agent);
        }
        let api = api.build().context("Failed to build the API client")?;

        let path = state_dir.join("session.json");
        debug!("Using session storage at {}", path.display());
        let storage = Arc::new(FileStorage::open(&path)?);

        let cookie = RefreshCookie::for_client(&api)?;
        cookie.load(storage.as_ref());

        let session = Session::create(api, storage.clone(), cookie, config.session_config());
        let client = AuthorizedClient::new(session.clone());

        Ok(Self {
            session,
            client,
            storage,
        })
    }

    /// Restore the stored session, failing when it cannot be used
    async fn require_session(&self) -> Result<()> {
        match self.session.restore().await {
            SessionPhase::Authenticated { .. } => Ok(()),
            _ => match self.session.snapshot().notice {
                Some(notice) => bail!("{notice}"),
                None => bail!("Not signed in. Run `anidex login` first."),
            },
        }
    }

    fn close(self) {
        self.session.refresh_cookie().save(self.storage.as_ref());
        self.session.dispose();
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

impl Commands {
    pub async fn execute(self, config: AppConfig, state_dir: Option<PathBuf>) -> Result<()> {
        let state_dir = config.state_dir(state_dir);
        let app = App::open(&config, state_dir)?;
        let result = self.run(&app).await;
        app.close();
        result
    }

    async fn run(self, app: &App) -> Result<()> {
        match self {
            Commands::Login {
                username,
                password,
                no_remember,
            } => {
                let user = app
                    .session
                    .sign_in(&username, &password, !no_remember)
                    .await
                    .map_err(|e| anyhow::anyhow!(user_facing(&e)))?;
                match user {
                    Some(user) => println!("Signed in as {}", user.username),
                    None => println!("Signed in"),
                }
                Ok(())
            }
            Commands::Register {
                username,
                email,
                password,
            } => {
                let request = RegisterRequest {
                    username,
                    email,
                    confirm_password: password.clone(),
                    password,
                };
                let user = app
                    .session
                    .register(&request)
                    .await
                    .map_err(|e| anyhow::anyhow!(user_facing(&e)))?;
                println!("Created account {}", user.username);
                Ok(())
            }
            Commands::Logout => {
                app.session.restore().await;
                app.session.logout().await;
                println!("Signed out");
                Ok(())
            }
            Commands::Whoami => {
                app.require_session().await?;
                match app.session.user() {
                    Some(user) => print_json(&user),
                    None => {
                        println!("Signed in, profile unavailable");
                        Ok(())
                    }
                }
            }
            Commands::Status => {
                let phase = app.session.restore().await;
                let snapshot = app.session.snapshot();
                match phase {
                    SessionPhase::Authenticated { .. } => println!(
                        "Signed in as {}",
                        snapshot.username().unwrap_or("<unknown>")
                    ),
                    SessionPhase::Anonymous { offline: true } => println!("Offline"),
                    SessionPhase::Anonymous { offline: false }
                    | SessionPhase::NoToken
                    | SessionPhase::Restoring => println!("Signed out"),
                }
                if let Some(notice) = snapshot.notice {
                    println!("{notice}");
                }
                info!(authenticated = phase.is_authenticated(), "Status reported");
                Ok(())
            }
            Commands::Anime { command } => {
                app.session.restore().await;
                command.execute(&app.client).await
            }
            Commands::Lists { command } => {
                app.require_session().await?;
                command.execute(&app.client).await
            }
            Commands::Comments { command } => {
                app.session.restore().await;
                command.execute(&app.client).await
            }
        }
    }
}

impl AnimeCommands {
    async fn execute(self, client: &AuthorizedClient) -> Result<()> {
        match self {
            AnimeCommands::List {
                sort,
                order,
                status,
                kind,
                rating,
                genres,
                start_year,
                end_year,
                page,
                limit,
            } => {
                let filters = AnimeFilters {
                    sort_by: sort.map(Into::into),
                    sort_order: order.map(Into::into),
                    status,
                    rating,
                    kind,
                    genre_ids: genres,
                    start_year,
                    end_year,
                    page,
                    limit,
                };
                print_json(&client.anime_list(&filters).await?)
            }
            AnimeCommands::Search { name } => print_json(&client.anime_by_name(&name).await?),
            AnimeCommands::Show { id } => print_json(&client.anime_by_id(&id).await?),
        }
    }
}

impl ListCommands {
    async fn execute(self, client: &AuthorizedClient) -> Result<()> {
        match self {
            ListCommands::Show { name } => print_json(&client.save_list(name).await?),
            ListCommands::Add { name, anime_id } => {
                client.add_to_list(name, anime_id).await?;
                println!("Added {anime_id} to {name}");
                Ok(())
            }
            ListCommands::Remove { anime_id } => {
                client.remove_from_lists(anime_id).await?;
                println!("Removed {anime_id}");
                Ok(())
            }
            ListCommands::Clear => {
                client.clear_lists().await?;
                println!("Cleared all lists");
                Ok(())
            }
        }
    }
}

impl CommentCommands {
    async fn execute(self, client: &AuthorizedClient) -> Result<()> {
        match self {
            CommentCommands::Latest => print_json(&client.latest_comments().await?),
            CommentCommands::For { anime_id } => {
                print_json(&client.comments_for_anime(&anime_id).await?)
            }
            CommentCommands::Post {
                anime_id,
                text,
                reply_to,
            } => {
                let comment = NewComment {
                    anime_id,
                    text,
                    reply_to_comment_id: reply_to,
                };
                print_json(&client.post_comment(&comment).await?)
            }
            CommentCommands::Like { comment_id } => {
                client.like_comment(&comment_id).await?;
                Ok(())
            }
            CommentCommands::Dislike { comment_id } => {
                client.dislike_comment(&comment_id).await?;
                Ok(())
            }
        }
    }
}

/// Message for the terminal: server validation detail verbatim, friendly text
/// for everything else the API can say
fn user_facing(error: &SessionError) -> String {
    match error {
        SessionError::Api(e) | SessionError::ProfileRejected(e) => e.user_message(),
        other => other.to_string(),
    }
}
