use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use eventgate_core::config::Config;
use eventgate_core::core_event::{NewEvent, NewUser};
use eventgate_core::logging::{init_logging_with_config, LogLevel};
use eventgate_core::metrics::init_metrics;
use eventgate_core::storage::CURRENT_SCHEMA_VERSION;
use eventgate_core::{
    AccessError, AccessService, EventId, PrivacySettings, SqlStore, UserId, ViewerContext,
};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "eventgate")]
#[command(author, version, about = "Event visibility, admission and blocking", long_about = None)]
struct Args {
    /// TOML configuration file (defaults plus EVENTGATE_* variables when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// SQLite database file, overrides the configured one
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Set the log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Enable JSON formatted logging
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

/// Identity of the caller, as the serving layer would resolve it
#[derive(clap::Args, Debug, Clone, Copy)]
struct ViewerArgs {
    /// Viewer user id (0 = anonymous)
    #[arg(long, default_value_t = 0)]
    viewer: i64,

    /// Viewer has a verified email
    #[arg(long)]
    verified: bool,

    /// Viewer is a platform administrator
    #[arg(long)]
    admin: bool,
}

impl From<ViewerArgs> for ViewerContext {
    fn from(args: ViewerArgs) -> Self {
        ViewerContext::from_raw(args.viewer, args.verified, args.admin)
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create or upgrade the database schema
    Init,

    /// Insert a user
    AddUser {
        name: String,
        email: String,
        #[arg(long)]
        verified: bool,
        #[arg(long)]
        admin: bool,
        #[arg(long)]
        bio: Option<String>,
        /// Comma-separated language codes
        #[arg(long)]
        languages: Option<String>,
    },

    /// Insert an event
    AddEvent {
        #[arg(long)]
        owner: i64,
        slug: String,
        title: String,
        #[arg(long)]
        capacity: Option<u32>,
        /// Visible to anonymous visitors
        #[arg(long)]
        public: bool,
        #[arg(long)]
        verified_to_view: bool,
        #[arg(long)]
        verified_to_join: bool,
        #[arg(long)]
        hide_organizer: bool,
        #[arg(long)]
        hide_participants: bool,
    },

    /// Show an event as the viewer would see it
    View {
        slug: String,
        #[command(flatten)]
        viewer: ViewerArgs,
    },

    /// List an event's participants as the viewer would see them
    Participants {
        event_id: i64,
        #[command(flatten)]
        viewer: ViewerArgs,
    },

    /// Join an event as the viewer
    Join {
        event_id: i64,
        #[command(flatten)]
        viewer: ViewerArgs,
    },

    /// Leave an event as the viewer
    Leave {
        event_id: i64,
        #[command(flatten)]
        viewer: ViewerArgs,
    },

    /// Block another user
    Block {
        blocker: i64,
        blocked: i64,
        #[arg(long)]
        reason: Option<String>,
    },

    /// Remove a block
    Unblock { blocker: i64, blocked: i64 },

    /// List the users someone has blocked
    Blocks { blocker: i64 },
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::from_env().context("reading EVENTGATE_* environment")?,
    };

    if let Some(database) = &args.database {
        config.store.database_path = database.clone();
        if config.store.is_in_memory() {
            config.store.pool_size = 1;
        }
    }
    if let Some(level) = &args.log_level {
        let level: LogLevel = level.parse()?;
        config.logging.level = level.as_str().to_string();
    }
    if args.json_logs {
        config.logging.json_format = true;
    }

    config.validate()?;
    Ok(config)
}

/// Turn an access error into a user-facing failure without internal detail
fn user_error(err: AccessError) -> anyhow::Error {
    anyhow::anyhow!(err.public_message())
}

async fn run(command: Command, store: Arc<SqlStore>, config: &Config) -> Result<Value> {
    let service = AccessService::new(store.clone(), config);

    let output = match command {
        Command::Init => json!({
            "schema_version": CURRENT_SCHEMA_VERSION,
            "database": config.store.database_path.display().to_string(),
        }),

        Command::AddUser {
            name,
            email,
            verified,
            admin,
            bio,
            languages,
        } => {
            let mut user = NewUser::new(name, email);
            user.email_verified = verified;
            user.is_admin = admin;
            user.bio = bio;
            user.languages = languages;
            let id = store.insert_user(&user).context("inserting user")?;
            info!(user_id = %id, "User added");
            json!({ "id": id })
        }

        Command::AddEvent {
            owner,
            slug,
            title,
            capacity,
            public,
            verified_to_view,
            verified_to_join,
            hide_organizer,
            hide_participants,
        } => {
            let privacy = PrivacySettings {
                allow_unregistered_viewers: public,
                require_verified_to_view: verified_to_view,
                require_verified_to_join: verified_to_join,
                hide_organizer_until_joined: hide_organizer,
                hide_participants_until_joined: hide_participants,
            };
            let mut event = NewEvent::new(UserId(owner), slug, title).with_privacy(privacy);
            event.capacity = capacity;
            let id = store.insert_event(&event).context("inserting event")?;
            info!(event_id = %id, "Event added");
            json!({ "id": id })
        }

        Command::View { slug, viewer } => {
            let event = service
                .view_event(&slug, viewer.into())
                .await
                .map_err(user_error)?;
            serde_json::to_value(event)?
        }

        Command::Participants { event_id, viewer } => {
            let viewer = ViewerContext::from(viewer);
            let roster = service
                .list_participants(EventId(event_id), viewer)
                .await
                .map_err(user_error)?;
            let roster = service
                .filter_participants(roster, viewer)
                .await
                .map_err(user_error)?;
            serde_json::to_value(roster)?
        }

        Command::Join { event_id, viewer } => {
            service
                .join(EventId(event_id), viewer.into())
                .await
                .map_err(user_error)?;
            json!({ "joined": event_id })
        }

        Command::Leave { event_id, viewer } => {
            service
                .leave(EventId(event_id), viewer.into())
                .await
                .map_err(user_error)?;
            json!({ "left": event_id })
        }

        Command::Block {
            blocker,
            blocked,
            reason,
        } => {
            service
                .block(UserId(blocker), UserId(blocked), reason)
                .await
                .map_err(user_error)?;
            json!({ "blocked": blocked })
        }

        Command::Unblock { blocker, blocked } => {
            service
                .unblock(UserId(blocker), UserId(blocked))
                .await
                .map_err(user_error)?;
            json!({ "unblocked": blocked })
        }

        Command::Blocks { blocker } => {
            let blocks = service
                .list_blocked(UserId(blocker))
                .await
                .map_err(user_error)?;
            serde_json::to_value(blocks)?
        }
    };

    Ok(output)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    init_logging_with_config(config.logging.to_log_config()?)?;
    init_metrics();

    if config.store.is_in_memory() {
        debug!("Using a throwaway in-memory database");
    }

    let store = Arc::new(SqlStore::open(&config.store).context("opening database")?);
    let output = run(args.command, store, &config).await?;

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
