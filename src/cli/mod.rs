//! Command-line interface parsing and handling
//!
//! This module handles parsing command-line arguments and executing the appropriate commands.

pub mod listing;
pub mod say;
pub mod settings;

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args as ClapArgs, Parser, Subcommand};
use tracing::debug;

use crate::api::{ApiClient, ApiError, ChatApi};
use crate::core::app::{App, AppInitConfig};
use crate::core::config::Config;
use crate::core::session::{SessionKey, SessionLocation};
use crate::ui::chat_loop::run_chat;
use crate::utils::diagnostics::{init_tracing, LogTarget};

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "\ngit: ",
    env!("VERGEN_GIT_DESCRIBE"),
    " (",
    env!("VERGEN_GIT_SHA"),
    ")\nbuilt: ",
    env!("VERGEN_BUILD_DATE"),
);

#[derive(Parser, Debug)]
#[command(name = "logchat")]
#[command(version, long_version = LONG_VERSION)]
#[command(about = "A terminal chat client for the build log analysis chatbot")]
#[command(
    long_about = "logchat is a full-screen terminal client for a chatbot that answers questions \
about CI build logs. Conversations are stored on the server and can be reopened by key or \
by their shareable ?chat= location.\n\n\
Environment Variables:\n\
  LOGCHAT_BASE_URL  Server URL (overridden by --base-url)\n\
  LOGCHAT_LOG       Diagnostic log filter, e.g. logchat=debug\n\n\
Controls:\n\
  Enter             Send the message\n\
  Alt+Enter         Insert a newline\n\
  Tab               Switch between the input and the chat list\n\
  Ctrl+N            Start a new chat\n\
  Ctrl+R            Retry a message that failed to send\n\
  Ctrl+L            Refresh the chat list\n\
  PgUp/PgDn         Scroll the conversation\n\
  Esc / Ctrl+C      Quit"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Chatbot server URL
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// Append the conversation to the specified file
    #[arg(short = 'l', long, global = true, value_name = "FILE")]
    pub log: Option<String>,

    /// Enable debug diagnostics
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,
}

/// Which conversation to open at startup.
#[derive(ClapArgs, Debug, Default, Clone, PartialEq, Eq)]
pub struct OpenTarget {
    /// Session key of an existing chat
    #[arg(long, value_name = "KEY", conflicts_with = "url")]
    pub chat: Option<String>,

    /// Shareable location of a chat, e.g. http://host/?chat=abc123
    #[arg(long, value_name = "URL")]
    pub url: Option<String>,
}

impl OpenTarget {
    pub fn session_key(&self) -> Result<Option<SessionKey>, String> {
        if let Some(raw) = &self.chat {
            return SessionKey::parse(raw)
                .map(Some)
                .ok_or_else(|| "chat key must not be empty".to_string());
        }
        match &self.url {
            Some(raw) => Ok(SessionLocation::from_url(raw)?.key().cloned()),
            None => Ok(None),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the chat interface (default)
    Chat {
        #[command(flatten)]
        open: OpenTarget,
    },
    /// Send one message and print the reply
    Say {
        /// Message to send
        #[arg(trailing_var_arg = true, required = true)]
        prompt: Vec<String>,
        /// Continue an existing chat instead of starting a new one
        #[arg(long, value_name = "KEY")]
        chat: Option<String>,
    },
    /// List chats, newest first
    List,
    /// Search chats by keyword
    Search {
        #[arg(trailing_var_arg = true)]
        keyword: Vec<String>,
    },
    /// Print the transcript of a chat
    History { key: String },
    /// Print the stored log record of a chat
    Log { key: String },
    /// Upload a build log and start a chat about it
    Upload {
        #[arg(long, value_name = "NAME")]
        job: String,
        #[arg(long, value_name = "NUMBER")]
        build: String,
        file: PathBuf,
    },
    /// Print a build log by job name and build number
    BuildLog {
        #[arg(long, value_name = "NAME")]
        job: String,
        #[arg(long, value_name = "NUMBER")]
        build: String,
    },
    /// Set configuration values
    Set {
        /// Configuration key to set
        key: String,
        /// Value to set for the key
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        value: Option<Vec<String>>,
    },
    /// Unset configuration values
    Unset {
        /// Configuration key to unset
        key: String,
    },
}

pub fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let verbose = args.verbose;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime
        .block_on(async_main(args))
        .map_err(|err| with_detail(err, verbose))
}

/// Appends the technical cause of an API failure to its user-facing text.
fn with_detail(err: Box<dyn Error>, verbose: bool) -> Box<dyn Error> {
    match err.downcast_ref::<ApiError>() {
        Some(api_err) if verbose && !api_err.detail().is_empty() => format!(
            "{api_err}\n   {}: {}",
            api_err.operation().label(),
            api_err.detail()
        )
        .into(),
        _ => err,
    }
}

fn parse_key(raw: &str) -> Result<SessionKey, Box<dyn Error>> {
    SessionKey::parse(raw).ok_or_else(|| "chat key must not be empty".into())
}

fn build_client(config: &Config, base_url: &str) -> Result<Arc<dyn ChatApi>, Box<dyn Error>> {
    let client = ApiClient::new(base_url, config.request_timeout())?;
    Ok(Arc::new(client))
}

async fn async_main(args: Args) -> Result<(), Box<dyn Error>> {
    let command = args.command.unwrap_or(Commands::Chat {
        open: OpenTarget::default(),
    });

    let target = match command {
        Commands::Chat { .. } => LogTarget::data_file(),
        _ => LogTarget::Stderr,
    };
    init_tracing(target, args.verbose)?;

    match command {
        Commands::Set { key, value } => {
            return settings::run_set(&key, value.as_deref().unwrap_or_default());
        }
        Commands::Unset { key } => return settings::run_unset(&key),
        _ => {}
    }

    let config = Config::load()?;
    let base_url = config.resolved_base_url(args.base_url.as_deref());
    debug!(%base_url, "resolved server");
    let api = build_client(&config, &base_url)?;

    match command {
        Commands::Chat { open } => {
            let session = open.session_key()?;
            let app = App::new(AppInitConfig {
                base_url,
                session,
                log_file: args.log,
            })?;
            run_chat(app, api).await
        }
        Commands::Say { prompt, chat } => {
            let chat = chat.as_deref().map(parse_key).transpose()?;
            say::run_say(api.as_ref(), &base_url, prompt, chat).await
        }
        Commands::List => listing::list_chats(api.as_ref()).await,
        Commands::Search { keyword } => listing::search_chats(api.as_ref(), keyword).await,
        Commands::History { key } => listing::print_history(api.as_ref(), &parse_key(&key)?).await,
        Commands::Log { key } => listing::print_log(api.as_ref(), &parse_key(&key)?).await,
        Commands::Upload { job, build, file } => {
            listing::upload_log(api.as_ref(), job, build, &file).await
        }
        Commands::BuildLog { job, build } => {
            listing::print_build_log(api.as_ref(), &job, &build).await
        }
        Commands::Set { .. } | Commands::Unset { .. } => Ok(()),
    }
}
