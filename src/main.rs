use std::sync::Arc;

use clap::{Parser, Subcommand};
use time::Date;
use time::macros::format_description;
use tracing::info;
use tracing_subscriber::EnvFilter;

use comment_board::CommentBoardController;
use comment_board::config::{BoardConfig, ConfigError, api_prefix_for_path};
use comment_board::state::BoardState;
use comment_board::store::{HttpCommentStore, StoreError};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("store client error: {0}")]
    Store(#[from] StoreError),
    #[error("bucket `{0}` is not in the bucket list")]
    UnknownBucket(String),
}

#[derive(Parser, Debug)]
#[command(name = "comment-board", about = "Browse and edit a comment board on a remote comment store")]
struct Cli {
    /// Store base URL (overrides COMMENTS_BASE_URL)
    #[arg(long)]
    base_url: Option<String>,

    /// API prefix (overrides COMMENTS_API_PREFIX)
    #[arg(long, conflicts_with = "page_path")]
    api_prefix: Option<String>,

    /// Page path to derive the API prefix from, e.g. `/xyz/app/comments`
    #[arg(long)]
    page_path: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load the board and print it.
    Show,
    /// Create the bucket `comments-<name>`.
    CreateIndex { name: String },
    /// Submit a comment.
    Submit {
        #[arg(long)]
        body: String,
        /// Day the comment is about (YYYY-MM-DD), today if absent
        #[arg(long, value_parser = parse_date)]
        date: Option<Date>,
        /// Full bucket name, the default bucket if absent
        #[arg(long)]
        index: Option<String>,
    },
    /// Delete a comment.
    Delete { index: String, id: String },
}

impl Cli {
    fn board_config(&self) -> Result<BoardConfig, ConfigError> {
        let mut config = BoardConfig::from_env()?;
        if let Some(base_url) = &self.base_url {
            config.base_url.clone_from(base_url);
        }
        if let Some(prefix) = &self.api_prefix {
            config.api_prefix.clone_from(prefix);
        }
        if let Some(page_path) = &self.page_path {
            config.api_prefix = api_prefix_for_path(page_path);
        }
        config.normalized()
    }
}

fn parse_date(raw: &str) -> Result<Date, String> {
    Date::parse(raw, format_description!("[year]-[month]-[day]")).map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.board_config()?;
    info!(base_url = %config.base_url, api_prefix = %config.api_prefix, "connecting to comment store");

    let store = Arc::new(HttpCommentStore::new(&config)?);
    let board = CommentBoardController::activate(store);
    board.wait_idle().await;

    match cli.command {
        Command::Show => {}
        Command::CreateIndex { name } => {
            board.set_pending_bucket_name(name);
            board.create_pending_bucket();
        }
        Command::Submit { body, date, index } => {
            if let Some(index) = index {
                if !board.select_bucket(Some(index.as_str())) {
                    return Err(CliError::UnknownBucket(index));
                }
            }
            if let Some(date) = date {
                board.set_draft_date(date);
            }
            board.set_draft_body(body);
            board.submit_comment(true);
        }
        Command::Delete { index, id } => board.delete_comment(&index, &id),
    }

    board.wait_idle().await;
    print_board(&board.snapshot());
    Ok(())
}

fn print_board(state: &BoardState) {
    if let Some(message) = &state.message {
        println!("[{:?}] {}", message.severity, message.text);
    }

    println!("indices:");
    for bucket in &state.buckets {
        let marker = if state.selected_bucket.as_ref() == Some(bucket) { "*" } else { " " };
        println!(" {marker} {}", bucket.name);
    }

    println!("comments:");
    if state.comments.is_empty() {
        println!("   (none)");
    }
    for comment in &state.comments {
        let id = comment.id.as_deref().unwrap_or("-");
        println!("   {}  {:<20} {id}  {}", comment.date, comment.bucket_name, comment.body);
    }
}
