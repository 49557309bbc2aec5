//! graphchat CLI binary entry point.

use std::io::Write;
use std::sync::Arc;

use clap::Parser;
use graphchat::cli::{unseen_suffix, AskArgs, Cli, Commands, HistoryArgs};
use graphchat::client::HttpRunClient;
use graphchat::config::SyncConfig;
use graphchat::persistence::{
    Authenticator, ChatRepository, FileChatRepository, PersistenceGateway, StaticAuthenticator,
};
use graphchat::sync::Synchronizer;
use graphchat::types::MessageStatus;
use graphchat::ui::{project, UiContent};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.clone();

    let result = match cli.command {
        Commands::Ask(args) => handle_ask(args, config_path.as_deref()).await,
        Commands::History(args) => handle_history(args).await,
        Commands::Check => handle_check(config_path.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn handle_ask(
    args: AskArgs,
    config_path: Option<&std::path::Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = args.resolve_config(config_path)?;
    let client = Arc::new(HttpRunClient::from_config(&config)?);
    let sync = Arc::new(Synchronizer::from_config(client, &config));

    let repository = Arc::new(match &args.store_dir {
        Some(dir) => FileChatRepository::new(dir),
        None => FileChatRepository::new_default(),
    });
    let auth: Arc<dyn Authenticator> = match &args.user {
        Some(user) => Arc::new(StaticAuthenticator::user(user)),
        None => Arc::new(StaticAuthenticator::anonymous()),
    };
    let gateway = PersistenceGateway::new(auth, repository)
        .with_title_max_chars(config.title_max_chars);

    let store = sync.start_conversation(Some(Arc::new(gateway))).await?;
    eprintln!("chat {}", store.chat_id());

    for question in &args.questions {
        eprintln!("> {question}");
        let handle = sync.start_turn(&store, question.as_str())?;
        let mut display = handle.display.clone();
        let mut printed = String::new();

        loop {
            let frame = display.borrow_and_update().clone();
            if let UiContent::Bot { text, status } = &frame.value {
                if *status == Some(MessageStatus::Error) {
                    println!();
                    eprintln!("run failed: {text}");
                } else if let Some(suffix) = unseen_suffix(&printed, text) {
                    print!("{suffix}");
                    let _ = std::io::stdout().flush();
                    printed = text.clone();
                }
            }
            if frame.done || display.changed().await.is_err() {
                break;
            }
        }

        handle.wait().await?;
        println!();
    }

    Ok(())
}

async fn handle_history(args: HistoryArgs) -> Result<(), Box<dyn std::error::Error>> {
    let repository = match &args.store_dir {
        Some(dir) => FileChatRepository::new(dir),
        None => FileChatRepository::new_default(),
    };
    let chat = repository
        .load_chat(&args.user, &args.chat_id)
        .await?
        .ok_or_else(|| format!("no saved chat {} for user {}", args.chat_id, args.user))?;

    println!("{} ({})", chat.title, chat.created_at.to_rfc3339());
    for row in project(&chat.to_state()) {
        match &row.display {
            UiContent::User { text } => println!("[{}] you: {text}", row.id),
            UiContent::Bot { text, .. } => println!("[{}] bot: {text}", row.id),
            UiContent::Card { card } => println!("[{}] card: {}", row.id, serde_json::to_string(card)?),
            UiContent::Empty => {}
        }
    }
    Ok(())
}

fn handle_check(config_path: Option<&std::path::Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = SyncConfig::load(config_path)?;
    let missing = config.missing_keys();
    if missing.is_empty() {
        println!("backend: {}", config.backend_url());
        println!("assistant: {}", config.assistant_id);
        println!("generation node: {}", config.generation_node);
    } else {
        for key in missing {
            println!("missing: {key}");
        }
    }
    Ok(())
}
