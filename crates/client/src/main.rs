//! anonchat terminal client.
//!
//! Lines typed on stdin are sent to the room. `/file <path>` shares a file,
//! `/who` lists participants and `/quit` leaves the room.

use std::path::PathBuf;
use std::sync::Arc;

use anonchat_client::{
    logging, random_display_name, ApiClient, ChatSession, ClientConfig, SessionEvent,
};
use anonchat_shared::{Message, MessageKind};
use anyhow::{bail, Context};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

#[derive(Parser, Debug)]
#[command(name = "anonchat", about = "Ephemeral anonymous chat rooms")]
struct Args {
    /// Room to join
    #[arg(short, long, conflicts_with = "create")]
    room: Option<String>,

    /// Display name; a random one is picked when omitted
    #[arg(short, long)]
    name: Option<String>,

    /// Create a new room for up to N participants and join it
    #[arg(long, value_name = "N")]
    create: Option<u32>,

    /// Config file to use instead of the platform default
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

enum Command<'a> {
    Quit,
    Who,
    File(&'a str),
    Text(&'a str),
}

fn parse_command(line: &str) -> Command<'_> {
    match line.trim() {
        "/quit" => Command::Quit,
        "/who" => Command::Who,
        other => match other.strip_prefix("/file ") {
            Some(path) => Command::File(path.trim()),
            None => Command::Text(line),
        },
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init(if args.verbose {
        logging::VERBOSE_FILTER
    } else {
        logging::DEFAULT_FILTER
    });

    let config = match &args.config {
        Some(path) => ClientConfig::from_path(path)?,
        None => ClientConfig::load()?,
    }
    .with_overrides(|key| std::env::var(key).ok());

    let room_id = match (args.room, args.create) {
        (Some(room), _) => room,
        (None, Some(max_participants)) => {
            let api = ApiClient::from_config(&config);
            let room = api
                .create_room(max_participants)
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message()))
                .context("could not create room")?;
            println!("Room created: {}", room.chat_id);
            println!("Web: {}", room.web_address);
            if let Some(onion) = &room.onion_address {
                println!("Onion: {onion}");
            }
            room.chat_id
        }
        (None, None) => bail!("either --room or --create is required"),
    };
    let name = args.name.unwrap_or_else(random_display_name);

    let session = Arc::new(ChatSession::new(&room_id, &name, &config)?);
    println!("Joining {room_id} as {name}");
    let printer = tokio::spawn(print_events(session.clone()));
    session.connect();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_command(&line) {
            Command::Quit => break,
            Command::Who => {
                let state = session.state();
                println!(
                    "{} of {} in the room:",
                    state.participants.len(),
                    state.room_capacity
                );
                for participant in &state.participants {
                    println!("  {}", participant.username);
                }
            }
            Command::File(path) => {
                if let Err(error) = session.send_file(path).await {
                    eprintln!("file not sent: {error}");
                }
            }
            Command::Text(text) => match session.send(text) {
                Ok(_) | Err(anonchat_client::SendError::Empty) => {}
                Err(error) => eprintln!("not sent: {error}"),
            },
        }
    }

    session.close();
    printer.abort();
    Ok(())
}

async fn print_events(session: Arc<ChatSession>) {
    let mut events = session.subscribe();
    loop {
        match events.recv().await {
            Ok(SessionEvent::MessageAppended(message)) => {
                let own = session.is_own_message(&message);
                println!("{}", render(&message, own));
            }
            Ok(SessionEvent::StatusChanged(status)) => println!("* {status}"),
            Ok(SessionEvent::Error(error)) => eprintln!("! {error}"),
            Ok(SessionEvent::RosterChanged { .. }) => {}
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "event printer fell behind");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

fn render(message: &Message, own: bool) -> String {
    let time = message.timestamp.format("%H:%M");
    let who = if own { "you" } else { message.sender_name.as_str() };
    match message.kind {
        MessageKind::Join | MessageKind::Leave | MessageKind::System => {
            format!("[{time}] -- {}", message.content)
        }
        MessageKind::File => match &message.file_info {
            Some(file) => format!("[{time}] {who} shared {} ({})", file.name, file.human_size()),
            None => format!("[{time}] {who}: {}", message.content),
        },
        MessageKind::Text => format!("[{time}] {who}: {}", message.content),
    }
}
