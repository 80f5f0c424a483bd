use clap::{Args, Parser, Subcommand};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};

use freeshow_remote::api::favorites::{
    ApiFavorite, FavoriteCandidate, FavoritesRepository, is_action_favorited, resolve_favorite,
};
use freeshow_remote::api::schema::{
    ApiCommandDef, CommandParam, CommandRegistry, DEFAULT_ANCHORS, ParamType, coerce_value,
    load_raw_schema, validate_invocation,
};
use freeshow_remote::api::transport::{ApiTransport, TransportEvent, WireFormat};
use freeshow_remote::config::{ConfigArgs, RemoteConfig};
use freeshow_remote::db::SqliteStorage;

type CliResult<T = ()> = Result<T, Box<dyn Error>>;

const SEND_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);
const QUERY_WAIT_SECS: u64 = 3;

#[derive(Parser)]
#[command(name = "freeshow-remote")]
#[command(about = "Send remote commands to a FreeShow host and manage favorite commands")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args)]
pub struct GlobalArgs {
    /// Host running FreeShow (falls back to FREESHOW_HOST)
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Command API port (falls back to FREESHOW_API_PORT, then 5505)
    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// Wire format: json or socket-io (falls back to FREESHOW_WIRE)
    #[arg(long, global = true)]
    pub wire: Option<WireFormat>,

    /// Reconnection attempts after a failed or lost connection
    #[arg(long, global = true)]
    pub reconnect_attempts: Option<u32>,

    /// Delay between reconnection attempts in milliseconds
    #[arg(long, global = true)]
    pub reconnect_delay_ms: Option<u64>,

    /// SQLite database holding favorites (falls back to DATABASE_URL, then remote.db)
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,

    /// Raw schema JSON file to derive the command catalog from
    #[arg(long, global = true)]
    pub schema: Option<PathBuf>,
}

impl From<GlobalArgs> for ConfigArgs {
    fn from(args: GlobalArgs) -> Self {
        ConfigArgs {
            host: args.host,
            api_port: args.port,
            wire_format: args.wire,
            reconnect_attempts: args.reconnect_attempts,
            reconnect_delay_ms: args.reconnect_delay_ms,
            database: args.database,
            schema: args.schema,
        }
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// List command categories, or the commands of one category
    Catalog {
        #[arg(long)]
        category: Option<String>,
    },
    /// Send one command to the host
    Send {
        action: String,

        #[command(flatten)]
        args: CommandArgs,

        /// Skip schema validation and send unknown actions as-is
        #[arg(long)]
        force: bool,

        /// Seconds to wait for a response (defaults to 3 for get_ commands)
        #[arg(long)]
        wait: Option<u64>,
    },
    /// Manage favorite commands
    Favorites {
        #[command(subcommand)]
        command: FavoritesCommand,
    },
    /// Stay connected and print everything the host sends
    Listen,
}

#[derive(Subcommand)]
pub enum FavoritesCommand {
    /// Show saved favorites, most recent first
    List,
    /// Save a catalog command, optionally with arguments
    AddAction {
        action: String,

        #[command(flatten)]
        args: CommandArgs,

        #[arg(long)]
        force: bool,
    },
    /// Save a raw payload: a JSON object with an `action` field or a bare action id
    AddCustom { payload: String },
    Remove { id: String },
    /// Star or unstar a command without arguments
    Toggle { action: String },
    /// Send a saved favorite
    Run {
        id: String,

        #[arg(long)]
        wait: Option<u64>,
    },
}

#[derive(Args)]
pub struct CommandArgs {
    /// Arguments as a JSON object
    #[arg(long)]
    pub data: Option<String>,

    /// Single argument as key=value, coerced using the command's schema
    #[arg(short = 'p', long = "param", value_parser = parse_key_val)]
    pub params: Vec<(String, String)>,
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{}`", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty parameter name in `{}`", s));
    }
    Ok((key.to_string(), value.to_string()))
}

pub async fn run(cli: Cli) -> CliResult {
    let config = RemoteConfig::from_env(cli.global.into())?;
    let registry = load_registry(&config)?;

    match cli.command {
        Command::Catalog { category } => print_catalog(&registry, category.as_deref()),
        Command::Send {
            action,
            args,
            force,
            wait,
        } => {
            let command = registry.find_command_by_id(&action).map(|l| l.command);
            let data = build_arguments(command, &args, force, &action)?;
            let wait = response_wait(command, wait);
            send_once(&config, &action, data, wait).await
        }
        Command::Favorites { command } => run_favorites(&config, &registry, command).await,
        Command::Listen => listen(&config).await,
    }
}

fn load_registry(config: &RemoteConfig) -> CliResult<Cow<'static, CommandRegistry>> {
    match &config.schema {
        Some(path) => {
            let raw = load_raw_schema(path)?;
            let registry = CommandRegistry::from_raw_schema(&raw, DEFAULT_ANCHORS)?;
            tracing::info!(
                path = %path.display(),
                commands = registry.len(),
                "loaded command schema"
            );
            Ok(Cow::Owned(registry))
        }
        None => Ok(Cow::Borrowed(CommandRegistry::builtin())),
    }
}

fn format_param(name: &str, param: &CommandParam) -> String {
    let kind = match &param.kind {
        ParamType::Enum(values) => values.join("|"),
        other => other.name().to_string(),
    };
    let marker = if param.required { "" } else { "?" };
    format!("{}{}: {}", name, marker, kind)
}

fn print_catalog(registry: &CommandRegistry, category: Option<&str>) -> CliResult {
    let Some(id) = category else {
        for category in registry.list_categories() {
            let count = category.commands.len();
            println!("{:<12} {:<20} {} commands", category.id, category.label, count);
        }
        return Ok(());
    };

    let category = registry
        .find_category(id)
        .ok_or_else(|| format!("unknown category `{}`", id))?;
    println!("{} ({})", category.label, category.id);
    for command in &category.commands {
        let params = command
            .params
            .iter()
            .flatten()
            .map(|(name, param)| format_param(name, param))
            .collect::<Vec<_>>()
            .join(", ");
        println!("  {:<32} {:<32} {}", command.id, command.label, params);
    }
    Ok(())
}

fn build_arguments(
    command: Option<&ApiCommandDef>,
    args: &CommandArgs,
    force: bool,
    action: &str,
) -> CliResult<Map<String, Value>> {
    if command.is_none() && !force {
        return Err(format!("unknown action `{}` (use --force to send it anyway)", action).into());
    }

    let mut data = match &args.data {
        Some(raw) => match serde_json::from_str::<Value>(raw)? {
            Value::Object(map) => map,
            _ => return Err("--data must be a JSON object".into()),
        },
        None => Map::new(),
    };

    for (key, text) in &args.params {
        let value = match command.and_then(|c| c.param(key)) {
            Some(param) => coerce_value(param, text).ok_or_else(|| {
                format!("invalid {} value for `{}`: {}", param.kind.name(), key, text)
            })?,
            None => serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.clone())),
        };
        data.insert(key.clone(), value);
    }

    if let Some(command) = command
        && !force
        && let Err(issues) = validate_invocation(command, &data)
    {
        let details = issues
            .iter()
            .map(|issue| issue.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(format!("invalid arguments for `{}`: {}", action, details).into());
    }

    Ok(data)
}

fn response_wait(command: Option<&ApiCommandDef>, wait: Option<u64>) -> Duration {
    let default = if command.is_some_and(ApiCommandDef::is_query) {
        QUERY_WAIT_SECS
    } else {
        0
    };
    Duration::from_secs(wait.unwrap_or(default))
}

async fn open_transport(config: &RemoteConfig) -> CliResult<ApiTransport> {
    let info = config.connection_info()?;
    let mut transport = ApiTransport::new(config.transport.clone());
    let mut events = transport.subscribe();
    transport.sync(&info);

    let connected = tokio::time::timeout(config.transport.max_connect_wait(), async {
        loop {
            match events.recv().await {
                Ok(TransportEvent::Connected) => return true,
                Ok(TransportEvent::Error(message)) => eprintln!("connection error: {}", message),
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => return false,
            }
        }
    })
    .await
    .unwrap_or(false);

    if !connected {
        let reason = transport
            .state()
            .error
            .unwrap_or_else(|| "timed out".to_string());
        let host = info.host.unwrap_or_default();
        return Err(format!("could not connect to {}:{}: {}", host, config.api_port, reason).into());
    }
    Ok(transport)
}

/// Wait until the connection task has written `count` frames.
async fn flush(transport: &ApiTransport, count: u64) -> CliResult {
    let deadline = tokio::time::Instant::now() + SEND_FLUSH_TIMEOUT;
    loop {
        let state = transport.state();
        if state.sent_count >= count {
            return Ok(());
        }
        if !state.connected || tokio::time::Instant::now() >= deadline {
            let reason = state.error.unwrap_or_else(|| "send timed out".to_string());
            return Err(reason.into());
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

async fn next_response(
    events: &mut broadcast::Receiver<TransportEvent>,
    wait: Duration,
) -> Option<Value> {
    tokio::time::timeout(wait, async {
        loop {
            match events.recv().await {
                Ok(TransportEvent::Response(value)) => return Some(value),
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => return None,
            }
        }
    })
    .await
    .ok()
    .flatten()
}

fn print_value(value: &Value) {
    match value {
        Value::String(text) => println!("{}", text),
        other => println!(
            "{}",
            serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string())
        ),
    }
}

async fn send_once(
    config: &RemoteConfig,
    action: &str,
    data: Map<String, Value>,
    wait: Duration,
) -> CliResult {
    let mut transport = open_transport(config).await?;
    let mut events = transport.subscribe();

    transport.send(action, data).await;
    if let Some(error) = transport.state().error {
        return Err(error.into());
    }
    flush(&transport, 1).await?;
    println!("sent {}", action);

    if !wait.is_zero() {
        match next_response(&mut events, wait).await {
            Some(value) => print_value(&value),
            None => eprintln!("no response within {}s", wait.as_secs()),
        }
    }

    transport.disconnect();
    Ok(())
}

async fn listen(config: &RemoteConfig) -> CliResult {
    let transport = open_transport(config).await?;
    let mut events = transport.subscribe();
    println!("listening, press Ctrl-C to stop");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(TransportEvent::Response(value)) => print_value(&value),
                Ok(TransportEvent::Connected) => eprintln!("connected"),
                Ok(TransportEvent::Disconnected) => eprintln!("disconnected"),
                Ok(TransportEvent::Error(message)) => eprintln!("error: {}", message),
                Err(RecvError::Lagged(skipped)) => eprintln!("skipped {} events", skipped),
                Err(RecvError::Closed) => break,
            },
        }
    }

    drop(transport);
    Ok(())
}

fn print_favorites(favorites: &[ApiFavorite]) {
    if favorites.is_empty() {
        println!("no favorites saved");
        return;
    }
    for favorite in favorites {
        println!("{:<40} {}", favorite.id(), favorite.describe());
    }
}

async fn run_favorites(
    config: &RemoteConfig,
    registry: &CommandRegistry,
    command: FavoritesCommand,
) -> CliResult {
    let repository = FavoritesRepository::new(SqliteStorage::open(&config.database)?);

    match command {
        FavoritesCommand::List => print_favorites(&repository.load_favorites()?),
        FavoritesCommand::AddAction {
            action,
            args,
            force,
        } => {
            let command = registry.find_command_by_id(&action).map(|l| l.command);
            let data = build_arguments(command, &args, force, &action)?;
            let candidate = FavoriteCandidate::action_with_data(action, data);
            let favorites = repository.add_favorite(candidate)?;
            if let Some(saved) = favorites.first() {
                println!("saved {}", saved.id());
            }
        }
        FavoritesCommand::AddCustom { payload } => {
            if payload.trim().is_empty() {
                return Err("custom payload is empty".into());
            }
            let favorites = repository.add_favorite(FavoriteCandidate::custom(payload))?;
            if let Some(saved) = favorites.first() {
                println!("saved {}", saved.id());
            }
        }
        FavoritesCommand::Remove { id } => {
            let before = repository.load_favorites()?.len();
            let after = repository.remove_favorite(&id)?.len();
            if before == after {
                eprintln!("no favorite with id {}", id);
            } else {
                println!("removed {}", id);
            }
        }
        FavoritesCommand::Toggle { action } => {
            if registry.find_command_by_id(&action).is_none() {
                return Err(format!("unknown action `{}`", action).into());
            }
            let favorites = repository.toggle_action_id(&action)?;
            if is_action_favorited(&favorites, &action) {
                println!("starred {}", action);
            } else {
                println!("unstarred {}", action);
            }
        }
        FavoritesCommand::Run { id, wait } => {
            let favorite = repository
                .load_favorites()?
                .into_iter()
                .find(|f| f.id() == id)
                .ok_or_else(|| format!("no favorite with id {}", id))?;
            let args = resolve_favorite(&favorite)
                .ok_or_else(|| format!("favorite {} has an empty payload", id))?;
            let command = registry.find_command_by_id(&args.action).map(|l| l.command);
            let wait = response_wait(command, wait);
            send_once(config, &args.action, args.data.unwrap_or_default(), wait).await?;
        }
    }
    Ok(())
}
