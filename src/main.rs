//! bw - Command-line client for the Bosswave router
//!
//! Publishes, subscribes, queries and manages entities through the local
//! router agent.

mod commands;

use bosswave_client::{ChainElaborationLevel, Client, ConnectionConfig, SubscribeRequest};
use bosswave_protocol::{po_types, PayloadObject, PayloadType};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bw")]
#[command(about = "Command-line client for the Bosswave router")]
#[command(version)]
struct Cli {
    /// Router agent address
    #[arg(short, long, env = "BW2_AGENT", default_value = "127.0.0.1:28589")]
    agent: SocketAddr,

    /// Entity file to act as
    #[arg(short, long, env = "BW2_DEFAULT_ENTITY")]
    entity: Option<PathBuf>,

    /// Seconds to wait for router replies
    #[arg(long, default_value = "30")]
    timeout: u64,

    /// Print messages as JSON lines
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by requests that carry an access chain.
#[derive(Args, Clone, Debug)]
pub(crate) struct ChainArgs {
    /// Primary access chain hash
    #[arg(long)]
    pac: Option<String>,

    /// Chain elaboration level (unspecified, partial, full)
    #[arg(long, default_value = "unspecified")]
    elaborate: ChainElaborationLevel,

    /// Let the router build a chain automatically
    #[arg(long)]
    autochain: bool,

    /// Absolute expiry (RFC 3339)
    #[arg(long, value_parser = parse_expiry)]
    expiry: Option<DateTime<Utc>>,

    /// Relative expiry in seconds
    #[arg(long)]
    expiry_delta: Option<u64>,
}

impl ChainArgs {
    fn expiry_delta(&self) -> Option<Duration> {
        self.expiry_delta.map(Duration::from_secs)
    }
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Publish a message
    Publish {
        /// Destination URI
        uri: String,

        /// Text payload (repeatable)
        #[arg(short, long)]
        text: Vec<String>,

        /// Typed payload as TYPE=CONTENT, e.g. 64.0.0.0:=hello (repeatable)
        #[arg(long, value_parser = parse_payload_object)]
        po: Vec<PayloadObject>,

        /// Ask the router to verify the message
        #[arg(long)]
        verify: bool,

        #[command(flatten)]
        chain: ChainArgs,
    },

    /// Publish a message and persist it at the URI
    Persist {
        /// Destination URI
        uri: String,

        /// Text payload (repeatable)
        #[arg(short, long)]
        text: Vec<String>,

        /// Typed payload as TYPE=CONTENT (repeatable)
        #[arg(long, value_parser = parse_payload_object)]
        po: Vec<PayloadObject>,

        /// Ask the router to verify the message
        #[arg(long)]
        verify: bool,

        #[command(flatten)]
        chain: ChainArgs,
    },

    /// Subscribe to a URI pattern and print messages until interrupted
    Subscribe {
        /// URI pattern
        uri: String,

        /// Leave routing and payload objects packed
        #[arg(long)]
        packed: bool,

        #[command(flatten)]
        chain: ChainArgs,
    },

    /// Query persisted messages
    Query {
        /// URI pattern
        uri: String,

        /// Leave routing and payload objects packed
        #[arg(long)]
        packed: bool,

        #[command(flatten)]
        chain: ChainArgs,
    },

    /// List children of a URI
    List {
        /// Parent URI
        uri: String,

        #[command(flatten)]
        chain: ChainArgs,
    },

    /// Create a new entity
    MakeEntity {
        /// Contact information
        #[arg(long)]
        contact: Option<String>,

        /// Free-form comment
        #[arg(long)]
        comment: Option<String>,

        /// Revoker entity (repeatable)
        #[arg(long)]
        revoker: Vec<String>,

        /// Relative expiry in seconds
        #[arg(long)]
        expiry_delta: Option<u64>,

        /// Omit the creation date
        #[arg(long)]
        omit_creation_date: bool,

        /// Write the new entity to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn parse_expiry(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| e.to_string())
}

fn parse_payload_object(s: &str) -> Result<PayloadObject, String> {
    let (po_type, content) = s
        .split_once('=')
        .ok_or_else(|| format!("expected TYPE=CONTENT, got {:?}", s))?;
    let po_type: PayloadType = po_type.parse().map_err(|e| format!("{}", e))?;
    Ok(PayloadObject::new(po_type, content.to_string()))
}

fn text_payloads(texts: Vec<String>) -> impl Iterator<Item = PayloadObject> {
    texts
        .into_iter()
        .map(|t| PayloadObject::new(po_types::TEXT.po_type(), t))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = ConnectionConfig::new(cli.agent)
        .with_request_timeout(Duration::from_secs(cli.timeout));
    if let Some(ref entity) = cli.entity {
        config = config.with_entity_file(entity);
    }
    let client = Client::new(config);

    client.connect().await.map_err(|e| {
        eprintln!("{}: {}", "Connection failed".red(), e);
        e
    })?;
    tracing::debug!("Connected to {}", cli.agent);

    let result = match cli.command {
        Commands::Subscribe { uri, packed, chain } => {
            let mut request = SubscribeRequest::new(&uri)
                .with_leave_packed(packed)
                .with_elaboration(chain.elaborate)
                .with_auto_chain(chain.autochain);
            if let Some(pac) = chain.pac.clone() {
                request = request.with_primary_access_chain(pac);
            }
            if let Some(expiry) = chain.expiry {
                request = request.with_expiry(expiry);
            }
            if let Some(delta) = chain.expiry_delta() {
                request = request.with_expiry_delta(delta);
            }

            let stop = async {
                let _ = tokio::signal::ctrl_c().await;
                eprintln!("\n{}", "Stopping subscription...".dimmed());
            };
            commands::subscribe(&client, &request, cli.json, stop)
                .await
                .map(|()| String::new())
        }
        cmd => commands::execute(&client, cmd, cli.json).await,
    };

    client.close().await?;

    match result {
        Ok(output) => {
            if !output.is_empty() {
                println!("{}", output);
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_publish() {
        let cli = Cli::try_parse_from([
            "bw",
            "--agent",
            "127.0.0.1:4000",
            "publish",
            "a/b",
            "-t",
            "hello",
            "--po",
            ":5=x",
            "--elaborate",
            "full",
        ])
        .unwrap();

        assert_eq!(cli.agent, "127.0.0.1:4000".parse().unwrap());
        match cli.command {
            Commands::Publish {
                uri,
                text,
                po,
                chain,
                ..
            } => {
                assert_eq!(uri, "a/b");
                assert_eq!(text, vec!["hello"]);
                assert_eq!(po[0].po_type(), PayloadType::Number(5));
                assert_eq!(chain.elaborate, ChainElaborationLevel::Full);
            }
            _ => panic!("expected publish"),
        }
    }

    #[test]
    fn test_parse_payload_object() {
        let po = parse_payload_object("64.0.0.0:=a=b").unwrap();
        assert_eq!(po.po_type(), PayloadType::Octet([64, 0, 0, 0]));
        assert_eq!(po.content().as_ref(), b"a=b");

        assert!(parse_payload_object("no-separator").is_err());
        assert!(parse_payload_object("1.2.3:=x").is_err());
    }

    #[test]
    fn test_parse_expiry() {
        let t = parse_expiry("2030-01-02T03:04:05+01:00").unwrap();
        assert_eq!(t.to_rfc3339(), "2030-01-02T02:04:05+00:00");
        assert!(parse_expiry("tomorrow").is_err());
    }

    #[test]
    fn test_text_payloads_use_text_type() {
        let pos: Vec<_> = text_payloads(vec!["x".into()]).collect();
        assert_eq!(pos[0].po_type(), po_types::TEXT.po_type());
    }
}
