//! Command execution.

use crate::{text_payloads, ChainArgs, Commands};
use bosswave_client::{
    Client, ListRequest, MakeEntityRequest, Message, PublishRequest, QueryRequest,
    SubscribeRequest,
};
use bosswave_protocol::{po_types, PayloadObject};
use colored::Colorize;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;

/// Leading byte of an entity file holding an entity with its signing key.
const ENTITY_FILE_FORMAT: u8 = 0x32;

#[derive(Serialize)]
struct PayloadOutput {
    #[serde(rename = "type")]
    po_type: String,
    len: usize,
    text: String,
}

#[derive(Serialize)]
struct MessageOutput<'a> {
    uri: &'a str,
    from: &'a str,
    routing_objects: Vec<u8>,
    payload_objects: Vec<PayloadOutput>,
}

impl<'a> From<&'a Message> for MessageOutput<'a> {
    fn from(m: &'a Message) -> Self {
        Self {
            uri: &m.uri,
            from: &m.from,
            routing_objects: m.routing_objects.iter().map(|ro| ro.number()).collect(),
            payload_objects: m.payload_objects.iter().map(payload_output).collect(),
        }
    }
}

fn payload_output(po: &PayloadObject) -> PayloadOutput {
    PayloadOutput {
        po_type: po.po_type().to_string(),
        len: po.content().len(),
        text: String::from_utf8_lossy(po.content()).into_owned(),
    }
}

/// Formats one message for display.
pub fn format_message(m: &Message, json: bool) -> Result<String, serde_json::Error> {
    if json {
        return serde_json::to_string(&MessageOutput::from(m));
    }

    let mut output = format!("{} {}", m.uri.cyan(), format!("from {}", m.from).dimmed());
    for po in &m.payload_objects {
        let out = payload_output(po);
        output.push_str(&format!(
            "\n  {} ({} bytes) {}",
            out.po_type.yellow(),
            out.len,
            out.text
        ));
    }
    Ok(output)
}

fn publish_request(
    uri: String,
    persist: bool,
    text: Vec<String>,
    po: Vec<PayloadObject>,
    verify: bool,
    chain: ChainArgs,
) -> PublishRequest {
    let mut request = PublishRequest::new(uri)
        .with_persist(persist)
        .with_do_verify(verify)
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
    for p in text_payloads(text).chain(po) {
        request = request.with_payload_object(p);
    }
    request
}

/// Subscribes and prints each message until the subscription ends or
/// `stop` completes.
pub async fn subscribe(
    client: &Client,
    request: &SubscribeRequest,
    json: bool,
    stop: impl Future<Output = ()>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut subscription = client.subscribe(request).await?;

    eprintln!("{} to {}", "Subscribed".green(), request.uri.cyan());
    eprintln!("{}", "Press Ctrl+C to stop...".dimmed());

    tokio::pin!(stop);
    loop {
        tokio::select! {
            message = subscription.next() => {
                match message {
                    Some(Ok(m)) => println!("{}", format_message(&m, json)?),
                    Some(Err(e)) => {
                        eprintln!("{}: {}", "Subscription ended".red(), e);
                        return Ok(());
                    }
                    None => return Ok(()),
                }
            }
            _ = &mut stop => return Ok(()),
        }
    }
}

/// Executes a one-shot command and returns the formatted output.
pub async fn execute(
    client: &Client,
    cmd: Commands,
    json: bool,
) -> Result<String, Box<dyn std::error::Error>> {
    match cmd {
        Commands::Subscribe { .. } => Err("subscribe is not a one-shot command".into()),

        Commands::Publish {
            uri,
            text,
            po,
            verify,
            chain,
        } => {
            let request = publish_request(uri.clone(), false, text, po, verify, chain);
            client.publish(&request).await?;
            Ok(format!("{} to {}", "Published".green(), uri.cyan()))
        }

        Commands::Persist {
            uri,
            text,
            po,
            verify,
            chain,
        } => {
            let request = publish_request(uri.clone(), true, text, po, verify, chain);
            client.publish(&request).await?;
            Ok(format!("{} at {}", "Persisted".green(), uri.cyan()))
        }

        Commands::Query { uri, packed, chain } => {
            let mut request = QueryRequest::new(uri)
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

            let messages = client.query(&request).await?;
            if messages.is_empty() && !json {
                return Ok("No messages".yellow().to_string());
            }
            let lines = messages
                .iter()
                .map(|m| format_message(m, json))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(lines.join("\n"))
        }

        Commands::List { uri, chain } => {
            let mut request = ListRequest::new(uri)
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

            let children = client.list(&request).await?;
            if json {
                return Ok(serde_json::to_string(&children)?);
            }
            if children.is_empty() {
                return Ok("No children".yellow().to_string());
            }
            Ok(children
                .iter()
                .map(|c| format!("  {}", c.cyan()))
                .collect::<Vec<_>>()
                .join("\n"))
        }

        Commands::MakeEntity {
            contact,
            comment,
            revoker,
            expiry_delta,
            omit_creation_date,
            output,
        } => {
            let mut request = MakeEntityRequest::new().with_omit_creation_date(omit_creation_date);
            if let Some(contact) = contact {
                request = request.with_contact(contact);
            }
            if let Some(comment) = comment {
                request = request.with_comment(comment);
            }
            if let Some(secs) = expiry_delta {
                request = request.with_expiry_delta(Duration::from_secs(secs));
            }
            for r in revoker {
                request = request.with_revoker(r);
            }

            let result = client.make_entity(&request).await?;
            let vk = result
                .payload_objects
                .iter()
                .find(|po| po.po_type() == po_types::ENTITY_SECRET.po_type());

            match (output, vk) {
                (Some(path), Some(entity)) => {
                    let mut contents = Vec::with_capacity(entity.content().len() + 1);
                    contents.push(ENTITY_FILE_FORMAT);
                    contents.extend_from_slice(entity.content());
                    tokio::fs::write(&path, contents).await?;
                    Ok(format!(
                        "{} entity, saved to {}",
                        "Created".green(),
                        path.display()
                    ))
                }
                (Some(_), None) => Err("router returned no entity key material".into()),
                (None, _) => Ok(format!(
                    "{} entity\n{}",
                    "Created".green(),
                    format_message(&result, json)?
                )),
            }
        }
    }
}
