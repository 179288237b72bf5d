//! JSON-lines driver over stdin/stdout.
//!
//! Each input line is one request object:
//!
//! ```text
//! {"id": 1, "owner": "alice", "op": "get", "contact_id": 3}
//! ```
//!
//! and produces exactly one response line, either
//! `{"id": 1, "ok": true, "result": ...}` or
//! `{"id": 1, "ok": false, "error": {"kind": "...", "message": "..."}}`.

use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::task;
use tracing::{debug, error, info};

use crate::{
    application::{
        dtos::{
            ContactListResponse, ContactRequest, PageQuery, SearchQuery, MAX_BIRTHDAY_LIMIT,
            MAX_LIST_LIMIT,
        },
        ContactService,
    },
    domain::{ContactId, DomainError, OwnerId},
};

/// Operations understood by the driver, selected by the `op` field.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ContactCommand {
    List(PageQuery),
    Get {
        contact_id: ContactId,
    },
    Create {
        contact: ContactRequest,
    },
    Update {
        contact_id: ContactId,
        contact: ContactRequest,
    },
    Delete {
        contact_id: ContactId,
    },
    Search(SearchQuery),
    Birthdays(PageQuery),
    Health,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    owner: Option<OwnerId>,
    #[serde(flatten)]
    command: ContactCommand,
}

#[derive(Debug, Serialize)]
struct Failure {
    kind: &'static str,
    message: String,
}

impl Failure {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            kind: "bad_request",
            message: message.into(),
        }
    }

    fn not_found(id: ContactId) -> Self {
        Self {
            kind: "not_found",
            message: format!("contact {id} not found"),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: "internal",
            message: message.into(),
        }
    }
}

impl From<DomainError> for Failure {
    fn from(err: DomainError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Run the driver on the process's stdin/stdout until EOF.
pub async fn run_stdio_server(service: Arc<ContactService>) -> Result<()> {
    let reader = BufReader::new(tokio::io::stdin());
    let writer = tokio::io::stdout();
    serve(service, reader, writer).await
}

/// Serve requests from `reader`, writing one response line per request.
pub async fn serve<R, W>(service: Arc<ContactService>, mut reader: R, mut writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    info!(target: "contacts::stdio", "stdio driver started");

    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => {
                info!(target: "contacts::stdio", "input closed");
                break;
            }
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }

                debug!(target: "contacts::stdio", "received: {}", trimmed);
                let response = handle_line(&service, trimmed).await;

                let mut payload = serde_json::to_vec(&response)?;
                payload.push(b'\n');
                if let Err(err) = writer.write_all(&payload).await {
                    error!(target: "contacts::stdio", "failed to write response: {err}");
                    break;
                }
                if let Err(err) = writer.flush().await {
                    error!(target: "contacts::stdio", "failed to flush output: {err}");
                    break;
                }
            }
            Err(err) => {
                error!(target: "contacts::stdio", "failed to read input: {err}");
                break;
            }
        }
    }

    info!(target: "contacts::stdio", "stdio driver terminated");
    Ok(())
}

/// Handle one request line and build its response object.
pub async fn handle_line(service: &Arc<ContactService>, line: &str) -> Value {
    let raw: Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(err) => {
            return failure_response(
                Value::Null,
                Failure::bad_request(format!("invalid JSON: {err}")),
            )
        }
    };
    let request_id = raw.get("id").cloned().unwrap_or(Value::Null);

    let envelope: Envelope = match serde_json::from_value(raw) {
        Ok(envelope) => envelope,
        Err(err) => {
            return failure_response(
                request_id,
                Failure::bad_request(format!("invalid request: {err}")),
            )
        }
    };

    match dispatch(service, envelope.owner, envelope.command).await {
        Ok(result) => json!({ "id": request_id, "ok": true, "result": result }),
        Err(failure) => failure_response(request_id, failure),
    }
}

async fn dispatch(
    service: &Arc<ContactService>,
    owner: Option<OwnerId>,
    command: ContactCommand,
) -> Result<Value, Failure> {
    match command {
        ContactCommand::List(page) => {
            page.validate(MAX_LIST_LIMIT)?;
            let owner = require_owner(owner)?;
            let items = blocking(service, move |svc| svc.list(&owner, page.limit, page.offset))
                .await?;
            to_value(ContactListResponse::from(items))
        }
        ContactCommand::Get { contact_id } => {
            let owner = require_owner(owner)?;
            match blocking(service, move |svc| svc.get(&owner, contact_id)).await? {
                Some(contact) => to_value(contact),
                None => Err(Failure::not_found(contact_id)),
            }
        }
        ContactCommand::Create { contact } => {
            contact.validate()?;
            let owner = require_owner(owner)?;
            let created = blocking(service, move |svc| svc.create(&owner, contact.into())).await?;
            to_value(created)
        }
        ContactCommand::Update {
            contact_id,
            contact,
        } => {
            contact.validate()?;
            let owner = require_owner(owner)?;
            match blocking(service, move |svc| {
                svc.update(&owner, contact_id, contact.into())
            })
            .await?
            {
                Some(contact) => to_value(contact),
                None => Err(Failure::not_found(contact_id)),
            }
        }
        ContactCommand::Delete { contact_id } => {
            let owner = require_owner(owner)?;
            // Deleting something already gone answers with no content.
            match blocking(service, move |svc| svc.delete(&owner, contact_id)).await? {
                Some(contact) => to_value(contact),
                None => Ok(Value::Null),
            }
        }
        ContactCommand::Search(query) => {
            let owner = require_owner(owner)?;
            let items = blocking(service, move |svc| {
                svc.search(
                    &owner,
                    query.first_name.as_deref(),
                    query.last_name.as_deref(),
                    query.email.as_deref(),
                )
            })
            .await?;
            to_value(ContactListResponse::from(items))
        }
        ContactCommand::Birthdays(page) => {
            page.validate(MAX_BIRTHDAY_LIMIT)?;
            let owner = require_owner(owner)?;
            let items = blocking(service, move |svc| {
                svc.upcoming_birthdays(&owner, page.limit, page.offset)
            })
            .await?;
            to_value(ContactListResponse::from(items))
        }
        ContactCommand::Health => to_value(blocking(service, |svc| svc.health()).await?),
    }
}

/// Runs a service call on the blocking pool; stores may hit the disk.
async fn blocking<T, F>(service: &Arc<ContactService>, job: F) -> Result<T, Failure>
where
    F: FnOnce(&ContactService) -> Result<T, DomainError> + Send + 'static,
    T: Send + 'static,
{
    let service = Arc::clone(service);
    task::spawn_blocking(move || job(&service))
        .await
        .map_err(|err| Failure::internal(format!("worker failed: {err}")))?
        .map_err(Failure::from)
}

fn require_owner(owner: Option<OwnerId>) -> Result<OwnerId, Failure> {
    owner
        .filter(|owner| !owner.as_str().trim().is_empty())
        .ok_or_else(|| Failure::bad_request("owner is required"))
}

fn to_value<T: Serialize>(value: T) -> Result<Value, Failure> {
    serde_json::to_value(value).map_err(|err| Failure::internal(err.to_string()))
}

fn failure_response(request_id: Value, failure: Failure) -> Value {
    json!({ "id": request_id, "ok": false, "error": failure })
}
