//! Remote command vocabulary.
//!
//! The push transport delivers `(kind, opaque payload)` pairs with
//! at-least-once semantics. Parsing here is the command boundary:
//! malformed commands are rejected before any state is touched, and
//! unknown kinds surface as a typed error so the ingestion point can
//! log and ignore them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Command kinds recognized at the ingestion point. Used as the
/// deduplication key: different kinds never suppress each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandKind {
    Lock,
    Unlock,
    SetMessage,
    LocateNow,
    SetPasscode,
    Ping,
}

impl CommandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::Lock => "LOCK",
            CommandKind::Unlock => "UNLOCK",
            CommandKind::SetMessage => "SET_MESSAGE",
            CommandKind::LocateNow => "LOCATE_NOW",
            CommandKind::SetPasscode => "SET_PASSCODE",
            CommandKind::Ping => "PING",
        }
    }
}

/// A parsed, validated remote command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCommand {
    Lock { message: String },
    Unlock,
    /// Only effective while locked; a no-op otherwise.
    SetMessage { message: String },
    LocateNow,
    SetPasscode { pin: String },
    Ping,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandParseError {
    #[error("unknown command kind: {0}")]
    UnknownKind(String),
    #[error("{kind} missing required field `{field}`")]
    MissingField { kind: &'static str, field: &'static str },
    #[error("SET_PASSCODE requires a 4-digit pin")]
    InvalidPasscode,
}

impl RemoteCommand {
    /// Parse a transport delivery. The payload is untrusted JSON; every
    /// required field is checked here so downstream handlers never see a
    /// half-formed command.
    pub fn parse(kind: &str, payload: &serde_json::Value) -> Result<Self, CommandParseError> {
        match kind {
            // LOCK tolerates a missing message: the reconciler substitutes
            // the default operator message for an empty one.
            "LOCK" => Ok(RemoteCommand::Lock {
                message: str_field(payload, "message").unwrap_or_default(),
            }),
            "UNLOCK" => Ok(RemoteCommand::Unlock),
            "SET_MESSAGE" => {
                let message = str_field(payload, "message").ok_or(
                    CommandParseError::MissingField {
                        kind: "SET_MESSAGE",
                        field: "message",
                    },
                )?;
                Ok(RemoteCommand::SetMessage { message })
            }
            "LOCATE_NOW" => Ok(RemoteCommand::LocateNow),
            "SET_PASSCODE" => {
                let pin = str_field(payload, "pin").ok_or(CommandParseError::MissingField {
                    kind: "SET_PASSCODE",
                    field: "pin",
                })?;
                if pin.len() != 4 || !pin.chars().all(|c| c.is_ascii_digit()) {
                    return Err(CommandParseError::InvalidPasscode);
                }
                Ok(RemoteCommand::SetPasscode { pin })
            }
            "PING" => Ok(RemoteCommand::Ping),
            other => Err(CommandParseError::UnknownKind(other.to_string())),
        }
    }

    pub fn kind(&self) -> CommandKind {
        match self {
            RemoteCommand::Lock { .. } => CommandKind::Lock,
            RemoteCommand::Unlock => CommandKind::Unlock,
            RemoteCommand::SetMessage { .. } => CommandKind::SetMessage,
            RemoteCommand::LocateNow => CommandKind::LocateNow,
            RemoteCommand::SetPasscode { .. } => CommandKind::SetPasscode,
            RemoteCommand::Ping => CommandKind::Ping,
        }
    }
}

fn str_field(payload: &serde_json::Value, field: &str) -> Option<String> {
    payload
        .get(field)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}
