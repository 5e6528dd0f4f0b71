//! IPC protocol definitions (JSON messages)

use crate::config::Config;
use crate::registry::EntityKey;
use crate::snapshot::Snapshot;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Request {
    Ping,
    GetSnapshot,
    ListEntities,
    GetStatus,
    GetConfig,
    PauseMonitoring,
    ResumeMonitoring,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    Pong,
    Snapshot { data: Snapshot },
    Entities { data: Vec<EntityKey> },
    Status { data: StatusData },
    Config { data: Config },
    Ack { changed: bool },
    Error { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusData {
    pub running: bool,
    pub seq: u64,
    pub entity_count: u32,
    pub poll_interval_ms: u64,
    pub window_capacity: usize,
    pub pattern: String,
}

impl Response {
    pub fn error(message: impl ToString) -> Self {
        Response::Error {
            message: message.to_string(),
        }
    }
}
