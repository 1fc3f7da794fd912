use thiserror::Error;

use crate::{ItemId, SettingKey};

/// Errors surfaced by the carousel's interaction surface.
///
/// Stale async results never reach callers; they are logged and dropped on the frame thread.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CarouselError {
    #[error("unknown item {0}")]
    UnknownItem(ItemId),

    #[error("item {0} is filtered out")]
    Hidden(ItemId),

    #[error("result for item {0} is stale")]
    StaleResult(ItemId),

    #[error("setting {key:?} expects a {expected} value")]
    SettingType {
        key: SettingKey,
        expected: &'static str,
    },
}

/// Errors produced while materializing panel content.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MaterializeError {
    #[error("Cancelled")]
    Cancelled,

    #[error("Materialization failed: {0}")]
    Failed(String),
}

/// Errors produced by the remote enrichment client.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EnrichmentError {
    #[error("Offline")]
    Offline,

    #[error("Cancelled")]
    Cancelled,

    #[error("Request error: {0}")]
    Request(String),
}
