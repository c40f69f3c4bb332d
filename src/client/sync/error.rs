use thiserror::Error;

use crate::client::remote::RemoteError;
use crate::shared::{CellKey, SharedError};

/// Which engine path produced an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncScope {
    Cell,
    Batch,
}

/// Errors surfaced by the sync engine.
///
/// Every variant leaves the cache exactly as it was before the call: either
/// nothing was mutated, or the optimistic mutation was rolled back.
#[derive(Debug, Error)]
pub enum SyncError {
    /// No session identity could be resolved; nothing was mutated
    #[error("no authenticated session")]
    Unauthenticated,

    /// Another sync holds the cell, or a batch holds the whole grid
    #[error("{}", busy_message(.key))]
    Busy { key: Option<CellKey> },

    /// Rejected before any local mutation
    #[error(transparent)]
    InvalidUpdate(#[from] SharedError),

    /// The store refused or never answered a write; local state rolled back
    #[error("remote write failed: {source}")]
    RemoteWriteFailure {
        scope: SyncScope,
        #[source]
        source: RemoteError,
    },

    /// A full refresh failed; the cache is unchanged
    #[error("failed to load attendance: {0}")]
    LoadFailure(#[source] RemoteError),
}

fn busy_message(key: &Option<CellKey>) -> String {
    match key {
        Some(key) => format!("a sync for {} is already in flight", key),
        None => "a batch sync is in flight".to_string(),
    }
}

impl SyncError {
    /// Message for display, upper-cased and prefixed per the app's convention.
    pub fn user_message(&self) -> String {
        match self {
            Self::RemoteWriteFailure { scope, source } => {
                let prefix = match scope {
                    SyncScope::Cell => "ERRO AO SALVAR",
                    SyncScope::Batch => "ERRO AO SALVAR EM LOTE",
                };
                format!("{}: {}", prefix, detail_or_default(source))
            }
            Self::LoadFailure(source) => {
                format!("ERRO AO CARREGAR DADOS: {}", detail_or_default(source))
            }
            Self::Unauthenticated => "SESSÃO EXPIRADA: ENTRE NOVAMENTE".to_string(),
            Self::Busy { .. } => "AGUARDE: SALVAMENTO EM ANDAMENTO".to_string(),
            Self::InvalidUpdate(error) => error.to_string().to_uppercase(),
        }
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Busy { .. })
    }
}

fn detail_or_default(error: &RemoteError) -> String {
    let detail = error.detail().trim();
    if detail.is_empty() {
        "ERRO DE CONEXÃO".to_string()
    } else {
        detail.to_uppercase()
    }
}
