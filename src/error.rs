// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use thiserror::Error;

/// Errors the ledger surfaces to the operator.
///
/// Command handlers return `anyhow::Result`; these variants travel inside it
/// and can be recovered with `downcast_ref::<LedgerError>()`.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("{0}")]
    Validation(String),

    #[error("{entity} '{name}' not found")]
    NotFound { entity: &'static str, name: String },

    #[error("{entity} '{name}' cannot be deleted: still referenced by {count} {referrer}")]
    InUse {
        entity: &'static str,
        name: String,
        count: i64,
        referrer: &'static str,
    },

    #[error("storage unavailable after {attempts} attempt(s): {source}")]
    Storage {
        attempts: u32,
        #[source]
        source: rusqlite::Error,
    },
}

impl LedgerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(entity: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            name: name.into(),
        }
    }

    pub fn in_use(
        entity: &'static str,
        name: impl Into<String>,
        count: i64,
        referrer: &'static str,
    ) -> Self {
        Self::InUse {
            entity,
            name: name.into(),
            count,
            referrer,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
