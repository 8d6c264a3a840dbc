//! # Erros do ctner-core
//!
//! Um único enum cobre as falhas do núcleo. Nenhuma operação faz retry: todas são
//! funções puras e determinísticas, então repetir reproduziria o mesmo resultado.
//!
//! | Variante                | Política                                                  |
//! |-------------------------|-----------------------------------------------------------|
//! | `MalformedRecord`       | não fatal: a linha é pulada e registrada no log           |
//! | `InvalidSlot`           | não fatal no laço de registros, como `MalformedRecord`    |
//! | `InconsistentTransform` | fatal: um span rotulado normalizou para texto vazio       |
//! | `EmptyInput`            | fatal para o agregador: zero tokens                       |

use thiserror::Error;

use crate::span::Span;

pub type Result<T, E = CtnerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum CtnerError {
    #[error("malformed record: expected {expected} tab-separated fields, found {found}")]
    MalformedRecord { expected: usize, found: usize },

    #[error("invalid slot `{slot}`: {reason}")]
    InvalidSlot { slot: String, reason: &'static str },

    #[error(
        "labeled fragment {fragment_index} (`{label}`) transformed to empty text; \
         original: {text:?}, spans: {spans:?}, fragments: {fragments:?}"
    )]
    InconsistentTransform {
        text: String,
        spans: Vec<Span>,
        fragment_index: usize,
        label: String,
        fragments: Vec<(String, String)>,
    },

    #[error("invalid vector for `{word}`: {reason}")]
    InvalidVector { word: String, reason: String },

    #[error("no tokens to aggregate")]
    EmptyInput,

    #[error("{tokens} tokens but {distributions} label distributions")]
    LengthMismatch { tokens: usize, distributions: usize },

    #[error("token {index} has no candidate labels")]
    EmptyDistribution { index: usize },

    #[error("I/O error while {context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error while {context}: {source}")]
    Json {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl CtnerError {
    pub(crate) fn malformed(expected: usize, found: usize) -> Self {
        Self::MalformedRecord { expected, found }
    }

    pub(crate) fn invalid_slot(slot: &str, reason: &'static str) -> Self {
        Self::InvalidSlot {
            slot: slot.to_string(),
            reason,
        }
    }

    pub(crate) fn invalid_vector(word: &str, reason: impl Into<String>) -> Self {
        Self::InvalidVector {
            word: word.to_string(),
            reason: reason.into(),
        }
    }

    pub fn io(context: &'static str, source: std::io::Error) -> Self {
        Self::Io { context, source }
    }

    pub fn json(context: &'static str, source: serde_json::Error) -> Self {
        Self::Json { context, source }
    }

    /// Erros que o laço de registros deve apenas registrar e pular.
    pub fn is_skippable(&self) -> bool {
        matches!(self, Self::MalformedRecord { .. } | Self::InvalidSlot { .. })
    }
}
