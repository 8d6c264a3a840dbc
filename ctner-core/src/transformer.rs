//! # Transformer — Normalização + Tokenização
//!
//! Compõe [`normalize`] e [`Tokenizer`] num único passo texto -> tokens -> texto.
//! É usado diretamente na inferência (`tokenize`) e, fragmento a fragmento, pelo
//! realinhador de spans (`transform`).

use serde::{Deserialize, Serialize};

use crate::normalizer::normalize;
use crate::tokenizer::Tokenizer;

/// Configuração do pipeline de texto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformerConfig {
    /// Substitui números por `@NUMBER` (padrão: `true`).
    pub mask_numbers: bool,
}

impl Default for TransformerConfig {
    fn default() -> Self {
        Self { mask_numbers: true }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Transformer {
    tokenizer: Tokenizer,
}

impl Transformer {
    pub fn new(config: TransformerConfig) -> Self {
        Self {
            tokenizer: Tokenizer::new(config.mask_numbers),
        }
    }

    pub fn config(&self) -> TransformerConfig {
        TransformerConfig {
            mask_numbers: self.tokenizer.mask_numbers,
        }
    }

    /// Normaliza e tokeniza, sem juntar os tokens.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        self.tokenizer.tokenize(&normalize(text))
    }

    /// Normaliza, tokeniza e junta os tokens com um espaço.
    pub fn transform(&self, text: &str) -> String {
        self.tokenize(text).join(" ")
    }
}
