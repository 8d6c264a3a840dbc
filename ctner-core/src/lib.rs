//! # ctner-core — Pré e Pós-processamento de NER para Critérios de Elegibilidade
//!
//! Este crate prepara o texto livre de critérios de elegibilidade de ensaios
//! clínicos para um modelo de reconhecimento de entidades (NER) e transforma a
//! saída do modelo em slots legíveis. O modelo em si é externo: entra pela
//! trait [`Predictor`].
//!
//! ## Arquitetura do Sistema
//!
//! Treino e inferência compartilham o mesmo [`Transformer`], garantindo que o
//! texto visto pelo modelo seja sempre produzido pela mesma função:
//!
//! 1.  **Normalização** ([`normalizer`]): aspas, comparadores e espaços.
//! 2.  **Tokenização** ([`tokenizer`]): sentenças, pontuação, barras, números.
//! 3.  **Transformação** ([`transformer`]): normalização + tokenização, unidas
//!     por espaço.
//! 4.  **Treino** ([`span`], [`dataset`]): spans anotados no texto bruto são
//!     realinhados para o texto transformado.
//! 5.  **Inferência** ([`predictor`], [`aggregate`], [`pipeline`]): scores
//!     brutos por token viram slots agrupados por rótulo.
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use ctner_core::{realign, Span, Transformer};
//!
//! let xfmr = Transformer::default();
//! assert_eq!(xfmr.transform("Age >= 18 years"), "age ≥ @NUMBER years");
//!
//! let spans = [Span::new(14, 20, "condition")];
//! let labeled = realign(&xfmr, "No history of stroke", &spans).unwrap();
//! assert_eq!(labeled.text, "no history of stroke");
//! assert_eq!(labeled.spans[0].slice(&labeled.text), "stroke");
//! ```
//!
//! ## Módulos de Apoio
//!
//! - [`format`]: linhas TSV de anotação, treino e inferência.
//! - [`corpus`]: transformação em lote de corpora para embeddings.
//! - [`embedding`]: leitura de vetores de palavras e vizinhos mais próximos.
//! - [`error`]: o tipo de erro do crate.

pub mod aggregate;
pub mod corpus;
pub mod dataset;
pub mod embedding;
pub mod error;
pub mod format;
pub mod normalizer;
pub mod pipeline;
pub mod predictor;
pub mod span;
pub mod tokenizer;
pub mod transformer;

pub use aggregate::{
    aggregate, AggregatedSlot, AggregatorConfig, GroupedSlots, LabelDistribution, SlotRetention,
};
pub use error::{CtnerError, Result};
pub use normalizer::normalize;
pub use pipeline::InferencePipeline;
pub use predictor::{LexiconPredictor, Predictor};
pub use span::{realign, LabeledText, Span};
pub use tokenizer::Tokenizer;
pub use transformer::{Transformer, TransformerConfig};
