//! # Pipeline de Inferência
//!
//! Liga as peças do caminho de inferência:
//!
//! 1. **Tokenização** ([`Transformer::tokenize`]): texto bruto -> tokens.
//! 2. **Predição** ([`Predictor`]): tokens -> scores brutos por rótulo.
//! 3. **Agregação** ([`aggregate`]): scores -> slots agrupados por rótulo.
//! 4. **Filtro**: remove o rótulo de fundo.
//!
//! ```rust
//! use ctner_core::pipeline::InferencePipeline;
//! use ctner_core::predictor::LexiconPredictor;
//! use ctner_core::{AggregatorConfig, Transformer};
//!
//! let xfmr = Transformer::default();
//! let mut lexicon = LexiconPredictor::default();
//! lexicon.add_term(&xfmr, "heart failure", "word_scores:condition");
//!
//! let pipeline = InferencePipeline::new(xfmr, lexicon, AggregatorConfig::default());
//! let detected = pipeline.detect("History of heart failure").unwrap();
//! assert_eq!(detected.get("word_scores:condition").unwrap()[0].text, "heart failure");
//! ```

use tracing::debug;

use crate::aggregate::{aggregate, AggregatorConfig, GroupedSlots};
use crate::error::Result;
use crate::predictor::Predictor;
use crate::transformer::Transformer;

pub struct InferencePipeline<P> {
    transformer: Transformer,
    predictor: P,
    config: AggregatorConfig,
}

impl<P: Predictor> InferencePipeline<P> {
    pub fn new(transformer: Transformer, predictor: P, config: AggregatorConfig) -> Self {
        Self {
            transformer,
            predictor,
            config,
        }
    }

    pub fn transformer(&self) -> &Transformer {
        &self.transformer
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Slots detectados no texto, sem o rótulo de fundo.
    ///
    /// Texto que não gera tokens resulta num mapa vazio.
    pub fn detect(&self, text: &str) -> Result<GroupedSlots> {
        let tokens = self.transformer.tokenize(text);
        if tokens.is_empty() {
            debug!("text produced no tokens");
            return Ok(GroupedSlots::default());
        }
        let distributions = self.predictor.predict(&tokens)?;
        let grouped = aggregate(&tokens, &distributions, self.config.retention)?;
        debug!(tokens = tokens.len(), labels = grouped.len(), "aggregated predictions");
        Ok(grouped.without_label(&self.config.background_label))
    }
}
