//! # Preditores — a fronteira com o modelo
//!
//! O modelo NER em si (arquitetura, treino, serving) é externo. O núcleo só
//! precisa de scores brutos por token, então qualquer backend entra por aqui
//! implementando [`Predictor`].
//!
//! [`LexiconPredictor`] é um backend determinístico baseado em gazetteers:
//! termos conhecidos (possivelmente com várias palavras) recebem score alto
//! para o seu rótulo. Serve para a linha de comando, para a API HTTP e para os
//! testes de ponta a ponta.

use std::io::BufRead;

use tracing::debug;

use crate::aggregate::{LabelDistribution, DEFAULT_BACKGROUND_LABEL};
use crate::error::{CtnerError, Result};
use crate::transformer::Transformer;

/// Produz uma distribuição de scores brutos por token, na ordem dos tokens.
pub trait Predictor: Send + Sync {
    fn predict(&self, tokens: &[String]) -> Result<Vec<LabelDistribution>>;
}

impl<P: Predictor + ?Sized> Predictor for Box<P> {
    fn predict(&self, tokens: &[String]) -> Result<Vec<LabelDistribution>> {
        (**self).predict(tokens)
    }
}

/// Preditor por dicionário de termos.
#[derive(Debug, Clone)]
pub struct LexiconPredictor {
    /// Termos já transformados em tokens, do mais longo para o mais curto.
    terms: Vec<(Vec<String>, String)>,
    /// Rótulos na ordem da distribuição; o de fundo vem primeiro.
    labels: Vec<String>,
    background_label: String,
    match_score: f64,
}

impl LexiconPredictor {
    pub const DEFAULT_MATCH_SCORE: f64 = 4.0;

    pub fn new(background_label: impl Into<String>) -> Self {
        let background_label = background_label.into();
        Self {
            terms: Vec::new(),
            labels: vec![background_label.clone()],
            background_label,
            match_score: Self::DEFAULT_MATCH_SCORE,
        }
    }

    pub fn with_match_score(mut self, score: f64) -> Self {
        self.match_score = score;
        self
    }

    /// Adiciona um termo. O termo passa pelo mesmo [`Transformer`] do texto de
    /// entrada para que os tokens casem.
    pub fn add_term(&mut self, transformer: &Transformer, term: &str, label: &str) {
        let tokens = transformer.tokenize(term);
        if tokens.is_empty() {
            debug!(term, "lexicon term normalized to nothing, skipped");
            return;
        }
        if !self.labels.iter().any(|l| l == label) {
            self.labels.push(label.to_string());
        }
        let pos = self
            .terms
            .iter()
            .position(|(t, _)| t.len() < tokens.len())
            .unwrap_or(self.terms.len());
        self.terms.insert(pos, (tokens, label.to_string()));
    }

    /// Lê linhas `termo \t rótulo`. Linhas vazias e iniciadas por `#` são ignoradas.
    pub fn from_reader<R: BufRead>(
        reader: R,
        transformer: &Transformer,
        background_label: &str,
    ) -> Result<Self> {
        let mut predictor = Self::new(background_label);
        for line in reader.lines() {
            let line = line.map_err(|e| CtnerError::io("read lexicon", e))?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((term, label)) = line.split_once('\t') else {
                return Err(CtnerError::malformed(2, 1));
            };
            predictor.add_term(transformer, term.trim(), label.trim());
        }
        Ok(predictor)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    /// Rótulo casado para cada posição (`None` = fundo). Casamento guloso,
    /// termo mais longo primeiro.
    fn match_labels(&self, tokens: &[String]) -> Vec<Option<&str>> {
        let mut result: Vec<Option<&str>> = vec![None; tokens.len()];
        let mut i = 0;
        'outer: while i < tokens.len() {
            for (parts, label) in &self.terms {
                if i + parts.len() <= tokens.len()
                    && parts.iter().zip(&tokens[i..]).all(|(p, t)| p == t)
                {
                    for slot in &mut result[i..i + parts.len()] {
                        *slot = Some(label.as_str());
                    }
                    i += parts.len();
                    continue 'outer;
                }
            }
            i += 1;
        }
        result
    }
}

impl Default for LexiconPredictor {
    fn default() -> Self {
        Self::new(DEFAULT_BACKGROUND_LABEL)
    }
}

impl Predictor for LexiconPredictor {
    fn predict(&self, tokens: &[String]) -> Result<Vec<LabelDistribution>> {
        let matched = self.match_labels(tokens);
        Ok(matched
            .into_iter()
            .map(|hit| {
                let winner = hit.unwrap_or(self.background_label.as_str());
                LabelDistribution::from_pairs(self.labels.iter().map(|label| {
                    let score = if label == winner { self.match_score } else { 0.0 };
                    (label.clone(), score)
                }))
            })
            .collect())
    }
}
