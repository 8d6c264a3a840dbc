//! # Agregação de Predições por Token
//!
//! Converte os scores brutos do modelo (um valor por rótulo para cada token) em
//! spans rotulados:
//!
//! 1. **Softmax** por token e escolha do rótulo vencedor com sua probabilidade.
//! 2. **Agrupamento contíguo**: tokens vizinhos com o mesmo rótulo vencedor
//!    formam um grupo (run-length). Grupos separados com o mesmo rótulo continuam
//!    distintos: `[A, B, A]` gera três grupos.
//! 3. **Slot** por grupo: texto = tokens unidos por espaço, score = média das
//!    probabilidades vencedoras.
//! 4. **Agrupamento por rótulo**, conforme [`SlotRetention`].
//!
//! O rótulo de fundo não é filtrado aqui; use [`GroupedSlots::without_label`].

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{CtnerError, Result};

/// Rótulo de fundo emitido pelo modelo NER treinado.
pub const DEFAULT_BACKGROUND_LABEL: &str = "word_scores:NoLabel";

/// Score bruto (pré-softmax) de um rótulo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelScore {
    pub label: String,
    pub score: f64,
}

/// Scores de todos os rótulos candidatos para um token.
///
/// A ordem dos rótulos é preservada; em empate vence o primeiro.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelDistribution {
    pub scores: Vec<LabelScore>,
}

impl LabelDistribution {
    pub fn from_pairs<L: Into<String>>(pairs: impl IntoIterator<Item = (L, f64)>) -> Self {
        Self {
            scores: pairs
                .into_iter()
                .map(|(label, score)| LabelScore {
                    label: label.into(),
                    score,
                })
                .collect(),
        }
    }

    pub fn push(&mut self, label: impl Into<String>, score: f64) {
        self.scores.push(LabelScore {
            label: label.into(),
            score,
        });
    }

    /// Rótulo vencedor e sua probabilidade após softmax.
    pub fn best(&self) -> Option<(&str, f64)> {
        let raw: Vec<f64> = self.scores.iter().map(|s| s.score).collect();
        let probs = softmax(&raw);
        let mut best: Option<(usize, f64)> = None;
        for (i, p) in probs.iter().enumerate() {
            match best {
                Some((_, best_p)) if *p <= best_p => {}
                _ => best = Some((i, *p)),
            }
        }
        best.map(|(i, p)| (self.scores[i].label.as_str(), p))
    }
}

/// Rótulo vencedor de um token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenPrediction {
    pub token: String,
    pub label: String,
    /// Probabilidade do rótulo vencedor (0.0 a 1.0).
    pub score: f64,
}

/// Um grupo contíguo de tokens com o mesmo rótulo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedSlot {
    pub text: String,
    /// Média das probabilidades vencedoras do grupo.
    pub score: f64,
    pub label: String,
}

/// Quantos slots manter por rótulo.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotRetention {
    /// Apenas o primeiro slot de cada rótulo.
    #[default]
    FirstPerLabel,
    /// Todos os slots, na ordem do texto (reproduz as saídas de referência).
    All,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    pub background_label: String,
    pub retention: SlotRetention,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            background_label: DEFAULT_BACKGROUND_LABEL.to_string(),
            retention: SlotRetention::default(),
        }
    }
}

/// Slots de um rótulo.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelSlots {
    pub label: String,
    pub slots: Vec<AggregatedSlot>,
}

/// Mapa rótulo -> slots, na ordem em que cada rótulo aparece pela primeira vez.
///
/// Serializa como objeto JSON `{"rótulo": [[score, texto], ...]}`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupedSlots {
    pub groups: Vec<LabelSlots>,
}

impl GroupedSlots {
    pub fn get(&self, label: &str) -> Option<&[AggregatedSlot]> {
        self.groups
            .iter()
            .find(|g| g.label == label)
            .map(|g| g.slots.as_slice())
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|g| g.label.as_str())
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Remove um rótulo (tipicamente o de fundo).
    pub fn without_label(mut self, label: &str) -> Self {
        self.groups.retain(|g| g.label != label);
        self
    }

    fn insert(&mut self, slot: AggregatedSlot, retention: SlotRetention) {
        match self.groups.iter_mut().find(|g| g.label == slot.label) {
            Some(group) => {
                if retention == SlotRetention::All {
                    group.slots.push(slot);
                }
            }
            None => self.groups.push(LabelSlots {
                label: slot.label.clone(),
                slots: vec![slot],
            }),
        }
    }
}

impl Serialize for GroupedSlots {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.groups.len()))?;
        for group in &self.groups {
            let pairs: Vec<(f64, &str)> = group
                .slots
                .iter()
                .map(|s| (s.score, s.text.as_str()))
                .collect();
            map.serialize_entry(&group.label, &pairs)?;
        }
        map.end()
    }
}

/// Converte scores brutos em probabilidades (softmax numericamente estável).
pub fn softmax(scores: &[f64]) -> Vec<f64> {
    if scores.is_empty() {
        return vec![];
    }
    let max_score = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|&s| (s - max_score).exp()).collect();
    let sum: f64 = exps.iter().sum();
    if sum == 0.0 || !sum.is_finite() {
        return vec![1.0 / scores.len() as f64; scores.len()];
    }
    exps.iter().map(|e| e / sum).collect()
}

/// Rótulo vencedor de cada token, na ordem dos tokens.
pub fn predictions_by_token(
    tokens: &[String],
    distributions: &[LabelDistribution],
) -> Result<Vec<TokenPrediction>> {
    if tokens.len() != distributions.len() {
        return Err(CtnerError::LengthMismatch {
            tokens: tokens.len(),
            distributions: distributions.len(),
        });
    }
    tokens
        .iter()
        .zip(distributions)
        .enumerate()
        .map(|(index, (token, dist))| {
            let (label, score) = dist.best().ok_or(CtnerError::EmptyDistribution { index })?;
            Ok(TokenPrediction {
                token: token.clone(),
                label: label.to_string(),
                score,
            })
        })
        .collect()
}

/// Agrupa tokens vizinhos de mesmo rótulo em slots (run-length).
pub fn group_runs(predictions: &[TokenPrediction]) -> Vec<AggregatedSlot> {
    let mut runs: Vec<&[TokenPrediction]> = Vec::new();
    let mut run_start = 0;
    for i in 1..=predictions.len() {
        if i == predictions.len() || predictions[i].label != predictions[i - 1].label {
            if i > run_start {
                runs.push(&predictions[run_start..i]);
            }
            run_start = i;
        }
    }

    runs.into_iter()
        .map(|run| AggregatedSlot {
            text: run.iter().map(|p| p.token.as_str()).collect::<Vec<_>>().join(" "),
            score: run.iter().map(|p| p.score).sum::<f64>() / run.len() as f64,
            label: run[0].label.clone(),
        })
        .collect()
}

/// Agrega as distribuições por token em slots agrupados por rótulo.
///
/// Falha com [`CtnerError::EmptyInput`] quando não há tokens.
pub fn aggregate(
    tokens: &[String],
    distributions: &[LabelDistribution],
    retention: SlotRetention,
) -> Result<GroupedSlots> {
    if tokens.is_empty() || distributions.is_empty() {
        return Err(CtnerError::EmptyInput);
    }
    let predictions = predictions_by_token(tokens, distributions)?;
    let mut grouped = GroupedSlots::default();
    for slot in group_runs(&predictions) {
        grouped.insert(slot, retention);
    }
    Ok(grouped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    /// Distribuição de dois rótulos cujo softmax dá `p` para `winner`.
    fn dist(winner: &str, loser: &str, p: f64) -> LabelDistribution {
        LabelDistribution::from_pairs([(winner, p.ln()), (loser, (1.0 - p).ln())])
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let probs = softmax(&[1.0, 2.0, 3.0]);
        let sum: f64 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);
        assert!(probs[2] > probs[1] && probs[1] > probs[0]);
        assert!(softmax(&[]).is_empty());
    }

    #[test]
    fn test_softmax_large_scores_are_stable() {
        let probs = softmax(&[1000.0, 1000.0]);
        assert!((probs[0] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_best_breaks_ties_by_order() {
        let d = LabelDistribution::from_pairs([("first", 1.0), ("second", 1.0)]);
        assert_eq!(d.best().map(|(l, _)| l), Some("first"));
    }

    #[test]
    fn test_aggregate_mean_score() {
        let toks = tokens(&["type", "2", "diabetes"]);
        let dists = vec![dist("A", "B", 0.9), dist("A", "B", 0.7), dist("B", "A", 0.6)];
        let grouped = aggregate(&toks, &dists, SlotRetention::FirstPerLabel).unwrap();

        let a = grouped.get("A").unwrap();
        assert_eq!(a.len(), 1);
        assert_eq!(a[0].text, "type 2");
        assert!((a[0].score - 0.8).abs() < 1e-9);

        let b = grouped.get("B").unwrap();
        assert_eq!(b.len(), 1);
        assert_eq!(b[0].text, "diabetes");
        assert!((b[0].score - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_grouping_is_contiguous_only() {
        let toks = tokens(&["x", "y", "z"]);
        let dists = vec![dist("A", "B", 0.9), dist("B", "A", 0.8), dist("A", "B", 0.7)];
        let predictions = predictions_by_token(&toks, &dists).unwrap();
        let runs = group_runs(&predictions);
        assert_eq!(runs.len(), 3);
        assert_eq!(
            runs.iter().map(|r| r.label.as_str()).collect::<Vec<_>>(),
            vec!["A", "B", "A"]
        );
    }

    #[test]
    fn test_retention_first_per_label() {
        let toks = tokens(&["x", "y", "z"]);
        let dists = vec![dist("A", "B", 0.9), dist("B", "A", 0.8), dist("A", "B", 0.7)];

        let first = aggregate(&toks, &dists, SlotRetention::FirstPerLabel).unwrap();
        let a = first.get("A").unwrap();
        assert_eq!(a.len(), 1);
        assert_eq!(a[0].text, "x");

        let all = aggregate(&toks, &dists, SlotRetention::All).unwrap();
        let a = all.get("A").unwrap();
        assert_eq!(a.iter().map(|s| s.text.as_str()).collect::<Vec<_>>(), vec!["x", "z"]);
    }

    #[test]
    fn test_aggregate_empty_input_fails() {
        let err = aggregate(&[], &[], SlotRetention::FirstPerLabel).unwrap_err();
        assert!(matches!(err, CtnerError::EmptyInput));
    }

    #[test]
    fn test_aggregate_length_mismatch_fails() {
        let err = aggregate(&tokens(&["a", "b"]), &[dist("A", "B", 0.9)], SlotRetention::All)
            .unwrap_err();
        assert!(matches!(err, CtnerError::LengthMismatch { tokens: 2, distributions: 1 }));
    }

    #[test]
    fn test_aggregate_empty_distribution_fails() {
        let err = aggregate(&tokens(&["a"]), &[LabelDistribution::default()], SlotRetention::All)
            .unwrap_err();
        assert!(matches!(err, CtnerError::EmptyDistribution { index: 0 }));
    }

    #[test]
    fn test_grouped_slots_serialize_in_label_order() {
        let toks = tokens(&["stroke", "in", "past"]);
        let dists = vec![
            dist("word_scores:condition", DEFAULT_BACKGROUND_LABEL, 0.5),
            dist(DEFAULT_BACKGROUND_LABEL, "word_scores:condition", 0.5),
            dist("word_scores:temporal", DEFAULT_BACKGROUND_LABEL, 0.5),
        ];
        let grouped = aggregate(&toks, &dists, SlotRetention::FirstPerLabel)
            .unwrap()
            .without_label(DEFAULT_BACKGROUND_LABEL);
        let json = serde_json::to_string(&grouped).unwrap();
        assert_eq!(
            json,
            r#"{"word_scores:condition":[[0.5,"stroke"]],"word_scores:temporal":[[0.5,"past"]]}"#
        );
    }

    #[test]
    fn test_distribution_json_shape() {
        let json = r#"[{"label":"A","score":0.1},{"label":"B","score":2.0}]"#;
        let d: LabelDistribution = serde_json::from_str(json).unwrap();
        assert_eq!(d.best().map(|(l, _)| l), Some("B"));
    }
}
