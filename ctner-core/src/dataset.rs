//! # Preparação de Dados de Treino
//!
//! Converte o arquivo de anotações (`trial_id \t slots \t texto`) em amostras de
//! treino (`slots \t texto_transformado`), com:
//!
//! - **Deduplicação** pelo par (slots, texto);
//! - **Realinhamento** dos spans ([`realign`]);
//! - **Divisão** treino/teste aleatória, com semente opcional;
//! - **Estatísticas**: linhas, slots, amostras, ensaios e histograma de rótulos.
//!
//! Linhas malformadas são registradas e puladas; um realinhamento inconsistente
//! interrompe o processamento, pois corromperia um rótulo de treino.

use std::collections::{HashMap, HashSet};
use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::format::{AnnotatedRecord, TrainingSample};
use crate::span::realign;
use crate::transformer::Transformer;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Probabilidade de uma amostra ir para o conjunto de teste.
    pub test_ratio: f64,
    /// Semente do gerador; `None` usa entropia do sistema.
    pub seed: Option<u64>,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_ratio: 0.1,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Partition {
    Train,
    Test,
}

/// Processa linhas de anotação uma a uma, acumulando estatísticas.
pub struct DatasetBuilder {
    transformer: Transformer,
    config: SplitConfig,
    rng: StdRng,
    seen_samples: HashSet<String>,
    trials: HashSet<String>,
    histogram: HashMap<String, usize>,
    line_count: usize,
    slot_count: usize,
    train_count: usize,
    test_count: usize,
}

impl DatasetBuilder {
    pub fn new(transformer: Transformer, config: SplitConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            transformer,
            config,
            rng,
            seen_samples: HashSet::new(),
            trials: HashSet::new(),
            histogram: HashMap::new(),
            line_count: 0,
            slot_count: 0,
            train_count: 0,
            test_count: 0,
        }
    }

    /// Processa uma linha. Retorna `None` para linhas puladas (malformadas ou
    /// duplicadas) e a amostra com sua partição caso contrário.
    pub fn push_line(&mut self, line: &str) -> Result<Option<(Partition, TrainingSample)>> {
        self.line_count += 1;

        let record = match AnnotatedRecord::parse(line) {
            Ok(record) => record,
            Err(err) if err.is_skippable() => {
                warn!(line = self.line_count, %err, "skipping annotation line");
                return Ok(None);
            }
            Err(err) => return Err(err),
        };
        self.trials.insert(record.trial_id.clone());

        let key = record.sample_key();
        if self.seen_samples.contains(&key) {
            debug!(line = self.line_count, "duplicate sample");
            return Ok(None);
        }

        let spans = match record.spans() {
            Ok(spans) => spans,
            Err(err) if err.is_skippable() => {
                warn!(line = self.line_count, %err, "skipping annotation line");
                return Ok(None);
            }
            Err(err) => return Err(err),
        };
        self.seen_samples.insert(key);

        let sample = TrainingSample(realign(&self.transformer, &record.text, &spans)?);

        self.slot_count += spans.len();
        for span in &spans {
            *self.histogram.entry(span.label.clone()).or_insert(0) += 1;
        }

        let partition = if self.rng.gen::<f64>() < self.config.test_ratio {
            self.test_count += 1;
            Partition::Test
        } else {
            self.train_count += 1;
            Partition::Train
        };
        Ok(Some((partition, sample)))
    }

    pub fn report(&self) -> DatasetReport {
        let mut histogram: Vec<(String, usize)> =
            self.histogram.iter().map(|(k, v)| (k.clone(), *v)).collect();
        histogram.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        DatasetReport {
            line_count: self.line_count,
            slot_count: self.slot_count,
            sample_count: self.seen_samples.len(),
            trial_count: self.trials.len(),
            train_count: self.train_count,
            test_count: self.test_count,
            histogram,
        }
    }
}

/// Resumo de uma execução de [`DatasetBuilder`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetReport {
    pub line_count: usize,
    pub slot_count: usize,
    pub sample_count: usize,
    pub trial_count: usize,
    pub train_count: usize,
    pub test_count: usize,
    /// (rótulo, contagem), do mais frequente para o menos.
    pub histogram: Vec<(String, usize)>,
}

impl DatasetReport {
    pub fn test_percentage(&self) -> f64 {
        if self.sample_count == 0 {
            0.0
        } else {
            100.0 * self.test_count as f64 / self.sample_count as f64
        }
    }
}

impl fmt::Display for DatasetReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Train count: {}, test count: {} ({:.1}%)",
            self.train_count,
            self.test_count,
            self.test_percentage()
        )?;
        writeln!(
            f,
            "Lines read: {}, slots: {}, samples: {}, trials: {}",
            self.line_count, self.slot_count, self.sample_count, self.trial_count
        )?;
        writeln!(f)?;
        writeln!(f, "{:<22}count", "label")?;
        let mut total = 0;
        for (label, count) in &self.histogram {
            writeln!(f, "{:<21} {:>5}", label, count)?;
            total += count;
        }
        write!(f, "{:<21}{:>6}", "total", total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CtnerError;

    fn builder(test_ratio: f64) -> DatasetBuilder {
        DatasetBuilder::new(
            Transformer::default(),
            SplitConfig {
                test_ratio,
                seed: Some(7),
            },
        )
    }

    #[test]
    fn test_push_line_realigns() {
        let mut b = builder(0.0);
        let (partition, sample) = b
            .push_line("NCT1\t15:21:condition\tNo history of stroke")
            .unwrap()
            .unwrap();
        assert_eq!(partition, Partition::Train);
        assert_eq!(sample.to_line(), "15:21:condition\tno history of stroke");
    }

    #[test]
    fn test_duplicates_and_malformed_are_skipped() {
        let mut b = builder(0.0);
        assert!(b.push_line("NCT1\t1:4:lab\tAge > 18").unwrap().is_some());
        assert!(b.push_line("NCT2\t1:4:lab\tAge > 18").unwrap().is_none());
        assert!(b.push_line("garbage").unwrap().is_none());
        assert!(b.push_line("NCT3\tx:y:z\tbad slot").unwrap().is_none());

        let report = b.report();
        assert_eq!(report.line_count, 4);
        assert_eq!(report.sample_count, 1);
        assert_eq!(report.trial_count, 3);
        assert_eq!(report.slot_count, 1);
    }

    #[test]
    fn test_inconsistent_transform_propagates() {
        let mut b = builder(0.0);
        let err = b.push_line("NCT1\t1:3:noise\t\"\" stroke").unwrap_err();
        assert!(matches!(err, CtnerError::InconsistentTransform { .. }));
    }

    #[test]
    fn test_split_ratio_extremes() {
        let mut all_test = builder(1.0);
        let (partition, _) = all_test.push_line("NCT1\t\tplain text").unwrap().unwrap();
        assert_eq!(partition, Partition::Test);
        assert_eq!(all_test.report().test_count, 1);
    }

    #[test]
    fn test_seeded_split_is_reproducible() {
        let lines: Vec<String> = (0..50).map(|i| format!("NCT{i}\t\tcriterion {i}")).collect();
        let run = || {
            let mut b = builder(0.5);
            lines
                .iter()
                .map(|l| b.push_line(l).unwrap().unwrap().0)
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_report_histogram_and_display() {
        let mut b = builder(0.0);
        b.push_line("NCT1\t1:4:lab,7:13:cond\tA1c < stroke").unwrap();
        b.push_line("NCT1\t1:5:cond\tCOPD").unwrap();
        let report = b.report();
        assert_eq!(
            report.histogram,
            vec![("cond".to_string(), 2), ("lab".to_string(), 1)]
        );
        let text = report.to_string();
        assert!(text.starts_with("Train count: 2, test count: 0 (0.0%)"));
        assert!(text.contains("cond                      2"));
        assert!(text.ends_with("total                     3"));
    }
}
