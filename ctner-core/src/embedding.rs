//! # Vetores de Palavras
//!
//! O treino dos embeddings é externo (fastText sobre o corpus transformado).
//! Este módulo lê o arquivo `.vec` resultante e mede similaridade, para
//! inspecionar a qualidade dos vetores com vizinhos mais próximos.

use std::collections::HashMap;
use std::io::BufRead;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{CtnerError, Result};

/// Vetores com norma abaixo disso são tratados como zero.
pub const EPS: f32 = 1.0e-6;

/// Palavras consultadas quando nenhuma é informada, para inspecionar a
/// qualidade dos embeddings.
pub const DEFAULT_QUERY_WORDS: &[&str] = &[
    "covid-19", "a1c", "cardiomyopathy", "obese", "hemiplegia", "tp53", "cd137", "<", "@NUMBER",
];

/// Similaridade de cosseno; 0 quando algum vetor é (quase) nulo.
pub fn similarity(v1: &[f32], v2: &[f32]) -> f32 {
    let n1 = norm(v1);
    let n2 = norm(v2);
    if n1 < EPS || n2 < EPS {
        return 0.0;
    }
    let dot: f32 = v1.iter().zip(v2).map(|(a, b)| a * b).sum();
    dot / (n1 * n2)
}

fn norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    pub word: String,
    pub score: f32,
}

/// Vocabulário com um vetor por palavra, na ordem do arquivo.
#[derive(Debug, Clone, Default)]
pub struct WordVectors {
    words: Vec<String>,
    vectors: Vec<Vec<f32>>,
    index: HashMap<String, usize>,
}

impl WordVectors {
    pub const DEFAULT_TOP: usize = 40;
    pub const DEFAULT_MIN_SCORE: f32 = 0.5;

    /// Lê o formato texto `.vec` (`palavra v1 v2 ...`). Um cabeçalho
    /// `contagem dimensão` na primeira linha é ignorado.
    pub fn parse<R: BufRead>(reader: R) -> Result<Self> {
        let mut vectors = Self::default();
        for (line_no, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| CtnerError::io("read word vectors", e))?;
            let mut fields = line.split_whitespace();
            let Some(word) = fields.next() else {
                continue;
            };
            let values: Vec<f32> = fields
                .map(|value| {
                    value.parse().map_err(|_| {
                        CtnerError::invalid_vector(word, format!("`{value}` is not a number"))
                    })
                })
                .collect::<Result<_>>()?;
            if line_no == 0 && values.len() == 1 && word.parse::<usize>().is_ok() {
                continue;
            }
            match vectors.vectors.first().map(Vec::len) {
                Some(dim) if dim != values.len() => {
                    return Err(CtnerError::invalid_vector(
                        word,
                        format!("expected {dim} dimensions, found {}", values.len()),
                    ));
                }
                _ => {}
            }
            vectors.insert(word, values);
        }
        Ok(vectors)
    }

    pub fn insert(&mut self, word: &str, vector: Vec<f32>) {
        match self.index.get(word) {
            Some(&i) => self.vectors[i] = vector,
            None => {
                self.index.insert(word.to_string(), self.words.len());
                self.words.push(word.to_string());
                self.vectors.push(vector);
            }
        }
    }

    pub fn get(&self, word: &str) -> Option<&[f32]> {
        self.index.get(word).map(|&i| self.vectors[i].as_slice())
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Palavras com similaridade acima de `min_score`, da maior para a menor,
    /// no máximo `top`. Palavra fora do vocabulário não tem vizinhos.
    pub fn nearest_neighbors(&self, word: &str, top: usize, min_score: f32) -> Vec<Neighbor> {
        let Some(target) = self.get(word) else {
            return Vec::new();
        };
        let mut neighbors: Vec<Neighbor> = self
            .words
            .par_iter()
            .zip(self.vectors.par_iter())
            .filter_map(|(w, v)| {
                let score = similarity(target, v);
                (score > min_score).then(|| Neighbor {
                    word: w.clone(),
                    score,
                })
            })
            .collect();
        neighbors.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.word.cmp(&b.word))
        });
        neighbors.truncate(top);
        neighbors
    }
}
