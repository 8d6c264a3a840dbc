//! # Corpus para Embeddings
//!
//! Transforma um corpus de textos (um por linha) com o mesmo [`Transformer`]
//! usado no treino do NER. A saída alimenta o treino externo de vetores de
//! palavras; por isso a ordem das linhas é mantida.

use rayon::prelude::*;

use crate::transformer::Transformer;

/// Transforma cada linha em paralelo, preservando a ordem.
pub fn transform_lines(transformer: &Transformer, lines: &[String]) -> Vec<String> {
    lines
        .par_iter()
        .map(|line| transformer.transform(line))
        .collect()
}
