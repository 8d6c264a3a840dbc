//! # Formatos de Linha (TSV)
//!
//! Fronteira entre o núcleo e os arquivos. Todos os formatos são texto simples,
//! uma amostra por linha, campos separados por tabulação.
//!
//! | Formato            | Campos                                   |
//! |--------------------|------------------------------------------|
//! | Anotação (entrada) | `trial_id \t slots \t texto`             |
//! | Treino (saída)     | `slots \t texto_transformado`            |
//! | Inferência         | `c0 \t c1 \t texto` (+ `\t {json}` na saída) |
//!
//! `slots` é uma lista `início:fim:rótulo` separada por vírgulas, em **base 1**
//! com fim exclusivo. É o único lugar do crate onde a base 1 aparece: aqui os
//! offsets são convertidos de/para os [`Span`]s em base 0.

use crate::aggregate::GroupedSlots;
use crate::error::{CtnerError, Result};
use crate::span::{LabeledText, Span};

/// Cabeçalho acrescentado à primeira linha do arquivo de inferência.
pub const DETECTED_SLOTS_HEADER: &str = "detected_slots";

/// Lê `início:fim:rótulo,...` (base 1) como spans em base 0.
pub fn parse_slots(field: &str) -> Result<Vec<Span>> {
    let field = field.trim();
    if field.is_empty() {
        return Ok(Vec::new());
    }
    field.split(',').map(parse_slot).collect()
}

fn parse_slot(slot: &str) -> Result<Span> {
    let mut parts = slot.splitn(3, ':');
    let (Some(start), Some(end), Some(label)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(CtnerError::invalid_slot(slot, "expected start:end:label"));
    };
    let start: usize = start
        .trim()
        .parse()
        .map_err(|_| CtnerError::invalid_slot(slot, "start is not a number"))?;
    let end: usize = end
        .trim()
        .parse()
        .map_err(|_| CtnerError::invalid_slot(slot, "end is not a number"))?;
    if start == 0 || end == 0 {
        return Err(CtnerError::invalid_slot(slot, "offsets are 1-based"));
    }
    Ok(Span::new(start - 1, end - 1, label))
}

/// Inverso de [`parse_slots`]: spans em base 0 -> `início:fim:rótulo` em base 1.
pub fn format_slots(spans: &[Span]) -> String {
    spans
        .iter()
        .map(|s| format!("{}:{}:{}", s.start + 1, s.end + 1, s.label))
        .collect::<Vec<_>>()
        .join(",")
}

/// Uma linha do arquivo de anotações.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedRecord {
    pub trial_id: String,
    /// Campo `slots` como veio no arquivo (chave de deduplicação).
    pub raw_slots: String,
    pub text: String,
}

impl AnnotatedRecord {
    pub fn parse(line: &str) -> Result<Self> {
        let fields: Vec<&str> = line.trim().split('\t').collect();
        if fields.len() < 3 {
            return Err(CtnerError::malformed(3, fields.len()));
        }
        Ok(Self {
            trial_id: fields[0].to_string(),
            raw_slots: fields[1].to_string(),
            text: fields[2].to_string(),
        })
    }

    pub fn spans(&self) -> Result<Vec<Span>> {
        parse_slots(&self.raw_slots)
    }

    /// Chave usada para descartar amostras duplicadas.
    pub fn sample_key(&self) -> String {
        format!("{}\t{}", self.raw_slots, self.text)
    }
}

/// Amostra de treino: texto transformado + spans realinhados.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSample(pub LabeledText);

impl TrainingSample {
    pub fn to_line(&self) -> String {
        format!("{}\t{}", format_slots(&self.0.spans), self.0.text)
    }

    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        let Some((slots, text)) = line.split_once('\t') else {
            return Err(CtnerError::malformed(2, 1));
        };
        Ok(Self(LabeledText::new(text, parse_slots(slots)?)))
    }
}

/// Uma linha do arquivo de inferência: exatamente três campos.
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceRow {
    pub fields: Vec<String>,
}

impl InferenceRow {
    pub const FIELD_COUNT: usize = 3;
    pub const TEXT_FIELD: usize = 2;

    pub fn parse(line: &str) -> Result<Self> {
        let fields: Vec<String> = line.trim().split('\t').map(str::to_string).collect();
        if fields.len() != Self::FIELD_COUNT {
            return Err(CtnerError::malformed(Self::FIELD_COUNT, fields.len()));
        }
        Ok(Self { fields })
    }

    pub fn text(&self) -> &str {
        &self.fields[Self::TEXT_FIELD]
    }

    /// Linha de saída: campos originais + objeto JSON com os slots detectados.
    pub fn to_line(&self, detected: &GroupedSlots) -> Result<String> {
        let json = serde_json::to_string(detected)
            .map_err(|e| CtnerError::json("encode detected slots", e))?;
        Ok(format!("{}\t{}", self.fields.join("\t"), json))
    }
}

/// Cabeçalho de saída da inferência.
pub fn inference_header(header: &str) -> String {
    format!("{}\t{}", header.trim(), DETECTED_SLOTS_HEADER)
}
