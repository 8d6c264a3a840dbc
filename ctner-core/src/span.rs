//! # Realinhamento de Spans
//!
//! Dado um texto anotado e seus spans `(start, end, label)`, produz o texto
//! transformado e os mesmos rótulos com offsets recalculados. A normalização e a
//! tokenização mudam o comprimento do texto de forma não uniforme, então cada
//! trecho é transformado isoladamente e os offsets são medidos no texto final.
//!
//! ## Convenção de offsets
//!
//! Dentro do crate os offsets são **contagens de caracteres (code points),
//! base 0, semiabertos** (`end` exclusivo). A conversão para a base 1 do formato
//! de anotação acontece apenas em [`crate::format`].
//!
//! ## Algoritmo
//! 1. Percorre os spans em ordem; lacunas entre spans viram fragmentos sem rótulo.
//! 2. Cada fragmento passa pelo [`Transformer`] e é aparado.
//! 3. Fragmentos vazios sem rótulo somem; fragmento vazio **com** rótulo é erro
//!    ([`CtnerError::InconsistentTransform`]).
//! 4. Os fragmentos restantes são unidos com um espaço, medindo cada span rotulado.

use serde::{Deserialize, Serialize};

use crate::error::{CtnerError, Result};
use crate::transformer::Transformer;

/// Intervalo de caracteres com um rótulo. Rótulo vazio = fundo (sem entidade).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    /// Offset inicial em caracteres (inclusivo).
    pub start: usize,
    /// Offset final em caracteres (exclusivo).
    pub end: usize,
    pub label: String,
}

impl Span {
    pub fn new(start: usize, end: usize, label: impl Into<String>) -> Self {
        Self {
            start,
            end,
            label: label.into(),
        }
    }

    /// Trecho de `text` coberto pelo span. Offsets fora do texto são truncados.
    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        char_slice(text, self.start, self.end)
    }
}

/// Um texto e seus spans, em ordem crescente de `start` e sem sobreposição.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledText {
    pub text: String,
    pub spans: Vec<Span>,
}

impl LabeledText {
    pub fn new(text: impl Into<String>, spans: Vec<Span>) -> Self {
        Self {
            text: text.into(),
            spans,
        }
    }

    /// Pares (trecho, rótulo) para inspeção e testes.
    pub fn labeled_slices(&self) -> Vec<(&str, &str)> {
        self.spans
            .iter()
            .map(|s| (s.slice(&self.text), s.label.as_str()))
            .collect()
    }
}

/// Realinha `spans` sobre o texto transformado de `text`.
///
/// Spans adjacentes (`start == end` do anterior) não geram fragmento
/// intermediário; um span que termina no fim do texto não gera fragmento final.
pub fn realign(transformer: &Transformer, text: &str, spans: &[Span]) -> Result<LabeledText> {
    let text_len = text.chars().count();
    let mut fragments: Vec<(String, String)> = Vec::with_capacity(spans.len() * 2 + 1);
    let mut previous_hi = 0;

    for span in spans {
        if span.start > previous_hi {
            fragments.push((
                transformer.transform(char_slice(text, previous_hi, span.start)),
                String::new(),
            ));
        }
        fragments.push((
            transformer.transform(char_slice(text, span.start, span.end)),
            span.label.clone(),
        ));
        previous_hi = span.end;
    }
    if previous_hi < text_len {
        let tail = transformer.transform(char_slice(text, previous_hi, text_len));
        fragments.push((tail, String::new()));
    }

    for (fragment, _) in fragments.iter_mut() {
        let trimmed = fragment.trim();
        if trimmed.len() != fragment.len() {
            *fragment = trimmed.to_string();
        }
    }

    let mut new_text = String::new();
    let mut new_len = 0;
    let mut new_spans = Vec::new();

    for (index, (fragment, label)) in fragments.iter().enumerate() {
        if fragment.is_empty() {
            if label.is_empty() {
                continue;
            }
            return Err(CtnerError::InconsistentTransform {
                text: text.to_string(),
                spans: spans.to_vec(),
                fragment_index: index,
                label: label.clone(),
                fragments: fragments.clone(),
            });
        }
        if !new_text.is_empty() {
            new_text.push(' ');
            new_len += 1;
        }
        let start = new_len;
        new_text.push_str(fragment);
        new_len += fragment.chars().count();
        if !label.is_empty() {
            new_spans.push(Span::new(start, new_len, label.clone()));
        }
    }

    Ok(LabeledText::new(new_text, new_spans))
}

/// Fatia por offsets de caractere, truncando como o fatiamento de sequências:
/// `end` além do texto vira o fim, `start >= end` vira vazio.
pub fn char_slice(text: &str, start: usize, end: usize) -> &str {
    if start >= end {
        return "";
    }
    let byte_at = |n: usize| {
        text.char_indices()
            .nth(n)
            .map(|(i, _)| i)
            .unwrap_or(text.len())
    };
    let lo = byte_at(start);
    let hi = byte_at(end);
    &text[lo..hi]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xfmr() -> Transformer {
        Transformer::default()
    }

    #[test]
    fn test_realign_identity_text() {
        let result = realign(&xfmr(), "abc def ghi", &[Span::new(4, 7, "X")]).unwrap();
        assert_eq!(result.text, "abc def ghi");
        assert_eq!(result.spans, vec![Span::new(4, 7, "X")]);
        assert_eq!(result.spans[0].slice(&result.text), "def");
    }

    #[test]
    fn test_realign_without_spans() {
        let result = realign(&xfmr(), "Age >= 18 years.", &[]).unwrap();
        assert_eq!(result.text, "age ≥ @NUMBER years .");
        assert!(result.spans.is_empty());
    }

    #[test]
    fn test_realign_empty_text() {
        let result = realign(&xfmr(), "", &[]).unwrap();
        assert_eq!(result.text, "");
        assert!(result.spans.is_empty());
    }

    #[test]
    fn test_realign_shifted_offsets() {
        let text = "Patients with HbA1c>=7.5% and type 2 diabetes";
        let spans = vec![Span::new(14, 19, "lab"), Span::new(30, 45, "condition")];
        assert_eq!(spans[0].slice(text), "HbA1c");
        assert_eq!(spans[1].slice(text), "type 2 diabetes");

        let result = realign(&xfmr(), text, &spans).unwrap();
        assert_eq!(result.text, "patients with hba1c ≥ @NUMBER % and type @NUMBER diabetes");
        assert_eq!(
            result.labeled_slices(),
            vec![("hba1c", "lab"), ("type @NUMBER diabetes", "condition")]
        );
    }

    #[test]
    fn test_realign_adjacent_spans_have_no_gap_fragment() {
        let text = "heartfailure";
        let spans = vec![Span::new(0, 5, "A"), Span::new(5, 12, "B")];
        let result = realign(&xfmr(), text, &spans).unwrap();
        assert_eq!(result.text, "heart failure");
        assert_eq!(result.spans, vec![Span::new(0, 5, "A"), Span::new(6, 13, "B")]);
    }

    #[test]
    fn test_realign_leading_gap_contributes_text_only() {
        let text = "No history of stroke";
        let result = realign(&xfmr(), text, &[Span::new(14, 20, "condition")]).unwrap();
        assert_eq!(result.text, "no history of stroke");
        assert_eq!(result.spans.len(), 1);
        assert_eq!(result.spans[0].slice(&result.text), "stroke");
        assert_eq!(result.spans[0].start, 14);
    }

    #[test]
    fn test_realign_drops_unlabeled_empty_fragment() {
        let text = "\"\" cancer";
        let result = realign(&xfmr(), text, &[Span::new(3, 9, "condition")]).unwrap();
        assert_eq!(result.text, "cancer");
        assert_eq!(result.spans, vec![Span::new(0, 6, "condition")]);
    }

    #[test]
    fn test_realign_labeled_empty_fragment_fails() {
        let text = "cancer \"\" stage";
        let err = realign(&xfmr(), text, &[Span::new(7, 9, "noise")]).unwrap_err();
        match err {
            CtnerError::InconsistentTransform {
                fragment_index, label, ..
            } => {
                assert_eq!(fragment_index, 1);
                assert_eq!(label, "noise");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_realign_whitespace_span_fails() {
        let err = realign(&xfmr(), "a   b", &[Span::new(1, 4, "X")]).unwrap_err();
        assert!(matches!(err, CtnerError::InconsistentTransform { .. }));
    }

    #[test]
    fn test_realign_multibyte_offsets_are_chars() {
        let text = "Leukocytes ≥3,000/μL";
        let spans = vec![Span::new(0, 10, "lab"), Span::new(18, 20, "unit")];
        assert_eq!(spans[1].slice(text), "μL");
        let result = realign(&xfmr(), text, &spans).unwrap();
        assert_eq!(result.text, "leukocytes ≥ @NUMBER / μl");
        assert_eq!(result.labeled_slices(), vec![("leukocytes", "lab"), ("μl", "unit")]);
        assert_eq!(result.spans[1], Span::new(23, 25, "unit"));
    }

    #[test]
    fn test_char_slice_truncates() {
        assert_eq!(char_slice("abc", 1, 10), "bc");
        assert_eq!(char_slice("abc", 5, 10), "");
        assert_eq!(char_slice("abc", 2, 1), "");
        assert_eq!(char_slice("μλx", 1, 2), "λ");
    }
}
