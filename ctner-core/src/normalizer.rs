//! # Normalizador de Critérios de Elegibilidade
//!
//! Reescreve o texto bruto numa forma canônica antes da tokenização:
//!
//! 1. Remove aspas duplas que envolvem o texto inteiro.
//! 2. Unifica sinais parecidos com `<` e `>` (ex: `＜`, `≺`, `﹥`).
//! 3. Colapsa grafias de "menor ou igual" (`<=`, `=<`, `</=`) em `≤` e de
//!    "maior ou igual" (`>=`, `=>`, `>/=`) em `≥`.
//! 4. Isola cada operador de comparação com espaços.
//! 5. Colapsa espaços em branco, apara as bordas e converte para minúsculas.
//!
//! A função é total e idempotente: `normalize(normalize(s)) == normalize(s)`.
//!
//! ```rust
//! use ctner_core::normalizer::normalize;
//!
//! assert_eq!(normalize("x <= 4"), "x ≤ 4");
//! assert_eq!(normalize("3>x>/=4 "), "3 > x ≥ 4");
//! ```

use std::sync::LazyLock;

use regex::Regex;

static LESS_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\x{FE64}\x{FF1C}<\x{227A}]").expect("valid less-than regex"));

static GREATER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\x{FE65}\x{FF1E}>\x{227B}]").expect("valid greater-than regex"));

static LESS_EQ_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<\s*/?\s*=|=\s*/?\s*<").expect("valid less-or-equal regex"));

static GREATER_EQ_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r">\s*/?\s*=|=\s*/?\s*>").expect("valid greater-or-equal regex"));

static COMPARISON_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[=<>≤≥]").expect("valid comparison regex"));

static SPACE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Normaliza um texto bruto. Entrada vazia produz saída vazia.
pub fn normalize(text: &str) -> String {
    let text = strip_enclosing_quotes(text);

    let text = LESS_PATTERN.replace_all(text, "<");
    let text = GREATER_PATTERN.replace_all(&text, ">");
    let text = text.replace('\u{2266}', "≤").replace('\u{2267}', "≥");

    let text = LESS_EQ_PATTERN.replace_all(&text, "≤");
    let text = GREATER_EQ_PATTERN.replace_all(&text, "≥");

    let text = COMPARISON_PATTERN.replace_all(&text, " $0 ");
    let text = SPACE_PATTERN.replace_all(&text, " ");

    let text = text.trim().to_lowercase();
    // O texto aparado pode revelar um novo par de aspas nas bordas.
    strip_enclosing_quotes(&text).to_string()
}

/// Remove pares de aspas duplas presentes nas duas pontas, aparando os
/// espaços que ficam expostos entre uma remoção e outra.
fn strip_enclosing_quotes(text: &str) -> &str {
    let mut current = text;
    while current.len() >= 2 && current.starts_with('"') && current.ends_with('"') {
        current = current[1..current.len() - 1].trim();
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_less_or_equal() {
        assert_eq!(normalize("x <= 4"), "x ≤ 4");
        assert_eq!(normalize("x =< 4"), "x ≤ 4");
        assert_eq!(normalize("x < / = 4"), "x ≤ 4");
    }

    #[test]
    fn test_greater_or_equal() {
        assert_eq!(normalize("3>x>/=4 "), "3 > x ≥ 4");
        assert_eq!(normalize("age => 18"), "age ≥ 18");
    }

    #[test]
    fn test_lookalikes_unified() {
        assert_eq!(normalize("a\u{FF1C}b"), "a < b");
        assert_eq!(normalize("a\u{227B}b"), "a > b");
        assert_eq!(normalize("a\u{FE64}=b"), "a ≤ b");
        assert_eq!(normalize("a\u{2267}b"), "a ≥ b");
    }

    #[test]
    fn test_spaces_and_case() {
        assert_eq!(normalize("  Normal\t\tHEAR \n ok "), "normal hear ok");
        assert_eq!(normalize("HbA1c=7%"), "hba1c = 7%");
    }

    #[test]
    fn test_enclosing_quotes() {
        assert_eq!(normalize("\"Age > 18\""), "age > 18");
        assert_eq!(normalize("\"a\" = \"b\""), "a\" = \"b");
        assert_eq!(normalize("\""), "\"");
    }

    #[test]
    fn test_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
        assert_eq!(normalize("\"\""), "");
    }

    #[test]
    fn test_idempotent() {
        let samples = [
            "",
            "x <= 4",
            "3>x>/=4 ",
            " \"Leukocytes ≥3,000/μL\" ",
            "\"\"nested\"\"",
            "</ /= and <//=",
            "≦ ≧ ＜ ＞ =< =>",
            "  \" \" \"  ",
        ];
        for s in samples {
            let once = normalize(s);
            assert_eq!(normalize(&once), once, "not idempotent for {:?}", s);
        }
    }
}
