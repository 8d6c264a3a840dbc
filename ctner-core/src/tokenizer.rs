//! # Tokenizador para Critérios de Elegibilidade
//!
//! Opera sobre texto **já normalizado** (ver [`crate::normalizer`]) e produz uma
//! sequência ordenada de tokens. A ordem é o contrato: o agregador de predições
//! alinha cada posição com a linha correspondente da matriz de scores.
//!
//! ## Etapas
//!
//! 1. **Sentenças**: divide o texto em sentenças (ponto, `?` ou `!` seguidos de
//!    espaço, exceto abreviações e iniciais).
//! 2. **Palavras**: regras no estilo Penn Treebank separam pontuação, parênteses,
//!    aspas e contrações.
//! 3. **Barra**: `and/or` -> `and`, `/`, `or`.
//! 4. **Prefixo numérico**: `134dtt4d` -> `134`, `dtt4d`.
//! 5. **Máscara numérica** (opcional): `3,000`, `-5`, `3.14` -> `@NUMBER`.
//!
//! ```rust
//! use ctner_core::tokenizer::Tokenizer;
//!
//! let tokens = Tokenizer::default().tokenize("leukocytes ≥ 3,000/μl.");
//! assert_eq!(tokens, vec!["leukocytes", "≥", "@NUMBER", "/", "μl", "."]);
//! ```

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Token que substitui números quando a máscara está ativa.
pub const NUMBER_PLACEHOLDER: &str = "@NUMBER";

/// Abreviações cujo ponto final não encerra a sentença.
const ABBREVIATIONS: &[&str] = &[
    "dr", "mr", "mrs", "ms", "prof", "vs", "etc", "approx", "al", "fig", "inc", "jr", "sr",
    "st", "no", "nos", "vol", "dept", "esp",
];

/// Caracteres de fechamento que podem seguir a pontuação final de uma sentença.
const CLOSING: &[char] = &[')', ']', '}', '"', '\''];
const OPENING: &[char] = &['(', '[', '{', '"', '\''];

type Rule = (Regex, &'static str);

fn rule(pattern: &str, replacement: &'static str) -> Rule {
    (Regex::new(pattern).expect("valid tokenizer rule"), replacement)
}

/// Regras aplicadas antes de acolchoar a sentença com espaços.
static OPENING_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        // aspas de abertura
        rule(r#"^""#, "``"),
        rule(r"(``)", " $1 "),
        rule(r#"([ (\[{<])("|'{2})"#, "$1 `` "),
        // pontuação
        rule(r"([:,])([^\d])", " $1 $2"),
        rule(r"([:,])$", " $1 "),
        rule(r"\.\.\.", " ... "),
        rule(r"[;@#$%&]", " $0 "),
        rule(r#"([^\.])(\.)([\]\)}>"']*)\s*$"#, "$1 $2$3 "),
        rule(r"[?!]", " $0 "),
        rule(r"([^'])' ", "$1 ' "),
        // parênteses, colchetes e chaves
        rule(r"[\]\[\(\)\{\}<>]", " $0 "),
        rule(r"--", " -- "),
    ]
});

/// Regras aplicadas depois do acolchoamento (dependem do espaço final).
static CLOSING_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        // aspas de fechamento
        rule(r"''", " '' "),
        rule(r#"""#, " '' "),
        rule(r"([^' ])('[sS]|'[mM]|'[dD]|') ", "$1 $2 "),
        rule(r"([^' ])('ll|'LL|'re|'RE|'ve|'VE|n't|N'T) ", "$1 $2 "),
        // contrações
        rule(r"(?i)\b(can)(not)\b", " $1 $2 "),
        rule(r"(?i)\b(d)('ye)\b", " $1 $2 "),
        rule(r"(?i)\b(gim)(me)\b", " $1 $2 "),
        rule(r"(?i)\b(gon)(na)\b", " $1 $2 "),
        rule(r"(?i)\b(got)(ta)\b", " $1 $2 "),
        rule(r"(?i)\b(lem)(me)\b", " $1 $2 "),
        rule(r"(?i)\b(more)('n)\b", " $1 $2 "),
        rule(r"(?i)\b(wan)(na)\s", " $1 $2 "),
        rule(r"(?i) ('t)(is)\b", " $1 $2 "),
        rule(r"(?i) ('t)(was)\b", " $1 $2 "),
    ]
});

static WORD_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\S+").expect("valid word regex"));

static DIGIT_PREFIX_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)([a-z].*)").expect("valid digit prefix regex"));

/// Tokenizador configurável. Sem estado além da configuração: pode ser
/// compartilhado entre threads livremente.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tokenizer {
    /// Substitui números por [`NUMBER_PLACEHOLDER`].
    pub mask_numbers: bool,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self { mask_numbers: true }
    }
}

impl Tokenizer {
    pub fn new(mask_numbers: bool) -> Self {
        Self { mask_numbers }
    }

    /// Tokeniza um texto normalizado.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let mut tokens = Vec::new();
        for word in word_tokenize(text) {
            for piece in split_slash(&word) {
                for subtoken in split_digit_prefix(piece) {
                    if subtoken.is_empty() {
                        continue;
                    }
                    if self.mask_numbers && is_number(subtoken) {
                        tokens.push(NUMBER_PLACEHOLDER.to_string());
                    } else {
                        tokens.push(subtoken.to_string());
                    }
                }
            }
        }
        tokens
    }
}

/// Tokenização de palavras em duas fases: sentenças, depois regras Treebank.
pub fn word_tokenize(text: &str) -> Vec<String> {
    split_sentences(text)
        .into_iter()
        .flat_map(treebank_tokenize)
        .collect()
}

/// Um token é número quando, sem vírgulas e hífens, vira um float finito.
/// Assim `1,234`, `-5` e `10-20` contam, mas `covid-19` não.
pub fn is_number(token: &str) -> bool {
    let stripped: String = token.chars().filter(|c| *c != ',' && *c != '-').collect();
    stripped.parse::<f64>().map(f64::is_finite).unwrap_or(false)
}

fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    for word in WORD_PATTERN.find_iter(text) {
        if ends_sentence(word.as_str()) {
            push_sentence(&mut sentences, &text[start..word.end()]);
            start = word.end();
        }
    }
    push_sentence(&mut sentences, &text[start..]);
    sentences
}

fn push_sentence<'a>(sentences: &mut Vec<&'a str>, sentence: &'a str) {
    let sentence = sentence.trim();
    if !sentence.is_empty() {
        sentences.push(sentence);
    }
}

/// Decide se uma palavra (sequência sem espaços) encerra a sentença.
fn ends_sentence(word: &str) -> bool {
    let core = word.trim_end_matches(CLOSING);
    if core.ends_with('?') || core.ends_with('!') {
        return true;
    }
    let Some(stem) = core.strip_suffix('.') else {
        return false;
    };
    let stem = stem.trim_start_matches(OPENING);
    if stem.is_empty() {
        return true;
    }
    // reticências e abreviações pontuadas (e.g., i.e., u.s.)
    if stem.ends_with('.') {
        return false;
    }
    if stem.contains('.') && stem.chars().all(|c| c.is_alphabetic() || c == '.') {
        return false;
    }
    let mut chars = stem.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if c.is_alphabetic() {
            return false;
        }
    }
    !ABBREVIATIONS.contains(&stem.to_lowercase().as_str())
}

fn treebank_tokenize(sentence: &str) -> Vec<String> {
    let mut text = sentence.to_string();
    for (pattern, replacement) in OPENING_RULES.iter() {
        text = pattern.replace_all(&text, *replacement).into_owned();
    }
    text = format!(" {} ", text);
    for (pattern, replacement) in CLOSING_RULES.iter() {
        text = pattern.replace_all(&text, *replacement).into_owned();
    }
    text.split_whitespace().map(str::to_string).collect()
}

/// Divide em `/`, mantendo a barra como token próprio.
fn split_slash(token: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut rest = token;
    while let Some(pos) = rest.find('/') {
        pieces.push(&rest[..pos]);
        pieces.push("/");
        rest = &rest[pos + 1..];
    }
    pieces.push(rest);
    pieces
}

/// `134dtt4d` -> `134`, `dtt4d`. Tokens sem o padrão passam inteiros.
fn split_digit_prefix(token: &str) -> Vec<&str> {
    match DIGIT_PREFIX_PATTERN.captures(token) {
        Some(caps) => match (caps.get(1), caps.get(2)) {
            (Some(digits), Some(rest)) => vec![digits.as_str(), rest.as_str()],
            _ => vec![token],
        },
        None => vec![token],
    }
}
