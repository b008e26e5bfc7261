//! Identifier-aware tokenizer for catalog text.
//!
//! Splits on:
//! - runs of characters that are neither letters nor digits
//! - letter/digit transitions: `orderTopic1` → `["order", "Topic", "1"]`
//! - lower → upper: `camelCase` → `["camel", "Case"]`
//! - the last capital of an acronym: `HTTPServer` → `["HTTP", "Server"]`
//!
//! The registered analyzer lowercases every token afterwards.

use tantivy::tokenizer::{LowerCaser, TextAnalyzer, Token, TokenStream, Tokenizer};

/// Name the analyzer is registered under on every catalog index.
pub const CATALOG_TOKENIZER: &str = "catalog";

/// Pattern analyzer equivalent persisted in index mappings.
pub const CAMEL_CASE_PATTERN: &str = r"([^\p{L}\d]+)|(?<=\D)(?=\d)|(?<=\d)(?=\D)|(?<=[\p{L}&&[^\p{Lu}]])(?=\p{Lu})|(?<=\p{Lu})(?=\p{Lu}[\p{L}&&[^\p{Lu}]])";

#[derive(Clone, Default)]
pub struct CamelCaseTokenizer;

impl Tokenizer for CamelCaseTokenizer {
    type TokenStream<'a> = CamelCaseTokenStream;

    fn token_stream<'a>(&'a mut self, text: &'a str) -> Self::TokenStream<'a> {
        CamelCaseTokenStream {
            tokens: split(text),
            current: 0,
        }
    }
}

pub struct CamelCaseTokenStream {
    tokens: Vec<Token>,
    current: usize,
}

impl TokenStream for CamelCaseTokenStream {
    fn advance(&mut self) -> bool {
        if self.current < self.tokens.len() {
            self.current += 1;
            true
        } else {
            false
        }
    }

    fn token(&self) -> &Token {
        &self.tokens[self.current - 1]
    }

    fn token_mut(&mut self) -> &mut Token {
        &mut self.tokens[self.current - 1]
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphabetic() || c.is_ascii_digit()
}

fn is_lower_letter(c: char) -> bool {
    c.is_alphabetic() && !c.is_uppercase()
}

fn boundary(prev: char, cur: char, next: Option<char>) -> bool {
    let (prev_digit, cur_digit) = (prev.is_ascii_digit(), cur.is_ascii_digit());
    if prev_digit != cur_digit {
        return true;
    }
    if is_lower_letter(prev) && cur.is_uppercase() {
        return true;
    }
    prev.is_uppercase() && cur.is_uppercase() && next.is_some_and(is_lower_letter)
}

fn split(text: &str) -> Vec<Token> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;

    let push = |tokens: &mut Vec<Token>, from: usize, to: usize| {
        let position = tokens.len();
        tokens.push(Token {
            offset_from: from,
            offset_to: to,
            position,
            text: text[from..to].to_string(),
            position_length: 1,
        });
    };

    for (i, &(offset, c)) in chars.iter().enumerate() {
        if !is_word_char(c) {
            if let Some(from) = start.take() {
                push(&mut tokens, from, offset);
            }
            continue;
        }
        match start {
            None => start = Some(offset),
            Some(from) => {
                let prev = chars[i - 1].1;
                let next = chars.get(i + 1).map(|&(_, n)| n);
                if boundary(prev, c, next) {
                    push(&mut tokens, from, offset);
                    start = Some(offset);
                }
            }
        }
    }
    if let Some(from) = start {
        push(&mut tokens, from, text.len());
    }
    tokens
}

/// Build the catalog analyzer: camel-case splitting, then lowercasing.
pub fn build_catalog_analyzer() -> TextAnalyzer {
    TextAnalyzer::builder(CamelCaseTokenizer)
        .filter(LowerCaser)
        .build()
}

/// Run `text` through the catalog analyzer.
pub fn analyze(text: &str) -> Vec<String> {
    let mut analyzer = build_catalog_analyzer();
    let mut stream = analyzer.token_stream(text);
    let mut terms = Vec::new();
    while stream.advance() {
        terms.push(stream.token().text.clone());
    }
    terms
}
