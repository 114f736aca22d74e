//! Boolean marker recognition.
//!
//! Overlays that must force a real boolean where the templating tool would emit a quoted
//! string write one of the reserved markers as the whole scalar value. The normalizer turns
//! those scalars back into booleans. Recognition runs a small tokenizer over the scalar and
//! accepts only a value made of exactly one marker token, so strings that merely mention a
//! marker are never rewritten.

pub const TRUE_MARKER: &str = "__manifest_sentry_bool_true__";
pub const FALSE_MARKER: &str = "__manifest_sentry_bool_false__";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    /// Run of identifier characters (`[A-Za-z0-9_]`).
    Word(&'a str),
    /// Run of whitespace.
    Space(&'a str),
    /// Any other single character.
    Symbol(&'a str),
}

fn tokenize(input: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();
    while let Some((start, c)) = chars.next() {
        let class = CharClass::of(c);
        let mut end = start + c.len_utf8();
        if class != CharClass::Symbol {
            while let Some(&(index, next)) = chars.peek() {
                if CharClass::of(next) != class {
                    break;
                }
                end = index + next.len_utf8();
                chars.next();
            }
        }
        let text = &input[start..end];
        tokens.push(match class {
            CharClass::Word => Token::Word(text),
            CharClass::Space => Token::Space(text),
            CharClass::Symbol => Token::Symbol(text),
        });
    }
    tokens
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Word,
    Space,
    Symbol,
}

impl CharClass {
    fn of(c: char) -> Self {
        if c.is_ascii_alphanumeric() || c == '_' {
            CharClass::Word
        } else if c.is_whitespace() {
            CharClass::Space
        } else {
            CharClass::Symbol
        }
    }
}

/// Boolean encoded by `scalar`, if the whole scalar is exactly one marker token.
pub fn marker_value(scalar: &str) -> Option<bool> {
    match tokenize(scalar).as_slice() {
        [Token::Word(word)] if *word == TRUE_MARKER => Some(true),
        [Token::Word(word)] if *word == FALSE_MARKER => Some(false),
        _ => None,
    }
}
