//! Condition lexer — tokenizes a rule condition string.

use crate::{Error, Result};

/// A token from the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub text: String,
}

/// Source span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// Token kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Keywords
    And, Or, Not, True, False,

    // Literals
    Number, StringLiteral,

    // Variables
    Identifier,

    // Punctuation
    LParen, RParen,

    // Operators
    Eq, Neq, Lt, Lte, Gt, Gte,
    Plus, Minus, Star, Slash, Percent,

    Eof,
}

/// Tokenize a rule condition.
pub fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(pos, ch)) = chars.peek() {
        match ch {
            c if c.is_whitespace() => { chars.next(); }

            // String literals
            '\'' | '"' => {
                let quote = ch;
                chars.next(); // consume opening quote
                let mut s = String::new();
                loop {
                    match chars.next() {
                        Some((_, '\\')) => {
                            if let Some((_, escaped)) = chars.next() {
                                match escaped {
                                    '\\' => s.push('\\'),
                                    c if c == quote => s.push(c),
                                    c => { s.push('\\'); s.push(c); }
                                }
                            }
                        }
                        Some((end, c)) if c == quote => {
                            tokens.push(Token {
                                kind: TokenKind::StringLiteral,
                                span: Span { start: pos, end: end + 1 },
                                text: s,
                            });
                            break;
                        }
                        Some((_, c)) => s.push(c),
                        None => return Err(Error::SyntaxError {
                            position: pos,
                            message: "Unterminated string literal".into(),
                        }),
                    }
                }
            }

            // Numbers: 12, 12.5, .5
            c if c.is_ascii_digit() || (c == '.' && next_is_digit(&chars)) => {
                let mut num = String::new();
                let mut seen_dot = false;
                while let Some(&(_, c)) = chars.peek() {
                    if c.is_ascii_digit() {
                        num.push(c);
                        chars.next();
                    } else if c == '.' && !seen_dot {
                        seen_dot = true;
                        num.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token {
                    kind: TokenKind::Number,
                    span: Span { start: pos, end: pos + num.len() },
                    text: num,
                });
            }

            // Identifiers and keywords
            c if c.is_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if c.is_alphanumeric() || c == '_' {
                        ident.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token {
                    kind: keyword_or_ident(&ident),
                    span: Span { start: pos, end: pos + ident.len() },
                    text: ident,
                });
            }

            '(' => { chars.next(); tokens.push(punct(TokenKind::LParen, pos, "(")); }
            ')' => { chars.next(); tokens.push(punct(TokenKind::RParen, pos, ")")); }
            '+' => { chars.next(); tokens.push(punct(TokenKind::Plus, pos, "+")); }
            '-' => { chars.next(); tokens.push(punct(TokenKind::Minus, pos, "-")); }
            '*' => { chars.next(); tokens.push(punct(TokenKind::Star, pos, "*")); }
            '/' => { chars.next(); tokens.push(punct(TokenKind::Slash, pos, "/")); }
            '%' => { chars.next(); tokens.push(punct(TokenKind::Percent, pos, "%")); }

            // == and ===; a lone = would be assignment
            '=' => {
                chars.next();
                if !eat_char(&mut chars, '=') {
                    return Err(Error::SyntaxError {
                        position: pos,
                        message: "Assignment is not allowed; use '=='".into(),
                    });
                }
                let text = if eat_char(&mut chars, '=') { "===" } else { "==" };
                tokens.push(punct(TokenKind::Eq, pos, text));
            }
            '!' => {
                chars.next();
                if eat_char(&mut chars, '=') {
                    let text = if eat_char(&mut chars, '=') { "!==" } else { "!=" };
                    tokens.push(punct(TokenKind::Neq, pos, text));
                } else {
                    tokens.push(punct(TokenKind::Not, pos, "!"));
                }
            }
            '<' => {
                chars.next();
                if eat_char(&mut chars, '=') {
                    tokens.push(punct(TokenKind::Lte, pos, "<="));
                } else if eat_char(&mut chars, '>') {
                    tokens.push(punct(TokenKind::Neq, pos, "<>"));
                } else {
                    tokens.push(punct(TokenKind::Lt, pos, "<"));
                }
            }
            '>' => {
                chars.next();
                if eat_char(&mut chars, '=') {
                    tokens.push(punct(TokenKind::Gte, pos, ">="));
                } else {
                    tokens.push(punct(TokenKind::Gt, pos, ">"));
                }
            }
            '&' | '|' => {
                chars.next();
                if !eat_char(&mut chars, ch) {
                    return Err(Error::SyntaxError {
                        position: pos,
                        message: format!("Bitwise '{ch}' is not supported"),
                    });
                }
                if ch == '&' {
                    tokens.push(punct(TokenKind::And, pos, "&&"));
                } else {
                    tokens.push(punct(TokenKind::Or, pos, "||"));
                }
            }

            other => {
                return Err(Error::SyntaxError {
                    position: pos,
                    message: format!("Unexpected character: '{other}'"),
                });
            }
        }
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        span: Span { start: input.len(), end: input.len() },
        text: String::new(),
    });

    Ok(tokens)
}

type Chars<'a> = std::iter::Peekable<std::str::CharIndices<'a>>;

fn eat_char(chars: &mut Chars<'_>, expected: char) -> bool {
    if matches!(chars.peek(), Some(&(_, c)) if c == expected) {
        chars.next();
        true
    } else {
        false
    }
}

fn next_is_digit(chars: &Chars<'_>) -> bool {
    matches!(chars.clone().nth(1), Some((_, c)) if c.is_ascii_digit())
}

fn punct(kind: TokenKind, pos: usize, text: &str) -> Token {
    Token {
        kind,
        span: Span { start: pos, end: pos + text.len() },
        text: text.to_string(),
    }
}

fn keyword_or_ident(s: &str) -> TokenKind {
    match s.to_uppercase().as_str() {
        "AND" => TokenKind::And,
        "OR" => TokenKind::Or,
        "NOT" => TokenKind::Not,
        "TRUE" => TokenKind::True,
        "FALSE" => TokenKind::False,
        _ => TokenKind::Identifier,
    }
}
