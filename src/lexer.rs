use std::collections::VecDeque;
use std::{iter::Peekable, str::CharIndices};

use crate::feature::FeatureSet;

mod error;
mod token;

pub use error::{LexError, LexResult};
pub use token::{Span, Token, TokenKind};

/// Keywords made of several words. Matched before identifiers, longest first.
const MULTI_WORD_KEYWORDS: [(&str, TokenKind<'static>); 1] = [("is not", TokenKind::IsNot)];

/// Feature-aware tokenizer with a save/replay checkpoint.
///
/// `start_saving` records every token returned afterwards; `replay` hands the
/// recorded tokens back out, in order, before live lexing resumes. The parser
/// relies on this to look past an identifier and then rewind.
pub struct Lexer<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
    features: FeatureSet,
    last_was_newline: bool,
    eof_emitted: bool,
    iteration_done: bool,
    saved: Option<Vec<Token<'a>>>,
    replay: VecDeque<Token<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str, features: FeatureSet) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
            features,
            last_was_newline: false,
            eof_emitted: false,
            iteration_done: false,
            saved: None,
            replay: VecDeque::new(),
        }
    }

    pub fn next_token(&mut self) -> LexResult<Token<'a>> {
        let token = match self.replay.pop_front() {
            Some(token) => token,
            None => self.lex_token()?,
        };
        if let Some(saved) = self.saved.as_mut() {
            saved.push(token.clone());
        }
        Ok(token)
    }

    /// Begins recording every token returned from now on.
    pub fn start_saving(&mut self) {
        self.saved = Some(Vec::new());
    }

    /// Stops recording and drops whatever was recorded.
    pub fn stop_saving(&mut self) {
        self.saved = None;
    }

    /// Stops recording and queues the recorded tokens to be returned again.
    pub fn replay(&mut self) {
        if let Some(saved) = self.saved.take() {
            for token in saved.into_iter().rev() {
                self.replay.push_front(token);
            }
        }
    }

    fn lex_token(&mut self) -> LexResult<Token<'a>> {
        if self.eof_emitted {
            return Err(LexError::ExhaustedInput);
        }

        loop {
            let Some(&(start, ch)) = self.chars.peek() else {
                self.eof_emitted = true;
                let end = self.input.len();
                return Ok(Token::new(TokenKind::EOF, Span { start: end, end }));
            };

            match ch {
                '\n' => {
                    self.chars.next();
                    if self.last_was_newline {
                        continue;
                    }
                    self.last_was_newline = true;
                    return Ok(Token::new(
                        TokenKind::Newline,
                        Span {
                            start,
                            end: start + 1,
                        },
                    ));
                }
                '#' => {
                    self.skip_comment();
                    continue;
                }
                c if c.is_whitespace() => {
                    self.chars.next();
                    continue;
                }
                _ => {}
            }

            self.last_was_newline = false;

            if let Some(token) = self.read_multi_word_keyword(start) {
                return Ok(token);
            }
            return match ch {
                c if c.is_alphabetic() || c == '_' => Ok(self.read_identifier(start)),
                c if c.is_ascii_digit() => self.read_integer(start),
                _ => self.read_symbol(start, ch),
            };
        }
    }

    fn skip_comment(&mut self) {
        while let Some(&(_, c)) = self.chars.peek() {
            if c == '\n' {
                break;
            }
            self.chars.next();
        }
    }

    fn read_multi_word_keyword(&mut self, start: usize) -> Option<Token<'a>> {
        let rest = &self.input[start..];
        for (text, kind) in MULTI_WORD_KEYWORDS {
            if !rest.starts_with(text) {
                continue;
            }
            // `is not3` and `is notfoo` are `is` followed by an identifier.
            if rest[text.len()..]
                .chars()
                .next()
                .is_some_and(is_identifier_char)
            {
                continue;
            }
            self.advance_by(text.chars().count());
            return Some(Token::new(
                kind,
                Span {
                    start,
                    end: start + text.len(),
                },
            ));
        }
        None
    }

    fn read_identifier(&mut self, start: usize) -> Token<'a> {
        self.chars.next(); // Consume first char
        while let Some(&(_, c)) = self.chars.peek() {
            if is_identifier_char(c) {
                self.chars.next();
            } else {
                break;
            }
        }

        let end = self.current_index();
        let ident = &self.input[start..end];
        let kind = self
            .keyword(ident)
            .unwrap_or(TokenKind::Identifier(ident));
        Token::new(kind, Span { start, end })
    }

    fn keyword(&self, ident: &str) -> Option<TokenKind<'a>> {
        let (kind, required) = match ident {
            "and" => (TokenKind::And, None),
            "or" => (TokenKind::Or, None),
            "not" => (TokenKind::Not, None),
            "is" => (TokenKind::Is, None),
            "if" => (TokenKind::If, Some(FeatureSet::CONDITIONAL)),
            "else" => (TokenKind::Else, Some(FeatureSet::CONDITIONAL)),
            "elif" => (TokenKind::Elif, Some(FeatureSet::ELSE_IF)),
            "for" => (TokenKind::For, Some(FeatureSet::LOOP)),
            "func" => (TokenKind::Func, Some(FeatureSet::FUNCTION)),
            "return" => (TokenKind::Return, Some(FeatureSet::FUNCTION)),
            _ => return None,
        };
        match required {
            Some(feature) if !self.features.contains(feature) => None,
            _ => Some(kind),
        }
    }

    fn read_integer(&mut self, start: usize) -> LexResult<Token<'a>> {
        self.chars.next(); // Consume first digit
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_ascii_digit() {
                self.chars.next();
            } else {
                break;
            }
        }

        let end = self.current_index();
        let literal = &self.input[start..end];
        let value = literal
            .parse::<i64>()
            .map_err(|_| LexError::InvalidIntegerLiteral {
                literal: literal.to_string(),
                position: start,
            })?;
        Ok(Token::new(TokenKind::Integer(value), Span { start, end }))
    }

    fn read_symbol(&mut self, start: usize, ch: char) -> LexResult<Token<'a>> {
        let next = self.input[start + ch.len_utf8()..].chars().next();
        let two_char = match (ch, next) {
            ('<', Some('=')) => Some(TokenKind::LessEqual),
            ('>', Some('=')) => Some(TokenKind::GreaterEqual),
            _ => None,
        };
        if let Some(kind) = two_char {
            self.advance_by(2);
            return Ok(Token::new(
                kind,
                Span {
                    start,
                    end: start + 2,
                },
            ));
        }

        let kind = match ch {
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '<' => TokenKind::Less,
            '>' => TokenKind::Greater,
            '=' => TokenKind::Assign,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semicolon,
            '[' if self.features.contains(FeatureSet::ARRAY) => TokenKind::LBracket,
            ']' if self.features.contains(FeatureSet::ARRAY) => TokenKind::RBracket,
            _ => {
                return Err(LexError::InvalidCharacter {
                    character: ch,
                    position: start,
                });
            }
        };
        self.chars.next();
        Ok(Token::new(
            kind,
            Span {
                start,
                end: start + 1,
            },
        ))
    }

    fn advance_by(&mut self, count: usize) {
        for _ in 0..count {
            self.chars.next();
        }
    }

    fn current_index(&mut self) -> usize {
        self.chars
            .peek()
            .map(|(idx, _)| *idx)
            .unwrap_or(self.input.len())
    }
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Yields tokens up to and including the first `EOF`, then stops.
impl<'a> Iterator for Lexer<'a> {
    type Item = LexResult<Token<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.iteration_done {
            return None;
        }
        let result = self.next_token();
        if result
            .as_ref()
            .map_or(true, |token| token.kind == TokenKind::EOF)
        {
            self.iteration_done = true;
        }
        Some(result)
    }
}

pub fn tokenize(input: &str, features: FeatureSet) -> LexResult<Vec<Token<'_>>> {
    let mut lexer = Lexer::new(input, features);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let is_eof = matches!(token.kind, TokenKind::EOF);
        tokens.push(token);
        if is_eof {
            break;
        }
    }
    Ok(tokens)
}
