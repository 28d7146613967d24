use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::iter::Peekable;
use std::str::Chars;
use lazy_static::lazy_static;
use thiserror::Error;
use crate::util;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenPos {
    pub line: usize,
    pub column: usize,
}

impl TokenPos {
    pub fn new(line: usize, column: usize) -> TokenPos {
        TokenPos { line, column }
    }

    pub fn begin() -> TokenPos {
        TokenPos::new(1, 1)
    }
}

impl Default for TokenPos {
    fn default() -> Self {
        TokenPos::begin()
    }
}

impl Display for TokenPos {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[line {} column {}]", self.line, self.column)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Keyword {
    Set,
    And, Or, Not,
    If, Eli, El, Then,
    For, To, Step,
    While,
    Fun, Return,
    Struct,
    True, False, Null,
}

impl Keyword {
    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::Set => "set",
            Keyword::And => "and",
            Keyword::Or => "or",
            Keyword::Not => "not",
            Keyword::If => "if",
            Keyword::Eli => "eli",
            Keyword::El => "el",
            Keyword::Then => "then",
            Keyword::For => "for",
            Keyword::To => "to",
            Keyword::Step => "step",
            Keyword::While => "while",
            Keyword::Fun => "fun",
            Keyword::Return => "return",
            Keyword::Struct => "struct",
            Keyword::True => "true",
            Keyword::False => "false",
            Keyword::Null => "null",
        }
    }
}

lazy_static! {
    static ref KEYWORDS: HashMap<&'static str, Keyword> = [
        Keyword::Set,
        Keyword::And, Keyword::Or, Keyword::Not,
        Keyword::If, Keyword::Eli, Keyword::El, Keyword::Then,
        Keyword::For, Keyword::To, Keyword::Step,
        Keyword::While,
        Keyword::Fun, Keyword::Return,
        Keyword::Struct,
        Keyword::True, Keyword::False, Keyword::Null,
    ].into_iter().map(|keyword| (keyword.as_str(), keyword)).collect();
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenType {
    Int, Float, String,
    Identifier,
    Keyword(Keyword),

    // `=`, `+`, `-`, `*`, `/`, `^`
    Eq, Plus, Minus, Mul, Div, Pow,
    // `==`, `!=`, `<`, `>`, `<=`, `>=`
    EqEq, NotEq, Lt, Gt, Lte, Gte,
    // `(`, `)`, `,`, `->`, `:`, `.`
    LParen, RParen, Comma, Arrow, Colon, Dot,

    Eof,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    token_type: TokenType,
    source: String,
    start: TokenPos, end: TokenPos,
}

impl Token {
    pub fn new(token_type: TokenType, source: String, start: TokenPos, end: TokenPos) -> Token {
        Token {
            token_type, source,
            start, end,
        }
    }

    pub fn token_type(&self) -> TokenType { self.token_type }
    /// The literal text of the token. For strings this is the unescaped content without quotes.
    pub fn source(&self) -> &str { &self.source }
    pub fn start(&self) -> &TokenPos { &self.start }
    pub fn end(&self) -> &TokenPos { &self.end }
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.token_type {
            TokenType::Eof => f.write_str("end of input"),
            TokenType::String => write!(f, "'{}'", self.source),
            _ => write!(f, "`{}`", self.source),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexerError {
    #[error("Unexpected character '{1}'")]
    UnexpectedCharacter(TokenPos, char),
    #[error("Unterminated string")]
    UnterminatedString {
        pos: TokenPos,
    },
    #[error("Unknown escape sequence '\\{escape}'")]
    UnknownEscape {
        pos: TokenPos,
        escape: char,
    },
    #[error("Invalid number literal '{literal}'")]
    InvalidNumber {
        pos: TokenPos,
        literal: String,
    },
}

impl LexerError {
    pub fn get_pos(&self) -> TokenPos {
        match self {
            LexerError::UnexpectedCharacter(pos, _) => *pos,
            LexerError::UnterminatedString { pos } => *pos,
            LexerError::UnknownEscape { pos, .. } => *pos,
            LexerError::InvalidNumber { pos, .. } => *pos,
        }
    }
}

type LexerResult<T> = Result<T, LexerError>;

/// Turns `source` into its complete token sequence, terminated by a single [`TokenType::Eof`].
pub fn tokenize(source: &str) -> LexerResult<Vec<Token>> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();

    loop {
        let token = lexer.scan_token()?;
        let eof = token.token_type() == TokenType::Eof;
        tokens.push(token);

        if eof {
            break;
        }
    }

    tracing::trace!(count = tokens.len(), "tokenized source");
    Ok(tokens)
}

pub struct Lexer<'source> {
    input: &'source str,

    chars: Peekable<Chars<'source>>,

    start_index: usize,
    current_index: usize,

    start_pos: TokenPos,
    current_pos: TokenPos,
}

impl<'source> Lexer<'source> {
    pub fn new(source: &'source str) -> Lexer<'source> {
        Lexer {
            input: source,

            chars: source.chars().peekable(),

            start_index: 0,
            current_index: 0,

            start_pos: TokenPos::begin(),
            current_pos: TokenPos::begin(),
        }
    }

    pub fn scan_token(&mut self) -> LexerResult<Token> {
        loop {
            self.skip_whitespace();
            self.start_index = self.current_index;
            self.start_pos = self.current_pos;

            let c = match self.consume() {
                Some(c) => c,
                None => return Ok(self.make_token(TokenType::Eof)),
            };

            return match c {
                '#' => {
                    self.skip_line();
                    continue;
                },

                '(' => Ok(self.make_token(TokenType::LParen)),
                ')' => Ok(self.make_token(TokenType::RParen)),
                ',' => Ok(self.make_token(TokenType::Comma)),
                ':' => Ok(self.make_token(TokenType::Colon)),
                '.' => Ok(self.make_token(TokenType::Dot)),
                '+' => Ok(self.make_token(TokenType::Plus)),
                '*' => Ok(self.make_token(TokenType::Mul)),
                '/' => Ok(self.make_token(TokenType::Div)),
                '^' => Ok(self.make_token(TokenType::Pow)),

                '-' => Ok(if self.expect('>') { self.make_token(TokenType::Arrow) } else {
                    self.make_token(TokenType::Minus)
                }),
                '=' => Ok(if self.expect('=') { self.make_token(TokenType::EqEq) } else {
                    self.make_token(TokenType::Eq)
                }),
                '<' => Ok(if self.expect('=') { self.make_token(TokenType::Lte) } else {
                    self.make_token(TokenType::Lt)
                }),
                '>' => Ok(if self.expect('=') { self.make_token(TokenType::Gte) } else {
                    self.make_token(TokenType::Gt)
                }),
                '!' => if self.expect('=') {
                    Ok(self.make_token(TokenType::NotEq))
                } else {
                    Err(LexerError::UnexpectedCharacter(self.start_pos, c))
                },

                '\'' => self.scan_string(),
                c if util::is_numeric(c) => self.scan_number(),
                c if util::is_alphabetic(c) => Ok(self.scan_identifier()),

                _ => Err(LexerError::UnexpectedCharacter(self.start_pos, c)),
            };
        }
    }

    fn scan_string(&mut self) -> LexerResult<Token> {
        let mut value = String::new();

        loop {
            let escape_pos = self.current_pos;

            match self.consume() {
                None => return Err(LexerError::UnterminatedString { pos: self.start_pos }),
                Some('\'') => break,
                Some('\\') => match self.consume() {
                    Some('\'') => value.push('\''),
                    Some('\\') => value.push('\\'),
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some(escape) => return Err(LexerError::UnknownEscape { pos: escape_pos, escape }),
                    None => return Err(LexerError::UnterminatedString { pos: self.start_pos }),
                },
                Some(c) => value.push(c),
            }
        }

        Ok(Token {
            token_type: TokenType::String,
            source: value,
            start: self.start_pos, end: self.current_pos,
        })
    }

    fn scan_number(&mut self) -> LexerResult<Token> {
        while self.peek().is_some_and(util::is_numeric) {
            self.consume();
        }

        let mut floating_point = false;

        if self.peek() == Some('.') && self.peek_next().is_some_and(util::is_numeric) {
            self.consume();
            floating_point = true;

            while self.peek().is_some_and(util::is_numeric) {
                self.consume();
            }
        }

        let token = self.make_token(if floating_point { TokenType::Float } else { TokenType::Int });

        // Integer literals that do not fit into an i64 are rejected here rather than in the parser
        if !floating_point && token.source().parse::<i64>().is_err() {
            return Err(LexerError::InvalidNumber { pos: self.start_pos, literal: token.source });
        }

        Ok(token)
    }

    fn scan_identifier(&mut self) -> Token {
        while self.peek().is_some_and(util::is_alphanumeric) {
            self.consume();
        }

        let name = &self.input[self.start_index..self.current_index];

        let token_type = match KEYWORDS.get(name) {
            Some(keyword) => TokenType::Keyword(*keyword),
            None => TokenType::Identifier,
        };

        self.make_token(token_type)
    }

    fn make_token(&self, token_type: TokenType) -> Token {
        Token {
            token_type,
            source: self.input[self.start_index..self.current_index].to_owned(),

            start: self.start_pos, end: self.current_pos,
        }
    }

    fn consume(&mut self) -> Option<char> {
        let c = self.chars.next()?;

        self.current_index += c.len_utf8();

        if c == '\n' {
            self.current_pos.line += 1;
            self.current_pos.column = 1;
        } else {
            self.current_pos.column += 1;
        }

        Some(c)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn peek_next(&mut self) -> Option<char> {
        self.input[self.current_index..].chars().nth(1)
    }

    fn expect(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.consume();
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.consume();
        }
    }

    fn skip_line(&mut self) {
        while let Some(c) = self.consume() {
            if c == '\n' {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests;
