//! Lex a GPR string into a series of tokens for later parsing

use crate::io::gpr_parse::token::Token;
use thiserror::Error;

pub struct Lexer {
    source: Vec<char>,
    tokens: Vec<Token>,
    start: usize,
    current: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Lexer {
            source: source.chars().collect(),
            tokens: Vec::new(),
            start: 0,
            current: 0,
        }
    }

    /// Convert the source string into tokens, terminated by [`Token::Eof`]
    pub fn lex(&mut self) -> Result<Vec<Token>, LexerError> {
        while !self.is_at_end() {
            self.start = self.current;
            self.scan_token()?;
        }
        self.tokens.push(Token::Eof);
        Ok(std::mem::take(&mut self.tokens))
    }

    fn scan_token(&mut self) -> Result<(), LexerError> {
        let c: char = self.advance();
        match c {
            '(' => self.tokens.push(Token::LeftParen),
            ')' => self.tokens.push(Token::RightParen),
            ' ' | '\r' | '\n' | '\t' => {}
            c if Lexer::is_identifier_char(c) => self.read_identifier(),
            c => {
                return Err(LexerError::InvalidCharacter {
                    character: c,
                    position: self.start,
                })
            }
        };
        Ok(())
    }

    fn advance(&mut self) -> char {
        let char_at_current = self.source[self.current];
        self.current += 1;
        char_at_current
    }

    fn read_identifier(&mut self) {
        while !self.is_at_end() && Lexer::is_identifier_char(self.peek()) {
            self.advance();
        }

        let text: String = self.source[self.start..self.current].iter().collect();

        let token = match text.as_str() {
            "and" | "And" | "AND" => Token::And,
            "or" | "Or" | "OR" => Token::Or,
            "not" | "Not" | "NOT" => Token::Not,
            _ => Token::Identifier(text),
        };
        self.tokens.push(token);
    }

    /// Gene ids in published models use letters, digits, and a handful of separators
    /// (e.g. `b0001`, `10026.1`, `HGNC:123`, `YAL012W-A`)
    fn is_identifier_char(c: char) -> bool {
        c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-' | ':')
    }

    fn peek(&self) -> char {
        self.source[self.current]
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }
}

#[derive(Debug, Error, PartialEq, Clone)]
pub enum LexerError {
    #[error("Invalid character {character:?} at position {position}")]
    InvalidCharacter { character: char, position: usize },
}

#[cfg(test)]
mod tests {
    use crate::io::gpr_parse::lexer::{Lexer, LexerError};
    use crate::io::gpr_parse::token::Token;

    #[test]
    fn single_gene() {
        let tokens = Lexer::new("Rv0023").lex().unwrap();
        assert_eq!(
            tokens,
            vec![Token::Identifier(String::from("Rv0023")), Token::Eof]
        );
    }

    #[test]
    fn grouping() {
        let tokens = Lexer::new("(Rv0023 or Rv0123)").lex().unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::LeftParen,
                Token::Identifier(String::from("Rv0023")),
                Token::Or,
                Token::Identifier(String::from("Rv0123")),
                Token::RightParen,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn operators_and_odd_identifiers() {
        let tokens = Lexer::new("10026.1 AND not YAL012W-A").lex().unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Identifier(String::from("10026.1")),
                Token::And,
                Token::Not,
                Token::Identifier(String::from("YAL012W-A")),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn invalid_character() {
        assert_eq!(
            Lexer::new("g1 & g2").lex(),
            Err(LexerError::InvalidCharacter {
                character: '&',
                position: 3
            })
        );
    }
}
