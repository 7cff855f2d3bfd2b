//! # Lexer for Cairo assembly

use crate::error::{AssemblerError, Result};
use logos::Logos;
use std::fmt;

/// Tokens for Cairo assembly
#[derive(Logos, Debug, Clone, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"//[^\n]*")]
pub enum Token {
    #[token("ap")]
    Ap,

    #[token("fp")]
    Fp,

    #[token("jmp")]
    Jmp,

    #[token("call")]
    Call,

    #[token("ret")]
    Ret,

    #[token("rel")]
    Rel,

    #[token("abs")]
    Abs,

    #[token("if")]
    If,

    /// Raw data word
    #[token("dw")]
    Dw,

    /// Anything else that looks like a word
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Identifier(String),

    /// Unsigned integer literal, decimal or `0x` hex, kept as text
    #[regex(r"0x[0-9a-fA-F]+|[0-9]+", |lex| lex.slice().to_string())]
    Integer(String),

    #[token("[")]
    LBracket,

    #[token("]")]
    RBracket,

    #[token("++")]
    PlusPlus,

    #[token("+=")]
    PlusEq,

    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("*")]
    Star,

    #[token("!=")]
    NotEq,

    #[token("=")]
    Eq,

    #[token(",")]
    Comma,

    #[token(";")]
    Semicolon,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ap => write!(f, "'ap'"),
            Token::Fp => write!(f, "'fp'"),
            Token::Jmp => write!(f, "'jmp'"),
            Token::Call => write!(f, "'call'"),
            Token::Ret => write!(f, "'ret'"),
            Token::Rel => write!(f, "'rel'"),
            Token::Abs => write!(f, "'abs'"),
            Token::If => write!(f, "'if'"),
            Token::Dw => write!(f, "'dw'"),
            Token::Identifier(name) => write!(f, "'{name}'"),
            Token::Integer(text) => write!(f, "'{text}'"),
            Token::LBracket => write!(f, "'['"),
            Token::RBracket => write!(f, "']'"),
            Token::PlusPlus => write!(f, "'++'"),
            Token::PlusEq => write!(f, "'+='"),
            Token::Plus => write!(f, "'+'"),
            Token::Minus => write!(f, "'-'"),
            Token::Star => write!(f, "'*'"),
            Token::NotEq => write!(f, "'!='"),
            Token::Eq => write!(f, "'='"),
            Token::Comma => write!(f, "','"),
            Token::Semicolon => write!(f, "';'"),
        }
    }
}

/// Token with its 1-based source position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanned {
    pub token: Token,
    pub line: usize,
    pub column: usize,
}

/// Maps byte offsets to line/column pairs
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(source: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(source.match_indices('\n').map(|(i, _)| i + 1));
        Self { starts }
    }

    fn position(&self, offset: usize) -> (usize, usize) {
        let line = self.starts.partition_point(|start| *start <= offset);
        (line, offset - self.starts[line - 1] + 1)
    }
}

/// Split source text into positioned tokens
pub fn tokenize(source: &str) -> Result<Vec<Spanned>> {
    let index = LineIndex::new(source);
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next() {
        let (line, column) = index.position(lexer.span().start);
        match token {
            Ok(token) => tokens.push(Spanned {
                token,
                line,
                column,
            }),
            Err(()) => {
                return Err(AssemblerError::SyntaxError {
                    line,
                    column,
                    message: format!("unexpected character {:?}", lexer.slice()),
                })
            }
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|spanned| spanned.token)
            .collect()
    }

    #[test]
    fn test_lexer_assert() {
        assert_eq!(
            kinds("[ap] = [fp + -3], ap++;"),
            vec![
                Token::LBracket,
                Token::Ap,
                Token::RBracket,
                Token::Eq,
                Token::LBracket,
                Token::Fp,
                Token::Plus,
                Token::Minus,
                Token::Integer("3".into()),
                Token::RBracket,
                Token::Comma,
                Token::Ap,
                Token::PlusPlus,
                Token::Semicolon,
            ]
        );
    }

    #[test]
    fn test_lexer_keywords_and_numbers() {
        assert_eq!(
            kinds("jmp rel 0x1F if [ap] != 0; ap += 5; dw 12"),
            vec![
                Token::Jmp,
                Token::Rel,
                Token::Integer("0x1F".into()),
                Token::If,
                Token::LBracket,
                Token::Ap,
                Token::RBracket,
                Token::NotEq,
                Token::Integer("0".into()),
                Token::Semicolon,
                Token::Ap,
                Token::PlusEq,
                Token::Integer("5".into()),
                Token::Semicolon,
                Token::Dw,
                Token::Integer("12".into()),
            ]
        );
    }

    #[test]
    fn test_lexer_comments_and_positions() {
        let tokens = tokenize("// header\n  ret; // trailing\nfoo").unwrap();
        assert_eq!(tokens.len(), 3);
        assert_eq!((tokens[0].line, tokens[0].column), (2, 3));
        assert_eq!(tokens[2].token, Token::Identifier("foo".into()));
        assert_eq!((tokens[2].line, tokens[2].column), (3, 1));
    }

    #[test]
    fn test_lexer_rejects_stray_characters() {
        let err = tokenize("ret;\n  @").unwrap_err();
        assert!(matches!(err, AssemblerError::SyntaxError { line: 2, column: 3, .. }));
    }
}
