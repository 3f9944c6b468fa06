//! This module turns program source text into the token stream consumed by the parser.
//! Scanning is driven by the `pest` grammar in `grammar.pest`; this module only maps the
//! resulting pairs onto [`Token`]s with line numbers.

use crate::types::CompileError;
use pest::{iterators::Pair, Parser as PestParser};
use pest_derive::Parser as PestParser;
use std::fmt;

/// Derives a `PestParser` for the token grammar defined in `grammar.pest`.
#[derive(PestParser)]
#[grammar = "grammar.pest"]
pub struct TokenScanner;

/// The kinds of tokens a program is made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// `CONFIG:`, `MACROS:` or `MAIN:`.
    Section,
    /// `START:`, `ACCEPT:`, `REJECT:`, `DEF`, `CALL` or `RETURN`.
    Keyword,
    /// A state or macro name.
    Id,
    /// A tape symbol.
    Symbol,
    /// `L`, `R` or `S`.
    Direction,
    Arrow,
    Comma,
    Colon,
    Newline,
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::Section => "SECTION",
            TokenKind::Keyword => "KEYWORD",
            TokenKind::Id => "ID",
            TokenKind::Symbol => "SYMBOL",
            TokenKind::Direction => "DIRECTION",
            TokenKind::Arrow => "ARROW",
            TokenKind::Comma => "COMMA",
            TokenKind::Colon => "COLON",
            TokenKind::Newline => "NEWLINE",
            TokenKind::Eof => "EOF",
        };
        f.write_str(name)
    }
}

/// A single token together with its text and the line it starts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, line: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            line,
        }
    }

    /// Describes the token for diagnostics, e.g. `KEYWORD 'ACCEPT:'` or `end of input`.
    pub fn describe(&self) -> String {
        match self.kind {
            TokenKind::Eof => "end of input".to_string(),
            TokenKind::Newline => self.kind.to_string(),
            _ => format!("{} '{}'", self.kind, self.text),
        }
    }
}

/// Scans `input` into tokens. The returned vector always ends with a single `Eof` token.
///
/// # Returns
///
/// * `Ok(Vec<Token>)` if every character belongs to a token, whitespace or a comment.
/// * `Err(CompileError::LexError)` pointing at the first character that does not.
pub fn tokenize(input: &str) -> Result<Vec<Token>, CompileError> {
    let tokens = TokenScanner::parse(Rule::tokens, input)
        .map_err(|e| CompileError::LexError(Box::new(e)))?
        .flat_map(|root| root.into_inner())
        .filter_map(to_token)
        .collect::<Vec<_>>();
    log::debug!("Scanned {} tokens", tokens.len());

    Ok(tokens)
}

/// Maps a grammar pair onto a token.
fn to_token(pair: Pair<Rule>) -> Option<Token> {
    let kind = match pair.as_rule() {
        Rule::section => TokenKind::Section,
        Rule::setting | Rule::keyword => TokenKind::Keyword,
        Rule::ident => TokenKind::Id,
        Rule::symbol => TokenKind::Symbol,
        Rule::direction => TokenKind::Direction,
        Rule::arrow => TokenKind::Arrow,
        Rule::comma => TokenKind::Comma,
        Rule::colon => TokenKind::Colon,
        Rule::EOI => TokenKind::Eof,
        _ => return None,
    };
    let (line, _) = pair.as_span().start_pos().line_col();

    Some(Token::new(kind, pair.as_str(), line))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input).unwrap().iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_tokenize_transition() {
        use TokenKind::*;

        assert_eq!(
            kinds("q0, 1 -> 0, R, done"),
            vec![Id, Comma, Symbol, Arrow, Symbol, Comma, Direction, Comma, Id, Eof]
        );
    }

    #[test]
    fn test_tokenize_sections_and_settings() {
        let tokens = tokenize("CONFIG:\n  START: q0\nMACROS:\nMAIN:").unwrap();

        assert_eq!(tokens[0], Token::new(TokenKind::Section, "CONFIG:", 1));
        assert_eq!(tokens[1], Token::new(TokenKind::Keyword, "START:", 2));
        assert_eq!(tokens[2], Token::new(TokenKind::Id, "q0", 2));
        assert_eq!(tokens[3], Token::new(TokenKind::Section, "MACROS:", 3));
        assert_eq!(tokens[4], Token::new(TokenKind::Section, "MAIN:", 4));
        assert_eq!(tokens[5].kind, TokenKind::Eof);
    }

    #[test]
    fn test_tokenize_call_and_def() {
        use TokenKind::*;

        let tokens = tokenize("DEF seek_blank:\nCALL seek_blank -> done\nRETURN").unwrap();
        let pairs: Vec<_> = tokens.iter().map(|t| (t.kind, t.text.as_str())).collect();

        assert_eq!(
            pairs,
            vec![
                (Keyword, "DEF"),
                (Id, "seek_blank"),
                (Colon, ":"),
                (Keyword, "CALL"),
                (Id, "seek_blank"),
                (Arrow, "->"),
                (Id, "done"),
                (Keyword, "RETURN"),
                (Eof, ""),
            ]
        );
    }

    #[test]
    fn test_keywords_and_directions_need_word_boundary() {
        use TokenKind::*;

        let tokens = tokenize("DEFAULT Rx R CALLER").unwrap();
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();

        assert_eq!(kinds, vec![Id, Id, Direction, Id, Eof]);
    }

    #[test]
    fn test_comments_and_line_numbers() {
        let tokens = tokenize("// header\n\nq0 // trailing\n  *").unwrap();

        assert_eq!(tokens[0], Token::new(TokenKind::Id, "q0", 3));
        assert_eq!(tokens[1], Token::new(TokenKind::Symbol, "*", 4));
        assert_eq!(tokens[2].kind, TokenKind::Eof);
        assert_eq!(tokens[2].line, 4);
    }

    #[test]
    fn test_unexpected_character() {
        let result = tokenize("q0, 1 -> 0, R, done\nq0, # -> 0");

        let error = result.unwrap_err();
        assert!(matches!(error, CompileError::LexError(_)));
        assert!(error.to_string().contains("2:5"));
    }

    #[test]
    fn test_describe() {
        assert_eq!(Token::new(TokenKind::Eof, "", 3).describe(), "end of input");
        assert_eq!(
            Token::new(TokenKind::Keyword, "ACCEPT:", 1).describe(),
            "KEYWORD 'ACCEPT:'"
        );
    }
}
