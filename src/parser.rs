//! This module provides the parser that turns a token stream into the raw IR.
//!
//! A program is a `CONFIG:` section with `START:`, `ACCEPT:` and `REJECT:` in that order, an
//! optional `MACROS:` section of `DEF name:` blocks, and a mandatory `MAIN:` section.

use crate::{
    lexer::{tokenize, Token, TokenKind},
    types::{CompileError, Direction, Macro, Metadata, RawProgram, RawTransition, Target},
};

/// Parses program source text into a `RawProgram`.
///
/// This is the main entry point for source text. It scans the input with the lexer and hands
/// the token stream to [`Parser`].
///
/// # Returns
///
/// * `Ok(RawProgram)` if the input is a well-formed program.
/// * `Err(CompileError::LexError)` if the input contains an unknown character.
/// * `Err(CompileError::SyntaxError)` or `Err(CompileError::MissingMain)` on malformed input.
pub fn parse(input: &str) -> Result<RawProgram, CompileError> {
    Parser::new(tokenize(input)?).parse()
}

/// A recursive-descent parser over a token stream.
///
/// `NEWLINE` tokens are insignificant and skipped. A missing trailing `EOF` token is treated
/// as if it were there.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        let tokens = tokens
            .into_iter()
            .filter(|t| t.kind != TokenKind::Newline)
            .collect();

        Self { tokens, pos: 0 }
    }

    /// Consumes the token stream and builds the raw IR.
    pub fn parse(mut self) -> Result<RawProgram, CompileError> {
        let mut program = RawProgram::default();

        if !self.at_section("CONFIG:") {
            return Err(self.unexpected(format!("{} 'CONFIG:'", TokenKind::Section)));
        }
        program.meta = self.parse_config()?;

        if self.at_section("MACROS:") {
            self.parse_macros(&mut program)?;
        }

        if !self.at_section("MAIN:") {
            return Err(CompileError::MissingMain);
        }
        program.main = self.parse_main()?;

        log::debug!(
            "Parsed {} macro(s) and {} main transition(s)",
            program.macros.len(),
            program.main.len()
        );

        Ok(program)
    }

    /// Parses `CONFIG: START: id ACCEPT: id REJECT: id`.
    fn parse_config(&mut self) -> Result<Metadata, CompileError> {
        self.expect(TokenKind::Section)?;

        let start = self.parse_setting("START:")?;
        let accept = self.parse_setting("ACCEPT:")?;
        let reject = self.parse_setting("REJECT:")?;

        Ok(Metadata {
            start: Some(start),
            accept: Some(accept),
            reject: Some(reject),
        })
    }

    /// Parses one `KEY: id` pair of the config section.
    fn parse_setting(&mut self, key: &str) -> Result<String, CompileError> {
        self.expect_text(TokenKind::Keyword, key)?;
        Ok(self.expect(TokenKind::Id)?.text)
    }

    /// Parses `MACROS:` followed by `DEF name:` blocks until the next section header.
    fn parse_macros(&mut self, program: &mut RawProgram) -> Result<(), CompileError> {
        self.expect(TokenKind::Section)?;

        while !matches!(self.peek().kind, TokenKind::Section | TokenKind::Eof) {
            self.expect_text(TokenKind::Keyword, "DEF")?;
            let name = self.expect(TokenKind::Id)?;
            self.expect(TokenKind::Colon)?;

            // At least one transition, then as many as follow.
            let mut body = vec![self.parse_transition()?];
            while self.peek().kind == TokenKind::Id {
                body.push(self.parse_transition()?);
            }

            if program.macros.contains_key(&name.text) {
                return Err(CompileError::DuplicateMacro {
                    name: name.text,
                    line: name.line,
                });
            }

            program.macros.insert(
                name.text.clone(),
                Macro {
                    name: name.text,
                    body,
                },
            );
        }

        Ok(())
    }

    /// Parses `MAIN:` followed by one or more transitions up to the end of input.
    fn parse_main(&mut self) -> Result<Vec<RawTransition>, CompileError> {
        self.expect(TokenKind::Section)?;

        let mut transitions = vec![self.parse_transition()?];
        while self.peek().kind != TokenKind::Eof {
            transitions.push(self.parse_transition()?);
        }

        Ok(transitions)
    }

    /// Parses `state, symbol -> symbol, direction, target`.
    fn parse_transition(&mut self) -> Result<RawTransition, CompileError> {
        let src = self.expect(TokenKind::Id)?;
        self.expect(TokenKind::Comma)?;
        let read = self.parse_symbol()?;
        self.expect(TokenKind::Arrow)?;
        let write = self.parse_symbol()?;
        self.expect(TokenKind::Comma)?;
        let dir = self.parse_direction()?;
        self.expect(TokenKind::Comma)?;
        let target = self.parse_target()?;

        Ok(RawTransition {
            src: src.text,
            read,
            write,
            dir,
            target,
            line: src.line,
        })
    }

    /// Parses a bare state name, `CALL name -> state` or `RETURN`.
    fn parse_target(&mut self) -> Result<Target, CompileError> {
        if self.peek().kind != TokenKind::Keyword {
            let name = self.expect(TokenKind::Id)?.text;
            return Ok(Target::Goto { name });
        }

        match self.peek().text.as_str() {
            "CALL" => {
                self.advance();
                let name = self.expect(TokenKind::Id)?.text;
                self.expect(TokenKind::Arrow)?;
                let ret = self.expect(TokenKind::Id)?.text;
                Ok(Target::Call { name, ret })
            }
            "RETURN" => {
                self.advance();
                Ok(Target::Return)
            }
            _ => Err(self.unexpected(format!(
                "{} or {} 'CALL' or 'RETURN'",
                TokenKind::Id,
                TokenKind::Keyword
            ))),
        }
    }

    fn parse_symbol(&mut self) -> Result<char, CompileError> {
        let token = self.expect(TokenKind::Symbol)?;
        let mut chars = token.text.chars();

        match (chars.next(), chars.next()) {
            (Some(symbol), None) => Ok(symbol),
            _ => Err(CompileError::SyntaxError {
                expected: format!("single-character {}", TokenKind::Symbol),
                found: token.describe(),
                line: token.line,
            }),
        }
    }

    fn parse_direction(&mut self) -> Result<Direction, CompileError> {
        let token = self.expect(TokenKind::Direction)?;

        Direction::from_letter(&token.text).ok_or_else(|| CompileError::SyntaxError {
            expected: format!("{} 'L', 'R' or 'S'", TokenKind::Direction),
            found: token.describe(),
            line: token.line,
        })
    }

    /// Returns the current token, or a synthetic `EOF` past the end of the stream.
    fn peek(&self) -> Token {
        self.tokens.get(self.pos).cloned().unwrap_or_else(|| {
            let line = self.tokens.last().map_or(0, |t| t.line);
            Token::new(TokenKind::Eof, "", line)
        })
    }

    fn advance(&mut self) -> Token {
        let token = self.peek();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn at_section(&self, name: &str) -> bool {
        let token = self.peek();
        token.kind == TokenKind::Section && token.text == name
    }

    /// Consumes a token of the given kind.
    fn expect(&mut self, kind: TokenKind) -> Result<Token, CompileError> {
        if self.peek().kind != kind {
            return Err(self.unexpected(kind.to_string()));
        }
        Ok(self.advance())
    }

    /// Consumes a token of the given kind and exact text.
    fn expect_text(&mut self, kind: TokenKind, text: &str) -> Result<Token, CompileError> {
        let token = self.peek();
        if token.kind != kind || token.text != text {
            return Err(self.unexpected(format!("{kind} '{text}'")));
        }
        Ok(self.advance())
    }

    fn unexpected(&self, expected: String) -> CompileError {
        let token = self.peek();
        CompileError::SyntaxError {
            expected,
            found: token.describe(),
            line: token.line,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEEK_BLANK: &str = r#"
CONFIG:
    START: q0
    ACCEPT: done
    REJECT: fail
MACROS:
    DEF seek_blank:
        q0, 0 -> 1, R, q0
        q0, _ -> _, S, RETURN
MAIN:
    q0, 1 -> 0, R, CALL seek_blank -> done
"#;

    #[test]
    fn test_parse_simple_program() {
        let input = r#"
CONFIG:
    START: q0
    ACCEPT: done
    REJECT: fail
MAIN:
    q0, 1 -> 0, R, done
"#;

        let program = parse(input).unwrap();
        assert_eq!(program.meta.start.as_deref(), Some("q0"));
        assert_eq!(program.meta.accept.as_deref(), Some("done"));
        assert_eq!(program.meta.reject.as_deref(), Some("fail"));
        assert!(program.macros.is_empty());
        assert_eq!(
            program.main,
            vec![RawTransition {
                src: "q0".into(),
                read: '1',
                write: '0',
                dir: Direction::Right,
                target: Target::Goto {
                    name: "done".into()
                },
                line: 7,
            }]
        );
    }

    #[test]
    fn test_parse_macros() {
        let program = parse(SEEK_BLANK).unwrap();

        let seek_blank = &program.macros["seek_blank"];
        assert_eq!(seek_blank.name, "seek_blank");
        assert_eq!(seek_blank.body.len(), 2);
        assert_eq!(seek_blank.entry(), Some("q0"));
        assert_eq!(seek_blank.body[1].target, Target::Return);
        assert_eq!(seek_blank.body[1].read, '_');

        assert_eq!(
            program.main[0].target,
            Target::Call {
                name: "seek_blank".into(),
                ret: "done".into()
            }
        );
    }

    #[test]
    fn test_parse_multiple_macros() {
        let input = r#"
CONFIG: START: a ACCEPT: y REJECT: n
MACROS:
    DEF left:
        q, 0 -> 0, L, q
        q, _ -> _, R, RETURN
    DEF right:
        q, 0 -> 0, R, q
        q, _ -> _, L, RETURN
MAIN:
    a, 0 -> 0, S, CALL right -> b
    b, 0 -> 0, S, CALL left -> y
"#;
        let program = parse(input).unwrap();
        assert_eq!(program.macros.len(), 2);
        assert_eq!(program.macros["left"].body[0].dir, Direction::Left);
        assert_eq!(program.main.len(), 2);
    }

    #[test]
    fn test_parse_empty_macros_section() {
        let input = "CONFIG: START: a ACCEPT: y REJECT: n\nMACROS:\nMAIN:\na, * -> *, S, y";
        let program = parse(input).unwrap();
        assert!(program.macros.is_empty());
        assert_eq!(program.main[0].read, '*');
    }

    #[test]
    fn test_parse_missing_config() {
        let error = parse("MAIN:\n q0, 1 -> 0, R, done").unwrap_err();
        assert_eq!(
            error,
            CompileError::SyntaxError {
                expected: "SECTION 'CONFIG:'".into(),
                found: "SECTION 'MAIN:'".into(),
                line: 1,
            }
        );
    }

    #[test]
    fn test_parse_config_wrong_order() {
        let input = "CONFIG:\n START: q0\n REJECT: fail\n ACCEPT: done\nMAIN:\n q0, 1 -> 0, R, done";
        let error = parse(input).unwrap_err();
        assert_eq!(
            error,
            CompileError::SyntaxError {
                expected: "KEYWORD 'ACCEPT:'".into(),
                found: "KEYWORD 'REJECT:'".into(),
                line: 3,
            }
        );
    }

    #[test]
    fn test_parse_missing_main() {
        let input = "CONFIG: START: q0 ACCEPT: done REJECT: fail\n";
        assert_eq!(parse(input).unwrap_err(), CompileError::MissingMain);

        let input = "CONFIG: START: q0 ACCEPT: done REJECT: fail\nMACROS:\n";
        assert_eq!(parse(input).unwrap_err(), CompileError::MissingMain);

        let input = "CONFIG: START: q0 ACCEPT: done REJECT: fail\nq0, 1 -> 0, R, done";
        assert_eq!(parse(input).unwrap_err(), CompileError::MissingMain);
    }

    #[test]
    fn test_parse_empty_main() {
        let input = "CONFIG: START: q0 ACCEPT: done REJECT: fail\nMAIN:\n";
        let error = parse(input).unwrap_err();
        assert!(matches!(error, CompileError::SyntaxError { .. }));
        assert!(error.to_string().contains("expected ID but got end of input"));
    }

    #[test]
    fn test_parse_bad_transition() {
        let input = "CONFIG: START: q0 ACCEPT: done REJECT: fail\nMAIN:\n  q0, 1 -> 0 R, done";
        let error = parse(input).unwrap_err();
        assert_eq!(
            error,
            CompileError::SyntaxError {
                expected: "COMMA".into(),
                found: "DIRECTION 'R'".into(),
                line: 3,
            }
        );
    }

    #[test]
    fn test_parse_call_missing_return_state() {
        let input = "CONFIG: START: q0 ACCEPT: done REJECT: fail\nMAIN:\n  q0, 1 -> 0, R, CALL m";
        let error = parse(input).unwrap_err();
        assert!(error
            .to_string()
            .contains("expected ARROW but got end of input at line 3"));
    }

    #[test]
    fn test_parse_macro_without_def() {
        let input = "CONFIG: START: q0 ACCEPT: done REJECT: fail\nMACROS:\n  m:\n  q, 0 -> 0, R, q\nMAIN:\n  q0, 1 -> 0, R, done";
        let error = parse(input).unwrap_err();
        assert_eq!(
            error,
            CompileError::SyntaxError {
                expected: "KEYWORD 'DEF'".into(),
                found: "ID 'm'".into(),
                line: 3,
            }
        );
    }

    #[test]
    fn test_parse_duplicate_macro() {
        let input = r#"CONFIG: START: q0 ACCEPT: done REJECT: fail
MACROS:
    DEF m:
        q, 0 -> 0, R, RETURN
    DEF m:
        q, 1 -> 1, R, RETURN
MAIN:
    q0, 1 -> 0, R, CALL m -> done
"#;
        let error = parse(input).unwrap_err();
        assert_eq!(
            error,
            CompileError::DuplicateMacro {
                name: "m".into(),
                line: 5,
            }
        );
    }

    #[test]
    fn test_parse_return_at_top_level_is_syntactically_legal() {
        let input = "CONFIG: START: q0 ACCEPT: done REJECT: fail\nMAIN:\n  q0, 1 -> 0, R, RETURN";
        let program = parse(input).unwrap();
        assert_eq!(program.main[0].target, Target::Return);
    }

    #[test]
    fn test_parse_misplaced_keyword_target() {
        let input = "CONFIG: START: q0 ACCEPT: done REJECT: fail\nMAIN:\n  q0, 1 -> 0, R, DEF";
        let error = parse(input).unwrap_err();
        assert!(error.to_string().contains("but got KEYWORD 'DEF'"));
    }

    #[test]
    fn test_parse_token_stream_with_newlines() {
        let tokens = vec![
            Token::new(TokenKind::Section, "CONFIG:", 1),
            Token::new(TokenKind::Newline, "\n", 1),
            Token::new(TokenKind::Keyword, "START:", 2),
            Token::new(TokenKind::Id, "a", 2),
            Token::new(TokenKind::Keyword, "ACCEPT:", 3),
            Token::new(TokenKind::Id, "b", 3),
            Token::new(TokenKind::Keyword, "REJECT:", 4),
            Token::new(TokenKind::Id, "c", 4),
            Token::new(TokenKind::Newline, "\n", 4),
            Token::new(TokenKind::Section, "MAIN:", 5),
            Token::new(TokenKind::Id, "a", 6),
            Token::new(TokenKind::Comma, ",", 6),
            Token::new(TokenKind::Symbol, "0", 6),
            Token::new(TokenKind::Arrow, "->", 6),
            Token::new(TokenKind::Symbol, "1", 6),
            Token::new(TokenKind::Comma, ",", 6),
            Token::new(TokenKind::Direction, "L", 6),
            Token::new(TokenKind::Comma, ",", 6),
            Token::new(TokenKind::Id, "b", 6),
        ];

        // No trailing EOF token: the parser synthesizes one.
        let program = Parser::new(tokens).parse().unwrap();
        assert_eq!(program.meta.reject.as_deref(), Some("c"));
        assert_eq!(program.main[0].dir, Direction::Left);
        assert_eq!(program.main[0].line, 6);
    }
}
