//! Byte-level tokenizer for DCF text.
//!
//! The tokenizer is deliberately context-free: it does not track whether it
//! is lexing a field key or a field value. A single "atom" scan handles
//! field keys (`Config/testthat/edition`, `Authors@R`), NVC names, and
//! version literals alike — they all look the same to the tokenizer (a run
//! of bytes bounded by whitespace or a structural character). The
//! [`super::Parser`] is what gives those runs meaning, by position in the
//! grammar; when a value doesn't fit the name/version-list shape it wants,
//! it falls back to re-slicing the original buffer directly (see
//! `dcf::parser`'s abandon path) rather than asking the tokenizer to guess.
//!
//! Indentation-aware newline handling (continuation vs. field end vs.
//! stanza end) and column-0 `#` comments are handled here, since both are
//! purely lexical.
//!
//! A backslash inside an atom run starts an escape: `\\`, `\"`, `\n`, `\t`,
//! `\r`, and `\0` are recognized and folded back into the run, but a
//! backslash followed by anything else (including end of input) is an
//! unrecoverable byte sequence and is surfaced as its own `Invalid` token
//! rather than silently absorbed.

use super::token::{Span, Token, TokenTag};

/// Bytes that terminate an atom scan and/or form their own token.
const STOP_BYTES: &[u8] = b":,()<>=+\n\r \t";

/// Escape characters recognized after a backslash inside an atom run.
const RECOGNIZED_ESCAPES: &[u8] = b"\\\"ntr0";

fn is_stop_byte(b: u8) -> bool {
    STOP_BYTES.contains(&b)
}

fn is_control_byte(b: u8) -> bool {
    matches!(b, 0x00..=0x08 | 0x0B..=0x1F | 0x7F)
}

pub struct Lexer<'a> {
    bytes: &'a [u8],
    pos: usize,
    /// Set right after emitting `EndField` for a bare (non-continuation)
    /// newline; consumed by the next call to decide stanza-vs-field
    /// boundary without needing to re-scan backwards.
    after_field_end: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        let pos = if bytes.starts_with(b"\xEF\xBB\xBF") { 3 } else { 0 };
        Self {
            bytes,
            pos,
            after_field_end: false,
        }
    }

    pub fn source(&self) -> &'a [u8] {
        self.bytes
    }

    fn at_line_start(&self) -> bool {
        self.pos == 0 || self.bytes.get(self.pos - 1) == Some(&b'\n')
    }

    fn skip_comment_line(&mut self) {
        while self.pos < self.bytes.len() && self.bytes[self.pos] != b'\n' {
            self.pos += 1;
        }
        // Consume the terminating newline too: a comment line is wholly
        // invisible, it must not also masquerade as a blank/field-ending line.
        if self.pos < self.bytes.len() {
            self.pos += 1;
        }
    }

    /// Pulls the next token, advancing internal position.
    pub fn next_token(&mut self) -> Token {
        loop {
            if self.after_field_end {
                self.after_field_end = false;
                if self.pos < self.bytes.len() && self.bytes[self.pos] == b'\n' {
                    let start = self.pos;
                    while self.pos < self.bytes.len() && self.bytes[self.pos] == b'\n' {
                        self.pos += 1;
                    }
                    return Token::new(TokenTag::EndStanza, Span::new(start, self.pos));
                }
                // not a blank line: fall through, lex the next field's key.
            }

            if self.pos >= self.bytes.len() {
                return Token::new(TokenTag::Eof, Span::new(self.pos, self.pos));
            }

            let c = self.bytes[self.pos];

            if c == b'#' && self.at_line_start() {
                self.skip_comment_line();
                continue;
            }

            if c == b'\n' {
                let nl_start = self.pos;
                self.pos += 1;
                let continues = self
                    .bytes
                    .get(self.pos)
                    .is_some_and(|b| *b == b' ' || *b == b'\t');
                if continues {
                    while self
                        .bytes
                        .get(self.pos)
                        .is_some_and(|b| *b == b' ' || *b == b'\t')
                    {
                        self.pos += 1;
                    }
                    continue;
                }
                self.after_field_end = true;
                return Token::new(TokenTag::EndField, Span::new(nl_start, self.pos));
            }

            if c == b'\r' {
                self.pos += 1;
                continue;
            }

            if c == b' ' || c == b'\t' {
                self.pos += 1;
                continue;
            }

            let start = self.pos;
            let single = |tag: TokenTag, pos: &mut usize| {
                *pos += 1;
                Token::new(tag, Span::new(start, *pos))
            };

            match c {
                b':' => return single(TokenTag::Colon, &mut self.pos),
                b',' => return single(TokenTag::Comma, &mut self.pos),
                b'(' => return single(TokenTag::OpenRound, &mut self.pos),
                b')' => return single(TokenTag::CloseRound, &mut self.pos),
                b'+' => return single(TokenTag::Plus, &mut self.pos),
                b'<' => {
                    self.pos += 1;
                    if self.bytes.get(self.pos) == Some(&b'=') {
                        self.pos += 1;
                        return Token::new(TokenTag::LessThanEqual, Span::new(start, self.pos));
                    }
                    return Token::new(TokenTag::LessThan, Span::new(start, self.pos));
                }
                b'>' => {
                    self.pos += 1;
                    if self.bytes.get(self.pos) == Some(&b'=') {
                        self.pos += 1;
                        return Token::new(TokenTag::GreaterThanEqual, Span::new(start, self.pos));
                    }
                    return Token::new(TokenTag::GreaterThan, Span::new(start, self.pos));
                }
                b'=' => {
                    self.pos += 1;
                    if self.bytes.get(self.pos) == Some(&b'=') {
                        self.pos += 1;
                    }
                    return Token::new(TokenTag::Equal, Span::new(start, self.pos));
                }
                _ if is_control_byte(c) => return single(TokenTag::Invalid, &mut self.pos),
                b'\\' => return self.lex_escape(start),
                _ => {
                    while self.pos < self.bytes.len()
                        && !is_stop_byte(self.bytes[self.pos])
                        && self.bytes[self.pos] != b'\\'
                    {
                        self.pos += 1;
                    }
                    return Token::new(TokenTag::Identifier, Span::new(start, self.pos));
                }
            }
        }
    }

    /// Lexes a backslash escape starting at `start` (where `self.pos ==
    /// start` and `self.bytes[start] == b'\\'`). A recognized escape char
    /// (see [`RECOGNIZED_ESCAPES`]) is consumed as a two-byte `Identifier`
    /// token that the atom scan resumes after; anything else — an
    /// unrecognized escape char, or a backslash at end of input — cannot be
    /// recovered and is returned as `Invalid`.
    fn lex_escape(&mut self, start: usize) -> Token {
        self.pos += 1; // consume the backslash itself
        match self.bytes.get(self.pos) {
            Some(b) if RECOGNIZED_ESCAPES.contains(b) => {
                self.pos += 1;
                Token::new(TokenTag::Identifier, Span::new(start, self.pos))
            }
            Some(_) => {
                self.pos += 1;
                Token::new(TokenTag::Invalid, Span::new(start, self.pos))
            }
            None => Token::new(TokenTag::Invalid, Span::new(start, self.pos)),
        }
    }

    /// Builds a `StringLiteral` token spanning `[start, end)` of the
    /// original buffer, trimmed of trailing whitespace. Used by the parser
    /// when it abandons name/version-list parsing for a field (see
    /// `dcf::parser`).
    pub fn string_literal_span(&self, start: usize, end: usize) -> Token {
        let mut end = end.min(self.bytes.len());
        while end > start && matches!(self.bytes[end - 1], b' ' | b'\t' | b'\r' | b'\n') {
            end -= 1;
        }
        Token::new(TokenTag::StringLiteral, Span::new(start, end))
    }

    pub fn text(&self, span: Span) -> &'a str {
        // DCF input is required to be UTF-8 (see spec); tolerate stray
        // invalid sequences rather than panicking on malformed input.
        std::str::from_utf8(&self.bytes[span.as_range()]).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_all(input: &str) -> Vec<TokenTag> {
        let mut lexer = Lexer::new(input.as_bytes());
        let mut tags = Vec::new();
        loop {
            let tok = lexer.next_token();
            let done = tok.tag == TokenTag::Eof;
            tags.push(tok.tag);
            if done {
                break;
            }
        }
        tags
    }

    #[test]
    fn skips_bom() {
        let mut lexer = Lexer::new(b"\xEF\xBB\xBFPackage");
        let tok = lexer.next_token();
        assert_eq!(tok.tag, TokenTag::Identifier);
        assert_eq!(lexer.text(tok.span), "Package");
    }

    #[test]
    fn simple_field_tokenizes_key_colon_value_end() {
        use TokenTag::*;
        let tags = lex_all("Package: A3\n\n");
        assert_eq!(
            tags,
            vec![Identifier, Colon, Identifier, EndField, EndStanza, Eof]
        );
    }

    #[test]
    fn comment_at_column_zero_is_discarded() {
        use TokenTag::*;
        let tags = lex_all("# a comment\nPackage: A3\n\n");
        assert_eq!(
            tags,
            vec![Identifier, Colon, Identifier, EndField, EndStanza, Eof]
        );
    }

    #[test]
    fn hash_not_at_column_zero_is_literal() {
        let mut lexer = Lexer::new(b"License: GPL-3 # not stripped\n");
        let _package = lexer.next_token(); // License
        let _colon = lexer.next_token();
        let tok = lexer.next_token();
        assert_eq!(lexer.text(tok.span), "GPL-3");
        // the '#' run lexes as further atoms rather than being dropped
        let hash_tok = lexer.next_token();
        assert_eq!(lexer.text(hash_tok.span), "#");
    }

    #[test]
    fn continuation_line_does_not_end_field() {
        use TokenTag::*;
        let tags = lex_all("Suggests: foo (> 0.1),\n    bar\n\n");
        assert_eq!(
            tags,
            vec![
                Identifier, // Suggests
                Colon,
                Identifier, // foo
                OpenRound,
                GreaterThan,
                Identifier, // 0.1
                CloseRound,
                Comma,
                Identifier, // bar
                EndField,
                EndStanza,
                Eof,
            ]
        );
    }

    #[test]
    fn blank_line_emits_end_stanza_after_end_field() {
        use TokenTag::*;
        let tags = lex_all("Package: A\n\nPackage: B\n");
        assert_eq!(
            tags,
            vec![
                Identifier, Colon, Identifier, EndField, EndStanza, Identifier, Colon,
                Identifier, EndField, Eof
            ]
        );
    }

    #[test]
    fn operators_tokenize_distinctly() {
        use TokenTag::*;
        let tags = lex_all("Depends: R (>= 3.6), x (<= 2), y (== 1), z (< 1), w (> 1)\n\n");
        assert!(tags.contains(&GreaterThanEqual));
        assert!(tags.contains(&LessThanEqual));
        assert!(tags.contains(&Equal));
        assert!(tags.contains(&LessThan));
        assert!(tags.contains(&GreaterThan));
    }

    #[test]
    fn tolerant_identifier_keeps_slash_and_at() {
        let mut lexer = Lexer::new(b"Config/testthat/edition: 3\n");
        let tok = lexer.next_token();
        assert_eq!(lexer.text(tok.span), "Config/testthat/edition");
        let mut lexer2 = Lexer::new(b"Authors@R: c(1)\n");
        let tok2 = lexer2.next_token();
        assert_eq!(lexer2.text(tok2.span), "Authors@R");
    }

    #[test]
    fn plus_is_its_own_token() {
        use TokenTag::*;
        let tags = lex_all("License: MIT + file LICENSE\n\n");
        assert_eq!(
            tags,
            vec![
                Identifier, Colon, Identifier, Plus, Identifier, Identifier, EndField,
                EndStanza, Eof
            ]
        );
    }

    #[test]
    fn always_terminates_with_eof() {
        let tags = lex_all("");
        assert_eq!(tags, vec![TokenTag::Eof]);
    }

    #[test]
    fn recognized_escape_is_folded_into_the_atom() {
        let mut lexer = Lexer::new(b"License: MIT\\n2\n");
        let _license = lexer.next_token();
        let _colon = lexer.next_token();
        let first = lexer.next_token();
        assert_eq!(first.tag, TokenTag::Identifier);
        assert_eq!(lexer.text(first.span), "MIT");
        let escape = lexer.next_token();
        assert_eq!(escape.tag, TokenTag::Identifier);
        assert_eq!(lexer.text(escape.span), "\\n");
        let rest = lexer.next_token();
        assert_eq!(lexer.text(rest.span), "2");
    }

    #[test]
    fn unrecognized_escape_is_invalid() {
        let mut lexer = Lexer::new(b"License: MIT\\q\n");
        let _license = lexer.next_token();
        let _colon = lexer.next_token();
        let _mit = lexer.next_token();
        let tok = lexer.next_token();
        assert_eq!(tok.tag, TokenTag::Invalid);
        assert_eq!(lexer.text(tok.span), "\\q");
    }

    #[test]
    fn trailing_backslash_at_eof_is_invalid() {
        let mut lexer = Lexer::new(b"License: MIT\\");
        let _license = lexer.next_token();
        let _colon = lexer.next_token();
        let _mit = lexer.next_token();
        let tok = lexer.next_token();
        assert_eq!(tok.tag, TokenTag::Invalid);
        assert_eq!(lexer.text(tok.span), "\\");
    }
}
