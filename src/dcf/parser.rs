//! Builds a flat AST from the token stream.
//!
//! Value parsing follows a commit/abandon discipline: the parser tentatively
//! reads a comma-separated list of `name [(op version)]` items, but the
//! moment a token shows up that doesn't fit that shape, it throws away
//! whatever `NameAndVersion` nodes it had tentatively pushed for the current
//! field and instead re-slices the *original bytes* from the field's first
//! token to wherever the field ends, producing one `StringValue` node. This
//! is what lets `License: MIT + file LICENSE` and `Depends: x, y (>= 1.0)`
//! share one grammar without the caller having to say in advance which kind
//! of field it's looking at.

use crate::error::{DcfError, DcfErrorKind};
use crate::interner::{InternedStr, Interner};
use crate::version::{Operator, Version, VersionConstraint};

use super::lexer::Lexer;
use super::token::{Token, TokenTag};

/// One node of the flat DCF AST. The tree shape is:
/// `Root, (Stanza, (Field, (NameAndVersion|StringValue)*, FieldEnd)*, StanzaEnd)*, Eof`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Node {
    Root,
    Stanza,
    Field { key: InternedStr },
    NameAndVersion { name: InternedStr, constraint: VersionConstraint },
    StringValue { value: InternedStr },
    FieldEnd,
    StanzaEnd,
    Eof,
}

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    peeked: Option<Token>,
    interner: Interner,
}

impl<'a> Parser<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            lexer: Lexer::new(bytes),
            peeked: None,
            interner: Interner::new(),
        }
    }

    /// Parses the whole buffer, returning the flat AST and the interner it
    /// was built against. On success, the interner is "detached" — the
    /// caller (typically [`crate::Repository::read`]) takes full ownership.
    pub fn parse(bytes: &'a [u8]) -> Result<(Vec<Node>, Interner), DcfError> {
        let mut parser = Self::new(bytes);
        let nodes = parser.parse_all()?;
        Ok((nodes, parser.interner))
    }

    fn peek(&mut self) -> Token {
        if self.peeked.is_none() {
            self.peeked = Some(self.lexer.next_token());
        }
        self.peeked.unwrap()
    }

    fn bump(&mut self) -> Token {
        match self.peeked.take() {
            Some(t) => t,
            None => self.lexer.next_token(),
        }
    }

    fn text(&self, tok: Token) -> &'a str {
        self.lexer.text(tok.span)
    }

    fn parse_all(&mut self) -> Result<Vec<Node>, DcfError> {
        let mut nodes = Vec::new();
        nodes.push(Node::Root);

        loop {
            // Blank lines (stray EndField/EndStanza) at file start or
            // between stanzas are absorbed rather than starting an
            // empty stanza.
            while matches!(self.peek().tag, TokenTag::EndField | TokenTag::EndStanza) {
                self.bump();
            }

            if self.peek().tag == TokenTag::Eof {
                break;
            }

            nodes.push(Node::Stanza);
            self.parse_stanza_body(&mut nodes)?;
            nodes.push(Node::StanzaEnd);
        }

        nodes.push(Node::Eof);
        Ok(nodes)
    }

    fn parse_stanza_body(&mut self, nodes: &mut Vec<Node>) -> Result<(), DcfError> {
        loop {
            let key_tok = self.peek();
            match key_tok.tag {
                TokenTag::Eof | TokenTag::EndStanza => return Ok(()),
                TokenTag::EndField => {
                    // a stray blank line inside a stanza; tolerate it.
                    self.bump();
                    continue;
                }
                TokenTag::Identifier => {
                    self.bump();
                    let key_text = self.text(key_tok);
                    let colon = self.bump();
                    if colon.tag == TokenTag::Eof {
                        return Err(DcfError::new(colon.span.into(), DcfErrorKind::UnexpectedEof));
                    }
                    if colon.tag != TokenTag::Colon {
                        return Err(DcfError::new(colon.span.into(), DcfErrorKind::ExpectedColon(colon.span.into())));
                    }
                    let key = self.interner.append(key_text);
                    nodes.push(Node::Field { key });
                    let marker = nodes.len();
                    self.parse_field_value(nodes, marker)?;
                    nodes.push(Node::FieldEnd);
                }
                _ => {
                    return Err(DcfError::new(
                        key_tok.span.into(),
                        DcfErrorKind::ExpectedIdentifier(key_tok.span.into()),
                    ));
                }
            }

            if self.peek().tag == TokenTag::EndStanza {
                self.bump();
                return Ok(());
            }
            if self.peek().tag == TokenTag::Eof {
                return Ok(());
            }
        }
    }

    /// Parses one field's value, pushing `NameAndVersion` nodes (or a single
    /// `StringValue` node on abandon) to `nodes`. Consumes the terminating
    /// `EndField` if present; leaves `Eof` unconsumed for the caller to see.
    fn parse_field_value(&mut self, nodes: &mut Vec<Node>, marker: usize) -> Result<(), DcfError> {
        let first = self.peek();
        if matches!(first.tag, TokenTag::EndField | TokenTag::Eof) {
            if first.tag == TokenTag::EndField {
                self.bump();
            }
            return Ok(());
        }

        let value_start = first.span.start as usize;

        loop {
            let tok = self.peek();
            if tok.tag != TokenTag::Identifier {
                return self.abandon(value_start, nodes, marker);
            }
            self.bump();
            let name = self.interner.append(self.text(tok));
            let mut constraint = VersionConstraint::default();

            if self.peek().tag == TokenTag::OpenRound {
                self.bump();
                let op_tok = self.bump();
                let operator = match op_tok.tag {
                    TokenTag::LessThan => Operator::Lt,
                    TokenTag::LessThanEqual => Operator::Le,
                    TokenTag::Equal => Operator::Eq,
                    TokenTag::GreaterThanEqual => Operator::Ge,
                    TokenTag::GreaterThan => Operator::Gt,
                    TokenTag::Eof => {
                        return Err(DcfError::new(op_tok.span.into(), DcfErrorKind::UnexpectedEof));
                    }
                    _ => {
                        return Err(DcfError::new(
                            op_tok.span.into(),
                            DcfErrorKind::ExpectedOperator(op_tok.span.into()),
                        ));
                    }
                };

                let ver_start = self.peek().span.start as usize;
                loop {
                    let t = self.peek();
                    match t.tag {
                        TokenTag::CloseRound => break,
                        TokenTag::Eof => {
                            return Err(DcfError::new(t.span.into(), DcfErrorKind::UnexpectedEof));
                        }
                        TokenTag::EndField | TokenTag::EndStanza => {
                            return Err(DcfError::new(
                                t.span.into(),
                                DcfErrorKind::ExpectedCloseParen(t.span.into()),
                            ));
                        }
                        _ => {
                            self.bump();
                        }
                    }
                }
                let ver_end = self.peek().span.start as usize;
                self.bump(); // consume ')'

                let ver_text = self.lexer.text(super::token::Span::new(ver_start, ver_end)).trim();
                if ver_text.is_empty() {
                    return Err(DcfError::new(
                        op_tok.span.into(),
                        DcfErrorKind::ExpectedVersion(op_tok.span.into()),
                    ));
                }
                let version = Version::parse(ver_text).map_err(|_| {
                    DcfError::new(op_tok.span.into(), DcfErrorKind::ExpectedVersion(op_tok.span.into()))
                })?;
                constraint = VersionConstraint::new(operator, version);
            }

            nodes.push(Node::NameAndVersion { name, constraint });

            match self.peek().tag {
                TokenTag::Comma => {
                    self.bump();
                    continue;
                }
                TokenTag::EndField => {
                    self.bump();
                    return Ok(());
                }
                TokenTag::Eof => return Ok(()),
                _ => return self.abandon(value_start, nodes, marker),
            }
        }
    }

    fn abandon(
        &mut self,
        value_start: usize,
        nodes: &mut Vec<Node>,
        marker: usize,
    ) -> Result<(), DcfError> {
        nodes.truncate(marker);
        let mut value_end = value_start;
        loop {
            let t = self.peek();
            match t.tag {
                TokenTag::EndField => {
                    self.bump();
                    break;
                }
                TokenTag::Eof => break,
                _ => {
                    value_end = t.span.end as usize;
                    self.bump();
                }
            }
        }
        let tok = self.lexer.string_literal_span(value_start, value_end);
        let handle = self.interner.append(self.lexer.text(tok.span));
        nodes.push(Node::StringValue { value: handle });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> (Vec<Node>, Interner) {
        Parser::parse(src.as_bytes()).unwrap()
    }

    #[test]
    fn minimal_stanza() {
        let (nodes, interner) = parse("Package: A3\nVersion: 1.0.0\n");
        assert_eq!(nodes[0], Node::Root);
        assert_eq!(nodes[1], Node::Stanza);
        match &nodes[2] {
            Node::Field { key } => assert_eq!(interner.resolve(*key), "Package"),
            n => panic!("expected Field, got {n:?}"),
        }
    }

    #[test]
    fn dependency_list_parses_two_nvcs() {
        let (nodes, interner) = parse("Package: child\nDepends: parent (>= 1.0), R (>= 3.6)\n");
        let nvcs: Vec<_> = nodes
            .iter()
            .filter_map(|n| match n {
                Node::NameAndVersion { name, constraint } => {
                    Some((interner.resolve(*name).to_string(), *constraint))
                }
                _ => None,
            })
            .collect();
        assert_eq!(nvcs.len(), 2);
        assert_eq!(nvcs[0].0, "parent");
        assert_eq!(nvcs[0].1.operator, Operator::Ge);
        assert_eq!(nvcs[1].0, "R");
    }

    #[test]
    fn abandon_on_non_list_value_yields_string_value() {
        let (nodes, interner) = parse("License: MIT + file LICENSE\n");
        let strings: Vec<_> = nodes
            .iter()
            .filter_map(|n| match n {
                Node::StringValue { value } => Some(interner.resolve(*value)),
                _ => None,
            })
            .collect();
        assert_eq!(strings, vec!["MIT + file LICENSE"]);
        // and no spurious NameAndVersion nodes leaked through
        assert!(!nodes.iter().any(|n| matches!(n, Node::NameAndVersion { .. })));
    }

    #[test]
    fn continuation_is_merged_into_value() {
        let (nodes, interner) = parse("Suggests: foo (> 0.1),\n    bar\n");
        let nvcs: Vec<_> = nodes
            .iter()
            .filter_map(|n| match n {
                Node::NameAndVersion { name, constraint } => {
                    Some((interner.resolve(*name).to_string(), *constraint))
                }
                _ => None,
            })
            .collect();
        assert_eq!(nvcs.len(), 2);
        assert_eq!(nvcs[1].0, "bar");
        assert_eq!(nvcs[1].1, VersionConstraint::default());
    }

    #[test]
    fn blank_lines_at_start_and_between_stanzas_are_absorbed() {
        let (nodes, _interner) = parse("\n\nPackage: A\nVersion: 1.0\n\nPackage: B\nVersion: 2.0\n");
        let stanza_count = nodes.iter().filter(|n| **n == Node::Stanza).count();
        assert_eq!(stanza_count, 2);
    }

    #[test]
    fn missing_colon_is_reported() {
        let err = Parser::parse(b"Package A3\n").unwrap_err();
        assert!(matches!(err.source, DcfErrorKind::ExpectedColon(_)));
    }

    #[test]
    fn unterminated_paren_is_reported() {
        let err = Parser::parse(b"Depends: foo (>= 1.0\n").unwrap_err();
        assert!(matches!(err.source, DcfErrorKind::ExpectedCloseParen(_)));
    }

    #[test]
    fn truncated_before_colon_is_unexpected_eof() {
        let err = Parser::parse(b"Package").unwrap_err();
        assert!(matches!(err.source, DcfErrorKind::UnexpectedEof));
    }

    #[test]
    fn truncated_before_operator_is_unexpected_eof() {
        let err = Parser::parse(b"Depends: foo (").unwrap_err();
        assert!(matches!(err.source, DcfErrorKind::UnexpectedEof));
    }

    #[test]
    fn truncated_inside_version_literal_is_unexpected_eof() {
        let err = Parser::parse(b"Depends: foo (>= 1.0").unwrap_err();
        assert!(matches!(err.source, DcfErrorKind::UnexpectedEof));
    }
}
