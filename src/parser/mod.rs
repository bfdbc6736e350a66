use crate::ast::*;
use crate::lexer::Token;

pub struct Parser {
    tokens: Vec<(Token, Span)>,
    pos: usize,
}

#[derive(Debug, thiserror::Error)]
#[error("Parse error at token {position}: {message}")]
pub struct ParseError {
    pub code: &'static str,
    pub position: usize,
    pub span: Span,
    pub message: String,
}

type Result<T> = std::result::Result<T, ParseError>;

impl Parser {
    pub fn new(tokens: Vec<(Token, Span)>) -> Self {
        Parser { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn peek_span(&self) -> Span {
        match self.tokens.get(self.pos) {
            Some((_, span)) => *span,
            // Point just past the last token at end of input
            None => self
                .tokens
                .last()
                .map(|(_, s)| Span { start: s.end, end: s.end })
                .unwrap_or(Span::UNKNOWN),
        }
    }

    fn advance(&mut self) -> Option<(Token, Span)> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn error(&self, code: &'static str, span: Span, message: String) -> ParseError {
        ParseError { code, position: self.pos, span, message }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    // ---- Top-level parsing ----

    pub fn parse_program(&mut self) -> Result<Vec<Node>> {
        let mut nodes = Vec::new();
        while !self.at_end() {
            nodes.push(self.parse_node()?);
        }
        Ok(nodes)
    }

    fn parse_node(&mut self) -> Result<Node> {
        let span = self.peek_span();
        let Some((token, span)) = self.advance() else {
            return Err(self.error("ELC-P004", span, "expected an expression, got EOF".into()));
        };
        match token {
            Token::LParen => self
                .parse_children(Token::RParen, span)
                .map(|(children, span)| Spanned::new(SyntaxNode::Sequence(children), span)),
            Token::LBracket => self
                .parse_children(Token::RBracket, span)
                .map(|(children, span)| Spanned::new(SyntaxNode::Vector(children), span)),
            Token::Integer(digits) => match digits.parse::<i64>() {
                Ok(n) => Ok(Spanned::new(SyntaxNode::Integer(n), span)),
                Err(_) => Err(self.error(
                    "ELC-P003",
                    span,
                    format!("integer literal {digits} does not fit in 64 bits"),
                )),
            },
            Token::Str(s) => Ok(Spanned::new(SyntaxNode::String(s), span)),
            Token::Symbol(s) => Ok(Spanned::new(SyntaxNode::Symbol(s), span)),
            Token::RParen | Token::RBracket => Err(self.error(
                "ELC-P001",
                span,
                format!("unexpected {} with no matching opener", token.describe()),
            )),
        }
    }

    /// Parse children up to `close`; returns them with the span covering both delimiters.
    fn parse_children(&mut self, close: Token, open_span: Span) -> Result<(Vec<Node>, Span)> {
        let mut children = Vec::new();
        loop {
            match self.peek() {
                Some(tok) if *tok == close => {
                    let close_span = self.peek_span();
                    self.advance();
                    return Ok((children, open_span.merge(close_span)));
                }
                Some(tok @ (Token::RParen | Token::RBracket)) => {
                    let message = format!("expected {}, got {}", close.describe(), tok.describe());
                    return Err(self.error("ELC-P002", self.peek_span(), message));
                }
                Some(_) => children.push(self.parse_node()?),
                None => {
                    return Err(self.error(
                        "ELC-P004",
                        open_span,
                        format!("unterminated form: missing {}", close.describe()),
                    ));
                }
            }
        }
    }
}

/// Parse a token stream into top-level expressions.
pub fn parse(tokens: Vec<(Token, Span)>) -> Result<Vec<Node>> {
    Parser::new(tokens).parse_program()
}

/// Lex and parse in one step.
pub fn parse_source(source: &str) -> std::result::Result<Vec<Node>, crate::Error> {
    let tokens = crate::lexer::lex(source)?;
    let token_spans = tokens.into_iter().map(|(t, r)| (t, Span::from(r))).collect();
    Ok(parse(token_spans)?)
}
