use serde::Serialize;

pub mod source_map;
pub use source_map::SourceMap;

// ---- Span infrastructure ----

/// Byte range within source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub const UNKNOWN: Span = Span { start: 0, end: 0 };

    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

impl From<std::ops::Range<usize>> for Span {
    fn from(range: std::ops::Range<usize>) -> Self {
        Span { start: range.start, end: range.end }
    }
}

/// Wraps a node with its source span. Transparent to serde (serializes as inner node only).
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Spanned { node, span }
    }
}

impl<T> std::ops::Deref for Spanned<T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.node
    }
}

impl<T: Serialize> Serialize for Spanned<T> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.node.serialize(serializer)
    }
}

// ---- Syntax tree ----

/// A syntax tree node with its source location.
pub type Node = Spanned<SyntaxNode>;

/// Everything the reader produces. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "UPPERCASE")]
pub enum SyntaxNode {
    /// `42`
    Integer(i64),
    /// `let`, `+`, `my-var`
    Symbol(String),
    /// `"hello"`
    String(String),
    /// `(head arg ...)`
    #[serde(rename = "SEQ")]
    Sequence(Vec<Node>),
    /// `[a b c]`
    #[serde(rename = "VEC")]
    Vector(Vec<Node>),
}

impl SyntaxNode {
    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            SyntaxNode::Symbol(name) => Some(name),
            _ => None,
        }
    }

    /// Short human name used in error messages.
    pub fn describe(&self) -> &'static str {
        match self {
            SyntaxNode::Integer(_) => "integer",
            SyntaxNode::Symbol(_) => "symbol",
            SyntaxNode::String(_) => "string",
            SyntaxNode::Sequence(_) => "sequence",
            SyntaxNode::Vector(_) => "vector",
        }
    }
}

impl std::fmt::Display for SyntaxNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn children(f: &mut std::fmt::Formatter<'_>, items: &[Node]) -> std::fmt::Result {
            for (i, item) in items.iter().enumerate() {
                if i > 0 { write!(f, " ")?; }
                write!(f, "{}", item.node)?;
            }
            Ok(())
        }
        match self {
            SyntaxNode::Integer(n) => write!(f, "{n}"),
            SyntaxNode::Symbol(s) => write!(f, "{s}"),
            SyntaxNode::String(s) => write!(f, "\"{s}\""),
            SyntaxNode::Sequence(items) => {
                write!(f, "(")?;
                children(f, items)?;
                write!(f, ")")
            }
            SyntaxNode::Vector(items) => {
                write!(f, "[")?;
                children(f, items)?;
                write!(f, "]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare(node: SyntaxNode) -> Node {
        Spanned::new(node, Span::UNKNOWN)
    }

    fn sym(name: &str) -> Node {
        bare(SyntaxNode::Symbol(name.to_string()))
    }

    #[test]
    fn span_merge() {
        let a = Span { start: 4, end: 7 };
        let b = Span { start: 1, end: 5 };
        assert_eq!(a.merge(b), Span { start: 1, end: 7 });
    }

    #[test]
    fn display_round_trips_shape() {
        let node = SyntaxNode::Sequence(vec![
            sym("let"),
            sym("x"),
            bare(SyntaxNode::Vector(vec![bare(SyntaxNode::Integer(1)), bare(SyntaxNode::String("a".to_string()))])),
        ]);
        assert_eq!(node.to_string(), r#"(let x [1 "a"])"#);
    }

    #[test]
    fn serializes_without_spans() {
        let node = Spanned::new(SyntaxNode::Sequence(vec![sym("print"), sym("x")]), Span { start: 0, end: 9 });
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["type"], "SEQ");
        assert_eq!(json["value"][0]["type"], "SYMBOL");
        assert_eq!(json["value"][0]["value"], "print");
        assert!(json.get("span").is_none());
    }
}
