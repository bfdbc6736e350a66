use super::Span;

/// Line index over a source file; turns byte offsets into 1-based
/// `line:col` positions for diagnostics.
pub struct SourceMap {
    line_starts: Vec<usize>,
}

impl SourceMap {
    pub fn new(source: &str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        SourceMap { line_starts }
    }

    /// Returns (line, col), both 1-based.
    pub fn lookup(&self, offset: usize) -> (usize, usize) {
        let line = self.line_starts.partition_point(|&start| start <= offset).saturating_sub(1);
        (line + 1, offset - self.line_starts[line] + 1)
    }

    /// `line:col` of the start of `span`.
    pub fn position(&self, span: Span) -> String {
        let (line, col) = self.lookup(span.start);
        format!("{line}:{col}")
    }

    /// Text of the given 1-based line, without its line terminator.
    pub fn line_text<'a>(&self, source: &'a str, line: usize) -> &'a str {
        let Some(&start) = line.checked_sub(1).and_then(|i| self.line_starts.get(i)) else {
            return "";
        };
        let end = self.line_starts.get(line).copied().unwrap_or(source.len());
        source[start..end].trim_end_matches('\n').trim_end_matches('\r')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_line() {
        let src = "(let x 50)";
        let sm = SourceMap::new(src);
        assert_eq!(sm.lookup(0), (1, 1));
        assert_eq!(sm.lookup(5), (1, 6));
        assert_eq!(sm.lookup(10), (1, 11));
    }

    #[test]
    fn multi_line() {
        let src = "(defun f (a)\n  (* a 2))\n(print (f 4))";
        let sm = SourceMap::new(src);
        assert_eq!(sm.lookup(0), (1, 1));
        assert_eq!(sm.lookup(12), (1, 13)); // newline after the parameter list
        assert_eq!(sm.lookup(15), (2, 3));  // '(' of the body
        assert_eq!(sm.lookup(24), (3, 1));
    }

    #[test]
    fn line_text_single() {
        let src = "(print (+ 1 2))";
        let sm = SourceMap::new(src);
        assert_eq!(sm.line_text(src, 1), "(print (+ 1 2))");
    }

    #[test]
    fn line_text_multi() {
        let src = "(let a 1)\n(let b 2)\n(print a)";
        let sm = SourceMap::new(src);
        assert_eq!(sm.line_text(src, 1), "(let a 1)");
        assert_eq!(sm.line_text(src, 2), "(let b 2)");
        assert_eq!(sm.line_text(src, 3), "(print a)");
    }

    #[test]
    fn line_text_out_of_bounds() {
        let src = "(print 1)";
        let sm = SourceMap::new(src);
        assert_eq!(sm.line_text(src, 0), "");
        assert_eq!(sm.line_text(src, 99), "");
    }

    #[test]
    fn position_of_span() {
        let src = "(let a 1)\n(print b)";
        let sm = SourceMap::new(src);
        assert_eq!(sm.position(Span { start: 17, end: 18 }), "2:8");
    }

    #[test]
    fn empty_source() {
        let src = "";
        let sm = SourceMap::new(src);
        assert_eq!(sm.lookup(0), (1, 1));
        assert_eq!(sm.line_text(src, 1), "");
    }

    #[test]
    fn trailing_newline() {
        let src = "(print 1)\r\n";
        let sm = SourceMap::new(src);
        assert_eq!(sm.line_text(src, 1), "(print 1)");
        assert_eq!(sm.line_text(src, 2), "");
    }

    #[test]
    fn offset_at_newline_boundary() {
        let src = "()\n[]\n..";
        let sm = SourceMap::new(src);
        // offset 2 = '\n', belongs to line 1
        assert_eq!(sm.lookup(2), (1, 3));
        // offset 3 = '[', line 2 col 1
        assert_eq!(sm.lookup(3), (2, 1));
        // offset 5 = '\n', belongs to line 2
        assert_eq!(sm.lookup(5), (2, 3));
        // offset 6 = '.', line 3 col 1
        assert_eq!(sm.lookup(6), (3, 1));
    }
}
