use std::fmt::Write;

use super::{Diagnostic, Label};
use crate::ast::SourceMap;

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const RED: &str = "\x1b[1;31m";
const BLUE: &str = "\x1b[1;34m";
const DIM: &str = "\x1b[2m";

/// Human-readable rendering with a source excerpt:
///
/// ```text
/// error[ELC-C006]: call to undefined function 'sq'
///   --> 2:8
///   |
/// 2 | (print (sq 4))
///   |        ^^^^^^ called here
///   |
///   = help: define it with (defun sq (...) ...)
/// ```
pub struct AnsiRenderer {
    pub use_color: bool,
}

impl AnsiRenderer {
    fn paint(&self, style: &str, text: &str) -> String {
        if self.use_color { format!("{style}{text}{RESET}") } else { text.to_string() }
    }

    pub fn render(&self, d: &Diagnostic) -> String {
        let mut out = String::new();

        let heading = match d.code {
            Some(code) => format!("error[{code}]"),
            None => "error".to_string(),
        };
        let _ = writeln!(out, "{}: {}", self.paint(RED, &heading), self.paint(BOLD, &d.message));

        let map = d.source.as_deref().map(SourceMap::new);
        let primary = d.labels.iter().find(|l| l.is_primary);
        if let (Some(label), Some(map), Some(source)) = (primary, &map, d.source.as_deref()) {
            self.snippet(&mut out, label, map, source);
        }

        for label in d.labels.iter().filter(|l| !l.is_primary && !l.message.is_empty()) {
            let at = match &map {
                Some(map) => format!(" ({})", map.position(label.span)),
                None => String::new(),
            };
            let _ = writeln!(out, "  {} {}{at}", self.paint(DIM, "="), label.message);
        }
        for note in &d.notes {
            let _ = writeln!(out, "  {} note: {note}", self.paint(DIM, "="));
        }
        if let Some(suggestion) = &d.suggestion {
            let _ = writeln!(out, "  {} help: {suggestion}", self.paint(DIM, "="));
        }
        out
    }

    fn snippet(&self, out: &mut String, label: &Label, map: &SourceMap, source: &str) {
        let (line, col) = map.lookup(label.span.start);
        let text = map.line_text(source, line);
        let gutter = line.to_string().len();
        let pad = " ".repeat(gutter);
        let bar = self.paint(BLUE, "|");

        // `col` is a byte column; carets are placed by character. They stop
        // at the end of the line for spans covering several lines.
        let before = text.get(..col - 1).unwrap_or(text);
        let under = text.get(col - 1..).unwrap_or("");
        let span_len = label.span.end.saturating_sub(label.span.start);
        let width = under
            .char_indices()
            .take_while(|(i, _)| *i < span_len)
            .count()
            .max(1);
        let carets = self.paint(RED, &"^".repeat(width));

        let _ = writeln!(out, "{pad}{} {line}:{col}", self.paint(BLUE, "-->"));
        let _ = writeln!(out, "{pad} {bar}");
        let _ = writeln!(out, "{} {bar} {text}", self.paint(BLUE, &line.to_string()));
        let indent = " ".repeat(before.chars().count());
        if label.message.is_empty() {
            let _ = writeln!(out, "{pad} {bar} {indent}{carets}");
        } else {
            let _ = writeln!(out, "{pad} {bar} {indent}{carets} {}", self.paint(RED, &label.message));
        }
        let _ = writeln!(out, "{pad} {bar}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Span;

    const SOURCE: &str = "(defun sq (n) (* n n))\n(print (sq 4))";

    fn plain() -> AnsiRenderer {
        AnsiRenderer { use_color: false }
    }

    fn undefined_call() -> Diagnostic {
        Diagnostic::error("call to undefined function 'sq'")
            .with_code("ELC-C006")
            .with_span(Span { start: 30, end: 36 }, "called here")
            .with_source(SOURCE)
            .with_suggestion("define it with (defun sq (...) ...)")
    }

    #[test]
    fn heading_carries_code() {
        let out = plain().render(&undefined_call());
        assert!(out.starts_with("error[ELC-C006]: call to undefined function 'sq'\n"), "got:\n{out}");
    }

    #[test]
    fn heading_without_code() {
        let out = plain().render(&Diagnostic::error("something bad"));
        assert_eq!(out, "error: something bad\n");
    }

    #[test]
    fn snippet_points_at_span() {
        let out = plain().render(&undefined_call());
        assert!(out.contains("--> 2:8"), "got:\n{out}");
        assert!(out.contains("2 | (print (sq 4))"), "got:\n{out}");
        assert!(out.contains("  |        ^^^^^^ called here"), "got:\n{out}");
        assert!(out.contains("= help: define it with"), "got:\n{out}");
    }

    #[test]
    fn carets_stop_at_line_end() {
        let d = Diagnostic::error("unterminated form")
            .with_span(Span { start: 0, end: 40 }, "")
            .with_source("(let x\n  (+ 1 2)");
        let out = plain().render(&d);
        assert!(out.contains("| ^^^^^^\n"), "got:\n{out}");
        assert!(!out.contains("^^^^^^^"), "got:\n{out}");
    }

    #[test]
    fn secondary_labels_and_notes() {
        let d = Diagnostic::error("label 'f' is defined more than once")
            .with_span(Span { start: 23, end: 37 }, "defined again here")
            .with_secondary_span(Span { start: 0, end: 22 }, "first defined here")
            .with_note("function names share one namespace")
            .with_source(SOURCE);
        let out = plain().render(&d);
        assert!(out.contains("= first defined here (1:1)"), "got:\n{out}");
        assert!(out.contains("= note: function names share one namespace"), "got:\n{out}");
    }

    #[test]
    fn carets_count_characters() {
        let source = "(print \"héllo\" (f 1))";
        let start = source.find("(f").unwrap();
        let d = Diagnostic::error("call to undefined function 'f'")
            .with_span(Span { start, end: start + 5 }, "called here")
            .with_source(source);
        let out = plain().render(&d);
        let caret_line = out.lines().find(|l| l.contains('^')).unwrap();
        let text: Vec<char> = out.lines().find(|l| l.starts_with("1 |")).unwrap().chars().collect();
        let caret_col = caret_line.chars().position(|c| c == '^').unwrap();
        assert_eq!(text[caret_col], '(');
        assert_eq!(text[caret_col + 1], 'f');
        assert!(caret_line.contains("^^^^^ called here"), "got:\n{out}");
        assert!(!caret_line.contains("^^^^^^"), "got:\n{out}");
    }

    #[test]
    fn no_source_no_snippet() {
        let d = Diagnostic::error("division by zero").with_span(Span { start: 0, end: 1 }, "here");
        assert!(!plain().render(&d).contains("-->"));
    }

    #[test]
    fn color_only_when_asked() {
        assert!(AnsiRenderer { use_color: true }.render(&undefined_call()).contains("\x1b["));
        assert!(!plain().render(&undefined_call()).contains("\x1b["));
    }
}
