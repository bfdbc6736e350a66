use serde::Serialize;

use super::Diagnostic;
use crate::ast::SourceMap;

/// Wire shape of one diagnostic; optional keys are left out rather than `null`.
#[derive(Serialize)]
struct JsonDiagnostic<'a> {
    severity: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
    message: &'a str,
    labels: Vec<JsonLabel<'a>>,
    notes: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    suggestion: Option<&'a str>,
}

#[derive(Serialize)]
struct JsonLabel<'a> {
    start: usize,
    end: usize,
    message: &'a str,
    primary: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    col: Option<usize>,
}

/// One line of JSON, for `--json-errors`.
pub fn render(d: &Diagnostic) -> String {
    let map = d.source.as_deref().map(SourceMap::new);
    let labels = d
        .labels
        .iter()
        .map(|l| {
            let position = map.as_ref().map(|m| m.lookup(l.span.start));
            JsonLabel {
                start: l.span.start,
                end: l.span.end,
                message: &l.message,
                primary: l.is_primary,
                line: position.map(|(line, _)| line),
                col: position.map(|(_, col)| col),
            }
        })
        .collect();

    let out = JsonDiagnostic {
        severity: "error",
        code: d.code,
        message: &d.message,
        labels,
        notes: &d.notes,
        suggestion: d.suggestion.as_deref(),
    };

    serde_json::to_string(&out)
        .unwrap_or_else(|_| r#"{"severity":"error","message":"internal error serializing diagnostic"}"#.to_string())
}
