pub mod ansi;
pub mod json;
pub mod registry;

use crate::ast::Span;

#[derive(Debug, Clone)]
pub struct Label {
    pub span: Span,
    pub message: String,
    pub is_primary: bool,
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub message: String,
    pub labels: Vec<Label>,
    pub notes: Vec<String>,
    pub suggestion: Option<String>,
    pub source: Option<String>,
    /// Stable registry code, e.g. `ELC-C006`.
    pub code: Option<&'static str>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            labels: Vec::new(),
            notes: Vec::new(),
            suggestion: None,
            source: None,
            code: None,
        }
    }

    pub fn with_span(mut self, span: Span, label: impl Into<String>) -> Self {
        self.labels.push(Label { span, message: label.into(), is_primary: true });
        self
    }

    pub fn with_secondary_span(mut self, span: Span, label: impl Into<String>) -> Self {
        self.labels.push(Label { span, message: label.into(), is_primary: false });
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_code(mut self, code: &'static str) -> Self {
        self.code = Some(code);
        self
    }
}

// ---- From impls for the pipeline's error types ----

impl From<&crate::lexer::LexError> for Diagnostic {
    fn from(e: &crate::lexer::LexError) -> Self {
        let span = Span {
            start: e.position,
            end: e.position + e.snippet.len().max(1),
        };
        let mut d = Diagnostic::error(format!("unexpected input '{}'", e.snippet))
            .with_span(span, "here")
            .with_code("ELC-L001");
        if !e.suggestion.is_empty() {
            d = d.with_suggestion(e.suggestion.clone());
        }
        d
    }
}

impl From<&crate::parser::ParseError> for Diagnostic {
    fn from(e: &crate::parser::ParseError) -> Self {
        Diagnostic::error(&e.message).with_span(e.span, "here").with_code(e.code)
    }
}

impl From<&crate::compiler::CompileError> for Diagnostic {
    fn from(e: &crate::compiler::CompileError) -> Self {
        use crate::compiler::CompileError;

        let label = match e {
            CompileError::Malformed { .. } => "in this form",
            CompileError::InvalidTarget { .. } => "not a symbol",
            CompileError::UnsupportedForm { .. } => "cannot be compiled",
            CompileError::UndefinedLabel { .. } => "jumps here",
            CompileError::DuplicateLabel { .. } => "defined again here",
            CompileError::UndefinedFunction { .. } => "called here",
            CompileError::ArityMismatch { .. } => "called here",
        };
        let mut d = Diagnostic::error(e.to_string()).with_code(e.code());
        if e.span() != Span::UNKNOWN {
            d = d.with_span(e.span(), label);
        }
        match e {
            CompileError::UndefinedFunction { name, .. } => {
                d.with_suggestion(format!("define it with (defun {name} (...) ...)"))
            }
            CompileError::UnsupportedForm { .. } => {
                d.with_note("a list must start with a symbol naming a form or function; vectors cannot be evaluated")
            }
            CompileError::DuplicateLabel { first, .. } => {
                if *first != Span::UNKNOWN {
                    d = d.with_secondary_span(*first, "first defined here");
                }
                d.with_note("function names share one namespace with 'main' and the generated else_N/end_N labels")
            }
            CompileError::ArityMismatch { name, expected, .. } => {
                d.with_note(format!("'{name}' is defined with {expected} parameter(s)"))
            }
            _ => d,
        }
    }
}

impl From<&crate::bytecode::AsmError> for Diagnostic {
    fn from(e: &crate::bytecode::AsmError) -> Self {
        Diagnostic::error(&e.message)
            .with_note(format!("on line {} of the listing", e.line))
            .with_code("ELC-A001")
    }
}

impl From<&crate::vm::Trap> for Diagnostic {
    fn from(e: &crate::vm::Trap) -> Self {
        let mut d = Diagnostic::error(e.fault.to_string()).with_code(fault_code(&e.fault));
        if e.span != Span::UNKNOWN {
            d = d.with_span(e.span, "fault raised here");
        }
        if e.instruction.is_empty() {
            d = d.with_note(format!("at instruction {}", e.pc));
        } else {
            d = d.with_note(format!("at instruction {}: {}", e.pc, e.instruction));
        }
        if !e.output.is_empty() {
            d = d.with_note(format!("{} line(s) printed before the fault", e.output.len()));
        }
        d
    }
}

fn fault_code(fault: &crate::vm::Fault) -> &'static str {
    use crate::vm::Fault;

    match fault {
        Fault::MissingEntryPoint => "ELC-R001",
        Fault::UndefinedFunction { .. } => "ELC-R002",
        Fault::UndefinedLabel { .. } => "ELC-R003",
        Fault::UndefinedVariable { .. } => "ELC-R004",
        Fault::InvalidReturn => "ELC-R005",
        Fault::UnknownInstruction { .. } => "ELC-R006",
        Fault::DivisionByZero => "ELC-R007",
        Fault::StackUnderflow => "ELC-R008",
        Fault::TypeMismatch { .. } => "ELC-R009",
        Fault::UndefinedConstant { .. } => "ELC-R010",
        Fault::BadOperand { .. } => "ELC-R011",
        Fault::MissingHalt => "ELC-R012",
    }
}

impl From<&crate::Error> for Diagnostic {
    fn from(e: &crate::Error) -> Self {
        match e {
            crate::Error::Lex(e) => e.into(),
            crate::Error::Parse(e) => e.into(),
            crate::Error::Compile(e) => e.into(),
            crate::Error::Asm(e) => e.into(),
            crate::Error::Run(e) => e.into(),
        }
    }
}
