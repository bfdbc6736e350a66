use std::collections::HashMap;

use crate::ast::Span;
use crate::bytecode::{Instruction, Opcode, Operand, Program};
use crate::compiler::CompileError;

struct VerifyContext<'a> {
    program: &'a Program,
    /// Span of the first line carrying each label.
    seen: HashMap<&'a str, Span>,
    errors: Vec<CompileError>,
}

impl<'a> VerifyContext<'a> {
    fn new(program: &'a Program) -> Self {
        VerifyContext { program, seen: HashMap::new(), errors: Vec::new() }
    }

    fn check_label(&mut self, inst: &'a Instruction) {
        let Some(label) = inst.label.as_deref() else { return };
        match self.seen.get(label) {
            Some(&first) => self.errors.push(CompileError::DuplicateLabel {
                label: label.to_string(),
                span: inst.span,
                first,
            }),
            None => {
                self.seen.insert(label, inst.span);
            }
        }
    }

    fn check_instruction(&mut self, inst: &Instruction) {
        let Some(opcode) = inst.opcode else { return };
        match (opcode, &inst.operand) {
            (Opcode::Invalid, operand) => {
                let description = match operand {
                    Some(operand) => operand.to_string(),
                    None => "an unknown form".to_string(),
                };
                self.errors.push(CompileError::UnsupportedForm { description, span: inst.span });
            }
            (Opcode::Jmp | Opcode::JmpFalse, Some(Operand::Label(label))) => {
                if self.program.label(label).is_none() {
                    self.errors.push(CompileError::UndefinedLabel { label: label.clone(), span: inst.span });
                }
            }
            // Labels that are not functions (`main`, branch targets) are not callable
            (Opcode::Call, Some(Operand::Call { name, argc })) => match self.program.arity(name) {
                None => self.errors.push(CompileError::UndefinedFunction { name: name.clone(), span: inst.span }),
                Some(expected) if expected != *argc => self.errors.push(CompileError::ArityMismatch {
                    name: name.clone(),
                    expected,
                    found: *argc,
                    span: inst.span,
                }),
                Some(_) => {}
            },
            _ => {}
        }
    }
}

/// Check a lowered program before it is handed out: no `INVALID` sentinels,
/// unique labels, every jump target defined, and every call aimed at a
/// compiled function with the right number of arguments.
/// Returns every problem found, in instruction order.
///
/// Call checks read [`Program::functions`], so an assembled listing, which
/// declares no functions, fails on any `CALL`.
pub fn verify(program: &Program) -> Result<(), Vec<CompileError>> {
    let mut ctx = VerifyContext::new(program);
    for inst in &program.code {
        ctx.check_label(inst);
        ctx.check_instruction(inst);
    }

    if ctx.errors.is_empty() {
        Ok(())
    } else {
        Err(ctx.errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lower_and_verify(code: &str) -> Result<(), Vec<CompileError>> {
        let nodes = crate::parser::parse_source(code).expect("parse failed");
        let program = crate::compiler::lower(&nodes).expect("lower failed");
        verify(&program)
    }

    #[test]
    fn valid_program() {
        assert!(lower_and_verify("(let x 1) (if (= x 1) (print x) (print 0))").is_ok());
    }

    #[test]
    fn valid_call() {
        assert!(lower_and_verify("(defun f (a) (* a a)) (print (f 3))").is_ok());
    }

    #[test]
    fn reports_every_problem_in_order() {
        let errors = lower_and_verify("(g) [1] (defun main () 0)").unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(matches!(errors[0], CompileError::UndefinedFunction { .. }));
        assert!(matches!(errors[1], CompileError::UnsupportedForm { .. }));
        assert!(matches!(errors[2], CompileError::DuplicateLabel { ref label, .. } if label == "main"));
    }

    #[test]
    fn calls_must_target_functions() {
        let errors = lower_and_verify("(if 1 (print 1)) (main) (else_0) (end_0 1)").unwrap_err();
        let names: Vec<_> = errors
            .iter()
            .map(|e| match e {
                CompileError::UndefinedFunction { name, .. } => name.as_str(),
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(names, ["main", "else_0", "end_0"]);
    }

    #[test]
    fn argument_count_must_match() {
        let errors = lower_and_verify("(defun f (a) a) (f) (f 1) (f 1 2)").unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(matches!(errors[0], CompileError::ArityMismatch { expected: 1, found: 0, .. }));
        assert!(matches!(errors[1], CompileError::ArityMismatch { expected: 1, found: 2, .. }));
    }

    #[test]
    fn duplicate_label_keeps_first_span() {
        let errors = lower_and_verify("(defun f () 1) (defun f () 2)").unwrap_err();
        assert_eq!(
            errors,
            vec![CompileError::DuplicateLabel {
                label: "f".into(),
                span: Span { start: 15, end: 29 },
                first: Span { start: 0, end: 14 },
            }]
        );
    }

    #[test]
    fn assembled_listings_declare_no_functions() {
        let program = crate::bytecode::assemble(".main:\nCALL f 0\nHALT\n.f:\nRET").unwrap();
        let errors = verify(&program).unwrap_err();
        assert!(matches!(&errors[0], CompileError::UndefinedFunction { name, .. } if name == "f"));
    }

    #[test]
    fn undefined_jump_target() {
        let program = crate::bytecode::assemble(".main:\nJMP nowhere\nHALT").unwrap();
        let errors = verify(&program).unwrap_err();
        assert_eq!(errors, vec![CompileError::UndefinedLabel { label: "nowhere".into(), span: crate::ast::Span::UNKNOWN }]);
    }

    #[test]
    fn assembled_invalid_is_reported() {
        let program = crate::bytecode::assemble(".main:\nFROB\nHALT").unwrap();
        let errors = verify(&program).unwrap_err();
        assert!(matches!(&errors[0], CompileError::UnsupportedForm { description, .. } if description == "FROB"));
    }
}
