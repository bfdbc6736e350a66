use std::collections::BTreeMap;

use tracing::debug;

use crate::ast::{Node, Span, SyntaxNode};
use crate::bytecode::{Instruction, Literal, Opcode, Operand, Program, ENTRY_LABEL};
use crate::interner::Interner;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompileError {
    #[error("malformed '{form}': {message}")]
    Malformed { form: String, message: String, span: Span },
    #[error("cannot assign to a {found}; the target of 'let' must be a symbol")]
    InvalidTarget { found: &'static str, span: Span },
    #[error("cannot compile {description}")]
    UnsupportedForm { description: String, span: Span },
    #[error("jump to undefined label '{label}'")]
    UndefinedLabel { label: String, span: Span },
    /// `span` is the repeat, `first` the line that keeps the label.
    #[error("label '{label}' is defined more than once")]
    DuplicateLabel { label: String, span: Span, first: Span },
    #[error("call to undefined function '{name}'")]
    UndefinedFunction { name: String, span: Span },
    #[error("function '{name}' expects {expected} argument(s), got {found}")]
    ArityMismatch { name: String, expected: usize, found: usize, span: Span },
}

impl CompileError {
    pub fn span(&self) -> Span {
        match self {
            CompileError::Malformed { span, .. }
            | CompileError::InvalidTarget { span, .. }
            | CompileError::UnsupportedForm { span, .. }
            | CompileError::UndefinedLabel { span, .. }
            | CompileError::DuplicateLabel { span, .. }
            | CompileError::UndefinedFunction { span, .. }
            | CompileError::ArityMismatch { span, .. } => *span,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            CompileError::Malformed { .. } => "ELC-C001",
            CompileError::InvalidTarget { .. } => "ELC-C002",
            CompileError::UnsupportedForm { .. } => "ELC-C003",
            CompileError::UndefinedLabel { .. } => "ELC-C004",
            CompileError::DuplicateLabel { .. } => "ELC-C005",
            CompileError::UndefinedFunction { .. } => "ELC-C006",
            CompileError::ArityMismatch { .. } => "ELC-C007",
        }
    }
}

type Result<T> = std::result::Result<T, CompileError>;

/// Whether a symbol is being read or assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Load,
    Store,
}

struct Compiler {
    /// Code for whatever is being lowered right now: `.main:` or a function body.
    code: Vec<Instruction>,
    /// Finished function bodies, emitted after the trailing HALT.
    functions: Vec<Instruction>,
    /// Parameter count per defined function; the first definition of a name wins.
    arities: BTreeMap<String, usize>,
    constants: Interner<Literal>,
    names: Interner<String>,
    /// Suffix for the next `else_k`/`end_k` pair.
    next_branch: usize,
}

impl Compiler {
    fn new() -> Self {
        Compiler {
            code: Vec::new(),
            functions: Vec::new(),
            arities: BTreeMap::new(),
            constants: Interner::new(),
            names: Interner::new(),
            next_branch: 0,
        }
    }

    fn emit(&mut self, inst: Instruction) {
        self.code.push(inst);
    }

    fn lower_program(mut self, nodes: &[Node]) -> Result<Program> {
        self.emit(Instruction::label(ENTRY_LABEL));
        for node in nodes {
            self.lower(node, Target::Load)?;
        }
        self.emit(Instruction::op(Opcode::Halt));

        let mut code = self.code;
        code.append(&mut self.functions);
        debug!(
            target: "elc::compiler",
            instructions = code.len(),
            constants = self.constants.len(),
            names = self.names.len(),
            functions = self.arities.len(),
            "lowered program"
        );
        Ok(Program::new(code, self.constants, self.names).with_functions(self.arities))
    }

    fn lower(&mut self, node: &Node, target: Target) -> Result<()> {
        let span = node.span;
        match (&node.node, target) {
            (SyntaxNode::Symbol(name), Target::Load) => {
                let id = self.names.intern(name.clone());
                self.emit(Instruction::with(Opcode::LoadName, Operand::Id(id)).at(span));
            }
            (SyntaxNode::Symbol(name), Target::Store) => {
                let id = self.names.intern(name.clone());
                self.emit(Instruction::with(Opcode::StoreName, Operand::Id(id)).at(span));
            }
            (other, Target::Store) => {
                return Err(CompileError::InvalidTarget { found: other.describe(), span });
            }
            (SyntaxNode::Integer(n), Target::Load) => self.load_const(Literal::Integer(*n), span),
            (SyntaxNode::String(s), Target::Load) => self.load_const(Literal::Text(s.clone()), span),
            (SyntaxNode::Vector(_), Target::Load) => {
                self.emit(Instruction::invalid(format!("vector {}", node.node), span));
            }
            (SyntaxNode::Sequence(items), Target::Load) => self.lower_sequence(items, span)?,
        }
        Ok(())
    }

    fn load_const(&mut self, literal: Literal, span: Span) {
        let id = self.constants.intern(literal);
        self.emit(Instruction::with(Opcode::LoadConst, Operand::Id(id)).at(span));
    }

    fn lower_sequence(&mut self, items: &[Node], span: Span) -> Result<()> {
        let Some((head, args)) = items.split_first() else {
            self.emit(Instruction::invalid("empty sequence ()", span));
            return Ok(());
        };
        let Some(name) = head.as_symbol() else {
            let text = SyntaxNode::Sequence(items.to_vec());
            self.emit(Instruction::invalid(format!("{} in call position of {text}", head.describe()), span));
            return Ok(());
        };

        match name {
            "let" => self.lower_let(args, span),
            "print" => {
                let [value] = args else {
                    return Err(malformed("print", format!("expected 1 argument, got {}", args.len()), span));
                };
                self.lower(value, Target::Load)?;
                self.emit(Instruction::op(Opcode::Print).at(span));
                Ok(())
            }
            "if" => self.lower_if(args, span),
            "defun" => self.lower_defun(args, span),
            _ => {
                if let Some(opcode) = Opcode::arithmetic(name) {
                    return self.lower_binary(name, opcode, args, span);
                }
                if Opcode::is_comparison(name) {
                    return self.lower_binary(name, Opcode::Cmp, args, span);
                }
                for arg in args {
                    self.lower(arg, Target::Load)?;
                }
                let call = Operand::Call { name: name.to_string(), argc: args.len() };
                self.emit(Instruction::with(Opcode::Call, call).at(span));
                Ok(())
            }
        }
    }

    fn lower_let(&mut self, args: &[Node], span: Span) -> Result<()> {
        let [target, value] = args else {
            return Err(malformed("let", format!("expected a target and a value, got {} arguments", args.len()), span));
        };
        let Some(name) = target.as_symbol() else {
            return Err(CompileError::InvalidTarget { found: target.describe(), span: target.span });
        };
        // Target first, so name ids follow source order
        self.names.intern(name.to_string());
        self.lower(value, Target::Load)?;
        self.lower(target, Target::Store)
    }

    fn lower_binary(&mut self, symbol: &str, opcode: Opcode, args: &[Node], span: Span) -> Result<()> {
        let [left, right] = args else {
            return Err(malformed(symbol, format!("expected 2 operands, got {}", args.len()), span));
        };
        self.lower(left, Target::Load)?;
        self.lower(right, Target::Load)?;
        self.emit(Instruction::op(opcode).at(span));
        Ok(())
    }

    fn lower_if(&mut self, args: &[Node], span: Span) -> Result<()> {
        let (cond, then, otherwise) = match args {
            [cond, then] => (cond, then, None),
            [cond, then, otherwise] => (cond, then, Some(otherwise)),
            _ => {
                return Err(malformed(
                    "if",
                    format!("expected a condition, a then-branch and an optional else-branch, got {} arguments", args.len()),
                    span,
                ));
            }
        };

        let k = self.next_branch;
        self.next_branch += 1;
        let else_label = format!("else_{k}");
        let end_label = format!("end_{k}");

        self.lower(cond, Target::Load)?;
        self.emit(Instruction::with(Opcode::JmpFalse, Operand::Label(else_label.clone())).at(span));
        self.lower(then, Target::Load)?;
        self.emit(Instruction::with(Opcode::Jmp, Operand::Label(end_label.clone())).at(span));
        self.emit(Instruction::label(else_label).at(span));
        if let Some(otherwise) = otherwise {
            self.lower(otherwise, Target::Load)?;
        }
        self.emit(Instruction::label(end_label).at(span));
        Ok(())
    }

    /// `(defun name (params...) body...)`: nothing at the definition site, the
    /// body goes after HALT.
    fn lower_defun(&mut self, args: &[Node], span: Span) -> Result<()> {
        let Some((name, rest)) = args.split_first() else {
            return Err(malformed("defun", "expected a function name", span));
        };
        let Some(name) = name.as_symbol() else {
            return Err(malformed("defun", format!("function name must be a symbol, got {}", name.describe()), name.span));
        };
        let Some((params, body)) = rest.split_first() else {
            return Err(malformed("defun", format!("'{name}' has no parameter list"), span));
        };
        let SyntaxNode::Sequence(params) = &params.node else {
            return Err(malformed("defun", format!("parameter list of '{name}' must be a list, got {}", params.describe()), params.span));
        };
        if let Some(bad) = params.iter().find(|p| p.as_symbol().is_none()) {
            return Err(malformed("defun", format!("parameters must be symbols, got {}", bad.describe()), bad.span));
        }

        self.arities.entry(name.to_string()).or_insert(params.len());
        let outer = std::mem::replace(&mut self.code, vec![Instruction::label(name).at(span)]);
        for param in params.iter().filter_map(|p| p.as_symbol()) {
            self.names.intern(param.to_string());
        }
        // Arguments arrive in push order, so the last parameter is on top
        for param in params.iter().rev() {
            self.lower(param, Target::Store)?;
        }
        for expr in body {
            self.lower(expr, Target::Load)?;
        }
        self.emit(Instruction::op(Opcode::Ret).at(span));

        let mut function = std::mem::replace(&mut self.code, outer);
        self.functions.append(&mut function);
        Ok(())
    }
}

fn malformed(form: &str, message: impl Into<String>, span: Span) -> CompileError {
    CompileError::Malformed { form: form.to_string(), message: message.into(), span }
}

/// Lower top-level expressions into a program without validating it.
///
/// Unsupported shapes are left in place as `INVALID` instructions.
pub fn lower(nodes: &[Node]) -> Result<Program> {
    Compiler::new().lower_program(nodes)
}

/// Lower and verify.
///
/// The verifier collects every problem, but only the first in instruction
/// order is returned; callers that want them all can run
/// [`crate::verify::verify`] on the output of [`lower`].
pub fn compile(nodes: &[Node]) -> Result<Program> {
    let program = lower(nodes)?;
    if let Err(errors) = crate::verify::verify(&program) {
        if let Some(first) = errors.into_iter().next() {
            return Err(first);
        }
    }
    Ok(program)
}
