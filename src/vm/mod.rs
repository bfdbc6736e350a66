use std::collections::HashMap;

use tracing::{debug, trace};

use crate::ast::Span;
use crate::bytecode::{Instruction, Opcode, Operand, Program, ENTRY_LABEL};

pub mod value;
pub use value::Value;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Fault {
    #[error("no entry point: label .main: is not defined")]
    MissingEntryPoint,
    #[error("call to undefined function '{name}'")]
    UndefinedFunction { name: String },
    #[error("jump to undefined label '{label}'")]
    UndefinedLabel { label: String },
    #[error("read of unbound variable '{name}'")]
    UndefinedVariable { name: String },
    #[error("return with no pending call")]
    InvalidReturn,
    #[error("unknown instruction '{text}'")]
    UnknownInstruction { text: String },
    #[error("division by zero")]
    DivisionByZero,
    #[error("operand stack underflow")]
    StackUnderflow,
    #[error("{op} cannot operate on {found}")]
    TypeMismatch { op: &'static str, found: &'static str },
    #[error("constant {id} is not in the pool")]
    UndefinedConstant { id: usize },
    #[error("{opcode} has a missing or malformed operand")]
    BadOperand { opcode: Opcode },
    #[error("execution ran past the last instruction without HALT")]
    MissingHalt,
}

/// A failed run: the fault, where it happened, and everything printed before it.
#[derive(Debug, Clone, PartialEq)]
pub struct Trap {
    pub fault: Fault,
    pub pc: usize,
    /// Listing text of the offending instruction; empty if `pc` is out of range.
    pub instruction: String,
    /// Source span the offending instruction was lowered from; unknown for assembled listings.
    pub span: Span,
    pub output: Vec<String>,
}

impl std::fmt::Display for Trap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.instruction.is_empty() {
            write!(f, "{} (at instruction {})", self.fault, self.pc)
        } else {
            write!(f, "{} (at instruction {}: {})", self.fault, self.pc, self.instruction)
        }
    }
}

impl std::error::Error for Trap {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.fault)
    }
}

pub type VmResult<T> = Result<T, Fault>;

/// Execute `program` from `.main:` until `HALT`, returning every printed value in order.
///
/// With `debug` set, each executed instruction is traced through `tracing` at
/// debug level; the returned output is the same either way.
pub fn run(program: &Program, debug: bool) -> Result<Vec<String>, Trap> {
    Vm::new(program).debug(debug).run()
}

// ── Frames ───────────────────────────────────────────────────────────

/// One call's operand stack, locals and outstanding returns.
#[derive(Debug, Default)]
struct Frame {
    stack: Vec<Value>,
    /// Keyed by name-interner id.
    locals: HashMap<usize, Value>,
    /// `pc` of each `CALL` this frame issued that has not returned yet.
    returns: Vec<usize>,
}

// ── VM ───────────────────────────────────────────────────────────────

/// Interpreter state for one run.
///
/// Frames live in a depth-indexed arena: `frames[d]` is the frame at call
/// depth `d` and `fp` is the current depth. A slot is live from the `CALL`
/// that reaches its depth until the `RET` that tears it down; `CALL` only
/// creates a slot when none exists at the new depth and otherwise adopts the
/// one already there.
pub struct Vm<'a> {
    program: &'a Program,
    frames: Vec<Frame>,
    fp: usize,
    pc: usize,
    output: Vec<String>,
    debug: bool,
}

impl<'a> Vm<'a> {
    pub fn new(program: &'a Program) -> Self {
        Vm { program, frames: Vec::with_capacity(16), fp: 0, pc: 0, output: Vec::new(), debug: false }
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn run(mut self) -> Result<Vec<String>, Trap> {
        match self.execute() {
            Ok(()) => Ok(self.output),
            Err(fault) => {
                let inst = self.program.code.get(self.pc);
                Err(Trap {
                    fault,
                    pc: self.pc,
                    instruction: inst.map(ToString::to_string).unwrap_or_default(),
                    span: inst.map_or(Span::UNKNOWN, |i| i.span),
                    output: self.output,
                })
            }
        }
    }

    fn frame(&mut self) -> &mut Frame {
        &mut self.frames[self.fp]
    }

    fn push(&mut self, value: Value) {
        self.frame().stack.push(value);
    }

    fn pop(&mut self) -> VmResult<Value> {
        self.frame().stack.pop().ok_or(Fault::StackUnderflow)
    }

    fn id_operand(inst: &Instruction, opcode: Opcode) -> VmResult<usize> {
        match inst.operand {
            Some(Operand::Id(id)) => Ok(id),
            _ => Err(Fault::BadOperand { opcode }),
        }
    }

    fn jump_target(&self, inst: &Instruction, opcode: Opcode) -> VmResult<usize> {
        let Some(Operand::Label(label)) = &inst.operand else {
            return Err(Fault::BadOperand { opcode });
        };
        self.program.label(label).ok_or_else(|| Fault::UndefinedLabel { label: label.clone() })
    }

    fn name_of(&self, id: usize) -> String {
        self.program.name(id).map(str::to_string).unwrap_or_else(|| format!("#{id}"))
    }

    fn execute(&mut self) -> VmResult<()> {
        let program = self.program;
        self.pc = program.label(ENTRY_LABEL).ok_or(Fault::MissingEntryPoint)?;
        self.frames.clear();
        self.frames.push(Frame::default());
        self.fp = 0;

        loop {
            let inst = program.code.get(self.pc).ok_or(Fault::MissingHalt)?;
            // Label-only lines are jump targets and nothing else
            let Some(opcode) = inst.opcode else {
                self.pc += 1;
                continue;
            };

            if self.debug {
                debug!(
                    target: "elc::vm",
                    pc = self.pc,
                    op = %opcode,
                    operand = %inst.operand.as_ref().map(ToString::to_string).unwrap_or_default(),
                    stack = %fmt_stack(&self.frames[self.fp].stack),
                    depth = self.fp,
                    "step"
                );
            }

            match opcode {
                Opcode::Halt => break,

                Opcode::LoadConst => {
                    let id = Self::id_operand(inst, opcode)?;
                    let literal = program.constant(id).ok_or(Fault::UndefinedConstant { id })?;
                    self.push(Value::from(literal));
                }
                Opcode::LoadName => {
                    let id = Self::id_operand(inst, opcode)?;
                    let Some(value) = self.frames[self.fp].locals.get(&id).cloned() else {
                        return Err(Fault::UndefinedVariable { name: self.name_of(id) });
                    };
                    self.push(value);
                }
                Opcode::StoreName => {
                    let id = Self::id_operand(inst, opcode)?;
                    let value = self.pop()?;
                    self.frame().locals.insert(id, value);
                }

                Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Div | Opcode::Mod => {
                    let right = self.pop()?;
                    let left = self.pop()?;
                    let result = arithmetic(opcode, left, right)?;
                    self.push(result);
                }
                Opcode::Cmp => {
                    let right = self.pop()?;
                    let left = self.pop()?;
                    self.push(Value::Number(if left == right { 1.0 } else { 0.0 }));
                }

                Opcode::Print => {
                    let value = self.pop()?;
                    let text = value.to_string();
                    trace!(target: "elc::vm", output = %text, "print");
                    self.output.push(text);
                }

                Opcode::Jmp => {
                    self.pc = self.jump_target(inst, opcode)?;
                    continue;
                }
                Opcode::JmpFalse => {
                    let target = self.jump_target(inst, opcode)?;
                    if self.pop()?.is_false() {
                        self.pc = target;
                        continue;
                    }
                }

                Opcode::Call => {
                    let Some(Operand::Call { name, argc }) = &inst.operand else {
                        return Err(Fault::BadOperand { opcode });
                    };
                    self.pc = self.call(name, *argc)?;
                    continue;
                }
                Opcode::Ret => {
                    // Resumes at the CALL; the increment below steps past it
                    self.pc = self.ret()?;
                }

                Opcode::Invalid => {
                    let text = match &inst.operand {
                        Some(operand) => operand.to_string(),
                        None => opcode.to_string(),
                    };
                    return Err(Fault::UnknownInstruction { text });
                }
            }
            self.pc += 1;
        }

        if self.debug {
            debug!(target: "elc::vm", depth = self.fp, stack = %fmt_stack(&self.frames[self.fp].stack), "halt");
        }
        Ok(())
    }

    /// Enter `.name:` with the top `argc` values of the current stack as the callee's stack.
    fn call(&mut self, name: &str, argc: usize) -> VmResult<usize> {
        let dest = self
            .program
            .label(name)
            .ok_or_else(|| Fault::UndefinedFunction { name: name.to_string() })?;
        let caller = self.fp;
        let available = self.frames[caller].stack.len();
        if available < argc {
            return Err(Fault::StackUnderflow);
        }

        self.frames[caller].returns.push(self.pc);
        self.fp += 1;
        if self.frames.len() <= self.fp {
            let args = self.frames[caller].stack.split_off(available - argc);
            self.frames.push(Frame { stack: args, ..Frame::default() });
        }
        // else: the slot at this depth is still live and is adopted as it is
        Ok(dest)
    }

    /// Tear down the current frame, hand its leftover stack to the caller and
    /// return the `pc` of the matching `CALL`.
    fn ret(&mut self) -> VmResult<usize> {
        if self.fp == 0 {
            return Err(Fault::InvalidReturn);
        }
        let finished = self.frames.remove(self.fp);
        self.fp -= 1;
        let frame = self.frame();
        frame.stack.extend(finished.stack);
        frame.returns.pop().ok_or(Fault::InvalidReturn)
    }
}

fn arithmetic(opcode: Opcode, left: Value, right: Value) -> VmResult<Value> {
    let name = opcode.mnemonic();
    if let (Opcode::Add, Value::Text(l), Value::Text(r)) = (opcode, &left, &right) {
        return Ok(Value::Text(format!("{l}{r}")));
    }
    let l = left.as_number(name)?;
    let r = right.as_number(name)?;
    let result = match opcode {
        Opcode::Add => l + r,
        Opcode::Sub => l - r,
        Opcode::Mul => l * r,
        Opcode::Div | Opcode::Mod if r == 0.0 => return Err(Fault::DivisionByZero),
        Opcode::Div => l / r,
        Opcode::Mod => l % r,
        _ => unreachable!("arithmetic called with {opcode}"),
    };
    Ok(Value::Number(result))
}

fn fmt_stack(stack: &[Value]) -> String {
    let items: Vec<String> = stack.iter().map(ToString::to_string).collect();
    format!("[{}]", items.join(", "))
}

// ── Tests ────────────────────────────────────────────────────────────
