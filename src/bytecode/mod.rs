use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ast::Span;
use crate::interner::Interner;

pub mod asm;
pub use asm::{assemble, AsmError};

/// Label every program starts executing at.
pub const ENTRY_LABEL: &str = "main";

// ── Opcodes ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Opcode {
    LoadConst,
    LoadName,
    StoreName,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Cmp,
    Jmp,
    JmpFalse,
    Call,
    Ret,
    Print,
    Halt,
    /// Sentinel for code the compiler could not lower. Never valid to execute.
    Invalid,
}

impl Opcode {
    pub const ALL: [Opcode; 16] = [
        Opcode::LoadConst,
        Opcode::LoadName,
        Opcode::StoreName,
        Opcode::Add,
        Opcode::Sub,
        Opcode::Mul,
        Opcode::Div,
        Opcode::Mod,
        Opcode::Cmp,
        Opcode::Jmp,
        Opcode::JmpFalse,
        Opcode::Call,
        Opcode::Ret,
        Opcode::Print,
        Opcode::Halt,
        Opcode::Invalid,
    ];

    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::LoadConst => "LOAD_CONST",
            Opcode::LoadName => "LOAD_NAME",
            Opcode::StoreName => "STORE_NAME",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Mul => "MUL",
            Opcode::Div => "DIV",
            Opcode::Mod => "MOD",
            Opcode::Cmp => "CMP",
            Opcode::Jmp => "JMP",
            Opcode::JmpFalse => "JMP_FALSE",
            Opcode::Call => "CALL",
            Opcode::Ret => "RET",
            Opcode::Print => "PRINT",
            Opcode::Halt => "HALT",
            Opcode::Invalid => "INVALID",
        }
    }

    /// Case-insensitive lookup; `INVALID` is not a writable mnemonic.
    pub fn from_mnemonic(text: &str) -> Option<Opcode> {
        Opcode::ALL
            .into_iter()
            .filter(|op| *op != Opcode::Invalid)
            .find(|op| op.mnemonic().eq_ignore_ascii_case(text))
    }

    /// Binary arithmetic opcode for a source operator.
    pub fn arithmetic(symbol: &str) -> Option<Opcode> {
        Some(match symbol {
            "+" => Opcode::Add,
            "-" => Opcode::Sub,
            "*" => Opcode::Mul,
            "/" => Opcode::Div,
            "%" => Opcode::Mod,
            _ => return None,
        })
    }

    /// Every comparison operator lowers to the single equality opcode.
    pub fn is_comparison(symbol: &str) -> bool {
        matches!(symbol, "=" | ">" | "<" | "<=" | ">=" | "!=" | "eq" | "neq")
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

// ── Operands and constants ───────────────────────────────────────────

/// A constant pool entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Integer(i64),
    Text(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Integer(n) => write!(f, "{n}"),
            Literal::Text(s) => write!(f, "\"{s}\""),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operand {
    /// Constant or name interner id.
    Id(usize),
    /// Jump target, without the `.` sigil or `:` suffix.
    Label(String),
    Call { name: String, argc: usize },
    /// Free text; carried by `INVALID` to say what could not be lowered.
    Text(String),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Id(id) => write!(f, "{id}"),
            Operand::Label(name) => write!(f, "{name}"),
            Operand::Call { name, argc } => write!(f, "{name} {argc}"),
            Operand::Text(text) => write!(f, "{text}"),
        }
    }
}

// ── Instructions ─────────────────────────────────────────────────────

/// One line of bytecode. A line with a label and no opcode only marks a jump target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opcode: Option<Opcode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operand: Option<Operand>,
    #[serde(skip)]
    pub span: Span,
}

impl Instruction {
    pub fn op(opcode: Opcode) -> Self {
        Instruction { label: None, opcode: Some(opcode), operand: None, span: Span::UNKNOWN }
    }

    pub fn with(opcode: Opcode, operand: Operand) -> Self {
        Instruction { operand: Some(operand), ..Instruction::op(opcode) }
    }

    pub fn label(name: impl Into<String>) -> Self {
        Instruction { label: Some(name.into()), opcode: None, operand: None, span: Span::UNKNOWN }
    }

    pub fn invalid(what: impl Into<String>, span: Span) -> Self {
        Instruction::with(Opcode::Invalid, Operand::Text(what.into())).at(span)
    }

    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(label) = &self.label {
            write!(f, ".{label}:")?;
            if self.opcode.is_some() {
                write!(f, " ")?;
            }
        }
        if let Some(op) = self.opcode {
            write!(f, "{op}")?;
            if let Some(operand) = &self.operand {
                write!(f, " {operand}")?;
            }
        }
        Ok(())
    }
}

// ── Program ──────────────────────────────────────────────────────────

/// A compiled program: the flat instruction list, both interners, the
/// label table derived from the instructions, and the parameter count of
/// each function the compiler defined.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "ProgramParts")]
pub struct Program {
    pub code: Vec<Instruction>,
    pub constants: Interner<Literal>,
    pub names: Interner<String>,
    /// Empty for assembled listings, which carry no function declarations.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub functions: BTreeMap<String, usize>,
    #[serde(skip)]
    labels: HashMap<String, usize>,
}

#[derive(Deserialize)]
struct ProgramParts {
    code: Vec<Instruction>,
    constants: Interner<Literal>,
    names: Interner<String>,
    #[serde(default)]
    functions: BTreeMap<String, usize>,
}

impl From<ProgramParts> for Program {
    fn from(parts: ProgramParts) -> Self {
        Program::new(parts.code, parts.constants, parts.names).with_functions(parts.functions)
    }
}

impl Program {
    /// Builds the label table once. Where a label repeats, the first line wins.
    pub fn new(code: Vec<Instruction>, constants: Interner<Literal>, names: Interner<String>) -> Self {
        let mut labels = HashMap::new();
        for (index, inst) in code.iter().enumerate() {
            if let Some(label) = &inst.label {
                labels.entry(label.clone()).or_insert(index);
            }
        }
        Program { code, constants, names, functions: BTreeMap::new(), labels }
    }

    pub fn with_functions(mut self, functions: BTreeMap<String, usize>) -> Self {
        self.functions = functions;
        self
    }

    /// Parameter count of a compiled function; `None` for any other label.
    pub fn arity(&self, function: &str) -> Option<usize> {
        self.functions.get(function).copied()
    }

    /// Index of the line carrying `label`.
    pub fn label(&self, label: &str) -> Option<usize> {
        self.labels.get(label).copied()
    }

    pub fn constant(&self, id: usize) -> Option<&Literal> {
        self.constants.resolve(id)
    }

    pub fn name(&self, id: usize) -> Option<&str> {
        self.names.resolve(id).map(String::as_str)
    }

    /// One string per instruction line, as they appear in the listing.
    pub fn listing(&self) -> Vec<String> {
        self.code.iter().map(ToString::to_string).collect()
    }
}

impl PartialEq for Program {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code
            && self.constants == other.constants
            && self.names == other.names
            && self.functions == other.functions
    }
}

/// The text listing: pool directives in id order, then one line per instruction.
impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (_, literal) in self.constants.iter() {
            writeln!(f, ".const {literal}")?;
        }
        for (_, name) in self.names.iter() {
            writeln!(f, ".name {name}")?;
        }
        for inst in &self.code {
            writeln!(f, "{inst}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Program {
        let mut constants = Interner::new();
        let mut names = Interner::new();
        let five = constants.intern(Literal::Integer(5));
        let hello = constants.intern(Literal::Text("hi".into()));
        let x = names.intern("x".to_string());
        Program::new(
            vec![
                Instruction::label(ENTRY_LABEL),
                Instruction::with(Opcode::LoadConst, Operand::Id(five)),
                Instruction::with(Opcode::StoreName, Operand::Id(x)),
                Instruction::with(Opcode::LoadConst, Operand::Id(hello)),
                Instruction::with(Opcode::Call, Operand::Call { name: "show".into(), argc: 1 }),
                Instruction::op(Opcode::Halt),
                Instruction::label("show"),
                Instruction::op(Opcode::Print),
                Instruction::op(Opcode::Ret),
            ],
            constants,
            names,
        )
        .with_functions(BTreeMap::from([("show".to_string(), 1)]))
    }

    #[test]
    fn labels_resolve_to_line_index() {
        let prog = sample();
        assert_eq!(prog.label("main"), Some(0));
        assert_eq!(prog.label("show"), Some(6));
        assert_eq!(prog.label("missing"), None);
    }

    #[test]
    fn first_duplicate_label_wins() {
        let prog = Program::new(
            vec![Instruction::label("a"), Instruction::op(Opcode::Halt), Instruction::label("a")],
            Interner::new(),
            Interner::new(),
        );
        assert_eq!(prog.label("a"), Some(0));
    }

    #[test]
    fn listing_format() {
        assert_eq!(
            sample().to_string(),
            ".const 5\n.const \"hi\"\n.name x\n.main:\nLOAD_CONST 1\nSTORE_NAME 1\nLOAD_CONST 2\nCALL show 1\nHALT\n.show:\nPRINT\nRET\n"
        );
    }

    #[test]
    fn labeled_instruction_display() {
        let inst = Instruction { label: Some("end_0".into()), ..Instruction::op(Opcode::Halt) };
        assert_eq!(inst.to_string(), ".end_0: HALT");
    }

    #[test]
    fn mnemonics_round_trip() {
        for op in Opcode::ALL.into_iter().filter(|op| *op != Opcode::Invalid) {
            assert_eq!(Opcode::from_mnemonic(op.mnemonic()), Some(op));
        }
        assert_eq!(Opcode::from_mnemonic("jmp_false"), Some(Opcode::JmpFalse));
        assert_eq!(Opcode::from_mnemonic("INVALID"), None);
    }

    #[test]
    fn json_rebuilds_label_table() {
        let prog = sample();
        let json = serde_json::to_string(&prog).unwrap();
        let back: Program = serde_json::from_str(&json).unwrap();
        assert_eq!(back, prog);
        assert_eq!(back.label("show"), Some(6));
        assert_eq!(back.arity("show"), Some(1));
    }

    #[test]
    fn json_without_functions_loads_empty_table() {
        let json = r#"{"code":[{"label":"main"},{"opcode":"HALT"}],"constants":[],"names":[]}"#;
        let prog: Program = serde_json::from_str(json).unwrap();
        assert!(prog.functions.is_empty());
        assert_eq!(prog.label("main"), Some(0));
    }
}
