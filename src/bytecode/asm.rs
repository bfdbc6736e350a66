//! Reads bytecode listings back into a [`Program`].
//!
//! Accepts everything `Program`'s `Display` writes, plus a few conveniences
//! for writing programs by hand:
//!
//! ```text
//! # comment
//! .sum:
//!     ADD
//!     RET
//! .main:
//!     PUSH 5          # interns the literal, emits LOAD_CONST
//!     PUSH 6
//!     CALL sum 2
//!     PRINT
//!     HALT
//! ```
//!
//! Mnemonics are case-insensitive, `LOAD_NAME`/`STORE_NAME` take either an
//! id or a variable name, and an unrecognised mnemonic assembles to an
//! `INVALID` instruction so that executing it faults.

use super::{Instruction, Literal, Opcode, Operand, Program};
use crate::interner::Interner;

#[derive(Debug, thiserror::Error)]
#[error("Assembly error on line {line}: {message}")]
pub struct AsmError {
    /// 1-based line in the listing.
    pub line: usize,
    pub message: String,
}

type Result<T> = std::result::Result<T, AsmError>;

struct Assembler {
    code: Vec<Instruction>,
    constants: Interner<Literal>,
    names: Interner<String>,
    line: usize,
    /// (line, id) of every LOAD_CONST given as a raw id; checked once the pool is complete.
    const_refs: Vec<(usize, usize)>,
}

impl Assembler {
    fn error(&self, message: impl Into<String>) -> AsmError {
        AsmError { line: self.line, message: message.into() }
    }

    fn assemble_line(&mut self, text: &str) -> Result<()> {
        let text = strip_comment(text).trim();
        if text.is_empty() {
            return Ok(());
        }

        let (first, rest) = text.split_once(char::is_whitespace).unwrap_or((text, ""));
        match first {
            ".const" => {
                let literal = self.parse_literal(rest.trim())?;
                self.constants.intern(literal);
                return Ok(());
            }
            ".name" => {
                let name = rest.trim();
                if name.is_empty() || name.contains(char::is_whitespace) {
                    return Err(self.error(format!("expected one variable name, got '{name}'")));
                }
                self.names.intern(name.to_string());
                return Ok(());
            }
            _ => {}
        }

        let (label, rest) = split_label(text);
        let rest = rest.trim();
        if rest.is_empty() {
            return match label {
                Some(name) => {
                    self.code.push(Instruction::label(name));
                    Ok(())
                }
                None => Err(self.error(format!("cannot read '{text}'"))),
            };
        }

        let mut inst = self.assemble_op(rest)?;
        inst.label = label.map(str::to_string);
        self.code.push(inst);
        Ok(())
    }

    fn assemble_op(&mut self, text: &str) -> Result<Instruction> {
        let (mnemonic, args) = match text.split_once(char::is_whitespace) {
            Some((m, a)) => (m, a.trim()),
            None => (text, ""),
        };

        if mnemonic.eq_ignore_ascii_case("push") {
            let literal = self.parse_literal(args)?;
            let id = self.constants.intern(literal);
            return Ok(Instruction::with(Opcode::LoadConst, Operand::Id(id)));
        }

        let Some(opcode) = Opcode::from_mnemonic(mnemonic) else {
            return Ok(Instruction::with(Opcode::Invalid, Operand::Text(text.to_string())));
        };

        let operand = match opcode {
            Opcode::LoadConst => {
                let id = self.parse_id(args)?;
                self.const_refs.push((self.line, id));
                Some(Operand::Id(id))
            }
            Opcode::LoadName | Opcode::StoreName => Some(Operand::Id(self.name_operand(args)?)),
            Opcode::Jmp | Opcode::JmpFalse => Some(Operand::Label(self.label_operand(args)?)),
            Opcode::Call => Some(self.call_operand(args)?),
            _ if !args.is_empty() => {
                return Err(self.error(format!("{opcode} takes no operand, got '{args}'")));
            }
            _ => None,
        };

        Ok(Instruction { operand, ..Instruction::op(opcode) })
    }

    fn parse_literal(&self, text: &str) -> Result<Literal> {
        if let Some(inner) = text.strip_prefix('"').and_then(|t| t.strip_suffix('"')) {
            return Ok(Literal::Text(inner.to_string()));
        }
        text.parse::<i64>()
            .map(Literal::Integer)
            .map_err(|_| self.error(format!("expected an integer or a quoted string, got '{text}'")))
    }

    fn parse_id(&self, text: &str) -> Result<usize> {
        match text.parse::<usize>() {
            Ok(id) if id > 0 => Ok(id),
            _ => Err(self.error(format!("expected a positive id, got '{text}'"))),
        }
    }

    fn name_operand(&mut self, text: &str) -> Result<usize> {
        if text.is_empty() || text.contains(char::is_whitespace) {
            return Err(self.error(format!("expected a name id or variable name, got '{text}'")));
        }
        if text.starts_with(|c: char| c.is_ascii_digit()) {
            return self.parse_id(text);
        }
        Ok(self.names.intern(text.to_string()))
    }

    fn label_operand(&self, text: &str) -> Result<String> {
        let name = text.trim_start_matches('.').trim_end_matches(':');
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(self.error(format!("expected a label, got '{text}'")));
        }
        Ok(name.to_string())
    }

    fn call_operand(&self, text: &str) -> Result<Operand> {
        let mut parts = text.split_whitespace();
        let (Some(name), Some(argc), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(self.error(format!("expected 'CALL <name> <argc>', got 'CALL {text}'")));
        };
        let argc = argc
            .parse::<usize>()
            .map_err(|_| self.error(format!("argument count must be a number, got '{argc}'")))?;
        Ok(Operand::Call { name: name.to_string(), argc })
    }
}

/// Drops a `#` comment, leaving `#` inside string literals alone.
fn strip_comment(line: &str) -> &str {
    let mut in_string = false;
    for (i, c) in line.char_indices() {
        match c {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..i],
            _ => {}
        }
    }
    line
}

/// Splits a leading `.name:` off a line.
fn split_label(text: &str) -> (Option<&str>, &str) {
    let (first, rest) = match text.split_once(char::is_whitespace) {
        Some((first, rest)) => (first, rest),
        None => (text, ""),
    };
    match first.strip_prefix('.').and_then(|l| l.strip_suffix(':')) {
        Some(name) if !name.is_empty() => (Some(name), rest),
        _ => (None, text),
    }
}

/// Assemble a text listing into a program.
pub fn assemble(text: &str) -> Result<Program> {
    let mut asm = Assembler {
        code: Vec::new(),
        constants: Interner::new(),
        names: Interner::new(),
        line: 0,
        const_refs: Vec::new(),
    };
    for (index, line) in text.lines().enumerate() {
        asm.line = index + 1;
        asm.assemble_line(line)?;
    }
    if let Some(&(line, id)) = asm.const_refs.iter().find(|(_, id)| *id > asm.constants.len()) {
        return Err(AsmError { line, message: format!("constant {id} is not in the pool") });
    }
    Ok(Program::new(asm.code, asm.constants, asm.names))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assembles_hand_written_program() {
        let prog = assemble(".main:\n  push 5\n  push 6\n  add\n  print\n  halt\n").unwrap();
        assert_eq!(
            prog.listing(),
            vec![".main:", "LOAD_CONST 1", "LOAD_CONST 2", "ADD", "PRINT", "HALT"]
        );
        assert_eq!(prog.constant(1), Some(&Literal::Integer(5)));
        assert_eq!(prog.constant(2), Some(&Literal::Integer(6)));
    }

    #[test]
    fn push_reuses_pool_entries() {
        let prog = assemble(".main:\nPUSH 5\nPUSH 5\nPUSH \"five\"\nHALT").unwrap();
        assert_eq!(prog.listing()[1..4], ["LOAD_CONST 1", "LOAD_CONST 1", "LOAD_CONST 2"]);
    }

    #[test]
    fn display_output_reassembles() {
        let source = ".const 50\n.const \"hi\"\n.name x\n.main:\nLOAD_CONST 1\nSTORE_NAME 1\nLOAD_NAME 1\nJMP_FALSE end_0\nCALL f 1\n.end_0: HALT\n.f:\nRET\n";
        let prog = assemble(source).unwrap();
        assert_eq!(prog.to_string(), source);
        assert_eq!(prog.label("end_0"), Some(6));
    }

    #[test]
    fn symbolic_names_are_interned() {
        let prog = assemble(".main:\nPUSH 1\nSTORE_NAME a\nLOAD_NAME a\nLOAD_NAME b\nHALT").unwrap();
        assert_eq!(prog.listing()[2..5], ["STORE_NAME 1", "LOAD_NAME 1", "LOAD_NAME 2"]);
        assert_eq!(prog.name(2), Some("b"));
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let prog = assemble("# entry\n\n.main:\n   # nothing here\nPUSH \"#1\"  # hash in a string\nHALT\n").unwrap();
        assert_eq!(prog.listing(), vec![".main:", "LOAD_CONST 1", "HALT"]);
        assert_eq!(prog.constant(1), Some(&Literal::Text("#1".into())));
    }

    #[test]
    fn unknown_mnemonic_becomes_invalid() {
        let prog = assemble(".main:\nFROB 3\nHALT").unwrap();
        assert_eq!(prog.code[1].opcode, Some(Opcode::Invalid));
        assert_eq!(prog.code[1].operand, Some(Operand::Text("FROB 3".into())));
    }

    #[test]
    fn errors_carry_line_numbers() {
        let err = assemble(".main:\nADD 3\n").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.message.contains("takes no operand"));

        let err = assemble(".main:\nCALL f\n").unwrap_err();
        assert_eq!(err.line, 2);

        let err = assemble(".main:\nPUSH x\n").unwrap_err();
        assert!(err.message.contains("integer"));
    }

    #[test]
    fn const_ids_must_exist() {
        let err = assemble(".main:\nLOAD_CONST 2\nHALT\n.const 7\n").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(assemble(".main:\nLOAD_CONST 1\nHALT\n.const 7\n").is_ok());
    }
}
