/// An entry in the error code registry.
pub struct ErrorEntry {
    pub code: &'static str,
    /// Markdown shown by `--explain`, headed `## CODE: title`.
    pub long: &'static str,
}

/// All stable error codes emitted by elc.
pub static REGISTRY: &[ErrorEntry] = &[
    // ── Lexer ────────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "ELC-L001",
        long: r#"## ELC-L001: unexpected character

The source contains a character that cannot start any token.

Tokens are `(`, `)`, `[`, `]`, integers, double-quoted strings and
symbols. Symbols may use letters, digits and `- + * / ! @ % ^ & = . < > ? _`.
Spaces, tabs, newlines, `,` and `;` separate tokens.

**Example:**

    (let x {1})

Braces are not part of the language. Use `(` `)` for forms.

An unclosed string also lands here, because strings may not span lines:

    (print "hello
"#,
    },

    // ── Parser ───────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "ELC-P001",
        long: r#"## ELC-P001: unexpected closing delimiter

A `)` or `]` appeared with no open form to close.

**Example:**

    (print 1))

Remove the extra delimiter.
"#,
    },
    ErrorEntry {
        code: "ELC-P002",
        long: r#"## ELC-P002: mismatched closing delimiter

A form opened with one delimiter was closed with the other.

**Example:**

    (print [1 2)

`[` must be closed by `]` and `(` by `)`.
"#,
    },
    ErrorEntry {
        code: "ELC-P003",
        long: r#"## ELC-P003: integer literal out of range

Integer literals must fit in a signed 64-bit integer
(at most 9223372036854775807).
"#,
    },
    ErrorEntry {
        code: "ELC-P004",
        long: r#"## ELC-P004: unexpected end of input

The source ended inside an open form. The error points at the opening
delimiter that was never closed.

**Example:**

    (let x (+ 1 2)
"#,
    },

    // ── Compiler ─────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "ELC-C001",
        long: r#"## ELC-C001: malformed special form

A built-in form was given the wrong number or kind of arguments.

    (let NAME VALUE)
    (print VALUE)
    (OP LEFT RIGHT)            OP is + - * / % = > < <= >= != eq neq
    (if COND THEN [ELSE])
    (defun NAME (PARAM ...) BODY ...)
"#,
    },
    ErrorEntry {
        code: "ELC-C002",
        long: r#"## ELC-C002: assignment target is not a symbol

The first argument of `let` names the variable being bound, so it must
be a symbol.

**Example:**

    (let 5 x)

**Fix:**

    (let x 5)
"#,
    },
    ErrorEntry {
        code: "ELC-C003",
        long: r#"## ELC-C003: form cannot be compiled

The expression has a shape the compiler has no lowering for:

- a vector `[...]` in expression position
- an empty list `()`
- a list whose head is not a symbol, such as `(1 2)` or `("f" x)`

In bytecode listings the same error is reported for any line whose
mnemonic is not a known opcode.
"#,
    },
    ErrorEntry {
        code: "ELC-C004",
        long: r#"## ELC-C004: jump to undefined label

A `JMP` or `JMP_FALSE` names a label that no line defines. Compiled
programs only jump to the labels generated for `if`, so this points at
a hand-assembled or hand-edited program.
"#,
    },
    ErrorEntry {
        code: "ELC-C005",
        long: r#"## ELC-C005: label defined more than once

Every function becomes a label named after it, and those labels share a
namespace with the entry label `main` and the `else_N` / `end_N` labels
generated for `if`.

**Examples that trigger this:**

    (defun main () 1)
    (defun f () 1) (defun f () 2)

Rename the function.
"#,
    },
    ErrorEntry {
        code: "ELC-C006",
        long: r#"## ELC-C006: call to undefined function

A list whose head is not a built-in form is a function call, and no
`defun` with that name exists anywhere in the program.

**Example:**

    (print (square 4))

**Fix:**

    (defun square (n) (* n n))
    (print (square 4))

Definitions may appear before or after their first use. Only `defun`
names are callable: `main` and the generated `else_N` / `end_N` labels are
jump targets, not functions.
"#,
    },
    ErrorEntry {
        code: "ELC-C007",
        long: r#"## ELC-C007: wrong number of arguments

A call passes a different number of arguments than the function declares
parameters. Arguments are bound to parameters from the last one backwards,
so a mismatch would leave stray values behind or run out of them.

**Example:**

    (defun f (a b) (+ a b))
    (print (f 1))

**Fix:**

    (print (f 1 2))
"#,
    },

    // ── Assembler ────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "ELC-A001",
        long: r#"## ELC-A001: cannot assemble bytecode listing

A line of an `.elb` listing could not be read. Lines look like:

    .const 5
    .name x
    .main:
    PUSH 5
    LOAD_CONST 1
    STORE_NAME x
    JMP_FALSE else_0
    CALL sum 2
    .end_0: HALT

`#` starts a comment outside of string literals.
"#,
    },

    // ── Runtime ──────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "ELC-R001",
        long: r#"## ELC-R001: no entry point

Execution starts at the label `.main:`, and the program does not define
it. Nothing was executed.
"#,
    },
    ErrorEntry {
        code: "ELC-R002",
        long: r#"## ELC-R002: call to undefined function

`CALL name argc` needs a label `.name:` to jump to. Compiled programs
are checked for this before they run (ELC-C006).
"#,
    },
    ErrorEntry {
        code: "ELC-R003",
        long: r#"## ELC-R003: jump to undefined label

`JMP` or `JMP_FALSE` named a label the program does not define.
Compiled programs are checked for this before they run (ELC-C004).
"#,
    },
    ErrorEntry {
        code: "ELC-R004",
        long: r#"## ELC-R004: read of unbound variable

`LOAD_NAME` read a variable with no binding in the current frame.
Every call gets its own locals, so a function cannot see variables
bound by its caller except through its parameters.

**Example:**

    (let x 1)
    (defun f () x)
    (print (f))
"#,
    },
    ErrorEntry {
        code: "ELC-R005",
        long: r#"## ELC-R005: return with no pending call

`RET` executed in the outermost frame, where there is no call to
return to. Programs leave `main` through `HALT`.
"#,
    },
    ErrorEntry {
        code: "ELC-R006",
        long: r#"## ELC-R006: unknown instruction

Execution reached a line whose mnemonic is not a known opcode. The run
stops there; anything printed before it is kept.
"#,
    },
    ErrorEntry {
        code: "ELC-R007",
        long: r#"## ELC-R007: division by zero

`DIV` or `MOD` had a right operand of zero. Division never produces
infinity or NaN; it stops the run instead.
"#,
    },
    ErrorEntry {
        code: "ELC-R008",
        long: r#"## ELC-R008: operand stack underflow

An instruction popped more values than the current frame's operand stack
held, or a `CALL` asked for more arguments than were pushed.
"#,
    },
    ErrorEntry {
        code: "ELC-R009",
        long: r#"## ELC-R009: arithmetic on text

Strings only support `+` with another string, which concatenates them.
Every other arithmetic operation needs two numbers.

**Example:**

    (print (- "abc" 1))
"#,
    },
    ErrorEntry {
        code: "ELC-R010",
        long: r#"## ELC-R010: constant not in pool

`LOAD_CONST` referenced an id past the end of the constant pool.
"#,
    },
    ErrorEntry {
        code: "ELC-R011",
        long: r#"## ELC-R011: malformed operand

An instruction carried no operand, or an operand of the wrong kind.
Only programs built by hand through the library API can reach this.
"#,
    },
    ErrorEntry {
        code: "ELC-R012",
        long: r#"## ELC-R012: ran past the end of the program

Execution fell off the last instruction without reaching `HALT`.
Compiled programs always end `main` with `HALT`; a hand-written listing
needs one too.
"#,
    },
];

/// Look up an error entry by code (e.g. `"ELC-C006"`).
pub fn lookup(code: &str) -> Option<&'static ErrorEntry> {
    REGISTRY.iter().find(|e| e.code.eq_ignore_ascii_case(code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_known_code() {
        let e = lookup("ELC-C006").expect("ELC-C006 should be in registry");
        assert_eq!(e.code, "ELC-C006");
        assert!(e.long.contains("ELC-C006"));
    }

    #[test]
    fn lookup_ignores_case() {
        assert_eq!(lookup("elc-r007").map(|e| e.code), Some("ELC-R007"));
    }

    #[test]
    fn lookup_unknown_returns_none() {
        assert!(lookup("ELC-XXXX").is_none());
        assert!(lookup("").is_none());
    }

    #[test]
    fn all_codes_unique() {
        let mut codes: Vec<&str> = REGISTRY.iter().map(|e| e.code).collect();
        codes.sort_unstable();
        let len_before = codes.len();
        codes.dedup();
        assert_eq!(codes.len(), len_before, "duplicate codes in registry");
    }

    #[test]
    fn long_text_names_its_code() {
        for entry in REGISTRY {
            assert!(entry.long.starts_with(&format!("## {}:", entry.code)), "{} heading", entry.code);
        }
    }
}
