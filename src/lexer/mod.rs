use logos::Logos;

#[derive(Logos, Debug, PartialEq, Clone)]
#[logos(skip r"[ \t\r\n,;]+")]
pub enum Token {
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,

    // Integers overflow into a parse error rather than a lex error, so keep the text.
    #[regex(r"[0-9]+", |lex| lex.slice().to_string(), priority = 3)]
    Integer(String),

    #[regex(r#""[^"\n]*""#, |lex| {
        let s = lex.slice();
        s[1..s.len() - 1].to_string()
    })]
    Str(String),

    #[regex(r"[\-+*/!@%\^&=.<>?a-zA-Z0-9_]+", |lex| lex.slice().to_string())]
    Symbol(String),
}

impl Token {
    /// How the token reads in error messages.
    pub fn describe(&self) -> String {
        match self {
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
            Token::LBracket => "'['".to_string(),
            Token::RBracket => "']'".to_string(),
            Token::Integer(n) => format!("integer {n}"),
            Token::Str(s) => format!("string \"{s}\""),
            Token::Symbol(s) => format!("symbol '{s}'"),
        }
    }
}

/// Lex source code into a stream of tokens with positions.
/// Stops at the first character that cannot start a token.
pub fn lex(source: &str) -> Result<Vec<(Token, std::ops::Range<usize>)>, LexError> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        match result {
            Ok(token) => tokens.push((token, lexer.span())),
            Err(()) => {
                let span = lexer.span();
                return Err(LexError {
                    position: span.start,
                    snippet: source[span.clone()].to_string(),
                    suggestion: suggest_fix(&source[span]),
                });
            }
        }
    }

    Ok(tokens)
}

fn suggest_fix(bad_token: &str) -> String {
    if bad_token.starts_with('"') {
        "Strings must be closed on the line they start: add a closing '\"'".to_string()
    } else if bad_token.starts_with('{') || bad_token.starts_with('}') {
        "Use '(' and ')' for forms and '[' and ']' for vectors".to_string()
    } else if bad_token.starts_with('\'') || bad_token.starts_with('`') {
        "Quoting is not supported; write the data literally".to_string()
    } else {
        format!(
            "Unexpected character(s): '{}'. Symbols may use letters, digits and - + * / ! @ % ^ & = . < > ? _",
            bad_token
        )
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Lex error at position {position}: '{snippet}'. {suggestion}")]
pub struct LexError {
    pub position: usize,
    pub snippet: String,
    pub suggestion: String,
}
