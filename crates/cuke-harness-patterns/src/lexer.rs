//! Lexing of step-expression source into tokens.
//!
//! The token stream distinguishes literal text, `{name}` parameters,
//! `(text)` optionals and `one/two` alternation words. Escapes (`\{`, `\(`,
//! `\/`, `\\`) collapse to their literal character before alternation
//! splitting so escaped slashes never introduce alternatives.

use crate::errors::{ExpressionError, syntax_error};

/// One lexed element of a step expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token {
    /// Verbatim text to match literally.
    Literal(String),
    /// A `{name}` parameter placeholder.
    Parameter {
        /// Name of the referenced parameter type; empty for the anonymous type.
        name: String,
        /// Byte offset of the opening brace.
        position: usize,
    },
    /// A `(text)` fragment that may or may not be present.
    Optional {
        /// The optional text, escapes resolved.
        text: String,
    },
    /// A `one/two` word offering several literal alternatives.
    Alternation {
        /// The alternative literals, escapes resolved.
        alternatives: Vec<String>,
    },
}

/// A character of literal text with its escape provenance retained so the
/// alternation splitter can tell `a/b` from `a\/b`.
#[derive(Clone, Copy)]
struct TextChar {
    ch: char,
    escaped: bool,
}

/// Lex an expression source string into tokens.
pub(crate) fn lex(source: &str) -> Result<Vec<Token>, ExpressionError> {
    let mut tokens = Vec::new();
    let mut run: Vec<TextChar> = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some((index, ch)) = chars.next() {
        match ch {
            '\\' => {
                let Some((_, escaped)) = chars.next() else {
                    return Err(syntax_error("trailing escape character '\\'", index));
                };
                run.push(TextChar {
                    ch: escaped,
                    escaped: true,
                });
            }
            '{' => {
                flush_text_run(&mut run, &mut tokens)?;
                let mut name = String::new();
                let mut closed = false;
                for (_, inner) in chars.by_ref() {
                    if inner == '}' {
                        closed = true;
                        break;
                    }
                    name.push(inner);
                }
                if !closed {
                    return Err(syntax_error("missing closing '}' for parameter", index));
                }
                tokens.push(Token::Parameter {
                    name,
                    position: index,
                });
            }
            '}' => {
                return Err(syntax_error("unmatched closing brace '}'", index));
            }
            '(' => {
                flush_text_run(&mut run, &mut tokens)?;
                let mut text = String::new();
                let mut closed = false;
                while let Some((inner_index, inner)) = chars.next() {
                    match inner {
                        ')' => {
                            closed = true;
                            break;
                        }
                        '\\' => {
                            let Some((_, escaped)) = chars.next() else {
                                return Err(syntax_error(
                                    "trailing escape character '\\'",
                                    inner_index,
                                ));
                            };
                            text.push(escaped);
                        }
                        other => text.push(other),
                    }
                }
                if !closed {
                    return Err(syntax_error("missing closing ')' for optional text", index));
                }
                if text.is_empty() {
                    return Err(syntax_error("optional text may not be empty", index));
                }
                tokens.push(Token::Optional { text });
            }
            other => run.push(TextChar {
                ch: other,
                escaped: false,
            }),
        }
    }

    flush_text_run(&mut run, &mut tokens)?;
    Ok(tokens)
}

/// Convert an accumulated text run into literal and alternation tokens.
///
/// Words (maximal runs of non-whitespace) containing an unescaped `/` become
/// [`Token::Alternation`]; everything else merges into [`Token::Literal`].
fn flush_text_run(
    run: &mut Vec<TextChar>,
    tokens: &mut Vec<Token>,
) -> Result<(), ExpressionError> {
    if run.is_empty() {
        return Ok(());
    }

    let mut literal = String::new();
    let mut word: Vec<TextChar> = Vec::new();

    let flush_word = |word: &mut Vec<TextChar>,
                      literal: &mut String,
                      tokens: &mut Vec<Token>|
     -> Result<(), ExpressionError> {
        if word.is_empty() {
            return Ok(());
        }
        if word.iter().any(|c| c.ch == '/' && !c.escaped) {
            if !literal.is_empty() {
                tokens.push(Token::Literal(std::mem::take(literal)));
            }
            let mut alternatives = vec![String::new()];
            for c in word.drain(..) {
                if c.ch == '/' && !c.escaped {
                    alternatives.push(String::new());
                } else if let Some(last) = alternatives.last_mut() {
                    last.push(c.ch);
                }
            }
            if alternatives.iter().any(String::is_empty) {
                return Err(syntax_error("alternative may not be empty", 0));
            }
            tokens.push(Token::Alternation { alternatives });
        } else {
            for c in word.drain(..) {
                literal.push(c.ch);
            }
        }
        Ok(())
    };

    for c in run.drain(..) {
        if c.ch.is_whitespace() && !c.escaped {
            flush_word(&mut word, &mut literal, tokens)?;
            literal.push(c.ch);
        } else {
            word.push(c);
        }
    }
    flush_word(&mut word, &mut literal, tokens)?;

    if !literal.is_empty() {
        tokens.push(Token::Literal(literal));
    }
    Ok(())
}
