//! Quote-aware line-to-token lexer, adapted from the word tokenizer this
//! crate's job-control machinery grew out of, generalized to classify
//! separators (`<` `>` `>>` `|` `&` `;` `&&` `||`) instead of only words.

use crate::error::TokenizeError;
use crate::token::Token;

/// Split a raw input line into a flat token stream. Quoting and escaping
/// are resolved here; nothing downstream needs to re-inspect the raw text.
pub fn tokenize(input: &str) -> Result<Vec<Token>, TokenizeError> {
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_word = false;

    while i < chars.len() {
        let c = chars[i];

        if in_word {
            match c {
                ' ' | '\t' => {
                    tokens.push(Token::Word(std::mem::take(&mut current)));
                    in_word = false;
                    i += 1;
                }
                '"' => {
                    let (next, closed) = read_double(&chars, i + 1, &mut current);
                    if !closed {
                        return Err(TokenizeError::UnterminatedDoubleQuote);
                    }
                    i = next;
                }
                '\'' => {
                    let (next, closed) = read_single(&chars, i + 1, &mut current);
                    if !closed {
                        return Err(TokenizeError::UnterminatedSingleQuote);
                    }
                    i = next;
                }
                '\\' => {
                    i += 1;
                    if i < chars.len() {
                        current.push(chars[i]);
                        i += 1;
                    }
                }
                '<' | '>' | '|' | '&' | ';' => {
                    tokens.push(Token::Word(std::mem::take(&mut current)));
                    in_word = false;
                    // Reprocess this character as an operator below.
                }
                _ => {
                    current.push(c);
                    i += 1;
                }
            }
            continue;
        }

        match c {
            ' ' | '\t' => {
                i += 1;
            }
            '"' => {
                let (next, closed) = read_double(&chars, i + 1, &mut current);
                if !closed {
                    return Err(TokenizeError::UnterminatedDoubleQuote);
                }
                in_word = true;
                i = next;
            }
            '\'' => {
                let (next, closed) = read_single(&chars, i + 1, &mut current);
                if !closed {
                    return Err(TokenizeError::UnterminatedSingleQuote);
                }
                in_word = true;
                i = next;
            }
            '\\' => {
                i += 1;
                if i < chars.len() {
                    current.push(chars[i]);
                    i += 1;
                }
                in_word = true;
            }
            '<' => {
                tokens.push(Token::Input);
                i += 1;
            }
            '>' => {
                if chars.get(i + 1) == Some(&'>') {
                    tokens.push(Token::Append);
                    i += 2;
                } else {
                    tokens.push(Token::Output);
                    i += 1;
                }
            }
            '|' => {
                if chars.get(i + 1) == Some(&'|') {
                    tokens.push(Token::Or);
                    i += 2;
                } else {
                    tokens.push(Token::Pipe);
                    i += 1;
                }
            }
            '&' => {
                if chars.get(i + 1) == Some(&'&') {
                    tokens.push(Token::And);
                    i += 2;
                } else {
                    tokens.push(Token::Background);
                    i += 1;
                }
            }
            ';' => {
                tokens.push(Token::Semicolon);
                i += 1;
            }
            _ => {
                current.push(c);
                in_word = true;
                i += 1;
            }
        }
    }

    if in_word {
        tokens.push(Token::Word(current));
    }

    Ok(tokens)
}

fn read_double(chars: &[char], mut i: usize, out: &mut String) -> (usize, bool) {
    while i < chars.len() {
        match chars[i] {
            '"' => return (i + 1, true),
            '\\' => {
                if let Some(&next) = chars.get(i + 1) {
                    if matches!(next, '"' | '\\' | '$' | '`') {
                        out.push(next);
                        i += 2;
                        continue;
                    }
                }
                out.push('\\');
                i += 1;
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    (i, false)
}

fn read_single(chars: &[char], mut i: usize, out: &mut String) -> (usize, bool) {
    while i < chars.len() {
        if chars[i] == '\'' {
            return (i + 1, true);
        }
        out.push(chars[i]);
        i += 1;
    }
    (i, false)
}
