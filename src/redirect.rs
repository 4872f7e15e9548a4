//! The redirection resolver: a single left-to-right pass over one
//! stage's tokens that strips redirection operators, opens the named files,
//! and leaves behind a clean argv. The last redirection of a given stream
//! wins.

use std::fs::{File, OpenOptions};

#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;

use crate::error::RedirectError;
use crate::token::Token;

/// The outcome of resolving one stage's tokens: a clean argv plus whatever
/// files the stage's stdin/stdout should be replaced with.
pub struct Resolved {
    pub args: Vec<String>,
    pub input: Option<File>,
    pub output: Option<File>,
}

/// Consume `tokens` left to right. Strings and non-redirection separators
/// pass through to the output argv; a redirection separator must be
/// followed by a word token naming the file, which is opened with the
/// flags appropriate to the operator and stashed in `input`/`output`
/// (overwriting any earlier occurrence — last wins).
pub fn resolve(tokens: Vec<Token>) -> Result<Resolved, RedirectError> {
    let mut args = Vec::new();
    let mut input = None;
    let mut output = None;

    let mut iter = tokens.into_iter();
    while let Some(token) = iter.next() {
        match token {
            Token::Input | Token::Output | Token::Append => {
                let filename = match iter.next() {
                    Some(Token::Word(w)) => w,
                    _ => return Err(RedirectError::MalformedCommand),
                };
                let file = open_for(&token, &filename)?;
                match token {
                    Token::Input => input = Some(file),
                    _ => output = Some(file),
                }
            }
            Token::Word(w) => args.push(w),
            // Pipe/Background/Semicolon/And/Or have no business inside a
            // single stage's token slice — the caller (pipeline.rs) has
            // already split on Pipe and stripped a trailing Background, so
            // seeing one here means the line was structurally malformed
            // (e.g. `ls ;` mid-stage, or a stray reserved operator).
            _ => return Err(RedirectError::MalformedCommand),
        }
    }

    Ok(Resolved { args, input, output })
}

fn open_for(token: &Token, path: &str) -> Result<File, RedirectError> {
    let result = match token {
        Token::Input => File::open(path),
        Token::Output => unix_open(OpenOptions::new().write(true).create(true).truncate(true), path),
        Token::Append => unix_open(OpenOptions::new().write(true).create(true).append(true), path),
        _ => unreachable!("open_for only called for redirection tokens"),
    };
    result.map_err(|source| RedirectError::Open {
        path: path.to_string(),
        source,
    })
}

#[cfg(unix)]
fn unix_open(opts: &mut OpenOptions, path: &str) -> std::io::Result<File> {
    opts.mode(0o666).open(path)
}

#[cfg(not(unix))]
fn unix_open(opts: &mut OpenOptions, path: &str) -> std::io::Result<File> {
    opts.open(path)
}
