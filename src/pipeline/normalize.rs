use crate::PipelineError;
use crate::styled::{self, SgrError, StyledText};
use std::io;

/// A normalized input line paired with its 1-based position.
#[derive(Debug)]
pub struct SourceLine {
    pub line_number: u32,
    pub text: StyledText,
}

/// First pipeline stage: strips terminating newlines, expands tabs with
/// ANSI-awareness, parses SGR escapes into styled text, and numbers each line.
///
/// Lines whose escapes are not SGR sequences are kept with all ANSI codes
/// stripped; any other styling parse failure is fatal.
pub struct Normalizer<I> {
    input: I,
    line_number: u32,
}

impl<I> Normalizer<I> {
    pub fn new(input: I) -> Self {
        Normalizer {
            input,
            line_number: 0,
        }
    }
}

impl<I> Iterator for Normalizer<I>
where
    I: Iterator<Item = io::Result<String>>,
{
    type Item = Result<SourceLine, PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        let raw = match self.input.next()? {
            Ok(line) => line,
            Err(e) => {
                return Some(Err(PipelineError::Read {
                    message: e.to_string(),
                }));
            }
        };
        self.line_number += 1;
        let line_number = self.line_number;
        Some(normalize(&raw, line_number).map(|text| SourceLine { line_number, text }))
    }
}

fn normalize(raw: &str, line_number: u32) -> Result<StyledText, PipelineError> {
    let line = raw
        .strip_suffix("\r\n")
        .or_else(|| raw.strip_suffix('\n'))
        .unwrap_or(raw);
    let line = expand_tabs(line);
    if !line.contains('\x1b') {
        return Ok(StyledText::plain(&line));
    }
    match StyledText::from_ansi(&line) {
        Ok(text) => Ok(text),
        Err(SgrError::NonSgr) => Ok(StyledText::plain(&styled::strip_ansi(&line))),
        Err(e) => Err(PipelineError::BadEscape {
            line: line_number,
            message: e.to_string(),
        }),
    }
}

/// Expand tabs to 8-column stops, counting only visible characters. Escape
/// sequences are copied through without advancing the column.
fn expand_tabs(line: &str) -> String {
    if !line.contains('\t') {
        return line.to_string();
    }
    let mut out = String::with_capacity(line.len());
    let mut col = 0usize;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\t' => {
                let pad = 8 - col % 8;
                for _ in 0..pad {
                    out.push(' ');
                }
                col += pad;
            }
            '\x1b' => {
                out.push(c);
                if chars.peek() == Some(&'[') {
                    for ch in chars.by_ref() {
                        out.push(ch);
                        if ch.is_ascii_alphabetic() {
                            break;
                        }
                    }
                }
            }
            _ => {
                out.push(c);
                col += 1;
            }
        }
    }
    out
}
