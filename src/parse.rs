// parse.rs
// Field access helpers for the whitespace and delimiter separated log grammars

use std::str::FromStr;

use crate::error::Result;
use crate::io::Line;

/// Whitespace-separated words of one fragment of a line, with errors that
/// name the line, the field and what was expected.
pub struct Fields<'a> {
    line: &'a Line,
    what: &'a str,
    words: Vec<&'a str>,
}

impl<'a> Fields<'a> {
    pub fn new(line: &'a Line, what: &'a str, text: &'a str) -> Self {
        Self {
            line,
            what,
            words: text.split_whitespace().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn word(&self, index: usize) -> Result<&'a str> {
        self.words.get(index).copied().ok_or_else(|| {
            self.line.error(format!(
                "{}: expected at least {} fields, found {}",
                self.what,
                index + 1,
                self.words.len()
            ))
        })
    }

    fn number<T: FromStr>(&self, index: usize, kind: &str) -> Result<T> {
        let word = self.word(index)?;
        word.parse().map_err(|_| {
            self.line
                .error(format!("{} field {}: expected {kind}, found '{word}'", self.what, index + 1))
        })
    }

    pub fn int(&self, index: usize) -> Result<i64> {
        self.number(index, "an integer")
    }

    pub fn count(&self, index: usize) -> Result<u64> {
        self.number(index, "a non-negative integer")
    }

    pub fn float(&self, index: usize) -> Result<f64> {
        self.number(index, "a number")
    }

    pub fn first_char(&self, index: usize) -> Result<char> {
        let word = self.word(index)?;
        word.chars()
            .next()
            .ok_or_else(|| self.line.error(format!("{} field {} is empty", self.what, index + 1)))
    }

    /// Every word from `start` on, parsed as a number.
    pub fn floats_from(&self, start: usize) -> Result<Vec<f64>> {
        (start..self.words.len()).map(|i| self.float(i)).collect()
    }
}

/// Split on the first occurrence of `separator`.
pub fn split_once<'a>(line: &Line, text: &'a str, separator: &str) -> Result<(&'a str, &'a str)> {
    text.split_once(separator)
        .ok_or_else(|| line.error(format!("expected '{separator}' separator")))
}

/// All `separator`-delimited parts; exactly `expected` of them must exist.
pub fn split_exact<'a>(line: &Line, text: &'a str, separator: &str, expected: usize) -> Result<Vec<&'a str>> {
    let parts: Vec<&str> = text.split(separator).collect();
    if parts.len() != expected {
        return Err(line.error(format!(
            "expected {expected} '{separator}'-separated parts, found {}",
            parts.len()
        )));
    }
    Ok(parts)
}

/// `<tick>: rest`, the most common line shape.
pub fn tick_prefix<'a>(line: &'a Line) -> Result<(i64, &'a str)> {
    let (tick, rest) = split_once(line, &line.text, ":")?;
    let tick = tick
        .trim()
        .parse()
        .map_err(|_| line.error(format!("expected an integer tick, found '{}'", tick.trim())))?;
    Ok((tick, rest))
}

pub fn parse_float(line: &Line, what: &str, text: &str) -> Result<f64> {
    text.trim()
        .parse()
        .map_err(|_| line.error(format!("{what}: expected a number, found '{}'", text.trim())))
}

pub fn parse_int(line: &Line, what: &str, text: &str) -> Result<i64> {
    text.trim()
        .parse()
        .map_err(|_| line.error(format!("{what}: expected an integer, found '{}'", text.trim())))
}
