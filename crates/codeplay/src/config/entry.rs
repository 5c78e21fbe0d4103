//! Entry symbol extraction
//!
//! Some languages can only run a program when the name of its declared entry
//! unit is known up front (a Java launcher needs the public class name, and
//! `javac` insists the file is named after it). [`EntryRule`] inspects source
//! text and reports that name without compiling anything.

use serde::{Deserialize, Serialize};

/// Modifiers that may sit between `public` and `class`
const CLASS_MODIFIERS: [&str; 5] = ["abstract", "final", "static", "strictfp", "sealed"];

/// Rule for deriving a run target from source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntryRule {
    /// The first `public class <Name>` declaration
    PublicClass,
}

impl EntryRule {
    /// Extract the entry symbol, or `None` if the source declares none
    pub fn extract(self, source: &str) -> Option<String> {
        match self {
            EntryRule::PublicClass => first_public_class(source),
        }
    }

    /// Diagnostic reported when [`extract`](Self::extract) finds nothing
    pub fn missing_message(self) -> &'static str {
        match self {
            EntryRule::PublicClass => "No public class found",
        }
    }
}

fn first_public_class(source: &str) -> Option<String> {
    let mut tokens = Scanner::new(source);

    while let Some(token) = tokens.next() {
        if token != Token::Word("public") {
            continue;
        }

        loop {
            match tokens.next() {
                Some(Token::Word(word)) if CLASS_MODIFIERS.contains(&word) => {}
                Some(Token::Word("class")) => {
                    if let Some(Token::Word(name)) = tokens.next()
                        && is_identifier(name)
                    {
                        return Some(name.to_owned());
                    }
                    break;
                }
                _ => break,
            }
        }
    }

    None
}

fn is_identifier(word: &str) -> bool {
    word.chars()
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Word(&'a str),
    Punct,
}

/// Splits C-family source into words and punctuation.
///
/// Comments, string literals and character literals are skipped entirely so
/// that `"public class Fake"` inside a string never counts as a declaration.
struct Scanner<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn skip_trivia(&mut self) {
        loop {
            let rest = self.rest();
            let trimmed = rest.trim_start();
            self.pos += rest.len() - trimmed.len();

            if trimmed.starts_with("//") {
                self.pos += trimmed.find('\n').unwrap_or(trimmed.len());
            } else if let Some(body) = trimmed.strip_prefix("/*") {
                self.pos += body.find("*/").map_or(trimmed.len(), |end| end + 4);
            } else if trimmed.starts_with("\"\"\"") {
                let body = &trimmed[3..];
                self.pos += body.find("\"\"\"").map_or(trimmed.len(), |end| end + 6);
            } else if let Some(quote) = trimmed.chars().next().filter(|c| *c == '"' || *c == '\'') {
                self.pos += quoted_len(trimmed, quote);
            } else {
                return;
            }
        }
    }
}

/// Length of a quoted literal starting at `text[0]`, honouring backslash escapes.
/// Unterminated literals end at the line break.
fn quoted_len(text: &str, quote: char) -> usize {
    let mut escaped = false;
    for (idx, c) in text.char_indices().skip(1) {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == quote {
            return idx + c.len_utf8();
        } else if c == '\n' {
            return idx;
        }
    }
    text.len()
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.skip_trivia();
        let rest = self.rest();
        let first = rest.chars().next()?;

        if is_word_char(first) {
            let len = rest.find(|c: char| !is_word_char(c)).unwrap_or(rest.len());
            self.pos += len;
            Some(Token::Word(&rest[..len]))
        } else {
            self.pos += first.len_utf8();
            Some(Token::Punct)
        }
    }
}
