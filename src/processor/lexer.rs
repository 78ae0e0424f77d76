//! Very small hand-written lexer for the entity-script language.
//!
//! Works one physical line at a time. `Preprocessor` first removes
//! everything that could produce false keyword matches, `Lexer` then splits
//! what is left into words. No keywords are recognised here: `actor`,
//! `state`, `action` … all come out as plain words for the scope tracker.
//
//  Lexical items:
//
//      Word     ::= [A-Za-z0-9_]+ | '-' [0-9][A-Za-z0-9_]*
//      Comment  ::= '//' .* EOL | '/*' .*? '*/'   (block comments span lines)
//      String   ::= '"' .*? ('"' | EOL)
//      Payload  ::= ('qputs' | 'definequote' | 'redefinequote') .* EOL
//
//  Everything else (braces, brackets, operators, whitespace) separates
//  words and is discarded.

use std::iter::Peekable;
use std::str::Chars;

/// Commands whose remaining line is free text.
pub const QUOTE_COMMANDS: &[&str] = &["qputs", "definequote", "redefinequote"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub word: String,
    pub line: u32,
}

pub type TokenStream = Peekable<std::vec::IntoIter<Token>>;

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Strips comments, string literals and quote payloads from lines.
///
/// Holds the block-comment state, so one instance must be used per file and
/// fed the lines in order.
#[derive(Debug, Default)]
pub struct Preprocessor {
    in_block_comment: bool,
}

impl Preprocessor {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    fn in_block_comment(&self) -> bool {
        self.in_block_comment
    }

    pub fn clean(&mut self, line: &str) -> String {
        let mut out = String::with_capacity(line.len());
        let mut chars = line.trim().chars().peekable();
        let mut word_start: Option<usize> = None;

        while let Some(c) = chars.next() {
            if self.in_block_comment {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    self.in_block_comment = false;
                }
                continue;
            }

            if is_word_char(c) {
                word_start.get_or_insert(out.len());
                out.push(c);
                continue;
            }

            if strip_payload(&mut out, word_start.take()) {
                return out.trim_end().to_string();
            }

            match c {
                '/' if chars.peek() == Some(&'/') => break,
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    self.in_block_comment = true;
                    out.push(' ');
                }
                '"' => {
                    for q in chars.by_ref() {
                        if q == '"' {
                            break;
                        }
                    }
                    out.push(' ');
                }
                _ => out.push(c),
            }
        }

        strip_payload(&mut out, word_start);
        out.trim().to_string()
    }
}

/// Cut the line at the word starting at `word_start` if it is a quote
/// command.
fn strip_payload(out: &mut String, word_start: Option<usize>) -> bool {
    match word_start {
        Some(start) if QUOTE_COMMANDS.contains(&&out[start..]) => {
            out.truncate(start);
            true
        }
        _ => false,
    }
}

#[derive(Clone)]
pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: u32,
}

impl<'a> Lexer<'a> {
    /// Lex one already cleaned line.
    pub fn new(src: &'a str, line: u32) -> Self {
        Self {
            chars: src.chars().peekable(),
            line,
        }
    }

    fn next_char(&mut self) -> Option<char> {
        self.chars.next()
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn consume_while<F: Fn(char) -> bool>(&mut self, pred: F, buf: &mut String) {
        while let Some(c) = self.peek_char() {
            if pred(c) {
                buf.push(c);
                self.next_char();
            } else {
                break;
            }
        }
    }

    fn read_word(&mut self, first: char) -> String {
        let mut word = String::new();
        word.push(first);
        self.consume_while(is_word_char, &mut word);
        word
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let c = self.next_char()?;
            let starts_number = c == '-' && self.peek_char().is_some_and(|n| n.is_ascii_digit());
            if is_word_char(c) || starts_number {
                let word = self.read_word(c);
                return Some(Token {
                    word,
                    line: self.line,
                });
            }
        }
    }
}

/// Convenience for tests and one-off lines.
pub fn words(line: &str) -> Vec<String> {
    Lexer::new(line, 1).map(|t| t.word).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenisation() {
        let test_cases = vec![
            (
                "actor LIZTROOP LIZTROOPSTRENGTH ALIZTROOPSTAND",
                vec!["actor", "LIZTROOP", "LIZTROOPSTRENGTH", "ALIZTROOPSTAND"],
            ),
            (
                "ifai AISEEKER { action AWALK move 0 }",
                vec!["ifai", "AISEEKER", "action", "AWALK", "move", "0"],
            ),
            ("action AFLY 0 -4 5", vec!["action", "AFLY", "0", "-4", "5"]),
            ("sizeat 20-4", vec!["sizeat", "20", "-4"]),
            ("spawn FOO[3]", vec!["spawn", "FOO", "3"]),
            ("  ", vec![]),
        ];

        for (src, expected) in test_cases {
            assert_eq!(words(src), expected, "line {src:?}");
        }
    }

    #[test]
    fn test_tokens_carry_line() {
        let tokens: Vec<Token> = Lexer::new("enda", 42).collect();
        assert_eq!(
            tokens,
            vec![Token {
                word: "enda".into(),
                line: 42
            }]
        );
    }

    #[test]
    fn test_clean_single_lines() {
        let test_cases = vec![
            ("  state foo // ends actor", "state foo"),
            ("qputs 12 the actor ends here", ""),
            ("definequote 7 state of the art", ""),
            ("ifvare x 1 qputs 7 enda", "ifvare x 1"),
            ("redefinequote 9 \"actor\"", ""),
            ("echo \"actor enda\" ends", "echo   ends"),
            ("a /* enda */ b", "a   b"),
            ("myqputs 3", "myqputs 3"),
            ("state qputsfoo", "state qputsfoo"),
        ];

        for (src, expected) in test_cases {
            let mut pre = Preprocessor::new();
            assert_eq!(pre.clean(src), expected, "line {src:?}");
            assert!(!pre.in_block_comment());
        }
    }

    #[test]
    fn test_block_comment_spans_lines() {
        let mut pre = Preprocessor::new();
        let lines = [
            "actor A /* start",
            "enda still commented",
            "end */ action AWALK",
            "enda",
        ];
        let cleaned: Vec<String> = lines.iter().map(|l| pre.clean(l)).collect();
        assert_eq!(cleaned, vec!["actor A", "", "action AWALK", "enda"]);
        assert!(!pre.in_block_comment());
    }

    #[test]
    fn test_line_comment_hides_block_opener() {
        let mut pre = Preprocessor::new();
        assert_eq!(pre.clean("ends // old /* junk"), "ends");
        assert!(!pre.in_block_comment());
        assert_eq!(pre.clean("enda"), "enda");
    }
}
