//! Actor / state / event scope tracking.
//!
//! Each scope kind has its own stack with room for a single frame, so a
//! reopen is a push onto a full stack and a stray close is a pop from an
//! empty one. Both are contract violations reported as `ScopeError`.

use super::lexer::{Token, TokenStream};
use std::fmt;

const MAX_DEPTH: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Actor,
    State,
    Event,
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            ScopeKind::Actor => "actor",
            ScopeKind::State => "state",
            ScopeKind::Event => "event",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScopeError {
    #[error("cannot open {kind} `{name}` while {kind} `{open}` is still open")]
    AlreadyOpen {
        line: u32,
        kind: ScopeKind,
        open: String,
        name: String,
    },
    #[error("`{keyword}` without an open {kind}")]
    NotOpen {
        line: u32,
        kind: ScopeKind,
        keyword: String,
    },
    #[error("`{keyword}` is missing its name")]
    MissingName { line: u32, keyword: String },
    #[error("{kind} `{name}` is never closed")]
    Unclosed { kind: ScopeKind, name: String },
}

impl ScopeError {
    /// Line the violation was detected on; `None` at end of file.
    pub fn line(&self) -> Option<u32> {
        match self {
            ScopeError::AlreadyOpen { line, .. }
            | ScopeError::NotOpen { line, .. }
            | ScopeError::MissingName { line, .. } => Some(*line),
            ScopeError::Unclosed { .. } => None,
        }
    }
}

#[derive(Debug, Default, Clone)]
struct ScopeStack {
    frames: Vec<String>,
}

impl ScopeStack {
    fn push(&mut self, kind: ScopeKind, name: String, line: u32) -> Result<(), ScopeError> {
        if let Some(open) = self.frames.last().filter(|_| self.frames.len() >= MAX_DEPTH) {
            return Err(ScopeError::AlreadyOpen {
                line,
                kind,
                open: open.clone(),
                name,
            });
        }
        self.frames.push(name);
        Ok(())
    }

    fn pop(&mut self, kind: ScopeKind, token: &Token) -> Result<String, ScopeError> {
        self.frames.pop().ok_or_else(|| ScopeError::NotOpen {
            line: token.line,
            kind,
            keyword: token.word.clone(),
        })
    }

    fn current(&self) -> Option<&str> {
        self.frames.last().map(String::as_str)
    }
}

/// Who issued a `state` call that did not open a new state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caller {
    Actor(String),
    State(String),
    Event(String),
}

/// What a keyword did to the scope state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Opened(ScopeKind, String),
    Closed(ScopeKind, String),
    StateCall { caller: Caller, state: String },
    /// Not a scope keyword; the stream was not advanced.
    Unchanged,
}

/// Scope state for one file. Create a fresh tracker per file.
#[derive(Debug, Default, Clone)]
pub struct ScopeTracker {
    actor: ScopeStack,
    state: ScopeStack,
    event: ScopeStack,
}

impl ScopeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn actor(&self) -> Option<&str> {
        self.actor.current()
    }

    pub fn state(&self) -> Option<&str> {
        self.state.current()
    }

    pub fn event(&self) -> Option<&str> {
        self.event.current()
    }

    /// True when no actor, state or event is open.
    #[cfg(test)]
    fn is_top_level(&self) -> bool {
        self.actor().is_none() && self.state().is_none() && self.event().is_none()
    }

    /// Apply `token`, pulling names from `tokens` where the keyword binds
    /// one.
    pub fn step(&mut self, token: &Token, tokens: &mut TokenStream) -> Result<Transition, ScopeError> {
        match token.word.as_str() {
            "defstate" => self.open(ScopeKind::State, token, tokens, 0),
            "state" => {
                if let Some(actor) = self.actor() {
                    let caller = Caller::Actor(actor.to_string());
                    return self.call(caller, token, tokens);
                }
                if let Some(state) = self.state() {
                    let caller = Caller::State(state.to_string());
                    return self.call(caller, token, tokens);
                }
                if let Some(event) = self.event() {
                    let caller = Caller::Event(event.to_string());
                    return self.call(caller, token, tokens);
                }
                self.open(ScopeKind::State, token, tokens, 0)
            }
            "ends" => self.close(ScopeKind::State, token),
            "actor" | "eventloadactor" => self.open(ScopeKind::Actor, token, tokens, 0),
            // useractor <type> <name>
            "useractor" => self.open(ScopeKind::Actor, token, tokens, 1),
            "enda" => self.close(ScopeKind::Actor, token),
            "onevent" | "appendevent" => self.open(ScopeKind::Event, token, tokens, 0),
            "endevent" => self.close(ScopeKind::Event, token),
            _ => Ok(Transition::Unchanged),
        }
    }

    /// Scopes still open once the file is exhausted.
    pub fn finish(&self) -> Result<(), ScopeError> {
        let open = [
            (ScopeKind::Actor, self.actor()),
            (ScopeKind::State, self.state()),
            (ScopeKind::Event, self.event()),
        ];
        match open.into_iter().find_map(|(kind, name)| name.map(|n| (kind, n))) {
            Some((kind, name)) => Err(ScopeError::Unclosed {
                kind,
                name: name.to_string(),
            }),
            None => Ok(()),
        }
    }

    fn stack(&mut self, kind: ScopeKind) -> &mut ScopeStack {
        match kind {
            ScopeKind::Actor => &mut self.actor,
            ScopeKind::State => &mut self.state,
            ScopeKind::Event => &mut self.event,
        }
    }

    fn open(
        &mut self,
        kind: ScopeKind,
        token: &Token,
        tokens: &mut TokenStream,
        skip: usize,
    ) -> Result<Transition, ScopeError> {
        let name = take_name(token, tokens, skip)?;
        self.stack(kind).push(kind, name.clone(), token.line)?;
        tracing::trace!("line {}: open {kind} {name}", token.line);
        Ok(Transition::Opened(kind, name))
    }

    fn close(&mut self, kind: ScopeKind, token: &Token) -> Result<Transition, ScopeError> {
        let name = self.stack(kind).pop(kind, token)?;
        tracing::trace!("line {}: close {kind} {name}", token.line);
        Ok(Transition::Closed(kind, name))
    }

    fn call(&self, caller: Caller, token: &Token, tokens: &mut TokenStream) -> Result<Transition, ScopeError> {
        let state = take_name(token, tokens, 0)?;
        Ok(Transition::StateCall { caller, state })
    }
}

/// Skip `skip` tokens, then take the next one as a name.
fn take_name(keyword: &Token, tokens: &mut TokenStream, skip: usize) -> Result<String, ScopeError> {
    tokens
        .nth(skip)
        .map(|t| t.word)
        .ok_or_else(|| ScopeError::MissingName {
            line: keyword.line,
            keyword: keyword.word.clone(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::lexer::Lexer;

    fn stream(src: &str) -> TokenStream {
        let tokens: Vec<Token> = src
            .lines()
            .enumerate()
            .flat_map(|(i, l)| Lexer::new(l, i as u32 + 1).collect::<Vec<_>>())
            .collect();
        tokens.into_iter().peekable()
    }

    /// Feed a whole source through a tracker, collecting transitions.
    fn run(src: &str) -> (ScopeTracker, Result<Vec<Transition>, ScopeError>) {
        let mut tracker = ScopeTracker::new();
        let mut tokens = stream(src);
        let mut seen = Vec::new();
        while let Some(token) = tokens.next() {
            match tracker.step(&token, &mut tokens) {
                Ok(Transition::Unchanged) => {}
                Ok(t) => seen.push(t),
                Err(e) => return (tracker, Err(e)),
            }
        }
        (tracker, Ok(seen))
    }

    #[test]
    fn test_state_meaning_depends_on_scope() {
        let src = "\
state top
  state inner
ends
actor HERO 10 AIDLE
  state top
enda
onevent EVENT_GAME
  state top
endevent
";
        let (tracker, result) = run(src);
        assert_eq!(
            result.unwrap(),
            vec![
                Transition::Opened(ScopeKind::State, "top".into()),
                Transition::StateCall {
                    caller: Caller::State("top".into()),
                    state: "inner".into()
                },
                Transition::Closed(ScopeKind::State, "top".into()),
                Transition::Opened(ScopeKind::Actor, "HERO".into()),
                Transition::StateCall {
                    caller: Caller::Actor("HERO".into()),
                    state: "top".into()
                },
                Transition::Closed(ScopeKind::Actor, "HERO".into()),
                Transition::Opened(ScopeKind::Event, "EVENT_GAME".into()),
                Transition::StateCall {
                    caller: Caller::Event("EVENT_GAME".into()),
                    state: "top".into()
                },
                Transition::Closed(ScopeKind::Event, "EVENT_GAME".into()),
            ]
        );
        assert!(tracker.is_top_level());
        assert_eq!(tracker.finish(), Ok(()));
    }

    #[test]
    fn test_useractor_binds_second_token() {
        let (tracker, result) = run("useractor notenemy BARREL 0 ABARREL");
        assert_eq!(
            result.unwrap(),
            vec![Transition::Opened(ScopeKind::Actor, "BARREL".into())]
        );
        assert_eq!(tracker.actor(), Some("BARREL"));
        assert_eq!(
            tracker.finish(),
            Err(ScopeError::Unclosed {
                kind: ScopeKind::Actor,
                name: "BARREL".into()
            })
        );
    }

    #[test]
    fn test_defstate_inside_actor_opens_state() {
        let (tracker, result) = run("actor A\ndefstate helper");
        assert!(result.is_ok());
        assert_eq!(tracker.actor(), Some("A"));
        assert_eq!(tracker.state(), Some("helper"));
    }

    #[test]
    fn test_contract_violations() {
        let test_cases = vec![
            (
                "actor A\nactor B",
                ScopeError::AlreadyOpen {
                    line: 2,
                    kind: ScopeKind::Actor,
                    open: "A".into(),
                    name: "B".into(),
                },
            ),
            (
                "defstate s1\ndefstate s2",
                ScopeError::AlreadyOpen {
                    line: 2,
                    kind: ScopeKind::State,
                    open: "s1".into(),
                    name: "s2".into(),
                },
            ),
            (
                "ends",
                ScopeError::NotOpen {
                    line: 1,
                    kind: ScopeKind::State,
                    keyword: "ends".into(),
                },
            ),
            (
                "\n\nenda",
                ScopeError::NotOpen {
                    line: 3,
                    kind: ScopeKind::Actor,
                    keyword: "enda".into(),
                },
            ),
            (
                "onevent E\nappendevent F",
                ScopeError::AlreadyOpen {
                    line: 2,
                    kind: ScopeKind::Event,
                    open: "E".into(),
                    name: "F".into(),
                },
            ),
            (
                "useractor enemy",
                ScopeError::MissingName {
                    line: 1,
                    keyword: "useractor".into(),
                },
            ),
        ];

        for (src, expected) in test_cases {
            let (_, result) = run(src);
            assert_eq!(result, Err(expected), "source {src:?}");
        }
    }
}
