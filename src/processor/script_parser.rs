//! Declaration collector: walks the script corpus and fills `SymbolTables`.
//!
//! Every file goes through two passes. The header pass looks at whole
//! cleaned lines and picks up full `action` definitions, `ai` bindings and
//! the initial action of `actor`/`useractor` headers. The token pass feeds
//! everything else through a `ScopeTracker` and attributes `action`, `ai`
//! and `state` references to the enclosing actor or state.

use super::constants::is_literal;
use super::lexer::{Lexer, Preprocessor, Token, TokenStream, words};
use super::scope::{Caller, ScopeError, ScopeKind, ScopeTracker, Transition};
use crate::diagnostics::{DiagnosticKind, Diagnostics, Location};
use crate::model::{ActionDef, ScriptSource, SymbolTables, relate};
use std::path::Path;

pub fn parse_scripts(
    scripts: &[ScriptSource],
    symbols: &mut SymbolTables,
    diagnostics: &mut Diagnostics,
) {
    for script in scripts {
        parse_source(&script.path, &script.text, symbols, diagnostics);
    }
}

/// Collect declarations from one file. Scope state starts fresh; the
/// symbol tables keep accumulating.
pub fn parse_source(
    path: &Path,
    text: &str,
    symbols: &mut SymbolTables,
    diagnostics: &mut Diagnostics,
) {
    let mut pre = Preprocessor::new();
    let mut tokens = Vec::<Token>::new();
    let mut line_count = 0;

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx as u32 + 1;
        line_count = line_no;
        let cleaned = pre.clean(raw);
        if cleaned.is_empty() {
            continue;
        }
        if read_header(&cleaned, Location::new(path, line_no), symbols) {
            continue;
        }
        tokens.extend(Lexer::new(&cleaned, line_no));
    }

    let token_count = tokens.len();
    let mut parser = Parser {
        tokens: tokens.into_iter().peekable(),
        scopes: ScopeTracker::new(),
        symbols,
        origin: path,
    };
    if let Err(err) = parser.run() {
        let message = match err {
            ScopeError::Unclosed { .. } => err.to_string(),
            _ => format!("{err}; rest of file skipped"),
        };
        diagnostics.at(
            DiagnosticKind::ScopeViolation,
            path,
            err.line().unwrap_or(line_count),
            message,
        );
    }

    tracing::info!("Parsed file {} ({} tokens)", path.display(), token_count);
}

/// Handle the line-level forms. Returns `true` when the line is a full
/// action definition and must be kept out of the token stream.
fn read_header(line: &str, origin: Location, symbols: &mut SymbolTables) -> bool {
    let fields = words(line);
    let field = |i: usize| fields.get(i).map(String::as_str);

    match field(0) {
        // action NAME <literal start> [framecount [viewtype]]
        Some("action") if fields.len() >= 3 && is_literal(&fields[2]) => {
            let args: Vec<&str> = fields[2..].iter().map(String::as_str).collect();
            let def = ActionDef::from_args(&fields[1], &args, origin);
            symbols.actions.insert(def.name.clone(), def);
            true
        }
        // ai NAME ACTION
        Some("ai") if fields.len() >= 3 && is_constant_like(&fields[2]) => {
            symbols
                .ai
                .insert(fields[1].clone(), action_ref(&fields[2]));
            false
        }
        // actor NAME STRENGTH ACTION
        Some("actor") if fields.len() >= 4 && all_constant_like(&fields[2..4]) => {
            bind_initial_action(symbols, &fields[1], &fields[3], origin);
            false
        }
        // useractor TYPE NAME STRENGTH ACTION
        Some("useractor") if fields.len() >= 5 && all_constant_like(&fields[3..5]) => {
            bind_initial_action(symbols, &fields[2], &fields[4], origin);
            false
        }
        _ => false,
    }
}

fn bind_initial_action(symbols: &mut SymbolTables, actor: &str, action: &str, origin: Location) {
    if let Some(action) = action_ref(action) {
        symbols
            .initial_actions
            .insert(actor.to_string(), action);
    }
    symbols
        .actor_origins
        .entry(actor.to_string())
        .or_insert(origin);
}

/// An action argument; numeric literals mean "no action".
fn action_ref(word: &str) -> Option<String> {
    (!is_literal(word)).then(|| word.to_string())
}

/// Upper-case names, digits and underscores, optionally negated.
fn is_constant_like(word: &str) -> bool {
    let body = word.strip_prefix('-').unwrap_or(word);
    !body.is_empty()
        && body
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

fn all_constant_like(words: &[String]) -> bool {
    words.iter().all(|w| is_constant_like(w))
}

struct Parser<'a> {
    tokens: TokenStream,
    scopes: ScopeTracker,
    symbols: &'a mut SymbolTables,
    origin: &'a Path,
}

impl<'a> Parser<'a> {
    fn run(&mut self) -> Result<(), ScopeError> {
        while let Some(token) = self.tokens.next() {
            match self.scopes.step(&token, &mut self.tokens)? {
                Transition::StateCall { caller, state } => self.state_call(caller, &state),
                Transition::Unchanged => self.directive(&token),
                Transition::Opened(ScopeKind::Actor, actor) => {
                    self.symbols
                        .actor_origins
                        .entry(actor)
                        .or_insert_with(|| Location::new(self.origin, token.line));
                }
                Transition::Opened(..) | Transition::Closed(..) => {}
            }
        }
        self.scopes.finish()
    }

    fn directive(&mut self, token: &Token) {
        match token.word.as_str() {
            "action" => self.action(token),
            "ai" => self.ai(token),
            _ => {}
        }
    }

    fn action(&mut self, keyword: &Token) {
        let Some(name) = self.tokens.next() else {
            return;
        };
        if let Some(actor) = self.scopes.actor() {
            if let Some(action) = action_ref(&name.word) {
                relate(&mut self.symbols.actor_actions, actor, &action);
            }
        } else if let Some(state) = self.scopes.state() {
            if let Some(action) = action_ref(&name.word) {
                relate(&mut self.symbols.state_actions, state, &action);
            }
        } else if self.scopes.event().is_none() && !is_literal(&name.word) {
            // Bare definition: never replaces a full one.
            let args = self.same_line_args(keyword.line, 3);
            let args: Vec<&str> = args.iter().map(String::as_str).collect();
            let origin = Location::new(self.origin, keyword.line);
            self.symbols
                .actions
                .entry(name.word.clone())
                .or_insert_with(|| ActionDef::from_args(&name.word, &args, origin));
        }
    }

    fn ai(&mut self, keyword: &Token) {
        let Some(name) = self.tokens.next() else {
            return;
        };
        if let Some(actor) = self.scopes.actor() {
            relate(&mut self.symbols.actor_ai, actor, &name.word);
        } else if let Some(state) = self.scopes.state() {
            relate(&mut self.symbols.state_ai, state, &name.word);
        } else if self.scopes.event().is_none() {
            let action = self
                .same_line_args(keyword.line, 1)
                .pop()
                .and_then(|a| action_ref(&a));
            self.symbols.ai.entry(name.word).or_insert(action);
        }
    }

    fn state_call(&mut self, caller: Caller, state: &str) {
        match caller {
            Caller::Actor(actor) => relate(&mut self.symbols.actor_states, &actor, state),
            Caller::State(owner) => relate(&mut self.symbols.state_states, &owner, state),
            Caller::Event(_) => {}
        }
    }

    /// Up to `max` further tokens from the keyword's own line.
    fn same_line_args(&mut self, line: u32, max: usize) -> Vec<String> {
        let mut args = Vec::new();
        while args.len() < max {
            match self.tokens.next_if(|t| t.line == line) {
                Some(t) => args.push(t.word),
                None => break,
            }
        }
        args
    }
}
