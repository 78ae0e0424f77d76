//! Transitive action/AI reachability for every actor.

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::model::{Relation, SymbolTables};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Direct usage of a state merged with that of every state it can reach.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StateUsage {
    pub actions: BTreeSet<String>,
    pub ai: BTreeSet<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Closure {
    /// Actor name -> every action it can display.
    pub actor_actions: BTreeMap<String, BTreeSet<String>>,
    /// Defined actions that no actor reaches.
    pub unused_actions: BTreeSet<String>,
}

fn direct<'a>(relation: &'a Relation, owner: &str) -> impl Iterator<Item = &'a String> + 'a {
    relation.get(owner).into_iter().flatten()
}

/// Aggregate usage for `state` with an explicit worklist. Every state is
/// expanded at most once, so cycles terminate.
pub fn aggregate_state(symbols: &SymbolTables, state: &str) -> StateUsage {
    let mut usage = StateUsage::default();
    let mut visited = BTreeSet::from([state.to_string()]);
    let mut worklist = VecDeque::from([state.to_string()]);

    while let Some(current) = worklist.pop_front() {
        usage
            .actions
            .extend(direct(&symbols.state_actions, &current).cloned());
        usage.ai.extend(direct(&symbols.state_ai, &current).cloned());

        for next in direct(&symbols.state_states, &current) {
            if visited.insert(next.clone()) {
                worklist.push_back(next.clone());
            }
        }
    }
    usage
}

/// Aggregated usage for every state that appears in any state relation.
pub fn aggregate_states(symbols: &SymbolTables) -> BTreeMap<String, StateUsage> {
    let states: BTreeSet<&String> = symbols
        .state_actions
        .keys()
        .chain(symbols.state_ai.keys())
        .chain(symbols.state_states.keys())
        .collect();

    states
        .into_iter()
        .map(|state| (state.clone(), aggregate_state(symbols, state)))
        .collect()
}

/// Every actor named by an actor relation or an initial action binding.
pub fn actors(symbols: &SymbolTables) -> BTreeSet<String> {
    symbols
        .actor_actions
        .keys()
        .chain(symbols.actor_ai.keys())
        .chain(symbols.actor_states.keys())
        .chain(symbols.initial_actions.keys())
        .cloned()
        .collect()
}

/// Resolve the full action set of every actor. Unknown AI routines are
/// reported once per actor and contribute nothing.
pub fn resolve(symbols: &SymbolTables, diagnostics: &mut Diagnostics) -> Closure {
    let aggregated = aggregate_states(symbols);
    let empty = StateUsage::default();

    let mut closure = Closure::default();
    for actor in actors(symbols) {
        let mut actions: BTreeSet<String> = direct(&symbols.actor_actions, &actor).cloned().collect();
        let mut ai: BTreeSet<String> = direct(&symbols.actor_ai, &actor).cloned().collect();

        for state in direct(&symbols.actor_states, &actor) {
            let usage = aggregated.get(state).unwrap_or(&empty);
            actions.extend(usage.actions.iter().cloned());
            ai.extend(usage.ai.iter().cloned());
        }

        if let Some(initial) = symbols.initial_actions.get(&actor) {
            actions.insert(initial.clone());
        }

        for name in &ai {
            match symbols.ai.get(name) {
                Some(Some(action)) => {
                    actions.insert(action.clone());
                }
                Some(None) => {}
                None => diagnostics.push(
                    DiagnosticKind::UndefinedAi,
                    None,
                    format!("undefined ai '{name}' in actor '{actor}'"),
                ),
            }
        }

        closure.actor_actions.insert(actor, actions);
    }

    let reachable: BTreeSet<&String> = closure.actor_actions.values().flatten().collect();
    closure.unused_actions = symbols
        .actions
        .keys()
        .filter(|name| !reachable.contains(name))
        .cloned()
        .collect();

    for name in &closure.unused_actions {
        diagnostics.push(
            DiagnosticKind::UnusedAction,
            None,
            format!("action '{name}' is never used"),
        );
    }

    tracing::info!(
        "Resolved {} actors, {} unused actions",
        closure.actor_actions.len(),
        closure.unused_actions.len()
    );
    closure
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::relate;

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    /// A -> S1 -> S2 -> S1, S1 uses X, S2 uses Y.
    fn cyclic() -> SymbolTables {
        let mut symbols = SymbolTables::default();
        relate(&mut symbols.actor_states, "A", "S1");
        relate(&mut symbols.state_states, "S1", "S2");
        relate(&mut symbols.state_states, "S2", "S1");
        relate(&mut symbols.state_actions, "S1", "X");
        relate(&mut symbols.state_actions, "S2", "Y");
        relate(&mut symbols.actor_actions, "A", "Z");
        symbols
    }

    #[test]
    fn test_cycle_terminates() {
        let symbols = cyclic();
        let mut diags = Diagnostics::new();
        let closure = resolve(&symbols, &mut diags);
        assert_eq!(closure.actor_actions["A"], set(&["X", "Y", "Z"]));
        assert!(diags.is_empty());
    }

    #[test]
    fn test_closure_is_idempotent() {
        let symbols = cyclic();
        let first = aggregate_states(&symbols);
        let second = aggregate_states(&symbols);
        assert_eq!(first, second);
        assert_eq!(first["S1"].actions, set(&["X", "Y"]));
        assert_eq!(first["S2"].actions, set(&["X", "Y"]));
    }

    #[test]
    fn test_self_loop_and_single_letter_names() {
        // a state named like one character of another state must not be
        // treated as visited
        let mut symbols = SymbolTables::default();
        relate(&mut symbols.state_states, "ab", "ab");
        relate(&mut symbols.state_states, "ab", "a");
        relate(&mut symbols.state_actions, "a", "AFROMA");
        let usage = aggregate_state(&symbols, "ab");
        assert_eq!(usage.actions, set(&["AFROMA"]));
    }

    #[test]
    fn test_ai_resolution() {
        let mut symbols = SymbolTables::default();
        symbols.ai.insert("AIWALK".into(), Some("AWALK".into()));
        symbols.ai.insert("AINONE".into(), None);
        relate(&mut symbols.actor_ai, "HERO", "AIWALK");
        relate(&mut symbols.actor_ai, "HERO", "AINONE");
        relate(&mut symbols.actor_ai, "HERO", "AIMISSING");
        relate(&mut symbols.actor_states, "HERO", "s");
        relate(&mut symbols.state_ai, "s", "AIMISSING");

        let mut diags = Diagnostics::new();
        let closure = resolve(&symbols, &mut diags);

        assert_eq!(closure.actor_actions["HERO"], set(&["AWALK"]));
        assert_eq!(diags.count(DiagnosticKind::UndefinedAi), 1);
        assert_eq!(
            diags.iter().next().unwrap().message,
            "undefined ai 'AIMISSING' in actor 'HERO'"
        );
    }

    #[test]
    fn test_initial_action_and_unused() {
        use crate::diagnostics::Location;
        use crate::model::ActionDef;
        use std::path::Path;

        let mut symbols = SymbolTables::default();
        for name in ["AIDLE", "AUNUSED", "ASTATE"] {
            let def = ActionDef::from_args(name, &["0"], Location::new(Path::new("x.con"), 1));
            symbols.actions.insert(name.into(), def);
        }
        symbols.initial_actions.insert("1000".into(), "AIDLE".into());
        relate(&mut symbols.actor_states, "1000", "idle");
        relate(&mut symbols.state_actions, "idle", "ASTATE");
        // a state nobody includes keeps its action unused
        relate(&mut symbols.state_actions, "orphan", "AUNUSED");

        let mut diags = Diagnostics::new();
        let closure = resolve(&symbols, &mut diags);

        assert_eq!(closure.actor_actions["1000"], set(&["AIDLE", "ASTATE"]));
        assert_eq!(closure.unused_actions, set(&["AUNUSED"]));
        assert_eq!(diags.count(DiagnosticKind::UnusedAction), 1);
    }

    #[test]
    fn test_actor_calling_unknown_state() {
        let mut symbols = SymbolTables::default();
        relate(&mut symbols.actor_states, "A", "nowhere");
        let mut diags = Diagnostics::new();
        let closure = resolve(&symbols, &mut diags);
        assert!(closure.actor_actions["A"].is_empty());
    }
}
