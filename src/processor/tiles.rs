//! Turns resolved actor actions into marked tile ranges.

use super::closure::Closure;
use super::constants::ConstantTable;
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::model::{ActionDef, Operand, SymbolTables, TileBitmap, TileError};
use std::ops::Range;

/// Frames of one action: `framecount * viewtype` tiles laid out
/// contiguously from `tilenum + startframe`.
pub fn frame_range(
    tilenum: i64,
    startframe: i64,
    framecount: i64,
    viewtype: i64,
) -> Result<Range<i64>, TileError> {
    let overflow = || TileError::Overflow {
        tile: tilenum,
        startframe,
        framecount,
        viewtype,
    };
    let start = tilenum.checked_add(startframe).ok_or_else(overflow)?;
    let end = framecount
        .checked_mul(viewtype)
        .and_then(|len| start.checked_add(len))
        .ok_or_else(overflow)?;
    Ok(start..end)
}

/// Mark the frames of every action every actor can reach.
pub fn mark_actor_frames(
    closure: &Closure,
    symbols: &SymbolTables,
    constants: &ConstantTable,
    bitmap: &mut TileBitmap,
    diagnostics: &mut Diagnostics,
) {
    for (actor, actions) in &closure.actor_actions {
        let tilenum = Operand::parse(actor).resolve(constants);
        if tilenum.is_none() {
            diagnostics.push(
                DiagnosticKind::UnresolvedName,
                symbols.actor_origins.get(actor).cloned(),
                format!("actor name '{actor}' is unknown; its actions are skipped"),
            );
        }

        for name in actions {
            let Some(def) = symbols.actions.get(name) else {
                diagnostics.push(
                    DiagnosticKind::UndefinedAction,
                    symbols.actor_origins.get(actor).cloned(),
                    format!("undefined action '{name}' in actor '{actor}'"),
                );
                continue;
            };
            let Some(tilenum) = tilenum else {
                continue;
            };
            let Some([startframe, framecount, viewtype]) =
                resolve_operands(actor, def, constants, diagnostics)
            else {
                continue;
            };
            let marked = frame_range(tilenum, startframe, framecount, viewtype)
                .and_then(|range| bitmap.set_range(range));
            if let Err(err) = marked {
                diagnostics.push(
                    DiagnosticKind::TileOutOfRange,
                    Some(def.origin.clone()),
                    format!("action '{name}' of actor '{actor}': {err}"),
                );
            }
        }
    }

    tracing::info!(
        "Number of tiles that are part of actor frames: {}",
        bitmap.count()
    );
}

/// Resolve start frame, frame count and view type of `def`; each failure
/// is reported at the definition.
fn resolve_operands(
    actor: &str,
    def: &ActionDef,
    constants: &ConstantTable,
    diagnostics: &mut Diagnostics,
) -> Option<[i64; 3]> {
    let mut resolve = |operand: &Operand| {
        let value = operand.resolve(constants);
        if value.is_none() {
            diagnostics.push(
                DiagnosticKind::UnresolvedName,
                Some(def.origin.clone()),
                format!(
                    "name '{operand}' is unknown (action '{}' of actor '{actor}')",
                    def.name
                ),
            );
        }
        value
    };

    let startframe = resolve(&def.startframe);
    let framecount = resolve(&def.framecount);
    let viewtype = resolve(&def.viewtype);

    Some([startframe?, framecount?, viewtype?])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Location;
    use crate::model::relate;
    use std::collections::BTreeSet;
    use std::path::Path;

    fn def(name: &str, args: &[&str]) -> ActionDef {
        ActionDef::from_args(name, args, Location::new(Path::new("GAME.CON"), 7))
    }

    fn closure_of(actor: &str, actions: &[&str]) -> Closure {
        let mut closure = Closure::default();
        closure.actor_actions.insert(
            actor.to_string(),
            actions.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>(),
        );
        closure
    }

    fn mark(
        closure: &Closure,
        symbols: &SymbolTables,
        constants: &ConstantTable,
        maxtiles: usize,
    ) -> (TileBitmap, Diagnostics) {
        let mut bitmap = TileBitmap::new(maxtiles);
        let mut diags = Diagnostics::new();
        mark_actor_frames(closure, symbols, constants, &mut bitmap, &mut diags);
        (bitmap, diags)
    }

    #[test]
    fn test_frame_range() {
        let test_cases = vec![
            ((1000, 0, 4, 2), 1000..1008),
            ((5000, 0, 4, 1), 5000..5004),
            ((20, 5, 1, 1), 25..26),
            ((20, -5, 2, 5), 15..25),
            ((20, 0, -2, 1), 20..18),
        ];
        for ((tile, start, count, view), expected) in test_cases {
            assert_eq!(frame_range(tile, start, count, view), Ok(expected));
        }
    }

    #[test]
    fn test_frame_range_overflow() {
        let test_cases = vec![
            (i64::MAX, 1, 1, 1),
            (10, 0, i64::MAX, 2),
            (10, i64::MAX - 5, 4, 2),
            (i64::MIN, -1, 1, 1),
            (0, 0, i64::MIN, -1),
        ];
        for (tile, start, count, view) in test_cases {
            assert_eq!(
                frame_range(tile, start, count, view),
                Err(TileError::Overflow {
                    tile,
                    startframe: start,
                    framecount: count,
                    viewtype: view,
                })
            );
        }
    }

    #[test]
    fn test_marks_symbolic_actor() {
        let mut constants = ConstantTable::new();
        constants.insert("LIZTROOP", 1680);
        constants.insert("LIZFRAMES", 3);
        let mut symbols = SymbolTables::default();
        symbols
            .actions
            .insert("AWALK".into(), def("AWALK", &["0", "LIZFRAMES", "5"]));
        // zero start frame still marks
        symbols.actions.insert("ASTAND".into(), def("ASTAND", &["0"]));

        let closure = closure_of("LIZTROOP", &["AWALK", "ASTAND"]);
        let (bitmap, diags) = mark(&closure, &symbols, &constants, 4096);

        assert!(diags.is_empty(), "{diags:?}");
        assert_eq!(bitmap.count(), 15);
        assert!(bitmap.is_set(1680));
        assert!(bitmap.is_set(1694));
        assert!(!bitmap.is_set(1695));
    }

    #[test]
    fn test_failures_skip_only_that_action() {
        let constants = ConstantTable::new();
        let mut symbols = SymbolTables::default();
        symbols.actions.insert("AOK".into(), def("AOK", &["2", "2"]));
        symbols
            .actions
            .insert("ABAD".into(), def("ABAD", &["NOSUCHFRAME", "NOSUCHCOUNT"]));
        symbols.actions.insert("AHUGE".into(), def("AHUGE", &["0", "100"]));
        relate(&mut symbols.actor_actions, "10", "AOK");

        let closure = closure_of("10", &["AOK", "ABAD", "AHUGE", "AGHOST"]);
        let (bitmap, diags) = mark(&closure, &symbols, &constants, 64);

        assert_eq!(bitmap.marked().collect::<Vec<_>>(), vec![12, 13]);
        assert_eq!(diags.count(DiagnosticKind::UnresolvedName), 2);
        assert_eq!(diags.count(DiagnosticKind::TileOutOfRange), 1);
        assert_eq!(diags.count(DiagnosticKind::UndefinedAction), 1);

        let unresolved = diags
            .iter()
            .find(|d| d.kind == DiagnosticKind::UnresolvedName)
            .unwrap();
        assert_eq!(unresolved.location.as_ref().map(|l| l.line), Some(7));
        assert_eq!(
            unresolved.message,
            "name 'NOSUCHFRAME' is unknown (action 'ABAD' of actor '10')"
        );
    }

    #[test]
    fn test_unknown_actor_reported_once_at_header() {
        let constants = ConstantTable::new();
        let mut symbols = SymbolTables::default();
        for name in ["AWALK", "ARUN", "AJUMP"] {
            symbols.actions.insert(name.into(), def(name, &["0", "4"]));
        }
        symbols
            .actor_origins
            .insert("PIGCOP".into(), Location::new(Path::new("PIG.CON"), 3));
        let closure = closure_of("PIGCOP", &["AWALK", "ARUN", "AJUMP"]);
        let (bitmap, diags) = mark(&closure, &symbols, &constants, 64);

        assert_eq!(bitmap.count(), 0);
        assert_eq!(diags.len(), 1);
        let d = diags.iter().next().unwrap();
        assert_eq!(d.kind, DiagnosticKind::UnresolvedName);
        assert_eq!(d.location, Some(Location::new(Path::new("PIG.CON"), 3)));
    }

    #[test]
    fn test_extreme_values_are_diagnostics() {
        let mut constants = ConstantTable::new();
        constants.insert("HUGE", i64::MAX);
        constants.insert("TINY", i64::MIN);
        constants.insert("FARACTOR", i64::MAX - 1);
        let mut symbols = SymbolTables::default();
        symbols.actions.insert("AHUGE".into(), def("AHUGE", &["0", "HUGE", "2"]));
        symbols.actions.insert("ATINY".into(), def("ATINY", &["TINY", "1", "1"]));
        symbols.actions.insert("ABACK".into(), def("ABACK", &["0", "-4", "1"]));
        symbols.actions.insert("AVIEW".into(), def("AVIEW", &["0", "4", "-5"]));
        symbols.actions.insert("AOK".into(), def("AOK", &["1", "2"]));

        let mut closure = closure_of("10", &["AHUGE", "ATINY", "ABACK", "AVIEW", "AOK"]);
        closure
            .actor_actions
            .insert("FARACTOR".into(), ["AOK".to_string()].into());
        let (bitmap, diags) = mark(&closure, &symbols, &constants, 64);

        assert_eq!(bitmap.marked().collect::<Vec<_>>(), vec![11, 12]);
        assert_eq!(diags.len(), 5);
        assert_eq!(diags.count(DiagnosticKind::TileOutOfRange), 5);
    }

    #[test]
    fn test_zero_maxtiles() {
        let constants = ConstantTable::new();
        let mut symbols = SymbolTables::default();
        symbols.actions.insert("AWALK".into(), def("AWALK", &["0", "4"]));
        symbols.actions.insert("ANONE".into(), def("ANONE", &["0", "0"]));
        let closure = closure_of("0", &["AWALK", "ANONE"]);
        let (bitmap, diags) = mark(&closure, &symbols, &constants, 0);

        assert!(bitmap.is_empty());
        // an empty range fits even an empty bitmap
        assert_eq!(diags.count(DiagnosticKind::TileOutOfRange), 1);
    }
}
