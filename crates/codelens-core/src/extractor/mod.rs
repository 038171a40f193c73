//! Symbol/reference extraction (§4.2): turns a parsed tree into the
//! intermediate `ExtractedSymbol`/`ExtractedReference` lists the Store
//! will later persist.
//!
//! Two strategies live side by side, chosen by grammar shape: a
//! query-based extractor (`queries`) for grammars where Tree-sitter
//! captures already express the symbol shapes directly, and an AST-walk
//! extractor (`elixir`) for the one grammar where they don't. Both hand
//! their raw output through the same containment-resolution pass here so
//! the Store never has to know which strategy produced a batch.

mod elixir;
mod queries;

use crate::bridge::{ParsedTree, ParserBridge};
use crate::error::Result;
use crate::model::{ExtractedReference, ExtractedSymbol, Language, SymbolKind};

/// Extracts every symbol and reference from `source`, already parsed into
/// `tree`.
///
/// `parent`/`container` on the returned items are always resolved here,
/// regardless of whether the underlying strategy supplied hints: the
/// query-based extractor doesn't track containment at all, and the
/// Elixir walker only threads it through `defmodule`/`def` nesting, not
/// through arbitrary blocks. Resolution falls back to the smallest
/// strictly-containing definition when no hint was given.
pub fn extract(
    bridge: &ParserBridge,
    tree: &ParsedTree,
    source: &str,
) -> Result<(Vec<ExtractedSymbol>, Vec<ExtractedReference>)> {
    let (mut symbols, mut references) = match tree.language {
        Language::Elixir => elixir::extract(source, tree.tree().root_node()),
        other => queries::extract(bridge, tree, source, other)?,
    };

    resolve_containment(&mut symbols, &mut references);
    resolve_qualified_names(&mut symbols);
    dedup_references(&mut references);

    Ok((symbols, references))
}

/// Fills in any `parent`/`container` left as `None` by picking the
/// smallest symbol whose range strictly contains the item's start
/// position. "Smallest" means: among all containing candidates, the one
/// with the tightest span, so a method nested in a class resolves to the
/// method's class, not the file-level module if one exists.
fn resolve_containment(symbols: &mut [ExtractedSymbol], references: &mut [ExtractedReference]) {
    // Built once: index, (start_line, start_col, end_line, end_col) for
    // every symbol, sorted so the smallest ranges come first. Cloning
    // positions avoids holding two mutable/immutable borrows of `symbols`
    // at once while patching `parent` in place.
    let mut candidates: Vec<(usize, u32, u32, u32, u32)> = symbols
        .iter()
        .enumerate()
        .map(|(i, s)| (i, s.start_line, s.start_col, s.end_line, s.end_col))
        .collect();
    candidates.sort_by_key(|&(_, sl, sc, el, ec)| {
        // span size as a rough ordering key: larger (end - start) sorts later.
        ((el as i64 - sl as i64), (ec as i64 - sc as i64))
    });

    for i in 0..symbols.len() {
        if symbols[i].parent.is_some() {
            continue;
        }
        let (sl, sc, el, ec) = (
            symbols[i].start_line,
            symbols[i].start_col,
            symbols[i].end_line,
            symbols[i].end_col,
        );
        let found = candidates.iter().find(|&&(j, osl, osc, oel, oec)| {
            j != i && (osl, osc) < (sl, sc) && (el, ec) < (oel, oec)
        });
        if let Some(&(j, ..)) = found {
            symbols[i].parent = Some(j);
        }
    }

    for r in references.iter_mut() {
        if r.container.is_some() {
            continue;
        }
        let found = candidates.iter().find(|&&(j, osl, osc, oel, oec)| {
            (osl, osc) < (r.line, r.col) && (r.line, r.col) < (oel, oec)
        });
        if let Some(&(j, ..)) = found {
            r.container = Some(j);
        }
    }
}

/// Computes `qualified_name` for every symbol the query-based extractors
/// produced (§4.2): they never supply a parent hint, so `qualified_name`
/// starts out equal to the bare `name`. The Elixir walker already computes
/// it correctly by threading the parent's already-qualified name through
/// recursion as it builds each symbol, so those are left untouched here.
///
/// The fallback rule is single-level, not recursive: find the smallest
/// symbol strictly containing this one, restricted to a `Module` or `Class`
/// kind and whose own name differs from this symbol's, and qualify as
/// `"{container.name}.{name}"` using the container's bare name.
fn resolve_qualified_names(symbols: &mut [ExtractedSymbol]) {
    let spans: Vec<(u32, u32, u32, u32)> = symbols
        .iter()
        .map(|s| (s.start_line, s.start_col, s.end_line, s.end_col))
        .collect();

    for i in 0..symbols.len() {
        if symbols[i].language == Language::Elixir {
            continue;
        }
        let (sl, sc, el, ec) = spans[i];
        let mut container: Option<usize> = None;
        for (j, &(osl, osc, oel, oec)) in spans.iter().enumerate() {
            if j == i || !matches!(symbols[j].kind, SymbolKind::Module | SymbolKind::Class) {
                continue;
            }
            if symbols[j].name == symbols[i].name {
                continue;
            }
            if !((osl, osc) < (sl, sc) && (el, ec) < (oel, oec)) {
                continue;
            }
            let is_smaller = match container {
                Some(c) => {
                    let (csl, csc, cel, cec) = spans[c];
                    (oel as i64 - osl as i64, oec as i64 - osc as i64)
                        < (cel as i64 - csl as i64, cec as i64 - csc as i64)
                }
                None => true,
            };
            if is_smaller {
                container = Some(j);
            }
        }

        if let Some(c) = container {
            symbols[i].qualified_name = format!("{}.{}", symbols[c].name, symbols[i].name);
        }
    }
}

/// Query-based extraction can emit the same capture twice when a pattern
/// has overlapping alternatives (e.g. a call that also matches a
/// qualified-call shape). Dedup on position + name, keeping the first.
fn dedup_references(references: &mut Vec<ExtractedReference>) {
    let mut seen = std::collections::HashSet::new();
    references.retain(|r| seen.insert((r.line, r.col, r.name.clone())));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Language, SymbolKind, Visibility};

    fn symbol(name: &str, sl: u32, sc: u32, el: u32, ec: u32) -> ExtractedSymbol {
        ExtractedSymbol {
            name: name.to_string(),
            qualified_name: name.to_string(),
            kind: SymbolKind::Function,
            language: Language::Python,
            visibility: Visibility::Public,
            start_line: sl,
            start_col: sc,
            end_line: el,
            end_col: ec,
            signature: None,
            doc: None,
            metadata: serde_json::Value::Null,
            parent: None,
        }
    }

    fn symbol_of_kind(name: &str, kind: SymbolKind, sl: u32, sc: u32, el: u32, ec: u32) -> ExtractedSymbol {
        ExtractedSymbol {
            kind,
            ..symbol(name, sl, sc, el, ec)
        }
    }

    #[test]
    fn resolves_tightest_containing_symbol() {
        let mut symbols = vec![
            symbol("Outer", 1, 0, 20, 0),
            symbol("Inner", 5, 2, 8, 2),
            symbol("method", 6, 4, 7, 4),
        ];
        let mut references = vec![];
        resolve_containment(&mut symbols, &mut references);
        assert_eq!(symbols[2].parent, Some(1));
        assert_eq!(symbols[1].parent, Some(0));
    }

    #[test]
    fn dedup_drops_exact_duplicate_positions() {
        use crate::model::ReferenceKind;
        let make = || ExtractedReference {
            name: "foo".into(),
            qualified_name: None,
            kind: ReferenceKind::Call,
            language: Language::Python,
            line: 3,
            col: 4,
            end_line: None,
            end_col: None,
            target_module: None,
            metadata: serde_json::Value::Null,
            container: None,
        };
        let mut references = vec![make(), make()];
        dedup_references(&mut references);
        assert_eq!(references.len(), 1);
    }

    #[test]
    fn qualified_name_uses_bare_container_name_one_level() {
        let mut symbols = vec![
            symbol_of_kind("Widget", SymbolKind::Class, 1, 0, 20, 0),
            symbol_of_kind("render", SymbolKind::Method, 5, 2, 8, 2),
        ];
        resolve_containment(&mut symbols, &mut vec![]);
        resolve_qualified_names(&mut symbols);
        assert_eq!(symbols[1].qualified_name, "Widget.render");
        assert_eq!(symbols[0].qualified_name, "Widget");
    }

    #[test]
    fn qualified_name_skips_elixir_symbols() {
        let mut symbols = vec![ExtractedSymbol {
            language: Language::Elixir,
            qualified_name: "MyApp.Widget.render".to_string(),
            ..symbol_of_kind("render", SymbolKind::Method, 5, 2, 8, 2)
        }];
        resolve_qualified_names(&mut symbols);
        assert_eq!(symbols[0].qualified_name, "MyApp.Widget.render");
    }
}
