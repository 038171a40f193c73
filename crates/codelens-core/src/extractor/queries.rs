//! Query-based extraction for grammars whose captures can express the
//! symbol/reference shapes directly: Python, JavaScript, TypeScript, TSX.
//!
//! Grounded on `arbor-core::parser_v2`'s `compile_*_queries` +
//! `extract_symbols`/`extract_imports`/`extract_calls`, generalized to run
//! through `ParserBridge::query` (cached-by-pattern) instead of a
//! per-language `CompiledQueries` struct, and extended with variable/const
//! declarations so the kind-normalization table in §4.2 is covered in
//! full, not just the function/class subset the teacher wired up.

use crate::bridge::ParserBridge;
use crate::error::Result;
use crate::model::{
    ExtractedReference, ExtractedSymbol, Language, ReferenceKind, SymbolKind, Visibility,
};
use std::collections::HashMap;

struct LanguagePatterns {
    /// Function/class/method definitions. Capture names equal the grammar
    /// node kind, matching §4.2's static table directly.
    symbols: &'static str,
    /// Lexical/variable declarations (const/let/var), kept separate
    /// because they need a sibling "name" capture per declarator.
    declarations: &'static str,
    calls: &'static str,
    imports: &'static str,
}

fn patterns_for(language: Language) -> LanguagePatterns {
    match language {
        Language::Python => LanguagePatterns {
            symbols: r#"
                (function_definition name: (identifier) @name) @function_definition
                (class_definition name: (identifier) @name) @class_definition
            "#,
            declarations: r#"
                (assignment left: (identifier) @name) @const
            "#,
            calls: r#"
                (call function: (identifier) @callee) @call
                (call function: (attribute object: (_) @module attribute: (identifier) @callee)) @qualified_call
            "#,
            imports: r#"
                (import_statement) @import
                (import_from_statement) @import
            "#,
        },
        Language::Javascript => LanguagePatterns {
            symbols: r#"
                (function_declaration name: (identifier) @name) @function_declaration
                (class_declaration name: (identifier) @name) @class_declaration
                (method_definition name: (property_identifier) @name) @method_definition
            "#,
            declarations: r#"
                (lexical_declaration (variable_declarator name: (identifier) @name)) @const
                (variable_declaration (variable_declarator name: (identifier) @name)) @var
            "#,
            calls: r#"
                (call_expression function: (identifier) @callee) @call
                (call_expression function: (member_expression object: (_) @module property: (property_identifier) @callee)) @qualified_call
                (new_expression constructor: (identifier) @callee) @new
            "#,
            imports: r#"
                (import_statement source: (string) @source) @import
            "#,
        },
        Language::Typescript | Language::Tsx => LanguagePatterns {
            symbols: r#"
                (function_declaration name: (identifier) @name) @function_declaration
                (class_declaration name: (type_identifier) @name) @class_declaration
                (method_definition name: (property_identifier) @name) @method_definition
            "#,
            declarations: r#"
                (lexical_declaration (variable_declarator name: (identifier) @name)) @const
                (variable_declaration (variable_declarator name: (identifier) @name)) @var
            "#,
            calls: r#"
                (call_expression function: (identifier) @callee) @call
                (call_expression function: (member_expression object: (_) @module property: (property_identifier) @callee)) @qualified_call
                (new_expression constructor: (identifier) @callee) @new
            "#,
            imports: r#"
                (import_statement source: (string) @source) @import
            "#,
        },
        Language::Elixir => unreachable!("Elixir uses the AST-walk extractor"),
    }
}

/// Maps a grammar node kind to the normalized vocabulary per §4.2's static
/// table.
fn normalize_symbol_kind(node_kind: &str) -> Option<SymbolKind> {
    match node_kind {
        "function_definition" | "async_function_definition" | "function_declaration" => {
            Some(SymbolKind::Function)
        }
        "class_definition" | "class_declaration" => Some(SymbolKind::Class),
        "method_definition" => Some(SymbolKind::Method),
        "const" => Some(SymbolKind::Constant),
        "var" => Some(SymbolKind::Variable),
        _ => None,
    }
}

fn visibility_for(name: &str, language: Language) -> Visibility {
    match language {
        // Python convention: a leading underscore marks "private".
        Language::Python => {
            if name.starts_with('_') {
                Visibility::Private
            } else {
                Visibility::Public
            }
        }
        // JS/TS/TSX have no visibility keyword at this syntactic level;
        // everything module-level is public unless named like a private
        // convention (#field, _name).
        _ => {
            if name.starts_with('_') || name.starts_with('#') {
                Visibility::Private
            } else {
                Visibility::Public
            }
        }
    }
}

pub fn extract(
    bridge: &ParserBridge,
    tree: &crate::bridge::ParsedTree,
    source: &str,
    language: Language,
) -> Result<(Vec<ExtractedSymbol>, Vec<ExtractedReference>)> {
    let patterns = patterns_for(language);
    let mut symbols = Vec::new();

    // Group captures by match using name+node-kind pairing: each pattern
    // emits a `@name` capture plus the whole-node capture named after the
    // grammar kind, in the same match.
    let symbol_matches = bridge.query(tree, patterns.symbols, source)?;
    group_name_and_node(&symbol_matches, |name_match, node_match| {
        if let Some(kind) = normalize_symbol_kind(&node_match.capture_name) {
            symbols.push(ExtractedSymbol {
                name: name_match.text.clone(),
                qualified_name: name_match.text.clone(),
                kind,
                language,
                visibility: visibility_for(&name_match.text, language),
                start_line: node_match.start_line,
                start_col: node_match.start_col,
                end_line: node_match.end_line,
                end_col: node_match.end_col,
                signature: source
                    .lines()
                    .nth((node_match.start_line - 1) as usize)
                    .map(|l| l.trim().to_string()),
                doc: None,
                metadata: serde_json::Value::Null,
                parent: None,
            });
        }
    });

    let decl_matches = bridge.query(tree, patterns.declarations, source)?;
    group_name_and_node(&decl_matches, |name_match, node_match| {
        if let Some(kind) = normalize_symbol_kind(&node_match.capture_name) {
            symbols.push(ExtractedSymbol {
                name: name_match.text.clone(),
                qualified_name: name_match.text.clone(),
                kind,
                language,
                visibility: visibility_for(&name_match.text, language),
                start_line: node_match.start_line,
                start_col: node_match.start_col,
                end_line: node_match.end_line,
                end_col: node_match.end_col,
                signature: None,
                doc: None,
                metadata: serde_json::Value::Null,
                parent: None,
            });
        }
    });

    let mut references = Vec::new();

    let call_matches = bridge.query(tree, patterns.calls, source)?;
    group_call_captures(&call_matches, |group| {
        let mut module: Option<String> = None;
        let mut callee = None;
        let mut whole = None;
        for cap in group {
            match cap.capture_name.as_str() {
                "module" => module = Some(cap.text.clone()),
                "callee" => callee = Some(*cap),
                "call" | "qualified_call" | "new" => whole = Some(*cap),
                _ => {}
            }
        }
        let (Some(callee), Some(whole)) = (callee, whole) else {
            return;
        };
        let kind = match whole.capture_name.as_str() {
            "qualified_call" => ReferenceKind::QualifiedCall,
            "new" => ReferenceKind::New,
            _ => ReferenceKind::Call,
        };
        references.push(ExtractedReference {
            name: callee.text.clone(),
            qualified_name: module.as_ref().map(|m| format!("{m}.{}", callee.text)),
            kind,
            language,
            line: whole.start_line,
            col: whole.start_col,
            end_line: Some(whole.end_line),
            end_col: Some(whole.end_col),
            target_module: module,
            metadata: serde_json::Value::Null,
            container: None,
        });
    });

    for m in bridge.query(tree, patterns.imports, source)? {
        if m.capture_name != "source" && m.capture_name != "import" {
            continue;
        }
        let module = m.text.trim_matches(|c| c == '"' || c == '\'').to_string();
        if module.is_empty() {
            continue;
        }
        references.push(ExtractedReference {
            name: module.clone(),
            qualified_name: Some(module),
            kind: ReferenceKind::Import,
            language,
            line: m.start_line,
            col: m.start_col,
            end_line: Some(m.end_line),
            end_col: Some(m.end_col),
            target_module: None,
            metadata: serde_json::Value::Null,
            container: None,
        });
    }

    Ok((symbols, references))
}

/// Tree-sitter emits one match per pattern alternative with all of that
/// alternative's captures grouped together. This pairs the `@name`
/// capture with the whole-node capture (named after the grammar kind) in
/// each match.
fn group_name_and_node(
    matches: &[crate::bridge::QueryMatch],
    mut on_pair: impl FnMut(&crate::bridge::QueryMatch, &crate::bridge::QueryMatch),
) {
    // `cursor.matches` yields captures already grouped per match in the
    // underlying bridge call, but QueryMatch is flattened; reconstruct
    // pairs by scanning consecutive entries that share a start position.
    let mut by_position: HashMap<(u32, u32), Vec<&crate::bridge::QueryMatch>> = HashMap::new();
    for m in matches {
        by_position
            .entry((m.start_line, m.start_col))
            .or_default()
            .push(m);
    }
    // This grouping only helps for single-capture matches; for paired
    // name+node captures we instead pair by proximity: a `name` capture is
    // immediately followed in the flattened list by its node capture.
    let mut iter = matches.iter().peekable();
    while let Some(m) = iter.next() {
        if m.capture_name == "name" {
            if let Some(&next) = iter.peek() {
                if next.capture_name != "name" {
                    on_pair(m, next);
                    iter.next();
                }
            }
        }
    }
    let _ = by_position;
}

/// Groups captures belonging to one call match together. Unlike symbol
/// patterns, call patterns have a variable number of captures per match (2
/// for a plain `@call`/`@new`, 3 for `@qualified_call`'s extra `@module`),
/// so pairing by position doesn't work; instead accumulate captures until
/// the whole-pattern capture (`call`/`qualified_call`/`new`) closes the
/// group, since that capture is always last in pattern declaration order.
fn group_call_captures<'a>(
    matches: &'a [crate::bridge::QueryMatch],
    mut on_group: impl FnMut(&[&'a crate::bridge::QueryMatch]),
) {
    let mut group: Vec<&'a crate::bridge::QueryMatch> = Vec::new();
    for m in matches {
        group.push(m);
        if matches!(m.capture_name.as_str(), "call" | "qualified_call" | "new") {
            on_group(&group);
            group.clear();
        }
    }
}
