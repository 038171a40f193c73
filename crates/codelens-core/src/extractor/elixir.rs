//! AST-walk extraction for Elixir.
//!
//! Grounded on `arbor-core::languages::go`'s recursive `extract_from_node`
//! walk (match on `node.kind()`, recurse into every child), generalized
//! because Elixir's grammar doesn't give `def`/`defmodule`/`defmacro` their
//! own node kinds: they're plain `call` nodes whose `target` identifier
//! happens to be the text "def", "defp", etc, with the name and body
//! living in the call's `arguments` and trailing `do_block`.

use crate::model::{
    ExtractedReference, ExtractedSymbol, Language, ReferenceKind, SymbolKind, Visibility,
};
use tree_sitter::Node;

struct Ctx<'a> {
    source: &'a str,
    symbols: Vec<ExtractedSymbol>,
    references: Vec<ExtractedReference>,
}

pub fn extract(source: &str, root: Node) -> (Vec<ExtractedSymbol>, Vec<ExtractedReference>) {
    let mut ctx = Ctx {
        source,
        symbols: Vec::new(),
        references: Vec::new(),
    };
    walk(&root, &mut ctx, None);
    (ctx.symbols, ctx.references)
}

fn text(node: &Node, source: &str) -> String {
    node.utf8_text(source.as_bytes()).unwrap_or("").to_string()
}

fn line_of(node: &Node) -> u32 {
    node.start_position().row as u32 + 1
}

fn walk(node: &Node, ctx: &mut Ctx, parent: Option<usize>) {
    match node.kind() {
        "call" => {
            if let Some(target) = node.child_by_field_name("target") {
                let keyword = text(&target, ctx.source);
                match keyword.as_str() {
                    "defmodule" => {
                        extract_defmodule(node, ctx, parent);
                        return;
                    }
                    "def" | "defp" | "defmacro" | "defmacrop" => {
                        extract_def(node, ctx, &keyword, parent);
                        return;
                    }
                    "alias" | "import" | "use" | "require" => {
                        extract_directive(node, ctx, &keyword, parent);
                    }
                    _ => {
                        extract_call_reference(node, ctx, &target, parent);
                    }
                }
            }
        }
        "dot" => {
            // `Module.function(...)` not wrapped in a surrounding `call`
            // happens for remote references without arguments.
        }
        _ => {}
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk(&child, ctx, parent);
    }
}

/// `defmodule Foo.Bar do ... end` — the module name is an `alias` node
/// inside the call's `arguments`; the `do_block` holds the body, which we
/// recurse into with this module registered as the parent for containment.
fn extract_defmodule(node: &Node, ctx: &mut Ctx, parent: Option<usize>) {
    let Some(arguments) = node.child_by_field_name("arguments") else {
        return;
    };
    let Some(alias_node) = first_child_of_kind(&arguments, "alias") else {
        return;
    };
    let name = text(&alias_node, ctx.source);

    let qualified_name = match parent.and_then(|p| ctx.symbols.get(p)) {
        Some(parent_symbol) => format!("{}.{}", parent_symbol.qualified_name, name),
        None => name.clone(),
    };

    let index = ctx.symbols.len();
    ctx.symbols.push(ExtractedSymbol {
        name,
        qualified_name,
        kind: SymbolKind::Module,
        language: Language::Elixir,
        visibility: Visibility::Public,
        start_line: line_of(node),
        start_col: node.start_position().column as u32,
        end_line: node.end_position().row as u32 + 1,
        end_col: node.end_position().column as u32,
        signature: None,
        doc: None,
        metadata: serde_json::Value::Null,
        parent,
    });

    if let Some(do_block) = node.child_by_field_name("do") {
        let mut cursor = do_block.walk();
        for child in do_block.children(&mut cursor) {
            walk(&child, ctx, Some(index));
        }
    } else {
        // Some grammar shapes attach `do_block` as a trailing positional
        // child rather than a named field.
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() == "do_block" {
                let mut inner = child.walk();
                for grandchild in child.children(&mut inner) {
                    walk(&grandchild, ctx, Some(index));
                }
            }
        }
    }
}

/// `def name(args) do ... end` / `defp`/`defmacro`/`defmacrop`. The head
/// (`name(args)`) is itself a nested `call` node inside `arguments` when
/// the function takes parameters, or a bare `identifier` when it takes
/// none.
fn extract_def(node: &Node, ctx: &mut Ctx, keyword: &str, parent: Option<usize>) {
    let Some(arguments) = node.child_by_field_name("arguments") else {
        return;
    };
    let Some(head) = arguments.named_child(0) else {
        return;
    };

    let (name_node, signature) = match head.kind() {
        "call" => {
            let Some(name_node) = head.child_by_field_name("target") else {
                return;
            };
            (name_node, Some(text(&head, ctx.source)))
        }
        "identifier" => (head, None),
        "binary_operator" => {
            // `def foo(x) when guard`
            let Some(left) = head.child_by_field_name("left") else {
                return;
            };
            if left.kind() == "call" {
                let Some(name_node) = left.child_by_field_name("target") else {
                    return;
                };
                (name_node, Some(text(&left, ctx.source)))
            } else {
                (left, None)
            }
        }
        _ => return,
    };

    let name = text(&name_node, ctx.source);
    let kind = match keyword {
        "def" | "defp" => SymbolKind::Function,
        "defmacro" | "defmacrop" => SymbolKind::Macro,
        _ => SymbolKind::Function,
    };
    let visibility = if keyword.ends_with('p') {
        Visibility::Private
    } else {
        Visibility::Public
    };

    let qualified_name = match parent.and_then(|p| ctx.symbols.get(p)) {
        Some(parent_symbol) => format!("{}.{}", parent_symbol.qualified_name, name),
        None => name.clone(),
    };

    let index = ctx.symbols.len();
    ctx.symbols.push(ExtractedSymbol {
        name,
        qualified_name,
        kind,
        language: Language::Elixir,
        visibility,
        start_line: line_of(node),
        start_col: node.start_position().column as u32,
        end_line: node.end_position().row as u32 + 1,
        end_col: node.end_position().column as u32,
        signature,
        doc: None,
        metadata: serde_json::Value::Null,
        parent,
    });

    if let Some(do_block) = node.child_by_field_name("do") {
        let mut cursor = do_block.walk();
        for child in do_block.children(&mut cursor) {
            walk(&child, ctx, Some(index));
        }
    } else {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() == "do_block" {
                let mut inner = child.walk();
                for grandchild in child.children(&mut inner) {
                    walk(&grandchild, ctx, Some(index));
                }
            }
        }
    }
}

/// `alias Foo.Bar`, `import Foo`, `use Foo`, `require Foo` — all modeled
/// as references (usage sites), never as symbols.
fn extract_directive(node: &Node, ctx: &mut Ctx, keyword: &str, parent: Option<usize>) {
    let Some(arguments) = node.child_by_field_name("arguments") else {
        return;
    };
    let Some(target) = first_child_of_kind(&arguments, "alias") else {
        return;
    };
    let module = text(&target, ctx.source);

    let kind = match keyword {
        "alias" => ReferenceKind::Alias,
        "import" => ReferenceKind::Import,
        "use" => ReferenceKind::Use,
        "require" => ReferenceKind::Require,
        _ => return,
    };

    ctx.references.push(ExtractedReference {
        name: module.clone(),
        qualified_name: Some(module),
        kind,
        language: Language::Elixir,
        line: line_of(node),
        col: node.start_position().column as u32,
        end_line: Some(node.end_position().row as u32 + 1),
        end_col: Some(node.end_position().column as u32),
        target_module: None,
        metadata: serde_json::Value::Null,
        container: parent,
    });
}

/// A plain `foo(...)` or `Module.foo(...)` call. Dotted calls split into
/// `name` + `target_module`, classified as a qualified call.
fn extract_call_reference(node: &Node, ctx: &mut Ctx, target: &Node, parent: Option<usize>) {
    if target.kind() == "dot" {
        let Some(left) = target.child_by_field_name("left") else {
            return;
        };
        let Some(right) = target.child_by_field_name("right") else {
            return;
        };
        let name = text(&right, ctx.source);
        let module = text(&left, ctx.source);
        ctx.references.push(ExtractedReference {
            name,
            qualified_name: None,
            kind: ReferenceKind::QualifiedCall,
            language: Language::Elixir,
            line: line_of(node),
            col: node.start_position().column as u32,
            end_line: Some(node.end_position().row as u32 + 1),
            end_col: Some(node.end_position().column as u32),
            target_module: Some(module),
            metadata: serde_json::Value::Null,
            container: parent,
        });
    } else if target.kind() == "identifier" {
        let name = text(target, ctx.source);
        ctx.references.push(ExtractedReference {
            name,
            qualified_name: None,
            kind: ReferenceKind::Call,
            language: Language::Elixir,
            line: line_of(node),
            col: node.start_position().column as u32,
            end_line: Some(node.end_position().row as u32 + 1),
            end_col: Some(node.end_position().column as u32),
            target_module: None,
            metadata: serde_json::Value::Null,
            container: parent,
        });
    }
}

fn first_child_of_kind<'a>(node: &Node<'a>, kind: &str) -> Option<Node<'a>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).find(|c| c.kind() == kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tree_sitter::Parser;

    fn parse(source: &str) -> tree_sitter::Tree {
        let mut parser = Parser::new();
        parser.set_language(&tree_sitter_elixir::language()).unwrap();
        parser.parse(source, None).unwrap()
    }

    #[test]
    fn extracts_module_and_function() {
        let source = "defmodule Foo do\n  def bar(x) do\n    x\n  end\nend\n";
        let tree = parse(source);
        let (symbols, _) = extract(source, tree.root_node());

        let module = symbols.iter().find(|s| s.name == "Foo").unwrap();
        assert_eq!(module.kind, SymbolKind::Module);

        let func = symbols.iter().find(|s| s.name == "bar").unwrap();
        assert_eq!(func.kind, SymbolKind::Function);
        assert_eq!(func.qualified_name, "Foo.bar");
        assert_eq!(func.visibility, Visibility::Public);
    }

    #[test]
    fn private_function_is_marked_private() {
        let source = "defmodule Foo do\n  defp helper do\n    :ok\n  end\nend\n";
        let tree = parse(source);
        let (symbols, _) = extract(source, tree.root_node());
        let func = symbols.iter().find(|s| s.name == "helper").unwrap();
        assert_eq!(func.visibility, Visibility::Private);
    }

    #[test]
    fn alias_is_a_reference_not_a_symbol() {
        let source = "defmodule Foo do\n  alias Bar.Baz\nend\n";
        let tree = parse(source);
        let (symbols, references) = extract(source, tree.root_node());
        assert!(symbols.iter().all(|s| s.name != "Baz"));
        let r = references.iter().find(|r| r.kind == ReferenceKind::Alias).unwrap();
        assert_eq!(r.name, "Bar.Baz");
    }

    #[test]
    fn qualified_call_splits_module_and_name() {
        let source = "defmodule Foo do\n  def bar do\n    IO.puts(\"hi\")\n  end\nend\n";
        let tree = parse(source);
        let (_, references) = extract(source, tree.root_node());
        let call = references
            .iter()
            .find(|r| r.kind == ReferenceKind::QualifiedCall)
            .unwrap();
        assert_eq!(call.name, "puts");
        assert_eq!(call.target_module.as_deref(), Some("IO"));
    }
}
