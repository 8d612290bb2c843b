//! Swift-source -> symbols/imports converter (spec §4.1).
//!
//! Parses Swift source with `tree-sitter-swift` and walks the resulting
//! concrete syntax tree to emit [`ExtractedSymbol`]/[`ExtractedImport`]
//! records. Parser errors never abort extraction: symbols parsed before the
//! error site are still returned, with `has_errors` set.

use tree_sitter::{Node, Parser};

use crate::models::{ExtractedFile, ExtractedImport, ExtractedSymbol, SymbolKind};

/// Parse `source` and extract its declarations and imports.
pub fn extract(source: &str) -> ExtractedFile {
    let mut parser = Parser::new();
    if parser.set_language(&tree_sitter_swift::LANGUAGE.into()).is_err() {
        return ExtractedFile {
            has_errors: true,
            ..Default::default()
        };
    }

    let Some(tree) = parser.parse(source, None) else {
        return ExtractedFile {
            has_errors: true,
            ..Default::default()
        };
    };

    let root = tree.root_node();
    let mut out = ExtractedFile::default();
    out.has_errors = root.has_error();
    walk(root, source, &mut out, false);
    out
}

fn walk(node: Node, source: &str, out: &mut ExtractedFile, in_type_body: bool) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "import_declaration" => {
                if let Some(import) = extract_import(child, source) {
                    out.imports.push(import);
                }
            }
            "class_declaration" | "protocol_declaration" => {
                if let Some(symbol) = extract_type_decl(child, source, class_kind(child, source)) {
                    out.symbols.push(symbol);
                }
                if let Some(body) = child.child_by_field_name("body") {
                    walk(body, source, out, true);
                }
            }
            "function_declaration" => {
                let kind = if in_type_body {
                    SymbolKind::Method
                } else {
                    SymbolKind::Function
                };
                if let Some(symbol) = extract_function_decl(child, source, kind) {
                    out.symbols.push(symbol);
                }
            }
            "init_declaration" => {
                if let Some(symbol) = extract_function_decl(child, source, SymbolKind::Initializer)
                {
                    out.symbols.push(symbol);
                }
            }
            "property_declaration" => {
                out.symbols.extend(extract_property_decl(child, source));
            }
            "enum_entry" => {
                if let Some(symbol) = extract_simple_named(child, source, SymbolKind::Case) {
                    out.symbols.push(symbol);
                }
            }
            "typealias_declaration" => {
                if let Some(symbol) = extract_simple_named(child, source, SymbolKind::Typealias) {
                    out.symbols.push(symbol);
                }
            }
            "associatedtype_declaration" => {
                if let Some(symbol) = extract_simple_named(child, source, SymbolKind::Associatedtype)
                {
                    out.symbols.push(symbol);
                }
            }
            "subscript_declaration" => {
                if let Some(symbol) = extract_function_decl(child, source, SymbolKind::Subscript) {
                    out.symbols.push(symbol);
                }
            }
            "macro_declaration" => {
                if let Some(symbol) = extract_simple_named(child, source, SymbolKind::Macro) {
                    out.symbols.push(symbol);
                }
            }
            _ => {
                walk(child, source, out, in_type_body);
            }
        }
    }
}

fn class_kind(node: Node, source: &str) -> SymbolKind {
    let text = node_text(node, source);
    if text.trim_start().starts_with("struct") {
        SymbolKind::Struct
    } else if text.trim_start().starts_with("enum") {
        SymbolKind::Enum
    } else if text.trim_start().starts_with("actor") {
        SymbolKind::Actor
    } else if text.trim_start().starts_with("extension") {
        SymbolKind::Extension
    } else if node.kind() == "protocol_declaration" {
        SymbolKind::Protocol
    } else {
        SymbolKind::Class
    }
}

fn extract_import(node: Node, source: &str) -> Option<ExtractedImport> {
    let path_node = node.child_by_field_name("path").or_else(|| {
        node.children(&mut node.walk())
            .find(|c| c.kind() == "identifier" || c.kind() == "simple_identifier")
    })?;
    Some(ExtractedImport {
        module_name: node_text(path_node, source).to_string(),
        line: (node.start_position().row + 1) as i64,
        is_exported: node_text(node, source).trim_start().starts_with("@_exported"),
    })
}

fn extract_type_decl(node: Node, source: &str, kind: SymbolKind) -> Option<ExtractedSymbol> {
    let name = find_name(node, source)?;
    let attributes = collect_attributes(node, source);
    let conformances = collect_conformances(node, source);
    let generic_parameters = collect_generic_parameters(node, source);
    Some(ExtractedSymbol {
        name,
        kind,
        line: (node.start_position().row + 1) as i64,
        column: node.start_position().column as i64,
        is_async: false,
        is_throws: false,
        is_public: is_public(node, source),
        is_static: false,
        attributes,
        conformances,
        generic_parameters,
        signature: None,
    })
}

fn extract_function_decl(node: Node, source: &str, kind: SymbolKind) -> Option<ExtractedSymbol> {
    let name = find_name(node, source).unwrap_or_default();
    let text = node_text(node, source);
    let signature_end = text.find('{').map(|i| i).unwrap_or(text.len());
    let signature = text[..signature_end].trim().to_string();

    Some(ExtractedSymbol {
        name,
        kind,
        line: (node.start_position().row + 1) as i64,
        column: node.start_position().column as i64,
        is_async: signature.contains("async"),
        is_throws: signature.contains("throws") || signature.contains("rethrows"),
        is_public: is_public(node, source),
        is_static: is_static(node, source),
        attributes: collect_attributes(node, source),
        conformances: Vec::new(),
        generic_parameters: collect_generic_parameters(node, source),
        signature: Some(signature),
    })
}

fn extract_property_decl(node: Node, source: &str) -> Vec<ExtractedSymbol> {
    let mut cursor = node.walk();
    let mut out = Vec::new();
    for child in node.children(&mut cursor) {
        if child.kind() == "pattern" || child.kind() == "simple_identifier" {
            let name = node_text(child, source).to_string();
            if name.is_empty() {
                continue;
            }
            out.push(ExtractedSymbol {
                name,
                kind: SymbolKind::Property,
                line: (node.start_position().row + 1) as i64,
                column: node.start_position().column as i64,
                is_async: false,
                is_throws: false,
                is_public: is_public(node, source),
                is_static: is_static(node, source),
                attributes: collect_attributes(node, source),
                conformances: Vec::new(),
                generic_parameters: Vec::new(),
                signature: None,
            });
        }
    }
    out
}

fn extract_simple_named(node: Node, source: &str, kind: SymbolKind) -> Option<ExtractedSymbol> {
    let name = find_name(node, source)?;
    Some(ExtractedSymbol {
        name,
        kind,
        line: (node.start_position().row + 1) as i64,
        column: node.start_position().column as i64,
        is_async: false,
        is_throws: false,
        is_public: is_public(node, source),
        is_static: false,
        attributes: collect_attributes(node, source),
        conformances: Vec::new(),
        generic_parameters: Vec::new(),
        signature: None,
    })
}

fn find_name(node: Node, source: &str) -> Option<String> {
    node.child_by_field_name("name")
        .map(|n| node_text(n, source).to_string())
        .or_else(|| {
            node.children(&mut node.walk())
                .find(|c| c.kind() == "type_identifier" || c.kind() == "simple_identifier")
                .map(|n| node_text(n, source).to_string())
        })
}

fn collect_attributes(node: Node, source: &str) -> Vec<String> {
    node.children(&mut node.walk())
        .filter(|c| c.kind() == "attribute")
        .map(|c| node_text(c, source).to_string())
        .collect()
}

fn collect_conformances(node: Node, source: &str) -> Vec<String> {
    node.child_by_field_name("inheritance")
        .map(|inh| {
            node_text(inh, source)
                .trim_start_matches(':')
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn collect_generic_parameters(node: Node, source: &str) -> Vec<String> {
    node.children(&mut node.walk())
        .find(|c| c.kind() == "type_parameters")
        .map(|params| {
            node_text(params, source)
                .trim_matches(|c| c == '<' || c == '>')
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn is_public(node: Node, source: &str) -> bool {
    let text = node_text(node, source);
    let prefix: String = text.chars().take(64).collect();
    prefix.contains("public ") || prefix.contains("open ")
}

fn is_static(node: Node, source: &str) -> bool {
    let text = node_text(node, source);
    let prefix: String = text.chars().take(64).collect();
    prefix.contains("static ") || prefix.contains("class ")
}

fn node_text<'a>(node: Node, source: &'a str) -> &'a str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_class_with_attribute_and_async_throws_method() {
        let source = r#"
@Observable class Store {
    func load() async throws -> [Item] {
        return []
    }
}
"#;
        let result = extract(source);
        assert!(!result.has_errors);
        let store = result
            .symbols
            .iter()
            .find(|s| s.name == "Store")
            .expect("Store symbol");
        assert_eq!(store.kind, SymbolKind::Class);
        assert!(store.attributes.iter().any(|a| a.contains("Observable")));

        let load = result
            .symbols
            .iter()
            .find(|s| s.name == "load")
            .expect("load symbol");
        assert_eq!(load.kind, SymbolKind::Method);
        assert!(load.is_async);
        assert!(load.is_throws);
    }

    #[test]
    fn extracts_import_statement() {
        let result = extract("import Foundation\n");
        assert_eq!(result.imports.len(), 1);
        assert_eq!(result.imports[0].module_name, "Foundation");
    }

    #[test]
    fn public_static_function_flags_set() {
        let source = "struct Util {\n    public static func helper() {}\n}\n";
        let result = extract(source);
        let helper = result
            .symbols
            .iter()
            .find(|s| s.name == "helper")
            .expect("helper symbol");
        assert!(helper.is_public);
        assert!(helper.is_static);
    }
}
