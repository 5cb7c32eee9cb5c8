//! Printer from the element tree back to source text.
//!
//! Printing is the inverse of parsing up to formatting normalization:
//! parse(print(tree)) is structurally equal to the tree with uids intact.
//! Raw script regions print verbatim so user expressions survive the
//! round trip untouched.

use crate::ast::{
    ArbitraryBlock, BoundParam, DestructuredArrayPart, FunctionParam, Import, Imports,
    JsxAttribute, JsxElement, JsxElementChild, MarkupComponent, TopLevelElement,
};
use std::sync::Arc;

/// Knobs for the printed form. Structure is never affected, only layout.
#[derive(Debug, Clone, Copy)]
pub struct PrintOptions {
    /// Multiline output with indentation; `false` prints each element on
    /// one line.
    pub pretty: bool,
    /// Include `= default` initializers when printing destructured params.
    pub print_destructured_defaults: bool,
    /// Print raw expressions with the user's original layout; `false`
    /// collapses their whitespace to a single line.
    pub preserve_original_expressions: bool,
}

impl Default for PrintOptions {
    fn default() -> Self {
        Self {
            pretty: true,
            print_destructured_defaults: true,
            preserve_original_expressions: true,
        }
    }
}

pub fn print_options(
    pretty: bool,
    print_destructured_defaults: bool,
    preserve_original_expressions: bool,
) -> PrintOptions {
    PrintOptions {
        pretty,
        print_destructured_defaults,
        preserve_original_expressions,
    }
}

/// Print a whole file: pragma, imports, then top-level elements in their
/// original order.
pub fn print_code(
    options: PrintOptions,
    imports: &Imports,
    top_level_elements: &[Arc<TopLevelElement>],
    jsx_factory_function: Option<&str>,
) -> String {
    let mut printer = Printer::new(options);
    if let Some(factory) = jsx_factory_function {
        printer.out.push_str(&format!("/** @jsx {factory} */\n"));
    }
    for import in imports {
        printer.write_import(import);
    }
    if !imports.is_empty() && !top_level_elements.is_empty() {
        printer.out.push('\n');
    }
    for (idx, element) in top_level_elements.iter().enumerate() {
        if idx > 0 {
            printer.out.push('\n');
        }
        match element.as_ref() {
            TopLevelElement::Component(component) => printer.write_component(component),
            TopLevelElement::Arbitrary(block) => {
                printer.write_arbitrary_statement(block);
            }
        }
    }
    printer.out
}

/// Print a parse result's tree against its own imports and pragma.
pub fn print_parse_success(
    success: &crate::ast::ParseSuccess,
    options: PrintOptions,
) -> String {
    print_code(
        options,
        &success.imports,
        &success.top_level_elements,
        success.jsx_factory_function.as_deref(),
    )
}

struct Printer {
    options: PrintOptions,
    indent_level: usize,
    out: String,
}

const INDENT: &str = "  ";

impl Printer {
    fn new(options: PrintOptions) -> Self {
        Self {
            options,
            indent_level: 0,
            out: String::new(),
        }
    }

    fn write_indent(&mut self) {
        for _ in 0..self.indent_level {
            self.out.push_str(INDENT);
        }
    }

    fn writeln(&mut self, line: &str) {
        self.write_indent();
        self.out.push_str(line);
        self.out.push('\n');
    }

    // -- imports -------------------------------------------------------------

    fn write_import(&mut self, import: &Import) {
        if import.default_import.is_none() && import.star_as.is_none() && import.named.is_empty()
        {
            self.out
                .push_str(&format!("import '{}'\n", escape_single_quoted(&import.source)));
            return;
        }
        let mut clauses: Vec<String> = Vec::new();
        if let Some(default) = &import.default_import {
            clauses.push(default.clone());
        }
        if let Some(star) = &import.star_as {
            clauses.push(format!("* as {star}"));
        }
        if !import.named.is_empty() {
            let named: Vec<String> = import
                .named
                .iter()
                .map(|alias| match &alias.alias {
                    Some(renamed) => format!("{} as {}", alias.name, renamed),
                    None => alias.name.clone(),
                })
                .collect();
            clauses.push(format!("{{ {} }}", named.join(", ")));
        }
        self.out.push_str(&format!(
            "import {} from '{}'\n",
            clauses.join(", "),
            escape_single_quoted(&import.source)
        ));
    }

    // -- components ----------------------------------------------------------

    fn write_component(&mut self, component: &MarkupComponent) {
        let export = if component.exported { "export " } else { "" };
        let params = self.format_param(&component.param);
        self.writeln(&format!("{export}var {} = {params} => {{", component.name));
        self.indent_level += 1;
        if let Some(block) = &component.arbitrary_block {
            self.write_script_lines(&block.javascript);
        }
        self.writeln("return (");
        self.indent_level += 1;
        self.write_element_child(&component.root_element);
        self.indent_level -= 1;
        self.writeln(")");
        self.indent_level -= 1;
        self.writeln("}");
    }

    fn write_arbitrary_statement(&mut self, block: &ArbitraryBlock) {
        self.write_script_lines(&block.javascript);
    }

    /// Re-emit stored script at the current indentation, line by line.
    /// Blank lines stay blank.
    fn write_script_lines(&mut self, javascript: &str) {
        for line in javascript.lines() {
            if line.trim().is_empty() {
                self.out.push('\n');
            } else {
                self.writeln(line.trim_end());
            }
        }
    }

    // -- parameters ----------------------------------------------------------

    fn format_param(&self, param: &Option<FunctionParam>) -> String {
        match param {
            None => "()".to_string(),
            Some(param) => format!("({})", self.format_function_param(param)),
        }
    }

    fn format_function_param(&self, param: &FunctionParam) -> String {
        let prefix = if param.dotdotdot { "..." } else { "" };
        format!("{prefix}{}", self.format_bound_param(&param.bound))
    }

    fn format_bound_param(&self, bound: &BoundParam) -> String {
        match bound {
            BoundParam::Regular { name, default } => match default {
                Some(value) if self.options.print_destructured_defaults => {
                    format!("{name} = {}", self.format_attribute(value))
                }
                _ => name.clone(),
            },
            BoundParam::DestructuredObject { parts } => {
                let printed: Vec<String> = parts
                    .iter()
                    .map(|part| {
                        let binding = self.format_function_param(&part.param);
                        let mut out = match &part.property_key {
                            Some(key) => format!("{key}: {binding}"),
                            None => binding,
                        };
                        if self.options.print_destructured_defaults {
                            if let Some(default) = &part.default {
                                out.push_str(&format!(" = {}", self.format_attribute(default)));
                            }
                        }
                        out
                    })
                    .collect();
                format!("{{ {} }}", printed.join(", "))
            }
            BoundParam::DestructuredArray { parts } => {
                let printed: Vec<String> = parts
                    .iter()
                    .map(|part| match part {
                        DestructuredArrayPart::Param(param) => self.format_function_param(param),
                        DestructuredArrayPart::Omitted => String::new(),
                    })
                    .collect();
                format!("[{}]", printed.join(", "))
            }
        }
    }

    // -- elements ------------------------------------------------------------

    fn write_element_child(&mut self, child: &JsxElementChild) {
        match child {
            JsxElementChild::Element(element) => self.write_element(element),
            JsxElementChild::Value(value) => match value.as_string_literal() {
                Some(text) => self.writeln(text),
                None => {
                    let printed = self.format_attribute(value);
                    self.writeln(&format!("{{{printed}}}"));
                }
            },
            JsxElementChild::Arbitrary(block) => {
                let expression = self.format_raw_expression(&block.javascript);
                self.writeln(&format!("{{{expression}}}"));
            }
        }
    }

    fn write_element(&mut self, element: &JsxElement) {
        let attributes = self.format_attributes(element);
        let name = element.name.as_string();
        if element.children.is_empty() {
            self.writeln(&format!("<{name}{attributes} />"));
            return;
        }
        if !self.options.pretty {
            let mut line = format!("<{name}{attributes}>");
            for child in &element.children {
                line.push_str(&self.format_inline_child(child));
            }
            line.push_str(&format!("</{name}>"));
            self.writeln(&line);
            return;
        }
        self.writeln(&format!("<{name}{attributes}>"));
        self.indent_level += 1;
        for child in &element.children {
            self.write_element_child(child);
        }
        self.indent_level -= 1;
        self.writeln(&format!("</{name}>"));
    }

    fn format_inline_child(&self, child: &JsxElementChild) -> String {
        match child {
            JsxElementChild::Element(element) => {
                let attributes = self.format_attributes(element);
                let name = element.name.as_string();
                if element.children.is_empty() {
                    format!("<{name}{attributes} />")
                } else {
                    let inner: String = element
                        .children
                        .iter()
                        .map(|c| self.format_inline_child(c))
                        .collect();
                    format!("<{name}{attributes}>{inner}</{name}>")
                }
            }
            JsxElementChild::Value(value) => match value.as_string_literal() {
                Some(text) => text.to_string(),
                None => format!("{{{}}}", self.format_attribute(value)),
            },
            JsxElementChild::Arbitrary(block) => {
                format!("{{{}}}", self.format_raw_expression(&block.javascript))
            }
        }
    }

    fn format_attributes(&self, element: &JsxElement) -> String {
        let mut out = String::new();
        for entry in &element.attributes {
            out.push(' ');
            out.push_str(&entry.key);
            out.push('=');
            out.push('{');
            out.push_str(&self.format_attribute(&entry.value));
            out.push('}');
        }
        out
    }

    fn format_attribute(&self, attribute: &JsxAttribute) -> String {
        match attribute {
            JsxAttribute::Value { value, .. } => format_json_value(value),
            JsxAttribute::OtherJavaScript { javascript, .. } => {
                self.format_raw_expression(javascript)
            }
            JsxAttribute::FunctionCall {
                function_name,
                arguments,
            } => {
                let args: Vec<String> =
                    arguments.iter().map(|a| self.format_attribute(a)).collect();
                format!("{function_name}({})", args.join(", "))
            }
        }
    }

    fn format_raw_expression(&self, javascript: &str) -> String {
        if self.options.preserve_original_expressions {
            javascript.to_string()
        } else {
            javascript.split_whitespace().collect::<Vec<_>>().join(" ")
        }
    }
}

/// Literal values in source style: single-quoted strings, bare object
/// keys. The printed form is re-readable as a simple literal.
fn format_json_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "null".to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => format!("'{}'", escape_single_quoted(s)),
        serde_json::Value::Array(items) => {
            let printed: Vec<String> = items.iter().map(format_json_value).collect();
            format!("[{}]", printed.join(", "))
        }
        serde_json::Value::Object(map) => {
            if map.is_empty() {
                return "{}".to_string();
            }
            let printed: Vec<String> = map
                .iter()
                .map(|(key, value)| {
                    let key = if is_identifier_like(key) {
                        key.clone()
                    } else {
                        format!("'{}'", escape_single_quoted(key))
                    };
                    format!("{key}: {}", format_json_value(value))
                })
                .collect();
            format!("{{ {} }}", printed.join(", "))
        }
    }
}

fn is_identifier_like(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

fn escape_single_quoted(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{
        destructured_object, destructured_param_part, function_param, import_statement,
        jsx_attribute_entry, jsx_attribute_function_call, jsx_attribute_value, jsx_element,
        markup_component, regular_param, DATA_UID_KEY,
    };

    fn single_component(component: MarkupComponent) -> Vec<Arc<TopLevelElement>> {
        vec![Arc::new(TopLevelElement::Component(component))]
    }

    fn uid_entry(uid: &str) -> crate::ast::JsxAttributeEntry {
        jsx_attribute_entry(DATA_UID_KEY, jsx_attribute_value(uid))
    }

    #[test]
    fn test_prints_component_with_nested_element() {
        let inner = jsx_element("View", "bbb", vec![uid_entry("bbb")], vec![]);
        let root = jsx_element(
            "View",
            "aaa",
            vec![
                jsx_attribute_entry(
                    "style",
                    jsx_attribute_value(serde_json::json!({"left": 0, "top": 0})),
                ),
                uid_entry("aaa"),
            ],
            vec![Arc::new(JsxElementChild::Element(inner))],
        );
        let component = markup_component(
            "App",
            true,
            Some(function_param(false, regular_param("props", None))),
            vec![],
            JsxElementChild::Element(root),
            None,
        );
        let printed = print_code(
            PrintOptions::default(),
            &vec![import_statement("react", Some("React".to_string()), None, vec![])],
            &single_component(component),
            None,
        );
        let expected = "import React from 'react'\n\
                        \n\
                        export var App = (props) => {\n\
                        \x20 return (\n\
                        \x20   <View style={{ left: 0, top: 0 }} data-uid={'aaa'}>\n\
                        \x20     <View data-uid={'bbb'} />\n\
                        \x20   </View>\n\
                        \x20 )\n\
                        }\n";
        assert_eq!(printed, expected);
    }

    #[test]
    fn test_prints_function_call_attribute() {
        let root = jsx_element(
            "View",
            "aaa",
            vec![
                jsx_attribute_entry(
                    "backgroundColor",
                    jsx_attribute_function_call(
                        "rgb",
                        vec![
                            jsx_attribute_value(255),
                            jsx_attribute_value(0),
                            jsx_attribute_value(0),
                        ],
                    ),
                ),
                uid_entry("aaa"),
            ],
            vec![],
        );
        let component = markup_component(
            "App",
            true,
            None,
            vec![],
            JsxElementChild::Element(root),
            None,
        );
        let printed = print_code(
            PrintOptions::default(),
            &vec![],
            &single_component(component),
            None,
        );
        assert!(printed.contains("backgroundColor={rgb(255, 0, 0)}"));
    }

    #[test]
    fn test_prints_destructured_params_with_and_without_defaults() {
        let param = function_param(
            false,
            destructured_object(vec![destructured_param_part(
                None,
                function_param(false, regular_param("count", Some(jsx_attribute_value(5)))),
                None,
            )]),
        );
        let root = jsx_element("View", "aaa", vec![uid_entry("aaa")], vec![]);
        let component = markup_component(
            "App",
            true,
            Some(param),
            vec!["count".to_string()],
            JsxElementChild::Element(root),
            None,
        );
        let with_defaults = print_code(
            PrintOptions::default(),
            &vec![],
            &single_component(component.clone()),
            None,
        );
        assert!(with_defaults.contains("({ count = 5 })"));

        let without_defaults = print_code(
            PrintOptions {
                print_destructured_defaults: false,
                ..PrintOptions::default()
            },
            &vec![],
            &single_component(component),
            None,
        );
        assert!(without_defaults.contains("({ count })"));
    }

    #[test]
    fn test_prints_jsx_pragma() {
        let root = jsx_element("View", "aaa", vec![uid_entry("aaa")], vec![]);
        let component = markup_component(
            "App",
            true,
            None,
            vec![],
            JsxElementChild::Element(root),
            None,
        );
        let printed = print_code(
            PrintOptions::default(),
            &vec![],
            &single_component(component),
            Some("jsx"),
        );
        assert!(printed.starts_with("/** @jsx jsx */\n"));
    }

    #[test]
    fn test_prints_arbitrary_block_between_components() {
        let block = crate::ast::arbitrary_block(
            "var scale = 2;",
            "var scale = 2;",
            vec!["scale".to_string()],
            vec![],
        );
        let printed = print_code(
            PrintOptions::default(),
            &vec![],
            &[Arc::new(TopLevelElement::Arbitrary(block))],
            None,
        );
        assert_eq!(printed, "var scale = 2;\n");
    }

    #[test]
    fn test_compact_mode_prints_children_inline() {
        let inner = jsx_element("span", "bbb", vec![uid_entry("bbb")], vec![]);
        let root = jsx_element(
            "div",
            "aaa",
            vec![uid_entry("aaa")],
            vec![Arc::new(JsxElementChild::Element(inner))],
        );
        let component = markup_component(
            "App",
            false,
            None,
            vec![],
            JsxElementChild::Element(root),
            None,
        );
        let printed = print_code(
            PrintOptions {
                pretty: false,
                ..PrintOptions::default()
            },
            &vec![],
            &single_component(component),
            None,
        );
        assert!(printed.contains("<div data-uid={'aaa'}><span data-uid={'bbb'} /></div>"));
    }

    #[test]
    fn test_collapsed_raw_expressions() {
        let root = jsx_element(
            "View",
            "aaa",
            vec![
                jsx_attribute_entry(
                    "style",
                    crate::ast::jsx_attribute_other_javascript(
                        "props\n  .style",
                        "return props\n  .style;",
                        vec!["props".to_string()],
                        None,
                    ),
                ),
                uid_entry("aaa"),
            ],
            vec![],
        );
        let component = markup_component(
            "App",
            true,
            None,
            vec![],
            JsxElementChild::Element(root),
            None,
        );
        let printed = print_code(
            PrintOptions {
                preserve_original_expressions: false,
                ..PrintOptions::default()
            },
            &vec![],
            &single_component(component),
            None,
        );
        assert!(printed.contains("style={props .style}"));
    }

    #[test]
    fn test_string_escaping() {
        assert_eq!(escape_single_quoted("it's"), "it\\'s");
        assert_eq!(
            format_json_value(&serde_json::json!({"a b": 1})),
            "{ 'a b': 1 }"
        );
    }
}
