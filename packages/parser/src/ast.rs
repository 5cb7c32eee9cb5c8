//! Structural model for a markup+script document.
//!
//! The element tree is the addressable in-memory representation the rest
//! of the editor works against: elements carry a stable `uid` mirrored in
//! their `data-uid` attribute, attribute values keep enough provenance to
//! be re-printed, and anything the parser cannot model structurally is
//! preserved verbatim as an arbitrary script block.
//!
//! Children and top-level elements are `Arc`-shared: transformations over
//! a tree return untouched subtrees by pointer identity, so downstream
//! change detection can treat identity equality as "definitely unchanged".

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Attribute key carrying the stable element identifier in source text.
pub const DATA_UID_KEY: &str = "data-uid";

/// Byte range in the original source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub const ZERO: Span = Span { start: 0, end: 0 };

    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// Line/column rectangle for an element, keyed by uid in [`ParseSuccess`].
/// Lines and columns are zero-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightBounds {
    pub start_line: usize,
    pub start_col: usize,
    pub end_line: usize,
    pub end_col: usize,
    pub uid: String,
}

/// Element tag name, possibly dotted (`Animated.View`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementName {
    pub base_variable: String,
    pub property_path: Vec<String>,
}

impl ElementName {
    pub fn as_string(&self) -> String {
        if self.property_path.is_empty() {
            self.base_variable.clone()
        } else {
            let mut out = self.base_variable.clone();
            for part in &self.property_path {
                out.push('.');
                out.push_str(part);
            }
            out
        }
    }
}

/// Build an [`ElementName`] from a possibly-dotted source name.
pub fn element_name(name: &str) -> ElementName {
    let mut parts = name.split('.');
    let base_variable = parts.next().unwrap_or_default().to_string();
    ElementName {
        base_variable,
        property_path: parts.map(|s| s.to_string()).collect(),
    }
}

/// A typed attribute value. Closed union: every consumption site matches
/// exhaustively so a new variant is a compile-time-enforced change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum JsxAttribute {
    /// A plain compile-time literal (string, number, boolean, object, array).
    Value {
        value: serde_json::Value,
        span: Span,
    },

    /// A raw source expression that could not be reduced to a literal.
    /// `javascript` is the user's exact text, `transpiled` an evaluable
    /// `return <expr>;` form, `defined_elsewhere` the free variables it
    /// depends on. The span is optional so synthesized values carry none.
    OtherJavaScript {
        javascript: String,
        transpiled: String,
        defined_elsewhere: Vec<String>,
        span: Option<Span>,
    },

    /// A named call with literal-ish arguments, e.g. `rgb(255, 0, 0)`.
    FunctionCall {
        function_name: String,
        arguments: Vec<JsxAttribute>,
    },
}

impl JsxAttribute {
    /// A simple literal's string payload, if that is what this is.
    pub fn as_string_literal(&self) -> Option<&str> {
        match self {
            JsxAttribute::Value {
                value: serde_json::Value::String(s),
                ..
            } => Some(s),
            _ => None,
        }
    }

    pub fn is_simple_value(&self) -> bool {
        matches!(self, JsxAttribute::Value { .. })
    }
}

pub fn jsx_attribute_value(value: impl Into<serde_json::Value>) -> JsxAttribute {
    JsxAttribute::Value {
        value: value.into(),
        span: Span::ZERO,
    }
}

pub fn jsx_attribute_other_javascript(
    javascript: impl Into<String>,
    transpiled: impl Into<String>,
    defined_elsewhere: Vec<String>,
    span: Option<Span>,
) -> JsxAttribute {
    JsxAttribute::OtherJavaScript {
        javascript: javascript.into(),
        transpiled: transpiled.into(),
        defined_elsewhere,
        span,
    }
}

pub fn jsx_attribute_function_call(
    function_name: impl Into<String>,
    arguments: Vec<JsxAttribute>,
) -> JsxAttribute {
    JsxAttribute::FunctionCall {
        function_name: function_name.into(),
        arguments,
    }
}

/// One `name={value}` pair. Attributes are an ordered sequence, not a map,
/// because print order must match source order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsxAttributeEntry {
    pub key: String,
    pub value: JsxAttribute,
}

pub fn jsx_attribute_entry(key: impl Into<String>, value: JsxAttribute) -> JsxAttributeEntry {
    JsxAttributeEntry {
        key: key.into(),
        value,
    }
}

/// A named element node in the tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsxElement {
    pub name: ElementName,
    /// Stable identifier; unique within a top-level tree, mirrored in the
    /// `data-uid` attribute when that attribute is a simple literal.
    pub uid: String,
    pub attributes: Vec<JsxAttributeEntry>,
    pub children: Vec<Arc<JsxElementChild>>,
    pub span: Span,
}

impl JsxElement {
    pub fn attribute(&self, key: &str) -> Option<&JsxAttribute> {
        self.attributes
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| &entry.value)
    }

    /// Replace or append an attribute, preserving its position if present.
    pub fn set_attribute(&mut self, key: &str, value: JsxAttribute) {
        match self.attributes.iter_mut().find(|entry| entry.key == key) {
            Some(entry) => entry.value = value,
            None => self.attributes.push(jsx_attribute_entry(key, value)),
        }
    }

    /// The `data-uid` attribute's value, when it holds a simple string literal.
    pub fn data_uid_literal(&self) -> Option<&str> {
        self.attribute(DATA_UID_KEY)
            .and_then(|attr| attr.as_string_literal())
    }
}

pub fn jsx_element(
    name: &str,
    uid: impl Into<String>,
    attributes: Vec<JsxAttributeEntry>,
    children: Vec<Arc<JsxElementChild>>,
) -> JsxElement {
    JsxElement {
        name: element_name(name),
        uid: uid.into(),
        attributes,
        children,
        span: Span::ZERO,
    }
}

/// An opaque block of script the parser cannot, or chooses not to, model
/// as an element tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArbitraryBlock {
    /// Original source text, verbatim.
    pub javascript: String,
    /// Evaluable form of the block.
    pub transpiled: String,
    /// Identifier names the block defines.
    pub defined_within: Vec<String>,
    /// Identifier names referenced from outer scope.
    pub defined_elsewhere: Vec<String>,
    pub span: Span,
}

pub fn arbitrary_block(
    javascript: impl Into<String>,
    transpiled: impl Into<String>,
    defined_within: Vec<String>,
    defined_elsewhere: Vec<String>,
) -> ArbitraryBlock {
    ArbitraryBlock {
        javascript: javascript.into(),
        transpiled: transpiled.into(),
        defined_within,
        defined_elsewhere,
        span: Span::ZERO,
    }
}

/// One node in an element tree. Text and expression-only children are
/// carried as attribute values rather than a dedicated node type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum JsxElementChild {
    Element(JsxElement),
    Arbitrary(ArbitraryBlock),
    Value(JsxAttribute),
}

impl JsxElementChild {
    pub fn as_element(&self) -> Option<&JsxElement> {
        match self {
            JsxElementChild::Element(e) => Some(e),
            JsxElementChild::Arbitrary(_) | JsxElementChild::Value(_) => None,
        }
    }
}

/// Function parameter pattern. `dotdotdot` flags a rest parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionParam {
    pub dotdotdot: bool,
    pub bound: BoundParam,
}

pub fn function_param(dotdotdot: bool, bound: BoundParam) -> FunctionParam {
    FunctionParam { dotdotdot, bound }
}

/// The binding target of a parameter; recursively polymorphic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BoundParam {
    Regular {
        name: String,
        default: Option<JsxAttribute>,
    },
    DestructuredObject {
        parts: Vec<DestructuredParamPart>,
    },
    DestructuredArray {
        parts: Vec<DestructuredArrayPart>,
    },
}

pub fn regular_param(name: impl Into<String>, default: Option<JsxAttribute>) -> BoundParam {
    BoundParam::Regular {
        name: name.into(),
        default,
    }
}

pub fn destructured_object(parts: Vec<DestructuredParamPart>) -> BoundParam {
    BoundParam::DestructuredObject { parts }
}

pub fn destructured_array(parts: Vec<DestructuredArrayPart>) -> BoundParam {
    BoundParam::DestructuredArray { parts }
}

/// One part of an object destructuring pattern. `property_key` is the
/// source key when the binding renames it (`{prop: renamed}`). A default
/// on a regular binding lives on the binding itself; `default` here only
/// covers defaults attached to nested patterns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DestructuredParamPart {
    pub property_key: Option<String>,
    pub param: FunctionParam,
    pub default: Option<JsxAttribute>,
}

pub fn destructured_param_part(
    property_key: Option<String>,
    param: FunctionParam,
    default: Option<JsxAttribute>,
) -> DestructuredParamPart {
    DestructuredParamPart {
        property_key,
        param,
        default,
    }
}

/// One slot of an array destructuring pattern; `Omitted` is a hole, as in
/// `[a, , b]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DestructuredArrayPart {
    Param(FunctionParam),
    Omitted,
}

pub fn omitted_param() -> DestructuredArrayPart {
    DestructuredArrayPart::Omitted
}

/// The canonical `(props)` parameter.
pub fn default_props_param() -> FunctionParam {
    function_param(false, regular_param("props", None))
}

/// A named function component declared at the file's outermost scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkupComponent {
    pub name: String,
    pub exported: bool,
    pub param: Option<FunctionParam>,
    /// Names from a top-level destructured props object used in the body.
    pub props_used: Vec<String>,
    pub root_element: Arc<JsxElementChild>,
    /// Statements preceding the returned root, preserved verbatim.
    pub arbitrary_block: Option<ArbitraryBlock>,
}

pub fn markup_component(
    name: impl Into<String>,
    exported: bool,
    param: Option<FunctionParam>,
    props_used: Vec<String>,
    root_element: JsxElementChild,
    arbitrary_block: Option<ArbitraryBlock>,
) -> MarkupComponent {
    MarkupComponent {
        name: name.into(),
        exported,
        param,
        props_used,
        root_element: Arc::new(root_element),
        arbitrary_block,
    }
}

/// A component or arbitrary script block at the file's outermost scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TopLevelElement {
    Component(MarkupComponent),
    Arbitrary(ArbitraryBlock),
}

impl TopLevelElement {
    pub fn as_component(&self) -> Option<&MarkupComponent> {
        match self {
            TopLevelElement::Component(c) => Some(c),
            TopLevelElement::Arbitrary(_) => None,
        }
    }

    pub fn as_arbitrary(&self) -> Option<&ArbitraryBlock> {
        match self {
            TopLevelElement::Arbitrary(b) => Some(b),
            TopLevelElement::Component(_) => None,
        }
    }
}

/// One import declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Import {
    pub source: String,
    pub default_import: Option<String>,
    pub star_as: Option<String>,
    pub named: Vec<ImportAlias>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportAlias {
    pub name: String,
    pub alias: Option<String>,
}

pub fn import_alias(name: impl Into<String>, alias: Option<String>) -> ImportAlias {
    ImportAlias {
        name: name.into(),
        alias,
    }
}

pub fn import_statement(
    source: impl Into<String>,
    default_import: Option<String>,
    star_as: Option<String>,
    named: Vec<ImportAlias>,
) -> Import {
    Import {
        source: source.into(),
        default_import,
        star_as,
        named,
    }
}

/// Ordered sequence of import declarations.
pub type Imports = Vec<Import>;

/// The success channel of a parse. Immutable once created; edits produce
/// a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseSuccess {
    pub imports: Imports,
    pub top_level_elements: Vec<Arc<TopLevelElement>>,
    /// Original source text.
    pub code: String,
    /// uid → source rectangle, for canvas/source cross-referencing.
    pub highlight_bounds: HashMap<String, HighlightBounds>,
    /// Factory function named by a `@jsx` pragma, if any.
    pub jsx_factory_function: Option<String>,
}

pub fn parse_success(
    imports: Imports,
    top_level_elements: Vec<Arc<TopLevelElement>>,
    code: impl Into<String>,
    highlight_bounds: HashMap<String, HighlightBounds>,
    jsx_factory_function: Option<String>,
) -> ParseSuccess {
    ParseSuccess {
        imports,
        top_level_elements,
        code: code.into(),
        highlight_bounds,
        jsx_factory_function,
    }
}

// ---------------------------------------------------------------------------
// Structural comparison helpers
//
// "uid-stripped structural equality" is clearing + derived PartialEq: the
// clearing functions below normalize uids and source positions (the fields
// deliberately excluded from comparison) without touching anything else.
// ---------------------------------------------------------------------------

pub fn clear_attribute_unique_ids(attribute: &JsxAttribute) -> JsxAttribute {
    match attribute {
        JsxAttribute::Value { value, .. } => JsxAttribute::Value {
            value: value.clone(),
            span: Span::ZERO,
        },
        JsxAttribute::OtherJavaScript {
            javascript,
            transpiled,
            defined_elsewhere,
            ..
        } => JsxAttribute::OtherJavaScript {
            javascript: javascript.clone(),
            transpiled: transpiled.clone(),
            defined_elsewhere: defined_elsewhere.clone(),
            span: None,
        },
        JsxAttribute::FunctionCall {
            function_name,
            arguments,
        } => JsxAttribute::FunctionCall {
            function_name: function_name.clone(),
            arguments: arguments.iter().map(clear_attribute_unique_ids).collect(),
        },
    }
}

fn clear_arbitrary_block_unique_ids(block: &ArbitraryBlock) -> ArbitraryBlock {
    ArbitraryBlock {
        span: Span::ZERO,
        ..block.clone()
    }
}

fn clear_function_param_unique_ids(param: &FunctionParam) -> FunctionParam {
    let bound = match &param.bound {
        BoundParam::Regular { name, default } => BoundParam::Regular {
            name: name.clone(),
            default: default.as_ref().map(clear_attribute_unique_ids),
        },
        BoundParam::DestructuredObject { parts } => BoundParam::DestructuredObject {
            parts: parts
                .iter()
                .map(|part| DestructuredParamPart {
                    property_key: part.property_key.clone(),
                    param: clear_function_param_unique_ids(&part.param),
                    default: part.default.as_ref().map(clear_attribute_unique_ids),
                })
                .collect(),
        },
        BoundParam::DestructuredArray { parts } => BoundParam::DestructuredArray {
            parts: parts
                .iter()
                .map(|part| match part {
                    DestructuredArrayPart::Param(p) => {
                        DestructuredArrayPart::Param(clear_function_param_unique_ids(p))
                    }
                    DestructuredArrayPart::Omitted => DestructuredArrayPart::Omitted,
                })
                .collect(),
        },
    };
    FunctionParam {
        dotdotdot: param.dotdotdot,
        bound,
    }
}

pub fn clear_element_child_unique_ids(child: &JsxElementChild) -> JsxElementChild {
    match child {
        JsxElementChild::Element(element) => JsxElementChild::Element(JsxElement {
            name: element.name.clone(),
            uid: String::new(),
            attributes: element
                .attributes
                .iter()
                .map(|entry| JsxAttributeEntry {
                    key: entry.key.clone(),
                    value: clear_attribute_unique_ids(&entry.value),
                })
                .collect(),
            children: element
                .children
                .iter()
                .map(|c| Arc::new(clear_element_child_unique_ids(c)))
                .collect(),
            span: Span::ZERO,
        }),
        JsxElementChild::Arbitrary(block) => {
            JsxElementChild::Arbitrary(clear_arbitrary_block_unique_ids(block))
        }
        JsxElementChild::Value(attribute) => {
            JsxElementChild::Value(clear_attribute_unique_ids(attribute))
        }
    }
}

pub fn clear_top_level_element_unique_ids(element: &TopLevelElement) -> TopLevelElement {
    match element {
        TopLevelElement::Component(component) => TopLevelElement::Component(MarkupComponent {
            name: component.name.clone(),
            exported: component.exported,
            param: component.param.as_ref().map(clear_function_param_unique_ids),
            props_used: component.props_used.clone(),
            root_element: Arc::new(clear_element_child_unique_ids(&component.root_element)),
            arbitrary_block: component
                .arbitrary_block
                .as_ref()
                .map(clear_arbitrary_block_unique_ids),
        }),
        TopLevelElement::Arbitrary(block) => {
            TopLevelElement::Arbitrary(clear_arbitrary_block_unique_ids(block))
        }
    }
}

/// Normalize a parse success for structural comparison: uids and source
/// positions cleared, highlight bounds dropped, original code kept.
pub fn clear_parse_success_unique_ids(success: &ParseSuccess) -> ParseSuccess {
    ParseSuccess {
        imports: success.imports.clone(),
        top_level_elements: success
            .top_level_elements
            .iter()
            .map(|tle| Arc::new(clear_top_level_element_unique_ids(tle)))
            .collect(),
        code: success.code.clone(),
        highlight_bounds: HashMap::new(),
        jsx_factory_function: success.jsx_factory_function.clone(),
    }
}

/// Remove every `data-uid` attribute and blank every uid, recursively.
/// Used when extracting an element for insertion so the receiving tree
/// assigns fresh identifiers.
pub fn strip_element_uids(element: &JsxElement) -> JsxElement {
    JsxElement {
        name: element.name.clone(),
        uid: String::new(),
        attributes: element
            .attributes
            .iter()
            .filter(|entry| entry.key != DATA_UID_KEY)
            .cloned()
            .collect(),
        children: element
            .children
            .iter()
            .map(|child| {
                Arc::new(match child.as_ref() {
                    JsxElementChild::Element(e) => JsxElementChild::Element(strip_element_uids(e)),
                    other => other.clone(),
                })
            })
            .collect(),
        span: element.span,
    }
}
