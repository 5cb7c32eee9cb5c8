//! Bidirectional parser and printer for a JSX-flavored component subset.
//!
//! [`parse_code`] turns source text into an element tree whose elements
//! carry unique `data-uid` identifiers; [`print_code`] turns a tree back
//! into source. The two compose into a round trip that preserves user
//! expressions verbatim and keeps uids stable.

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod printer;
pub mod uid;

pub use ast::{
    clear_parse_success_unique_ids, ArbitraryBlock, BoundParam, DestructuredArrayPart,
    DestructuredParamPart, ElementName, FunctionParam, HighlightBounds, Import, ImportAlias,
    Imports, JsxAttribute, JsxAttributeEntry, JsxElement, JsxElementChild, MarkupComponent,
    ParseSuccess, Span, TopLevelElement, DATA_UID_KEY,
};
pub use error::{ParseError, ParseFailure, ParseResult};
pub use parser::parse_code;
pub use printer::{print_code, print_options, print_parse_success, PrintOptions};
pub use uid::{guarantee_unique_uids, UidAllocator};
