//! Recursive-descent parser for the markup+script subset.
//!
//! The parser interprets imports, function components and their returned
//! element trees structurally; everything else at the top level is slurped
//! verbatim into arbitrary blocks so no user code is ever dropped. Inside
//! a component the commitment point is the first `<` of the returned tree:
//! before it, a shape mismatch falls back to an arbitrary block, after it
//! a malformed tree is a parse failure.

use crate::ast::{
    arbitrary_block, destructured_array, destructured_object, destructured_param_part,
    element_name, function_param, import_alias, import_statement, jsx_attribute_entry,
    markup_component, omitted_param, parse_success, ArbitraryBlock, BoundParam,
    DestructuredArrayPart, DestructuredParamPart, ElementName, FunctionParam, HighlightBounds,
    Import, Imports, JsxAttribute, JsxAttributeEntry, JsxElement, JsxElementChild,
    MarkupComponent, ParseSuccess, Span, TopLevelElement, DATA_UID_KEY,
};
use crate::error::{ParseError, ParseFailure, ParseResult};
use crate::lexer::{scan_jsx_factory_pragma, tokenize, Token};
use crate::uid::guarantee_unique_uids;
use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;
use tracing::debug;

/// Parse a whole file. The returned tree always satisfies the uid
/// invariant; printing it back reproduces the source modulo formatting
/// normalization and repaired uids.
pub fn parse_code(filename: &str, source: &str) -> Result<ParseSuccess, ParseFailure> {
    debug!(filename, bytes = source.len(), "parsing");
    let jsx_factory_function = scan_jsx_factory_pragma(source);
    let tokens = tokenize(source);
    let mut parser = Parser::new(source, tokens);
    let (imports, top_level_elements) = parser.parse_program()?;
    let top_level_elements = guarantee_unique_uids(top_level_elements);
    let highlight_bounds = compute_highlight_bounds(source, &top_level_elements);
    Ok(parse_success(
        imports,
        top_level_elements,
        source,
        highlight_bounds,
        jsx_factory_function,
    ))
}

struct Parser<'src> {
    source: &'src str,
    tokens: Vec<(Token<'src>, Range<usize>)>,
    pos: usize,
}

impl<'src> Parser<'src> {
    fn new(source: &'src str, tokens: Vec<(Token<'src>, Range<usize>)>) -> Self {
        Self {
            source,
            tokens,
            pos: 0,
        }
    }

    // -- token stream helpers ------------------------------------------------

    fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token<'src>> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token<'src>> {
        self.tokens.get(self.pos + offset).map(|(t, _)| t)
    }

    fn peek_span(&self) -> Range<usize> {
        self.tokens
            .get(self.pos)
            .map(|(_, s)| s.clone())
            .unwrap_or(self.source.len()..self.source.len())
    }

    fn current_pos(&self) -> usize {
        self.peek_span().start
    }

    fn advance(&mut self) -> Option<(Token<'src>, Range<usize>)> {
        let out = self.tokens.get(self.pos).cloned();
        if out.is_some() {
            self.pos += 1;
        }
        out
    }

    fn check(&self, token: &Token<'src>) -> bool {
        self.peek() == Some(token)
    }

    fn match_token(&mut self, token: &Token<'src>) -> bool {
        if self.check(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token<'src>, expected: &str) -> ParseResult<Range<usize>> {
        match self.tokens.get(self.pos) {
            Some((found, span)) if found == token => {
                let span = span.clone();
                self.pos += 1;
                Ok(span)
            }
            Some((found, span)) => Err(ParseError::unexpected_token(
                span.start,
                expected,
                format!("{found:?}"),
            )),
            None => Err(ParseError::unexpected_eof(self.source.len())),
        }
    }

    fn expect_ident(&mut self, expected: &str) -> ParseResult<(&'src str, Range<usize>)> {
        match self.tokens.get(self.pos) {
            Some((Token::Ident(name), span)) => {
                let out = (*name, span.clone());
                self.pos += 1;
                Ok(out)
            }
            Some((found, span)) => Err(ParseError::unexpected_token(
                span.start,
                expected,
                format!("{found:?}"),
            )),
            None => Err(ParseError::unexpected_eof(self.source.len())),
        }
    }

    // -- program -------------------------------------------------------------

    fn parse_program(
        &mut self,
    ) -> Result<(Imports, Vec<Arc<TopLevelElement>>), ParseFailure> {
        let mut imports: Imports = Vec::new();
        let mut elements: Vec<Arc<TopLevelElement>> = Vec::new();
        let mut errors: Vec<ParseError> = Vec::new();

        while !self.is_at_end() {
            if self.match_token(&Token::Semicolon) {
                continue;
            }
            if self.check(&Token::Import) {
                match self.parse_import() {
                    Ok(import) => imports.push(import),
                    Err(error) => {
                        errors.push(error);
                        break;
                    }
                }
                continue;
            }
            let checkpoint = self.pos;
            match self.try_parse_component() {
                Ok(Some(component)) => {
                    elements.push(Arc::new(TopLevelElement::Component(component)));
                }
                Ok(None) => {
                    self.pos = checkpoint;
                    match self.parse_arbitrary_top_level() {
                        Ok(block) => elements.push(Arc::new(TopLevelElement::Arbitrary(block))),
                        Err(error) => {
                            errors.push(error);
                            break;
                        }
                    }
                }
                Err(error) => {
                    errors.push(error);
                    break;
                }
            }
        }

        if errors.is_empty() {
            Ok((imports, elements))
        } else {
            Err(ParseFailure::new(errors))
        }
    }

    // -- imports -------------------------------------------------------------

    fn parse_import(&mut self) -> ParseResult<Import> {
        self.expect(&Token::Import, "import")?;

        // Side-effect form: import "module";
        if let Some(source) = self.match_string_literal() {
            self.match_token(&Token::Semicolon);
            return Ok(import_statement(source, None, None, vec![]));
        }

        let mut default_import: Option<String> = None;
        let mut star_as: Option<String> = None;
        let mut named = Vec::new();

        if let Some(Token::Ident(name)) = self.peek() {
            default_import = Some((*name).to_string());
            self.pos += 1;
            if self.match_token(&Token::Comma) {
                self.parse_import_clause(&mut star_as, &mut named)?;
            }
        } else {
            self.parse_import_clause(&mut star_as, &mut named)?;
        }

        self.expect(&Token::From, "from")?;
        let source = self.expect_string_literal()?;
        self.match_token(&Token::Semicolon);
        Ok(import_statement(source, default_import, star_as, named))
    }

    fn parse_import_clause(
        &mut self,
        star_as: &mut Option<String>,
        named: &mut Vec<crate::ast::ImportAlias>,
    ) -> ParseResult<()> {
        if self.match_token(&Token::Star) {
            self.expect(&Token::As, "as")?;
            let (name, _) = self.expect_ident("namespace alias")?;
            *star_as = Some(name.to_string());
            return Ok(());
        }
        self.expect(&Token::LBrace, "{")?;
        while !self.check(&Token::RBrace) {
            let (name, _) = self.expect_ident("imported name")?;
            let alias = if self.match_token(&Token::As) {
                let (alias, _) = self.expect_ident("import alias")?;
                Some(alias.to_string())
            } else {
                None
            };
            named.push(import_alias(name, alias));
            if !self.match_token(&Token::Comma) {
                break;
            }
        }
        self.expect(&Token::RBrace, "}")?;
        Ok(())
    }

    fn match_string_literal(&mut self) -> Option<String> {
        match self.peek() {
            Some(Token::Str(s)) | Some(Token::SingleStr(s)) => {
                let out = unescape_string(s);
                self.pos += 1;
                Some(out)
            }
            _ => None,
        }
    }

    fn expect_string_literal(&mut self) -> ParseResult<String> {
        let pos = self.current_pos();
        self.match_string_literal().ok_or_else(|| {
            ParseError::unexpected_token(
                pos,
                "string literal",
                self.peek()
                    .map(|t| format!("{t:?}"))
                    .unwrap_or_else(|| "end of input".to_string()),
            )
        })
    }

    // -- components ----------------------------------------------------------

    /// `Ok(Some(_))` is a recognized component, `Ok(None)` means the input
    /// does not have component shape and the caller should reparse it as an
    /// arbitrary block. `Err` is only produced after the returned tree's
    /// opening `<` has been seen.
    fn try_parse_component(&mut self) -> ParseResult<Option<MarkupComponent>> {
        let exported = self.match_token(&Token::Export);

        if self.match_token(&Token::Function) {
            let name = match self.peek() {
                Some(Token::Ident(name)) => {
                    let name = (*name).to_string();
                    self.pos += 1;
                    name
                }
                _ => return Ok(None),
            };
            let param = match self.parse_param_list() {
                Some(param) => param,
                None => return Ok(None),
            };
            if !self.match_token(&Token::LBrace) {
                return Ok(None);
            }
            return self.finish_block_body(name, exported, param);
        }

        if !matches!(
            self.peek(),
            Some(Token::Var) | Some(Token::Let) | Some(Token::Const)
        ) {
            return Ok(None);
        }
        self.pos += 1;

        let name = match self.peek() {
            Some(Token::Ident(name)) => {
                let name = (*name).to_string();
                self.pos += 1;
                name
            }
            _ => return Ok(None),
        };
        if !self.match_token(&Token::Equals) {
            return Ok(None);
        }

        // Arrow function: parenthesized param list or a bare identifier.
        let param = if self.check(&Token::LParen) {
            match self.parse_param_list() {
                Some(param) => param,
                None => return Ok(None),
            }
        } else if let (Some(Token::Ident(n)), Some(Token::Arrow)) =
            (self.peek(), self.peek_at(1))
        {
            let param = Some(function_param(
                false,
                crate::ast::regular_param(*n, None),
            ));
            self.pos += 1;
            param
        } else {
            return Ok(None);
        };
        if !self.match_token(&Token::Arrow) {
            return Ok(None);
        }

        if self.match_token(&Token::LBrace) {
            return self.finish_block_body(name, exported, param);
        }

        // Expression body: `=> (<jsx/>)` or `=> <jsx/>`.
        let parenthesized = self.match_token(&Token::LParen);
        if !self.check(&Token::LAngle) {
            return Ok(None);
        }
        let root = self.parse_jsx_element()?;
        if parenthesized {
            self.expect(&Token::RParen, ")")?;
        }
        self.match_token(&Token::Semicolon);
        let props_used = props_used_from_param(&param);
        Ok(Some(markup_component(
            name,
            exported,
            param,
            props_used,
            JsxElementChild::Element(root),
            None,
        )))
    }

    /// Body after the opening `{`: statements up to a top-depth `return`
    /// become the component's arbitrary block, the returned tree must be
    /// an element.
    fn finish_block_body(
        &mut self,
        name: String,
        exported: bool,
        param: Option<FunctionParam>,
    ) -> ParseResult<Option<MarkupComponent>> {
        let body_start = self.current_pos();
        let mut depth: i32 = 0;
        let prelude_tokens_start = self.pos;

        loop {
            match self.peek() {
                None => return Ok(None),
                Some(Token::Return) if depth == 0 => break,
                Some(Token::LBrace) | Some(Token::LParen) | Some(Token::LBracket) => {
                    depth += 1;
                    self.pos += 1;
                }
                Some(Token::RBrace) if depth == 0 => return Ok(None),
                Some(Token::RBrace) | Some(Token::RParen) | Some(Token::RBracket) => {
                    depth -= 1;
                    self.pos += 1;
                }
                Some(_) => self.pos += 1,
            }
        }

        let prelude_tokens_end = self.pos;
        let prelude_end = self.tokens[self.pos].1.start;
        let arbitrary = if prelude_tokens_start < prelude_tokens_end {
            let javascript = dedent_script(self.source[body_start..prelude_end].trim());
            if javascript.is_empty() {
                None
            } else {
                Some(self.arbitrary_from_range(
                    javascript,
                    prelude_tokens_start..prelude_tokens_end,
                    Span::new(body_start, prelude_end),
                ))
            }
        } else {
            None
        };

        self.expect(&Token::Return, "return")?;
        let parenthesized = self.match_token(&Token::LParen);
        if !self.check(&Token::LAngle) {
            return Ok(None);
        }
        let root = self.parse_jsx_element()?;
        if parenthesized {
            self.expect(&Token::RParen, ")")?;
        }
        self.match_token(&Token::Semicolon);
        self.expect(&Token::RBrace, "}")?;
        self.match_token(&Token::Semicolon);

        let props_used = props_used_from_param(&param);
        Ok(Some(markup_component(
            name,
            exported,
            param,
            props_used,
            JsxElementChild::Element(root),
            arbitrary,
        )))
    }

    // -- parameters ----------------------------------------------------------

    /// `(…)` holding zero or one parameter. Multi-parameter lists are not
    /// component-shaped, as components only ever receive props.
    fn parse_param_list(&mut self) -> Option<Option<FunctionParam>> {
        if !self.match_token(&Token::LParen) {
            return None;
        }
        if self.match_token(&Token::RParen) {
            return Some(None);
        }
        let dotdotdot = self.match_token(&Token::DotDotDot);
        let bound = self.parse_bound_param().ok()?;
        if !self.match_token(&Token::RParen) {
            return None;
        }
        Some(Some(function_param(dotdotdot, bound)))
    }

    fn parse_bound_param(&mut self) -> ParseResult<BoundParam> {
        match self.peek().cloned() {
            Some(Token::Ident(name)) => {
                self.pos += 1;
                let default = if self.match_token(&Token::Equals) {
                    Some(self.parse_bounded_expression()?)
                } else {
                    None
                };
                Ok(crate::ast::regular_param(name, default))
            }
            Some(Token::LBrace) => {
                self.pos += 1;
                let mut parts = Vec::new();
                while !self.check(&Token::RBrace) {
                    parts.push(self.parse_destructured_object_part()?);
                    if !self.match_token(&Token::Comma) {
                        break;
                    }
                }
                self.expect(&Token::RBrace, "}")?;
                Ok(destructured_object(parts))
            }
            Some(Token::LBracket) => {
                self.pos += 1;
                let mut parts = Vec::new();
                loop {
                    if self.match_token(&Token::RBracket) {
                        break;
                    }
                    if self.match_token(&Token::Comma) {
                        parts.push(omitted_param());
                        continue;
                    }
                    let dotdotdot = self.match_token(&Token::DotDotDot);
                    let mut bound = self.parse_bound_param()?;
                    if self.match_token(&Token::Equals) {
                        let default = self.parse_bounded_expression()?;
                        if let BoundParam::Regular {
                            default: slot @ None,
                            ..
                        } = &mut bound
                        {
                            *slot = Some(default);
                        }
                    }
                    parts.push(DestructuredArrayPart::Param(function_param(
                        dotdotdot, bound,
                    )));
                    if !self.match_token(&Token::Comma) {
                        self.expect(&Token::RBracket, "]")?;
                        break;
                    }
                }
                Ok(destructured_array(parts))
            }
            Some(found) => Err(ParseError::unexpected_token(
                self.current_pos(),
                "binding pattern",
                format!("{found:?}"),
            )),
            None => Err(ParseError::unexpected_eof(self.source.len())),
        }
    }

    fn parse_destructured_object_part(&mut self) -> ParseResult<DestructuredParamPart> {
        if self.match_token(&Token::DotDotDot) {
            let (name, _) = self.expect_ident("rest binding")?;
            return Ok(destructured_param_part(
                None,
                function_param(true, crate::ast::regular_param(name, None)),
                None,
            ));
        }
        let (key, _) = self.expect_ident("property name")?;
        if self.match_token(&Token::Colon) {
            // Renamed or nested binding; a default here attaches to the part.
            let bound = self.parse_bound_param()?;
            let default = if self.match_token(&Token::Equals) {
                Some(self.parse_bounded_expression()?)
            } else {
                None
            };
            Ok(destructured_param_part(
                Some(key.to_string()),
                function_param(false, bound),
                default,
            ))
        } else {
            let default = if self.match_token(&Token::Equals) {
                Some(self.parse_bounded_expression()?)
            } else {
                None
            };
            Ok(destructured_param_part(
                None,
                function_param(false, crate::ast::regular_param(key, default)),
                None,
            ))
        }
    }

    /// An expression delimited by the enclosing pattern or list: consumed
    /// up to the first top-depth `,` `)` `}` or `]`, then classified.
    fn parse_bounded_expression(&mut self) -> ParseResult<JsxAttribute> {
        let token_start = self.pos;
        let byte_start = self.current_pos();
        let mut depth: i32 = 0;
        loop {
            match self.peek() {
                None => return Err(ParseError::unexpected_eof(self.source.len())),
                Some(Token::LParen) | Some(Token::LBrace) | Some(Token::LBracket) => {
                    depth += 1;
                    self.pos += 1;
                }
                Some(Token::RParen) | Some(Token::RBrace) | Some(Token::RBracket)
                    if depth == 0 =>
                {
                    break;
                }
                Some(Token::RParen) | Some(Token::RBrace) | Some(Token::RBracket) => {
                    depth -= 1;
                    self.pos += 1;
                }
                Some(Token::Comma) if depth == 0 => break,
                Some(_) => self.pos += 1,
            }
        }
        if self.pos == token_start {
            return Err(ParseError::invalid_syntax(byte_start, "empty expression"));
        }
        let byte_end = self.tokens[self.pos - 1].1.end;
        Ok(self.classify_expression(token_start..self.pos, Span::new(byte_start, byte_end)))
    }

    // -- elements ------------------------------------------------------------

    fn parse_jsx_element(&mut self) -> ParseResult<JsxElement> {
        let open = self.expect(&Token::LAngle, "<")?;
        let name = self.parse_element_name()?;

        let mut attributes: Vec<JsxAttributeEntry> = Vec::new();
        loop {
            if self.match_token(&Token::Slash) {
                let close = self.expect(&Token::RAngle, ">")?;
                let uid = data_uid_of(&attributes);
                return Ok(JsxElement {
                    name,
                    uid,
                    attributes,
                    children: vec![],
                    span: Span::new(open.start, close.end),
                });
            }
            if self.check(&Token::RAngle) {
                break;
            }
            attributes.push(self.parse_jsx_attribute()?);
        }
        let open_end = self.expect(&Token::RAngle, ">")?;

        let mut children: Vec<Arc<JsxElementChild>> = Vec::new();
        let mut text_start = open_end.end;
        let close_end;
        loop {
            let span = self.peek_span();
            match self.peek() {
                None => return Err(ParseError::unexpected_eof(self.source.len())),
                Some(Token::LAngle) if self.peek_at(1) == Some(&Token::Slash) => {
                    push_text_child(&mut children, &self.source[text_start..span.start]);
                    self.pos += 2;
                    let closing = self.parse_element_name()?;
                    if closing != name {
                        return Err(ParseError::invalid_syntax(
                            span.start,
                            format!(
                                "mismatched closing tag: expected </{}>, found </{}>",
                                name.as_string(),
                                closing.as_string()
                            ),
                        ));
                    }
                    close_end = self.expect(&Token::RAngle, ">")?.end;
                    break;
                }
                Some(Token::LAngle) => {
                    push_text_child(&mut children, &self.source[text_start..span.start]);
                    let child = self.parse_jsx_element()?;
                    text_start = child.span.end;
                    children.push(Arc::new(JsxElementChild::Element(child)));
                }
                Some(Token::LBrace) => {
                    push_text_child(&mut children, &self.source[text_start..span.start]);
                    let (child, end) = self.parse_braced_child()?;
                    text_start = end;
                    children.push(Arc::new(child));
                }
                Some(_) => self.pos += 1,
            }
        }

        let uid = data_uid_of(&attributes);
        Ok(JsxElement {
            name,
            uid,
            attributes,
            children,
            span: Span::new(open.start, close_end),
        })
    }

    /// `Base` then `.Part` repeats, plus glued `-` segments for dashed tag
    /// names. Glued segments must be adjacent in the source.
    fn parse_element_name(&mut self) -> ParseResult<ElementName> {
        let (first, first_span) = self.expect_ident("element name")?;
        let mut end = first_span.end;
        let mut glued = first.to_string();
        loop {
            match (self.peek(), self.peek_at(1)) {
                (Some(Token::Dot), Some(Token::Ident(_))) => {
                    self.pos += 1;
                    let (part, span) = self.expect_ident("element name part")?;
                    glued.push('.');
                    glued.push_str(part);
                    end = span.end;
                }
                (Some(Token::Minus), Some(Token::Ident(_)))
                    if self.peek_span().start == end =>
                {
                    self.pos += 1;
                    let (part, span) = self.expect_ident("element name part")?;
                    if span.start != end + 1 {
                        return Err(ParseError::invalid_syntax(
                            span.start,
                            "whitespace inside element name",
                        ));
                    }
                    glued.push('-');
                    glued.push_str(part);
                    end = span.end;
                }
                _ => break,
            }
        }
        Ok(element_name(&glued))
    }

    /// `name`, glued across adjacent `-` tokens (`data-uid`).
    fn parse_attribute_name(&mut self) -> ParseResult<String> {
        let (first, first_span) = self.expect_ident("attribute name")?;
        let mut end = first_span.end;
        let mut glued = first.to_string();
        while let (Some(Token::Minus), Some(Token::Ident(_))) = (self.peek(), self.peek_at(1)) {
            if self.peek_span().start != end {
                break;
            }
            self.pos += 1;
            let (part, span) = self.expect_ident("attribute name part")?;
            if span.start != end + 1 {
                return Err(ParseError::invalid_syntax(
                    span.start,
                    "whitespace inside attribute name",
                ));
            }
            glued.push('-');
            glued.push_str(part);
            end = span.end;
        }
        Ok(glued)
    }

    fn parse_jsx_attribute(&mut self) -> ParseResult<JsxAttributeEntry> {
        let key = self.parse_attribute_name()?;
        if !self.match_token(&Token::Equals) {
            // Bare attribute, e.g. `<input disabled />`.
            return Ok(jsx_attribute_entry(
                key,
                JsxAttribute::Value {
                    value: serde_json::Value::Bool(true),
                    span: Span::ZERO,
                },
            ));
        }
        let span = self.peek_span();
        let value = match self.peek() {
            Some(Token::Str(s)) | Some(Token::SingleStr(s)) => {
                let value = serde_json::Value::String(unescape_string(s));
                self.pos += 1;
                JsxAttribute::Value {
                    value,
                    span: Span::new(span.start, span.end),
                }
            }
            Some(Token::LBrace) => self.parse_braced_attribute_value()?,
            Some(found) => {
                return Err(ParseError::unexpected_token(
                    span.start,
                    "attribute value",
                    format!("{found:?}"),
                ))
            }
            None => return Err(ParseError::unexpected_eof(self.source.len())),
        };
        Ok(jsx_attribute_entry(key, value))
    }

    fn parse_braced_attribute_value(&mut self) -> ParseResult<JsxAttribute> {
        let (inner, _end) = self.consume_braced_region()?;
        Ok(self.classify_expression(inner.0, inner.1))
    }

    /// A `{…}` child: a simple literal becomes a value child, anything
    /// else an embedded arbitrary block. Returns the byte offset just past
    /// the closing brace so text slurping can resume there.
    fn parse_braced_child(&mut self) -> ParseResult<(JsxElementChild, usize)> {
        let (inner, end) = self.consume_braced_region()?;
        let (token_range, byte_span) = inner;
        let attribute = self.classify_expression(token_range.clone(), byte_span);
        let child = match attribute {
            JsxAttribute::OtherJavaScript {
                javascript,
                transpiled,
                defined_elsewhere,
                span,
            } => JsxElementChild::Arbitrary(ArbitraryBlock {
                javascript,
                transpiled,
                defined_within: vec![],
                defined_elsewhere,
                span: span.unwrap_or(Span::ZERO),
            }),
            simple => JsxElementChild::Value(simple),
        };
        Ok((child, end))
    }

    /// Consume `{ … }` and return the inner token range, its byte span
    /// and the byte offset just past the closing brace.
    fn consume_braced_region(&mut self) -> ParseResult<((Range<usize>, Span), usize)> {
        let open = self.expect(&Token::LBrace, "{")?;
        let token_start = self.pos;
        let mut depth: i32 = 1;
        while depth > 0 {
            match self.peek() {
                None => return Err(ParseError::unexpected_eof(self.source.len())),
                Some(Token::LBrace) => depth += 1,
                Some(Token::RBrace) => depth -= 1,
                Some(_) => {}
            }
            if depth > 0 {
                self.pos += 1;
            }
        }
        let token_end = self.pos;
        let close = self.expect(&Token::RBrace, "}")?;
        let byte_span = if token_start < token_end {
            Span::new(
                self.tokens[token_start].1.start,
                self.tokens[token_end - 1].1.end,
            )
        } else {
            Span::new(open.end, close.start)
        };
        Ok(((token_start..token_end, byte_span), close.end))
    }

    // -- expression classification -------------------------------------------

    /// Simple literal, then single function call over simple literals,
    /// then raw script. Nothing is dropped: the raw form keeps the user's
    /// exact text.
    fn classify_expression(&self, tokens: Range<usize>, byte_span: Span) -> JsxAttribute {
        if let Some(value) = self.try_simple_value(tokens.clone()) {
            return JsxAttribute::Value {
                value,
                span: byte_span,
            };
        }
        if let Some(call) = self.try_function_call(tokens.clone()) {
            return call;
        }
        let javascript = self.source[byte_span.start..byte_span.end].to_string();
        let transpiled = transpile_expression(&javascript);
        let defined_elsewhere = self.collect_free_identifiers(tokens);
        JsxAttribute::OtherJavaScript {
            javascript,
            transpiled,
            defined_elsewhere,
            span: Some(byte_span),
        }
    }

    fn try_simple_value(&self, tokens: Range<usize>) -> Option<serde_json::Value> {
        let slice = &self.tokens[tokens];
        let mut idx = 0;
        let value = parse_simple_value(slice, &mut idx)?;
        if idx == slice.len() {
            Some(value)
        } else {
            None
        }
    }

    fn try_function_call(&self, tokens: Range<usize>) -> Option<JsxAttribute> {
        let slice = &self.tokens[tokens];
        let name = match slice.first() {
            Some((Token::Ident(name), _)) => (*name).to_string(),
            _ => return None,
        };
        if !matches!(slice.get(1), Some((Token::LParen, _))) {
            return None;
        }
        if !matches!(slice.last(), Some((Token::RParen, _))) {
            return None;
        }
        let inner = &slice[2..slice.len() - 1];
        let mut arguments = Vec::new();
        let mut idx = 0;
        while idx < inner.len() {
            let value = parse_simple_value(inner, &mut idx)?;
            arguments.push(JsxAttribute::Value {
                value,
                span: Span::ZERO,
            });
            if idx < inner.len() {
                match inner[idx].0 {
                    Token::Comma => idx += 1,
                    _ => return None,
                }
            }
        }
        Some(JsxAttribute::FunctionCall {
            function_name: name,
            arguments,
        })
    }

    /// Identifier names an expression references from outer scope. Object
    /// keys and property accesses are not references.
    fn collect_free_identifiers(&self, tokens: Range<usize>) -> Vec<String> {
        let slice = &self.tokens[tokens];
        let mut out: Vec<String> = Vec::new();
        for (idx, (token, _)) in slice.iter().enumerate() {
            if let Token::Ident(name) = token {
                let after_dot = idx > 0 && matches!(slice[idx - 1].0, Token::Dot);
                let before_colon = matches!(slice.get(idx + 1), Some((Token::Colon, _)));
                if !after_dot && !before_colon && !out.iter().any(|n| n == name) {
                    out.push((*name).to_string());
                }
            }
        }
        out
    }

    // -- arbitrary top-level blocks ------------------------------------------

    /// Slurp one statement-ish run of tokens verbatim. Ends at a top-depth
    /// `;`, at a `}` that closes back to the top depth, or just before a
    /// top-depth `export` or `import`.
    fn parse_arbitrary_top_level(&mut self) -> ParseResult<ArbitraryBlock> {
        let token_start = self.pos;
        let byte_start = self.current_pos();
        let mut depth: i32 = 0;

        while let Some(token) = self.peek() {
            match token {
                Token::LBrace | Token::LParen | Token::LBracket => {
                    depth += 1;
                    self.pos += 1;
                }
                Token::RBrace | Token::RParen | Token::RBracket => {
                    depth -= 1;
                    self.pos += 1;
                    if depth <= 0 && matches!(self.tokens[self.pos - 1].0, Token::RBrace) {
                        break;
                    }
                    if depth < 0 {
                        return Err(ParseError::invalid_syntax(
                            self.tokens[self.pos - 1].1.start,
                            "unbalanced delimiter",
                        ));
                    }
                }
                Token::Semicolon if depth == 0 => {
                    self.pos += 1;
                    break;
                }
                Token::Export | Token::Import if depth == 0 && self.pos != token_start => break,
                _ => self.pos += 1,
            }
        }

        if self.pos == token_start {
            return Err(ParseError::unexpected_eof(self.source.len()));
        }
        let byte_end = self.tokens[self.pos - 1].1.end;
        let javascript = self.source[byte_start..byte_end].trim().to_string();
        Ok(self.arbitrary_from_range(
            javascript,
            token_start..self.pos,
            Span::new(byte_start, byte_end),
        ))
    }

    fn arbitrary_from_range(
        &self,
        javascript: String,
        tokens: Range<usize>,
        span: Span,
    ) -> ArbitraryBlock {
        let slice = &self.tokens[tokens.clone()];
        let mut defined_within: Vec<String> = Vec::new();
        for (idx, (token, _)) in slice.iter().enumerate() {
            let declares = matches!(
                token,
                Token::Var | Token::Let | Token::Const | Token::Function
            );
            if declares {
                if let Some((Token::Ident(name), _)) = slice.get(idx + 1) {
                    if !defined_within.iter().any(|n| n == name) {
                        defined_within.push((*name).to_string());
                    }
                }
            }
        }
        let defined_elsewhere = self
            .collect_free_identifiers(tokens)
            .into_iter()
            .filter(|name| !defined_within.contains(name))
            .collect();
        let mut block = arbitrary_block(
            javascript.clone(),
            javascript,
            defined_within,
            defined_elsewhere,
        );
        block.span = span;
        block
    }
}

// ---------------------------------------------------------------------------
// Free helpers
// ---------------------------------------------------------------------------

fn data_uid_of(attributes: &[JsxAttributeEntry]) -> String {
    attributes
        .iter()
        .find(|entry| entry.key == DATA_UID_KEY)
        .and_then(|entry| entry.value.as_string_literal())
        .unwrap_or("")
        .to_string()
}

fn push_text_child(children: &mut Vec<Arc<JsxElementChild>>, raw: &str) {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if !collapsed.is_empty() {
        children.push(Arc::new(JsxElementChild::Value(JsxAttribute::Value {
            value: serde_json::Value::String(collapsed),
            span: Span::ZERO,
        })));
    }
}

/// Strip the common leading indentation from continuation lines. Stored
/// script is re-indented by the printer, so the captured text must not keep
/// the source's own indent or each print cycle would deepen it.
fn dedent_script(script: &str) -> String {
    let mut lines = script.lines();
    let first = match lines.next() {
        Some(first) => first.trim_end(),
        None => return String::new(),
    };
    let continuation: Vec<&str> = lines.collect();
    let indent = continuation
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);
    let mut out = first.to_string();
    for line in continuation {
        out.push('\n');
        if !line.trim().is_empty() {
            out.push_str(line[indent..].trim_end());
        }
    }
    out
}

/// `return <expr>;` form of an expression, with object literals wrapped in
/// parentheses so the braces are not read as a block.
pub fn transpile_expression(javascript: &str) -> String {
    if javascript.trim_start().starts_with('{') {
        format!("return ({javascript});")
    } else {
        format!("return {javascript};")
    }
}

/// Names a component body can see from a top-level destructured props
/// object; every non-rest part's source-side key.
fn props_used_from_param(param: &Option<FunctionParam>) -> Vec<String> {
    match param {
        Some(FunctionParam {
            bound: BoundParam::DestructuredObject { parts },
            ..
        }) => parts
            .iter()
            .filter(|part| !part.param.dotdotdot)
            .filter_map(|part| match &part.property_key {
                Some(key) => Some(key.clone()),
                None => match &part.param.bound {
                    BoundParam::Regular { name, .. } => Some(name.clone()),
                    _ => None,
                },
            })
            .collect(),
        _ => vec![],
    }
}

fn parse_simple_value(
    tokens: &[(Token<'_>, Range<usize>)],
    idx: &mut usize,
) -> Option<serde_json::Value> {
    let (token, _) = tokens.get(*idx)?;
    match token {
        Token::Str(s) | Token::SingleStr(s) => {
            *idx += 1;
            Some(serde_json::Value::String(unescape_string(s)))
        }
        Token::True => {
            *idx += 1;
            Some(serde_json::Value::Bool(true))
        }
        Token::False => {
            *idx += 1;
            Some(serde_json::Value::Bool(false))
        }
        Token::Null => {
            *idx += 1;
            Some(serde_json::Value::Null)
        }
        Token::Number(raw) => {
            *idx += 1;
            Some(number_value(raw, false)?)
        }
        Token::Minus => {
            if let Some((Token::Number(raw), _)) = tokens.get(*idx + 1) {
                *idx += 2;
                Some(number_value(raw, true)?)
            } else {
                None
            }
        }
        Token::LBrace => {
            *idx += 1;
            let mut map = serde_json::Map::new();
            loop {
                match tokens.get(*idx)?.0 {
                    Token::RBrace => {
                        *idx += 1;
                        return Some(serde_json::Value::Object(map));
                    }
                    _ => {}
                }
                let key = match &tokens.get(*idx)?.0 {
                    Token::Ident(name) => (*name).to_string(),
                    Token::Str(s) | Token::SingleStr(s) => unescape_string(s),
                    _ => return None,
                };
                *idx += 1;
                if !matches!(tokens.get(*idx)?.0, Token::Colon) {
                    return None;
                }
                *idx += 1;
                let value = parse_simple_value(tokens, idx)?;
                map.insert(key, value);
                match tokens.get(*idx)?.0 {
                    Token::Comma => *idx += 1,
                    Token::RBrace => {}
                    _ => return None,
                }
            }
        }
        Token::LBracket => {
            *idx += 1;
            let mut items = Vec::new();
            loop {
                if matches!(tokens.get(*idx)?.0, Token::RBracket) {
                    *idx += 1;
                    return Some(serde_json::Value::Array(items));
                }
                items.push(parse_simple_value(tokens, idx)?);
                match tokens.get(*idx)?.0 {
                    Token::Comma => *idx += 1,
                    Token::RBracket => {}
                    _ => return None,
                }
            }
        }
        _ => None,
    }
}

fn number_value(raw: &str, negative: bool) -> Option<serde_json::Value> {
    if raw.contains('.') {
        let n: f64 = raw.parse().ok()?;
        let n = if negative { -n } else { n };
        serde_json::Number::from_f64(n).map(serde_json::Value::Number)
    } else {
        let n: i64 = raw.parse().ok()?;
        let n = if negative { -n } else { n };
        Some(serde_json::Value::Number(n.into()))
    }
}

fn unescape_string(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn offset_to_line_col(source: &str, offset: usize) -> (usize, usize) {
    let mut line = 0;
    let mut col = 0;
    for (idx, c) in source.char_indices() {
        if idx >= offset {
            break;
        }
        if c == '\n' {
            line += 1;
            col = 0;
        } else {
            col += 1;
        }
    }
    (line, col)
}

fn compute_highlight_bounds(
    source: &str,
    elements: &[Arc<TopLevelElement>],
) -> HashMap<String, HighlightBounds> {
    let mut bounds = HashMap::new();
    for element in elements {
        if let TopLevelElement::Component(component) = element.as_ref() {
            collect_bounds(source, &component.root_element, &mut bounds);
        }
    }
    bounds
}

fn collect_bounds(
    source: &str,
    child: &JsxElementChild,
    bounds: &mut HashMap<String, HighlightBounds>,
) {
    if let JsxElementChild::Element(element) = child {
        if !element.uid.is_empty() && element.span != Span::ZERO {
            let (start_line, start_col) = offset_to_line_col(source, element.span.start);
            let (end_line, end_col) = offset_to_line_col(source, element.span.end);
            bounds.insert(
                element.uid.clone(),
                HighlightBounds {
                    start_line,
                    start_col,
                    end_line,
                    end_col,
                    uid: element.uid.clone(),
                },
            );
        }
        for child in &element.children {
            collect_bounds(source, child, bounds);
        }
    }
}
