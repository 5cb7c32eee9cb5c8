//! Turning pasted snippets into insertable elements.
//!
//! A snippet arrives as raw text plus the import lines it assumes. It is
//! wrapped in a synthetic component, parsed through the executor seam and
//! the wrapper's root is extracted with its uids stripped so the receiving
//! tree can assign fresh ones. Results, including failures, are cached by
//! the exact imports+snippet text.

use crate::errors::InsertError;
use crate::worker::{parse_file, ParseJobExecutor, ParseJobResult};
use reframe_parser::ast::{strip_element_uids, Imports, JsxElement, TopLevelElement};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

/// Name of the synthetic component the snippet is wrapped in. Unusual on
/// purpose so it cannot collide with user code.
pub const WRAPPER_COMPONENT: &str = "Reframe$$Wrapper";

/// An element ready to insert, with the imports the target file must gain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertableElement {
    pub imports_to_add: Imports,
    pub element_to_insert: JsxElement,
}

/// Wrap a snippet in a parseable file.
fn wrap_snippet(imports: &str, snippet: &str) -> String {
    format!(
        "{imports}\nvar {WRAPPER_COMPONENT} = (props) => {{\n  return (\n{snippet}\n  )\n}}\n"
    )
}

fn cache_key(imports: &str, snippet: &str) -> String {
    format!("{imports}\n{snippet}")
}

/// Parse a snippet and extract the wrapper's root element.
pub fn parse_snippet(
    executor: &dyn ParseJobExecutor,
    imports: &str,
    snippet: &str,
) -> Result<InsertableElement, InsertError> {
    let code = wrap_snippet(imports, snippet);
    let mut results = executor.submit_parse_job(vec![parse_file("/snippet.js", code, 0)]);
    if results.is_empty() {
        return Err(InsertError::Parse(
            "parse job returned no results".to_string(),
        ));
    }
    let ParseJobResult::ParseFileResult { parse_result, .. } = results.remove(0);
    let success = match parse_result {
        Ok(success) => success,
        Err(failure) => return Err(InsertError::Parse(failure.joined_messages())),
    };

    let wrapper = success
        .top_level_elements
        .iter()
        .find_map(|tle| match tle.as_ref() {
            TopLevelElement::Component(component) if component.name == WRAPPER_COMPONENT => {
                Some(component)
            }
            _ => None,
        });
    if let Some(component) = wrapper {
        return match component.root_element.as_element() {
            Some(element) => {
                if component_requires_import(element, &success.imports) {
                    return Err(InsertError::RequiresImport);
                }
                Ok(InsertableElement {
                    imports_to_add: success.imports.clone(),
                    element_to_insert: strip_element_uids(element),
                })
            }
            None => Err(InsertError::NotAnElement),
        };
    }

    // No component: the wrapper statement fell back to an arbitrary block,
    // so the snippet's body could not be read as an element tree in the
    // scope the imports set up.
    let swallowed_by_arbitrary = success.top_level_elements.iter().any(|tle| {
        tle.as_arbitrary()
            .map(|block| block.defined_within.iter().any(|n| n == WRAPPER_COMPONENT))
            .unwrap_or(false)
    });
    if swallowed_by_arbitrary {
        Err(InsertError::RequiresImport)
    } else {
        Err(InsertError::WrapperComponentNotFound)
    }
}

/// A capitalized tag is a component reference and must resolve through
/// the snippet's imports; lowercase tags are intrinsic.
fn component_requires_import(element: &JsxElement, imports: &Imports) -> bool {
    let base = &element.name.base_variable;
    let capitalized = base.chars().next().map(char::is_uppercase).unwrap_or(false);
    if capitalized && !imports_provide(imports, base) {
        return true;
    }
    element.children.iter().any(|child| {
        child
            .as_element()
            .map(|e| component_requires_import(e, imports))
            .unwrap_or(false)
    })
}

fn imports_provide(imports: &Imports, name: &str) -> bool {
    imports.iter().any(|import| {
        import.default_import.as_deref() == Some(name)
            || import.star_as.as_deref() == Some(name)
            || import
                .named
                .iter()
                .any(|alias| alias.alias.as_deref().unwrap_or(&alias.name) == name)
    })
}

/// Memoized snippet parsing. Failures are cached too: reparsing the same
/// broken snippet gives the same error without another parse job.
#[derive(Debug, Default)]
pub struct SnippetCache {
    entries: Mutex<HashMap<String, Result<InsertableElement, InsertError>>>,
}

impl SnippetCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get_or_parse(
        &self,
        executor: &dyn ParseJobExecutor,
        imports: &str,
        snippet: &str,
    ) -> Result<InsertableElement, InsertError> {
        let key = cache_key(imports, snippet);
        if let Some(cached) = self.entries.lock().unwrap().get(&key) {
            debug!("snippet cache hit");
            return cached.clone();
        }
        let result = parse_snippet(executor, imports, snippet);
        self.entries
            .lock()
            .unwrap()
            .insert(key, result.clone());
        result
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::{LocalParseExecutor, ParseFile};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Executor that counts how many jobs actually run.
    #[derive(Default)]
    struct CountingExecutor {
        inner: LocalParseExecutor,
        jobs: AtomicUsize,
    }

    impl ParseJobExecutor for CountingExecutor {
        fn submit_parse_job(&self, files: Vec<ParseFile>) -> Vec<ParseJobResult> {
            self.jobs.fetch_add(files.len(), Ordering::SeqCst);
            self.inner.submit_parse_job(files)
        }
    }

    #[test]
    fn test_snippet_parses_to_stripped_element() {
        let executor = LocalParseExecutor::new();
        let result = parse_snippet(
            &executor,
            "import { View } from 'reframe-components'",
            "<View style={{ left: 0 }} data-uid={'aaa'} />",
        )
        .expect("snippet should parse");
        assert_eq!(result.element_to_insert.name.as_string(), "View");
        assert!(result.element_to_insert.attribute("data-uid").is_none());
        assert_eq!(result.element_to_insert.uid, "");
        assert_eq!(result.imports_to_add.len(), 1);
        assert_eq!(result.imports_to_add[0].source, "reframe-components");
    }

    #[test]
    fn test_snippet_strips_nested_uids() {
        let executor = LocalParseExecutor::new();
        let result = parse_snippet(
            &executor,
            "",
            "<div data-uid={'aaa'}><span data-uid={'bbb'} /></div>",
        )
        .expect("snippet should parse");
        let child = result.element_to_insert.children[0].as_element().unwrap();
        assert!(child.attribute("data-uid").is_none());
    }

    #[test]
    fn test_non_element_snippet_is_rejected() {
        let executor = LocalParseExecutor::new();
        let error = parse_snippet(&executor, "", "if (x) { doThing() }")
            .expect_err("statement snippet is not an element");
        assert_eq!(error, InsertError::RequiresImport);
    }

    #[test]
    fn test_unparseable_snippet_reports_parse_error() {
        let executor = LocalParseExecutor::new();
        let error = parse_snippet(&executor, "", "<View data-uid={")
            .expect_err("unterminated snippet should fail");
        assert!(matches!(error, InsertError::Parse(_)));
    }

    #[test]
    fn test_capitalized_tag_without_import_is_rejected() {
        let executor = LocalParseExecutor::new();
        let error = parse_snippet(&executor, "", "<MyComponent data-uid={'aaa'} />")
            .expect_err("unimported component should be rejected");
        assert_eq!(error, InsertError::RequiresImport);
    }

    #[test]
    fn test_cache_returns_identical_results_without_reparsing() {
        let executor = LocalParseExecutor::new();
        let cache = SnippetCache::new();
        let first = cache.get_or_parse(&executor, "", "<div data-uid={'aaa'} />");
        let second = cache.get_or_parse(&executor, "", "<div data-uid={'aaa'} />");
        assert_eq!(first, second);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_hit_skips_the_executor() {
        let executor = CountingExecutor::default();
        let cache = SnippetCache::new();
        cache.get_or_parse(&executor, "", "<div data-uid={'aaa'} />").unwrap();
        cache.get_or_parse(&executor, "", "<div data-uid={'aaa'} />").unwrap();
        cache.get_or_parse(&executor, "", "<div data-uid={'aaa'} />").unwrap();
        assert_eq!(executor.jobs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cache_keys_include_imports() {
        let executor = LocalParseExecutor::new();
        let cache = SnippetCache::new();
        cache
            .get_or_parse(&executor, "import { View } from 'a'", "<View />")
            .unwrap();
        cache
            .get_or_parse(&executor, "import { View } from 'b'", "<View />")
            .unwrap();
        assert_eq!(cache.len(), 2);
    }

    /// Executor that drops its jobs on the floor.
    struct SilentExecutor;

    impl ParseJobExecutor for SilentExecutor {
        fn submit_parse_job(&self, _files: Vec<ParseFile>) -> Vec<ParseJobResult> {
            vec![]
        }
    }

    #[test]
    fn test_executor_returning_no_results_is_an_error() {
        let result = parse_snippet(&SilentExecutor, "", "<div />");
        assert!(matches!(result, Err(InsertError::Parse(_))));
    }

    #[test]
    fn test_cache_caches_failures() {
        let executor = LocalParseExecutor::new();
        let cache = SnippetCache::new();
        let first = cache.get_or_parse(&executor, "", "<View data-uid={");
        let second = cache.get_or_parse(&executor, "", "<View data-uid={");
        assert!(matches!(first, Err(InsertError::Parse(_))));
        assert_eq!(first, second);
        assert_eq!(cache.len(), 1);
    }
}
