//! End-to-end flows across the parser and the editor services: parse a
//! file through the worker seam, insert a snippet into it, map its
//! storyboard to scenes and print the result back out.

use anyhow::Result;
use reframe_common::visitor::{collect_element_uids, find_element_by_uid};
use reframe_editor::{
    find_canvas_component, parse_file, parse_snippet, scene_uid_from_index, InsertError,
    LocalParseExecutor, ParseJobExecutor, ParseJobResult, SnippetCache,
};
use reframe_parser::ast::{JsxElementChild, MarkupComponent, TopLevelElement};
use reframe_parser::{parse_code, print_parse_success, PrintOptions};
use std::sync::Arc;

const PROJECT_FILE: &str = "import React from 'react'\n\
                            import { View } from 'reframe-components'\n\
                            \n\
                            export var App = (props) => {\n\
                            \x20 return (\n\
                            \x20   <View style={{ left: 0, top: 0 }} data-uid={'aaa'}>\n\
                            \x20     <View data-uid={'bbb'} />\n\
                            \x20   </View>\n\
                            \x20 )\n\
                            }\n\
                            \n\
                            export var storyboard = (props) => {\n\
                            \x20 return (\n\
                            \x20   <Storyboard data-uid={'storyboard-entity'}>\n\
                            \x20     <Scene component={App} style={{ left: 0, top: 0, width: 375, height: 812 }} data-uid={'scene-0'} />\n\
                            \x20   </Storyboard>\n\
                            \x20 )\n\
                            }\n";

#[test]
fn parse_project_file_through_worker() -> Result<()> {
    let executor = LocalParseExecutor::new();
    let results = executor.submit_parse_job(vec![parse_file("/app.js", PROJECT_FILE, 1)]);
    let ParseJobResult::ParseFileResult { parse_result, .. } = &results[0];
    let success = parse_result.as_ref().map_err(|e| anyhow::anyhow!(e.clone()))?;
    assert_eq!(success.imports.len(), 2);
    assert_eq!(success.top_level_elements.len(), 2);

    // Every element is reachable and has a unique uid.
    let uids = collect_element_uids(success);
    let mut deduped = uids.clone();
    deduped.sort();
    deduped.dedup();
    assert_eq!(uids.len(), deduped.len());
    assert_eq!(
        find_element_by_uid(success, "bbb").map(|e| e.name.as_string()),
        Some("View".to_string())
    );
    Ok(())
}

#[test]
fn insert_snippet_into_parsed_file() -> Result<()> {
    let executor = LocalParseExecutor::new();
    let success = parse_code("/app.js", PROJECT_FILE).map_err(anyhow::Error::from)?;

    let insertable = parse_snippet(
        &executor,
        "import { View } from 'reframe-components'",
        "<View style={{ left: 10 }} data-uid={'xxx'} />",
    )?;
    assert_eq!(insertable.element_to_insert.uid, "");

    // Graft the stripped element under the app root and re-run the uid
    // pass; the new element gains a fresh id, siblings keep theirs.
    let app = success.top_level_elements[0]
        .as_component()
        .expect("app component")
        .clone();
    let root = app.root_element.as_element().expect("element root").clone();
    let mut grafted = root.clone();
    grafted.children.push(Arc::new(JsxElementChild::Element(
        insertable.element_to_insert.clone(),
    )));
    let updated = Arc::new(TopLevelElement::Component(MarkupComponent {
        root_element: Arc::new(JsxElementChild::Element(grafted)),
        ..app
    }));
    let fixed = reframe_parser::guarantee_unique_uids(vec![updated]);
    let fixed_root = fixed[0]
        .as_component()
        .unwrap()
        .root_element
        .as_element()
        .unwrap();
    assert_eq!(fixed_root.uid, "aaa");
    let inserted = fixed_root.children.last().unwrap().as_element().unwrap();
    assert!(!inserted.uid.is_empty());
    assert_ne!(inserted.uid, "aaa");
    assert_ne!(inserted.uid, "bbb");
    Ok(())
}

#[test]
fn snippet_cache_shared_across_insertions() {
    let executor = LocalParseExecutor::new();
    let cache = SnippetCache::new();
    for _ in 0..3 {
        let result = cache.get_or_parse(
            &executor,
            "import { View } from 'reframe-components'",
            "<View data-uid={'xxx'} />",
        );
        assert!(result.is_ok());
    }
    assert_eq!(cache.len(), 1);

    let failure = cache.get_or_parse(&executor, "", "<Widget />");
    assert_eq!(failure, Err(InsertError::RequiresImport));
    assert_eq!(cache.len(), 2);
}

#[test]
fn storyboard_scenes_survive_print_and_reparse() -> Result<()> {
    let success = parse_code("/app.js", PROJECT_FILE).map_err(anyhow::Error::from)?;
    let canvas = find_canvas_component(&success).expect("storyboard present");
    let scenes = reframe_editor::canvas_component_to_scenes(canvas);
    assert_eq!(scenes.len(), 1);
    assert_eq!(scenes[0].uid, scene_uid_from_index(0));
    assert_eq!(scenes[0].component.as_deref(), Some("App"));

    let printed = print_parse_success(&success, PrintOptions::default());
    let reparsed = parse_code("/app.js", &printed).map_err(anyhow::Error::from)?;
    let canvas_again = find_canvas_component(&reparsed).expect("storyboard survives printing");
    assert_eq!(reframe_editor::canvas_component_to_scenes(canvas_again), scenes);
    Ok(())
}
