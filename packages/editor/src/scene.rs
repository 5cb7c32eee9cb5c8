//! Scene metadata over the canvas component.
//!
//! The canvas is stored in user code as a component returning a
//! `Storyboard` element whose children are `Scene` elements. This module
//! maps between those elements and [`SceneMetadata`], the value form the
//! editor's canvas works with. Mapping is lossless in both directions: a
//! scene without a label stays label-free rather than gaining an empty
//! string.

use reframe_parser::ast::{
    jsx_attribute_entry, jsx_attribute_other_javascript, jsx_attribute_value, jsx_element,
    JsxAttribute, JsxAttributeEntry, JsxElement, JsxElementChild, MarkupComponent, ParseSuccess,
    TopLevelElement, DATA_UID_KEY,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

pub const STORYBOARD_UID: &str = "storyboard-entity";
pub const STORYBOARD_ELEMENT_NAME: &str = "Storyboard";
pub const STORYBOARD_VARIABLE_NAME: &str = "storyboard";
pub const SCENE_ELEMENT_NAME: &str = "Scene";

const LABEL_KEY: &str = "data-label";

/// One canvas scene, as a plain value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneMetadata {
    pub uid: String,
    /// Name of the component the scene renders, when one is assigned.
    pub component: Option<String>,
    pub props: serde_json::Value,
    pub frame: serde_json::Value,
    pub layout: serde_json::Value,
    pub label: Option<String>,
}

pub fn scene_uid_from_index(index: usize) -> String {
    format!("scene-{index}")
}

/// A fresh scene showing `component_name`, positioned by index.
pub fn create_scene_from_component(component_name: &str, index: usize) -> SceneMetadata {
    SceneMetadata {
        uid: scene_uid_from_index(index),
        component: Some(component_name.to_string()),
        props: serde_json::json!({}),
        frame: serde_json::json!({
            "left": (index as i64) * 400,
            "top": 0,
            "width": 375,
            "height": 812,
        }),
        layout: serde_json::Value::Null,
        label: None,
    }
}

/// Scene metadata to its element form.
pub fn map_scene(scene: &SceneMetadata) -> JsxElement {
    let mut attributes: Vec<JsxAttributeEntry> = Vec::new();
    if let Some(component) = &scene.component {
        attributes.push(jsx_attribute_entry(
            "component",
            jsx_attribute_other_javascript(
                component.clone(),
                format!("return {component};"),
                vec![component.clone()],
                None,
            ),
        ));
    }
    if !scene.props.is_null() {
        attributes.push(jsx_attribute_entry(
            "props",
            jsx_attribute_value(scene.props.clone()),
        ));
    }
    attributes.push(jsx_attribute_entry(
        "style",
        jsx_attribute_value(scene.frame.clone()),
    ));
    if !scene.layout.is_null() {
        attributes.push(jsx_attribute_entry(
            "layout",
            jsx_attribute_value(scene.layout.clone()),
        ));
    }
    if let Some(label) = &scene.label {
        attributes.push(jsx_attribute_entry(
            LABEL_KEY,
            jsx_attribute_value(label.clone()),
        ));
    }
    attributes.push(jsx_attribute_entry(
        DATA_UID_KEY,
        jsx_attribute_value(scene.uid.clone()),
    ));
    jsx_element(SCENE_ELEMENT_NAME, scene.uid.clone(), attributes, vec![])
}

/// A `Scene` element back to metadata. Anything other than a `Scene`
/// element gives `None`.
pub fn unmap_scene(element: &JsxElement) -> Option<SceneMetadata> {
    if element.name.as_string() != SCENE_ELEMENT_NAME {
        return None;
    }
    let uid = element
        .data_uid_literal()
        .map(str::to_string)
        .unwrap_or_else(|| element.uid.clone());
    let component = match element.attribute("component") {
        Some(JsxAttribute::OtherJavaScript { javascript, .. }) => {
            Some(javascript.trim().to_string())
        }
        Some(attr) => attr.as_string_literal().map(str::to_string),
        None => None,
    };
    let value_of = |key: &str| match element.attribute(key) {
        Some(JsxAttribute::Value { value, .. }) => value.clone(),
        _ => serde_json::Value::Null,
    };
    // An absent label and a label-less scene are the same thing.
    let label = element
        .attribute(LABEL_KEY)
        .and_then(|attr| attr.as_string_literal())
        .map(str::to_string);
    Some(SceneMetadata {
        uid,
        component,
        props: value_of("props"),
        frame: value_of("style"),
        layout: value_of("layout"),
        label,
    })
}

/// The `Storyboard` element holding the given scenes.
pub fn create_storyboard_element(scenes: &[SceneMetadata]) -> JsxElement {
    jsx_element(
        STORYBOARD_ELEMENT_NAME,
        STORYBOARD_UID,
        vec![jsx_attribute_entry(
            DATA_UID_KEY,
            jsx_attribute_value(STORYBOARD_UID),
        )],
        scenes
            .iter()
            .map(|scene| Arc::new(JsxElementChild::Element(map_scene(scene))))
            .collect(),
    )
}

/// The whole canvas component for a set of scenes.
pub fn scenes_to_canvas_component(scenes: &[SceneMetadata]) -> MarkupComponent {
    MarkupComponent {
        name: STORYBOARD_VARIABLE_NAME.to_string(),
        exported: true,
        param: None,
        props_used: vec![],
        root_element: Arc::new(JsxElementChild::Element(create_storyboard_element(scenes))),
        arbitrary_block: None,
    }
}

/// Scenes of a canvas component; non-`Scene` children are skipped.
pub fn canvas_component_to_scenes(component: &MarkupComponent) -> Vec<SceneMetadata> {
    component
        .root_element
        .as_element()
        .map(|root| {
            root.children
                .iter()
                .filter_map(|child| child.as_element())
                .filter_map(unmap_scene)
                .collect()
        })
        .unwrap_or_default()
}

/// The component in a parsed file whose root is a `Storyboard` element.
pub fn find_canvas_component(success: &ParseSuccess) -> Option<&MarkupComponent> {
    success
        .top_level_elements
        .iter()
        .filter_map(|tle| tle.as_component())
        .find(|component| {
            component
                .root_element
                .as_element()
                .map(|root| root.name.as_string() == STORYBOARD_ELEMENT_NAME)
                .unwrap_or(false)
        })
}

/// Single-entry memo for the canvas conversion, keyed by `Arc` identity.
/// The tree is immutable, so pointer equality is enough to reuse the last
/// conversion.
#[derive(Debug, Default)]
pub struct CanvasComponentCache {
    entry: Mutex<Option<(Arc<TopLevelElement>, Vec<SceneMetadata>)>>,
}

impl CanvasComponentCache {
    pub fn new() -> Self {
        Self {
            entry: Mutex::new(None),
        }
    }

    pub fn scenes_for(&self, element: &Arc<TopLevelElement>) -> Vec<SceneMetadata> {
        let mut guard = self.entry.lock().unwrap();
        if let Some((key, scenes)) = guard.as_ref() {
            if Arc::ptr_eq(key, element) {
                return scenes.clone();
            }
        }
        let scenes = element
            .as_component()
            .map(canvas_component_to_scenes)
            .unwrap_or_default();
        *guard = Some((Arc::clone(element), scenes.clone()));
        scenes
    }
}
