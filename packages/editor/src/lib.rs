//! Editor-side services over the parser: the parse job seam, the snippet
//! insertion bridge and scene metadata mapping.

pub mod bridge;
pub mod errors;
pub mod scene;
pub mod worker;

pub use bridge::{parse_snippet, InsertableElement, SnippetCache, WRAPPER_COMPONENT};
pub use errors::{EditorError, InsertError};
pub use scene::{
    canvas_component_to_scenes, create_scene_from_component, create_storyboard_element,
    find_canvas_component, map_scene, scene_uid_from_index, scenes_to_canvas_component,
    unmap_scene, CanvasComponentCache, SceneMetadata, STORYBOARD_UID,
};
pub use worker::{parse_file, LocalParseExecutor, ParseFile, ParseJobExecutor, ParseJobResult};
