//! Unique-ID maintenance over parsed element trees.
//!
//! Every element node must carry a `uid` that is unique across the whole
//! sequence of top-level elements and mirrored in a literal `data-uid`
//! attribute. This pass repairs missing, non-literal and colliding ids
//! while returning untouched subtrees by `Arc` identity, so consumers can
//! use pointer equality for change detection.

use crate::ast::{
    jsx_attribute_value, JsxAttribute, JsxElement, JsxElementChild, MarkupComponent,
    TopLevelElement, DATA_UID_KEY,
};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

const UID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const UID_MIN_LENGTH: u32 = 3;

/// Allocator for fresh uids, seeded from every id already present in the
/// input so generated ids can never collide with existing ones. Threaded
/// explicitly through the pass; there is no global counter.
#[derive(Debug, Clone)]
pub struct UidAllocator {
    used: HashSet<String>,
    counter: u64,
}

impl UidAllocator {
    pub fn new() -> Self {
        Self {
            used: HashSet::new(),
            counter: 0,
        }
    }

    /// Pre-scan a sequence of top-level elements for every uid and
    /// `data-uid` literal present anywhere in the input.
    pub fn from_top_level_elements(elements: &[Arc<TopLevelElement>]) -> Self {
        let mut allocator = Self::new();
        for element in elements {
            match element.as_ref() {
                TopLevelElement::Component(component) => {
                    allocator.reserve_from_child(&component.root_element);
                }
                TopLevelElement::Arbitrary(_) => {}
            }
        }
        allocator
    }

    fn reserve_from_child(&mut self, child: &JsxElementChild) {
        match child {
            JsxElementChild::Element(element) => {
                if !element.uid.is_empty() {
                    self.reserve(&element.uid);
                }
                if let Some(literal) = element.data_uid_literal() {
                    self.reserve(literal);
                }
                for child in &element.children {
                    self.reserve_from_child(child);
                }
            }
            JsxElementChild::Arbitrary(_) | JsxElementChild::Value(_) => {}
        }
    }

    pub fn reserve(&mut self, uid: &str) {
        self.used.insert(uid.to_string());
    }

    pub fn is_used(&self, uid: &str) -> bool {
        self.used.contains(uid)
    }

    /// Next fresh uid: lowercase a-z, at least three characters, counter
    /// order, skipping anything already reserved.
    pub fn next_uid(&mut self) -> String {
        loop {
            let candidate = encode_uid(self.counter);
            self.counter += 1;
            if !self.used.contains(&candidate) {
                self.used.insert(candidate.clone());
                return candidate;
            }
        }
    }
}

impl Default for UidAllocator {
    fn default() -> Self {
        Self::new()
    }
}

fn encode_uid(mut n: u64) -> String {
    let base = UID_ALPHABET.len() as u64;
    let mut width = UID_MIN_LENGTH;
    let mut capacity = base.pow(width);
    while n >= capacity {
        n -= capacity;
        width += 1;
        capacity = base.pow(width);
    }
    let mut out = vec![b'a'; width as usize];
    for slot in out.iter_mut().rev() {
        *slot = UID_ALPHABET[(n % base) as usize];
        n /= base;
    }
    String::from_utf8(out).expect("uid alphabet is ascii")
}

/// Enforce the uid invariant over a sequence of top-level elements.
///
/// Traversal is depth-first with a single seen-set shared across the whole
/// input, so collisions between sibling components are repaired too. A
/// node whose subtree needed no repair is returned as an `Arc` clone of
/// the input (pointer-identical); any repaired descendant forces a newly
/// constructed parent. Running the pass on its own output is a no-op.
pub fn guarantee_unique_uids(
    elements: Vec<Arc<TopLevelElement>>,
) -> Vec<Arc<TopLevelElement>> {
    let mut allocator = UidAllocator::from_top_level_elements(&elements);
    let mut seen: HashSet<String> = HashSet::new();
    elements
        .iter()
        .map(|element| fix_top_level_element(element, &mut seen, &mut allocator).0)
        .collect()
}

fn fix_top_level_element(
    element: &Arc<TopLevelElement>,
    seen: &mut HashSet<String>,
    allocator: &mut UidAllocator,
) -> (Arc<TopLevelElement>, bool) {
    match element.as_ref() {
        TopLevelElement::Component(component) => {
            let (root, changed) = fix_element_child(&component.root_element, seen, allocator);
            if changed {
                (
                    Arc::new(TopLevelElement::Component(MarkupComponent {
                        root_element: root,
                        ..component.clone()
                    })),
                    true,
                )
            } else {
                (Arc::clone(element), false)
            }
        }
        TopLevelElement::Arbitrary(_) => (Arc::clone(element), false),
    }
}

fn fix_element_child(
    child: &Arc<JsxElementChild>,
    seen: &mut HashSet<String>,
    allocator: &mut UidAllocator,
) -> (Arc<JsxElementChild>, bool) {
    match child.as_ref() {
        JsxElementChild::Element(element) => {
            let (fixed, changed) = fix_element(element, seen, allocator);
            if changed {
                (Arc::new(JsxElementChild::Element(fixed)), true)
            } else {
                (Arc::clone(child), false)
            }
        }
        JsxElementChild::Arbitrary(_) | JsxElementChild::Value(_) => (Arc::clone(child), false),
    }
}

fn fix_element(
    element: &JsxElement,
    seen: &mut HashSet<String>,
    allocator: &mut UidAllocator,
) -> (JsxElement, bool) {
    // Decide this node's uid before descending so children collide against it.
    let (uid, uid_repaired) = match element.data_uid_literal() {
        Some(literal) if !literal.is_empty() && !seen.contains(literal) => {
            (literal.to_string(), false)
        }
        Some(literal) if !literal.is_empty() => {
            let fresh = allocator.next_uid();
            debug!(old = literal, new = %fresh, "repairing duplicate uid");
            (fresh, true)
        }
        _ => {
            let fresh = allocator.next_uid();
            debug!(new = %fresh, "assigning uid to element without a literal data-uid");
            (fresh, true)
        }
    };
    seen.insert(uid.clone());

    let attributes_repaired = uid_repaired || element.uid != uid;

    let mut children_changed = false;
    let children: Vec<Arc<JsxElementChild>> = element
        .children
        .iter()
        .map(|child| {
            let (fixed, changed) = fix_element_child(child, seen, allocator);
            children_changed |= changed;
            fixed
        })
        .collect();

    if !attributes_repaired && !children_changed {
        return (element.clone(), false);
    }

    let mut fixed = JsxElement {
        name: element.name.clone(),
        uid: uid.clone(),
        attributes: element.attributes.clone(),
        children,
        span: element.span,
    };
    if attributes_repaired {
        fixed.set_attribute(DATA_UID_KEY, with_uid_literal(&uid));
    }
    (fixed, true)
}

fn with_uid_literal(uid: &str) -> JsxAttribute {
    jsx_attribute_value(uid.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{
        default_props_param, jsx_attribute_entry, jsx_attribute_function_call,
        jsx_attribute_value, jsx_element, markup_component, JsxAttributeEntry,
    };

    fn component_with_root(root: JsxElement) -> Arc<TopLevelElement> {
        Arc::new(TopLevelElement::Component(markup_component(
            "Output",
            true,
            Some(default_props_param()),
            vec![],
            JsxElementChild::Element(root),
            None,
        )))
    }

    fn uid_attr(uid: &str) -> JsxAttributeEntry {
        jsx_attribute_entry(DATA_UID_KEY, jsx_attribute_value(uid))
    }

    fn view(uid: &str, children: Vec<Arc<JsxElementChild>>) -> JsxElement {
        jsx_element("View", uid, vec![uid_attr(uid)], children)
    }

    fn root_element(fixed: &Arc<TopLevelElement>) -> &JsxElement {
        fixed
            .as_component()
            .unwrap()
            .root_element
            .as_element()
            .unwrap()
    }

    #[test]
    fn test_creates_an_id_where_there_was_none() {
        let root = jsx_element("View", "", vec![], vec![]);
        let fixed = guarantee_unique_uids(vec![component_with_root(root)]);
        let element = root_element(&fixed[0]);
        assert!(!element.uid.is_empty());
        assert_eq!(element.data_uid_literal(), Some(element.uid.as_str()));
    }

    #[test]
    fn test_sibling_collision_replaces_second_id() {
        let root = view(
            "root",
            vec![
                Arc::new(JsxElementChild::Element(view("aaa", vec![]))),
                Arc::new(JsxElementChild::Element(view("aaa", vec![]))),
            ],
        );
        let fixed = guarantee_unique_uids(vec![component_with_root(root)]);
        let element = root_element(&fixed[0]);
        let child0 = element.children[0].as_element().unwrap();
        let child1 = element.children[1].as_element().unwrap();
        assert_eq!(child0.uid, "aaa");
        assert_eq!(child0.data_uid_literal(), Some("aaa"));
        assert_ne!(child1.uid, "aaa");
        assert_eq!(child1.data_uid_literal(), Some(child1.uid.as_str()));
    }

    #[test]
    fn test_non_simple_uid_attribute_is_replaced_with_literal() {
        let root = jsx_element(
            "View",
            "aaa",
            vec![jsx_attribute_entry(
                DATA_UID_KEY,
                jsx_attribute_function_call("someFunction", vec![]),
            )],
            vec![],
        );
        let fixed = guarantee_unique_uids(vec![component_with_root(root)]);
        let element = root_element(&fixed[0]);
        let literal = element.data_uid_literal().expect("uid must be a literal");
        assert_eq!(element.uid, literal);
    }

    #[test]
    fn test_no_repair_keeps_references() {
        let root = view(
            "baa",
            vec![
                Arc::new(JsxElementChild::Element(view("aaa", vec![]))),
                Arc::new(JsxElementChild::Element(view("aab", vec![]))),
            ],
        );
        let input = component_with_root(root);
        let fixed = guarantee_unique_uids(vec![Arc::clone(&input)]);
        assert!(Arc::ptr_eq(&input, &fixed[0]));
        assert!(Arc::ptr_eq(
            &input.as_component().unwrap().root_element,
            &fixed[0].as_component().unwrap().root_element,
        ));
    }

    #[test]
    fn test_repair_loses_root_reference() {
        let root = view(
            "baa",
            vec![
                Arc::new(JsxElementChild::Element(view("aaa", vec![]))),
                Arc::new(JsxElementChild::Element(jsx_element(
                    "View",
                    "",
                    vec![],
                    vec![],
                ))),
            ],
        );
        let input = component_with_root(root);
        let fixed = guarantee_unique_uids(vec![Arc::clone(&input)]);
        assert!(!Arc::ptr_eq(
            &input.as_component().unwrap().root_element,
            &fixed[0].as_component().unwrap().root_element,
        ));
    }

    #[test]
    fn test_untouched_sibling_subtree_keeps_its_reference() {
        let untouched_subtree = view(
            "aaa",
            vec![
                Arc::new(JsxElementChild::Element(view("aab", vec![]))),
                Arc::new(JsxElementChild::Element(view("aac", vec![]))),
            ],
        );
        let root = view(
            "baa",
            vec![
                Arc::new(JsxElementChild::Element(untouched_subtree)),
                Arc::new(JsxElementChild::Element(jsx_element(
                    "View",
                    "",
                    vec![],
                    vec![],
                ))),
            ],
        );
        let input = component_with_root(root);
        let fixed = guarantee_unique_uids(vec![Arc::clone(&input)]);
        assert!(!Arc::ptr_eq(&input, &fixed[0]));

        let input_root = root_element(&input);
        let fixed_root = root_element(&fixed[0]);
        assert!(Arc::ptr_eq(&input_root.children[0], &fixed_root.children[0]));
        assert!(!Arc::ptr_eq(
            &input_root.children[1],
            &fixed_root.children[1]
        ));
    }

    #[test]
    fn test_collisions_repaired_across_top_level_components() {
        let first = component_with_root(view("aaa", vec![]));
        let second = component_with_root(view("aaa", vec![]));
        let fixed = guarantee_unique_uids(vec![first, second]);
        let uid0 = root_element(&fixed[0]).uid.clone();
        let uid1 = root_element(&fixed[1]).uid.clone();
        assert_ne!(uid0, uid1);
    }

    #[test]
    fn test_pass_is_idempotent() {
        let root = view(
            "aaa",
            vec![
                Arc::new(JsxElementChild::Element(view("aaa", vec![]))),
                Arc::new(JsxElementChild::Element(jsx_element(
                    "View",
                    "",
                    vec![],
                    vec![],
                ))),
            ],
        );
        let once = guarantee_unique_uids(vec![component_with_root(root)]);
        let twice = guarantee_unique_uids(once.clone());
        for (a, b) in once.iter().zip(twice.iter()) {
            assert!(Arc::ptr_eq(a, b));
        }
    }

    #[test]
    fn test_generated_ids_skip_everything_present_in_input() {
        // "aaa" and "aab" exist deeper in the tree, so repairs must not
        // reuse either of them.
        let root = view(
            "aaa",
            vec![
                Arc::new(JsxElementChild::Element(jsx_element(
                    "View",
                    "",
                    vec![],
                    vec![],
                ))),
                Arc::new(JsxElementChild::Element(view("aab", vec![]))),
            ],
        );
        let fixed = guarantee_unique_uids(vec![component_with_root(root)]);
        let element = root_element(&fixed[0]);
        let generated = &element.children[0].as_element().unwrap().uid;
        assert_ne!(generated, "aaa");
        assert_ne!(generated, "aab");
    }

    #[test]
    fn test_encode_uid_widens_after_exhausting_three_characters() {
        assert_eq!(encode_uid(0), "aaa");
        assert_eq!(encode_uid(1), "aab");
        assert_eq!(encode_uid(25), "aaz");
        assert_eq!(encode_uid(26), "aba");
        assert_eq!(encode_uid(26u64.pow(3)), "aaaa");
    }

    #[test]
    fn test_allocator_skips_reserved_ids() {
        let mut allocator = UidAllocator::new();
        allocator.reserve("aaa");
        allocator.reserve("aab");
        assert_eq!(allocator.next_uid(), "aac");
    }
}
