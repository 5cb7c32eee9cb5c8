use reframe_parser::ast::{
    JsxAttributeEntry, JsxElement, JsxElementChild, MarkupComponent, ParseSuccess,
    TopLevelElement,
};

/// Visitor pattern for traversing a parsed tree immutably
///
/// This trait provides default implementations that walk the entire tree.
/// Override specific visit_* methods to perform custom actions on nodes.
pub trait Visitor: Sized {
    fn visit_parse_success(&mut self, success: &ParseSuccess) {
        walk_parse_success(self, success);
    }

    fn visit_top_level_element(&mut self, element: &TopLevelElement) {
        walk_top_level_element(self, element);
    }

    fn visit_component(&mut self, component: &MarkupComponent) {
        walk_component(self, component);
    }

    fn visit_element(&mut self, element: &JsxElement) {
        walk_element(self, element);
    }

    fn visit_element_child(&mut self, child: &JsxElementChild) {
        walk_element_child(self, child);
    }

    fn visit_attribute(&mut self, _attribute: &JsxAttributeEntry) {
        // Leaf node, no children to walk
    }
}

pub fn walk_parse_success<V: Visitor>(visitor: &mut V, success: &ParseSuccess) {
    for element in &success.top_level_elements {
        visitor.visit_top_level_element(element);
    }
}

pub fn walk_top_level_element<V: Visitor>(visitor: &mut V, element: &TopLevelElement) {
    if let TopLevelElement::Component(component) = element {
        visitor.visit_component(component);
    }
}

pub fn walk_component<V: Visitor>(visitor: &mut V, component: &MarkupComponent) {
    visitor.visit_element_child(&component.root_element);
}

pub fn walk_element_child<V: Visitor>(visitor: &mut V, child: &JsxElementChild) {
    if let JsxElementChild::Element(element) = child {
        visitor.visit_element(element);
    }
}

pub fn walk_element<V: Visitor>(visitor: &mut V, element: &JsxElement) {
    for attribute in &element.attributes {
        visitor.visit_attribute(attribute);
    }
    for child in &element.children {
        visitor.visit_element_child(child);
    }
}

/// Collect every element uid in document order.
pub fn collect_element_uids(success: &ParseSuccess) -> Vec<String> {
    struct Collector {
        uids: Vec<String>,
    }
    impl Visitor for Collector {
        fn visit_element(&mut self, element: &JsxElement) {
            self.uids.push(element.uid.clone());
            walk_element(self, element);
        }
    }
    let mut collector = Collector { uids: vec![] };
    collector.visit_parse_success(success);
    collector.uids
}

/// Find an element by uid anywhere in the document.
pub fn find_element_by_uid<'a>(success: &'a ParseSuccess, uid: &str) -> Option<&'a JsxElement> {
    fn search<'a>(child: &'a JsxElementChild, uid: &str) -> Option<&'a JsxElement> {
        let element = child.as_element()?;
        if element.uid == uid {
            return Some(element);
        }
        element
            .children
            .iter()
            .find_map(|child| search(child, uid))
    }
    success
        .top_level_elements
        .iter()
        .filter_map(|tle| tle.as_component())
        .find_map(|component| search(&component.root_element, uid))
}
