//! Small helpers over `xmltree` elements.

use xmltree::{Element, XMLNode};

pub(crate) const LIST_SEPARATOR: char = ';';

fn is_element_named(node: &XMLNode, name: &str) -> bool {
    matches!(node, XMLNode::Element(element) if element.name == name)
}

/// Child elements named `name`, in document order.
pub(crate) fn children<'a>(parent: &'a Element, name: &'a str) -> impl Iterator<Item = &'a Element> {
    parent
        .children
        .iter()
        .filter_map(XMLNode::as_element)
        .filter(move |element| element.name == name)
}

/// Text of child `name`; `Some("")` when the child exists but is empty.
pub(crate) fn child_text(parent: &Element, name: &str) -> Option<String> {
    parent
        .get_child(name)
        .map(|child| child.get_text().map(|text| text.into_owned()).unwrap_or_default())
}

/// Text of child `name`, or `None` when absent or blank.
pub(crate) fn non_empty_text(parent: &Element, name: &str) -> Option<String> {
    child_text(parent, name).filter(|text| !text.trim().is_empty())
}

/// Parses child `name` as an unsigned number.
pub(crate) fn child_number(parent: &Element, name: &str) -> Option<u32> {
    child_text(parent, name).and_then(|text| text.trim().parse().ok())
}

/// Splits a `;`-separated list, dropping blank entries.
pub(crate) fn split_list(text: &str) -> Vec<String> {
    text.split(LIST_SEPARATOR)
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

pub(crate) fn join_list(entries: &[String]) -> String {
    entries.join(&LIST_SEPARATOR.to_string())
}

/// Returns child `name`, appending an empty one when missing.
pub(crate) fn ensure_child<'a>(parent: &'a mut Element, name: &str) -> Option<&'a mut Element> {
    if parent.get_child(name).is_none() {
        parent.children.push(XMLNode::Element(Element::new(name)));
    }
    parent.get_mut_child(name)
}

pub(crate) fn remove_child(parent: &mut Element, name: &str) {
    parent.children.retain(|node| !is_element_named(node, name));
}

/// Sets the text of child `name`; `None` removes the child.
///
/// Children whose text already matches are left untouched, so CDATA
/// sections and formatting of unchanged values survive.
pub(crate) fn set_child_text(parent: &mut Element, name: &str, value: Option<&str>) {
    let Some(text) = value else {
        remove_child(parent, name);
        return;
    };
    match parent.get_mut_child(name) {
        Some(child) => {
            let unchanged = child.get_text().as_deref().unwrap_or_default() == text;
            if !unchanged {
                child.children = text_nodes(text);
            }
        }
        None => {
            let mut child = Element::new(name);
            child.children = text_nodes(text);
            parent.children.push(XMLNode::Element(child));
        }
    }
}

fn text_nodes(text: &str) -> Vec<XMLNode> {
    if text.is_empty() {
        Vec::new()
    } else {
        vec![XMLNode::Text(text.to_string())]
    }
}

/// Sets `<Fields><name>` and drops an emptied `<Fields>` container.
pub(crate) fn set_field(parent: &mut Element, name: &str, value: Option<&str>) {
    if value.is_none() && parent.get_child("Fields").is_none() {
        return;
    }
    if let Some(fields) = ensure_child(parent, "Fields") {
        set_child_text(fields, name, value);
        if !fields.children.iter().any(|node| node.as_element().is_some()) {
            remove_child(parent, "Fields");
        }
    }
}

/// Reads `<Fields><name>`.
pub(crate) fn field_text(parent: &Element, name: &str) -> Option<String> {
    parent
        .get_child("Fields")
        .and_then(|fields| child_text(fields, name))
}

/// Rewrites an id list such as `<Characters><CharID>1</CharID>…`.
///
/// `None` removes the container; `Some(&[])` keeps an empty one.
pub(crate) fn set_id_list(parent: &mut Element, container: &str, entry: &str, ids: Option<&[u32]>) {
    let Some(ids) = ids else {
        remove_child(parent, container);
        return;
    };
    if let Some(list) = ensure_child(parent, container) {
        let current = children(list, entry)
            .filter_map(|element| element.get_text()?.trim().parse::<u32>().ok())
            .collect::<Vec<_>>();
        if current == ids {
            return;
        }
        list.children = ids
            .iter()
            .map(|id| {
                let mut element = Element::new(entry);
                element.children.push(XMLNode::Text(id.to_string()));
                XMLNode::Element(element)
            })
            .collect();
    }
}

/// Reads an id list; `None` when the container is absent.
pub(crate) fn id_list(parent: &Element, container: &str, entry: &str) -> Option<Vec<u32>> {
    let list = parent.get_child(container)?;
    Some(
        children(list, entry)
            .filter_map(|element| element.get_text()?.trim().parse::<u32>().ok())
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::{
        child_text, field_text, id_list, set_child_text, set_field, set_id_list, split_list,
    };
    use xmltree::Element;

    fn parse(text: &str) -> Element {
        Element::parse(text.as_bytes()).expect("valid xml")
    }

    #[test]
    fn unchanged_text_keeps_cdata() {
        let mut scene = parse("<SCENE><Title><![CDATA[A & B]]></Title></SCENE>");
        set_child_text(&mut scene, "Title", Some("A & B"));
        assert!(matches!(
            scene.get_child("Title").unwrap().children[0],
            xmltree::XMLNode::CData(_)
        ));

        set_child_text(&mut scene, "Title", Some("C"));
        assert_eq!(child_text(&scene, "Title").as_deref(), Some("C"));
        set_child_text(&mut scene, "Title", None);
        assert!(scene.get_child("Title").is_none());
    }

    #[test]
    fn fields_container_is_created_and_dropped() {
        let mut scene = parse("<SCENE/>");
        set_field(&mut scene, "Field_SceneType", Some("1"));
        assert_eq!(field_text(&scene, "Field_SceneType").as_deref(), Some("1"));
        set_field(&mut scene, "Field_SceneType", None);
        assert!(scene.get_child("Fields").is_none());
    }

    #[test]
    fn id_lists_distinguish_absent_from_empty() {
        let mut scene = parse("<SCENE/>");
        assert_eq!(id_list(&scene, "Characters", "CharID"), None);
        set_id_list(&mut scene, "Characters", "CharID", Some(&[]));
        assert_eq!(id_list(&scene, "Characters", "CharID"), Some(vec![]));
        set_id_list(&mut scene, "Characters", "CharID", Some(&[3, 1]));
        assert_eq!(id_list(&scene, "Characters", "CharID"), Some(vec![3, 1]));
    }

    #[test]
    fn split_list_trims_and_drops_blanks() {
        assert_eq!(split_list(" a ;; b;"), vec!["a".to_string(), "b".to_string()]);
    }
}
