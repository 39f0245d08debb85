//! Small helpers over `roxmltree` for namespaced Atom/GData documents

use roxmltree::{ExpandedName, Node};

pub const ATOM_NS: &str = "http://www.w3.org/2005/Atom";
pub const YOUTUBE_NS: &str = "http://gdata.youtube.com/schemas/2007";
pub const GDATA_NS: &str = "http://schemas.google.com/g/2005";
pub const MRSS_NS: &str = "http://search.yahoo.com/mrss/";
pub const GPHOTO_NS: &str = "http://schemas.google.com/photos/2007";
pub const EXIF_NS: &str = "http://schemas.google.com/photos/exif/2007";
pub const GEORSS_NS: &str = "http://www.georss.org/georss";
pub const GML_NS: &str = "http://www.opengis.net/gml";

/// First child element with the given name
pub fn child<'a, 'i, 'n, 'm, N>(node: Node<'a, 'i>, name: N) -> Option<Node<'a, 'i>>
where
    N: Into<ExpandedName<'n, 'm>>,
{
    let name = name.into();
    node.children().find(|n| n.is_element() && n.has_tag_name(name))
}

/// All child elements with the given name
pub fn children<'a, 'i, 'n, 'm, N>(node: Node<'a, 'i>, name: N) -> Vec<Node<'a, 'i>>
where
    N: Into<ExpandedName<'n, 'm>>,
{
    let name = name.into();
    node.children()
        .filter(|n| n.is_element() && n.has_tag_name(name))
        .collect()
}

/// Follow a path of child names, like ElementTree's `find("a/b")`
pub fn find<'a, 'i>(node: Node<'a, 'i>, path: &[(&str, &str)]) -> Option<Node<'a, 'i>> {
    let mut current = node;
    for (ns, name) in path {
        current = child(current, (*ns, *name))?;
    }
    Some(current)
}

/// Text of the element at `path`: `None` if missing, `""` if it has no text
pub fn find_text(node: Node, path: &[(&str, &str)]) -> Option<String> {
    find(node, path).map(element_text)
}

/// Concatenated text content of an element
pub fn element_text(node: Node) -> String {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}

/// `href` of the first `atom:link` with the given `rel`
pub fn link_href(node: Node, rel: &str) -> Option<String> {
    children(node, (ATOM_NS, "link"))
        .into_iter()
        .find(|link| link.attribute("rel") == Some(rel))
        .and_then(|link| link.attribute("href"))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<?xml version="1.0"?>
<entry xmlns="http://www.w3.org/2005/Atom" xmlns:media="http://search.yahoo.com/mrss/">
  <id>tag:example,2008:1</id>
  <title>Hello <b>there</b></title>
  <author><name>sam</name><uri>http://example.com/users/sam</uri></author>
  <link rel="self" href="http://example.com/self"/>
  <link rel="alternate" href="http://example.com/alt"/>
  <media:group><media:description/></media:group>
</entry>"#;

    #[test]
    fn test_find_text_paths() {
        let doc = roxmltree::Document::parse(DOC).unwrap();
        let root = doc.root_element();

        assert_eq!(find_text(root, &[(ATOM_NS, "id")]).as_deref(), Some("tag:example,2008:1"));
        assert_eq!(
            find_text(root, &[(ATOM_NS, "author"), (ATOM_NS, "uri")]).as_deref(),
            Some("http://example.com/users/sam")
        );
        assert_eq!(find_text(root, &[(ATOM_NS, "missing")]), None);
        assert_eq!(
            find_text(root, &[(MRSS_NS, "group"), (MRSS_NS, "description")]).as_deref(),
            Some("")
        );
    }

    #[test]
    fn test_element_text_concatenates() {
        let doc = roxmltree::Document::parse(DOC).unwrap();
        let title = child(doc.root_element(), (ATOM_NS, "title")).unwrap();
        assert_eq!(element_text(title), "Hello there");
    }

    #[test]
    fn test_link_href_by_rel() {
        let doc = roxmltree::Document::parse(DOC).unwrap();
        let root = doc.root_element();
        assert_eq!(link_href(root, "alternate").as_deref(), Some("http://example.com/alt"));
        assert_eq!(link_href(root, "related"), None);
    }
}
