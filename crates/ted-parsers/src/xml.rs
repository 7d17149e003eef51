//! Namespace-aware element and attribute accessors over `roxmltree`.
//!
//! Every legacy TED dialect uses a single namespace captured once from the
//! root element; eForms UBL mixes several (`cac`, `cbc`, `efac`, `efbc`) in
//! the same document, so lookups here take an explicit namespace filter
//! rather than assuming one global namespace like the legacy helpers can.

use roxmltree::Node;

/// First descendant (including `node` itself) whose local tag name matches,
/// optionally constrained to a specific namespace URI. `None` for the
/// namespace argument matches any namespace, mirroring the legacy dialect's
/// `{*}` wildcard lookups.
pub fn find<'a>(node: Node<'a, 'a>, local_name: &str, namespace: Option<&str>) -> Option<Node<'a, 'a>> {
    node.descendants().find(|n| {
        n.is_element()
            && n.tag_name().name() == local_name
            && namespace.map_or(true, |ns| n.tag_name().namespace() == Some(ns))
    })
}

/// Like [`find`], but searches direct children only.
pub fn find_child<'a>(node: Node<'a, 'a>, local_name: &str, namespace: Option<&str>) -> Option<Node<'a, 'a>> {
    node.children().find(|n| {
        n.is_element()
            && n.tag_name().name() == local_name
            && namespace.map_or(true, |ns| n.tag_name().namespace() == Some(ns))
    })
}

/// All descendants matching the local tag name (document order).
pub fn find_all<'a>(node: Node<'a, 'a>, local_name: &str, namespace: Option<&str>) -> Vec<Node<'a, 'a>> {
    node.descendants()
        .filter(|n| {
            n.is_element()
                && n.tag_name().name() == local_name
                && namespace.map_or(true, |ns| n.tag_name().namespace() == Some(ns))
        })
        .collect()
}

/// Trimmed text content of an element's direct text node, `None` if absent
/// or blank.
pub fn text(node: Option<Node>) -> Option<String> {
    let node = node?;
    let text = node.text()?.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Concatenated, trimmed text of every descendant text node. Used for
/// elements that wrap their content in nested markup (e.g. `<P>` runs
/// inside a title field), where `text()` alone only sees the first run.
pub fn element_text(node: Option<Node>) -> Option<String> {
    let node = node?;
    let joined: String = node
        .descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect::<Vec<_>>()
        .join(" ");
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Attribute value by local name, ignoring namespace (matches the legacy
/// dialects' unqualified `CODE`/`VALUE`/`CURRENCY` attributes).
pub fn attr<'a>(node: Option<Node<'a, 'a>>, name: &str) -> Option<&'a str> {
    node?.attribute(name)
}

/// Default namespace URI declared on the root element, if any. The legacy
/// dialects put every element in this single namespace.
pub fn default_namespace<'a>(root: Node<'a, 'a>) -> Option<&'a str> {
    root.default_namespace()
}
