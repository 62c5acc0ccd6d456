//! Markup tree wrapper and small tree queries
//!
//! Markup is parsed as a full document. The `body` element then stands in
//! for the document root: top-level nodes of a snippet hang directly off
//! it, ancestor walks stop there, and it never matches a tag test.
//!
//! Every query returns an `Option` so clients can compose fallbacks with
//! `or_else` instead of probing for failures.

use ego_tree::{NodeId, NodeRef};
use scraper::{ElementRef, Html, Node, Selector};

/// A node in a parsed markup tree
pub type Handle<'a> = NodeRef<'a, Node>;

/// Elements that delimit a block of forwarded content
const CONTAINER_TAGS: [&str; 5] = ["div", "p", "blockquote", "body", "html"];

/// Elements whose text children are serialized verbatim
const RAW_TEXT_PARENTS: [&str; 8] = [
    "style",
    "script",
    "xmp",
    "iframe",
    "noembed",
    "noframes",
    "plaintext",
    "noscript",
];

static BODY: std::sync::LazyLock<Selector> =
    std::sync::LazyLock::new(|| Selector::parse("body").unwrap());

/// A parsed markup document
pub struct Dom {
    html: Html,
    root: NodeId,
}

impl Dom {
    #[must_use]
    pub fn parse(markup: &str) -> Self {
        let html = Html::parse_document(markup);
        let root = html
            .select(&BODY)
            .next()
            .map_or_else(|| html.root_element().id(), |body| body.id());
        Self { html, root }
    }

    /// The node acting as document root
    #[must_use]
    pub fn root(&self) -> Handle<'_> {
        self.html
            .tree
            .get(self.root)
            .unwrap_or_else(|| self.html.tree.root())
    }

    /// Concatenated text of the whole document
    #[must_use]
    pub fn text(&self) -> String {
        text_of(self.root())
    }

    /// All elements matching `selector`, in document order
    pub fn select<'a, 'b>(&'a self, selector: &'b Selector) -> scraper::html::Select<'a, 'b> {
        self.html.select(selector)
    }

    /// First element matching `selector`
    #[must_use]
    pub fn first(&self, selector: &Selector) -> Option<Handle<'_>> {
        self.html.select(selector).next().map(|element| *element)
    }

    /// Parent of `node`; the root has none
    #[must_use]
    pub fn parent<'a>(&self, node: Handle<'a>) -> Option<Handle<'a>> {
        if node.id() == self.root {
            None
        } else {
            node.parent()
        }
    }

    /// Whether `node` is an element named `name`, never true for the root
    #[must_use]
    pub fn is_tag(&self, node: Handle<'_>, name: &str) -> bool {
        node.id() != self.root && has_tag(node, name)
    }

    #[must_use]
    pub fn is_root_child(&self, node: Handle<'_>) -> bool {
        node.parent().is_some_and(|parent| parent.id() == self.root)
    }

    /// Nearest ancestor satisfying `accept`
    pub fn closest<'a>(
        &self,
        node: Handle<'a>,
        accept: impl Fn(Handle<'a>) -> bool,
    ) -> Option<Handle<'a>> {
        let mut current = self.parent(node);
        while let Some(candidate) = current {
            if accept(candidate) {
                return Some(candidate);
            }
            current = self.parent(candidate);
        }
        None
    }

    /// Outermost ancestor satisfying `accept`
    pub fn outermost<'a>(
        &self,
        node: Handle<'a>,
        accept: impl Fn(Handle<'a>) -> bool,
    ) -> Option<Handle<'a>> {
        let mut found = None;
        let mut current = self.parent(node);
        while let Some(candidate) = current {
            if accept(candidate) {
                found = Some(candidate);
            }
            current = self.parent(candidate);
        }
        found
    }

    /// Nearest enclosing `div`
    #[must_use]
    pub fn parent_div<'a>(&self, node: Handle<'a>) -> Option<Handle<'a>> {
        self.closest(node, |candidate| self.is_tag(candidate, "div"))
    }

    /// Outermost enclosing `div`
    #[must_use]
    pub fn outermost_div<'a>(&self, node: Handle<'a>) -> Option<Handle<'a>> {
        self.outermost(node, |candidate| self.is_tag(candidate, "div"))
    }

    /// Nearest enclosing block container
    #[must_use]
    pub fn container<'a>(&self, node: Handle<'a>) -> Option<Handle<'a>> {
        self.closest(node, |candidate| self.is_container(candidate))
    }

    /// Outermost enclosing block container
    #[must_use]
    pub fn outermost_container<'a>(&self, node: Handle<'a>) -> Option<Handle<'a>> {
        self.outermost(node, |candidate| self.is_container(candidate))
    }

    fn is_container(&self, node: Handle<'_>) -> bool {
        CONTAINER_TAGS.iter().any(|tag| self.is_tag(node, tag))
    }

    /// Walk `levels` parents up from `node`
    #[must_use]
    pub fn ancestor<'a>(&self, node: Handle<'a>, levels: usize) -> Option<Handle<'a>> {
        (0..levels).try_fold(node, |current, _| self.parent(current))
    }
}

/// Element name of `node`, if it is an element
#[must_use]
pub fn tag_name<'a>(node: Handle<'a>) -> Option<&'a str> {
    node.value().as_element().map(scraper::node::Element::name)
}

#[must_use]
pub fn has_tag(node: Handle<'_>, name: &str) -> bool {
    tag_name(node) == Some(name)
}

#[must_use]
pub fn attr<'a>(node: Handle<'a>, name: &str) -> Option<&'a str> {
    node.value().as_element().and_then(|element| element.attr(name))
}

#[must_use]
pub fn has_class(node: Handle<'_>, class: &str) -> bool {
    node.value()
        .as_element()
        .is_some_and(|element| element.classes().any(|c| c == class))
}

/// Text content of a text node
#[must_use]
pub fn text_data<'a>(node: Handle<'a>) -> Option<&'a str> {
    node.value().as_text().map(|text| &**text)
}

/// Concatenated text of `node` and its descendants
#[must_use]
pub fn text_of(node: Handle<'_>) -> String {
    node.descendants().filter_map(text_data).collect()
}

/// Concatenated text of several nodes
#[must_use]
pub fn text_of_all<'a>(nodes: impl IntoIterator<Item = Handle<'a>>) -> String {
    nodes.into_iter().map(text_of).collect()
}

/// Follow a path of child indices, text and comment nodes included
#[must_use]
pub fn child_at<'a>(node: Handle<'a>, path: &[usize]) -> Option<Handle<'a>> {
    path.iter()
        .try_fold(node, |current, &index| current.children().nth(index))
}

/// Element children only
pub fn element_children<'a>(node: Handle<'a>) -> impl Iterator<Item = Handle<'a>> {
    node.children().filter(|child| child.value().is_element())
}

/// Following siblings that are elements
pub fn next_element_siblings<'a>(node: Handle<'a>) -> impl Iterator<Item = Handle<'a>> {
    node.next_siblings().filter(|sibling| sibling.value().is_element())
}

/// First text node under `node`, in document order, containing `needle`
#[must_use]
pub fn find_text_node<'a>(node: Handle<'a>, needle: &str) -> Option<Handle<'a>> {
    node.descendants()
        .find(|candidate| text_data(*candidate).is_some_and(|text| text.contains(needle)))
}

/// Elements under `node` matching `selector`
#[must_use]
pub fn select_within<'a>(node: Handle<'a>, selector: &Selector) -> Vec<Handle<'a>> {
    ElementRef::wrap(node).map_or_else(Vec::new, |element| {
        element.select(selector).map(|found| *found).collect()
    })
}

/// Serialized markup of `node` itself
#[must_use]
pub fn outer_html(node: Handle<'_>) -> String {
    match node.value() {
        Node::Element(_) => ElementRef::wrap(node).map(|element| element.html()).unwrap_or_default(),
        Node::Text(text) => {
            let raw_parent = node
                .parent()
                .and_then(tag_name)
                .is_some_and(|parent| RAW_TEXT_PARENTS.contains(&parent));
            if raw_parent {
                String::from(&**text)
            } else {
                escape_text(text)
            }
        }
        Node::Comment(comment) => format!("<!--{}-->", &**comment),
        Node::Document | Node::Fragment => inner_html(node),
        _ => String::new(),
    }
}

/// Serialized markup of the children of `node`
#[must_use]
pub fn inner_html(node: Handle<'_>) -> String {
    join_html(node.children())
}

/// Serialized markup of a run of sibling nodes
#[must_use]
pub fn join_html<'a>(nodes: impl IntoIterator<Item = Handle<'a>>) -> String {
    nodes.into_iter().map(outer_html).collect()
}

/// Plain-text rendering of a markup snippet
#[must_use]
pub fn render_text(markup: &str) -> String {
    Dom::parse(markup).text()
}

fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '\u{a0}' => escaped.push_str("&nbsp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
