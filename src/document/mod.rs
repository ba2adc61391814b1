//! Parsed page document
//!
//! A thin layer over [`scraper::Html`] carrying the size limit and the few
//! tree edits the exporter makes. Output goes through html5ever's
//! serializer via [`Html::html`].

mod text;

pub use ego_tree::NodeId;
pub use scraper::node::Element;
pub use text::to_plain_text;

use scraper::{ElementRef, Html, Node};

use crate::errors::{ExportError, ExportResult};
use crate::utils::MAX_HTML_SIZE;

#[derive(Debug)]
pub struct Document {
    html: Html,
}

impl Document {
    /// Parse HTML text with the WHATWG algorithm.
    ///
    /// Tag soup is repaired the way browsers repair it. A document without
    /// a `<body>` (a frameset page) gets an empty one.
    ///
    /// # Errors
    ///
    /// Returns `ExportError::MalformedInput` when the input exceeds
    /// [`MAX_HTML_SIZE`].
    pub fn parse(html: &str) -> ExportResult<Self> {
        if html.len() > MAX_HTML_SIZE {
            return Err(ExportError::MalformedInput(format!(
                "document is {} bytes, limit is {MAX_HTML_SIZE}",
                html.len()
            )));
        }
        Ok(Self::parse_unbounded(html))
    }

    /// Parse markup this crate produced itself, which may have grown past
    /// the input limit
    pub(crate) fn parse_unbounded(html: &str) -> Self {
        let html = Html::parse_document(html);
        if !html.errors.is_empty() {
            log::debug!("html5ever recovered from {} parse error(s)", html.errors.len());
        }
        let mut document = Self { html };
        document.ensure_body();
        document
    }

    fn ensure_body(&mut self) {
        if self.body().is_some() {
            return;
        }
        let Some(body) = element_from_markup("", "body") else {
            return;
        };
        let root = self.html.root_element().id();
        if let Some(mut html) = self.html.tree.get_mut(root) {
            html.append(body);
            log::debug!("Document has no <body>, added an empty one");
        }
    }

    #[must_use]
    pub fn html(&self) -> &Html {
        &self.html
    }

    /// Serialize the whole document
    #[must_use]
    pub fn to_html(&self) -> String {
        self.html.html()
    }

    /// Element nodes in document order, template contents included
    #[must_use]
    pub fn elements(&self) -> Vec<NodeId> {
        self.html
            .tree
            .root()
            .descendants()
            .filter(|node| node.value().is_element())
            .map(|node| node.id())
            .collect()
    }

    #[must_use]
    pub fn element(&self, id: NodeId) -> Option<&Element> {
        self.html.tree.get(id)?.value().as_element()
    }

    #[must_use]
    pub fn element_ref(&self, id: NodeId) -> Option<ElementRef<'_>> {
        ElementRef::wrap(self.html.tree.get(id)?)
    }

    #[must_use]
    pub fn head(&self) -> Option<NodeId> {
        self.top_level("head")
    }

    #[must_use]
    pub fn body(&self) -> Option<NodeId> {
        self.top_level("body")
    }

    fn top_level(&self, name: &str) -> Option<NodeId> {
        self.html
            .root_element()
            .children()
            .find(|child| child.value().as_element().is_some_and(|e| e.name() == name))
            .map(|child| child.id())
    }

    /// Set an attribute, replacing the value in place if it already exists
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        let Some(mut node) = self.html.tree.get_mut(id) else {
            return;
        };
        let Node::Element(element) = node.value() else {
            return;
        };
        if let Some((_, existing)) = element
            .attrs
            .iter_mut()
            .find(|(key, _)| key.prefix.is_none() && &*key.local == name)
        {
            *existing = value.into();
            return;
        }
        // New attributes live in the null namespace
        let mut key = element.name.clone();
        key.prefix = None;
        key.ns = "".into();
        key.local = name.into();
        element.attrs.insert(key, value.into());
    }

    /// Drop the attributes of one element for which `remove(name, value)`
    /// holds. Prefixed names are passed as `prefix:local`.
    pub fn remove_attrs_where<F>(&mut self, id: NodeId, mut remove: F) -> usize
    where
        F: FnMut(&str, &str) -> bool,
    {
        let Some(mut node) = self.html.tree.get_mut(id) else {
            return 0;
        };
        let Node::Element(element) = node.value() else {
            return 0;
        };
        let before = element.attrs.len();
        element.attrs.retain(|key, value| {
            let name = match &key.prefix {
                Some(prefix) => format!("{}:{}", &**prefix, &*key.local),
                None => key.local.to_string(),
            };
            !remove(&name, &**value)
        });
        before - element.attrs.len()
    }

    /// Detach every node matching `remove`, together with its subtree
    pub fn remove_where<F>(&mut self, mut remove: F) -> usize
    where
        F: FnMut(&Node) -> bool,
    {
        let doomed: Vec<NodeId> = self
            .html
            .tree
            .root()
            .descendants()
            .filter(|node| remove(node.value()))
            .map(|node| node.id())
            .collect();
        for id in &doomed {
            if let Some(mut node) = self.html.tree.get_mut(*id) {
                node.detach();
            }
        }
        doomed.len()
    }

    /// Insert the first `name` element of `markup` as the first child of
    /// `parent`
    pub(crate) fn prepend_markup(&mut self, parent: NodeId, markup: &str, name: &str) -> bool {
        let Some(element) = element_from_markup(markup, name) else {
            return false;
        };
        match self.html.tree.get_mut(parent) {
            Some(mut parent) => {
                parent.prepend(element);
                true
            }
            None => false,
        }
    }
}

/// A detached copy of the first `name` element html5ever builds from
/// `markup`
fn element_from_markup(markup: &str, name: &str) -> Option<Node> {
    let parsed = Html::parse_document(markup);
    parsed
        .tree
        .root()
        .descendants()
        .find(|node| node.value().as_element().is_some_and(|e| e.name() == name))
        .map(|node| node.value().clone())
}
