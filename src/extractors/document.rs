// src/extractors/document.rs

use crate::utils::error::ExtractError;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

static ANY_ELEMENT_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("*").expect("Failed to compile ANY_ELEMENT_SELECTOR")
});

// html5ever always synthesises these, so they don't count as content.
const SKELETON_TAGS: [&str; 3] = ["html", "head", "body"];

/// A parsed report, immutable for the duration of one extraction pass.
pub struct Document {
    html: Html,
}

impl Document {
    /// Parses raw report bytes. The reports are written as UTF-8.
    pub fn parse(bytes: &[u8]) -> Result<Self, ExtractError> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| ExtractError::Parse(format!("document is not valid UTF-8: {}", e)))?;
        Self::parse_str(text)
    }

    pub fn parse_str(text: &str) -> Result<Self, ExtractError> {
        if text.trim().is_empty() {
            return Err(ExtractError::Parse("document is empty".to_string()));
        }

        let html = Html::parse_document(text);
        if !html.errors.is_empty() {
            tracing::debug!("HTML parser recovered from {} errors", html.errors.len());
        }

        let has_content = html
            .select(&ANY_ELEMENT_SELECTOR)
            .any(|el| !SKELETON_TAGS.contains(&el.value().name()));
        if !has_content {
            return Err(ExtractError::Parse("document contains no elements".to_string()));
        }

        Ok(Self { html })
    }

    /// First element with the given tag name and id, in document order.
    pub fn find_first(&self, tag: &str, id: &str) -> Option<ElementRef<'_>> {
        self.html
            .select(&ANY_ELEMENT_SELECTOR)
            .find(|el| el.value().name() == tag && el.value().id() == Some(id))
    }

    /// All elements with the given tag whose class tokens satisfy `pred`.
    pub fn find_all<F>(&self, tag: &str, pred: F) -> Vec<ElementRef<'_>>
    where
        F: Fn(&[&str]) -> bool,
    {
        find_all_within(self.html.select(&ANY_ELEMENT_SELECTOR), tag, pred)
    }

    /// Elements under `root` (excluding itself) matching tag and class predicate.
    pub fn find_all_in<'a, F>(&'a self, root: ElementRef<'a>, tag: &str, pred: F) -> Vec<ElementRef<'a>>
    where
        F: Fn(&[&str]) -> bool,
    {
        find_all_within(root.select(&ANY_ELEMENT_SELECTOR), tag, pred)
    }

    /// Whether any ancestor of `element` has the tag and satisfies the class predicate.
    pub fn has_ancestor<F>(&self, element: ElementRef<'_>, tag: &str, pred: F) -> bool
    where
        F: Fn(&[&str]) -> bool,
    {
        element
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|ancestor| ancestor.value().name() == tag && pred(&class_tokens(ancestor)))
    }
}

fn find_all_within<'a, I, F>(elements: I, tag: &str, pred: F) -> Vec<ElementRef<'a>>
where
    I: Iterator<Item = ElementRef<'a>>,
    F: Fn(&[&str]) -> bool,
{
    elements
        .filter(|el| el.value().name() == tag && pred(&class_tokens(*el)))
        .collect()
}

/// Whitespace-separated tokens of the element's class attribute.
pub fn class_tokens(element: ElementRef<'_>) -> Vec<&str> {
    element.value().classes().collect()
}
