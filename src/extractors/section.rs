// src/extractors/section.rs

// --- Imports ---
use crate::extractors::document::{class_tokens, Document};
use crate::utils::error::ExtractError;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Selector};
use std::collections::HashSet;

// --- CSS Selectors (Lazy Static) ---
static HEADING_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("h1, h2, h3, h4, h5, h6").expect("Failed to compile HEADING_SELECTOR")
});

// htmlwidgets serialise their configuration into a script of this type
static PAYLOAD_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"script[type="application/json"]"#).expect("Failed to compile PAYLOAD_SELECTOR")
});

static LEVEL_TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^level(\d+)$").expect("Failed to compile LEVEL_TOKEN_RE")
});

// --- Constants ---
const SECTION_CLASS: &str = "section";
const TABSET_CLASS: &str = "tabset";
const TOP_SECTION_LEVEL: u32 = 2;

/// Number of nesting steps between a top section and its tabs
/// (section -> subsection -> tab).
const TAB_DEPTH: usize = 2;

// --- Data Structures ---
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionHeading {
    pub section_num: String,  // e.g., "4.2.1"
    pub section_name: String, // e.g., "Stage at diagnosis"
}

fn level_token(level: u32) -> String {
    format!("level{}", level)
}

/// Reads the nesting level from a `level<N>` class token.
pub fn section_level(classes: &[&str]) -> Option<u32> {
    classes.iter().find_map(|token| {
        LEVEL_TOKEN_RE
            .captures(token)
            .and_then(|caps| caps[1].parse().ok())
    })
}

/// True for a section div at exactly the given level.
pub fn is_section_at(classes: &[&str], level: u32) -> bool {
    let wanted = level_token(level);
    classes.contains(&SECTION_CLASS) && classes.iter().any(|token| *token == wanted)
}

// --- Navigator ---
/// Walks the report's section hierarchy. The `level<N>` class token is
/// authoritative; the markup nests siblings inconsistently.
pub struct SectionNavigator<'d> {
    document: &'d Document,
}

impl<'d> SectionNavigator<'d> {
    pub fn new(document: &'d Document) -> Self {
        Self { document }
    }

    /// Ids of every top-level (level 2) section in document order.
    pub fn list_top_sections(&self) -> Vec<String> {
        self.document
            .find_all("div", |classes| is_section_at(classes, TOP_SECTION_LEVEL))
            .into_iter()
            .filter_map(|el| el.value().id().map(str::to_string))
            .collect()
    }

    /// Ids of the sections one level below `node_id`, nested at any depth.
    pub fn list_children(&self, node_id: &str) -> Result<Vec<String>, ExtractError> {
        let parent = self.element(node_id)?;
        let parent_level = section_level(&class_tokens(parent)).ok_or_else(|| {
            ExtractError::MalformedSection(format!("'{}' has no level<N> class token", node_id))
        })?;
        let child_level = parent_level + 1;

        let children = self
            .document
            .find_all_in(parent, "div", |classes| is_section_at(classes, child_level))
            .into_iter()
            .filter_map(|el| el.value().id().map(str::to_string))
            .collect::<Vec<_>>();

        tracing::trace!("'{}' (level {}) has {} children", node_id, parent_level, children.len());
        Ok(children)
    }

    /// Whether the node sits inside a tabset grouping.
    pub fn is_tab(&self, node_id: &str) -> Result<bool, ExtractError> {
        let element = self.element(node_id)?;
        Ok(self
            .document
            .has_ancestor(element, "div", |classes| classes.contains(&TABSET_CLASS)))
    }

    /// Every chart-bearing tab in the report, in document order and without duplicates.
    pub fn tab_nodes(&self) -> Result<Vec<String>, ExtractError> {
        let mut seen = HashSet::new();
        let mut tabs = Vec::new();

        for section in self.list_top_sections() {
            let mut frontier = vec![section];
            for _ in 0..TAB_DEPTH {
                let mut next = Vec::new();
                for node in &frontier {
                    next.extend(self.list_children(node)?);
                }
                frontier = next;
            }

            for node in frontier {
                if self.is_tab(&node)? && seen.insert(node.clone()) {
                    tabs.push(node);
                }
            }
        }

        tracing::debug!("Found {} tab nodes", tabs.len());
        Ok(tabs)
    }

    /// Looks up a section div by id.
    pub fn element(&self, node_id: &str) -> Result<ElementRef<'d>, ExtractError> {
        self.document.find_first("div", node_id).ok_or_else(|| {
            ExtractError::MalformedSection(format!("no section with id '{}'", node_id))
        })
    }
}

/// Reads the section heading and splits it into number and name on the first whitespace.
pub fn read_heading(section_id: &str, element: ElementRef<'_>) -> Result<SectionHeading, ExtractError> {
    let heading = element
        .select(&HEADING_SELECTOR)
        .next()
        .ok_or_else(|| ExtractError::HeadingFormat(format!("'{}' has no heading", section_id)))?;

    let text = heading.text().collect::<String>();
    let text = text.trim();
    if text.is_empty() {
        return Err(ExtractError::HeadingFormat(format!("'{}' has an empty heading", section_id)));
    }

    let (num, name) = match text.split_once(char::is_whitespace) {
        Some((num, name)) => (num, name.trim()),
        None => (text, ""),
    };

    Ok(SectionHeading {
        section_num: num.to_string(),
        section_name: name.to_string(),
    })
}

/// Raw text of the section's embedded JSON payload.
pub fn payload_script(section_id: &str, element: ElementRef<'_>) -> Result<String, ExtractError> {
    element
        .select(&PAYLOAD_SELECTOR)
        .next()
        .map(|script| script.text().collect::<String>())
        .ok_or_else(|| ExtractError::PayloadNotFound(format!("'{}' has no embedded JSON payload", section_id)))
}
