use indexmap::IndexMap;

use crate::model::config::TagRegistry;
use crate::model::task::{Column, Task};

/// Resolves a tag id to its display name. The filter engine matches on
/// display names, not ids, so "urgent" finds a card tagged with an id
/// whose registered name is "Urgent".
pub trait TagResolver {
    fn resolve(&self, tag_id: &str) -> Option<&str>;
}

impl TagResolver for TagRegistry {
    fn resolve(&self, tag_id: &str) -> Option<&str> {
        self.display_name(tag_id)
    }
}

/// Resolver for callers without a tag registry; every id falls back to
/// itself as the display name.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTagNames;

impl TagResolver for NoTagNames {
    fn resolve(&self, _tag_id: &str) -> Option<&str> {
        None
    }
}

/// Active filters: free-text search, a single column, and a tag set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    pub search_term: String,
    pub column: Option<Column>,
    pub tags: Vec<String>,
}

impl FilterState {
    /// Whether any filter narrows the board. Drives the count display:
    /// plain visible count when inactive, visible/total when active.
    pub fn is_active(&self) -> bool {
        !self.search_term.trim().is_empty() || self.column.is_some() || !self.tags.is_empty()
    }
}

/// Visible/total pair for one column
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColumnCount {
    pub visible: usize,
    pub total: usize,
}

/// The visibility predicate. Rules short-circuit in order: deleted cards
/// are never visible, then column, then tag set (OR semantics over
/// resolved display names), then the search corpus.
pub fn is_visible(task: &Task, filter: &FilterState, resolver: &dyn TagResolver) -> bool {
    if task.deleted {
        return false;
    }

    if let Some(column) = filter.column
        && task.column != column
    {
        return false;
    }

    if !filter.tags.is_empty() && !matches_tag_filter(task, &filter.tags, resolver) {
        return false;
    }

    let term = filter.search_term.trim().to_lowercase();
    if !term.is_empty() && !search_corpus(task).contains(&term) {
        return false;
    }

    true
}

/// At least one of the task's tags must resolve to the same display name
/// as one of the filter's tags, case-insensitively. An id with no
/// registered name stands in for itself.
fn matches_tag_filter(task: &Task, filter_tags: &[String], resolver: &dyn TagResolver) -> bool {
    let wanted: Vec<String> = filter_tags
        .iter()
        .map(|tag| display_name(resolver, tag))
        .collect();
    task.tags
        .iter()
        .map(|tag| display_name(resolver, tag))
        .any(|name| wanted.iter().any(|w| *w == name))
}

fn display_name(resolver: &dyn TagResolver, tag_id: &str) -> String {
    resolver
        .resolve(tag_id)
        .unwrap_or(tag_id)
        .to_lowercase()
}

/// Everything the search term is matched against: title, the plain text of
/// every note, tag ids, and the priority name, all lowercased.
fn search_corpus(task: &Task) -> String {
    let mut corpus = task.title.to_lowercase();
    for note in &task.notes {
        corpus.push(' ');
        corpus.push_str(&note_plain_text(&note.content).to_lowercase());
    }
    for tag in &task.tags {
        corpus.push(' ');
        corpus.push_str(&tag.to_lowercase());
    }
    corpus.push(' ');
    corpus.push_str(task.priority.name());
    corpus
}

/// Extract plain text from a rich-text note fragment: markup elements are
/// dropped and the handful of entities the editor emits are unescaped.
pub fn note_plain_text(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                // block boundaries read as word breaks
                if !text.ends_with(' ') && !text.is_empty() {
                    text.push(' ');
                }
            }
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }
    let text = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    text.trim().to_string()
}

/// Per-column visible/total counts under the active filter. `total` counts
/// only non-deleted cards; `visible` applies the same predicate as
/// `is_visible`.
pub fn column_counts(
    tasks: &[&Task],
    filter: &FilterState,
    resolver: &dyn TagResolver,
) -> IndexMap<Column, ColumnCount> {
    let mut counts: IndexMap<Column, ColumnCount> = Column::ALL
        .iter()
        .map(|&column| (column, ColumnCount::default()))
        .collect();

    for task in tasks {
        if task.deleted {
            continue;
        }
        if let Some(count) = counts.get_mut(&task.column) {
            count.total += 1;
            if is_visible(task, filter, resolver) {
                count.visible += 1;
            }
        }
    }

    counts
}
