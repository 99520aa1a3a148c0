//! Ids chosen for a bulk action.

use crm_rust_api::Record;
use std::collections::BTreeSet;

use crate::collection::Collection;

/// Selected item ids. Never holds an id that is absent from the collection
/// it was last reconciled against.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    ids: BTreeSet<String>,
}

impl SelectionSet {
    /// Replace the selection, keeping only ids present in `collection`.
    pub fn set<R: Record, I>(&mut self, ids: I, collection: &Collection<R>)
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.ids = ids
            .into_iter()
            .map(Into::into)
            .filter(|id| collection.contains(id))
            .collect();
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Drop ids no longer present. Returns how many were dropped.
    pub fn retain_present<R: Record>(&mut self, collection: &Collection<R>) -> usize {
        let before = self.ids.len();
        self.ids.retain(|id| collection.contains(id));
        before - self.ids.len()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> Vec<String> {
        self.ids.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crm_rust_api::models::Template;
    use crm_rust_api::{ListQuery, Page};

    fn templates(ids: &[&str]) -> Collection<Template> {
        let mut collection = Collection::default();
        let items = ids
            .iter()
            .map(|id| Template {
                id: id.to_string(),
                name: id.to_uppercase(),
                subject: String::new(),
                body: String::new(),
                created_by: None,
                created_at: None,
                updated_at: None,
            })
            .collect();
        collection.replace(
            Page {
                items,
                total_count: ids.len() as u64,
                current_page: 1,
                total_pages: 1,
            },
            &ListQuery::default(),
        );
        collection
    }

    #[test]
    fn set_ignores_unknown_ids() {
        let mut selection = SelectionSet::default();
        selection.set(["a", "missing", "b"], &templates(&["a", "b"]));
        assert_eq!(selection.ids(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn retain_drops_stale_ids() {
        let mut selection = SelectionSet::default();
        selection.set(["a", "b"], &templates(&["a", "b"]));
        assert_eq!(selection.retain_present(&templates(&["b"])), 1);
        assert!(selection.contains("b"));
        assert!(!selection.contains("a"));
    }
}
