//! The in-memory paginated list view of one resource type.

use crm_rust_api::{ListQuery, Page, Record};
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, PartialEq)]
pub struct Collection<R> {
    pub items: Vec<R>,
    pub total_count: u64,
    pub current_page: u32,
    pub total_pages: u32,
    pub limit: u32,
    pub active_filters: BTreeMap<String, String>,
}

impl<R> Default for Collection<R> {
    fn default() -> Self {
        let query = ListQuery::default();
        Self {
            items: Vec::new(),
            total_count: 0,
            current_page: 1,
            total_pages: 1,
            limit: query.limit,
            active_filters: BTreeMap::new(),
        }
    }
}

impl<R: Record> Collection<R> {
    /// Replace every field from a freshly fetched page.
    pub fn replace(&mut self, page: Page<R>, query: &ListQuery) {
        self.items = page.items;
        self.total_count = page.total_count;
        self.current_page = page.current_page;
        self.total_pages = page.total_pages;
        self.limit = query.limit;
        self.active_filters = query.filters.clone();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&R> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|item| item.id())
    }

    /// Append a server-confirmed item.
    pub fn push(&mut self, item: R) {
        self.items.push(item);
        self.total_count += 1;
    }

    /// Swap in the canonical version of an item. Returns false if absent.
    pub fn replace_item(&mut self, item: R) -> bool {
        match self.items.iter_mut().find(|existing| existing.id() == item.id()) {
            Some(existing) => {
                *existing = item;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<R> {
        let index = self.items.iter().position(|item| item.id() == id)?;
        self.total_count = self.total_count.saturating_sub(1);
        Some(self.items.remove(index))
    }

    /// Remove every item whose id is in `ids`; returns how many were removed.
    pub fn remove_many(&mut self, ids: &HashSet<&str>) -> usize {
        let before = self.items.len();
        self.items.retain(|item| !ids.contains(item.id()));
        let removed = before - self.items.len();
        self.total_count = self.total_count.saturating_sub(removed as u64);
        removed
    }

    /// Point the owner reference of every listed item at `owner_id`.
    pub fn set_owner(&mut self, ids: &HashSet<&str>, owner_id: &str) -> usize {
        let mut patched = 0;
        for item in self.items.iter_mut().filter(|item| ids.contains(item.id())) {
            item.set_owner_id(Some(owner_id.to_string()));
            patched += 1;
        }
        patched
    }
}
