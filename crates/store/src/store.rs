//! Resource store: one collection, one current item and a selection for a
//! single resource type, kept in step with the backend.
//!
//! Create, update and single delete wait for the server before touching
//! local state. Bulk delete and (bulk) assignment are applied locally first
//! and then confirmed; if the server rejects them the whole collection is
//! refetched to discard the optimistic change, and if it accepts them a
//! background refetch picks up server-side side effects. A full refetch is
//! the only rollback mechanism.

use crm_rust_api::{ListQuery, Record, ResourceApi};
use log::{debug, info, warn};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::collection::Collection;
use crate::error::{Result, StoreError};
use crate::selection::SelectionSet;

/// Tuning for a [`ResourceStore`].
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Delay before the background refetch that follows a confirmed
    /// optimistic mutation.
    pub reconcile_delay: Duration,

    /// Page size used when no earlier query is known.
    pub page_limit: u32,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            reconcile_delay: Duration::from_secs(1),
            page_limit: 10,
        }
    }
}

impl StoreOptions {
    pub fn with_reconcile_delay(mut self, value: Duration) -> Self {
        self.reconcile_delay = value;
        self
    }

    pub fn with_page_limit(mut self, value: u32) -> Self {
        self.page_limit = value.max(1);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct FetchContext {
    scope: String,
    query: ListQuery,
}

/// Observable state of a store.
#[derive(Debug, Clone)]
pub struct StoreState<R> {
    pub collection: Collection<R>,
    pub current: Option<R>,
    pub selection: SelectionSet,
    pub is_loading: bool,
    /// Display message of the last failed action.
    pub error: Option<String>,
    last_fetch: Option<FetchContext>,
    in_flight: usize,
}

impl<R> Default for StoreState<R> {
    fn default() -> Self {
        Self {
            collection: Collection::default(),
            current: None,
            selection: SelectionSet::default(),
            is_loading: false,
            error: None,
            last_fetch: None,
            in_flight: 0,
        }
    }
}

impl<R> StoreState<R> {
    /// Scope id of the last successful collection fetch.
    pub fn scope(&self) -> Option<&str> {
        self.last_fetch.as_ref().map(|ctx| ctx.scope.as_str())
    }

    /// Query of the last successful collection fetch.
    pub fn last_query(&self) -> Option<&ListQuery> {
        self.last_fetch.as_ref().map(|ctx| &ctx.query)
    }

    fn begin_loading(&mut self) {
        self.in_flight += 1;
        self.is_loading = true;
    }

    fn end_loading(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
        self.is_loading = self.in_flight > 0;
    }
}

/// One unit of `in_flight`, released on drop so that a cancelled load
/// cannot leave `is_loading` set.
struct LoadingGuard<R> {
    state: Arc<watch::Sender<StoreState<R>>>,
    armed: bool,
}

impl<R> LoadingGuard<R> {
    fn begin(state: &Arc<watch::Sender<StoreState<R>>>) -> Self {
        state.send_modify(|state| state.begin_loading());
        Self {
            state: state.clone(),
            armed: true,
        }
    }

    /// Apply `f` and release the load in a single state change.
    fn finish(mut self, f: impl FnOnce(&mut StoreState<R>)) {
        self.armed = false;
        self.state.send_modify(|state| {
            f(state);
            state.end_loading();
        });
    }
}

impl<R> Drop for LoadingGuard<R> {
    fn drop(&mut self) {
        if self.armed {
            self.state.send_modify(|state| state.end_loading());
        }
    }
}

fn require_scope(scope: &str) -> Result<&str> {
    let scope = scope.trim();
    if scope.is_empty() {
        Err(StoreError::MissingScope)
    } else {
        Ok(scope)
    }
}

fn unique_ids(ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}

/// Store for one resource type, built around an injected [`ResourceApi`].
///
/// Cloning is cheap and every clone shares the same state.
#[derive(Clone)]
pub struct ResourceStore<R: Record> {
    api: Arc<dyn ResourceApi<R>>,
    options: StoreOptions,
    state: Arc<watch::Sender<StoreState<R>>>,
    epoch: Arc<AtomicU64>,
    reconcile: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl<R: Record> ResourceStore<R> {
    pub fn new(api: Arc<dyn ResourceApi<R>>) -> Self {
        Self::with_options(api, StoreOptions::default())
    }

    pub fn with_options(api: Arc<dyn ResourceApi<R>>, options: StoreOptions) -> Self {
        let (state, _) = watch::channel(StoreState::default());
        Self {
            api,
            options,
            state: Arc::new(state),
            epoch: Arc::new(AtomicU64::new(0)),
            reconcile: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    /// Clone of the current state.
    pub fn snapshot(&self) -> StoreState<R> {
        self.state.borrow().clone()
    }

    /// Receiver notified after every state change.
    pub fn subscribe(&self) -> watch::Receiver<StoreState<R>> {
        self.state.subscribe()
    }

    /// Run `f` against the current state without cloning it.
    pub fn read<T>(&self, f: impl FnOnce(&StoreState<R>) -> T) -> T {
        f(&self.state.borrow())
    }

    pub fn items(&self) -> Vec<R> {
        self.read(|state| state.collection.items.clone())
    }

    pub fn current(&self) -> Option<R> {
        self.read(|state| state.current.clone())
    }

    pub fn error(&self) -> Option<String> {
        self.read(|state| state.error.clone())
    }

    pub fn is_loading(&self) -> bool {
        self.read(|state| state.is_loading)
    }

    fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    fn ensure_epoch(&self, epoch: u64) -> Result<()> {
        if self.epoch() == epoch {
            Ok(())
        } else {
            debug!("Discarding {} response from an earlier navigation", R::KIND);
            Err(StoreError::Superseded)
        }
    }

    /// Record `err` as the store's error message and hand it back.
    fn fail(&self, err: StoreError) -> StoreError {
        if err != StoreError::Superseded {
            warn!("{} store: {}", R::KIND, err);
            let message = err.to_string();
            self.state.send_modify(|state| state.error = Some(message));
        }
        err
    }

    fn remembered_scope(&self) -> Result<String> {
        self.read(|state| state.scope().map(str::to_string))
            .ok_or(StoreError::MissingScope)
            .map_err(|err| self.fail(err))
    }

    fn prior_query(&self) -> ListQuery {
        self.read(|state| state.last_query().cloned())
            .unwrap_or_else(|| ListQuery::new(1, self.options.page_limit))
    }

    fn complete_load<T>(
        &self,
        guard: LoadingGuard<R>,
        epoch: u64,
        result: crm_rust_api::Result<T>,
        apply: impl FnOnce(&mut StoreState<R>, T),
    ) -> Result<()> {
        if let Err(err) = self.ensure_epoch(epoch) {
            drop(guard);
            return Err(err);
        }
        match result {
            Ok(value) => {
                guard.finish(|state| {
                    apply(state, value);
                    state.error = None;
                });
                Ok(())
            }
            Err(err) => {
                let err = StoreError::from(err);
                warn!("{} store: {}", R::KIND, err);
                let message = err.to_string();
                guard.finish(|state| state.error = Some(message));
                Err(err)
            }
        }
    }

    /// Fetch a page of the collection and replace it wholesale.
    ///
    /// On failure the previous collection is left untouched. The selection
    /// is cleared on success.
    pub async fn fetch_collection(&self, scope: &str, query: ListQuery) -> Result<()> {
        let scope = require_scope(scope).map_err(|err| self.fail(err))?;
        let epoch = self.epoch();
        let guard = LoadingGuard::begin(&self.state);

        let result = self.api.list(scope, &query).await;
        let context = FetchContext {
            scope: scope.to_string(),
            query,
        };
        self.complete_load(guard, epoch, result, |state, page| {
            state.collection.replace(page, &context.query);
            state.selection.clear();
            state.last_fetch = Some(context);
        })
    }

    /// Fetch another page with the filters of the last fetch.
    pub async fn fetch_page(&self, scope: &str, page: u32) -> Result<()> {
        let mut query = self.prior_query();
        query.page = page.max(1);
        self.fetch_collection(scope, query).await
    }

    /// Refetch with the scope and query of the last successful fetch.
    pub async fn refresh(&self) -> Result<()> {
        let context = self.read(|state| state.last_fetch.clone());
        match context {
            Some(context) => self.fetch_collection(&context.scope, context.query).await,
            None => Err(self.fail(StoreError::MissingScope)),
        }
    }

    /// Load one item into `current`.
    pub async fn fetch_item(&self, id: &str, scope: &str) -> Result<()> {
        let scope = require_scope(scope).map_err(|err| self.fail(err))?;
        let epoch = self.epoch();
        let guard = LoadingGuard::begin(&self.state);

        let result = self.api.get(id, scope).await;
        self.complete_load(guard, epoch, result, |state, item| state.current = Some(item))
    }

    /// Create an item under the scope of the last fetch.
    pub async fn create_item(&self, draft: &R::Draft) -> Result<R> {
        let scope = self.remembered_scope()?;
        self.create_item_in(&scope, draft).await
    }

    /// Create an item and append the server's canonical copy.
    pub async fn create_item_in(&self, scope: &str, draft: &R::Draft) -> Result<R> {
        let scope = require_scope(scope).map_err(|err| self.fail(err))?;
        let epoch = self.epoch();

        let result = self.api.create(scope, draft).await;
        self.ensure_epoch(epoch)?;
        let created = result.map_err(|err| self.fail(err.into()))?;

        self.state.send_modify(|state| {
            state.collection.push(created.clone());
            state.error = None;
        });
        info!("Added {} {}", R::KIND, created.id());
        Ok(created)
    }

    /// Update an item and replace local copies with the server's version.
    pub async fn update_item(&self, id: &str, patch: &R::Patch, scope: &str) -> Result<R> {
        let scope = require_scope(scope).map_err(|err| self.fail(err))?;
        let epoch = self.epoch();

        let result = self.api.update(id, patch, scope).await;
        self.ensure_epoch(epoch)?;
        let updated = result.map_err(|err| self.fail(err.into()))?;

        self.state.send_modify(|state| {
            if state
                .current
                .as_ref()
                .is_some_and(|current| current.id() == updated.id())
            {
                state.current = Some(updated.clone());
            }
            state.collection.replace_item(updated.clone());
            state.error = None;
        });
        Ok(updated)
    }

    /// Delete one loaded item. Fails without a request if the id is not in
    /// the collection.
    pub async fn delete_item(&self, id: &str, scope: &str) -> Result<bool> {
        if !self.read(|state| state.collection.contains(id)) {
            return Err(self.fail(StoreError::NotFound {
                kind: R::KIND,
                id: id.to_string(),
            }));
        }
        let scope = require_scope(scope).map_err(|err| self.fail(err))?;
        let epoch = self.epoch();

        let result = self.api.delete(id, scope).await;
        self.ensure_epoch(epoch)?;
        result.map_err(|err| self.fail(err.into()))?;

        self.state.send_modify(|state| {
            state.collection.remove(id);
            if state.current.as_ref().is_some_and(|current| current.id() == id) {
                state.current = None;
            }
            state.selection.retain_present(&state.collection);
            state.error = None;
        });
        info!("Removed {} {}", R::KIND, id);
        Ok(true)
    }

    /// Delete several loaded items, removing them locally before the
    /// request completes.
    pub async fn bulk_delete(&self, ids: &[String], scope: &str) -> Result<()> {
        let scope = require_scope(scope).map_err(|err| self.fail(err))?;
        let requested = unique_ids(ids);
        if requested.is_empty() {
            return Ok(());
        }
        self.ensure_loaded(&requested)?;

        let epoch = self.epoch();
        let query = self.prior_query();
        self.state.send_modify(|state| {
            let targets: HashSet<&str> = requested.iter().map(String::as_str).collect();
            state.collection.remove_many(&targets);
            state.selection.retain_present(&state.collection);
            if state
                .current
                .as_ref()
                .is_some_and(|current| targets.contains(current.id()))
            {
                state.current = None;
            }
        });
        debug!("Optimistically removed {} {}s", requested.len(), R::KIND);

        let result = self.api.bulk_delete(&requested, scope).await;
        if let Err(superseded) = self.ensure_epoch(epoch) {
            if let Err(err) = result {
                self.discard_stale_change(err.into()).await;
            }
            return Err(superseded);
        }
        match result {
            Ok(()) => {
                self.state.send_modify(|state| state.error = None);
                self.schedule_reconcile(scope.to_string(), query);
                Ok(())
            }
            Err(err) => Err(self.rollback(scope, query, err.into()).await),
        }
    }

    /// Assign one loaded item to `owner_id`.
    pub async fn assign(&self, id: &str, owner_id: &str) -> Result<()> {
        if !self.read(|state| state.collection.contains(id)) {
            return Err(self.fail(StoreError::NotFound {
                kind: R::KIND,
                id: id.to_string(),
            }));
        }
        self.bulk_assign(&[id.to_string()], owner_id).await
    }

    /// Assign several loaded items to `owner_id`, patching the owner
    /// reference locally before the request completes.
    pub async fn bulk_assign(&self, ids: &[String], owner_id: &str) -> Result<()> {
        let scope = self.remembered_scope()?;
        let owner_id = owner_id.trim();
        if owner_id.is_empty() {
            return Err(self.fail(StoreError::Validation(
                "An owner is required to assign".to_string(),
            )));
        }
        let requested = unique_ids(ids);
        if requested.is_empty() {
            return Ok(());
        }
        self.ensure_loaded(&requested)?;

        let epoch = self.epoch();
        let query = self.prior_query();
        self.state.send_modify(|state| {
            let targets: HashSet<&str> = requested.iter().map(String::as_str).collect();
            state.collection.set_owner(&targets, owner_id);
            if let Some(current) = state.current.as_mut() {
                if targets.contains(current.id()) {
                    current.set_owner_id(Some(owner_id.to_string()));
                }
            }
        });
        debug!(
            "Optimistically assigned {} {}s to {}",
            requested.len(),
            R::KIND,
            owner_id
        );

        let result = self.api.assign(&requested, owner_id, &scope).await;
        if let Err(superseded) = self.ensure_epoch(epoch) {
            if let Err(err) = result {
                self.discard_stale_change(err.into()).await;
            }
            return Err(superseded);
        }
        match result {
            Ok(()) => {
                self.state.send_modify(|state| state.error = None);
                self.schedule_reconcile(scope, query);
                Ok(())
            }
            Err(err) => Err(self.rollback(&scope, query, err.into()).await),
        }
    }

    fn ensure_loaded(&self, requested: &[String]) -> Result<()> {
        let found = self.read(|state| {
            requested
                .iter()
                .filter(|id| state.collection.contains(id.as_str()))
                .count()
        });
        if found == requested.len() {
            Ok(())
        } else {
            Err(self.fail(StoreError::CountMismatch {
                kind: R::KIND,
                requested: requested.len(),
                found,
            }))
        }
    }

    /// Discard optimistic changes by refetching, then record `err`.
    async fn rollback(&self, scope: &str, query: ListQuery, err: StoreError) -> StoreError {
        warn!(
            "{} change rejected ({}); refetching to discard local changes",
            R::KIND,
            err
        );
        match self.fetch_collection(scope, query).await {
            Ok(()) => {}
            Err(StoreError::Superseded) => return StoreError::Superseded,
            Err(refetch_err) => warn!("Refetch after rejected change failed: {}", refetch_err),
        }
        self.fail(err)
    }

    /// A change issued before the last navigation was rejected. Its
    /// optimistic edit is still in the collection, so refetch with the
    /// current context. The error itself belongs to the old view and is not
    /// recorded.
    async fn discard_stale_change(&self, err: StoreError) {
        warn!(
            "{} change rejected after navigation ({}); refetching",
            R::KIND,
            err
        );
        let context = self.read(|state| state.last_fetch.clone());
        if let Some(context) = context {
            if let Err(refetch_err) = self.fetch_collection(&context.scope, context.query).await {
                warn!("Refetch after rejected change failed: {}", refetch_err);
            }
        }
    }

    fn schedule_reconcile(&self, scope: String, query: ListQuery) {
        let store = self.clone();
        let delay = self.options.reconcile_delay;
        let epoch = self.epoch();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if store.epoch() != epoch {
                return;
            }
            debug!("Reconciling {}s with the server", R::KIND);
            if let Err(err) = store.fetch_collection(&scope, query).await {
                warn!("Background refetch of {}s failed: {}", R::KIND, err);
            }
        });

        let mut pending = self.reconcile.lock().unwrap_or_else(PoisonError::into_inner);
        pending.retain(|previous| !previous.is_finished());
        for previous in pending.iter() {
            previous.abort();
        }
        pending.push(handle);
    }

    /// Wait for every scheduled background refetch, including aborted ones,
    /// to finish.
    pub async fn settle(&self) {
        loop {
            let handles =
                std::mem::take(&mut *self.reconcile.lock().unwrap_or_else(PoisonError::into_inner));
            if handles.is_empty() {
                break;
            }
            for handle in handles {
                match handle.await {
                    Err(err) if err.is_panic() => {
                        warn!("Background refetch of {}s panicked: {}", R::KIND, err)
                    }
                    _ => {}
                }
            }
        }
    }

    /// Start a new navigation boundary. Responses to requests issued before
    /// this call are discarded, and the current item and selection are reset.
    pub fn navigate(&self) {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        for handle in self
            .reconcile
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
        {
            handle.abort();
        }
        self.state.send_modify(|state| {
            state.current = None;
            state.selection.clear();
            state.error = None;
        });
        debug!("{} store entered navigation {}", R::KIND, epoch);
    }

    pub fn reset_current(&self) {
        self.state.send_modify(|state| state.current = None);
    }

    pub fn clear_error(&self) {
        self.state.send_modify(|state| state.error = None);
    }

    /// Select ids for a bulk action; ids not in the collection are ignored.
    pub fn set_selected<I>(&self, ids: I)
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.state
            .send_modify(|state| state.selection.set(ids, &state.collection));
    }

    pub fn clear_selection(&self) {
        self.state.send_modify(|state| state.selection.clear());
    }

    pub fn selected_ids(&self) -> Vec<String> {
        self.read(|state| state.selection.ids())
    }

    pub async fn bulk_delete_selected(&self, scope: &str) -> Result<()> {
        let ids = self.selected_ids();
        self.bulk_delete(&ids, scope).await
    }

    pub async fn bulk_assign_selected(&self, owner_id: &str) -> Result<()> {
        let ids = self.selected_ids();
        self.bulk_assign(&ids, owner_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_scope_is_missing() {
        assert_eq!(require_scope("  "), Err(StoreError::MissingScope));
        assert_eq!(require_scope(" co-1 "), Ok("co-1"));
    }

    #[test]
    fn unique_ids_keeps_first_occurrence() {
        let ids = vec!["b".to_string(), "a".to_string(), "b".to_string()];
        assert_eq!(unique_ids(&ids), vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn loading_tracks_overlapping_requests() {
        let mut state: StoreState<()> = StoreState::default();
        state.begin_loading();
        state.begin_loading();
        state.end_loading();
        assert!(state.is_loading);
        state.end_loading();
        assert!(!state.is_loading);
        state.end_loading();
        assert!(!state.is_loading);
    }

    #[test]
    fn dropped_guard_releases_loading() {
        let (tx, _) = watch::channel(StoreState::<()>::default());
        let state = Arc::new(tx);

        let finished = LoadingGuard::begin(&state);
        let abandoned = LoadingGuard::begin(&state);
        assert!(state.borrow().is_loading);

        finished.finish(|state| state.error = None);
        assert!(state.borrow().is_loading);
        drop(abandoned);
        assert!(!state.borrow().is_loading);
        assert_eq!(state.borrow().in_flight, 0);
    }
}
