//! Stage bucketing for board views (tasks by status, leads by status).

use crm_rust_api::models::{Lead, LeadPatch, LeadStatus, Task, TaskPatch, TaskStatus};
use crm_rust_api::Record;
use std::fmt::Debug;
use std::hash::Hash;

use crate::error::Result;
use crate::store::ResourceStore;

/// A record that sits in exactly one stage of an ordered pipeline.
pub trait Staged: Record {
    type Stage: Copy + Eq + Hash + Debug + Send + Sync + 'static;

    /// Every stage, in board order.
    fn stages() -> &'static [Self::Stage];

    fn stage(&self) -> Self::Stage;

    /// Patch that moves a record into `stage`.
    fn stage_patch(stage: Self::Stage) -> Self::Patch;
}

impl Staged for Task {
    type Stage = TaskStatus;

    fn stages() -> &'static [TaskStatus] {
        &TaskStatus::ALL
    }

    fn stage(&self) -> TaskStatus {
        self.status
    }

    fn stage_patch(stage: TaskStatus) -> TaskPatch {
        TaskPatch {
            status: Some(stage),
            ..Default::default()
        }
    }
}

impl Staged for Lead {
    type Stage = LeadStatus;

    fn stages() -> &'static [LeadStatus] {
        &LeadStatus::ALL
    }

    fn stage(&self) -> LeadStatus {
        self.status
    }

    fn stage_patch(stage: LeadStatus) -> LeadPatch {
        LeadPatch {
            status: Some(stage),
            ..Default::default()
        }
    }
}

/// Records grouped into stage columns. Every stage has a column, even when
/// empty; within a column records keep their collection order.
#[derive(Debug, Clone)]
pub struct Pipeline<R: Staged> {
    columns: Vec<(R::Stage, Vec<R>)>,
}

impl<R: Staged> Pipeline<R> {
    pub fn from_items(items: &[R]) -> Self {
        let mut columns: Vec<(R::Stage, Vec<R>)> =
            R::stages().iter().map(|stage| (*stage, Vec::new())).collect();
        for item in items {
            let stage = item.stage();
            if let Some((_, column)) = columns.iter_mut().find(|(s, _)| *s == stage) {
                column.push(item.clone());
            }
        }
        Self { columns }
    }

    pub fn column(&self, stage: R::Stage) -> &[R] {
        self.columns
            .iter()
            .find(|(s, _)| *s == stage)
            .map(|(_, items)| items.as_slice())
            .unwrap_or(&[])
    }

    pub fn columns(&self) -> impl Iterator<Item = (R::Stage, &[R])> {
        self.columns
            .iter()
            .map(|(stage, items)| (*stage, items.as_slice()))
    }

    pub fn counts(&self) -> Vec<(R::Stage, usize)> {
        self.columns
            .iter()
            .map(|(stage, items)| (*stage, items.len()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.columns.iter().map(|(_, items)| items.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<R: Staged> ResourceStore<R> {
    /// Board view of the loaded collection.
    pub fn pipeline(&self) -> Pipeline<R> {
        self.read(|state| Pipeline::from_items(&state.collection.items))
    }

    /// Move a record to another stage. Waits for the server like any update;
    /// a record already in `stage` is returned without a request.
    pub async fn move_to_stage(&self, id: &str, stage: R::Stage, scope: &str) -> Result<R> {
        let existing = self.read(|state| state.collection.get(id).cloned());
        if let Some(item) = existing {
            if item.stage() == stage {
                return Ok(item);
            }
        }
        self.update_item(id, &R::stage_patch(stage), scope).await
    }
}
