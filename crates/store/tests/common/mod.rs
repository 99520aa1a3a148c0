//! In-memory `ResourceApi` used by the store tests.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use crm_rust_api::models::{Lead, LeadPatch, LeadStatus, NewLead, NewTask, NewUser, Task, TaskPatch, User, UserPatch};
use crm_rust_api::{ApiError, ListQuery, Page, Record, ResourceApi, StatusCode};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

pub trait MockRecord: Record {
    fn from_draft(id: String, draft: &Self::Draft) -> Self;

    fn apply_patch(&mut self, patch: &Self::Patch);

    fn matches(&self, _key: &str, _value: &str) -> bool {
        true
    }
}

/// Pauses one call until the test releases it.
#[derive(Clone, Default)]
pub struct Gate {
    pub entered: Arc<Notify>,
    pub release: Arc<Notify>,
}

pub struct MockApi<R> {
    rows: Mutex<Vec<R>>,
    calls: Mutex<Vec<String>>,
    failures: Mutex<Vec<&'static str>>,
    gates: Mutex<HashMap<&'static str, Gate>>,
}

impl<R: MockRecord> MockApi<R> {
    pub fn with_rows(rows: Vec<R>) -> Arc<Self> {
        Arc::new(Self {
            rows: Mutex::new(rows),
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(Vec::new()),
            gates: Mutex::new(HashMap::new()),
        })
    }

    /// Make the next `op` call fail with a 500.
    pub fn fail_once(&self, op: &'static str) {
        self.failures.lock().unwrap().push(op);
    }

    /// Hold the next `op` call until `release` is notified.
    pub fn gate(&self, op: &'static str) -> Gate {
        let gate = Gate::default();
        self.gates.lock().unwrap().insert(op, gate.clone());
        gate
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, op: &str) -> usize {
        let prefix = format!("{}:", op);
        self.calls()
            .iter()
            .filter(|call| call.starts_with(&prefix))
            .count()
    }

    pub fn server_ids(&self) -> Vec<String> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .map(|row| row.id().to_string())
            .collect()
    }

    pub fn server_row(&self, id: &str) -> Option<R> {
        self.rows.lock().unwrap().iter().find(|row| row.id() == id).cloned()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    async fn pass_gate(&self, op: &'static str) {
        let gate = self.gates.lock().unwrap().remove(op);
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
    }

    fn check_failure(&self, op: &'static str) -> crm_rust_api::Result<()> {
        let mut failures = self.failures.lock().unwrap();
        match failures.iter().position(|failing| *failing == op) {
            Some(index) => {
                failures.remove(index);
                Err(ApiError::Status {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: "backend unavailable".to_string(),
                })
            }
            None => Ok(()),
        }
    }

    fn not_found(id: &str) -> ApiError {
        ApiError::Status {
            status: StatusCode::NOT_FOUND,
            message: format!("{} {} not found", R::KIND, id),
        }
    }
}

#[async_trait]
impl<R: MockRecord> ResourceApi<R> for MockApi<R> {
    async fn list(&self, scope: &str, query: &ListQuery) -> crm_rust_api::Result<Page<R>> {
        let filters: Vec<String> = query
            .filters
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect();
        self.record(format!("list:{}:{}", scope, filters.join(",")));
        self.pass_gate("list").await;
        self.check_failure("list")?;

        let rows = self.rows.lock().unwrap().clone();
        let matching: Vec<R> = rows
            .into_iter()
            .filter(|row| query.filters.iter().all(|(key, value)| row.matches(key, value)))
            .collect();
        let limit = query.limit.max(1);
        let total_count = matching.len() as u64;
        let total_pages = (total_count.div_ceil(limit as u64) as u32).max(1);
        let skip = ((query.page.max(1) - 1) * limit) as usize;
        let items = matching.into_iter().skip(skip).take(limit as usize).collect();
        Ok(Page {
            items,
            total_count,
            current_page: query.page.clamp(1, total_pages),
            total_pages,
        })
    }

    async fn get(&self, id: &str, _scope: &str) -> crm_rust_api::Result<R> {
        self.record(format!("get:{}", id));
        self.pass_gate("get").await;
        self.check_failure("get")?;
        self.server_row(id).ok_or_else(|| Self::not_found(id))
    }

    async fn create(&self, _scope: &str, draft: &R::Draft) -> crm_rust_api::Result<R> {
        self.record("create:".to_string());
        self.check_failure("create")?;
        let row = R::from_draft(uuid::Uuid::new_v4().to_string(), draft);
        self.rows.lock().unwrap().push(row.clone());
        Ok(row)
    }

    async fn update(&self, id: &str, patch: &R::Patch, _scope: &str) -> crm_rust_api::Result<R> {
        self.record(format!("update:{}", id));
        self.check_failure("update")?;
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|row| row.id() == id)
            .ok_or_else(|| Self::not_found(id))?;
        row.apply_patch(patch);
        Ok(row.clone())
    }

    async fn delete(&self, id: &str, _scope: &str) -> crm_rust_api::Result<()> {
        self.record(format!("delete:{}", id));
        self.check_failure("delete")?;
        self.rows.lock().unwrap().retain(|row| row.id() != id);
        Ok(())
    }

    async fn bulk_delete(&self, ids: &[String], _scope: &str) -> crm_rust_api::Result<()> {
        self.record(format!("bulk_delete:{}", ids.join(",")));
        self.pass_gate("bulk_delete").await;
        self.check_failure("bulk_delete")?;
        self.rows
            .lock()
            .unwrap()
            .retain(|row| !ids.iter().any(|id| id == row.id()));
        Ok(())
    }

    async fn assign(&self, ids: &[String], owner_id: &str, _scope: &str) -> crm_rust_api::Result<()> {
        self.record(format!("assign:{}->{}", ids.join(","), owner_id));
        self.pass_gate("assign").await;
        self.check_failure("assign")?;
        for row in self.rows.lock().unwrap().iter_mut() {
            if ids.iter().any(|id| id == row.id()) {
                row.set_owner_id(Some(owner_id.to_string()));
            }
        }
        Ok(())
    }
}

impl MockRecord for Lead {
    fn from_draft(id: String, draft: &NewLead) -> Self {
        Lead {
            id,
            name: draft.name.clone(),
            email: draft.email.clone(),
            phone: draft.phone.clone(),
            company: draft.company.clone(),
            status: draft.status.unwrap_or_default(),
            source: draft.source.clone(),
            assigned_to: draft.assigned_to.clone(),
            created_at: Some(Utc::now()),
            updated_at: Some(Utc::now()),
        }
    }

    fn apply_patch(&mut self, patch: &LeadPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(email) = &patch.email {
            self.email = Some(email.clone());
        }
        self.updated_at = Some(Utc::now());
    }

    fn matches(&self, key: &str, value: &str) -> bool {
        match key {
            "status" => self.status.as_str() == value,
            _ => true,
        }
    }
}

impl MockRecord for Task {
    fn from_draft(id: String, draft: &NewTask) -> Self {
        Task {
            id,
            title: draft.title.clone(),
            description: draft.description.clone(),
            status: draft.status.unwrap_or_default(),
            priority: draft.priority.unwrap_or_default(),
            due_date: draft.due_date,
            lead_id: draft.lead_id.clone(),
            assigned_to: draft.assigned_to.clone(),
            created_at: Some(Utc::now()),
            updated_at: Some(Utc::now()),
        }
    }

    fn apply_patch(&mut self, patch: &TaskPatch) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        self.updated_at = Some(Utc::now());
    }
}

impl MockRecord for User {
    fn from_draft(id: String, draft: &NewUser) -> Self {
        User {
            id,
            name: Some(draft.name.clone()),
            email: Some(draft.email.clone()),
            role: draft.role.unwrap_or_default(),
            active: true,
            manager_id: draft.manager_id.clone(),
            created_at: None,
            updated_at: None,
        }
    }

    fn apply_patch(&mut self, patch: &UserPatch) {
        if let Some(name) = &patch.name {
            self.name = Some(name.clone());
        }
    }
}

pub fn lead(id: &str) -> Lead {
    Lead {
        id: id.to_string(),
        name: format!("Lead {}", id),
        email: Some(format!("{}@example.com", id)),
        phone: None,
        company: None,
        status: LeadStatus::New,
        source: None,
        assigned_to: None,
        created_at: None,
        updated_at: None,
    }
}

pub fn leads(ids: &[&str]) -> Vec<Lead> {
    ids.iter().map(|id| lead(id)).collect()
}

pub fn ids_of<R: Record>(items: &[R]) -> Vec<String> {
    items.iter().map(|item| item.id().to_string()).collect()
}

pub fn strings(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|id| id.to_string()).collect()
}

pub fn init_logger() {
    let _ = pretty_env_logger::try_init();
}
