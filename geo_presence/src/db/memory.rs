//! In-process store used by tests and local development.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::{
    collections::BTreeMap,
    sync::{Mutex, MutexGuard},
};

use super::{
    errors::StoreResult,
    repository::{
        AttendanceRepository, FaceTemplateRepository, OfficeRepository, Store, UserRepository,
    },
};
use crate::{
    auth::{User, UserId},
    face::FaceTemplate,
    ledger::{AttendanceRecord, NewAttendanceRecord},
    office::{Office, OfficeId, OfficeUpdate},
};

#[derive(Default)]
struct State {
    offices: BTreeMap<OfficeId, Office>,
    users: BTreeMap<UserId, User>,
    templates: Vec<FaceTemplate>,
    records: Vec<AttendanceRecord>,
    next_template_id: i64,
    next_record_id: i64,
}

/// Store that keeps everything in memory behind one mutex
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed or replace an office
    pub fn insert_office(&self, office: Office) {
        self.state().offices.insert(office.id, office);
    }

    /// Seed or replace a user
    pub fn insert_user(&self, user: User) {
        self.state().users.insert(user.id, user);
    }

    /// Snapshot of every stored record in append order
    pub fn all_records(&self) -> Vec<AttendanceRecord> {
        self.state().records.clone()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl OfficeRepository for MemoryStore {
    async fn find_office(&self, office_id: OfficeId) -> StoreResult<Option<Office>> {
        Ok(self.state().offices.get(&office_id).cloned())
    }

    async fn list_offices(&self) -> StoreResult<Vec<Office>> {
        Ok(self.state().offices.values().cloned().collect())
    }

    async fn update_office(
        &self,
        office_id: OfficeId,
        update: &OfficeUpdate,
    ) -> StoreResult<Option<Office>> {
        let mut state = self.state();
        Ok(state.offices.get_mut(&office_id).map(|office| {
            *office = update.apply_to(office);
            office.clone()
        }))
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_user(&self, user_id: UserId) -> StoreResult<Option<User>> {
        Ok(self.state().users.get(&user_id).cloned())
    }
}

#[async_trait]
impl FaceTemplateRepository for MemoryStore {
    async fn insert_template(
        &self,
        user_id: UserId,
        embedding: &[u8],
        model_id: &str,
    ) -> StoreResult<FaceTemplate> {
        let mut state = self.state();
        state.next_template_id += 1;
        let template = FaceTemplate {
            id: state.next_template_id,
            user_id,
            embedding: embedding.to_vec(),
            model_id: model_id.to_string(),
            created_at: Utc::now(),
        };
        state.templates.push(template.clone());
        Ok(template)
    }

    async fn recent_templates(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> StoreResult<Vec<FaceTemplate>> {
        // IDs grow with insertion order, so reverse order is newest first
        Ok(self
            .state()
            .templates
            .iter()
            .rev()
            .filter(|t| t.user_id == user_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn count_templates(&self, user_id: UserId) -> StoreResult<i64> {
        let count = self
            .state()
            .templates
            .iter()
            .filter(|t| t.user_id == user_id)
            .count();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }
}

#[async_trait]
impl AttendanceRepository for MemoryStore {
    async fn records_for_user(
        &self,
        user_id: UserId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Vec<AttendanceRecord>> {
        Ok(self
            .state()
            .records
            .iter()
            .filter(|r| r.user_id == user_id && r.recorded_at >= start && r.recorded_at < end)
            .cloned()
            .collect())
    }

    async fn records_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        office_id: Option<OfficeId>,
    ) -> StoreResult<Vec<AttendanceRecord>> {
        let mut records: Vec<AttendanceRecord> = self
            .state()
            .records
            .iter()
            .filter(|r| r.recorded_at >= start && r.recorded_at < end)
            .filter(|r| office_id.is_none_or(|id| r.office_id == id))
            .cloned()
            .collect();
        records.sort_by_key(|r| (r.recorded_at, r.id));
        Ok(records)
    }

    async fn insert_record(&self, record: &NewAttendanceRecord) -> StoreResult<AttendanceRecord> {
        let mut state = self.state();
        state.next_record_id += 1;
        let stored = record.clone().with_id(state.next_record_id);
        state.records.push(stored.clone());
        Ok(stored)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
