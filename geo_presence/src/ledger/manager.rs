//! Day-scoped attendance ledger.

use super::{
    errors::{LedgerError, LedgerResult},
    models::{AttendanceRecord, AttendanceType, DayState, NewAttendanceRecord},
};
use crate::{
    auth::UserId,
    db::{AttendanceRepository, StoreResult},
    office::OfficeId,
};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Utc};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Attendance ledger
///
/// Day state is always recomputed from the user's records for the day; there
/// is no cached open/closed flag. Appends are serialised per user so the
/// state check and the write form one unit.
pub struct AttendanceLedger {
    repo: Arc<dyn AttendanceRepository>,
    /// Reference time zone that decides which calendar day a record belongs to
    zone: FixedOffset,
    user_locks: Mutex<HashMap<UserId, Arc<AsyncMutex<()>>>>,
}

impl AttendanceLedger {
    /// Create a new ledger
    ///
    /// # Arguments
    ///
    /// * `repo` - Record storage
    /// * `zone` - Reference offset for calendar days
    pub fn new(repo: Arc<dyn AttendanceRepository>, zone: FixedOffset) -> Self {
        Self {
            repo,
            zone,
            user_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn zone(&self) -> FixedOffset {
        self.zone
    }

    /// Calendar date of an instant in the reference zone
    pub fn local_date(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.zone).date_naive()
    }

    /// Half-open UTC interval `[start, end)` covering a local calendar date
    pub fn day_bounds(&self, date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        let local_midnight = date.and_time(NaiveTime::MIN);
        let start =
            (local_midnight - Duration::seconds(i64::from(self.zone.local_minus_utc()))).and_utc();
        (start, start + Duration::days(1))
    }

    /// All of a user's records for a local date, oldest first
    pub async fn records_for(
        &self,
        user_id: UserId,
        date: NaiveDate,
    ) -> StoreResult<Vec<AttendanceRecord>> {
        let (start, end) = self.day_bounds(date);
        let mut records = self.repo.records_for_user(user_id, start, end).await?;
        records.sort_by_key(|r| (r.recorded_at, r.id));
        Ok(records)
    }

    /// Session state of a user on a local date
    pub async fn day_state(&self, user_id: UserId, date: NaiveDate) -> StoreResult<DayState> {
        let records = self.records_for(user_id, date).await?;
        Ok(DayState::from_records(&records))
    }

    /// The check-in that keeps the user's session open on `date`, if any
    pub async fn open_session_for(
        &self,
        user_id: UserId,
        date: NaiveDate,
    ) -> StoreResult<Option<AttendanceRecord>> {
        let records = self.records_for(user_id, date).await?;
        let open_id = match DayState::from_records(&records) {
            DayState::OpenSession { record_id, .. } => record_id,
            _ => return Ok(None),
        };
        Ok(records.into_iter().find(|r| r.id == open_id))
    }

    /// Every record on a local date, optionally for one office
    pub async fn records_on(
        &self,
        date: NaiveDate,
        office_id: Option<OfficeId>,
    ) -> StoreResult<Vec<AttendanceRecord>> {
        let (start, end) = self.day_bounds(date);
        let mut records = self.repo.records_between(start, end, office_id).await?;
        records.sort_by_key(|r| (r.recorded_at, r.id));
        Ok(records)
    }

    /// Append a record if the user's day state allows it
    ///
    /// The state read and the insert run under the user's lock; concurrent
    /// attempts for the same user queue up, other users are not blocked.
    ///
    /// # Errors
    ///
    /// * `LedgerError::DuplicateCheckin` - Check-in while a session is open
    /// * `LedgerError::NoOpenSession` - Check-out without an open session
    pub async fn append_guarded(&self, record: NewAttendanceRecord) -> LedgerResult<AttendanceRecord> {
        let _guard = self.lock_user(record.user_id).await;

        let date = self.local_date(record.recorded_at);
        let state = self.day_state(record.user_id, date).await?;

        if !state.permits(record.kind) {
            return Err(match (record.kind, state) {
                (AttendanceType::Checkin, DayState::OpenSession { since, .. }) => {
                    LedgerError::DuplicateCheckin { since }
                }
                _ => LedgerError::NoOpenSession,
            });
        }

        let written = self.repo.insert_record(&record).await?;

        log::debug!(
            "Ledger append: record {} user {} {} on {}",
            written.id,
            written.user_id,
            written.kind,
            date
        );

        Ok(written)
    }

    async fn lock_user(&self, user_id: UserId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.user_locks.lock().unwrap_or_else(|e| e.into_inner());
            // Entries only the map references are idle.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(user_id).or_default().clone()
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::geofence::GeofenceVerdict;
    use crate::ledger::models::FaceEvidence;
    use crate::network::FactorVerdict;
    use chrono::TimeZone;

    fn ledger(offset_hours: i32) -> AttendanceLedger {
        let zone = FixedOffset::east_opt(offset_hours * 3600).unwrap();
        AttendanceLedger::new(Arc::new(MemoryStore::new()), zone)
    }

    fn attempt(user_id: UserId, kind: AttendanceType, at: DateTime<Utc>) -> NewAttendanceRecord {
        NewAttendanceRecord {
            user_id,
            office_id: 1,
            kind,
            recorded_at: at,
            latitude: 0.0,
            longitude: 0.0,
            accuracy_meters: Some(5.0),
            distance_meters: 0.0,
            geofence: GeofenceVerdict::Pass,
            network: FactorVerdict::Pass,
            face: FaceEvidence::not_evaluated(),
            client_address: "10.0.0.1".to_string(),
            note: None,
        }
    }

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_day_bounds_follow_offset() {
        let ledger = ledger(8);
        let date = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let (start, end) = ledger.day_bounds(date);

        assert_eq!(start, Utc.with_ymd_and_hms(2024, 5, 9, 16, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 5, 10, 16, 0, 0).unwrap());
    }

    #[test]
    fn test_local_date_uses_reference_zone() {
        let ledger = ledger(8);
        // 17:00 UTC is already the next day at +08:00
        assert_eq!(
            ledger.local_date(at(10, 17)),
            NaiveDate::from_ymd_opt(2024, 5, 11).unwrap()
        );
    }

    #[tokio::test]
    async fn test_alternating_sequence_is_admitted() {
        let ledger = ledger(0);
        let kinds = [
            AttendanceType::Checkin,
            AttendanceType::Checkout,
            AttendanceType::Checkin,
            AttendanceType::Checkout,
        ];
        for (i, kind) in kinds.iter().enumerate() {
            ledger
                .append_guarded(attempt(1, *kind, at(10, 8 + i as u32)))
                .await
                .unwrap();
        }

        let date = ledger.local_date(at(10, 8));
        let records = ledger.records_for(1, date).await.unwrap();
        let written: Vec<_> = records.iter().map(|r| r.kind).collect();
        assert_eq!(written, kinds);
        assert_eq!(ledger.day_state(1, date).await.unwrap(), DayState::ClosedSession);
    }

    #[tokio::test]
    async fn test_duplicate_checkin_rejected() {
        let ledger = ledger(0);
        ledger
            .append_guarded(attempt(1, AttendanceType::Checkin, at(10, 8)))
            .await
            .unwrap();

        let result = ledger
            .append_guarded(attempt(1, AttendanceType::Checkin, at(10, 9)))
            .await;
        assert!(matches!(result, Err(LedgerError::DuplicateCheckin { since }) if since == at(10, 8)));
    }

    #[tokio::test]
    async fn test_checkout_without_checkin_rejected() {
        let ledger = ledger(0);
        let result = ledger
            .append_guarded(attempt(1, AttendanceType::Checkout, at(10, 17)))
            .await;
        assert!(matches!(result, Err(LedgerError::NoOpenSession)));
    }

    #[tokio::test]
    async fn test_open_session_does_not_carry_over_midnight() {
        let ledger = ledger(0);
        ledger
            .append_guarded(attempt(1, AttendanceType::Checkin, at(10, 22)))
            .await
            .unwrap();

        // Next day: no open session, so checkout is rejected and checkin allowed
        let result = ledger
            .append_guarded(attempt(1, AttendanceType::Checkout, at(11, 1)))
            .await;
        assert!(matches!(result, Err(LedgerError::NoOpenSession)));
        ledger
            .append_guarded(attempt(1, AttendanceType::Checkin, at(11, 8)))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_open_session_for() {
        let ledger = ledger(0);
        let date = ledger.local_date(at(10, 8));
        assert!(ledger.open_session_for(1, date).await.unwrap().is_none());

        let checkin = ledger
            .append_guarded(attempt(1, AttendanceType::Checkin, at(10, 8)))
            .await
            .unwrap();
        let open = ledger.open_session_for(1, date).await.unwrap().unwrap();
        assert_eq!(open.id, checkin.id);

        ledger
            .append_guarded(attempt(1, AttendanceType::Checkout, at(10, 17)))
            .await
            .unwrap();
        assert!(ledger.open_session_for(1, date).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_users_are_independent() {
        let ledger = ledger(0);
        ledger
            .append_guarded(attempt(1, AttendanceType::Checkin, at(10, 8)))
            .await
            .unwrap();
        ledger
            .append_guarded(attempt(2, AttendanceType::Checkin, at(10, 8)))
            .await
            .unwrap();

        let date = ledger.local_date(at(10, 8));
        assert_eq!(ledger.records_on(date, None).await.unwrap().len(), 2);
        assert_eq!(ledger.records_on(date, Some(2)).await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_idle_locks_are_pruned() {
        let ledger = ledger(0);
        for user in 0..10 {
            ledger
                .append_guarded(attempt(user, AttendanceType::Checkin, at(10, 8)))
                .await
                .unwrap();
        }
        let _ = ledger.lock_user(99).await;
        assert!(ledger.user_locks.lock().unwrap().len() <= 1);
    }
}
