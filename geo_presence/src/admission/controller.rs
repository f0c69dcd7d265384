//! The admission pipeline.

use super::{
    errors::{AdmissionError, AdmissionResult},
    models::{Admission, AdmissionPolicy, AttemptPayload, ParsedAttempt, SecondFactor, ValidAttempt},
};
use crate::{
    auth::UserId,
    face::FaceManager,
    geofence::{self, GeofenceCheck},
    ledger::{AttendanceLedger, AttendanceType, Clock, FaceEvidence, NewAttendanceRecord},
    network::{self, FactorVerdict},
    office::{Office, OfficeDirectory},
};
use std::sync::Arc;

/// Admission controller
///
/// Runs an attempt through input validation, office lookup, the geofence,
/// the configured second factor and finally the ledger guard. The first
/// failing step decides the rejection and nothing is written.
#[derive(Clone)]
pub struct AdmissionController {
    offices: OfficeDirectory,
    ledger: Arc<AttendanceLedger>,
    face: Option<FaceManager>,
    policy: AdmissionPolicy,
    clock: Arc<dyn Clock>,
}

impl AdmissionController {
    /// Create a new controller
    ///
    /// # Arguments
    ///
    /// * `offices` - Office directory
    /// * `ledger` - Attendance ledger
    /// * `policy` - Second factor selection
    /// * `clock` - Time source for record timestamps
    pub fn new(
        offices: OfficeDirectory,
        ledger: Arc<AttendanceLedger>,
        policy: AdmissionPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            offices,
            ledger,
            face: None,
            policy,
            clock,
        }
    }

    /// Attach the face manager used when the second factor is `face`
    pub fn with_face(mut self, face: FaceManager) -> Self {
        self.face = Some(face);
        self
    }

    pub fn policy(&self) -> &AdmissionPolicy {
        &self.policy
    }

    pub fn ledger(&self) -> &AttendanceLedger {
        &self.ledger
    }

    pub fn offices(&self) -> &OfficeDirectory {
        &self.offices
    }

    pub fn face(&self) -> Option<&FaceManager> {
        self.face.as_ref()
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Admit or reject an attendance attempt
    ///
    /// # Arguments
    ///
    /// * `user_id` - Who is making the attempt
    /// * `kind` - Check-in or check-out
    /// * `payload` - Raw attempt body
    /// * `client_address` - Socket peer or forwarded-for value
    ///
    /// # Errors
    ///
    /// Any [`AdmissionError`]; no record is written on error.
    pub async fn admit(
        &self,
        user_id: UserId,
        kind: AttendanceType,
        payload: AttemptPayload,
        client_address: &str,
    ) -> AdmissionResult<Admission> {
        let result = self.run(user_id, kind, payload, client_address).await;

        match &result {
            Ok(admission) => log::info!(
                "Admission user_id={} office_id={} kind={} outcome=admitted record_id={} distance_m={:.2}",
                user_id,
                admission.record.office_id,
                kind,
                admission.record.id,
                admission.distance_meters
            ),
            Err(e) => log::info!(
                "Admission user_id={} kind={} outcome={} reason=\"{}\"",
                user_id,
                kind,
                e.kind(),
                e
            ),
        }

        result
    }

    async fn run(
        &self,
        user_id: UserId,
        kind: AttendanceType,
        payload: AttemptPayload,
        client_address: &str,
    ) -> AdmissionResult<Admission> {
        // 1. Shape and office reference
        let attempt = ParsedAttempt::parse(payload, self.policy.second_factor)
            .into_result()
            .map_err(AdmissionError::InvalidInput)?;
        let office = self.offices.get(attempt.office_id).await?;

        // 2. Geofence
        let check = geofence::evaluate(
            attempt.latitude,
            attempt.longitude,
            office.latitude,
            office.longitude,
            office.radius_meters,
        );
        if !check.verdict.is_pass() {
            return Err(AdmissionError::OutOfRange {
                distance_m: check.distance_m,
                radius_m: office.radius_meters,
            });
        }

        // 3. Second factor
        let client_address = network::normalize_client_address(client_address);
        let (network_verdict, face) = match self.policy.second_factor {
            SecondFactor::Network => (
                self.check_network(user_id, &office, &client_address)?,
                FaceEvidence::not_evaluated(),
            ),
            SecondFactor::Face => (
                FactorVerdict::NotEvaluated,
                self.check_face(user_id, &attempt, &client_address).await?,
            ),
        };

        // 4 + 5. Guarded append
        let record = self
            .ledger
            .append_guarded(new_record(
                user_id,
                kind,
                &attempt,
                &check,
                network_verdict,
                face,
                client_address,
                self.clock.now(),
            ))
            .await?;

        Ok(Admission {
            record,
            distance_meters: check.distance_m,
            office_radius_meters: office.radius_meters,
        })
    }

    fn check_network(
        &self,
        user_id: UserId,
        office: &Office,
        client_address: &str,
    ) -> AdmissionResult<FactorVerdict> {
        if network::is_allowed(client_address, &office.allowed_ranges) {
            return Ok(FactorVerdict::Pass);
        }

        log::warn!(
            "SECURITY: network denied user_id={} office_id={} client_address={}",
            user_id,
            office.id,
            client_address
        );
        Err(AdmissionError::NetworkDenied {
            client_address: client_address.to_string(),
        })
    }

    async fn check_face(
        &self,
        user_id: UserId,
        attempt: &ValidAttempt,
        client_address: &str,
    ) -> AdmissionResult<FaceEvidence> {
        let face = self
            .face
            .as_ref()
            .ok_or_else(|| AdmissionError::Internal("face verification not configured".into()))?;
        let image = attempt
            .face_image
            .as_ref()
            .ok_or_else(|| AdmissionError::InvalidInput("faceImageBase64 is required".into()))?;

        let outcome = face.verify(user_id, image).await?;

        if !outcome.is_match {
            log::warn!(
                "SECURITY: face mismatch user_id={} best_distance={:.4} threshold={} client_address={}",
                user_id,
                outcome.best_distance,
                outcome.threshold,
                client_address
            );
            return Err(AdmissionError::FaceMismatch {
                best_distance: outcome.best_distance,
                threshold: outcome.threshold,
                model_id: outcome.model_id,
            });
        }

        Ok(FaceEvidence {
            verdict: FactorVerdict::Pass,
            distance: Some(outcome.best_distance),
            model_id: Some(outcome.model_id),
        })
    }
}

#[allow(clippy::too_many_arguments)]
fn new_record(
    user_id: UserId,
    kind: AttendanceType,
    attempt: &ValidAttempt,
    check: &GeofenceCheck,
    network: FactorVerdict,
    face: FaceEvidence,
    client_address: String,
    recorded_at: chrono::DateTime<chrono::Utc>,
) -> NewAttendanceRecord {
    NewAttendanceRecord {
        user_id,
        office_id: attempt.office_id,
        kind,
        recorded_at,
        latitude: attempt.latitude,
        longitude: attempt.longitude,
        accuracy_meters: attempt.accuracy_meters,
        distance_meters: check.distance_m,
        geofence: check.verdict,
        network,
        face,
        client_address,
        note: attempt.note.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db::MemoryStore, ledger::FixedClock};
    use chrono::{FixedOffset, TimeZone, Utc};

    fn controller() -> AdmissionController {
        let store = Arc::new(MemoryStore::new());
        store.insert_office(Office {
            id: 1,
            name: "HQ".to_string(),
            latitude: -5.170628,
            longitude: 119.415447,
            radius_meters: 20.0,
            allowed_ranges: vec!["192.168.1.0/24".to_string()],
        });
        let ledger = AttendanceLedger::new(store.clone(), FixedOffset::east_opt(0).unwrap());
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 5, 10, 8, 0, 0).unwrap());
        AdmissionController::new(
            OfficeDirectory::new(store),
            Arc::new(ledger),
            AdmissionPolicy::default(),
            Arc::new(clock),
        )
    }

    fn at_office() -> AttemptPayload {
        AttemptPayload {
            latitude: Some(-5.170628),
            longitude: Some(119.415447),
            office_id: Some(1),
            ..AttemptPayload::default()
        }
    }

    #[tokio::test]
    async fn test_forwarding_chain_uses_origin_address() {
        let admission = controller()
            .admit(7, AttendanceType::Checkin, at_office(), "192.168.1.5, 10.0.0.1")
            .await
            .unwrap();
        assert_eq!(admission.record.client_address, "192.168.1.5");
        assert_eq!(admission.network(), FactorVerdict::Pass);
        assert_eq!(admission.face().verdict, FactorVerdict::NotEvaluated);
    }

    #[tokio::test]
    async fn test_unknown_office() {
        let payload = AttemptPayload {
            office_id: Some(99),
            ..at_office()
        };
        let err = controller()
            .admit(7, AttendanceType::Checkin, payload, "192.168.1.5")
            .await
            .unwrap_err();
        assert!(matches!(err, AdmissionError::OfficeNotFound(99)));
    }

    #[tokio::test]
    async fn test_face_mode_without_manager_is_internal() {
        let mut controller = controller();
        controller.policy.second_factor = SecondFactor::Face;
        let payload = AttemptPayload {
            face_image_base64: Some("aGVsbG8=".to_string()),
            ..at_office()
        };
        let err = controller
            .admit(7, AttendanceType::Checkin, payload, "192.168.1.5")
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 500);
    }
}
