//! Office directory backed by an injected repository.

use super::{
    errors::{OfficeError, OfficeResult},
    models::{Office, OfficeId, OfficeUpdate},
};
use crate::db::OfficeRepository;
use std::sync::Arc;

/// Office directory
#[derive(Clone)]
pub struct OfficeDirectory {
    repo: Arc<dyn OfficeRepository>,
}

impl OfficeDirectory {
    /// Create a new office directory
    pub fn new(repo: Arc<dyn OfficeRepository>) -> Self {
        Self { repo }
    }

    /// Look up an office by ID
    ///
    /// # Errors
    ///
    /// * `OfficeError::NotFound` - No office with that ID
    pub async fn get(&self, office_id: OfficeId) -> OfficeResult<Office> {
        self.repo
            .find_office(office_id)
            .await?
            .ok_or(OfficeError::NotFound(office_id))
    }

    /// List all offices ordered by ID
    pub async fn list(&self) -> OfficeResult<Vec<Office>> {
        Ok(self.repo.list_offices().await?)
    }

    /// Change an office's radius and/or allow-list at runtime
    ///
    /// # Errors
    ///
    /// * `OfficeError::EmptyUpdate` - No field set
    /// * `OfficeError::InvalidRadius` - Radius not finite or not positive
    /// * `OfficeError::NotFound` - No office with that ID
    pub async fn update(&self, office_id: OfficeId, update: OfficeUpdate) -> OfficeResult<Office> {
        if update.is_empty() {
            return Err(OfficeError::EmptyUpdate);
        }

        if let Some(radius) = update.radius_meters {
            if !(radius.is_finite() && radius > 0.0) {
                return Err(OfficeError::InvalidRadius(radius));
            }
        }

        let office = self
            .repo
            .update_office(office_id, &update)
            .await?
            .ok_or(OfficeError::NotFound(office_id))?;

        log::info!(
            "Office {} updated: radius={}m ranges={:?}",
            office.id,
            office.radius_meters,
            office.allowed_ranges
        );

        Ok(office)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    fn directory() -> OfficeDirectory {
        let store = MemoryStore::new();
        store.insert_office(Office {
            id: 1,
            name: "HQ".to_string(),
            latitude: -5.170628,
            longitude: 119.415447,
            radius_meters: 20.0,
            allowed_ranges: vec!["192.168.1.0/24".to_string()],
        });
        OfficeDirectory::new(Arc::new(store))
    }

    #[tokio::test]
    async fn test_get_missing_office() {
        let dir = directory();
        assert!(matches!(dir.get(42).await, Err(OfficeError::NotFound(42))));
    }

    #[tokio::test]
    async fn test_update_radius() {
        let dir = directory();
        let office = dir
            .update(
                1,
                OfficeUpdate {
                    radius_meters: Some(75.5),
                    allowed_ranges: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(office.radius_meters, 75.5);
        assert_eq!(office.allowed_ranges, vec!["192.168.1.0/24".to_string()]);
        assert_eq!(dir.get(1).await.unwrap().radius_meters, 75.5);
    }

    #[tokio::test]
    async fn test_update_rejects_non_positive_radius() {
        let dir = directory();
        for radius in [0.0, -3.0, f64::NAN, f64::INFINITY] {
            let result = dir
                .update(
                    1,
                    OfficeUpdate {
                        radius_meters: Some(radius),
                        allowed_ranges: None,
                    },
                )
                .await;
            assert!(matches!(result, Err(OfficeError::InvalidRadius(_))));
        }
        assert_eq!(dir.get(1).await.unwrap().radius_meters, 20.0);
    }

    #[tokio::test]
    async fn test_update_requires_a_field() {
        let dir = directory();
        assert!(matches!(
            dir.update(1, OfficeUpdate::default()).await,
            Err(OfficeError::EmptyUpdate)
        ));
    }

    #[tokio::test]
    async fn test_update_allow_list() {
        let dir = directory();
        let office = dir
            .update(
                1,
                OfficeUpdate {
                    radius_meters: None,
                    allowed_ranges: Some(vec![]),
                },
            )
            .await
            .unwrap();
        assert!(office.allowed_ranges.is_empty());
    }
}
