use crate::error::{PipelineError, Result};
use crate::persistence::{PhotoRepository, Venue};
use crate::storage::{BucketConfig, StorageClient};
use std::time::Duration;
use tracing::{debug, info};

/// Loads the venue list and provisions the bucket, bounded by `timeout`.
///
/// A venue-load failure is returned to the caller; bucket provisioning is
/// best effort and never fails startup on its own.
pub async fn prepare(
    repo: &dyn PhotoRepository,
    storage: &StorageClient,
    bucket: &str,
    bucket_config: &BucketConfig,
    timeout: Duration,
) -> Result<Vec<Venue>> {
    let work = async {
        let (venues, ()) = tokio::join!(
            repo.list_venues(),
            storage.ensure_bucket(bucket, bucket_config)
        );
        venues
    };

    let venues = tokio::time::timeout(timeout, work)
        .await
        .map_err(|_| PipelineError::StartupTimeout(timeout))??;

    debug!("Startup loaded {} venue(s)", venues.len());
    if venues.is_empty() {
        info!("No venues configured yet");
    }
    Ok(venues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::JsonCatalog;
    use crate::memory::MemoryStore;
    use crate::persistence::{
        NewParticipant, NewVenue, Participant, ParticipantEntry, PhotoMetadata, PhotoPage,
        PhotoQuery, PhotoRecord,
    };
    use async_trait::async_trait;
    use std::sync::Arc;
    use uuid::Uuid;

    /// Repository whose venue listing hangs or fails.
    struct StuckRepository {
        delay: Duration,
        fail: bool,
    }

    #[async_trait]
    impl PhotoRepository for StuckRepository {
        async fn list_venues(&self) -> Result<Vec<Venue>> {
            tokio::time::sleep(self.delay).await;
            if self.fail {
                return Err(PipelineError::Persistence("database offline".to_string()));
            }
            Ok(Vec::new())
        }

        async fn create_venue(&self, _venue: NewVenue) -> Result<Venue> {
            unimplemented!()
        }

        async fn create_photo(
            &self,
            _image_url: &str,
            _venue_id: Uuid,
            _metadata: PhotoMetadata,
        ) -> Result<PhotoRecord> {
            unimplemented!()
        }

        async fn get_photo(&self, _id: Uuid) -> Result<Option<PhotoRecord>> {
            unimplemented!()
        }

        async fn list_photos(&self, _query: &PhotoQuery) -> Result<PhotoPage> {
            unimplemented!()
        }

        async fn set_approval(&self, _id: Uuid, _approved: bool) -> Result<PhotoRecord> {
            unimplemented!()
        }

        async fn delete_photo(&self, _id: Uuid) -> Result<bool> {
            unimplemented!()
        }

        async fn list_participants(
            &self,
            _search: Option<&str>,
        ) -> Result<Vec<ParticipantEntry>> {
            unimplemented!()
        }

        async fn create_participant(&self, _participant: NewParticipant) -> Result<Participant> {
            unimplemented!()
        }
    }

    fn storage() -> (StorageClient, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (StorageClient::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_prepare_loads_venues_and_bucket() {
        let catalog = JsonCatalog::in_memory();
        catalog
            .create_venue(NewVenue {
                name: "Corner Cafe".to_string(),
                address: "2 High St".to_string(),
                value: Some(4),
            })
            .await
            .unwrap();
        let (client, store) = storage();

        let venues = prepare(
            &catalog,
            &client,
            "guest-photos",
            &BucketConfig::default(),
            Duration::from_secs(10),
        )
        .await
        .unwrap();

        assert_eq!(venues.len(), 1);
        assert_eq!(store.bucket_names(), vec!["guest-photos".to_string()]);
    }

    #[tokio::test]
    async fn test_prepare_times_out() {
        let repo = StuckRepository {
            delay: Duration::from_secs(5),
            fail: false,
        };
        let (client, _store) = storage();

        let result = prepare(
            &repo,
            &client,
            "guest-photos",
            &BucketConfig::default(),
            Duration::from_millis(50),
        )
        .await;

        assert!(matches!(result, Err(PipelineError::StartupTimeout(_))));
    }

    #[tokio::test]
    async fn test_prepare_surfaces_venue_failure() {
        let repo = StuckRepository {
            delay: Duration::ZERO,
            fail: true,
        };
        let (client, _store) = storage();

        let result = prepare(
            &repo,
            &client,
            "guest-photos",
            &BucketConfig::default(),
            Duration::from_secs(1),
        )
        .await;

        assert!(matches!(result, Err(PipelineError::Persistence(_))));
    }
}
