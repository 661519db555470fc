//! JSON-file catalog of venues, participants and photo records.
//!
//! The whole catalog lives in memory and is rewritten to disk after every
//! mutation. A mutation only becomes visible once the write succeeded.

use crate::error::{PipelineError, Result};
use crate::persistence::{
    NewParticipant, NewVenue, Participant, ParticipantEntry, PhotoMetadata, PhotoPage, PhotoQuery,
    PhotoRecord, PhotoRepository, Venue,
};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CatalogData {
    venues: Vec<Venue>,
    #[serde(default)]
    participants: Vec<Participant>,
    photos: Vec<PhotoRecord>,
}

#[derive(Debug)]
pub struct JsonCatalog {
    path: Option<PathBuf>,
    data: Mutex<CatalogData>,
}

impl JsonCatalog {
    pub fn in_memory() -> Self {
        Self {
            path: None,
            data: Mutex::new(CatalogData::default()),
        }
    }

    /// Loads the catalog at `path`; a missing file starts an empty catalog.
    pub fn open(path: &Path) -> Result<Self> {
        let data = if path.exists() {
            let content = fs::read_to_string(path)?;
            serde_json::from_str(&content)?
        } else {
            CatalogData::default()
        };

        Ok(Self {
            path: Some(path.to_path_buf()),
            data: Mutex::new(data),
        })
    }

    /// In-memory copy of the current state; writes never reach the file.
    pub fn detached(&self) -> Self {
        Self {
            path: None,
            data: Mutex::new(self.lock().clone()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> MutexGuard<'_, CatalogData> {
        self.data.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn persist(&self, data: &CatalogData) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let write = || -> Result<()> {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, serde_json::to_string_pretty(data)?)?;
            Ok(())
        };

        write().map_err(|e| {
            PipelineError::Persistence(format!("Could not write {}: {}", path.display(), e))
        })?;
        debug!("Catalog written to {}", path.display());
        Ok(())
    }

    fn mutate<T>(&self, apply: impl FnOnce(&mut CatalogData) -> Result<T>) -> Result<T> {
        let mut guard = self.lock();
        let mut next = guard.clone();
        let value = apply(&mut next)?;
        self.persist(&next)?;
        *guard = next;
        Ok(value)
    }
}

#[async_trait]
impl PhotoRepository for JsonCatalog {
    async fn list_venues(&self) -> Result<Vec<Venue>> {
        let mut venues = self.lock().venues.clone();
        venues.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(venues)
    }

    async fn create_venue(&self, venue: NewVenue) -> Result<Venue> {
        self.mutate(|data| {
            if let Some(value) = venue.value {
                if data.venues.iter().any(|v| v.value == Some(value)) {
                    return Err(PipelineError::Persistence(format!(
                        "Another venue already uses value {}",
                        value
                    )));
                }
            }

            let now = Utc::now();
            let created = Venue {
                id: Uuid::new_v4(),
                name: venue.name,
                address: venue.address,
                value: venue.value,
                created_at: now,
                updated_at: now,
            };
            data.venues.push(created.clone());
            Ok(created)
        })
    }

    async fn create_photo(
        &self,
        image_url: &str,
        venue_id: Uuid,
        metadata: PhotoMetadata,
    ) -> Result<PhotoRecord> {
        self.mutate(|data| {
            if !data.venues.iter().any(|v| v.id == venue_id) {
                return Err(PipelineError::VenueNotFound(venue_id.to_string()));
            }

            let now = Utc::now();
            let record = PhotoRecord {
                id: Uuid::new_v4(),
                image_url: image_url.to_string(),
                venue_id,
                approved: false,
                metadata,
                created_at: now,
                updated_at: now,
            };
            data.photos.push(record.clone());
            Ok(record)
        })
    }

    async fn get_photo(&self, id: Uuid) -> Result<Option<PhotoRecord>> {
        Ok(self.lock().photos.iter().find(|p| p.id == id).cloned())
    }

    async fn list_photos(&self, query: &PhotoQuery) -> Result<PhotoPage> {
        let data = self.lock();
        let mut matching: Vec<&PhotoRecord> = data
            .photos
            .iter()
            .filter(|p| !query.approved_only || p.approved)
            .filter(|p| query.venue_id.map_or(true, |id| p.venue_id == id))
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let limit = query.limit.max(1);
        let start = query.page.saturating_mul(limit);
        let photos: Vec<PhotoRecord> = matching
            .iter()
            .skip(start)
            .take(limit)
            .map(|p| (*p).clone())
            .collect();
        let has_more = matching.len() > start.saturating_add(limit);

        Ok(PhotoPage {
            photos,
            has_more,
            next_page: has_more.then_some(query.page + 1),
        })
    }

    async fn set_approval(&self, id: Uuid, approved: bool) -> Result<PhotoRecord> {
        self.mutate(|data| {
            let photo = data
                .photos
                .iter_mut()
                .find(|p| p.id == id)
                .ok_or_else(|| PipelineError::PhotoNotFound(id.to_string()))?;
            photo.approved = approved;
            photo.updated_at = Utc::now();
            Ok(photo.clone())
        })
    }

    async fn delete_photo(&self, id: Uuid) -> Result<bool> {
        self.mutate(|data| {
            let before = data.photos.len();
            data.photos.retain(|p| p.id != id);
            Ok(data.photos.len() != before)
        })
    }

    async fn list_participants(&self, search: Option<&str>) -> Result<Vec<ParticipantEntry>> {
        let data = self.lock();
        let search = search.map(str::trim).filter(|s| !s.is_empty());

        let mut entries: Vec<ParticipantEntry> = data
            .participants
            .iter()
            .map(|p| ParticipantEntry {
                participant: p.clone(),
                venue_name: data
                    .venues
                    .iter()
                    .find(|v| v.id == p.venue_id)
                    .map(|v| v.name.clone()),
            })
            .filter(|entry| search.map_or(true, |s| entry.matches(s)))
            .collect();
        entries.sort_by(|a, b| {
            a.participant
                .name
                .to_lowercase()
                .cmp(&b.participant.name.to_lowercase())
        });
        Ok(entries)
    }

    async fn create_participant(&self, participant: NewParticipant) -> Result<Participant> {
        self.mutate(|data| {
            if !data.venues.iter().any(|v| v.id == participant.venue_id) {
                return Err(PipelineError::VenueNotFound(participant.venue_id.to_string()));
            }

            let now = Utc::now();
            let created = Participant {
                id: Uuid::new_v4(),
                name: participant.name,
                instagram: participant.instagram.filter(|handle| !handle.trim().is_empty()),
                venue_id: participant.venue_id,
                created_at: now,
                updated_at: now,
            };
            data.participants.push(created.clone());
            Ok(created)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::Dimensions;
    use tempfile::TempDir;

    fn metadata(name: &str) -> PhotoMetadata {
        PhotoMetadata {
            thumbnail_url: None,
            original_file_name: name.to_string(),
            file_size: 1024,
            dimensions: Dimensions::new(640, 480),
            size_reduction: 12.5,
            uploaded_at: Utc::now(),
        }
    }

    fn new_venue(name: &str, value: Option<i64>) -> NewVenue {
        NewVenue {
            name: name.to_string(),
            address: "1 Main St".to_string(),
            value,
        }
    }

    #[tokio::test]
    async fn test_venues_sorted_by_name() {
        let catalog = JsonCatalog::in_memory();
        catalog.create_venue(new_venue("zebra cafe", None)).await.unwrap();
        catalog.create_venue(new_venue("Acorn", Some(1))).await.unwrap();

        let names: Vec<String> = catalog
            .list_venues()
            .await
            .unwrap()
            .into_iter()
            .map(|v| v.name)
            .collect();
        assert_eq!(names, vec!["Acorn", "zebra cafe"]);
    }

    #[tokio::test]
    async fn test_duplicate_venue_value_rejected() {
        let catalog = JsonCatalog::in_memory();
        catalog.create_venue(new_venue("A", Some(1))).await.unwrap();
        let result = catalog.create_venue(new_venue("B", Some(1))).await;
        assert!(matches!(result, Err(PipelineError::Persistence(_))));
        assert_eq!(catalog.list_venues().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_photo_requires_known_venue() {
        let catalog = JsonCatalog::in_memory();
        let result = catalog
            .create_photo("memory://b/k", Uuid::new_v4(), metadata("a.jpg"))
            .await;
        assert!(matches!(result, Err(PipelineError::VenueNotFound(_))));
    }

    #[tokio::test]
    async fn test_new_photos_await_moderation() {
        let catalog = JsonCatalog::in_memory();
        let venue = catalog.create_venue(new_venue("A", None)).await.unwrap();
        let photo = catalog
            .create_photo("memory://b/k", venue.id, metadata("a.jpg"))
            .await
            .unwrap();
        assert!(!photo.approved);

        let public = catalog.list_photos(&PhotoQuery::default()).await.unwrap();
        assert!(public.photos.is_empty());

        let approved = catalog.set_approval(photo.id, true).await.unwrap();
        assert!(approved.approved);
        let public = catalog.list_photos(&PhotoQuery::default()).await.unwrap();
        assert_eq!(public.photos.len(), 1);
    }

    #[tokio::test]
    async fn test_list_photos_paginates_newest_first() {
        let catalog = JsonCatalog::in_memory();
        let venue = catalog.create_venue(new_venue("A", None)).await.unwrap();
        for i in 0..5 {
            catalog
                .create_photo(&format!("memory://b/{}", i), venue.id, metadata("p.jpg"))
                .await
                .unwrap();
        }

        let query = PhotoQuery {
            approved_only: false,
            limit: 2,
            ..Default::default()
        };
        let first = catalog.list_photos(&query).await.unwrap();
        assert_eq!(first.photos.len(), 2);
        assert!(first.has_more);
        assert_eq!(first.next_page, Some(1));
        assert!(first.photos[0].created_at >= first.photos[1].created_at);

        let last = catalog
            .list_photos(&PhotoQuery { page: 2, ..query })
            .await
            .unwrap();
        assert_eq!(last.photos.len(), 1);
        assert!(!last.has_more);
        assert_eq!(last.next_page, None);
    }

    #[tokio::test]
    async fn test_set_approval_unknown_photo() {
        let catalog = JsonCatalog::in_memory();
        let result = catalog.set_approval(Uuid::new_v4(), true).await;
        assert!(matches!(result, Err(PipelineError::PhotoNotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_photo() {
        let catalog = JsonCatalog::in_memory();
        let venue = catalog.create_venue(new_venue("A", None)).await.unwrap();
        let photo = catalog
            .create_photo("memory://b/k", venue.id, metadata("a.jpg"))
            .await
            .unwrap();

        assert!(catalog.delete_photo(photo.id).await.unwrap());
        assert!(!catalog.delete_photo(photo.id).await.unwrap());
        assert!(catalog.get_photo(photo.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data").join("catalog.json");

        let catalog = JsonCatalog::open(&path).unwrap();
        let venue = catalog.create_venue(new_venue("A", Some(9))).await.unwrap();
        catalog
            .create_photo("memory://b/k", venue.id, metadata("a.jpg"))
            .await
            .unwrap();

        let reopened = JsonCatalog::open(&path).unwrap();
        assert_eq!(reopened.list_venues().await.unwrap(), vec![venue]);
        let query = PhotoQuery {
            approved_only: false,
            ..Default::default()
        };
        assert_eq!(reopened.list_photos(&query).await.unwrap().photos.len(), 1);
    }

    #[tokio::test]
    async fn test_detached_copy_does_not_write() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("catalog.json");
        let catalog = JsonCatalog::open(&path).unwrap();
        let venue = catalog.create_venue(new_venue("A", None)).await.unwrap();

        let dry = catalog.detached();
        assert!(dry.path().is_none());
        dry.create_photo("memory://b/k", venue.id, metadata("a.jpg"))
            .await
            .unwrap();

        let reopened = JsonCatalog::open(&path).unwrap();
        let query = PhotoQuery {
            approved_only: false,
            ..Default::default()
        };
        assert!(reopened.list_photos(&query).await.unwrap().photos.is_empty());
    }

    fn new_participant(name: &str, instagram: Option<&str>, venue_id: Uuid) -> NewParticipant {
        NewParticipant {
            name: name.to_string(),
            instagram: instagram.map(str::to_string),
            venue_id,
        }
    }

    #[tokio::test]
    async fn test_participants_sorted_and_searchable() {
        let catalog = JsonCatalog::in_memory();
        let bean = catalog.create_venue(new_venue("Bean There", Some(1))).await.unwrap();
        let brew = catalog.create_venue(new_venue("Brew Ha", Some(2))).await.unwrap();
        catalog
            .create_participant(new_participant("yuna", Some("@yuna.lens"), bean.id))
            .await
            .unwrap();
        catalog
            .create_participant(new_participant("Alex", None, brew.id))
            .await
            .unwrap();
        catalog
            .create_participant(new_participant("Minho", Some(""), bean.id))
            .await
            .unwrap();

        let all = catalog.list_participants(None).await.unwrap();
        let names: Vec<&str> = all.iter().map(|e| e.participant.name.as_str()).collect();
        assert_eq!(names, vec!["Alex", "Minho", "yuna"]);
        assert_eq!(all[0].venue_name.as_deref(), Some("Brew Ha"));
        assert_eq!(all[1].participant.instagram, None);

        let by_venue = catalog.list_participants(Some("bean")).await.unwrap();
        assert_eq!(by_venue.len(), 2);
        let by_handle = catalog.list_participants(Some("LENS")).await.unwrap();
        assert_eq!(by_handle[0].participant.name, "yuna");
        assert_eq!(catalog.list_participants(Some("  ")).await.unwrap().len(), 3);
        assert!(catalog.list_participants(Some("nobody")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_participant_requires_known_venue() {
        let catalog = JsonCatalog::in_memory();
        let result = catalog
            .create_participant(new_participant("Alex", None, Uuid::new_v4()))
            .await;
        assert!(matches!(result, Err(PipelineError::VenueNotFound(_))));
        assert!(catalog.list_participants(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_catalog_without_participants_still_loads() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("catalog.json");
        fs::write(&path, r#"{ "venues": [], "photos": [] }"#).unwrap();

        let catalog = JsonCatalog::open(&path).unwrap();
        assert!(catalog.list_participants(None).await.unwrap().is_empty());
    }

    #[test]
    fn test_open_rejects_malformed_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("catalog.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            JsonCatalog::open(&path),
            Err(PipelineError::Serialization(_))
        ));
    }
}
