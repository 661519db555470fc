//! Records the pipeline hands off to once an upload has landed.

use crate::constants::DEFAULT_PAGE_SIZE;
use crate::error::Result;
use crate::processing::Dimensions;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Venue {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    /// Numeric code printed on the venue's QR link.
    pub value: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVenue {
    pub name: String,
    pub address: String,
    pub value: Option<i64>,
}

/// Guest who signed up at a venue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: Uuid,
    pub name: String,
    pub instagram: Option<String>,
    pub venue_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewParticipant {
    pub name: String,
    pub instagram: Option<String>,
    pub venue_id: Uuid,
}

/// A participant joined with the name of their venue.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticipantEntry {
    pub participant: Participant,
    pub venue_name: Option<String>,
}

impl ParticipantEntry {
    /// Case-insensitive substring match over name, instagram handle and venue name.
    pub fn matches(&self, search: &str) -> bool {
        let needle = search.to_lowercase();
        let hit = |field: Option<&str>| field.is_some_and(|f| f.to_lowercase().contains(&needle));
        hit(Some(&self.participant.name))
            || hit(self.participant.instagram.as_deref())
            || hit(self.venue_name.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoMetadata {
    pub thumbnail_url: Option<String>,
    pub original_file_name: String,
    pub file_size: u64,
    pub dimensions: Dimensions,
    pub size_reduction: f64,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoRecord {
    pub id: Uuid,
    pub image_url: String,
    pub venue_id: Uuid,
    /// Moderation flag: only approved photos are shown publicly.
    pub approved: bool,
    pub metadata: PhotoMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoQuery {
    pub venue_id: Option<Uuid>,
    pub approved_only: bool,
    pub page: usize,
    pub limit: usize,
}

impl Default for PhotoQuery {
    fn default() -> Self {
        Self {
            venue_id: None,
            approved_only: true,
            page: 0,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhotoPage {
    pub photos: Vec<PhotoRecord>,
    pub has_more: bool,
    pub next_page: Option<usize>,
}

#[async_trait]
pub trait PhotoRepository: Send + Sync {
    async fn list_venues(&self) -> Result<Vec<Venue>>;

    async fn create_venue(&self, venue: NewVenue) -> Result<Venue>;

    /// Creates an unapproved record for an image that is already stored.
    async fn create_photo(
        &self,
        image_url: &str,
        venue_id: Uuid,
        metadata: PhotoMetadata,
    ) -> Result<PhotoRecord>;

    async fn get_photo(&self, id: Uuid) -> Result<Option<PhotoRecord>>;

    /// Newest first.
    async fn list_photos(&self, query: &PhotoQuery) -> Result<PhotoPage>;

    async fn set_approval(&self, id: Uuid, approved: bool) -> Result<PhotoRecord>;

    /// Returns whether a record was removed.
    async fn delete_photo(&self, id: Uuid) -> Result<bool>;

    /// Ordered by name. A blank search returns everyone.
    async fn list_participants(&self, search: Option<&str>) -> Result<Vec<ParticipantEntry>>;

    async fn create_participant(&self, participant: NewParticipant) -> Result<Participant>;
}

/// Finds a venue by id, or by the numeric value used in venue links.
pub fn find_venue<'a>(venues: &'a [Venue], selector: &str) -> Option<&'a Venue> {
    let selector = selector.trim();
    if let Ok(id) = Uuid::parse_str(selector) {
        return venues.iter().find(|venue| venue.id == id);
    }
    let value: i64 = selector.parse().ok()?;
    venues.iter().find(|venue| venue.value == Some(value))
}
