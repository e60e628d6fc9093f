pub mod memory;
pub mod metadata;
pub mod models;
pub mod redis_store;

pub use memory::InMemoryScheduleStore;
pub use metadata::{merge_metadata, MetadataMerge};
pub use models::{
    EventRange, ScheduleCategory, ScheduleEvent, ScheduleFields, SchedulePriority,
};
pub use redis_store::RedisScheduleStore;

use crate::error::AssistantResult;
use async_trait::async_trait;

/// Message used for every lookup that misses an owned, live event
pub const NOT_FOUND_MESSAGE: &str = "Schedule does not exist or is not accessible";

/// Storage for schedule entries. Every operation is scoped by owner.
#[async_trait]
pub trait ScheduleStore: Send + Sync + 'static {
    /// Persist a new entry for `owner_id`
    async fn create_event(
        &self,
        owner_id: &str,
        fields: ScheduleFields,
    ) -> AssistantResult<ScheduleEvent>;

    /// Replace the mutable fields of an owned entry. Fails with `NotFound`
    /// when no live entry with that id belongs to `owner_id`.
    async fn update_event(
        &self,
        owner_id: &str,
        id: &str,
        fields: ScheduleFields,
    ) -> AssistantResult<ScheduleEvent>;

    /// Fetch a live entry owned by `owner_id`
    async fn fetch_owned(&self, owner_id: &str, id: &str) -> AssistantResult<ScheduleEvent>;

    /// Tombstone an entry; it disappears from reads but can be restored
    async fn soft_delete(&self, event: &ScheduleEvent) -> AssistantResult<()>;

    /// Bring a tombstoned entry back
    async fn restore(&self, owner_id: &str, id: &str) -> AssistantResult<ScheduleEvent>;

    /// Live entries whose start lies in `range`, ascending by start time
    async fn find_in_range(
        &self,
        owner_id: &str,
        range: EventRange,
    ) -> AssistantResult<Vec<ScheduleEvent>>;

    /// Up to `limit` live entries starting now or later, ascending by start time
    async fn find_upcoming(
        &self,
        owner_id: &str,
        limit: usize,
    ) -> AssistantResult<Vec<ScheduleEvent>>;
}
