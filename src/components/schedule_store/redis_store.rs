use super::models::{EventRange, ScheduleEvent, ScheduleFields};
use super::{ScheduleStore, NOT_FOUND_MESSAGE};
use crate::error::{not_found_error, store_error, AssistantResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::{AsyncCommands, Client as RedisClient};
use tracing::info;

/// Redis keys
mod keys {
    /// Event JSON, one key per event
    pub const EVENT_PREFIX: &str = "schedule:event:";
    /// Sorted set of live event ids per owner, scored by start time in millis
    pub const OWNER_INDEX_PREFIX: &str = "schedule:owner:";

    pub fn event(id: &str) -> String {
        format!("{}{}", EVENT_PREFIX, id)
    }

    pub fn owner_index(owner_id: &str) -> String {
        format!("{}{}", OWNER_INDEX_PREFIX, owner_id)
    }
}

/// Redis-backed schedule store
pub struct RedisScheduleStore {
    client: RedisClient,
}

impl RedisScheduleStore {
    /// Create a new store for the given Redis URL
    pub fn new(redis_url: &str) -> AssistantResult<Self> {
        info!("Connecting to Redis at {}", redis_url);
        let client = RedisClient::open(redis_url)
            .map_err(|e| store_error(&format!("Failed to create Redis client: {}", e)))?;
        Ok(Self { client })
    }

    /// Check that the server answers
    pub async fn ping(&self) -> AssistantResult<()> {
        let mut conn = self.get_connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    async fn get_connection(&self) -> AssistantResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| store_error(&format!("Failed to connect to Redis: {}", e)))
    }

    async fn load(
        conn: &mut redis::aio::MultiplexedConnection,
        id: &str,
    ) -> AssistantResult<Option<ScheduleEvent>> {
        let data: Option<String> = conn.get(keys::event(id)).await?;
        match data {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn save(
        conn: &mut redis::aio::MultiplexedConnection,
        event: &ScheduleEvent,
    ) -> AssistantResult<()> {
        let json = serde_json::to_string(event)?;
        let _: () = conn.set(keys::event(&event.id), json).await?;
        Ok(())
    }

    async fn index(
        conn: &mut redis::aio::MultiplexedConnection,
        event: &ScheduleEvent,
    ) -> AssistantResult<()> {
        let _: () = conn
            .zadd(
                keys::owner_index(&event.owner_id),
                &event.id,
                score(&event.start_time),
            )
            .await?;
        Ok(())
    }

    async fn load_owned(
        conn: &mut redis::aio::MultiplexedConnection,
        owner_id: &str,
        id: &str,
    ) -> AssistantResult<ScheduleEvent> {
        Self::load(conn, id)
            .await?
            .filter(|event| event.owner_id == owner_id && !event.is_deleted())
            .ok_or_else(|| not_found_error(NOT_FOUND_MESSAGE))
    }

    async fn load_many(
        conn: &mut redis::aio::MultiplexedConnection,
        ids: Vec<String>,
    ) -> AssistantResult<Vec<ScheduleEvent>> {
        let mut events = Vec::with_capacity(ids.len());
        for id in ids {
            // Index entries can briefly outlive their event JSON
            if let Some(event) = Self::load(conn, &id).await? {
                if !event.is_deleted() {
                    events.push(event);
                }
            }
        }
        Ok(events)
    }
}

/// Index score of a start time: epoch millis, sub-millisecond part dropped
fn score(time: &DateTime<Utc>) -> i64 {
    time.timestamp_millis()
}

/// Smallest score not below `time`
fn ceil_score(time: &DateTime<Utc>) -> i64 {
    let floor = score(time);
    if time.timestamp_subsec_nanos() % 1_000_000 == 0 {
        floor
    } else {
        floor + 1
    }
}

/// ZRANGEBYSCORE bounds covering every indexed id that may start in `range`.
///
/// Scores are truncated, so the bounds can admit an entry from the same
/// millisecond as a bound; results are filtered with `EventRange::contains`.
fn score_bounds(range: &EventRange) -> (String, String) {
    let min = range
        .start
        .map(|start| score(&start).to_string())
        .unwrap_or_else(|| "-inf".to_string());
    // Exclusive upper bound keeps the window half-open
    let max = range
        .end
        .map(|end| format!("({}", ceil_score(&end)))
        .unwrap_or_else(|| "+inf".to_string());
    (min, max)
}

/// Ids fetched per ZRANGEBYSCORE call while collecting upcoming entries
const UPCOMING_PAGE: usize = 16;

#[async_trait]
impl ScheduleStore for RedisScheduleStore {
    async fn create_event(
        &self,
        owner_id: &str,
        fields: ScheduleFields,
    ) -> AssistantResult<ScheduleEvent> {
        let mut conn = self.get_connection().await?;
        let event = ScheduleEvent::new(owner_id, fields, Utc::now());

        Self::save(&mut conn, &event).await?;
        Self::index(&mut conn, &event).await?;

        info!("Created schedule {} for {}", event.id, owner_id);
        Ok(event)
    }

    async fn update_event(
        &self,
        owner_id: &str,
        id: &str,
        fields: ScheduleFields,
    ) -> AssistantResult<ScheduleEvent> {
        let mut conn = self.get_connection().await?;
        let mut event = Self::load_owned(&mut conn, owner_id, id).await?;
        event.apply_fields(fields, Utc::now());

        Self::save(&mut conn, &event).await?;
        // ZADD on an existing member only moves its score
        Self::index(&mut conn, &event).await?;

        info!("Updated schedule {} for {}", event.id, owner_id);
        Ok(event)
    }

    async fn fetch_owned(&self, owner_id: &str, id: &str) -> AssistantResult<ScheduleEvent> {
        let mut conn = self.get_connection().await?;
        Self::load_owned(&mut conn, owner_id, id).await
    }

    async fn soft_delete(&self, event: &ScheduleEvent) -> AssistantResult<()> {
        let mut conn = self.get_connection().await?;
        let mut stored = Self::load_owned(&mut conn, &event.owner_id, &event.id).await?;
        stored.deleted_at = Some(Utc::now());

        Self::save(&mut conn, &stored).await?;
        let _: () = conn
            .zrem(keys::owner_index(&stored.owner_id), &stored.id)
            .await?;

        info!("Soft deleted schedule {}", stored.id);
        Ok(())
    }

    async fn restore(&self, owner_id: &str, id: &str) -> AssistantResult<ScheduleEvent> {
        let mut conn = self.get_connection().await?;
        let mut event = Self::load(&mut conn, id)
            .await?
            .filter(|event| event.owner_id == owner_id && event.is_deleted())
            .ok_or_else(|| not_found_error(NOT_FOUND_MESSAGE))?;
        event.deleted_at = None;
        event.updated_at = Utc::now();

        Self::save(&mut conn, &event).await?;
        Self::index(&mut conn, &event).await?;

        info!("Restored schedule {}", event.id);
        Ok(event)
    }

    async fn find_in_range(
        &self,
        owner_id: &str,
        range: EventRange,
    ) -> AssistantResult<Vec<ScheduleEvent>> {
        let mut conn = self.get_connection().await?;
        let (min, max) = score_bounds(&range);

        let ids: Vec<String> = conn
            .zrangebyscore(keys::owner_index(owner_id), min, max)
            .await?;
        let events = Self::load_many(&mut conn, ids).await?;
        Ok(events
            .into_iter()
            .filter(|event| range.contains(&event.start_time))
            .collect())
    }

    async fn find_upcoming(
        &self,
        owner_id: &str,
        limit: usize,
    ) -> AssistantResult<Vec<ScheduleEvent>> {
        let mut conn = self.get_connection().await?;
        let range = EventRange {
            start: Some(Utc::now()),
            end: None,
        };
        let (min, max) = score_bounds(&range);

        let mut upcoming = Vec::with_capacity(limit);
        let mut offset = 0;
        while upcoming.len() < limit {
            let ids: Vec<String> = conn
                .zrangebyscore_limit(
                    keys::owner_index(owner_id),
                    &min,
                    &max,
                    offset as isize,
                    UPCOMING_PAGE as isize,
                )
                .await?;
            let fetched = ids.len();
            offset += fetched;

            let events = Self::load_many(&mut conn, ids).await?;
            upcoming.extend(
                events
                    .into_iter()
                    .filter(|event| range.contains(&event.start_time)),
            );

            if fetched < UPCOMING_PAGE {
                break;
            }
        }
        upcoming.truncate(limit);
        Ok(upcoming)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::schedule_store::models::{ScheduleCategory, SchedulePriority};
    use crate::error::Error;
    use chrono::{Duration, TimeZone};
    use std::env;

    fn at_nanos(millis: i64, extra_nanos: u32) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(millis).unwrap() + Duration::nanoseconds(extra_nanos as i64)
    }

    fn fields(title: &str, start: DateTime<Utc>) -> ScheduleFields {
        ScheduleFields {
            title: title.to_string(),
            description: None,
            start_time: start,
            end_time: start + Duration::hours(1),
            category: ScheduleCategory::Work,
            priority: SchedulePriority::Medium,
            is_important: false,
            is_urgent: false,
            location: None,
            attendees: None,
            timezone: None,
            metadata: None,
        }
    }

    #[test]
    fn test_key_layout() {
        assert_eq!(keys::event("abc"), "schedule:event:abc");
        assert_eq!(keys::owner_index("alice"), "schedule:owner:alice");
    }

    #[test]
    fn test_scores_are_epoch_millis() {
        assert_eq!(score(&at_nanos(1_700_000_000_123, 0)), 1_700_000_000_123);
        assert_eq!(score(&at_nanos(1_700_000_000_123, 999_999)), 1_700_000_000_123);
        assert_eq!(ceil_score(&at_nanos(1_700_000_000_123, 0)), 1_700_000_000_123);
        assert_eq!(ceil_score(&at_nanos(1_700_000_000_123, 1)), 1_700_000_000_124);
    }

    #[test]
    fn test_score_bounds() {
        assert_eq!(
            score_bounds(&EventRange::default()),
            ("-inf".to_string(), "+inf".to_string())
        );

        let range = EventRange::new(at_nanos(1_000, 0), at_nanos(2_000, 0));
        assert_eq!(score_bounds(&range), ("1000".to_string(), "(2000".to_string()));

        let range = EventRange::new(at_nanos(1_000, 500), at_nanos(2_000, 500));
        assert_eq!(score_bounds(&range), ("1000".to_string(), "(2001".to_string()));
    }

    /// Runs against a live server when REDIS_URL is set
    #[tokio::test]
    async fn test_redis_store_contract() {
        let Ok(url) = env::var("REDIS_URL") else {
            return;
        };
        let store = RedisScheduleStore::new(&url).unwrap();
        if store.ping().await.is_err() {
            return;
        }

        let owner = format!("contract-{}", uuid::Uuid::new_v4());
        let start = Utc::now() + Duration::days(1);
        let event = store.create_event(&owner, fields("Retro", start)).await.unwrap();
        let window = EventRange::new(start - Duration::hours(1), start + Duration::hours(1));

        store.soft_delete(&event).await.unwrap();
        assert!(store.find_in_range(&owner, window).await.unwrap().is_empty());
        assert!(store.find_upcoming(&owner, 5).await.unwrap().is_empty());
        assert!(matches!(
            store.fetch_owned(&owner, &event.id).await,
            Err(Error::NotFound(_))
        ));

        let restored = store.restore(&owner, &event.id).await.unwrap();
        assert!(!restored.is_deleted());
        assert_eq!(store.find_in_range(&owner, window).await.unwrap().len(), 1);
        assert_eq!(store.find_upcoming(&owner, 5).await.unwrap().len(), 1);

        // An entry starting exactly at the end bound is outside the window
        let ending_at_start = EventRange::new(start - Duration::hours(1), start);
        assert!(store
            .find_in_range(&owner, ending_at_start)
            .await
            .unwrap()
            .is_empty());

        let other = format!("{}-other", owner);
        assert!(store.find_in_range(&other, window).await.unwrap().is_empty());

        store.soft_delete(&restored).await.unwrap();
    }
}
