// Export components
pub mod ai_schedule;
pub mod model_gateway;
pub mod schedule_store;

pub use ai_schedule::ScheduleAssistant;
pub use model_gateway::{ModelGateway, RigGateway};
pub use schedule_store::{InMemoryScheduleStore, RedisScheduleStore, ScheduleStore};
