pub mod orchestration;

pub use orchestration::{LockStatus, PublishArgs, PublishResult};
