pub mod janitor;
pub mod progress;
pub mod scheduler;
