pub mod model;
pub mod store;

pub use model::{OwnerId, Quality, Session};
pub use store::SessionStore;
