pub mod bot;
pub mod job;
pub mod session;
