pub mod messaging;
pub mod transcoder;
