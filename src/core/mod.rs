pub mod cancel;
pub mod client;
pub mod schema;
pub mod time;
