pub mod dummy;
pub mod parse;
pub mod socket;

pub use dummy::start_dummy_feed;
pub use socket::{start_socket_feeds, FeedEndpoints};
