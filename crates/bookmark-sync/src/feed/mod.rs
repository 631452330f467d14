//! Change feed boundary: decoding untyped notifications into [`FeedEvent`]s
//! and scoping them to the active owner.

pub mod decode;
pub mod event;
pub mod listener;

pub use decode::{decode_change, decode_record};
pub use event::FeedEvent;
pub use listener::{FeedListener, FeedOutcome};
