mod format;

pub use format::{format_timestamp, from_unix, to_unix};
