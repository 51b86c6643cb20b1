//! S-expression control surface for the watch.

pub mod dispatch;

pub use dispatch::{format_event, handle_message};
