//! The streaming append protocol and its scroll side channel.

pub mod appender;
pub mod scroll;

pub use appender::StreamingAppender;
pub use scroll::ScrollScheduler;
