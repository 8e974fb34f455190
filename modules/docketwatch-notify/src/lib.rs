pub mod archive;
pub mod dispatch;
pub mod email;
pub mod log;
pub mod sink;
pub mod social;

pub use archive::ArchiveLog;
pub use dispatch::{DispatchReport, Dispatcher};
pub use email::EmailSink;
pub use log::LogSink;
pub use sink::{Delivery, NotifySink, SinkError};
pub use social::SocialPoster;
