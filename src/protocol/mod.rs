//! Wire types shared by the upload client and the live commentary channel.
//!
//! * [`JobId`] / [`UploadReceipt`]: what `POST /upload` hands back.
//! * [`JobAnnouncement`]: the single outbound channel frame.
//! * [`ChannelMessage`]: inbound channel frames, classified by shape.
//! * [`CommentaryEvent`] and [`format_timestamp`]: one line of commentary and
//!   its `[m:ss]` display prefix.

pub mod message;
pub mod timestamp;

pub use message::{
    ChannelMessage, CommentaryEvent, JobAnnouncement, JobId, ProtocolError, UploadReceipt,
};
pub use timestamp::format_timestamp;
