//! Core HTTP protocol types shared by the codec and the connection driver.
//!
//! - [`Message`], [`PayloadItem`], [`PayloadSize`]: the framing vocabulary
//!   exchanged with the codecs
//! - [`RequestHeader`]: a parsed request line plus headers
//! - [`ResponseHead`]: a response before its body is attached
//! - [`HttpError`], [`ParseError`], [`SendError`]: read and write side errors

mod message;
pub use message::Message;
pub use message::PayloadItem;
pub use message::PayloadSize;

mod request;
pub use request::RequestHeader;

mod response;
pub use response::ResponseHead;

mod error;
pub use error::HttpError;
pub use error::ParseError;
pub use error::SendError;
