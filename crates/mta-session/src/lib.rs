//! Sans-I/O protocol state machines (C4): pure logic for both sides of an
//! MTA transfer, independent of any transport or async runtime.

pub mod receiver;
pub mod sender;

pub use receiver::{ReceiverEvent, ReceiverProtocol, ReceiverState};
pub use sender::{FileSpec, SenderEvent, SenderProtocol, SenderState};
