//! Session boundary: facade over the conversational transport
//!
//! The daemon has no protocol knowledge; it only sees `begin`/`end`
//! outcomes and an asynchronous stream of speech-activity events.

mod facade;
mod sim;
mod transport;

pub use facade::SessionFacade;
pub use sim::SimulatedTransport;
pub use transport::{SessionError, SessionEvent, SessionHandle, SessionTransport};
