//! Utilities for testing code on top of this crate's transfer protocol. They are used for the
//!  crate's own tests, but they are also exported so applications can exercise endpoints
//!  without real sockets.

pub mod channel_transport;
