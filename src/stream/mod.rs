//! Splitting streams into frames on the sending side, and accounting for them on the receiving
//!  side.

pub mod multiplexer;
pub mod reassembly;

pub use multiplexer::{Multiplexer, SendStream};
pub use reassembly::{Reassembly, ReceiveStream};
