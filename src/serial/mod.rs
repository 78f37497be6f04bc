//! Host link: receive queue, packet machine, and the virtual address
//! space it operates on.
//!
//! The UART driver is collaborator-owned. Its receive ISR pushes raw
//! bytes into a [`queue::ByteQueue`]; the foreground drains the queue
//! into [`proto::Protocol::process_byte`] with a [`bus::DeviceBus`]
//! as the address space and collects reply bytes for transmission.

pub mod bus;
pub mod proto;
pub mod queue;

pub use bus::DeviceBus;
pub use proto::{Protocol, ProtocolHost};
pub use queue::ByteQueue;
