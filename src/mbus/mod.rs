//! Frame-level M-Bus protocol pieces: the byte-level framer, the serial
//! port abstraction, and the transport driver that sequences a full
//! wakeup/request/collect transaction against one meter.

pub mod frame;
pub mod port;
pub mod transport;

pub use frame::Frame;
pub use port::{Parity, SerialPort, TokioSerialPort};
pub use transport::{DecodedReadout, Transport};
