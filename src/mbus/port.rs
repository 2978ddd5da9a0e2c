//! Serial port abstraction.
//!
//! `Transport` is generic over `SerialPort` rather than holding a trait
//! object: there is exactly one real implementation (`TokioSerialPort`) and
//! one in-memory test double, so static dispatch is enough and avoids
//! pulling in a trait-object-safe async-trait crate for a single call site.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::timeout;
use tokio_serial::SerialPortBuilderExt;

use crate::error::MBusError;

/// Serial parity setting. The wakeup burst runs at `None`; the SND_NKE/
/// REQ_UD2 request pair runs at `Even`, per the UltraLite PRO's dual-parity
/// transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    None,
    Even,
}

/// The five capabilities the transport driver needs from a serial handle.
pub trait SerialPort: Send {
    fn set_parity(&mut self, parity: Parity) -> std::io::Result<()>;
    fn reset_input(&mut self) -> std::io::Result<()>;
    fn reset_output(&mut self) -> std::io::Result<()>;
    fn write_all(&mut self, buf: &[u8]) -> impl std::future::Future<Output = std::io::Result<()>> + Send;
    fn flush(&mut self) -> impl std::future::Future<Output = std::io::Result<()>> + Send;
    /// Reads up to `max` bytes, waiting at most `per_read_timeout` for each
    /// underlying read; returns whatever bytes were collected, possibly
    /// none, once that timeout elapses.
    fn read_upto(
        &mut self,
        max: usize,
        per_read_timeout: Duration,
    ) -> impl std::future::Future<Output = std::io::Result<Vec<u8>>> + Send;
    /// Closes and reopens the underlying handle at the same path/settings.
    fn reconnect(&mut self) -> impl std::future::Future<Output = std::io::Result<()>> + Send;
}

/// Converts a `tokio_serial::Error` into the `std::io::Error` kind
/// `MBusError::from_io_error` knows how to classify: a missing device node
/// reports itself as `ErrorKind::NoDevice` rather than `io::ErrorKind::NotFound`.
fn tokio_serial_err_to_io(err: tokio_serial::Error) -> std::io::Error {
    match err.kind {
        tokio_serial::ErrorKind::NoDevice => {
            std::io::Error::new(std::io::ErrorKind::NotFound, err.to_string())
        }
        tokio_serial::ErrorKind::Io(kind) => std::io::Error::new(kind, err.to_string()),
        tokio_serial::ErrorKind::InvalidInput | tokio_serial::ErrorKind::Unknown => {
            std::io::Error::new(std::io::ErrorKind::Other, err.to_string())
        }
    }
}

fn open_port(device_path: &str) -> tokio_serial::Result<tokio_serial::SerialStream> {
    tokio_serial::new(device_path, 2400)
        .data_bits(tokio_serial::DataBits::Eight)
        .stop_bits(tokio_serial::StopBits::One)
        .parity(tokio_serial::Parity::None)
        .open_native_async()
}

/// Real serial port, backed by `tokio-serial`.
pub struct TokioSerialPort {
    device_path: String,
    inner: tokio_serial::SerialStream,
}

impl TokioSerialPort {
    pub async fn open(device_path: &str) -> Result<Self, MBusError> {
        let inner = open_port(device_path)
            .map_err(|e| MBusError::from_io_error(device_path, &tokio_serial_err_to_io(e)))?;
        Ok(TokioSerialPort {
            device_path: device_path.to_string(),
            inner,
        })
    }
}

impl SerialPort for TokioSerialPort {
    fn set_parity(&mut self, parity: Parity) -> std::io::Result<()> {
        let parity = match parity {
            Parity::None => tokio_serial::Parity::None,
            Parity::Even => tokio_serial::Parity::Even,
        };
        self.inner.set_parity(parity)
    }

    fn reset_input(&mut self) -> std::io::Result<()> {
        self.inner.clear(tokio_serial::ClearBuffer::Input)
    }

    fn reset_output(&mut self) -> std::io::Result<()> {
        self.inner.clear(tokio_serial::ClearBuffer::Output)
    }

    async fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        self.inner.write_all(buf).await
    }

    async fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush().await
    }

    async fn read_upto(&mut self, max: usize, per_read_timeout: Duration) -> std::io::Result<Vec<u8>> {
        let mut buf = vec![0u8; max];
        match timeout(per_read_timeout, self.inner.read(&mut buf)).await {
            Ok(Ok(n)) => {
                buf.truncate(n);
                Ok(buf)
            }
            Ok(Err(e)) => Err(e),
            Err(_elapsed) => Ok(Vec::new()),
        }
    }

    async fn reconnect(&mut self) -> std::io::Result<()> {
        let inner = open_port(&self.device_path).map_err(tokio_serial_err_to_io)?;
        self.inner = inner;
        Ok(())
    }
}
