//! In-memory `SerialPort` test double, in the shape of the teacher's own
//! `serial_mock.rs`: shared buffers behind `Arc<Mutex<_>>` so a test can keep
//! a probe handle after the port itself is moved into a `Transport`.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ultralite_mbus::{Parity, SerialPort};

#[derive(Clone)]
pub struct MockPort {
    written: Arc<Mutex<Vec<u8>>>,
    parity_history: Arc<Mutex<Vec<Parity>>>,
    responses: Arc<Mutex<VecDeque<Vec<u8>>>>,
    fail_next_write: Arc<Mutex<bool>>,
    reconnect_count: Arc<Mutex<u32>>,
}

impl MockPort {
    pub fn new() -> Self {
        MockPort {
            written: Arc::new(Mutex::new(Vec::new())),
            parity_history: Arc::new(Mutex::new(Vec::new())),
            responses: Arc::new(Mutex::new(VecDeque::new())),
            fail_next_write: Arc::new(Mutex::new(false)),
            reconnect_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Queues a chunk that a subsequent `read_upto` call returns whole.
    /// Once the queue is drained, reads return empty, as a real port does
    /// when the collection window runs past what the meter sent.
    pub fn push_response(&self, chunk: Vec<u8>) {
        self.responses.lock().unwrap().push_back(chunk);
    }

    pub fn fail_next_write(&self) {
        *self.fail_next_write.lock().unwrap() = true;
    }

    pub fn written(&self) -> Vec<u8> {
        self.written.lock().unwrap().clone()
    }

    pub fn parity_history(&self) -> Vec<Parity> {
        self.parity_history.lock().unwrap().clone()
    }

    pub fn reconnect_count(&self) -> u32 {
        *self.reconnect_count.lock().unwrap()
    }
}

impl SerialPort for MockPort {
    fn set_parity(&mut self, parity: Parity) -> std::io::Result<()> {
        self.parity_history.lock().unwrap().push(parity);
        Ok(())
    }

    fn reset_input(&mut self) -> std::io::Result<()> {
        Ok(())
    }

    fn reset_output(&mut self) -> std::io::Result<()> {
        Ok(())
    }

    async fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        let mut fail = self.fail_next_write.lock().unwrap();
        if *fail {
            *fail = false;
            return Err(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "mock write failure",
            ));
        }
        drop(fail);
        self.written.lock().unwrap().extend_from_slice(buf);
        Ok(())
    }

    async fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }

    async fn read_upto(&mut self, _max: usize, _per_read_timeout: Duration) -> std::io::Result<Vec<u8>> {
        Ok(self.responses.lock().unwrap().pop_front().unwrap_or_default())
    }

    async fn reconnect(&mut self) -> std::io::Result<()> {
        *self.reconnect_count.lock().unwrap() += 1;
        Ok(())
    }
}
