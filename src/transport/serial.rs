//! Serial transport for the EnOcean adapter
//!
//! Uses blocking threads for low-latency I/O:
//! - Reader thread: reads from serial port, sends to channel
//! - Writer thread: receives from channel, writes to serial port
//!
//! The transport stops when:
//! - `shutdown` flag is set
//! - Serial port disconnects (detected via consecutive read errors)
//! - Write error occurs

use super::{Transport, TransportChannels};
use crate::constants::{CHANNEL_CAPACITY, SERIAL_DISCONNECT_THRESHOLD, SERIAL_READ_BUFFER_SIZE};
use crate::error::{BridgeError, Result};
use bytes::Bytes;
use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Serial transport for the EnOcean adapter
///
/// ESP3 adapters (TCM310 and friends) talk 57600 baud 8N1. Reader and writer
/// each run in their own blocking thread; the rest of the gateway only sees
/// the byte channels.
///
/// # Example
///
/// ```ignore
/// let transport = SerialTransport::new("/dev/ttyUSB0", 57600);
/// let channels = transport.spawn(shutdown)?;
/// ```
pub struct SerialTransport {
    port_name: String,
    baud_rate: u32,
}

impl SerialTransport {
    pub fn new(port_name: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port_name: port_name.into(),
            baud_rate,
        }
    }

    /// Open the serial port with a short read timeout
    fn open(&self) -> Result<Box<dyn serialport::SerialPort>> {
        serialport::new(&self.port_name, self.baud_rate)
            .timeout(std::time::Duration::from_millis(100))
            .open()
            .map_err(|e| BridgeError::SerialOpen {
                port: self.port_name.clone(),
                source: std::io::Error::other(e.to_string()),
            })
    }
}

impl Transport for SerialTransport {
    fn spawn(self, shutdown: Arc<AtomicBool>) -> Result<TransportChannels> {
        let (in_tx, in_rx) = mpsc::channel::<Bytes>(CHANNEL_CAPACITY);
        let (out_tx, mut out_rx) = mpsc::channel::<Bytes>(CHANNEL_CAPACITY);

        let port_read = self.open()?;
        let port_write = port_read.try_clone().map_err(|e| BridgeError::SerialOpen {
            port: self.port_name.clone(),
            source: std::io::Error::other(e.to_string()),
        })?;

        // Reader thread (blocking)
        let shutdown_reader = shutdown.clone();
        std::thread::spawn(move || {
            let mut port = port_read;
            let mut buf = [0u8; SERIAL_READ_BUFFER_SIZE];
            let mut consecutive_errors = 0u32;

            while !shutdown_reader.load(Ordering::Relaxed) {
                match port.read(&mut buf) {
                    Ok(n) if n > 0 => {
                        consecutive_errors = 0;
                        if in_tx
                            .blocking_send(Bytes::copy_from_slice(&buf[..n]))
                            .is_err()
                        {
                            // Channel closed, receiver dropped
                            break;
                        }
                    }
                    Ok(_) => {
                        // Zero bytes read - could be normal or port gone
                        consecutive_errors += 1;
                        if consecutive_errors > SERIAL_DISCONNECT_THRESHOLD {
                            break;
                        }
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::TimedOut => {
                        // Normal timeout, reset error counter
                        consecutive_errors = 0;
                    }
                    Err(_) => {
                        // Serial error - port disconnected
                        break;
                    }
                }
            }
            // Channel closes when in_tx is dropped
        });

        // Writer thread (blocking)
        let shutdown_writer = shutdown.clone();
        std::thread::spawn(move || {
            let mut port = port_write;
            loop {
                if shutdown_writer.load(Ordering::Relaxed) {
                    break;
                }
                match out_rx.blocking_recv() {
                    Some(data) => {
                        if port.write_all(&data).is_err() {
                            // Write error - port disconnected
                            break;
                        }
                    }
                    None => {
                        // Channel closed - sender dropped
                        break;
                    }
                }
            }
        });

        Ok(TransportChannels {
            rx: in_rx,
            tx: out_tx,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_transport_new() {
        let transport = SerialTransport::new("/dev/ttyUSB0", 57600);
        assert_eq!(transport.port_name, "/dev/ttyUSB0");
        assert_eq!(transport.baud_rate, 57600);
    }
}
