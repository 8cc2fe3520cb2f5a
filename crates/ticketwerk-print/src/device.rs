// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Thermal printer device handle.
//
// USB receipt printers on Linux show up as a character device under
// /dev/usb/lp*. The printer interprets ESC/POS natively, so printing is just
// writing bytes to the device. No job tracking, no feedback.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument};

use ticketwerk_core::error::{Result, TicketwerkError};

/// Bytes written per syscall. Small heads have tiny input buffers.
const CHUNK_SIZE: usize = 4096;

/// Something ESC/POS bytes can be written to.
#[async_trait]
pub trait ThermalDevice: Send {
    /// Human-readable location for logs.
    fn describe(&self) -> String;

    async fn write_all(&mut self, bytes: &[u8]) -> Result<()>;
}

/// A line printer character device (`/dev/usb/lp0`).
pub struct LinePrinter {
    path: PathBuf,
    file: File,
    timeout: Duration,
}

impl LinePrinter {
    /// Open the device for writing. Fails if it does not exist or is not
    /// writable, which is how an absent printer is detected at startup.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub async fn open(path: impl AsRef<Path>, timeout: Duration) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = tokio::time::timeout(timeout, OpenOptions::new().write(true).open(&path))
            .await
            .map_err(|_| {
                TicketwerkError::Device(format!(
                    "opening {} timed out after {}ms",
                    path.display(),
                    timeout.as_millis()
                ))
            })?
            .map_err(|e| TicketwerkError::Device(format!("cannot open {}: {e}", path.display())))?;

        info!("thermal printer device opened");
        Ok(Self { path, file, timeout })
    }
}

#[async_trait]
impl ThermalDevice for LinePrinter {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    #[instrument(skip_all, fields(path = %self.path.display(), total = bytes.len()))]
    async fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        let timeout = self.timeout;
        let write = async {
            let mut sent = 0usize;
            for chunk in bytes.chunks(CHUNK_SIZE) {
                self.file.write_all(chunk).await.map_err(|e| {
                    TicketwerkError::Device(format!("write failed at byte {sent}: {e}"))
                })?;
                sent += chunk.len();
                debug!(sent, "thermal write progress");
            }
            self.file
                .flush()
                .await
                .map_err(|e| TicketwerkError::Device(format!("flush failed: {e}")))
        };

        tokio::time::timeout(timeout, write).await.map_err(|_| {
            TicketwerkError::Device(format!("write timed out after {}ms", timeout.as_millis()))
        })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_device_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let err = LinePrinter::open(dir.path().join("lp9"), Duration::from_secs(1))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, TicketwerkError::Device(_)));
    }

    #[tokio::test]
    async fn writes_every_chunk_to_the_device() {
        // A regular file stands in for the character device.
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lp0");
        std::fs::write(&path, b"").unwrap();

        let mut printer = LinePrinter::open(&path, Duration::from_secs(1)).await.unwrap();
        let payload: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        printer.write_all(&payload).await.unwrap();
        drop(printer);

        assert_eq!(std::fs::read(&path).unwrap(), payload);
    }
}
