use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;

/// Tri-state malware scan verdict. `Error` is never treated as clean by the
/// pipeline (fail-closed).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanVerdict {
    Clean,
    Found(String),
    Error(String),
}

/// Capability for scanning upload bytes. Injected into the pipeline at
/// startup.
pub trait MalwareScanner: Send + Sync {
    fn scan(&self, bytes: &[u8]) -> ScanVerdict;
}

/// clamd client over the INSTREAM protocol. Connect, read and write timeouts
/// bound every socket operation; a hung or unreachable daemon resolves to
/// `Error`, never to a silent pass.
pub struct ClamdScanner {
    addr: String,
    timeout: Duration,
}

impl ClamdScanner {
    pub fn new(addr: &str, timeout: Duration) -> Self {
        ClamdScanner {
            addr: addr.to_string(),
            timeout,
        }
    }

    fn instream(&self, bytes: &[u8]) -> std::io::Result<String> {
        let addr = self
            .addr
            .parse()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, format!("{}", e)))?;
        let mut stream = TcpStream::connect_timeout(&addr, self.timeout)?;
        stream.set_read_timeout(Some(self.timeout))?;
        stream.set_write_timeout(Some(self.timeout))?;

        stream.write_all(b"zINSTREAM\0")?;
        // INSTREAM chunks: 4-byte big-endian length, then data; zero length ends.
        for chunk in bytes.chunks(8192) {
            stream.write_all(&(chunk.len() as u32).to_be_bytes())?;
            stream.write_all(chunk)?;
        }
        stream.write_all(&0u32.to_be_bytes())?;

        let mut response = String::new();
        stream.read_to_string(&mut response)?;
        Ok(response)
    }
}

impl MalwareScanner for ClamdScanner {
    fn scan(&self, bytes: &[u8]) -> ScanVerdict {
        let response = match self.instream(bytes) {
            Ok(r) => r,
            Err(e) => {
                tracing::error!("clamd scan failed: {}", e);
                return ScanVerdict::Error(e.to_string());
            }
        };

        let response = response.trim_end_matches(['\0', '\n']).trim();
        if response.ends_with("OK") {
            ScanVerdict::Clean
        } else if let Some(stripped) = response.strip_suffix(" FOUND") {
            let name = stripped.rsplit(": ").next().unwrap_or(stripped);
            ScanVerdict::Found(name.to_string())
        } else {
            tracing::error!("clamd returned unexpected response: {}", response);
            ScanVerdict::Error(response.to_string())
        }
    }
}

/// Scanner used when no CLAMD_ADDR is configured. Everything passes; the
/// startup log makes the gap loud, mirroring the AUTH_DISABLED escape hatch.
pub struct DisabledScanner;

impl MalwareScanner for DisabledScanner {
    fn scan(&self, _bytes: &[u8]) -> ScanVerdict {
        ScanVerdict::Clean
    }
}

/// Fixed-verdict scanner for tests.
pub struct StaticScanner(pub ScanVerdict);

impl MalwareScanner for StaticScanner {
    fn scan(&self, _bytes: &[u8]) -> ScanVerdict {
        self.0.clone()
    }
}
