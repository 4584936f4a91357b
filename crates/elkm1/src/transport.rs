//! Line-delimited transport over TCP or a local serial device
//!
//! The panel link is a full-duplex stream of CR-LF terminated ASCII
//! lines, reached either directly over a serial port or tunnelled through
//! the M1XEP ethernet adaptor as `socket://host:port`. The reader and
//! writer halves are independent objects so the reader and writer tasks
//! can own them separately.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, info};

use crate::error::Error;

/// Parsed transport destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Host {
    /// `socket://host:port`
    Tcp(String),
    /// OS serial device path (`/dev/ttyUSB0`, `COM3`)
    Serial(PathBuf),
}

impl Host {
    pub fn parse(host: &str) -> Result<Self, Error> {
        if host.is_empty() {
            return Err(Error::Config("host must not be empty".into()));
        }
        if let Some(addr) = host.strip_prefix("socket://") {
            let valid = match addr.rsplit_once(':') {
                Some((name, port)) => {
                    !name.is_empty() && !port.is_empty() && port.chars().all(|c| c.is_ascii_digit())
                }
                None => false,
            };
            if !valid {
                return Err(Error::Config(format!("bad socket address {addr:?}")));
            }
            return Ok(Self::Tcp(addr.to_string()));
        }
        if host.contains("://") {
            return Err(Error::Config(format!("unsupported scheme in {host:?}")));
        }
        Ok(Self::Serial(PathBuf::from(host)))
    }
}

/// Read half: yields one frame line at a time, without the CR-LF.
#[async_trait]
pub trait LineSource: Send {
    /// Next line, or `None` once the stream has closed.
    async fn next_line(&mut self) -> Result<Option<String>, Error>;
}

/// Write half: accepts frame lines, appending the CR-LF terminator.
#[async_trait]
pub trait LineSink: Send {
    async fn send_line(&mut self, line: &str) -> Result<(), Error>;
}

pub type BoxSource = Box<dyn LineSource>;
pub type BoxSink = Box<dyn LineSink>;

/// Buffered line reader over any byte stream.
pub struct IoSource<R> {
    reader: BufReader<R>,
}

impl<R: AsyncRead + Unpin + Send> IoSource<R> {
    pub fn new(inner: R) -> Self {
        Self { reader: BufReader::new(inner) }
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> LineSource for IoSource<R> {
    async fn next_line(&mut self) -> Result<Option<String>, Error> {
        let mut line = String::new();
        loop {
            line.clear();
            match self.reader.read_line(&mut line).await? {
                0 => return Ok(None),
                _ => {
                    let trimmed = line.trim_end_matches(['\r', '\n']);
                    // Heartbeat gaps can produce blank lines; skip them.
                    if trimmed.is_empty() {
                        continue;
                    }
                    return Ok(Some(trimmed.to_string()));
                }
            }
        }
    }
}

/// Line writer over any byte stream.
pub struct IoSink<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin + Send> IoSink<W> {
    pub fn new(inner: W) -> Self {
        Self { writer: inner }
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> LineSink for IoSink<W> {
    async fn send_line(&mut self, line: &str) -> Result<(), Error> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\r\n").await?;
        self.writer.flush().await?;
        Ok(())
    }
}

/// Wrap an arbitrary reader/writer pair as a transport. Used by tests and
/// by applications with their own link (an existing serial crate, a
/// proxy).
pub fn pair<R, W>(reader: R, writer: W) -> (BoxSource, BoxSink)
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    (Box::new(IoSource::new(reader)), Box::new(IoSink::new(writer)))
}

/// Open the configured host and return its two halves.
pub async fn connect(host: &Host) -> Result<(BoxSource, BoxSink), Error> {
    match host {
        Host::Tcp(addr) => {
            info!(%addr, "connecting");
            let stream = TcpStream::connect(addr).await?;
            stream.set_nodelay(true)?;
            let (read_half, write_half) = stream.into_split();
            debug!(%addr, "connected");
            Ok(pair(read_half, write_half))
        }
        Host::Serial(path) => open_serial(path).await,
    }
}

/// Open a serial device in raw mode at the panel's 115200 baud.
#[cfg(unix)]
async fn open_serial(path: &std::path::Path) -> Result<(BoxSource, BoxSink), Error> {
    use nix::sys::termios::{self, BaudRate, ControlFlags, SetArg};

    info!(path = %path.display(), "opening serial device");
    let file = std::fs::OpenOptions::new().read(true).write(true).open(path)?;
    let mut tio = termios::tcgetattr(&file).map_err(std::io::Error::from)?;
    termios::cfmakeraw(&mut tio);
    termios::cfsetspeed(&mut tio, BaudRate::B115200).map_err(std::io::Error::from)?;
    tio.control_flags |= ControlFlags::CREAD | ControlFlags::CLOCAL;
    termios::tcsetattr(&file, SetArg::TCSANOW, &tio).map_err(std::io::Error::from)?;

    let writer = file.try_clone()?;
    Ok(pair(
        tokio::fs::File::from_std(file),
        tokio::fs::File::from_std(writer),
    ))
}

#[cfg(not(unix))]
async fn open_serial(path: &std::path::Path) -> Result<(BoxSource, BoxSink), Error> {
    Err(Error::Config(format!(
        "serial device {} is not supported on this platform",
        path.display()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_parsing() {
        assert_eq!(
            Host::parse("socket://192.168.12.34:2101").unwrap(),
            Host::Tcp("192.168.12.34:2101".into())
        );
        assert_eq!(
            Host::parse("/dev/ttyUSB0").unwrap(),
            Host::Serial(PathBuf::from("/dev/ttyUSB0"))
        );
        assert!(Host::parse("").is_err());
        assert!(Host::parse("socket://").is_err());
        assert!(Host::parse("socket://noport").is_err());
        assert!(Host::parse("ftp://1.2.3.4:1").is_err());
    }

    #[tokio::test]
    async fn lines_round_trip_through_a_duplex_stream() {
        let (client, server) = tokio::io::duplex(256);
        let (server_read, server_write) = tokio::io::split(server);
        let (client_read, client_write) = tokio::io::split(client);
        let (mut source, _sink) = pair(server_read, server_write);
        let (_source2, mut sink) = pair(client_read, client_write);

        sink.send_line("06as0066").await.unwrap();
        sink.send_line("06vn0056").await.unwrap();
        assert_eq!(source.next_line().await.unwrap().as_deref(), Some("06as0066"));
        assert_eq!(source.next_line().await.unwrap().as_deref(), Some("06vn0056"));
    }

    #[tokio::test]
    async fn blank_lines_are_skipped_and_eof_is_none() {
        let (mut client, server) = tokio::io::duplex(256);
        let (server_read, server_write) = tokio::io::split(server);
        let (mut source, _sink) = pair(server_read, server_write);

        use tokio::io::AsyncWriteExt;
        client.write_all(b"\r\n06as0066\r\n").await.unwrap();
        drop(client);
        assert_eq!(source.next_line().await.unwrap().as_deref(), Some("06as0066"));
        assert_eq!(source.next_line().await.unwrap(), None);
    }
}
