//! Newline-delimited framing for the JSON-RPC session.
//!
//! Frames are split on `\n` at the byte level. A frame that is not valid
//! UTF-8 is decoded lossily and handed to the session like any other line,
//! where it fails JSON parsing and gets a `-32700` answer. Only end of input
//! or a genuine I/O failure stops [`McpTransport::receive`].

use async_trait::async_trait;
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, DuplexStream, ReadHalf,
    Stdin, Stdout, WriteHalf,
};

use crate::error::McpError;

/// Buffer size of each direction of an in-memory pipe.
const PIPE_CAPACITY: usize = 64 * 1024;

#[async_trait]
pub trait McpTransport: Send + Sync {
    /// Next non-blank frame, trimmed. `None` once the peer has closed.
    async fn receive(&mut self) -> Result<Option<String>, McpError>;

    /// Write one frame followed by `\n` and flush.
    async fn send(&mut self, message: &str) -> Result<(), McpError>;
}

/// Line framing over any async byte reader/writer pair.
pub struct LineTransport<R, W> {
    reader: BufReader<R>,
    writer: W,
    frame: Vec<u8>,
}

/// The production transport. Nothing else may write to stdout.
pub type StdioTransport = LineTransport<Stdin, Stdout>;

/// Connected in-memory endpoints, for driving a session from tests.
pub type ChannelTransport = LineTransport<ReadHalf<DuplexStream>, WriteHalf<DuplexStream>>;

impl<R, W> LineTransport<R, W>
where
    R: AsyncRead + Unpin + Send + Sync,
    W: AsyncWrite + Unpin + Send + Sync,
{
    pub fn from_parts(reader: R, writer: W) -> Self {
        Self {
            reader: BufReader::new(reader),
            writer,
            frame: Vec::new(),
        }
    }

    pub fn into_writer(self) -> W {
        self.writer
    }
}

impl LineTransport<Stdin, Stdout> {
    pub fn new() -> Self {
        Self::from_parts(tokio::io::stdin(), tokio::io::stdout())
    }
}

impl Default for LineTransport<Stdin, Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl LineTransport<ReadHalf<DuplexStream>, WriteHalf<DuplexStream>> {
    /// Two endpoints joined by a duplex pipe; what one sends the other
    /// receives. Dropping one side ends the other's input.
    pub fn pair() -> (Self, Self) {
        let (a, b) = tokio::io::duplex(PIPE_CAPACITY);
        let (a_read, a_write) = tokio::io::split(a);
        let (b_read, b_write) = tokio::io::split(b);
        (
            Self::from_parts(a_read, a_write),
            Self::from_parts(b_read, b_write),
        )
    }
}

#[async_trait]
impl<R, W> McpTransport for LineTransport<R, W>
where
    R: AsyncRead + Unpin + Send + Sync,
    W: AsyncWrite + Unpin + Send + Sync,
{
    async fn receive(&mut self) -> Result<Option<String>, McpError> {
        loop {
            self.frame.clear();
            if self.reader.read_until(b'\n', &mut self.frame).await? == 0 {
                return Ok(None);
            }
            let text = String::from_utf8_lossy(&self.frame);
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                return Ok(Some(trimmed.to_string()));
            }
        }
    }

    async fn send(&mut self, message: &str) -> Result<(), McpError> {
        self.writer.write_all(message.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(input: &'static [u8]) -> LineTransport<&'static [u8], Vec<u8>> {
        LineTransport::from_parts(input, Vec::new())
    }

    #[tokio::test]
    async fn test_invalid_utf8_frame_is_decoded_lossily() {
        let mut t = reading(b"\xff\xfe\n{\"id\":1}\n");
        assert_eq!(t.receive().await.unwrap(), Some("\u{fffd}\u{fffd}".to_string()));
        assert_eq!(t.receive().await.unwrap(), Some("{\"id\":1}".to_string()));
        assert_eq!(t.receive().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_crlf_blank_and_unterminated_frames() {
        let mut t = reading(b"\r\n   \n{\"a\":1}\r\n{\"b\":2}");
        assert_eq!(t.receive().await.unwrap(), Some("{\"a\":1}".to_string()));
        assert_eq!(t.receive().await.unwrap(), Some("{\"b\":2}".to_string()));
        assert_eq!(t.receive().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_send_appends_newline() {
        let mut t = reading(b"");
        t.send("{\"id\":1}").await.unwrap();
        t.send("{\"id\":2}").await.unwrap();
        assert_eq!(t.into_writer(), b"{\"id\":1}\n{\"id\":2}\n".to_vec());
    }

    #[tokio::test]
    async fn test_pair_round_trip_and_close() {
        let (mut a, mut b) = ChannelTransport::pair();
        a.send("ping").await.unwrap();
        assert_eq!(b.receive().await.unwrap(), Some("ping".to_string()));
        b.send("pong").await.unwrap();
        assert_eq!(a.receive().await.unwrap(), Some("pong".to_string()));

        drop(b);
        assert_eq!(a.receive().await.unwrap(), None);
        assert!(a.send("x").await.is_err());
    }
}
