//! Length-prefixed framing over async byte streams.
//!
//! Every message on the verifier and storage-shard wires is one frame: a
//! 4-byte big-endian length followed by a bincode-encoded envelope.

use crate::error::{NetworkError, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Upper bound on a single frame. A block carrying a full batch of
/// transactions plus witnesses stays well under this.
pub const MAX_FRAME_BYTES: u32 = 64 * 1024 * 1024;

/// Write one length-prefixed frame.
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<()>
where
    W: AsyncWriteExt + Unpin,
{
    let len = u32::try_from(payload.len())
        .map_err(|_| NetworkError::Wire("frame exceeds u32 length".into()))?;
    if len > MAX_FRAME_BYTES {
        return Err(NetworkError::Wire(format!(
            "frame of {len} bytes exceeds the {MAX_FRAME_BYTES} byte cap"
        )));
    }
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one length-prefixed frame. `Ok(None)` on clean end-of-stream.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Vec<u8>>>
where
    R: AsyncReadExt + Unpin,
{
    let mut len_bytes = [0u8; 4];
    match reader.read_exact(&mut len_bytes).await {
        Ok(_) => {}
        Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(err) => return Err(err.into()),
    }
    let len = u32::from_be_bytes(len_bytes);
    if len > MAX_FRAME_BYTES {
        return Err(NetworkError::Wire(format!(
            "peer announced a {len} byte frame, cap is {MAX_FRAME_BYTES}"
        )));
    }
    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload).await?;
    Ok(Some(payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn frames_round_trip() {
        let mut wire = Vec::new();
        write_frame(&mut wire, b"hello").await.unwrap();
        write_frame(&mut wire, b"").await.unwrap();

        let mut reader = std::io::Cursor::new(wire);
        assert_eq!(
            read_frame(&mut reader).await.unwrap(),
            Some(b"hello".to_vec())
        );
        assert_eq!(read_frame(&mut reader).await.unwrap(), Some(vec![]));
        assert_eq!(read_frame(&mut reader).await.unwrap(), None);
    }

    #[tokio::test]
    async fn truncated_frame_is_an_error() {
        let mut wire = Vec::new();
        write_frame(&mut wire, b"hello").await.unwrap();
        wire.truncate(wire.len() - 2);

        let mut reader = std::io::Cursor::new(wire);
        assert!(read_frame(&mut reader).await.is_err());
    }

    #[tokio::test]
    async fn oversized_announcement_is_rejected() {
        let mut wire = Vec::new();
        wire.extend_from_slice(&u32::MAX.to_be_bytes());
        let mut reader = std::io::Cursor::new(wire);
        assert!(read_frame(&mut reader).await.is_err());
    }
}
