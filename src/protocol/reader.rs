use crate::error::{ProtocolError, Result};
use crate::protocol::codec::Codec;
use crate::protocol::packet::Packet;
use crate::protocol::window::PacketWindow;
use tokio::io::{self, AsyncRead, AsyncReadExt};

/// Decodes packets from one direction of a live stream.
pub struct PacketReader<R> {
    reader: R,
    window: PacketWindow,
    codec: Codec,
}

impl<R: AsyncRead + Unpin> PacketReader<R> {
    pub fn new(reader: R, codec: Codec, capacity: usize) -> Self {
        Self {
            reader,
            window: PacketWindow::with_capacity(capacity),
            codec,
        }
    }

    /// Waits for the next complete packet.
    ///
    /// Cancel safe: the window only changes after a read has completed, so a
    /// dropped call loses no bytes and the next call resumes where it left off.
    pub async fn decode_next(&mut self) -> Result<Packet> {
        loop {
            if let Some(packet) = self.codec.try_decode(&mut self.window)? {
                return Ok(packet);
            }

            let capacity = self.window.capacity();
            let kind = self.window.lookahead().first().copied().unwrap_or(0);
            let Some(free) = self.window.writable() else {
                return Err(ProtocolError::FrameTooLarge { kind, capacity }.into());
            };

            let n = self.reader.read(free).await?;
            if n == 0 {
                return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "connection closed").into());
            }
            self.window.fill(n);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WaypointError;
    use crate::protocol::field::Value;
    use crate::protocol::schema::ids;
    use assert_matches::assert_matches;

    fn chat(codec: &Codec, text: &str) -> Packet {
        codec.encode(ids::CHAT, &[Value::from(text)]).unwrap()
    }

    #[tokio::test]
    async fn test_packet_split_across_reads() {
        let codec = Codec::default();
        let packet = chat(&codec, "split me");
        let bytes = packet.as_bytes();

        for split in 1..bytes.len() {
            let mock = tokio_test::io::Builder::new()
                .read(&bytes[..split])
                .read(&bytes[split..])
                .build();
            let mut reader = PacketReader::new(mock, codec.clone(), 64);
            assert_eq!(reader.decode_next().await.unwrap(), packet, "split {}", split);
        }
    }

    #[tokio::test]
    async fn test_many_packets_in_one_read() {
        let codec = Codec::default();
        let first = chat(&codec, "one");
        let second = codec.encode(ids::TIME_UPDATE, &[Value::Long(6000)]).unwrap();
        let mut bytes = first.as_bytes().to_vec();
        bytes.extend_from_slice(second.as_bytes());

        let mock = tokio_test::io::Builder::new().read(&bytes).build();
        let mut reader = PacketReader::new(mock, codec, 64);
        assert_eq!(reader.decode_next().await.unwrap(), first);
        assert_eq!(reader.decode_next().await.unwrap(), second);
        assert_matches!(reader.decode_next().await, Err(WaypointError::IoError(_)));
    }

    #[tokio::test]
    async fn test_closed_stream_mid_frame() {
        let codec = Codec::default();
        let packet = chat(&codec, "truncated");
        let mock = tokio_test::io::Builder::new()
            .read(&packet.as_bytes()[..4])
            .build();
        let mut reader = PacketReader::new(mock, codec, 64);
        assert_matches!(
            reader.decode_next().await,
            Err(WaypointError::IoError(err)) if err.kind() == io::ErrorKind::UnexpectedEof
        );
    }

    #[tokio::test]
    async fn test_unknown_packet_type() {
        let mock = tokio_test::io::Builder::new().read(&[0xEE, 1, 2]).build();
        let mut reader = PacketReader::new(mock, Codec::default(), 64);
        assert_matches!(
            reader.decode_next().await,
            Err(WaypointError::ProtocolError {
                source: ProtocolError::UnknownPacket { kind: 0xEE },
                ..
            })
        );
    }
}
