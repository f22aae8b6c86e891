use bytes::Buf;
use bytes::BufMut;
use bytes::Bytes;
use bytes::BytesMut;
use tokio::io::AsyncRead;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWrite;
use tokio::io::AsyncWriteExt;

use crate::ProtoError;

/// A u64 never needs more than 10 groups of 7 bits.
pub const MAX_VLQ_LEN: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub id: u8,
    pub payload: Bytes,
}

pub fn put_vlq(buf: &mut impl BufMut, mut v: u64) {
    let mut tmp = [0u8; MAX_VLQ_LEN];
    let mut i = MAX_VLQ_LEN - 1;
    tmp[i] = (v & 0x7f) as u8;
    v >>= 7;
    while v > 0 {
        i -= 1;
        tmp[i] = 0x80 | (v & 0x7f) as u8;
        v >>= 7;
    }
    buf.put_slice(&tmp[i..]);
}

/// Signed VLQ: the sign lives in the low bit. `n >= 0` encodes as `2n`,
/// `n < 0` as `2(-(n + 1)) + 1`, so -1 is `1` and -3 is `5`.
pub fn put_signed_vlq(buf: &mut impl BufMut, n: i64) {
    let v = if n < 0 {
        ((!n as u64) << 1) | 1
    } else {
        (n as u64) << 1
    };
    put_vlq(buf, v);
}

/// Decode a VLQ from the front of `p`.
///
/// Returns:
/// - `Ok(Some((value, consumed)))` when a full VLQ is present,
/// - `Ok(None)` when more bytes are needed.
pub fn read_vlq(p: &[u8]) -> Result<Option<(u64, usize)>, ProtoError> {
    let mut v: u64 = 0;
    for (i, &b) in p.iter().enumerate() {
        if i >= MAX_VLQ_LEN {
            return Err(ProtoError::VlqOverrun);
        }
        v = (v << 7) | u64::from(b & 0x7f);
        if b & 0x80 == 0 {
            return Ok(Some((v, i + 1)));
        }
    }
    if p.len() >= MAX_VLQ_LEN {
        return Err(ProtoError::VlqOverrun);
    }
    Ok(None)
}

pub fn read_signed_vlq(p: &[u8]) -> Result<Option<(i64, usize)>, ProtoError> {
    Ok(read_vlq(p)?.map(|(v, n)| {
        let half = (v >> 1) as i64;
        if v & 1 == 0 { (half, n) } else { (!half, n) }
    }))
}

/// Build a complete packet: id, signed VLQ payload length, payload.
pub fn build_packet(id: u8, payload: &[u8]) -> Bytes {
    let mut out = BytesMut::with_capacity(1 + MAX_VLQ_LEN + payload.len());
    out.put_u8(id);
    put_signed_vlq(&mut out, payload.len() as i64);
    out.put_slice(payload);
    out.freeze()
}

/// Split one complete packet off the front of `p`.
///
/// Returns `Ok(None)` if `p` does not yet hold a whole packet.
pub fn split_packet(p: &mut BytesMut, max_payload_len: usize) -> Result<Option<Packet>, ProtoError> {
    if p.is_empty() {
        return Ok(None);
    }
    let id = p[0];
    let Some((len, n)) = read_signed_vlq(&p[1..])? else {
        return Ok(None);
    };
    if len < 0 {
        return Err(ProtoError::Compressed { id });
    }
    let len = len as usize;
    if len > max_payload_len {
        return Err(ProtoError::PayloadTooLarge {
            id,
            len,
            max: max_payload_len,
        });
    }
    if p.len() < 1 + n + len {
        return Ok(None);
    }
    p.advance(1 + n);
    let payload = p.split_to(len).freeze();
    Ok(Some(Packet { id, payload }))
}

#[derive(Debug)]
pub struct PacketReader<R> {
    inner: R,
    buf: BytesMut,
    max_payload_len: usize,
}

impl<R> PacketReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(8 * 1024),
            max_payload_len: 1024 * 1024,
        }
    }
}

impl<R: AsyncRead + Unpin> PacketReader<R> {
    /// Read one packet.
    ///
    /// Returns:
    /// - `Ok(Some(packet))` for a packet,
    /// - `Ok(None)` on clean EOF with no buffered data.
    pub async fn read_packet(&mut self) -> std::io::Result<Option<Packet>> {
        loop {
            match split_packet(&mut self.buf, self.max_payload_len) {
                Ok(Some(pkt)) => return Ok(Some(pkt)),
                Ok(None) => {}
                Err(e) => {
                    return Err(std::io::Error::new(std::io::ErrorKind::InvalidData, e));
                }
            }

            let n = self.inner.read_buf(&mut self.buf).await?;
            if n == 0 {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                return Err(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "eof while reading packet",
                ));
            }
        }
    }
}

#[derive(Debug)]
pub struct PacketWriter<W> {
    inner: W,
}

impl<W> PacketWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }
}

impl<W: AsyncWrite + Unpin> PacketWriter<W> {
    pub async fn write_packet(&mut self, id: u8, payload: &[u8]) -> std::io::Result<()> {
        self.write_packet_parts(id, &[payload]).await
    }

    /// Write a packet whose payload lives in separate buffers (e.g. a fixed header plus a
    /// `Bytes` body) without concatenating them first.
    pub async fn write_packet_parts(&mut self, id: u8, parts: &[&[u8]]) -> std::io::Result<()> {
        let len: usize = parts.iter().map(|p| p.len()).sum();
        let mut hdr = BytesMut::with_capacity(1 + MAX_VLQ_LEN);
        hdr.put_u8(id);
        put_signed_vlq(&mut hdr, len as i64);

        self.inner.write_all(&hdr).await?;
        for p in parts {
            if !p.is_empty() {
                self.inner.write_all(p).await?;
            }
        }
        Ok(())
    }

    pub async fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vlq(v: u64) -> Vec<u8> {
        let mut b = Vec::new();
        put_vlq(&mut b, v);
        b
    }

    #[test]
    fn vlq_known_encodings() {
        assert_eq!(vlq(0), vec![0x00]);
        assert_eq!(vlq(0x7f), vec![0x7f]);
        assert_eq!(vlq(0x80), vec![0x81, 0x00]);
        assert_eq!(vlq(0x3fff), vec![0xff, 0x7f]);
        assert_eq!(vlq(0x4000), vec![0x81, 0x80, 0x00]);
    }

    #[test]
    fn signed_vlq_puts_sign_in_low_bit() {
        let mut b = Vec::new();
        put_signed_vlq(&mut b, 20);
        assert_eq!(b, vec![40]);

        let mut b = Vec::new();
        put_signed_vlq(&mut b, -3);
        assert_eq!(b, vec![5]);
        assert_eq!(read_signed_vlq(&b).unwrap(), Some((-3, 1)));

        let mut b = Vec::new();
        put_signed_vlq(&mut b, -1);
        assert_eq!(b, vec![1]);
        assert_eq!(read_signed_vlq(&[0x01]).unwrap(), Some((-1, 1)));
        assert_eq!(read_signed_vlq(&[0x81, 0x01]).unwrap(), Some((-65, 2)));

        let mut b = Vec::new();
        put_signed_vlq(&mut b, i64::MIN);
        assert_eq!(read_signed_vlq(&b).unwrap(), Some((i64::MIN, b.len())));
    }

    #[test]
    fn read_vlq_needs_more_and_rejects_runaway() {
        assert_eq!(read_vlq(&[0x81]).unwrap(), None);
        assert_eq!(read_vlq(&[0x81, 0x00, 0xff]).unwrap(), Some((0x80, 2)));
        assert_eq!(read_vlq(&[0xff; 11]), Err(ProtoError::VlqOverrun));
    }

    #[test]
    fn split_packet_waits_for_full_payload() {
        let pkt = build_packet(7, b"hello");
        let mut buf = BytesMut::from(&pkt[..4]);
        assert_eq!(split_packet(&mut buf, 64).unwrap(), None);

        buf.extend_from_slice(&pkt[4..]);
        buf.extend_from_slice(&[9]);
        let got = split_packet(&mut buf, 64).unwrap().unwrap();
        assert_eq!(got.id, 7);
        assert_eq!(&got.payload[..], b"hello");
        assert_eq!(&buf[..], &[9]);
    }

    #[test]
    fn split_packet_rejects_compressed_and_oversized() {
        let mut compressed = BytesMut::new();
        compressed.put_u8(1);
        put_signed_vlq(&mut compressed, -4);
        compressed.put_slice(b"zzzz");
        assert_eq!(
            split_packet(&mut compressed, 64),
            Err(ProtoError::Compressed { id: 1 })
        );

        // Length -1 as the game writes it is a single 0x01 byte.
        let mut minus_one = BytesMut::from(&[7u8, 0x01, 0xaa][..]);
        assert_eq!(
            split_packet(&mut minus_one, 64),
            Err(ProtoError::Compressed { id: 7 })
        );

        let mut big = BytesMut::from(&build_packet(1, &[0u8; 65])[..]);
        assert_eq!(
            split_packet(&mut big, 64),
            Err(ProtoError::PayloadTooLarge {
                id: 1,
                len: 65,
                max: 64
            })
        );
    }

    #[tokio::test]
    async fn reads_written_packets() {
        let (a, b) = tokio::io::duplex(64);
        tokio::spawn(async move {
            let mut pw = PacketWriter::new(b);
            pw.write_packet(3, b"abc").await.unwrap();
            pw.write_packet_parts(4, &[b"he", b"", b"llo"]).await.unwrap();
            pw.flush().await.unwrap();
        });

        let mut pr = PacketReader::new(a);
        let p1 = pr.read_packet().await.unwrap().unwrap();
        let p2 = pr.read_packet().await.unwrap().unwrap();
        assert_eq!((p1.id, &p1.payload[..]), (3, &b"abc"[..]));
        assert_eq!((p2.id, &p2.payload[..]), (4, &b"hello"[..]));
        assert!(pr.read_packet().await.unwrap().is_none());
    }
}
