//! Framing of requests and replies on the serial link.
//!
//! Every frame is a 4-byte header followed by `size` payload bytes:
//! ```text
//! ┌────────┬─────────┬─────────┬────────┬──────────────┐
//! │ id     │ size_hi │ size_lo │ cmd    │ payload      │
//! │ 1 byte │ 1 byte  │ 1 byte  │ 1 byte │ size bytes   │
//! └────────┴─────────┴─────────┴────────┴──────────────┘
//! ```
//! The id is informational only: the link carries one request at a time, so
//! replies are matched to requests by position.

use std::io::{self, Read, Write};

use tracing::trace;

use crate::error::{HalError, ProtocolError, Result};
use crate::proto::command::{AckType, Request};

pub const HEADER_SIZE: usize = 4;
pub const WRITE_SIZE_MAX: usize = 280;
pub const READ_SIZE_MAX: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub id: u8,
    pub size: u16,
    pub cmd: u8,
}

impl FrameHeader {
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let [hi, lo] = self.size.to_be_bytes();
        [self.id, hi, lo, self.cmd]
    }

    pub fn decode(bytes: [u8; HEADER_SIZE]) -> Self {
        Self {
            id: bytes[0],
            size: u16::from_be_bytes([bytes[1], bytes[2]]),
            cmd: bytes[3],
        }
    }
}

/// One reply frame, borrowing its payload from the receive buffer.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub header: FrameHeader,
    pub payload: &'a [u8],
}

impl Frame<'_> {
    pub fn ack_type(&self) -> AckType {
        AckType::from_code(self.header.cmd)
    }
}

/// Serialize a request frame.
pub fn build_request(id: u8, request: Request, payload: &[u8]) -> Result<Vec<u8>> {
    if HEADER_SIZE + payload.len() > WRITE_SIZE_MAX {
        return Err(HalError::invalid(format!(
            "{:?} payload of {} bytes exceeds the {} byte request buffer",
            request,
            payload.len(),
            WRITE_SIZE_MAX
        )));
    }
    let header = FrameHeader {
        id,
        size: payload.len() as u16,
        cmd: request.code(),
    };
    let mut out = Vec::with_capacity(HEADER_SIZE + payload.len());
    out.extend_from_slice(&header.encode());
    out.extend_from_slice(payload);
    Ok(out)
}

pub fn write_request<W: Write + ?Sized>(
    port: &mut W,
    id: u8,
    request: Request,
    payload: &[u8],
) -> Result<()> {
    let out = build_request(id, request, payload)?;
    port.write_all(&out)?;
    port.flush()?;
    trace!(?request, id, size = payload.len(), "write_req done");
    Ok(())
}

/// Read exactly one reply frame into `buf`.
///
/// The header is read first; the payload size it declares is checked against
/// the buffer capacity before any payload byte is consumed.
pub fn read_reply<'a, R: Read + ?Sized>(port: &mut R, buf: &'a mut [u8]) -> Result<Frame<'a>> {
    if buf.len() < HEADER_SIZE {
        return Err(HalError::invalid("receive buffer smaller than a frame header"));
    }
    read_full(port, &mut buf[..HEADER_SIZE])?;
    let header = FrameHeader::decode([buf[0], buf[1], buf[2], buf[3]]);

    let total = HEADER_SIZE + header.size as usize;
    if total > buf.len() {
        return Err(ProtocolError::FrameTooLarge {
            size: total,
            capacity: buf.len(),
        }
        .into());
    }
    read_full(port, &mut buf[HEADER_SIZE..total])?;
    trace!(id = header.id, size = header.size, cmd = header.cmd, "read_ack done");

    Ok(Frame {
        header,
        payload: &buf[HEADER_SIZE..total],
    })
}

/// Fill `buf` completely. Empty reads, per-read timeouts and interrupted
/// syscalls are retried; any other I/O error aborts.
fn read_full<R: Read + ?Sized>(port: &mut R, buf: &mut [u8]) -> io::Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        match port.read(&mut buf[filled..]) {
            Ok(n) => filled += n,
            Err(e) if is_transient(&e) => {
                trace!(kind = ?e.kind(), "read retried");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::Interrupted | io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockPort;
    use std::io::Cursor;

    #[test]
    fn header_layout_is_big_endian() {
        let h = FrameHeader {
            id: 0x5A,
            size: 0x0113,
            cmd: 0x43,
        };
        assert_eq!(h.encode(), [0x5A, 0x01, 0x13, 0x43]);
        assert_eq!(FrameHeader::decode(h.encode()), h);
    }

    #[test]
    fn request_frame_carries_payload() {
        let out = build_request(7, Request::Reset, &[0x02]).unwrap();
        assert_eq!(out, vec![7, 0x00, 0x01, 0x07, 0x02]);

        let out = build_request(9, Request::Ping, &[]).unwrap();
        assert_eq!(out, vec![9, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn oversized_request_is_rejected() {
        let payload = vec![0u8; WRITE_SIZE_MAX - HEADER_SIZE + 1];
        assert!(matches!(
            build_request(0, Request::PrepareTx, &payload),
            Err(HalError::InvalidArgument(_))
        ));
        let payload = vec![0u8; WRITE_SIZE_MAX - HEADER_SIZE];
        assert!(build_request(0, Request::PrepareTx, &payload).is_ok());
    }

    #[test]
    fn reply_assembled_from_partial_and_interrupted_reads() {
        let mut port = MockPort::new();
        port.queue_frame(0x11, 0x45, &[1, 0, 10, 0, 0]);
        port.set_chunk(1);
        port.inject_interrupts(3);
        port.inject_timeouts(2);

        let mut buf = [0u8; READ_SIZE_MAX];
        let frame = read_reply(&mut port, &mut buf).unwrap();
        assert_eq!(frame.header.id, 0x11);
        assert_eq!(frame.ack_type(), AckType::GetRxMsg);
        assert_eq!(frame.payload, &[1, 0, 10, 0, 0]);
    }

    #[test]
    fn oversized_reply_fails_before_reading_payload() {
        // declares 497 payload bytes: 4 + 497 > 500
        let mut bytes = vec![0x01, 0x01, 0xF1, 0x82];
        bytes.extend_from_slice(&[0xAA; 8]);
        let mut cursor = Cursor::new(bytes);

        let mut buf = [0u8; READ_SIZE_MAX];
        let err = read_reply(&mut cursor, &mut buf).unwrap_err();
        assert!(matches!(
            err,
            HalError::Protocol(ProtocolError::FrameTooLarge {
                size: 501,
                capacity: READ_SIZE_MAX
            })
        ));
        assert_eq!(cursor.position(), HEADER_SIZE as u64);
    }

    #[test]
    fn largest_reply_fits() {
        let mut port = MockPort::new();
        let payload = vec![0x33; READ_SIZE_MAX - HEADER_SIZE];
        port.queue_frame(0, 0x82, &payload);
        let mut buf = [0u8; READ_SIZE_MAX];
        let frame = read_reply(&mut port, &mut buf).unwrap();
        assert_eq!(frame.payload.len(), READ_SIZE_MAX - HEADER_SIZE);
    }

    #[test]
    fn hard_io_error_is_a_transport_error() {
        let mut port = MockPort::new();
        port.queue_bytes(&[0x00, 0x00]);
        // nothing more queued: the mock reports end of stream
        let mut buf = [0u8; READ_SIZE_MAX];
        assert!(matches!(
            read_reply(&mut port, &mut buf),
            Err(HalError::Transport(_))
        ));
    }
}
