//! In-memory stand-in for the serial link, scripted from the MCU side.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::rc::Rc;

use crate::frame::{FrameHeader, HEADER_SIZE};
use crate::port::Connect;
use crate::proto::codec::{CrcCounters, PingInfo, ReceivedMessage, RxMsgInfo, Status, UniqueId};
use crate::proto::command::{AckType, PpsStatus, Request, STATUS_OK, TxMsgStatus};
use crate::proto::device;

#[derive(Default)]
struct Link {
    rx: VecDeque<u8>,
    tx: Vec<u8>,
    chunk: usize,
    interrupts: usize,
    timeouts: usize,
    fail_writes: bool,
}

/// Clones share the same link, so a test can keep a handle on a port it
/// gave away.
#[derive(Clone, Default)]
pub struct MockPort {
    link: Rc<RefCell<Link>>,
}

/// One request frame the host wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sent {
    pub id: u8,
    pub request: Request,
    pub payload: Vec<u8>,
}

impl MockPort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_bytes(&self, bytes: &[u8]) {
        self.link.borrow_mut().rx.extend(bytes.iter().copied());
    }

    pub fn queue_frame(&self, id: u8, cmd: u8, payload: &[u8]) {
        let header = FrameHeader {
            id,
            size: payload.len() as u16,
            cmd,
        };
        self.queue_bytes(&header.encode());
        self.queue_bytes(payload);
    }

    pub fn queue_ack(&self, ack: AckType, payload: &[u8]) {
        self.queue_frame(0, ack.code(), payload);
    }

    /// Largest number of bytes handed out per read; 0 means unlimited.
    pub fn set_chunk(&self, n: usize) {
        self.link.borrow_mut().chunk = n;
    }

    pub fn inject_interrupts(&self, n: usize) {
        self.link.borrow_mut().interrupts += n;
    }

    pub fn inject_timeouts(&self, n: usize) {
        self.link.borrow_mut().timeouts += n;
    }

    pub fn fail_writes(&self, fail: bool) {
        self.link.borrow_mut().fail_writes = fail;
    }

    pub fn unread(&self) -> usize {
        self.link.borrow().rx.len()
    }

    /// Number of live handles on this link, the test's own included.
    pub fn handles(&self) -> usize {
        Rc::strong_count(&self.link)
    }

    pub fn clear_sent(&self) {
        self.link.borrow_mut().tx.clear();
    }

    /// Parse everything written so far back into request frames.
    pub fn sent(&self) -> Vec<Sent> {
        let link = self.link.borrow();
        let mut out = Vec::new();
        let mut rest = &link.tx[..];
        while rest.len() >= HEADER_SIZE {
            let header = FrameHeader::decode([rest[0], rest[1], rest[2], rest[3]]);
            let end = HEADER_SIZE + header.size as usize;
            assert!(rest.len() >= end, "partial request frame written");
            out.push(Sent {
                id: header.id,
                request: Request::from_code(header.cmd).expect("unknown request code"),
                payload: rest[HEADER_SIZE..end].to_vec(),
            });
            rest = &rest[end..];
        }
        assert!(rest.is_empty(), "trailing bytes after last request");
        out
    }

    pub fn sent_requests(&self) -> Vec<Request> {
        self.sent().into_iter().map(|s| s.request).collect()
    }

    // ---- MCU replies

    pub fn reply_ping(&self, version: &str, nb_radio_rx: u8, unique_id: UniqueId) {
        let info = PingInfo {
            unique_id,
            version: version.into(),
            nb_radio_tx: 1,
            nb_radio_rx,
        };
        self.queue_ack(AckType::Ping, &device::encode_ack_ping(&info));
    }

    pub fn reply_status(&self, temperature: f32, rx_crc: &[CrcCounters]) {
        let status = Status {
            system_time_ms: 1000,
            precise_time_us: 1_000_000,
            pps_status: PpsStatus::NotValid,
            pps_time_us: 0,
            temperature,
            rx_crc: rx_crc.to_vec(),
        };
        self.queue_ack(AckType::GetStatus, &device::encode_ack_get_status(&status));
    }

    pub fn reply_ok(&self, ack: AckType) {
        self.queue_ack(ack, &device::encode_ack_status(STATUS_OK));
    }

    pub fn reply_code(&self, ack: AckType, code: u8) {
        self.queue_ack(ack, &device::encode_ack_status(code));
    }

    pub fn reply_tx_status(&self, status: TxMsgStatus) {
        self.queue_ack(AckType::GetTxStatus, &device::encode_ack_tx_status(status));
    }

    pub fn reply_rx_msg(&self, msgs: &[ReceivedMessage], pending: u8, lost: u8) {
        let info = RxMsgInfo {
            nb_msg: msgs.len() as u8,
            nb_bytes: msgs.iter().map(|m| m.payload.len() as u16).sum(),
            pending,
            lost,
        };
        self.queue_ack(AckType::GetRxMsg, &device::encode_ack_get_rx_msg(&info));
        for msg in msgs {
            self.queue_ack(AckType::MsgReceived, &device::encode_evt_msg_received(msg));
        }
    }
}

impl Read for MockPort {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut link = self.link.borrow_mut();
        if link.interrupts > 0 {
            link.interrupts -= 1;
            return Err(io::ErrorKind::Interrupted.into());
        }
        if link.timeouts > 0 {
            link.timeouts -= 1;
            return Err(io::ErrorKind::TimedOut.into());
        }
        if link.rx.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "mock MCU has nothing more to say",
            ));
        }
        let mut n = buf.len().min(link.rx.len());
        if link.chunk > 0 {
            n = n.min(link.chunk);
        }
        for (dst, src) in buf.iter_mut().zip(link.rx.drain(..n)) {
            *dst = src;
        }
        Ok(n)
    }
}

impl Write for MockPort {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut link = self.link.borrow_mut();
        if link.fail_writes {
            return Err(io::ErrorKind::BrokenPipe.into());
        }
        link.tx.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Hands out handles on one shared [`MockPort`].
#[derive(Clone, Default)]
pub struct MockConnector {
    pub port: MockPort,
    opened: Rc<RefCell<Vec<String>>>,
    refuse: bool,
}

impl MockConnector {
    pub fn new(port: MockPort) -> Self {
        Self {
            port,
            ..Default::default()
        }
    }

    /// A connector whose device never opens.
    pub fn refusing() -> Self {
        Self {
            refuse: true,
            ..Default::default()
        }
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.borrow().clone()
    }
}

impl Connect for MockConnector {
    type Port = MockPort;

    fn connect(&mut self, path: &str) -> io::Result<MockPort> {
        if self.refuse {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such device {path}"),
            ));
        }
        self.opened.borrow_mut().push(path.to_string());
        Ok(self.port.clone())
    }
}
