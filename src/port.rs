use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{self, Read, Write};
use std::thread;
use std::time::Duration;

pub const DEFAULT_BAUD: u32 = 115_200;
pub const READ_TIMEOUT: Duration = Duration::from_millis(100);
/// The MCU needs a moment after the port opens before it answers.
pub const OPEN_SETTLE: Duration = Duration::from_millis(100);

/// Opens the byte stream to the concentrator MCU.
pub trait Connect {
    type Port: Read + Write;

    fn connect(&mut self, path: &str) -> io::Result<Self::Port>;
}

#[derive(Debug, Clone)]
pub struct SerialConnector {
    pub baud: u32,
    pub open_settle: Duration,
}

impl Default for SerialConnector {
    fn default() -> Self {
        Self {
            baud: DEFAULT_BAUD,
            open_settle: OPEN_SETTLE,
        }
    }
}

impl Connect for SerialConnector {
    type Port = Box<dyn SerialPort>;

    fn connect(&mut self, path: &str) -> io::Result<Self::Port> {
        open_port(path, self.baud, self.open_settle)
    }
}

/// 8N1 without flow control; anything already buffered is discarded once the
/// line has settled.
pub fn open_port(dev: &str, baud: u32, settle: Duration) -> io::Result<Box<dyn SerialPort>> {
    let port = serialport::new(dev, baud)
        .timeout(READ_TIMEOUT)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .open()
        .map_err(|e| {
            let msg = format!("open {dev}: {e}");
            io::Error::new(io::Error::from(e).kind(), msg)
        })?;

    thread::sleep(settle);
    port.clear(ClearBuffer::All).map_err(io::Error::from)?;
    Ok(port)
}
