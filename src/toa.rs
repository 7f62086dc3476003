//! LoRa 2.4GHz time-on-air.

use crate::types::TxPacket;

/// Air time of a packet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Airtime {
    /// Rounded up to the next millisecond.
    pub ms: u32,
    pub exact_ms: f64,
}

impl Airtime {
    pub fn micros(&self) -> u64 {
        (self.exact_ms * 1000.0).ceil() as u64
    }
}

/// Number of symbols in the packet after the preamble.
fn payload_symbols(pkt: &TxPacket) -> f64 {
    let sf = pkt.datarate.value() as i32;
    let cr = pkt.coderate.code() as i32;
    let size = pkt.size() as i32;
    let crc = if pkt.no_crc { 0 } else { 1 };

    let fine_synch = sf <= 6;
    let long_interleaving = pkt.coderate.is_long_interleaved();
    let fec_rate = if long_interleaving {
        4.0 / (cr + if cr == 7 { 1 } else { 0 }) as f64
    } else {
        4.0 / (4 + cr) as f64
    };

    let total_bytes = size + 2 * crc;
    let bits_per_symbol = (sf - if sf >= 11 { 2 } else { 0 }) as f64;
    let header_symbols = if pkt.no_header { 0 } else { 20 };
    let mut header_bits = 4 * sf + 8 * fine_synch as i32 - 8 - header_symbols;

    if !long_interleaving {
        let data_bits = (8 * total_bytes - header_bits).max(0) as f64;
        return 8.0 + (data_bits / 4.0 / bits_per_symbol).ceil() * (cr + 4) as f64;
    }

    if !pkt.no_header {
        if header_bits < 8 * total_bytes {
            header_bits = header_bits.min(8 * size);
        }
        let payload_bits = (8 * total_bytes - header_bits).max(0) as f64;
        8.0 + (payload_bits / fec_rate / bits_per_symbol).ceil()
    } else {
        let start_bits_per_symbol = (sf - 2 + 2 * fine_synch as i32) as f64;
        let coded_bits = 8.0 * total_bytes as f64 / fec_rate;
        let start = (coded_bits / start_bits_per_symbol).ceil();
        if start < 8.0 {
            start
        } else {
            let remaining = coded_bits - 8.0 * start_bits_per_symbol;
            8.0 + (remaining / bits_per_symbol).ceil()
        }
    }
}

pub fn time_on_air(pkt: &TxPacket) -> Airtime {
    let sf = pkt.datarate.value();
    let fine_synch = if sf <= 6 { 2.0 } else { 0.0 };
    let preamble = pkt.preamble as f64 + 4.25 + fine_synch;
    let symbol_ms = (1u32 << sf) as f64 / pkt.bandwidth.occupied_khz() as f64;
    let exact_ms = (preamble + payload_symbols(pkt)) * symbol_ms;
    Airtime {
        ms: exact_ms.ceil() as u32,
        exact_ms,
    }
}
