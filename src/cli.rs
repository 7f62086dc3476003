use clap::{Args, Parser, Subcommand};
use lora_concentrator::{
    Bandwidth, LORA_SYNC_WORD_PRIVATE, LORA_SYNC_WORD_PUBLIC, SpreadingFactor,
};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "lgw",
    version,
    about = "LoRa 2.4GHz concentrator utilities (rx/tx/eui/boot/reg/cnt)"
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Cmd {
    /// Receive packets on all RX channels
    Rx(RxOpts),
    /// Send packets
    Tx(TxOpts),
    /// Print the concentrator EUI
    Eui(SerialOpts),
    /// Put the MCU into bootloader mode
    Boot(SerialOpts),
    /// Read, write and read back a radio register
    Reg(RegOpts),
    /// Log host time against the concentrator counter
    Cnt(CntOpts),
}

#[derive(Args, Debug, Clone)]
pub struct SerialOpts {
    /// TTY device the concentrator board is attached to
    #[arg(long, short = 'd', default_value = "/dev/ttyACM0")]
    pub dev: String,
}

#[derive(Args, Debug, Clone)]
pub struct RadioOpts {
    /// Frequency in MHz, ]2400..2500[
    #[arg(long, short = 'f', default_value = "2425", value_parser = parse_freq_mhz)]
    pub freq: u32,
    /// Spreading factor [5..12]
    #[arg(long, short = 's', default_value = "12", value_parser = parse_sf)]
    pub sf: SpreadingFactor,
    /// Bandwidth in kHz [200, 400, 800, 1600]
    #[arg(long, short = 'b', default_value = "800", value_parser = parse_bw)]
    pub bw: Bandwidth,
    /// Use the private network sync word (0x12)
    #[arg(long = "priv", default_value_t = false)]
    pub private: bool,
}

impl RadioOpts {
    pub fn sync_word(&self) -> u8 {
        if self.private {
            LORA_SYNC_WORD_PRIVATE
        } else {
            LORA_SYNC_WORD_PUBLIC
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct RxOpts {
    #[command(flatten)]
    pub ser: SerialOpts,
    #[command(flatten)]
    pub radio: RadioOpts,
    /// Delay between two receive requests in milliseconds (min 10)
    #[arg(
        long,
        short = 't',
        default_value_t = 10,
        value_parser = clap::value_parser!(u64).range(10..)
    )]
    pub delay: u64,
    /// Stop after this many packets per start/stop loop (0 = never)
    #[arg(long, default_value_t = 0)]
    pub packets: u32,
    /// Number of start/stop loops (0 = one)
    #[arg(long = "loop", default_value_t = 0)]
    pub loops: u32,
    /// Stats print interval in seconds
    #[arg(long, default_value_t = 10.0)]
    pub stats: f64,
}

#[derive(Args, Debug, Clone)]
pub struct TxOpts {
    #[command(flatten)]
    pub ser: SerialOpts,
    #[command(flatten)]
    pub radio: RadioOpts,
    /// RF power in dBm [-18..13]
    #[arg(long, short = 'p', default_value_t = 13, allow_negative_numbers = true)]
    pub power: i8,
    /// Preamble length in symbols
    #[arg(long, short = 'l', default_value_t = 8)]
    pub preamble: u16,
    /// Number of packets to send
    #[arg(long, short = 'n', default_value_t = 1)]
    pub count: u32,
    /// Packet size; 0 sweeps [szmin..szmax]
    #[arg(long, short = 'z', default_value_t = 0)]
    pub size: u8,
    #[arg(long, default_value_t = 9)]
    pub szmin: u8,
    #[arg(long, default_value_t = 255)]
    pub szmax: u8,
    /// Inverted modulation polarity
    #[arg(long, short = 'i', default_value_t = false)]
    pub invert: bool,
    /// Delay between packets in milliseconds
    #[arg(long, short = 't', default_value_t = 1000)]
    pub delay: u64,
    /// Number of start/stop loops
    #[arg(long = "loop", default_value_t = 1)]
    pub loops: u32,
    /// Timestamped mode (20 ms ahead) instead of immediate
    #[arg(long, default_value_t = false)]
    pub trig: bool,
    /// PER payload: 32-bit counter on the last 4 bytes
    #[arg(long, default_value_t = false)]
    pub per: bool,
}

#[derive(Args, Debug, Clone)]
pub struct RegOpts {
    #[command(flatten)]
    pub ser: SerialOpts,
    /// Radio index
    #[arg(long, default_value_t = 0)]
    pub radio: u8,
    /// Register address (hex)
    #[arg(long, default_value = "0x8C1", value_parser = parse_hex_u16)]
    pub addr: u16,
    /// Value to write (hex)
    #[arg(long, default_value = "0xAA", value_parser = parse_hex_u8)]
    pub value: u8,
}

#[derive(Args, Debug, Clone)]
pub struct CntOpts {
    #[command(flatten)]
    pub ser: SerialOpts,
    /// Write "host_time,counter" lines here instead of stdout
    #[arg(long)]
    pub file: Option<PathBuf>,
    /// Number of samples (0 = run until killed)
    #[arg(long, default_value_t = 0)]
    pub samples: u64,
}

fn parse_freq_mhz(s: &str) -> Result<u32, String> {
    let mhz: f64 = s.parse().map_err(|_| format!("invalid frequency '{s}'"))?;
    if !(mhz > 2400.0 && mhz < 2500.0) {
        return Err(format!("frequency {mhz} MHz outside ]2400..2500["));
    }
    Ok((mhz * 1e6 + 0.5) as u32)
}

fn parse_sf(s: &str) -> Result<SpreadingFactor, String> {
    s.parse::<u8>()
        .ok()
        .and_then(SpreadingFactor::from_value)
        .ok_or_else(|| format!("spreading factor must be in [5..12], got '{s}'"))
}

fn parse_bw(s: &str) -> Result<Bandwidth, String> {
    s.parse::<u32>()
        .ok()
        .and_then(Bandwidth::from_khz)
        .ok_or_else(|| format!("bandwidth must be 200, 400, 800 or 1600 kHz, got '{s}'"))
}

fn parse_hex(s: &str) -> Result<u32, String> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u32::from_str_radix(digits, 16).map_err(|_| format!("invalid hex value '{s}'"))
}

fn parse_hex_u16(s: &str) -> Result<u16, String> {
    u16::try_from(parse_hex(s)?).map_err(|_| format!("'{s}' does not fit 16 bits"))
}

fn parse_hex_u8(s: &str) -> Result<u8, String> {
    u8::try_from(parse_hex(s)?).map_err(|_| format!("'{s}' does not fit 8 bits"))
}
