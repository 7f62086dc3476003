use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use lora_concentrator::{
    BoardConfig, Concentrator, Connect, Mcu, RxChannelConfig, SerialConnector, version_info,
};

use crate::cli::{CntOpts, RegOpts, SerialOpts};

const CNT_PERIOD: Duration = Duration::from_millis(100);

fn open_mcu(ser: &SerialOpts) -> Result<Mcu<<SerialConnector as Connect>::Port>> {
    let port = SerialConnector::default()
        .connect(&ser.dev)
        .with_context(|| format!("connect to {}", ser.dev))?;
    Ok(Mcu::new(port))
}

pub fn eui(opts: SerialOpts) -> Result<()> {
    eprintln!("{}", version_info());
    let mut hal = Concentrator::new();
    hal.set_board_config(BoardConfig {
        tty_path: opts.dev.clone(),
    })?;
    let eui = hal.get_eui().context("read concentrator EUI")?;
    println!("INFO: concentrator EUI: 0x{eui:016x}");
    Ok(())
}

pub fn boot(opts: SerialOpts) -> Result<()> {
    let mut mcu = open_mcu(&opts)?;
    mcu.enter_bootloader().context("set MCU in bootloader mode")?;
    println!("MCU is now in bootloader mode");
    Ok(())
}

pub fn reg(opts: RegOpts) -> Result<()> {
    let mut mcu = open_mcu(&opts.ser)?;
    let info = mcu.ping().context("ping the concentrator")?;
    println!("Concentrator MCU version: {}", info.version);

    // registers only answer once the radio is configured
    let conf = RxChannelConfig {
        enable: true,
        freq_hz: 2_425_000_000,
        ..Default::default()
    };
    mcu.config_rx(opts.radio, &conf)
        .with_context(|| format!("configure radio {}", opts.radio))?;

    let value = mcu.read_register(opts.radio, opts.addr)?;
    println!("Read register 0x{:04X}:  0x{:02X}", opts.addr, value);
    println!("Write register 0x{:04X}: 0x{:02X}", opts.addr, opts.value);
    mcu.write_register(opts.radio, opts.addr, opts.value)?;
    let value = mcu.read_register(opts.radio, opts.addr)?;
    println!("Read register 0x{:04X}:  0x{:02X}", opts.addr, value);
    Ok(())
}

pub fn cnt(opts: CntOpts) -> Result<()> {
    let mut out: Box<dyn Write> = match &opts.file {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("create {}", path.display()))?,
        )),
        None => Box::new(io::stdout()),
    };

    let mut hal = Concentrator::new();
    hal.set_board_config(BoardConfig {
        tty_path: opts.ser.dev.clone(),
    })?;
    hal.start().context("start concentrator")?;

    let mut n: u64 = 0;
    while opts.samples == 0 || n < opts.samples {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let count_us = hal.get_instcnt().context("read concentrator counter")?;
        writeln!(out, "{}", sample_line(now, count_us))?;
        n += 1;
        thread::sleep(CNT_PERIOD);
    }
    out.flush()?;

    hal.stop().context("stop concentrator")?;
    eprintln!("### Exiting ###");
    Ok(())
}

fn sample_line(host: Duration, count_us: u32) -> String {
    format!("{}.{:06},{}", host.as_secs(), host.subsec_micros(), count_us)
}
