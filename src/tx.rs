use anyhow::{Context, Result, bail};
use std::thread;
use std::time::Duration;

use lora_concentrator::{
    BoardConfig, CodingRate, Concentrator, LGW_RX_CHANNEL_NB_MAX, RadioStatus, RxChannelConfig,
    StatusKind, TX_POWER_MAX, TX_POWER_MIN, TxMode, TxPacket, time_on_air,
};

use crate::cli::TxOpts;

/// The MCU cannot schedule further ahead than this.
const TRIG_ADVANCE_US: u32 = 20_000;
const TX_POLL: Duration = Duration::from_millis(10);

pub fn run(opts: TxOpts) -> Result<()> {
    if !(TX_POWER_MIN..=TX_POWER_MAX).contains(&opts.power) {
        bail!("RF power must be in [{TX_POWER_MIN}..{TX_POWER_MAX}] dBm");
    }
    if opts.size == 0 && opts.szmin > opts.szmax {
        bail!("szmin ({}) is larger than szmax ({})", opts.szmin, opts.szmax);
    }
    if opts.per && opts.size != 0 && opts.size < 4 {
        bail!("PER payload needs at least 4 bytes");
    }

    let mut hal = Concentrator::new();
    hal.set_board_config(BoardConfig {
        tty_path: opts.ser.dev.clone(),
    })?;
    for idx in 0..LGW_RX_CHANNEL_NB_MAX {
        hal.set_rx_channel_config(
            idx,
            RxChannelConfig {
                enable: true,
                freq_hz: opts.radio.freq,
                bandwidth: opts.radio.bw,
                datarate: opts.radio.sf,
                rssi_offset: 0.0,
                sync_word: opts.radio.sync_word(),
            },
        )?;
    }

    let template = TxPacket {
        freq_hz: opts.radio.freq,
        rf_power: opts.power,
        bandwidth: opts.radio.bw,
        datarate: opts.radio.sf,
        coderate: CodingRate::Li4_8,
        invert_pol: opts.invert,
        preamble: opts.preamble,
        no_crc: true,
        no_header: false,
        ..Default::default()
    };

    for cnt_loop in 1..=opts.loops.max(1) {
        hal.start().context("start concentrator")?;

        for i in 0..opts.count {
            let mut pkt = template.clone();
            if opts.trig {
                let now = hal.get_instcnt().context("read concentrator counter")?;
                pkt.tx_mode = TxMode::Timestamped;
                pkt.count_us = now.wrapping_add(TRIG_ADVANCE_US);
            } else {
                pkt.tx_mode = TxMode::Immediate;
                pkt.count_us = 0;
            }
            let size = packet_size(i, opts.size, opts.szmin, opts.szmax);
            pkt.payload = build_payload(i, size, opts.per);

            let airtime = time_on_air(&pkt);
            println!(
                "-> sending {} packet {} (size:{}, airtime:{} ms)",
                if opts.trig { "scheduled" } else { "immediate" },
                i,
                pkt.size(),
                airtime.ms
            );
            if let Err(e) = hal.send(&pkt) {
                eprintln!("[tx] failed to send packet: {e}");
            }

            loop {
                thread::sleep(TX_POLL);
                match hal.status(StatusKind::Tx) {
                    Ok(RadioStatus::TxFree) => break,
                    Ok(_) => {}
                    Err(e) => {
                        eprintln!("[tx] failed to get TX status: {e}");
                        break;
                    }
                }
            }
            thread::sleep(Duration::from_millis(opts.delay));
        }

        match hal.status(StatusKind::Tx) {
            Ok(RadioStatus::TxFree) => {}
            Ok(status) => {
                eprintln!("[tx] aborting TX ({status:?})");
                if let Err(e) = hal.abort_tx() {
                    eprintln!("[tx] failed to abort TX: {e}");
                }
            }
            Err(e) => eprintln!("[tx] failed to get TX status: {e}"),
        }

        println!("Nb packets sent:{} loop:{}\n", opts.count, cnt_loop);
        hal.stop().context("stop concentrator")?;
    }

    println!("### Exiting ###");
    Ok(())
}

/// Fixed size, or a sweep through `[szmin..=szmax]` when `size` is 0.
fn packet_size(i: u32, size: u8, szmin: u8, szmax: u8) -> usize {
    if size != 0 {
        return size as usize;
    }
    let span = (szmax - szmin) as u32 + 1;
    (i % span) as usize + szmin as usize
}

/// LoRaWAN-looking confirmed uplink with the frame counter in FCnt, or a
/// big-endian packet counter on the last 4 bytes for PER measurement.
fn build_payload(i: u32, size: usize, per: bool) -> Vec<u8> {
    let mut payload: Vec<u8> = (0..size).map(|b| b as u8).collect();
    if per {
        if size >= 4 {
            payload[size - 4..].copy_from_slice(&i.to_be_bytes());
        }
        return payload;
    }
    let header = [0x40, 0xAB, 0xAB, 0xAB, 0xAB, 0x00, i as u8, (i >> 8) as u8, 0x02];
    let n = header.len().min(size);
    payload[..n].copy_from_slice(&header[..n]);
    payload
}
