//! # SITL Replay
//!
//! Feed a capture of simulator packets through the SITL state store and print
//! the resulting state as JSON Lines.
//!
//! # Usage
//!
//! ```bash
//! sitl-replay <capture-file> [params.toml]
//! ```
//!
//! The capture is a raw concatenation of vehicle state and extra sensor
//! packets as the simulator sends them. Bytes that do not start a valid packet
//! are skipped one at a time until the stream resynchronises.
//!
//! Expected output:
//! ```text
//! INFO sitl_replay: SITL replay v0.1.0 starting...
//! {"time_us":1000000,"roll":0.0,...}
//! INFO sitl_replay: Replayed 2 packets (1 resync bytes skipped)
//! ```

use std::io::{self, Write};

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use sitl_bridge::error::SitlError;
use sitl_bridge::packet::decoder::{packet_size, peek_magic};
use sitl_bridge::packet::protocol::{Packet, EXTRA_SENSOR_PACKET_SIZE, FDM_EXTRAS_MAGIC};
use sitl_bridge::params::SimulationParameters;
use sitl_bridge::state::{PacketSink, SitlState};

/// Counts reported at the end of a replay
#[derive(Debug, Default, PartialEq, Eq)]
struct ReplaySummary {
    packets: usize,
    skipped_bytes: usize,
    truncated_tail: usize,
}

/// Replay every packet in `capture`, writing one JSON line per vehicle sample
fn replay<W: Write>(
    capture: &[u8],
    sink: &mut PacketSink,
    state: &SitlState,
    out: &mut W,
) -> Result<ReplaySummary> {
    let mut summary = ReplaySummary::default();
    let mut offset = 0;

    while offset < capture.len() {
        match sink.apply_packet(&capture[offset..]) {
            Ok((packet, _status)) => {
                if let Packet::Vehicle(_) = packet {
                    writeln!(out, "{}", state.snapshot().to_json_line()?)?;
                }
                offset += packet_size(&packet);
                summary.packets += 1;
            }
            Err(SitlError::BadMagic { .. }) => {
                offset += 1;
                summary.skipped_bytes += 1;
            }
            Err(SitlError::ShortBuffer { .. }) => match next_extras_offset(capture, offset) {
                // A smaller packet may still follow within the tail
                Some(next) => {
                    summary.skipped_bytes += next - offset;
                    offset = next;
                }
                None => {
                    summary.truncated_tail = capture.len() - offset;
                    warn!("Capture ends with {} bytes of a partial packet", summary.truncated_tail);
                    break;
                }
            },
            Err(e) => return Err(e.into()),
        }
    }

    Ok(summary)
}

/// First offset after `offset` where a complete extra sensor packet begins
fn next_extras_offset(capture: &[u8], offset: usize) -> Option<usize> {
    let last = capture.len().checked_sub(EXTRA_SENSOR_PACKET_SIZE)?;
    (offset + 1..=last)
        .find(|&start| peek_magic(&capture[start..], EXTRA_SENSOR_PACKET_SIZE) == Some(FDM_EXTRAS_MAGIC))
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into())
        )
        .with_writer(io::stderr)
        .init();

    info!("SITL replay v{} starting...", env!("CARGO_PKG_VERSION"));

    let mut args = std::env::args().skip(1);
    let Some(capture_path) = args.next() else {
        bail!("usage: sitl-replay <capture-file> [params.toml]");
    };

    let params = match args.next() {
        Some(path) => SimulationParameters::load(&path)
            .with_context(|| format!("loading parameters from {}", path))?,
        None => SimulationParameters::new(),
    };

    let capture = std::fs::read(&capture_path)
        .with_context(|| format!("reading capture {}", capture_path))?;
    info!("Replaying {} bytes from {}", capture.len(), capture_path);

    let (mut sink, state) = SitlState::new(params);
    let stdout = io::stdout();
    let summary = replay(&capture, &mut sink, &state, &mut stdout.lock())?;

    let stats = state.stats();
    info!(
        "Replayed {} packets ({} resync bytes skipped, {} out of order)",
        summary.packets, summary.skipped_bytes, stats.out_of_order
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitl_bridge::packet::encoder::{encode_extra_sensor_state, encode_vehicle_state};
    use sitl_bridge::packet::protocol::{ExtraSensor, ExtraSensorState, VehicleState};

    fn vehicle(timestamp_us: u64) -> Vec<u8> {
        encode_vehicle_state(&VehicleState {
            timestamp_us,
            latitude: 37.0,
            ..Default::default()
        })
    }

    #[test]
    fn test_replay_mixed_stream() {
        let mut capture = vehicle(1_000);
        capture.extend(encode_extra_sensor_state(
            &ExtraSensorState::new(1_000).with(ExtraSensor::SonarDown, Some(2.0)),
        ));
        capture.extend(vehicle(2_000));

        let (mut sink, state) = SitlState::new(SimulationParameters::new());
        let mut out = Vec::new();
        let summary = replay(&capture, &mut sink, &state, &mut out).unwrap();

        assert_eq!(summary, ReplaySummary { packets: 3, skipped_bytes: 0, truncated_tail: 0 });
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 2);
        assert_eq!(state.latest_vehicle_state().timestamp_us, 2_000);
        assert_eq!(state.latest_extra_sensor_state().unwrap().sonar_down(), Some(2.0));
    }

    #[test]
    fn test_replay_resyncs_after_garbage() {
        let mut capture = vec![0xAAu8; 3];
        capture.extend(vehicle(5_000));

        let (mut sink, state) = SitlState::new(SimulationParameters::new());
        let mut out = Vec::new();
        let summary = replay(&capture, &mut sink, &state, &mut out).unwrap();

        assert_eq!(summary.skipped_bytes, 3);
        assert_eq!(summary.packets, 1);
        assert_eq!(state.latest_vehicle_state().timestamp_us, 5_000);
    }

    #[test]
    fn test_replay_stops_at_truncated_tail() {
        let mut capture = vehicle(1_000);
        capture.extend(&vehicle(2_000)[..50]);

        let (mut sink, state) = SitlState::new(SimulationParameters::new());
        let mut out = Vec::new();
        let summary = replay(&capture, &mut sink, &state, &mut out).unwrap();

        assert_eq!(summary.packets, 1);
        assert_eq!(summary.truncated_tail, 50);
        assert_eq!(state.latest_vehicle_state().timestamp_us, 1_000);
    }

    #[test]
    fn test_replay_finds_extras_after_garbage_in_tail() {
        let mut capture = vec![0xAAu8; 2];
        capture.extend(encode_extra_sensor_state(
            &ExtraSensorState::new(9_000).with(ExtraSensor::SonarDown, Some(4.0)),
        ));

        let (mut sink, state) = SitlState::new(SimulationParameters::new());
        let mut out = Vec::new();
        let summary = replay(&capture, &mut sink, &state, &mut out).unwrap();

        assert_eq!(summary, ReplaySummary { packets: 1, skipped_bytes: 2, truncated_tail: 0 });
        assert_eq!(state.latest_extra_sensor_state().unwrap().sonar_down(), Some(4.0));
    }

    #[test]
    fn test_replay_tail_garbage_after_extras_is_truncated() {
        let mut capture = vehicle(1_000);
        capture.push(0x00);
        capture.extend(encode_extra_sensor_state(&ExtraSensorState::new(1_500)));
        capture.extend([0x11u8; 7]);

        let (mut sink, state) = SitlState::new(SimulationParameters::new());
        let mut out = Vec::new();
        let summary = replay(&capture, &mut sink, &state, &mut out).unwrap();

        assert_eq!(summary, ReplaySummary { packets: 2, skipped_bytes: 1, truncated_tail: 7 });
        assert_eq!(state.latest_extra_sensor_state().unwrap().timestamp_us, 1_500);
    }
}
