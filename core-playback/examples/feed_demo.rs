//! # Decode Feed Demo
//!
//! Plays a file of raw 16-bit little-endian stereo PCM at 44.1 kHz through a
//! pass-through decoder into a sink that only counts samples, printing every
//! player event.
//!
//! Run with: `cargo run --example feed_demo --package core-playback -- <file> [seconds]`

use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{AudioOutput, AudioSink, PcmFormat};
use core_playback::{
    DecodeExit, DecodeFeed, DecoderKind, DecoderSession, Player, PlayerConfig, Result,
};
use core_runtime::events::RecvError;
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use core_runtime::{PlayerEvent, TrackInfo};
use std::sync::Arc;
use std::time::Duration;

const SAMPLE_RATE: u32 = 44_100;
const CHANNELS: u8 = 2;

// ============================================================================
// Pass-through decoder
// ============================================================================

/// Treats the encoded bytes as PCM already.
struct RawPcmDecoder;

impl DecoderSession for RawPcmDecoder {
    fn run(&mut self, feed: &DecodeFeed) -> DecodeExit {
        feed.on_start_reading_header();

        let tags = TrackInfo {
            vendor: "raw-pcm".into(),
            title: "Demo".into(),
            ..Default::default()
        };
        if feed.on_start(SAMPLE_RATE, CHANNELS, tags).is_err() {
            return DecodeExit::InvalidHeader;
        }

        let mut buf = [0u8; 4096];
        let mut pcm = Vec::with_capacity(buf.len() / 2);
        loop {
            let n = feed.read_encoded(&mut buf);
            if n == 0 {
                return DecodeExit::Success;
            }
            pcm.clear();
            pcm.extend(
                buf[..n - n % 2]
                    .chunks_exact(2)
                    .map(|pair| i16::from_le_bytes([pair[0], pair[1]])),
            );
            feed.write_pcm(&pcm, None);
        }
    }
}

// ============================================================================
// Counting sink
// ============================================================================

struct CountingOutput;

struct CountingSink {
    format: PcmFormat,
    samples: usize,
}

impl AudioOutput for CountingOutput {
    fn open(&self, format: PcmFormat) -> BridgeResult<Box<dyn AudioSink>> {
        println!("sink opened: {} Hz, {} ch", format.sample_rate, format.channels);
        Ok(Box::new(CountingSink { format, samples: 0 }))
    }
}

impl AudioSink for CountingSink {
    fn write(&mut self, samples: &[i16]) -> BridgeResult<usize> {
        self.samples += samples.len();
        Ok(samples.len())
    }

    fn play(&mut self) -> BridgeResult<()> {
        Ok(())
    }

    fn flush(&mut self) {}

    fn stop(&mut self) -> BridgeResult<()> {
        let frames = self.format.frames_in(self.samples);
        println!("sink stopped after {} frames", frames);
        Ok(())
    }
}

// ============================================================================
// Main
// ============================================================================

fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig::default().with_format(LogFormat::Compact))?;

    let mut args = std::env::args().skip(1);
    let Some(locator) = args.next() else {
        anyhow::bail!("usage: feed_demo <file-or-url> [seconds]");
    };
    let duration = args
        .next()
        .map(|secs| secs.parse::<u64>().map(Duration::from_secs))
        .transpose()?;

    let player = Player::builder()
        .config(PlayerConfig::default().with_decoder(DecoderKind::PlatformCodec))
        .audio_output(Arc::new(CountingOutput))
        .decoder_factory(Arc::new(
            |_kind: DecoderKind| -> Result<Box<dyn DecoderSession>> { Ok(Box::new(RawPcmDecoder)) },
        ))
        .build()?;
    let Some(mut events) = player.subscribe() else {
        anyhow::bail!("player has no event bus");
    };

    player.set_source(&locator, duration)?;

    loop {
        let event = match events.blocking_recv() {
            Ok(event) => event,
            Err(RecvError::Lagged(missed)) => {
                println!("({} events missed)", missed);
                continue;
            }
            Err(RecvError::Closed) => break,
        };

        match &event {
            PlayerEvent::ReadyToPlay => player.play()?,
            PlayerEvent::TrackInfo(info) => println!("track: {} ({})", info.title, info.vendor),
            PlayerEvent::PlayUpdate { seconds } if *seconds % 5 != 0 => continue,
            _ => {}
        }
        println!("{}", event);

        if event.is_terminal() {
            break;
        }
    }

    Ok(())
}
