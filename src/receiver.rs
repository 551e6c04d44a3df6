//! Complete receive chain for one channel, from demodulated samples to events.

use std::sync::mpsc::SyncSender;

use log::{debug, info};

use crate::baseband::decode::{Decider, Decoder};
use crate::baseband::timing::SyncCorrelator;
use crate::bits::Dibit;
use crate::consts::{SAMPLE_RATE, SYMBOL_PERIOD, SYNC_LOSS_SYMBOLS};
use crate::data::sequence::PacketSequence;
use crate::error::DecodeError;
use crate::filter::design::{self, Window};
use crate::filter::{CalibrationSet, CalibrationType, DcBlocker, FirFilter, RealFilter};
use crate::gain::{PeakGain, PeakGainConfig};
use crate::message::nid::NetworkId;
use crate::message::receiver::{MessageEvent, MessageReceiver};
use crate::stats::{HasStats, Stats};
use crate::sync::SyncPattern;
use crate::tone::{DcsCode, ToneConfig, ToneDecoder, ToneEvent};

/// Events delivered to a channel's listener, in the order they occur.
#[derive(Clone, Debug, PartialEq)]
pub enum ReceiverEvent {
    /// Gain-normalized copy of an input buffer, delivered before anything decoded from
    /// it.
    Samples(Vec<f32>),
    /// DCS code detected or lost.
    Tone(ToneEvent),
    /// Frame sync was found.
    SyncDetected {
        pattern: SyncPattern,
        bit_errors: u32,
    },
    /// Frame sync hasn't been seen for the given number of symbols.
    SyncLost {
        symbols: usize,
    },
    /// NID of a received data unit.
    DataUnit(NetworkId),
    /// A complete packet.
    Packet(PacketSequence),
    /// A data unit or packet was dropped.
    Error(DecodeError),
}

impl From<MessageEvent> for ReceiverEvent {
    fn from(e: MessageEvent) -> Self {
        match e {
            MessageEvent::Error(err) => ReceiverEvent::Error(err),
            MessageEvent::SyncDetected { pattern, bit_errors } =>
                ReceiverEvent::SyncDetected { pattern, bit_errors },
            MessageEvent::SyncLost { symbols } => ReceiverEvent::SyncLost { symbols },
            MessageEvent::PacketNid(nid) => ReceiverEvent::DataUnit(nid),
            MessageEvent::Packet(seq) => ReceiverEvent::Packet(seq),
        }
    }
}

/// Receives the events of a channel.
pub trait Listener {
    fn receive(&mut self, event: ReceiverEvent);
}

impl Listener for Vec<ReceiverEvent> {
    fn receive(&mut self, event: ReceiverEvent) {
        self.push(event);
    }
}

/// Blocks while the channel is full. Events are dropped once the receiving end hangs
/// up.
impl Listener for SyncSender<ReceiverEvent> {
    fn receive(&mut self, event: ReceiverEvent) {
        if self.send(event).is_err() {
            debug!("listener disconnected, dropping event");
        }
    }
}

/// Channel receiver parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReceiverConfig {
    pub gain: PeakGainConfig,
    /// DCS decoding of the channel audio, disabled if `None`.
    pub tone: Option<ToneConfig>,
    /// Corner frequency in Hz of the DC blocker ahead of the symbol path, disabled if
    /// `None`.
    pub dc_cutoff: Option<f64>,
    /// Cutoff of the symbol shaping low-pass filter, as a fraction of the sample rate.
    pub symbol_cutoff: f64,
    /// Taps in the symbol shaping filter.
    pub symbol_taps: usize,
    /// Whether to deliver `Samples` events.
    pub emit_samples: bool,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        ReceiverConfig {
            // A per-buffer mean is the local symbol average on short buffers, so offset
            // is left to the DC blocker.
            gain: PeakGainConfig::default().remove_dc(false),
            tone: None,
            dc_cutoff: Some(2.0),
            symbol_cutoff: 0.1,
            symbol_taps: 21,
            emit_samples: true,
        }
    }
}

impl ReceiverConfig {
    pub fn gain(mut self, gain: PeakGainConfig) -> Self {
        self.gain = gain;
        self
    }

    pub fn tone(mut self, tone: ToneConfig) -> Self {
        self.tone = Some(tone);
        self
    }

    pub fn dc_cutoff(mut self, cutoff: Option<f64>) -> Self {
        self.dc_cutoff = cutoff;
        self
    }

    pub fn emit_samples(mut self, emit: bool) -> Self {
        self.emit_samples = emit;
        self
    }
}

/// Receive chain for one channel of demodulated samples at `SAMPLE_RATE`.
///
/// Each buffer passes through the gain stage, then the tone decoder and the symbol path.
/// The symbol path blocks DC and shapes the samples, then searches them for the sync
/// waveform. A correlation peak sets the symbol clock, and symbols are sliced on that
/// clock until the message receiver drops back to searching for sync. Events go to the
/// listener synchronously, in order.
pub struct ChannelReceiver<L: Listener> {
    emit_samples: bool,
    gain: PeakGain,
    tone: Option<ToneDecoder>,
    dc: Option<DcBlocker>,
    filter: FirFilter,
    corr: SyncCorrelator,
    decoder: Decoder,
    /// Whether the symbol clock is running.
    locked: bool,
    /// Samples searched since the last lock.
    unmatched: usize,
    recv: MessageReceiver,
    listener: L,
}

impl<L: Listener> ChannelReceiver<L> {
    pub fn new(config: ReceiverConfig, cal: CalibrationSet, listener: L) -> Self {
        let coefs = design::sinc_lowpass(config.symbol_cutoff, config.symbol_taps,
                                         Window::Hamming);

        let tone = config.tone.map(|t| {
            ToneDecoder::new(t.sample_rate(SAMPLE_RATE as f32), &cal)
        });

        let dc = config.dc_cutoff.map(|c| DcBlocker::from_cutoff(c, SAMPLE_RATE as f64));

        info!("channel receiver: {} symbol filter taps, DC blocker {}, tone decoding {}",
              coefs.len(), if dc.is_some() { "on" } else { "off" },
              if tone.is_some() { "on" } else { "off" });

        ChannelReceiver {
            emit_samples: config.emit_samples,
            gain: PeakGain::new(config.gain),
            tone,
            dc,
            filter: FirFilter::new(&coefs, cal.get(CalibrationType::FirFilter)),
            corr: SyncCorrelator::new(),
            decoder: Decoder::new(Decider::for_peak(config.gain.target), 0),
            locked: false,
            unmatched: 0,
            recv: MessageReceiver::new(),
            listener,
        }
    }

    pub fn listener(&self) -> &L { &self.listener }
    pub fn listener_mut(&mut self) -> &mut L { &mut self.listener }
    pub fn into_listener(self) -> L { self.listener }

    /// Currently detected DCS code, if any.
    pub fn tone_code(&self) -> Option<DcsCode> {
        self.tone.as_ref().and_then(|t| t.code())
    }

    /// Run the given buffer through the receive chain.
    pub fn process(&mut self, samples: &[f32]) {
        let normalized = self.gain.process(samples);

        if self.emit_samples {
            self.listener.receive(ReceiverEvent::Samples(normalized.clone()));
        }

        if let Some(ref mut tone) = self.tone {
            for event in tone.process(&normalized) {
                self.listener.receive(ReceiverEvent::Tone(event));
            }
        }

        let shaped = match self.dc {
            Some(ref mut dc) => self.filter.filter(&dc.filter(&normalized)),
            None => self.filter.filter(&normalized),
        };

        for s in shaped {
            if self.locked {
                self.track(s);
            } else {
                self.search(s);
            }
        }
    }

    /// Look for the sync waveform and start the symbol clock on it.
    fn search(&mut self, s: f32) {
        let lock = match self.corr.feed(s) {
            Some(lock) => lock,
            None => {
                self.unmatched += 1;

                if self.unmatched % (SYNC_LOSS_SYMBOLS * SYMBOL_PERIOD) == 0 {
                    self.listener.receive(ReceiverEvent::SyncLost {
                        symbols: self.unmatched / SYMBOL_PERIOD,
                    });
                }

                return;
            },
        };

        debug!("sync correlation {:.3} at {} samples back", lock.score, lock.age);

        // The next symbol center is one period past the peak.
        self.decoder.align(SYMBOL_PERIOD - lock.age);
        self.recv.resync();

        let sync = self.corr.sync_samples(&lock);
        let decider = *self.decoder.decider();

        for &s in sync.iter() {
            self.deliver(decider.decide(s));
        }

        // Sliced symbols too far from the sync sequence leave the receiver searching.
        self.locked = !self.recv.synchronizing();

        if self.locked {
            self.unmatched = 0;
        }
    }

    /// Slice symbols on the running clock.
    fn track(&mut self, s: f32) {
        self.corr.record(s);

        let dibit = match self.decoder.feed(s) {
            Some(d) => d,
            None => return,
        };

        self.deliver(dibit);

        if self.recv.synchronizing() {
            debug!("symbol clock released");
            self.locked = false;
        }
    }

    fn deliver(&mut self, dibit: Dibit) {
        if let Some(event) = self.recv.feed(dibit) {
            if let MessageEvent::Error(ref err) = event {
                debug!("channel error: {}", err);
            }

            self.listener.receive(event.into());
        }
    }

    /// Return every stage to its initial state.
    pub fn reset(&mut self) {
        self.gain.reset();

        if let Some(ref mut tone) = self.tone {
            tone.reset();
        }

        if let Some(ref mut dc) = self.dc {
            dc.reset();
        }

        self.filter.reset();
        self.corr.reset();
        self.decoder.reset();
        self.locked = false;
        self.unmatched = 0;
        self.recv.resync();
    }
}

impl<L: Listener> HasStats for ChannelReceiver<L> {
    fn stats(&mut self) -> &mut Stats { self.recv.stats() }
}
