//! # WaveSurfer RS
//!
//! A Rust library for remote controlling a LeCroy WaveSurfer oscilloscope
//! over an instrument-control link.
//!
//! This library provides a typed configuration model for channels, timebase
//! and trigger, drives the instrument through a transport-agnostic session
//! trait, and decodes the scope's binary waveform transfer format into
//! physical time and voltage sequences.
//!
//! ## Features
//!
//! - **Transport-agnostic sessions**: the [`Instrument`] trait covers any
//!   link that can `write` a command and `read` a textual or binary
//!   response (VXI-11, raw SCPI socket, USB-TMC)
//! - **Typed configuration**: closed-set option enums with the exact
//!   instrument spellings, validated at parse time
//! - **Trigger control**: single/normal/auto/stop modes, forced trigger
//!   events, and trigger-status polling
//! - **Waveform decoding**: `WAVEDESC` descriptor extraction with
//!   structural validation, and gain/offset scaling into volts and seconds
//! - **Screenshot download**: PNG screen dumps passed through unchanged
//!
//! ## Examples
//!
//! ### Configure, arm, and download
//!
//! ```rust,no_run
//! use wavesurfer_rs::{Instrument, ScopeConfig, WaveSurfer};
//!
//! # fn connect() -> impl Instrument { struct N; impl Instrument for N {
//! #     fn write(&mut self, _: &str) -> Result<(), wavesurfer_rs::InstrumentError> { Ok(()) }
//! #     fn read(&mut self) -> Result<String, wavesurfer_rs::InstrumentError> { Ok(String::new()) }
//! #     fn read_raw(&mut self) -> Result<Vec<u8>, wavesurfer_rs::InstrumentError> { Ok(Vec::new()) }
//! # } N }
//! # fn load_config() -> ScopeConfig { todo!() }
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // `transport` is any Instrument implementation, e.g. a VXI-11 client.
//! let transport = connect();
//! let config = load_config();
//!
//! let mut scope = WaveSurfer::open(transport)?;
//! scope.apply_config(&config)?;
//! scope.single()?;
//!
//! let download = scope.waveform(0)?;
//! if let Some(data) = &download.data {
//!     for (channel, capture) in data {
//!         println!("{channel}: {} samples", capture.decoded.sample_count);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ### Decoding a capture buffer directly
//!
//! ```rust,no_run
//! use wavesurfer_rs::waveform::WaveformRecord;
//!
//! # fn main() -> Result<(), wavesurfer_rs::WaveformError> {
//! # let raw: Vec<u8> = Vec::new();
//! let record = WaveformRecord::decode(&raw)?;
//! let decoded = record.scale(0)?;
//! assert_eq!(decoded.time.len(), decoded.voltage.len());
//! # Ok(())
//! # }
//! ```

pub mod instrument;
pub mod scope;
pub mod scope_config;
pub mod waveform;

// Re-export the main types for convenience
pub use instrument::{Instrument, InstrumentError};

pub use scope_config::{
    Bandwidth, ChannelConfig, ChannelId, ConfigError, Coupling, EnhanceRes, ScopeConfig,
    TimebaseConfig, TriggerCoupling, TriggerEdge, TriggerSettings,
};

pub use waveform::{
    scale, DecodedWaveform, RecordViolation, WaveformDescriptor, WaveformError, WaveformRecord,
};

pub use scope::{ChannelCapture, ScopeError, TriggerStatus, WaveSurfer, WaveformDownload};
