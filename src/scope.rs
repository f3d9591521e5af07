use crate::instrument::{Instrument, InstrumentError};
use crate::scope_config::{ChannelId, ScopeConfig};
use crate::waveform::{DecodedWaveform, WaveformError, WaveformRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Command stream that puts the scope into a known state.
const RESET_SEQUENCE: [&str; 13] = [
    "*RST",
    "*CLS",
    "CLSW",
    "COMB AUTO",
    "CRMS OFF",
    "CRS OFF",
    "DISP ON",
    "GRID SINGLE",
    "OFCT VOLTS",
    "PACL",
    "ACAL OFF",
    "CFMT DEF9, WORD, BIN",
    "CHDR SHORT",
];

#[derive(Debug, thiserror::Error)]
pub enum ScopeError {
    #[error("instrument error: {0}")]
    Instrument(#[from] InstrumentError),

    #[error(transparent)]
    Waveform(#[from] WaveformError),

    #[error("auto calibration failed, scope answered '{response}'")]
    CalibrationFailed { response: String },

    #[error("unrecognized trigger status response '{response}'")]
    UnknownTriggerStatus { response: String },
}

/// Instrument-side acquisition state, as reported by `TRMD?`.
///
/// A completed capture is only available for download once the trigger has
/// stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerStatus {
    Stopped,
    Single,
    Normal,
    Auto,
}

/// One channel's slice of a waveform download.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelCapture {
    /// Human-readable `WAVEDESC` inspection text, passed through unchanged.
    pub header: String,
    pub decoded: DecodedWaveform,
}

/// The assembled result of [`WaveSurfer::waveform`].
///
/// `ok` is false (and `data` empty) when the trigger was still running or
/// no configuration had been applied; the echoed configuration and `skip`
/// are filled in either way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveformDownload {
    /// The configuration in effect at download time, if any was applied.
    pub config: Option<ScopeConfig>,
    /// The decimation stride that was requested of the instrument.
    pub skip: u32,
    /// Opaque waveform template text (`TMPL?` response).
    pub template: Option<String>,
    pub data: Option<BTreeMap<ChannelId, ChannelCapture>>,
    pub ok: bool,
}

/// `%e`-style float formatting for VBS command literals.
struct Sci(f64);

impl fmt::Display for Sci {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:e}", self.0)
    }
}

fn vbs_bool(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

/// Driver for a LeCroy WaveSurfer oscilloscope.
///
/// Owns the instrument-control session for its whole lifetime: construct it
/// with [`WaveSurfer::open`], get the transport back with
/// [`WaveSurfer::close`].
pub struct WaveSurfer<I: Instrument> {
    instrument: I,
    config: Option<ScopeConfig>,
}

impl<I: Instrument> WaveSurfer<I> {
    /// Take ownership of the session and reset the scope to a known state.
    pub fn open(instrument: I) -> Result<Self, ScopeError> {
        let mut scope = Self {
            instrument,
            config: None,
        };
        scope.reset_config()?;
        Ok(scope)
    }

    /// Release the session handle.
    pub fn close(self) -> I {
        self.instrument
    }

    /// The configuration last applied through [`Self::apply_config`].
    pub fn config(&self) -> Option<&ScopeConfig> {
        self.config.as_ref()
    }

    /// Reset the scope configuration and remove all traces.
    pub fn reset_config(&mut self) -> Result<(), ScopeError> {
        log::debug!("resetting scope configuration");

        for command in RESET_SEQUENCE {
            self.instrument.write(command)?;
        }
        for channel in ChannelId::ALL {
            self.instrument.write(&format!("{channel}:TRA OFF"))?;
        }
        self.config = None;

        self.force()
    }

    /// Configure the channels, the timebase, and the trigger, then force a
    /// first trigger event.
    pub fn apply_config(&mut self, config: &ScopeConfig) -> Result<(), ScopeError> {
        self.reset_config()?;

        // Timebase, time offset, and sample storage.
        self.vbs_set("app.Acquisition.Horizontal.HorScale", Sci(config.time.div))?;
        self.vbs_set(
            "app.Acquisition.Horizontal.HorOffsetOrigin",
            Sci(config.time.offset_origin),
        )?;
        self.vbs_set("app.Acquisition.Horizontal.HorOffset", Sci(config.time.offset))?;
        self.vbs_set(
            "app.Acquisition.Horizontal.MaxSamples",
            Sci(config.time.max_samples),
        )?;
        self.vbs_set("app.Acquisition.Horizontal.ReferenceClock", "INT")?;
        self.vbs_set("app.Acquisition.Horizontal.SampleClock", "INT")?;

        for (channel, settings) in &config.channel {
            self.vbs_set_bare(&format!("app.Acquisition.{channel}.View"), "True")?;
            self.vbs_set(
                &format!("app.Acquisition.{channel}.InterpolateType"),
                "Linear",
            )?;
            self.vbs_set(
                &format!("app.Acquisition.{channel}.BandwidthLimit"),
                settings.bandwidth.as_str(),
            )?;
            self.vbs_set(
                &format!("app.Acquisition.{channel}.Coupling"),
                settings.coupling.as_str(),
            )?;
            self.vbs_set(
                &format!("app.Acquisition.{channel}.EnhanceResType"),
                settings.filter.as_str(),
            )?;
            self.vbs_set_bare(
                &format!("app.Acquisition.{channel}.Invert"),
                vbs_bool(settings.invert),
            )?;
            self.vbs_set(&format!("app.Acquisition.{channel}.Deskew"), Sci(settings.skew))?;
            self.vbs_set(
                &format!("app.Acquisition.{channel}.ProbeAttenuation"),
                Sci(settings.attenuation),
            )?;
            self.vbs_set(&format!("app.Acquisition.{channel}.VerScale"), Sci(settings.div))?;
            self.vbs_set(
                &format!("app.Acquisition.{channel}.VerOffset"),
                Sci(settings.offset),
            )?;
        }

        let trigger = &config.trigger;
        let source = trigger.channel;
        self.vbs_set("app.Acquisition.Trigger.Source", source.as_str())?;
        self.vbs_set("app.Acquisition.Trigger.Type", "edge")?;
        self.vbs_set(
            &format!("app.Acquisition.Trigger.{source}.Slope"),
            trigger.edge.as_str(),
        )?;
        self.vbs_set(
            &format!("app.Acquisition.Trigger.{source}.Coupling"),
            trigger.coupling.as_str(),
        )?;
        self.vbs_set(
            &format!("app.Acquisition.Trigger.{source}.Level"),
            Sci(trigger.level),
        )?;
        self.vbs_set(
            &format!("app.Acquisition.Trigger.{source}.WindowSize"),
            Sci(trigger.window),
        )?;

        self.config = Some(config.clone());
        self.force()
    }

    /// Force the auto calibration and check it passed.
    pub fn calibrate(&mut self) -> Result<(), ScopeError> {
        let response = self.instrument.ask("*CAL?")?;
        if response != "*CAL 0" {
            return Err(ScopeError::CalibrationFailed { response });
        }
        Ok(())
    }

    /// Activate the buzzer.
    pub fn buzz(&mut self) -> Result<(), ScopeError> {
        self.instrument.write("BUZZ BEEP")?;
        Ok(())
    }

    /// Arm a single-shot acquisition.
    pub fn single(&mut self) -> Result<(), ScopeError> {
        self.instrument.write("TRMD SINGLE")?;
        Ok(())
    }

    /// Stop acquiring.
    pub fn stop(&mut self) -> Result<(), ScopeError> {
        self.instrument.write("TRMD STOP")?;
        Ok(())
    }

    /// Normal trigger mode.
    pub fn normal(&mut self) -> Result<(), ScopeError> {
        self.instrument.write("TRMD NORM")?;
        Ok(())
    }

    /// Automatic trigger mode.
    pub fn auto(&mut self) -> Result<(), ScopeError> {
        self.instrument.write("TRMD AUTO")?;
        Ok(())
    }

    /// Arm single-shot and force a trigger event.
    pub fn force(&mut self) -> Result<(), ScopeError> {
        self.instrument.write("TRMD SINGLE")?;
        self.instrument.write("FRTR")?;
        Ok(())
    }

    /// Query the trigger status.
    pub fn trigger_status(&mut self) -> Result<TriggerStatus, ScopeError> {
        let response = self.instrument.ask("TRMD?")?;
        match response.as_str() {
            "TRMD STOP" => Ok(TriggerStatus::Stopped),
            "TRMD SINGLE" => Ok(TriggerStatus::Single),
            "TRMD NORM" => Ok(TriggerStatus::Normal),
            "TRMD AUTO" => Ok(TriggerStatus::Auto),
            _ => Err(ScopeError::UnknownTriggerStatus { response }),
        }
    }

    /// Take a screenshot, returning the PNG file content unchanged.
    pub fn screenshot(&mut self) -> Result<Vec<u8>, ScopeError> {
        self.instrument.write(
            "HCSU DEV, PNG, FORMAT,PORTRAIT, BCKG, WHITE, DEST, REMOTE, PORT, NET, AREA,GRIDAREAONLY",
        )?;
        let png = self.instrument.ask_raw("SCDP")?;
        Ok(png)
    }

    /// Download and decode the waveform data of every configured channel.
    ///
    /// `skip` asks the instrument to transfer only every `skip`-th stored
    /// point. Data is only downloaded when the trigger has stopped and a
    /// configuration has been applied; otherwise the response comes back
    /// with `ok: false` and no data. A decode failure on any channel aborts
    /// the whole download.
    pub fn waveform(&mut self, skip: u32) -> Result<WaveformDownload, ScopeError> {
        let status = self.trigger_status()?;

        let mut download = WaveformDownload {
            config: self.config.clone(),
            skip,
            template: None,
            data: None,
            ok: false,
        };

        let Some(config) = self.config.clone() else {
            log::debug!("no configuration applied, skipping waveform download");
            return Ok(download);
        };
        if status != TriggerStatus::Stopped {
            log::debug!("trigger status is {status:?}, skipping waveform download");
            return Ok(download);
        }

        // Opaque text template describing the transfer format.
        download.template = Some(self.instrument.ask("TMPL?")?);

        self.instrument
            .write(&format!("WFSU SP, {skip}, NP, 0, FP, 0, SN, 0"))?;

        let mut data = BTreeMap::new();
        for channel in config.channel.keys().copied() {
            let header = self
                .instrument
                .ask(&format!("{channel}:INSP? 'WAVEDESC'"))?;
            let raw = self.instrument.ask_raw(&format!("{channel}:WF?"))?;

            let record = WaveformRecord::decode(&raw)?;
            let decoded = record.scale(skip)?;
            log::debug!(
                "channel {channel}: decoded {} samples",
                decoded.sample_count
            );

            data.insert(channel, ChannelCapture { header, decoded });
        }

        download.data = Some(data);
        download.ok = true;
        Ok(download)
    }

    fn vbs_set(&mut self, path: &str, value: impl fmt::Display) -> Result<(), ScopeError> {
        self.instrument
            .write(&format!("VBS \"{path} = \"\"{value}\""))?;
        Ok(())
    }

    /// VBS assignment without the inner quoting, for boolean literals.
    fn vbs_set_bare(&mut self, path: &str, value: &str) -> Result<(), ScopeError> {
        self.instrument.write(&format!("VBS \"{path} = {value}"))?;
        Ok(())
    }
}
