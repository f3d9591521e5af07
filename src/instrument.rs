use std::string::FromUtf8Error;

/// Errors raised by an instrument-control transport.
#[derive(Debug, thiserror::Error)]
pub enum InstrumentError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] FromUtf8Error),

    #[error("Timeout waiting for a response to '{command}'")]
    Timeout { command: String },
}

/// The instrument-control link the scope driver talks through.
///
/// The WaveSurfer is usually reached over VXI-11 or a raw SCPI socket; this
/// crate does not implement either transport. Any session object that can
/// send a textual command and read back a textual or binary response can
/// drive the scope.
///
/// Responses are expected with the terminator already stripped, the way
/// VXI-11 client libraries hand them back.
pub trait Instrument {
    /// Send one textual command. No response is read.
    fn write(&mut self, command: &str) -> Result<(), InstrumentError>;

    /// Read one textual response.
    fn read(&mut self) -> Result<String, InstrumentError>;

    /// Read one binary response (screenshots, waveform blocks).
    fn read_raw(&mut self) -> Result<Vec<u8>, InstrumentError>;

    /// Send a query and read its textual response.
    fn ask(&mut self, command: &str) -> Result<String, InstrumentError> {
        self.write(command)?;
        self.read()
    }

    /// Send a query and read its binary response.
    fn ask_raw(&mut self, command: &str) -> Result<Vec<u8>, InstrumentError> {
        self.write(command)?;
        self.read_raw()
    }
}

impl<I: Instrument + ?Sized> Instrument for &mut I {
    fn write(&mut self, command: &str) -> Result<(), InstrumentError> {
        (**self).write(command)
    }

    fn read(&mut self) -> Result<String, InstrumentError> {
        (**self).read()
    }

    fn read_raw(&mut self) -> Result<Vec<u8>, InstrumentError> {
        (**self).read_raw()
    }
}
