// Full capture flow against a live scope
//
// Connects to a WaveSurfer through its raw SCPI socket, applies a simple
// one-channel configuration, arms a single-shot acquisition, waits for the
// trigger to stop, and downloads the waveform data of channel 1.
//
// The raw-socket transport below is a stand-in; any VXI-11 client that
// implements the `Instrument` trait works the same way.

use clap::Parser;
use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpStream;
use std::thread;
use std::time::Duration;
use wavesurfer_rs::{
    Bandwidth, ChannelConfig, ChannelId, Coupling, EnhanceRes, Instrument, InstrumentError,
    ScopeConfig, TimebaseConfig, TriggerCoupling, TriggerEdge, TriggerSettings, TriggerStatus,
    WaveSurfer,
};

#[derive(Parser)]
#[command(about = "Capture one waveform from a WaveSurfer oscilloscope")]
struct Args {
    /// Scope host name or IP address
    host: String,

    /// SCPI raw socket port
    #[arg(long, default_value_t = 5025)]
    port: u16,

    /// Transfer only every n-th stored sample (0 = all)
    #[arg(long, default_value_t = 0)]
    skip: u32,
}

struct SocketInstrument {
    reader: BufReader<TcpStream>,
}

impl SocketInstrument {
    fn connect(host: &str, port: u16) -> std::io::Result<Self> {
        let stream = TcpStream::connect((host, port))?;
        stream.set_read_timeout(Some(Duration::from_secs(5)))?;
        Ok(Self {
            reader: BufReader::new(stream),
        })
    }
}

impl Instrument for SocketInstrument {
    fn write(&mut self, command: &str) -> Result<(), InstrumentError> {
        log::debug!("-> {command}");
        let stream = self.reader.get_mut();
        stream.write_all(command.as_bytes())?;
        stream.write_all(b"\n")?;
        Ok(())
    }

    fn read(&mut self) -> Result<String, InstrumentError> {
        let mut line = String::new();
        self.reader
            .read_line(&mut line)
            .map_err(InstrumentError::Io)?;
        Ok(line.trim_end().to_string())
    }

    fn read_raw(&mut self) -> Result<Vec<u8>, InstrumentError> {
        // Binary responses have no terminator; read until the socket goes
        // quiet for one timeout period.
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            match self.reader.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => buf.extend_from_slice(&chunk[..n]),
                Err(e)
                    if e.kind() == std::io::ErrorKind::WouldBlock
                        || e.kind() == std::io::ErrorKind::TimedOut =>
                {
                    if buf.is_empty() {
                        return Err(InstrumentError::Io(e));
                    }
                    break;
                }
                Err(e) => return Err(InstrumentError::Io(e)),
            }
        }
        Ok(buf)
    }
}

fn demo_config() -> ScopeConfig {
    let mut channel = BTreeMap::new();
    channel.insert(
        ChannelId::C1,
        ChannelConfig {
            bandwidth: Bandwidth::Full,
            coupling: Coupling::Dc1M,
            filter: EnhanceRes::None,
            invert: false,
            skew: 0.0,
            attenuation: 10.0,
            div: 0.5,
            offset: 0.0,
        },
    );

    ScopeConfig {
        time: TimebaseConfig {
            div: 1e-3,
            offset_origin: 0.0,
            offset: 0.0,
            max_samples: 1e6,
        },
        channel,
        trigger: TriggerSettings {
            channel: ChannelId::C1,
            edge: TriggerEdge::Positive,
            coupling: TriggerCoupling::Dc,
            level: 0.2,
            window: 0.0,
        },
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    println!("Connecting to {}:{}", args.host, args.port);
    let transport = SocketInstrument::connect(&args.host, args.port)?;
    let mut scope = WaveSurfer::open(transport)?;
    println!("Connected and reset\n");

    scope.apply_config(&demo_config())?;
    println!("Configuration applied, arming single-shot trigger");
    scope.single()?;

    while scope.trigger_status()? != TriggerStatus::Stopped {
        thread::sleep(Duration::from_millis(200));
    }
    println!("Trigger stopped, downloading waveform\n");

    let download = scope.waveform(args.skip)?;
    if let Some(data) = &download.data {
        for (channel, capture) in data {
            let decoded = &capture.decoded;
            let max = decoded
                .voltage
                .iter()
                .fold(f64::NEG_INFINITY, |a, &b| a.max(b));
            println!(
                "{channel}: {} samples, {:.3e} s/sample, peak {max:.3}V",
                decoded.sample_count,
                decoded.time.get(1).copied().unwrap_or_default()
                    - decoded.time.first().copied().unwrap_or_default()
            );
        }

        let json = serde_json::to_string(&download)?;
        std::fs::write("waveform.json", json)?;
        println!("\nSaved download to waveform.json");
    } else {
        println!("No data downloaded (ok = {})", download.ok);
    }

    scope.close();
    Ok(())
}
