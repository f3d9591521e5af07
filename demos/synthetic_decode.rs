// Offline decoding of a synthesized waveform capture
//
// Builds the binary blob a WaveSurfer would answer to `C1:WF?` with and runs
// it through the descriptor decoder and the scaler. Useful to inspect the
// decoder without an instrument on the network.

use byteorder::{ByteOrder, LittleEndian};
use wavesurfer_rs::waveform::WaveformRecord;

const SAMPLES: usize = 1000;
const PAYLOAD_OFFSET: usize = 346;

fn synthesize_capture() -> Vec<u8> {
    // A few leading bytes before the marker, like the real response prefix.
    let mut buf = b"C1:WF ALL,#9".to_vec();
    let marker = buf.len();
    buf.extend_from_slice(b"WAVEDESC");
    buf.resize(marker + PAYLOAD_OFFSET, 0);

    // Descriptor: 1000 samples, no sparsing, 0.5 mV/count, 2 ns sample step.
    LittleEndian::write_u32(&mut buf[marker + 60..][..4], SAMPLES as u32 * 2);
    LittleEndian::write_u32(&mut buf[marker + 128..][..4], SAMPLES as u32 - 1);
    LittleEndian::write_u32(&mut buf[marker + 136..][..4], 1);
    LittleEndian::write_f32(&mut buf[marker + 156..][..4], 0.5e-3);
    LittleEndian::write_f32(&mut buf[marker + 160..][..4], 0.1);
    LittleEndian::write_f32(&mut buf[marker + 176..][..4], 2e-9);
    LittleEndian::write_f64(&mut buf[marker + 180..][..8], -1e-6);

    // One period of a sine across the record.
    for index in 0..SAMPLES {
        let phase = index as f64 / SAMPLES as f64 * std::f64::consts::TAU;
        let raw = (phase.sin() * 2000.0) as i16;
        buf.extend_from_slice(&raw.to_le_bytes());
    }
    buf
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    println!("WaveSurfer Synthetic Decode Example");
    println!("===================================\n");

    let raw = synthesize_capture();
    println!("Capture buffer: {} bytes", raw.len());

    let record = WaveformRecord::decode(&raw)?;
    println!("Descriptor: {:#?}", record.descriptor);

    let decoded = record.scale(0)?;
    println!("\nDecoded {} samples", decoded.sample_count);
    println!(
        "Time span: {:.3e} s to {:.3e} s",
        decoded.time.first().copied().unwrap_or_default(),
        decoded.time.last().copied().unwrap_or_default()
    );

    let min = decoded.voltage.iter().fold(f64::INFINITY, |a, &b| a.min(b));
    let max = decoded
        .voltage
        .iter()
        .fold(f64::NEG_INFINITY, |a, &b| a.max(b));
    let mean = decoded.voltage.iter().sum::<f64>() / decoded.voltage.len() as f64;
    println!("Voltage range: {min:.3}V to {max:.3}V (mean: {mean:.3}V)");

    Ok(())
}
