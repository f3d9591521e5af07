//! Decoder for the WaveSurfer binary waveform transfer format.
//!
//! A waveform download (`Cn:WF?`) answers with an opaque blob: the ASCII
//! marker `WAVEDESC` at some offset, a fixed-layout binary descriptor
//! relative to that marker, and a contiguous run of signed 16-bit samples
//! starting 346 bytes after the marker. The descriptor carries the array
//! bookkeeping plus the gain/offset constants needed to turn raw counts
//! into volts and sample indices into seconds.
//!
//! The byte offsets below are a bit-exact contract for the `CFMT DEF9,
//! WORD, BIN` transfer format of this instrument and are not configurable.

use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

/// ASCII marker that starts the descriptor block.
const MARKER: &[u8] = b"WAVEDESC";

/// Sample payload offset relative to the marker.
const PAYLOAD_OFFSET: usize = 346;

/// Samples are transferred as 16-bit words.
const BYTES_PER_SAMPLE: usize = 2;

// Descriptor field offsets, relative to the marker.
const OFS_ARRAY_BYTE_COUNT_1: usize = 60;
const OFS_ARRAY_BYTE_COUNT_2: usize = 64;
const OFS_INDEX_START: usize = 124;
const OFS_INDEX_LAST_POINT: usize = 128;
const OFS_INDEX_FIRST_POINT: usize = 132;
const OFS_SPARSING_FACTOR: usize = 136;
const OFS_VERTICAL_GAIN: usize = 156;
const OFS_VERTICAL_OFFSET: usize = 160;
const OFS_HORIZONTAL_INTERVAL: usize = 176;
const OFS_HORIZONTAL_OFFSET: usize = 180;

/// Structural invariants a trustworthy descriptor must satisfy.
///
/// A violation indicates a corrupted transfer or a capture mode this
/// decoder does not support (multi-array or interleaved data).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RecordViolation {
    #[error("secondary sample array present ({0} bytes), only single-array captures are supported")]
    SecondaryArrayPresent(u32),

    #[error("first valid data index is {0}, expected 0")]
    NonzeroIndexStart(u32),

    #[error("first point index is {0}, expected 0")]
    NonzeroFirstPoint(u32),

    #[error("primary array byte count {0} is odd, samples are 16-bit words")]
    OddByteCount(u32),

    #[error("byte count declares {declared} samples but the point indices describe {expected}")]
    SampleCountMismatch { declared: u32, expected: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WaveformError {
    #[error("WAVEDESC marker not found in capture buffer")]
    MarkerNotFound,

    #[error("capture buffer truncated: descriptor needs {needed} bytes after the marker, got {available}")]
    TruncatedHeader { needed: usize, available: usize },

    #[error("invalid waveform record: {0}")]
    InvalidRecord(#[from] RecordViolation),

    #[error("sample payload too short: descriptor declares {needed} bytes, got {available}")]
    PayloadTooShort { needed: usize, available: usize },
}

/// The descriptor fields material to decoding one channel's capture.
///
/// Counts and indices are little-endian `u32`, the vertical constants and
/// the horizontal interval little-endian `f32`, the horizontal offset a
/// little-endian `f64`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaveformDescriptor {
    /// Total bytes of the primary sample array.
    pub array_byte_count_1: u32,
    /// Bytes of the secondary array; zero for the captures we support.
    pub array_byte_count_2: u32,
    /// Starting index of valid data.
    pub index_start: u32,
    /// Last valid sample index.
    pub index_last_point: u32,
    /// Index of the first transferred point.
    pub index_first_point: u32,
    /// Stride the instrument applied between stored points.
    pub sparsing_factor: u32,
    /// Volts per raw count.
    pub vertical_gain: f32,
    /// Volts subtracted after gain.
    pub vertical_offset: f32,
    /// Nominal seconds per raw sample before sparsing.
    pub horizontal_interval: f32,
    /// Seconds at the first retained sample.
    pub horizontal_offset: f64,
}

impl WaveformDescriptor {
    /// Number of 16-bit samples in the primary array.
    pub fn sample_count(&self) -> usize {
        (self.array_byte_count_1 / 2) as usize
    }

    /// Sparsing factor with the template's "0 means no sparsing" folded in.
    fn effective_sparsing(&self) -> u32 {
        self.sparsing_factor.max(1)
    }

    /// Seconds between two retained samples.
    pub fn time_step(&self) -> f64 {
        f64::from(self.horizontal_interval) * f64::from(self.effective_sparsing())
    }

    fn extract(record: &[u8]) -> Self {
        Self {
            array_byte_count_1: LittleEndian::read_u32(&record[OFS_ARRAY_BYTE_COUNT_1..]),
            array_byte_count_2: LittleEndian::read_u32(&record[OFS_ARRAY_BYTE_COUNT_2..]),
            index_start: LittleEndian::read_u32(&record[OFS_INDEX_START..]),
            index_last_point: LittleEndian::read_u32(&record[OFS_INDEX_LAST_POINT..]),
            index_first_point: LittleEndian::read_u32(&record[OFS_INDEX_FIRST_POINT..]),
            sparsing_factor: LittleEndian::read_u32(&record[OFS_SPARSING_FACTOR..]),
            vertical_gain: LittleEndian::read_f32(&record[OFS_VERTICAL_GAIN..]),
            vertical_offset: LittleEndian::read_f32(&record[OFS_VERTICAL_OFFSET..]),
            horizontal_interval: LittleEndian::read_f32(&record[OFS_HORIZONTAL_INTERVAL..]),
            horizontal_offset: LittleEndian::read_f64(&record[OFS_HORIZONTAL_OFFSET..]),
        }
    }

    fn validate(&self) -> Result<(), RecordViolation> {
        if self.array_byte_count_2 != 0 {
            return Err(RecordViolation::SecondaryArrayPresent(self.array_byte_count_2));
        }
        if self.index_start != 0 {
            return Err(RecordViolation::NonzeroIndexStart(self.index_start));
        }
        if self.index_first_point != 0 {
            return Err(RecordViolation::NonzeroFirstPoint(self.index_first_point));
        }
        if self.array_byte_count_1 % 2 != 0 {
            return Err(RecordViolation::OddByteCount(self.array_byte_count_1));
        }

        let declared = self.array_byte_count_1 / 2;
        let expected = self.index_last_point / self.effective_sparsing() + 1;
        if declared != expected {
            return Err(RecordViolation::SampleCountMismatch { declared, expected });
        }

        Ok(())
    }
}

/// A located and validated waveform record, borrowing the capture buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveformRecord<'a> {
    pub descriptor: WaveformDescriptor,
    payload: &'a [u8],
}

impl<'a> WaveformRecord<'a> {
    /// Locate the `WAVEDESC` marker in `raw`, extract the descriptor fields
    /// at their fixed offsets and check the structural invariants.
    ///
    /// Pure function of the buffer; decoding the same bytes twice yields
    /// identical records.
    pub fn decode(raw: &'a [u8]) -> Result<Self, WaveformError> {
        let start = find_marker(raw).ok_or(WaveformError::MarkerNotFound)?;
        let record = &raw[start..];

        if record.len() < PAYLOAD_OFFSET {
            return Err(WaveformError::TruncatedHeader {
                needed: PAYLOAD_OFFSET,
                available: record.len(),
            });
        }

        let descriptor = WaveformDescriptor::extract(record);
        descriptor.validate()?;

        log::trace!(
            "decoded waveform descriptor at offset {start}: {} samples, sparsing {}",
            descriptor.sample_count(),
            descriptor.sparsing_factor
        );

        Ok(Self {
            descriptor,
            payload: &record[PAYLOAD_OFFSET..],
        })
    }

    /// Raw sample payload, from the fixed payload offset to the end of the
    /// capture buffer.
    pub fn payload(&self) -> &'a [u8] {
        self.payload
    }

    /// Scale this record into physical units. See [`scale`].
    pub fn scale(&self, skip: u32) -> Result<DecodedWaveform, WaveformError> {
        scale(&self.descriptor, self.payload, skip)
    }
}

/// One channel's capture in physical units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedWaveform {
    pub sample_count: usize,
    /// Seconds, one entry per sample.
    pub time: Vec<f64>,
    /// Volts, one entry per sample, index 0 first.
    pub voltage: Vec<f64>,
}

/// Produce physical time and voltage sequences from a validated descriptor
/// and the raw sample payload.
///
/// Voltage is `raw * vertical_gain - vertical_offset`, time is
/// `index * horizontal_interval * sparsing + horizontal_offset`. All
/// arithmetic runs in `f64` even though the stored constants are narrower,
/// so offsets stay precise over large sample counts.
///
/// `skip` is the stride that was requested of the instrument before the
/// download. The instrument applies it before transferring, so the
/// descriptor's sparsing factor already reflects it; the value is only
/// echoed here for logging.
pub fn scale(
    descriptor: &WaveformDescriptor,
    payload: &[u8],
    skip: u32,
) -> Result<DecodedWaveform, WaveformError> {
    let sample_count = descriptor.sample_count();
    let needed = sample_count * BYTES_PER_SAMPLE;

    if payload.len() < needed {
        return Err(WaveformError::PayloadTooShort {
            needed,
            available: payload.len(),
        });
    }

    log::debug!(
        "scaling {sample_count} samples (requested sparsing {skip}, stored sparsing {})",
        descriptor.sparsing_factor
    );

    let mut samples = vec![0i16; sample_count];
    LittleEndian::read_i16_into(&payload[..needed], &mut samples);

    let gain = f64::from(descriptor.vertical_gain);
    let offset = f64::from(descriptor.vertical_offset);
    let voltage: Vec<f64> = samples
        .iter()
        .map(|&raw| f64::from(raw) * gain - offset)
        .collect();

    let step = descriptor.time_step();
    let origin = descriptor.horizontal_offset;
    let time: Vec<f64> = (0..sample_count)
        .map(|index| index as f64 * step + origin)
        .collect();

    Ok(DecodedWaveform {
        sample_count,
        time,
        voltage,
    })
}

fn find_marker(raw: &[u8]) -> Option<usize> {
    raw.windows(MARKER.len()).position(|window| window == MARKER)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a synthetic capture buffer: `leading` junk bytes, the marker,
    /// a zeroed descriptor with the given constants, then the samples.
    fn make_capture(
        leading: usize,
        samples: &[i16],
        sparsing: u32,
        gain: f32,
        v_offset: f32,
        interval: f32,
        h_offset: f64,
    ) -> Vec<u8> {
        let mut buf = vec![0xAAu8; leading];
        let marker = buf.len();
        buf.extend_from_slice(MARKER);
        buf.resize(marker + PAYLOAD_OFFSET, 0);

        let count = samples.len() as u32;
        put_u32(&mut buf, marker + OFS_ARRAY_BYTE_COUNT_1, count * 2);
        put_u32(&mut buf, marker + OFS_INDEX_LAST_POINT, (count - 1) * sparsing.max(1));
        put_u32(&mut buf, marker + OFS_SPARSING_FACTOR, sparsing);
        LittleEndian::write_f32(&mut buf[marker + OFS_VERTICAL_GAIN..][..4], gain);
        LittleEndian::write_f32(&mut buf[marker + OFS_VERTICAL_OFFSET..][..4], v_offset);
        LittleEndian::write_f32(&mut buf[marker + OFS_HORIZONTAL_INTERVAL..][..4], interval);
        LittleEndian::write_f64(&mut buf[marker + OFS_HORIZONTAL_OFFSET..][..8], h_offset);

        for sample in samples {
            buf.extend_from_slice(&sample.to_le_bytes());
        }
        buf
    }

    fn put_u32(buf: &mut [u8], offset: usize, value: u32) {
        LittleEndian::write_u32(&mut buf[offset..offset + 4], value);
    }

    fn default_capture() -> Vec<u8> {
        make_capture(16, &[0, 10, -10], 2, 2.0, 1.0, 1e-9, 5e-9)
    }

    #[test]
    fn test_decode_then_scale_lengths_agree() {
        let raw = default_capture();
        let record = WaveformRecord::decode(&raw).unwrap();
        let decoded = record.scale(2).unwrap();

        assert_eq!(record.descriptor.sample_count(), 3);
        assert_eq!(decoded.sample_count, 3);
        assert_eq!(decoded.time.len(), 3);
        assert_eq!(decoded.voltage.len(), 3);
    }

    #[test]
    fn test_voltage_scaling() {
        let raw = default_capture();
        let decoded = WaveformRecord::decode(&raw).unwrap().scale(2).unwrap();
        assert_eq!(decoded.voltage, vec![-1.0, 19.0, -21.0]);
    }

    #[test]
    fn test_time_axis() {
        let raw = default_capture();
        let decoded = WaveformRecord::decode(&raw).unwrap().scale(2).unwrap();

        for (actual, expected) in decoded.time.iter().zip([5e-9, 7e-9, 9e-9]) {
            assert!((actual - expected).abs() < 1e-18, "{actual} != {expected}");
        }
    }

    #[test]
    fn test_decode_is_idempotent() {
        let raw = default_capture();
        let first = WaveformRecord::decode(&raw).unwrap().scale(2).unwrap();
        let second = WaveformRecord::decode(&raw).unwrap().scale(2).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_marker_offset_independence() {
        let at_zero = make_capture(0, &[7, -7, 300], 1, 0.5, 0.25, 2e-6, -1e-3);
        let shifted = make_capture(123, &[7, -7, 300], 1, 0.5, 0.25, 2e-6, -1e-3);

        let a = WaveformRecord::decode(&at_zero).unwrap().scale(0).unwrap();
        let b = WaveformRecord::decode(&shifted).unwrap().scale(0).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_marker_not_found() {
        let raw = vec![0u8; 512];
        assert_eq!(
            WaveformRecord::decode(&raw).unwrap_err(),
            WaveformError::MarkerNotFound
        );
    }

    #[test]
    fn test_truncated_header() {
        let mut raw = default_capture();
        raw.truncate(16 + 100);

        assert_eq!(
            WaveformRecord::decode(&raw).unwrap_err(),
            WaveformError::TruncatedHeader {
                needed: PAYLOAD_OFFSET,
                available: 100,
            }
        );
    }

    #[test]
    fn test_secondary_array_rejected() {
        let mut raw = default_capture();
        put_u32(&mut raw, 16 + OFS_ARRAY_BYTE_COUNT_2, 64);

        assert_eq!(
            WaveformRecord::decode(&raw).unwrap_err(),
            WaveformError::InvalidRecord(RecordViolation::SecondaryArrayPresent(64))
        );
    }

    #[test]
    fn test_nonzero_index_start_rejected() {
        let mut raw = default_capture();
        put_u32(&mut raw, 16 + OFS_INDEX_START, 1);

        assert_eq!(
            WaveformRecord::decode(&raw).unwrap_err(),
            WaveformError::InvalidRecord(RecordViolation::NonzeroIndexStart(1))
        );
    }

    #[test]
    fn test_nonzero_first_point_rejected() {
        let mut raw = default_capture();
        put_u32(&mut raw, 16 + OFS_INDEX_FIRST_POINT, 4);

        assert_eq!(
            WaveformRecord::decode(&raw).unwrap_err(),
            WaveformError::InvalidRecord(RecordViolation::NonzeroFirstPoint(4))
        );
    }

    #[test]
    fn test_odd_byte_count_rejected() {
        let mut raw = default_capture();
        put_u32(&mut raw, 16 + OFS_ARRAY_BYTE_COUNT_1, 7);

        assert_eq!(
            WaveformRecord::decode(&raw).unwrap_err(),
            WaveformError::InvalidRecord(RecordViolation::OddByteCount(7))
        );
    }

    #[test]
    fn test_sample_count_mismatch_rejected() {
        let mut raw = default_capture();
        // Claims 4 samples while the indices still describe 3.
        put_u32(&mut raw, 16 + OFS_ARRAY_BYTE_COUNT_1, 8);

        assert_eq!(
            WaveformRecord::decode(&raw).unwrap_err(),
            WaveformError::InvalidRecord(RecordViolation::SampleCountMismatch {
                declared: 4,
                expected: 3,
            })
        );
    }

    #[test]
    fn test_sparsing_zero_means_no_sparsing() {
        let raw = make_capture(8, &[1, 2, 3, 4], 0, 1.0, 0.0, 1e-6, 0.0);
        let record = WaveformRecord::decode(&raw).unwrap();
        let decoded = record.scale(0).unwrap();

        assert_eq!(decoded.sample_count, 4);
        assert!((decoded.time[1] - 1e-6).abs() < 1e-15);
    }

    #[test]
    fn test_payload_too_short() {
        let mut raw = default_capture();
        raw.truncate(raw.len() - 3);

        let record = WaveformRecord::decode(&raw).unwrap();
        assert_eq!(
            record.scale(2).unwrap_err(),
            WaveformError::PayloadTooShort {
                needed: 6,
                available: 3,
            }
        );
    }

    #[test]
    fn test_descriptor_fields_extracted() {
        let raw = default_capture();
        let descriptor = WaveformRecord::decode(&raw).unwrap().descriptor;

        assert_eq!(descriptor.array_byte_count_1, 6);
        assert_eq!(descriptor.array_byte_count_2, 0);
        assert_eq!(descriptor.index_last_point, 4);
        assert_eq!(descriptor.sparsing_factor, 2);
        assert_eq!(descriptor.vertical_gain, 2.0);
        assert_eq!(descriptor.vertical_offset, 1.0);
        assert_eq!(descriptor.horizontal_interval, 1e-9);
        assert_eq!(descriptor.horizontal_offset, 5e-9);
    }
}
