use std::collections::VecDeque;
use std::f64::consts::TAU;
use std::io::{ErrorKind, Read};
use std::thread;
use std::time::Duration;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serialport::SerialPort;
use crate::drivers::ScopeError;
/// Something that yields the device byte stream one byte at a time.
///
/// Every error is fatal to the data path; implementations retry nothing
/// except what a blocking read would wait out anyway.
pub trait SignalSource {
    fn read_byte(&mut self) -> Result<u8, ScopeError>;
}
/// Byte source over any reader: a serial port, a file, or a `Cursor` in tests.
pub struct ReaderSource<R: Read> {
    reader: R,
}
impl<R: Read> ReaderSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}
impl<R: Read> SignalSource for ReaderSource<R> {
    fn read_byte(&mut self) -> Result<u8, ScopeError> {
        let mut byte = [0u8; 1];
        loop {
            match self.reader.read(&mut byte) {
                Ok(0) => return Err(ScopeError::EndOfStream),
                Ok(_) => return Ok(byte[0]),
                // serial ports surface an idle line as a timeout
                Err(e) if e.kind() == ErrorKind::TimedOut => continue,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}
pub type SerialSource = ReaderSource<Box<dyn SerialPort>>;
/// Maps a requested speed onto the highest standard rate not above it.
pub fn standard_baud(speed: u32) -> u32 {
    match speed {
        0..=19_199 => 9_600,
        19_200..=38_399 => 19_200,
        38_400..=57_599 => 38_400,
        57_600..=115_199 => 57_600,
        _ => 115_200,
    }
}
/// Opens `path` in raw 8N1 mode at the bucketed baud rate.
pub fn open_serial(path: &str, speed: u32) -> Result<SerialSource, ScopeError> {
    let port = serialport::new(path, standard_baud(speed))
        .data_bits(serialport::DataBits::Eight)
        .parity(serialport::Parity::None)
        .stop_bits(serialport::StopBits::One)
        .flow_control(serialport::FlowControl::None)
        .timeout(Duration::from_millis(500))
        .open()?;
    Ok(ReaderSource::new(port))
}
const COMPANION_BYTE: u8 = 0xFF;
/// Synthetic device producing the same wire format as the hardware: a
/// sentinel, then one 3-byte packet per sample of a noisy sine wave.
///
/// The companion byte is sent as `0xFF`, so the `0xFF ? ? 0xFF` search also
/// locks onto a running packet stream after a byte goes missing.
pub struct SimulatedSource {
    pending: VecDeque<u8>,
    rng: StdRng,
    phase: f64,
    phase_step: f64,
    amplitude: f64,
    offset: f64,
    /// Probability that a packet loses its first byte in transit.
    drop_probability: f64,
    pace: Option<Duration>,
}
impl SimulatedSource {
    pub fn new(sample_rate_hz: f64, wave_hz: f64) -> Self {
        Self::with_rng(sample_rate_hz, wave_hz, StdRng::from_entropy())
    }
    pub fn with_rng(sample_rate_hz: f64, wave_hz: f64, rng: StdRng) -> Self {
        let sample_rate_hz = sample_rate_hz.max(1.0);
        let mut source = Self {
            pending: VecDeque::with_capacity(16),
            rng,
            phase: 0.0,
            phase_step: TAU * wave_hz / sample_rate_hz,
            amplitude: 400.0,
            offset: 500.0,
            drop_probability: 0.0,
            pace: Some(Duration::from_secs_f64(1.0 / sample_rate_hz)),
        };
        source.queue_sentinel();
        source
    }
    /// Emits bytes as fast as they are read.
    #[cfg(test)]
    pub fn unpaced(mut self) -> Self {
        self.pace = None;
        self
    }
    pub fn with_drop_probability(mut self, probability: f64) -> Self {
        self.drop_probability = probability.clamp(0.0, 1.0);
        self
    }
    fn queue_sentinel(&mut self) {
        self.pending.extend([0xFF; 4]);
    }
    fn queue_packet(&mut self) {
        let noise: f64 = self.rng.gen_range(-20.0..20.0);
        let value =
            (self.offset + self.amplitude * self.phase.sin() + noise).clamp(0.0, 1000.0) as u16;
        self.phase = (self.phase + self.phase_step) % TAU;
        let [hi, lo] = value.to_be_bytes();
        let bytes = [hi, lo, COMPANION_BYTE];
        if self.rng.gen_bool(self.drop_probability) {
            self.pending.extend(&bytes[1..]);
        } else {
            self.pending.extend(bytes);
        }
    }
}
impl SignalSource for SimulatedSource {
    fn read_byte(&mut self) -> Result<u8, ScopeError> {
        if self.pending.is_empty() {
            if let Some(pace) = self.pace {
                thread::sleep(pace);
            }
            self.queue_packet();
        }
        self.pending.pop_front().ok_or(ScopeError::EndOfStream)
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Cursor};
    /// Reader that hands out a scripted sequence of reads.
    struct Scripted(VecDeque<io::Result<u8>>);
    impl Read for Scripted {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.0.pop_front() {
                Some(Ok(byte)) => {
                    buf[0] = byte;
                    Ok(1)
                }
                Some(Err(e)) => Err(e),
                None => Ok(0),
            }
        }
    }
    #[test]
    fn reader_source_yields_bytes_then_end_of_stream() {
        let mut source = ReaderSource::new(Cursor::new(vec![1u8, 2, 3]));
        assert_eq!(source.read_byte().unwrap(), 1);
        assert_eq!(source.read_byte().unwrap(), 2);
        assert_eq!(source.read_byte().unwrap(), 3);
        assert!(matches!(source.read_byte(), Err(ScopeError::EndOfStream)));
    }
    #[test]
    fn idle_line_is_retried_and_other_errors_are_fatal() {
        let script = VecDeque::from(vec![
            Err(io::Error::new(ErrorKind::TimedOut, "idle")),
            Err(io::Error::new(ErrorKind::Interrupted, "signal")),
            Ok(7),
            Err(io::Error::new(ErrorKind::BrokenPipe, "gone")),
        ]);
        let mut source = ReaderSource::new(Scripted(script));
        assert_eq!(source.read_byte().unwrap(), 7);
        match source.read_byte() {
            Err(ScopeError::Io(e)) => assert_eq!(e.kind(), ErrorKind::BrokenPipe),
            other => panic!("expected io error, got {other:?}"),
        }
    }
    #[test]
    fn baud_rates_snap_to_standard_buckets() {
        assert_eq!(standard_baud(300), 9_600);
        assert_eq!(standard_baud(19_200), 19_200);
        assert_eq!(standard_baud(50_000), 38_400);
        assert_eq!(standard_baud(57_600), 57_600);
        assert_eq!(standard_baud(115_200), 115_200);
        assert_eq!(standard_baud(921_600), 115_200);
    }
    #[test]
    fn simulated_source_starts_with_sentinel() {
        let mut source = SimulatedSource::with_rng(1000.0, 5.0, StdRng::seed_from_u64(7))
            .unpaced()
            .with_drop_probability(0.0);
        let head: Vec<u8> = (0..4).map(|_| source.read_byte().unwrap()).collect();
        assert_eq!(head, vec![0xFF; 4]);
        for _ in 0..50 {
            let hi = source.read_byte().unwrap();
            let lo = source.read_byte().unwrap();
            let pad = source.read_byte().unwrap();
            assert!(u16::from_be_bytes([hi, lo]) <= 1000);
            assert_eq!(pad, 0xFF);
        }
    }
}
