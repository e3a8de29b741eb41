//! Self-synchronizing decoder for the 3-byte sample packets.
//!
//! Packets are `hi, lo, companion`; the sample is `(hi << 8) | lo` and the
//! companion byte is read only to stay aligned. Alignment is found by looking
//! for `0xFF`, skipping two bytes and expecting `0xFF` again, which matches the
//! four-byte all-`0xFF` sentinel. A decoded value of [`MAXVAL`] or more means
//! the stream drifted, so the decoder drops it and searches again.
use log::{debug, trace, warn};
use crate::drivers::source::SignalSource;
use crate::drivers::ScopeError;
/// Exclusive upper bound of a valid amplitude.
pub const MAXVAL: u16 = 1024;
pub const SENTINEL_BYTE: u8 = 0xFF;
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncState {
    Searching,
    Locked,
}
pub struct FrameSync<S: SignalSource> {
    source: S,
    state: SyncState,
    resyncs: u64,
}
impl<S: SignalSource> FrameSync<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            state: SyncState::Searching,
            resyncs: 0,
        }
    }
    pub fn state(&self) -> SyncState {
        self.state
    }
    /// Times the decoder fell out of lock on an out-of-range value.
    pub fn resyncs(&self) -> u64 {
        self.resyncs
    }
    /// Blocks until the next valid sample. Read failures are returned as-is
    /// and leave the decoder unusable.
    pub fn next_sample(&mut self) -> Result<u16, ScopeError> {
        loop {
            match self.state {
                SyncState::Searching => self.find_sentinel()?,
                SyncState::Locked => {
                    let value = self.read_packet()?;
                    if value < MAXVAL {
                        return Ok(value);
                    }
                    self.resyncs += 1;
                    warn!("value {value} out of range, resynchronizing");
                    self.state = SyncState::Searching;
                }
            }
        }
    }
    fn find_sentinel(&mut self) -> Result<(), ScopeError> {
        loop {
            if self.source.read_byte()? != SENTINEL_BYTE {
                continue;
            }
            // the middle two bytes are not checked
            self.source.read_byte()?;
            self.source.read_byte()?;
            if self.source.read_byte()? == SENTINEL_BYTE {
                debug!("sentinel found, stream locked");
                self.state = SyncState::Locked;
                return Ok(());
            }
        }
    }
    fn read_packet(&mut self) -> Result<u16, ScopeError> {
        let hi = self.source.read_byte()?;
        let lo = self.source.read_byte()?;
        let companion = self.source.read_byte()?;
        trace!("{hi} {lo} ... {companion}");
        Ok(u16::from_be_bytes([hi, lo]))
    }
}
