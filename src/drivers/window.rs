use crate::drivers::buffer::SampleRing;
/// Index range `[start, end)` of the ring selected for one render pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindowRange {
    pub start: usize,
    pub end: usize,
    pub len: usize,
}
/// Finds the samples, starting at `head`, whose timestamps lie less than
/// `span_us` after the head sample.
///
/// `end` is the first sample at or past the threshold, or `tail` when the
/// window is not full yet. Returns `None` for an empty ring.
pub fn select_window(ring: &SampleRing, span_us: u64) -> Option<WindowRange> {
    if ring.is_empty() {
        return None;
    }
    let start = ring.head();
    let threshold = ring.timestamp(start).saturating_add(span_us);
    let mut end = ring.next_index(start);
    while end != ring.tail() && ring.timestamp(end) < threshold {
        end = ring.next_index(end);
    }
    Some(WindowRange {
        start,
        end,
        len: ring.snapshot_range(end),
    })
}
#[cfg(test)]
mod tests {
    use super::*;
    fn ring_with(timestamps: &[u64], capacity: usize) -> SampleRing {
        let mut ring = SampleRing::with_capacity(capacity).unwrap();
        for (i, &ts) in timestamps.iter().enumerate() {
            ring.push(i as u16, ts);
        }
        ring
    }
    #[test]
    fn empty_ring_selects_nothing() {
        let ring = SampleRing::with_capacity(4).unwrap();
        assert_eq!(select_window(&ring, 1_000), None);
    }
    #[test]
    fn stops_at_first_sample_past_window() {
        let ring = ring_with(&[0, 100, 250, 400, 600, 1200], 16);
        let range = select_window(&ring, 1_000).unwrap();
        assert_eq!(range.start, 0);
        assert_eq!(range.end, 5);
        assert_eq!(ring.timestamp(range.end), 1200);
        assert_eq!(range.len, 5);
    }
    #[test]
    fn partial_window_ends_at_tail() {
        let ring = ring_with(&[0, 100, 250], 16);
        let range = select_window(&ring, 1_000).unwrap();
        assert_eq!(range.end, ring.tail());
        assert_eq!(range.len, 3);
    }
    #[test]
    fn single_sample_window() {
        let ring = ring_with(&[500], 4);
        let range = select_window(&ring, 1_000).unwrap();
        assert_eq!(range.len, 1);
        assert_eq!(range.end, ring.tail());
    }
    #[test]
    fn window_wraps_around_the_ring() {
        // capacity 6 after 8 pushes: head = 3, tail = 2
        let ring = ring_with(&[0, 10, 20, 30, 40, 50, 60, 70], 6);
        assert_eq!(ring.head(), 3);
        let range = select_window(&ring, 35).unwrap();
        // threshold 65: samples 30, 40, 50, 60 selected; 70 at index 1 ends it
        assert_eq!(range.end, 1);
        assert_eq!(range.len, 4);
    }
}
