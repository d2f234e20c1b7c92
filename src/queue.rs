// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Sliding window over the sample stream.

use crate::sample::{Sample, SampleKind, SampleSource};

// Needs to fit the longest instruction; a TFM sweep that outruns the window
// is consumed in bites by the driver.
pub const DEPTH: usize = 32;

/// A bounded sliding window of bus samples.
///
/// The window is refilled from the source up to [DEPTH] samples, inspected
/// with [head](Self::head) and consumed in instruction-sized bites with
/// [pop](Self::pop). Once the source is exhausted the last sample carried
/// through the window is marked [SampleKind::Last] and the queue never pops
/// past it.
pub struct SampleQueue {
    window: [Sample; DEPTH],
    len: usize,
    exhausted: bool,
}

impl SampleQueue {
    pub fn new() -> Self {
        Self {
            window: [Sample::default(); DEPTH],
            len: 0,
            exhausted: false,
        }
    }

    /// Pulls from the source until the window is full or the source is
    /// exhausted. On exhaustion the final sample is re-tagged as `Last`.
    pub fn fill(&mut self, source: &mut impl SampleSource) {
        while self.len < DEPTH && !self.exhausted {
            match source.next_sample() {
                Some(sample) => {
                    self.window[self.len] = sample;
                    self.len += 1;
                }
                None => {
                    self.exhausted = true;
                    if self.len > 0 {
                        self.window[self.len - 1].kind = SampleKind::Last;
                    }
                }
            }
        }
    }

    /// Non-consuming look-ahead at the first `n.min(len)` samples.
    pub fn head(&self, n: usize) -> &[Sample] {
        &self.window[..n.min(self.len)]
    }

    /// Drops the first `n` samples, shifting the tail left. Popping past the
    /// `Last` sample is clamped to it.
    pub fn pop(&mut self, n: usize) {
        let n = n.min(self.len);
        self.window.copy_within(n..self.len, 0);
        self.len -= n;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True once the source is drained; the remaining window is all there is.
    pub fn at_end(&self) -> bool {
        self.exhausted
    }
}

impl Default for SampleQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::SliceSource;

    fn samples(n: u32) -> Vec<Sample> {
        (0..n)
            .map(|seq| Sample { seq, data: seq as u8, ..Sample::default() })
            .collect()
    }

    #[test]
    fn fill_caps_at_depth() {
        let samples = samples(100);
        let mut source = SliceSource::new(&samples);
        let mut queue = SampleQueue::new();
        queue.fill(&mut source);
        assert_eq!(queue.len(), DEPTH);
        assert_eq!(queue.head(4).iter().map(|s| s.data).collect::<Vec<_>>(), [0, 1, 2, 3]);
    }

    #[test]
    fn pop_shifts_window() {
        let samples = samples(40);
        let mut source = SliceSource::new(&samples);
        let mut queue = SampleQueue::new();
        queue.fill(&mut source);
        queue.pop(5);
        assert_eq!(queue.head(1)[0].data, 5);
        queue.fill(&mut source);
        assert_eq!(queue.len(), DEPTH);
    }

    #[test]
    fn last_sample_is_tagged() {
        let samples = samples(3);
        let mut source = SliceSource::new(&samples);
        let mut queue = SampleQueue::new();
        queue.fill(&mut source);
        assert_eq!(queue.len(), 3);
        assert!(queue.at_end());
        assert!(queue.head(3)[2].is_last());
    }
}
