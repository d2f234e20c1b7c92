// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bus-cycle samples and the sources that produce them.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Whether a sample is an ordinary cycle or the final cycle of the capture.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SampleKind {
    #[default]
    Normal,
    Last,
}

/// A single captured bus cycle.
///
/// Control-line fields are tri-state: `None` means the pin was not wired to
/// the capture, `Some(b)` is the sampled level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Sample {
    pub kind: SampleKind,
    /// Monotonic sample number from the source.
    pub seq: u32,
    /// Data bus value.
    pub data: u8,
    /// Read/not-write.
    pub rnw: Option<bool>,
    /// Last instruction cycle.
    pub lic: Option<bool>,
    /// Bus status.
    pub bs: Option<bool>,
    /// Bus available.
    pub ba: Option<bool>,
    /// Least significant address line.
    pub addr_lsb: Option<bool>,
}

impl Sample {
    /// True when this is the final sample of the capture.
    pub fn is_last(&self) -> bool {
        self.kind == SampleKind::Last
    }
}

/// Pull interface over a capture. The trace driver stops on `None`.
pub trait SampleSource {
    fn next_sample(&mut self) -> Option<Sample>;
}

/// Sample source backed by an in-memory slice, used by tests and benches.
pub struct SliceSource<'a> {
    samples: &'a [Sample],
    pos: usize,
}

impl<'a> SliceSource<'a> {
    pub fn new(samples: &'a [Sample]) -> Self {
        Self { samples, pos: 0 }
    }
}

impl SampleSource for SliceSource<'_> {
    fn next_sample(&mut self) -> Option<Sample> {
        let sample = self.samples.get(self.pos).copied()?;
        self.pos += 1;
        Some(sample)
    }
}

/// Bit indices of the control pins inside a 16-bits capture word.
///
/// `None` means the pin was not wired. The eight data-bus lines start at
/// `data`, so `data` can be at most 8.
#[derive(Clone, Copy, Debug)]
pub struct PinMap {
    pub data: u8,
    pub rnw: Option<u8>,
    pub lic: Option<u8>,
    pub bs: Option<u8>,
    pub ba: Option<u8>,
    pub addr_lsb: Option<u8>,
}

impl Default for PinMap {
    /// The pin assignment of the reference capture setup: data on bits 0-7,
    /// RnW on 8, LIC on 9, BA on 10, BS on 11, A0 on 12.
    fn default() -> Self {
        Self {
            data: 0,
            rnw: Some(8),
            lic: Some(9),
            ba: Some(10),
            bs: Some(11),
            addr_lsb: Some(12),
        }
    }
}

impl PinMap {
    /// Pin map for 8-bits captures carrying only the data bus.
    pub const DATA_ONLY: Self = Self {
        data: 0,
        rnw: None,
        lic: None,
        bs: None,
        ba: None,
        addr_lsb: None,
    };
}

/// Sample source reading a logic-analyser dump from disk.
///
/// The file is a stream of little-endian 16-bits words (or plain bytes in
/// 8-bits mode), one word per E-clock cycle, with the pins laid out as
/// described by the [PinMap].
pub struct CaptureFile {
    reader: BufReader<File>,
    pins: PinMap,
    wide: bool,
    seq: u32,
}

impl CaptureFile {
    /// Opens a 16-bits capture.
    pub fn open(path: impl AsRef<Path>, pins: PinMap) -> std::io::Result<Self> {
        Ok(Self {
            reader: BufReader::new(File::open(path)?),
            pins,
            wide: true,
            seq: 0,
        })
    }

    /// Opens an 8-bits capture carrying only the data bus.
    pub fn open_byte(path: impl AsRef<Path>) -> std::io::Result<Self> {
        Ok(Self {
            reader: BufReader::new(File::open(path)?),
            pins: PinMap::DATA_ONLY,
            wide: false,
            seq: 0,
        })
    }

    fn pin(word: u16, idx: Option<u8>) -> Option<bool> {
        idx.map(|i| word >> i & 1 != 0)
    }
}

impl SampleSource for CaptureFile {
    fn next_sample(&mut self) -> Option<Sample> {
        let mut buf = [0u8; 2];
        let word = if self.wide {
            self.reader.read_exact(&mut buf).ok()?;
            u16::from_le_bytes(buf)
        } else {
            self.reader.read_exact(&mut buf[..1]).ok()?;
            buf[0] as u16
        };

        let sample = Sample {
            kind: SampleKind::Normal,
            seq: self.seq,
            data: (word >> self.pins.data) as u8,
            rnw: Self::pin(word, self.pins.rnw),
            lic: Self::pin(word, self.pins.lic),
            bs: Self::pin(word, self.pins.bs),
            ba: Self::pin(word, self.pins.ba),
            addr_lsb: Self::pin(word, self.pins.addr_lsb),
        };
        self.seq += 1;
        Some(sample)
    }
}
