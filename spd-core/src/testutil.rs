//! Synthetic audio-like buffers for tests

/// MPEG-1 Layer III, bitrate index 9, sample-rate index 0
pub(crate) const FRAME_HEADER: [u8; 4] = [0xFF, 0xFB, 0x90, 0x64];

/// Filler whose bytes never equal 0xFF and whose neighbours never share
/// their top three bits, so no key turns it into a frame sync.
///
/// `low_period` (at most 32) controls how many distinct low-bit patterns
/// cycle, which steers the entropy rules.
pub(crate) fn filler(len: usize, low_period: usize) -> Vec<u8> {
    assert!((1..=32).contains(&low_period));
    (0..len)
        .map(|i| (((i % 7) as u8) << 5) | (i % low_period) as u8)
        .collect()
}

/// Filler with `FRAME_HEADER` stamped at each offset.
///
/// Offsets must satisfy `offset % 7 != 6` so the byte after the header
/// does not share the header's last top-three-bit pattern.
pub(crate) fn synthetic_mp3(len: usize, frames: &[usize], low_period: usize) -> Vec<u8> {
    let mut data = filler(len, low_period);
    for &offset in frames {
        assert_ne!(offset % 7, 6);
        data[offset..offset + FRAME_HEADER.len()].copy_from_slice(&FRAME_HEADER);
    }
    data
}

/// Two alternating values whose top bits differ; scores zero under every key
pub(crate) fn alternating(len: usize) -> Vec<u8> {
    (0..len).map(|i| if i % 2 == 0 { 0x00 } else { 0x80 }).collect()
}
