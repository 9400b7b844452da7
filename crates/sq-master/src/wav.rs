//! WAV encoding for 16-bit stereo PCM.

use sq_engine::Frame;
use std::io::Write;

const CHANNELS: u16 = 2;
const BITS_PER_SAMPLE: u16 = 16;
const BLOCK_ALIGN: u16 = CHANNELS * (BITS_PER_SAMPLE / 8);
/// Bytes in the RIFF header, fmt chunk, and data chunk header.
const HEADER_LEN: usize = 44;

/// Encode frames as a complete WAV file in memory.
///
/// Frames past what a 32-bit RIFF size can describe are dropped.
pub fn frames_to_wav(frames: &[Frame], sample_rate: u32) -> Vec<u8> {
    let max_frames = (u32::MAX as usize - HEADER_LEN) / BLOCK_ALIGN as usize;
    let frames = &frames[..frames.len().min(max_frames)];
    let data_size = (frames.len() * BLOCK_ALIGN as usize) as u32;

    let mut out = Vec::with_capacity(HEADER_LEN + data_size as usize);
    push_header(&mut out, sample_rate, data_size);
    for frame in frames {
        out.extend_from_slice(&frame.left.to_le_bytes());
        out.extend_from_slice(&frame.right.to_le_bytes());
    }
    out
}

/// Encode frames as WAV and write them to `w`.
pub fn write_wav(w: &mut impl Write, frames: &[Frame], sample_rate: u32) -> std::io::Result<()> {
    w.write_all(&frames_to_wav(frames, sample_rate))
}

fn push_header(out: &mut Vec<u8>, sample_rate: u32, data_size: u32) {
    let byte_rate = sample_rate.saturating_mul(BLOCK_ALIGN as u32);

    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(HEADER_LEN as u32 - 8 + data_size).to_le_bytes());
    out.extend_from_slice(b"WAVE");

    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    // PCM
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&CHANNELS.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&BLOCK_ALIGN.to_le_bytes());
    out.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());

    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_size.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u32_at(bytes: &[u8], at: usize) -> u32 {
        u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
    }

    #[test]
    fn header_describes_stereo_pcm() {
        let wav = frames_to_wav(&[Frame::silence(); 10], 44_100);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[12..16], b"fmt ");
        assert_eq!(u32_at(&wav, 24), 44_100);
        assert_eq!(u32_at(&wav, 28), 44_100 * 4);
        assert_eq!(&wav[36..40], b"data");
        assert_eq!(u32_at(&wav, 40), 40);
        assert_eq!(u32_at(&wav, 4) as usize, wav.len() - 8);
    }

    #[test]
    fn samples_are_little_endian_interleaved() {
        let wav = frames_to_wav(&[Frame { left: 1, right: -2 }], 8000);
        assert_eq!(&wav[HEADER_LEN..], &[1, 0, 0xFE, 0xFF]);
    }

    #[test]
    fn write_wav_matches_in_memory_encoding() {
        let frames = [Frame::mono(300), Frame::mono(-300)];
        let mut out = Vec::new();
        write_wav(&mut out, &frames, 22_050).unwrap();
        assert_eq!(out, frames_to_wav(&frames, 22_050));
    }
}
