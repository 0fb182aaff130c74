//! Placeholder MP3 encoding.
//!
//! Produces an ID3v2.3 tag followed by silent MPEG-1 Layer III frames.
//! Players accept the result and report roughly the requested duration; the
//! audio itself is silence.

/// MPEG-1 Layer III, no CRC, 32 kbit/s, 44.1 kHz, no padding, mono, original.
const FRAME_HEADER: [u8; 4] = [0xFF, 0xFB, 0x10, 0xC4];
/// 144 * 32_000 / 44_100, rounded down.
pub const FRAME_LEN: usize = 104;
const SAMPLE_RATE: u32 = 44_100;
const SAMPLES_PER_FRAME: u32 = 1152;

/// Longest title stored in the tag, in characters.
const MAX_TITLE_CHARS: usize = 120;

/// Number of frames needed to cover `duration_secs` of audio.
pub fn frame_count(duration_secs: u32) -> usize {
    (duration_secs as usize * SAMPLE_RATE as usize).div_ceil(SAMPLES_PER_FRAME as usize)
}

/// Encodes a silent track of `duration_secs` tagged with `title`.
pub fn silent_track(title: &str, duration_secs: u32) -> Vec<u8> {
    let tag = id3_tag(title);
    let frames = frame_count(duration_secs);

    let mut out = Vec::with_capacity(tag.len() + frames * FRAME_LEN);
    out.extend_from_slice(&tag);
    for _ in 0..frames {
        out.extend_from_slice(&FRAME_HEADER);
        out.resize(out.len() + FRAME_LEN - FRAME_HEADER.len(), 0);
    }
    out
}

fn id3_tag(title: &str) -> Vec<u8> {
    let title = title.chars().take(MAX_TITLE_CHARS).collect::<String>();

    let mut frames = Vec::new();
    frames.extend(text_frame(b"TIT2", &title));
    frames.extend(text_frame(b"TSSE", concat!("promptwave ", env!("CARGO_PKG_VERSION"))));

    let mut tag = Vec::with_capacity(10 + frames.len());
    tag.extend_from_slice(b"ID3");
    // version 2.3.0, no flags
    tag.extend_from_slice(&[3, 0, 0]);
    tag.extend_from_slice(&synchsafe(frames.len() as u32));
    tag.extend(frames);
    tag
}

/// UTF-16 text frame with BOM; ID3v2.3 has no UTF-8 encoding.
fn text_frame(id: &[u8; 4], text: &str) -> Vec<u8> {
    let mut body = vec![1u8, 0xFF, 0xFE];
    for unit in text.encode_utf16() {
        body.extend_from_slice(&unit.to_le_bytes());
    }

    let mut frame = Vec::with_capacity(10 + body.len());
    frame.extend_from_slice(id);
    frame.extend_from_slice(&(body.len() as u32).to_be_bytes());
    frame.extend_from_slice(&[0, 0]);
    frame.extend(body);
    frame
}

/// 28-bit size split into four 7-bit bytes.
fn synchsafe(size: u32) -> [u8; 4] {
    [
        ((size >> 21) & 0x7F) as u8,
        ((size >> 14) & 0x7F) as u8,
        ((size >> 7) & 0x7F) as u8,
        (size & 0x7F) as u8,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag_len(bytes: &[u8]) -> usize {
        let s = &bytes[6..10];
        10 + ((s[0] as usize) << 21 | (s[1] as usize) << 14 | (s[2] as usize) << 7 | s[3] as usize)
    }

    #[test]
    fn test_starts_with_id3_tag() {
        let bytes = silent_track("relaxing piano", 5);

        assert_eq!(&bytes[..3], b"ID3");
        assert_eq!(bytes[3], 3);
        assert!(bytes[6..10].iter().all(|b| b & 0x80 == 0));
    }

    #[test]
    fn test_frames_follow_tag() {
        let bytes = silent_track("relaxing piano", 5);
        let audio = &bytes[tag_len(&bytes)..];

        assert_eq!(audio.len(), frame_count(5) * FRAME_LEN);
        for frame in audio.chunks(FRAME_LEN) {
            assert_eq!(&frame[..4], &FRAME_HEADER);
        }
    }

    #[test]
    fn test_frame_count_covers_duration() {
        // 5 s * 44100 / 1152 = 191.4
        assert_eq!(frame_count(5), 192);
        assert_eq!(frame_count(0), 0);
        assert!(frame_count(300) * SAMPLES_PER_FRAME as usize >= 300 * SAMPLE_RATE as usize);
    }

    #[test]
    fn test_title_is_stored_utf16() {
        let bytes = silent_track("lo", 5);
        let expected = [b'T', b'I', b'T', b'2', 0, 0, 0, 7, 0, 0, 1, 0xFF, 0xFE, b'l', 0, b'o', 0];

        assert!(bytes.windows(expected.len()).any(|w| w == expected));
    }

    #[test]
    fn test_synchsafe() {
        assert_eq!(synchsafe(0), [0, 0, 0, 0]);
        assert_eq!(synchsafe(127), [0, 0, 0, 127]);
        assert_eq!(synchsafe(128), [0, 0, 1, 0]);
    }

    #[test]
    fn test_long_titles_are_truncated() {
        let short = silent_track(&"a".repeat(MAX_TITLE_CHARS), 5);
        let long = silent_track(&"a".repeat(MAX_TITLE_CHARS * 3), 5);

        assert_eq!(short.len(), long.len());
    }
}
