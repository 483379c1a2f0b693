//! C1: decodes the container daemon's multiplexed attach-stream framing.
//!
//! The attach endpoint multiplexes stdout/stderr of the worker process
//! behind a fixed 8-byte frame header: byte 0 is the stream kind
//! (`0`=stdin, `1`=stdout, `2`=stderr), bytes 1-3 are zero, bytes 4-7 are
//! a big-endian u32 payload length, followed by exactly that many payload
//! bytes. Writes to stdin go through raw, unframed.

/// One decode pass over a (possibly incomplete) byte buffer.
pub struct Decoded {
    /// Concatenation of every complete stdout/stderr payload in this
    /// buffer, decoded as UTF-8 with replacement on invalid sequences.
    pub text: String,
    /// Bytes that did not form a complete frame; prepend to the next read.
    pub carry: Vec<u8>,
}

const HEADER_LEN: usize = 8;

/// Decode as many complete frames as `buf` contains.
///
/// Tolerant of non-framed input (e.g. a TTY-attached container): if the
/// stream kind byte is not one of `{0,1,2}`, or the declared payload
/// length would overrun the buffer, the remainder of the buffer is
/// treated as raw UTF-8 text instead of being held back as a partial
/// frame. A buffer ending in a header that hasn't fully arrived yet is
/// the normal case and is simply carried to the next call.
pub fn decode(buf: &[u8]) -> Decoded {
    let mut text = String::new();
    let mut pos = 0usize;

    while pos < buf.len() {
        if buf.len() - pos < HEADER_LEN {
            break;
        }

        let kind = buf[pos];
        if !matches!(kind, 0 | 1 | 2) {
            text.push_str(&String::from_utf8_lossy(&buf[pos..]));
            pos = buf.len();
            break;
        }

        let len = u32::from_be_bytes([buf[pos + 4], buf[pos + 5], buf[pos + 6], buf[pos + 7]])
            as usize;
        let payload_start = pos + HEADER_LEN;
        let payload_end = payload_start.saturating_add(len);

        if payload_end > buf.len() {
            text.push_str(&String::from_utf8_lossy(&buf[pos..]));
            pos = buf.len();
            break;
        }

        if kind == 1 || kind == 2 {
            text.push_str(&String::from_utf8_lossy(&buf[payload_start..payload_end]));
        }
        pos = payload_end;
    }

    Decoded {
        text,
        carry: buf[pos..].to_vec(),
    }
}

/// Build a single well-formed frame, for tests and for any future in-memory
/// container runtime that needs to emit framed worker output.
pub fn frame(kind: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.push(kind);
    out.extend_from_slice(&[0, 0, 0]);
    out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    out.extend_from_slice(payload);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_single_stdout_frame() {
        let buf = frame(1, b"hello\n");
        let decoded = decode(&buf);
        assert_eq!(decoded.text, "hello\n");
        assert!(decoded.carry.is_empty());
    }

    #[test]
    fn concatenates_stdout_and_stderr_in_order() {
        let mut buf = frame(1, b"line-one\n");
        buf.extend(frame(2, b"warn\n"));
        buf.extend(frame(1, b"line-two\n"));
        let decoded = decode(&buf);
        assert_eq!(decoded.text, "line-one\nwarn\nline-two\n");
        assert!(decoded.carry.is_empty());
    }

    #[test]
    fn stdin_frames_are_dropped_from_output() {
        let mut buf = frame(0, b"echo hi\n");
        buf.extend(frame(1, b"hi\n"));
        let decoded = decode(&buf);
        assert_eq!(decoded.text, "hi\n");
    }

    #[test]
    fn trailing_partial_header_is_carried() {
        let mut buf = frame(1, b"complete\n");
        buf.extend_from_slice(&[1, 0, 0]); // 3 bytes of the next header
        let decoded = decode(&buf);
        assert_eq!(decoded.text, "complete\n");
        assert_eq!(decoded.carry, vec![1, 0, 0]);
    }

    #[test]
    fn carry_plus_next_read_completes_cleanly() {
        let mut first = frame(1, b"abc");
        first.extend_from_slice(&[1, 0, 0]); // partial header
        let step1 = decode(&first);
        assert_eq!(step1.text, "abc");

        let mut second = step1.carry.clone();
        // finish the header (length=3) and supply the payload.
        second.extend_from_slice(&[0, 0, 0, 3]);
        second.extend_from_slice(b"def");
        let step2 = decode(&second);
        assert_eq!(step2.text, "def");
        assert!(step2.carry.is_empty());
    }

    #[test]
    fn invalid_stream_kind_falls_back_to_raw_text() {
        let buf = b"plain debug output, no framing at all".to_vec();
        let decoded = decode(&buf);
        assert_eq!(decoded.text, String::from_utf8(buf).unwrap());
        assert!(decoded.carry.is_empty());
    }

    #[test]
    fn overrun_payload_falls_back_to_raw_remainder() {
        // Declares a 4-byte payload but only 2 bytes are actually present.
        let mut buf = vec![1, 0, 0, 0, 0, 0, 0, 4];
        buf.extend_from_slice(b"ab");
        let decoded = decode(&buf);
        assert!(decoded.carry.is_empty());
        assert!(!decoded.text.is_empty());
    }

    #[test]
    fn framing_round_trip_law() {
        let payloads: Vec<&[u8]> = vec![b"first chunk\n", b"second chunk\n", b"{\"status\":\"ok\"}\n"];
        let mut buf = Vec::new();
        for p in &payloads {
            buf.extend(frame(1, p));
        }
        let decoded = decode(&buf);
        let expected: String = payloads
            .iter()
            .map(|p| String::from_utf8_lossy(p).into_owned())
            .collect();
        assert_eq!(decoded.text, expected);
        assert!(decoded.carry.is_empty());
    }

    #[test]
    fn invalid_utf8_payload_uses_replacement_characters() {
        let buf = frame(1, &[0xff, 0xfe, b'x']);
        let decoded = decode(&buf);
        assert!(decoded.text.contains('x'));
        assert!(decoded.text.contains('\u{FFFD}'));
    }
}
