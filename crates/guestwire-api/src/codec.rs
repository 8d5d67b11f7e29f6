// Word codec and sentence framing
//
// Every word on the wire is `length prefix + payload`. The prefix is a
// self-delimiting variable-length integer: the high bits of the first byte
// say how many continuation bytes follow. A zero-length word terminates the
// sentence. `SentenceCodec` plugs into `tokio_util::codec::Framed` so the
// session never deals with raw bytes.

use std::fmt;
use std::mem;
use std::sync::Arc;

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

use crate::error::Error;
use crate::sentence::Sentence;

/// Default ceiling for a single decoded word (16 MiB).
pub const DEFAULT_MAX_WORD_LEN: usize = 16 * 1024 * 1024;

/// Optional observer of inbound wire bytes, called once per consumed word
/// (prefix and payload) in arrival order. Purely diagnostic.
pub type WireTap = Arc<dyn Fn(&[u8]) + Send + Sync>;

/// Append the length prefix for a word of `len` bytes.
pub fn encode_length(len: u32, dst: &mut impl BufMut) {
    match len {
        0..0x80 => dst.put_slice(&len.to_be_bytes()[3..]),
        0x80..0x4000 => dst.put_slice(&(len | 0x8000).to_be_bytes()[2..]),
        0x4000..0x20_0000 => dst.put_slice(&(len | 0xC0_0000).to_be_bytes()[1..]),
        0x20_0000..0x1000_0000 => dst.put_u32(len | 0xE000_0000),
        _ => {
            dst.put_u8(0xF0);
            dst.put_u32(len);
        }
    }
}

/// Decode a length prefix from the front of `src`.
///
/// Returns the decoded length and the number of prefix bytes, or `None`
/// when `src` does not yet hold the whole prefix.
pub fn decode_length(src: &[u8]) -> Result<Option<(u32, usize)>, Error> {
    let Some(&first) = src.first() else {
        return Ok(None);
    };

    let (extra, mask) = match first {
        0x00..=0x7F => return Ok(Some((u32::from(first), 1))),
        0x80..=0xBF => (1, 0x3F),
        0xC0..=0xDF => (2, 0x1F),
        0xE0..=0xEF => (3, 0x0F),
        0xF0 => (4, 0x00),
        _ => {
            return Err(Error::protocol(format!(
                "reserved control byte 0x{first:02X} in length prefix"
            )));
        }
    };

    let Some(rest) = src.get(1..=extra) else {
        return Ok(None);
    };
    let len = rest
        .iter()
        .fold(u32::from(first & mask), |acc, &b| (acc << 8) | u32::from(b));
    Ok(Some((len, extra + 1)))
}

/// Frames sentences onto a byte stream and reassembles them from it.
pub struct SentenceCodec {
    max_word_len: usize,
    /// Words of the sentence currently being received.
    words: Vec<String>,
    tap: Option<WireTap>,
}

impl SentenceCodec {
    pub fn new(max_word_len: usize) -> Self {
        Self {
            max_word_len,
            words: Vec::new(),
            tap: None,
        }
    }

    pub fn with_tap(mut self, tap: Option<WireTap>) -> Self {
        self.tap = tap;
        self
    }

    pub fn max_word_len(&self) -> usize {
        self.max_word_len
    }
}

impl Default for SentenceCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_WORD_LEN)
    }
}

impl fmt::Debug for SentenceCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SentenceCodec")
            .field("max_word_len", &self.max_word_len)
            .field("pending_words", &self.words.len())
            .field("tap", &self.tap.is_some())
            .finish()
    }
}

impl Encoder<&Sentence> for SentenceCodec {
    type Error = Error;

    fn encode(&mut self, sentence: &Sentence, dst: &mut BytesMut) -> Result<(), Error> {
        if sentence.is_empty() {
            return Err(Error::protocol("refusing to send an empty sentence"));
        }

        // Validate up front so a rejected sentence leaves nothing in the buffer.
        let mut lengths = Vec::with_capacity(sentence.len());
        for word in sentence.words() {
            if word.is_empty() {
                return Err(Error::protocol(
                    "zero-length word is reserved for the sentence terminator",
                ));
            }
            let len = u32::try_from(word.len()).map_err(|_| {
                Error::protocol(format!("word of {} bytes cannot be encoded", word.len()))
            })?;
            lengths.push(len);
        }

        dst.reserve(sentence.words().iter().map(|w| w.len() + 5).sum::<usize>() + 1);
        for (word, len) in sentence.words().iter().zip(lengths) {
            encode_length(len, dst);
            dst.extend_from_slice(word.as_bytes());
        }
        dst.put_u8(0);
        trace!(%sentence, "encoded sentence");
        Ok(())
    }
}

impl Decoder for SentenceCodec {
    type Item = Sentence;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Sentence>, Error> {
        loop {
            let Some((len, prefix)) = decode_length(src)? else {
                return Ok(None);
            };
            let len = usize::try_from(len)
                .map_err(|_| Error::protocol(format!("word length {len} overflows usize")))?;
            if len > self.max_word_len {
                return Err(Error::protocol(format!(
                    "word length {len} exceeds ceiling of {} bytes",
                    self.max_word_len
                )));
            }

            let frame_len = prefix + len;
            if src.len() < frame_len {
                src.reserve(frame_len - src.len());
                return Ok(None);
            }

            let frame = src.split_to(frame_len);
            if let Some(tap) = &self.tap {
                tap(&frame);
            }

            if len == 0 {
                let sentence = Sentence::from_words(mem::take(&mut self.words));
                trace!(%sentence, "decoded sentence");
                return Ok(Some(sentence));
            }

            let payload = frame.get(prefix..).unwrap_or_default();
            self.words
                .push(String::from_utf8_lossy(payload).into_owned());
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Sentence>, Error> {
        if let Some(sentence) = self.decode(src)? {
            return Ok(Some(sentence));
        }
        if src.is_empty() && self.words.is_empty() {
            Ok(None)
        } else {
            Err(Error::protocol(format!(
                "connection closed mid-sentence ({} word(s), {} byte(s) pending)",
                self.words.len(),
                src.len()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::sync::Mutex;

    use pretty_assertions::assert_eq;

    use super::*;

    fn encoded(len: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        encode_length(len, &mut buf);
        buf
    }

    #[test]
    fn length_prefix_vectors() {
        assert_eq!(encoded(0), [0x00]);
        assert_eq!(encoded(0x7F), [0x7F]);
        assert_eq!(encoded(0x80), [0x80, 0x80]);
        assert_eq!(encoded(0x3FFF), [0xBF, 0xFF]);
        assert_eq!(encoded(0x4000), [0xC0, 0x40, 0x00]);
        assert_eq!(encoded(0x1F_FFFF), [0xDF, 0xFF, 0xFF]);
        assert_eq!(encoded(0x20_0000), [0xE0, 0x20, 0x00, 0x00]);
        assert_eq!(encoded(0x0FFF_FFFF), [0xEF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(encoded(0x1000_0000), [0xF0, 0x10, 0x00, 0x00, 0x00]);
        assert_eq!(encoded(u32::MAX), [0xF0, 0xFF, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn length_round_trips_at_band_edges() {
        let edges = [
            0,
            1,
            0x7F,
            0x80,
            0x3FFF,
            0x4000,
            0x1F_FFFF,
            0x20_0000,
            0x0FFF_FFFF,
            0x1000_0000,
            u32::MAX - 1,
            u32::MAX,
        ];
        for n in edges {
            let bytes = encoded(n);
            assert_eq!(decode_length(&bytes).unwrap(), Some((n, bytes.len())), "n = {n:#x}");
        }
    }

    #[test]
    fn incomplete_prefix_needs_more_bytes() {
        assert_eq!(decode_length(&[]).unwrap(), None);
        assert_eq!(decode_length(&[0xC0, 0x40]).unwrap(), None);
        assert_eq!(decode_length(&[0xF0, 0x10, 0x00]).unwrap(), None);
    }

    #[test]
    fn reserved_prefix_byte_is_rejected() {
        assert!(matches!(decode_length(&[0xF8]), Err(Error::Protocol { .. })));
    }

    #[test]
    fn sentence_framing_is_byte_exact() {
        let sentence = Sentence::new("/ip/hotspot/user/add")
            .with_attribute("name", "guest-042")
            .with_attribute("comment", &"x".repeat(300))
            .with_query("profile", "default");

        let mut codec = SentenceCodec::default();
        let mut buf = BytesMut::new();
        codec.encode(&sentence, &mut buf).unwrap();
        assert_eq!(buf.last(), Some(&0));

        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded, sentence);
        assert!(buf.is_empty());
    }

    #[test]
    fn decoding_resumes_across_partial_reads() {
        let mut codec = SentenceCodec::default();
        let mut wire = BytesMut::new();
        codec
            .encode(&Sentence::new("!re").with_attribute("name", "a"), &mut wire)
            .unwrap();
        codec.encode(&Sentence::new("!done"), &mut wire).unwrap();

        let mut buf = BytesMut::new();
        let mut out = Vec::new();
        for byte in wire {
            buf.put_u8(byte);
            while let Some(s) = codec.decode(&mut buf).unwrap() {
                out.push(s);
            }
        }
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].attribute("name"), Some("a"));
        assert_eq!(out[1].words(), ["!done"]);
    }

    #[test]
    fn empty_words_are_not_encoded() {
        let mut codec = SentenceCodec::default();
        let mut buf = BytesMut::new();
        let bad = Sentence::from_words(vec!["/login".into(), String::new()]);
        assert!(codec.encode(&bad, &mut buf).is_err());
        assert!(buf.is_empty());
    }

    #[test]
    fn oversized_word_is_rejected_before_allocation() {
        let mut codec = SentenceCodec::new(1024);
        let mut buf = BytesMut::new();
        encode_length(0x0FFF_FFFF, &mut buf);
        assert!(matches!(codec.decode(&mut buf), Err(Error::Protocol { .. })));
    }

    #[test]
    fn eof_mid_sentence_is_protocol_error() {
        let mut codec = SentenceCodec::default();
        let mut buf = BytesMut::new();
        encode_length(3, &mut buf);
        buf.extend_from_slice(b"!re");
        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert!(matches!(codec.decode_eof(&mut buf), Err(Error::Protocol { .. })));
    }

    #[test]
    fn eof_between_sentences_is_clean() {
        let mut codec = SentenceCodec::default();
        let mut buf = BytesMut::new();
        assert!(codec.decode_eof(&mut buf).unwrap().is_none());
    }

    #[test]
    fn tap_sees_every_inbound_byte() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let tap: WireTap = Arc::new(move |bytes: &[u8]| {
            sink.lock().unwrap().extend_from_slice(bytes);
        });
        let mut codec = SentenceCodec::default().with_tap(Some(tap));

        let mut wire = BytesMut::new();
        codec
            .encode(&Sentence::new("!done").with_attribute("ret", "*1"), &mut wire)
            .unwrap();
        let expected = wire.to_vec();

        let sentence = codec.decode(&mut wire).unwrap().unwrap();
        assert_eq!(sentence.attribute("ret"), Some("*1"));
        assert_eq!(*seen.lock().unwrap(), expected);
    }
}
