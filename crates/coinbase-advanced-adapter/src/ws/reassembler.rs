/*
[INPUT]:  Message payloads, optionally split into segments
[OUTPUT]: Complete UTF-8 messages within the receive buffer limit
[POS]:    WebSocket layer - size and text gate for the receive loop
[UPDATE]: When buffer limits or text decoding rules change
*/

use crate::http::{CoinbaseError, Result};

/// Bounds and decodes inbound messages
///
/// On a live socket tungstenite has already joined continuation frames, so
/// the receive loop hands over one whole payload per message and this type
/// only enforces the size limit and UTF-8 decoding. Segmented input is
/// still accepted for callers that read below the message layer.
#[derive(Debug)]
pub struct FrameReassembler {
    segments: Vec<Vec<u8>>,
    buffered: usize,
    limit: usize,
}

impl FrameReassembler {
    /// `limit` bounds the total bytes of one logical message
    pub fn new(limit: usize) -> Self {
        Self {
            segments: Vec::new(),
            buffered: 0,
            limit,
        }
    }

    /// Append a fragment; returns the whole message once `end_of_message` is set
    ///
    /// Oversized or non-UTF-8 messages are discarded and reported as errors.
    /// The buffer is empty again after every completed or failed message.
    pub fn push(&mut self, fragment: &[u8], end_of_message: bool) -> Result<Option<String>> {
        if self.buffered + fragment.len() > self.limit {
            let attempted = self.buffered + fragment.len();
            self.clear();
            return Err(CoinbaseError::InvalidResponse(format!(
                "message of at least {attempted} bytes exceeds receive buffer of {} bytes",
                self.limit
            )));
        }

        self.buffered += fragment.len();
        self.segments.push(fragment.to_vec());
        if !end_of_message {
            return Ok(None);
        }

        let bytes = self.segments.concat();
        self.clear();
        String::from_utf8(bytes)
            .map(Some)
            .map_err(|err| CoinbaseError::InvalidResponse(format!("message is not UTF-8: {err}")))
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    fn clear(&mut self) {
        self.segments.clear();
        self.buffered = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragments_join_on_final_frame() {
        let mut reassembler = FrameReassembler::new(1024);
        assert_eq!(reassembler.push(br#"{"channel":"#, false).unwrap(), None);
        assert_eq!(reassembler.push(br#""ticker","#, false).unwrap(), None);
        assert_eq!(reassembler.push(br#""events""#, false).unwrap(), None);
        let message = reassembler.push(b":[]}", true).unwrap();

        assert_eq!(
            message.as_deref(),
            Some(r#"{"channel":"ticker","events":[]}"#)
        );
        assert!(reassembler.is_empty());
    }

    #[test]
    fn test_single_frame_message() {
        let mut reassembler = FrameReassembler::new(16);
        assert_eq!(reassembler.push(b"hello", true).unwrap().as_deref(), Some("hello"));
    }

    #[test]
    fn test_oversized_message_is_dropped() {
        let mut reassembler = FrameReassembler::new(8);
        assert!(reassembler.push(b"12345", false).unwrap().is_none());
        let err = reassembler.push(b"67890", true).unwrap_err();
        assert!(matches!(err, CoinbaseError::InvalidResponse(_)));
        assert!(reassembler.is_empty());

        assert_eq!(reassembler.push(b"ok", true).unwrap().as_deref(), Some("ok"));
    }

    #[test]
    fn test_invalid_utf8_is_dropped() {
        let mut reassembler = FrameReassembler::new(64);
        assert!(reassembler.push(&[0xf0, 0x28], false).unwrap().is_none());
        assert!(reassembler.push(&[0x8c, 0x28], true).is_err());
        assert!(reassembler.is_empty());
    }

    #[test]
    fn test_multibyte_character_split_across_frames() {
        let mut reassembler = FrameReassembler::new(64);
        let text = "price €";
        let (head, tail) = text.as_bytes().split_at(text.len() - 1);
        assert!(reassembler.push(head, false).unwrap().is_none());
        assert_eq!(reassembler.push(tail, true).unwrap().as_deref(), Some(text));
    }
}
