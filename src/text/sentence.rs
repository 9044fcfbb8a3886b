//! Streaming sentence splitting
//!
//! Consumes incremental text deltas and emits complete sentences in order.
//! The unterminated tail stays buffered until the next delta or stream end.

/// Sentence-terminating punctuation, CJK and Latin variants
pub const SENTENCE_DELIMITERS: [char; 8] = ['。', '！', '？', '；', '.', '!', '?', ';'];

/// Splits an incremental text stream into sentences.
///
/// One live instance per active response stream. Concatenating every emitted
/// sentence plus the final remainder reproduces the input stream exactly.
#[derive(Debug, Default)]
pub struct SentenceSplitter {
    buffer: String,
}

impl SentenceSplitter {
    /// Create a splitter with an empty buffer
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one text delta; returns every sentence completed by it.
    ///
    /// Sentences keep their terminating delimiter (and any leading
    /// whitespace), so emitted text is byte-identical to the input.
    pub fn push(&mut self, chunk: &str) -> Vec<String> {
        self.buffer.push_str(chunk);

        let mut boundaries = Vec::new();
        for (i, c) in self.buffer.char_indices() {
            if SENTENCE_DELIMITERS.contains(&c) {
                boundaries.push(i + c.len_utf8());
            }
        }

        let mut sentences = Vec::with_capacity(boundaries.len());
        let mut start = 0;
        for end in boundaries {
            sentences.push(self.buffer[start..end].to_string());
            start = end;
        }

        if start > 0 {
            self.buffer.replace_range(..start, "");
        }

        sentences
    }

    /// Text still waiting for a sentence boundary
    #[must_use]
    pub fn pending(&self) -> &str {
        &self.buffer
    }

    /// End the stream: the remainder is emitted as a final sentence even
    /// without a terminating delimiter.
    #[must_use]
    pub fn finish(self) -> Option<String> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(self.buffer)
        }
    }
}
