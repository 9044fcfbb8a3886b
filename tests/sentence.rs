//! Sentence splitting and markup stripping integration tests

use vocalink::{SentenceSplitter, strip_markup};

/// Feed chunks through a splitter, collecting sentences and the final tail
fn split_all(chunks: &[&str]) -> Vec<String> {
    let mut splitter = SentenceSplitter::new();
    let mut out = Vec::new();
    for chunk in chunks {
        out.extend(splitter.push(chunk));
    }
    if let Some(tail) = splitter.finish() {
        out.push(tail);
    }
    out
}

#[test]
fn reassembly_property_over_chunked_input() {
    // Concatenating everything emitted reproduces the input exactly,
    // regardless of how the stream was chunked
    let cases: Vec<Vec<&str>> = vec![
        vec!["One sentence. Two!", " Thr", "ee? And a tail"],
        vec!["中文。分句！测", "试；混合. punctuation"],
        vec!["a", "b", "c", ".", "d"],
        vec!["no delimiters at all, just one long fragment"],
        vec!["", "empty chunks.", "", " fine"],
    ];

    for chunks in cases {
        let emitted = split_all(&chunks);
        assert_eq!(emitted.concat(), chunks.concat(), "chunks: {chunks:?}");
    }
}

#[test]
fn sentences_emitted_in_generation_order() {
    let emitted = split_all(&["First. Second! Third? Fourth; tail"]);

    assert_eq!(
        emitted,
        vec!["First.", " Second!", " Third?", " Fourth;", " tail"]
    );
}

#[test]
fn cjk_and_latin_delimiters_both_split() {
    let emitted = split_all(&["早上好。How are you? 很好！Great; 好"]);

    assert_eq!(
        emitted,
        vec!["早上好。", "How are you?", " 很好！", "Great;", " 好"]
    );
}

#[test]
fn boundary_spanning_two_chunks() {
    let mut splitter = SentenceSplitter::new();

    assert!(splitter.push("Almost there").is_empty());
    let out = splitter.push(". More");
    assert_eq!(out, vec!["Almost there."]);
    assert_eq!(splitter.pending(), " More");
}

#[test]
fn stream_end_flushes_unterminated_buffer() {
    let mut splitter = SentenceSplitter::new();
    splitter.push("trailing fragment with no period");

    assert_eq!(
        splitter.finish(),
        Some("trailing fragment with no period".to_string())
    );
}

#[test]
fn markup_stripped_before_synthesis() {
    assert_eq!(
        strip_markup("**bold** *italic* `code` - item"),
        "bold italic code item"
    );
}

#[test]
fn markup_strip_keeps_cjk_text() {
    assert_eq!(strip_markup("**重点**内容`代码`"), "重点内容代码");
}

#[test]
fn markup_strip_on_clean_sentence_is_identity() {
    let sentence = "Nothing fancy here, just words.";
    assert_eq!(strip_markup(sentence), sentence);
}
