// ABOUTME: Integration tests for the think-block splitter
// ABOUTME: Verifies chunking invariance and the unmatched-close reclassification rule

use vivuchat::ollama::ThinkSplitter;

fn run(chunks: &[&str]) -> (String, String) {
    let mut splitter = ThinkSplitter::new();
    for chunk in chunks {
        splitter.push(chunk);
    }
    splitter.finish();
    (splitter.thinking().to_owned(), splitter.answer().to_owned())
}

#[test]
fn test_whole_span_in_one_chunk() {
    let (thinking, answer) = run(&["<think>abc</think>def"]);
    assert_eq!(thinking, "abc");
    assert_eq!(answer, "def");
}

#[test]
fn test_fragmented_delimiters_match_whole_chunk_result() {
    let (thinking, answer) = run(&["<thi", "nk>abc</th", "ink>def"]);
    assert_eq!(thinking, "abc");
    assert_eq!(answer, "def");
}

#[test]
fn test_every_split_point_gives_same_result() {
    let text = "intro <think>step one\nstep two</think> conclusion";
    let reference = run(&[text]);

    for split_at in 1..text.len() {
        if !text.is_char_boundary(split_at) {
            continue;
        }
        let (head, tail) = text.split_at(split_at);
        assert_eq!(
            run(&[head, tail]),
            reference,
            "split at byte {split_at} changed the result"
        );
    }
}

#[test]
fn test_close_without_open_reclassifies_answer() {
    let (thinking, answer) = run(&["all of this was reasoning", "</think>", "the real answer"]);
    assert_eq!(thinking, "all of this was reasoning");
    assert_eq!(answer, "the real answer");
}

#[test]
fn test_duration_present_only_when_thinking_occurred() {
    let mut plain = ThinkSplitter::new();
    plain.push("no reasoning here");
    plain.finish();
    assert_eq!(plain.thinking_duration_ms(), None);

    let mut thinky = ThinkSplitter::new();
    thinky.push("<think>hm</think>ok");
    thinky.finish();
    assert!(thinky.thinking_duration_ms().is_some());
}

#[test]
fn test_is_thinking_tracks_state_mid_stream() {
    let mut splitter = ThinkSplitter::new();
    splitter.push("<think>still going");
    assert!(splitter.is_thinking());

    splitter.push("</think>done");
    assert!(!splitter.is_thinking());
}
