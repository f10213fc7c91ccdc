// ABOUTME: Integration tests for the NDJSON streaming decoder
// ABOUTME: Covers TCP fragmentation, batched lines, garbage skipping, and EOF flush

use bytes::Bytes;
use futures_util::{stream, StreamExt};
use vivuchat::ollama::ndjson::{create_chunk_stream, NdjsonLineBuffer};

fn byte_stream(
    chunks: Vec<&'static str>,
) -> impl futures_util::Stream<Item = Result<Bytes, reqwest::Error>> {
    stream::iter(
        chunks
            .into_iter()
            .map(|c| Ok::<_, reqwest::Error>(Bytes::from(c))),
    )
}

#[tokio::test]
async fn test_chunks_parsed_in_order() {
    let stream = create_chunk_stream(byte_stream(vec![
        "{\"model\":\"m\",\"message\":{\"role\":\"assistant\",\"content\":\"Hel\"},\"done\":false}\n",
        "{\"model\":\"m\",\"message\":{\"role\":\"assistant\",\"content\":\"lo\"},\"done\":false}\n",
        "{\"model\":\"m\",\"done\":true,\"eval_count\":7}\n",
    ]));

    let chunks: Vec<_> = stream.collect().await;
    assert_eq!(chunks.len(), 3);

    let deltas: Vec<String> = chunks
        .iter()
        .map(|c| c.as_ref().unwrap().delta().to_owned())
        .collect();
    assert_eq!(deltas, vec!["Hel", "lo", ""]);

    let last = chunks.last().unwrap().as_ref().unwrap();
    assert!(last.done);
    assert_eq!(last.eval_count, Some(7));
}

#[tokio::test]
async fn test_json_split_across_tcp_reads() {
    let stream = create_chunk_stream(byte_stream(vec![
        "{\"model\":\"m\",\"message\":{\"role\":\"assis",
        "tant\",\"content\":\"hi\"},\"done\":false}\n{\"model\":\"m\",\"done\":true}\n",
    ]));

    let chunks: Vec<_> = stream.collect().await;
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].as_ref().unwrap().delta(), "hi");
    assert!(chunks[1].as_ref().unwrap().done);
}

#[tokio::test]
async fn test_garbage_lines_skipped_not_fatal() {
    let stream = create_chunk_stream(byte_stream(vec![
        "not json at all\n",
        "{\"model\":\"m\",\"message\":{\"role\":\"assistant\",\"content\":\"ok\"},\"done\":false}\n",
        "{broken\n",
        "{\"model\":\"m\",\"done\":true}\n",
    ]));

    let chunks: Vec<_> = stream.collect().await;
    assert_eq!(chunks.len(), 2);
    assert!(chunks.iter().all(Result::is_ok));
}

#[tokio::test]
async fn test_final_line_without_newline_flushed() {
    let stream = create_chunk_stream(byte_stream(vec![
        "{\"model\":\"m\",\"done\":true}",
    ]));

    let chunks: Vec<_> = stream.collect().await;
    assert_eq!(chunks.len(), 1);
    assert!(chunks[0].as_ref().unwrap().done);
}

#[tokio::test]
async fn test_multibyte_content_split_mid_character() {
    // TCP reads are byte-aligned, not character-aligned: the "ệ" in "Việt"
    // arrives with its three UTF-8 bytes spread over two reads
    let reads: Vec<&'static [u8]> = vec![
        b"{\"model\":\"m\",\"message\":{\"role\":\"assistant\",\"content\":\"Vi\xe1\xbb",
        b"\x87t\"},\"done\":false}\n{\"model\":\"m\",\"done\":true}\n",
    ];
    let stream = create_chunk_stream(stream::iter(
        reads
            .into_iter()
            .map(|c| Ok::<_, reqwest::Error>(Bytes::from(c))),
    ));

    let chunks: Vec<_> = stream.collect().await;
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].as_ref().unwrap().delta(), "Việt");
    assert!(chunks[1].as_ref().unwrap().done);
}

#[test]
fn test_line_buffer_handles_crlf() {
    let mut parser = NdjsonLineBuffer::new();
    let lines = parser.feed(b"{\"a\":1}\r\n{\"b\":2}\r\n");
    assert_eq!(lines, vec!["{\"a\":1}", "{\"b\":2}"]);
}
