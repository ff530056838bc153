//! Streaming over server-sent events

mod harness;

use std::time::Duration;

use harness::Recorded;
use harness::config::ConfigBuilder;
use harness::mock_llm::{MockLlm, Reply};
use quill_llm::{Generator, LlmError, StreamFragment, Transport, sink_fn};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn deltas_arrive_in_order_with_done_last() {
    let mock = MockLlm::start(vec![Reply::stream(["Hel", "lo", " world"])]).await.unwrap();
    let transport = Transport::from_config(&ConfigBuilder::openai(&mock).build()).unwrap();
    let recorded = Recorded::default();

    let summary = transport
        .stream(&harness::request("greet"), &mut recorded.sink(), &CancellationToken::new())
        .await
        .unwrap();

    let fragments = recorded.fragments();
    let deltas: Vec<_> = fragments
        .iter()
        .filter_map(|f| match f {
            StreamFragment::TextDelta(text) => Some(text.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(deltas, ["Hel", "lo", " world"]);
    assert_eq!(fragments.last(), Some(&StreamFragment::Done));
    assert_eq!(recorded.terminals(), 1);
    assert_eq!(summary.fragments, fragments.len());
    assert_eq!(summary.usage.map(|u| u.total_tokens), Some(15));

    assert_eq!(mock.requests()[0]["stream"], true);
}

#[tokio::test]
async fn missing_done_marker_still_ends_with_done() {
    let mock = MockLlm::start(vec![Reply::Frames(vec![
        (None, r#"{"choices":[{"index":0,"delta":{"content":"partial"}}]}"#.to_owned()),
    ])])
    .await
    .unwrap();
    let transport = Transport::from_config(&ConfigBuilder::openai(&mock).build()).unwrap();
    let recorded = Recorded::default();

    transport
        .stream(&harness::request("go"), &mut recorded.sink(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        recorded.fragments(),
        [StreamFragment::TextDelta("partial".to_owned()), StreamFragment::Done]
    );
}

#[tokio::test]
async fn session_event_is_passed_through() {
    let mock = MockLlm::start(vec![Reply::Frames(vec![
        (Some("session".to_owned()), r#"{"session_id":"s-42"}"#.to_owned()),
        (None, r#"{"choices":[{"index":0,"delta":{"content":"{}"}}]}"#.to_owned()),
        (None, "[DONE]".to_owned()),
    ])])
    .await
    .unwrap();
    let transport = Transport::from_config(&ConfigBuilder::openai(&mock).build()).unwrap();
    let recorded = Recorded::default();

    transport
        .stream(&harness::request("go"), &mut recorded.sink(), &CancellationToken::new())
        .await
        .unwrap();

    let fragments = recorded.fragments();
    assert_eq!(
        fragments[0],
        StreamFragment::SessionInfo(serde_json::json!({"session_id": "s-42"}))
    );
    assert_eq!(fragments.last(), Some(&StreamFragment::Done));
}

#[tokio::test]
async fn error_event_ends_stream_with_error() {
    let mock = MockLlm::start(vec![Reply::Frames(vec![
        (None, r#"{"choices":[{"index":0,"delta":{"content":"Hel"}}]}"#.to_owned()),
        (Some("error".to_owned()), r#"{"error":{"message":"quota exhausted"}}"#.to_owned()),
        (None, r#"{"choices":[{"index":0,"delta":{"content":"never"}}]}"#.to_owned()),
    ])])
    .await
    .unwrap();
    let transport = Transport::from_config(&ConfigBuilder::openai(&mock).build()).unwrap();
    let recorded = Recorded::default();

    let err = transport
        .stream(&harness::request("go"), &mut recorded.sink(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, LlmError::ProviderRefusal(ref msg) if msg == "quota exhausted"));
    assert_eq!(
        recorded.fragments(),
        [
            StreamFragment::TextDelta("Hel".to_owned()),
            StreamFragment::Error("quota exhausted".to_owned()),
        ]
    );
}

#[tokio::test]
async fn failing_sink_aborts_the_stream() {
    let mock = MockLlm::start(vec![Reply::stream(["a", "b", "c"])]).await.unwrap();
    let transport = Transport::from_config(&ConfigBuilder::openai(&mock).build()).unwrap();

    let mut seen = Vec::new();
    let mut sink = sink_fn(|fragment| {
        seen.push(fragment);
        if seen.len() == 2 {
            anyhow::bail!("disk full");
        }
        Ok(())
    });

    let err = transport
        .stream(&harness::request("go"), &mut sink, &CancellationToken::new())
        .await
        .unwrap_err();
    drop(sink);

    assert!(matches!(err, LlmError::CallbackAborted(ref msg) if msg.contains("disk full")));
    assert_eq!(seen.len(), 2);
    assert!(seen.iter().all(|f| !f.is_terminal()));
}

#[tokio::test]
async fn cancellation_is_prompt_and_releases_the_connection() {
    let deltas: Vec<String> = (0..50).map(|i| format!("tok{i} ")).collect();
    let total = deltas.len();
    let mock = MockLlm::start(vec![Reply::SlowStream {
        deltas,
        delay: Duration::from_millis(100),
    }])
    .await
    .unwrap();
    let transport = Transport::from_config(&ConfigBuilder::openai(&mock).build()).unwrap();
    let recorded = Recorded::default();
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    let watcher = recorded.clone();
    tokio::spawn(async move {
        while watcher.fragments().len() < 2 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        trigger.cancel();
    });

    let started = std::time::Instant::now();
    let err = transport
        .stream(&harness::request("go"), &mut recorded.sink(), &cancel)
        .await
        .unwrap_err();
    let cancelled_at = recorded.fragments().len();

    assert!(matches!(err, LlmError::Cancelled));
    assert!(started.elapsed() < Duration::from_secs(3));
    assert_eq!(recorded.terminals(), 0);

    // Server notices the closed connection well before the stream would finish
    for _ in 0..30 {
        if mock.stream_dropped() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert!(mock.stream_dropped());
    assert!(mock.frames_sent() < total);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(recorded.fragments().len(), cancelled_at);
}

#[tokio::test]
async fn cancelling_inside_the_sink_stops_a_buffered_stream() {
    let deltas: Vec<String> = (0..40).map(|i| format!("d{i} ")).collect();
    let mock = MockLlm::start(vec![Reply::Stream(deltas)]).await.unwrap();
    let transport = Transport::from_config(&ConfigBuilder::openai(&mock).build()).unwrap();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let recorded = Recorded::default();
    let watcher = recorded.clone();
    let mut sink = sink_fn(move |fragment| {
        watcher.record(fragment);
        trigger.cancel();
        Ok(())
    });

    let err = transport
        .stream(&harness::request("go"), &mut sink, &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, LlmError::Cancelled));
    assert_eq!(recorded.fragments(), [StreamFragment::TextDelta("d0 ".to_owned())]);
    assert_eq!(recorded.terminals(), 0);
}

#[tokio::test]
async fn completion_provider_streams_single_shot() {
    let mock = MockLlm::start(vec![Reply::Completion("{\"n\": 1}".to_owned())]).await.unwrap();
    let transport = Transport::from_config(&ConfigBuilder::completion(&mock).build()).unwrap();
    let recorded = Recorded::default();

    transport
        .stream(&harness::request("go"), &mut recorded.sink(), &CancellationToken::new())
        .await
        .unwrap();

    let fragments = recorded.fragments();
    assert_eq!(fragments[0], StreamFragment::TextDelta("{\"n\": 1}".to_owned()));
    assert_eq!(fragments.last(), Some(&StreamFragment::Done));
    assert_eq!(recorded.terminals(), 1);
    assert_eq!(mock.requests()[0]["stream"], false);
}

#[derive(Debug, Deserialize, PartialEq)]
struct Greeting {
    greeting: String,
}

#[tokio::test]
async fn streamed_text_is_decoded() {
    let mock = MockLlm::start(vec![Reply::stream(["```json\n{\"gree", "ting\": \"hi\"", "}\n```"])])
        .await
        .unwrap();
    let generator = Generator::from_config(&ConfigBuilder::openai(&mock).build()).unwrap();
    let recorded = Recorded::default();

    let greeting: Greeting = generator
        .generate_stream(&harness::request("greet"), &mut recorded.sink(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(greeting, Greeting { greeting: "hi".to_owned() });
    assert_eq!(recorded.text(), "```json\n{\"greeting\": \"hi\"}\n```");
    assert_eq!(recorded.terminals(), 1);
}
