#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod args;

use std::io::Write;

use args::Args;
use clap::Parser;
use quill_config::Config;
use quill_llm::{GenerationRequest, Generator, LlmError, Message, SamplingOptions, StreamFragment, sink_fn};
use tokio_util::sync::CancellationToken;

const DEFAULT_SYSTEM_PROMPT: &str = "Reply with a single JSON object and nothing else.";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = Config::load(&args.config)?;
    if let Some(model) = args.model {
        config.llm.model = model;
    }

    quill_telemetry::init(&config.log, args.log.as_deref())?;

    tracing::debug!(config_path = %args.config.display(), model = %config.llm.model, "starting quill");

    let generator = Generator::from_config(&config.llm)?;
    let request = GenerationRequest::new(
        args.system.unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_owned()),
        vec![Message::user(args.prompt.join(" "))],
        SamplingOptions::from_config(&config.llm),
    );

    let result = if args.stream {
        stream(&generator, &request).await
    } else {
        tokio::select! {
            result = generator.generate::<serde_json::Value>(&request) => result,
            () = shutdown_signal() => Err(LlmError::Cancelled),
        }
    };

    let value = result.inspect_err(|e| {
        if let Some(raw) = e.raw_output() {
            tracing::error!(raw = %raw, "model output could not be decoded");
        }
    })?;

    println!("{}", serde_json::to_string_pretty(&value)?);

    Ok(())
}

/// Stream text to stderr as it arrives, then decode
async fn stream(generator: &Generator, request: &GenerationRequest) -> Result<serde_json::Value, LlmError> {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();

    tokio::spawn(async move {
        tokio::select! {
            () = shutdown_signal() => trigger.cancel(),
            () = trigger.cancelled() => {}
        }
    });

    let mut stderr = std::io::stderr();
    let mut sink = sink_fn(move |fragment| {
        match fragment {
            StreamFragment::TextDelta(text) => {
                write!(stderr, "{text}")?;
                stderr.flush()?;
            }
            StreamFragment::Done => writeln!(stderr)?,
            StreamFragment::Error(message) => writeln!(stderr, "\nprovider error: {message}")?,
            StreamFragment::ToolCallRequest(call) => tracing::debug!(tool = %call.name, "model requested tool"),
            StreamFragment::SessionInfo(_) | StreamFragment::Usage(_) => {}
        }
        Ok(())
    });

    let result = generator.generate_stream(request, &mut sink, &cancel).await;
    cancel.cancel();
    result
}

/// Wait for Ctrl+C
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }

    tracing::info!("interrupt received, cancelling");
}
