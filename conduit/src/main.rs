#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod args;

use std::io::Write;

use args::Args;
use clap::Parser;
use conduit_config::{Config, LlmProviderConfig};
use conduit_llm::{Content, GenerationOptions, LanguageModel, LlmRequest, build_model};
use futures_util::StreamExt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = Config::load(&args.config)?;

    conduit_telemetry::init(config.logging.as_ref(), "warn")?;

    let (provider, provider_config) = select_provider(&config, args.provider.as_deref())?;
    let model = build_model(provider, provider_config)?;

    let request = LlmRequest::new(
        vec![Content::user_text(args.prompt.join(" "))],
        GenerationOptions {
            system_instruction: args.system.map(Content::user_text),
            ..GenerationOptions::default()
        },
    );

    tracing::info!(provider, model = model.name(), stream = args.stream, "sending prompt");

    // Dropping the response stream closes the upstream connection
    tokio::select! {
        result = print_responses(model.as_ref(), &request, args.stream) => result?,
        signal = tokio::signal::ctrl_c() => {
            signal?;
            tracing::info!("interrupted");
        }
    }

    Ok(())
}

/// Look up the named provider, or the first configured one
fn select_provider<'a>(config: &'a Config, name: Option<&str>) -> anyhow::Result<(&'a str, &'a LlmProviderConfig)> {
    let providers = &config.llm.providers;

    let entry = match name {
        Some(name) => providers.get_key_value(name).ok_or_else(|| {
            let known: Vec<_> = providers.keys().map(String::as_str).collect();
            anyhow::anyhow!("unknown provider '{name}', configured: {}", known.join(", "))
        })?,
        None => providers
            .first()
            .ok_or_else(|| anyhow::anyhow!("no LLM provider configured"))?,
    };

    Ok((entry.0.as_str(), entry.1))
}

async fn print_responses(model: &dyn LanguageModel, request: &LlmRequest, streaming: bool) -> anyhow::Result<()> {
    let mut responses = model.generate_content(request, streaming);
    let mut stdout = std::io::stdout();

    while let Some(response) = responses.next().await {
        let response = response?;

        if response.partial {
            write!(stdout, "{}", response.content.text())?;
            stdout.flush()?;
            continue;
        }

        // Streamed text was already printed piecewise
        if streaming {
            writeln!(stdout)?;
        } else {
            writeln!(stdout, "{}", response.content.text())?;
        }

        for call in response.content.function_calls() {
            let args = serde_json::Value::Object(call.args.clone());
            writeln!(stdout, "[tool call {}] {}({args})", call.id, call.name)?;
        }

        if let Some(usage) = response.usage {
            tracing::info!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                total_tokens = usage.total_tokens,
                finish_reason = ?response.finish_reason,
                "turn complete"
            );
        }
    }

    Ok(())
}
