//! OpenAI SSE stream to [`StreamEvent`] adapter.
//!
//! Maps `async-openai`'s [`ChatCompletionResponseStream`] events to the
//! provider-agnostic [`StreamEvent`] enum defined in `confab-types`.
//! Fragments are forwarded in transport order; nothing here buffers or
//! reorders. Empty content deltas are dropped at this layer already, so
//! downstream consumers see only real fragments (the appender guards
//! against empties regardless).

use futures_util::StreamExt;

use async_openai::types::chat::ChatCompletionResponseStream;

use confab_core::llm::provider::EventStream;
use confab_types::llm::{LlmError, StreamEvent, Usage};

use super::map_finish_reason;

/// Map an async-openai [`ChatCompletionResponseStream`] to a stream of
/// [`StreamEvent`]s.
///
/// The returned stream emits events in this order:
/// 1. `Connected` -- immediately on entry
/// 2. `TextDelta` -- for each non-empty text content chunk
/// 3. `MessageDelta` -- with the stop reason when finish_reason appears
/// 4. `Usage` -- token usage (requires `stream_options.include_usage = true`)
/// 5. `Done` -- at the end of the stream
pub fn map_openai_stream(stream: ChatCompletionResponseStream) -> EventStream {
    Box::pin(async_stream::try_stream! {
        yield StreamEvent::Connected;

        let mut stream = stream;
        while let Some(result) = stream.next().await {
            let chunk = result.map_err(|e| LlmError::Stream(e.to_string()))?;

            // The final chunk carries usage with an empty choices array.
            if let Some(usage) = chunk.usage.as_ref() {
                yield StreamEvent::Usage(Usage {
                    input_tokens: usage.prompt_tokens,
                    output_tokens: usage.completion_tokens,
                });
            }

            for choice in &chunk.choices {
                if let Some(text) = choice.delta.content.clone() {
                    if !text.is_empty() {
                        yield StreamEvent::TextDelta { text };
                    }
                }

                if let Some(finish_reason) = choice.finish_reason.clone() {
                    yield StreamEvent::MessageDelta {
                        stop_reason: map_finish_reason(finish_reason),
                    };
                }
            }
        }

        yield StreamEvent::Done;
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_openai::types::chat::FinishReason;
    use confab_types::llm::StopReason;

    #[test]
    fn test_stop_reason_mapping_table() {
        let cases = [
            (FinishReason::Stop, StopReason::EndTurn),
            (FinishReason::Length, StopReason::MaxTokens),
            (FinishReason::ToolCalls, StopReason::EndTurn),
            (FinishReason::ContentFilter, StopReason::EndTurn),
            (FinishReason::FunctionCall, StopReason::EndTurn),
        ];
        for (finish, expected) in cases {
            assert_eq!(map_finish_reason(finish), expected);
        }
    }
}
