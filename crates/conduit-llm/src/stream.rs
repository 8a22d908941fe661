//! Pull-driven aggregation of streamed vendor responses
//!
//! A vendor stream is a sequence of SSE `data` payloads. Each payload is fed
//! to a vendor-specific [`StreamAccumulator`], which may surface a text delta
//! as a partial response. Once the vendor signals completion (or the
//! transport ends cleanly) the accumulated state is converted exactly once
//! into the final, turn-complete response.
//!
//! Nothing runs in the background: the network is read only while the
//! caller polls, and dropping the stream drops the underlying response body.

use eventsource_stream::Eventsource;
use futures_util::stream::{self, BoxStream};
use futures_util::{Stream, StreamExt};

use crate::error::LlmError;
use crate::types::LlmResponse;

/// Lazily produced, finite, non-restartable sequence of canonical responses
pub type ResponseStream = BoxStream<'static, Result<LlmResponse, LlmError>>;

/// Sentinel payload closing a Chat Completions stream
const DONE_SENTINEL: &str = "[DONE]";

/// Outcome of feeding one payload to an accumulator
#[derive(Debug)]
pub enum Step {
    /// Emit this partial response now
    Partial(LlmResponse),
    /// Nothing to emit; keep reading
    Continue,
    /// The vendor signalled the end of the message
    Done,
}

/// Vendor-specific aggregate state for one streaming call
pub trait StreamAccumulator: Send + 'static {
    /// Fold one SSE `data` payload into the aggregate
    fn ingest(&mut self, data: &str) -> Result<Step, LlmError>;

    /// Convert the aggregate into the final response
    fn finish(self) -> Result<LlmResponse, LlmError>;
}

enum State<A> {
    Open {
        events: BoxStream<'static, Result<String, LlmError>>,
        accumulator: A,
    },
    Closed,
}

/// Drive `accumulator` over a stream of SSE payloads
///
/// Yields every partial in arrival order, then exactly one final response.
/// A transport or decode error is yielded in place of the final response and
/// ends the sequence; partials already yielded stand.
pub fn aggregate<S, A>(events: S, accumulator: A) -> ResponseStream
where
    S: Stream<Item = Result<String, LlmError>> + Send + 'static,
    A: StreamAccumulator,
{
    let initial = State::Open {
        events: events.boxed(),
        accumulator,
    };

    stream::unfold(initial, |state| async move {
        let State::Open {
            mut events,
            mut accumulator,
        } = state
        else {
            return None;
        };

        loop {
            let data = match events.next().await {
                Some(Ok(data)) => data,
                Some(Err(e)) => return Some((Err(e), State::Closed)),
                None => return Some((accumulator.finish(), State::Closed)),
            };

            if data.trim() == DONE_SENTINEL {
                return Some((accumulator.finish(), State::Closed));
            }

            match accumulator.ingest(&data) {
                Ok(Step::Partial(response)) => {
                    return Some((Ok(response), State::Open { events, accumulator }));
                }
                Ok(Step::Continue) => {}
                Ok(Step::Done) => return Some((accumulator.finish(), State::Closed)),
                Err(e) => return Some((Err(e), State::Closed)),
            }
        }
    })
    .boxed()
}

/// SSE `data` payloads of a streaming HTTP response
pub fn sse_data(response: reqwest::Response) -> impl Stream<Item = Result<String, LlmError>> + Send + 'static {
    response.bytes_stream().eventsource().map(|event| {
        event
            .map(|event| event.data)
            .map_err(|e| LlmError::Streaming(e.to_string()))
    })
}
