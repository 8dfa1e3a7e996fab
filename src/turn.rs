//! The fragment sequence for one conversation turn.
//!
//! [`TurnStream`] passes streamed text fragments through to the caller while
//! accumulating them into the full response. When the terminal event
//! arrives, the accumulated text is appended to the [`Transcript`] as one
//! assistant message. A caller that stops pulling abandons the turn: nothing
//! further is read and nothing is appended, so the durable transcript is
//! append-complete-or-absent while the caller's live display may show
//! partial text.

use std::mem;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;

use crate::error::{Error, Result};
use crate::observability;
use crate::transcript::{Role, Transcript};
use crate::types::ChatEvent;

/// Completion counters reported by the terminal event of a turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TurnUsage {
    /// Tokens evaluated from the prompt.
    pub prompt_eval_count: u64,

    /// Tokens generated for the response.
    pub eval_count: u64,

    /// Wall-clock duration of the response, in nanoseconds.
    pub total_duration_ns: u64,
}

impl TurnUsage {
    fn from_event(event: &ChatEvent) -> Self {
        Self {
            prompt_eval_count: event.prompt_eval_count.unwrap_or(0),
            eval_count: event.eval_count.unwrap_or(0),
            total_duration_ns: event.total_duration.unwrap_or(0),
        }
    }
}

/// Running usage totals across the turns of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageTotals {
    /// Number of completed turns.
    pub turns: u64,

    /// Cumulative prompt tokens evaluated.
    pub prompt_eval_count: u64,

    /// Cumulative response tokens generated.
    pub eval_count: u64,

    /// Counters from the most recent completed turn, when the server
    /// reported them.
    pub last_turn: Option<TurnUsage>,
}

impl UsageTotals {
    fn record(&mut self, usage: Option<TurnUsage>) {
        self.turns = self.turns.saturating_add(1);
        if let Some(usage) = usage {
            self.prompt_eval_count = self.prompt_eval_count.saturating_add(usage.prompt_eval_count);
            self.eval_count = self.eval_count.saturating_add(usage.eval_count);
        }
        self.last_turn = usage;
    }
}

/// A lazy, pull-based sequence of text fragments for one turn.
///
/// Yields `Ok(fragment)` for each content event. A connection or status
/// failure at request time yields exactly one `Err` and ends the sequence;
/// a malformed event mid-stream does the same, failing the remainder of the
/// turn. In either error case no assistant message is appended — the user
/// message appended before the request stays, reflecting what was actually
/// sent.
pub struct TurnStream<'a> {
    inner: Pin<Box<dyn Stream<Item = Result<ChatEvent>> + Send>>,
    transcript: &'a mut Transcript,
    totals: &'a mut UsageTotals,
    buffer: String,
    pending_error: Option<Error>,
    finished: bool,
}

impl<'a> TurnStream<'a> {
    /// Wraps an event stream for one turn.
    pub(crate) fn new(
        inner: Pin<Box<dyn Stream<Item = Result<ChatEvent>> + Send>>,
        transcript: &'a mut Transcript,
        totals: &'a mut UsageTotals,
    ) -> Self {
        Self {
            inner,
            transcript,
            totals,
            buffer: String::new(),
            pending_error: None,
            finished: false,
        }
    }

    /// Builds the sequence for a turn whose request already failed: it
    /// yields the error once and ends.
    pub(crate) fn failed(
        error: Error,
        transcript: &'a mut Transcript,
        totals: &'a mut UsageTotals,
    ) -> Self {
        Self {
            inner: Box::pin(futures::stream::empty()),
            transcript,
            totals,
            buffer: String::new(),
            pending_error: Some(error),
            finished: false,
        }
    }

    fn commit(&mut self, usage: Option<TurnUsage>) {
        self.finished = true;
        let full_response = mem::take(&mut self.buffer);
        self.transcript.append(Role::Assistant, full_response);
        self.totals.record(usage);
        observability::TURNS_COMPLETED.click();
    }

    fn fail(&mut self) {
        self.finished = true;
        observability::TURNS_FAILED.click();
    }
}

impl Stream for TurnStream<'_> {
    type Item = Result<String>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if this.finished {
            return Poll::Ready(None);
        }

        if let Some(error) = this.pending_error.take() {
            this.fail();
            return Poll::Ready(Some(Err(error)));
        }

        match this.inner.as_mut().poll_next(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(None) => {
                // Server closed the stream without a terminal event; commit
                // what arrived, matching a server that just hangs up when
                // generation finishes.
                this.commit(None);
                Poll::Ready(None)
            }
            Poll::Ready(Some(Err(error))) => {
                this.fail();
                Poll::Ready(Some(Err(error)))
            }
            Poll::Ready(Some(Ok(event))) => {
                if event.done {
                    // The terminal event carries no content, only counters.
                    let usage = TurnUsage::from_event(&event);
                    this.commit(Some(usage));
                    Poll::Ready(None)
                } else {
                    let fragment = event.content().to_string();
                    this.buffer.push_str(&fragment);
                    Poll::Ready(Some(Ok(fragment)))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use futures::stream;

    fn events(
        items: Vec<Result<ChatEvent>>,
    ) -> Pin<Box<dyn Stream<Item = Result<ChatEvent>> + Send>> {
        Box::pin(stream::iter(items))
    }

    fn done_with_counters() -> ChatEvent {
        ChatEvent {
            done: true,
            prompt_eval_count: Some(7),
            eval_count: Some(21),
            total_duration: Some(1_000_000),
            ..ChatEvent::default()
        }
    }

    #[tokio::test]
    async fn fragments_arrive_in_order_and_commit() {
        let mut transcript = Transcript::new();
        transcript.append(Role::User, "Say hello");
        let mut totals = UsageTotals::default();

        let mut fragments = Vec::new();
        {
            let mut turn = TurnStream::new(
                events(vec![
                    Ok(ChatEvent::fragment("Hel")),
                    Ok(ChatEvent::fragment("lo")),
                    Ok(ChatEvent::fragment(" world")),
                    Ok(ChatEvent::finished()),
                ]),
                &mut transcript,
                &mut totals,
            );
            while let Some(item) = turn.next().await {
                fragments.push(item.unwrap());
            }
        }

        assert_eq!(fragments, vec!["Hel", "lo", " world"]);
        assert_eq!(transcript.len(), 2);
        let assistant = &transcript.snapshot()[1];
        assert_eq!(assistant.role, Role::Assistant);
        assert_eq!(assistant.content, "Hello world");
        assert_eq!(totals.turns, 1);
    }

    #[tokio::test]
    async fn failed_request_yields_exactly_one_error() {
        let mut transcript = Transcript::new();
        transcript.append(Role::User, "Say hello");
        let mut totals = UsageTotals::default();

        let mut items = Vec::new();
        {
            let mut turn = TurnStream::failed(
                Error::connection("connection refused", None),
                &mut transcript,
                &mut totals,
            );
            while let Some(item) = turn.next().await {
                items.push(item);
            }
        }

        assert_eq!(items.len(), 1);
        assert!(items[0].is_err());
        // Only the user message remains; no assistant entry for a failed turn.
        assert_eq!(transcript.len(), 1);
        assert_eq!(totals.turns, 0);
    }

    #[tokio::test]
    async fn malformed_event_hard_stops_the_turn() {
        let mut transcript = Transcript::new();
        let mut totals = UsageTotals::default();

        let mut items = Vec::new();
        {
            let mut turn = TurnStream::new(
                events(vec![
                    Ok(ChatEvent::fragment("Hel")),
                    Err(Error::serialization("bad line", None)),
                    Ok(ChatEvent::fragment("never seen")),
                    Ok(ChatEvent::finished()),
                ]),
                &mut transcript,
                &mut totals,
            );
            while let Some(item) = turn.next().await {
                items.push(item);
            }
        }

        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(items[1].is_err());
        // The partial buffer is never committed.
        assert!(transcript.is_empty());
    }

    #[tokio::test]
    async fn abandoned_turn_appends_nothing() {
        let mut transcript = Transcript::new();
        let mut totals = UsageTotals::default();

        {
            let mut turn = TurnStream::new(
                events(vec![
                    Ok(ChatEvent::fragment("partial")),
                    Ok(ChatEvent::fragment(" answer")),
                    Ok(ChatEvent::finished()),
                ]),
                &mut transcript,
                &mut totals,
            );
            let first = turn.next().await.unwrap().unwrap();
            assert_eq!(first, "partial");
            // Caller walks away; the rest of the stream is never pulled.
        }

        assert!(transcript.is_empty());
        assert_eq!(totals.turns, 0);
    }

    #[tokio::test]
    async fn eof_without_terminal_event_commits_buffer() {
        let mut transcript = Transcript::new();
        let mut totals = UsageTotals::default();

        {
            let mut turn = TurnStream::new(
                events(vec![Ok(ChatEvent::fragment("truncated"))]),
                &mut transcript,
                &mut totals,
            );
            while let Some(item) = turn.next().await {
                item.unwrap();
            }
        }

        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript.snapshot()[0].content, "truncated");
        assert_eq!(totals.last_turn, None);
    }

    #[tokio::test]
    async fn terminal_counters_feed_totals() {
        let mut transcript = Transcript::new();
        let mut totals = UsageTotals::default();

        {
            let mut turn = TurnStream::new(
                events(vec![
                    Ok(ChatEvent::fragment("hi")),
                    Ok(done_with_counters()),
                ]),
                &mut transcript,
                &mut totals,
            );
            while let Some(item) = turn.next().await {
                item.unwrap();
            }
        }

        assert_eq!(totals.turns, 1);
        assert_eq!(totals.prompt_eval_count, 7);
        assert_eq!(totals.eval_count, 21);
        let last = totals.last_turn.unwrap();
        assert_eq!(last.eval_count, 21);
    }

    #[tokio::test]
    async fn empty_content_events_yield_empty_fragments() {
        let mut transcript = Transcript::new();
        let mut totals = UsageTotals::default();

        let mut fragments = Vec::new();
        {
            let mut turn = TurnStream::new(
                events(vec![
                    Ok(ChatEvent::fragment("")),
                    Ok(ChatEvent::fragment("text")),
                    Ok(ChatEvent::finished()),
                ]),
                &mut transcript,
                &mut totals,
            );
            while let Some(item) = turn.next().await {
                fragments.push(item.unwrap());
            }
        }

        assert_eq!(fragments, vec!["", "text"]);
        assert_eq!(transcript.snapshot()[0].content, "text");
    }
}
