use berth_core::WatchEvent;
use berth_scheduler::{PodEventStream, SchedulerError};
use futures_util::stream::{self, Stream, StreamExt};
use std::fmt;
use tracing::trace;

struct LineBuffer<S> {
    chunks: S,
    buffer: Vec<u8>,
    exhausted: bool,
    failed: bool,
}

impl<S> LineBuffer<S> {
    /// Pop the next complete, non-blank line
    fn next_line(&mut self) -> Option<Vec<u8>> {
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if !is_blank(&line) {
                return Some(line);
            }
        }
        None
    }

    /// Whatever remains once the body has ended without a final newline
    fn take_remainder(&mut self) -> Option<Vec<u8>> {
        let rest = std::mem::take(&mut self.buffer);
        (!is_blank(&rest)).then_some(rest)
    }
}

fn is_blank(line: &[u8]) -> bool {
    line.iter().all(u8::is_ascii_whitespace)
}

fn parse_line(line: &[u8]) -> Result<WatchEvent, SchedulerError> {
    berth_core::from_json_slice(line).map_err(|e| {
        SchedulerError::malformed_event(format!(
            "{}: {}",
            e,
            String::from_utf8_lossy(line).trim()
        ))
    })
}

/// Turn a chunked response body of newline-delimited watch events into an
/// event stream.
///
/// Lines may be split across chunks. A line that is not a watch event
/// yields a [`SchedulerError::MalformedEvent`] item and decoding continues;
/// a body error yields a transport error and ends the stream.
pub fn decode_watch_lines<S, B, E>(chunks: S) -> PodEventStream
where
    S: Stream<Item = Result<B, E>> + Send + Unpin + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: fmt::Display + Send + 'static,
{
    let state = LineBuffer {
        chunks,
        buffer: Vec::new(),
        exhausted: false,
        failed: false,
    };

    stream::unfold(state, |mut state| async move {
        if state.failed {
            return None;
        }

        loop {
            if let Some(line) = state.next_line() {
                return Some((parse_line(&line), state));
            }

            if state.exhausted {
                let line = state.take_remainder()?;
                return Some((parse_line(&line), state));
            }

            match state.chunks.next().await {
                Some(Ok(chunk)) => {
                    trace!("Received {} bytes of watch data", chunk.as_ref().len());
                    state.buffer.extend_from_slice(chunk.as_ref());
                }
                Some(Err(e)) => {
                    state.failed = true;
                    let err = SchedulerError::transport_error(format!("watch stream broke: {}", e));
                    return Some((Err(err), state));
                }
                None => state.exhausted = true,
            }
        }
    })
    .boxed()
}
