use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::{AbortHandle, Abortable};
use futures::{Stream, StreamExt};

use crate::{AiError, TextStream};

/// A streamed model reply that can be cancelled and keeps its transcript.
///
/// Each polled delta is appended to [`text`](Self::text) before it is
/// returned. Aborting through an [`AbortHandle`] ends the stream at the next
/// poll; the text received so far is kept.
pub struct ReplyStream {
    inner: Abortable<TextStream>,
    handle: AbortHandle,
    text: String,
}

impl ReplyStream {
    pub fn new(stream: TextStream) -> Self {
        let (handle, registration) = AbortHandle::new_pair();
        Self {
            inner: Abortable::new(stream, registration),
            handle,
            text: String::new(),
        }
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.handle.clone()
    }

    pub fn abort(&self) {
        self.handle.abort();
    }

    pub fn is_aborted(&self) -> bool {
        self.inner.is_aborted()
    }

    /// Everything received so far.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Drive the stream to the end. `on_chunk` sees each delta and the
    /// accumulated text. Returns the full text, which is partial if aborted.
    pub async fn finish<F>(mut self, mut on_chunk: F) -> Result<String, AiError>
    where
        F: FnMut(&str, &str),
    {
        while let Some(chunk) = self.next().await {
            let chunk = chunk?;
            on_chunk(&chunk, &self.text);
        }
        Ok(self.text)
    }
}

impl Stream for ReplyStream {
    type Item = Result<String, AiError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let polled = this.inner.poll_next_unpin(cx);
        if let Poll::Ready(Some(Ok(chunk))) = &polled {
            this.text.push_str(chunk);
        }
        polled
    }
}
