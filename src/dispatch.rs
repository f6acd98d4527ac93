//! Delivery of normalized events and lifecycle markers to the ingestion service.

use std::sync::Arc;

use crate::contract::EventSink;
use crate::error::DispatchError;
use crate::logger::SyncLogger;
use crate::model::{NormalizedEvent, StreamTarget};

pub struct BatchDispatcher {
    sink: Arc<dyn EventSink>,
    logger: Arc<dyn SyncLogger>,
}

impl BatchDispatcher {
    pub fn new(sink: Arc<dyn EventSink>, logger: Arc<dyn SyncLogger>) -> Self {
        Self { sink, logger }
    }

    /// One batched request; an empty batch makes no network call.
    pub async fn dispatch(
        &self,
        username: &str,
        events: &[NormalizedEvent],
        target: &StreamTarget,
    ) -> Result<(), DispatchError> {
        if events.is_empty() {
            self.logger.debug(username, "no new events, skipping batch dispatch");
            return Ok(());
        }
        self.sink.send_batch(target, events).await?;
        self.logger.info(
            username,
            &format!("sent {} events to stream {}", events.len(), target.stream_id),
        );
        Ok(())
    }

    /// Single-event endpoint, for the start and complete markers.
    pub async fn send_marker(
        &self,
        event: &NormalizedEvent,
        target: &StreamTarget,
    ) -> Result<(), DispatchError> {
        self.sink.send_event(target, event).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::MockEventSink;
    use crate::logger::TracingLogger;
    use crate::normalize::sync_start;

    fn target() -> StreamTarget {
        StreamTarget {
            stream_id: "stream-1".into(),
            write_token: "wt".into(),
            watermark: None,
        }
    }

    #[tokio::test]
    async fn empty_batch_skips_the_network() {
        let mut sink = MockEventSink::new();
        sink.expect_send_batch().never();

        let dispatcher = BatchDispatcher::new(Arc::new(sink), TracingLogger::shared());
        assert!(dispatcher.dispatch("octo", &[], &target()).await.is_ok());
    }

    #[tokio::test]
    async fn batch_errors_propagate() {
        let mut sink = MockEventSink::new();
        sink.expect_send_batch().times(1).returning(|target, _| {
            Err(DispatchError::StreamNotFound {
                stream_id: target.stream_id.clone(),
            })
        });

        let dispatcher = BatchDispatcher::new(Arc::new(sink), TracingLogger::shared());
        let err = dispatcher
            .dispatch("octo", &[sync_start()], &target())
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::StreamNotFound { .. }));
    }
}
