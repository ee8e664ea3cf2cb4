//! Crawl outcome notifications

use crate::crawler::CrawlResult;
use tokio::sync::broadcast;

/// Channel capacity; slow subscribers past this many events start lagging
const EVENT_CAPACITY: usize = 256;

/// Emitted exactly once per crawl
#[derive(Debug, Clone)]
pub enum CrawlEvent {
    /// The pipeline got through; engine errors may still be present
    Complete(CrawlResult),
    /// The pipeline stopped early (robots denial, rate-limit misconfiguration, ...)
    Error(CrawlResult),
}

impl CrawlEvent {
    pub fn result(&self) -> &CrawlResult {
        match self {
            CrawlEvent::Complete(result) | CrawlEvent::Error(result) => result,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, CrawlEvent::Error(_))
    }
}

/// Fan-out of crawl events to any number of subscribers
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CrawlEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CrawlEvent> {
        self.sender.subscribe()
    }

    /// Publishes the event for a finished crawl
    ///
    /// Having no subscribers is not an error.
    pub fn publish(&self, result: &CrawlResult) {
        let event = if result.success {
            CrawlEvent::Complete(result.clone())
        } else {
            CrawlEvent::Error(result.clone())
        };

        if self.sender.send(event).is_err() {
            tracing::trace!(url = %result.url, "No event subscribers");
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
