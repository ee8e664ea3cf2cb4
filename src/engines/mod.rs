//! Remote extraction engines
//!
//! The orchestrator talks to two optional engines: structural mining
//! ("3D layers") and OCR. Both sit behind traits so the orchestrator can be
//! driven by in-process implementations in tests, and both are resolved once
//! at startup into an [`EngineSlot`].

mod mining;
mod ocr;

pub use mining::{HttpMiningEngine, MiningEngine, MiningMetadata, MiningReport};
pub use ocr::{HttpOcrEngine, OcrEngine, OcrItemReport, OcrSummary, OcrText};

use std::sync::Arc;

/// An engine that is either available for the lifetime of the orchestrator
/// or absent altogether
pub enum EngineSlot<T: ?Sized> {
    Absent,
    Ready(Arc<T>),
}

impl<T: ?Sized> EngineSlot<T> {
    pub fn get(&self) -> Option<&Arc<T>> {
        match self {
            EngineSlot::Absent => None,
            EngineSlot::Ready(engine) => Some(engine),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, EngineSlot::Ready(_))
    }
}

impl<T: ?Sized> Default for EngineSlot<T> {
    fn default() -> Self {
        EngineSlot::Absent
    }
}

impl<T: ?Sized> Clone for EngineSlot<T> {
    fn clone(&self) -> Self {
        match self {
            EngineSlot::Absent => EngineSlot::Absent,
            EngineSlot::Ready(engine) => EngineSlot::Ready(Arc::clone(engine)),
        }
    }
}

/// Maps a transport failure of an engine call onto [`crate::CrawlError`]
pub(crate) fn transport_error(
    engine: &'static str,
    endpoint: &url::Url,
    err: reqwest::Error,
) -> crate::CrawlError {
    if err.is_timeout() {
        crate::CrawlError::Timeout {
            url: endpoint.to_string(),
        }
    } else {
        crate::CrawlError::Engine {
            engine,
            message: err.to_string(),
        }
    }
}
