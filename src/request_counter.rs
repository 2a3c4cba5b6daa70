use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Running totals of outbound calls to the AI backend.
#[derive(Clone)]
pub struct RequestCounter {
    chat_count: Arc<AtomicU64>,
    ingest_count: Arc<AtomicU64>,
    failure_count: Arc<AtomicU64>,
    start_time: Instant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CounterSnapshot {
    pub chat_requests: u64,
    pub ingest_requests: u64,
    pub failed_requests: u64,
    pub uptime_secs: u64,
}

impl RequestCounter {
    pub fn new() -> Self {
        Self {
            chat_count: Arc::new(AtomicU64::new(0)),
            ingest_count: Arc::new(AtomicU64::new(0)),
            failure_count: Arc::new(AtomicU64::new(0)),
            start_time: Instant::now(),
        }
    }

    pub fn log_chat_request(&self, context: &str) -> u64 {
        let count = self.chat_count.fetch_add(1, Ordering::SeqCst) + 1;

        tracing::info!(
            "BACKEND REQUEST #{} | Type: CHAT | Context: {} | Total Chat: {} | Total Ingest: {}",
            self.total_requests(),
            context,
            count,
            self.ingest_count.load(Ordering::SeqCst),
        );

        count
    }

    pub fn log_ingest_request(&self, context: &str) -> u64 {
        let count = self.ingest_count.fetch_add(1, Ordering::SeqCst) + 1;

        tracing::info!(
            "BACKEND REQUEST #{} | Type: INGEST | Context: {} | Total Chat: {} | Total Ingest: {}",
            self.total_requests(),
            context,
            self.chat_count.load(Ordering::SeqCst),
            count,
        );

        count
    }

    pub fn log_failure(&self) -> u64 {
        self.failure_count.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn total_requests(&self) -> u64 {
        self.chat_count.load(Ordering::SeqCst) + self.ingest_count.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            chat_requests: self.chat_count.load(Ordering::SeqCst),
            ingest_requests: self.ingest_count.load(Ordering::SeqCst),
            failed_requests: self.failure_count.load(Ordering::SeqCst),
            uptime_secs: self.start_time.elapsed().as_secs(),
        }
    }
}

impl Default for RequestCounter {
    fn default() -> Self {
        Self::new()
    }
}
