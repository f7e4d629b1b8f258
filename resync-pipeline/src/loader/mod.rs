//! Loader module for the resync pipeline.
//!
//! Submits transformed documents to the search index.

mod retry;

pub use retry::RetryPolicy;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::errors::RecordError;
use resync_repository::{SearchEngineClient, SearchError};
use resync_shared::IndexableDocument;

/// Default time allowed for a single index request.
pub const DEFAULT_SUBMIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Acknowledgment of an indexed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack {
    /// Number of attempts it took, 1 when the first request succeeded.
    pub attempts: u32,
}

/// Submitter that indexes documents one at a time.
///
/// The submitter is responsible for:
/// - Bounding every request with a timeout
/// - Retrying transient failures with exponential backoff
/// - Classifying failures as terminal for the document
#[derive(Clone)]
pub struct IndexSubmitter {
    client: Arc<dyn SearchEngineClient>,
    retry: RetryPolicy,
    timeout: Duration,
}

impl IndexSubmitter {
    /// Create a new submitter with the default retry policy and timeout.
    pub fn new(client: Arc<dyn SearchEngineClient>) -> Self {
        Self::with_policy(client, RetryPolicy::default(), DEFAULT_SUBMIT_TIMEOUT)
    }

    /// Create a new submitter with a custom retry policy and timeout.
    pub fn with_policy(
        client: Arc<dyn SearchEngineClient>,
        retry: RetryPolicy,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            retry,
            timeout,
        }
    }

    /// Index a document, retrying transient failures.
    ///
    /// # Returns
    ///
    /// * `Ok(Ack)` - The engine acknowledged the document
    /// * `Err(RecordError::Index)` - A non-retryable failure, or retries were exhausted
    pub async fn submit(&self, document: &IndexableDocument) -> Result<Ack, RecordError> {
        let max_attempts = self.retry.max_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;

            let error = match self.attempt(document).await {
                Ok(()) => {
                    if attempt > 1 {
                        debug!(
                            attempt = attempt,
                            record_id = %document.id,
                            "Document index succeeded after retry"
                        );
                    }
                    return Ok(Ack { attempts: attempt });
                }
                Err(e) => e,
            };

            if !Self::is_retryable_error(&error) {
                debug!(record_id = %document.id, error = %error, "Non-retryable error encountered");
                return Err(RecordError::Index {
                    source: error,
                    attempts: attempt,
                });
            }

            if attempt >= max_attempts {
                warn!(
                    record_id = %document.id,
                    attempts = attempt,
                    error = %error,
                    "Giving up on document after retries"
                );
                return Err(RecordError::Index {
                    source: error,
                    attempts: attempt,
                });
            }

            let delay = self.retry.delay_for(attempt - 1);
            warn!(
                attempt = attempt,
                max_retries = self.retry.max_retries,
                delay_ms = delay.as_millis() as u64,
                record_id = %document.id,
                error = %error,
                "Document index failed, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// A single index request bounded by the timeout.
    async fn attempt(&self, document: &IndexableDocument) -> Result<(), SearchError> {
        match tokio::time::timeout(self.timeout, self.client.index_document(document)).await {
            Ok(result) => result,
            Err(_) => Err(SearchError::timeout(format!(
                "index request exceeded {:?}",
                self.timeout
            ))),
        }
    }

    /// Determine if an error is retryable (transient failures).
    fn is_retryable_error(error: &SearchError) -> bool {
        match error {
            SearchError::ConnectionError(_) | SearchError::Timeout(_) => true,
            // Throttling and server-side failures
            SearchError::Rejected { status, .. } => *status == 429 || *status >= 500,
            // Parse errors might be transient (e.g., a proxy error page)
            SearchError::ParseError(_) => true,
            SearchError::IndexError(msg) => {
                let msg_lower = msg.to_lowercase();
                msg_lower.contains("rate limit")
                    || msg_lower.contains("timeout")
                    || msg_lower.contains("connection")
                    || msg_lower.contains("503")
                    || msg_lower.contains("429")
            }
            SearchError::QueryError(_) | SearchError::IndexManagementError(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use resync_shared::{SearchQuery, SearchResponse};
    use serde_json::Map;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use uuid::Uuid;

    /// Mock search client replaying a scripted sequence of index results.
    struct ScriptedClient {
        results: Mutex<Vec<Result<(), SearchError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedClient {
        fn new(mut results: Vec<Result<(), SearchError>>) -> Self {
            results.reverse();
            Self {
                results: Mutex::new(results),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SearchEngineClient for ScriptedClient {
        async fn search(&self, _query: &SearchQuery) -> Result<SearchResponse, SearchError> {
            Ok(SearchResponse::empty())
        }

        async fn index_document(&self, _doc: &IndexableDocument) -> Result<(), SearchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.results.lock().unwrap().pop().unwrap_or(Ok(()))
        }

        async fn ensure_index_exists(&self) -> Result<(), SearchError> {
            Ok(())
        }

        async fn delete_index_if_exists(&self) -> Result<(), SearchError> {
            Ok(())
        }

        async fn refresh(&self) -> Result<(), SearchError> {
            Ok(())
        }

        async fn health_check(&self) -> Result<bool, SearchError> {
            Ok(true)
        }
    }

    /// Mock search client that never answers.
    struct HangingClient;

    #[async_trait]
    impl SearchEngineClient for HangingClient {
        async fn search(&self, _query: &SearchQuery) -> Result<SearchResponse, SearchError> {
            Ok(SearchResponse::empty())
        }

        async fn index_document(&self, _doc: &IndexableDocument) -> Result<(), SearchError> {
            futures::future::pending().await
        }

        async fn ensure_index_exists(&self) -> Result<(), SearchError> {
            Ok(())
        }

        async fn delete_index_if_exists(&self) -> Result<(), SearchError> {
            Ok(())
        }

        async fn refresh(&self) -> Result<(), SearchError> {
            Ok(())
        }

        async fn health_check(&self) -> Result<bool, SearchError> {
            Ok(true)
        }
    }

    fn document() -> IndexableDocument {
        IndexableDocument::new(Uuid::new_v4(), Map::new())
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_transient_errors() {
        let client = Arc::new(ScriptedClient::new(vec![
            Err(SearchError::connection("connection reset")),
            Err(SearchError::rejected(503, "unavailable")),
            Ok(()),
        ]));
        let submitter = IndexSubmitter::new(client.clone());

        let ack = submitter.submit(&document()).await.unwrap();

        assert_eq!(ack.attempts, 3);
        assert_eq!(client.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_does_not_retry_rejections() {
        let client = Arc::new(ScriptedClient::new(vec![Err(SearchError::rejected(
            400,
            "mapper_parsing_exception",
        ))]));
        let submitter = IndexSubmitter::new(client.clone());

        let result = submitter.submit(&document()).await;

        assert!(matches!(
            result,
            Err(RecordError::Index { attempts: 1, .. })
        ));
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_retries() {
        let client = Arc::new(ScriptedClient::new(vec![
            Err(SearchError::rejected(429, "too many requests")),
            Err(SearchError::rejected(429, "too many requests")),
            Err(SearchError::rejected(429, "too many requests")),
        ]));
        let retry = RetryPolicy::default().with_max_retries(2);
        let submitter = IndexSubmitter::with_policy(client.clone(), retry, DEFAULT_SUBMIT_TIMEOUT);

        let result = submitter.submit(&document()).await;

        assert!(matches!(
            result,
            Err(RecordError::Index { attempts: 3, .. })
        ));
        assert_eq!(client.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_disabled() {
        let client = Arc::new(ScriptedClient::new(vec![Err(SearchError::connection(
            "refused",
        ))]));
        let submitter =
            IndexSubmitter::with_policy(client.clone(), RetryPolicy::disabled(), DEFAULT_SUBMIT_TIMEOUT);

        assert!(submitter.submit(&document()).await.is_err());
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_request_times_out() {
        let submitter = IndexSubmitter::with_policy(
            Arc::new(HangingClient),
            RetryPolicy::disabled(),
            Duration::from_secs(2),
        );

        let result = submitter.submit(&document()).await;

        match result {
            Err(RecordError::Index { source, .. }) => {
                assert!(matches!(source, SearchError::Timeout(_)))
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[test]
    fn test_is_retryable_error() {
        assert!(IndexSubmitter::is_retryable_error(&SearchError::timeout("slow")));
        assert!(IndexSubmitter::is_retryable_error(&SearchError::rejected(502, "bad gateway")));
        assert!(IndexSubmitter::is_retryable_error(&SearchError::index("rate limit exceeded")));
        assert!(!IndexSubmitter::is_retryable_error(&SearchError::rejected(404, "no index")));
        assert!(!IndexSubmitter::is_retryable_error(&SearchError::index("document too large")));
        assert!(!IndexSubmitter::is_retryable_error(&SearchError::query("bad query")));
    }
}
