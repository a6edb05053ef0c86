//! The seam between capabilities and a model provider

use async_trait::async_trait;

use super::{CompletionRequest, CompletionResponse, LlmError};

/// A model provider
///
/// Holds no conversation state. Tool round-trips within one capability
/// invocation travel in the request's message list.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a single completion request and wait for the full response
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Script {
        pending: VecDeque<CompletionResponse>,
        seen: Vec<CompletionRequest>,
    }

    /// Replays canned responses in call order and keeps every request
    pub struct MockLlmClient {
        script: Mutex<Script>,
    }

    impl MockLlmClient {
        pub fn new(responses: Vec<CompletionResponse>) -> Self {
            Self {
                script: Mutex::new(Script {
                    pending: responses.into(),
                    seen: Vec::new(),
                }),
            }
        }

        pub fn call_count(&self) -> usize {
            self.script.lock().unwrap().seen.len()
        }

        pub fn requests(&self) -> Vec<CompletionRequest> {
            self.script.lock().unwrap().seen.clone()
        }
    }

    #[async_trait]
    impl LlmClient for MockLlmClient {
        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            let mut script = self.script.lock().unwrap();
            script.seen.push(request);
            script
                .pending
                .pop_front()
                .ok_or_else(|| LlmError::InvalidResponse("mock script exhausted".to_string()))
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_replays_in_order_and_records() {
            let client = MockLlmClient::new(vec![CompletionResponse::text("first"), CompletionResponse::text("second")]);
            let request = CompletionRequest {
                system_prompt: "Split the feature".to_string(),
                ..Default::default()
            };

            let a = client.complete(request.clone()).await.unwrap();
            let b = client.complete(request).await.unwrap();
            assert_eq!(a.content.as_deref(), Some("first"));
            assert_eq!(b.content.as_deref(), Some("second"));
            assert_eq!(client.call_count(), 2);
            assert_eq!(client.requests()[1].system_prompt, "Split the feature");
        }

        #[tokio::test]
        async fn test_exhausted_script_is_an_error() {
            let client = MockLlmClient::new(vec![]);
            let err = client.complete(CompletionRequest::default()).await.unwrap_err();
            assert!(matches!(err, LlmError::InvalidResponse(_)));
            // the failed call is still recorded
            assert_eq!(client.call_count(), 1);
        }
    }
}
