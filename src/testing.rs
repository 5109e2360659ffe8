//! Shared fixtures for unit tests.

use crate::credentials::{ApiKey, OpenAICredentials};
use serde_json::{json, Value};
use wiremock::MockServer;

const TEST_KEY_VAR: &str = "OPENAI_BLOCKS_TEST_KEY";

/// A key read from the environment, so blocks holding it can be saved.
pub(crate) fn test_key() -> ApiKey {
    std::env::set_var(TEST_KEY_VAR, "sk-test");
    ApiKey::from_env(TEST_KEY_VAR).expect("test key resolves")
}

/// Credentials that never reach a server.
pub(crate) fn offline_credentials() -> OpenAICredentials {
    OpenAICredentials::new(test_key())
}

/// Credentials pointed at a mock server.
pub(crate) fn mock_credentials(server: &MockServer) -> OpenAICredentials {
    OpenAICredentials::new(test_key()).with_api_base(server.uri())
}

/// A `/completions` response body with one choice.
pub(crate) fn completion_response(text: &str) -> Value {
    json!({
        "id": "cmpl-uqkvlQyYK7bGYrRHQ0eXlWi7",
        "object": "text_completion",
        "created": 1589478378,
        "model": "text-curie-001",
        "choices": [{
            "text": text,
            "index": 0,
            "logprobs": null,
            "finish_reason": "stop"
        }],
        "usage": {
            "prompt_tokens": 5,
            "completion_tokens": 7,
            "total_tokens": 12
        }
    })
}
