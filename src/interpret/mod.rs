//! Error interpretation.
//!
//! [`ExceptionInterpreter`] decorates a plain function. When the function fails,
//! the interpreter loads a named [`CompletionModel`] block, asks it to explain
//! the error, and hands back the same error type with the explanation appended:
//!
//! ```text
//! <original message>
//! OpenAI: <explanation>
//! ```
//!
//! Interpretation is best effort. If the block cannot be loaded or the request
//! fails, the original error comes back untouched.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use openai_blocks::blocks::FileBlockStore;
//! use openai_blocks::interpret::ExceptionInterpreter;
//! use openai_blocks::workflow::Function;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(FileBlockStore::new("blocks.toml"));
//! let parse = ExceptionInterpreter::new("explainer", store)
//!     .with_traceback_tail(1)
//!     .decorate(Function::new("parse", |raw: &str| -> anyhow::Result<u32> {
//!         Ok(raw.parse()?)
//!     }))?;
//!
//! if let Err(e) = parse.call("forty-two") {
//!     eprintln!("{}", e);
//! }
//! # Ok(())
//! # }
//! ```

mod reconstruct;

pub use reconstruct::{backtrace_lines, Reconstruct};

use crate::blocks::{load_block, BlockStore};
use crate::completion::{CompletionModel, Overrides};
use crate::error::{BlocksError, Result};
use crate::workflow::{Function, Unit, UnitKind};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Default text placed before the fenced error.
pub const DEFAULT_PROMPT_PREFIX: &str = "Explain:";

/// Marker placed before the explanation in the rebuilt message.
pub const INTERPRETATION_MARKER: &str = "OpenAI: ";

/// Explains errors with a named completion block.
#[derive(Clone)]
pub struct ExceptionInterpreter {
    block_name: String,
    store: Arc<dyn BlockStore>,
    prompt_prefix: String,
    traceback_tail: usize,
}

impl ExceptionInterpreter {
    /// Interpret errors with the completion block named `block_name` in `store`.
    pub fn new(block_name: impl Into<String>, store: Arc<dyn BlockStore>) -> Self {
        Self {
            block_name: block_name.into(),
            store,
            prompt_prefix: DEFAULT_PROMPT_PREFIX.to_string(),
            traceback_tail: 0,
        }
    }

    pub fn with_prompt_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prompt_prefix = prefix.into();
        self
    }

    /// Include the last `lines` traceback lines in the prompt.
    pub fn with_traceback_tail(mut self, lines: usize) -> Self {
        self.traceback_tail = lines;
        self
    }

    /// Wrap a unit.
    ///
    /// Flows and tasks are refused with a configuration error: the interpreter
    /// must sit inside them, where it sees the function's own failure rather than
    /// the orchestrator's.
    pub fn decorate<U: Unit>(&self, unit: U) -> Result<Interpreted<U>> {
        if unit.kind() != UnitKind::Function {
            return Err(BlocksError::Config(format!(
                "'{}' is a {}; place the error interpreter inside the {} instead of around it",
                unit.name(),
                unit.kind(),
                unit.kind()
            )));
        }
        debug!("Interpreting errors of '{}' with block '{}'", unit.name(), self.block_name);

        Ok(Interpreted {
            interpreter: self.clone(),
            unit,
        })
    }

    /// Explain `error` and rebuild it, or return it unchanged if that fails.
    pub async fn intercept<E: Reconstruct>(&self, error: E) -> E {
        match self.interpret(&error).await {
            Ok(message) => error.reconstruct(message),
            Err(e) => {
                warn!("Could not interpret error with block '{}': {}", self.block_name, e);
                error
            }
        }
    }

    /// Blocking form of [`intercept`](Self::intercept).
    ///
    /// Runs on a private runtime in a scoped thread, so it is safe to call both
    /// from plain threads and from inside an async runtime.
    pub fn intercept_blocking<E: Reconstruct + Send>(&self, error: E) -> E {
        std::thread::scope(|scope| {
            scope
                .spawn(|| {
                    match tokio::runtime::Builder::new_current_thread()
                        .enable_all()
                        .build()
                    {
                        Ok(runtime) => runtime.block_on(self.intercept(error)),
                        Err(e) => {
                            warn!("Could not start a runtime to interpret error: {}", e);
                            error
                        }
                    }
                })
                .join()
                .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
        })
    }

    async fn interpret<E: Reconstruct>(&self, error: &E) -> Result<String> {
        let model: CompletionModel = load_block(self.store.as_ref(), &self.block_name).await?;

        let message = error.to_string();
        let traceback = if self.traceback_tail > 0 {
            let lines = error.traceback();
            let start = lines.len().saturating_sub(self.traceback_tail);
            lines[start..].to_vec()
        } else {
            Vec::new()
        };
        let prompt = build_prompt(&self.prompt_prefix, &traceback, &message);

        let response = model.submit_prompt(&prompt, &Overrides::new()).await?;
        let interpretation = response
            .choices
            .first()
            .map(|choice| choice.text.trim().to_string())
            .ok_or_else(|| BlocksError::EmptyResponse("completion had no choices".to_string()))?;

        info!("Interpreted error with block '{}'", self.block_name);
        Ok(format!("{}\n{}{}", message, INTERPRETATION_MARKER, interpretation))
    }
}

/// Build the prompt sent to the completion block.
pub fn build_prompt(prefix: &str, traceback: &[String], message: &str) -> String {
    let body = if traceback.is_empty() {
        message.to_string()
    } else {
        format!("{}\n{}", traceback.join("\n"), message)
    };
    format!("{} ```\n{}\n```", prefix, body)
}

/// A function whose errors are interpreted.
pub struct Interpreted<U> {
    interpreter: ExceptionInterpreter,
    unit: U,
}

impl<F> Interpreted<Function<F>> {
    /// Call a synchronous function.
    pub fn call<A, T, E>(&self, args: A) -> std::result::Result<T, E>
    where
        F: Fn(A) -> std::result::Result<T, E>,
        E: Reconstruct + Send,
    {
        (self.unit.func)(args).map_err(|error| self.interpreter.intercept_blocking(error))
    }

    /// Call a function returning a future.
    pub async fn call_async<A, Fut, T, E>(&self, args: A) -> std::result::Result<T, E>
    where
        F: Fn(A) -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: Reconstruct,
    {
        match (self.unit.func)(args).await {
            Ok(value) => Ok(value),
            Err(error) => Err(self.interpreter.intercept(error).await),
        }
    }
}

impl<U: Unit> Unit for Interpreted<U> {
    fn name(&self) -> &str {
        self.unit.name()
    }

    fn kind(&self) -> UnitKind {
        UnitKind::Function
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::{save_block, MemoryBlockStore};
    use crate::testing::{completion_response, mock_credentials};
    use crate::workflow::Orchestrated;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug, thiserror::Error, PartialEq)]
    enum ReportError {
        #[error("{0}")]
        Parse(String),
        #[error("{message}")]
        Quota { message: String, limit: u32 },
    }

    impl Reconstruct for ReportError {
        fn reconstruct(self, message: String) -> Self {
            match self {
                ReportError::Parse(_) => ReportError::Parse(message),
                ReportError::Quota { limit, .. } => ReportError::Quota { message, limit },
            }
        }

        fn traceback(&self) -> Vec<String> {
            vec![
                "./src/report.rs:10:5 in report::load_report".to_string(),
                "./src/report.rs:42:22 in report::parse_total".to_string(),
            ]
        }
    }

    /// Counts lookups on top of a memory store.
    #[derive(Default)]
    struct CountingStore {
        inner: MemoryBlockStore,
        gets: AtomicUsize,
    }

    #[async_trait]
    impl BlockStore for CountingStore {
        async fn get(&self, block_type: &str, name: &str) -> Result<Option<Value>> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            self.inner.get(block_type, name).await
        }

        async fn put(&self, block_type: &str, name: &str, document: Value) -> Result<()> {
            self.inner.put(block_type, name, document).await
        }

        async fn delete(&self, block_type: &str, name: &str) -> Result<bool> {
            self.inner.delete(block_type, name).await
        }

        async fn list(&self, block_type: &str) -> Result<Vec<String>> {
            self.inner.list(block_type).await
        }
    }

    async fn store_with_block(server: &MockServer) -> Arc<CountingStore> {
        let store = Arc::new(CountingStore::default());
        let model = CompletionModel::new(mock_credentials(server));
        save_block(&store.inner, "explainer", &model).await.unwrap();
        store
    }

    async fn mount_completion(server: &MockServer, prompt: &str, text: &str) {
        Mock::given(method("POST"))
            .and(path("/completions"))
            .and(body_partial_json(json!({ "prompt": prompt })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_response(text)))
            .expect(1)
            .mount(server)
            .await;
    }

    #[test]
    fn test_build_prompt_without_traceback() {
        assert_eq!(build_prompt("Explain:", &[], "boom"), "Explain: ```\nboom\n```");
    }

    #[test]
    fn test_build_prompt_with_traceback() {
        let traceback = vec!["frame a".to_string(), "frame b".to_string()];
        assert_eq!(
            build_prompt("Why?", &traceback, "boom"),
            "Why? ```\nframe a\nframe b\nboom\n```"
        );
    }

    #[test]
    fn test_orchestrated_units_are_refused() {
        let store = Arc::new(CountingStore::default());
        let interpreter = ExceptionInterpreter::new("explainer", store.clone());

        let flow = interpreter.decorate(Orchestrated::flow("nightly", |_: ()| ()));
        assert!(matches!(flow, Err(BlocksError::Config(_))));

        let task = interpreter.decorate(Orchestrated::task("fetch", |_: ()| ()));
        assert!(matches!(task, Err(BlocksError::Config(_))));

        let plain = interpreter
            .decorate(Function::new("plain", |_: ()| Ok::<(), ReportError>(())))
            .unwrap();
        assert_eq!(plain.kind(), UnitKind::Function);

        // Wrapping an interpreted function in a task is the supported order.
        let task = Orchestrated::task("plain-task", |_: ()| plain.call(()));
        assert!(task.run(()).is_ok());
        assert_eq!(store.gets.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_success_never_loads_block() {
        let server = MockServer::start().await;
        let store = store_with_block(&server).await;
        let interpreter = ExceptionInterpreter::new("explainer", store.clone());

        let double = interpreter
            .decorate(Function::new("double", |x: u32| Ok::<u32, ReportError>(x * 2)))
            .unwrap();
        assert_eq!(double.call(21).unwrap(), 42);

        let double_async = interpreter
            .decorate(Function::new("double", |x: u32| async move {
                Ok::<u32, ReportError>(x * 2)
            }))
            .unwrap();
        assert_eq!(double_async.call_async(4).await.unwrap(), 8);

        assert_eq!(store.gets.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failure_is_explained_once() {
        let server = MockServer::start().await;
        mount_completion(
            &server,
            "Explain: ```\nover quota\n```",
            "\n  Ask for a bigger quota. \n",
        )
        .await;
        let store = store_with_block(&server).await;

        let fetch = ExceptionInterpreter::new("explainer", store.clone())
            .decorate(Function::new("fetch", |_: ()| async {
                Err::<(), _>(ReportError::Quota {
                    message: "over quota".to_string(),
                    limit: 100,
                })
            }))
            .unwrap();

        let error = fetch.call_async(()).await.unwrap_err();
        assert_eq!(
            error,
            ReportError::Quota {
                message: "over quota\nOpenAI: Ask for a bigger quota.".to_string(),
                limit: 100,
            }
        );
        assert_eq!(store.gets.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_traceback_tail_in_prompt() {
        let server = MockServer::start().await;
        mount_completion(
            &server,
            "Explain: ```\n./src/report.rs:42:22 in report::parse_total\nbad digit\n```",
            "The input is not a number.",
        )
        .await;
        let store = store_with_block(&server).await;

        let parse = ExceptionInterpreter::new("explainer", store)
            .with_traceback_tail(1)
            .decorate(Function::new("parse", |_: ()| async {
                Err::<u32, _>(ReportError::Parse("bad digit".to_string()))
            }))
            .unwrap();

        let error = parse.call_async(()).await.unwrap_err();
        assert_eq!(
            error,
            ReportError::Parse("bad digit\nOpenAI: The input is not a number.".to_string())
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_sync_call_inside_runtime() {
        let server = MockServer::start().await;
        mount_completion(&server, "Why? ```\nbad digit\n```", "Digits only.").await;
        let store = store_with_block(&server).await;

        let parse = ExceptionInterpreter::new("explainer", store.clone())
            .with_prompt_prefix("Why?")
            .decorate(Function::new("parse", |_: ()| {
                Err::<u32, _>(ReportError::Parse("bad digit".to_string()))
            }))
            .unwrap();

        let error = parse.call(()).unwrap_err();
        assert_eq!(
            error,
            ReportError::Parse("bad digit\nOpenAI: Digits only.".to_string())
        );
        assert_eq!(store.gets.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_sync_call_without_runtime() {
        let server = tokio_test::block_on(MockServer::start());
        tokio_test::block_on(mount_completion(
            &server,
            "Explain: ```\nno such file\n```",
            "Check the path.",
        ));
        let store = tokio_test::block_on(store_with_block(&server));

        let open = ExceptionInterpreter::new("explainer", store)
            .decorate(Function::new("open", |_: ()| -> anyhow::Result<()> {
                Err(anyhow::anyhow!("no such file"))
            }))
            .unwrap();

        let error = open.call(()).unwrap_err();
        assert_eq!(error.to_string(), "no such file\nOpenAI: Check the path.");
        assert_eq!(error.root_cause().to_string(), "no such file");
    }

    #[tokio::test]
    async fn test_missing_block_returns_original() {
        let store = Arc::new(CountingStore::default());
        let fail = ExceptionInterpreter::new("missing", store.clone())
            .decorate(Function::new("fail", |_: ()| {
                Err::<(), _>(ReportError::Quota {
                    message: "over quota".to_string(),
                    limit: 7,
                })
            }))
            .unwrap();

        let error = fail.call(()).unwrap_err();
        assert_eq!(
            error,
            ReportError::Quota {
                message: "over quota".to_string(),
                limit: 7,
            }
        );
        assert_eq!(store.gets.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_provider_failure_returns_original() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": {
                    "message": "Incorrect API key provided",
                    "type": "invalid_request_error",
                    "param": null,
                    "code": "invalid_api_key"
                }
            })))
            .expect(1)
            .mount(&server)
            .await;
        let store = store_with_block(&server).await;

        let fail = ExceptionInterpreter::new("explainer", store)
            .decorate(Function::new("fail", |_: ()| async {
                Err::<(), _>(ReportError::Parse("bad digit".to_string()))
            }))
            .unwrap();

        let error = fail.call_async(()).await.unwrap_err();
        assert_eq!(error, ReportError::Parse("bad digit".to_string()));
    }
}
