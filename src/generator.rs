//! Batch generation orchestration
//!
//! [`ImageGenerator`] fulfills a request for N images from an endpoint that
//! only accepts a bounded sample count per call. The requested total is split
//! into fixed-size batches issued strictly sequentially; each batch request
//! is independently wrapped in retry, progress is broadcast after every
//! batch, and a hard batch failure halts the run while preserving everything
//! accumulated so far.

use std::sync::Arc;

use crate::client::{GeminiClient, GenerativeBackend};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::prompt;
use crate::retry::invoke_with_retry;
use crate::types::{Event, GenerationOutcome, PromptOptions};

/// Number of events buffered per subscriber before older ones are dropped
const EVENT_BUFFER_SIZE: usize = 256;

/// Top-level handle for batched image generation
///
/// Construction validates the configuration and builds the HTTP client.
/// The handle is cheap to clone-by-reference via `Arc` in the host; all
/// methods take `&self` and no state is carried across runs, so a single
/// handle can serve many generation requests (strictly one at a time per
/// call, never concurrently within one call).
///
/// # Example
///
/// ```no_run
/// use imagegen_dl::{Config, ImageGenerator, PromptOptions};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut config = Config::default();
///     config.api.api_key = "your-api-key".to_string();
///
///     let generator = ImageGenerator::new(config)?;
///
///     // Subscribe to progress events
///     let mut events = generator.subscribe();
///     tokio::spawn(async move {
///         while let Ok(event) = events.recv().await {
///             println!("Event: {:?}", event);
///         }
///     });
///
///     let outcome = generator
///         .generate("a red fox in the snow", 10, &PromptOptions::default())
///         .await?;
///     println!("got {} images", outcome.images.len());
///     Ok(())
/// }
/// ```
pub struct ImageGenerator {
    config: Config,
    backend: Arc<dyn GenerativeBackend>,
    event_tx: tokio::sync::broadcast::Sender<Event>,
}

impl ImageGenerator {
    /// Create a generator backed by the real remote endpoints
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let backend = Arc::new(GeminiClient::new(config.api.clone())?);
        Ok(Self::assemble(config, backend))
    }

    /// Create a generator with a custom backend (e.g. a stub for testing)
    pub fn with_backend(config: Config, backend: Arc<dyn GenerativeBackend>) -> Result<Self> {
        config.validate()?;
        Ok(Self::assemble(config, backend))
    }

    fn assemble(config: Config, backend: Arc<dyn GenerativeBackend>) -> Self {
        let (event_tx, _rx) = tokio::sync::broadcast::channel(EVENT_BUFFER_SIZE);
        Self {
            config,
            backend,
            event_tx,
        }
    }

    /// Subscribe to generation events
    ///
    /// Multiple subscribers are supported. Each subscriber receives all events
    /// independently. Events are buffered, but a subscriber that falls behind
    /// by more than the buffer size will miss the oldest events.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// The configuration this generator was built with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Emit an event to all subscribers
    ///
    /// If there are no active subscribers, the event is silently dropped.
    fn emit(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    /// Generate `count` images for `prompt`, fetched in sequential batches
    ///
    /// Validation happens before any request is issued: an empty prompt or a
    /// count outside `1..=generation.max_images` returns `Err` immediately.
    /// Once orchestration starts, failures become data: the returned
    /// [`GenerationOutcome`] carries every image accumulated before the run
    /// halted, plus the failure reason if it did.
    ///
    /// Behavior per batch:
    /// - the batch request goes through retry with exponential backoff;
    /// - a reply with images appends them (in producer order) and emits
    ///   [`Event::Progress`] with the new accumulated count;
    /// - a reply with no images emits [`Event::BatchEmpty`] and the run
    ///   continues with the next batch;
    /// - a failed request (after retries) emits [`Event::BatchFailed`] and
    ///   halts the remaining batches.
    pub async fn generate(
        &self,
        prompt: &str,
        count: u32,
        options: &PromptOptions,
    ) -> Result<GenerationOutcome> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(Error::EmptyPrompt);
        }
        let max_images = self.config.generation.max_images;
        if count < 1 || count > max_images {
            return Err(Error::InvalidImageCount {
                requested: count,
                min: 1,
                max: max_images,
            });
        }

        let final_prompt = prompt::compose_prompt(
            prompt,
            options,
            self.config.generation.default_aspect_ratio,
        );

        let batch_size = self.config.generation.batch_size;
        let num_batches = count.div_ceil(batch_size);
        tracing::info!(
            total_requested = count,
            batch_size,
            num_batches,
            "starting generation run"
        );
        self.emit(Event::GenerationStarted {
            total_requested: count,
            num_batches,
        });

        let mut outcome = GenerationOutcome::default();

        for batch in 0..num_batches as usize {
            let accumulated = outcome.images.len() as u32;
            if accumulated >= count {
                break;
            }
            let requested = batch_size.min(count - accumulated);
            self.emit(Event::BatchStarted { batch, requested });

            let result = invoke_with_retry(&self.config.retry, || {
                self.backend.produce_images(&final_prompt, requested)
            })
            .await;

            match result {
                Ok(batch_images) if !batch_images.is_empty() => {
                    outcome.batches_completed += 1;
                    for mut image in batch_images {
                        image.batch = batch;
                        outcome.images.push(image);
                    }
                    let images_ready = outcome.images.len() as u32;
                    tracing::info!(batch, images_ready, "batch completed");
                    self.emit(Event::Progress {
                        images_ready,
                        total_requested: count,
                    });
                }
                Ok(_) => {
                    // An empty reply is reported but does not halt the run;
                    // only a failed request stops the remaining batches.
                    outcome.batches_completed += 1;
                    tracing::warn!(batch, "batch returned no images, continuing");
                    self.emit(Event::BatchEmpty { batch });
                }
                Err(e) => {
                    let reason = e.to_string();
                    tracing::error!(batch, error = %e, "batch failed, halting remaining batches");
                    self.emit(Event::BatchFailed {
                        batch,
                        error: reason.clone(),
                    });
                    outcome.error = Some(reason);
                    break;
                }
            }
        }

        tracing::info!(
            images_ready = outcome.images.len(),
            batches_completed = outcome.batches_completed,
            complete = outcome.is_complete(),
            "generation run finished"
        );
        self.emit(Event::GenerationComplete {
            images_ready: outcome.images.len() as u32,
            batches_completed: outcome.batches_completed,
        });
        Ok(outcome)
    }

    /// Translate a prompt to English via the text model
    ///
    /// The model is asked to return only the translated text; one pair of
    /// wrapping double quotes is stripped from the reply, since models often
    /// echo the quoting used in the instruction.
    pub async fn translate_prompt(&self, text: &str) -> Result<String> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::EmptyPrompt);
        }
        let instruction = prompt::translation_instruction(text);
        let reply = invoke_with_retry(&self.config.retry, || {
            self.backend.generate_text(&instruction)
        })
        .await?;
        Ok(prompt::strip_wrapping_quotes(reply.trim()).to_string())
    }

    /// Rewrite a prompt to be more descriptive via the text model
    pub async fn enhance_prompt(&self, text: &str) -> Result<String> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::EmptyPrompt);
        }
        let instruction = prompt::enhancement_instruction(text);
        invoke_with_retry(&self.config.retry, || {
            self.backend.generate_text(&instruction)
        })
        .await
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiConfig, GenerationConfig, RetryConfig};
    use crate::types::GeneratedImage;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Scripted backend: pops one pre-programmed reply per call and records
    /// the counts that were requested.
    struct ScriptedBackend {
        image_replies: Mutex<VecDeque<Result<Vec<GeneratedImage>>>>,
        text_replies: Mutex<VecDeque<Result<String>>>,
        requested_counts: Mutex<Vec<u32>>,
    }

    impl ScriptedBackend {
        fn new() -> Self {
            Self {
                image_replies: Mutex::new(VecDeque::new()),
                text_replies: Mutex::new(VecDeque::new()),
                requested_counts: Mutex::new(Vec::new()),
            }
        }

        fn push_images(&self, reply: Result<Vec<GeneratedImage>>) {
            self.image_replies.lock().unwrap().push_back(reply);
        }

        fn push_text(&self, reply: Result<String>) {
            self.text_replies.lock().unwrap().push_back(reply);
        }

        fn requested(&self) -> Vec<u32> {
            self.requested_counts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GenerativeBackend for ScriptedBackend {
        async fn produce_images(&self, _prompt: &str, count: u32) -> Result<Vec<GeneratedImage>> {
            self.requested_counts.lock().unwrap().push(count);
            self.image_replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }

        async fn generate_text(&self, _instruction: &str) -> Result<String> {
            self.text_replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(String::new()))
        }
    }

    /// Backend that always returns `count` labeled images, for determinism tests
    struct CountingBackend {
        calls: Mutex<u32>,
    }

    #[async_trait]
    impl GenerativeBackend for CountingBackend {
        async fn produce_images(&self, _prompt: &str, count: u32) -> Result<Vec<GeneratedImage>> {
            *self.calls.lock().unwrap() += 1;
            Ok(images(count, "img"))
        }

        async fn generate_text(&self, _instruction: &str) -> Result<String> {
            Ok("text".to_string())
        }
    }

    fn images(count: u32, label: &str) -> Vec<GeneratedImage> {
        (0..count)
            .map(|i| GeneratedImage {
                base64_data: format!("{label}-{i}"),
                mime_type: "image/png".to_string(),
                batch: 0,
            })
            .collect()
    }

    fn test_config() -> Config {
        Config {
            api: ApiConfig {
                api_key: "test-key".to_string(),
                ..Default::default()
            },
            generation: GenerationConfig {
                batch_size: 4,
                max_images: 30,
                ..Default::default()
            },
            retry: RetryConfig {
                max_attempts: 0,
                initial_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(10),
                backoff_multiplier: 2.0,
                jitter: false,
            },
        }
    }

    fn generator_with(backend: Arc<dyn GenerativeBackend>) -> ImageGenerator {
        ImageGenerator::with_backend(test_config(), backend).unwrap()
    }

    #[tokio::test]
    async fn splits_total_into_ceil_batches_of_bounded_size() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_images(Ok(images(4, "a")));
        backend.push_images(Ok(images(4, "b")));
        backend.push_images(Ok(images(2, "c")));

        let generator = generator_with(backend.clone());
        let outcome = generator
            .generate("a red fox", 10, &PromptOptions::default())
            .await
            .unwrap();

        assert_eq!(backend.requested(), vec![4, 4, 2]);
        assert_eq!(outcome.images.len(), 10);
        assert_eq!(outcome.batches_completed, 3);
        assert!(outcome.is_complete());
    }

    #[tokio::test]
    async fn preserves_batch_and_producer_order() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_images(Ok(images(4, "a")));
        backend.push_images(Ok(images(1, "b")));

        let generator = generator_with(backend);
        let outcome = generator
            .generate("a red fox", 5, &PromptOptions::default())
            .await
            .unwrap();

        let order: Vec<&str> = outcome
            .images
            .iter()
            .map(|img| img.base64_data.as_str())
            .collect();
        assert_eq!(order, vec!["a-0", "a-1", "a-2", "a-3", "b-0"]);
        assert_eq!(outcome.images[3].batch, 0);
        assert_eq!(outcome.images[4].batch, 1);
    }

    #[tokio::test]
    async fn hard_failure_halts_run_and_preserves_accumulated_images() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_images(Ok(images(4, "a")));
        backend.push_images(Err(Error::Api {
            status: 400,
            message: "bad request".to_string(),
        }));
        backend.push_images(Ok(images(4, "c"))); // must never be requested

        let generator = generator_with(backend.clone());
        let outcome = generator
            .generate("a red fox", 12, &PromptOptions::default())
            .await
            .unwrap();

        assert_eq!(outcome.images.len(), 4, "batch 1 images must survive");
        assert_eq!(outcome.batches_completed, 1);
        assert!(outcome.error.is_some());
        assert_eq!(
            backend.requested(),
            vec![4, 4],
            "batch 3 must not be issued after batch 2 hard-fails"
        );
    }

    #[tokio::test]
    async fn empty_batch_warns_but_does_not_halt() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_images(Ok(images(4, "a")));
        backend.push_images(Ok(Vec::new()));
        backend.push_images(Ok(images(4, "c")));

        let generator = generator_with(backend.clone());
        let mut events = generator.subscribe();
        let outcome = generator
            .generate("a red fox", 10, &PromptOptions::default())
            .await
            .unwrap();

        // The empty batch contributed nothing, so only 8 of 10 arrive within
        // the planned three batches
        assert_eq!(outcome.images.len(), 8);
        assert_eq!(outcome.batches_completed, 3);
        assert!(outcome.is_complete(), "empty batch is not a run failure");
        assert_eq!(backend.requested(), vec![4, 4, 4]);

        let mut saw_empty = false;
        while let Ok(event) = events.try_recv() {
            if matches!(event, Event::BatchEmpty { batch: 1 }) {
                saw_empty = true;
            }
        }
        assert!(saw_empty, "BatchEmpty event must be emitted");
    }

    #[tokio::test]
    async fn transient_batch_failure_is_retried_within_the_batch() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_images(Err(Error::Api {
            status: 503,
            message: "overloaded".to_string(),
        }));
        backend.push_images(Ok(images(3, "a")));

        let mut config = test_config();
        config.retry.max_attempts = 2;
        let generator = ImageGenerator::with_backend(config, backend.clone()).unwrap();

        let outcome = generator
            .generate("a red fox", 3, &PromptOptions::default())
            .await
            .unwrap();

        assert_eq!(outcome.images.len(), 3);
        assert!(outcome.is_complete());
        assert_eq!(
            backend.requested(),
            vec![3, 3],
            "the same batch is retried, not skipped"
        );
    }

    #[tokio::test]
    async fn repeated_runs_with_deterministic_backend_are_identical() {
        let backend = Arc::new(CountingBackend {
            calls: Mutex::new(0),
        });
        let generator = generator_with(backend.clone());

        let first = generator
            .generate("a red fox", 10, &PromptOptions::default())
            .await
            .unwrap();
        let second = generator
            .generate("a red fox", 10, &PromptOptions::default())
            .await
            .unwrap();

        assert_eq!(first.images, second.images);
        assert_eq!(first.batches_completed, second.batches_completed);
        assert_eq!(*backend.calls.lock().unwrap(), 6, "3 batches per run");
    }

    #[tokio::test]
    async fn rejects_empty_prompt_before_any_request() {
        let backend = Arc::new(ScriptedBackend::new());
        let generator = generator_with(backend.clone());

        let result = generator.generate("   ", 4, &PromptOptions::default()).await;
        assert!(matches!(result, Err(Error::EmptyPrompt)));
        assert!(backend.requested().is_empty(), "no request may be issued");
    }

    #[tokio::test]
    async fn rejects_out_of_range_count_before_any_request() {
        let backend = Arc::new(ScriptedBackend::new());
        let generator = generator_with(backend.clone());

        for count in [0u32, 31] {
            let result = generator
                .generate("a red fox", count, &PromptOptions::default())
                .await;
            match result {
                Err(Error::InvalidImageCount {
                    requested,
                    min,
                    max,
                }) => {
                    assert_eq!(requested, count);
                    assert_eq!(min, 1);
                    assert_eq!(max, 30);
                }
                other => panic!("expected InvalidImageCount, got {other:?}"),
            }
        }
        assert!(backend.requested().is_empty());
    }

    #[tokio::test]
    async fn events_arrive_in_lifecycle_order() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_images(Ok(images(2, "a")));

        let generator = generator_with(backend);
        let mut events = generator.subscribe();
        generator
            .generate("a red fox", 2, &PromptOptions::default())
            .await
            .unwrap();

        let mut collected = Vec::new();
        while let Ok(event) = events.try_recv() {
            collected.push(event);
        }
        assert!(matches!(
            collected[0],
            Event::GenerationStarted {
                total_requested: 2,
                num_batches: 1
            }
        ));
        assert!(matches!(
            collected[1],
            Event::BatchStarted {
                batch: 0,
                requested: 2
            }
        ));
        assert!(matches!(
            collected[2],
            Event::Progress {
                images_ready: 2,
                total_requested: 2
            }
        ));
        assert!(matches!(
            collected[3],
            Event::GenerationComplete {
                images_ready: 2,
                batches_completed: 1
            }
        ));
    }

    #[tokio::test]
    async fn translate_strips_wrapping_quotes_from_reply() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_text(Ok("\"a red fox\"".to_string()));

        let generator = generator_with(backend);
        let translated = generator.translate_prompt("uma raposa vermelha").await.unwrap();
        assert_eq!(translated, "a red fox");
    }

    #[tokio::test]
    async fn enhance_returns_reply_verbatim() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_text(Ok("a majestic red fox at dawn".to_string()));

        let generator = generator_with(backend);
        let enhanced = generator.enhance_prompt("a fox").await.unwrap();
        assert_eq!(enhanced, "a majestic red fox at dawn");
    }

    #[tokio::test]
    async fn text_operations_reject_empty_input() {
        let backend = Arc::new(ScriptedBackend::new());
        let generator = generator_with(backend);

        assert!(matches!(
            generator.translate_prompt("  ").await,
            Err(Error::EmptyPrompt)
        ));
        assert!(matches!(
            generator.enhance_prompt("").await,
            Err(Error::EmptyPrompt)
        ));
    }

    #[tokio::test]
    async fn text_operation_retries_transient_failures() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_text(Err(Error::Api {
            status: 429,
            message: "rate limited".to_string(),
        }));
        backend.push_text(Ok("translated".to_string()));

        let mut config = test_config();
        config.retry.max_attempts = 1;
        let generator = ImageGenerator::with_backend(config, backend).unwrap();

        let translated = generator.translate_prompt("texto").await.unwrap();
        assert_eq!(translated, "translated");
    }

    #[tokio::test]
    async fn exhausted_text_retries_surface_the_last_error() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_text(Err(Error::Api {
            status: 503,
            message: "first".to_string(),
        }));
        backend.push_text(Err(Error::Api {
            status: 500,
            message: "last".to_string(),
        }));

        let mut config = test_config();
        config.retry.max_attempts = 1;
        let generator = ImageGenerator::with_backend(config, backend).unwrap();

        match generator.translate_prompt("texto").await {
            Err(Error::Api { status, message }) => {
                assert_eq!(status, 500);
                assert_eq!(message, "last");
            }
            other => panic!("expected the last API error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn invalid_config_is_rejected_at_construction() {
        let backend: Arc<dyn GenerativeBackend> = Arc::new(ScriptedBackend::new());
        let mut config = test_config();
        config.generation.batch_size = 0;
        assert!(ImageGenerator::with_backend(config, backend).is_err());
    }
}
