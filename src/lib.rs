//! # imagegen-dl
//!
//! Backend library for batched generative-image retrieval.
//!
//! ## Design Philosophy
//!
//! imagegen-dl is designed to be:
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Event-driven** - Consumers subscribe to progress events, no polling required
//! - **Resilient** - Every remote call is wrapped in capped exponential-backoff retry
//! - **Partial-result safe** - A failed batch never discards images already fetched
//!
//! The remote side is two generative endpoints: a text model for prompt
//! translation/enhancement and an image model that produces at most a few
//! samples per request. Larger totals are fulfilled as strictly sequential
//! batches, with incremental progress broadcast after each one.
//!
//! ## Quick Start
//!
//! ```no_run
//! use imagegen_dl::{Config, ImageGenerator, PromptOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.api.api_key = "your-api-key".to_string();
//!
//!     let generator = ImageGenerator::new(config)?;
//!
//!     // Subscribe to events
//!     let mut events = generator.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let outcome = generator
//!         .generate("a red fox in the snow", 10, &PromptOptions::default())
//!         .await?;
//!     for image in &outcome.images {
//!         println!("{} bytes of {}", image.base64_data.len(), image.mime_type);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// HTTP client for the remote generative endpoints
pub mod client;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Batch generation orchestration
pub mod generator;
/// Prompt composition and text-model instructions
pub mod prompt;
/// Retry logic with exponential backoff
pub mod retry;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use client::{GeminiClient, GenerativeBackend};
pub use config::{ApiConfig, Config, GenerationConfig, RetryConfig};
pub use error::{Error, Result};
pub use generator::ImageGenerator;
pub use prompt::compose_prompt;
pub use retry::{IsRetryable, invoke_with_retry};
pub use types::{AspectRatio, Event, GeneratedImage, GenerationOutcome, PromptOptions};
