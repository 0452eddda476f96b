//! Basic generation example
//!
//! This example demonstrates the core functionality of imagegen-dl:
//! - Building a configuration with an explicit API key
//! - Creating a generator instance
//! - Subscribing to progress events
//! - Requesting a batch-fetched set of images
//!
//! Run with: `cargo run --example generate_images -- "a red fox in the snow"`

use imagegen_dl::config::{Config, GenerationConfig};
use imagegen_dl::{AspectRatio, Event, ImageGenerator, PromptOptions};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let prompt = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "a red fox in the snow".to_string());

    // Build configuration
    let mut config = Config {
        generation: GenerationConfig {
            batch_size: 4,
            max_images: 30,
            ..Default::default()
        },
        ..Default::default()
    };
    config.api.api_key = std::env::var("GENERATIVE_API_KEY")?;

    // Create generator instance
    let generator = ImageGenerator::new(config)?;

    // Subscribe to events
    let mut events = generator.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                Event::GenerationStarted {
                    total_requested,
                    num_batches,
                } => println!("requesting {total_requested} images in {num_batches} batches"),
                Event::Progress {
                    images_ready,
                    total_requested,
                } => println!("progress: {images_ready}/{total_requested}"),
                Event::BatchEmpty { batch } => println!("batch {batch} returned no images"),
                Event::BatchFailed { batch, error } => {
                    println!("batch {batch} failed: {error}")
                }
                _ => {}
            }
        }
    });

    // Request ten images, widescreen
    let options = PromptOptions {
        style: None,
        aspect_ratio: Some(AspectRatio::Widescreen),
    };
    let outcome = generator.generate(&prompt, 10, &options).await?;

    println!(
        "run finished: {} images, {} batches completed",
        outcome.images.len(),
        outcome.batches_completed
    );
    if let Some(reason) = &outcome.error {
        println!("run halted early: {reason}");
    }
    for (i, image) in outcome.images.iter().enumerate() {
        println!("image {i}: {} ({} base64 bytes)", image.mime_type, image.base64_data.len());
    }

    Ok(())
}
