//! Core types for imagegen-dl

use serde::{Deserialize, Serialize};

/// A single image produced by the remote endpoint
///
/// Images travel on the wire as base64-encoded payloads; this type keeps the
/// payload in that form so it can be handed straight to hosts that render
/// data URIs, while [`data_uri`](GeneratedImage::data_uri) builds the
/// browser-ready string on demand.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedImage {
    /// Base64-encoded image bytes, exactly as returned by the endpoint
    pub base64_data: String,

    /// MIME type reported by the endpoint (default: "image/png")
    pub mime_type: String,

    /// Zero-based index of the batch this image arrived in
    pub batch: usize,
}

impl GeneratedImage {
    /// Render the image as a `data:` URI suitable for direct display
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64_data)
    }
}

/// Aspect ratio requested for generated images
///
/// The endpoint takes no structured size parameter; the ratio is expressed
/// as a descriptive clause prepended to the prompt.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AspectRatio {
    /// 1:1 square output (default)
    #[default]
    Square,
    /// 16:9 cinematic widescreen output
    Widescreen,
    /// 9:16 vertical portrait output
    Portrait,
}

impl AspectRatio {
    /// The prompt clause describing this ratio
    pub fn prompt_clause(&self) -> &'static str {
        match self {
            AspectRatio::Square => "a photo in a square aspect ratio. ",
            AspectRatio::Widescreen => "a photo in a cinematic, widescreen aspect ratio. ",
            AspectRatio::Portrait => "a photo in a vertical, portrait aspect ratio. ",
        }
    }
}

/// Options shaping the final prompt sent to the image endpoint
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PromptOptions {
    /// Optional style name woven into the prompt (e.g. "Watercolor")
    #[serde(default)]
    pub style: Option<String>,

    /// Aspect ratio for the generated images (None = config default)
    #[serde(default)]
    pub aspect_ratio: Option<AspectRatio>,
}

/// Event emitted during a generation run
///
/// Multiple subscribers are supported via the broadcast channel on
/// [`ImageGenerator`](crate::ImageGenerator); hosts typically bind a progress
/// display to [`Progress`](Event::Progress) and a gallery to the final
/// [`GenerationOutcome`](crate::GenerationOutcome).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A generation run has started
    GenerationStarted {
        /// Total images requested for this run
        total_requested: u32,
        /// Number of batch requests the run will issue
        num_batches: u32,
    },

    /// A batch request is about to be issued
    BatchStarted {
        /// Zero-based batch index
        batch: usize,
        /// Number of images requested in this batch
        requested: u32,
    },

    /// A batch completed and its images were appended to the accumulator
    Progress {
        /// Images accumulated so far across all completed batches
        images_ready: u32,
        /// Total images requested for this run
        total_requested: u32,
    },

    /// A batch succeeded but returned no images; the run continues
    BatchEmpty {
        /// Zero-based batch index
        batch: usize,
    },

    /// A batch failed after exhausting its retry budget; the run halts
    BatchFailed {
        /// Zero-based batch index
        batch: usize,
        /// Description of the failure
        error: String,
    },

    /// The run finished (all batches attempted, or halted on failure)
    GenerationComplete {
        /// Images accumulated across the whole run
        images_ready: u32,
        /// Number of batch requests that succeeded
        batches_completed: usize,
    },
}

/// Final outcome of one generation run
///
/// Always carries whatever was accumulated before any failure: a run that
/// hard-fails on batch 2 of 3 still returns batch 1's images, with
/// [`error`](GenerationOutcome::error) describing why the rest were not
/// fetched. Errors are data here, never a panic or an `Err` return — the
/// host is always left with an inspectable partial result.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GenerationOutcome {
    /// Accumulated images, in batch issuance order then producer order
    pub images: Vec<GeneratedImage>,

    /// Number of batch requests that succeeded (empty batches included)
    pub batches_completed: usize,

    /// Why the run halted early, if it did
    pub error: Option<String>,
}

impl GenerationOutcome {
    /// True if every planned batch request succeeded
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}
