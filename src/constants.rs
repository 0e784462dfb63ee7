use std::time::Duration;

/// Milliseconds between two progress ticks.
pub const PROGRESS_INTERVAL_MS: u64 = 100;

/// Percentage points added on every tick.
pub const PROGRESS_STEP: u8 = 5;

/// Milliseconds between reaching 100% and handing the upload to the caller.
pub const REDIRECT_DELAY_MS: u64 = 600;

/// Extensions offered by the file picker's accept filter.
pub const ACCEPTED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// MIME types allowed on the drop surface.
pub const ACCEPTED_MIME_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/jpg"];

pub const SIGNED_IN_PROMPT: &str = "Drag and drop your floor plan here, or click to select a file";
pub const SIGNED_OUT_PROMPT: &str = "Please sign in to upload your floor plan";
pub const SIZE_HELP: &str = "Maximum file size 50 MB.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub interval: Duration,
    pub step: u8,
    pub redirect_delay: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(PROGRESS_INTERVAL_MS),
            step: PROGRESS_STEP,
            redirect_delay: Duration::from_millis(REDIRECT_DELAY_MS),
        }
    }
}
