//! Documentation of the Roomify floor plan upload flow.
//!
//! # General Infrastructure
//! - User signs in through the external identity service and receives a bearer token
//! - User drops or picks a floor plan image on the upload widget
//! - Widget reads the image into a data URL and plays a simulated analysis progress bar
//! - Once the bar reaches 100% the widget waits a short moment, then hands the data URL to its caller
//! - Caller posts the project to `POST /api/projects/save` on the backend
//!
//!
//!
//! # Upload Lifecycle
//!
//! ```text
//! Idle --(file accepted)--> Reading --(read ok)--> Analyzing --(progress == 100)--> Complete
//!   ^                          |                                                        |
//!   +------(read failed)-------+                                  (redirect delay) onComplete(data URL)
//! ```
//!
//! - Progress is fake: a fixed step every fixed interval, capped at 100
//! - A new file replaces the current one and cancels its timers
//! - Unmounting cancels everything, no callback fires afterwards
//!
//!
//!
//! # Notes
//!
//! ## Picker vs drop validation
//! The file picker only offers `.jpg`, `.jpeg` and `.png` through its accept filter and
//! trusts whatever the user ends up choosing. The drop surface checks the MIME type
//! against an explicit allow-list. Both behaviors are kept as they are.
//!
//! ## Timers
//! [`upload::Upload`] never touches a clock. It emits [`upload::Command`]s and expects
//! tick/redirect events back, so tests advance it by hand. [`upload::UploadDriver`]
//! is the tokio host that owns the real timers.
//!
//!
//!
//! # Setup
//!
//! View current docs.
//! ```sh
//! cargo doc --open
//! ```
//!
//! Drive the widget against a local image and the running backend.
//! ```sh
//! cargo run -p tester -- plan.png --token $TOKEN
//! ```

pub mod button;
pub mod constants;
pub mod upload;

pub use constants::Timing;
pub use upload::{Event, FileHandle, Phase, ReadFailure, Upload, UploadDriver, View};
