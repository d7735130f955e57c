//! Test doubles for the process seam
//!
//! [`ScriptedRunner`] stands in for yt-dlp: each call pops the next scripted
//! [`Step`] and records the invocation, so orchestration can be exercised
//! without any external binary.
//!
//! ```rust
//! use vidfetch::testing::{ScriptedRunner, Step};
//!
//! let runner = ScriptedRunner::new([
//!     Step::Timeout,
//!     Step::succeed_with_file("clip.mp4", b"small"),
//! ]);
//! assert_eq!(runner.call_count(), 0);
//! ```

pub mod scripted;

pub use scripted::{RecordedCall, ScriptedRunner, Step};
