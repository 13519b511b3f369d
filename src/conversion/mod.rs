//! Media conversion
//!
//! Some sources serve codecs that chat clients do not play inline (VP9,
//! Opus). After a download the codec table decides per stream whether to
//! copy or re-encode, and a [`MediaConverter`] performs the work:
//!
//! - [`FfmpegConverter`]: uses the external `ffmpeg` binary
//! - [`NoOpConverter`]: fails any conversion when ffmpeg is unavailable

mod cli;
pub mod codecs;
mod noop;
mod traits;

pub use cli::FfmpegConverter;
pub use codecs::{ConversionPlan, StreamAction};
pub use noop::NoOpConverter;
pub use traits::MediaConverter;
