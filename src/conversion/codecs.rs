//! Codec compatibility table
//!
//! Decides, per stream, whether the downloaded codec plays in the chat
//! client as-is or must be transcoded. The data lives in static tables so a
//! new codec is one more row, not one more branch.

use crate::types::MediaInfo;

/// One row of a compatibility table: codec strings starting with `prefix`
/// are the `canonical` codec and are accepted without conversion.
#[derive(Debug, Clone, Copy)]
pub struct CodecRule {
    /// Codec string prefix as reported by the extraction tool
    pub prefix: &'static str,
    /// Canonical codec name
    pub canonical: &'static str,
}

const fn rule(prefix: &'static str, canonical: &'static str) -> CodecRule {
    CodecRule { prefix, canonical }
}

/// Video codecs accepted as-is
pub const ACCEPTED_VIDEO: &[CodecRule] = &[
    rule("avc1", "h264"),
    rule("h264", "h264"),
    rule("hvc1", "h265"),
    rule("hev1", "h265"),
    rule("hevc", "h265"),
    rule("h265", "h265"),
    rule("av01", "av1"),
];

/// Audio codecs accepted as-is
pub const ACCEPTED_AUDIO: &[CodecRule] = &[
    rule("mp4a.40.2", "aac"),
    rule("mp4a.40.5", "aac"),
    rule("mp4a.40.29", "aac"),
    rule("aac", "aac"),
];

/// Encoder used when a video stream must be transcoded
pub const VIDEO_TARGET_ENCODER: &str = "libx264";

/// Encoder used when an audio stream must be transcoded
pub const AUDIO_TARGET_ENCODER: &str = "aac";

/// What to do with one stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamAction {
    /// Stream copy
    Copy,
    /// Re-encode with the given ffmpeg encoder
    Transcode {
        /// ffmpeg encoder name
        encoder: &'static str,
    },
}

impl StreamAction {
    /// ffmpeg `-c:x` argument value
    pub fn ffmpeg_codec(&self) -> &'static str {
        match self {
            StreamAction::Copy => "copy",
            StreamAction::Transcode { encoder } => encoder,
        }
    }
}

/// Per-stream conversion decision for one file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversionPlan {
    /// Video stream action
    pub video: StreamAction,
    /// Audio stream action
    pub audio: StreamAction,
}

impl ConversionPlan {
    /// Plan that changes nothing
    pub const PASSTHROUGH: ConversionPlan = ConversionPlan {
        video: StreamAction::Copy,
        audio: StreamAction::Copy,
    };

    /// Whether any stream has to be re-encoded
    pub fn needs_conversion(&self) -> bool {
        self.video != StreamAction::Copy || self.audio != StreamAction::Copy
    }

    /// Build the plan for the reported codecs.
    ///
    /// An absent codec (or `"none"`, which the extraction tool reports for a
    /// missing stream) is left alone.
    pub fn for_codecs(vcodec: Option<&str>, acodec: Option<&str>) -> Self {
        Self {
            video: action_for(vcodec, ACCEPTED_VIDEO, VIDEO_TARGET_ENCODER),
            audio: action_for(acodec, ACCEPTED_AUDIO, AUDIO_TARGET_ENCODER),
        }
    }

    /// Build the plan for a probed media item, restricted to `extractors`
    /// (empty slice = every extractor).
    pub fn for_media(info: &MediaInfo, extractors: &[String]) -> Self {
        let applies = extractors.is_empty()
            || info.extractor.as_deref().is_some_and(|name| {
                extractors
                    .iter()
                    .any(|e| e.eq_ignore_ascii_case(name) || name.to_lowercase().starts_with(&e.to_lowercase()))
            });
        if !applies {
            return Self::PASSTHROUGH;
        }
        Self::for_codecs(info.vcodec.as_deref(), info.acodec.as_deref())
    }
}

/// Canonical name for an accepted codec, `None` if it needs conversion
pub fn canonical_codec(codec: &str, table: &[CodecRule]) -> Option<&'static str> {
    let codec = codec.trim().to_ascii_lowercase();
    table
        .iter()
        .find(|rule| codec.starts_with(rule.prefix))
        .map(|rule| rule.canonical)
}

fn action_for(codec: Option<&str>, table: &[CodecRule], encoder: &'static str) -> StreamAction {
    match codec.map(str::trim) {
        None | Some("") => StreamAction::Copy,
        Some(c) if c.eq_ignore_ascii_case("none") => StreamAction::Copy,
        Some(c) if canonical_codec(c, table).is_some() => StreamAction::Copy,
        Some(_) => StreamAction::Transcode { encoder },
    }
}
