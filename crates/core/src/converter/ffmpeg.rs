//! FFmpeg remux command.

use std::path::{Path, PathBuf};

use super::config::ConverterConfig;
use crate::job::ValidationError;
use crate::process::ProcessInvocation;

/// Stream-copy remux of video and audio into a fast-start MP4.
///
/// Subtitle streams are dropped; MP4 cannot carry most of the subtitle
/// formats the acquisition tool produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemuxCommand {
    input: PathBuf,
    output: PathBuf,
}

impl RemuxCommand {
    /// Creates a remux from `input` to `output`.
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Result<Self, ValidationError> {
        let input = input.into();
        let output = output.into();
        if input == output {
            return Err(ValidationError::SameInputOutput(
                input.display().to_string(),
            ));
        }
        Ok(Self { input, output })
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Builds ffmpeg arguments.
    pub fn args(&self) -> Vec<String> {
        vec![
            // Regenerate missing timestamps from segment boundaries
            "-fflags".to_string(),
            "+genpts".to_string(),
            "-i".to_string(),
            self.input.to_string_lossy().to_string(),
            "-map".to_string(),
            "0:v".to_string(),
            "-map".to_string(),
            "0:a".to_string(),
            "-c".to_string(),
            "copy".to_string(),
            "-movflags".to_string(),
            "+faststart".to_string(),
            "-max_interleave_delta".to_string(),
            "0".to_string(),
            "-avoid_negative_ts".to_string(),
            "make_zero".to_string(),
            // Overwrite output
            "-y".to_string(),
            self.output.to_string_lossy().to_string(),
        ]
    }

    /// Builds the invocation for the configured ffmpeg.
    pub fn invocation(&self, config: &ConverterConfig) -> ProcessInvocation {
        ProcessInvocation::new(&config.ffmpeg_path)
            .with_args(self.args())
            .with_timeout(config.timeout())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_remux_args() {
        let command = RemuxCommand::new("/data/clip.mkv", "/data/clip.mp4").unwrap();
        assert_eq!(
            command.args(),
            vec![
                "-fflags",
                "+genpts",
                "-i",
                "/data/clip.mkv",
                "-map",
                "0:v",
                "-map",
                "0:a",
                "-c",
                "copy",
                "-movflags",
                "+faststart",
                "-max_interleave_delta",
                "0",
                "-avoid_negative_ts",
                "make_zero",
                "-y",
                "/data/clip.mp4",
            ]
        );
    }

    #[test]
    fn test_subtitles_are_not_mapped() {
        let command = RemuxCommand::new("a.mkv", "a.mp4").unwrap();
        assert!(!command.args().iter().any(|a| a.starts_with("0:s")));
    }

    #[test]
    fn test_same_input_output_rejected() {
        let result = RemuxCommand::new("/data/clip.mp4", "/data/clip.mp4");
        assert!(matches!(result, Err(ValidationError::SameInputOutput(_))));
    }

    #[test]
    fn test_invocation_uses_config() {
        let config = ConverterConfig::with_path(PathBuf::from("/opt/ffmpeg")).with_timeout(60);
        let invocation = RemuxCommand::new("a.mkv", "a.mp4")
            .unwrap()
            .invocation(&config);

        assert_eq!(invocation.program, PathBuf::from("/opt/ffmpeg"));
        assert_eq!(invocation.timeout, Duration::from_secs(60));
        assert_eq!(invocation.args.last().map(String::as_str), Some("a.mp4"));
    }
}
