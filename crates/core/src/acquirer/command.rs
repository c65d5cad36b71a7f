//! N_m3u8DL-RE command builder.

use std::path::{Path, PathBuf};

use super::config::AcquirerConfig;
use crate::converter::ContainerFormat;
use crate::job::{JobRequest, ValidationError};
use crate::process::ProcessInvocation;

/// Flags the builder sets itself. Passing them through would redirect
/// output or inject keys behind the service's back.
const RESERVED_FLAGS: &[&str] = &[
    "--save-name",
    "--save-dir",
    "--tmp-dir",
    "--key",
    "-M",
    "--mux-after-done",
];

const REDACTED: &str = "<redacted>";

/// Validated argument list for one acquisition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquisitionCommand {
    url: String,
    save_name: String,
    keys: Vec<String>,
    select_video: String,
    select_audio: String,
    select_subtitle: String,
    format: ContainerFormat,
    log_level: String,
    binary_merge: bool,
    concurrent_download: bool,
    additional_args: Vec<String>,
}

impl AcquisitionCommand {
    /// Validates the request and captures what the command needs.
    pub fn new(request: &JobRequest, config: &AcquirerConfig) -> Result<Self, ValidationError> {
        if request.url.trim().is_empty() {
            return Err(ValidationError::EmptyUrl);
        }
        validate_save_name(&request.save_name)?;

        for (field, value) in [
            ("url", request.url.trim()),
            ("select_video", request.select_video.as_str()),
            ("select_audio", request.select_audio.as_str()),
            ("select_subtitle", request.select_subtitle.as_str()),
            ("log_level", request.log_level.as_str()),
        ] {
            if value.starts_with('-') {
                return Err(ValidationError::InvalidArgument {
                    field: field.to_string(),
                    value: value.to_string(),
                });
            }
        }

        let keys: Vec<String> = request
            .keys
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect();
        if keys.is_empty() {
            return Err(ValidationError::MissingKeys);
        }
        for key in &keys {
            if key.starts_with('-') || key.contains(char::is_whitespace) {
                return Err(ValidationError::InvalidKey(redact_key(key)));
            }
        }

        for arg in &request.additional_args {
            // Both `--flag=value` and `--flag:value` are accepted by the tool.
            let flag = arg.split([':', '=']).next().unwrap_or(arg);
            if RESERVED_FLAGS.contains(&flag) {
                return Err(ValidationError::ReservedArgument(flag.to_string()));
            }
        }

        Ok(Self {
            url: request.url.trim().to_string(),
            save_name: request.save_name.clone(),
            keys,
            select_video: request.select_video.clone(),
            select_audio: request.select_audio.clone(),
            select_subtitle: request.select_subtitle.clone(),
            format: request.format,
            log_level: request.log_level.clone(),
            binary_merge: request.binary_merge,
            concurrent_download: config.concurrent_download,
            additional_args: request.additional_args.clone(),
        })
    }

    /// File the tool produces inside its working directory.
    pub fn expected_filename(&self) -> String {
        format!("{}.{}", self.save_name, self.format.extension())
    }

    /// Expected output path inside `dir`.
    pub fn expected_output(&self, dir: &Path) -> PathBuf {
        dir.join(self.expected_filename())
    }

    pub fn format(&self) -> ContainerFormat {
        self.format
    }

    pub fn save_name(&self) -> &str {
        &self.save_name
    }

    /// Builds the argument list.
    pub fn args(&self) -> Vec<String> {
        self.build_args(false)
    }

    /// The command line with every key replaced, safe to log and persist.
    pub fn redacted(&self, config: &AcquirerConfig) -> String {
        ProcessInvocation::new(&config.binary_path)
            .with_args(self.build_args(true))
            .to_string()
    }

    fn build_args(&self, redact: bool) -> Vec<String> {
        let mut args = vec![
            self.url.clone(),
            "--save-name".to_string(),
            self.save_name.clone(),
            "--select-video".to_string(),
            self.select_video.clone(),
            "--select-audio".to_string(),
            self.select_audio.clone(),
            "--select-subtitle".to_string(),
            self.select_subtitle.clone(),
        ];

        if self.concurrent_download {
            args.push("-mt".to_string());
        }

        args.extend([
            "-M".to_string(),
            format!("format={}", self.format.extension()),
            "--log-level".to_string(),
            self.log_level.clone(),
        ]);

        for key in &self.keys {
            args.push("--key".to_string());
            args.push(if redact {
                REDACTED.to_string()
            } else {
                key.clone()
            });
        }

        if self.binary_merge {
            args.push("--binary-merge".to_string());
        }

        args.extend(self.additional_args.iter().cloned());
        args
    }

    /// Builds the invocation, running inside the output directory.
    pub fn invocation(&self, config: &AcquirerConfig, output_dir: &Path) -> ProcessInvocation {
        ProcessInvocation::new(&config.binary_path)
            .with_args(self.args())
            .with_working_dir(output_dir)
            .with_timeout(config.timeout())
    }
}

fn validate_save_name(name: &str) -> Result<(), ValidationError> {
    let invalid = name.trim().is_empty()
        || name == "."
        || name == ".."
        || name.starts_with('-')
        || name.contains(['/', '\\', '\0']);
    if invalid {
        return Err(ValidationError::InvalidSaveName(name.to_string()));
    }
    Ok(())
}

/// Keeps just enough of a key to identify it in an error message.
fn redact_key(key: &str) -> String {
    let prefix: String = key.chars().take(4).collect();
    format!("{}...", prefix)
}
