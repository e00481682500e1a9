//! Speech announcer: one utterance per capture cycle
//!
//! `speak` blocks until playback has finished; returning is the completion signal.

use anyhow::{Context, Result};

use crate::config::{SpeechBackend, SpeechConfig};

pub trait Speaker: Send + Sync {
    fn name(&self) -> &str;

    /// Speak one utterance and wait for it to finish
    fn speak(&self, text: &str) -> Result<()>;
}

/// Create the speaker for the configured backend
pub fn create_speaker(cfg: &SpeechConfig) -> Box<dyn Speaker> {
    match cfg.backend {
        SpeechBackend::Command => Box::new(CommandSpeaker::new(cfg.program.clone(), cfg.args.clone())),
        SpeechBackend::Silent => Box::new(SilentSpeaker),
    }
}

/// Speaks through an external synthesizer (`espeak-ng`, `spd-say -w`, `say`, ...)
pub struct CommandSpeaker {
    program: String,
    args: Vec<String>,
}

impl CommandSpeaker {
    pub fn new(program: String, args: Vec<String>) -> Self {
        Self { program, args }
    }
}

impl Speaker for CommandSpeaker {
    fn name(&self) -> &str {
        &self.program
    }

    fn speak(&self, text: &str) -> Result<()> {
        log::info!("Speaking: {}", text);
        let output = std::process::Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .output()
            .with_context(|| format!("Failed to run {}", self.program))?;

        if !output.status.success() {
            anyhow::bail!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }
}

/// Logs utterances instead of speaking them
pub struct SilentSpeaker;

impl Speaker for SilentSpeaker {
    fn name(&self) -> &str {
        "silent"
    }

    fn speak(&self, text: &str) -> Result<()> {
        log::info!("(silent) {}", text);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silent_speaker_completes() {
        let speaker = create_speaker(&SpeechConfig {
            backend: SpeechBackend::Silent,
            ..Default::default()
        });
        assert_eq!(speaker.name(), "silent");
        assert!(speaker.speak("This looks like a banana. I'm 92 sure.").is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_command_speaker_passes_text_last() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("spoken.txt");
        let speaker = CommandSpeaker::new(
            "sh".to_string(),
            vec![
                "-c".to_string(),
                format!("printf '%s' \"$1\" > {}", out.display()),
                "speak".to_string(),
            ],
        );
        speaker.speak("I'm not sure. Please try again!").unwrap();
        assert_eq!(
            std::fs::read_to_string(&out).unwrap(),
            "I'm not sure. Please try again!"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_command_speaker_reports_failure() {
        let failing = CommandSpeaker::new("false".to_string(), Vec::new());
        assert!(failing.speak("hello").is_err());

        let missing = CommandSpeaker::new("visiondemo-no-such-synth".to_string(), Vec::new());
        assert!(missing.speak("hello").is_err());
    }
}
