//! Application wiring: config, session, classifier, speaker and the input loop

use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::{self, UnboundedSender};

use crate::capture::session::CaptureSession;
use crate::classify::{self, Classifier};
use crate::config::VisionDemoConfig;
use crate::controller::{CameraController, ControllerOptions, Msg};
use crate::speech::{self, Speaker};
use crate::surface::ConsoleSurface;

/// Width of the photo thumbnail written by the console surface
const THUMBNAIL_WIDTH: u32 = 256;

/// Map one line of terminal input to a controller message
pub fn parse_command(line: &str) -> Option<Msg> {
    match line.trim().to_ascii_lowercase().as_str() {
        "" | "t" | "tap" => Some(Msg::Tap),
        "f" | "flash" => Some(Msg::ToggleFlash),
        "q" | "quit" | "exit" => Some(Msg::Quit),
        _ => None,
    }
}

pub async fn run() -> anyhow::Result<()> {
    let first_run = VisionDemoConfig::config_path()
        .map(|path| !path.exists())
        .unwrap_or(false);
    let config = VisionDemoConfig::load();
    if first_run {
        config.save();
    }

    let session = CaptureSession::initialize(&config);

    let classifier_cfg = config.classifier.clone();
    let classifier: Option<Arc<dyn Classifier>> =
        match tokio::task::spawn_blocking(move || classify::create_classifier(&classifier_cfg)).await? {
            Ok(classifier) => {
                log::info!("Using classifier: {}", classifier.name());
                Some(Arc::from(classifier))
            }
            Err(e) => {
                log::error!("Failed to load classifier: {:?}", e);
                None
            }
        };

    let speaker: Arc<dyn Speaker> = Arc::from(speech::create_speaker(&config.speech));
    log::info!("Using speaker: {}", speaker.name());

    let surface = ConsoleSurface::stdout(config.output_dir.clone(), THUMBNAIL_WIDTH);
    let (tx, rx) = mpsc::unbounded_channel();
    let mut controller = CameraController::new(
        surface,
        session,
        classifier,
        speaker,
        tx.clone(),
        ControllerOptions {
            display_width: THUMBNAIL_WIDTH,
            ..ControllerOptions::from(&config)
        },
    );
    controller.start();

    tokio::spawn(forward_input(tx));
    controller.run(rx).await;
    Ok(())
}

/// Read stdin line by line and forward commands; EOF quits
async fn forward_input(tx: UnboundedSender<Msg>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let msg = match lines.next_line().await {
            Ok(Some(line)) => match parse_command(&line) {
                Some(msg) => msg,
                None => {
                    log::warn!("Unknown command: {:?}", line.trim());
                    continue;
                }
            },
            Ok(None) => Msg::Quit,
            Err(e) => {
                log::error!("Failed to read input: {}", e);
                Msg::Quit
            }
        };
        let quit = matches!(msg, Msg::Quit);
        if tx.send(msg).is_err() || quit {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command() {
        assert!(matches!(parse_command(""), Some(Msg::Tap)));
        assert!(matches!(parse_command("  t \n"), Some(Msg::Tap)));
        assert!(matches!(parse_command("F"), Some(Msg::ToggleFlash)));
        assert!(matches!(parse_command("quit"), Some(Msg::Quit)));
        assert!(parse_command("snap").is_none());
    }
}
