//! CLI Command Implementations
//!
//! Each command opens a session on the real clock, drives the transport and
//! prints every time stamp and state change until the session is closed.

use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::TransportConfig;
use crate::engine::{TransportController, TransportState};
use crate::error::{Result, TransportError};
use crate::timestamp::TimeStamp;

/// One line of command output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OutputLine {
    Time { time_us: TimeStamp },
    State { state: TransportState },
}

impl OutputLine {
    pub fn render(&self, json: bool) -> String {
        if json {
            return serde_json::to_string(self).unwrap_or_default();
        }
        match self {
            OutputLine::Time { time_us } => format!("time  {:>10.3}s", time_us.as_secs_f64()),
            OutputLine::State { state } => format!("state {}", state),
        }
    }
}

/// A transport plus the task printing its state stream.
struct Session {
    transport: TransportController,
    printer: JoinHandle<()>,
}

impl Session {
    fn open(config: TransportConfig, json: bool) -> Result<Self> {
        let transport = TransportController::builder(move |time_us| {
            println!("{}", OutputLine::Time { time_us }.render(json));
        })
        .config(config)
        .build()?;

        let mut states = transport.subscribe_state();
        let printer = tokio::spawn(async move {
            while let Some(state) = states.recv().await {
                println!("{}", OutputLine::State { state }.render(json));
            }
        });

        Ok(Self { transport, printer })
    }

    async fn close(self) {
        self.transport.dispose();
        if let Err(e) = self.printer.await {
            warn!("State printer failed: {}", e);
        }
    }
}

/// Play from zero for `seconds`, then pause.
pub async fn play(config: TransportConfig, json: bool, seconds: f64) -> Result<()> {
    let length = Duration::try_from_secs_f64(seconds).map_err(|_| TransportError::Config {
        reason: format!("play length {} is not a representable number of seconds", seconds),
    })?;
    info!("Playing for {:.3}s", seconds);
    let session = Session::open(config, json)?;

    session.transport.play();
    tokio::time::sleep(length).await;
    session.transport.pause();

    info!("Paused at {:.3}s", session.transport.last_time().as_secs_f64());
    session.close().await;
    Ok(())
}

/// Animate to `to_ms`, returning once the animation completes.
pub async fn animate(
    config: TransportConfig,
    json: bool,
    to_ms: u64,
    duration_ms: Option<u64>,
) -> Result<()> {
    let session = Session::open(config, json)?;
    let target = TimeStamp::from_millis(to_ms);

    let handle = match duration_ms {
        Some(ms) => session
            .transport
            .animate_to_over(target, Duration::from_millis(ms)),
        None => session.transport.animate_to(target),
    };
    handle.await;

    info!("Animation reached {:.3}s", session.transport.last_time().as_secs_f64());
    session.close().await;
    Ok(())
}

/// Jump to `to_ms`.
pub async fn jump(config: TransportConfig, json: bool, to_ms: u64) -> Result<()> {
    let session = Session::open(config, json)?;
    session.transport.jump_to(TimeStamp::from_millis(to_ms));
    session.close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_text() {
        let line = OutputLine::Time {
            time_us: TimeStamp::from_millis(1500),
        };
        assert_eq!(line.render(false), "time       1.500s");
        let line = OutputLine::State {
            state: TransportState::Paused,
        };
        assert_eq!(line.render(false), "state Paused");
    }

    #[test]
    fn test_render_json() {
        let line = OutputLine::Time {
            time_us: TimeStamp::from_millis(2),
        };
        assert_eq!(line.render(true), r#"{"event":"time","time_us":2000}"#);
        let line = OutputLine::State {
            state: TransportState::JumpingForward,
        };
        assert_eq!(
            line.render(true),
            r#"{"event":"state","state":"jumpingForward"}"#
        );
    }

    #[tokio::test]
    async fn test_play_rejects_unrepresentable_length() {
        let config = TransportConfig::default();
        let err = play(config.clone(), false, f64::INFINITY).await.unwrap_err();
        assert_eq!(err.error_code(), "CONFIG_ERROR");
        assert!(play(config, false, -1.0).await.is_err());
    }

    #[tokio::test]
    async fn test_jump_command_runs() {
        let config = TransportConfig::default().with_frame_rate(100.0);
        assert!(jump(config, true, 250).await.is_ok());
    }

    #[tokio::test]
    async fn test_animate_command_completes() {
        let config = TransportConfig::default().with_frame_rate(100.0);
        assert!(animate(config, false, 500, Some(50)).await.is_ok());
    }
}
