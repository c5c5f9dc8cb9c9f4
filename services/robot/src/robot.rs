//! Speech and motion backends that drive the robot over its WAMP session.

use crate::wamp::WampSession;
use anyhow::{Context, Result};
use async_trait::async_trait;
use riddler_core::{Keyframe, MotionDispatcher, PlaybackMode, SpeechBackend, SpeechHandle};
use serde_json::{Value, json};
use tracing::debug;

pub const SAY_PROCEDURE: &str = "rie.dialogue.say";
pub const MOTOR_WRITE_PROCEDURE: &str = "rom.actuator.motor.write";
pub const BEHAVIOR_PROCEDURE: &str = "rom.optional.behavior.play";
pub const LANGUAGE_PROCEDURE: &str = "rie.dialogue.config.language";

/// Text-to-speech through `rie.dialogue.say`, whose call returns once the
/// robot has finished talking.
#[derive(Clone)]
pub struct RobotSpeech {
    session: WampSession,
}

impl RobotSpeech {
    pub fn new(session: WampSession) -> Self {
        Self { session }
    }
}

#[async_trait]
impl SpeechBackend for RobotSpeech {
    async fn speak(&self, text: &str) -> Result<SpeechHandle> {
        let session = self.session.clone();
        let text = text.to_string();
        Ok(SpeechHandle::spawn(async move {
            session
                .call(SAY_PROCEDURE, vec![], json!({ "text": text }))
                .await
                .with_context(|| format!("Robot failed to say '{text}'"))?;
            Ok(())
        }))
    }
}

/// Keyframe playback through `rom.actuator.motor.write`.
#[derive(Clone)]
pub struct RobotMotion {
    session: WampSession,
}

impl RobotMotion {
    pub fn new(session: WampSession) -> Self {
        Self { session }
    }
}

/// Keyword arguments for a motor write.
pub fn motor_write_kwargs(
    frames: &[Keyframe],
    mode: PlaybackMode,
    synchronous: bool,
    force: bool,
) -> Result<Value> {
    Ok(json!({
        "frames": serde_json::to_value(frames)?,
        "mode": mode,
        "sync": synchronous,
        "force": force,
    }))
}

#[async_trait]
impl MotionDispatcher for RobotMotion {
    async fn dispatch(
        &self,
        frames: &[Keyframe],
        mode: PlaybackMode,
        synchronous: bool,
        force: bool,
    ) -> Result<()> {
        let kwargs = motor_write_kwargs(frames, mode, synchronous, force)?;
        debug!(frames = frames.len(), %mode, synchronous, "Writing motor frames");
        self.session
            .call(MOTOR_WRITE_PROCEDURE, vec![], kwargs)
            .await
            .context("Motor write rejected")?;
        Ok(())
    }
}

/// Plays one of the robot's built-in behaviours, e.g. `BlocklyCrouch`.
pub async fn play_behavior(session: &WampSession, name: &str) -> Result<()> {
    session
        .call(BEHAVIOR_PROCEDURE, vec![], json!({ "name": name }))
        .await
        .with_context(|| format!("Behaviour '{name}' failed"))?;
    Ok(())
}

pub async fn set_language(session: &WampSession, lang: &str) -> Result<()> {
    session
        .call(LANGUAGE_PROCEDURE, vec![], json!({ "lang": lang }))
        .await
        .context("Could not set dialogue language")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use riddler_core::{Joint, Pose};

    #[test]
    fn test_motor_write_kwargs_shape() {
        let frames = [
            Keyframe::new(0.0, Pose::empty().with(Joint::HeadYaw, 0.0)),
            Keyframe::new(820.0, Pose::empty().with(Joint::HeadYaw, 0.3)),
        ];
        let kwargs = motor_write_kwargs(&frames, PlaybackMode::Last, false, true).unwrap();
        assert_eq!(
            kwargs,
            json!({
                "frames": [
                    { "time": 0.0, "data": { "body.head.yaw": 0.0 } },
                    { "time": 820.0, "data": { "body.head.yaw": 0.3 } }
                ],
                "mode": "last",
                "sync": false,
                "force": true
            })
        );
    }
}
