//! The typed player surface.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::PlayerResult;
use crate::protocol::PropertyValue;

/// Property names used by filmroom.
pub mod property {
    pub const PATH: &str = "path";
    pub const TIME_POS: &str = "time-pos";
    pub const DURATION: &str = "duration";
    pub const PAUSE: &str = "pause";
    pub const AB_LOOP_A: &str = "ab-loop-a";
    pub const AB_LOOP_B: &str = "ab-loop-b";
}

/// Sentinel the player uses for an unset loop point.
const LOOP_UNSET: &str = "no";

/// A controllable media player.
///
/// Implementors provide [`Player::command`]; everything else is expressed
/// in terms of it.
#[async_trait]
pub trait Player: Send + Sync {
    /// Send a raw command (`[name, args...]`) and wait for its result.
    async fn command(&self, args: Vec<Value>) -> PlayerResult<PropertyValue>;

    async fn get_property(&self, name: &str) -> PlayerResult<PropertyValue> {
        self.command(vec![json!("get_property"), json!(name)]).await
    }

    async fn set_property(&self, name: &str, value: Value) -> PlayerResult<()> {
        self.command(vec![json!("set_property"), json!(name), value])
            .await
            .map(|_| ())
    }

    /// Current playback position in seconds.
    async fn time_pos(&self) -> PlayerResult<f64> {
        self.get_property(property::TIME_POS)
            .await?
            .expect_number(property::TIME_POS)
    }

    /// Path of the loaded file, exactly as the player reports it.
    async fn path(&self) -> PlayerResult<String> {
        self.get_property(property::PATH)
            .await?
            .expect_text(property::PATH)
    }

    /// Length of the loaded file in seconds.
    async fn duration(&self) -> PlayerResult<f64> {
        self.get_property(property::DURATION)
            .await?
            .expect_number(property::DURATION)
    }

    async fn seek(&self, seconds: f64) -> PlayerResult<()> {
        self.command(vec![json!("seek"), json!(seconds), json!("absolute")])
            .await
            .map(|_| ())
    }

    async fn seek_relative(&self, delta: f64) -> PlayerResult<()> {
        self.command(vec![json!("seek"), json!(delta), json!("relative")])
            .await
            .map(|_| ())
    }

    async fn set_ab_loop(&self, a: f64, b: f64) -> PlayerResult<()> {
        self.set_property(property::AB_LOOP_A, json!(a)).await?;
        self.set_property(property::AB_LOOP_B, json!(b)).await
    }

    async fn clear_ab_loop(&self) -> PlayerResult<()> {
        self.set_property(property::AB_LOOP_A, json!(LOOP_UNSET))
            .await?;
        self.set_property(property::AB_LOOP_B, json!(LOOP_UNSET))
            .await
    }

    /// Current loop points; `None` where unset.
    async fn ab_loop(&self) -> PlayerResult<(Option<f64>, Option<f64>)> {
        let a = self
            .get_property(property::AB_LOOP_A)
            .await?
            .expect_loop_point(property::AB_LOOP_A)?;
        let b = self
            .get_property(property::AB_LOOP_B)
            .await?
            .expect_loop_point(property::AB_LOOP_B)?;
        Ok((a, b))
    }

    async fn is_paused(&self) -> PlayerResult<bool> {
        self.get_property(property::PAUSE)
            .await?
            .expect_flag(property::PAUSE)
    }

    async fn toggle_pause(&self) -> PlayerResult<()> {
        self.command(vec![json!("cycle"), json!(property::PAUSE)])
            .await
            .map(|_| ())
    }

    /// Ask the player process to exit.
    async fn quit(&self) -> PlayerResult<()> {
        self.command(vec![json!("quit")]).await.map(|_| ())
    }
}
