/// Events emitted during a scene update.
/// The presentation layer consumes these for sound and HUD messages.

use crate::domain::controller::{JumpKind, RestartReason};

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    Jumped(JumpKind),
    CoinCollected { x: usize, y: usize },
    AllCoinsCollected,
    LevelRestarted(RestartReason),
    GoalReached,
    GameRestarted,
}
