/// Player movement / jump resolver.
///
/// A pure per-frame function: it reads an immutable `FrameInput`, the
/// contact state sampled from the physics body, and the tuning constants,
/// mutates only the controller-owned `PlayerState`, and returns the
/// side-effect `Command`s the scene applies to the body, the animator and
/// the particle emitters.
///
/// ## Frame order
///
///   1. Horizontal branch (left > right > idle), mutually exclusive
///   2. Airborne override: jump animation, walking dust off
///   3. Jump state machine (grounded jump / double jump / reset)
///   4. Level reset (restart key or fell past the death line)
///
/// ## Jump state machine
///
/// `grounded` is sampled once per frame, so one up-press can fire at most
/// one jump:
///
/// | entering  | grounded | up  | fires       | next      |
/// |-----------|----------|-----|-------------|-----------|
/// | any       | yes      | yes | jump        | Grounded  |
/// | any       | yes      | no  | -           | Grounded  |
/// | Grounded  | no       | yes | double jump | Consumed  |
/// | Fresh     | no       | yes | double jump | Consumed  |
/// | Grounded  | no       | no  | -           | Fresh     |
/// | Fresh     | no       | no  | -           | Fresh     |
/// | Consumed  | no       | any | -           | Consumed  |

use super::anim::Anim;
use super::entity::{Facing, FrameInput};

/// Movement constants (pixels, seconds; negative y is up).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tuning {
    pub acceleration: f32,
    pub drag: f32,
    pub jump_velocity: f32,
    pub gravity: f32,
    pub max_velocity: f32,
    pub particle_velocity: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        Tuning {
            acceleration: 500.0,
            drag: 2000.0,
            jump_velocity: -410.0,
            gravity: 1500.0,
            max_velocity: 10_000.0,
            particle_velocity: 0.0,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum JumpState {
    Grounded,
    AirborneFreshJumpAvailable,
    AirborneJumpConsumed,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum JumpKind {
    Ground,
    Double,
}

/// Controller-owned player state. Everything else about the player lives
/// in the physics body.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlayerState {
    pub jump: JumpState,
    pub facing: Facing,
}

impl PlayerState {
    /// Fresh spawn: double jump available, facing the sprite's natural
    /// (unflipped) direction.
    pub fn new() -> Self {
        PlayerState {
            jump: JumpState::AirborneFreshJumpAvailable,
            facing: Facing::Left,
        }
    }

    pub fn can_double_jump(&self) -> bool {
        self.jump != JumpState::AirborneJumpConsumed
    }
}

impl Default for PlayerState {
    fn default() -> Self {
        Self::new()
    }
}

/// Physics-side facts the resolver reads each frame.
#[derive(Clone, Copy, Debug)]
pub struct Contact {
    pub grounded: bool,
    pub y: f32,
    pub display_w: f32,
    pub display_h: f32,
    pub death_y: f32,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EmitterId {
    Walking,
    Jumping,
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum EmitterCmd {
    Follow { offset_x: f32, offset_y: f32 },
    SetSpeed { x: f32, y: f32 },
    Start,
    Stop,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RestartReason {
    RestartKey,
    FellOutOfLevel,
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Command {
    SetAccelerationX(f32),
    SetDragX(f32),
    SetVelocityY { velocity: f32, kind: JumpKind },
    Face(Facing),
    PlayAnimation { anim: Anim, ignore_if_playing: bool },
    Emitter(EmitterId, EmitterCmd),
    RestartScene(RestartReason),
}

/// Resolve one frame. See the module docs for ordering.
pub fn resolve(
    state: &mut PlayerState,
    input: &FrameInput,
    contact: &Contact,
    tuning: &Tuning,
) -> Vec<Command> {
    let mut out = Vec::with_capacity(10);
    let grounded = contact.grounded;

    resolve_horizontal(state, input, contact, tuning, &mut out);

    if !grounded {
        out.push(Command::PlayAnimation { anim: Anim::Jump, ignore_if_playing: false });
        out.push(Command::Emitter(EmitterId::Walking, EmitterCmd::Stop));
    }

    let (next, fired) = step_jump(state.jump, grounded, input.up_pressed);
    state.jump = next;
    if let Some(kind) = fired {
        out.push(Command::SetVelocityY { velocity: tuning.jump_velocity, kind });
        out.push(Command::Emitter(
            EmitterId::Jumping,
            EmitterCmd::Follow {
                offset_x: contact.display_w / 2.0,
                offset_y: contact.display_h / 2.0 - 5.0,
            },
        ));
        out.push(Command::Emitter(EmitterId::Jumping, EmitterCmd::Start));
    }

    if input.restart_pressed {
        out.push(Command::RestartScene(RestartReason::RestartKey));
    } else if contact.y >= contact.death_y {
        out.push(Command::RestartScene(RestartReason::FellOutOfLevel));
    }

    out
}

fn resolve_horizontal(
    state: &mut PlayerState,
    input: &FrameInput,
    contact: &Contact,
    tuning: &Tuning,
    out: &mut Vec<Command>,
) {
    let (dir, sign, trail_x) = if input.left {
        (Facing::Left, -1.0, 10.0)
    } else if input.right {
        (Facing::Right, 1.0, 20.0)
    } else {
        out.push(Command::SetAccelerationX(0.0));
        out.push(Command::SetDragX(tuning.drag));
        out.push(Command::PlayAnimation { anim: Anim::Idle, ignore_if_playing: false });
        out.push(Command::Emitter(EmitterId::Walking, EmitterCmd::Stop));
        return;
    };

    state.facing = dir;
    out.push(Command::SetAccelerationX(sign * tuning.acceleration));
    out.push(Command::Face(dir));
    out.push(Command::PlayAnimation { anim: Anim::Walk, ignore_if_playing: true });
    // Dust trails behind the feet, so the offset depends on direction.
    out.push(Command::Emitter(
        EmitterId::Walking,
        EmitterCmd::Follow {
            offset_x: contact.display_w / 2.0 - trail_x,
            offset_y: contact.display_h / 2.0 - 5.0,
        },
    ));
    out.push(Command::Emitter(
        EmitterId::Walking,
        EmitterCmd::SetSpeed { x: tuning.particle_velocity, y: 0.0 },
    ));
    if contact.grounded {
        out.push(Command::Emitter(EmitterId::Walking, EmitterCmd::Start));
    }
}

/// One transition of the jump state machine. Returns the next state and
/// the jump fired this frame, if any.
pub fn step_jump(
    state: JumpState,
    grounded: bool,
    up_pressed: bool,
) -> (JumpState, Option<JumpKind>) {
    match (grounded, up_pressed, state) {
        (true, true, _) => (JumpState::Grounded, Some(JumpKind::Ground)),
        (true, false, _) => (JumpState::Grounded, None),
        (false, _, JumpState::AirborneJumpConsumed) => (JumpState::AirborneJumpConsumed, None),
        (false, true, _) => (JumpState::AirborneJumpConsumed, Some(JumpKind::Double)),
        (false, false, _) => (JumpState::AirborneFreshJumpAvailable, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn contact(grounded: bool) -> Contact {
        Contact { grounded, y: 100.0, display_w: 16.0, display_h: 16.0, death_y: 540.0 }
    }

    fn input(left: bool, right: bool, up: bool) -> FrameInput {
        FrameInput { left, right, up_pressed: up, restart_pressed: false }
    }

    fn accel(cmds: &[Command]) -> Option<f32> {
        cmds.iter().find_map(|c| match c {
            Command::SetAccelerationX(a) => Some(*a),
            _ => None,
        })
    }

    fn last_anim(cmds: &[Command]) -> Option<Anim> {
        cmds.iter().rev().find_map(|c| match c {
            Command::PlayAnimation { anim, .. } => Some(*anim),
            _ => None,
        })
    }

    fn jumps(cmds: &[Command]) -> Vec<(f32, JumpKind)> {
        cmds.iter()
            .filter_map(|c| match c {
                Command::SetVelocityY { velocity, kind } => Some((*velocity, *kind)),
                _ => None,
            })
            .collect()
    }

    fn has(cmds: &[Command], cmd: Command) -> bool {
        cmds.contains(&cmd)
    }

    #[test]
    fn left_walks_left() {
        let t = Tuning::default();
        let mut s = PlayerState::new();
        let cmds = resolve(&mut s, &input(true, false, false), &contact(true), &t);
        assert_eq!(accel(&cmds), Some(-500.0));
        assert_eq!(last_anim(&cmds), Some(Anim::Walk));
        assert_eq!(s.facing, Facing::Left);
        assert!(has(&cmds, Command::Emitter(EmitterId::Walking, EmitterCmd::Start)));
        assert!(has(&cmds, Command::Emitter(
            EmitterId::Walking,
            EmitterCmd::Follow { offset_x: -2.0, offset_y: 3.0 },
        )));
    }

    #[test]
    fn left_wins_over_right() {
        let t = Tuning::default();
        let mut s = PlayerState::new();
        let cmds = resolve(&mut s, &input(true, true, false), &contact(true), &t);
        assert_eq!(accel(&cmds), Some(-500.0));
        assert!(has(&cmds, Command::Face(Facing::Left)));
    }

    #[test]
    fn right_walks_right() {
        let t = Tuning::default();
        let mut s = PlayerState::new();
        let cmds = resolve(&mut s, &input(false, true, false), &contact(true), &t);
        assert_eq!(accel(&cmds), Some(500.0));
        assert_eq!(s.facing, Facing::Right);
        assert!(has(&cmds, Command::Emitter(
            EmitterId::Walking,
            EmitterCmd::Follow { offset_x: -12.0, offset_y: 3.0 },
        )));
    }

    #[test]
    fn idle_applies_drag() {
        let t = Tuning::default();
        let mut s = PlayerState::new();
        let cmds = resolve(&mut s, &input(false, false, false), &contact(true), &t);
        assert_eq!(accel(&cmds), Some(0.0));
        assert!(has(&cmds, Command::SetDragX(2000.0)));
        assert_eq!(last_anim(&cmds), Some(Anim::Idle));
        assert!(has(&cmds, Command::Emitter(EmitterId::Walking, EmitterCmd::Stop)));
    }

    #[test]
    fn airborne_overrides_animation_but_not_acceleration() {
        let t = Tuning::default();
        let mut s = PlayerState::new();
        let cmds = resolve(&mut s, &input(false, true, false), &contact(false), &t);
        assert_eq!(accel(&cmds), Some(500.0));
        assert_eq!(last_anim(&cmds), Some(Anim::Jump));
        assert!(!has(&cmds, Command::Emitter(EmitterId::Walking, EmitterCmd::Start)));
        assert!(has(&cmds, Command::Emitter(EmitterId::Walking, EmitterCmd::Stop)));
    }

    #[test]
    fn grounded_jump_keeps_double_jump() {
        let t = Tuning::default();
        let mut s = PlayerState::new();
        let cmds = resolve(&mut s, &input(false, false, true), &contact(true), &t);
        assert_eq!(jumps(&cmds), vec![(-410.0, JumpKind::Ground)]);
        assert!(has(&cmds, Command::Emitter(EmitterId::Jumping, EmitterCmd::Start)));
        assert!(s.can_double_jump());
    }

    #[test]
    fn double_jump_consumed_once() {
        let t = Tuning::default();
        let mut s = PlayerState::new();
        resolve(&mut s, &input(false, false, false), &contact(false), &t);
        assert_eq!(s.jump, JumpState::AirborneFreshJumpAvailable);

        let cmds = resolve(&mut s, &input(false, false, true), &contact(false), &t);
        assert_eq!(jumps(&cmds), vec![(-410.0, JumpKind::Double)]);
        assert!(!s.can_double_jump());

        let cmds = resolve(&mut s, &input(false, false, true), &contact(false), &t);
        assert!(jumps(&cmds).is_empty());
        assert!(!s.can_double_jump());

        resolve(&mut s, &input(false, false, false), &contact(true), &t);
        assert!(s.can_double_jump());
    }

    #[test]
    fn restart_key_requests_reset() {
        let t = Tuning::default();
        let mut s = PlayerState::new();
        let mut i = input(false, false, false);
        i.restart_pressed = true;
        let cmds = resolve(&mut s, &i, &contact(true), &t);
        assert!(has(&cmds, Command::RestartScene(RestartReason::RestartKey)));
    }

    #[test]
    fn falling_past_death_line_requests_reset() {
        let t = Tuning::default();
        let mut s = PlayerState::new();
        let mut c = contact(false);
        c.y = 539.9;
        let cmds = resolve(&mut s, &input(false, false, false), &c, &t);
        assert!(!cmds.iter().any(|c| matches!(c, Command::RestartScene(_))));
        c.y = 540.0;
        let cmds = resolve(&mut s, &input(false, false, false), &c, &t);
        assert!(has(&cmds, Command::RestartScene(RestartReason::FellOutOfLevel)));
    }

    fn frame() -> impl Strategy<Value = (bool, bool, bool, bool)> {
        (any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>())
    }

    proptest! {
        #[test]
        fn jump_invariants_hold(frames in proptest::collection::vec(frame(), 1..200)) {
            let t = Tuning::default();
            let mut s = PlayerState::new();
            let mut doubles_since_ground = 0;
            for (left, right, up, grounded) in frames {
                let cmds = resolve(&mut s, &input(left, right, up), &contact(grounded), &t);
                let fired = jumps(&cmds);

                prop_assert!(fired.len() <= 1);
                if up && grounded {
                    prop_assert_eq!(fired.clone(), vec![(t.jump_velocity, JumpKind::Ground)]);
                }
                if grounded {
                    prop_assert!(s.can_double_jump());
                    doubles_since_ground = 0;
                } else if fired.iter().any(|(_, k)| *k == JumpKind::Double) {
                    doubles_since_ground += 1;
                    prop_assert!(!s.can_double_jump());
                }
                prop_assert!(doubles_since_ground <= 1);

                if left {
                    prop_assert_eq!(accel(&cmds), Some(-t.acceleration));
                } else if !right {
                    prop_assert_eq!(accel(&cmds), Some(0.0));
                    prop_assert!(has(&cmds, Command::SetDragX(t.drag)));
                }
                let expected = if !grounded {
                    Anim::Jump
                } else if left || right {
                    Anim::Walk
                } else {
                    Anim::Idle
                };
                prop_assert_eq!(last_anim(&cmds), Some(expected));
            }
        }
    }
}
