/// Sprite animations: the three player clips and a small frame animator.

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Anim {
    Idle,
    Walk,
    Jump,
}

impl Anim {
    /// (frame count, frames per second, loops)
    fn clip(self) -> (usize, f32, bool) {
        match self {
            Anim::Idle => (1, 1.0, false),
            Anim::Walk => (2, 15.0, true),
            Anim::Jump => (1, 1.0, false),
        }
    }

    pub fn frame_count(self) -> usize {
        self.clip().0
    }
}

/// Plays one clip at a time and tracks the current frame.
#[derive(Clone, Debug)]
pub struct Animator {
    current: Anim,
    frame: usize,
    elapsed: f32,
}

impl Animator {
    pub fn new(start: Anim) -> Self {
        Animator { current: start, frame: 0, elapsed: 0.0 }
    }

    /// Switch to `anim`. With `ignore_if_playing`, a clip that is already
    /// running keeps its frame; otherwise it restarts from frame 0.
    pub fn play(&mut self, anim: Anim, ignore_if_playing: bool) {
        if ignore_if_playing && self.current == anim {
            return;
        }
        self.current = anim;
        self.frame = 0;
        self.elapsed = 0.0;
    }

    pub fn update(&mut self, dt: f32) {
        let (count, fps, looping) = self.current.clip();
        if count <= 1 {
            return;
        }
        self.elapsed += dt;
        let step = 1.0 / fps;
        while self.elapsed >= step {
            self.elapsed -= step;
            if self.frame + 1 < count {
                self.frame += 1;
            } else if looping {
                self.frame = 0;
            }
        }
    }

    pub fn current(&self) -> Anim {
        self.current
    }

    pub fn frame(&self) -> usize {
        self.frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walk_loops() {
        let mut a = Animator::new(Anim::Idle);
        a.play(Anim::Walk, true);
        assert_eq!(a.frame(), 0);
        a.update(1.0 / 15.0 + 0.001);
        assert_eq!(a.frame(), 1);
        a.update(1.0 / 15.0);
        assert_eq!(a.frame(), 0);
    }

    #[test]
    fn ignore_if_playing_keeps_frame() {
        let mut a = Animator::new(Anim::Walk);
        a.update(0.07);
        assert_eq!(a.frame(), 1);
        a.play(Anim::Walk, true);
        assert_eq!(a.frame(), 1);
        a.play(Anim::Walk, false);
        assert_eq!(a.frame(), 0);
    }

    #[test]
    fn single_frame_clips_never_advance() {
        let mut a = Animator::new(Anim::Jump);
        a.update(5.0);
        assert_eq!(a.frame(), 0);
        assert_eq!(a.current(), Anim::Jump);
        assert_eq!(Anim::Idle.frame_count(), 1);
    }
}
