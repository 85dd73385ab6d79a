//! Finite-time actions.
//!
//! An [`Action`] is a description; running it on a node creates a
//! [`RunningAction`] that the scene advances every tick. Sequences are
//! flattened into a queue of leaf steps. Each step captures its start value
//! from the node when it begins, interpolates linearly, and hands any unused
//! frame time to the next step.

use std::collections::VecDeque;

use crate::node::{Node, Point};

#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    Sequence(Box<Action>, Box<Action>),
    Delay(f32),
    MoveTo { duration: f32, to: Point },
    MoveBy { duration: f32, by: Point },
    ScaleTo { duration: f32, scale: f32 },
    ScaleBy { duration: f32, factor: f32 },
    RotateTo { duration: f32, angle: f32 },
    RotateBy { duration: f32, angle: f32 },
    /// Opacity target in `0..=255`.
    FadeTo { duration: f32, opacity: f32 },
}

impl Action {
    pub fn sequence(first: Action, second: Action) -> Self {
        Action::Sequence(Box::new(first), Box::new(second))
    }

    /// Total running time in seconds.
    pub fn duration(&self) -> f32 {
        match self {
            Action::Sequence(a, b) => a.duration() + b.duration(),
            Action::Delay(duration)
            | Action::MoveTo { duration, .. }
            | Action::MoveBy { duration, .. }
            | Action::ScaleTo { duration, .. }
            | Action::ScaleBy { duration, .. }
            | Action::RotateTo { duration, .. }
            | Action::RotateBy { duration, .. }
            | Action::FadeTo { duration, .. } => duration.max(0.0),
        }
    }

    fn flatten_into(self, steps: &mut VecDeque<Action>) {
        match self {
            Action::Sequence(a, b) => {
                a.flatten_into(steps);
                b.flatten_into(steps);
            }
            leaf => steps.push_back(leaf),
        }
    }
}

/// Start values captured when a step begins.
#[derive(Clone, Copy, Debug)]
enum StartValue {
    None,
    Position(Point),
    Scale(f32, f32),
    Rotation(f32),
    Opacity(f32),
}

#[derive(Clone, Debug)]
struct ActiveStep {
    action: Action,
    elapsed: f32,
    start: StartValue,
}

/// An action in progress on one node.
#[derive(Clone, Debug)]
pub struct RunningAction {
    pending: VecDeque<Action>,
    active: Option<ActiveStep>,
}

impl RunningAction {
    pub fn new(action: Action) -> Self {
        let mut pending = VecDeque::new();
        action.flatten_into(&mut pending);
        Self {
            pending,
            active: None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.active.is_none() && self.pending.is_empty()
    }

    /// Advance by `dt` seconds. Returns `true` once every step has finished.
    pub fn step(&mut self, node: &mut Node, mut dt: f32) -> bool {
        loop {
            if self.active.is_none() {
                let Some(action) = self.pending.pop_front() else {
                    return true;
                };
                let start = capture(&action, node);
                self.active = Some(ActiveStep {
                    action,
                    elapsed: 0.0,
                    start,
                });
            }
            let Some(step) = self.active.as_mut() else {
                return true;
            };

            let duration = step.action.duration();
            let remaining = duration - step.elapsed;
            if dt >= remaining {
                apply(&step.action, step.start, node, 1.0);
                dt -= remaining;
                self.active = None;
                continue;
            }

            step.elapsed += dt;
            apply(&step.action, step.start, node, step.elapsed / duration);
            return false;
        }
    }
}

fn capture(action: &Action, node: &Node) -> StartValue {
    match action {
        Action::MoveTo { .. } | Action::MoveBy { .. } => StartValue::Position(node.position),
        Action::ScaleTo { .. } | Action::ScaleBy { .. } => StartValue::Scale(node.scale_x, node.scale_y),
        Action::RotateTo { .. } | Action::RotateBy { .. } => StartValue::Rotation(node.rotation),
        Action::FadeTo { .. } => match node.rgba {
            Some(rgba) => StartValue::Opacity(rgba.opacity as f32),
            None => StartValue::None,
        },
        Action::Delay(_) | Action::Sequence(..) => StartValue::None,
    }
}

fn lerp(from: f32, to: f32, t: f32) -> f32 {
    from + (to - from) * t
}

fn apply(action: &Action, start: StartValue, node: &mut Node, t: f32) {
    match (action, start) {
        (Action::MoveTo { to, .. }, StartValue::Position(from)) => {
            node.position = Point::new(lerp(from.x, to.x, t), lerp(from.y, to.y, t));
        }
        (Action::MoveBy { by, .. }, StartValue::Position(from)) => {
            node.position = Point::new(from.x + by.x * t, from.y + by.y * t);
        }
        (Action::ScaleTo { scale, .. }, StartValue::Scale(sx, sy)) => {
            node.scale_x = lerp(sx, *scale, t);
            node.scale_y = lerp(sy, *scale, t);
        }
        (Action::ScaleBy { factor, .. }, StartValue::Scale(sx, sy)) => {
            node.scale_x = lerp(sx, sx * factor, t);
            node.scale_y = lerp(sy, sy * factor, t);
        }
        (Action::RotateTo { angle, .. }, StartValue::Rotation(from)) => {
            node.rotation = lerp(from, *angle, t);
        }
        (Action::RotateBy { angle, .. }, StartValue::Rotation(from)) => {
            node.rotation = from + angle * t;
        }
        (Action::FadeTo { opacity, .. }, StartValue::Opacity(from)) => {
            if let Some(rgba) = node.rgba.as_mut() {
                rgba.opacity = lerp(from, opacity.clamp(0.0, 255.0), t).round() as u8;
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Label, NodeKind};

    fn plain() -> Node {
        Node::new(NodeKind::Node)
    }

    #[test]
    fn move_to_interpolates() {
        let mut node = plain();
        let mut running = RunningAction::new(Action::MoveTo {
            duration: 2.0,
            to: Point::new(10.0, 20.0),
        });
        assert!(!running.step(&mut node, 1.0));
        assert_eq!(node.position, Point::new(5.0, 10.0));
        assert!(running.step(&mut node, 1.0));
        assert_eq!(node.position, Point::new(10.0, 20.0));
    }

    #[test]
    fn sequence_carries_leftover_time() {
        let mut node = plain();
        let action = Action::sequence(
            Action::Delay(0.5),
            Action::RotateBy {
                duration: 1.0,
                angle: 90.0,
            },
        );
        assert_eq!(action.duration(), 1.5);

        let mut running = RunningAction::new(action);
        // 0.5 finishes the delay, the other 0.5 goes to the rotation.
        assert!(!running.step(&mut node, 1.0));
        assert_eq!(node.rotation, 45.0);
        assert!(running.step(&mut node, 0.5));
        assert_eq!(node.rotation, 90.0);
        assert!(running.is_done());
    }

    #[test]
    fn start_value_captured_when_step_begins() {
        let mut node = plain();
        let mut running = RunningAction::new(Action::sequence(
            Action::Delay(1.0),
            Action::MoveBy {
                duration: 1.0,
                by: Point::new(10.0, 0.0),
            },
        ));
        running.step(&mut node, 0.5);
        // Moved by someone else during the delay.
        node.position = Point::new(100.0, 0.0);
        running.step(&mut node, 1.5);
        assert_eq!(node.position, Point::new(110.0, 0.0));
    }

    #[test]
    fn scale_by_multiplies() {
        let mut node = plain();
        node.set_scale(2.0);
        let mut running = RunningAction::new(Action::ScaleBy {
            duration: 0.0,
            factor: 3.0,
        });
        assert!(running.step(&mut node, 0.0));
        assert_eq!(node.scale_x, 6.0);
        assert_eq!(node.scale_y, 6.0);
    }

    #[test]
    fn fade_only_touches_rgba_nodes() {
        let mut label = Node::new(NodeKind::Label(Label {
            text: "hi".into(),
            font: "bigFont.fnt".into(),
        }));
        let mut running = RunningAction::new(Action::FadeTo {
            duration: 1.0,
            opacity: 55.0,
        });
        running.step(&mut label, 0.5);
        assert_eq!(label.rgba().map(|c| c.opacity), Some(155));

        let mut node = plain();
        let mut running = RunningAction::new(Action::FadeTo {
            duration: 1.0,
            opacity: 0.0,
        });
        assert!(running.step(&mut node, 1.0));
        assert!(node.rgba().is_none());
    }
}
