use crate::scene::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// The kind of pointer event being dispatched into the scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MouseEventKind {
    Press { button: MouseButton },
    Move,
    Release { button: MouseButton },
    Wheel { delta_x: f32, delta_y: f32 },
}

/// A pointer event routed to a picked (or captured) visual.
///
/// `pos` is in canvas coordinates. Handlers set `handled` to report back to
/// the window layer whether the event was consumed.
#[derive(Debug, Clone)]
pub struct SceneMouseEvent {
    pub kind: MouseEventKind,
    pub pos: (f32, f32),
    /// The node the event is routed to: the picked visual on press, or the
    /// capture target while a button is held.
    pub target: NodeId,
    pub handled: bool,
}

impl SceneMouseEvent {
    pub fn new(kind: MouseEventKind, pos: (f32, f32), target: NodeId) -> Self {
        Self {
            kind,
            pos,
            target,
            handled: false,
        }
    }
}
