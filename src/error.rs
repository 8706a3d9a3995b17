use thiserror::Error;

/// Errors surfaced by the scene graph and the canvas render/pick driver.
///
/// Configuration errors are raised before any state is mutated. Activation
/// errors are raised after the stack push that attempted them has been
/// rolled back, so the viewport/framebuffer stacks never hold an entry whose
/// target is not active.
#[derive(Debug, Error)]
pub enum SceneError {
    /// A viewport had zero width or height after sign normalization.
    #[error("invalid viewport {x},{y} {w}x{h}: width and height must be non-zero")]
    InvalidViewport { x: i32, y: i32, w: i32, h: i32 },

    /// An offscreen render target had a zero dimension.
    #[error("invalid framebuffer size {0}x{1}")]
    InvalidFramebufferSize(u32, u32),

    /// `pop_viewport` was called with nothing pushed.
    #[error("viewport stack is empty")]
    ViewportStackEmpty,

    /// `pop_fbo` was called with nothing pushed.
    #[error("framebuffer stack is empty")]
    FramebufferStackEmpty,

    /// The backend refused to activate a viewport or framebuffer.
    #[error("render target activation failed: {0}")]
    Activation(String),

    /// The backend failed while executing a draw command.
    #[error("draw submission failed: {0}")]
    Draw(String),

    /// `detach` was called for a filter that was never attached.
    #[error("filter `{0}` is not attached")]
    FilterNotAttached(String),

    /// A node ID referred to a slot that has been removed or reused.
    #[error("stale node id {0:?}")]
    StaleNode(crate::scene::NodeId),

    /// The scene root cannot be removed.
    #[error("the scene root cannot be removed")]
    CannotRemoveRoot,

    /// Reparenting would create a cycle in the scene tree.
    #[error("reparenting {child:?} under {parent:?} would create a cycle")]
    WouldCycle {
        child: crate::scene::NodeId,
        parent: crate::scene::NodeId,
    },
}
