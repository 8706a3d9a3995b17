//! Single-program visuals and their views.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::backend::{DrawCommand, DrawMode};
use crate::error::SceneError;
use crate::geometry::Axis;
use crate::transform::Transform;
use crate::transform_system::TransformSystem;
use crate::visual::program::Filter;
use crate::visual::share::{GlState, ViewState, VisualShare};
use crate::visual::{DrawContext, VisualContent, VisualObject};

/// A drawable unit backed by a single program.
///
/// The visual owns its [`VisualContent`]; views reference it weakly. All
/// views (the visual included) register their [`ViewState`] in the shared
/// block so filter attachment can propagate.
pub struct Visual {
    share: Rc<RefCell<VisualShare>>,
    content: Rc<RefCell<dyn VisualContent>>,
    state: Rc<RefCell<ViewState>>,
}

impl Visual {
    pub fn new<C: VisualContent + 'static>(content: C, draw_mode: DrawMode) -> Self {
        Self::from_shared(Rc::new(RefCell::new(content)), draw_mode)
    }

    /// Build a visual over externally held content. The caller keeps its
    /// `Rc` and can mutate the content directly; call
    /// [`invalidate_bounds`](Self::invalidate_bounds) after mutations that
    /// change extent.
    pub fn from_shared<C: VisualContent + 'static>(
        content: Rc<RefCell<C>>,
        draw_mode: DrawMode,
    ) -> Self {
        let share = Rc::new(RefCell::new(VisualShare::new(draw_mode)));
        let content: Rc<RefCell<dyn VisualContent>> = content;
        let state = Rc::new(RefCell::new(ViewState::new()));
        share.borrow_mut().register_view(&state);
        content.borrow().prepare_transforms(&mut state.borrow_mut());
        Self {
            share,
            content,
            state,
        }
    }

    /// Replace the GL state used when drawing. Shared: affects all views.
    pub fn set_gl_state(&self, state: GlState) {
        self.share.borrow_mut().gl_state = state;
    }

    /// Partially modify the shared GL state.
    pub fn update_gl_state(&self, f: impl FnOnce(&mut GlState)) {
        f(&mut self.share.borrow_mut().gl_state);
    }

    /// Set the visual-local transform leg of this instance's chain.
    pub fn set_visual_transform(&self, tr: Transform) {
        self.state.borrow_mut().transforms.set_visual_transform(tr);
    }

    /// Drop cached bounds after the content's extent changed.
    pub fn invalidate_bounds(&self) {
        self.share.borrow_mut().bounds.clear();
    }
}

fn draw_with_content(
    share: &Rc<RefCell<VisualShare>>,
    state: &Rc<RefCell<ViewState>>,
    content: &Rc<RefCell<dyn VisualContent>>,
    ctx: &mut DrawContext<'_>,
) -> Result<(), SceneError> {
    let mut share = share.borrow_mut();
    let mut state = state.borrow_mut();
    ctx.backend.apply_state(&share.gl_state);

    if state.transform_stale() {
        content.borrow().prepare_transforms(&mut state);
    }
    if !content.borrow_mut().prepare_draw(&mut share, &mut state) {
        return Ok(());
    }

    let color = if ctx.picking {
        ctx.pick_color
    } else {
        state.program.color()
    };
    let cmd = DrawCommand {
        mode: share.draw_mode,
        vertices: Rc::clone(&share.vertices),
        indices: share.indices.as_ref().map(Rc::clone),
        transform: state.program.transform(),
        color,
    };
    ctx.backend.draw(&cmd)
}

fn shared_bounds(
    share: &Rc<RefCell<VisualShare>>,
    content: &Rc<RefCell<dyn VisualContent>>,
    axis: Axis,
) -> Option<(f32, f32)> {
    let mut share = share.borrow_mut();
    if let Some(cached) = share.bounds.get(&axis) {
        return *cached;
    }
    let bounds = content.borrow().compute_bounds(axis);
    share.bounds.insert(axis, bounds);
    bounds
}

fn make_view(
    share: &Rc<RefCell<VisualShare>>,
    content: &Rc<RefCell<dyn VisualContent>>,
) -> VisualView {
    let state = Rc::new(RefCell::new(ViewState::new()));
    {
        let mut share = share.borrow_mut();
        share.register_view(&state);
        // New views pick up every filter already attached to the shared
        // visual.
        let mut st = state.borrow_mut();
        for filter in &share.filters {
            filter.apply(&mut st.program);
            st.filters.push(filter.clone());
        }
    }
    content.borrow().prepare_transforms(&mut state.borrow_mut());
    VisualView {
        share: Rc::clone(share),
        content: Rc::downgrade(content),
        state,
    }
}

impl VisualObject for Visual {
    fn draw(&mut self, ctx: &mut DrawContext<'_>) -> Result<(), SceneError> {
        draw_with_content(&self.share, &self.state, &self.content, ctx)
    }

    fn bounds(&mut self, axis: Axis) -> Option<(f32, f32)> {
        shared_bounds(&self.share, &self.content, axis)
    }

    fn attach(&mut self, filter: Filter) {
        let mut share = self.share.borrow_mut();
        for state in share.live_views() {
            let mut state = state.borrow_mut();
            filter.apply(&mut state.program);
            state.filters.push(filter.clone());
        }
        share.filters.push(filter);
    }

    fn detach(&mut self, name: &str) -> Result<(), SceneError> {
        let mut share = self.share.borrow_mut();
        let pos = share
            .filters
            .iter()
            .position(|f| f.name() == name)
            .ok_or_else(|| SceneError::FilterNotAttached(name.to_string()))?;
        let filter = share.filters.remove(pos);
        for state in share.live_views() {
            let mut state = state.borrow_mut();
            filter.remove(&mut state.program);
            state.filters.retain(|f| f.name() != name);
        }
        Ok(())
    }

    fn view(&self) -> Box<dyn VisualObject> {
        Box::new(make_view(&self.share, &self.content))
    }

    fn configure(&mut self, visual_transform: Transform, canvas_system: &TransformSystem) {
        let mut state = self.state.borrow_mut();
        state.transforms.set_visual_transform(visual_transform);
        state.transforms.configure_from(canvas_system);
        if state.transform_stale() {
            self.content.borrow().prepare_transforms(&mut state);
        }
    }
}

/// A view on another [`Visual`].
///
/// Views own their program instantiation, transform chain and filter
/// attachments, but reference the viewed content weakly: destroying the
/// source visual turns the view's draw into a logged no-op.
pub struct VisualView {
    share: Rc<RefCell<VisualShare>>,
    content: Weak<RefCell<dyn VisualContent>>,
    state: Rc<RefCell<ViewState>>,
}

impl VisualView {
    pub fn set_visual_transform(&self, tr: Transform) {
        self.state.borrow_mut().transforms.set_visual_transform(tr);
    }

    /// Whether the viewed visual still exists.
    pub fn is_live(&self) -> bool {
        self.content.strong_count() > 0
    }
}

impl VisualObject for VisualView {
    fn draw(&mut self, ctx: &mut DrawContext<'_>) -> Result<(), SceneError> {
        match self.content.upgrade() {
            Some(content) => draw_with_content(&self.share, &self.state, &content, ctx),
            None => {
                log::debug!("skipping draw of a view whose source visual was dropped");
                Ok(())
            }
        }
    }

    fn bounds(&mut self, axis: Axis) -> Option<(f32, f32)> {
        self.content
            .upgrade()
            .and_then(|content| shared_bounds(&self.share, &content, axis))
    }

    fn attach(&mut self, filter: Filter) {
        let mut state = self.state.borrow_mut();
        filter.apply(&mut state.program);
        state.filters.push(filter);
    }

    fn detach(&mut self, name: &str) -> Result<(), SceneError> {
        let mut state = self.state.borrow_mut();
        let pos = state
            .filters
            .iter()
            .position(|f| f.name() == name)
            .ok_or_else(|| SceneError::FilterNotAttached(name.to_string()))?;
        let filter = state.filters.remove(pos);
        filter.remove(&mut state.program);
        Ok(())
    }

    fn view(&self) -> Box<dyn VisualObject> {
        match self.content.upgrade() {
            Some(content) => Box::new(make_view(&self.share, &content)),
            None => {
                log::debug!("viewing a dead view; the result will never draw");
                Box::new(VisualView {
                    share: Rc::clone(&self.share),
                    content: Weak::<RefCell<MissingContent>>::new(),
                    state: Rc::new(RefCell::new(ViewState::new())),
                })
            }
        }
    }

    fn configure(&mut self, visual_transform: Transform, canvas_system: &TransformSystem) {
        let mut state = self.state.borrow_mut();
        state.transforms.set_visual_transform(visual_transform);
        state.transforms.configure_from(canvas_system);
        if state.transform_stale() {
            match self.content.upgrade() {
                Some(content) => content.borrow().prepare_transforms(&mut state),
                None => state.bind_transform(),
            }
        }
    }
}

struct MissingContent;

impl VisualContent for MissingContent {
    fn compute_bounds(&self, _axis: Axis) -> Option<(f32, f32)> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SoftwareBackend;
    use crate::color::Color;
    use crate::visual::mesh::MeshContent;
    use crate::visual::program::{HookPosition, ShaderStage};

    fn triangle() -> Visual {
        Visual::new(
            MeshContent::new(
                vec![[0.0, 0.0], [10.0, 0.0], [0.0, 10.0]],
                Color::rgb(1.0, 0.0, 0.0),
            ),
            DrawMode::Triangles,
        )
    }

    fn alpha_filter() -> Filter {
        Filter::new(
            "alpha",
            ShaderStage::Fragment,
            HookPosition::Post,
            "color.a *= 0.5;",
        )
    }

    #[test]
    fn test_view_shares_geometry() {
        let mut visual = triangle();
        let mut view = visual.view();

        let mut backend = SoftwareBackend::new(32, 32);
        let mut ctx = DrawContext {
            backend: &mut backend,
            picking: false,
            pick_color: Color::TRANSPARENT,
        };
        visual.draw(&mut ctx).unwrap();
        view.draw(&mut ctx).unwrap();

        // Geometry was uploaded once into the share; both draws hand out the
        // same buffer.
        let share = visual.share.borrow();
        assert_eq!(share.vertices.len(), 3);
        assert!(Rc::strong_count(&share.vertices) >= 1);
    }

    #[test]
    fn test_shared_attach_propagates_to_live_views() {
        let mut visual = triangle();
        let view = make_view(&visual.share, &visual.content);
        visual.attach(alpha_filter());

        let state = view.state.borrow();
        let hooks = state
            .program
            .hook_statements(ShaderStage::Fragment, HookPosition::Post)
            .unwrap();
        assert_eq!(hooks.statements().len(), 1);
        drop(state);

        // A view created after attachment also picks the filter up.
        let late = make_view(&visual.share, &visual.content);
        assert_eq!(late.state.borrow().filters.len(), 1);
    }

    #[test]
    fn test_detach_unattached_filter_errors() {
        let mut visual = triangle();
        assert!(matches!(
            visual.detach("nope"),
            Err(SceneError::FilterNotAttached(_))
        ));
        visual.attach(alpha_filter());
        assert!(visual.detach("alpha").is_ok());
        assert!(visual.detach("alpha").is_err());
    }

    #[test]
    fn test_view_local_attach_does_not_touch_source() {
        let visual = triangle();
        let mut view = make_view(&visual.share, &visual.content);
        view.attach(alpha_filter());
        assert!(visual.state.borrow().filters.is_empty());
        assert!(view.detach("alpha").is_ok());
        assert!(view.detach("alpha").is_err());
    }

    #[test]
    fn test_view_survives_source_drop() {
        let visual = triangle();
        let mut view = make_view(&visual.share, &visual.content);
        drop(visual);
        assert!(!view.is_live());

        let mut backend = SoftwareBackend::new(8, 8);
        let mut ctx = DrawContext {
            backend: &mut backend,
            picking: false,
            pick_color: Color::TRANSPARENT,
        };
        // Draw and bounds degrade gracefully, no panic.
        view.draw(&mut ctx).unwrap();
        assert_eq!(view.bounds(Axis::X), None);
    }

    #[test]
    fn test_bounds_cached_in_share() {
        let mut visual = triangle();
        assert_eq!(visual.bounds(Axis::X), Some((0.0, 10.0)));
        assert_eq!(visual.bounds(Axis::Y), Some((0.0, 10.0)));
        // Views answer from the shared cache.
        let mut view = make_view(&visual.share, &visual.content);
        assert_eq!(view.bounds(Axis::X), Some((0.0, 10.0)));
    }

    #[test]
    fn test_prepare_draw_false_suppresses_single_call() {
        let mut visual = Visual::new(
            MeshContent::new(Vec::new(), Color::WHITE),
            DrawMode::Triangles,
        );
        let mut backend = SoftwareBackend::new(8, 8);
        let mut ctx = DrawContext {
            backend: &mut backend,
            picking: false,
            pick_color: Color::TRANSPARENT,
        };
        // Empty mesh: prepare_draw returns false, nothing is submitted.
        visual.draw(&mut ctx).unwrap();
        assert_eq!(backend.draw_count(), 0);
    }
}
