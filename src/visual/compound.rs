//! Visuals composed of sub-visuals.
//!
//! A compound visual has no program of its own. Drawing, bounds, filters and
//! views all delegate to the sub-visuals; each sub carries its own visibility
//! flag so parts of a compound can be switched off without detaching them.

use crate::error::SceneError;
use crate::geometry::Axis;
use crate::transform::Transform;
use crate::transform_system::TransformSystem;
use crate::visual::program::Filter;
use crate::visual::{DrawContext, VisualObject};

struct SubVisual {
    visual: Box<dyn VisualObject>,
    visible: bool,
}

/// A visual built from other visuals.
pub struct CompoundVisual {
    subs: Vec<SubVisual>,
    /// Invoked before the sub-visuals draw. Compounds that need to refresh
    /// shared data ahead of a frame install one; the default does nothing.
    prepare: Option<Box<dyn FnMut()>>,
}

impl CompoundVisual {
    pub fn new() -> Self {
        Self {
            subs: Vec::new(),
            prepare: None,
        }
    }

    /// Append a sub-visual. Subs draw in insertion order.
    pub fn add(&mut self, visual: Box<dyn VisualObject>) -> usize {
        self.subs.push(SubVisual {
            visual,
            visible: true,
        });
        self.subs.len() - 1
    }

    pub fn set_sub_visible(&mut self, index: usize, visible: bool) {
        if let Some(sub) = self.subs.get_mut(index) {
            sub.visible = visible;
        }
    }

    pub fn sub_visible(&self, index: usize) -> bool {
        self.subs.get(index).map(|s| s.visible).unwrap_or(false)
    }

    pub fn sub_count(&self) -> usize {
        self.subs.len()
    }

    /// Install a hook that runs once per draw, before any sub draws.
    pub fn set_prepare(&mut self, f: impl FnMut() + 'static) {
        self.prepare = Some(Box::new(f));
    }
}

impl Default for CompoundVisual {
    fn default() -> Self {
        Self::new()
    }
}

fn union_bounds(subs: &mut [SubVisual], axis: Axis) -> Option<(f32, f32)> {
    let mut acc: Option<(f32, f32)> = None;
    for sub in subs.iter_mut().filter(|s| s.visible) {
        if let Some((lo, hi)) = sub.visual.bounds(axis) {
            acc = Some(match acc {
                Some((alo, ahi)) => (alo.min(lo), ahi.max(hi)),
                None => (lo, hi),
            });
        }
    }
    acc
}

impl VisualObject for CompoundVisual {
    fn draw(&mut self, ctx: &mut DrawContext<'_>) -> Result<(), SceneError> {
        if let Some(prepare) = &mut self.prepare {
            prepare();
        }
        for sub in self.subs.iter_mut().filter(|s| s.visible) {
            sub.visual.draw(ctx)?;
        }
        Ok(())
    }

    fn bounds(&mut self, axis: Axis) -> Option<(f32, f32)> {
        union_bounds(&mut self.subs, axis)
    }

    fn attach(&mut self, filter: Filter) {
        for sub in &mut self.subs {
            sub.visual.attach(filter.clone());
        }
    }

    fn detach(&mut self, name: &str) -> Result<(), SceneError> {
        let mut found = false;
        for sub in &mut self.subs {
            if sub.visual.detach(name).is_ok() {
                found = true;
            }
        }
        if found {
            Ok(())
        } else {
            Err(SceneError::FilterNotAttached(name.to_string()))
        }
    }

    fn view(&self) -> Box<dyn VisualObject> {
        Box::new(CompoundVisualView {
            subs: self
                .subs
                .iter()
                .map(|s| SubVisual {
                    visual: s.visual.view(),
                    visible: s.visible,
                })
                .collect(),
        })
    }

    fn configure(&mut self, visual_transform: Transform, canvas_system: &TransformSystem) {
        for sub in &mut self.subs {
            sub.visual.configure(visual_transform, canvas_system);
        }
    }
}

/// A view on a [`CompoundVisual`]: a compound of views on its subs.
pub struct CompoundVisualView {
    subs: Vec<SubVisual>,
}

impl CompoundVisualView {
    pub fn set_sub_visible(&mut self, index: usize, visible: bool) {
        if let Some(sub) = self.subs.get_mut(index) {
            sub.visible = visible;
        }
    }
}

impl VisualObject for CompoundVisualView {
    fn draw(&mut self, ctx: &mut DrawContext<'_>) -> Result<(), SceneError> {
        for sub in self.subs.iter_mut().filter(|s| s.visible) {
            sub.visual.draw(ctx)?;
        }
        Ok(())
    }

    fn bounds(&mut self, axis: Axis) -> Option<(f32, f32)> {
        union_bounds(&mut self.subs, axis)
    }

    fn attach(&mut self, filter: Filter) {
        for sub in &mut self.subs {
            sub.visual.attach(filter.clone());
        }
    }

    fn detach(&mut self, name: &str) -> Result<(), SceneError> {
        let mut found = false;
        for sub in &mut self.subs {
            if sub.visual.detach(name).is_ok() {
                found = true;
            }
        }
        if found {
            Ok(())
        } else {
            Err(SceneError::FilterNotAttached(name.to_string()))
        }
    }

    fn view(&self) -> Box<dyn VisualObject> {
        Box::new(CompoundVisualView {
            subs: self
                .subs
                .iter()
                .map(|s| SubVisual {
                    visual: s.visual.view(),
                    visible: s.visible,
                })
                .collect(),
        })
    }

    fn configure(&mut self, visual_transform: Transform, canvas_system: &TransformSystem) {
        for sub in &mut self.subs {
            sub.visual.configure(visual_transform, canvas_system);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{DrawMode, SoftwareBackend};
    use crate::color::Color;
    use crate::visual::mesh::MeshContent;
    use crate::visual::single::Visual;

    fn mesh(x0: f32, x1: f32) -> Box<dyn VisualObject> {
        Box::new(Visual::new(
            MeshContent::new(
                vec![[x0, 0.0], [x1, 0.0], [x0, 1.0]],
                Color::rgb(0.0, 1.0, 0.0),
            ),
            DrawMode::Triangles,
        ))
    }

    #[test]
    fn test_bounds_union_over_visible_subs() {
        let mut compound = CompoundVisual::new();
        let a = compound.add(mesh(0.0, 10.0));
        compound.add(mesh(20.0, 30.0));
        assert_eq!(compound.bounds(Axis::X), Some((0.0, 30.0)));

        compound.set_sub_visible(a, false);
        assert_eq!(compound.bounds(Axis::X), Some((20.0, 30.0)));
    }

    #[test]
    fn test_empty_compound_has_no_bounds() {
        let mut compound = CompoundVisual::new();
        assert_eq!(compound.bounds(Axis::X), None);
        assert_eq!(compound.bounds(Axis::Y), None);
    }

    #[test]
    fn test_hidden_sub_does_not_draw() {
        let mut compound = CompoundVisual::new();
        let a = compound.add(mesh(0.0, 10.0));
        compound.add(mesh(20.0, 30.0));
        compound.set_sub_visible(a, false);

        let mut backend = SoftwareBackend::new(16, 16);
        let mut ctx = DrawContext {
            backend: &mut backend,
            picking: false,
            pick_color: Color::TRANSPARENT,
        };
        compound.draw(&mut ctx).unwrap();
        assert_eq!(backend.draw_count(), 1);
    }

    #[test]
    fn test_view_copies_sub_visibility() {
        let mut compound = CompoundVisual::new();
        let a = compound.add(mesh(0.0, 10.0));
        compound.add(mesh(20.0, 30.0));
        compound.set_sub_visible(a, false);

        let mut view = compound.view();
        assert_eq!(view.bounds(Axis::X), Some((20.0, 30.0)));

        // Visibility diverges after the view is taken.
        compound.set_sub_visible(a, true);
        assert_eq!(compound.bounds(Axis::X), Some((0.0, 30.0)));
        assert_eq!(view.bounds(Axis::X), Some((20.0, 30.0)));
    }

    #[test]
    fn test_detach_forwards_to_subs() {
        use crate::visual::program::{Filter, HookPosition, ShaderStage};
        let mut compound = CompoundVisual::new();
        compound.add(mesh(0.0, 10.0));
        assert!(compound.detach("alpha").is_err());
        compound.attach(Filter::new(
            "alpha",
            ShaderStage::Fragment,
            HookPosition::Post,
            "color.a *= 0.5;",
        ));
        assert!(compound.detach("alpha").is_ok());
    }

    #[test]
    fn test_prepare_hook_runs_once_per_draw() {
        use std::cell::Cell;
        use std::rc::Rc;
        let mut compound = CompoundVisual::new();
        compound.add(mesh(0.0, 10.0));
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        compound.set_prepare(move || c.set(c.get() + 1));

        let mut backend = SoftwareBackend::new(16, 16);
        let mut ctx = DrawContext {
            backend: &mut backend,
            picking: false,
            pick_color: Color::TRANSPARENT,
        };
        compound.draw(&mut ctx).unwrap();
        compound.draw(&mut ctx).unwrap();
        assert_eq!(count.get(), 2);
    }
}
