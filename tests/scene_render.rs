//! End-to-end tests driving the canvas against the software backend.

use scenic::prelude::*;

fn test_canvas(width: u32, height: u32) -> Canvas {
    Canvas::new(
        CanvasConfig::new()
            .with_size(width, height)
            .with_background(Color::BLACK),
        Box::new(SoftwareBackend::new(width, height)),
    )
}

fn rect(x: f32, y: f32, w: f32, h: f32, color: Color) -> Box<dyn VisualObject> {
    Box::new(Visual::new(
        MeshContent::rect(x, y, w, h, color),
        DrawMode::Triangles,
    ))
}

#[test]
fn hidden_subtree_never_reaches_the_target() {
    let mut canvas = test_canvas(64, 64);
    let root = canvas.scene().root();

    // Left half visible, right half under a hidden group.
    canvas
        .scene_mut()
        .add_visual(root, rect(0.0, 0.0, 32.0, 64.0, Color::rgb(1.0, 0.0, 0.0)))
        .unwrap();
    let hidden = canvas.scene_mut().add_node(root).unwrap();
    canvas
        .scene_mut()
        .add_visual(hidden, rect(32.0, 0.0, 32.0, 64.0, Color::rgb(0.0, 1.0, 0.0)))
        .unwrap();
    canvas.scene_mut().set_visible(hidden, false).unwrap();

    let image = canvas.render(None, None, None).unwrap();
    assert_eq!(image.pixel(16, 32), [255, 0, 0, 255]);
    // The hidden half shows background.
    assert_eq!(image.pixel(48, 32), [0, 0, 0, 255]);

    // Making it visible again draws it; no structural change happened, so
    // the cached order is reused.
    canvas.scene_mut().set_visible(hidden, true).unwrap();
    let image = canvas.render(None, None, None).unwrap();
    assert_eq!(image.pixel(48, 32), [0, 255, 0, 255]);
}

#[test]
fn node_transforms_compose_down_the_tree() {
    let mut canvas = test_canvas(64, 64);
    let root = canvas.scene().root();

    let group = canvas.scene_mut().add_node(root).unwrap();
    canvas
        .scene_mut()
        .set_transform(group, Transform::translate(32.0, 0.0))
        .unwrap();
    let inner = canvas.scene_mut().add_node(group).unwrap();
    canvas
        .scene_mut()
        .set_transform(inner, Transform::scale(2.0, 2.0))
        .unwrap();
    // 8x8 rect at the inner origin: scaled to 16x16, shifted to x=32.
    canvas
        .scene_mut()
        .add_visual(inner, rect(0.0, 0.0, 8.0, 8.0, Color::WHITE))
        .unwrap();

    let image = canvas.render(None, None, None).unwrap();
    assert_eq!(image.pixel(40, 8), [255, 255, 255, 255]);
    assert_eq!(image.pixel(24, 8), [0, 0, 0, 255]);
    assert_eq!(image.pixel(40, 24), [0, 0, 0, 255]);
}

#[test]
fn picking_resolves_overlap_by_draw_order() {
    let mut canvas = test_canvas(64, 64);
    let root = canvas.scene().root();

    let below = canvas
        .scene_mut()
        .add_visual(root, rect(0.0, 0.0, 48.0, 48.0, Color::rgb(1.0, 0.0, 0.0)))
        .unwrap();
    let above = canvas
        .scene_mut()
        .add_visual(root, rect(16.0, 16.0, 48.0, 48.0, Color::rgb(0.0, 1.0, 0.0)))
        .unwrap();

    // Overlap region: the later sibling wins.
    assert_eq!(canvas.visual_at((32.0, 32.0)), Some(above));
    assert_eq!(canvas.visual_at((8.0, 8.0)), Some(below));
    assert_eq!(canvas.visual_at((60.0, 4.0)), None);
}

#[test]
fn picking_ignores_hidden_visuals() {
    let mut canvas = test_canvas(32, 32);
    let root = canvas.scene().root();
    let node = canvas
        .scene_mut()
        .add_visual(root, rect(0.0, 0.0, 32.0, 32.0, Color::WHITE))
        .unwrap();
    assert!(canvas.visual_at((16.0, 16.0)).is_some());
    canvas.scene_mut().set_visible(node, false).unwrap();
    assert_eq!(canvas.visual_at((16.0, 16.0)), None);
}

#[test]
fn pick_identity_survives_removal_of_siblings() {
    let mut canvas = test_canvas(32, 32);
    let root = canvas.scene().root();
    let doomed = canvas
        .scene_mut()
        .add_visual(root, rect(0.0, 0.0, 8.0, 8.0, Color::WHITE))
        .unwrap();
    let kept = canvas
        .scene_mut()
        .add_visual(root, rect(16.0, 16.0, 8.0, 8.0, Color::WHITE))
        .unwrap();

    canvas.scene_mut().remove(doomed).unwrap();
    assert_eq!(canvas.visual_at((20.0, 20.0)), Some(kept));
    assert_eq!(canvas.visual_at((4.0, 4.0)), None);
}

#[test]
fn region_render_scales_to_requested_size() {
    let mut canvas = test_canvas(64, 64);
    let root = canvas.scene().root();
    canvas
        .scene_mut()
        .add_visual(root, rect(0.0, 0.0, 32.0, 64.0, Color::WHITE))
        .unwrap();

    // Zoom into the boundary region; doubled resolution.
    let image = canvas
        .render(Some(Rect::new(16.0, 16.0, 32.0, 32.0)), Some((64, 64)), None)
        .unwrap();
    assert_eq!((image.width, image.height), (64, 64));
    // Canvas x=16..32 is covered geometry and lands in the left half.
    assert_eq!(image.pixel(8, 32), [255, 255, 255, 255]);
    assert_eq!(image.pixel(56, 32), [0, 0, 0, 255]);
}

#[test]
fn view_tracks_source_geometry_but_not_its_transform() {
    let mut canvas = test_canvas(64, 64);
    let root = canvas.scene().root();

    let source = Visual::new(
        MeshContent::rect(0.0, 0.0, 16.0, 16.0, Color::WHITE),
        DrawMode::Triangles,
    );
    let view = source.view();

    canvas.scene_mut().add_visual(root, Box::new(source)).unwrap();
    let mirror = canvas.scene_mut().add_node(root).unwrap();
    canvas
        .scene_mut()
        .set_transform(mirror, Transform::translate(40.0, 40.0))
        .unwrap();
    canvas.scene_mut().add_visual(mirror, view).unwrap();

    let image = canvas.render(None, None, None).unwrap();
    // Source at the origin, view at the offset: same geometry, two places.
    assert_eq!(image.pixel(8, 8), [255, 255, 255, 255]);
    assert_eq!(image.pixel(48, 48), [255, 255, 255, 255]);
}

#[test]
fn view_of_removed_source_draws_nothing() {
    let mut canvas = test_canvas(32, 32);
    let root = canvas.scene().root();

    let source = Visual::new(
        MeshContent::rect(0.0, 0.0, 32.0, 32.0, Color::WHITE),
        DrawMode::Triangles,
    );
    let view = source.view();
    let source_node = canvas.scene_mut().add_visual(root, Box::new(source)).unwrap();
    canvas.scene_mut().add_visual(root, view).unwrap();

    // Dropping the source node drops the owning visual; the view's weak
    // reference dies with it. The frame still renders cleanly.
    canvas.scene_mut().remove(source_node).unwrap();
    let image = canvas.render(None, None, None).unwrap();
    assert_eq!(image.pixel(16, 16), [0, 0, 0, 255]);
}

#[test]
fn compound_visual_draws_and_bounds_union() {
    let mut canvas = test_canvas(64, 64);
    let root = canvas.scene().root();

    let mut compound = CompoundVisual::new();
    compound.add(rect(0.0, 0.0, 8.0, 8.0, Color::rgb(1.0, 0.0, 0.0)));
    let second = compound.add(rect(24.0, 24.0, 8.0, 8.0, Color::rgb(0.0, 1.0, 0.0)));
    assert_eq!(compound.bounds(Axis::X), Some((0.0, 32.0)));

    compound.set_sub_visible(second, false);
    assert_eq!(compound.bounds(Axis::X), Some((0.0, 8.0)));
    compound.set_sub_visible(second, true);

    canvas.scene_mut().add_visual(root, Box::new(compound)).unwrap();
    let image = canvas.render(None, None, None).unwrap();
    assert_eq!(image.pixel(4, 4), [255, 0, 0, 255]);
    assert_eq!(image.pixel(28, 28), [0, 255, 0, 255]);
}

#[test]
fn bad_index_buffer_surfaces_a_draw_error() {
    let mut canvas = test_canvas(16, 16);
    let root = canvas.scene().root();
    // Index 7 over 3 vertices: the draw pass must fail with a descriptive
    // error, not abort.
    canvas
        .scene_mut()
        .add_visual(
            root,
            Box::new(Visual::new(
                MeshContent::indexed(
                    vec![[0.0, 0.0], [8.0, 0.0], [0.0, 8.0]],
                    vec![0, 1, 7],
                    Color::WHITE,
                ),
                DrawMode::Triangles,
            )),
        )
        .unwrap();
    assert!(matches!(canvas.draw(), Err(SceneError::Draw(_))));
    // The offscreen path unwinds cleanly too.
    assert!(matches!(
        canvas.render(None, None, None),
        Err(SceneError::Draw(_))
    ));
}

#[test]
fn mouse_drag_routes_to_pressed_node() {
    let mut canvas = test_canvas(64, 64);
    let root = canvas.scene().root();
    let left = canvas
        .scene_mut()
        .add_visual(root, rect(0.0, 0.0, 32.0, 64.0, Color::WHITE))
        .unwrap();
    let right = canvas
        .scene_mut()
        .add_visual(root, rect(32.0, 0.0, 32.0, 64.0, Color::WHITE))
        .unwrap();

    use std::cell::RefCell;
    use std::rc::Rc;
    let hits: Rc<RefCell<Vec<(&'static str, MouseEventKind)>>> =
        Rc::new(RefCell::new(Vec::new()));
    for (name, node) in [("left", left), ("right", right)] {
        let sink = Rc::clone(&hits);
        canvas
            .scene_mut()
            .set_mouse_handler(node, move |ev| {
                sink.borrow_mut().push((name, ev.kind));
                ev.handled = true;
            })
            .unwrap();
    }

    assert!(canvas.mouse_press((16.0, 32.0), MouseButton::Left));
    // Drag across to the right visual: capture keeps routing left.
    assert!(canvas.mouse_move((48.0, 32.0)));
    assert!(canvas.mouse_release((48.0, 32.0), MouseButton::Left));
    // After release, nothing is latched and hover motion is dropped.
    assert!(!canvas.mouse_move((48.0, 32.0)));

    let hits = hits.borrow();
    let names: Vec<&str> = hits.iter().map(|(n, _)| *n).collect();
    assert_eq!(names, ["left", "left", "left"]);
}

#[test]
fn high_dpi_canvas_renders_at_physical_resolution() {
    let mut canvas = Canvas::new(
        CanvasConfig::new().with_size(32, 32).with_px_scale(2.0),
        Box::new(SoftwareBackend::new(64, 64)),
    );
    assert_eq!(canvas.physical_size(), (64, 64));
    let root = canvas.scene().root();
    // Logical 16x16 rect fills a quarter of the canvas regardless of scale.
    canvas
        .scene_mut()
        .add_visual(root, rect(0.0, 0.0, 16.0, 16.0, Color::WHITE))
        .unwrap();
    let image = canvas.render(None, None, None).unwrap();
    assert_eq!((image.width, image.height), (64, 64));
    assert_eq!(image.pixel(16, 16), [255, 255, 255, 255]);
    assert_eq!(image.pixel(48, 48), [0, 0, 0, 255]);
}

#[test]
fn filters_propagate_from_source_to_scene_views() {
    let source = Visual::new(
        MeshContent::rect(0.0, 0.0, 8.0, 8.0, Color::WHITE),
        DrawMode::Triangles,
    );
    let mut view = source.view();
    let mut source: Box<dyn VisualObject> = Box::new(source);

    source.attach(Filter::new(
        "dim",
        ShaderStage::Fragment,
        HookPosition::Post,
        "color.rgb *= 0.5;",
    ));
    // The view received the shared filter and can detach its own copy.
    assert!(view.detach("dim").is_ok());
    assert!(view.detach("dim").is_err());
    assert!(source.detach("dim").is_ok());
    assert!(source.detach("dim").is_err());
}
