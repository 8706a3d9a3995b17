//! Renders a small scene headless and writes it to scene_demo.png.
//!
//! Run with `cargo run --example scene_demo`. Set RUST_LOG=debug to watch
//! the canvas work.

use scenic::prelude::*;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut canvas = Canvas::new(
        CanvasConfig::new()
            .with_size(320, 240)
            .with_title("scene demo")
            .with_background(Color::from_hex(0x202030)),
        Box::new(SoftwareBackend::new(320, 240)),
    );

    let root = canvas.scene().root();

    // A panel with two shapes, then a half-size view of the same panel in
    // the opposite corner. The view shares the panel's geometry.
    let panel = canvas.scene_mut().add_node(root)?;
    canvas.scene_mut().set_name(panel, "panel")?;
    canvas
        .scene_mut()
        .set_transform(panel, Transform::translate(20.0, 20.0))?;

    let body = Visual::new(
        MeshContent::rect(0.0, 0.0, 120.0, 80.0, Color::from_hex(0x4060c0)),
        DrawMode::Triangles,
    );
    let badge = Visual::new(
        MeshContent::new(
            vec![[10.0, 10.0], [40.0, 10.0], [10.0, 40.0]],
            Color::from_hex(0xc04040),
        ),
        DrawMode::Triangles,
    );

    let body_view = body.view();
    let badge_view = badge.view();

    canvas.scene_mut().add_visual(panel, Box::new(body))?;
    canvas.scene_mut().add_visual(panel, Box::new(badge))?;

    let mirror = canvas.scene_mut().add_node(root)?;
    canvas.scene_mut().set_name(mirror, "mirror")?;
    canvas.scene_mut().set_transform(
        mirror,
        Transform::translate(240.0, 180.0).then(&Transform::scale(0.5, 0.5)),
    )?;
    canvas.scene_mut().add_visual(mirror, body_view)?;
    canvas.scene_mut().add_visual(mirror, badge_view)?;

    log::info!("scene:\n{}", canvas.scene().describe_tree());

    let image = canvas.render(None, None, None)?;
    image::save_buffer(
        "scene_demo.png",
        &image.pixels,
        image.width,
        image.height,
        image::ColorType::Rgba8,
    )?;
    println!("wrote scene_demo.png ({}x{})", image.width, image.height);

    if let Some(node) = canvas.visual_at((60.0, 50.0)) {
        println!("picked node under (60, 50): {node:?}");
    }
    Ok(())
}
