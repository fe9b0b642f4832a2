// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pixel-level tests driving a full stage into a [`Pixmap`].

use std::rc::Rc;

use kurbo::{Point, Rect};

use strata_core::event::{InputEvent, ItemEvent, PointerButton, handler};
use strata_core::stage::{Background, Stage};
use strata_core::surface::{Rgba, Surface};
use strata_core::time::Instant;

use crate::Pixmap;

const BG: Rgba = Rgba::opaque(10, 20, 30);

fn stage() -> Stage<Pixmap> {
    Stage::new(100, 80, Background::Color(BG))
}

fn render(stage: &mut Stage<Pixmap>, target: &mut Pixmap, at: u64) -> Vec<Rect> {
    stage.render(target, Instant(at))
}

#[test]
fn background_and_item_pixels_land_where_expected() {
    let mut s = stage();
    let layer = s.scene.create_layer();
    s.add_layer(layer, None);
    let item = s
        .scene
        .create_fill(Rect::new(10.0, 10.0, 20.0, 20.0), Some(Rgba::WHITE), None);
    s.add_item(layer, item);

    let mut target = Pixmap::create(100, 80);
    let _ = render(&mut s, &mut target, 0);

    assert_eq!(target.pixel(0, 0), BG);
    assert_eq!(target.pixel(15, 15), Rgba::WHITE);
    assert_eq!(target.pixel(25, 25), BG);
}

#[test]
fn moving_an_item_erases_its_old_pixels() {
    let mut s = stage();
    let layer = s.scene.create_layer();
    s.add_layer(layer, None);
    let item = s
        .scene
        .create_fill(Rect::new(10.0, 10.0, 20.0, 20.0), Some(Rgba::WHITE), None);
    s.add_item(layer, item);

    let mut target = Pixmap::create(100, 80);
    let _ = render(&mut s, &mut target, 0);
    s.scene.set_pos(item, Point::new(40.0, 10.0));
    let _ = render(&mut s, &mut target, 16);

    assert_eq!(target.pixel(15, 15), BG, "vacated area shows the background");
    assert_eq!(target.pixel(45, 15), Rgba::WHITE);
}

#[test]
fn half_alpha_layer_blends_over_the_background() {
    let mut s = stage();
    let layer = s.scene.create_layer();
    s.add_layer(layer, None);
    let item = s
        .scene
        .create_fill(Rect::new(0.0, 0.0, 50.0, 40.0), Some(Rgba::WHITE), None);
    s.add_item(layer, item);
    s.scene.set_layer_alpha(layer, 128);

    let mut target = Pixmap::create(100, 80);
    let _ = render(&mut s, &mut target, 0);

    let blended = target.pixel(10, 10);
    assert!(
        blended.r > BG.r && blended.r < 255,
        "half-alpha white blends with the background, got {blended:?}"
    );
    assert_eq!(target.pixel(60, 10), BG, "outside the layer stays untouched");
}

#[test]
fn layer_clip_confines_painting() {
    let mut s = stage();
    let layer = s.scene.create_layer();
    s.add_layer(layer, None);
    let item = s
        .scene
        .create_fill(Rect::new(0.0, 0.0, 100.0, 80.0), Some(Rgba::WHITE), None);
    s.add_item(layer, item);
    s.scene.set_layer_clip(layer, Some(Rect::new(20.0, 20.0, 40.0, 40.0)));

    let mut target = Pixmap::create(100, 80);
    let _ = render(&mut s, &mut target, 0);

    assert_eq!(target.pixel(30, 30), Rgba::WHITE);
    assert_eq!(target.pixel(10, 10), BG, "clipped-out pixels are background");
    assert_eq!(target.pixel(50, 50), BG);
}

#[test]
fn image_items_hit_only_on_opaque_pixels() {
    let mut s = stage();
    let layer = s.scene.create_layer();
    s.add_layer(layer, None);

    // Left half opaque red, right half transparent.
    let mut image = Pixmap::create(20, 20);
    image.fill(Rgba::opaque(200, 0, 0), Rect::new(0.0, 0.0, 10.0, 20.0));
    let item = s.scene.create_image(Point::new(10.0, 10.0), Rc::new(image));
    s.add_item(layer, item);

    let hits = Rc::new(std::cell::RefCell::new(0));
    let hits2 = hits.clone();
    s.scene.add_handler(
        item,
        ItemEvent::Press,
        handler(move |_, _, _| {
            *hits2.borrow_mut() += 1;
            true
        }),
    );

    let mut target = Pixmap::create(100, 80);
    let _ = render(&mut s, &mut target, 0);

    s.dispatch(InputEvent::ButtonDown {
        x: 15.0,
        y: 15.0,
        button: PointerButton::Primary,
    });
    assert_eq!(*hits.borrow(), 1, "opaque half hits");

    s.dispatch(InputEvent::ButtonUp {
        x: 15.0,
        y: 15.0,
        button: PointerButton::Primary,
    });
    s.dispatch(InputEvent::ButtonDown {
        x: 25.0,
        y: 15.0,
        button: PointerButton::Primary,
    });
    assert_eq!(*hits.borrow(), 1, "transparent half misses");
}

#[test]
fn prerender_output_matches_direct_compositing() {
    let build = |prerender: bool| -> Pixmap {
        let mut s = stage();
        let below = s.scene.create_layer();
        let above = s.scene.create_layer();
        s.add_layer(below, None);
        s.add_layer(above, None);
        let floor = s
            .scene
            .create_fill(Rect::new(0.0, 0.0, 100.0, 80.0), Some(Rgba::opaque(0, 80, 0)), None);
        s.add_item(below, floor);
        let actor = s
            .scene
            .create_fill(Rect::new(30.0, 30.0, 40.0, 40.0), Some(Rgba::WHITE), None);
        s.add_item(above, actor);
        if prerender {
            s.set_prerender_boundary(Some(below));
        }

        let mut target = Pixmap::create(100, 80);
        let _ = render(&mut s, &mut target, 0);
        // Move the actor; only the above-boundary layer changes.
        s.scene.set_pos(actor, Point::new(50.0, 30.0));
        let _ = render(&mut s, &mut target, 16);
        target
    };

    let direct = build(false);
    let buffered = build(true);
    assert_eq!(
        direct, buffered,
        "the pre-render buffer must be visually transparent"
    );
}

#[test]
fn present_rects_cover_every_changed_pixel() {
    let mut s = stage();
    let layer = s.scene.create_layer();
    s.add_layer(layer, None);
    let item = s
        .scene
        .create_fill(Rect::new(5.0, 5.0, 15.0, 15.0), Some(Rgba::WHITE), None);
    s.add_item(layer, item);

    let mut target = Pixmap::create(100, 80);
    let _ = render(&mut s, &mut target, 0);
    let before = target.clone();

    s.scene.set_pos(item, Point::new(70.0, 60.0));
    let rects = render(&mut s, &mut target, 16);

    for y in 0..80_i64 {
        for x in 0..100_i64 {
            if before.pixel(x, y) != target.pixel(x, y) {
                let p = Point::new(x as f64 + 0.5, y as f64 + 0.5);
                assert!(
                    rects.iter().any(|r| r.contains(p)),
                    "changed pixel ({x}, {y}) not covered by {rects:?}"
                );
            }
        }
    }
}
