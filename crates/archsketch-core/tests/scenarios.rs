//! End-to-end canvas scenarios driven through pointer events.

use archsketch_core::blend::blend_pixel;
use archsketch_core::geometry::GuideLine;
use archsketch_core::guides::GuideKind;
use archsketch_core::surface::RasterSurface;
use archsketch_core::{
    BlendMode, Canvas, CanvasConfig, Direction, DropPosition, ItemKind, ItemUpdate, Key, PointerEvent, ToolKind,
};
use kurbo::{Point, Size, Vec2};

const RED: [u8; 4] = [255, 0, 0, 255];
const BLUE: [u8; 4] = [0, 0, 255, 255];
const GREEN: [u8; 4] = [0, 255, 0, 255];

/// Canvas whose only backdrop is an image, red on the left and blue on the right.
fn image_canvas(width: u32, height: u32) -> Canvas {
    let mut c = canvas(width, height);
    let mut image = RasterSurface::filled(width, height, BLUE).unwrap();
    for y in 0..height {
        for x in 0..width / 2 {
            image.put_pixel(x, y, RED);
        }
    }
    c.set_background_color(None);
    c.set_background_image(Some(image)).unwrap();
    c
}

fn canvas(width: u32, height: u32) -> Canvas {
    Canvas::new(CanvasConfig { canvas_width: width, canvas_height: height, ..Default::default() }).unwrap()
}

fn stroke(c: &mut Canvas, from: Point, to: Point) {
    c.pointer(&PointerEvent::down(from)).unwrap();
    c.pointer(&PointerEvent::moved(from.midpoint(to))).unwrap();
    c.pointer(&PointerEvent::moved(to)).unwrap();
    c.pointer(&PointerEvent::up(to)).unwrap();
}

#[test]
fn history_is_linear() {
    let mut c = canvas(120, 80);
    let initial = c.scene().clone();
    c.set_tool(ToolKind::Brush);
    for i in 0..4 {
        let y = 10.0 + 15.0 * i as f64;
        stroke(&mut c, Point::new(10.0, y), Point::new(100.0, y));
    }
    assert_eq!(c.history().len(), 5);
    let after_two = {
        assert!(c.undo());
        assert!(c.undo());
        c.scene().clone()
    };
    assert!(c.undo());
    assert!(c.undo());
    assert!(!c.undo());
    assert_eq!(c.scene(), &initial);

    // Redo back to two strokes, then branch.
    assert!(c.redo());
    assert!(c.redo());
    assert_eq!(c.scene(), &after_two);
    stroke(&mut c, Point::new(60.0, 5.0), Point::new(60.0, 75.0));
    assert!(!c.can_redo());
    assert_eq!(c.history().len(), 4);
}

#[test]
fn background_cannot_be_removed_or_moved() {
    let mut c = canvas(50, 50);
    let bg = c.scene().background_id();
    let layer = c.active_item().unwrap();
    let group = c.add_item(ItemKind::Group, None).unwrap();

    assert!(c.delete_item(bg).is_err());
    assert!(c.merge_up(bg).is_err());
    assert!(c.merge_down(bg).is_err());
    assert!(c.reorder(bg, group, DropPosition::Top).is_err());
    assert!(c.reorder(bg, group, DropPosition::Middle).is_err());
    let _ = c.reorder(layer, bg, DropPosition::Bottom);
    let _ = c.reorder(group, bg, DropPosition::Bottom);
    assert!(!c.can_move(bg, Direction::Up));

    let scene = c.scene();
    assert_eq!(scene.root().first(), Some(&bg));
    assert_eq!(scene.get(bg).unwrap().parent(), None);
    assert!(scene.check_invariants().is_ok());
}

#[test]
fn zero_area_shapes_are_discarded() {
    let mut c = canvas(200, 200);
    let before = c.scene().clone();
    for tool in [ToolKind::Rectangle, ToolKind::Line, ToolKind::Circle] {
        c.set_tool(tool);
        for _ in 0..2 {
            c.pointer(&PointerEvent::down(Point::new(100.0, 100.0))).unwrap();
            c.pointer(&PointerEvent::up(Point::new(100.0, 100.0))).unwrap();
        }
        assert!(!c.tools.is_active());
    }
    assert!(!c.can_undo());
    assert_eq!(c.scene(), &before);
}

#[test]
fn rectangle_draw() {
    let mut c = canvas(800, 600);
    c.set_tool(ToolKind::Rectangle);
    c.pointer(&PointerEvent::down(Point::new(100.0, 100.0))).unwrap();
    c.pointer(&PointerEvent::up(Point::new(300.0, 250.0))).unwrap();

    assert_eq!(c.history().len(), 2);
    let bounds = c.content_bounding_box(c.active_item().unwrap()).unwrap().unwrap();
    let slack = c.tools.options.brush.radius().ceil() as u32 + 1;
    assert!(bounds.x <= 100 && 100 - bounds.x <= slack);
    assert!(bounds.y <= 100 && 100 - bounds.y <= slack);
    assert!(bounds.width >= 200 && bounds.width - 200 <= 2 * slack);
    assert!(bounds.height >= 150 && bounds.height - 150 <= 2 * slack);
}

#[test]
fn perspective_lock_follows_red_axis() {
    let mut c = canvas(800, 600);
    c.toggle_guide(GuideKind::Perspective);
    {
        let guide = c.document.guides.perspective.as_mut().unwrap();
        guide.lines.red = [
            GuideLine::new(Point::new(0.0, 250.0), Point::new(500.0, 275.0)),
            GuideLine::new(Point::new(0.0, 350.0), Point::new(500.0, 325.0)),
        ];
    }
    c.tools.options.constrain.stroke_lock = true;
    c.set_tool(ToolKind::Pencil);

    let start = Point::new(200.0, 200.0);
    let vp = Point::new(1000.0, 300.0);
    c.pointer(&PointerEvent::down(start)).unwrap();
    c.pointer(&PointerEvent::moved(Point::new(850.0, 280.0))).unwrap();

    let path = c.tools.freehand.path().to_vec();
    let end = *path.last().unwrap();
    assert_ne!(end, start);
    let along: Vec2 = vp - start;
    let offset: Vec2 = end - start;
    assert!(along.cross(offset).abs() / along.hypot() < 1e-6);
    c.pointer(&PointerEvent::up(Point::new(850.0, 280.0))).unwrap();
    assert_eq!(c.history().len(), 2);
}

#[test]
fn merge_down_flattens_at_item_opacity() {
    let mut c = canvas(100, 100);
    let b = c.active_item().unwrap();
    let a = c.add_item(ItemKind::Object, None).unwrap();
    let (b_px, a_px) = ([0, 0, 255, 255], [255, 0, 0, 255]);
    c.document.scene.surface_mut(b).unwrap().fill(b_px);
    c.document.scene.surface_mut(a).unwrap().fill(a_px);
    c.update_item(a, ItemUpdate::default().opacity(0.5).blend_mode(BlendMode::Normal)).unwrap();

    let survivor = c.merge_down(a).unwrap();
    assert_eq!(survivor, b);
    assert!(!c.scene().contains(a));
    let objects: Vec<_> = c
        .scene()
        .paint_order()
        .into_iter()
        .filter(|id| *id != c.scene().background_id())
        .collect();
    assert_eq!(objects, vec![b]);
    let expected = blend_pixel(b_px, a_px, BlendMode::Normal, 0.5);
    let surface = c.scene().surface(b).unwrap();
    assert_eq!(surface.pixel(0, 0), expected);
    assert_eq!(surface.pixel(99, 99), expected);
    assert_eq!(c.active_item(), Some(b));
}

#[test]
fn background_image_follows_canvas_crop() {
    let mut c = image_canvas(100, 100);
    c.set_tool(ToolKind::Crop);
    c.pointer(&PointerEvent::down(Point::new(0.0, 0.0))).unwrap();
    c.pointer(&PointerEvent::moved(Point::new(50.0, 0.0))).unwrap();
    c.pointer(&PointerEvent::up(Point::new(50.0, 0.0))).unwrap();
    c.key(Key::Enter).unwrap();

    assert_eq!(c.scene().dimensions(), (50, 100));
    let out = c.composite().unwrap();
    assert_eq!(out.pixel(10, 50), BLUE);
    assert_eq!(out.pixel(49, 50), BLUE);
    assert!(c.undo());
    assert_eq!(c.composite().unwrap().pixel(10, 50), RED);
}

#[test]
fn background_image_is_anchored_on_resize() {
    let mut c = image_canvas(100, 100);
    c.resize_canvas(Size::new(200.0, 100.0), false).unwrap();
    let out = c.composite().unwrap();
    assert_eq!(out.pixel(20, 50), RED);
    assert_eq!(out.pixel(80, 50), BLUE);
    assert_eq!(out.pixel(150, 50), [0, 0, 0, 0]);
}

#[test]
fn background_image_survives_save_and_load() {
    let mut c = image_canvas(60, 40);
    c.resize_canvas(Size::new(80.0, 40.0), false).unwrap();
    let expected = c.composite().unwrap();
    let project = c.to_project().unwrap();

    let mut other = canvas(10, 10);
    other.load_project(&project).unwrap();
    assert_eq!(other.scene().dimensions(), (80, 40));
    assert_eq!(other.composite().unwrap(), expected);
    assert_eq!(other.composite().unwrap().pixel(70, 20), [0, 0, 0, 0]);
}

#[test]
fn merge_down_into_background_keeps_image() {
    let mut c = image_canvas(100, 100);
    let layer = c.active_item().unwrap();
    {
        let surface = c.document.scene.surface_mut(layer).unwrap();
        for y in 0..100 {
            for x in 0..10 {
                surface.put_pixel(x, y, GREEN);
            }
        }
    }
    let bg = c.scene().background_id();
    assert_eq!(c.merge_down(layer).unwrap(), bg);
    assert!(!c.scene().contains(layer));
    assert!(c.scene().background().unwrap().background_image.is_some());

    let out = c.composite().unwrap();
    assert_eq!(out.pixel(5, 50), GREEN);
    assert_eq!(out.pixel(30, 50), RED);
    assert_eq!(out.pixel(80, 50), BLUE);
}
