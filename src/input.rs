//! Touch and mouse input feeding the gesture interpreter.
//!
//! Touches are used when present; otherwise a held left mouse button acts as
//! a single finger. Window coordinates are mapped into canvas space using
//! the rectangle the canvas panel published last frame.

use bevy::input::touch::Touches;
use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use bevy_egui::{egui, EguiContexts};

use crate::compositor::{CanvasLayout, EditingSession, GestureInterpreter};

/// Where the photo canvas sits in the window, in logical pixels.
///
/// The canvas is drawn at `display_scale` window pixels per canvas unit, so
/// the layout (and every stored overlay position) survives window resizes.
#[derive(Resource, Debug, Clone)]
pub struct CanvasRect {
    pub origin: Vec2,
    pub display_scale: f32,
    pub layout: CanvasLayout,
    /// Controls drawn on top of the canvas (delete buttons), in window pixels.
    pub blocked: Vec<Rect>,
}

impl Default for CanvasRect {
    fn default() -> Self {
        Self {
            origin: Vec2::ZERO,
            display_scale: 1.0,
            layout: CanvasLayout::UNMEASURED,
            blocked: Vec::new(),
        }
    }
}

impl CanvasRect {
    pub fn to_canvas(&self, window_point: Vec2) -> Vec2 {
        let offset = window_point - self.origin;
        if self.display_scale > 0.0 {
            offset / self.display_scale
        } else {
            offset
        }
    }

    pub fn to_window(&self, canvas_point: Vec2) -> Vec2 {
        self.origin + canvas_point * self.display_scale
    }

    /// Window-space rectangle covered by the canvas.
    pub fn window_rect(&self) -> Rect {
        Rect::from_corners(self.origin, self.to_window(self.layout.size()))
    }

    /// Whether a press at `window_point` may start a gesture: it has to land
    /// on the measured canvas and miss the controls drawn over it.
    pub fn accepts_press(&self, window_point: Vec2) -> bool {
        self.layout.is_measured()
            && self.window_rect().contains(window_point)
            && !self.blocked.iter().any(|rect| rect.contains(window_point))
    }
}

pub struct GestureInputPlugin;

impl Plugin for GestureInputPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CanvasRect>()
            .add_systems(Update, gesture_input_system);
    }
}

/// Apply one frame of pointer samples (canvas space) to the active gesture.
///
/// `pressed_now` is true on the frame a finger or button went down; only then
/// can a new gesture start on the overlay under the first point.
pub fn drive_gesture(
    session: &mut EditingSession,
    interpreter: &mut GestureInterpreter,
    points: &[Vec2],
    pressed_now: bool,
) {
    if !session.is_editing() {
        if interpreter.is_active() {
            interpreter.cancel();
        }
        return;
    }

    if points.is_empty() {
        if let Some(id) = interpreter.release(session.registry_mut()) {
            debug!("Gesture on {} committed", id);
        }
        return;
    }

    if !interpreter.is_active() {
        if !pressed_now {
            return;
        }
        let Some(instance) = session
            .registry()
            .hit_test(points[0])
            .and_then(|id| session.registry().get(id))
        else {
            return;
        };
        interpreter.begin(instance);
    }

    interpreter.update(points, session.layout());
}

/// True when a floating egui window (notices, dialogs) covers the point.
/// Panels, the canvas included, live on the background layer and never count.
fn is_point_under_window(contexts: &mut EguiContexts, window_point: Vec2) -> bool {
    contexts
        .ctx_mut()
        .ok()
        .and_then(|ctx| ctx.layer_id_at(egui::pos2(window_point.x, window_point.y)))
        .is_some_and(|layer| matches!(layer.order, egui::Order::Middle | egui::Order::Foreground))
}

/// Gate a fresh press: it starts a gesture only on the bare canvas.
pub fn press_reaches_canvas(canvas: &CanvasRect, window_point: Vec2, under_window: bool) -> bool {
    !under_window && canvas.accepts_press(window_point)
}

fn gesture_input_system(
    mut contexts: EguiContexts,
    touches: Res<Touches>,
    mouse_button: Res<ButtonInput<MouseButton>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    canvas: Res<CanvasRect>,
    mut session: ResMut<EditingSession>,
    mut interpreter: ResMut<GestureInterpreter>,
) {
    let mut points: Vec<Vec2> = touches.iter().map(|touch| touch.position()).collect();
    let mut pressed_now = touches.any_just_pressed();

    if points.is_empty()
        && mouse_button.pressed(MouseButton::Left)
        && let Ok(window) = windows.single()
        && let Some(cursor) = window.cursor_position()
    {
        points.push(cursor);
        pressed_now = mouse_button.just_pressed(MouseButton::Left);
    }

    // Nothing to do for a hovering pointer with no gesture in flight.
    if points.is_empty() && !interpreter.is_active() {
        return;
    }

    if pressed_now && let Some(&first) = points.first() {
        let under_window = is_point_under_window(&mut contexts, first);
        pressed_now = press_reaches_canvas(&canvas, first, under_window);
    }

    let points: Vec<Vec2> = points.into_iter().map(|p| canvas.to_canvas(p)).collect();
    drive_gesture(&mut session, &mut interpreter, &points, pressed_now);
}
