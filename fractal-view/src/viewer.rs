//! Interactive fractal-tree viewer built with eframe/egui.
//!
//! This module defines [`Viewer`], which owns the animated fractal,
//! drives it with egui's frame clock, and implements the core's
//! renderer trait with a painter that orthographically projects the
//! per-instance matrices onto the screen.

use eframe::App;
use fractal_core::{
    color::Color,
    config::FractalConfig,
    emit::{DrawSubmission, InstanceBufferId, InstanceRenderer, RenderError},
    fractal::Fractal,
    tree::Anchor,
};
use glam::{Quat, Vec3};

/// One projected instance, ready to paint.
#[derive(Clone, Copy, Debug)]
struct Dot {
    world: Vec3,
    scale: f32,
    color: egui::Color32,
}

/// Painter-backed implementation of the core's renderer trait.
///
/// "Buffers" are just recorded capacities; a draw projects each
/// instance matrix into a [`Dot`] that the viewer paints at the end of
/// the frame, which keeps the submission synchronous within the frame
/// exactly as the core assumes.
#[derive(Debug, Default)]
struct PainterRenderer {
    next_id: u32,
    buffers: Vec<(InstanceBufferId, usize)>,
    dots: Vec<Dot>,
}

impl PainterRenderer {
    fn capacity_of(&self, id: InstanceBufferId) -> Option<usize> {
        self.buffers
            .iter()
            .find(|(b, _)| *b == id)
            .map(|(_, len)| *len)
    }

    fn to_color32(c: Color) -> egui::Color32 {
        egui::Color32::from_rgba_unmultiplied(
            (c.r.clamp(0.0, 1.0) * 255.0) as u8,
            (c.g.clamp(0.0, 1.0) * 255.0) as u8,
            (c.b.clamp(0.0, 1.0) * 255.0) as u8,
            (c.a.clamp(0.0, 1.0) * 255.0) as u8,
        )
    }
}

impl InstanceRenderer for PainterRenderer {
    fn create_instance_buffer(&mut self, len: usize) -> Result<InstanceBufferId, RenderError> {
        let id = InstanceBufferId(self.next_id);
        self.next_id += 1;
        self.buffers.push((id, len));
        Ok(id)
    }

    fn release_instance_buffer(&mut self, buffer: InstanceBufferId) {
        self.buffers.retain(|(b, _)| *b != buffer);
    }

    fn draw_instanced(&mut self, submission: &DrawSubmission<'_>) -> Result<(), RenderError> {
        let Some(capacity) = self.capacity_of(submission.buffer) else {
            return Err(RenderError::Draw {
                instances: submission.matrices.len(),
                reason: "unknown instance buffer".into(),
            });
        };
        if submission.matrices.len() != capacity {
            return Err(RenderError::Draw {
                instances: submission.matrices.len(),
                reason: format!("buffer holds {capacity} instances"),
            });
        }

        let seed = submission.binding.seed;
        for (i, matrix) in submission.matrices.iter().enumerate() {
            // The seed vector plays the role the instancing shader
            // gives it: cheap per-instance variation of the tint.
            let t = (i as f32 * seed.x + seed.y).fract();
            let color = submission.binding.color_a.lerp(submission.binding.color_b, t);
            self.dots.push(Dot {
                world: Vec3::from(matrix.translation),
                scale: matrix.matrix3.x_axis.length(),
                color: Self::to_color32(color),
            });
        }
        Ok(())
    }
}

/// Main application state for the interactive viewer.
///
/// Owns the [`Fractal`], the painter renderer, the configuration being
/// edited, and the camera (zoom/pan). Changing a build-time parameter
/// marks the fractal dirty and the next frame rebuilds it from
/// scratch, mirroring how the original component reacted to inspector
/// edits.
pub struct Viewer {
    cfg: FractalConfig,
    fractal: Option<Fractal>,
    renderer: PainterRenderer,
    rng: rand::rngs::ThreadRng,

    anchor_scale: f32,
    anchor_yaw: f32,

    running: bool,
    needs_rebuild: bool,
    zoom: f32,
    pan: egui::Vec2,

    levels_drawn: usize,
    last_dt: f32,
    last_error: Option<String>,
}

impl Viewer {
    /// Builds the initial fractal from the default configuration.
    pub fn new() -> Self {
        let cfg = FractalConfig::default();
        let mut rng = rand::rng();
        let mut renderer = PainterRenderer::default();
        let fractal = match Fractal::build(&cfg, &mut rng, &mut renderer) {
            Ok(f) => Some(f),
            Err(err) => {
                log::error!("initial build failed: {err}");
                None
            }
        };

        Self {
            cfg,
            fractal,
            renderer,
            rng,
            anchor_scale: 1.0,
            anchor_yaw: 0.0,
            running: true,
            needs_rebuild: false,
            zoom: 90.0,
            pan: egui::vec2(0.0, 120.0),
            levels_drawn: 0,
            last_dt: 0.0,
            last_error: None,
        }
    }

    fn anchor(&self) -> Anchor {
        Anchor {
            position: Vec3::ZERO,
            orientation: Quat::from_rotation_y(self.anchor_yaw),
            scale: self.anchor_scale,
        }
    }

    /// Tears the current fractal down and rebuilds it from `cfg`.
    /// A rejected configuration leaves no fractal; the error is shown
    /// in the status bar until a valid rebuild succeeds.
    fn rebuild(&mut self) {
        self.needs_rebuild = false;
        if let Some(fractal) = self.fractal.take() {
            fractal.teardown(&mut self.renderer);
        }
        match Fractal::build(&self.cfg, &mut self.rng, &mut self.renderer) {
            Ok(f) => {
                self.fractal = Some(f);
                self.last_error = None;
            }
            Err(err) => {
                log::warn!("rebuild rejected: {err}");
                self.last_error = Some(err.to_string());
            }
        }
    }

    /// Advances the fractal by one frame and collects the projected
    /// instances into the renderer's dot list.
    fn step(&mut self, dt: f32) {
        self.renderer.dots.clear();
        let anchor = self.anchor();
        if let Some(fractal) = self.fractal.as_mut() {
            self.levels_drawn = fractal.step(&anchor, dt, &mut self.renderer);
            self.last_dt = dt;
        }
    }

    /// Orthographic projection: world X/Y to screen, Y up.
    fn world_to_screen(&self, p: Vec3, rect: egui::Rect) -> egui::Pos2 {
        let center = rect.center();
        egui::pos2(
            center.x + p.x * self.zoom + self.pan.x,
            center.y - p.y * self.zoom + self.pan.y,
        )
    }

    fn labeled_drag_f32(
        ui: &mut egui::Ui,
        label: &str,
        value: &mut f32,
        range: std::ops::RangeInclusive<f32>,
        speed: f64,
    ) -> bool {
        let mut changed = false;
        ui.horizontal(|ui| {
            ui.label(label);
            changed = ui
                .add(egui::DragValue::new(value).range(range).speed(speed))
                .changed();
        });
        changed
    }

    fn ui_top_panel(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui
                    .button(if self.running { "⏸ Pause" } else { "▶ Run" })
                    .clicked()
                {
                    self.running = !self.running;
                }

                if ui.button("Step").clicked() {
                    self.step(1.0 / 60.0);
                }

                if ui.button("Rebuild").clicked() {
                    self.needs_rebuild = true;
                }

                ui.separator();
                ui.add(egui::Slider::new(&mut self.zoom, 10.0..=400.0).text("Zoom"));
            });
        });
    }

    fn ui_status_bar(&self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.label(format!("dt = {:.3} s", self.last_dt));
                ui.separator();
                if let Some(fractal) = &self.fractal {
                    ui.label(format!("parts = {}", fractal.tree().total_parts()));
                    ui.label(format!(
                        "levels drawn = {}/{}",
                        self.levels_drawn,
                        fractal.tree().depth()
                    ));
                }
                if let Some(err) = &self.last_error {
                    ui.colored_label(egui::Color32::LIGHT_RED, err);
                }
            });
        });
    }

    fn ui_config_panel(&mut self, ctx: &egui::Context) {
        egui::SidePanel::right("config_panel")
            .resizable(true)
            .default_width(220.0)
            .show(ctx, |ui| {
                ui.heading("Build config");
                ui.label("(any change rebuilds the tree)");

                let mut changed = false;
                let mut depth = self.cfg.depth as u32;
                ui.horizontal(|ui| {
                    ui.label("depth:");
                    changed |= ui
                        .add(egui::DragValue::new(&mut depth).range(1..=8))
                        .changed();
                });
                self.cfg.depth = depth as usize;

                ui.separator();
                ui.label("Sag angle (degrees)");
                changed |=
                    Self::labeled_drag_f32(ui, "min:", &mut self.cfg.sag_angle.0, 0.0..=90.0, 0.5);
                changed |=
                    Self::labeled_drag_f32(ui, "max:", &mut self.cfg.sag_angle.1, 0.0..=90.0, 0.5);

                ui.separator();
                ui.label("Spin speed (degrees/s)");
                changed |= Self::labeled_drag_f32(
                    ui,
                    "min:",
                    &mut self.cfg.spin_speed.0,
                    0.0..=90.0,
                    0.5,
                );
                changed |= Self::labeled_drag_f32(
                    ui,
                    "max:",
                    &mut self.cfg.spin_speed.1,
                    0.0..=90.0,
                    0.5,
                );

                ui.separator();
                changed |= Self::labeled_drag_f32(
                    ui,
                    "reverse spin chance:",
                    &mut self.cfg.reverse_spin_chance,
                    0.0..=1.0,
                    0.01,
                );

                ui.separator();
                ui.label("Anchor");
                Self::labeled_drag_f32(ui, "scale:", &mut self.anchor_scale, 0.1..=5.0, 0.05);
                Self::labeled_drag_f32(ui, "yaw:", &mut self.anchor_yaw, -3.2..=3.2, 0.01);

                ui.separator();
                if ui.button("Reset cfg to default").clicked() {
                    self.cfg = FractalConfig::default();
                    changed = true;
                }

                if changed {
                    self.needs_rebuild = true;
                }
            });
    }

    fn ui_central_panel(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let response = ui.allocate_response(ui.available_size(), egui::Sense::drag());
            let rect = response.rect;
            let painter = ui.painter_at(rect);

            if response.dragged() {
                self.pan += response.drag_delta();
            }

            // Painter's algorithm: far instances first.
            let mut dots = self.renderer.dots.clone();
            dots.sort_by(|a, b| a.world.z.total_cmp(&b.world.z));
            for dot in &dots {
                let p = self.world_to_screen(dot.world, rect);
                let r = (dot.scale * self.zoom * 0.6).max(1.0);
                painter.circle_filled(p, r, dot.color);
            }

            if self.running {
                ctx.request_repaint();
            }
        });
    }
}

impl App for Viewer {
    /// eframe per-frame callback: applies pending rebuilds, steps the
    /// animation with the frame's delta time, then paints all panels.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.needs_rebuild {
            self.rebuild();
        }
        if self.running {
            // Clamp pathological hitches so the spin stays stable.
            let dt = ctx.input(|i| i.stable_dt).min(0.1);
            self.step(dt);
        }

        self.ui_top_panel(ctx);
        self.ui_status_bar(ctx);
        self.ui_config_panel(ctx);
        self.ui_central_panel(ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_rect() -> egui::Rect {
        egui::Rect::from_min_size(egui::Pos2::new(0.0, 0.0), egui::vec2(800.0, 600.0))
    }

    #[test]
    fn new_viewer_builds_a_fractal() {
        let viewer = Viewer::new();
        let fractal = viewer.fractal.as_ref().expect("initial build");
        assert_eq!(fractal.tree().depth(), viewer.cfg.depth);
        assert_eq!(viewer.renderer.buffers.len(), viewer.cfg.depth);
    }

    #[test]
    fn step_projects_one_dot_per_part() {
        let mut viewer = Viewer::new();
        viewer.step(0.016);
        let total = viewer.fractal.as_ref().unwrap().tree().total_parts();
        assert_eq!(viewer.renderer.dots.len(), total);
        assert_eq!(viewer.levels_drawn, viewer.cfg.depth);
    }

    #[test]
    fn invalid_depth_edit_keeps_the_error_visible() {
        let mut viewer = Viewer::new();
        viewer.cfg.depth = 0;
        viewer.needs_rebuild = true;
        viewer.rebuild();
        assert!(viewer.fractal.is_none());
        assert!(viewer.last_error.is_some());

        viewer.cfg.depth = 3;
        viewer.rebuild();
        assert!(viewer.fractal.is_some());
        assert!(viewer.last_error.is_none());
    }

    #[test]
    fn rebuild_tracks_new_depth() {
        let mut viewer = Viewer::new();
        viewer.cfg.depth = 6;
        viewer.rebuild();
        assert_eq!(viewer.fractal.as_ref().unwrap().tree().depth(), 6);
        assert_eq!(viewer.renderer.buffers.len(), 6);
    }

    #[test]
    fn world_to_screen_centers_the_origin() {
        let mut viewer = Viewer::new();
        viewer.pan = egui::vec2(0.0, 0.0);
        viewer.zoom = 100.0;
        let rect = test_rect();

        let origin = viewer.world_to_screen(Vec3::ZERO, rect);
        assert_eq!(origin, rect.center());

        // +Y in world space goes up on screen.
        let above = viewer.world_to_screen(Vec3::Y, rect);
        assert!(above.y < origin.y);
        assert_eq!(above.x, origin.x);
    }
}
