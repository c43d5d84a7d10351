use glam::IVec2;
use winit::window::Window;

use crate::pet::{PET_SIZE, PetState, SPRITE_ANCHOR};
use crate::render::GpuState;
use crate::sprite;

/// In-window UI powered by egui: the pet sprite, the speech bubble, and the
/// settings panel. All of it renders into the transparent overlay surface.
pub struct PetUi {
    pub egui_ctx: egui::Context,
    pub egui_state: egui_winit::State,
    pub egui_renderer: egui_wgpu::Renderer,

    /// Set by the app each frame before `run_frame`.
    pub pet_state: PetState,
    pub bubble_text: Option<String>,

    /// Settings panel controls.
    pub settings_open: bool,
    pub name_buffer: String,
    pub follow_checkbox: bool,
    /// Save was clicked this frame; the app reads and clears it.
    pub settings_saved: bool,
}

impl PetUi {
    pub fn new(window: &Window, gpu: &GpuState) -> Self {
        let egui_ctx = egui::Context::default();

        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
            Some(gpu.device.limits().max_texture_dimension_2d as usize),
        );

        let egui_renderer = egui_wgpu::Renderer::new(
            &gpu.device,
            gpu.surface_config.format,
            egui_wgpu::RendererOptions {
                depth_stencil_format: None,
                msaa_samples: 1,
                dithering: true,
                predictable_texture_filtering: false,
            },
        );

        Self {
            egui_ctx,
            egui_state,
            egui_renderer,
            pet_state: PetState::Normal,
            bubble_text: None,
            settings_open: false,
            name_buffer: String::new(),
            follow_checkbox: false,
            settings_saved: false,
        }
    }

    /// Open the settings panel seeded with the current values.
    pub fn open_settings(&mut self, user_name: &str, follow_enabled: bool) {
        self.name_buffer = user_name.to_string();
        self.follow_checkbox = follow_enabled;
        self.settings_open = true;
    }

    /// Forward a winit event to egui. Returns true if egui consumed it.
    pub fn on_window_event(
        &mut self,
        window: &Window,
        event: &winit::event::WindowEvent,
    ) -> bool {
        let response = self.egui_state.on_window_event(window, event);
        response.consumed
    }

    /// Run the egui frame and produce paint output.
    /// Returns (clipped_primitives, textures_delta, screen_descriptor).
    pub fn run_frame(
        &mut self,
        window: &Window,
        screen_w: u32,
        screen_h: u32,
    ) -> (
        Vec<egui::epaint::ClippedPrimitive>,
        egui::TexturesDelta,
        egui_wgpu::ScreenDescriptor,
    ) {
        let raw_input = self.egui_state.take_egui_input(window);

        // Snapshot read-only state for UI drawing (avoids borrow conflict
        // between egui_ctx.run() borrowing self and the closure borrowing self).
        let ui_state = UiSnapshot {
            pet_state: self.pet_state,
            bubble_text: self.bubble_text.clone(),
        };

        // Mutable controls — read from self, written back after run().
        let mut settings_open = self.settings_open;
        let mut name_buffer = std::mem::take(&mut self.name_buffer);
        let mut follow_checkbox = self.follow_checkbox;
        let mut save_clicked = false;

        let ctx = self.egui_ctx.clone();
        let full_output = ctx.run(raw_input, |ctx| {
            draw_ui(
                ctx,
                &ui_state,
                &mut settings_open,
                &mut name_buffer,
                &mut follow_checkbox,
                &mut save_clicked,
            );
        });

        // Write back mutable controls.
        self.settings_open = settings_open;
        self.name_buffer = name_buffer;
        self.follow_checkbox = follow_checkbox;
        if save_clicked {
            self.settings_saved = true;
            self.settings_open = false;
        }

        self.egui_state
            .handle_platform_output(window, full_output.platform_output);

        let pixels_per_point = full_output.pixels_per_point;
        let clipped_primitives = self.egui_ctx.tessellate(full_output.shapes, pixels_per_point);

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [screen_w, screen_h],
            pixels_per_point,
        };

        (clipped_primitives, full_output.textures_delta, screen_descriptor)
    }

    /// Upload egui textures and buffers. Call before the egui render pass.
    pub fn prepare_egui(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        primitives: &[egui::epaint::ClippedPrimitive],
        textures_delta: &egui::TexturesDelta,
        screen_descriptor: &egui_wgpu::ScreenDescriptor,
    ) -> Vec<wgpu::CommandBuffer> {
        for (id, image_delta) in &textures_delta.set {
            self.egui_renderer
                .update_texture(device, queue, *id, image_delta);
        }

        self.egui_renderer
            .update_buffers(device, queue, encoder, primitives, screen_descriptor)
    }

    /// Render egui into the given render pass.
    pub fn render_egui(
        &self,
        render_pass: &mut wgpu::RenderPass<'static>,
        primitives: &[egui::epaint::ClippedPrimitive],
        screen_descriptor: &egui_wgpu::ScreenDescriptor,
    ) {
        self.egui_renderer
            .render(render_pass, primitives, screen_descriptor);
    }

    /// Free textures after present.
    pub fn free_textures(&mut self, textures_delta: &egui::TexturesDelta) {
        for &id in &textures_delta.free {
            self.egui_renderer.free_texture(&id);
        }
    }
}

// ---------------------------------------------------------------------------
// UI snapshot + free-function draw (avoids borrow conflicts with egui_ctx)
// ---------------------------------------------------------------------------

struct UiSnapshot {
    pet_state: PetState,
    bubble_text: Option<String>,
}

fn draw_ui(
    ctx: &egui::Context,
    s: &UiSnapshot,
    settings_open: &mut bool,
    name_buffer: &mut String,
    follow_checkbox: &mut bool,
    save_clicked: &mut bool,
) {
    // The sprite goes on the background layer so windows stack above it.
    // Window coordinates are physical pixels; egui works in points.
    let ppp = ctx.pixels_per_point();
    let center_px = SPRITE_ANCHOR + IVec2::splat(PET_SIZE / 2);
    let center = egui::pos2(center_px.x as f32 / ppp, center_px.y as f32 / ppp);
    let size = PET_SIZE as f32 / ppp;

    let painter = ctx.layer_painter(egui::LayerId::background());
    sprite::draw_pet(&painter, center, size, s.pet_state);

    if let Some(text) = &s.bubble_text {
        let bubble_frame = egui::Frame::NONE
            .fill(egui::Color32::from_rgba_unmultiplied(255, 255, 255, 235))
            .corner_radius(10.0)
            .inner_margin(8.0);

        let sprite_top = center.y - size * 0.5;
        egui::Window::new("bubble")
            .title_bar(false)
            .resizable(false)
            .interactable(false)
            .fixed_pos([center.x - 70.0, (sprite_top - 48.0).max(4.0)])
            .frame(bubble_frame)
            .show(ctx, |ui| {
                ui.label(
                    egui::RichText::new(text)
                        .size(14.0)
                        .color(egui::Color32::from_gray(40)),
                );
            });
    }

    if *settings_open {
        let panel_frame = egui::Frame::NONE
            .fill(egui::Color32::from_rgba_unmultiplied(20, 20, 20, 220))
            .corner_radius(6.0)
            .inner_margin(10.0);

        let mut still_open = true;
        egui::Window::new("Settings")
            .open(&mut still_open)
            .default_pos([24.0, 24.0])
            .default_width(240.0)
            .resizable(false)
            .collapsible(false)
            .frame(panel_frame)
            .show(ctx, |ui| {
                ui.style_mut().visuals.override_text_color = Some(egui::Color32::from_gray(220));

                ui.label("Your name");
                ui.text_edit_singleline(name_buffer);
                ui.add_space(4.0);
                ui.checkbox(follow_checkbox, "Follow the cursor");
                ui.add_space(8.0);
                ui.separator();
                ui.label(
                    egui::RichText::new(concat!("Deskpet ", env!("CARGO_PKG_VERSION")))
                        .monospace(),
                );
                ui.add_space(8.0);
                if ui.button("Save").clicked() {
                    *save_clicked = true;
                }
            });
        if !still_open {
            *settings_open = false;
        }
    }
}
