use std::path::{Path, PathBuf};

use eframe::egui;
use tracing::{info, warn};

use svg_extrude::{
    ConversionConfig, ExtractOptions, Interaction, PathSource, SceneGraph, VectorPath,
    build_scene, export_document, load_paths,
};

use super::viewport::render_viewport;

pub struct PreviewApp {
    paths: Vec<VectorPath>,
    scene: Option<SceneGraph>,
    config: ConversionConfig,
    options: ExtractOptions,
    interaction: Interaction,
    status_message: String,
}

impl Default for PreviewApp {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            scene: None,
            config: ConversionConfig::default(),
            options: ExtractOptions::default(),
            interaction: Interaction::new(),
            status_message: String::from("Ready - Open an SVG file to preview"),
        }
    }
}

impl PreviewApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, initial: Option<PathBuf>) -> Self {
        let mut app = Self::default();
        if let Some(path) = initial {
            app.load(&path);
        }
        app
    }

    fn open_file(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("SVG files", &["svg"])
            .pick_file()
        {
            self.load(&path);
        }
    }

    fn load(&mut self, path: &Path) {
        match load_paths(&PathSource::File(path.to_path_buf())) {
            Ok(paths) => {
                self.paths = paths;
                self.interaction.reset();
                self.rebuild();
                if self.scene.is_some() {
                    self.status_message =
                        format!("Loaded: {} ({} paths)", path.display(), self.paths.len());
                }
            }
            Err(e) => {
                warn!(error = %e, "failed to load");
                self.status_message = format!("Error loading file: {}", e);
            }
        }
    }

    fn rebuild(&mut self) {
        if self.paths.is_empty() {
            self.scene = None;
            return;
        }
        match build_scene(&self.paths, &self.config, &self.options) {
            Ok(scene) => {
                self.status_message = format!("{} meshes", scene.root.children.len());
                self.scene = Some(scene);
            }
            Err(e) => {
                self.scene = None;
                self.status_message = format!("Error building model: {}", e);
            }
        }
    }

    fn export_file(&mut self) {
        let Some(scene) = &self.scene else {
            return;
        };
        let Some(path) = rfd::FileDialog::new()
            .add_filter("glTF", &["gltf"])
            .add_filter("Binary glTF", &["glb"])
            .set_file_name("model.gltf")
            .save_file()
        else {
            return;
        };

        let binary = path.extension().is_some_and(|ext| ext == "glb");
        let result = export_document(scene).and_then(|doc| {
            if binary {
                doc.to_glb()
            } else {
                doc.to_json_bytes()
            }
        });
        self.status_message = match result {
            Ok(bytes) => match std::fs::write(&path, &bytes) {
                Ok(()) => {
                    info!(path = %path.display(), bytes = bytes.len(), "exported");
                    format!("Exported: {} ({} bytes)", path.display(), bytes.len())
                }
                Err(e) => format!("Error writing file: {}", e),
            },
            Err(e) => format!("Error exporting: {}", e),
        };
    }

    fn render_toolbar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if ui.button("Open SVG").clicked() {
                self.open_file();
            }
            if ui
                .add_enabled(self.scene.is_some(), egui::Button::new("Export glTF"))
                .clicked()
            {
                self.export_file();
            }

            ui.separator();

            let mut changed = false;
            ui.label("Depth:");
            changed |= ui
                .add(egui::DragValue::new(&mut self.config.depth).range(0.1..=500.0))
                .changed();
            changed |= ui.checkbox(&mut self.config.bevel_enabled, "Bevel").changed();
            ui.add_enabled_ui(self.config.bevel_enabled, |ui| {
                ui.label("Size:");
                changed |= ui
                    .add(egui::DragValue::new(&mut self.config.bevel_size).range(0.0..=50.0))
                    .changed();
                ui.label("Thickness:");
                changed |= ui
                    .add(egui::DragValue::new(&mut self.config.bevel_thickness).range(0.0..=50.0))
                    .changed();
                ui.label("Segments:");
                changed |= ui
                    .add(egui::DragValue::new(&mut self.config.bevel_segments).range(0..=16))
                    .changed();
            });
            if changed {
                self.rebuild();
            }

            ui.separator();

            if ui.button("Reset View").clicked() {
                self.interaction.reset();
            }
        });
    }
}

impl eframe::App for PreviewApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ctx.input(|i| {
            if i.key_pressed(egui::Key::R) {
                self.interaction.reset();
            }
        });

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            self.render_toolbar(ui);
        });

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(&self.status_message);
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.label(format!(
                        "yaw {:.2}  pitch {:.2}",
                        self.interaction.yaw, self.interaction.pitch
                    ));
                });
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            render_viewport(
                ui,
                self.scene.as_ref(),
                self.config.target_size,
                &mut self.interaction,
            );
        });

        self.interaction.tick();
        // The live orientation rides on the scene; export ignores it
        if let Some(scene) = &mut self.scene {
            scene.set_orientation(self.interaction.orientation());
        }

        ctx.request_repaint();
    }
}
