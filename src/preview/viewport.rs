use egui::{Color32, Pos2, Rect, Sense, Shape, Stroke, Vec2};
use glam::{DAffine3, DQuat, DVec2, DVec3};

use svg_extrude::{Interaction, Mesh, SceneGraph, SceneNode};

const BACKGROUND: Color32 = Color32::from_gray(34);
const BASE_COLOR: [f32; 3] = [235.0, 235.0, 240.0];
const AMBIENT: f64 = 0.3;
/// Fraction of the viewport filled by the model
const FILL: f64 = 0.8;

/// Screen axes are x right, y down, so the viewer looks along +z.
/// Light comes from the viewer, slightly above and to the right.
fn light_dir() -> DVec3 {
    DVec3::new(0.3, -0.4, -1.0).normalize()
}

/// A triangle ready to paint
#[derive(Debug, Clone, Copy)]
pub struct ShadedTriangle {
    pub points: [DVec2; 3],
    pub depth: f64,
    pub brightness: f64,
}

/// Every mesh of the scene with its world transform, root first.
///
/// `orientation` spins the normalized model about the origin, replacing the
/// root's own rotation.
pub fn world_meshes(graph: &SceneGraph, orientation: DQuat) -> Vec<(DAffine3, &Mesh)> {
    let mut root = graph.root.transform;
    root.rotation = DQuat::IDENTITY;
    let world = DAffine3::from_quat(orientation) * root.to_affine();
    let mut out = Vec::new();
    collect(&graph.root, world, &mut out);
    out
}

fn collect<'a>(node: &'a SceneNode, world: DAffine3, out: &mut Vec<(DAffine3, &'a Mesh)>) {
    if let Some(mesh) = &node.mesh {
        out.push((world, mesh));
    }
    for child in &node.children {
        collect(child, world * child.transform.to_affine(), out);
    }
}

/// Orthographic projection onto the xy plane, far triangles first.
///
/// Faces that do not point toward the viewer (normal z of zero or more) are
/// culled.
pub fn shade(meshes: &[(DAffine3, &Mesh)]) -> Vec<ShadedTriangle> {
    let light = light_dir();
    let mut out = Vec::new();
    for (world, mesh) in meshes {
        let points: Vec<DVec3> = mesh
            .positions
            .iter()
            .map(|&p| world.transform_point3(p))
            .collect();
        for tri in &mesh.indices {
            let [a, b, c] = tri.map(|i| points[i as usize]);
            let normal = (b - a).cross(c - a).normalize_or_zero();
            if normal.z >= 0.0 {
                continue;
            }
            let diffuse = normal.dot(light).max(0.0);
            out.push(ShadedTriangle {
                points: [a.truncate(), b.truncate(), c.truncate()],
                depth: (a.z + b.z + c.z) / 3.0,
                brightness: AMBIENT + (1.0 - AMBIENT) * diffuse,
            });
        }
    }
    out.sort_by(|x, y| y.depth.total_cmp(&x.depth));
    out
}

/// Paint the scene and feed pointer input into the interaction state.
pub fn render_viewport(
    ui: &mut egui::Ui,
    graph: Option<&SceneGraph>,
    target_size: f64,
    interaction: &mut Interaction,
) {
    let (response, painter) = ui.allocate_painter(ui.available_size(), Sense::click_and_drag());
    let rect = response.rect;
    painter.rect_filled(rect, 0.0, BACKGROUND);

    if response.drag_started_by(egui::PointerButton::Primary)
        && let Some(pos) = response.interact_pointer_pos()
    {
        interaction.pointer_down(to_dvec(pos));
    }
    if response.dragged_by(egui::PointerButton::Primary)
        && let Some(pos) = response.interact_pointer_pos()
    {
        interaction.pointer_move(to_dvec(pos));
    }
    if response.drag_stopped() {
        interaction.pointer_up();
    }

    let Some(graph) = graph else {
        painter.text(
            rect.center(),
            egui::Align2::CENTER_CENTER,
            "Open an SVG file to preview",
            egui::FontId::proportional(18.0),
            Color32::GRAY,
        );
        return;
    };

    let meshes = world_meshes(graph, interaction.orientation());
    let triangles = shade(&meshes);

    let zoom = (rect.width().min(rect.height()) as f64 * FILL / target_size) as f32;
    let center = rect.center();
    let to_screen = |p: DVec2| Pos2::new(center.x + p.x as f32 * zoom, center.y + p.y as f32 * zoom);

    let mut mesh = egui::Mesh::default();
    for tri in &triangles {
        let color = shade_color(tri.brightness);
        let base = mesh.vertices.len() as u32;
        for p in tri.points {
            mesh.colored_vertex(to_screen(p), color);
        }
        mesh.add_triangle(base, base + 1, base + 2);
    }
    painter.add(Shape::mesh(mesh));

    draw_axes(&painter, rect);
}

fn shade_color(brightness: f64) -> Color32 {
    let [r, g, b] = BASE_COLOR.map(|c| (c * brightness as f32).clamp(0.0, 255.0) as u8);
    Color32::from_rgb(r, g, b)
}

fn draw_axes(painter: &egui::Painter, rect: Rect) {
    let origin = rect.left_bottom() + Vec2::new(24.0, -24.0);
    painter.line_segment(
        [origin, origin + Vec2::new(20.0, 0.0)],
        Stroke::new(2.0, Color32::from_rgb(220, 80, 80)),
    );
    painter.line_segment(
        [origin, origin + Vec2::new(0.0, 20.0)],
        Stroke::new(2.0, Color32::from_rgb(80, 200, 80)),
    );
}

fn to_dvec(p: Pos2) -> DVec2 {
    DVec2::new(p.x as f64, p.y as f64)
}
