//! Scanline-free triangle rasterization with the flat fragment stage.
//!
//! Rows are stored bottom-up: row 0 is the bottom of the framebuffer, the
//! same origin as window coordinates on the GPU.

use crate::flags::FlatFlags;
use crate::mesh::{InstanceData, MeshData, MeshView};
use crate::uniforms::FlatDrawUniform;
use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};

/// Pixel centers this close to a shared edge are covered by both triangles.
const EDGE_EPSILON: f32 = 1e-5;

/// Transformation-projection of a draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Projection {
    Planar(Mat3),
    Spatial(Mat4),
}

impl Projection {
    fn clip(&self, position: Vec3) -> Vec4 {
        match self {
            // (x, y, w) in homogeneous 2D, depth fixed at zero.
            Projection::Planar(m) => {
                let p = *m * Vec3::new(position.x, position.y, 1.0);
                Vec4::new(p.x, p.y, 0.0, p.z)
            }
            Projection::Spatial(m) => *m * position.extend(1.0),
        }
    }
}

/// Uniform values resolved for one draw.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ResolvedDraw {
    pub flags: FlatFlags,
    pub projection: Projection,
    pub uniforms: FlatDrawUniform,
    pub texture_matrix: Mat3,
}

/// RGBA8 texture sampled with nearest filtering and clamp-to-edge.
#[derive(Debug, Clone)]
pub(crate) struct Image {
    width: u32,
    height: u32,
    texels: Vec<[u8; 4]>,
}

impl Image {
    pub fn new(width: u32, height: u32, texels: Vec<[u8; 4]>) -> Self {
        Self {
            width,
            height,
            texels,
        }
    }

    fn sample(&self, uv: Vec2) -> Vec4 {
        let x = ((uv.x * self.width as f32).floor() as i64).clamp(0, self.width as i64 - 1);
        let y = ((uv.y * self.height as f32).floor() as i64).clamp(0, self.height as i64 - 1);
        let texel = self.texels[y as usize * self.width as usize + x as usize];
        Vec4::new(
            texel[0] as f32,
            texel[1] as f32,
            texel[2] as f32,
            texel[3] as f32,
        ) / 255.0
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Framebuffer {
    width: u32,
    height: u32,
    color: Vec<Vec4>,
    object_ids: Vec<u32>,
}

impl Framebuffer {
    /// Sides are validated by `SoftwareConfig::validate`.
    pub fn new(width: u32, height: u32) -> Self {
        let len = (width as usize).saturating_mul(height as usize);
        Self {
            width,
            height,
            color: vec![Vec4::ZERO; len],
            object_ids: vec![0; len],
        }
    }

    pub fn clear(&mut self, color: Vec4, object_id: u32) {
        self.color.fill(color);
        self.object_ids.fill(object_id);
    }

    fn index(&self, row: u32, col: u32) -> Option<usize> {
        (row < self.height && col < self.width)
            .then(|| row as usize * self.width as usize + col as usize)
    }

    pub fn color_at(&self, row: u32, col: u32) -> Option<[u8; 4]> {
        self.index(row, col).map(|i| to_rgba8(self.color[i]))
    }

    pub fn object_id_at(&self, row: u32, col: u32) -> Option<u32> {
        self.index(row, col).map(|i| self.object_ids[i])
    }

    pub fn colors(&self) -> Vec<[u8; 4]> {
        self.color.iter().copied().map(to_rgba8).collect()
    }

    pub fn object_ids(&self) -> &[u32] {
        &self.object_ids
    }

    /// Rasterizes every instance of `view`. Index ranges must already be
    /// validated against `mesh`.
    pub fn draw(&mut self, mesh: &MeshData, view: &MeshView, draw: &ResolvedDraw, texture: Option<&Image>) {
        let start = view.index_offset as usize;
        let indices = &mesh.indices[start..start + view.count as usize];

        for instance_id in 0..view.instance_count {
            let instance = mesh
                .instances
                .get(instance_id as usize)
                .copied()
                .unwrap_or_default();
            let object_id = draw.flags.contains(FlatFlags::OBJECT_ID).then(|| {
                if draw.flags.contains(FlatFlags::INSTANCED_OBJECT_ID) {
                    draw.uniforms.object_id.wrapping_add(instance.object_id)
                } else {
                    draw.uniforms.object_id
                }
            });

            for triangle in indices.chunks_exact(3) {
                let vertices = [
                    vertex(mesh, triangle[0], &instance, draw),
                    vertex(mesh, triangle[1], &instance, draw),
                    vertex(mesh, triangle[2], &instance, draw),
                ];
                self.fill(&vertices, object_id, |uv, color| {
                    shade(draw, &instance, texture, uv, color)
                });
            }
        }
    }

    fn fill(
        &mut self,
        vertices: &[Vertex; 3],
        object_id: Option<u32>,
        shade: impl Fn(Vec2, Vec4) -> Option<Vec4>,
    ) {
        // No near-plane clipping.
        if vertices.iter().any(|v| v.clip.w <= 0.0) {
            return;
        }
        let size = Vec2::new(self.width as f32, self.height as f32);
        let to_window = |v: &Vertex| {
            let ndc = Vec2::new(v.clip.x, v.clip.y) / v.clip.w;
            (ndc * 0.5 + 0.5) * size
        };
        let (s0, s1, s2) = (
            to_window(&vertices[0]),
            to_window(&vertices[1]),
            to_window(&vertices[2]),
        );
        let area = edge(s0, s1, s2);
        if area.abs() <= f32::EPSILON {
            return;
        }

        let min = s0.min(s1).min(s2).floor().max(Vec2::ZERO);
        let max = s0.max(s1).max(s2).ceil().min(size);
        for row in min.y as u32..max.y as u32 {
            for col in min.x as u32..max.x as u32 {
                let p = Vec2::new(col as f32 + 0.5, row as f32 + 0.5);
                let w0 = edge(s1, s2, p) / area;
                let w1 = edge(s2, s0, p) / area;
                let w2 = edge(s0, s1, p) / area;
                if w0 < -EDGE_EPSILON || w1 < -EDGE_EPSILON || w2 < -EDGE_EPSILON {
                    continue;
                }

                let uv = vertices[0].uv * w0 + vertices[1].uv * w1 + vertices[2].uv * w2;
                let color = vertices[0].color * w0 + vertices[1].color * w1 + vertices[2].color * w2;
                let Some(out) = shade(uv, color) else {
                    continue;
                };
                let i = row as usize * self.width as usize + col as usize;
                self.color[i] = out;
                if let Some(id) = object_id {
                    self.object_ids[i] = id;
                }
            }
        }
    }
}

struct Vertex {
    clip: Vec4,
    uv: Vec2,
    color: Vec4,
}

fn vertex(mesh: &MeshData, index: u32, instance: &InstanceData, draw: &ResolvedDraw) -> Vertex {
    let i = index as usize;
    let mut position = Vec3::from(mesh.positions[i]);
    if draw.flags.contains(FlatFlags::INSTANCED_TRANSFORMATION) {
        position = instance.transformation.transform_point3(position);
    }
    let uv = mesh
        .texture_coordinates
        .get(i)
        .map_or(Vec2::ZERO, |uv| Vec2::from(*uv));
    let color = if !mesh.instances.is_empty() {
        instance.color
    } else {
        mesh.colors.get(i).map_or(Vec4::ONE, |c| Vec4::from(*c))
    };
    Vertex {
        clip: draw.projection.clip(position),
        uv,
        color,
    }
}

fn shade(
    draw: &ResolvedDraw,
    instance: &InstanceData,
    texture: Option<&Image>,
    uv: Vec2,
    vertex_color: Vec4,
) -> Option<Vec4> {
    let flags = draw.flags;
    let mut color = Vec4::from(draw.uniforms.color);
    if flags.contains(FlatFlags::VERTEX_COLOR) {
        color *= vertex_color;
    }
    if flags.contains(FlatFlags::TEXTURED) {
        let mut uv = uv;
        if flags.contains(FlatFlags::INSTANCED_TEXTURE_OFFSET) {
            uv += instance.texture_offset;
        }
        if flags.contains(FlatFlags::TEXTURE_TRANSFORMATION) {
            uv = (draw.texture_matrix * uv.extend(1.0)).truncate();
        }
        // An unbound sampler reads opaque black.
        color *= texture.map_or(Vec4::W, |image| image.sample(uv));
    }
    if flags.contains(FlatFlags::ALPHA_MASK) && color.w < draw.uniforms.alpha_mask {
        return None;
    }
    Some(color)
}

#[inline]
fn edge(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

fn to_rgba8(color: Vec4) -> [u8; 4] {
    let c = (color.clamp(Vec4::ZERO, Vec4::ONE) * 255.0).round();
    [c.x as u8, c.y as u8, c.z as u8, c.w as u8]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(flags: FlatFlags) -> ResolvedDraw {
        ResolvedDraw {
            flags,
            projection: Projection::Planar(Mat3::IDENTITY),
            uniforms: FlatDrawUniform::default(),
            texture_matrix: Mat3::IDENTITY,
        }
    }

    #[test]
    fn fills_covered_pixels_only() {
        let mut fb = Framebuffer::new(8, 8);
        fb.clear(Vec4::ZERO, 9);
        let mesh = MeshData {
            positions: vec![[-1.0, -1.0, 0.0], [0.0, -1.0, 0.0], [-1.0, 0.0, 0.0]],
            indices: vec![0, 1, 2],
            ..MeshData::default()
        };
        let view = MeshView {
            mesh: crate::mesh::MeshId::new(1),
            count: 3,
            index_offset: 0,
            instance_count: 1,
        };
        let mut draw = flat(FlatFlags::OBJECT_ID);
        draw.uniforms.object_id = 4;
        fb.draw(&mesh, &view, &draw, None);

        assert_eq!(fb.object_id_at(0, 0), Some(4));
        assert_eq!(fb.color_at(0, 0), Some([255, 255, 255, 255]));
        assert_eq!(fb.object_id_at(7, 7), Some(9));
        assert_eq!(fb.object_id_at(3, 3), Some(9));
        assert_eq!(fb.object_id_at(8, 0), None);
    }

    #[test]
    fn alpha_mask_discards_below_threshold() {
        let draw = ResolvedDraw {
            uniforms: FlatDrawUniform::default().with_color(Vec4::new(1.0, 1.0, 1.0, 0.25)),
            ..flat(FlatFlags::ALPHA_MASK)
        };
        let instance = InstanceData::default();
        assert_eq!(shade(&draw, &instance, None, Vec2::ZERO, Vec4::ONE), None);

        let opaque = ResolvedDraw {
            uniforms: draw.uniforms.with_alpha_mask(0.2),
            ..draw
        };
        assert!(shade(&opaque, &instance, None, Vec2::ZERO, Vec4::ONE).is_some());
    }

    #[test]
    fn texture_offset_applies_before_matrix() {
        let image = Image::new(2, 1, vec![[255, 0, 0, 255], [0, 0, 255, 255]]);
        let draw = ResolvedDraw {
            texture_matrix: Mat3::from_scale(Vec2::splat(0.5)),
            ..flat(FlatFlags::TEXTURED | FlatFlags::INSTANCED_TEXTURE_OFFSET)
        };
        let instance = InstanceData::default().with_texture_offset(Vec2::new(1.0, 0.0));
        // (0.25 + 1.0) * 0.5 lands in the right texel.
        let color = shade(&draw, &instance, Some(&image), Vec2::new(0.25, 0.5), Vec4::ONE);
        assert_eq!(color, Some(Vec4::new(0.0, 0.0, 1.0, 1.0)));
    }

    #[test]
    fn planar_projection_uses_homogeneous_w() {
        let clip = Projection::Planar(Mat3::from_scale(Vec2::splat(2.0))).clip(Vec3::new(0.5, 0.25, 0.0));
        assert_eq!(clip, Vec4::new(1.0, 0.5, 0.0, 1.0));
    }
}
