use glam::Vec3;

/// Line-list vertices the debug buffer can hold.
pub const MAX_DEBUG_LINE_VERTICES: usize = 64 * 1024;

/// Packs an RGBA color into `0xAABBGGRR`, the byte order of
/// `Rgba8Unorm` vertex attributes.
#[inline]
#[must_use]
pub const fn pack_rgba8(r: u8, g: u8, b: u8, a: u8) -> u32 {
    (r as u32) | ((g as u32) << 8) | ((b as u32) << 16) | ((a as u32) << 24)
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DebugVertex {
    pub position: [f32; 3],
    pub color: u32,
}

/// Stride of one [`DebugVertex`].
pub const DEBUG_VERTEX_STRIDE: u32 = std::mem::size_of::<DebugVertex>() as u32;

/// World-space line segments collected for one frame.
#[derive(Debug, Clone, Default)]
pub struct DebugDrawList {
    vertices: Vec<DebugVertex>,
    dropped: usize,
}

impl DebugDrawList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_line(&mut self, a: Vec3, b: Vec3, color: u32) {
        if self.vertices.len() + 2 > MAX_DEBUG_LINE_VERTICES {
            self.dropped += 1;
            return;
        }
        self.vertices.push(DebugVertex {
            position: a.to_array(),
            color,
        });
        self.vertices.push(DebugVertex {
            position: b.to_array(),
            color,
        });
    }

    /// Shaft plus a four-line head.
    pub fn add_arrow(&mut self, from: Vec3, to: Vec3, color: u32) {
        self.add_line(from, to, color);

        let shaft = to - from;
        let len = shaft.length();
        let Some(dir) = shaft.try_normalize() else {
            return;
        };
        let (u, v) = dir.any_orthonormal_pair();
        let head = len * 0.2;
        let base = to - dir * head;
        let spread = head * 0.5;
        for side in [u, -u, v, -v] {
            self.add_line(to, base + side * spread, color);
        }
    }

    /// Three axis-aligned segments through `center`.
    pub fn add_axes_cross(&mut self, center: Vec3, half_size: f32, color: u32) {
        for axis in [Vec3::X, Vec3::Y, Vec3::Z] {
            let h = axis * half_size;
            self.add_line(center - h, center + h, color);
        }
    }

    /// Great circles in the three axis planes.
    pub fn add_wire_sphere(&mut self, center: Vec3, radius: f32, color: u32, segments: u32) {
        let segments = segments.max(3);
        for (u, v) in [(Vec3::X, Vec3::Y), (Vec3::Y, Vec3::Z), (Vec3::Z, Vec3::X)] {
            self.add_circle(center, u * radius, v * radius, color, segments);
        }
    }

    /// Cone from `apex` along `dir`: base circle plus four side lines.
    pub fn add_wire_cone(
        &mut self,
        apex: Vec3,
        dir: Vec3,
        length: f32,
        half_angle_rad: f32,
        color: u32,
        segments: u32,
    ) {
        let Some(dir) = dir.try_normalize() else {
            return;
        };
        let radius = length * half_angle_rad.tan();
        let center = apex + dir * length;
        let (u, v) = dir.any_orthonormal_pair();

        self.add_circle(center, u * radius, v * radius, color, segments.max(3));
        for side in [u, -u, v, -v] {
            self.add_line(apex, center + side * radius, color);
        }
    }

    fn add_circle(&mut self, center: Vec3, u: Vec3, v: Vec3, color: u32, segments: u32) {
        let step = std::f32::consts::TAU / segments as f32;
        let point = |i: u32| {
            let (s, c) = (i as f32 * step).sin_cos();
            center + u * c + v * s
        };
        for i in 0..segments {
            self.add_line(point(i), point(i + 1), color);
        }
    }

    #[inline]
    #[must_use]
    pub fn vertices(&self) -> &[DebugVertex] {
        &self.vertices
    }

    #[inline]
    #[must_use]
    pub fn vertex_count(&self) -> u32 {
        self.vertices.len() as u32
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Segments rejected because the list was full.
    #[inline]
    #[must_use]
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
        self.dropped = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_red_in_low_byte() {
        assert_eq!(pack_rgba8(255, 0, 0, 0), 0x0000_00ff);
        assert_eq!(pack_rgba8(0, 0, 0, 255), 0xff00_0000);
    }

    #[test]
    fn shape_vertex_counts() {
        let mut list = DebugDrawList::new();
        list.add_wire_sphere(Vec3::ZERO, 1.0, 0, 16);
        assert_eq!(list.vertex_count(), 3 * 16 * 2);

        list.clear();
        list.add_arrow(Vec3::ZERO, Vec3::Y, 0);
        assert_eq!(list.vertex_count(), 5 * 2);

        list.clear();
        list.add_wire_cone(Vec3::ZERO, Vec3::NEG_Y, 2.0, 0.3, 0, 24);
        assert_eq!(list.vertex_count(), (24 + 4) * 2);
    }

    #[test]
    fn full_list_drops_segments() {
        let mut list = DebugDrawList::new();
        for _ in 0..MAX_DEBUG_LINE_VERTICES / 2 + 3 {
            list.add_line(Vec3::ZERO, Vec3::ONE, 0);
        }
        assert_eq!(list.vertices().len(), MAX_DEBUG_LINE_VERTICES);
        assert_eq!(list.dropped(), 3);
    }
}
