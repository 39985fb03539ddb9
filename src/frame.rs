/// Everything the renderer needs to draw one frame: a point per particle slot, its color, and a
/// shared point radius. Inactive slots are included, parked far outside the domain.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    pub positions: Vec<[f32; 3]>,
    pub colors: Vec<[f32; 4]>,
    pub radius: f32,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
}

impl Frame {
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Interleaves positions and colors, ready for a vertex buffer.
    pub fn vertices(&self) -> Vec<Vertex> {
        self.positions
            .iter()
            .zip(&self.colors)
            .map(|(&position, &color)| Vertex { position, color })
            .collect()
    }

    pub fn position_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }

    pub fn color_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.colors)
    }
}

/// Consumer of simulated frames, typically a renderer. It never feeds anything back into the
/// simulation.
pub trait FrameSink {
    fn consume(&mut self, frame_index: usize, frame: &Frame) -> eyre::Result<()>;
}

/// Keeps every frame in memory.
impl FrameSink for Vec<Frame> {
    fn consume(&mut self, _frame_index: usize, frame: &Frame) -> eyre::Result<()> {
        self.push(frame.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertices_interleave_positions_and_colors() {
        let frame = Frame {
            positions: vec![[0., 1., 2.], [3., 4., 5.]],
            colors: vec![[1., 0., 0., 1.], [0., 1., 0., 0.5]],
            radius: 0.01,
        };

        let verts = frame.vertices();
        assert_eq!(verts.len(), 2);
        assert_eq!(verts[1].position, [3., 4., 5.]);
        assert_eq!(verts[1].color, [0., 1., 0., 0.5]);

        assert_eq!(std::mem::size_of::<Vertex>(), 28);
        assert_eq!(bytemuck::cast_slice::<Vertex, u8>(&verts).len(), 56);
        assert_eq!(frame.position_bytes().len(), 24);
        assert_eq!(frame.color_bytes().len(), 32);
    }
}
