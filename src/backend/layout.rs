//! Output layout
//!
//! Outputs are placed left to right in the order they appear. View and cursor
//! positions are expressed in this layout space; the renderer converts them to
//! output-local coordinates with [`OutputLayout::output_coords`].

use super::OutputId;
use crate::view::Rectangle;

#[derive(Debug, Clone, Default)]
pub struct OutputLayout {
    outputs: Vec<(OutputId, Rectangle)>,
}

impl OutputLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place an output to the right of the current rightmost one.
    /// Re-adding a known output keeps its place.
    pub fn add_auto(&mut self, output: OutputId, width: u32, height: u32) -> Rectangle {
        if let Some((_, rect)) = self.outputs.iter().find(|(id, _)| *id == output) {
            return *rect;
        }
        let x = self
            .outputs
            .iter()
            .map(|(_, rect)| rect.x + rect.width as i32)
            .max()
            .unwrap_or(0);
        let rect = Rectangle::new(x, 0, width, height);
        self.outputs.push((output, rect));
        rect
    }

    pub fn get(&self, output: OutputId) -> Option<Rectangle> {
        self.outputs
            .iter()
            .find(|(id, _)| *id == output)
            .map(|(_, rect)| *rect)
    }

    pub fn output_at(&self, x: f64, y: f64) -> Option<OutputId> {
        self.outputs
            .iter()
            .find(|(_, rect)| rect.contains(x, y))
            .map(|(id, _)| *id)
    }

    /// Bounding box of every output.
    pub fn extents(&self) -> Rectangle {
        let mut iter = self.outputs.iter().map(|(_, rect)| *rect);
        let first = match iter.next() {
            Some(rect) => rect,
            None => return Rectangle::default(),
        };
        iter.fold(first, |acc, rect| acc.union(&rect))
    }

    /// Convert a layout point to coordinates local to `output`.
    pub fn output_coords(&self, output: OutputId, lx: f64, ly: f64) -> Option<(f64, f64)> {
        self.get(output)
            .map(|rect| (lx - rect.x as f64, ly - rect.y as f64))
    }

    /// Closest point to `(x, y)` that lies on some output.
    pub fn clamp(&self, x: f64, y: f64) -> (f64, f64) {
        if self.outputs.is_empty() || self.output_at(x, y).is_some() {
            return (x, y);
        }
        let mut best = (x, y);
        let mut best_distance = f64::INFINITY;
        for (_, rect) in &self.outputs {
            let (cx, cy) = rect.closest_point(x, y);
            let distance = (cx - x).powi(2) + (cy - y).powi(2);
            if distance < best_distance {
                best_distance = distance;
                best = (cx, cy);
            }
        }
        best
    }
}
