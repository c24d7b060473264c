//! Immutable histogram snapshots

use ndarray::{ArrayD, Ix1};

use super::BinEdges;

/// Heights and edges from one binning pass
///
/// Produced fresh by every `hist()` call and never mutated afterwards.
/// `heights` has one dimension per axis, with `edges.shape()` as its shape.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HistogramResult {
    pub heights: ArrayD<f64>,
    pub edges: BinEdges,
    /// Heights are normalized to a probability density
    pub density: bool,
}

impl HistogramResult {
    pub fn axis_count(&self) -> usize {
        self.edges.axis_count()
    }

    /// Sum of all heights
    pub fn total(&self) -> f64 {
        self.heights.sum()
    }

    /// Heights as a flat slice when the histogram has a single axis
    pub fn heights_1d(&self) -> Option<Vec<f64>> {
        self.heights
            .view()
            .into_dimensionality::<Ix1>()
            .ok()
            .map(|h| h.to_vec())
    }

    /// Bin centers of a single-axis histogram
    pub fn centers(&self) -> Option<Vec<f64>> {
        if self.axis_count() != 1 {
            return None;
        }
        self.edges.centers(0)
    }

    /// Rectangles for drawing a two-axis histogram as a grid of quads
    ///
    /// Cells are ordered with the first axis varying fastest.
    pub fn quad_boxes(&self) -> Option<QuadBoxes> {
        if self.axis_count() != 2 {
            return None;
        }
        let x = &self.edges.axes()[0];
        let y = &self.edges.axes()[1];
        let cells = (x.len() - 1) * (y.len() - 1);

        let mut boxes = QuadBoxes::with_capacity(cells);
        for (row, yw) in y.windows(2).enumerate() {
            for (col, xw) in x.windows(2).enumerate() {
                boxes.left.push(xw[0]);
                boxes.right.push(xw[1]);
                boxes.bottom.push(yw[0]);
                boxes.top.push(yw[1]);
                boxes.lr_center.push((xw[0] + xw[1]) / 2.0);
                boxes.bt_center.push((yw[0] + yw[1]) / 2.0);
                boxes.heights.push(self.heights[[col, row].as_slice()]);
            }
        }
        Some(boxes)
    }
}

/// Flattened quad geometry for a two-axis histogram
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QuadBoxes {
    pub left: Vec<f64>,
    pub right: Vec<f64>,
    pub bottom: Vec<f64>,
    pub top: Vec<f64>,
    pub lr_center: Vec<f64>,
    pub bt_center: Vec<f64>,
    pub heights: Vec<f64>,
}

impl QuadBoxes {
    fn with_capacity(cells: usize) -> Self {
        Self {
            left: Vec::with_capacity(cells),
            right: Vec::with_capacity(cells),
            bottom: Vec::with_capacity(cells),
            top: Vec::with_capacity(cells),
            lr_center: Vec::with_capacity(cells),
            bt_center: Vec::with_capacity(cells),
            heights: Vec::with_capacity(cells),
        }
    }

    pub fn len(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, arr2};

    fn result_2d() -> HistogramResult {
        HistogramResult {
            heights: arr2(&[[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]).into_dyn(),
            edges: BinEdges::new(vec![vec![0.0, 1.0, 2.0, 3.0], vec![10.0, 20.0, 30.0]]).unwrap(),
            density: false,
        }
    }

    #[test]
    fn test_quad_boxes_layout() {
        let boxes = result_2d().quad_boxes().unwrap();

        assert_eq!(boxes.len(), 6);
        assert_eq!(boxes.left, vec![0.0, 1.0, 2.0, 0.0, 1.0, 2.0]);
        assert_eq!(boxes.right, vec![1.0, 2.0, 3.0, 1.0, 2.0, 3.0]);
        assert_eq!(boxes.bottom, vec![10.0, 10.0, 10.0, 20.0, 20.0, 20.0]);
        assert_eq!(boxes.top, vec![20.0, 20.0, 20.0, 30.0, 30.0, 30.0]);
        assert_eq!(boxes.lr_center[1], 1.5);
        assert_eq!(boxes.bt_center[3], 25.0);
        assert_eq!(boxes.heights, vec![1.0, 3.0, 5.0, 2.0, 4.0, 6.0]);
    }

    #[test]
    fn test_one_dimensional_views() {
        let result = HistogramResult {
            heights: arr1(&[1.0, 2.0, 2.0, 0.0]).into_dyn(),
            edges: BinEdges::new(vec![vec![0.0, 1.0, 2.0, 3.0, 4.0]]).unwrap(),
            density: false,
        };

        assert_eq!(result.heights_1d().unwrap(), vec![1.0, 2.0, 2.0, 0.0]);
        assert_eq!(result.centers().unwrap(), vec![0.5, 1.5, 2.5, 3.5]);
        assert_eq!(result.total(), 5.0);
        assert!(result.quad_boxes().is_none());

        assert!(result_2d().centers().is_none());
        assert!(result_2d().heights_1d().is_none());
    }
}
