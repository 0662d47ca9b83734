//! Precomputes the pixel groupings described by a label map.
//!
//! Labels may be arbitrary nonzero integers (they don't need to start at 1 or
//! be contiguous). We sort them once and from then on only refer to a ROI by
//! its dense index (its position in [`RoiIndex::labels`]).

use std::collections::BTreeMap;
use std::ops::Range;

use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

use crate::Error;

/// Specifies the values that get stored in the pyramid for each frame
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reduction {
    /// one value per ROI: the mean intensity of the ROI's pixels
    #[default]
    RoiMean,
    /// one value per ROI pixel. Products are formed pixel by pixel and then
    /// averaged over the ROI, which preserves the speckle contrast.
    PixelResolved,
}

/// The flat pixel indices of every ROI in a label map
#[derive(Clone, Debug)]
pub struct RoiIndex {
    shape: [usize; 2],
    labels: Vec<u64>,
    /// flat (row-major) pixel indices, grouped by ROI
    pixel_indices: Vec<usize>,
    /// ROI `r` owns `pixel_indices[offsets[r]..offsets[r + 1]]`
    offsets: Vec<usize>,
}

impl RoiIndex {
    pub fn from_label_map(label_map: ArrayView2<u64>) -> Result<Self, Error> {
        let (nrows, ncols) = label_map.dim();
        let shape = [nrows, ncols];

        let mut groups: BTreeMap<u64, Vec<usize>> = BTreeMap::new();
        for ((row, col), &label) in label_map.indexed_iter() {
            if label != 0 {
                groups.entry(label).or_default().push(row * ncols + col);
            }
        }
        if groups.is_empty() {
            return Err(Error::empty_roi_set(shape));
        }

        let mut labels = Vec::with_capacity(groups.len());
        let mut pixel_indices = Vec::new();
        let mut offsets = vec![0];
        for (label, mut indices) in groups {
            // indexed_iter follows the logical order, but that's only
            // row-major for standard layouts
            indices.sort_unstable();
            labels.push(label);
            pixel_indices.extend(indices);
            offsets.push(pixel_indices.len());
        }

        Ok(Self {
            shape,
            labels,
            pixel_indices,
            offsets,
        })
    }

    /// the shape of the label map (and of every frame)
    pub fn shape(&self) -> [usize; 2] {
        self.shape
    }

    /// the ROI labels, in ascending order. The `r`th label corresponds to
    /// column `r` of the output arrays.
    pub fn labels(&self) -> &[u64] {
        &self.labels
    }

    pub fn n_rois(&self) -> usize {
        self.labels.len()
    }

    /// the flat (row-major) indices of the pixels in ROI `roi`
    pub fn pixel_indices(&self, roi: usize) -> &[usize] {
        &self.pixel_indices[self.offsets[roi]..self.offsets[roi + 1]]
    }

    /// the flat pixel indices of every ROI, grouped by ROI (in the order of
    /// [`Self::labels`])
    pub fn all_pixel_indices(&self) -> &[usize] {
        &self.pixel_indices
    }

    pub fn pixel_count(&self, roi: usize) -> usize {
        self.offsets[roi + 1] - self.offsets[roi]
    }

    pub fn pixel_counts(&self) -> Vec<usize> {
        self.offsets.windows(2).map(|w| w[1] - w[0]).collect()
    }

    /// the number of values that `reduction` produces per frame
    pub fn n_elements(&self, reduction: Reduction) -> usize {
        match reduction {
            Reduction::RoiMean => self.n_rois(),
            Reduction::PixelResolved => self.pixel_indices.len(),
        }
    }

    /// the elements of a reduced frame that belong to ROI `roi`
    pub fn element_range(&self, roi: usize, reduction: Reduction) -> Range<usize> {
        match reduction {
            Reduction::RoiMean => roi..(roi + 1),
            Reduction::PixelResolved => self.offsets[roi]..self.offsets[roi + 1],
        }
    }

    /// check that `frame` can be reduced with `self`
    pub fn check_frame_shape(&self, frame_shape: &[usize]) -> Result<(), Error> {
        if frame_shape != self.shape {
            Err(Error::frame_shape(self.shape, frame_shape))
        } else {
            Ok(())
        }
    }

    /// reduce `frame` into `out`, which must hold `self.n_elements(reduction)`
    /// values.
    ///
    /// `out` is left untouched when an error is returned.
    pub fn reduce_into<T>(
        &self,
        frame: ArrayView2<T>,
        reduction: Reduction,
        out: &mut [f64],
    ) -> Result<(), Error>
    where
        T: Copy + Into<f64>,
    {
        self.check_frame_shape(frame.shape())?;
        let n_elements = self.n_elements(reduction);
        if out.len() != n_elements {
            return Err(Error::length("the reduced-frame buffer", n_elements, out.len()));
        }

        let ncols = self.shape[1];
        let pixel = |idx: usize| -> f64 { frame[[idx / ncols, idx % ncols]].into() };
        match reduction {
            Reduction::RoiMean => {
                for (roi, dst) in out.iter_mut().enumerate() {
                    let indices = self.pixel_indices(roi);
                    let total: f64 = indices.iter().map(|&idx| pixel(idx)).sum();
                    *dst = total / (indices.len() as f64);
                }
            }
            Reduction::PixelResolved => {
                for (dst, &idx) in out.iter_mut().zip(self.pixel_indices.iter()) {
                    *dst = pixel(idx);
                }
            }
        }
        Ok(())
    }
}
