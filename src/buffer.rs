use crate::{
    components::sample::Sample,
    errors::{PyramidioError, Result},
};

/// Pixel buffer with shape (bands, rows, cols).
#[derive(Debug, Clone, PartialEq)]
pub struct Buffer<T> {
    // Row-major, band-sequential
    data: Box<[T]>,
    shape: [usize; 3],
}

impl<T: Sample> Buffer<T> {
    pub fn zeroed(shape: [usize; 3]) -> Self {
        Self::filled(shape, T::zero())
    }

    pub fn filled(shape: [usize; 3], value: T) -> Self {
        Self {
            data: vec![value; shape.iter().product()].into_boxed_slice(),
            shape,
        }
    }

    pub fn from_vec(data: Vec<T>, shape: [usize; 3]) -> Result<Self> {
        if data.len() != shape.iter().product::<usize>() {
            return Err(PyramidioError::ShapeMismatch {
                expected: shape,
                actual: [1, 1, data.len()],
            });
        }
        Ok(Self {
            data: data.into_boxed_slice(),
            shape,
        })
    }
}

impl<T> Buffer<T> {
    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Pixel area of a single band.
    pub fn band_size(&self) -> usize {
        self.shape[1] * self.shape[2]
    }

    /// Samples of band `index`, `index` being a position within this
    /// buffer rather than a raster band index.
    pub fn band(&self, index: usize) -> &[T] {
        let size = self.band_size();
        &self.data[index * size..(index + 1) * size]
    }

    pub fn band_mut(&mut self, index: usize) -> &mut [T] {
        let size = self.band_size();
        &mut self.data[index * size..(index + 1) * size]
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_parts(self) -> (Box<[T]>, [usize; 3]) {
        (self.data, self.shape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_slices_are_disjoint_and_ordered() {
        let mut buffer = Buffer::<u8>::zeroed([2, 2, 3]);
        buffer.band_mut(1).fill(7);
        assert_eq!(buffer.band(0), &[0; 6]);
        assert_eq!(buffer.band(1), &[7; 6]);
    }

    #[test]
    fn from_vec_checks_shape() {
        assert!(Buffer::from_vec(vec![0u8; 5], [1, 2, 3]).is_err());
        let buffer = Buffer::from_vec((0u8..6).collect(), [1, 2, 3]).unwrap();
        assert_eq!(buffer.shape(), [1, 2, 3]);
    }

    #[test]
    fn shape_matches_ndarray_layout() {
        let buffer = Buffer::from_vec((0u16..24).collect(), [2, 3, 4]).unwrap();
        let (data, shape) = buffer.into_parts();
        let array =
            ndarray::Array3::from_shape_vec((shape[0], shape[1], shape[2]), data.into_vec())
                .unwrap();
        assert_eq!(array[[1, 2, 3]], 23);
        assert_eq!(array[[0, 1, 0]], 4);
    }
}
