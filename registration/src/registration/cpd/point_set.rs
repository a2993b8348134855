//! Conversion between point containers and the N×D matrices the EM code
//! works on.

use cv_core::{Error, PointCloud, Result};
use nalgebra::{DMatrix, Point2, Point3};

/// A point container that can be flattened into an N×D matrix and rebuilt
/// from transformed coordinates.
pub trait PointSet: Sized {
    /// One point per row.
    fn to_matrix(&self) -> DMatrix<f64>;

    /// Same kind of container holding `coords` instead of the current points.
    fn with_coordinates(&self, coords: &DMatrix<f64>) -> Result<Self>;
}

impl PointSet for DMatrix<f64> {
    fn to_matrix(&self) -> DMatrix<f64> {
        self.clone()
    }

    fn with_coordinates(&self, coords: &DMatrix<f64>) -> Result<Self> {
        Ok(coords.clone())
    }
}

impl PointSet for Vec<Point2<f64>> {
    fn to_matrix(&self) -> DMatrix<f64> {
        DMatrix::from_fn(self.len(), 2, |i, d| self[i][d])
    }

    fn with_coordinates(&self, coords: &DMatrix<f64>) -> Result<Self> {
        expect_columns(coords, 2)?;
        Ok(coords
            .row_iter()
            .map(|r| Point2::new(r[0], r[1]))
            .collect())
    }
}

impl PointSet for Vec<Point3<f64>> {
    fn to_matrix(&self) -> DMatrix<f64> {
        DMatrix::from_fn(self.len(), 3, |i, d| self[i][d])
    }

    fn with_coordinates(&self, coords: &DMatrix<f64>) -> Result<Self> {
        expect_columns(coords, 3)?;
        Ok(rows_to_points3(coords, |v| v))
    }
}

impl PointSet for PointCloud<f64> {
    fn to_matrix(&self) -> DMatrix<f64> {
        DMatrix::from_fn(self.len(), 3, |i, d| self.points[i][d])
    }

    fn with_coordinates(&self, coords: &DMatrix<f64>) -> Result<Self> {
        expect_columns(coords, 3)?;
        self.with_points(rows_to_points3(coords, |v| v))
    }
}

impl PointSet for PointCloud<f32> {
    fn to_matrix(&self) -> DMatrix<f64> {
        DMatrix::from_fn(self.len(), 3, |i, d| self.points[i][d] as f64)
    }

    fn with_coordinates(&self, coords: &DMatrix<f64>) -> Result<Self> {
        expect_columns(coords, 3)?;
        self.with_points(rows_to_points3(coords, |v| v as f32))
    }
}

fn rows_to_points3<T: nalgebra::Scalar>(
    coords: &DMatrix<f64>,
    cast: impl Fn(f64) -> T,
) -> Vec<Point3<T>> {
    coords
        .row_iter()
        .map(|r| Point3::new(cast(r[0]), cast(r[1]), cast(r[2])))
        .collect()
}

fn expect_columns(coords: &DMatrix<f64>, ndim: usize) -> Result<()> {
    if coords.ncols() == ndim {
        Ok(())
    } else {
        Err(Error::dimension_mismatch(ndim, coords.ncols()))
    }
}
