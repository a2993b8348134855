use nalgebra::{Point3, RealField, Scalar, Vector3};

/// Ordered 3-D point set with optional per-point colours and normals.
#[derive(Debug, Clone, Default)]
pub struct PointCloud<T: Scalar = f32> {
    pub points: Vec<Point3<T>>,
    pub colors: Option<Vec<Point3<T>>>,
    pub normals: Option<Vec<Vector3<T>>>,
}

impl<T: Scalar> PointCloud<T> {
    pub fn new(points: Vec<Point3<T>>) -> Self {
        Self {
            points,
            colors: None,
            normals: None,
        }
    }

    pub fn with_colors(mut self, colors: Vec<Point3<T>>) -> crate::Result<Self> {
        check_count("Color", colors.len(), self.points.len())?;
        self.colors = Some(colors);
        Ok(self)
    }

    pub fn with_normals(mut self, normals: Vec<Vector3<T>>) -> crate::Result<Self> {
        check_count("Normal", normals.len(), self.points.len())?;
        self.normals = Some(normals);
        Ok(self)
    }

    /// Build a cloud with new coordinates, keeping the colours of `self`.
    ///
    /// Normals are not carried over: a general deformation of the points
    /// does not say how surface orientation changes.
    pub fn with_points(&self, points: Vec<Point3<T>>) -> crate::Result<Self> {
        let cloud = Self::new(points);
        match &self.colors {
            Some(colors) => cloud.with_colors(colors.clone()),
            None => Ok(cloud),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl<T: Scalar + RealField + Copy> PointCloud<T> {
    /// Arithmetic mean of the points, `None` for an empty cloud.
    pub fn centroid(&self) -> Option<Point3<T>> {
        if self.points.is_empty() {
            return None;
        }
        let sum = self
            .points
            .iter()
            .fold(Vector3::zeros(), |acc, p| acc + p.coords);
        let n: T = nalgebra::convert(self.points.len() as f64);
        Some(Point3::from(sum / n))
    }
}

fn check_count(what: &str, got: usize, expected: usize) -> crate::Result<()> {
    if got == expected {
        Ok(())
    } else {
        Err(crate::Error::InvalidInput(format!(
            "{what} count {got} does not match point count {expected}"
        )))
    }
}

pub type PointCloudf32 = PointCloud<f32>;
pub type PointCloudf64 = PointCloud<f64>;
