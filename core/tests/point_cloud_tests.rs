use cv_core::point_cloud::PointCloud;
use nalgebra::{Point3, Vector3};

#[test]
fn test_point_cloud_result_handling() {
    let points = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0)];
    let cloud = PointCloud::new(points);

    let colors = vec![Point3::new(1.0, 0.0, 0.0), Point3::new(0.0, 1.0, 0.0)];
    assert!(cloud.clone().with_colors(colors).is_ok());

    let bad_colors = vec![Point3::new(1.0, 0.0, 0.0)];
    let err = cloud.clone().with_colors(bad_colors).unwrap_err();
    assert!(err.to_string().contains("Color count 1"));

    let bad_normals = vec![Vector3::new(0.0, 0.0, 1.0)];
    let err = cloud.with_normals(bad_normals).unwrap_err();
    assert!(err.to_string().contains("Normal count"));
}

#[test]
fn test_with_points_keeps_colors_and_drops_normals() {
    let cloud = PointCloud::new(vec![Point3::new(0.0f64, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)])
        .with_colors(vec![Point3::new(1.0, 0.0, 0.0), Point3::new(0.0, 0.0, 1.0)])
        .unwrap()
        .with_normals(vec![Vector3::z(), Vector3::z()])
        .unwrap();

    let moved = cloud
        .with_points(vec![Point3::new(5.0, 0.0, 0.0), Point3::new(6.0, 0.0, 0.0)])
        .unwrap();
    assert_eq!(moved.len(), 2);
    assert_eq!(moved.colors, cloud.colors);
    assert!(moved.normals.is_none());

    // colour count must still line up with the new points
    assert!(cloud.with_points(vec![Point3::origin()]).is_err());
}

#[test]
fn test_centroid() {
    let empty: PointCloud<f64> = PointCloud::default();
    assert!(empty.centroid().is_none());

    let cloud = PointCloud::new(vec![
        Point3::new(0.0f64, 0.0, 0.0),
        Point3::new(2.0, 0.0, 0.0),
        Point3::new(1.0, 3.0, 0.0),
    ]);
    let c = cloud.centroid().unwrap();
    assert!((c - Point3::new(1.0, 1.0, 0.0)).norm() < 1e-12);
}
