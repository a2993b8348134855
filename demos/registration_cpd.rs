//! Example: Coherent Point Drift registration
//!
//! Run with: cargo run --example registration_cpd

use cv_cpd::registration::{registration_cpd, transform, CpdOption, CpdParams, TransformType};
use cv_core::PointCloud;
use nalgebra::{Point3, Rotation3, Vector3};

fn main() -> cv_core::Result<()> {
    println!("=== CPD Registration Example ===\n");

    cv_cpd::init_thread_pool(None)?;

    // Source: a jittered box of points
    let mut source_points = Vec::new();
    for x in 0..5 {
        for y in 0..4 {
            for z in 0..3 {
                let jitter = ((x * 13 + y * 7 + z * 3) % 10) as f64 * 0.01;
                source_points.push(Point3::new(
                    x as f64 * 0.2 + jitter,
                    y as f64 * 0.25,
                    z as f64 * 0.3 - jitter,
                ));
            }
        }
    }

    // Target: source rotated, scaled and shifted
    let rotation = Rotation3::from_euler_angles(0.1, -0.2, 0.5);
    let translation = Vector3::new(0.3, -0.2, 0.1);
    let target_points = source_points
        .iter()
        .map(|p| Point3::from((rotation * p.coords) * 1.1 + translation))
        .collect();

    let source = PointCloud::new(source_points);
    let target = PointCloud::new(target_points);

    println!("Source points: {}", source.len());
    println!("Target points: {}", target.len());

    for transform_type in [TransformType::Rigid, TransformType::Affine] {
        let result = registration_cpd(&source, &target, transform_type, &CpdOption::precise())?;

        println!("\n{} registration:", transform_type);
        println!("  State: {:?}", result.state);
        println!("  Iterations: {}", result.num_iterations);

        match &result.params {
            CpdParams::Rigid(rigid) => {
                println!("  Scale: {:.4}", rigid.scale);
                println!("  Translation: {:.4?}", rigid.t.as_slice());
                println!("  Homogeneous transformation:");
                let h = rigid.to_homogeneous();
                for i in 0..4 {
                    println!(
                        "  [{:.4}, {:.4}, {:.4}, {:.4}]",
                        h[(i, 0)],
                        h[(i, 1)],
                        h[(i, 2)],
                        h[(i, 3)]
                    );
                }
            }
            CpdParams::Affine(affine) => {
                println!("  Affine matrix: {:.4}", affine.affine);
                println!("  Translation: {:.4?}", affine.t.as_slice());
            }
            CpdParams::NonRigid(_) => {}
        }

        let aligned = transform(&source, &result.params)?;
        let rmse = (aligned
            .points
            .iter()
            .zip(target.points.iter())
            .map(|(a, b)| (a - b).norm_squared())
            .sum::<f64>()
            / aligned.len() as f64)
            .sqrt();
        println!("  RMSE after alignment: {:.6}", rmse);
    }

    Ok(())
}
