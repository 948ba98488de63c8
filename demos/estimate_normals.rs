//! Normal Estimation Demo
//!
//! Estimates normals for a noisy synthetic scan of two perpendicular walls,
//! prints the estimation report and writes the oriented points to
//! `walls.nor` in the working directory.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Instant;
use tetrarecon_algorithms::{ManagerConfig, OrientationReference, PointCloudManager};
use tetrarecon_core::Point3f;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let points = create_walls(4000, 0.003);
    println!("Created {} points on two walls", points.len());

    // The sensor looks at the corner from the front
    let sensor = Point3f::new(2.0, 2.0, 0.5);
    let config = ManagerConfig::default()
        .with_kn(15)
        .with_ki(15)
        .with_orientation(OrientationReference::Viewpoint(sensor));

    let start = Instant::now();
    let manager = PointCloudManager::new(points, None, config)?;
    println!("Estimated normals in {:?}", start.elapsed());

    if let Some(report) = manager.normal_report() {
        println!("  expanded neighborhoods:  {}", report.expanded);
        println!("  ill-shaped neighborhoods: {}", report.ill_shaped);
        println!("  degenerate fits:         {}", report.degenerate);
        println!("  interpolation fallbacks: {}", report.interpolation_fallbacks);
    }

    let facing = manager
        .points()
        .iter()
        .zip(manager.normals())
        .filter(|(p, n)| n.dot(&(sensor - **p)) > 0.0)
        .count();
    println!("{} of {} normals face the sensor", facing, manager.len());

    for query in [Point3f::new(0.5, 0.5, 0.5), Point3f::new(-0.5, 0.5, 0.5)] {
        match manager.distance(&query) {
            Ok(d) => println!("distance at {:?}: {:.4} (anchor {:.4})", query.coords, d.projected, d.euclidean),
            Err(e) => println!("distance at {:?} failed: {}", query.coords, e),
        }
    }

    manager.save("walls.nor")?;
    println!("Saved oriented points to walls.nor");
    Ok(())
}

/// Points on the planes x = 0 and y = 0 meeting along the z axis
fn create_walls(count: usize, noise: f32) -> Vec<Point3f> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..count)
        .map(|i| {
            let u: f32 = rng.gen_range(0.0..1.0);
            let z: f32 = rng.gen_range(0.0..1.0);
            let d: f32 = rng.gen_range(-noise..noise);
            if i % 2 == 0 {
                Point3f::new(d, u, z)
            } else {
                Point3f::new(u, d, z)
            }
        })
        .collect()
}
