//! Sphere Reconstruction Demo
//!
//! Samples a unit sphere, reconstructs it with marching tetrahedra and writes
//! the mesh to `sphere.ply` in the working directory.

use std::time::Instant;
use tetrarecon_algorithms::parallel::{init_thread_pool, ThreadPoolConfig};
use tetrarecon_algorithms::{ManagerConfig, PointCloudManager};
use tetrarecon_core::Point3f;
use tetrarecon_reconstruction::{reconstruct, ReconstructionConfig, SamplingConfig};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Leave one core free for the rest of the system
    let threads = std::thread::available_parallelism().map_or(1, |n| n.get().saturating_sub(1).max(1));
    init_thread_pool(ThreadPoolConfig::default().with_threads(threads))?;

    let points = fibonacci_sphere(5000, 1.0);
    println!("Sampled {} points on the unit sphere", points.len());

    let start = Instant::now();
    let manager = PointCloudManager::new(points, None, ManagerConfig::default())?;
    let config = ReconstructionConfig::default()
        .with_sampling(SamplingConfig::default().with_voxel_size(0.05).with_max_distance(0.25));
    let reconstruction = reconstruct(&manager, &config)?;
    println!("Reconstructed in {:?}", start.elapsed());

    let mesh = &reconstruction.mesh;
    let report = &reconstruction.report;
    println!("  grid:        {:?}", report.grid_dimensions);
    println!("  failed:      {} samples", report.failed_samples);
    println!("  cells:       {} visited, {} skipped", report.extraction.cells_visited, report.extraction.cells_skipped);
    println!("  mesh:        {} vertices, {} triangles", mesh.vertex_count(), mesh.face_count());
    println!("  closed:      {}", mesh.is_closed());

    let worst = mesh
        .vertices
        .iter()
        .map(|p| (p.coords.norm() - 1.0).abs())
        .fold(0.0f32, f32::max);
    println!("  max radial error: {:.4}", worst);

    tetrarecon_io::write_mesh("sphere.ply", mesh)?;
    println!("Saved mesh to sphere.ply");
    Ok(())
}

fn fibonacci_sphere(count: usize, radius: f32) -> Vec<Point3f> {
    let golden = std::f32::consts::PI * (3.0 - 5.0f32.sqrt());
    (0..count)
        .map(|i| {
            let y = 1.0 - 2.0 * (i as f32 + 0.5) / count as f32;
            let r = (1.0 - y * y).sqrt();
            let theta = golden * i as f32;
            Point3f::new(r * theta.cos() * radius, y * radius, r * theta.sin() * radius)
        })
        .collect()
}
