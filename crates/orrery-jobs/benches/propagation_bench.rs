use criterion::{black_box, criterion_group, criterion_main, Criterion};
use orrery_core::math::{Aabb, Quaternion, Vec3};
use orrery_data::{Scene, Transform};
use orrery_jobs::{expand_bounding_volumes, update_world_transforms, update_world_transforms_per_level};

/// Builds `roots` trees, each a wide fan-out `depth` levels deep.
fn build_scene(roots: usize, fan_out: usize, depth: usize) -> Scene {
    let mut scene = Scene::new();
    let unit = Aabb::from_center_half_extents(Vec3::ZERO, Vec3::splat(0.5));

    for r in 0..roots {
        let root = scene.spawn(Transform::from_translation(Vec3::new(r as f32 * 10.0, 0.0, 0.0)));
        let mut frontier = vec![root];
        for d in 0..depth {
            let mut next = Vec::with_capacity(frontier.len() * fan_out);
            for &parent in &frontier {
                for i in 0..fan_out {
                    let t = Transform::new(
                        Vec3::new(i as f32, 1.0, 0.0),
                        Quaternion::from_axis_angle(Vec3::Y, 0.1 * d as f32),
                        Vec3::ONE,
                    );
                    // Parents were spawned above, so this cannot fail.
                    if let Ok(child) = scene.spawn_child(parent, t) {
                        let _ = scene.set_local_bounds(child, unit);
                        next.push(child);
                    }
                }
            }
            frontier = next;
        }
    }
    scene
}

fn bench_propagation(c: &mut Criterion) {
    // 8 roots * (1 + 4 + 16 + 64 + 256) nodes
    let mut scene = build_scene(8, 4, 4);

    let mut group = c.benchmark_group("Transform propagation");

    group.bench_function("Depth-first", |b| {
        b.iter(|| black_box(update_world_transforms(&mut scene)));
    });

    group.bench_function("Per-level (rayon)", |b| {
        b.iter(|| black_box(update_world_transforms_per_level(&mut scene)));
    });

    group.bench_function("Expand bounding volumes", |b| {
        b.iter(|| black_box(expand_bounding_volumes(&mut scene)));
    });

    group.finish();
}

criterion_group!(benches, bench_propagation);
criterion_main!(benches);
