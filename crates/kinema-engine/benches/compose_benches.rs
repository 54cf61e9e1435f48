use criterion::{criterion_group, criterion_main, Criterion};
use kinema_core::{Element, Vec3};
use kinema_engine::{render_range, CollectingSink, Compositor, IndexDivider, InMemoryLoader};
use kinema_ir::{template, EntityBuilder, SceneBuilder, SceneDescriptor};

fn molecule(n: usize) -> Vec<Element> {
    (0..n)
        .map(|i| {
            let a = i as f64 * 0.7;
            Element::new("C", Vec3::new(a.cos() * 3.0, a.sin() * 3.0, i as f64 * 0.2))
        })
        .collect()
}

/// One reaction: a body that sheds two fragments, spins and absorbs a partner.
fn reaction() -> SceneDescriptor {
    SceneBuilder::new()
        .entity(
            EntityBuilder::body("ethanol", "ethanol.json")
                .key(0, [70.0, 0.0, 0.0])
                .key(30, [30.0, 0.0, 0.0])
                .join(60, [0.0, 0.0, 0.0], &["water"])
                .key(120, [-40.0, 10.0, 0.0])
                .rotation(0, [0.0; 3], [0.0; 3])
                .rotation(90, [1.0, 1.0, 1.0], [6.28, 6.28, 6.28])
                .labeled()
                .build(),
        )
        .entity(
            EntityBuilder::fragment("h1", "ethanol", &[8])
                .key(20, [0.0; 3])
                .key(50, [-10.0, 5.0, 0.0])
                .build(),
        )
        .entity(
            EntityBuilder::fragment("h2", "ethanol", &[5])
                .key(25, [0.0; 3])
                .key(55, [-10.0, -5.0, 0.0])
                .build(),
        )
        .entity(
            EntityBuilder::body("water", "water.json")
                .key(0, [-30.0, -70.0, 0.0])
                .key(60, [0.0, 0.0, 0.0])
                .build(),
        )
        .build()
}

fn create_scene(copies: usize) -> SceneDescriptor {
    let mut scene = SceneBuilder::new().frames(0, 240).build();
    for i in 0..copies {
        let copy = template::instantiate(&reaction(), &format!("_{i}"), i as u64 * 10);
        scene.merge(copy).unwrap();
    }
    scene
}

fn create_compositor(scene: SceneDescriptor) -> Compositor {
    let loader = InMemoryLoader::new()
        .with_body("ethanol.json", molecule(9))
        .with_body("water.json", molecule(3));
    Compositor::new(scene, Box::new(loader), Box::new(IndexDivider)).unwrap()
}

fn bench_compose(c: &mut Criterion) {
    let mut group = c.benchmark_group("kinema_compose");
    group.sample_size(10);

    for copies in [1usize, 8] {
        group.bench_function(format!("{copies}_reactions_240_frames"), |b| {
            b.iter_custom(|iters| {
                let mut total_duration = std::time::Duration::from_nanos(0);

                for _ in 0..iters {
                    let scene = create_scene(copies);
                    let range = scene.frame_range();
                    let mut compositor = create_compositor(scene);
                    let mut sink = CollectingSink::new();

                    let start = std::time::Instant::now();
                    render_range(&mut compositor, range, &mut sink).unwrap();
                    total_duration += start.elapsed();
                }

                total_duration
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_compose);
criterion_main!(benches);
