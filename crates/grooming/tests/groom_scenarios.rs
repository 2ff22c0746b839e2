//! End-to-end grooming scenarios against in-memory host collaborators.

use std::collections::HashMap;

use glam::{Vec2, Vec3};
use grooming::{
    GroomParameter, GroomSettings, GroomState, InstanceTransform, PerspectiveViewpoint,
    PointerEvent, RenderHandle, RenderHost, RenderStrategyKind, Strand, StrandMesh, SurfaceHit,
    SurfaceRaycast, TriangleSurface,
};

/// Render host that records every call and checks resource hygiene.
#[derive(Default)]
struct RecordingHost {
    next: u64,
    /// Allocation kind per live handle
    live: HashMap<RenderHandle, &'static str>,
    attached: Vec<RenderHandle>,
    releases: HashMap<RenderHandle, u32>,
    allocations: u32,
    last_instances: Vec<InstanceTransform>,
    last_mesh: Option<StrandMesh>,
}

impl RecordingHost {
    fn allocate(&mut self, kind: &'static str) -> RenderHandle {
        self.next += 1;
        self.allocations += 1;
        let handle = RenderHandle(self.next);
        self.live.insert(handle, kind);
        handle
    }

    fn live_of(&self, kind: &str) -> usize {
        self.live.values().filter(|k| **k == kind).count()
    }
}

impl RenderHost for RecordingHost {
    fn create_instance_buffer(&mut self, _capacity: usize) -> RenderHandle {
        self.allocate("instances")
    }

    fn write_instances(&mut self, handle: RenderHandle, instances: &[InstanceTransform]) {
        assert!(self.live.contains_key(&handle), "write to dead buffer");
        self.last_instances = instances.to_vec();
    }

    fn create_mesh(&mut self, mesh: &StrandMesh) -> RenderHandle {
        self.last_mesh = Some(mesh.clone());
        self.allocate("mesh")
    }

    fn attach(&mut self, handle: RenderHandle) {
        assert!(!self.attached.contains(&handle));
        self.attached.push(handle);
    }

    fn detach(&mut self, handle: RenderHandle) {
        assert!(self.attached.contains(&handle), "detach of unattached handle");
        self.attached.retain(|h| *h != handle);
    }

    fn release(&mut self, handle: RenderHandle) {
        assert!(!self.attached.contains(&handle), "release while attached");
        assert!(self.live.remove(&handle).is_some(), "release of dead handle");
        *self.releases.entry(handle).or_default() += 1;
    }
}

const DT: f32 = 1.0 / 60.0;

fn top_hit() -> SurfaceHit {
    SurfaceHit {
        point: Vec3::new(0.0, 1.0, 0.0),
        normal: Vec3::Y,
        object: 0,
    }
}

fn still_air(mut settings: GroomSettings) -> GroomSettings {
    settings.wind_strength = 0.0;
    settings.frizz = 0.0;
    settings
}

/// Largest deviation from rest length over all pairs; NaN if any pair is NaN.
fn max_length_error(strand: &Strand) -> f32 {
    let mut worst = 0.0f32;
    for i in 0..strand.segment_count() - 1 {
        let length = strand.segments[i].position.distance(strand.segments[i + 1].position);
        let error = (length - strand.rest_length(i)).abs();
        if error.is_nan() || error > worst {
            worst = error;
        }
    }
    worst
}

#[test]
fn scenario_a_stroke_creates_exact_count() {
    let mut settings = GroomSettings::default();
    settings.brush_radius = 0.5;
    // pi * 0.25 * 4.0 = 3.14
    settings.density = 4.0;
    let mut state = GroomState::with_seed(settings, 100);

    let added = state.groom_at(&top_hit());
    assert_eq!(added, 3);
    assert_eq!(state.strand_count(), 3);

    let spacing = state.settings().min_root_spacing;
    let roots: Vec<Vec3> = state.strands().iter().map(|s| s.root_position).collect();
    for (i, a) in roots.iter().enumerate() {
        assert!(a.distance(top_hit().point) <= 0.5 + 1e-5);
        for b in &roots[i + 1..] {
            assert!(a.distance(*b) >= spacing);
        }
    }
}

#[test]
fn scenario_b_gravity_keeps_chain_connected() {
    let mut settings = still_air(GroomSettings::default());
    settings.segment_count = 5;
    settings.segment_length = 0.05;
    settings.max_strands = 1;
    let mut state = GroomState::with_seed(settings, 200);
    assert_eq!(state.groom_at(&top_hit()), 1);

    let root = state.strands()[0].root_position;
    for _ in 0..100 {
        state.simulate(DT);

        let strand = &state.strands()[0];
        assert_eq!(strand.segments[0].position, root);
        for i in 0..strand.segment_count() - 1 {
            let length = strand.segments[i].position.distance(strand.segments[i + 1].position);
            assert!(length <= 2.0 * strand.rest_length(i), "pair {} stretched to {}", i, length);
        }
    }
    assert_eq!(state.strands()[0].root_position, root);
}

#[test]
fn scenario_c_disable_halts_and_resume_continues() {
    let mut settings = still_air(GroomSettings::default());
    settings.max_strands = 4;
    let mut state = GroomState::with_seed(settings, 300);
    state.groom_at(&top_hit());

    for _ in 0..10 {
        assert!(state.simulate(DT).is_some());
    }
    assert!(state.set_parameter(GroomParameter::SimulationEnabled(false)));
    let paused = state.strands().to_vec();
    let cursor = state.scheduler().cursor();

    for _ in 0..10 {
        assert!(state.simulate(DT).is_none());
    }
    assert_eq!(state.strands(), paused.as_slice());
    assert_eq!(state.scheduler().cursor(), cursor);

    state.set_parameter(GroomParameter::SimulationEnabled(true));
    // Paused state is the continuation point, not the rest pose
    let deviations: Vec<f32> = state
        .strands()
        .iter()
        .flat_map(|strand| {
            (1..strand.segment_count())
                .map(|i| strand.segments[i].position.distance(strand.ideal_position(i)))
        })
        .collect();
    assert!(deviations.iter().all(|d| d.is_finite()));
    assert!(deviations.iter().any(|d| *d > 1e-6));

    let tick = state.simulate(DT).expect("simulation resumed");
    assert_eq!(tick.simulated, 4);
    assert_eq!(state.scheduler().cursor(), cursor + 1);
    assert_eq!(state.strand_count(), paused.len());
}

#[test]
fn scenario_d_capacity_clamps_stroke() {
    let mut settings = GroomSettings::default();
    settings.max_strands = 9;
    let mut state = GroomState::with_seed(settings, 400);
    assert_eq!(state.groom_at(&top_hit()), 9);

    state.set_parameter(GroomParameter::MaxStrands(10));
    state.set_parameter(GroomParameter::MaxStrandsPerStroke(5));
    let elsewhere = SurfaceHit {
        point: Vec3::new(0.0, 1.0, 3.0),
        ..top_hit()
    };
    assert_eq!(state.groom_at(&elsewhere), 1);
    assert_eq!(state.strand_count(), 10);
    assert_eq!(state.groom_at(&elsewhere), 0);
}

#[test]
fn scenario_e_switching_strategy_releases_once() {
    let mut settings = GroomSettings::default();
    settings.max_strands = 32;
    let mut state = GroomState::with_seed(settings, 500);
    let mut host = RecordingHost::default();
    state.groom_at(&top_hit());

    assert!(state.render_sync(&mut host));
    assert_eq!(host.live_of("instances"), 1);
    assert_eq!(host.last_instances.len(), 32);
    let buffer = *host.live.keys().next().unwrap();

    state.set_parameter(GroomParameter::RenderStrategy(RenderStrategyKind::Merged));
    assert!(state.render_sync(&mut host));
    assert_eq!(host.releases.get(&buffer), Some(&1));
    assert_eq!(host.live_of("instances"), 0);
    assert_eq!(host.live_of("mesh"), 1);
    assert_eq!(host.attached.len(), 1);
    assert!(host.last_mesh.as_ref().is_some_and(|mesh| !mesh.is_empty()));

    // Rebuilding the merged mesh swaps, never accumulates
    state.simulate(DT);
    state.render_sync(&mut host);
    assert_eq!(host.live.len(), 1);

    state.set_parameter(GroomParameter::RenderStrategy(RenderStrategyKind::Instanced));
    state.render_sync(&mut host);
    assert_eq!(host.live_of("mesh"), 0);
    assert_eq!(host.live_of("instances"), 1);
    assert!(host.releases.values().all(|count| *count == 1));

    state.release_render(&mut host);
    assert!(host.live.is_empty());
    assert!(host.attached.is_empty());
    assert_eq!(state.render().stats().live(), 0);
}

#[test]
fn pointer_stroke_grows_on_sphere() {
    let mut settings = GroomSettings::default();
    settings.max_strands_per_stroke = 8;
    let mut state = GroomState::with_seed(settings, 600);
    let surface = TriangleSurface::uv_sphere(Vec3::ZERO, 1.0, 24, 32);
    let camera = PerspectiveViewpoint::looking_at(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO);

    // Hover without the button: nothing happens
    assert_eq!(state.handle_pointer(PointerEvent::new(Vec2::ZERO, false), &camera, &surface), 0);

    let first = state.handle_pointer(PointerEvent::new(Vec2::ZERO, true), &camera, &surface);
    assert_eq!(first, 8);
    assert!(state.is_grooming());

    // Dragging off the sphere is a silent no-op
    let miss = state.handle_pointer(PointerEvent::new(Vec2::new(0.95, 0.95), true), &camera, &surface);
    assert_eq!(miss, 0);

    state.handle_pointer(PointerEvent::new(Vec2::ZERO, false), &camera, &surface);
    assert!(!state.is_grooming());

    for strand in state.strands() {
        // Roots sit on the front of the sphere, growing outward
        assert!(strand.root_position.z > 0.5);
        assert!(strand.root_normal.z > 0.5);
    }
}

#[test]
fn capacity_never_exceeded_by_strokes() {
    let mut settings = GroomSettings::default();
    settings.max_strands = 50;
    settings.brush_radius = 0.4;
    let mut state = GroomState::with_seed(settings, 700);
    let surface = TriangleSurface::uv_sphere(Vec3::ZERO, 1.0, 16, 24);
    let camera = PerspectiveViewpoint::looking_at(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO);

    for step in 0..20 {
        let x = (step as f32 * 0.7).sin() * 0.15;
        let y = (step as f32 * 0.3).cos() * 0.15;
        state.handle_pointer(PointerEvent::new(Vec2::new(x, y), true), &camera, &surface);
        assert!(state.strand_count() <= 50);
    }
    assert_eq!(state.strand_count(), 50);
}

#[test]
fn render_sync_is_idempotent() {
    let mut settings = GroomSettings::default();
    settings.max_strands = 8;
    let mut state = GroomState::with_seed(settings, 800);
    let mut host = RecordingHost::default();
    state.groom_at(&top_hit());

    assert!(state.render_sync(&mut host));
    let first = host.last_instances.clone();
    let allocations = host.allocations;

    // Nothing changed, nothing is due
    assert!(!state.render_sync(&mut host));
    assert_eq!(host.last_instances, first);
    assert_eq!(host.allocations, allocations);
    assert_eq!(state.render().instances(), Some(first.as_slice()));
}

#[test]
fn lengths_converge_under_static_forces() {
    let mut settings = still_air(GroomSettings::default());
    settings.gravity = 0.0;
    settings.wave = 0.4;
    settings.max_strands = 3;
    let mut state = GroomState::with_seed(settings, 900);
    state.groom_at(&top_hit());

    // Knock the strands out of shape through the undo path
    let mut snapshot = state.snapshot();
    for (n, strand) in snapshot.strands.iter_mut().enumerate() {
        for (i, segment) in strand.segments.iter_mut().enumerate().skip(2) {
            segment.position += Vec3::new(0.01 * n as f32, 0.0, 0.004 * i as f32);
        }
    }
    state.restore(&snapshot).unwrap();

    for _ in 0..600 {
        state.simulate(DT);
    }
    for strand in state.strands() {
        assert_eq!(strand.segments[0].position, strand.root_position);
        for i in 0..strand.segment_count() - 1 {
            let length = strand.segments[i].position.distance(strand.segments[i + 1].position);
            assert!(
                (length - strand.rest_length(i)).abs() < 1e-3,
                "strand {:?} pair {} at {} vs rest {}",
                strand.id,
                i,
                length,
                strand.rest_length(i)
            );
        }
    }
}

#[test]
fn same_seed_grows_same_groom() {
    let mut settings = GroomSettings::default();
    settings.curl = 1.0;
    settings.frizz = 0.4;
    settings.wave = 0.3;
    let mut a = GroomState::with_seed(settings.clone(), 42);
    let mut b = GroomState::with_seed(settings, 42);

    a.groom_at(&top_hit());
    b.groom_at(&top_hit());
    assert_eq!(a.strands(), b.strands());
}

#[test]
fn snapshot_json_restores_population() {
    let mut settings = GroomSettings::default();
    settings.max_strands = 5;
    let mut state = GroomState::with_seed(settings, 1000);
    state.groom_at(&top_hit());
    for _ in 0..5 {
        state.simulate(DT);
    }
    let json = state.snapshot().to_json().unwrap();
    let before = state.strands().to_vec();

    state.clear();
    state.restore_json(&json).unwrap();
    assert_eq!(state.strand_count(), before.len());
    for (restored, original) in state.strands().iter().zip(&before) {
        assert_eq!(restored.id, original.id);
        assert_eq!(restored.root_position, original.root_position);
        for (r, o) in restored.segments.iter().zip(&original.segments) {
            assert_eq!(r.position, o.position);
            assert_eq!(r.velocity, o.velocity);
        }
    }
}

#[test]
fn long_run_gravity_keeps_lengths_on_top_and_side() {
    let mut settings = GroomSettings::default();
    settings.max_strands_per_stroke = 6;
    let mut state = GroomState::with_seed(settings, 1100);
    let sphere = TriangleSurface::uv_sphere(Vec3::ZERO, 1.0, 24, 32);
    state.set_anchor(sphere.anchor_body());

    let side_hit = SurfaceHit {
        point: Vec3::X,
        normal: Vec3::X,
        object: 0,
    };
    assert_eq!(state.groom_at(&top_hit()), 6);
    assert_eq!(state.groom_at(&side_hit), 6);
    assert!(state.strands().iter().all(|s| s.segment_count() == 8));

    // One simulated minute
    for tick in 0..3600 {
        state.simulate(DT);
        for strand in state.strands() {
            let error = max_length_error(strand);
            assert!(
                error < 1e-3,
                "tick {} strand {:?}: length error {}",
                tick,
                strand.id,
                error
            );
            assert_eq!(strand.segments[0].position, strand.root_position);
        }
    }

    for strand in &state.strands()[6..] {
        // Side strands sag below their rest pose
        let rest_tip = strand.ideal_position(strand.segment_count() - 1);
        assert!(strand.tip().y < rest_tip.y);
    }
}

#[test]
fn plane_stroke_strands_stay_rooted() {
    let mut settings = GroomSettings::default();
    settings.max_strands_per_stroke = 10;
    let mut state = GroomState::with_seed(settings, 1200);
    let plane = TriangleSurface::plane(0.0, 2.0);
    let camera = PerspectiveViewpoint::looking_at(Vec3::new(0.0, 4.0, 0.0), Vec3::ZERO);

    assert_eq!(state.handle_pointer(PointerEvent::new(Vec2::ZERO, true), &camera, &plane), 10);
    state.handle_pointer(PointerEvent::new(Vec2::ZERO, false), &camera, &plane);
    let body = state.anchor().expect("anchor taken from the plane");
    assert!((body.radius - 2.0 * 2.0f32.sqrt()).abs() < 1e-4);

    for _ in 0..600 {
        state.simulate(DT);
    }
    for strand in state.strands() {
        let error = max_length_error(strand);
        assert!(error < 1e-3, "strand {:?}: length error {}", strand.id, error);

        let reach: f32 = (0..strand.segment_count() - 1).map(|i| strand.rest_length(i)).sum();
        let tip = strand.tip().distance(strand.root_position);
        assert!(tip <= reach + 1e-3, "strand {:?} tip {} beyond reach {}", strand.id, tip, reach);
    }
}

#[test]
fn merged_rebuilds_wait_for_update_interval() {
    let mut settings = GroomSettings::default();
    settings.max_strands = 8;
    settings.render_strategy = RenderStrategyKind::Merged;
    let mut state = GroomState::with_seed(settings, 1300);
    let mut host = RecordingHost::default();
    state.groom_at(&top_hit());
    assert!(state.render_sync(&mut host));
    assert_eq!(state.render().stats().rebuilds, 1);

    // One second of physics at 60 ticks; the 0.1 s interval allows ten rebuilds
    let mut synced = 0;
    for _ in 0..60 {
        state.simulate(DT);
        if state.render_sync(&mut host) {
            synced += 1;
        }
    }
    assert!((5..=10).contains(&synced), "{} merged rebuilds", synced);
    assert_eq!(state.render().stats().rebuilds, 1 + synced as u64);
    assert_eq!(host.live_of("mesh"), 1);

    // Grooming still forces an immediate rebuild
    state.set_parameter(GroomParameter::MaxStrands(16));
    state.groom_at(&SurfaceHit {
        point: Vec3::new(0.0, 1.0, 2.0),
        ..top_hit()
    });
    assert!(state.render_sync(&mut host));
}
