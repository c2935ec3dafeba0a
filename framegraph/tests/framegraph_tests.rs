//! Frame graph integration tests.
//!
//! Frames are built from declarative [`TestScope`] producers and checked
//! through the [`FrameReport`].

mod common;

use std::collections::HashSet;

use common::{
    TestScope, Use, color_target, run_frame, run_frame_with, schedule_fingerprint, storage_buffer,
    system,
};
use rstest::rstest;
use scopegraph::{
    AttachmentId, Command, DeviceMask, FrameGraphConfig, FrameGraphError, FrameReport,
    HardwareQueueClass, HeapPlacement, ImageBindFlags, ImageDescriptor, Format, Interval, LoadOp,
    QueryPoolAttachmentKind, QueryType, ResourceState, ScopeAttachmentAccess as Access,
    ScopeAttachmentUsage, ScopeId, ValidationMode,
};

fn clear() -> LoadOp {
    LoadOp::clear_color(0.0, 0.0, 0.0, 1.0)
}

/// render -> blur -> tonemap -> present, each stage writing a transient
/// buffer the next stage reads. `stage_a` and `stage_c` never overlap.
fn post_chain() -> Vec<TestScope> {
    vec![
        TestScope::new("render")
            .create_buffer("stage_a", storage_buffer(4096))
            .uses(Use::Shader("stage_a", Access::Write)),
        TestScope::new("blur")
            .create_buffer("stage_b", storage_buffer(4096))
            .uses(Use::Shader("stage_a", Access::Read))
            .uses(Use::Shader("stage_b", Access::Write)),
        TestScope::new("tonemap")
            .create_buffer("stage_c", storage_buffer(4096))
            .uses(Use::Shader("stage_b", Access::Read))
            .uses(Use::Shader("stage_c", Access::Write)),
        TestScope::new("present").uses(Use::Shader("stage_c", Access::Read)),
    ]
}

/// Replay the frame against a byte-level model of each device's heap and
/// return which scope's data every read observed.
///
/// Panics if a read finds its attachment's bytes overwritten by another
/// transient.
fn replay_heap(report: &FrameReport) -> Vec<(String, String, String)> {
    // (device, placement, owner, writer scope)
    let mut heap: Vec<(u32, HeapPlacement, AttachmentId, String)> = Vec::new();
    let mut observed = Vec::new();

    for scheduled in report.scopes() {
        for attachment in &scheduled.attachments {
            let Some(placement) = attachment.placement else {
                continue;
            };
            if attachment.access.reads() {
                let writer = heap
                    .iter()
                    .find(|(device, range, owner, _)| {
                        *device == scheduled.device
                            && *range == placement
                            && *owner == attachment.attachment
                    })
                    .map(|(_, _, _, writer)| writer.clone())
                    .unwrap_or_else(|| {
                        panic!(
                            "'{}' read by '{}' was clobbered",
                            attachment.attachment, scheduled.scope
                        )
                    });
                observed.push((
                    scheduled.scope.to_string(),
                    attachment.attachment.to_string(),
                    writer,
                ));
            }
            if attachment.access.writes() {
                heap.retain(|(device, range, _, _)| {
                    *device != scheduled.device || !range.overlaps(&placement)
                });
                heap.push((
                    scheduled.device,
                    placement,
                    attachment.attachment.clone(),
                    scheduled.scope.to_string(),
                ));
            }
        }
    }
    observed
}

// ============================================================================
// Scheduling
// ============================================================================

#[test]
fn test_schedule_is_deterministic() {
    let mut first = system(1, FrameGraphConfig::default());
    let mut second = system(1, FrameGraphConfig::default());

    let mut scopes = post_chain();
    let a = run_frame(&mut first, &mut scopes).unwrap();
    let mut scopes = post_chain();
    let b = run_frame(&mut second, &mut scopes).unwrap();

    assert_eq!(a.scope_names(), vec!["render", "blur", "tonemap", "present"]);
    assert_eq!(schedule_fingerprint(&a), schedule_fingerprint(&b));
    assert_eq!(a.dependencies(), b.dependencies());
}

#[test]
fn test_recompiling_same_frame_is_idempotent() {
    let mut system = system(1, FrameGraphConfig::default());
    let mut scopes = post_chain();

    let first = run_frame(&mut system, &mut scopes).unwrap();
    let fingerprint = schedule_fingerprint(&first);
    let barriers: Vec<_> = first
        .barriers()
        .map(|barrier| (barrier.attachment.clone(), barrier.before, barrier.after))
        .collect();
    system.recycle(first);

    let second = run_frame(&mut system, &mut scopes).unwrap();
    assert_eq!(second.frame_index(), 1);
    assert_eq!(schedule_fingerprint(&second), fingerprint);
    let second_barriers: Vec<_> = second
        .barriers()
        .map(|barrier| (barrier.attachment.clone(), barrier.before, barrier.after))
        .collect();
    assert_eq!(second_barriers, barriers);

    for scope in &scopes {
        assert_eq!(scope.compiled, vec![0, 0]);
        assert_eq!(scope.unresolved_views, 0);
    }
}

#[test]
fn test_render_copy_composite_order() {
    let mut system = system(1, FrameGraphConfig::default());
    let mut scopes = vec![
        TestScope::new("render")
            .create_image("scene", color_target(64, 64))
            .uses(Use::Color("scene", clear())),
        TestScope::new("copy")
            .create_buffer("readback", storage_buffer(64 * 64 * 4))
            .uses(Use::Copy("scene", Access::Read))
            .uses(Use::Copy("readback", Access::Write)),
        TestScope::new("composite").uses(Use::Shader("readback", Access::Read)),
    ];

    let report = run_frame(&mut system, &mut scopes).unwrap();

    assert_eq!(report.scope_names(), vec!["render", "copy", "composite"]);
    assert!(report.has_dependency("render", "copy"));
    assert!(report.has_dependency("copy", "composite"));
    assert!(!report.has_dependency("render", "composite"));
}

#[test]
fn test_explicit_ordering_overrides_submission_order() {
    let mut system = system(1, FrameGraphConfig::default());
    let mut scopes = vec![
        TestScope::new("ui").after("shadows"),
        TestScope::new("shadows"),
        TestScope::new("sky").before("shadows"),
    ];

    let report = run_frame(&mut system, &mut scopes).unwrap();

    assert_eq!(report.scope_names(), vec!["sky", "shadows", "ui"]);
}

#[test]
fn test_empty_scope_is_kept_in_order() {
    let mut system = system(1, FrameGraphConfig::default());
    let mut scopes = vec![
        TestScope::new("opaque")
            .create_image("color", color_target(32, 32))
            .uses(Use::Color("color", clear())),
        // Nothing visible this frame.
        TestScope::new("occlusion_culled").items(0),
        TestScope::new("transparent").uses(Use::Color("color", LoadOp::Load)),
    ];

    let report = run_frame(&mut system, &mut scopes).unwrap();

    assert_eq!(
        report.scope_names(),
        vec!["opaque", "occlusion_culled", "transparent"]
    );
    let lists = report.scope_command_lists("occlusion_culled", 0);
    assert_eq!(lists.len(), 1);
    assert_eq!(lists[0].item_count(), 0);
    assert_eq!(scopes[1].executed, vec![(0, 0..0)]);
}

#[rstest]
#[case::execute_after(
    vec![TestScope::new("a").after("b"), TestScope::new("b").after("a")]
)]
#[case::execute_before(
    vec![TestScope::new("a").before("b"), TestScope::new("b").before("a")]
)]
fn test_ordering_cycle_is_reported(#[case] mut scopes: Vec<TestScope>) {
    let mut system = system(1, FrameGraphConfig::default());

    let err = run_frame(&mut system, &mut scopes).unwrap_err();

    assert_eq!(
        err,
        FrameGraphError::CyclicDependency(vec![ScopeId::from("a"), ScopeId::from("b")])
    );
    assert!(scopes.iter().all(|scope| scope.executed.is_empty()));
}

#[test]
fn test_unknown_ordering_target() {
    let mut system = system(1, FrameGraphConfig::default());
    let mut scopes = vec![TestScope::new("ui").after("missing")];

    let err = run_frame(&mut system, &mut scopes).unwrap_err();

    assert_eq!(
        err,
        FrameGraphError::UnknownScope {
            scope: ScopeId::from("ui"),
            referenced: ScopeId::from("missing"),
        }
    );
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn test_duplicate_transient_fails_frame() {
    let mut system = system(1, FrameGraphConfig::default());
    let mut scopes = vec![
        TestScope::new("first")
            .create_image("shared", color_target(8, 8))
            .uses(Use::Color("shared", clear())),
        TestScope::new("second")
            .create_image("shared", color_target(8, 8))
            .uses(Use::Color("shared", clear())),
    ];

    let err = run_frame(&mut system, &mut scopes).unwrap_err();

    assert_eq!(err, FrameGraphError::DuplicateAttachment("shared".into()));
    assert!(scopes[0].executed.is_empty());
}

#[test]
fn test_transient_read_before_write_fails() {
    let mut system = system(1, FrameGraphConfig::default());
    let mut scopes = vec![
        TestScope::new("reader")
            .create_buffer("garbage", storage_buffer(256))
            .uses(Use::Shader("garbage", Access::Read)),
    ];

    let err = run_frame(&mut system, &mut scopes).unwrap_err();

    assert_eq!(
        err,
        FrameGraphError::ReadBeforeWrite {
            scope: ScopeId::from("reader"),
            attachment: "garbage".into(),
            device: 0,
        }
    );
}

#[rstest]
#[case::color_load(
    TestScope::new("blend")
        .create_image("fresh", color_target(8, 8))
        .uses(Use::Color("fresh", LoadOp::Load))
)]
#[case::shader_read_write(
    TestScope::new("blend")
        .create_buffer("fresh", storage_buffer(256))
        .uses(Use::Shader("fresh", Access::ReadWrite))
)]
fn test_transient_first_use_must_not_read(#[case] scope: TestScope) {
    let mut system = system(1, FrameGraphConfig::default());
    let mut scopes = vec![scope];

    let err = run_frame(&mut system, &mut scopes).unwrap_err();

    assert_eq!(
        err,
        FrameGraphError::ReadBeforeWrite {
            scope: ScopeId::from("blend"),
            attachment: "fresh".into(),
            device: 0,
        }
    );
}

#[rstest]
#[case::color_on_buffer(Use::Color("buffer", LoadOp::Load))]
#[case::predication_on_image(Use::Other("image", ScopeAttachmentUsage::Predication, Access::Read))]
#[case::subpass_input_on_buffer(Use::Other(
    "buffer",
    ScopeAttachmentUsage::SubpassInput,
    Access::Read
))]
fn test_usage_must_match_attachment_kind(#[case] usage: Use) {
    let mut system = system(1, FrameGraphConfig::default());
    let mut scopes = vec![
        TestScope::new("producer")
            .create_image("image", color_target(8, 8))
            .create_buffer("buffer", storage_buffer(256))
            .uses(Use::Color("image", clear()))
            .uses(Use::Shader("buffer", Access::Write)),
        TestScope::new("consumer").uses(usage),
    ];

    let err = run_frame(&mut system, &mut scopes).unwrap_err();

    assert!(
        matches!(
            err,
            FrameGraphError::InvalidUsage { ref scope, .. } if scope.as_str() == "consumer"
        ),
        "unexpected error: {err}"
    );
}

#[test]
fn test_undeclared_attachment_fails() {
    let mut system = system(1, FrameGraphConfig::default());
    let mut scopes = vec![TestScope::new("orphan").uses(Use::Shader("nowhere", Access::Read))];

    let err = run_frame(&mut system, &mut scopes).unwrap_err();

    assert_eq!(err, FrameGraphError::UnknownAttachment("nowhere".into()));
}

#[test]
fn test_imported_image_bind_flags_are_checked() {
    let mut system = system(1, FrameGraphConfig::default());
    let history = system
        .device_group()
        .create_image(
            "history",
            &ImageDescriptor::new_2d(ImageBindFlags::SHADER_READ, 16, 16, Format::Rgba16Float),
            DeviceMask::single(0),
        )
        .unwrap();
    let mut scopes = vec![TestScope::new("taa").uses(Use::Color("history", LoadOp::Load))];

    let err = run_frame_with(&mut system, &mut scopes, |database| {
        database.import_image("history", &history).unwrap();
    })
    .unwrap_err();

    assert_eq!(
        err,
        FrameGraphError::IncompatibleBindFlags {
            scope: ScopeId::from("taa"),
            attachment: "history".into(),
            usage: ScopeAttachmentUsage::Color,
        }
    );
}

#[test]
#[should_panic(expected = "frame graph validation failed")]
fn test_strict_validation_panics() {
    let mut system = system(
        1,
        FrameGraphConfig::default().with_validation(ValidationMode::Strict),
    );
    let mut scopes = vec![TestScope::new("orphan").uses(Use::Shader("nowhere", Access::Read))];

    let _ = run_frame(&mut system, &mut scopes);
}

#[test]
fn test_failed_frame_does_not_block_next_frame() {
    let mut system = system(1, FrameGraphConfig::default());
    let mut broken = vec![TestScope::new("orphan").uses(Use::Shader("nowhere", Access::Read))];
    assert!(run_frame(&mut system, &mut broken).is_err());

    let mut scopes = post_chain();
    let report = run_frame(&mut system, &mut scopes).unwrap();
    assert_eq!(report.frame_index(), 1);
    assert_eq!(report.scopes().len(), 4);
}

// ============================================================================
// Transient Aliasing
// ============================================================================

#[test]
fn test_aliasing_preserves_observed_data() {
    let mut aliased_system = system(1, FrameGraphConfig::default());
    let mut plain_system = system(1, FrameGraphConfig::default().with_aliasing(false));

    let mut scopes = post_chain();
    let aliased = run_frame(&mut aliased_system, &mut scopes).unwrap();
    let mut scopes = post_chain();
    let plain = run_frame(&mut plain_system, &mut scopes).unwrap();

    let observed = replay_heap(&aliased);
    assert_eq!(observed, replay_heap(&plain));
    assert_eq!(
        observed,
        vec![
            ("blur".into(), "stage_a".into(), "render".into()),
            ("tonemap".into(), "stage_b".into(), "blur".into()),
            ("present".into(), "stage_c".into(), "tonemap".into()),
        ]
    );
    assert_eq!(aliased.scope_names(), plain.scope_names());
}

#[test]
fn test_aliasing_shrinks_heap() {
    let mut aliased_system = system(1, FrameGraphConfig::default());
    let mut plain_system = system(1, FrameGraphConfig::default().with_aliasing(false));

    let mut scopes = post_chain();
    let aliased = run_frame(&mut aliased_system, &mut scopes).unwrap();
    let mut scopes = post_chain();
    let plain = run_frame(&mut plain_system, &mut scopes).unwrap();

    let aliased_stats = &aliased.heap_statistics()[0];
    let plain_stats = &plain.heap_statistics()[0];
    assert_eq!(aliased_stats.attachment_count, 3);
    assert_eq!(aliased_stats.heap_size, 8192);
    assert_eq!(aliased_stats.saved_bytes(), 4096);
    assert_eq!(plain_stats.heap_size, 12288);
    assert_eq!(plain_stats.saved_bytes(), 0);

    let stage_a = aliased.scope("render", 0).unwrap().attachments[0].placement;
    let stage_c = aliased.scope("tonemap", 0).unwrap().attachments[1].placement;
    assert_eq!(stage_a.map(|p| p.offset), stage_c.map(|p| p.offset));
}

#[rstest]
#[case::unordered_queues(false)]
#[case::ordered_by_request(true)]
fn test_aliasing_respects_queue_ordering(#[case] ordered: bool) {
    let mut system = system(1, FrameGraphConfig::default());
    let mut draw = TestScope::new("draw")
        .create_buffer("vertices", storage_buffer(4096))
        .uses(Use::Shader("vertices", Access::Write));
    if ordered {
        draw = draw.after("integrate");
    }
    let mut scopes = vec![
        TestScope::new("simulate")
            .on_queue(HardwareQueueClass::Compute)
            .create_buffer("forces", storage_buffer(4096))
            .uses(Use::Shader("forces", Access::Write)),
        TestScope::new("integrate")
            .on_queue(HardwareQueueClass::Compute)
            .uses(Use::Shader("forces", Access::Read)),
        draw,
        TestScope::new("shade").uses(Use::Shader("vertices", Access::Read)),
    ];

    let report = run_frame(&mut system, &mut scopes).unwrap();

    assert_eq!(
        report.scope_names(),
        vec!["simulate", "integrate", "draw", "shade"]
    );
    let forces = report.scope("simulate", 0).unwrap().attachments[0].placement.unwrap();
    let vertices = report.scope("draw", 0).unwrap().attachments[0].placement.unwrap();
    // Compute may still be reading forces while graphics writes vertices.
    assert_eq!(forces.overlaps(&vertices), ordered);
    let saved = report.heap_statistics()[0].saved_bytes();
    assert_eq!(saved, if ordered { 4096 } else { 0 });

    let draw_barriers = &report.scope("draw", 0).unwrap().barriers;
    assert_eq!(
        draw_barriers.iter().any(|barrier| barrier.before == ResourceState::Undefined),
        ordered
    );
}

// ============================================================================
// Barriers and Imports
// ============================================================================

#[test]
fn test_single_transition_between_render_and_composite() {
    let mut system = system(1, FrameGraphConfig::default());
    let mut scopes = vec![
        TestScope::new("render")
            .create_image("hdr", color_target(128, 128))
            .uses(Use::Color("hdr", clear())),
        TestScope::new("composite").uses(Use::Shader("hdr", Access::Read)),
    ];

    let report = run_frame(&mut system, &mut scopes).unwrap();

    let barriers: Vec<_> = report.barriers().collect();
    assert_eq!(barriers.len(), 1);
    assert_eq!(barriers[0].before, ResourceState::ColorAttachment);
    assert_eq!(barriers[0].after, ResourceState::ShaderRead);
    assert_eq!(report.scope("composite", 0).unwrap().barriers.len(), 1);

    let render = &report.scope_command_lists("render", 0)[0];
    let clear_at = render
        .commands()
        .iter()
        .position(|command| {
            matches!(command, Command::Clear { attachment, .. } if attachment.as_str() == "hdr")
        })
        .expect("clear recorded");
    let draw_at = render
        .commands()
        .iter()
        .position(|command| matches!(command, Command::Draw { .. }))
        .expect("draw recorded");
    assert!(clear_at < draw_at);
}

#[test]
fn test_consecutive_storage_writes_are_separated() {
    let mut system = system(1, FrameGraphConfig::default());
    let mut scopes = vec![
        TestScope::new("splat")
            .create_buffer("accumulation", storage_buffer(4096))
            .uses(Use::Shader("accumulation", Access::Write)),
        TestScope::new("resolve").uses(Use::Shader("accumulation", Access::ReadWrite)),
    ];

    let report = run_frame(&mut system, &mut scopes).unwrap();

    assert!(report.has_dependency("splat", "resolve"));
    assert!(report.scope("splat", 0).unwrap().barriers.is_empty());
    let barriers = &report.scope("resolve", 0).unwrap().barriers;
    assert_eq!(barriers.len(), 1);
    assert_eq!(barriers[0].before, ResourceState::ShaderReadWrite);
    assert_eq!(barriers[0].after, ResourceState::ShaderReadWrite);
    assert_eq!(barriers[0].queue_transfer, None);
}

#[test]
fn test_imported_resource_persists_across_frames() {
    let mut system = system(1, FrameGraphConfig::default());
    let swapchain = system
        .device_group()
        .create_image("swapchain", &color_target(320, 240), DeviceMask::single(0))
        .unwrap();
    let handle = swapchain.device_resource(0).unwrap();

    let mut draw = vec![TestScope::new("draw").uses(Use::Color("swapchain", clear()))];
    let report = run_frame_with(&mut system, &mut draw, |database| {
        database.import_image("swapchain", &swapchain).unwrap();
    })
    .unwrap();
    assert_eq!(report.scope("draw", 0).unwrap().attachments[0].resource, handle);
    assert_eq!(report.barriers().count(), 0);
    assert_eq!(swapchain.state(0), ResourceState::ColorAttachment);
    system.recycle(report);

    let mut sample = vec![TestScope::new("sample").uses(Use::Shader("swapchain", Access::Read))];
    let report = run_frame_with(&mut system, &mut sample, |database| {
        database.import_image("swapchain", &swapchain).unwrap();
    })
    .unwrap();
    let scheduled = report.scope("sample", 0).unwrap();
    assert_eq!(scheduled.attachments[0].resource, handle);
    assert_eq!(scheduled.barriers.len(), 1);
    assert_eq!(scheduled.barriers[0].before, ResourceState::ColorAttachment);
    assert_eq!(swapchain.state(0), ResourceState::ShaderRead);
}

#[test]
fn test_transient_ids_are_fresh_each_frame() {
    let mut system = system(1, FrameGraphConfig::default());
    let mut scopes = post_chain();

    let first = run_frame(&mut system, &mut scopes).unwrap();
    let first_ids: HashSet<_> = first
        .scopes()
        .iter()
        .flat_map(|scheduled| scheduled.attachments.iter().map(|a| a.resource))
        .collect();
    system.recycle(first);
    let second = run_frame(&mut system, &mut scopes).unwrap();

    assert!(
        second
            .scopes()
            .iter()
            .flat_map(|scheduled| scheduled.attachments.iter())
            .all(|attachment| !first_ids.contains(&attachment.resource))
    );
}

// ============================================================================
// Queues, Devices and Command Lists
// ============================================================================

#[test]
fn test_async_compute_is_synchronized() {
    let mut system = system(1, FrameGraphConfig::default());
    let mut scopes = vec![
        TestScope::new("simulate")
            .on_queue(HardwareQueueClass::Compute)
            .create_buffer("particles", storage_buffer(1 << 16))
            .uses(Use::Shader("particles", Access::Write)),
        TestScope::new("draw_particles").uses(Use::Shader("particles", Access::Read)),
    ];

    let report = run_frame(&mut system, &mut scopes).unwrap();

    assert_eq!(report.semaphores().len(), 1);
    let semaphore = &report.semaphores()[0];
    assert_eq!(semaphore.signal_queue().class, HardwareQueueClass::Compute);
    assert_eq!(semaphore.wait_queue().class, HardwareQueueClass::Graphics);
    assert!(!semaphore.is_cross_device());

    let barrier = &report.scope("draw_particles", 0).unwrap().barriers[0];
    assert_eq!(
        barrier.queue_transfer,
        Some((HardwareQueueClass::Compute, HardwareQueueClass::Graphics))
    );
    assert_eq!(report.submissions().len(), 2);
    assert_eq!(
        report.scope_command_lists("simulate", 0)[0].queue_class(),
        HardwareQueueClass::Compute
    );
}

#[test]
fn test_multi_device_scopes_get_own_heaps() {
    let mut system = system(2, FrameGraphConfig::default());
    let mut scopes = vec![
        TestScope::new("shade")
            .on_devices(DeviceMask::all(2))
            .create_image("gbuffer", color_target(64, 64))
            .uses(Use::Color("gbuffer", clear())),
        TestScope::new("resolve")
            .on_devices(DeviceMask::all(2))
            .uses(Use::Shader("gbuffer", Access::Read)),
    ];

    let report = run_frame(&mut system, &mut scopes).unwrap();

    let order: Vec<_> = report
        .execution_order()
        .map(|(scope, device)| (scope.to_string(), device))
        .collect();
    assert_eq!(
        order,
        vec![
            ("shade".to_string(), 0),
            ("shade".to_string(), 1),
            ("resolve".to_string(), 0),
            ("resolve".to_string(), 1),
        ]
    );
    let devices: Vec<_> = report.heap_statistics().iter().map(|s| s.device).collect();
    assert_eq!(devices, vec![0, 1]);
    assert_ne!(
        report.scope("shade", 0).unwrap().attachments[0].resource,
        report.scope("shade", 1).unwrap().attachments[0].resource
    );
    assert!(report.semaphores().is_empty());
    assert_eq!(scopes[0].executed.len(), 2);
}

#[test]
fn test_cross_device_ordering_signals_semaphore() {
    let mut system = system(2, FrameGraphConfig::default());
    let mut scopes = vec![
        TestScope::new("render_remote").on_devices(DeviceMask::single(1)),
        TestScope::new("present").after("render_remote"),
    ];

    let report = run_frame(&mut system, &mut scopes).unwrap();

    assert_eq!(report.scope_names(), vec!["render_remote", "present"]);
    assert_eq!(report.semaphores().len(), 1);
    let semaphore = &report.semaphores()[0];
    assert!(semaphore.is_cross_device());
    assert_eq!(semaphore.signal_queue().device, 1);
    assert_eq!(semaphore.wait_queue().device, 0);
    assert!(report.fence().is_signaled());
}

#[test]
fn test_remote_render_and_copy_feed_local_composite() {
    let mut system = system(2, FrameGraphConfig::default());
    let staging = system
        .device_group()
        .create_host_buffer("staging", &storage_buffer(64 * 64 * 4), DeviceMask::all(2))
        .unwrap();
    let mut scopes = vec![
        TestScope::new("render")
            .on_devices(DeviceMask::single(1))
            .create_image("scene", color_target(64, 64))
            .uses(Use::Color("scene", clear())),
        TestScope::new("copy")
            .on_devices(DeviceMask::single(1))
            .uses(Use::Copy("scene", Access::Read))
            .uses(Use::Copy("staging", Access::Write)),
        TestScope::new("composite")
            .after("copy")
            .uses(Use::Shader("staging", Access::Read)),
    ];

    let report = run_frame_with(&mut system, &mut scopes, |database| {
        database.import_buffer("staging", &staging).unwrap();
    })
    .unwrap();

    let order: Vec<_> = report
        .execution_order()
        .map(|(scope, device)| (scope.to_string(), device))
        .collect();
    assert_eq!(
        order,
        vec![
            ("render".to_string(), 1),
            ("copy".to_string(), 1),
            ("composite".to_string(), 0),
        ]
    );
    assert!(report.has_dependency("render", "copy"));
    assert!(report.has_dependency("copy", "composite"));
    assert!(!report.has_dependency("render", "composite"));

    assert_eq!(report.semaphores().len(), 1);
    let semaphore = &report.semaphores()[0];
    assert!(semaphore.is_cross_device());
    assert_eq!(semaphore.signal_queue().device, 1);
    assert_eq!(semaphore.wait_queue().device, 0);
    assert_eq!(scopes[0].executed, vec![(1, 0..1)]);
    assert_eq!(scopes[2].executed, vec![(0, 0..1)]);
}

#[rstest]
#[case::split(300, 128, vec![0..128, 128..256, 256..300])]
#[case::exact_fit(128, 128, vec![0..128])]
#[case::empty(0, 128, vec![0..0])]
#[case::splitting_disabled(300, 0, vec![0..300])]
fn test_command_list_split(
    #[case] items: u32,
    #[case] per_list: u32,
    #[case] expected: Vec<std::ops::Range<u32>>,
) {
    let mut system = system(
        1,
        FrameGraphConfig::default().with_items_per_command_list(per_list),
    );
    let mut scopes = vec![TestScope::new("foliage").items(items)];

    let report = run_frame(&mut system, &mut scopes).unwrap();

    let lists = report.scope_command_lists("foliage", 0);
    let ranges: Vec<_> = lists.iter().map(|list| list.submit_range()).collect();
    assert_eq!(ranges, expected);
    for list in lists {
        assert_eq!(list.item_count(), list.submit_range().len() as u32);
    }
    assert_eq!(scopes[0].executed.len(), expected.len());
}

#[rstest]
#[case::local_overlap(QueryPoolAttachmentKind::Local, Interval::new(0, 3), true)]
#[case::local_disjoint(QueryPoolAttachmentKind::Local, Interval::new(4, 7), false)]
#[case::global_overlap(QueryPoolAttachmentKind::Global, Interval::new(0, 3), false)]
fn test_query_pool_ordering(
    #[case] kind: QueryPoolAttachmentKind,
    #[case] second_interval: Interval,
    #[case] ordered: bool,
) {
    let mut system = system(1, FrameGraphConfig::default());
    let pool = system
        .device_group()
        .create_query_pool("occlusion", QueryType::Occlusion, 8, DeviceMask::single(0))
        .unwrap();
    let mut scopes = vec![
        TestScope::new("occlusion_test").query(&pool, Interval::new(0, 3), kind),
        TestScope::new("occlusion_reuse").query(&pool, second_interval, kind),
    ];

    let report = run_frame(&mut system, &mut scopes).unwrap();

    assert_eq!(
        report.has_dependency("occlusion_test", "occlusion_reuse"),
        ordered
    );
}
