use aquarium::{
    BackendType, GraphicsBackend, Toggles,
    backend::recording::{Command, RecordingBackend},
    context::SurfaceRecovery,
    frame::{FRAMES_IN_FLIGHT, FrameRing},
};

#[test]
fn slots_cycle_and_wait_two_frames_back() {
    let mut ring: FrameRing<u64> = FrameRing::new(2);
    let mut waits = Vec::new();
    for _ in 0..5 {
        let (slot, fence) = ring.begin_frame();
        assert!(slot.index < 2);
        assert_eq!(slot.index as u64, slot.serial % 2);
        waits.push(fence);
        ring.end_frame(slot, slot.serial);
    }
    assert_eq!(waits, vec![None, None, Some(0), Some(1), Some(2)]);
    assert_eq!(ring.frames_begun(), 5);
}

#[test]
fn draining_returns_every_outstanding_fence() {
    let mut ring: FrameRing<u64> = FrameRing::default();
    assert_eq!(ring.depth(), FRAMES_IN_FLIGHT);
    for _ in 0..3 {
        let (slot, _) = ring.begin_frame();
        ring.end_frame(slot, slot.serial * 10);
    }
    let mut drained = ring.drain();
    drained.sort();
    assert_eq!(drained, vec![10, 20]);
    assert!(ring.drain().is_empty());
}

#[test]
fn backend_waits_before_reusing_a_slot() {
    let mut backend = RecordingBackend::new(BackendType::DawnVulkan, Toggles::empty()).unwrap();
    for _ in 0..3 {
        backend.pre_frame().unwrap();
        backend.do_flush().unwrap();
    }
    assert_eq!(
        backend.commands(),
        vec![
            Command::BeginFrame { serial: 0 },
            Command::Submit { serial: 0 },
            Command::BeginFrame { serial: 1 },
            Command::Submit { serial: 1 },
            Command::BeginFrame { serial: 2 },
            Command::WaitFrame { serial: 0 },
            Command::Submit { serial: 2 },
        ]
    );
}

#[test]
fn terminate_waits_for_frames_in_flight() {
    let mut backend = RecordingBackend::new(BackendType::OpenGl, Toggles::empty()).unwrap();
    for _ in 0..2 {
        backend.pre_frame().unwrap();
        backend.do_flush().unwrap();
    }
    backend.clear_log();
    backend.terminate();
    let commands = backend.commands();
    assert_eq!(commands.last(), Some(&Command::Terminate));
    let waits = commands
        .iter()
        .filter(|command| matches!(command, Command::WaitFrame { .. }))
        .count();
    assert_eq!(waits, 2);
}

#[test]
fn recording_backend_rejects_toggles_it_cannot_honour() {
    assert!(RecordingBackend::new(BackendType::Angle, Toggles::INSTANCED_DRAWS).is_err());
    assert!(RecordingBackend::new(BackendType::D3d12, Toggles::INSTANCED_DRAWS).is_ok());
}

#[test]
fn surface_timeouts_skip_the_frame() {
    assert_eq!(
        SurfaceRecovery::for_error(&wgpu::SurfaceError::Timeout),
        SurfaceRecovery::SkipFrame
    );
    for error in [wgpu::SurfaceError::Lost, wgpu::SurfaceError::Outdated] {
        assert_eq!(SurfaceRecovery::for_error(&error), SurfaceRecovery::Reconfigure);
    }
    assert_eq!(
        SurfaceRecovery::for_error(&wgpu::SurfaceError::OutOfMemory),
        SurfaceRecovery::Fail
    );
}
