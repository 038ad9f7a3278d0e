//! Unit tests for frame_scheduler.rs

use crate::graphics_device::mock_graphics_device::{MockGraphicsDevice, MockSwapchain};
use crate::graphics_device::{
    AcquireOutcome, CommandList, CommandListUsage, GraphicsDevice, PipelineStages, PresentOutcome,
    QueueKind,
};
use crate::frame_scheduler::*;

struct Lists {
    geometry_lighting: Box<dyn CommandList>,
    post_effect: Box<dyn CommandList>,
    present: Vec<Box<dyn CommandList>>,
}

impl Lists {
    fn new(device: &mut MockGraphicsDevice, images: usize) -> Self {
        let mut recorded = |name: &str| {
            let mut cmd = device.create_command_list(QueueKind::Graphics, name).unwrap();
            cmd.begin(CommandListUsage::SimultaneousUse).unwrap();
            cmd.end().unwrap();
            cmd
        };
        Self {
            geometry_lighting: recorded("geometry_lighting"),
            post_effect: recorded("post_effect"),
            present: (0..images).map(|i| recorded(&format!("present_{}", i))).collect(),
        }
    }

    fn frame(&self) -> FrameLists<'_> {
        FrameLists {
            geometry_lighting: self.geometry_lighting.as_ref(),
            post_effect: self.post_effect.as_ref(),
            present: &self.present,
        }
    }
}

fn setup(images: u32) -> (MockGraphicsDevice, MockSwapchain, Lists, FrameScheduler) {
    let mut device = MockGraphicsDevice::new();
    let swapchain = MockSwapchain::new(800, 600, images, &device.log);
    let lists = Lists::new(&mut device, images as usize);
    let scheduler = FrameScheduler::new(&mut device).unwrap();
    (device, swapchain, lists, scheduler)
}

// ============================================================================
// SYNC OBJECTS
// ============================================================================

#[test]
fn test_sync_set_names() {
    let mut device = MockGraphicsDevice::new();
    let sync = FrameSyncSet::create(&mut device).unwrap();
    assert_eq!(sync.image_acquired.name(), "image_acquired");
    assert_eq!(sync.output_done.name(), "output_done");
    assert_eq!(sync.brdf_lut.name(), "brdf_lut");
    assert_eq!(sync.env_prefilter.name(), "env_prefilter");
    assert!(sync.frame_done.is_signaled().unwrap());
    assert!(!sync.brdf_lut.is_signaled().unwrap());
}

// ============================================================================
// FRAME LOOP
// ============================================================================

#[test]
fn test_frame_submits_three_chained_batches() {
    let (device, mut swapchain, lists, mut scheduler) = setup(3);

    let status = scheduler.draw_frame(&device, &mut swapchain, &lists.frame()).unwrap();
    assert_eq!(status, FrameStatus::Presented);
    assert!(!status.needs_recreation());

    let log = device.log.lock().unwrap();
    assert_eq!(log.submissions.len(), 1);
    let submission = &log.submissions[0];
    assert_eq!(submission.queue, QueueKind::Graphics);
    assert_eq!(submission.fence.as_deref(), Some("frame_done"));
    assert_eq!(submission.batches.len(), 3);

    let chain = [
        ("image_acquired", "geometry_lighting", "geometry_lighting_done"),
        ("geometry_lighting_done", "post_effect", "post_effect_done"),
        ("post_effect_done", "present_0", "output_done"),
    ];
    for (batch, (wait, list, signal)) in submission.batches.iter().zip(chain) {
        assert_eq!(batch.waits, vec![(wait.to_string(), PipelineStages::COLOR_ATTACHMENT_OUTPUT)]);
        assert_eq!(batch.command_lists, vec![list.to_string()]);
        assert_eq!(batch.signals, vec![signal.to_string()]);
    }
    drop(log);

    assert_eq!(*swapchain.presented.lock().unwrap(), vec![0]);
    assert_eq!(scheduler.frames_presented(), 1);
}

#[test]
fn test_present_list_follows_acquired_image() {
    let (device, mut swapchain, lists, mut scheduler) = setup(3);
    for _ in 0..4 {
        scheduler.draw_frame(&device, &mut swapchain, &lists.frame()).unwrap();
    }

    let log = device.log.lock().unwrap();
    let presented: Vec<String> = log.submissions.iter().map(|s| s.batches[2].command_lists[0].clone()).collect();
    assert_eq!(presented, vec!["present_0", "present_1", "present_2", "present_0"]);
}

#[test]
fn test_out_of_date_acquire_skips_frame() {
    let (device, mut swapchain, lists, mut scheduler) = setup(2);
    swapchain.acquire_script.push_back(AcquireOutcome::OutOfDate);

    let status = scheduler.draw_frame(&device, &mut swapchain, &lists.frame()).unwrap();
    assert_eq!(status, FrameStatus::SkippedOutOfDate);
    assert!(status.needs_recreation());
    assert_eq!(device.submission_count(), 0);
    assert!(swapchain.presented.lock().unwrap().is_empty());

    // the frame fence stays signalled so the next frame does not stall
    assert!(scheduler.sync().frame_done.is_signaled().unwrap());
    assert_eq!(scheduler.draw_frame(&device, &mut swapchain, &lists.frame()).unwrap(), FrameStatus::Presented);
}

#[test]
fn test_suboptimal_acquire_still_renders() {
    let (device, mut swapchain, lists, mut scheduler) = setup(2);
    swapchain.acquire_script.push_back(AcquireOutcome::Acquired { image_index: 1, suboptimal: true });

    let status = scheduler.draw_frame(&device, &mut swapchain, &lists.frame()).unwrap();
    assert_eq!(status, FrameStatus::Presented);
    assert_eq!(*swapchain.presented.lock().unwrap(), vec![1]);
}

#[test]
fn test_stale_present_is_reported() {
    let (device, mut swapchain, lists, mut scheduler) = setup(2);
    swapchain.present_script.push_back(PresentOutcome::Stale);

    let status = scheduler.draw_frame(&device, &mut swapchain, &lists.frame()).unwrap();
    assert_eq!(status, FrameStatus::PresentedStale);
    assert!(status.needs_recreation());
    assert_eq!(device.submission_count(), 1);
}

#[test]
fn test_missing_present_list_is_an_error() {
    let (device, mut swapchain, lists, mut scheduler) = setup(2);
    swapchain.acquire_script.push_back(AcquireOutcome::Acquired { image_index: 5, suboptimal: false });
    assert!(scheduler.draw_frame(&device, &mut swapchain, &lists.frame()).is_err());
    assert_eq!(device.submission_count(), 0);
}
