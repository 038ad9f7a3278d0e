/// Texture read-back through a host-visible staging buffer

use std::sync::Arc;

use crate::engine_debug;
use crate::error::{Error, Result};
use crate::graphics_device::{
    subresource_layout, AccessFlags, Buffer, BufferDesc, BufferUsage, CommandList,
    CommandListUsage, GraphicsDevice, ImageBarrier, ImageLayout, PipelineStages, QueueKind,
    SubmitBatch, Texture,
};
use super::record_with;

/// Transition `texture` to `TransferSrc` and copy every (layer, mip) into `staging`
///
/// Regions land at increasing offsets, layer-major then mip.
pub fn record_readback(
    cmd: &mut dyn CommandList,
    texture: &Arc<dyn Texture>,
    current_layout: ImageLayout,
    staging: &Arc<dyn Buffer>,
) -> Result<()> {
    let regions = subresource_layout(texture.info());
    let needed = texture.info().byte_size();
    if staging.size() < needed {
        return Err(Error::InvalidResource(format!(
            "staging buffer holds {} bytes, '{}' needs {}",
            staging.size(), texture.info().name, needed
        )));
    }

    cmd.pipeline_barrier(
        PipelineStages::ALL_COMMANDS,
        PipelineStages::TRANSFER,
        &[ImageBarrier::whole(texture, current_layout, ImageLayout::TransferSrc,
            AccessFlags::MEMORY_WRITE, AccessFlags::TRANSFER_READ)],
    )?;
    cmd.copy_texture_to_buffer(texture, staging, &regions)
}

/// Copy the whole contents of `texture` back to the CPU
///
/// Blocks until the copy has completed. The texture is returned to
/// `current_layout` afterwards.
pub fn read_back_texture(
    device: &mut dyn GraphicsDevice,
    texture: &Arc<dyn Texture>,
    current_layout: ImageLayout,
) -> Result<Vec<u8>> {
    let name = texture.info().name.clone();
    let size = texture.info().byte_size();

    let staging = device.create_buffer(BufferDesc {
        name: format!("{}_readback", name),
        size,
        usage: BufferUsage::Readback,
        data: None,
    })?;
    let mut cmd = device.create_command_list(QueueKind::Graphics, &format!("readback_{}", name))?;
    record_with(cmd.as_mut(), CommandListUsage::OneTimeSubmit, |cmd| {
        record_readback(cmd, texture, current_layout, &staging)?;
        cmd.pipeline_barrier(
            PipelineStages::TRANSFER,
            PipelineStages::ALL_COMMANDS,
            &[ImageBarrier::whole(texture, ImageLayout::TransferSrc, current_layout,
                AccessFlags::TRANSFER_READ, AccessFlags::MEMORY_READ)],
        )
    })?;

    let fence = device.create_fence(&format!("readback_{}", name), false)?;
    device.submit(QueueKind::Graphics, &[SubmitBatch::commands(vec![cmd.as_ref()])], Some(fence.as_ref()))?;
    if !fence.wait(u64::MAX)? {
        return Err(Error::BackendError(format!("read-back of '{}' timed out", name)));
    }

    engine_debug!("laugh::CommandRecorder", "Read back {} bytes of '{}'", size, name);
    staging.read(0, size)
}
