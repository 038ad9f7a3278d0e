/// Mock GraphicsDevice for unit tests (no GPU required)
///
/// Every object shares a `MockDeviceLog` so tests can inspect what was
/// created, recorded, submitted, written and destroyed, in order.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};
use crate::engine_bail;
use crate::graphics_device::{
    AcquireOutcome, Buffer, BufferDesc, ClearValue, ColorBlendState, CommandList, CommandListUsage,
    ComputePipelineDesc, DescriptorPool, DescriptorPoolSizes, DescriptorResource, DescriptorSet,
    DescriptorSetLayout, DescriptorSetLayoutDesc, DeviceLimits, Fence, Framebuffer,
    FramebufferDesc, GraphicsDevice, GraphicsPipelineDesc, ImageBarrier, IndexType, Pipeline,
    PipelineBindPoint, PipelineStages, PresentOutcome, QueueKind, Rect2D, RenderPass,
    RenderPassDesc, RenderTarget, RenderTargetDesc, Semaphore, Shader, ShaderDesc, ShaderStage,
    ShaderStageFlags, SpecializationConstant, SubmitBatch, SubresourceRegion, Swapchain, TargetLayers, Texture,
    TextureDesc, TextureFormat, TextureInfo, TextureKind, TextureUsage, Viewport, ViewportState,
};

// ============================================================================
// Shared log
// ============================================================================

/// One batch of a recorded submission
#[derive(Debug, Clone)]
pub struct MockBatch {
    pub waits: Vec<(String, PipelineStages)>,
    pub command_lists: Vec<String>,
    pub signals: Vec<String>,
}

/// One `GraphicsDevice::submit` call
#[derive(Debug, Clone)]
pub struct MockSubmission {
    pub queue: QueueKind,
    pub batches: Vec<MockBatch>,
    pub fence: Option<String>,
}

/// One `GraphicsDevice::update_descriptor_set` call
#[derive(Debug, Clone)]
pub struct MockDescriptorWrite {
    pub set: String,
    pub binding: u32,
    pub resources: Vec<String>,
}

/// Everything the mock device observed
#[derive(Debug, Default)]
pub struct MockDeviceLog {
    /// "kind:name" in creation order
    pub created: Vec<String>,
    /// "kind:name" in drop order
    pub destroyed: Vec<String>,
    pub submissions: Vec<MockSubmission>,
    pub descriptor_writes: Vec<MockDescriptorWrite>,
    pub wait_idle_calls: u32,
}

pub type SharedLog = Arc<Mutex<MockDeviceLog>>;

fn record_destroy(log: &SharedLog, entry: String) {
    if let Ok(mut log) = log.lock() {
        log.destroyed.push(entry);
    }
}

/// Deterministic stand-in for GPU-computed contents
pub fn mock_pattern(len: u64) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

// ============================================================================
// Mock resources
// ============================================================================

pub struct MockTexture {
    pub info: TextureInfo,
    pub contents: Mutex<Option<Vec<u8>>>,
    log: SharedLog,
}

impl MockTexture {
    pub fn new(info: TextureInfo, data: Option<Vec<u8>>, log: SharedLog) -> Self {
        Self { info, contents: Mutex::new(data), log }
    }

    /// Uploaded data, or the deterministic pattern standing in for rendered output
    pub fn snapshot(&self) -> Vec<u8> {
        let contents = self.contents.lock().unwrap();
        match contents.as_ref() {
            Some(bytes) => bytes.clone(),
            None => mock_pattern(self.info.byte_size()),
        }
    }
}

impl Texture for MockTexture {
    fn info(&self) -> &TextureInfo {
        &self.info
    }
}

impl Drop for MockTexture {
    fn drop(&mut self) {
        record_destroy(&self.log, format!("texture:{}", self.info.name));
    }
}

pub struct MockBuffer {
    pub name: String,
    pub data: Mutex<Vec<u8>>,
}

impl MockBuffer {
    pub fn new(name: &str, size: u64) -> Self {
        Self {
            name: name.to_string(),
            data: Mutex::new(vec![0; size as usize]),
        }
    }
}

impl Buffer for MockBuffer {
    fn size(&self) -> u64 {
        self.data.lock().unwrap().len() as u64
    }

    fn update(&self, offset: u64, data: &[u8]) -> Result<()> {
        let mut bytes = self.data.lock().unwrap();
        let end = offset as usize + data.len();
        if end > bytes.len() {
            engine_bail!("laugh::mock", "Buffer '{}' update out of range ({} > {})",
                self.name, end, bytes.len());
        }
        bytes[offset as usize..end].copy_from_slice(data);
        Ok(())
    }

    fn read(&self, offset: u64, len: u64) -> Result<Vec<u8>> {
        let bytes = self.data.lock().unwrap();
        let end = (offset + len) as usize;
        if end > bytes.len() {
            engine_bail!("laugh::mock", "Buffer '{}' read out of range", self.name);
        }
        Ok(bytes[offset as usize..end].to_vec())
    }
}

pub struct MockShader {
    pub name: String,
    pub stage: ShaderStage,
}

impl Shader for MockShader {
    fn stage(&self) -> ShaderStage {
        self.stage
    }

    fn name(&self) -> &str {
        &self.name
    }
}

pub struct MockRenderPass {
    pub desc: RenderPassDesc,
    log: SharedLog,
}

impl RenderPass for MockRenderPass {
    fn name(&self) -> &str {
        &self.desc.name
    }

    fn subpass_count(&self) -> u32 {
        self.desc.subpasses.len() as u32
    }
}

impl Drop for MockRenderPass {
    fn drop(&mut self) {
        record_destroy(&self.log, format!("render_pass:{}", self.desc.name));
    }
}

pub struct MockRenderTarget {
    pub texture_name: String,
    pub width: u32,
    pub height: u32,
    pub layers: u32,
}

impl RenderTarget for MockRenderTarget {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn layer_count(&self) -> u32 {
        self.layers
    }
}

pub struct MockFramebuffer {
    pub name: String,
    pub width: u32,
    pub height: u32,
    log: SharedLog,
}

impl Framebuffer for MockFramebuffer {
    fn name(&self) -> &str {
        &self.name
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }
}

impl Drop for MockFramebuffer {
    fn drop(&mut self) {
        record_destroy(&self.log, format!("framebuffer:{}", self.name));
    }
}

pub struct MockDescriptorSetLayout {
    pub desc: DescriptorSetLayoutDesc,
}

impl DescriptorSetLayout for MockDescriptorSetLayout {
    fn desc(&self) -> &DescriptorSetLayoutDesc {
        &self.desc
    }
}

pub struct MockPipeline {
    pub name: String,
    pub bind_point: PipelineBindPoint,
    pub color_blend: Vec<ColorBlendState>,
    pub viewport: Option<ViewportState>,
    pub specialization: Vec<SpecializationConstant>,
    log: SharedLog,
}

impl Pipeline for MockPipeline {
    fn bind_point(&self) -> PipelineBindPoint {
        self.bind_point
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// View a pipeline created by the mock device as its concrete type
pub fn as_mock_pipeline(pipeline: &Arc<dyn Pipeline>) -> &MockPipeline {
    unsafe { &*(Arc::as_ptr(pipeline) as *const MockPipeline) }
}

/// View a texture created by the mock device as its concrete type
pub fn as_mock_texture(texture: &Arc<dyn Texture>) -> &MockTexture {
    unsafe { &*(Arc::as_ptr(texture) as *const MockTexture) }
}

/// View a command list created by the mock device as its concrete type
pub fn as_mock_command_list(cmd: &dyn CommandList) -> &MockCommandList {
    unsafe { &*(cmd as *const dyn CommandList as *const MockCommandList) }
}

impl Drop for MockPipeline {
    fn drop(&mut self) {
        record_destroy(&self.log, format!("pipeline:{}", self.name));
    }
}

pub struct MockDescriptorSet {
    pub name: String,
    pub layout_name: String,
}

impl DescriptorSet for MockDescriptorSet {
    fn name(&self) -> &str {
        &self.name
    }

    fn layout_name(&self) -> &str {
        &self.layout_name
    }
}

/// Pool enforcing its capacity like a real driver would
pub struct MockDescriptorPool {
    pub remaining: DescriptorPoolSizes,
}

impl DescriptorPool for MockDescriptorPool {
    fn allocate(&mut self, layout: &Arc<dyn DescriptorSetLayout>, name: &str) -> Result<Arc<dyn DescriptorSet>> {
        let desc = layout.desc();
        if self.remaining.max_sets == 0 {
            return Err(Error::DescriptorPoolExhausted(format!("no set left for '{}'", name)));
        }
        for binding in &desc.bindings {
            let left = self.remaining.get_mut(binding.descriptor_type);
            if *left < binding.count {
                return Err(Error::DescriptorPoolExhausted(format!(
                    "{:?} exhausted allocating '{}'", binding.descriptor_type, name
                )));
            }
            *left -= binding.count;
        }
        self.remaining.max_sets -= 1;
        Ok(Arc::new(MockDescriptorSet {
            name: name.to_string(),
            layout_name: desc.name.clone(),
        }))
    }
}

pub struct MockSemaphore {
    pub name: String,
}

impl Semaphore for MockSemaphore {
    fn name(&self) -> &str {
        &self.name
    }
}

pub struct MockFence {
    pub name: String,
    pub signaled: AtomicBool,
}

impl Fence for MockFence {
    fn name(&self) -> &str {
        &self.name
    }

    fn wait(&self, _timeout_ns: u64) -> Result<bool> {
        Ok(self.signaled.load(Ordering::SeqCst))
    }

    fn reset(&self) -> Result<()> {
        self.signaled.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_signaled(&self) -> Result<bool> {
        Ok(self.signaled.load(Ordering::SeqCst))
    }
}

// ============================================================================
// Mock CommandList
// ============================================================================

/// Records every command as a readable string
pub struct MockCommandList {
    pub name: String,
    pub queue: QueueKind,
    pub commands: Vec<String>,
    pub recording: bool,
    pub fail_on: Option<&'static str>,
}

impl MockCommandList {
    pub fn new(name: &str, queue: QueueKind) -> Self {
        Self {
            name: name.to_string(),
            queue,
            commands: Vec::new(),
            recording: false,
            fail_on: None,
        }
    }

    fn push(&mut self, command: String) -> Result<()> {
        if !self.recording {
            engine_bail!("laugh::mock", "'{}': {} recorded outside begin/end", self.name, command);
        }
        if let Some(fail) = self.fail_on {
            if command.starts_with(fail) {
                engine_bail!("laugh::mock", "'{}': injected failure on {}", self.name, command);
            }
        }
        self.commands.push(command);
        Ok(())
    }
}

/// Format push constant bytes as 32-bit words
pub fn words(data: &[u8]) -> String {
    let words: Vec<String> = data
        .chunks(4)
        .map(|c| {
            let mut w = [0u8; 4];
            w[..c.len()].copy_from_slice(c);
            u32::from_le_bytes(w).to_string()
        })
        .collect();
    words.join(",")
}

impl CommandList for MockCommandList {
    fn name(&self) -> &str {
        &self.name
    }

    fn queue(&self) -> QueueKind {
        self.queue
    }

    fn begin(&mut self, usage: CommandListUsage) -> Result<()> {
        self.commands.clear();
        self.recording = true;
        self.push(format!("begin({:?})", usage))
    }

    fn end(&mut self) -> Result<()> {
        self.push("end".to_string())?;
        self.recording = false;
        Ok(())
    }

    fn begin_render_pass(
        &mut self,
        render_pass: &Arc<dyn RenderPass>,
        framebuffer: &Arc<dyn Framebuffer>,
        render_area: Rect2D,
        clear_values: &[ClearValue],
    ) -> Result<()> {
        self.push(format!(
            "begin_render_pass({}, {}, {}x{}, clears={})",
            render_pass.name(),
            framebuffer.name(),
            render_area.width,
            render_area.height,
            clear_values.len()
        ))
    }

    fn next_subpass(&mut self) -> Result<()> {
        self.push("next_subpass".to_string())
    }

    fn end_render_pass(&mut self) -> Result<()> {
        self.push("end_render_pass".to_string())
    }

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.push(format!("set_viewport({}x{})", viewport.width, viewport.height))
    }

    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()> {
        self.push(format!("set_scissor({}x{})", scissor.width, scissor.height))
    }

    fn bind_pipeline(&mut self, pipeline: &Arc<dyn Pipeline>) -> Result<()> {
        self.push(format!("bind_pipeline({})", pipeline.name()))
    }

    fn bind_descriptor_set(
        &mut self,
        _pipeline: &Arc<dyn Pipeline>,
        set_index: u32,
        set: &Arc<dyn DescriptorSet>,
    ) -> Result<()> {
        self.push(format!("bind_descriptor_set({}, {})", set_index, set.name()))
    }

    fn push_constants(&mut self, stages: ShaderStageFlags, offset: u32, data: &[u8]) -> Result<()> {
        self.push(format!("push_constants({:?}, {}, [{}])", stages, offset, words(data)))
    }

    fn bind_vertex_buffer(&mut self, _buffer: &Arc<dyn Buffer>, offset: u64) -> Result<()> {
        self.push(format!("bind_vertex_buffer({})", offset))
    }

    fn bind_index_buffer(&mut self, _buffer: &Arc<dyn Buffer>, offset: u64, index_type: IndexType) -> Result<()> {
        self.push(format!("bind_index_buffer({}, {:?})", offset, index_type))
    }

    fn draw(&mut self, vertex_count: u32, first_vertex: u32) -> Result<()> {
        self.push(format!("draw({}, {})", vertex_count, first_vertex))
    }

    fn draw_indexed(&mut self, index_count: u32, first_index: u32, vertex_offset: i32) -> Result<()> {
        self.push(format!("draw_indexed({}, {}, {})", index_count, first_index, vertex_offset))
    }

    fn dispatch(&mut self, x: u32, y: u32, z: u32) -> Result<()> {
        self.push(format!("dispatch({}, {}, {})", x, y, z))
    }

    fn pipeline_barrier(
        &mut self,
        _src_stages: PipelineStages,
        _dst_stages: PipelineStages,
        barriers: &[ImageBarrier],
    ) -> Result<()> {
        for barrier in barriers {
            self.push(format!(
                "barrier({}: {:?}->{:?})",
                barrier.texture.info().name,
                barrier.old_layout,
                barrier.new_layout
            ))?;
        }
        Ok(())
    }

    fn copy_texture_to_buffer(
        &mut self,
        texture: &Arc<dyn Texture>,
        buffer: &Arc<dyn Buffer>,
        regions: &[SubresourceRegion],
    ) -> Result<()> {
        self.push(format!(
            "copy_texture_to_buffer({}, {} regions)",
            texture.info().name,
            regions.len()
        ))?;

        let contents = as_mock_texture(texture).snapshot();
        for region in regions {
            let start = region.offset as usize;
            let end = start + region.size as usize;
            buffer.update(region.offset, &contents[start..end])?;
        }
        Ok(())
    }
}

// ============================================================================
// Mock Swapchain
// ============================================================================

pub struct MockSwapchain {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub images: Vec<Arc<dyn Texture>>,
    /// Outcomes returned by the next acquire calls (then Acquired round-robin)
    pub acquire_script: VecDeque<AcquireOutcome>,
    /// Outcomes returned by the next present calls (then Presented)
    pub present_script: VecDeque<PresentOutcome>,
    pub next_image: u32,
    pub recreate_calls: Arc<Mutex<Vec<(u32, u32)>>>,
    pub presented: Arc<Mutex<Vec<u32>>>,
    log: SharedLog,
}

fn mock_swapchain_images(width: u32, height: u32, image_count: usize, log: &SharedLog) -> Vec<Arc<dyn Texture>> {
    (0..image_count)
        .map(|i| {
            let info = TextureInfo {
                name: format!("swapchain_image_{}", i),
                width,
                height,
                format: TextureFormat::B8G8R8A8_SRGB,
                usage: TextureUsage::COLOR_ATTACHMENT,
                kind: TextureKind::Tex2D,
                mip_levels: 1,
            };
            Arc::new(MockTexture::new(info, None, log.clone())) as Arc<dyn Texture>
        })
        .collect()
}

impl MockSwapchain {
    pub fn new(width: u32, height: u32, image_count: u32, log: &SharedLog) -> Self {
        Self {
            width,
            height,
            format: TextureFormat::B8G8R8A8_SRGB,
            images: mock_swapchain_images(width, height, image_count as usize, log),
            acquire_script: VecDeque::new(),
            present_script: VecDeque::new(),
            next_image: 0,
            recreate_calls: Arc::new(Mutex::new(Vec::new())),
            presented: Arc::new(Mutex::new(Vec::new())),
            log: log.clone(),
        }
    }
}

impl Swapchain for MockSwapchain {
    fn acquire_next_image(&mut self, _signal: &dyn Semaphore, _timeout_ns: u64) -> Result<AcquireOutcome> {
        if let Some(outcome) = self.acquire_script.pop_front() {
            return Ok(outcome);
        }
        let image_index = self.next_image;
        self.next_image = (self.next_image + 1) % self.images.len() as u32;
        Ok(AcquireOutcome::Acquired { image_index, suboptimal: false })
    }

    fn present(&mut self, image_index: u32, _waits: &[&dyn Semaphore]) -> Result<PresentOutcome> {
        self.presented.lock().unwrap().push(image_index);
        Ok(self.present_script.pop_front().unwrap_or(PresentOutcome::Presented))
    }

    fn recreate(&mut self, width: u32, height: u32) -> Result<()> {
        self.recreate_calls.lock().unwrap().push((width, height));
        self.width = width;
        self.height = height;
        self.images = mock_swapchain_images(width, height, self.images.len(), &self.log);
        self.next_image = 0;
        Ok(())
    }

    fn images(&self) -> Vec<Arc<dyn Texture>> {
        self.images.clone()
    }

    fn image_count(&self) -> usize {
        self.images.len()
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn format(&self) -> TextureFormat {
        self.format
    }
}

// ============================================================================
// Mock GraphicsDevice
// ============================================================================

pub struct MockGraphicsDevice {
    pub log: SharedLog,
    pub limits: DeviceLimits,
    pub depth_formats: Vec<TextureFormat>,
}

impl MockGraphicsDevice {
    pub fn new() -> Self {
        Self {
            log: Arc::new(Mutex::new(MockDeviceLog::default())),
            limits: DeviceLimits::default(),
            depth_formats: vec![TextureFormat::D32_SFLOAT],
        }
    }

    fn record_create(&self, entry: String) {
        self.log.lock().unwrap().created.push(entry);
    }

    /// Number of submit calls so far
    pub fn submission_count(&self) -> usize {
        self.log.lock().unwrap().submissions.len()
    }
}

impl Default for MockGraphicsDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphicsDevice for MockGraphicsDevice {
    fn create_texture(&mut self, desc: TextureDesc) -> Result<Arc<dyn Texture>> {
        if desc.width == 0 || desc.height == 0 || desc.mip_levels == 0 {
            engine_bail!("laugh::mock", "Texture '{}' has a zero dimension", desc.name);
        }
        let info = TextureInfo::from(&desc);
        if let Some(data) = &desc.data {
            if data.len() as u64 != info.byte_size() {
                engine_bail!("laugh::mock", "Texture '{}' data is {} bytes, expected {}",
                    desc.name, data.len(), info.byte_size());
            }
        }
        self.record_create(format!("texture:{}", desc.name));
        Ok(Arc::new(MockTexture::new(info, desc.data, self.log.clone())))
    }

    fn create_buffer(&mut self, desc: BufferDesc) -> Result<Arc<dyn Buffer>> {
        self.record_create(format!("buffer:{}", desc.name));
        let buffer = MockBuffer::new(&desc.name, desc.size);
        if let Some(data) = &desc.data {
            buffer.update(0, data)?;
        }
        Ok(Arc::new(buffer))
    }

    fn create_shader(&mut self, desc: ShaderDesc) -> Result<Arc<dyn Shader>> {
        self.record_create(format!("shader:{}", desc.name));
        Ok(Arc::new(MockShader { name: desc.name.to_string(), stage: desc.stage }))
    }

    fn create_render_pass(&mut self, desc: &RenderPassDesc) -> Result<Arc<dyn RenderPass>> {
        self.record_create(format!("render_pass:{}", desc.name));
        Ok(Arc::new(MockRenderPass { desc: desc.clone(), log: self.log.clone() }))
    }

    fn create_render_target(&mut self, desc: &RenderTargetDesc) -> Result<Arc<dyn RenderTarget>> {
        let info = desc.texture.info();
        if desc.mip_level >= info.mip_levels {
            engine_bail!("laugh::mock", "create_render_target: mip {} out of range ({} levels)",
                desc.mip_level, info.mip_levels);
        }
        let layers = match desc.layers {
            TargetLayers::Single(layer) if layer >= info.array_layers() => {
                engine_bail!("laugh::mock", "create_render_target: layer {} out of range", layer);
            }
            TargetLayers::Single(_) => 1,
            TargetLayers::All => info.array_layers(),
        };
        Ok(Arc::new(MockRenderTarget {
            texture_name: info.name.clone(),
            width: (info.width >> desc.mip_level).max(1),
            height: (info.height >> desc.mip_level).max(1),
            layers,
        }))
    }

    fn create_framebuffer(&mut self, desc: &FramebufferDesc) -> Result<Arc<dyn Framebuffer>> {
        for target in &desc.attachments {
            if target.width() != desc.width || target.height() != desc.height {
                engine_bail!("laugh::mock", "Framebuffer '{}': attachment is {}x{}, expected {}x{}",
                    desc.name, target.width(), target.height(), desc.width, desc.height);
            }
        }
        self.record_create(format!("framebuffer:{}", desc.name));
        Ok(Arc::new(MockFramebuffer {
            name: desc.name.clone(),
            width: desc.width,
            height: desc.height,
            log: self.log.clone(),
        }))
    }

    fn create_descriptor_set_layout(&mut self, desc: &DescriptorSetLayoutDesc) -> Result<Arc<dyn DescriptorSetLayout>> {
        self.record_create(format!("descriptor_set_layout:{}", desc.name));
        Ok(Arc::new(MockDescriptorSetLayout { desc: desc.clone() }))
    }

    fn create_graphics_pipeline(&mut self, desc: &GraphicsPipelineDesc) -> Result<Arc<dyn Pipeline>> {
        self.record_create(format!("pipeline:{}", desc.name));
        Ok(Arc::new(MockPipeline {
            name: desc.name.clone(),
            bind_point: PipelineBindPoint::Graphics,
            color_blend: desc.color_blend.clone(),
            viewport: Some(desc.viewport),
            specialization: desc.specialization.clone(),
            log: self.log.clone(),
        }))
    }

    fn create_compute_pipeline(&mut self, desc: &ComputePipelineDesc) -> Result<Arc<dyn Pipeline>> {
        self.record_create(format!("pipeline:{}", desc.name));
        Ok(Arc::new(MockPipeline {
            name: desc.name.clone(),
            bind_point: PipelineBindPoint::Compute,
            color_blend: Vec::new(),
            viewport: None,
            specialization: Vec::new(),
            log: self.log.clone(),
        }))
    }

    fn create_descriptor_pool(&mut self, sizes: &DescriptorPoolSizes) -> Result<Box<dyn DescriptorPool>> {
        self.record_create("descriptor_pool".to_string());
        Ok(Box::new(MockDescriptorPool { remaining: *sizes }))
    }

    fn update_descriptor_set(
        &self,
        set: &Arc<dyn DescriptorSet>,
        binding: u32,
        resources: &[DescriptorResource],
    ) -> Result<()> {
        let resources = resources
            .iter()
            .map(|r| match r {
                DescriptorResource::UniformBuffer { offset, range, .. } => {
                    format!("uniform:{}+{}", offset, range)
                }
                DescriptorResource::SampledTexture(t, sampler) => {
                    format!("sampled:{}:{:?}", t.info().name, sampler)
                }
                DescriptorResource::InputAttachment(t) => format!("input:{}", t.info().name),
                DescriptorResource::StorageImage(t) => format!("storage:{}", t.info().name),
            })
            .collect();
        self.log.lock().unwrap().descriptor_writes.push(MockDescriptorWrite {
            set: set.name().to_string(),
            binding,
            resources,
        });
        Ok(())
    }

    fn create_command_list(&mut self, queue: QueueKind, name: &str) -> Result<Box<dyn CommandList>> {
        self.record_create(format!("command_list:{}", name));
        Ok(Box::new(MockCommandList::new(name, queue)))
    }

    fn create_semaphore(&mut self, name: &str) -> Result<Arc<dyn Semaphore>> {
        self.record_create(format!("semaphore:{}", name));
        Ok(Arc::new(MockSemaphore { name: name.to_string() }))
    }

    fn create_fence(&mut self, name: &str, signaled: bool) -> Result<Arc<dyn Fence>> {
        self.record_create(format!("fence:{}", name));
        Ok(Arc::new(MockFence {
            name: name.to_string(),
            signaled: AtomicBool::new(signaled),
        }))
    }

    fn submit(&self, queue: QueueKind, batches: &[SubmitBatch], fence: Option<&dyn Fence>) -> Result<()> {
        let mut recorded = Vec::with_capacity(batches.len());
        for batch in batches {
            for cmd in &batch.command_lists {
                if cmd.queue() != queue {
                    engine_bail!("laugh::mock", "'{}' recorded for {:?} submitted to {:?}",
                        cmd.name(), cmd.queue(), queue);
                }
            }
            recorded.push(MockBatch {
                waits: batch.waits.iter().map(|(s, st)| (s.name().to_string(), *st)).collect(),
                command_lists: batch.command_lists.iter().map(|c| c.name().to_string()).collect(),
                signals: batch.signals.iter().map(|s| s.name().to_string()).collect(),
            });
        }

        if let Some(fence) = fence {
            // Only mock fences ever reach a mock device
            let mock = unsafe { &*(fence as *const dyn Fence as *const MockFence) };
            mock.signaled.store(true, Ordering::SeqCst);
        }

        self.log.lock().unwrap().submissions.push(MockSubmission {
            queue,
            batches: recorded,
            fence: fence.map(|f| f.name().to_string()),
        });
        Ok(())
    }

    fn wait_idle(&self) -> Result<()> {
        self.log.lock().unwrap().wait_idle_calls += 1;
        Ok(())
    }

    fn limits(&self) -> DeviceLimits {
        self.limits
    }

    fn find_depth_format(&self, candidates: &[TextureFormat]) -> Option<TextureFormat> {
        candidates.iter().copied().find(|f| self.depth_formats.contains(f))
    }
}

#[cfg(test)]
#[path = "mock_graphics_device_tests.rs"]
mod tests;
