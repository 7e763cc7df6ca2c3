//! Render system
//!
//! Owns the pipeline nodes, the model buffer pool, and the per-object GPU
//! buffers. Models draw in the first stage with interpolated transforms;
//! later stages run fullscreen over the previous stage's textures.

use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::time::Duration;

use log::{debug, info};
use nalgebra::Perspective3;

use crate::assets::{AssetCache, ShaderStage, SlotKind};
use crate::ecs::components::{Model, Orientation, PlayerCamera, Position};
use crate::ecs::registry::{ObjectId, Registry};
use crate::ecs::system::System;
use crate::ecs::systems::Integrator;
use crate::engine::{Engine, EngineError};
use crate::foundation::math::Mat4;
use crate::render::device::Device;
use crate::render::pipeline::validate_wiring;
use crate::render::pool::{BufferPool, ModelBuffers};
use crate::render::UniformValue;

const FOV_Y: f32 = std::f32::consts::FRAC_PI_3;
const Z_NEAR: f32 = 0.1;
const Z_FAR: f32 = 1000.0;

struct PipelineNode {
    name: String,
    program: glow::Program,
    /// Render target; `None` draws to the default framebuffer.
    framebuffer: Option<glow::Framebuffer>,
    /// Uniform names this node accepts via broadcast.
    uniforms: HashSet<String>,
    /// Textures sampled from the previous node, in slot order.
    inputs: Vec<(String, glow::Texture)>,
}

/// Multi-pass renderer.
pub struct RenderSystem {
    device: Device,
    nodes: Vec<PipelineNode>,
    pool: BufferPool,
    models: HashMap<ObjectId, ModelBuffers>,
    quad: (glow::VertexArray, glow::Buffer),
    uniforms: HashMap<String, UniformValue>,
    projection: Mat4,
    width: u32,
    height: u32,
}

impl RenderSystem {
    /// Build the pipeline from the named shader stage assets.
    ///
    /// Wiring is validated before any GL object is created, so a bad
    /// configuration fails without leaking driver resources.
    pub fn new(
        gl: Rc<glow::Context>,
        assets: &mut AssetCache,
        stage_names: &[String],
        width: u32,
        height: u32,
    ) -> Result<Self, EngineError> {
        let device = Device::new(gl);
        let nodes = Self::build_nodes(&device, assets, stage_names, width, height)?;
        let quad = device.create_quad()?;
        info!(
            "render pipeline ready: {} stage(s), {width}x{height}",
            nodes.len()
        );

        let mut system = Self {
            device,
            nodes,
            pool: BufferPool::new(),
            models: HashMap::new(),
            quad,
            uniforms: HashMap::new(),
            projection: projection(width, height),
            width,
            height,
        };
        system.upload_projection();
        Ok(system)
    }

    fn build_nodes(
        device: &Device,
        assets: &mut AssetCache,
        stage_names: &[String],
        width: u32,
        height: u32,
    ) -> Result<Vec<PipelineNode>, EngineError> {
        let mut stages = Vec::with_capacity(stage_names.len());
        for name in stage_names {
            let stage = assets.get::<ShaderStage>(name)?;
            stages.push((name.clone(), (*stage).clone()));
        }
        validate_wiring(&stages).map_err(EngineError::from)?;

        let mut nodes = Vec::with_capacity(stages.len());
        for (name, stage) in &stages {
            let program = device.compile_program(name, &stage.vertex, &stage.fragment)?;
            nodes.push(PipelineNode {
                name: name.clone(),
                program,
                framebuffer: None,
                uniforms: stage.uniforms.iter().cloned().collect(),
                inputs: Vec::new(),
            });
        }

        // One framebuffer per adjacent pair, owned by the producing node and
        // backed by a texture per slot the consuming node samples.
        for i in 0..stages.len().saturating_sub(1) {
            let consumer = &stages[i + 1].1;
            let mut colors = Vec::new();
            let mut depth = None;
            let mut inputs = Vec::new();
            for slot in &consumer.ins {
                let texture = match slot.kind {
                    SlotKind::Color => {
                        let texture = device.create_color_texture(width as i32, height as i32)?;
                        colors.push(texture);
                        texture
                    }
                    SlotKind::Depth => {
                        let texture = device.create_depth_texture(width as i32, height as i32)?;
                        depth = Some(texture);
                        texture
                    }
                };
                inputs.push((slot.name.clone(), texture));
            }
            let framebuffer = device.create_framebuffer(&colors, depth)?;
            nodes[i].framebuffer = Some(framebuffer);
            nodes[i + 1].inputs = inputs;
        }
        Ok(nodes)
    }

    /// Replace the stage chain with one built from `stage_names`.
    ///
    /// The old chain is torn down only after the new one builds, so a build
    /// error leaves the current pipeline running. Stored uniform values and
    /// the projection are re-uploaded into the new programs.
    pub fn rebuild_pipeline(
        &mut self,
        assets: &mut AssetCache,
        stage_names: &[String],
    ) -> Result<(), EngineError> {
        let nodes = Self::build_nodes(&self.device, assets, stage_names, self.width, self.height)?;
        let old = std::mem::replace(&mut self.nodes, nodes);
        self.delete_nodes(old);
        info!("render pipeline rebuilt: {} stage(s)", self.nodes.len());
        self.upload_projection();
        for (index, name, value) in replay_targets(&self.uniforms, &self.nodes) {
            self.device.set_uniform(self.nodes[index].program, name, value);
        }
        Ok(())
    }

    /// Store a uniform value and push it to every stage declaring its name.
    ///
    /// Stored values survive a [`RenderSystem::rebuild_pipeline`]; stages
    /// built later that declare the name receive it without another call.
    pub fn set_uniform(&mut self, name: &str, value: UniformValue) {
        self.uniforms.insert(name.to_string(), value);
        for node in &self.nodes {
            if node.uniforms.contains(name) {
                self.device.set_uniform(node.program, name, &value);
            }
        }
    }

    fn delete_nodes(&self, nodes: Vec<PipelineNode>) {
        for node in nodes {
            self.device.delete_program(node.program);
            if let Some(framebuffer) = node.framebuffer {
                self.device.delete_framebuffer(framebuffer);
            }
            // Each intermediate texture is owned by exactly one node's
            // input list, so this frees each one once.
            for (_, texture) in node.inputs {
                self.device.delete_texture(texture);
            }
        }
    }

    /// Stage names in draw order.
    pub fn stage_names(&self) -> Vec<&str> {
        self.nodes.iter().map(|node| node.name.as_str()).collect()
    }

    /// Number of models with live GPU buffers.
    pub fn model_count(&self) -> usize {
        self.models.len()
    }

    fn upload_projection(&self) {
        if let Some(node) = self.nodes.first() {
            self.device
                .set_uniform(node.program, "u_projection", &UniformValue::Mat4(self.projection));
        }
    }

    fn camera_view(registry: &Registry, alpha: f32) -> Mat4 {
        let Some((id, camera)) = registry.iter::<PlayerCamera>().next() else {
            return Mat4::identity();
        };
        let mut view = Mat4::new_translation(&-camera.distance.temporal(alpha))
            * camera.orientation.to_homogeneous();
        if let Some(position) = registry.get::<Position>(id) {
            view *= Mat4::new_translation(&-position.0.temporal(alpha));
        }
        view
    }

    fn model_transform(registry: &Registry, id: ObjectId, alpha: f32) -> Mat4 {
        let mut transform = Mat4::identity();
        if let Some(position) = registry.get::<Position>(id) {
            transform = Mat4::new_translation(&position.0.temporal(alpha));
        }
        if let Some(orientation) = registry.get::<Orientation>(id) {
            transform *= orientation.0.to_homogeneous();
        }
        transform
    }
}

impl System for RenderSystem {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn update(&mut self, engine: &mut Engine, _dt: Duration) -> Result<(), EngineError> {
        let Some(scene) = self.nodes.first() else {
            return Ok(());
        };
        let alpha = engine.system::<Integrator>().map_or(1.0, Integrator::alpha);
        let registry = engine.registry();
        let view = Self::camera_view(registry, alpha);

        let width = self.width as i32;
        let height = self.height as i32;
        self.device
            .begin_pass(scene.framebuffer, width, height, true);
        for (id, buffers) in &self.models {
            let model_view = view * Self::model_transform(registry, *id, alpha);
            self.device
                .set_uniform(scene.program, "u_model_view", &UniformValue::Mat4(model_view));
            self.device.draw_model(scene.program, buffers);
        }

        for node in &self.nodes[1..] {
            self.device
                .begin_pass(node.framebuffer, width, height, false);
            self.device.bind_inputs(node.program, &node.inputs);
            self.device.draw_quad(node.program, self.quad.0);
        }
        Ok(())
    }

    fn component_added(
        &mut self,
        engine: &mut Engine,
        id: ObjectId,
        type_id: TypeId,
    ) -> Result<(), EngineError> {
        if type_id != TypeId::of::<Model>() {
            return Ok(());
        }
        let Some(model) = engine.registry().get::<Model>(id) else {
            return Ok(());
        };
        let required = model.num_vertices() as i32;
        let mut buffers = match self.pool.acquire(required) {
            Some(buffers) => {
                debug!(
                    "recycled buffers (capacity {}) for model of {required} vertices",
                    buffers.capacity
                );
                buffers
            }
            None => self.device.create_model_buffers(required)?,
        };
        self.device
            .upload_model(&mut buffers, &model.vertices, &model.normals);
        self.models.insert(id, buffers);
        Ok(())
    }

    fn component_removed(
        &mut self,
        _engine: &mut Engine,
        id: ObjectId,
        type_id: TypeId,
    ) -> Result<(), EngineError> {
        if type_id != TypeId::of::<Model>() {
            return Ok(());
        }
        if let Some(buffers) = self.models.remove(&id) {
            self.pool.release(buffers);
        }
        Ok(())
    }

    fn window_resized(
        &mut self,
        _engine: &mut Engine,
        width: u32,
        height: u32,
    ) -> Result<(), EngineError> {
        // Intermediate textures keep their allocation size; only the
        // viewport and projection follow the window.
        self.width = width;
        self.height = height;
        self.projection = projection(width, height);
        self.upload_projection();
        Ok(())
    }
}

impl Drop for RenderSystem {
    fn drop(&mut self) {
        debug!(
            "releasing render resources: {} model(s), {} pooled buffer(s), {} stage(s)",
            self.models.len(),
            self.pool.len(),
            self.nodes.len()
        );
        for (_, buffers) in std::mem::take(&mut self.models) {
            self.device.delete_model_buffers(buffers);
        }
        for buffers in self.pool.drain() {
            self.device.delete_model_buffers(buffers);
        }
        let nodes = std::mem::take(&mut self.nodes);
        self.delete_nodes(nodes);
        self.device.delete_quad(self.quad);
    }
}

fn projection(width: u32, height: u32) -> Mat4 {
    let aspect = width as f32 / height.max(1) as f32;
    Perspective3::new(aspect, FOV_Y, Z_NEAR, Z_FAR).to_homogeneous()
}

/// Pairs each stored uniform with every node declaring its name, for
/// re-upload after a pipeline rebuild.
fn replay_targets<'a>(
    uniforms: &'a HashMap<String, UniformValue>,
    nodes: &[PipelineNode],
) -> Vec<(usize, &'a str, &'a UniformValue)> {
    let mut targets = Vec::new();
    for (name, value) in uniforms {
        for (index, node) in nodes.iter().enumerate() {
            if node.uniforms.contains(name) {
                targets.push((index, name.as_str(), value));
            }
        }
    }
    targets
}
