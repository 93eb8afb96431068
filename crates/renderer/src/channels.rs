//! All-or-nothing join over a set of texture loads.
//!
//! Every descriptor starts loading at once. Samplers are bound only when all
//! loads succeed: the ready callback runs first, then each texture is bound
//! to unit `N` and `iChannelN` set to `N` in ascending order. The first
//! failure settles the join as failed; loads still in flight keep uploading
//! as they arrive but are never bound.

use std::time::Instant;

use crate::error::TextureError;
use crate::fetch::SharedFetcher;
use crate::gl::GlContext;
use crate::texture::{begin_load, PendingTexture};
use crate::types::{channel_resolution_uniform, channel_uniform, LoadedTexture, TextureDescriptor};

/// Invoked once, right before samplers are bound.
pub type ReadyCallback = Box<dyn FnOnce()>;

/// A texture bound to sampler unit `index`.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundChannel<T> {
    pub index: usize,
    pub locator: String,
    pub texture: LoadedTexture<T>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum JoinState<T> {
    Pending,
    Bound(Vec<BoundChannel<T>>),
    Failed(TextureError),
}

impl<T> JoinState<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, JoinState::Pending)
    }
}

pub struct ChannelJoin<T> {
    pending: Vec<PendingTexture<T>>,
    loaded: Vec<Option<LoadedTexture<T>>>,
    locators: Vec<String>,
    pixel_ratio: f32,
    on_ready: Option<ReadyCallback>,
    state: JoinState<T>,
}

impl<T: Copy> ChannelJoin<T> {
    /// Begins loading every descriptor; index `i` becomes `iChannel<i>`.
    pub fn start<G>(
        gl: &G,
        descriptors: Vec<TextureDescriptor>,
        fetcher: SharedFetcher,
        pixel_ratio: f32,
        on_ready: Option<ReadyCallback>,
    ) -> Self
    where
        G: GlContext<Texture = T>,
    {
        let mut join = Self {
            pending: Vec::with_capacity(descriptors.len()),
            loaded: vec![None; descriptors.len()],
            locators: descriptors.iter().map(|d| d.locator.clone()).collect(),
            pixel_ratio,
            on_ready,
            state: JoinState::Pending,
        };
        for (index, descriptor) in descriptors.into_iter().enumerate() {
            match begin_load(gl, index, descriptor, fetcher.clone()) {
                Ok(pending) => join.pending.push(pending),
                Err(err) => join.fail(err),
            }
        }
        tracing::debug!(
            channels = join.locators.len(),
            started = join.pending.len(),
            "channel join started"
        );
        join
    }

    pub fn state(&self) -> &JoinState<T> {
        &self.state
    }

    /// Loads that have not delivered their outcome yet, including loads
    /// draining after a failure.
    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    /// Uploads whatever has arrived and binds samplers once everything has.
    pub fn poll<G>(&mut self, gl: &G, program: G::Program) -> &JoinState<T>
    where
        G: GlContext<Texture = T>,
    {
        let outcomes: Vec<_> = self
            .pending
            .iter_mut()
            .map(|pending| (pending.index(), pending.poll(gl)))
            .collect();
        self.pending.retain(|pending| !pending.is_finished());
        for (index, outcome) in outcomes {
            self.record(index, outcome);
        }
        self.try_bind(gl, program);
        &self.state
    }

    /// Blocks until the join settles or `deadline` passes.
    pub fn wait<G>(&mut self, gl: &G, program: G::Program, deadline: Instant) -> &JoinState<T>
    where
        G: GlContext<Texture = T>,
    {
        loop {
            self.poll(gl, program);
            if !self.state.is_pending() || Instant::now() >= deadline {
                break;
            }
            let Some(pending) = self.pending.first_mut() else {
                break;
            };
            let index = pending.index();
            let outcome = pending.wait(gl, deadline);
            self.pending.retain(|pending| !pending.is_finished());
            self.record(index, outcome);
        }
        &self.state
    }

    fn record(&mut self, index: usize, outcome: Result<Option<LoadedTexture<T>>, TextureError>) {
        match outcome {
            Ok(Some(loaded)) => {
                if let Some(slot) = self.loaded.get_mut(index) {
                    *slot = Some(loaded);
                }
            }
            Ok(None) => {}
            Err(err) => self.fail(err),
        }
    }

    fn fail(&mut self, err: TextureError) {
        if !self.state.is_pending() {
            tracing::debug!(error = %err, "texture failed after channel join settled");
            return;
        }
        tracing::error!(
            locator = err.locator().unwrap_or("<none>"),
            error = %err,
            "texture channel failed; samplers left unbound"
        );
        self.on_ready = None;
        self.state = JoinState::Failed(err);
    }

    fn try_bind<G>(&mut self, gl: &G, program: G::Program)
    where
        G: GlContext<Texture = T>,
    {
        if !self.state.is_pending() || self.loaded.iter().any(Option::is_none) {
            return;
        }

        let channels: Vec<BoundChannel<T>> = self
            .loaded
            .iter_mut()
            .zip(&self.locators)
            .enumerate()
            .filter_map(|(index, (slot, locator))| {
                slot.take().map(|texture| BoundChannel {
                    index,
                    locator: locator.clone(),
                    texture,
                })
            })
            .collect();

        if let Some(callback) = self.on_ready.take() {
            callback();
        }

        for channel in &channels {
            let unit = channel.index as u32;
            gl.active_texture(unit);
            gl.bind_texture_2d(Some(channel.texture.texture));
            let sampler = gl.uniform_location(program, &channel_uniform(channel.index));
            gl.uniform_1_i32(sampler.as_ref(), channel.index as i32);
            let resolution =
                gl.uniform_location(program, &channel_resolution_uniform(channel.index));
            gl.uniform_3_f32(
                resolution.as_ref(),
                channel.texture.width as f32 * self.pixel_ratio,
                channel.texture.height as f32 * self.pixel_ratio,
                0.0,
            );
        }

        tracing::info!(channels = channels.len(), "texture channels bound");
        self.state = JoinState::Bound(channels);
    }
}
