//! Headless bootstrap of a pack: compiles and links the program on the
//! software context, waits for channel textures, draws a few frames and
//! reports what happened.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use playground::LocalPack;
use renderer::{
    acquire_context_from, format_pixels, DefaultFetcher, FrameStatus, GlApiVersion, GlContext,
    HeadlessSurface, JoinState, Session, SteppedTimeSource,
};
use serde::Serialize;

use crate::bindings::program_config;
use crate::cli::CheckArgs;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CheckReport {
    pub pack: String,
    pub context: Option<String>,
    pub program: ProgramStatus,
    pub textures: TextureStatus,
    pub channels: Vec<ChannelReport>,
    pub frames_drawn: u64,
    pub inspected: Option<Vec<[u8; 4]>>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProgramStatus {
    Linked,
    Failed,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TextureStatus {
    None,
    Bound,
    Failed,
    TimedOut,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ChannelReport {
    pub index: usize,
    pub locator: String,
    pub width: u32,
    pub height: u32,
}

impl CheckReport {
    fn new(pack: String) -> Self {
        Self {
            pack,
            context: None,
            program: ProgramStatus::Failed,
            textures: TextureStatus::None,
            channels: Vec::new(),
            frames_drawn: 0,
            inspected: None,
            error: None,
        }
    }

    pub fn passed(&self) -> bool {
        self.program == ProgramStatus::Linked
            && matches!(self.textures, TextureStatus::None | TextureStatus::Bound)
    }
}

impl fmt::Display for CheckReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "pack:     {}", self.pack)?;
        writeln!(
            f,
            "context:  {}",
            self.context.as_deref().unwrap_or("unavailable")
        )?;
        let program = match self.program {
            ProgramStatus::Linked => "linked",
            ProgramStatus::Failed => "failed",
        };
        writeln!(f, "program:  {program}")?;
        let textures = match self.textures {
            TextureStatus::None => "none",
            TextureStatus::Bound => "bound",
            TextureStatus::Failed => "failed",
            TextureStatus::TimedOut => "timed out",
        };
        writeln!(f, "textures: {textures}")?;
        for channel in &self.channels {
            writeln!(
                f,
                "  iChannel{:<2} {}x{} {}",
                channel.index, channel.width, channel.height, channel.locator
            )?;
        }
        writeln!(f, "frames:   {}", self.frames_drawn)?;
        if let Some(pixels) = &self.inspected {
            writeln!(f, "pixels:   {}", format_pixels(pixels))?;
        }
        if let Some(error) = &self.error {
            writeln!(f, "error:    {error}")?;
        }
        Ok(())
    }
}

pub fn check_pack(root: &Path, args: &CheckArgs) -> Result<CheckReport> {
    let pack = LocalPack::load(root)
        .with_context(|| format!("failed to load playground pack at {}", root.display()))?;
    let config = program_config(&pack, &args.pack)?;
    let fetcher = DefaultFetcher::new(pack.root()).context("failed to prepare image fetcher")?;

    let mut report = CheckReport::new(pack.name());
    let versions: &[GlApiVersion] = if args.gles2_only {
        &[GlApiVersion::Gles2]
    } else {
        &GlApiVersion::PREFERENCE
    };
    let surface = HeadlessSurface::with_versions(versions);
    let acquired = match acquire_context_from(&surface, versions) {
        Ok(acquired) => acquired,
        Err(err) => {
            report.error = Some(err.to_string());
            return Ok(report);
        }
    };
    report.context = Some(acquired.version.to_string());

    let time_source = Box::new(SteppedTimeSource::sixty_hertz());
    let mut session =
        match Session::bootstrap(acquired.context, config, Arc::new(fetcher), time_source) {
            Ok(session) => session,
            Err(err) => {
                tracing::error!(error = %err, "shader program bootstrap failed");
                report.error = Some(err.to_string());
                return Ok(report);
            }
        };
    report.program = ProgramStatus::Linked;

    if let Some(state) = session.wait_for_textures(args.timeout) {
        match state {
            JoinState::Pending => {
                report.textures = TextureStatus::TimedOut;
                report.error = Some(format!(
                    "textures still loading after {}",
                    humantime::format_duration(args.timeout)
                ));
            }
            JoinState::Bound(channels) => {
                report.textures = TextureStatus::Bound;
                report.channels = channels
                    .iter()
                    .map(|channel| ChannelReport {
                        index: channel.index,
                        locator: channel.locator.clone(),
                        width: channel.texture.width,
                        height: channel.texture.height,
                    })
                    .collect();
            }
            JoinState::Failed(err) => {
                report.textures = TextureStatus::Failed;
                report.error = Some(err.to_string());
            }
        }
    }

    report.frames_drawn = draw_frames(&mut session, args.frames);
    report.inspected = args.inspect.map(|region| session.inspect(region));

    tracing::info!(
        pack = %report.pack,
        passed = report.passed(),
        frames = report.frames_drawn,
        "check finished"
    );
    Ok(report)
}

/// Draws until `target` frames exist in total or the driver stops.
fn draw_frames<G: GlContext>(session: &mut Session<G>, target: u64) -> u64 {
    while session.frames_drawn() < target {
        if session.frame() == FrameStatus::Stopped {
            tracing::warn!(
                drawn = session.frames_drawn(),
                target,
                "frame driver stopped before the requested frame count"
            );
            break;
        }
    }
    session.frames_drawn()
}
