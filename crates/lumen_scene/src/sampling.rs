//! Importance-sampling wiring: BRDF and light program tables plus the
//! ray-generation entry point that reads them.

use std::sync::Arc;

use lumen_core::{sets, BrdfKind, Buffer, ProgramId, RenderContext};
use lumen_math::{Color, Vec3};
use rand::RngCore;

use crate::background::BoundBackground;
use crate::error::{SamplingError, SamplingResult};
use crate::group::SceneGroup;
use crate::lights::{LightEntry, LightTable};

/// Entry name of the ray-generation program.
pub const RAY_GENERATION_ENTRY: &str = "renderPixel";

/// The three callable programs of one BRDF kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrdfPrograms {
    pub sample: ProgramId,
    pub pdf: ProgramId,
    pub eval: ProgramId,
}

/// BRDF programs for every kind, indexed by `BrdfKind::index()`.
#[derive(Debug, Clone)]
pub struct BrdfSampler {
    programs: Vec<BrdfPrograms>,
}

impl BrdfSampler {
    pub fn standard(ctx: &mut RenderContext) -> SamplingResult<Self> {
        let programs = BrdfKind::ALL
            .iter()
            .map(|kind| -> SamplingResult<BrdfPrograms> {
                let set = kind.program_set();
                Ok(BrdfPrograms {
                    sample: ctx.create_program(set, "BRDF_Sample")?,
                    pdf: ctx.create_program(set, "BRDF_PDF")?,
                    eval: ctx.create_program(set, "BRDF_Evaluate")?,
                })
            })
            .collect::<SamplingResult<Vec<_>>>()?;
        Ok(Self { programs })
    }

    pub fn programs(&self, kind: BrdfKind) -> BrdfPrograms {
        self.programs[kind.index()]
    }

    fn table(&self, ctx: &mut RenderContext, label: &str, pick: fn(&BrdfPrograms) -> ProgramId) -> SamplingResult<Buffer<ProgramId>> {
        let ids: Vec<ProgramId> = self.programs.iter().map(pick).collect();
        Ok(ctx.buffer_from_slice(label, &ids)?)
    }
}

/// `sample` and `pdf` programs of one light.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightPrograms {
    pub sample: ProgramId,
    pub pdf: ProgramId,
}

/// Light table plus the callable programs of each light.
#[derive(Debug, Clone)]
pub struct LightSampler {
    table: LightTable,
    programs: Vec<LightPrograms>,
}

impl LightSampler {
    pub fn from_table(ctx: &mut RenderContext, table: LightTable) -> SamplingResult<Self> {
        let mut programs = Vec::with_capacity(table.len());
        for entry in table.entries() {
            let kind = entry.primitive.kind();
            let (sample, pdf) = kind.light_entries().ok_or(SamplingError::UnsupportedLight(kind))?;
            programs.push(LightPrograms {
                sample: ctx.create_program(kind.program_set(), &sample)?,
                pdf: ctx.create_program(kind.program_set(), &pdf)?,
            });
        }
        Ok(Self { table, programs })
    }

    pub fn table(&self) -> &LightTable {
        &self.table
    }

    pub fn programs(&self) -> &[LightPrograms] {
        &self.programs
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    /// World direction from `origin` toward light `index`.
    pub fn sample_direction(&self, index: usize, origin: Vec3, rng: &mut dyn RngCore) -> SamplingResult<Vec3> {
        let entry = self.entry(index)?;
        Ok(entry.random_direction(origin, rng))
    }

    /// Density of `direction` when sampling light `index` from `origin`.
    pub fn pdf(&self, index: usize, origin: Vec3, direction: Vec3) -> SamplingResult<f32> {
        Ok(self.entry(index)?.pdf_value(origin, direction))
    }

    /// Density when a light is picked uniformly, then sampled.
    pub fn mixture_pdf(&self, origin: Vec3, direction: Vec3) -> f32 {
        if self.table.is_empty() {
            return 0.0;
        }
        let sum: f32 = self
            .table
            .entries()
            .iter()
            .map(|e| e.pdf_value(origin, direction))
            .sum();
        sum / self.table.len() as f32
    }

    fn entry(&self, index: usize) -> SamplingResult<&LightEntry> {
        self.table.entries().get(index).ok_or(SamplingError::LightIndex {
            index,
            count: self.table.len(),
        })
    }
}

/// Sealed light-sampling buffers. Index i refers to the same light in all three.
#[derive(Debug, Clone)]
pub struct LightBuffers {
    pub sample: Buffer<ProgramId>,
    pub pdf: Buffer<ProgramId>,
    pub emissions: Buffer<Color>,
}

/// Everything the ray-generation program reads.
#[derive(Debug, Clone)]
pub struct RenderEntryPoint {
    pub ray_generation: ProgramId,
    pub miss: Option<ProgramId>,
    pub brdf_sample: Buffer<ProgramId>,
    pub brdf_pdf: Buffer<ProgramId>,
    pub brdf_eval: Buffer<ProgramId>,
    /// Flat scattering-density table, present without light sampling
    pub scattering_pdf: Option<Buffer<ProgramId>>,
    pub lights: Option<LightBuffers>,
    pub background: Option<BoundBackground>,
    pub group: Arc<SceneGroup>,
}

impl RenderEntryPoint {
    pub fn num_lights(&self) -> u32 {
        self.lights.as_ref().map_or(0, |l| l.emissions.len() as u32)
    }

    pub fn background(&self) -> Option<&BoundBackground> {
        self.background.as_ref()
    }

    fn with_brdf(ctx: &mut RenderContext, brdf: &BrdfSampler, group: Arc<SceneGroup>) -> SamplingResult<Self> {
        let ray_generation = ctx.create_program(sets::RAYGEN, RAY_GENERATION_ENTRY)?;
        ctx.set_ray_generation_program(ray_generation);
        Ok(Self {
            ray_generation,
            miss: None,
            brdf_sample: brdf.table(ctx, "BRDF_Sample", |p| p.sample)?,
            brdf_pdf: brdf.table(ctx, "BRDF_PDF", |p| p.pdf)?,
            brdf_eval: brdf.table(ctx, "BRDF_Evaluate", |p| p.eval)?,
            scattering_pdf: None,
            lights: None,
            background: None,
            group,
        })
    }
}

/// Wire BRDF and light tables for light-sampled rendering.
pub fn wire(
    ctx: &mut RenderContext,
    brdf: &BrdfSampler,
    lights: &LightSampler,
    group: Arc<SceneGroup>,
) -> SamplingResult<RenderEntryPoint> {
    let emissions = lights.table().emissions();
    if emissions.len() != lights.len() {
        return Err(SamplingError::TableMismatch {
            lights: lights.len(),
            emissions: emissions.len(),
        });
    }

    let mut entry = RenderEntryPoint::with_brdf(ctx, brdf, group)?;
    let sample: Vec<ProgramId> = lights.programs().iter().map(|p| p.sample).collect();
    let pdf: Vec<ProgramId> = lights.programs().iter().map(|p| p.pdf).collect();
    entry.lights = Some(LightBuffers {
        sample: ctx.buffer_from_slice("Light_Sample", &sample)?,
        pdf: ctx.buffer_from_slice("Light_PDF", &pdf)?,
        emissions: ctx.buffer_from_slice("Light_Emissions", &emissions)?,
    });

    log::info!("Wired entry point with {} lights", entry.num_lights());
    Ok(entry)
}

/// Wire BRDF tables only; scattering is sampled from the BRDFs alone.
pub fn wire_brdf_only(
    ctx: &mut RenderContext,
    brdf: &BrdfSampler,
    group: Arc<SceneGroup>,
) -> SamplingResult<RenderEntryPoint> {
    let mut entry = RenderEntryPoint::with_brdf(ctx, brdf, group)?;
    let scattering = BrdfKind::ALL
        .iter()
        .map(|kind| ctx.create_program(kind.program_set(), "scattering_pdf"))
        .collect::<Result<Vec<_>, _>>()?;
    entry.scattering_pdf = Some(ctx.buffer_from_slice("scattering_pdf", &scattering)?);

    log::info!("Wired entry point without light sampling");
    Ok(entry)
}

/// Install the exception program.
pub fn set_exception_program(ctx: &mut RenderContext) -> SamplingResult<ProgramId> {
    let program = ctx.create_program(sets::EXCEPTION, "exception_program")?;
    ctx.set_exception_program(program);
    Ok(program)
}
