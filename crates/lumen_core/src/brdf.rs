//! BRDF kinds and their host-side sampling.
//!
//! Each kind mirrors the `BRDF_Sample` / `BRDF_PDF` / `BRDF_Evaluate` entries of
//! its material program set. Directions are unit vectors; `incoming` points
//! toward the surface, `outgoing` away from it.

use std::f32::consts::PI;

use lumen_math::{Color, Vec3};
use rand::Rng;

use crate::program::sets;

/// Parameters a shading program reads besides its textures.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ShadingParams {
    /// Effective Metal fuzz, already clamped to [0, 1]
    pub fuzz: f32,
    pub ref_idx: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BrdfKind {
    Lambertian,
    Metal,
    Dielectric,
}

impl BrdfKind {
    pub const ALL: [BrdfKind; 3] = [BrdfKind::Lambertian, BrdfKind::Metal, BrdfKind::Dielectric];

    /// Slot in the BRDF program tables.
    pub fn index(self) -> usize {
        match self {
            BrdfKind::Lambertian => 0,
            BrdfKind::Metal => 1,
            BrdfKind::Dielectric => 2,
        }
    }

    pub fn program_set(self) -> &'static str {
        match self {
            BrdfKind::Lambertian => sets::LAMBERTIAN,
            BrdfKind::Metal => sets::METAL,
            BrdfKind::Dielectric => sets::DIELECTRIC,
        }
    }

    /// Delta distributions cannot be evaluated for arbitrary direction pairs.
    pub fn is_specular(self) -> bool {
        !matches!(self, BrdfKind::Lambertian)
    }

    /// Draw a scattered direction.
    ///
    /// `front_face` tells the dielectric which side of the surface the ray came from.
    pub fn sample<R: Rng + ?Sized>(
        self,
        params: &ShadingParams,
        normal: Vec3,
        incoming: Vec3,
        front_face: bool,
        rng: &mut R,
    ) -> Vec3 {
        match self {
            BrdfKind::Lambertian => {
                let local = random_cosine_direction(rng);
                Onb::from_w(normal).local(local).normalize()
            }
            BrdfKind::Metal => {
                let reflected = reflect(incoming.normalize(), normal);
                (reflected + params.fuzz * random_unit_vector(rng)).normalize_or_zero()
            }
            BrdfKind::Dielectric => {
                let ratio = if front_face {
                    1.0 / params.ref_idx
                } else {
                    params.ref_idx
                };
                let unit = incoming.normalize();
                let cos_theta = (-unit).dot(normal).min(1.0);
                let sin_theta = (1.0 - cos_theta * cos_theta).sqrt();

                let cannot_refract = ratio * sin_theta > 1.0;
                if cannot_refract || reflectance(cos_theta, ratio) > rng.gen::<f32>() {
                    reflect(unit, normal)
                } else {
                    refract(unit, normal, ratio)
                }
            }
        }
    }

    /// Density of `outgoing` under `sample`. Specular kinds report 1.
    pub fn pdf(self, normal: Vec3, outgoing: Vec3) -> f32 {
        match self {
            BrdfKind::Lambertian => (normal.dot(outgoing.normalize()) / PI).max(0.0),
            BrdfKind::Metal | BrdfKind::Dielectric => 1.0,
        }
    }

    /// BRDF value times the cosine term.
    pub fn eval(self, albedo: Color, normal: Vec3, outgoing: Vec3) -> Color {
        match self {
            BrdfKind::Lambertian => albedo * (normal.dot(outgoing.normalize()) / PI).max(0.0),
            BrdfKind::Metal => albedo,
            BrdfKind::Dielectric => Color::ONE,
        }
    }
}

/// Orthonormal basis around a normal.
#[derive(Debug, Clone, Copy)]
pub struct Onb {
    pub u: Vec3,
    pub v: Vec3,
    pub w: Vec3,
}

impl Onb {
    pub fn from_w(n: Vec3) -> Self {
        let w = n.normalize();
        let a = if w.x.abs() > 0.9 { Vec3::Y } else { Vec3::X };
        let v = w.cross(a).normalize();
        let u = w.cross(v);
        Self { u, v, w }
    }

    pub fn local(&self, a: Vec3) -> Vec3 {
        a.x * self.u + a.y * self.v + a.z * self.w
    }
}

#[inline]
pub fn reflect(v: Vec3, n: Vec3) -> Vec3 {
    v - 2.0 * v.dot(n) * n
}

#[inline]
pub fn refract(uv: Vec3, n: Vec3, etai_over_etat: f32) -> Vec3 {
    let cos_theta = (-uv).dot(n).min(1.0);
    let r_out_perp = etai_over_etat * (uv + cos_theta * n);
    let r_out_parallel = -(1.0 - r_out_perp.length_squared()).abs().sqrt() * n;
    r_out_perp + r_out_parallel
}

/// Schlick's approximation for reflectance.
fn reflectance(cosine: f32, ratio: f32) -> f32 {
    let r0 = ((1.0 - ratio) / (1.0 + ratio)).powi(2);
    r0 + (1.0 - r0) * (1.0 - cosine).powi(5)
}

/// Uniform direction on the unit sphere.
pub fn random_unit_vector<R: Rng + ?Sized>(rng: &mut R) -> Vec3 {
    loop {
        let v = Vec3::new(
            rng.gen::<f32>() * 2.0 - 1.0,
            rng.gen::<f32>() * 2.0 - 1.0,
            rng.gen::<f32>() * 2.0 - 1.0,
        );
        let len_sq = v.length_squared();
        if len_sq > 1e-8 && len_sq <= 1.0 {
            return v / len_sq.sqrt();
        }
    }
}

/// Cosine-weighted direction about +Z.
pub fn random_cosine_direction<R: Rng + ?Sized>(rng: &mut R) -> Vec3 {
    let r1: f32 = rng.gen();
    let r2: f32 = rng.gen();
    let phi = 2.0 * PI * r1;
    let z = (1.0 - r2).sqrt();
    Vec3::new(phi.cos() * r2.sqrt(), phi.sin() * r2.sqrt(), z)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_lambertian_samples_upper_hemisphere() {
        let mut rng = StdRng::seed_from_u64(7);
        let normal = Vec3::new(0.0, 1.0, 1.0).normalize();
        let params = ShadingParams::default();

        for _ in 0..200 {
            let dir = BrdfKind::Lambertian.sample(&params, normal, -normal, true, &mut rng);
            assert!(dir.dot(normal) >= -1e-5);
            assert!((dir.length() - 1.0).abs() < 1e-4);
            assert!(BrdfKind::Lambertian.pdf(normal, dir) >= 0.0);
        }
    }

    #[test]
    fn test_lambertian_pdf_and_eval() {
        let pdf = BrdfKind::Lambertian.pdf(Vec3::Z, Vec3::Z);
        assert!((pdf - 1.0 / PI).abs() < 1e-6);
        assert_eq!(BrdfKind::Lambertian.pdf(Vec3::Z, -Vec3::Z), 0.0);

        let value = BrdfKind::Lambertian.eval(Color::splat(0.5), Vec3::Z, Vec3::Z);
        assert!((value.x - 0.5 / PI).abs() < 1e-6);
    }

    #[test]
    fn test_smooth_metal_is_mirror() {
        let mut rng = StdRng::seed_from_u64(1);
        let params = ShadingParams { fuzz: 0.0, ref_idx: 0.0 };
        let incoming = Vec3::new(1.0, -1.0, 0.0).normalize();

        let out = BrdfKind::Metal.sample(&params, Vec3::Y, incoming, true, &mut rng);
        assert!((out - Vec3::new(1.0, 1.0, 0.0).normalize()).length() < 1e-5);
        assert_eq!(BrdfKind::Metal.pdf(Vec3::Y, out), 1.0);
    }

    #[test]
    fn test_dielectric_total_internal_reflection() {
        let mut rng = StdRng::seed_from_u64(3);
        let params = ShadingParams { fuzz: 0.0, ref_idx: 1.5 };
        // Leaving glass at a grazing angle
        let incoming = Vec3::new(1.0, -0.1, 0.0).normalize();

        let out = BrdfKind::Dielectric.sample(&params, Vec3::Y, incoming, false, &mut rng);
        assert!(out.y > 0.0);
    }

    #[test]
    fn test_table_indices_are_distinct() {
        let mut seen: Vec<usize> = BrdfKind::ALL.iter().map(|k| k.index()).collect();
        seen.sort();
        assert_eq!(seen, vec![0, 1, 2]);
    }
}
