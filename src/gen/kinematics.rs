use std::f64::consts::PI;

use nalgebra::Vector4;
use serde::{Deserialize, Serialize};

use crate::constants::{GeV, Radian};

/// Four-momentum in collider coordinates (pt, η, φ, m).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct P4 {
    pub pt: GeV,
    pub eta: f64,
    pub phi: Radian,
    pub mass: GeV,
}

impl P4 {
    pub fn new(pt: GeV, eta: f64, phi: Radian, mass: GeV) -> Self {
        P4 { pt, eta, phi, mass }
    }

    pub fn massless(pt: GeV, eta: f64, phi: Radian) -> Self {
        P4::new(pt, eta, phi, 0.0)
    }

    pub fn px(&self) -> GeV {
        self.pt * self.phi.cos()
    }

    pub fn py(&self) -> GeV {
        self.pt * self.phi.sin()
    }

    pub fn pz(&self) -> GeV {
        self.pt * self.eta.sinh()
    }

    pub fn energy(&self) -> GeV {
        let p = self.pt * self.eta.cosh();
        (p * p + self.mass * self.mass).sqrt()
    }

    /// Cartesian four-vector `(px, py, pz, E)`.
    pub fn to_cartesian(&self) -> Vector4<f64> {
        Vector4::new(self.px(), self.py(), self.pz(), self.energy())
    }

    /// Rapidity `y = ½ ln((E + pz) / (E − pz))`.
    ///
    /// A particle with no transverse momentum and no mass moving along the beam has infinite
    /// rapidity of the sign of `pz`; a particle at rest has `y = 0`.
    pub fn rapidity(&self) -> f64 {
        let e = self.energy();
        let pz = self.pz();
        let num = e + pz;
        let den = e - pz;

        if den <= 0.0 || num <= 0.0 {
            return if pz == 0.0 { 0.0 } else { f64::INFINITY.copysign(pz) };
        }
        0.5 * (num / den).ln()
    }
}

/// Azimuthal difference folded into `[-π, π)`.
///
/// Non-finite angles give `NaN`, which compares false against every tolerance.
pub fn delta_phi(phi1: Radian, phi2: Radian) -> Radian {
    (phi1 - phi2 + PI).rem_euclid(2.0 * PI) - PI
}

/// Squared angular separation `Δη² + Δφ²`.
pub fn delta_r2(a: &P4, b: &P4) -> f64 {
    let deta = a.eta - b.eta;
    let dphi = delta_phi(a.phi, b.phi);
    deta * deta + dphi * dphi
}

/// Angular separation `ΔR`.
pub fn delta_r(a: &P4, b: &P4) -> f64 {
    delta_r2(a, b).sqrt()
}
