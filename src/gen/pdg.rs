//! Classification of PDG Monte Carlo particle codes.
//!
//! A code is read as the digit string `±n nr nL nq1 nq2 nq3 nJ`. Hadrons are the mesons
//! (`nq1 = 0`, two quark digits) and the baryons (three quark digits), plus a few special
//! codes (K⁰_L, K⁰_S, …) that do not follow the digit pattern.
use crate::constants::PdgId;

fn digit(abs_id: u32, position: u32) -> u32 {
    (abs_id / 10u32.pow(position)) % 10
}

/// Bits beyond the seven standard digits (nuclei, exotic extensions).
fn extra_bits(abs_id: u32) -> u32 {
    abs_id / 10_000_000
}

/// Code of fundamental particles (quarks, leptons, bosons), 0 for composite ones.
fn fundamental_id(abs_id: u32) -> u32 {
    if digit(abs_id, 2) == 0 && digit(abs_id, 3) == 0 {
        abs_id % 10_000
    } else if abs_id <= 102 {
        abs_id
    } else {
        0
    }
}

fn composite_candidate(abs_id: u32) -> bool {
    if extra_bits(abs_id) > 0 || abs_id <= 100 {
        return false;
    }
    let fid = fundamental_id(abs_id);
    !(fid > 0 && fid <= 100)
}

pub fn is_meson(pdg_id: PdgId) -> bool {
    let abs_id = pdg_id.unsigned_abs();
    if !composite_candidate(abs_id) {
        return false;
    }
    if matches!(abs_id, 130 | 310 | 210 | 150 | 350 | 510 | 530) {
        return true;
    }
    if matches!(pdg_id, 110 | 990 | 9990) {
        return true;
    }

    let (nj, nq3, nq2, nq1) = (
        digit(abs_id, 0),
        digit(abs_id, 1),
        digit(abs_id, 2),
        digit(abs_id, 3),
    );
    if nj > 0 && nq3 > 0 && nq2 > 0 && nq1 == 0 {
        // quarkonia are their own antiparticles
        return !(nq3 == nq2 && pdg_id < 0);
    }
    false
}

pub fn is_baryon(pdg_id: PdgId) -> bool {
    let abs_id = pdg_id.unsigned_abs();
    if !composite_candidate(abs_id) {
        return false;
    }
    if matches!(abs_id, 2110 | 2210) {
        return true;
    }
    digit(abs_id, 0) > 0 && digit(abs_id, 1) > 0 && digit(abs_id, 2) > 0 && digit(abs_id, 3) > 0
}

pub fn is_hadron(pdg_id: PdgId) -> bool {
    is_meson(pdg_id) || is_baryon(pdg_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mesons() {
        for id in [111, 211, -211, 130, 310, 321, 421, 511, -521, 443, 553] {
            assert!(is_meson(id), "{id} should be a meson");
            assert!(is_hadron(id));
        }
        // c c̄ has no antiparticle
        assert!(!is_meson(-443));
    }

    #[test]
    fn test_baryons() {
        for id in [2212, -2212, 2112, 3122, 4122, 5122] {
            assert!(is_baryon(id), "{id} should be a baryon");
            assert!(is_hadron(id));
        }
    }

    #[test]
    fn test_non_hadrons() {
        for id in [1, 5, 11, -13, 15, 21, 22, 23, 24, 25, 1000022] {
            assert!(!is_hadron(id), "{id} should not be a hadron");
        }
    }
}
