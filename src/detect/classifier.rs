// FrameClassifier - per-frame snore-likeness decision
//
// A frame is snore-like only when every rule agrees: enough energy, a
// fundamental inside the snore band, a low spectral centroid and a low
// zero-crossing rate. Missing f0 (unvoiced frame) fails the f0 rule.
// Thresholds come pre-scaled by the master sensitivity.

use crate::config::SensitivityConfig;
use crate::dsp::FeatureVector;

/// Classify one frame against the effective thresholds.
///
/// Pure function of `(features, config)`; all rules are combined with AND.
pub fn classify_frame(features: &FeatureVector, config: &SensitivityConfig) -> bool {
    if features.energy < config.effective_energy_threshold() {
        return false;
    }

    let (f0_low, f0_high) = config.effective_f0_range();
    match features.f0_hz {
        Some(f0) if (f0_low..=f0_high).contains(&f0) => {}
        _ => return false,
    }

    if features.centroid_hz > config.effective_centroid_threshold() {
        return false;
    }

    let (zcr_low, zcr_high) = config.effective_zcr_range();
    (zcr_low..=zcr_high).contains(&features.zcr)
}
