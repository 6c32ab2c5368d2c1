use crate::adaptive::config::FrustrationParams;
use crate::adaptive::types::FrustrationComponents;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrustrationSignals {
    pub consecutive_errors: u32,
    pub hints_used: u32,
    pub retries: u32,
    pub latency_secs: f64,
    pub perseveration: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrustrationScore {
    /// Composite rounded to two decimals.
    pub value: f64,
    pub components: FrustrationComponents,
}

pub struct FrustrationScorer {
    params: FrustrationParams,
}

impl FrustrationScorer {
    pub fn new(params: FrustrationParams) -> Self {
        Self { params }
    }

    pub fn score(&self, signals: &FrustrationSignals) -> FrustrationScore {
        let norms = &self.params.norms;
        let latency = if signals.latency_secs.is_finite() {
            signals.latency_secs
        } else {
            0.0
        };

        let components = FrustrationComponents {
            error: ratio(signals.consecutive_errors as f64, norms.max_errors),
            hint: ratio(signals.hints_used as f64, norms.max_hints),
            retry: ratio(signals.retries as f64, norms.max_retries),
            latency: ratio(latency - norms.latency_floor_secs, norms.latency_span_secs),
            perseveration: ratio(signals.perseveration as f64, norms.max_perseveration),
        };

        let w = &self.params.weights;
        let raw = w.error * components.error
            + w.hint * components.hint
            + w.retry * components.retry
            + w.latency * components.latency
            + w.perseveration * components.perseveration;

        FrustrationScore {
            value: round2(raw.clamp(0.0, 1.0)),
            components,
        }
    }
}

impl Default for FrustrationScorer {
    fn default() -> Self {
        Self::new(FrustrationParams::default())
    }
}

fn ratio(value: f64, divisor: f64) -> f64 {
    if divisor <= 0.0 {
        return if value > 0.0 { 1.0 } else { 0.0 };
    }
    (value / divisor).clamp(0.0, 1.0)
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
