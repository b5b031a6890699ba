//! Response functions and influence terms.
//!
//! Every `(sign, response)` pair resolves through `RESPONSE_TABLE`, a fixed
//! array indexed by the response discriminant, so evaluation never branches
//! on names.

use cl_core::{Real, is_negligible};
use cl_model::{InfluenceSign, ResponseFunction};

use crate::graph::InfluenceEdge;

/// Midpoint used by the sigmoid and threshold responses.
const MIDPOINT: Real = 0.5;
/// Sigmoid steepness.
const SIGMOID_STEEPNESS: Real = 5.0;
/// Steepness of the logistic used to differentiate the threshold step.
const THRESHOLD_SMOOTHING: Real = 50.0;
/// Step for numeric derivatives where the analytic one is undefined.
const DIFF_STEP: Real = 1e-6;
/// Largest exponent fed to `exp`.
const EXP_CAP: Real = 700.0;

struct ResponseEntry {
    function: ResponseFunction,
    value: fn(Real) -> Real,
    derivative: fn(Real) -> Real,
    /// +1 if the response never decreases, -1 if it never increases.
    monotonic_sign: i8,
}

static RESPONSE_TABLE: [ResponseEntry; 8] = [
    ResponseEntry {
        function: ResponseFunction::Linear,
        value: |x| x,
        derivative: |_| 1.0,
        monotonic_sign: 1,
    },
    ResponseEntry {
        function: ResponseFunction::Sigmoid,
        value: sigmoid,
        derivative: |x| {
            let s = sigmoid(x);
            SIGMOID_STEEPNESS * s * (1.0 - s)
        },
        monotonic_sign: 1,
    },
    ResponseEntry {
        function: ResponseFunction::Threshold,
        value: |x| if x > MIDPOINT { 1.0 } else { 0.0 },
        derivative: |x| {
            let s = logistic(THRESHOLD_SMOOTHING * (x - MIDPOINT));
            THRESHOLD_SMOOTHING * s * (1.0 - s)
        },
        monotonic_sign: 1,
    },
    ResponseEntry {
        function: ResponseFunction::Division,
        value: |x| {
            let d = 1.0 + x;
            if is_negligible(d) { 0.0 } else { 1.0 / d }
        },
        derivative: |x| {
            let d = 1.0 + x;
            if is_negligible(d) { 0.0 } else { -1.0 / (d * d) }
        },
        monotonic_sign: -1,
    },
    ResponseEntry {
        function: ResponseFunction::Square,
        value: |x| x * x,
        derivative: |x| 2.0 * x,
        monotonic_sign: 1,
    },
    ResponseEntry {
        function: ResponseFunction::Sqrt,
        value: sqrt_clamped,
        derivative: |x| {
            if x > DIFF_STEP {
                0.5 / x.sqrt()
            } else {
                (sqrt_clamped(x + DIFF_STEP) - sqrt_clamped(x - DIFF_STEP)) / (2.0 * DIFF_STEP)
            }
        },
        monotonic_sign: 1,
    },
    ResponseEntry {
        function: ResponseFunction::Exponential,
        value: |x| x.min(EXP_CAP).exp() - 1.0,
        derivative: |x| x.min(EXP_CAP).exp(),
        monotonic_sign: 1,
    },
    ResponseEntry {
        function: ResponseFunction::Logarithmic,
        value: |x| x.max(0.0).ln_1p(),
        derivative: |x| if x > 0.0 { 1.0 / (1.0 + x) } else { 0.0 },
        monotonic_sign: 1,
    },
];

fn logistic(z: Real) -> Real {
    1.0 / (1.0 + (-z).exp())
}

fn sigmoid(x: Real) -> Real {
    logistic(SIGMOID_STEEPNESS * (x - MIDPOINT))
}

fn sqrt_clamped(x: Real) -> Real {
    x.max(0.0).sqrt()
}

fn entry(f: ResponseFunction) -> &'static ResponseEntry {
    &RESPONSE_TABLE[f as usize]
}

/// Response value per unit coefficient.
pub fn response_value(f: ResponseFunction, x: Real) -> Real {
    (entry(f).value)(x)
}

/// Derivative of the response at `x`.
pub fn response_derivative(f: ResponseFunction, x: Real) -> Real {
    (entry(f).derivative)(x)
}

impl InfluenceEdge {
    /// Rate contribution of this influence to its target.
    ///
    /// `xs` is the source value, `xt` the current target value.
    pub fn term(&self, xs: Real, xt: Real) -> Real {
        let c = self.coefficient;
        match self.sign {
            InfluenceSign::Positive => c * response_value(self.response, xs),
            InfluenceSign::Negative => -(c * response_value(self.response, xs)).abs(),
            InfluenceSign::Decay => c * xt,
            InfluenceSign::Ratio => {
                if is_negligible(xt) {
                    0.0
                } else {
                    c * xs / xt
                }
            }
        }
    }

    /// First-order gain of the target with respect to the source.
    ///
    /// Returns `None` when the gain is undefined (ratio edge with a zero
    /// target).
    pub fn gain(&self, xs: Real, xt: Real) -> Option<Real> {
        let c = self.coefficient;
        let d = response_derivative(self.response, xs);
        match self.sign {
            InfluenceSign::Positive | InfluenceSign::Decay => Some(c * d),
            InfluenceSign::Negative => Some(-c.abs() * d),
            InfluenceSign::Ratio => {
                if is_negligible(xt) {
                    None
                } else {
                    Some(c * d / xt)
                }
            }
        }
    }

    /// Direction of the edge independent of operating point: +1 when a rise
    /// in the source raises the target, -1 when it lowers it, 0 for a zero
    /// coefficient.
    pub fn nominal_sign(&self) -> i8 {
        let coef_sign = cl_core::signum0(self.coefficient);
        let mono = entry(self.response).monotonic_sign;
        match self.sign {
            InfluenceSign::Positive | InfluenceSign::Decay => coef_sign * mono,
            InfluenceSign::Negative => {
                if coef_sign == 0 {
                    0
                } else {
                    -mono
                }
            }
            InfluenceSign::Ratio => coef_sign,
        }
    }
}
