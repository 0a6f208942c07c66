use serde::{Deserialize, Serialize};

/// Range and granularity of one settings slider
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliderSpec {
    pub label: &'static str,
    pub min: f32,
    pub max: f32,
    pub step: f32,
    pub default: f32,
}

pub const TEMPERATURE: SliderSpec = SliderSpec {
    label: "🎲 Temperature",
    min: 0.0,
    max: 1.5,
    step: 0.1,
    default: 0.7,
};

pub const MAX_TOKENS: SliderSpec = SliderSpec {
    label: "📏 Max tokens",
    min: 256.0,
    max: 4096.0,
    step: 64.0,
    default: 1024.0,
};

pub const TOP_P: SliderSpec = SliderSpec {
    label: "🔎 Top-p (nucleus sampling)",
    min: 0.1,
    max: 1.0,
    step: 0.05,
    default: 0.9,
};

impl SliderSpec {
    pub fn clamp(&self, value: f32) -> f32 {
        if value.is_nan() {
            return self.default;
        }
        value.clamp(self.min, self.max)
    }

    /// Move `value` by `steps` grid positions, snapping onto the grid first.
    pub fn step_by(&self, value: f32, steps: i32) -> f32 {
        let position = ((self.clamp(value) - self.min) / self.step).round() as i32;
        let last = ((self.max - self.min) / self.step).round() as i32;
        let target = (position + steps).clamp(0, last);
        let stepped = self.min + target as f32 * self.step;
        // Two decimals is the finest step in use; drops float noise like 0.70000005.
        ((stepped * 100.0).round() / 100.0).clamp(self.min, self.max)
    }

    /// Position of `value` within the range, in `[0, 1]`.
    pub fn ratio(&self, value: f32) -> f64 {
        let span = self.max - self.min;
        if span <= 0.0 {
            return 0.0;
        }
        ((self.clamp(value) - self.min) / span) as f64
    }
}

/// Sampling parameters sent with every completion request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationParameters {
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
}

impl Default for GenerationParameters {
    fn default() -> Self {
        Self {
            temperature: TEMPERATURE.default,
            max_tokens: MAX_TOKENS.default as u32,
            top_p: TOP_P.default,
        }
    }
}

impl GenerationParameters {
    /// Clamp every field into its slider range.
    pub fn clamped(self) -> Self {
        Self {
            temperature: TEMPERATURE.clamp(self.temperature),
            max_tokens: MAX_TOKENS.clamp(self.max_tokens as f32) as u32,
            top_p: TOP_P.clamp(self.top_p),
        }
    }

    pub fn set_temperature(&mut self, value: f32) {
        self.temperature = TEMPERATURE.clamp(value);
    }

    pub fn set_max_tokens(&mut self, value: u32) {
        self.max_tokens = MAX_TOKENS.clamp(value as f32) as u32;
    }

    pub fn set_top_p(&mut self, value: f32) {
        self.top_p = TOP_P.clamp(value);
    }

    pub fn step_temperature(&mut self, steps: i32) {
        self.temperature = TEMPERATURE.step_by(self.temperature, steps);
    }

    pub fn step_max_tokens(&mut self, steps: i32) {
        self.max_tokens = MAX_TOKENS.step_by(self.max_tokens as f32, steps) as u32;
    }

    pub fn step_top_p(&mut self, steps: i32) {
        self.top_p = TOP_P.step_by(self.top_p, steps);
    }
}
