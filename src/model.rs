use crate::{
    color::{GradientSpec, Rgba},
    error::LimnerResult,
    fx,
    rng::mix64,
    shape::Shape,
};

/// Declarative description of one image to generate: canvas size, base
/// color, seed, and an ordered list of steps. Never mutated by the engine;
/// all artistic parameters (colors, counts, radii) live here, not in engine
/// code.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Recipe {
    pub width: u32,
    pub height: u32,
    pub base: Rgba,
    pub seed: Seed, // determinism seed for the per-execution random stream
    pub steps: Vec<Step>,
}

/// Determinism seed: a plain integer, or a text label folded down to one.
/// In JSON either `"seed": 42` or `"seed": "midnight-orb"` is accepted.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum Seed {
    Number(u64),
    Text(String),
}

impl Seed {
    /// The `u64` that actually seeds the random stream. Text seeds fold
    /// their bytes through the splitmix64 finalizer, so equal strings give
    /// equal streams on every platform.
    pub fn to_u64(&self) -> u64 {
        match self {
            Seed::Number(n) => *n,
            Seed::Text(s) => {
                let mut h = 0x9E37_79B9_7F4A_7C15u64 ^ (s.len() as u64);
                for chunk in s.as_bytes().chunks(8) {
                    let mut v = 0u64;
                    for (i, &b) in chunk.iter().enumerate() {
                        v |= u64::from(b) << (i * 8);
                    }
                    h = mix64(h ^ v);
                }
                h
            }
        }
    }
}

impl From<u64> for Seed {
    fn from(n: u64) -> Self {
        Seed::Number(n)
    }
}

impl From<&str> for Seed {
    fn from(s: &str) -> Self {
        Seed::Text(s.to_string())
    }
}

impl From<String> for Seed {
    fn from(s: String) -> Self {
        Seed::Text(s)
    }
}

/// One unit of work in declared order. Later steps sit on top of earlier
/// ones.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub enum Step {
    Layer(Layer),
    Gradient(GradientSpec),
    Effect(EffectInstance),
}

/// A group of shapes sharing a fill color, an opacity multiplier, and an
/// optional stroke width (outline instead of fill for ellipses/polygons).
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Layer {
    pub shapes: Vec<Shape>,
    pub fill: Rgba,
    #[serde(default = "default_opacity")]
    pub opacity: f64, // 0..1, clamped at draw time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f64>,
}

fn default_opacity() -> f64 {
    1.0
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct EffectInstance {
    pub kind: String,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub params: serde_json::Value,
}

impl Recipe {
    pub fn validate(&self) -> LimnerResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(crate::error::LimnerError::validation(
                "recipe width/height must be > 0",
            ));
        }

        for step in &self.steps {
            match step {
                Step::Layer(layer) => {
                    for shape in &layer.shapes {
                        shape.validate()?;
                    }
                }
                Step::Gradient(_) => {}
                Step::Effect(inst) => {
                    // Surface bad kinds/params before any pixel work.
                    fx::parse_effect(inst)?;
                }
            }
        }

        Ok(())
    }
}
