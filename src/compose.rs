use crate::{
    canvas::{Canvas, FrameRgb},
    color::Rgba,
    error::{LimnerError, LimnerResult},
    fx::{self, Effect},
    model::{Recipe, Step},
    rng::Rng64,
};

/// Straight-line pipeline driver with two states: Building (steps applied in
/// declared order) and Done (flattened, no further mutation). There is no
/// branching or retry; any failing step aborts the whole execution, so a
/// failed generation never emits a partial image.
pub struct Compositor {
    state: State,
}

enum State {
    Building {
        canvas: Canvas,
        rng: Rng64,
        base: Rgba,
    },
    Done,
}

impl Compositor {
    /// Validate the recipe, allocate the base canvas, seed the random
    /// stream.
    pub fn new(recipe: &Recipe) -> LimnerResult<Self> {
        recipe.validate()?;
        Ok(Self {
            state: State::Building {
                canvas: Canvas::new(recipe.width, recipe.height, recipe.base)?,
                rng: Rng64::new(recipe.seed.to_u64()),
                base: recipe.base,
            },
        })
    }

    /// Apply one step onto the working canvas.
    pub fn apply(&mut self, step: &Step) -> LimnerResult<()> {
        let State::Building { canvas, rng, .. } = &mut self.state else {
            return Err(LimnerError::state(
                "compositor is done; no further steps may be applied",
            ));
        };

        match step {
            Step::Layer(layer) => {
                let color = layer.fill.scale_alpha(layer.opacity);
                for shape in &layer.shapes {
                    canvas.draw_shape(shape, color, layer.stroke_width);
                }
            }
            Step::Gradient(spec) => canvas.fill_gradient(spec),
            Step::Effect(inst) => match fx::parse_effect(inst)? {
                Effect::Glow { color, intensity } => {
                    *canvas = fx::glow(canvas, color, intensity)?;
                }
                Effect::Vignette {
                    strength,
                    falloff_band,
                } => fx::vignette(canvas, strength, falloff_band),
                Effect::ParticleScatter {
                    count,
                    color,
                    size_range,
                    alpha_range,
                    bounds,
                } => fx::particle_scatter(
                    canvas,
                    count,
                    color,
                    size_range,
                    alpha_range,
                    bounds,
                    rng,
                ),
                Effect::RadialBurst {
                    center,
                    inner,
                    outer,
                    max_radius,
                    step,
                } => fx::radial_burst(canvas, center, inner, outer, max_radius, step),
                Effect::LightRays {
                    center,
                    color,
                    count,
                    length,
                    max_width,
                } => fx::light_rays(canvas, center, color, count, length, max_width, rng),
            },
        }
        Ok(())
    }

    /// Flatten over the recipe base color (alpha forced opaque) and
    /// transition to Done. The terminal operation: later calls fail with a
    /// state error.
    pub fn finish(&mut self) -> LimnerResult<FrameRgb> {
        match std::mem::replace(&mut self.state, State::Done) {
            State::Building { canvas, base, .. } => {
                Ok(canvas.flatten_to_opaque(Rgba::opaque(base.r, base.g, base.b)))
            }
            State::Done => Err(LimnerError::state("compositor already finished")),
        }
    }
}

/// Evaluate a whole recipe in one shot: validate, apply every step in
/// declared order, flatten. The primary API for producing pixels.
#[tracing::instrument(skip(recipe), fields(width = recipe.width, height = recipe.height, seed = recipe.seed.to_u64()))]
pub fn compose(recipe: &Recipe) -> LimnerResult<FrameRgb> {
    let mut compositor = Compositor::new(recipe)?;
    for step in &recipe.steps {
        compositor.apply(step)?;
    }
    compositor.finish()
}
