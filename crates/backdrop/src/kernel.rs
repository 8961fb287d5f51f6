//! CPU reference of the backdrop pixel program.
//!
//! The GPU evaluates the GLSL in [`crate::compile`]; this module mirrors it
//! constant for constant so the effect can be tested and exported without a
//! device. Both sides must change together.
//!
//! ```text
//!   time ─▶ BeatClock ─▶ activation ─┬─▶ row shift ─▶ background
//!                                    ├─▶ centre overlay
//!                                    └─▶ left overlay
//!                                              │
//!        scanline ◀─ noise ◀─ edges ◀─ contrast ◀┘
//! ```

use std::ops::{Add, Mul, Sub};

use crate::beat::{BeatClock, BEAT_SPEED};
use crate::uniforms::FrameUniforms;

/// Vertical bands scrolling across the screen.
pub const NUM_COLUMNS: f32 = 5.0;
/// Columns scrolled per second.
pub const SCROLL_SPEED: f32 = 0.3;
/// Peak width change of the centre overlay.
pub const SCALE_FORCE: f32 = 0.40;
/// Horizontal scan rows that glitch independently.
pub const GLITCH_ROWS: f32 = 150.0;
/// Peak horizontal displacement, in normalised screen widths.
pub const GLITCH_OFFSET: f32 = 0.09;

pub const BASE_TONE: Rgb = Rgb::new(0.6, 0.63, 0.63);
pub const LIGHT_TONE: Rgb = Rgb::new(0.6 * 1.09, 0.63 * 1.09, 0.63 * 1.09);
pub const DARK_TONE: Rgb = Rgb::new(0.6 * 0.90, 0.63 * 0.90, 0.63 * 0.90);

const ROW_BEAT_SEED: f32 = 43.1337;
const ROW_COLUMN_SEED: f32 = 13.13;
const CENTER_DIRECTION_SEED: f32 = 555.5;
const LEFT_DIRECTION_SEED: f32 = 777.7;
const LEFT_MAGNITUDE_SEED: f32 = 101.0;

/// Linear colour in `[0, 1]` space (values may briefly leave it mid-pipeline).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub fn map(self, f: impl Fn(f32) -> f32) -> Self {
        Self::new(f(self.r), f(self.g), f(self.b))
    }

    pub fn abs(self) -> Self {
        self.map(f32::abs)
    }

    pub fn mix(self, other: Self, t: f32) -> Self {
        Self::new(
            mix(self.r, other.r, t),
            mix(self.g, other.g, t),
            mix(self.b, other.b, t),
        )
    }
}

impl Add for Rgb {
    type Output = Rgb;

    fn add(self, rhs: Rgb) -> Rgb {
        Rgb::new(self.r + rhs.r, self.g + rhs.g, self.b + rhs.b)
    }
}

impl Sub for Rgb {
    type Output = Rgb;

    fn sub(self, rhs: Rgb) -> Rgb {
        Rgb::new(self.r - rhs.r, self.g - rhs.g, self.b - rhs.b)
    }
}

impl Mul<f32> for Rgb {
    type Output = Rgb;

    fn mul(self, rhs: f32) -> Rgb {
        self.map(|channel| channel * rhs)
    }
}

pub fn fract(x: f32) -> f32 {
    x - x.floor()
}

/// GLSL `mod`: the result takes the sign of `y`.
pub fn glsl_mod(x: f32, y: f32) -> f32 {
    x - y * (x / y).floor()
}

pub fn step(edge: f32, x: f32) -> f32 {
    if x < edge {
        0.0
    } else {
        1.0
    }
}

pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

pub fn mix(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t
}

/// Hash without sine: 2D input to `[0, 1)`, stable for identical inputs.
pub fn hash12(x: f32, y: f32) -> f32 {
    let mut p3 = [fract(x * 0.1031), fract(y * 0.1031), fract(x * 0.1031)];
    let d = p3[0] * (p3[1] + 33.33) + p3[1] * (p3[2] + 33.33) + p3[2] * (p3[0] + 33.33);
    for lane in &mut p3 {
        *lane += d;
    }
    fract((p3[0] + p3[1]) * p3[2])
}

/// Palette lookup; ids repeat every three columns, negative ids included.
pub fn column_tone(id: f32) -> Rgb {
    let kind = glsl_mod(id + 3000.0, 3.0);
    if kind < 0.5 {
        LIGHT_TONE
    } else if kind < 1.5 {
        DARK_TONE
    } else {
        BASE_TONE
    }
}

/// Horizontal displacement of one (row, column, beat) cell.
///
/// Half of the cells stay put; the rest move by 50–100% of
/// [`GLITCH_OFFSET`], scaled by the beat activation.
pub fn glitch_shift(row_id: f32, beat_index: f32, column_id: f32, activation: f32) -> f32 {
    let rnd = hash12(row_id, beat_index * ROW_BEAT_SEED + column_id * ROW_COLUMN_SEED);
    let gate = step(0.5, rnd);
    let direction = gate * 2.0 - 1.0;
    let magnitude = fract(rnd * 10.0) * 0.5 + 0.5;
    direction * magnitude * GLITCH_OFFSET * gate * activation
}

/// Values shared by every pixel of one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameState {
    pub time: f32,
    pub beat: BeatClock,
    /// Column centred on screen when the current beat started.
    pub center_id: f32,
    pub left_id: f32,
    pub center_scale: f32,
    pub left_scale: f32,
}

impl FrameState {
    pub fn new(time: f32) -> Self {
        let beat = BeatClock::at(time);
        let beat_start = beat.start_time(BEAT_SPEED);
        let center_id = (0.5 * NUM_COLUMNS - beat_start * SCROLL_SPEED).floor();

        let center_direction = step(0.5, hash12(beat.index, CENTER_DIRECTION_SEED)) * 2.0 - 1.0;
        let left_direction = step(0.5, hash12(beat.index, LEFT_DIRECTION_SEED)) * 2.0 - 1.0;

        let center_force = if center_direction > 0.0 {
            SCALE_FORCE
        } else {
            SCALE_FORCE * 0.5
        };
        let left_magnitude = mix(0.4, 0.8, hash12(beat.index, LEFT_MAGNITUDE_SEED));
        let left_force = if left_direction > 0.0 {
            left_magnitude
        } else {
            left_magnitude * 0.5
        };

        Self {
            time,
            beat,
            center_id,
            left_id: center_id - 1.0,
            center_scale: center_force * center_direction * beat.activation,
            left_scale: left_force * left_direction * beat.activation,
        }
    }

    fn scroll(&self) -> f32 {
        self.time * SCROLL_SPEED
    }

    fn overlay(&self, x: f32, column_id: f32, scale: f32) -> Option<Rgb> {
        let center = (column_id + 0.5 + self.scroll()) / NUM_COLUMNS;
        let width = (1.0 / NUM_COLUMNS) * (1.0 + scale * 2.0).max(0.1);
        if (x - center).abs() < width * 0.5 {
            Some(column_tone(column_id))
        } else {
            None
        }
    }

    /// Background plus both overlays, before any post-processing.
    pub fn layers(&self, uv: [f32; 2]) -> Rgb {
        let activation = self.beat.activation;
        let row_id = (uv[1] * GLITCH_ROWS).floor();

        let background_id = (uv[0] * NUM_COLUMNS - self.scroll()).floor();
        let shift = glitch_shift(row_id, self.beat.index, background_id, activation);
        let mut color = column_tone(((uv[0] + shift) * NUM_COLUMNS - self.scroll()).floor());

        for (column_id, scale) in [
            (self.left_id, self.left_scale),
            (self.center_id, self.center_scale),
        ] {
            let shift = glitch_shift(row_id, self.beat.index, column_id, activation);
            if let Some(tone) = self.overlay(uv[0] + shift, column_id, scale) {
                color = tone;
            }
        }
        color
    }
}

/// The pixel program bound to one frame's uniforms.
#[derive(Debug, Clone, Copy)]
pub struct PixelProgram {
    uniforms: FrameUniforms,
    state: FrameState,
}

impl PixelProgram {
    pub fn new(uniforms: FrameUniforms) -> Self {
        Self {
            uniforms,
            state: FrameState::new(uniforms.time),
        }
    }

    /// Colour after scanlines and noise; the input of the edge term.
    fn surface(&self, uv: [f32; 2]) -> Rgb {
        let frag_y = uv[1] * self.uniforms.resolution[1];
        let scanline = (frag_y * 0.8).sin();
        let mut color = self.state.layers(uv) * (0.98 + 0.02 * scanline);

        let time = self.uniforms.time;
        let noise = hash12(uv[0] * time * 100.0, uv[1] * time * 100.0);
        let grain = (noise - 0.5) * 0.05;
        color = color.map(|channel| channel + grain);
        color
    }

    /// Evaluates the program at a normalised position (origin bottom-left).
    pub fn shade(&self, uv: [f32; 2]) -> [f32; 4] {
        let texel_x = 1.0 / self.uniforms.resolution[0].max(1.0);
        let texel_y = 1.0 / self.uniforms.resolution[1].max(1.0);

        let color = self.surface(uv);
        let right = self.surface([uv[0] + texel_x, uv[1]]);
        let up = self.surface([uv[0], uv[1] + texel_y]);
        let edges = (right - color).abs() + (up - color).abs();

        let color = color + edges;
        let contrasted = color.map(|channel| smoothstep(0.0, 1.0, channel));
        let color = color.mix(contrasted, 0.3);
        [color.r, color.g, color.b, 1.0]
    }

    /// Evaluates the pixel at column `x`, row `y` of an image whose row 0 is the top.
    pub fn shade_pixel(&self, x: u32, y: u32) -> [f32; 4] {
        self.shade(pixel_uv(
            x,
            y,
            self.uniforms.resolution[0],
            self.uniforms.resolution[1],
        ))
    }
}

/// Normalised coordinate of a pixel centre, flipping rows to a bottom-left origin.
pub fn pixel_uv(x: u32, y: u32, width: f32, height: f32) -> [f32; 2] {
    let width = width.max(1.0);
    let height = height.max(1.0);
    [
        (x as f32 + 0.5) / width,
        1.0 - (y as f32 + 0.5) / height,
    ]
}

/// Single-shot evaluation; prefer [`PixelProgram`] when shading many pixels.
pub fn shade(uv: [f32; 2], uniforms: &FrameUniforms) -> [f32; 4] {
    PixelProgram::new(*uniforms).shade(uv)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_stays_in_unit_interval_and_is_stable() {
        for row in 0..40 {
            for seed in 0..40 {
                let x = row as f32 * 1.7;
                let y = seed as f32 * 13.13 + 0.25;
                let value = hash12(x, y);
                assert!((0.0..1.0).contains(&value), "hash12({x}, {y}) = {value}");
                assert_eq!(value.to_bits(), hash12(x, y).to_bits());
            }
        }
    }

    #[test]
    fn palette_cycles_every_three_columns() {
        assert_eq!(column_tone(0.0), LIGHT_TONE);
        assert_eq!(column_tone(1.0), DARK_TONE);
        assert_eq!(column_tone(2.0), BASE_TONE);
        assert_eq!(column_tone(3.0), LIGHT_TONE);
        assert_eq!(column_tone(-1.0), BASE_TONE);
        assert_eq!(column_tone(-2.0), DARK_TONE);
        assert_eq!(column_tone(-3.0), LIGHT_TONE);
    }

    #[test]
    fn glitch_is_gated_by_activation() {
        for row in 0..GLITCH_ROWS as u32 {
            let shift = glitch_shift(row as f32, 4.0, 2.0, 0.0);
            assert_eq!(shift, 0.0);
        }
    }

    #[test]
    fn glitch_magnitude_follows_the_hash_fraction() {
        let activation = 0.9;
        let mut displaced = 0;
        for row in 0..GLITCH_ROWS as u32 {
            let shift = glitch_shift(row as f32, 7.0, -3.0, activation);
            if shift != 0.0 {
                displaced += 1;
                assert!(shift >= 0.5 * GLITCH_OFFSET * activation - 1e-6);
                assert!(shift <= GLITCH_OFFSET * activation + 1e-6);
            }
        }
        assert!(displaced > 0, "expected some rows to glitch");
        assert!(displaced < GLITCH_ROWS as u32, "expected some rows to hold");
    }

    #[test]
    fn downbeat_shows_undistorted_columns() {
        let state = FrameState::new(0.0);
        assert_eq!(state.beat.activation, 0.0);
        assert_eq!(state.center_scale, 0.0);
        assert_eq!(state.left_scale, 0.0);
        for column in 0..NUM_COLUMNS as u32 {
            let x = (column as f32 + 0.5) / NUM_COLUMNS;
            for y in [0.1, 0.45, 0.9] {
                assert_eq!(state.layers([x, y]), column_tone(column as f32));
            }
        }
    }

    fn active_state() -> FrameState {
        // Beat 0, fraction 0.3: on the activation plateau.
        let state = FrameState::new(1.0);
        assert!(state.beat.activation > 0.85, "{:?}", state.beat);
        state
    }

    #[test]
    fn active_beat_displaces_background_rows() {
        let state = active_state();
        let scroll = state.scroll();
        let mut crossings = 0;

        for row in 0..GLITCH_ROWS as u32 {
            let y = (row as f32 + 0.5) / GLITCH_ROWS;
            for step in 0..200 {
                let x = (step as f32 + 0.5) / 200.0;
                let background_id = (x * NUM_COLUMNS - scroll).floor();
                let shift = glitch_shift(
                    row as f32,
                    state.beat.index,
                    background_id,
                    state.beat.activation,
                );
                let covered = [
                    (state.left_id, state.left_scale),
                    (state.center_id, state.center_scale),
                ]
                .iter()
                .any(|&(id, scale)| {
                    let own = glitch_shift(row as f32, state.beat.index, id, state.beat.activation);
                    state.overlay(x + own, id, scale).is_some()
                });
                if shift == 0.0 || covered {
                    continue;
                }

                let displaced_id = ((x + shift) * NUM_COLUMNS - scroll).floor();
                assert_eq!(state.layers([x, y]), column_tone(displaced_id));
                if displaced_id == background_id + 1.0 {
                    assert_ne!(state.layers([x, y]), column_tone(background_id));
                    crossings += 1;
                }
            }
        }
        assert!(crossings > 0, "expected tears across a column boundary");
    }

    #[test]
    fn active_beat_moves_the_centre_overlay_edge() {
        let state = active_state();
        assert_ne!(state.center_scale, 0.0);

        let row = (0..GLITCH_ROWS as u32)
            .map(|row| row as f32)
            .find(|&row| {
                glitch_shift(row, state.beat.index, state.center_id, state.beat.activation) == 0.0
            })
            .expect("an undisplaced row");
        let y = (row + 0.5) / GLITCH_ROWS;

        let center = (state.center_id + 0.5 + state.scroll()) / NUM_COLUMNS;
        let half_width = (1.0 / NUM_COLUMNS) * (1.0 + 2.0 * state.center_scale) / 2.0;
        let resting_half_width = 0.5 / NUM_COLUMNS;
        assert!((half_width - resting_half_width).abs() > 0.01);

        let eps = 1e-3;
        let inside = center + half_width - eps;
        let outside = center + half_width + eps;
        let tone = column_tone(state.center_id);
        assert_eq!(
            state.overlay(inside, state.center_id, state.center_scale),
            Some(tone)
        );
        assert_eq!(
            state.overlay(outside, state.center_id, state.center_scale),
            None
        );
        assert_eq!(state.layers([inside, y]), tone);
    }

    #[test]
    fn overlay_scales_stay_within_their_forces() {
        for step in 0..200 {
            let state = FrameState::new(step as f32 * 0.37);
            let activation = state.beat.activation;
            assert!(state.center_scale.abs() <= SCALE_FORCE * activation + 1e-6);
            assert!(state.left_scale.abs() <= 0.8 * activation + 1e-6);
            assert_eq!(state.left_id, state.center_id - 1.0);
        }
    }

    #[test]
    fn shading_is_pure() {
        let uniforms = FrameUniforms::new(800.0, 600.0, 2.75);
        let program = PixelProgram::new(uniforms);
        let samples = [[0.1, 0.2], [0.5, 0.5], [0.93, 0.07]];

        let forward: Vec<_> = samples.iter().map(|uv| program.shade(*uv)).collect();
        let backward: Vec<_> = samples.iter().rev().map(|uv| shade(*uv, &uniforms)).collect();
        for (a, b) in forward.iter().zip(backward.iter().rev()) {
            assert_eq!(a, b);
        }
    }

    #[test]
    fn output_is_opaque_and_near_unit_range() {
        let program = PixelProgram::new(FrameUniforms::new(64.0, 48.0, 5.5));
        for y in 0..48 {
            for x in 0..64 {
                let [r, g, b, a] = program.shade_pixel(x, y);
                assert_eq!(a, 1.0);
                for channel in [r, g, b] {
                    assert!(channel.is_finite());
                    assert!((-0.1..=1.5).contains(&channel), "channel {channel}");
                }
            }
        }
    }

    #[test]
    fn pixel_centres_flip_to_bottom_left_origin() {
        let top_left = pixel_uv(0, 0, 4.0, 2.0);
        assert_eq!(top_left, [0.125, 0.75]);
        let bottom_right = pixel_uv(3, 1, 4.0, 2.0);
        assert_eq!(bottom_right, [0.875, 0.25]);
    }
}
