use std::borrow::Cow;
use std::fmt::Write as _;

use anyhow::{anyhow, Result};
use wgpu::naga::ShaderStage;

use crate::beat::BEAT_SPEED;
use crate::kernel::{
    Rgb, BASE_TONE, DARK_TONE, GLITCH_OFFSET, GLITCH_ROWS, LIGHT_TONE, NUM_COLUMNS,
    SCALE_FORCE, SCROLL_SPEED,
};

/// Compiles the static full-screen triangle vertex shader.
pub(crate) fn compile_vertex_shader(device: &wgpu::Device) -> Result<wgpu::ShaderModule> {
    compile_glsl(
        device,
        "backdrop vertex",
        Cow::Borrowed(VERTEX_SHADER_GLSL),
        ShaderStage::Vertex,
    )
}

/// Compiles the glitch pixel program.
pub(crate) fn compile_fragment_shader(device: &wgpu::Device) -> Result<wgpu::ShaderModule> {
    compile_glsl(
        device,
        "backdrop fragment",
        Cow::Owned(fragment_source()),
        ShaderStage::Fragment,
    )
}

fn compile_glsl(
    device: &wgpu::Device,
    label: &str,
    shader: Cow<'static, str>,
    stage: ShaderStage,
) -> Result<wgpu::ShaderModule> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Glsl {
            shader,
            stage,
            defines: &[],
        },
    });
    match pollster::block_on(device.pop_error_scope()) {
        Some(err) => Err(anyhow!("{label} failed to compile: {err}")),
        None => Ok(module),
    }
}

/// Full fragment shader: generated constants followed by [`FRAGMENT_BODY`].
///
/// The constants are printed from the reference kernel so the GPU and CPU
/// paths cannot drift apart.
pub fn fragment_source() -> String {
    let mut source = String::from(FRAGMENT_HEADER);
    let defines = [
        ("NUM_COLUMNS", NUM_COLUMNS),
        ("SCROLL_SPEED", SCROLL_SPEED),
        ("SCALE_FORCE", SCALE_FORCE),
        ("GLITCH_ROWS", GLITCH_ROWS),
        ("GLITCH_OFFSET", GLITCH_OFFSET),
        ("BEAT_SPEED", BEAT_SPEED),
    ];
    for (name, value) in defines {
        let _ = writeln!(source, "#define {name} {value:?}");
    }
    for (name, tone) in [
        ("BASE_TONE", BASE_TONE),
        ("LIGHT_TONE", LIGHT_TONE),
        ("DARK_TONE", DARK_TONE),
    ] {
        let _ = writeln!(source, "#define {name} {}", glsl_vec3(tone));
    }
    source.push_str(FRAGMENT_BODY);
    source
}

fn glsl_vec3(tone: Rgb) -> String {
    format!("vec3({:?}, {:?}, {:?})", tone.r, tone.g, tone.b)
}

/// Inputs, outputs and the uniform block; must match [`crate::FrameUniforms`].
const FRAGMENT_HEADER: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 outColor;

layout(std140, set = 0, binding = 0) uniform BackdropParams {
    vec2 _iResolution;
    float _iTime;
    float _padding;
} ubo;

#define iResolution ubo._iResolution
#define iTime ubo._iTime
";

const FRAGMENT_BODY: &str = r"
float hash12(vec2 p) {
    vec3 p3 = fract(p.xyx * 0.1031);
    p3 += vec3(dot(p3, p3.yzx + vec3(33.33)));
    return fract((p3.x + p3.y) * p3.z);
}

vec3 getCol(float id) {
    float kind = mod(id + 3000.0, 3.0);
    vec3 col = BASE_TONE;
    if (kind < 1.5) {
        col = DARK_TONE;
    }
    if (kind < 0.5) {
        col = LIGHT_TONE;
    }
    return col;
}

float glitchShift(float rowId, float beatIndex, float columnId, float activation) {
    float rnd = hash12(vec2(rowId, beatIndex * 43.1337 + columnId * 13.13));
    float gate = step(0.5, rnd);
    float direction = gate * 2.0 - 1.0;
    float magnitude = fract(rnd * 10.0) * 0.5 + 0.5;
    return direction * magnitude * GLITCH_OFFSET * gate * activation;
}

// rgb is premultiplied by coverage, alpha is the coverage itself.
vec4 renderColumn(float x, float columnId, float scale, float scroll) {
    float center = (columnId + 0.5 + scroll) / NUM_COLUMNS;
    float width = (1.0 / NUM_COLUMNS) * max(1.0 + scale * 2.0, 0.1);
    float inside = 1.0 - step(width * 0.5, abs(x - center));
    return vec4(getCol(columnId) * inside, inside);
}

void main() {
    vec2 uv = v_uv;
    vec2 fragCoord = uv * iResolution;
    float t = iTime;
    float scroll = t * SCROLL_SPEED;

    float beatPhase = t * BEAT_SPEED;
    float beatIndex = floor(beatPhase);
    float beatFraction = fract(beatPhase);
    float attack = smoothstep(0.0, 0.05, beatFraction);
    float release = 0.9 - smoothstep(0.4, 1.2, beatFraction);
    float activation = attack * release;

    float rowId = floor(uv.y * GLITCH_ROWS);

    float bgId = floor(uv.x * NUM_COLUMNS - scroll);
    float bgShift = glitchShift(rowId, beatIndex, bgId, activation);
    vec3 col = getCol(floor((uv.x + bgShift) * NUM_COLUMNS - scroll));

    float beatStart = beatIndex / BEAT_SPEED;
    float centerId = floor(0.5 * NUM_COLUMNS - beatStart * SCROLL_SPEED);
    float leftId = centerId - 1.0;

    float dirC = step(0.5, hash12(vec2(beatIndex, 555.5))) * 2.0 - 1.0;
    float dirL = step(0.5, hash12(vec2(beatIndex, 777.7))) * 2.0 - 1.0;
    float forceC = SCALE_FORCE * 0.5;
    if (dirC > 0.0) {
        forceC = SCALE_FORCE;
    }
    float magL = mix(0.4, 0.8, hash12(vec2(beatIndex, 101.0)));
    float forceL = magL * 0.5;
    if (dirL > 0.0) {
        forceL = magL;
    }
    float scaleC = forceC * dirC * activation;
    float scaleL = forceL * dirL * activation;

    float shiftL = glitchShift(rowId, beatIndex, leftId, activation);
    vec4 left = renderColumn(uv.x + shiftL, leftId, scaleL, scroll);
    col = mix(col, left.rgb, vec3(left.a));

    float shiftC = glitchShift(rowId, beatIndex, centerId, activation);
    vec4 center = renderColumn(uv.x + shiftC, centerId, scaleC, scroll);
    col = mix(col, center.rgb, vec3(center.a));

    col *= 0.98 + 0.02 * sin(fragCoord.y * 0.8);
    float noise = hash12(uv * t * 100.0);
    col += vec3((noise - 0.5) * 0.05);
    col += fwidth(col);
    col = mix(col, smoothstep(vec3(0.0), vec3(1.0), col), vec3(0.3));

    outColor = vec4(col, 1.0);
}
";

/// Minimal full-screen triangle vertex shader; `v_uv` has a bottom-left origin.
const VERTEX_SHADER_GLSL: &str = r"#version 450
layout(location = 0) out vec2 v_uv;

const vec2 positions[3] = vec2[3](
    vec2(-1.0, -3.0),
    vec2(3.0, 1.0),
    vec2(-1.0, 1.0)
);

void main() {
    uint vertex_index = uint(gl_VertexIndex);
    vec2 pos = positions[vertex_index];
    v_uv = pos * 0.5 + vec2(0.5, 0.5);
    gl_Position = vec4(pos, 0.0, 1.0);
}
";
