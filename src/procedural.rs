//! CPU mirror of `shaders/fluid.wgsl`.
//!
//! Same stateless functions, same constants, evaluated per pixel on the host.
//! Used to check the look without a device (glitch vanishing at zero, noise
//! range) and by tooling that wants a still frame.

use crate::fluid_field::FluidUniforms;

type Vec2 = [f32; 2];
type Vec3 = [f32; 3];

// These must match the literals in fluid.wgsl. `test_constants_match_shader`
// checks the shader text against them.
pub const OCTAVES: usize = 3;
pub const FBM_SHIFT: f32 = 100.0;
/// Horizontal bands per unit of height for the block shift.
pub const GLITCH_BANDS: f32 = 20.0;
/// A band shifts only when its hash exceeds this.
pub const BLOCK_THRESHOLD: f32 = 0.8;
pub const BLOCK_SHIFT: f32 = 0.2;
/// Channel offset at full glitch.
pub const ABERRATION: f32 = 0.02;
pub const STATIC_THRESHOLD: f32 = 0.9;
pub const STATIC_GAIN: f32 = 0.2;

#[inline]
fn glsl_mod(x: f32, y: f32) -> f32 {
    x - y * (x / y).floor()
}

#[inline]
fn step(edge: f32, x: f32) -> f32 {
    if x < edge {
        0.0
    } else {
        1.0
    }
}

#[inline]
fn fract(x: f32) -> f32 {
    x - x.floor()
}

#[inline]
fn dot3(a: Vec3, b: Vec3) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[inline]
fn mix3(a: Vec3, b: Vec3, t: f32) -> Vec3 {
    [
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
    ]
}

#[inline]
fn permute(x: f32) -> f32 {
    glsl_mod((x * 34.0 + 1.0) * x, 289.0)
}

#[inline]
fn taylor_inv_sqrt(r: f32) -> f32 {
    1.792_842_9 - 0.853_734_7 * r
}

/// 3D simplex noise (Ashima Arts / Ian McEwan), roughly in [-1, 1].
pub fn snoise(v: Vec3) -> f32 {
    const C: Vec2 = [1.0 / 6.0, 1.0 / 3.0];

    // First corner
    let skew = (v[0] + v[1] + v[2]) * C[1];
    let mut i = [
        (v[0] + skew).floor(),
        (v[1] + skew).floor(),
        (v[2] + skew).floor(),
    ];
    let unskew = (i[0] + i[1] + i[2]) * C[0];
    let x0 = [v[0] - i[0] + unskew, v[1] - i[1] + unskew, v[2] - i[2] + unskew];

    // Other corners
    let g = [step(x0[1], x0[0]), step(x0[2], x0[1]), step(x0[0], x0[2])];
    let l = [1.0 - g[0], 1.0 - g[1], 1.0 - g[2]];
    let i1 = [g[0].min(l[2]), g[1].min(l[0]), g[2].min(l[1])];
    let i2 = [g[0].max(l[2]), g[1].max(l[0]), g[2].max(l[1])];

    let offsets = [[0.0; 3], i1, i2, [1.0; 3]];
    let corners: [Vec3; 4] = std::array::from_fn(|k| {
        let o = offsets[k];
        let c = C[0] * k as f32;
        [x0[0] - o[0] + c, x0[1] - o[1] + c, x0[2] - o[2] + c]
    });

    for axis in &mut i {
        *axis = glsl_mod(*axis, 289.0);
    }

    let ns = [2.0 / 7.0, 0.5 / 7.0 - 1.0, 1.0 / 7.0];
    let mut total = 0.0;
    for (k, x) in corners.iter().enumerate() {
        let o = offsets[k];
        let p = permute(permute(permute(i[2] + o[2]) + i[1] + o[1]) + i[0] + o[0]);

        // Gradients: 7x7 points over a square, mapped onto an octahedron.
        let j = p - 49.0 * (p * ns[2] * ns[2]).floor();
        let gx_ = (j * ns[2]).floor();
        let gy_ = (j - 7.0 * gx_).floor();
        let gx = gx_ * ns[0] + ns[1];
        let gy = gy_ * ns[0] + ns[1];
        let h = 1.0 - gx.abs() - gy.abs();
        let sh = -step(h, 0.0);

        let mut grad = [
            gx + (gx.floor() * 2.0 + 1.0) * sh,
            gy + (gy.floor() * 2.0 + 1.0) * sh,
            h,
        ];
        let norm = taylor_inv_sqrt(dot3(grad, grad));
        for c in &mut grad {
            *c *= norm;
        }

        let m = (0.6 - dot3(*x, *x)).max(0.0);
        let m = m * m;
        total += m * m * dot3(grad, *x);
    }
    42.0 * total
}

/// Three octaves of [`snoise`], amplitude halving and frequency doubling.
pub fn fbm(mut x: Vec3) -> f32 {
    let mut value = 0.0;
    let mut amplitude = 0.5;
    for _ in 0..OCTAVES {
        value += amplitude * snoise(x);
        x = [
            x[0] * 2.0 + FBM_SHIFT,
            x[1] * 2.0 + FBM_SHIFT,
            x[2] * 2.0 + FBM_SHIFT,
        ];
        amplitude *= 0.5;
    }
    value
}

/// Sine hash in [0, 1).
pub fn rand(co: Vec2) -> f32 {
    fract((co[0] * 12.9898 + co[1] * 78.233).sin() * 43_758.547)
}

/// Domain-warped fluid color at `uv`, before glitch, vignette and tint.
pub fn fluid_color(u: &FluidUniforms, uv: Vec2) -> Vec3 {
    let st = [uv[0] * 1.5 - 0.75, uv[1] * 1.5 - 0.75];
    let speed = u.time * 0.2 + u.typing_speed * 0.1;
    let distortion = 1.0 + u.typing_speed * 2.0;

    let q = [
        fbm([st[0], st[1], speed]),
        fbm([st[0] + 5.2, st[1] + 1.3, speed]),
    ];
    let warped = [st[0] + distortion * q[0], st[1] + distortion * q[1]];
    let r = [
        fbm([warped[0] + 1.7, warped[1] + 9.2, speed]),
        fbm([warped[0] + 8.3, warped[1] + 2.8, speed]),
    ];
    let f = fbm([st[0] + distortion * r[0], st[1] + distortion * r[1], speed]);

    let mix_factor = f * f * f * 4.0;
    let mut color = mix3(u.color1, u.color2, mix_factor.clamp(0.0, 1.0));
    let q_len = (q[0] * q[0] + q[1] * q[1]).sqrt();
    color = mix3(color, u.color3, q_len.clamp(0.0, 1.0));
    mix3(
        color,
        u.intense_color,
        r[0].abs().clamp(0.0, 1.0) * u.intensity,
    )
}

/// Horizontal displacement of the band containing `y`.
pub fn block_shift(glitch_time: f32, y: f32) -> f32 {
    let id = (y * GLITCH_BANDS).floor();
    step(BLOCK_THRESHOLD, rand([glitch_time, id]))
        * (rand([glitch_time * 2.0, id]) - 0.5)
        * BLOCK_SHIFT
}

/// Final pixel color, as the fragment stage writes it.
pub fn shade(u: &FluidUniforms, uv: Vec2) -> Vec3 {
    let glitch = u.glitch_intensity;
    let mut color = if glitch > 0.0 {
        let shifted = [
            uv[0] + block_shift(u.glitch_time, uv[1]) * glitch * 2.0,
            uv[1],
        ];
        let aberration = ABERRATION * glitch;
        let red = fluid_color(u, [shifted[0] - aberration, shifted[1]]);
        let green = fluid_color(u, shifted);
        let blue = fluid_color(u, [shifted[0] + aberration, shifted[1]]);
        let mut color = [red[0], green[1], blue[2]];

        let noise = rand([shifted[0] * u.glitch_time, shifted[1] * u.glitch_time]);
        if noise > STATIC_THRESHOLD {
            for c in &mut color {
                *c += STATIC_GAIN * glitch;
            }
        }
        color
    } else {
        fluid_color(u, uv)
    };

    let (dx, dy) = (uv[0] - 0.5, uv[1] - 0.5);
    let vignette = (1.0 - (dx * dx + dy * dy).sqrt() * 1.5).clamp(0.0, 1.0);
    let shade = vignette * (1.0 - u.tint_opacity);
    for c in &mut color {
        *c *= shade;
    }
    color
}

/// Render a `width` x `height` still into rows of RGB, top row first.
pub fn render(u: &FluidUniforms, width: usize, height: usize) -> Vec<Vec3> {
    let mut pixels = Vec::with_capacity(width * height);
    for row in 0..height {
        // uv.y grows upward, like the vertex stage.
        let v = 1.0 - (row as f32 + 0.5) / height as f32;
        for col in 0..width {
            let u_coord = (col as f32 + 0.5) / width as f32;
            pixels.push(shade(u, [u_coord, v]));
        }
    }
    pixels
}
