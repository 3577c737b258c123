//! Perspective camera for the point field.

/// Column-major 4x4 matrix, laid out the way WGSL's `mat4x4<f32>` expects.
pub type Mat4 = [[f32; 4]; 4];

fn mul(a: &Mat4, b: &Mat4) -> Mat4 {
    let mut out = [[0.0; 4]; 4];
    for (col, out_col) in out.iter_mut().enumerate() {
        for (row, cell) in out_col.iter_mut().enumerate() {
            *cell = (0..4).map(|k| a[k][row] * b[col][k]).sum();
        }
    }
    out
}

/// Fixed-orientation perspective camera looking down -Z.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub fov_y_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub position: [f32; 3],
    aspect: f32,
}

impl Camera {
    pub fn new(aspect: f32) -> Self {
        Self {
            fov_y_degrees: 60.0,
            near: 1.0,
            far: 10_000.0,
            position: [0.0, 355.0, 1220.0],
            aspect,
        }
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// Update the projection for a new viewport shape.
    pub fn set_viewport(&mut self, width: f32, height: f32) {
        if width > 0.0 && height > 0.0 {
            self.aspect = width / height;
        }
    }

    /// Projection into wgpu clip space (depth in [0, 1]).
    pub fn projection(&self) -> Mat4 {
        let f = 1.0 / (self.fov_y_degrees.to_radians() * 0.5).tan();
        let range = self.near - self.far;
        [
            [f / self.aspect, 0.0, 0.0, 0.0],
            [0.0, f, 0.0, 0.0],
            [0.0, 0.0, self.far / range, -1.0],
            [0.0, 0.0, self.near * self.far / range, 0.0],
        ]
    }

    pub fn view(&self) -> Mat4 {
        let [x, y, z] = self.position;
        [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [-x, -y, -z, 1.0],
        ]
    }

    pub fn view_projection(&self) -> Mat4 {
        mul(&self.projection(), &self.view())
    }

    /// Project a world-space point to clip space.
    pub fn project(&self, point: [f32; 3]) -> [f32; 4] {
        let m = self.view_projection();
        let v = [point[0], point[1], point[2], 1.0];
        let mut out = [0.0; 4];
        for (row, cell) in out.iter_mut().enumerate() {
            *cell = (0..4).map(|k| m[k][row] * v[k]).sum();
        }
        out
    }
}
