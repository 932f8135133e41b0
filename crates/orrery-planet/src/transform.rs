//! Model-view transform state of a body.

use glam::{Mat4, Vec3};

/// Model-view matrix and its cached normal matrix.
///
/// The normal matrix is the inverse-transpose of the model-view matrix and is
/// recomputed on every translation change.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    model_view: Mat4,
    normal_matrix: Mat4,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            model_view: Mat4::IDENTITY,
            normal_matrix: Mat4::IDENTITY,
        }
    }
}

impl Transform {
    /// Overwrite the translation column, keeping every other entry.
    pub fn set_translation(&mut self, position: Vec3) {
        self.model_view.w_axis.x = position.x;
        self.model_view.w_axis.y = position.y;
        self.model_view.w_axis.z = position.z;
        self.normal_matrix = self.model_view.inverse().transpose();
    }

    pub fn translation(&self) -> Vec3 {
        self.model_view.w_axis.truncate()
    }

    pub fn model_view(&self) -> &Mat4 {
        &self.model_view
    }

    pub fn normal_matrix(&self) -> &Mat4 {
        &self.normal_matrix
    }
}
