use glam::{Mat4, Quat, Vec3};

/// World transform of a draw item, either a raw matrix or TRS components.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transform {
    Matrix(Mat4),
    Trs {
        translation: Vec3,
        rotation: Quat,
        scale: Vec3,
    },
}

impl Transform {
    pub const IDENTITY: Self = Self::Trs {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    #[inline]
    #[must_use]
    pub fn from_translation(translation: Vec3) -> Self {
        Self::Trs {
            translation,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }

    #[must_use]
    pub fn to_matrix(&self) -> Mat4 {
        match *self {
            Self::Matrix(m) => m,
            Self::Trs {
                translation,
                rotation,
                scale,
            } => Mat4::from_scale_rotation_translation(scale, rotation, translation),
        }
    }

    /// World-space position of the object's origin.
    #[must_use]
    pub fn translation(&self) -> Vec3 {
        match *self {
            Self::Matrix(m) => m.w_axis.truncate(),
            Self::Trs { translation, .. } => translation,
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}
