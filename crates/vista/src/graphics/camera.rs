use crate::nodes::params::{LookAt, Perspective, Rotate, Viewport};
use glam::{vec3, Mat4, Vec2, Vec3};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CameraError {
    #[error("invalid perspective: {0}")]
    InvalidPerspective(&'static str),
    #[error("invalid lookAt: {0}")]
    InvalidLookAt(&'static str),
    #[error("rotation by {0} degrees around a zero axis")]
    ZeroRotationAxis(f32),
}

/// Builds the projection matrix of a `perspective` node.
///
/// The matrix uses OpenGL clip space conventions, with depth going from -1 to 1.
pub fn projection_matrix(perspective: &Perspective) -> Result<Mat4, CameraError> {
    let Perspective {
        fovy,
        aspect,
        near,
        far,
    } = *perspective;

    if !(fovy > 0.0 && fovy < 180.0) {
        return Err(CameraError::InvalidPerspective("fovy must be within (0, 180) degrees"));
    }
    if !(aspect > 0.0) {
        return Err(CameraError::InvalidPerspective("aspect must be positive"));
    }
    if !(near > 0.0) {
        return Err(CameraError::InvalidPerspective("near must be positive"));
    }
    if !(far > near) {
        return Err(CameraError::InvalidPerspective("far must be greater than near"));
    }

    Ok(Mat4::perspective_rh_gl(fovy.to_radians(), aspect, near, far))
}

/// Builds the view matrix of a `lookAt` node.
pub fn view_matrix(look_at: &LookAt) -> Result<Mat4, CameraError> {
    let forward = look_at.look - look_at.eye;
    if forward.length_squared() <= f32::EPSILON {
        return Err(CameraError::InvalidLookAt("eye and look can't be the same point"));
    }
    if look_at.up.length_squared() <= f32::EPSILON {
        return Err(CameraError::InvalidLookAt("up vector can't be zero"));
    }
    if forward.cross(look_at.up).length_squared() <= f32::EPSILON {
        return Err(CameraError::InvalidLookAt("up vector is parallel to the view direction"));
    }

    Ok(Mat4::look_at_rh(look_at.eye, look_at.look, look_at.up))
}

/// Builds the model matrix of a `rotate` node. A zero angle is an identity transform regardless
/// of the axis.
pub fn rotation_matrix(rotate: &Rotate) -> Result<Mat4, CameraError> {
    if rotate.angle == 0.0 {
        return Ok(Mat4::IDENTITY);
    }

    let axis = rotate.axis();
    if axis.length_squared() <= f32::EPSILON {
        return Err(CameraError::ZeroRotationAxis(rotate.angle));
    }

    Ok(Mat4::from_axis_angle(axis.normalize(), rotate.angle.to_radians()))
}

/// A world space ray, with a normalized direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// Casts a ray through a canvas pixel, using the camera of a render pass.
    ///
    /// Returns [`None`] if the pixel lies outside of the viewport, or the camera matrices can't
    /// be inverted.
    pub fn through_pixel(
        viewport: &Viewport,
        projection: Mat4,
        view: Mat4,
        pixel: Vec2,
    ) -> Option<Ray> {
        if !viewport.contains(pixel.x, pixel.y) {
            return None;
        }

        // Sample the center of the pixel, canvas Y goes down while NDC Y goes up
        let ndc_x = (pixel.x + 0.5 - viewport.x) / viewport.width * 2.0 - 1.0;
        let ndc_y = 1.0 - (pixel.y + 0.5 - viewport.y) / viewport.height * 2.0;

        let clip_to_world = (projection * view).inverse();
        if !clip_to_world.is_finite() {
            return None;
        }

        let near = clip_to_world.project_point3(vec3(ndc_x, ndc_y, -1.0));
        let far = clip_to_world.project_point3(vec3(ndc_x, ndc_y, 1.0));
        let direction = (far - near).try_normalize()?;

        Some(Ray {
            origin: near,
            direction,
        })
    }

    /// Distance along the ray to the first intersection with a sphere, if any. Rays starting
    /// inside of the sphere hit its far side.
    pub fn intersect_sphere(&self, center: Vec3, radius: f32) -> Option<f32> {
        let offset = self.origin - center;
        let b = offset.dot(self.direction);
        let c = offset.length_squared() - radius * radius;
        let discriminant = b * b - c;
        if discriminant < 0.0 {
            return None;
        }

        let root = discriminant.sqrt();
        [-b - root, -b + root].into_iter().find(|&t| t >= 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perspective_validation() {
        assert!(projection_matrix(&Perspective::default()).is_ok());

        let invalid = [
            Perspective {
                fovy: 0.0,
                ..Default::default()
            },
            Perspective {
                fovy: 180.0,
                ..Default::default()
            },
            Perspective {
                near: 0.0,
                ..Default::default()
            },
            Perspective {
                near: 10.0,
                far: 5.0,
                ..Default::default()
            },
            Perspective {
                aspect: -1.0,
                ..Default::default()
            },
            Perspective {
                fovy: f32::NAN,
                ..Default::default()
            },
        ];
        for perspective in invalid {
            assert!(matches!(
                projection_matrix(&perspective),
                Err(CameraError::InvalidPerspective(_))
            ));
        }
    }

    #[test]
    fn look_at_validation() {
        assert!(view_matrix(&LookAt::default()).is_ok());
        assert!(view_matrix(&LookAt {
            eye: Vec3::ZERO,
            ..Default::default()
        })
        .is_err());
        assert!(view_matrix(&LookAt {
            up: Vec3::Z,
            ..Default::default()
        })
        .is_err());
    }

    #[test]
    fn rotation_needs_an_axis() {
        let spin = Rotate {
            angle: 90.0,
            y: 1.0,
            ..Default::default()
        };
        let rotated = rotation_matrix(&spin).unwrap().transform_vector3(Vec3::X);
        assert!(rotated.abs_diff_eq(Vec3::NEG_Z, 1e-5));

        assert_eq!(
            rotation_matrix(&Rotate {
                angle: 45.0,
                ..Default::default()
            }),
            Err(CameraError::ZeroRotationAxis(45.0))
        );
        assert_eq!(rotation_matrix(&Rotate::default()), Ok(Mat4::IDENTITY));
    }

    #[test]
    fn center_ray_hits_what_the_camera_looks_at() {
        let viewport = Viewport {
            x: 0.0,
            y: 0.0,
            width: 100.0,
            height: 100.0,
        };
        let projection = projection_matrix(&Perspective::default()).unwrap();
        let view = view_matrix(&LookAt {
            eye: vec3(0.0, 0.0, 10.0),
            ..Default::default()
        })
        .unwrap();

        let ray = Ray::through_pixel(&viewport, projection, view, Vec2::new(49.5, 49.5)).unwrap();
        assert!(ray.direction.abs_diff_eq(Vec3::NEG_Z, 1e-4));

        let distance = ray.intersect_sphere(Vec3::ZERO, 1.0).unwrap();
        assert!((ray.origin + ray.direction * distance).abs_diff_eq(Vec3::Z, 1e-3));

        assert!(ray.intersect_sphere(vec3(5.0, 0.0, 0.0), 1.0).is_none());
        assert!(Ray::through_pixel(&viewport, projection, view, Vec2::new(150.0, 10.0)).is_none());
    }
}
