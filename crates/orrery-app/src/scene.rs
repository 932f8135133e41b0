//! Bodies built from configuration and the per-frame draw.

use glam::{Mat4, Vec3};
use orrery_config::{BodyConfig, Config, PlanetConfig, RenderConfig, SceneConfig};
use orrery_planet::{
    ColorError, MaterialColor, Planet, PlanetDescriptor, PlanetError, Tessellation,
};
use orrery_render::GraphicsDevice;
use thiserror::Error;

/// Error types for scene construction.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("body '{body}' has an invalid color: {source}")]
    Color {
        body: String,
        #[source]
        source: ColorError,
    },

    #[error("failed to build body '{body}': {source}")]
    Body {
        body: String,
        #[source]
        source: PlanetError,
    },
}

/// Every configured body plus the projection and light they are drawn with.
pub struct Scene<D: GraphicsDevice> {
    bodies: Vec<Planet<D>>,
    projection: Mat4,
    sun_position: Vec3,
}

impl<D: GraphicsDevice> Scene<D> {
    /// Build and place every body in `config.bodies`.
    pub fn build(device: &mut D, config: &Config) -> Result<Self, SceneError> {
        let mut bodies = Vec::with_capacity(config.bodies.len());
        for body in &config.bodies {
            let descriptor = descriptor(body, &config.planet)?;
            let mut planet =
                Planet::from_descriptor(device, &descriptor).map_err(|source| SceneError::Body {
                    body: body.name.clone(),
                    source,
                })?;
            planet.set_position(eye_position(body, &config.scene));
            bodies.push(planet);
        }

        Ok(Self {
            bodies,
            projection: projection(&config.render, &config.scene),
            sun_position: Vec3::from_array(config.scene.sun_position),
        })
    }

    /// Draw every body once.
    pub fn draw(&self, device: &mut D) {
        for body in &self.bodies {
            body.draw(device, &self.projection, self.sun_position);
        }
    }

    pub fn bodies(&self) -> &[Planet<D>] {
        &self.bodies
    }

    pub fn projection(&self) -> &Mat4 {
        &self.projection
    }

    pub fn sun_position(&self) -> Vec3 {
        self.sun_position
    }
}

/// Turn a configured body into a validated descriptor.
pub fn descriptor(body: &BodyConfig, planet: &PlanetConfig) -> Result<PlanetDescriptor, SceneError> {
    let color = MaterialColor::try_from(body.color).map_err(|source| SceneError::Color {
        body: body.name.clone(),
        source,
    })?;
    Ok(PlanetDescriptor {
        name: body.name.clone(),
        radius: body.radius,
        color,
        central_body: body.central_body.clone(),
        tessellation: Some(Tessellation {
            bands: planet.bands,
            segments: planet.segments,
        }),
    })
}

/// Body position with the scene pushed `camera_distance` down -Z.
pub fn eye_position(body: &BodyConfig, scene: &SceneConfig) -> Vec3 {
    Vec3::from_array(body.position) - Vec3::Z * scene.camera_distance
}

/// Right-handed perspective projection with a [0, 1] depth range.
pub fn projection(render: &RenderConfig, scene: &SceneConfig) -> Mat4 {
    let aspect = render.width.max(1) as f32 / render.height.max(1) as f32;
    Mat4::perspective_rh(scene.fov_y_degrees.to_radians(), aspect, scene.near, scene.far)
}

#[cfg(test)]
mod tests {
    use orrery_config::default_bodies;
    use orrery_render::HeadlessDevice;

    use super::*;

    fn small_config() -> Config {
        let mut config = Config {
            bodies: default_bodies(),
            ..Config::default()
        };
        config.planet.bands = 6;
        config.planet.segments = 10;
        config
    }

    #[test]
    fn test_scene_draws_every_body() {
        let mut device = HeadlessDevice::new();
        let config = small_config();
        let scene = Scene::build(&mut device, &config).unwrap();

        scene.draw(&mut device);

        assert_eq!(scene.bodies().len(), 2);
        assert_eq!(device.take_draws().len(), 2);
        assert_eq!(device.rejected_draws(), 0);
        assert_eq!(scene.bodies()[1].central_body(), Some("Earth"));
    }

    #[test]
    fn test_bodies_are_pushed_in_front_of_camera() {
        let mut device = HeadlessDevice::new();
        let config = small_config();
        let scene = Scene::build(&mut device, &config).unwrap();

        let earth = &scene.bodies()[0];
        assert_eq!(earth.position(), Vec3::new(-4.0, 0.0, -30.0));
    }

    #[test]
    fn test_invalid_color_names_the_body() {
        let body = BodyConfig {
            name: "Bad".to_string(),
            color: [1.0, 2.0, 0.0, 1.0],
            ..BodyConfig::default()
        };
        let err = descriptor(&body, &PlanetConfig::default()).unwrap_err();
        assert!(err.to_string().contains("'Bad'"));
    }

    #[test]
    fn test_invalid_radius_stops_scene_build() {
        let mut device = HeadlessDevice::new();
        let mut config = small_config();
        config.bodies[1].radius = 0.0;

        let result = Scene::build(&mut device, &config);

        assert!(matches!(result, Err(SceneError::Body { ref body, .. }) if body == "Moon"));
    }

    #[test]
    fn test_projection_uses_aspect() {
        let render = RenderConfig {
            width: 200,
            height: 100,
            ..RenderConfig::default()
        };
        let scene = SceneConfig::default();
        let expected =
            Mat4::perspective_rh(45.0_f32.to_radians(), 2.0, scene.near, scene.far);
        assert!(projection(&render, &scene).abs_diff_eq(expected, 1e-6));
    }
}
