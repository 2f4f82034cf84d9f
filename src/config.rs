#![warn(missing_docs)]
//! Simulation document
//!
//! A [`SimulationConfig`] bundles the general simulation parameters, the entrance pupil, the wavelengths, the field
//! points and the optical prescription. It is stored as YAML document:
//! ```yaml
//! general:
//!   grid_size: 512
//!   zoom: 4
//! pupil_diameter: 0.1
//! wavelengths: [3.0e-6, 4.0e-6]
//! fields:
//!   - { x: 0.0, y: 0.0 }
//! surfaces:
//!   - { name: pupil, type: standard, stop: true, save: true,
//!       aperture: { shape: elliptical, xrad: 0.05, yrad: 0.05 } }
//!   - { name: lens, type: paraxial_lens, focal_length: 1.0, thickness: 1.0 }
//!   - { name: IMAGE_PLANE, type: standard, save: true }
//! ```
//! Lengths are given in meters, field angles in degrees.
use std::{
    collections::BTreeMap,
    fs::{self, File},
    io::Write,
    path::Path,
};

use log::{info, warn};
use serde::{Deserialize, Serialize};
use uom::si::{f64::Length, length::meter};

use crate::{
    error::{PopError, PopResult},
    run::{FieldSlope, RunParameters},
    surface::{ChainBuilder, SurfaceDescriptor, SurfaceEntry},
};

/// Supported numbers of samples along each axis.
pub const GRID_SIZES: [usize; 5] = [64, 128, 256, 512, 1024];
/// Supported zoom factors.
pub const ZOOMS: [usize; 5] = [1, 2, 4, 8, 16];

const fn default_rayleigh_factor() -> f64 {
    2.0
}
/// General simulation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct General {
    /// number of samples along each axis
    pub grid_size: usize,
    /// ratio of the grid width to the pupil diameter
    pub zoom: usize,
    /// keep only the surface named `IMAGE_PLANE` in the results
    #[serde(default)]
    pub light_output: bool,
    /// extent of the Rayleigh range used for the inside/outside classification
    #[serde(default = "default_rayleigh_factor")]
    pub rayleigh_factor: f64,
}
impl Default for General {
    fn default() -> Self {
        Self {
            grid_size: 512,
            zoom: 4,
            light_output: false,
            rayleigh_factor: default_rayleigh_factor(),
        }
    }
}
/// A field point given by its angles in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FieldAngle {
    /// angle in the sagittal plane
    #[serde(default)]
    pub x: f64,
    /// angle in the tangential plane
    #[serde(default)]
    pub y: f64,
}
impl FieldAngle {
    /// Paraxial slopes of this field point.
    #[must_use]
    pub fn slope(&self) -> FieldSlope {
        FieldSlope::from_degrees(self.x, self.y)
    }
}
/// A complete simulation document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// general parameters
    #[serde(default)]
    pub general: General,
    /// diameter of the entrance pupil
    pub pupil_diameter: Length,
    /// wavelengths to be simulated
    pub wavelengths: Vec<Length>,
    /// field points
    #[serde(default)]
    pub fields: Vec<FieldAngle>,
    /// optical prescription
    pub surfaces: Vec<SurfaceEntry>,
}
impl SimulationConfig {
    /// Read a [`SimulationConfig`] from the given YAML file.
    ///
    /// # Errors
    ///
    /// This function will return an error if
    ///   - the file cannot be read.
    ///   - the document cannot be parsed.
    ///   - the document is not valid (see [`validate`](Self::validate)).
    pub fn from_file(path: &Path) -> PopResult<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            PopError::Config(format!("cannot read file {} : {}", path.display(), e))
        })?;
        info!("read simulation document {}", path.display());
        Self::from_string(&contents)
    }
    /// Parse a [`SimulationConfig`] from the given YAML string.
    ///
    /// # Errors
    ///
    /// This function will return an error if the document cannot be parsed or is not valid.
    pub fn from_string(contents: &str) -> PopResult<Self> {
        let config: Self = serde_yaml::from_str(contents)
            .map_err(|e| PopError::Config(format!("parsing of document failed: {e}")))?;
        config.validate()?;
        Ok(config)
    }
    /// Save this [`SimulationConfig`] as YAML file.
    ///
    /// # Errors
    ///
    /// This function will return an error if the serialization failed or the file cannot be written.
    pub fn save_to_file(&self, path: &Path) -> PopResult<()> {
        let serialized = self.to_yaml_string()?;
        let mut output = File::create(path).map_err(|e| {
            PopError::Config(format!("could not create file path: {}: {}", path.display(), e))
        })?;
        write!(output, "{serialized}").map_err(|e| {
            PopError::Config(format!("writing to file path {} failed: {}", path.display(), e))
        })?;
        Ok(())
    }
    /// Return this [`SimulationConfig`] as YAML string.
    ///
    /// # Errors
    ///
    /// This function will return an error if the serialization failed.
    pub fn to_yaml_string(&self) -> PopResult<String> {
        serde_yaml::to_string(self)
            .map_err(|e| PopError::Config(format!("serialization of document failed: {e}")))
    }
    /// Check the general parameters, the pupil, the wavelengths and the fields.
    ///
    /// A zoom of 1 is accepted but results in a point spread function which is not Nyquist sampled. In this case a
    /// warning is logged.
    ///
    /// # Errors
    ///
    /// This function will return an error if
    ///   - the grid size or the zoom is not supported.
    ///   - the pupil diameter or one of the wavelengths is not positive.
    ///   - no wavelength or no field is given.
    pub fn validate(&self) -> PopResult<()> {
        if !GRID_SIZES.contains(&self.general.grid_size) {
            return Err(PopError::Config(format!(
                "grid size {} not supported. Use one of {GRID_SIZES:?}",
                self.general.grid_size
            )));
        }
        if !ZOOMS.contains(&self.general.zoom) {
            return Err(PopError::Config(format!(
                "zoom {} not supported. Use one of {ZOOMS:?}",
                self.general.zoom
            )));
        }
        if self.general.zoom == 1 {
            warn!("Zoom value is 1, i.e. the beam width occupies the whole of the grid width. This will result a PSF that is not Nyquist sampled.");
        }
        if !(self.general.rayleigh_factor.is_finite() && self.general.rayleigh_factor > 0.0) {
            return Err(PopError::Config(
                "rayleigh factor must be positive and finite".into(),
            ));
        }
        let pupil = self.pupil_diameter.get::<meter>();
        if !(pupil.is_finite() && pupil > 0.0) {
            return Err(PopError::Config(
                "pupil diameter must be positive and finite".into(),
            ));
        }
        if self.wavelengths.is_empty() {
            return Err(PopError::Config("no wavelength given".into()));
        }
        if self
            .wavelengths
            .iter()
            .map(|w| w.get::<meter>())
            .any(|w| !(w.is_finite() && w > 0.0))
        {
            return Err(PopError::Config(
                "wavelengths must be positive and finite".into(),
            ));
        }
        if self.fields.is_empty() {
            return Err(PopError::Config("no field given".into()));
        }
        Ok(())
    }
    /// Build the optical chain from the prescription.
    ///
    /// If the `light_output` flag is set, only the surface named `IMAGE_PLANE` is saved.
    ///
    /// # Errors
    ///
    /// This function will return an error if one of the surfaces is invalid.
    pub fn chain(&self) -> PopResult<BTreeMap<usize, SurfaceDescriptor>> {
        let mut chain = ChainBuilder::from_entries(&self.surfaces)?;
        if self.general.light_output {
            for surface in chain.values_mut() {
                surface.save = surface.name == "IMAGE_PLANE";
            }
        }
        Ok(chain)
    }
    /// Run parameters for the wavelength and the field with the given indices.
    ///
    /// # Errors
    ///
    /// This function will return an error if one of the indices is out of range.
    pub fn run_parameters(&self, wavelength: usize, field: usize) -> PopResult<RunParameters> {
        let Some(wavelength) = self.wavelengths.get(wavelength) else {
            return Err(PopError::Config(format!(
                "wavelength index {wavelength} out of range"
            )));
        };
        let Some(field) = self.fields.get(field) else {
            return Err(PopError::Config(format!("field index {field} out of range")));
        };
        let mut params = RunParameters::new(
            self.pupil_diameter.get::<meter>(),
            wavelength.get::<meter>(),
            self.general.grid_size,
            self.general.zoom,
        )
        .with_field(field.slope());
        params.rayleigh_factor = self.general.rayleigh_factor;
        Ok(params)
    }
}
#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        meter,
        surface::{SurfaceKind, SurfaceType},
        utils::test_helper::test_helper::check_warnings,
    };
    use approx::assert_relative_eq;
    use assert_matches::assert_matches;
    use tempfile::NamedTempFile;

    const DOCUMENT: &str = "
general:
  grid_size: 64
  zoom: 4
pupil_diameter: 0.1
wavelengths: [3.0e-6, 4.0e-6]
fields:
  - { x: 0.0, y: 0.0 }
  - { y: 1.0 }
surfaces:
  - name: pupil
    type: standard
    stop: true
    save: true
    aperture: { shape: elliptical, xrad: 0.05, yrad: 0.05 }
  - { name: lens, type: paraxial_lens, focal_length: 1.0, thickness: 1.0 }
  - { name: IMAGE_PLANE, type: standard, save: true }
";
    fn config() -> SimulationConfig {
        SimulationConfig::from_string(DOCUMENT).unwrap()
    }
    #[test]
    fn from_string() {
        let config = config();
        assert_eq!(config.general.grid_size, 64);
        assert_eq!(config.general.zoom, 4);
        assert!(!config.general.light_output);
        assert_eq!(config.general.rayleigh_factor, 2.0);
        assert_eq!(config.pupil_diameter, meter!(0.1));
        assert_eq!(config.wavelengths, vec![meter!(3.0e-6), meter!(4.0e-6)]);
        assert_eq!(config.fields.len(), 2);
        assert_eq!(config.fields[1].x, 0.0);
        assert_eq!(config.surfaces.len(), 3);
        assert_eq!(config.surfaces[1].surface, SurfaceType::paraxial_lens(1.0, 1.0));
        let aperture = config.surfaces[0].aperture.as_ref().unwrap();
        assert_eq!(aperture.shape, "elliptical");
        assert!(aperture.xc.is_nan());
    }
    #[test]
    fn from_string_wrong() {
        assert_matches!(
            SimulationConfig::from_string("general: 3"),
            Err(PopError::Config(_))
        );
        let document = DOCUMENT.replace("type: paraxial_lens", "type: toroidal");
        assert_matches!(
            SimulationConfig::from_string(&document),
            Err(PopError::Config(_))
        );
    }
    #[test]
    fn validate() {
        let mut config = config();
        config.general.grid_size = 100;
        assert_matches!(config.validate(), Err(PopError::Config(_)));
        config.general.grid_size = 2048;
        assert_matches!(config.validate(), Err(PopError::Config(_)));
        config.general.grid_size = 1024;
        config.general.zoom = 3;
        assert_matches!(config.validate(), Err(PopError::Config(_)));
        config.general.zoom = 16;
        assert!(config.validate().is_ok());
        config.pupil_diameter = meter!(0.0);
        assert_matches!(config.validate(), Err(PopError::Config(_)));
        config.pupil_diameter = meter!(1.0);
        config.wavelengths = vec![];
        assert_matches!(config.validate(), Err(PopError::Config(_)));
        config.wavelengths = vec![meter!(-1.0)];
        assert_matches!(config.validate(), Err(PopError::Config(_)));
        config.wavelengths = vec![meter!(1.0e-6)];
        config.fields = vec![];
        assert_matches!(config.validate(), Err(PopError::Config(_)));
    }
    #[test]
    fn zoom_warning() {
        let mut config = config();
        config.general.zoom = 1;
        testing_logger::setup();
        assert!(config.validate().is_ok());
        check_warnings(vec![
            "Zoom value is 1, i.e. the beam width occupies the whole of the grid width. This will result a PSF that is not Nyquist sampled.",
        ]);
    }
    #[test]
    fn chain() {
        let chain = config().chain().unwrap();
        assert_eq!(chain.len(), 3);
        assert_eq!(chain[&2].kind, SurfaceKind::ParaxialLens(1.0));
        assert!(chain[&1].save);
        assert!(chain[&3].save);
    }
    #[test]
    fn chain_light_output() {
        let mut config = config();
        config.general.light_output = true;
        let chain = config.chain().unwrap();
        assert!(!chain[&1].save);
        assert!(chain[&3].save);
    }
    #[test]
    fn run_parameters() {
        let config = config();
        let params = config.run_parameters(1, 1).unwrap();
        assert_eq!(params.pupil_diameter, 0.1);
        assert_relative_eq!(params.wavelength, 4.0e-6);
        assert_eq!(params.grid_size, 64);
        assert_eq!(params.zoom, 4);
        assert_relative_eq!(params.field.ut, 1.0_f64.to_radians().tan());
        assert_eq!(params.field.us, 0.0);
        assert_matches!(config.run_parameters(2, 0), Err(PopError::Config(_)));
        assert_matches!(config.run_parameters(0, 2), Err(PopError::Config(_)));
    }
    #[test]
    fn from_file() {
        let result = SimulationConfig::from_file(Path::new("./invalid_file_path/invalid.yaml"));
        assert!(result
            .unwrap_err()
            .to_string()
            .starts_with("Config:cannot read file ./invalid_file_path/invalid.yaml"));
    }
    #[test]
    fn save_and_load() {
        let file = NamedTempFile::new().unwrap();
        let path = file.into_temp_path();
        let config = config();
        config.save_to_file(&path).unwrap();
        let loaded = SimulationConfig::from_file(&path).unwrap();
        assert_eq!(loaded.general, config.general);
        assert_eq!(loaded.surfaces[1], config.surfaces[1]);
        assert_eq!(loaded.wavelengths, config.wavelengths);
        path.close().unwrap();
    }
}
