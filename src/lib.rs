//! This is the documentation for the **poptics** software package. **poptics** simulates the paraxial physical
//! optics (Fresnel) propagation of a coherent wavefront through a sequence of optical surfaces. Its main use is the
//! prediction of diffraction limited point spread functions of optical instruments.
//!
//! A simulation consists of
//!   - an optical chain: an ordered map of [`SurfaceDescriptor`](surface::SurfaceDescriptor)s, usually built from a
//!     prescription by a [`ChainBuilder`](surface::ChainBuilder).
//!   - a [`Wavefront`](wavefront::Wavefront) carrying the sampled field together with a pilot Gaussian beam for the
//!     sagittal and the tangential plane.
//!   - the executor [`run`](run::run) applying each surface to the wavefront.
//!
//! ```rust
//! use poptics::{
//!     aperture::ApertureKind,
//!     run::{run, RunParameters},
//!     surface::{ApertureSpec, ChainBuilder, SurfaceEntry, SurfaceType},
//! };
//!
//! let chain = ChainBuilder::from_entries(&[
//!     SurfaceEntry::new("pupil", SurfaceType::gap(0.0))
//!         .with_aperture(ApertureSpec::new("elliptical", ApertureKind::Aperture, 0.5, 0.5))
//!         .as_stop(),
//!     SurfaceEntry::new("lens", SurfaceType::paraxial_lens(1.0, 1.0)),
//!     SurfaceEntry::new("IMAGE_PLANE", SurfaceType::gap(0.0)).saved(),
//! ])
//! .unwrap();
//! let results = run(&RunParameters::new(1.0, 3.0e-6, 64, 4), &chain).unwrap();
//! assert!(results[&3].distance_to_focus.1.abs() < 1.0e-6);
//! ```
#![allow(clippy::module_name_repetitions)]

pub mod abcd;
pub mod aperture;
pub mod config;
pub mod console;
pub mod coordinate_break;
pub mod error;
pub mod pipeline;
pub mod raytrace;
pub mod run;
pub mod surface;
pub mod utils;
pub mod wavefront;
pub mod zernike;

pub use config::SimulationConfig;
pub use wavefront::Wavefront;
