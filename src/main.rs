use std::path::Path;

use clap::Parser;
use log::{error, info};
use poptics::{
    config::SimulationConfig,
    console::{show_intro, Args, PartialArgs},
    error::{PopError, PopResult},
    pipeline::{Pipeline, RunResult},
    raytrace::raytrace,
};
use serde::Serialize;
use uom::si::length::meter;

/// One line of the CSV summary.
#[derive(Serialize)]
struct SummaryRecord {
    wavelength: f64,
    surface: usize,
    wz_x: f64,
    wz_y: f64,
    fratio_x: f64,
    fratio_y: f64,
    distance_to_focus_x: f64,
    distance_to_focus_y: f64,
    dx: f64,
    dy: f64,
    peak_amplitude: f64,
}

fn summary(config: &SimulationConfig, results: &[RunResult]) -> Vec<SummaryRecord> {
    let mut records = Vec::new();
    for (wavelength, result) in config.wavelengths.iter().zip(results) {
        let wavelength = wavelength.get::<meter>();
        match result {
            Ok(surfaces) => {
                for (number, surface) in surfaces {
                    println!(
                        "{wavelength:.3e} m S{number:02}: w(z)=({:.4e}, {:.4e}) m, F#=({:.3}, {:.3}), dx={:.4e} m",
                        surface.wz.0, surface.wz.1, surface.fratio.0, surface.fratio.1, surface.dx()
                    );
                    records.push(SummaryRecord {
                        wavelength,
                        surface: *number,
                        wz_x: surface.wz.0,
                        wz_y: surface.wz.1,
                        fratio_x: surface.fratio.0,
                        fratio_y: surface.fratio.1,
                        distance_to_focus_x: surface.distance_to_focus.0,
                        distance_to_focus_y: surface.distance_to_focus.1,
                        dx: surface.dx(),
                        dy: surface.dy(),
                        peak_amplitude: surface.peak_amplitude(),
                    });
                }
            }
            Err(e) => error!("propagation at {wavelength:.3e} m failed: {e}"),
        }
    }
    records
}

fn write_summary(path: &Path, records: &[SummaryRecord]) -> PopResult<()> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| {
        PopError::Other(format!("could not create file path: {}: {}", path.display(), e))
    })?;
    for record in records {
        writer
            .serialize(record)
            .map_err(|e| PopError::Other(format!("writing summary failed: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| PopError::Other(format!("writing summary failed: {e}")))?;
    info!("summary written to {}", path.display());
    Ok(())
}

fn main() -> PopResult<()> {
    //parse CLI arguments
    let args = Args::try_from(PartialArgs::parse())?;
    env_logger::Builder::new()
        .filter_level(args.loglevel.into())
        .init();
    show_intro();

    let config = SimulationConfig::from_file(&args.config)?;
    if args.raytrace {
        info!("Perform a diagnostic ray tracing");
        let chain = config.chain()?;
        let params = config.run_parameters(0, 0)?;
        for line in raytrace(&params.field, &chain, 0.0, 0.0)? {
            println!("{line}");
        }
    }
    let results = Pipeline::new(args.n_jobs)?.run(&config)?;
    write_summary(&args.output, &summary(&config, &results))
}
