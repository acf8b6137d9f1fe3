use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use carve_pipeline::{
    load_rig_input, run_full, step_background, step_calibrate, ReconstructionSession, RigConfig,
};
use clap::{Parser, Subcommand};

/// Four-camera voxel reconstruction pipeline.
#[derive(Debug, Parser)]
#[command(author, version, about = "Calibrate a camera rig, subtract backgrounds, carve voxels")]
struct Args {
    /// Path to a JSON RigConfig. Defaults are used if omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Write a default configuration file to edit.
    InitConfig {
        /// Where to write the config JSON.
        path: PathBuf,
    },
    /// Calibrate every camera and write camera_properties.xml files.
    Calibrate {
        /// Rig data directory (cam1/, cam2/, ...).
        #[arg(long)]
        data_dir: PathBuf,
        /// Output directory.
        #[arg(long)]
        output: PathBuf,
    },
    /// Train background models and write the background images.
    Background {
        #[arg(long)]
        data_dir: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
    /// Carve the voxel model and write voxels.txt / voxels.ply.
    Reconstruct {
        #[arg(long)]
        data_dir: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
    /// Run the full pipeline and write calibrations, voxels, and the report.
    Run {
        #[arg(long)]
        data_dir: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
}

fn load_config(path: Option<&Path>) -> Result<RigConfig> {
    match path {
        Some(p) => RigConfig::load(p),
        None => Ok(RigConfig::default()),
    }
}

fn session_with_data(config: RigConfig, data_dir: &Path) -> Result<ReconstructionSession> {
    let input = load_rig_input(data_dir, &config)?;
    let mut session = ReconstructionSession::new(config);
    session.set_input(input)?;
    Ok(session)
}

fn cmd_calibrate(config: RigConfig, data_dir: &Path, output: &Path) -> Result<()> {
    let mut session = session_with_data(config, data_dir)?;
    step_calibrate(&mut session)?;

    let calibrations = session
        .state
        .calibrations
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("calibration produced no parameters"))?;
    for (i, params) in calibrations.iter().enumerate() {
        let cam_dir = output.join(format!("cam{}", i + 1));
        fs::create_dir_all(&cam_dir)
            .with_context(|| format!("failed to create {}", cam_dir.display()))?;
        carve_pipeline::params_io::save_camera_xml(
            &cam_dir.join("camera_properties.xml"),
            params,
        )?;
        println!(
            "cam{}: fx={:.1} fy={:.1} cx={:.1} cy={:.1}",
            i + 1,
            params.intrinsics.fx,
            params.intrinsics.fy,
            params.intrinsics.cx,
            params.intrinsics.cy
        );
    }
    Ok(())
}

fn cmd_background(config: RigConfig, data_dir: &Path, output: &Path) -> Result<()> {
    let mut session = session_with_data(config, data_dir)?;
    step_background(&mut session)?;

    let images = session
        .state
        .background_images
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("background step produced no models"))?;
    for (i, img) in images.iter().enumerate() {
        let cam_dir = output.join(format!("cam{}", i + 1));
        fs::create_dir_all(&cam_dir)
            .with_context(|| format!("failed to create {}", cam_dir.display()))?;
        let path = cam_dir.join("background_model.png");
        img.save(&path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("cam{}: background model written", i + 1);
    }
    Ok(())
}

fn cmd_reconstruct(config: RigConfig, data_dir: &Path, output: &Path) -> Result<()> {
    let mut session = session_with_data(config, data_dir)?;
    run_full(&mut session)?;

    let voxels = session
        .state
        .voxels
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("reconstruction produced no voxels"))?;

    fs::create_dir_all(output)
        .with_context(|| format!("failed to create {}", output.display()))?;
    carve_voxel::save_voxels_text(&output.join("voxels.txt"), voxels)?;
    carve_voxel::save_voxels_ply(&output.join("voxels.ply"), voxels)?;

    println!("reconstructed {} voxels", voxels.len());
    Ok(())
}

fn cmd_run(config: RigConfig, data_dir: &Path, output: &Path) -> Result<()> {
    let mut session = session_with_data(config, data_dir)?;
    run_full(&mut session)?;

    fs::create_dir_all(output)
        .with_context(|| format!("failed to create {}", output.display()))?;
    session.save_outputs(output)?;

    let report = session.export()?;
    println!(
        "reconstructed {} voxels from {} cameras",
        report.voxel_count,
        report.cameras.len()
    );
    for (i, cam) in report.cameras.iter().enumerate() {
        println!(
            "cam{}: reproj={:.3}px coverage={:.1}%",
            i + 1,
            cam.mean_reproj_error,
            cam.silhouette_coverage * 100.0
        );
    }
    Ok(())
}

fn try_main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    match &args.command {
        Command::InitConfig { path } => {
            RigConfig::default().save(path)?;
            println!("wrote default config to {}", path.display());
            Ok(())
        }
        Command::Calibrate { data_dir, output } => cmd_calibrate(config, data_dir, output),
        Command::Background { data_dir, output } => cmd_background(config, data_dir, output),
        Command::Reconstruct { data_dir, output } => cmd_reconstruct(config, data_dir, output),
        Command::Run { data_dir, output } => cmd_run(config, data_dir, output),
    }
}

fn main() {
    env_logger::init();
    if let Err(err) = try_main() {
        eprintln!("error: {:#}", err);
        std::process::exit(1);
    }
}
