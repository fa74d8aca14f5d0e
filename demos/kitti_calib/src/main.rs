use argh::FromArgs;
use kornia_kitti::{
    filter::{ImageShape, DEFAULT_MAX_DISP},
    homogeneous::{points_from_rows, points_to_rows},
    Calib, CalibConfig,
};

/// Prints the frame transforms of a calibration file and projects a few lidar points
#[derive(FromArgs)]
struct Args {
    /// path to the calibration file
    #[argh(positional)]
    calib_path: std::path::PathBuf,

    /// use the color camera pair (P2, P3) for disparity
    #[argh(switch, short = 'c')]
    color: bool,

    /// camera index used for the image projection
    #[argh(option, short = 'i', default = "2")]
    cam_idx: usize,

    /// image height in pixels
    #[argh(option, default = "375")]
    height: usize,

    /// image width in pixels
    #[argh(option, default = "1242")]
    width: usize,

    /// maximum disparity to keep
    #[argh(option, default = "DEFAULT_MAX_DISP")]
    max_disp: f64,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    let image_shape = ImageShape::from((args.height, args.width));
    let config = CalibConfig {
        color: args.color,
        image_shape,
    };
    let calib = Calib::from_file_with_config(&args.calib_path, config)?;
    log::info!(
        "Loaded {} fields from {}",
        calib.data().len(),
        args.calib_path.display()
    );

    let transforms = [
        ("velo2rect", calib.get_velo2rect()),
        ("velo2road", calib.get_velo2road()),
        ("rect2disp", calib.get_rect2disp()),
        ("velo2disp", calib.get_velo2disp()),
        ("disp2rect", calib.get_disp2rect()),
        ("imu2rect", calib.get_imu2rect()),
    ];
    for (name, transform) in transforms {
        match transform {
            Ok(t) => println!("{name}:\n{:?}", points_to_rows(t.as_ref())),
            Err(e) => log::warn!("Skipping {name}: {e}"),
        }
    }

    // a few points on the road in front of the car
    let velo = points_from_rows(&[
        [5.0, 0.0, -1.7],
        [10.0, 2.0, -1.7],
        [20.0, -3.0, -1.6],
        [40.0, 6.0, -1.5],
        [-5.0, 0.0, -1.7],
    ]);

    let xyd = calib.velo2disp(velo.as_ref())?;
    let (kept, mask) = calib.filter_disps_with_mask(xyd.as_ref(), args.max_disp)?;
    println!(
        "velo2disp kept {}/{} points: {:?}",
        kept.nrows(),
        mask.len(),
        points_to_rows(kept.as_ref())
    );

    let uvd = calib.velo2depth(velo.as_ref(), args.cam_idx)?;
    let uvd = calib.filter_depths(uvd.as_ref(), image_shape)?;
    println!(
        "velo2depth cam {}: {:?}",
        args.cam_idx,
        points_to_rows(uvd.as_ref())
    );

    match calib.velo2road_cols(velo.as_ref()) {
        Ok(road) => println!("velo2road (columns): {:?}", points_to_rows(road.as_ref())),
        Err(e) => log::warn!("Skipping velo2road: {e}"),
    }

    Ok(())
}
