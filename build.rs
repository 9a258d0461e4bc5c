//! Build-time check of the OpenCV installation the tracker links against.
//!
//! Face detection needs the `objdetect` module and its Haar cascade data,
//! tracking and grayscale conversion need `imgproc`. Missing pieces are
//! reported as cargo warnings; the `opencv` crate's own build decides whether
//! linking succeeds.

use std::path::PathBuf;
use std::process::Command;

const REQUIRED_MODULES: [&str; 3] = ["opencv_core", "opencv_imgproc", "opencv_objdetect"];
const CASCADE_FILE: &str = "haarcascade_frontalface_alt.xml";

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=PKG_CONFIG_PATH");
    println!("cargo:rerun-if-env-changed=OPENCV_LINK_LIBS");

    let Some(package) = find_opencv_package() else {
        println!("cargo:warning=OpenCV not found via pkg-config (tried opencv4, opencv)");
        println!("cargo:warning=On Ubuntu: sudo apt-get install libopencv-dev pkg-config");
        println!("cargo:warning=On macOS: brew install opencv pkg-config");
        return;
    };

    if let Some(libs) = pkg_config(&["--libs", package]) {
        for module in REQUIRED_MODULES {
            if !libs.split_whitespace().any(|flag| flag == format!("-l{module}")) {
                println!("cargo:warning={package} does not list {module}; head tracking needs it");
            }
        }
    }

    match pkg_config(&["--variable=prefix", package]) {
        Some(prefix) if cascade_dirs(&prefix).iter().any(|dir| dir.join(CASCADE_FILE).is_file()) => {}
        _ => println!(
            "cargo:warning={CASCADE_FILE} not found in the OpenCV data directory; \
             set classifier.cascade_path in the config or use --detector blob"
        ),
    }
}

/// First pkg-config package name that resolves
fn find_opencv_package() -> Option<&'static str> {
    ["opencv4", "opencv"].into_iter().find(|package| {
        pkg_config(&["--modversion", package]).is_some_and(|version| {
            println!("cargo:warning=Using {package} {version}");
            true
        })
    })
}

fn pkg_config(args: &[&str]) -> Option<String> {
    let output = Command::new("pkg-config").args(args).output().ok()?;
    output
        .status
        .success()
        .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Where distributions install the Haar cascades below the OpenCV prefix
fn cascade_dirs(prefix: &str) -> Vec<PathBuf> {
    let share = PathBuf::from(prefix).join("share");
    vec![
        share.join("opencv4").join("haarcascades"),
        share.join("opencv").join("haarcascades"),
        share.join("OpenCV").join("haarcascades"),
    ]
}
