use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use crate::{config::RenderConfig, error::RenderResult, progress::Ui, tool::Convert};

pub const MAIN_LABEL: &str = "http://oglplus.org";

/// Pre-rendered transparent overlays composited onto every frame.
#[derive(Clone, Debug)]
pub struct Overlays {
    pub main_label: PathBuf,
    pub sample_label: PathBuf,
    pub logo: PathBuf,
}

impl Overlays {
    pub fn in_dir(work_dir: &Path) -> Self {
        Self {
            main_label: work_dir.join("main_label.png"),
            sample_label: work_dir.join("sample_label.png"),
            logo: work_dir.join("logo.png"),
        }
    }
}

/// Canvas width for a text label, wide enough that the text is not clipped.
pub fn label_width(text: &str) -> usize {
    text.chars().count() * 12 + 144
}

struct LabelStyle {
    height: u32,
    pointsize: u32,
    stroke_width: u32,
    shadow: String,
}

fn label_args(text: &str, style: &LabelStyle, out: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = [
        "-size".to_string(),
        format!("{}x{}", label_width(text), style.height),
        "xc:none".into(),
        "-background".into(),
        "none".into(),
        "-pointsize".into(),
        style.pointsize.to_string(),
        "-gravity".into(),
        "center".into(),
        "-stroke".into(),
        "black".into(),
        "-strokewidth".into(),
        style.stroke_width.to_string(),
        "-annotate".into(),
        "0".into(),
        text.into(),
        "-blur".into(),
        "0x4".into(),
        "-shadow".into(),
        style.shadow.clone(),
        "+repage".into(),
        "-stroke".into(),
        "none".into(),
        "-strokewidth".into(),
        "1".into(),
        "-fill".into(),
        "white".into(),
        "-annotate".into(),
        "0".into(),
        text.into(),
    ]
    .into_iter()
    .map(OsString::from)
    .collect();
    args.push(out.into());
    args
}

pub fn main_label_args(text: &str, frame_width: u32, out: &Path) -> Vec<OsString> {
    let style = LabelStyle {
        height: 24,
        pointsize: 24,
        stroke_width: 7,
        shadow: format!("{}x5+1+1", frame_width / 2),
    };
    label_args(text, &style, out)
}

pub fn sample_label_args(text: &str, frame_width: u32, out: &Path) -> Vec<OsString> {
    let style = LabelStyle {
        height: 70,
        pointsize: 16,
        stroke_width: 3,
        shadow: format!("{}x4+1+1", u64::from(frame_width) * 3 / 5),
    };
    label_args(text, &style, out)
}

pub fn logo_args(logo_source: &Path, frame_width: u32, out: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = [
        "-size",
        "144x144",
        "xc:none",
        "-background",
        "white",
        "-gravity",
        "center",
        "-stroke",
        "white",
        "-fill",
        "white",
        "-draw",
        "circle 72,72, 72,144",
        "-blur",
        "2x2",
        "-shadow",
    ]
    .into_iter()
    .map(OsString::from)
    .collect();
    args.push(format!("{frame_width}x6").into());
    args.push("+repage".into());
    args.push(logo_source.into());
    args.extend(
        ["-composite", "-adaptive-resize", "72x72", "-border", "16x0"]
            .into_iter()
            .map(OsString::from),
    );
    args.push(out.into());
    args
}

/// Renders the main label, the example label and the logo into `work_dir`.
#[tracing::instrument(level = "debug", skip(cfg, ui))]
pub fn render_overlays(
    cfg: &RenderConfig,
    work_dir: &Path,
    label: &str,
    ui: &Ui,
) -> RenderResult<Overlays> {
    let overlays = Overlays::in_dir(work_dir);
    let convert = Convert {
        program: &cfg.convert_program,
        work_dir,
    };
    let width = cfg.frame_size.width;

    {
        let _progress = ui.simple_action("Rendering main label");
        convert.run(main_label_args(MAIN_LABEL, width, &overlays.main_label))?;
    }
    {
        let _progress = ui.simple_action("Rendering example label");
        convert.run(sample_label_args(label, width, &overlays.sample_label))?;
    }
    {
        let _progress = ui.simple_action("Rendering logo");
        convert.run(logo_args(&cfg.logo, width, &overlays.logo))?;
    }

    Ok(overlays)
}
