use std::{ffi::OsString, path::PathBuf};

use clap::Parser;

use crate::config::{
    ByteLimit, DEFAULT_FRAME_SIZE, FULL_HD, FrameSize, HALF_HD, HD, LabelChoice, OutputFormat,
    RenderConfig, UiChoice, default_build_dir, default_logo, default_root_dir,
};

#[derive(Parser, Debug)]
#[command(
    name = "render-videos",
    version,
    about = "Render videos from OGLplus examples",
    args_override_self = true,
    after_help = "Options must precede EXAMPLE; everything after it is passed to the example."
)]
pub struct Cli {
    /// The build directory containing the examples.
    #[arg(long = "build-dir", value_name = "DIR")]
    pub build_dir: Option<PathBuf>,

    /// Installation root holding VERSION, BINARY_DIR and the logo.
    #[arg(long = "root-dir", value_name = "DIR")]
    pub root_dir: Option<PathBuf>,

    /// Logo image composited into the corner of every frame.
    #[arg(long, value_name = "FILE")]
    pub logo: Option<PathBuf>,

    /// Scaling factor for the render frame.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub scale: u32,

    /// Dimensions of the video frame as WxH, with W and H positive integers.
    #[arg(long, value_name = "WxH", overrides_with_all = ["half_hd", "hd", "full_hd"])]
    pub size: Option<FrameSize>,

    /// Sets the dimensions of the output to 640x360.
    #[arg(long = "half-hd", overrides_with_all = ["size", "hd", "full_hd"])]
    pub half_hd: bool,

    /// Sets the dimensions of the output to 1280x720.
    #[arg(long, overrides_with_all = ["size", "half_hd", "full_hd"])]
    pub hd: bool,

    /// Sets the dimensions of the output to 1920x1080.
    #[arg(long = "full-hd", overrides_with_all = ["size", "half_hd", "hd"])]
    pub full_hd: bool,

    /// Number of frames per second.
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u32).range(1..))]
    pub fps: u32,

    /// Number of multisampling samples (0 leaves the example's default).
    #[arg(long, default_value_t = 0)]
    pub samples: u32,

    /// Maximum output size in bytes, optionally suffixed with k, M or G.
    #[arg(long = "max-bytes", value_name = "SIZE")]
    pub max_bytes: Option<ByteLimit>,

    /// Render output into GIF format.
    #[arg(long)]
    pub gif: bool,

    /// Render a small, size-capped GIF (420x240, 24 fps, scale 2, 14500k).
    #[arg(long = "twitter-gif")]
    pub twitter_gif: bool,

    /// Example label string.
    #[arg(long = "sample-label", value_name = "TEXT")]
    pub sample_label: Option<String>,

    /// Use the version number as the label string.
    #[arg(long = "version-label")]
    pub version_label: bool,

    /// Progress presentation.
    #[arg(long, value_enum, default_value_t = UiChoice::Auto)]
    pub ui: UiChoice,

    /// ImageMagick convert program.
    #[arg(long, value_name = "PROG", default_value = "convert")]
    pub convert: OsString,

    /// ffmpeg program.
    #[arg(long, value_name = "PROG", default_value = "ffmpeg")]
    pub ffmpeg: OsString,

    /// Example executable (relative to the build directory) followed by its arguments.
    #[arg(
        value_name = "EXAMPLE",
        required = true,
        num_args = 1..,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub example_args: Vec<String>,
}

impl Cli {
    fn frame_size(&self) -> FrameSize {
        if self.half_hd {
            HALF_HD
        } else if self.hd {
            HD
        } else if self.full_hd {
            FULL_HD
        } else {
            self.size.unwrap_or(DEFAULT_FRAME_SIZE)
        }
    }

    pub fn into_config(self) -> RenderConfig {
        let frame_size = self.frame_size();
        let root_dir = self.root_dir.unwrap_or_else(default_root_dir);
        let build_dir = self
            .build_dir
            .unwrap_or_else(|| default_build_dir(&root_dir));
        let logo = self.logo.unwrap_or_else(|| default_logo(&root_dir));

        let label = match (self.sample_label, self.version_label) {
            (Some(label), _) => LabelChoice::Explicit(label),
            (None, true) => LabelChoice::Version,
            (None, false) => LabelChoice::ExampleName,
        };

        let mut args = self.example_args.into_iter();
        let example = PathBuf::from(args.next().unwrap_or_default());

        let mut cfg = RenderConfig {
            build_dir,
            root_dir,
            logo,
            frame_size,
            render_scale: self.scale,
            fps: self.fps,
            samples: self.samples,
            max_bytes: self.max_bytes,
            format: if self.gif {
                OutputFormat::Gif
            } else {
                OutputFormat::Avi
            },
            label,
            example,
            example_args: args.collect(),
            convert_program: self.convert,
            ffmpeg_program: self.ffmpeg,
            ui: self.ui,
        };
        if self.twitter_gif {
            cfg.apply_twitter_gif();
        }
        cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> RenderConfig {
        let argv = std::iter::once("render-videos").chain(args.iter().copied());
        Cli::try_parse_from(argv).unwrap().into_config()
    }

    fn rejects(args: &[&str]) -> bool {
        let argv = std::iter::once("render-videos").chain(args.iter().copied());
        Cli::try_parse_from(argv).is_err()
    }

    #[test]
    fn defaults_match_a_plain_avi_render() {
        let cfg = parse(&["--build-dir", "/b", "demo/triangle"]);
        assert_eq!(cfg.frame_size, DEFAULT_FRAME_SIZE);
        assert_eq!(cfg.fps, 30);
        assert_eq!(cfg.render_scale, 1);
        assert_eq!(cfg.samples, 0);
        assert_eq!(cfg.max_bytes, None);
        assert_eq!(cfg.format, OutputFormat::Avi);
        assert_eq!(cfg.label, LabelChoice::ExampleName);
        assert_eq!(cfg.build_dir, PathBuf::from("/b"));
        assert_eq!(cfg.example, PathBuf::from("demo/triangle"));
        assert!(cfg.example_args.is_empty());
    }

    #[test]
    fn size_presets_override_each_other_last_wins() {
        assert_eq!(parse(&["--size", "100x50", "--hd", "x"]).frame_size, HD);
        assert_eq!(
            parse(&["--hd", "--size", "100x50", "x"]).frame_size,
            FrameSize {
                width: 100,
                height: 50
            }
        );
        assert_eq!(parse(&["--full-hd", "--half-hd", "x"]).frame_size, HALF_HD);
        assert_eq!(parse(&["--half-hd", "--full-hd", "x"]).frame_size, FULL_HD);
        assert_eq!(
            parse(&["--size", "10x10", "--size", "20x20", "x"]).frame_size,
            FrameSize {
                width: 20,
                height: 20
            }
        );
    }

    #[test]
    fn invalid_size_and_byte_cap_are_usage_errors() {
        assert!(rejects(&["--size", "100", "x"]));
        assert!(rejects(&["--size", "0x10", "x"]));
        assert!(rejects(&["--max-bytes", "12abc", "x"]));
        assert!(rejects(&["--scale", "0", "x"]));
        assert!(rejects(&["--fps", "0", "x"]));
        assert!(rejects(&[]));
    }

    #[test]
    fn twitter_gif_wins_regardless_of_order() {
        for args in [
            &["--twitter-gif", "--size", "1000x1000", "--fps", "60", "--scale", "3", "x"][..],
            &["--size", "1000x1000", "--fps", "60", "--scale", "3", "--twitter-gif", "x"][..],
            &["--max-bytes", "1G", "--twitter-gif", "--full-hd", "x"][..],
        ] {
            let cfg = parse(args);
            assert_eq!(
                cfg.frame_size,
                FrameSize {
                    width: 420,
                    height: 240
                }
            );
            assert_eq!(cfg.fps, 24);
            assert_eq!(cfg.render_scale, 2);
            assert_eq!(cfg.format, OutputFormat::Gif);
            assert_eq!(cfg.max_bytes.unwrap().to_string(), "14500k");
        }
    }

    #[test]
    fn explicit_label_beats_version_label() {
        let cfg = parse(&["--version-label", "--sample-label", "Torus", "x"]);
        assert_eq!(cfg.label, LabelChoice::Explicit("Torus".into()));
        let cfg = parse(&["--version-label", "x"]);
        assert_eq!(cfg.label, LabelChoice::Version);
    }

    #[test]
    fn trailing_arguments_are_forwarded_to_the_example() {
        let cfg = parse(&["--gif", "demo/triangle.exe", "--speed", "2", "-v"]);
        assert_eq!(cfg.example, PathBuf::from("demo/triangle.exe"));
        assert_eq!(cfg.example_args, ["--speed", "2", "-v"]);
        assert_eq!(cfg.example_name(), "triangle");
        assert_eq!(cfg.output_file_name(), "oglplus-triangle.gif");

        // No separator is needed after EXAMPLE; a literal `--` is forwarded too.
        let cfg = parse(&["--twitter-gif", "demo/torus", "--speed", "2"]);
        assert_eq!(cfg.example_args, ["--speed", "2"]);
        let cfg = parse(&["demo/torus", "--", "--speed", "2"]);
        assert_eq!(cfg.example_args, ["--", "--speed", "2"]);
    }
}
