#![cfg(unix)]

use std::{
    os::unix::fs::PermissionsExt as _,
    path::{Path, PathBuf},
    process::{Command, Output},
};

const EXAMPLE: &str = r#"#!/bin/sh
printf '%s\n' "$@" > example_args.txt
prefix=""
while [ $# -gt 0 ]; do
    case "$1" in
        --framedump) prefix="$2"; shift ;;
    esac
    shift
done
read start
[ "$start" = "$prefix" ] || exit 3
i=0
while [ $i -lt 3 ]; do
    f=$(printf '%s%06d.rgba' "$prefix" $i)
    : > "$f"
    echo "$f"
    read ack
    [ "$ack" = "$f" ] || exit 4
    i=$((i + 1))
done
"#;

const CONVERT: &str = r#"#!/bin/sh
echo "$*" >> "$CALL_LOG"
if [ -n "$FAIL_MATCH" ]; then
    case " $* " in
        *"$FAIL_MATCH"*) exit 1 ;;
    esac
fi
src="$FIXTURE_PNG"
if [ -n "$ODD_MATCH" ]; then
    case " $* " in
        *"$ODD_MATCH"*) src="$ODD_PNG" ;;
    esac
fi
for last; do :; done
cp "$src" "$last"
"#;

const FFMPEG: &str = r#"#!/bin/sh
echo "$*" >> "$ENCODE_LOG"
for last; do :; done
pattern=""
prev=""
for a; do
    [ "$prev" = "-i" ] && pattern="$a"
    prev="$a"
done
n=$(ls "$(dirname "$pattern")" | grep -c '^frame-[0-9]\{6\}\.png$')
echo "encoding $n frames" >&2
{ echo "frames=$n"; echo "args=$*"; } > "$last"
"#;

struct Fixture {
    root: tempfile::TempDir,
}

impl Fixture {
    fn new() -> Self {
        let fx = Self {
            root: tempfile::tempdir().unwrap(),
        };
        for dir in ["build/demo", "bin", "out", "tmp"] {
            std::fs::create_dir_all(fx.path(dir)).unwrap();
        }
        write_script(&fx.path("build/demo/triangle"), EXAMPLE);
        write_script(&fx.path("bin/convert"), CONVERT);
        write_script(&fx.path("bin/ffmpeg"), FFMPEG);
        image::RgbImage::new(64, 36)
            .save(fx.path("fixture.png"))
            .unwrap();
        image::RgbImage::from_pixel(32, 18, image::Rgb([255, 0, 0]))
            .save(fx.path("odd.png"))
            .unwrap();
        fx
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.root.path().join(rel)
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_render-videos"));
        cmd.current_dir(self.path("out"))
            .env("TMPDIR", self.path("tmp"))
            .env("CALL_LOG", self.path("calls.log"))
            .env("FIXTURE_PNG", self.path("fixture.png"))
            .env("ODD_PNG", self.path("odd.png"))
            .env("ENCODE_LOG", self.path("encode.log"))
            .env_remove("FAIL_MATCH")
            .env_remove("ODD_MATCH")
            .arg("--ui")
            .arg("console")
            .arg("--root-dir")
            .arg(self.root.path())
            .arg("--convert")
            .arg(self.path("bin/convert"))
            .arg("--ffmpeg")
            .arg(self.path("bin/ffmpeg"))
            .args(["--size", "64x36"]);
        cmd
    }

    fn tmp_is_empty(&self) -> bool {
        std::fs::read_dir(self.path("tmp")).unwrap().next().is_none()
    }
}

fn write_script(path: &Path, body: &str) {
    std::fs::write(path, body).unwrap();
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

#[test]
fn renders_avi_end_to_end() {
    let fx = Fixture::new();
    let out = fx
        .command()
        .arg("--build-dir")
        .arg(fx.path("build"))
        .args(["--scale", "2", "demo/triangle", "--speed", "2"])
        .output()
        .unwrap();

    assert!(
        out.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&out.stderr)
    );

    let video = std::fs::read_to_string(fx.path("out/oglplus-triangle.avi")).unwrap();
    assert!(video.contains("frames=3"), "{video}");
    assert!(video.contains("-framerate 30"));
    assert!(video.contains("-vcodec mpeg4"));

    let example_args = std::fs::read_to_string(fx.path("out/example_args.txt")).unwrap();
    let example_args: Vec<&str> = example_args.lines().collect();
    assert_eq!(&example_args[..3], ["--speed", "2", "--framedump"]);
    assert!(example_args.windows(2).any(|w| w == ["--width", "128"]));
    assert!(example_args.windows(2).any(|w| w == ["--height", "72"]));
    assert!(!example_args.contains(&"--samples"));

    // Three overlays plus one conversion per frame.
    let calls = std::fs::read_to_string(fx.path("calls.log")).unwrap();
    assert_eq!(calls.lines().count(), 6);

    // The encoder runs once, with no availability check beforehand.
    let encodes = std::fs::read_to_string(fx.path("encode.log")).unwrap();
    assert_eq!(encodes.lines().count(), 1);
    assert!(!encodes.contains("-version"));

    let text = stdout(&out);
    assert!(text.contains("Rendering main label ... Done"));
    assert!(text.contains("Rendered frame: 2"));
    assert!(text.contains("Encoding video"));

    assert!(fx.tmp_is_empty(), "work directory was left behind");
}

#[test]
fn failed_frame_is_replaced_and_gif_is_written() {
    let fx = Fixture::new();
    let out = fx
        .command()
        .env("FAIL_MATCH", "frame-000001.rgba")
        .arg("--build-dir")
        .arg(fx.path("build"))
        .args(["--gif", "--max-bytes", "2M", "demo/triangle"])
        .output()
        .unwrap();

    assert!(
        out.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    let gif = std::fs::read_to_string(fx.path("out/oglplus-triangle.gif")).unwrap();
    assert!(gif.contains("frames=3"), "{gif}");
    assert!(gif.contains("-fs 2M"));
    assert!(fx.tmp_is_empty());
}

#[test]
fn wrongly_sized_frame_zero_aborts_the_render() {
    let fx = Fixture::new();
    let out = fx
        .command()
        .env("ODD_MATCH", "frame-000000.rgba")
        .arg("--build-dir")
        .arg(fx.path("build"))
        .arg("demo/triangle")
        .output()
        .unwrap();

    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("first frame"), "stderr: {stderr}");
    assert!(stderr.contains("expected 64x36"));
    assert!(!fx.path("encode.log").exists(), "encoder ran after a fatal frame");
    assert!(!fx.path("out/oglplus-triangle.avi").exists());
    assert!(fx.tmp_is_empty());
}

#[test]
fn missing_build_dir_fails_before_any_work() {
    let fx = Fixture::new();
    let out = fx
        .command()
        .arg("--build-dir")
        .arg(fx.path("no-such-build"))
        .arg("demo/triangle")
        .output()
        .unwrap();

    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("Could not find directory"));
    assert!(!fx.path("calls.log").exists(), "convert ran before validation");
    assert!(fx.tmp_is_empty());
}

#[test]
fn example_launch_failure_exits_with_code_1() {
    let fx = Fixture::new();
    write_script(&fx.path("build/demo/broken"), "#!/no/such/interpreter\n");
    let out = fx
        .command()
        .arg("--build-dir")
        .arg(fx.path("build"))
        .arg("demo/broken")
        .output()
        .unwrap();

    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("Failed to execute"));
    assert!(fx.tmp_is_empty());
}

#[test]
fn encoder_launch_failure_exits_with_code_2() {
    let fx = Fixture::new();
    let out = fx
        .command()
        .arg("--build-dir")
        .arg(fx.path("build"))
        .arg("--ffmpeg")
        .arg(fx.path("bin/no-such-ffmpeg"))
        .arg("demo/triangle")
        .output()
        .unwrap();

    assert_eq!(out.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Failed to execute"));
    assert!(stderr.contains("no-such-ffmpeg"));
    assert!(!fx.path("out/oglplus-triangle.avi").exists());
}

#[test]
fn invalid_size_is_a_usage_error() {
    let fx = Fixture::new();
    let out = fx
        .command()
        .args(["--size", "64by36", "demo/triangle"])
        .output()
        .unwrap();

    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("not a valid frame dimension"));
    assert!(!fx.path("calls.log").exists());
}
