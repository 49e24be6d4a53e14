use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{Context, Result, bail};
use indicatif::ProgressBar;

use crate::common::progress::create_render_bar;
use crate::ui::prelude::{Level, emit};

use super::util::{concat_list_entry, format_time};
use super::{GainedTrack, MediaBackend, MediaHandle};

pub trait FfmpegRunner {
    fn run(&self, args: &[String], options: FfmpegRunOptions) -> Result<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemFfmpegRunner;

#[derive(Debug, Clone, Default)]
pub struct FfmpegRunOptions {
    /// Expected output duration; enables the progress bar
    pub total_duration: Option<f64>,
    pub verbose: bool,
}

impl FfmpegRunOptions {
    pub fn new(total_duration: Option<f64>, verbose: bool) -> Self {
        Self {
            total_duration,
            verbose,
        }
    }

    fn quiet() -> Self {
        Self::default()
    }
}

impl FfmpegRunner for SystemFfmpegRunner {
    fn run(&self, args: &[String], options: FfmpegRunOptions) -> Result<()> {
        emit(
            Level::Debug,
            "reel.ffmpeg.exec",
            &format!("ffmpeg {}", args.join(" ")),
            None,
        );

        let mut child = Command::new("ffmpeg")
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .context("Failed to spawn ffmpeg")?;

        let stderr = child
            .stderr
            .take()
            .context("ffmpeg stderr was not captured")?;

        let pb = options
            .total_duration
            .map(|duration| create_render_bar(duration, "rendering".to_string()));

        let mut last_line = String::new();
        let mut error_lines: Vec<String> = Vec::new();
        let result = read_ffmpeg_stderr(
            stderr,
            options.verbose,
            pb.as_ref(),
            &mut last_line,
            &mut error_lines,
        );

        let status = child.wait().context("Failed to wait for ffmpeg")?;
        result?;

        if let Some(pb) = pb {
            pb.finish_with_message("done");
        }

        if !status.success() {
            let error_msg = if !error_lines.is_empty() {
                error_lines.join("\n")
            } else {
                last_line
            };
            bail!(
                "ffmpeg exited with status {:?}: {}",
                status.code(),
                error_msg.trim()
            );
        }

        Ok(())
    }
}

fn read_ffmpeg_stderr<R: Read>(
    mut stderr: R,
    verbose: bool,
    pb: Option<&ProgressBar>,
    last_line: &mut String,
    error_lines: &mut Vec<String>,
) -> Result<()> {
    let mut buffer = [0u8; 4096];
    let mut accumulated = String::new();

    loop {
        let bytes_read = stderr
            .read(&mut buffer)
            .context("Failed to read ffmpeg stderr")?;
        if bytes_read == 0 {
            break;
        }

        accumulated.push_str(&String::from_utf8_lossy(&buffer[..bytes_read]));

        while let Some(pos) = accumulated.find(['\r', '\n']) {
            let line = accumulated[..pos].to_string();
            accumulated.drain(..=pos);

            if line.is_empty() {
                continue;
            }

            if verbose {
                eprintln!("{}", line);
            }

            if line.to_ascii_lowercase().contains("error") {
                error_lines.push(line.clone());
            }

            if let Some(pb) = pb
                && let Some(progress) = parse_ffmpeg_progress(&line)
            {
                pb.set_position((progress * 1000.0) as u64);
                if let Some(speed) = parse_ffmpeg_speed(&line) {
                    pb.set_message(speed);
                }
            }

            *last_line = line;
        }
    }

    Ok(())
}

fn parse_ffmpeg_progress(line: &str) -> Option<f64> {
    let time_start = line.find("time=")?;
    let time_str = &line[time_start + 5..];
    let time_end = time_str.find(' ')?;
    parse_time_to_seconds(&time_str[..time_end])
}

fn parse_time_to_seconds(time_str: &str) -> Option<f64> {
    let parts: Vec<&str> = time_str.split(':').collect();
    if parts.len() != 3 {
        return None;
    }

    let hours: f64 = parts[0].parse().ok()?;
    let minutes: f64 = parts[1].parse().ok()?;
    let seconds: f64 = parts[2].parse().ok()?;

    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

fn parse_ffmpeg_speed(line: &str) -> Option<String> {
    let speed_start = line.find("speed=")?;
    let speed_str = line[speed_start + 6..].trim_start();
    let speed_end = speed_str.find('x')?;
    Some(speed_str[..=speed_end].to_string())
}

pub fn probe_duration_seconds(path: &Path) -> Result<f64> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .output()
        .with_context(|| format!("Failed to run ffprobe for {}", path.display()))?;

    if !output.status.success() {
        bail!(
            "ffprobe failed for {}: {}",
            path.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    let duration_str = String::from_utf8_lossy(&output.stdout);
    let duration: f64 = duration_str
        .trim()
        .parse()
        .with_context(|| format!("Failed to parse ffprobe duration for {}", path.display()))?;

    Ok(duration)
}

/// [`MediaBackend`] that shells out to ffmpeg through an [`FfmpegRunner`].
pub struct FfmpegBackend<'a> {
    runner: &'a dyn FfmpegRunner,
}

impl<'a> FfmpegBackend<'a> {
    pub fn new(runner: &'a dyn FfmpegRunner) -> Self {
        Self { runner }
    }

    fn subclip_args(source: &Path, start: f64, end: f64, strip_audio: bool, out: &Path) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(),
            "-ss".to_string(),
            format_time(start),
            "-i".to_string(),
            source.to_string_lossy().into_owned(),
            "-t".to_string(),
            format_time(end - start),
        ];
        if strip_audio {
            args.push("-an".to_string());
        } else {
            args.extend(["-c:a".to_string(), "aac".to_string()]);
        }
        args.extend(
            ["-c:v", "libx264", "-preset", "veryfast", "-crf", "20"]
                .into_iter()
                .map(String::from),
        );
        args.push(out.to_string_lossy().into_owned());
        args
    }

    fn loop_args(source: &Path, duration: f64, out: &Path) -> Vec<String> {
        vec![
            "-y".to_string(),
            "-stream_loop".to_string(),
            "-1".to_string(),
            "-i".to_string(),
            source.to_string_lossy().into_owned(),
            "-vn".to_string(),
            "-t".to_string(),
            format_time(duration),
            "-c:a".to_string(),
            "pcm_s16le".to_string(),
            "-ar".to_string(),
            "48000".to_string(),
            out.to_string_lossy().into_owned(),
        ]
    }

    fn mix_args(tracks: &[GainedTrack<'_>], out: &Path) -> Vec<String> {
        let mut args = vec!["-y".to_string()];
        for track in tracks {
            args.push("-i".to_string());
            args.push(track.handle.path.to_string_lossy().into_owned());
        }

        let mut filters = Vec::with_capacity(tracks.len() + 1);
        let mut labels = String::new();
        for (idx, track) in tracks.iter().enumerate() {
            filters.push(format!(
                "[{idx}:a]aresample=48000,volume={gain:.6}[g{idx}]",
                gain = track.gain
            ));
            labels.push_str(&format!("[g{idx}]"));
        }
        filters.push(format!(
            "{labels}amix=inputs={count}:normalize=0:duration=longest:dropout_transition=0[mixed]",
            count = tracks.len()
        ));

        args.extend([
            "-filter_complex".to_string(),
            filters.join(";"),
            "-map".to_string(),
            "[mixed]".to_string(),
            "-c:a".to_string(),
            "pcm_s16le".to_string(),
            out.to_string_lossy().into_owned(),
        ]);
        args
    }

    fn concat_args(list_path: &Path, out: &Path) -> Vec<String> {
        vec![
            "-y".to_string(),
            "-f".to_string(),
            "concat".to_string(),
            "-safe".to_string(),
            "0".to_string(),
            "-i".to_string(),
            list_path.to_string_lossy().into_owned(),
            "-c".to_string(),
            "copy".to_string(),
            out.to_string_lossy().into_owned(),
        ]
    }
}

/// Concat demuxer list for `parts`.
///
/// The demuxer resolves relative entries against the list file's directory,
/// so every entry is made absolute against the working directory first.
fn concat_listing(parts: &[PathBuf]) -> Result<String> {
    let mut listing = String::new();
    for part in parts {
        let absolute = std::path::absolute(part)
            .with_context(|| format!("Failed to resolve {}", part.display()))?;
        listing.push_str(&concat_list_entry(&absolute));
        listing.push('\n');
    }
    Ok(listing)
}

impl MediaBackend for FfmpegBackend<'_> {
    fn probe(&self, path: &Path) -> Result<f64> {
        probe_duration_seconds(path)
    }

    fn extract_subclip(
        &self,
        source: &Path,
        start: f64,
        end: f64,
        strip_audio: bool,
        out: &Path,
    ) -> Result<MediaHandle> {
        if end <= start {
            bail!(
                "Empty sub-clip [{start:.3}, {end:.3}) requested from {}",
                source.display()
            );
        }
        let args = Self::subclip_args(source, start, end, strip_audio, out);
        self.runner
            .run(&args, FfmpegRunOptions::quiet())
            .with_context(|| format!("Failed to cut sub-clip from {}", source.display()))?;
        Ok(MediaHandle::new(out, end - start))
    }

    fn loop_to_duration(
        &self,
        source: &MediaHandle,
        duration: f64,
        out: &Path,
    ) -> Result<MediaHandle> {
        if source.duration <= 0.0 {
            bail!("Cannot loop empty track {}", source.path.display());
        }
        let args = Self::loop_args(&source.path, duration, out);
        self.runner
            .run(&args, FfmpegRunOptions::quiet())
            .with_context(|| format!("Failed to loop {}", source.path.display()))?;
        Ok(MediaHandle::new(out, duration))
    }

    fn mix(&self, tracks: &[GainedTrack<'_>], out: &Path) -> Result<MediaHandle> {
        if tracks.is_empty() {
            bail!("No tracks to mix into {}", out.display());
        }
        let args = Self::mix_args(tracks, out);
        self.runner
            .run(&args, FfmpegRunOptions::quiet())
            .with_context(|| format!("Failed to mix audio into {}", out.display()))?;
        let duration = tracks
            .iter()
            .map(|t| t.handle.duration)
            .fold(0.0_f64, f64::max);
        Ok(MediaHandle::new(out, duration))
    }

    fn concat(&self, parts: &[PathBuf], out: &Path) -> Result<MediaHandle> {
        if parts.is_empty() {
            bail!("No inputs to concatenate into {}", out.display());
        }

        let list_path = out.with_extension("concat.txt");
        let listing = concat_listing(parts)?;
        fs::write(&list_path, listing)
            .with_context(|| format!("Failed to write concat list {}", list_path.display()))?;

        let args = Self::concat_args(&list_path, out);
        let result = self.runner.run(&args, FfmpegRunOptions::quiet());
        let _ = fs::remove_file(&list_path);
        result.with_context(|| format!("Failed to concatenate into {}", out.display()))?;

        let duration = self.probe(out)?;
        Ok(MediaHandle::new(out, duration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingRunner {
        calls: RefCell<Vec<Vec<String>>>,
    }

    impl FfmpegRunner for RecordingRunner {
        fn run(&self, args: &[String], _options: FfmpegRunOptions) -> Result<()> {
            self.calls.borrow_mut().push(args.to_vec());
            Ok(())
        }
    }

    #[test]
    fn subclip_seeks_before_input_and_strips_audio() {
        let runner = RecordingRunner::default();
        let backend = FfmpegBackend::new(&runner);

        let clip = backend
            .extract_subclip(
                Path::new("videos/minecraft.mp4"),
                12.5,
                42.5,
                true,
                Path::new("work/visual.mp4"),
            )
            .unwrap();

        assert_eq!(clip.duration, 30.0);
        let calls = runner.calls.borrow();
        let args = &calls[0];
        let ss = args.iter().position(|a| a == "-ss").unwrap();
        let input = args.iter().position(|a| a == "-i").unwrap();
        assert!(ss < input);
        assert_eq!(args[ss + 1], "12.500000");
        assert!(args.contains(&"-an".to_string()));
        assert!(args.contains(&"30.000000".to_string()));
        assert_eq!(args.last().unwrap(), "work/visual.mp4");
    }

    #[test]
    fn loop_uses_stream_loop_and_exact_duration() {
        let runner = RecordingRunner::default();
        let backend = FfmpegBackend::new(&runner);
        let source = MediaHandle::new("music/lofi.mp3", 20.0);

        let looped = backend
            .loop_to_duration(&source, 75.25, Path::new("work/bg.wav"))
            .unwrap();

        assert_eq!(looped.duration, 75.25);
        let calls = runner.calls.borrow();
        let args = &calls[0];
        let pos = args.iter().position(|a| a == "-stream_loop").unwrap();
        assert_eq!(args[pos + 1], "-1");
        assert!(args.contains(&"75.250000".to_string()));
    }

    #[test]
    fn mix_applies_gains_and_sums_without_normalizing() {
        let runner = RecordingRunner::default();
        let backend = FfmpegBackend::new(&runner);
        let narration = MediaHandle::new("cache/tifu_abc.mp3", 40.0);
        let background = MediaHandle::new("work/bg.wav", 40.0);

        let mixed = backend
            .mix(
                &[
                    GainedTrack {
                        handle: &narration,
                        gain: 1.2,
                    },
                    GainedTrack {
                        handle: &background,
                        gain: 0.15,
                    },
                ],
                Path::new("work/mixed.wav"),
            )
            .unwrap();

        assert_eq!(mixed.duration, 40.0);
        let calls = runner.calls.borrow();
        let args = &calls[0];
        let fc = args.iter().position(|a| a == "-filter_complex").unwrap();
        let graph = &args[fc + 1];
        assert!(graph.contains("[0:a]aresample=48000,volume=1.200000[g0]"));
        assert!(graph.contains("[1:a]aresample=48000,volume=0.150000[g1]"));
        assert!(graph.contains("[g0][g1]amix=inputs=2:normalize=0"));
    }

    #[test]
    fn empty_subclip_is_rejected() {
        let runner = RecordingRunner::default();
        let backend = FfmpegBackend::new(&runner);
        assert!(
            backend
                .extract_subclip(Path::new("a.mp4"), 5.0, 5.0, true, Path::new("b.mp4"))
                .is_err()
        );
        assert!(runner.calls.borrow().is_empty());
    }

    #[test]
    fn concat_list_entries_are_absolute() {
        let listing = concat_listing(&[
            PathBuf::from("audio_cache/tifu_x_part0.mp3"),
            PathBuf::from("/srv/cache/tifu_x_part1.mp3"),
        ])
        .unwrap();

        let cwd = std::env::current_dir().unwrap();
        let expected = format!(
            "file '{}'\nfile '/srv/cache/tifu_x_part1.mp3'\n",
            cwd.join("audio_cache/tifu_x_part0.mp3").display()
        );
        assert_eq!(listing, expected);
    }

    /// Captures the concat list while it still exists on disk.
    #[derive(Default)]
    struct ListReadingRunner {
        listing: RefCell<Option<String>>,
    }

    impl FfmpegRunner for ListReadingRunner {
        fn run(&self, args: &[String], _options: FfmpegRunOptions) -> Result<()> {
            if let Some(pos) = args.iter().position(|a| a == "-i") {
                *self.listing.borrow_mut() = fs::read_to_string(&args[pos + 1]).ok();
            }
            Ok(())
        }
    }

    #[test]
    fn concat_with_relative_cache_dir_lists_resolvable_paths() {
        let dir = tempfile::TempDir::new().unwrap();
        let runner = ListReadingRunner::default();
        let backend = FfmpegBackend::new(&runner);
        let parts = vec![
            PathBuf::from("audio_cache/aita_q_part0.mp3"),
            PathBuf::from("audio_cache/aita_q_part1.mp3"),
        ];

        // The stitched file is never produced here, so only the list matters.
        let _ = backend.concat(&parts, &dir.path().join("aita_q.partial.mp3"));

        let listing = runner.listing.borrow().clone().unwrap();
        for line in listing.lines() {
            let path = line
                .strip_prefix("file '")
                .and_then(|rest| rest.strip_suffix('\''))
                .unwrap();
            assert!(Path::new(path).is_absolute(), "relative entry: {line}");
        }
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(
            listing.lines().next().unwrap(),
            format!("file '{}'", cwd.join("audio_cache/aita_q_part0.mp3").display())
        );
        assert_eq!(listing.lines().count(), 2);
        assert!(!dir.path().join("aita_q.partial.concat.txt").exists());
    }

    #[test]
    fn parses_progress_and_speed() {
        let line = "frame=  240 fps= 60 q=28.0 size=    1024kB time=00:01:02.50 bitrate= 134.2kbits/s speed=2.01x";
        assert_eq!(parse_ffmpeg_progress(line), Some(62.5));
        assert_eq!(parse_ffmpeg_speed(line), Some("2.01x".to_string()));
    }
}
