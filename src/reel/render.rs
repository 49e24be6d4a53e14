//! Encoding of packed parts into `part<N>.mp4` files.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::config::RenderSettings;
use super::media::ffmpeg::{FfmpegRunOptions, FfmpegRunner};
use super::media::util::{escape_filter_path, format_time};
use super::packer::OutputPart;
use super::segment::{MediaSegment, Overlay};
use crate::ui::prelude::{Level, emit};

pub fn part_output_path(output_dir: &Path, number: usize) -> PathBuf {
    output_dir.join(format!("part{number}.mp4"))
}

pub trait PartEncoder {
    fn encode(&self, part: &OutputPart<MediaSegment>, out: &Path) -> Result<()>;
}

/// Audio/video settings appended after the filter graph.
#[derive(Debug, Clone, Copy)]
struct EncodeProfile<'a> {
    video_codec: &'a str,
    audio_codec: &'a str,
    frame_rate: u32,
}

impl EncodeProfile<'_> {
    fn push_to(&self, args: &mut Vec<String>) {
        args.extend([
            "-c:v".to_string(),
            self.video_codec.to_string(),
            "-preset".to_string(),
            "medium".to_string(),
            "-crf".to_string(),
            "20".to_string(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
            "-r".to_string(),
            self.frame_rate.to_string(),
            "-c:a".to_string(),
            self.audio_codec.to_string(),
            "-b:a".to_string(),
            "192k".to_string(),
            "-movflags".to_string(),
            "+faststart".to_string(),
        ]);
    }
}

#[derive(Debug, Clone, Copy)]
enum InputRole {
    Visual,
    Audio,
    Card,
}

/// Input files in `-i` order plus the index each segment's streams live at.
struct InputMap {
    inputs: Vec<(PathBuf, InputRole, f64)>,
    /// `(visual, audio, card)` input indices per segment
    per_segment: Vec<(usize, usize, Option<usize>)>,
}

impl InputMap {
    fn build(segments: &[MediaSegment]) -> Self {
        let mut inputs = Vec::new();
        let mut per_segment = Vec::with_capacity(segments.len());

        for segment in segments {
            let visual = inputs.len();
            inputs.push((segment.visual.path.clone(), InputRole::Visual, segment.duration()));
            let audio = inputs.len();
            inputs.push((segment.audio.path.clone(), InputRole::Audio, segment.duration()));
            let card = match &segment.overlay {
                Overlay::Card(card) => {
                    let idx = inputs.len();
                    inputs.push((card.image.clone(), InputRole::Card, card.duration));
                    Some(idx)
                }
                _ => None,
            };
            per_segment.push((visual, audio, card));
        }

        Self {
            inputs,
            per_segment,
        }
    }

    fn input_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        for (path, role, duration) in &self.inputs {
            if let InputRole::Card = role {
                args.extend([
                    "-loop".to_string(),
                    "1".to_string(),
                    "-t".to_string(),
                    format_time(*duration),
                ]);
            }
            args.push("-i".to_string());
            args.push(path.to_string_lossy().into_owned());
        }
        args
    }
}

pub struct FfmpegPartEncoder<'a> {
    runner: &'a dyn FfmpegRunner,
    settings: RenderSettings,
    card_scale: f64,
    dry_run: bool,
    verbose: bool,
}

impl<'a> FfmpegPartEncoder<'a> {
    pub fn new(
        runner: &'a dyn FfmpegRunner,
        settings: RenderSettings,
        card_scale: f64,
        dry_run: bool,
        verbose: bool,
    ) -> Self {
        Self {
            runner,
            settings,
            card_scale,
            dry_run,
            verbose,
        }
    }

    pub fn build_args(&self, part: &OutputPart<MediaSegment>, out: &Path) -> Vec<String> {
        let map = InputMap::build(&part.segments);

        let mut args = vec!["-y".to_string()];
        args.extend(map.input_args());
        args.push("-filter_complex".to_string());
        args.push(self.filter_complex(&part.segments, &map));
        args.extend([
            "-map".to_string(),
            "[outv]".to_string(),
            "-map".to_string(),
            "[outa]".to_string(),
        ]);

        EncodeProfile {
            video_codec: &self.settings.video_codec,
            audio_codec: &self.settings.audio_codec,
            frame_rate: self.settings.frame_rate,
        }
        .push_to(&mut args);

        args.push(out.to_string_lossy().into_owned());
        args
    }

    fn filter_complex(&self, segments: &[MediaSegment], map: &InputMap) -> String {
        let width = self.settings.width();
        let height = self.settings.height();
        let card_height = ((height as f64 * self.card_scale).round() as u32).max(2);

        let mut filters = Vec::new();
        let mut concat_inputs = String::new();

        for (idx, (segment, (visual, audio, card))) in
            segments.iter().zip(&map.per_segment).enumerate()
        {
            let duration = format_time(segment.duration());
            filters.push(format!(
                "[{visual}:v]scale={width}:{height}:force_original_aspect_ratio=increase,crop={width}:{height},setsar=1,fps={fps},format=yuv420p,trim=duration={duration},setpts=PTS-STARTPTS[base{idx}]",
                fps = self.settings.frame_rate,
            ));

            match (&segment.overlay, card) {
                (
                    Overlay::Captions {
                        instructions,
                        subtitle_file,
                    },
                    _,
                ) if !instructions.is_empty() => {
                    filters.push(format!(
                        "[base{idx}]ass='{path}'[v{idx}]",
                        path = escape_filter_path(subtitle_file)
                    ));
                }
                (Overlay::Card(static_card), Some(card)) => {
                    filters.push(format!("[{card}:v]scale=-2:{card_height}[card{idx}]"));
                    filters.push(format!(
                        "[base{idx}][card{idx}]overlay=(W-w)/2:(H-h)/2:eof_action=pass:enable='between(t,0,{shown})'[v{idx}]",
                        shown = format_time(static_card.duration)
                    ));
                }
                _ => filters.push(format!("[base{idx}]null[v{idx}]")),
            }

            filters.push(format!(
                "[{audio}:a]aresample=48000,atrim=duration={duration},asetpts=PTS-STARTPTS[a{idx}]"
            ));
            concat_inputs.push_str(&format!("[v{idx}][a{idx}]"));
        }

        filters.push(format!(
            "{concat_inputs}concat=n={count}:v=1:a=1[outv][outa]",
            count = segments.len()
        ));

        filters.join(";")
    }
}

impl PartEncoder for FfmpegPartEncoder<'_> {
    fn encode(&self, part: &OutputPart<MediaSegment>, out: &Path) -> Result<()> {
        let args = self.build_args(part, out);

        if self.dry_run {
            emit(
                Level::Info,
                "reel.render.dry_run",
                &format!("ffmpeg {}", shell_join(&args)),
                Some(serde_json::json!({
                    "part": part.number,
                    "output": out.display().to_string(),
                })),
            );
            return Ok(());
        }

        emit(
            Level::Info,
            "reel.render.start",
            &format!(
                "Rendering part {} ({} segments, {:.1}s) to {}",
                part.number,
                part.segments.len(),
                part.total,
                out.display()
            ),
            Some(serde_json::json!({
                "part": part.number,
                "items": part
                    .segments
                    .iter()
                    .map(|s| s.item_id.as_str())
                    .collect::<Vec<_>>(),
            })),
        );

        self.runner
            .run(&args, FfmpegRunOptions::new(Some(part.total), self.verbose))
            .with_context(|| format!("Failed to render part {}", part.number))?;

        emit(
            Level::Success,
            "reel.render.complete",
            &format!("Wrote {}", out.display()),
            None,
        );
        Ok(())
    }
}

/// Quote arguments so the printed command can be pasted into a shell.
fn shell_join(args: &[String]) -> String {
    args.iter()
        .map(|arg| {
            if !arg.is_empty()
                && arg
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || "-_./:=+".contains(c))
            {
                arg.clone()
            } else {
                format!("'{}'", arg.replace('\'', "'\\''"))
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
