//! ASS subtitle generation for word-by-word captions.
//!
//! ffmpeg's `ass` filter burns the file into the segment video.

use std::fmt::Write;

use super::CaptionInstruction;

/// Style of the single caption line.
#[derive(Debug, Clone)]
pub struct CaptionStyle {
    pub font_name: String,
    pub font_size: u32,
    /// Text colour in ABGR format
    pub primary_color: String,
    pub outline_color: String,
    pub back_color: String,
    pub outline: u32,
    pub shadow: u32,
    /// Numpad layout: 5 is the middle of the frame
    pub alignment: u8,
    pub margin_h: u32,
}

impl Default for CaptionStyle {
    fn default() -> Self {
        Self {
            font_name: "Inter".to_string(),
            font_size: 96,
            primary_color: "&H00FFFFFF".to_string(),
            outline_color: "&H00000000".to_string(),
            back_color: "&H80000000".to_string(),
            outline: 6,
            shadow: 2,
            alignment: 5,
            margin_h: 80,
        }
    }
}

impl CaptionStyle {
    /// Scale font and outline for a canvas of the given height.
    pub fn for_height(height: u32) -> Self {
        let mut style = Self::default();
        style.font_size = (height as f64 * 0.05).round().max(12.0) as u32;
        style.outline = (style.font_size / 16).max(1);
        style
    }

    fn to_style_line(&self) -> String {
        format!(
            "Style: Caption,{font},{size},{primary},{primary},{outline},{back},-1,0,0,0,100,100,0,0,1,{outline_w},{shadow},{align},{margin},{margin},0,1",
            font = self.font_name,
            size = self.font_size,
            primary = self.primary_color,
            outline = self.outline_color,
            back = self.back_color,
            outline_w = self.outline,
            shadow = self.shadow,
            align = self.alignment,
            margin = self.margin_h,
        )
    }
}

/// Pop-in animation applied to every word: starts at 80% scale and grows
/// to full size within 80ms.
const POP_IN: &str = r"{\fscx80\fscy80\t(0,80,\fscx100\fscy100)}";

/// Build an ASS document with one dialogue event per caption instruction.
pub fn generate_ass_file(
    captions: &[CaptionInstruction],
    style: &CaptionStyle,
    play_res: (u32, u32),
) -> String {
    let mut output = String::new();

    // Writing into a String cannot fail.
    let _ = writeln!(output, "[Script Info]");
    let _ = writeln!(output, "ScriptType: v4.00+");
    let _ = writeln!(output, "PlayResX: {}", play_res.0);
    let _ = writeln!(output, "PlayResY: {}", play_res.1);
    let _ = writeln!(output, "WrapStyle: 2");
    let _ = writeln!(output, "ScaledBorderAndShadow: yes");
    let _ = writeln!(output);

    let _ = writeln!(output, "[V4+ Styles]");
    let _ = writeln!(
        output,
        "Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding"
    );
    let _ = writeln!(output, "{}", style.to_style_line());
    let _ = writeln!(output);

    let _ = writeln!(output, "[Events]");
    let _ = writeln!(
        output,
        "Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text"
    );

    for caption in captions {
        let _ = writeln!(
            output,
            "Dialogue: 0,{start},{end},Caption,,0,0,0,,{pop}{text}",
            start = format_ass_timestamp(caption.start),
            end = format_ass_timestamp(caption.end()),
            pop = POP_IN,
            text = escape_ass_text(&caption.text),
        );
    }

    output
}

/// Format seconds as an ASS timestamp (H:MM:SS.cc).
fn format_ass_timestamp(seconds: f64) -> String {
    let total_cs = (seconds.max(0.0) * 100.0).round() as u64;
    let hours = total_cs / 360_000;
    let minutes = (total_cs / 6_000) % 60;
    let secs = (total_cs / 100) % 60;
    let cs = total_cs % 100;
    format!("{}:{:02}:{:02}.{:02}", hours, minutes, secs, cs)
}

fn escape_ass_text(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('{', "\\{")
        .replace('}', "\\}")
        .replace('\n', "\\N")
}
