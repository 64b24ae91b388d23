use clap::Parser;

use crate::RunConfig;

/// Extension that marks a token as the output path
pub const VIDEO_EXTENSION: &str = ".mp4";

pub const DEFAULT_FPS: u32 = 30;
pub const DEFAULT_OUTPUT: &str = "output.mp4";

#[derive(Parser, Debug)]
#[command(
    name = "timelapse",
    version,
    args_override_self = true,
    about = "Create a timelapse video from the JPG images in the current directory."
)]
pub struct Cli {
    /// Frames per second of the generated video
    #[arg(long, value_name = "N", default_value_t = DEFAULT_FPS,
          value_parser = clap::value_parser!(u32).range(1..))]
    pub fps: u32,

    /// Draw each image's modification time in the bottom-right corner
    #[arg(long, default_value_t = false)]
    pub add_timestamps: bool,

    /// Remove the timestamp cache directory once encoding has finished
    #[arg(long, default_value_t = false)]
    pub clean_cache: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Output file; any token ending in .mp4 (the last one wins)
    #[arg(value_name = "OUTPUT.mp4", value_parser = parse_output)]
    pub outputs: Vec<String>,
}

fn parse_output(token: &str) -> Result<String, String> {
    if token.ends_with(VIDEO_EXTENSION) {
        Ok(token.to_string())
    } else {
        Err(format!("unrecognized argument: {}", token))
    }
}

impl Cli {
    pub fn into_run_config(self) -> RunConfig {
        let output = self
            .outputs
            .into_iter()
            .last()
            .unwrap_or_else(|| DEFAULT_OUTPUT.to_string());
        RunConfig {
            fps: self.fps,
            output: output.into(),
            add_timestamps: self.add_timestamps,
            clean_cache: self.clean_cache,
        }
    }
}
