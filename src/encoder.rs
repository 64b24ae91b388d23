use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command as ProcCommand, ExitStatus};
use thiserror::Error;

use crate::config::EncoderConfig;

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("{program} not found. Please install ffmpeg.")]
    NotFound { program: String },

    #[error("{program} failed ({status})")]
    Failed { program: String, status: ExitStatus },

    #[error("running {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: io::Error,
    },
}

/// Drives ffmpeg's concat demuxer over a frame list
pub struct Encoder {
    config: EncoderConfig,
}

impl Encoder {
    pub fn new(config: EncoderConfig) -> Self {
        Self { config }
    }

    pub fn program(&self) -> &str {
        self.config.ffmpeg_cmd()
    }

    pub fn build_args(&self, manifest: &Path, output: &Path) -> Vec<String> {
        let cfg = &self.config;
        let mut args: Vec<String> = vec!["-f".into(), "concat".into(), "-safe".into(), "0".into()];
        args.push("-i".into());
        args.push(manifest.to_string_lossy().into_owned());
        // pace output by the per-frame durations in the list
        args.push("-vsync".into());
        args.push("vfr".into());
        args.push("-s:v".into());
        args.push(cfg.resolution.clone());
        args.push("-c:v".into());
        args.push(cfg.codec.clone());
        args.push("-crf".into());
        args.push(cfg.crf.to_string());
        args.push("-pix_fmt".into());
        args.push(cfg.pix_fmt.clone());
        args.push(output.to_string_lossy().into_owned());
        args
    }

    /// Run ffmpeg from `work_dir` and wait for it to exit
    pub fn run(&self, work_dir: &Path, manifest: &Path, output: &Path) -> Result<(), EncodeError> {
        let program = self.program().to_string();
        let args = self.build_args(manifest, output);
        tracing::debug!(program = %program, ?args, "running encoder");

        let status = ProcCommand::new(resolve_program(work_dir, &program))
            .args(&args)
            .current_dir(work_dir)
            .status()
            .map_err(|source| match source.kind() {
                io::ErrorKind::NotFound => EncodeError::NotFound {
                    program: program.clone(),
                },
                _ => EncodeError::Io {
                    program: program.clone(),
                    source,
                },
            })?;

        if !status.success() {
            return Err(EncodeError::Failed { program, status });
        }
        Ok(())
    }
}

// A relative path with a separator is taken relative to the working directory;
// a bare name goes through PATH lookup.
fn resolve_program(work_dir: &Path, program: &str) -> PathBuf {
    let p = Path::new(program);
    if p.is_relative() && p.components().count() > 1 {
        work_dir.join(p)
    } else {
        p.to_path_buf()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argument_template() {
        let enc = Encoder::new(EncoderConfig::default());
        let args = enc.build_args(Path::new("filelist_x.txt"), Path::new("out.mp4"));
        assert_eq!(
            args,
            [
                "-f", "concat", "-safe", "0", "-i", "filelist_x.txt", "-vsync", "vfr", "-s:v",
                "1440x1080", "-c:v", "libx264", "-crf", "17", "-pix_fmt", "yuv420p", "out.mp4",
            ]
        );
    }

    #[test]
    fn configured_values_flow_into_args() {
        let enc = Encoder::new(EncoderConfig {
            resolution: "1920x1080".into(),
            crf: 20,
            ..EncoderConfig::default()
        });
        let args = enc.build_args(Path::new("m.txt"), Path::new("o.mp4"));
        assert!(args.windows(2).any(|w| w == ["-s:v", "1920x1080"]));
        assert!(args.windows(2).any(|w| w == ["-crf", "20"]));
    }

    #[test]
    fn missing_program_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let enc = Encoder::new(EncoderConfig {
            ffmpeg_path: "timelapse-no-such-encoder".into(),
            ..EncoderConfig::default()
        });
        let err = enc
            .run(dir.path(), Path::new("m.txt"), Path::new("o.mp4"))
            .unwrap_err();
        assert!(matches!(err, EncodeError::NotFound { .. }));
        assert!(err.to_string().contains("timelapse-no-such-encoder not found"));
    }

    #[test]
    fn relative_program_paths() {
        let wd = Path::new("/work");
        assert_eq!(resolve_program(wd, "ffmpeg"), PathBuf::from("ffmpeg"));
        assert_eq!(resolve_program(wd, "bin/ffmpeg"), PathBuf::from("/work/bin/ffmpeg"));
        assert_eq!(resolve_program(wd, "/usr/bin/ffmpeg"), PathBuf::from("/usr/bin/ffmpeg"));
    }

    #[cfg(unix)]
    #[test]
    fn nonzero_exit_is_failure() {
        let dir = tempfile::tempdir().unwrap();
        let enc = Encoder::new(EncoderConfig {
            ffmpeg_path: "false".into(),
            ..EncoderConfig::default()
        });
        let err = enc
            .run(dir.path(), Path::new("m.txt"), Path::new("o.mp4"))
            .unwrap_err();
        assert!(matches!(err, EncodeError::Failed { .. }));
    }
}
