//! Terminal rendition of the completion celebration.

use std::{
    io::{self, Write},
    path::PathBuf,
    process::{Child, Command, Stdio},
};

use anyhow::{anyhow, Context, Result};
use donation_core::{effects::SilentPlayback, CelebrationEffects, ConfettiBurst, PlaybackHandle};
use tracing::{debug, warn};

use crate::config::Settings;

const CONFETTI: [&str; 4] = ["🎉", "✨", "🎊", "💖"];
const BELL: &str = "\x07";

pub struct TerminalCelebration {
    sound_command: Option<String>,
    sound_file: Option<PathBuf>,
}

impl TerminalCelebration {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            sound_command: settings.sound_command.clone(),
            sound_file: settings.sound_file.clone(),
        }
    }

    fn player_argv(&self, template: &str, volume: f32) -> Result<Vec<String>> {
        let percent = (volume.clamp(0.0, 1.0) * 100.0).round() as u32;
        let file = self
            .sound_file
            .as_ref()
            .map(|path| path.display().to_string());

        let argv = template
            .split_whitespace()
            .map(|part| -> Result<String> {
                let part = part.replace("{volume}", &percent.to_string());
                if part.contains("{file}") {
                    let file = file.as_deref().ok_or_else(|| {
                        anyhow!("sound command uses {{file}} but no sound_file is set")
                    })?;
                    Ok(part.replace("{file}", file))
                } else {
                    Ok(part)
                }
            })
            .collect::<Result<Vec<_>>>()?;

        if argv.is_empty() {
            return Err(anyhow!("sound command is empty"));
        }
        Ok(argv)
    }
}

/// One line of confetti, a glyph per ten particles.
pub fn confetti_line(burst: ConfettiBurst) -> String {
    let glyphs = (burst.particle_count / 10).max(1) as usize;
    CONFETTI
        .iter()
        .cycle()
        .take(glyphs)
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}

impl CelebrationEffects for TerminalCelebration {
    fn launch_confetti(&self, burst: ConfettiBurst) -> Result<()> {
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{}", confetti_line(burst))?;
        stdout.flush()?;
        Ok(())
    }

    fn play_clip(&self, volume: f32) -> Result<Box<dyn PlaybackHandle>> {
        let Some(template) = &self.sound_command else {
            let mut stdout = io::stdout().lock();
            stdout.write_all(BELL.as_bytes())?;
            stdout.flush()?;
            return Ok(Box::new(SilentPlayback));
        };

        let argv = self.player_argv(template, volume)?;
        let child = Command::new(&argv[0])
            .args(&argv[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("failed to start sound player '{}'", argv[0]))?;
        debug!(pid = child.id(), player = %argv[0], "celebration: clip started");
        Ok(Box::new(ChildPlayback { child }))
    }
}

struct ChildPlayback {
    child: Child,
}

impl PlaybackHandle for ChildPlayback {
    fn stop(&mut self) {
        match self.child.try_wait() {
            Ok(Some(_)) => return,
            Ok(None) => {
                if let Err(err) = self.child.kill() {
                    warn!("celebration: failed to stop clip: {err}");
                }
            }
            Err(err) => warn!("celebration: failed to poll clip player: {err}"),
        }
        let _ = self.child.wait();
    }

    fn is_playing(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }
}

impl Drop for ChildPlayback {
    fn drop(&mut self) {
        self.stop();
    }
}
