use std::str::FromStr;

use crate::common::error::CommandError;
use crate::infrastructure::messaging::MenuOption;
use crate::modules::session::Quality;

/// Inbound command, as carried by a menu button's callback data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Compress,
    ExtractAudio,
    ChooseQuality,
    CancelTask,
    SetQuality(Quality),
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let data = s.trim();
        match data {
            "start" | "/start" => Ok(Command::Start),
            "compress" => Ok(Command::Compress),
            "extract_audio" => Ok(Command::ExtractAudio),
            "choose_quality" => Ok(Command::ChooseQuality),
            "cancel_task" => Ok(Command::CancelTask),
            _ => match data.strip_prefix("quality_") {
                Some(quality) => quality.parse().map(Command::SetQuality),
                None => Err(CommandError::Unknown(data.to_string())),
            },
        }
    }
}

pub fn main_menu() -> Vec<MenuOption> {
    vec![
        MenuOption::new("Compress video", "compress"),
        MenuOption::new("Extract audio", "extract_audio"),
        MenuOption::new("Choose quality", "choose_quality"),
        MenuOption::new("Cancel task", "cancel_task"),
    ]
}

pub fn quality_menu() -> Vec<MenuOption> {
    Quality::ALL
        .into_iter()
        .map(|q| MenuOption::new(q.as_str(), format!("quality_{q}")))
        .collect()
}
