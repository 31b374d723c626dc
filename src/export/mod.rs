//! Hand-off of a finished prompt to external chat services.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportTarget {
    ChatGpt,
    Poe,
    DeepSeek,
    Claude,
    Gemini,
}

impl ExportTarget {
    pub const ALL: [ExportTarget; 5] = [
        ExportTarget::ChatGpt,
        ExportTarget::Poe,
        ExportTarget::DeepSeek,
        ExportTarget::Claude,
        ExportTarget::Gemini,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ExportTarget::ChatGpt => "ChatGPT",
            ExportTarget::Poe => "Poe",
            ExportTarget::DeepSeek => "DeepSeek",
            ExportTarget::Claude => "Claude",
            ExportTarget::Gemini => "Gemini",
        }
    }

    fn landing_page(&self) -> &'static str {
        match self {
            ExportTarget::ChatGpt => "https://chat.openai.com/",
            ExportTarget::Poe => "https://poe.com/",
            ExportTarget::DeepSeek => "https://chat.deepseek.com/",
            ExportTarget::Claude => "https://claude.ai/",
            ExportTarget::Gemini => "https://gemini.google.com/",
        }
    }

    /// Whether the service can be opened with the prompt pre-filled
    pub fn accepts_prompt(&self) -> bool {
        matches!(self, ExportTarget::ChatGpt)
    }
}

impl fmt::Display for ExportTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ExportTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "chatgpt" | "openai" => Ok(ExportTarget::ChatGpt),
            "poe" => Ok(ExportTarget::Poe),
            "deepseek" => Ok(ExportTarget::DeepSeek),
            "claude" => Ok(ExportTarget::Claude),
            "gemini" | "bard" => Ok(ExportTarget::Gemini),
            other => Err(format!(
                "Unknown export target '{}' (expected one of: chatgpt, poe, deepseek, claude, gemini)",
                other
            )),
        }
    }
}

/// URL that opens `target`; services that take a query get the prompt attached
pub fn export_url(target: ExportTarget, prompt: &str) -> String {
    if target.accepts_prompt() {
        if let Ok(url) = reqwest::Url::parse_with_params(target.landing_page(), &[("prompt", prompt)]) {
            return url.to_string();
        }
    }
    target.landing_page().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chatgpt_url_encodes_prompt() {
        let url = export_url(ExportTarget::ChatGpt, "Write a poem & rhyme");
        assert_eq!(
            url,
            "https://chat.openai.com/?prompt=Write+a+poem+%26+rhyme"
        );
    }

    #[test]
    fn test_other_targets_open_landing_page() {
        assert_eq!(export_url(ExportTarget::Claude, "ignored"), "https://claude.ai/");
        assert_eq!(export_url(ExportTarget::Poe, "x"), "https://poe.com/");
        assert_eq!(
            export_url(ExportTarget::DeepSeek, "x"),
            "https://chat.deepseek.com/"
        );
    }

    #[test]
    fn test_parse_target() {
        assert_eq!("ChatGPT".parse::<ExportTarget>(), Ok(ExportTarget::ChatGpt));
        assert_eq!("bard".parse::<ExportTarget>(), Ok(ExportTarget::Gemini));
        assert!("myspace".parse::<ExportTarget>().is_err());
    }

    #[test]
    fn test_all_targets_have_https_urls() {
        for target in ExportTarget::ALL {
            assert!(export_url(target, "p").starts_with("https://"));
        }
    }
}
