//! Voice response document model
//!
//! A provider-neutral description of what to say and what input to collect
//! next. The TwiML renderer in `infrastructure::twiml` turns it into markup.

use serde::{Deserialize, Serialize};

/// HTTP method the provider uses for a callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CallbackMethod {
    Get,
    Post,
}

impl CallbackMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallbackMethod::Get => "GET",
            CallbackMethod::Post => "POST",
        }
    }
}

/// Spoken text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Say {
    pub text: String,
    pub voice: Option<String>,
}

/// Digit collection with nested prompts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gather {
    pub num_digits: u8,
    pub action: String,
    pub method: CallbackMethod,
    pub timeout_secs: u32,
    pub prompts: Vec<Say>,
}

/// Unconditional jump to another callback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redirect {
    pub url: String,
    pub method: CallbackMethod,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verb {
    Say(Say),
    Gather(Gather),
    Redirect(Redirect),
}

/// Ordered list of verbs executed by the provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceDocument {
    verbs: Vec<Verb>,
}

impl VoiceDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn say(mut self, text: impl Into<String>, voice: Option<&str>) -> Self {
        self.verbs.push(Verb::Say(Say {
            text: text.into(),
            voice: voice.map(str::to_string),
        }));
        self
    }

    pub fn gather(mut self, gather: Gather) -> Self {
        self.verbs.push(Verb::Gather(gather));
        self
    }

    pub fn redirect(mut self, url: impl Into<String>, method: CallbackMethod) -> Self {
        self.verbs.push(Verb::Redirect(Redirect {
            url: url.into(),
            method,
        }));
        self
    }

    pub fn verbs(&self) -> &[Verb] {
        &self.verbs
    }

    /// Target of the trailing redirect, if any
    pub fn redirect_target(&self) -> Option<&str> {
        self.verbs.iter().rev().find_map(|verb| match verb {
            Verb::Redirect(r) => Some(r.url.as_str()),
            _ => None,
        })
    }

    pub fn gather_instruction(&self) -> Option<&Gather> {
        self.verbs.iter().find_map(|verb| match verb {
            Verb::Gather(g) => Some(g),
            _ => None,
        })
    }

    /// Every sentence spoken, including gather prompts, in document order
    pub fn spoken_text(&self) -> Vec<&str> {
        let mut out = Vec::new();
        for verb in &self.verbs {
            match verb {
                Verb::Say(say) => out.push(say.text.as_str()),
                Verb::Gather(gather) => {
                    out.extend(gather.prompts.iter().map(|p| p.text.as_str()))
                }
                Verb::Redirect(_) => {}
            }
        }
        out
    }
}
