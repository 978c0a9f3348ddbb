//! TwiML rendering for voice documents

use crate::domain::voice_document::{Gather, Redirect, Say, Verb, VoiceDocument};
use std::fmt::Write;

pub const CONTENT_TYPE: &str = "text/xml";

const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Render a document as a TwiML `<Response>`
pub fn render(document: &VoiceDocument) -> String {
    let mut out = String::with_capacity(256);
    out.push_str(XML_DECL);
    out.push_str("<Response>");
    for verb in document.verbs() {
        match verb {
            Verb::Say(say) => write_say(&mut out, say),
            Verb::Gather(gather) => write_gather(&mut out, gather),
            Verb::Redirect(redirect) => write_redirect(&mut out, redirect),
        }
    }
    out.push_str("</Response>");
    out
}

fn write_say(out: &mut String, say: &Say) {
    match &say.voice {
        Some(voice) => {
            let _ = write!(out, r#"<Say voice="{}">"#, escape(voice));
        }
        None => out.push_str("<Say>"),
    }
    out.push_str(&escape(&say.text));
    out.push_str("</Say>");
}

fn write_gather(out: &mut String, gather: &Gather) {
    let _ = write!(
        out,
        r#"<Gather numDigits="{}" action="{}" method="{}" timeout="{}">"#,
        gather.num_digits,
        escape(&gather.action),
        gather.method.as_str(),
        gather.timeout_secs
    );
    for prompt in &gather.prompts {
        write_say(out, prompt);
    }
    out.push_str("</Gather>");
}

fn write_redirect(out: &mut String, redirect: &Redirect) {
    let _ = write!(
        out,
        r#"<Redirect method="{}">{}</Redirect>"#,
        redirect.method.as_str(),
        escape(&redirect.url)
    );
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
