//! Interfaces of the collaborators this crate consumes but does not own.

use studystate_codec::{FlashCard, StudySettings};

/// A voice offered by the speech engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Voice {
    pub name: String,
    pub display_name: String,
    pub locale: String,
    /// Engine-defined quality score; higher is better.
    pub quality: u32,
}

/// Text-to-speech output.
pub trait SpeechOutput: Send + Sync {
    fn speak(&self, text: &str);

    /// `None` selects the engine's default voice.
    fn set_voice(&self, name: Option<&str>);

    fn set_rate(&self, rate: f32);

    fn voices(&self) -> Vec<Voice>;
}

/// The built-in, read-only card set.
pub trait CardCatalog: Send + Sync {
    fn cards(&self) -> Vec<FlashCard>;
}

/// Push a settings record's voice and rate to the speech engine.
///
/// A stored voice the engine no longer offers falls back to the default.
pub fn apply_speech_settings(output: &dyn SpeechOutput, settings: &StudySettings) {
    let voice = settings
        .voice_name
        .as_deref()
        .filter(|name| output.voices().iter().any(|voice| voice.name == *name));
    if voice.is_none() && settings.voice_name.is_some() {
        tracing::debug!(voice = ?settings.voice_name, "stored voice unavailable, using default");
    }
    output.set_voice(voice);
    output.set_rate(studystate_codec::clamp_speech_rate(settings.speech_rate));
}

/// The text to speak for `card` under `settings`.
pub fn speech_text<'a>(card: &'a FlashCard, settings: &StudySettings) -> &'a str {
    if settings.speak_meaning {
        &card.meaning
    } else {
        &card.term
    }
}
