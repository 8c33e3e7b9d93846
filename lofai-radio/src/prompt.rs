//! Prompt builder and generation preference
//!
//! Maps a (mood, instrument) pair onto a MusicGen prompt. Pairs missing from
//! the template table never fail: they degrade to the default
//! `(neutral, guitar)` template, instrument included.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tokio::sync::RwLock;

/// Mood used when the requested one is unknown
pub const DEFAULT_MOOD: Mood = Mood::Neutral;

/// Instrument used when the requested one is unknown
pub const DEFAULT_INSTRUMENT: Instrument = Instrument::Guitar;

const INSTRUMENT_PLACEHOLDER: &str = "{instrument}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Somber,
    Neutral,
    Lively,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Instrument {
    Piano,
    Guitar,
    Brass,
}

impl Mood {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Somber => "somber",
            Mood::Neutral => "neutral",
            Mood::Lively => "lively",
        }
    }
}

impl Instrument {
    pub fn as_str(&self) -> &'static str {
        match self {
            Instrument::Piano => "piano",
            Instrument::Guitar => "guitar",
            Instrument::Brass => "brass",
        }
    }
}

impl FromStr for Mood {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "somber" => Ok(Mood::Somber),
            "neutral" => Ok(Mood::Neutral),
            "lively" => Ok(Mood::Lively),
            other => Err(format!("unknown mood: {}", other)),
        }
    }
}

impl FromStr for Instrument {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "piano" => Ok(Instrument::Piano),
            "guitar" => Ok(Instrument::Guitar),
            "brass" => Ok(Instrument::Brass),
            other => Err(format!("unknown instrument: {}", other)),
        }
    }
}

/// Template text for a known pair; `{instrument}` is substituted later
fn template(mood: Mood, instrument: Instrument) -> &'static str {
    match (mood, instrument) {
        (Mood::Somber, Instrument::Piano) => "Create a melancholic lo-fi beat with gentle, somber {instrument} melodies that evoke a contemplative and introspective atmosphere. The track should feature soft percussion and ambient background elements, with the {instrument} taking center stage. Ensure there are no background noises or interruptions, maintaining a continuous and seamless flow throughout the track. The track must have a clear ending: conclude with a definitive gentle fade-out over the final 2 seconds, or end with a soft final {instrument} chord that resolves peacefully. The beat should be deeply relaxing and tranquil, perfect for a reflective and pensive mood.",
        (Mood::Somber, Instrument::Guitar) => "Create an earthy lo-fi beat that evokes a melancholic, grounded atmosphere with gentle {instrument} as the focal point. Incorporate soft percussion, subtle rustling ambient sounds, and mellow acoustic tones to create a somber, reflective mood. The {instrument} should have a warm, introspective quality with gentle strumming or fingerpicking. The track should have a continuous flow with no background noise or interruptions. The track must have a clear ending: conclude with a definitive gentle fade-out over the final 2 seconds, or end with a soft final {instrument} chord that brings closure, maintaining a calm and contemplative ambiance throughout.",
        (Mood::Somber, Instrument::Brass) => "Create a soothing lo-fi beat featuring gentle, melancholic {instrument} tones. The {instrument} should provide a somber, jazzy atmosphere with warm, muted tones that evoke nostalgia and introspection. Support it with subtle, ambient electronic elements and a smooth, relaxed rhythm. Ensure the track is continuous with no background noise or interruptions. The track must have a clear ending: conclude with a definitive gentle fade-out over the final 2 seconds, or end with a soft {instrument} phrase that resolves smoothly, maintaining a reflective and contemplative atmosphere throughout.",
        (Mood::Neutral, Instrument::Piano) => "Create a gentle lo-fi beat with a smooth, mellow {instrument} melody in the background. The {instrument} should have a warm, comforting tone that creates a peaceful atmosphere. Ensure there are no background noises or interruptions, maintaining a continuous and seamless flow throughout the track. The track must have a clear ending: conclude with a definitive gentle fade-out over the final 2 seconds, or end with a soft {instrument} chord that brings peaceful resolution. The beat should be relaxing and tranquil, perfect for a calm and reflective atmosphere.",
        (Mood::Neutral, Instrument::Guitar) => "Create a soothing lo-fi beat featuring gentle, melodic {instrument} riffs. The {instrument} should be the focal point, supported by subtle, ambient electronic elements and a smooth, relaxed rhythm. Ensure the track is continuous with no background noise or interruptions. The track must have a clear ending: conclude with a definitive gentle fade-out over the final 2 seconds, or end with a soft final {instrument} chord that provides closure, maintaining a warm and mellow atmosphere throughout.",
        (Mood::Neutral, Instrument::Brass) => "Create an ambient lo-fi beat with tranquil {instrument} tones creating an ethereal atmosphere. Use soft, atmospheric pads alongside warm {instrument} melodies, gentle rhythms, and minimalistic percussion to evoke a sense of calm and serenity. Ensure the track is continuous with no background noise or interruptions. The track must have a clear ending: conclude with a definitive gentle fade-out over the final 2 seconds, or end with a soft {instrument} note that resolves peacefully, maintaining a soothing and immersive ambiance throughout.",
        (Mood::Lively, Instrument::Piano) => "Create a futuristic lo-fi beat that blends modern electronic elements with uplifting {instrument} melodies. Incorporate bright, energetic {instrument} tones and lively, rhythmic beats to evoke a sense of optimism and vibrant energy. Ensure the track is continuous with no background noise or interruptions. The track must have a clear ending: conclude with a definitive upbeat fade-out over the final 2 seconds, or end with an energetic final {instrument} flourish or chord progression that brings the track to a satisfying close, maintaining an upbeat and positive atmosphere throughout while adding a touch of contemporary flair.",
        (Mood::Lively, Instrument::Guitar) => "Create a lively lo-fi beat featuring upbeat {instrument} riffs that energize and uplift. The {instrument} should be bright and cheerful, with rhythmic strumming supported by bouncy electronic elements. Ensure there are no background noises or interruptions, maintaining a continuous and seamless flow throughout the track. The track must have a clear ending: conclude with a definitive upbeat fade-out over the final 2 seconds, or end with a bright final {instrument} chord or strum that brings energetic closure. The beat should be vibrant and positive, perfect for an energetic and motivating atmosphere.",
        (Mood::Lively, Instrument::Brass) => "Create an energetic lo-fi beat with lively {instrument} sections that bring a jazzy, upbeat atmosphere. The {instrument} should provide bright, bold tones with bouncy rhythms and syncopated patterns. Support it with dynamic percussion and uplifting electronic elements. Ensure the track is continuous with no background noise or interruptions. The track must have a clear ending: conclude with a definitive upbeat fade-out over the final 2 seconds, or end with a bright {instrument} phrase or jazzy flourish that brings the track to a satisfying conclusion, maintaining a cheerful and vibrant mood throughout.",
    }
}

/// Resolve a raw (mood, instrument) pair to a registered one
///
/// If either half is unknown the whole pair falls back to the default.
pub fn resolve_pair(mood: &str, instrument: &str) -> (Mood, Instrument) {
    match (mood.parse::<Mood>(), instrument.parse::<Instrument>()) {
        (Ok(mood), Ok(instrument)) => (mood, instrument),
        _ => (DEFAULT_MOOD, DEFAULT_INSTRUMENT),
    }
}

/// Build the synthesis prompt for a (mood, instrument) pair
pub fn build_prompt(mood: &str, instrument: &str) -> String {
    let (mood, instrument) = resolve_pair(mood, instrument);
    template(mood, instrument).replace(INSTRUMENT_PLACEHOLDER, instrument.as_str())
}

/// Current generation preference (last write wins)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub mood: String,
    pub instrument: String,
}

impl GenerationRequest {
    pub fn new(mood: impl Into<String>, instrument: impl Into<String>) -> Self {
        Self {
            mood: mood.into(),
            instrument: instrument.into(),
        }
    }

    pub fn prompt(&self) -> String {
        build_prompt(&self.mood, &self.instrument)
    }
}

impl Default for GenerationRequest {
    fn default() -> Self {
        Self::new(DEFAULT_MOOD.as_str(), DEFAULT_INSTRUMENT.as_str())
    }
}

/// Shared holder for the current `GenerationRequest`
#[derive(Debug, Default)]
pub struct PreferenceStore {
    current: RwLock<GenerationRequest>,
}

impl PreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the preference
    pub async fn update(&self, request: GenerationRequest) {
        *self.current.write().await = request;
    }

    /// Copy of the current preference
    pub async fn current(&self) -> GenerationRequest {
        self.current.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NEUTRAL_GUITAR: &str = "Create a soothing lo-fi beat featuring gentle, melodic guitar riffs. The guitar should be the focal point, supported by subtle, ambient electronic elements and a smooth, relaxed rhythm. Ensure the track is continuous with no background noise or interruptions. The track must have a clear ending: conclude with a definitive gentle fade-out over the final 2 seconds, or end with a soft final guitar chord that provides closure, maintaining a warm and mellow atmosphere throughout.";

    #[test]
    fn test_default_pair_builds_base_prompt() {
        assert_eq!(build_prompt("neutral", "guitar"), NEUTRAL_GUITAR);
        assert_eq!(GenerationRequest::default().prompt(), NEUTRAL_GUITAR);
    }

    #[test]
    fn test_unknown_pair_falls_back_to_default() {
        assert_eq!(build_prompt("angry", "kazoo"), NEUTRAL_GUITAR);
    }

    #[test]
    fn test_half_known_pair_falls_back_to_default() {
        assert_eq!(build_prompt("lively", "kazoo"), NEUTRAL_GUITAR);
        assert_eq!(build_prompt("angry", "piano"), NEUTRAL_GUITAR);
        assert_eq!(build_prompt("", ""), NEUTRAL_GUITAR);
    }

    #[test]
    fn test_instrument_is_interpolated() {
        let prompt = build_prompt("somber", "brass");
        assert!(prompt.contains("melancholic brass tones"));
        assert!(!prompt.contains(INSTRUMENT_PLACEHOLDER));
    }

    #[test]
    fn test_every_template_has_continuity_and_ending() {
        for mood in [Mood::Somber, Mood::Neutral, Mood::Lively] {
            for instrument in [Instrument::Piano, Instrument::Guitar, Instrument::Brass] {
                let prompt = build_prompt(mood.as_str(), instrument.as_str());
                assert!(prompt.contains("interruptions"), "{:?}/{:?}", mood, instrument);
                assert!(prompt.contains("clear ending"), "{:?}/{:?}", mood, instrument);
                assert!(prompt.contains(instrument.as_str()));
                assert!(!prompt.contains(INSTRUMENT_PLACEHOLDER));
            }
        }
    }

    #[test]
    fn test_lookup_is_exact() {
        // Keys are matched verbatim: no case folding, no trimming
        assert_eq!(build_prompt("LIVELY", "PIANO"), NEUTRAL_GUITAR);
        assert_eq!(build_prompt(" lively ", "piano"), NEUTRAL_GUITAR);
        assert_eq!(build_prompt("lively", "Piano"), NEUTRAL_GUITAR);
        assert_ne!(build_prompt("lively", "piano"), NEUTRAL_GUITAR);
    }

    #[tokio::test]
    async fn test_preference_store_last_write_wins() {
        let store = PreferenceStore::new();
        assert_eq!(store.current().await, GenerationRequest::default());

        store.update(GenerationRequest::new("somber", "piano")).await;
        store.update(GenerationRequest::new("lively", "brass")).await;

        assert_eq!(store.current().await, GenerationRequest::new("lively", "brass"));
    }
}
