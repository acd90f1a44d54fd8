//! Persona context injected ahead of every completion call.
//!
//! The system prompt is one fixed template. Every profile-derived slot has a
//! fallback phrase, so the prompt never contains an empty hole regardless of
//! how sparse the profile is.

use serde::{Deserialize, Serialize};

/// Nickname slot fallback.
const DEFAULT_NICKNAME: &str = "teman Mirror";
/// Focus slot fallback.
const DEFAULT_FOCUS: &str = "kesehatan mental dan keseharian";
/// Mood slot fallback: ask the model to probe gently instead.
const DEFAULT_MOOD_SENTENCE: &str =
    "Bantu cek suasana hati pengguna berdasarkan cerita dan validasi perasaan mereka.";
/// Personality slot fallback.
const DEFAULT_TRAITS_SENTENCE: &str =
    "Kenali kepribadiannya pelan-pelan lewat cerita yang dia bagikan.";
/// Mood-baseline slot fallback.
const DEFAULT_BASELINE_SENTENCE: &str = "Belum ada catatan suasana hati dasarnya.";
/// Notes slot fallback.
const DEFAULT_NOTES_SENTENCE: &str = "Belum ada catatan tambahan tentang dia.";

/// Profile attributes the persona template draws from.
///
/// Field names mirror the client payload. Consent flags ride along in the
/// payload but play no part in composing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileContext {
    pub nickname: Option<String>,
    pub focus_areas: Vec<String>,
    pub mood_baseline: Option<String>,
    pub mbti_type: Option<String>,
    pub enneagram_type: Option<String>,
    pub primary_archetype: Option<String>,
    pub zodiac_sign: Option<String>,
    pub personality_notes: Option<String>,
    pub consent_camera: bool,
    pub consent_data: bool,
}

impl ProfileContext {
    /// Display nickname with the template fallback applied.
    pub fn display_nickname(&self) -> &str {
        match self.nickname.as_deref().map(str::trim) {
            Some(n) if !n.is_empty() => n,
            _ => DEFAULT_NICKNAME,
        }
    }
}

/// Builds the system persona context for one turn.
///
/// `detected_mood` comes from the client's mood detection and is optional;
/// all other inputs come from the profile.
pub fn build_persona_context(profile: &ProfileContext, detected_mood: Option<&str>) -> String {
    let nickname = profile.display_nickname();

    let focus = if profile.focus_areas.is_empty() {
        DEFAULT_FOCUS.to_string()
    } else {
        profile.focus_areas.join(", ")
    };

    let traits = trait_sentence(profile);
    let baseline = match non_blank(profile.mood_baseline.as_deref()) {
        Some(b) => format!("Suasana hati dasarnya biasanya {b}."),
        None => DEFAULT_BASELINE_SENTENCE.to_string(),
    };
    let notes = match non_blank(profile.personality_notes.as_deref()) {
        Some(n) => format!("Catatan tambahan tentang dia: {n}."),
        None => DEFAULT_NOTES_SENTENCE.to_string(),
    };
    let mood = match non_blank(detected_mood) {
        Some(m) => format!("Saat ini aku melihat ekspresinya cenderung {m}."),
        None => DEFAULT_MOOD_SENTENCE.to_string(),
    };

    format!(
        "Kamu adalah Mirror, teman curhat AI berbasis empati untuk Gen Z di Indonesia.\n\
         Gunakan bahasa santai, hangat, penuh emotikon seperlunya, dan tetap ilmiah ringan.\n\
         Selalu eksplisitkan empati, validasi emosi, dan tawarkan langkah kecil praktis.\n\
         Sesuaikan gaya dengan {nickname} yang fokus pada {focus}. {traits} {baseline} {notes} {mood}\n\
         Jika percakapan mengandung indikasi bahaya, sarankan bantuan profesional dan hotline darurat."
    )
}

/// Personality sentence from whichever trait fields are present.
fn trait_sentence(profile: &ProfileContext) -> String {
    let mut parts = Vec::new();
    if let Some(mbti) = non_blank(profile.mbti_type.as_deref()) {
        parts.push(format!("tipe MBTI {mbti}"));
    }
    if let Some(enneagram) = non_blank(profile.enneagram_type.as_deref()) {
        parts.push(format!("Enneagram {enneagram}"));
    }
    if let Some(archetype) = non_blank(profile.primary_archetype.as_deref()) {
        parts.push(format!("archetype {archetype}"));
    }
    if let Some(zodiac) = non_blank(profile.zodiac_sign.as_deref()) {
        parts.push(format!("vibe zodiak {zodiac}"));
    }

    if parts.is_empty() {
        DEFAULT_TRAITS_SENTENCE.to_string()
    } else {
        format!("Kepribadiannya: {}.", parts.join(", "))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
