//! Instruction text sent to the model

/// Combined call: transcribe, reply, and answer in JSON only
pub const COMBINED_INSTRUCTION: &str = "Please do the following:
1. Transcribe the audio to text
2. Provide a helpful and conversational response to what was said
3. Format your response as JSON with two fields: \"transcription\" (what the user said) and \"response\" (your reply)

Keep the response concise since it will be read aloud. Be friendly and helpful.

Return ONLY the JSON, no other text.";

/// First fallback call: plain transcription
pub const TRANSCRIBE_ONLY_INSTRUCTION: &str =
    "What did the person say in this audio? Reply with just the transcription.";

/// Second fallback call: reply to an already transcribed utterance
#[must_use]
pub fn respond_to(transcription: &str) -> String {
    format!(
        "The user said: \"{transcription}\". Provide a helpful, concise response (1-2 sentences max) since it will be read aloud."
    )
}
