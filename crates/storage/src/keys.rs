//! Keys for objects produced after upload. Everything belonging to a
//! video lives under `<owner_id>/<share_token>/`.

use screenreel_core::types::DbId;

fn prefix(owner_id: DbId, share_token: &str) -> String {
    format!("{owner_id}/{share_token}")
}

/// WebVTT transcript.
pub fn transcript_key(owner_id: DbId, share_token: &str) -> String {
    format!("{}/transcript.vtt", prefix(owner_id, share_token))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcript_sits_beside_the_recording() {
        assert_eq!(transcript_key(7, "tok"), "7/tok/transcript.vtt");
    }
}
