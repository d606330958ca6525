#![no_main]

use buzzer_client::{BuzzerSession, ServerMessage, SessionConfig};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    // Envelope decoding must reject, never panic.
    let _ = ServerMessage::parse(text);

    // A rejected snapshot must leave the session exactly as it was.
    let mut session = BuzzerSession::new(SessionConfig::new("fuzz", "FUZZ", "Fuzz"));
    let before = session.mirror().clone();
    if session.ingest_json(text).is_err() {
        assert_eq!(session.mirror(), &before);
        assert_eq!(session.phase(), buzzer_client::LifecyclePhase::Idle);
    }
});
