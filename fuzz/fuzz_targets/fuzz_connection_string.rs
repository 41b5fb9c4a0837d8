#![no_main]

use amqp_bind::ConnectionInfo;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(info) = ConnectionInfo::parse(s) {
        assert!(!info.host.is_empty());
        assert_ne!(info.port, 0);

        let config = info.to_config();
        // Auth is on only when both halves of the credential are present
        assert_eq!(
            config.use_auth(),
            !config.key_name.is_empty() && !config.key.is_empty()
        );
    }
});
