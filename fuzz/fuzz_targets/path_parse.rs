#![no_main]

use libfuzzer_sys::fuzz_target;
use lwm2m_codec::LwM2mPath;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(path) = text.parse::<LwM2mPath>() {
            // Display must produce text that parses back to the same path
            let again: LwM2mPath = path.to_string().parse().expect("formatted path parses");
            assert_eq!(again, path);
        }
    }
});
