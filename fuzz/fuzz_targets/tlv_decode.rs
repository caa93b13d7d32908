#![no_main]

use libfuzzer_sys::fuzz_target;
use lwm2m_codec::test_utils::test_model;
use lwm2m_codec::{ContentFormat, LwM2mDecoder, LwM2mPath};

fuzz_target!(|data: &[u8]| {
    let model = test_model();
    let decoder = LwM2mDecoder::default();
    for path in [
        LwM2mPath::Object(3),
        LwM2mPath::ObjectInstance(3, 0),
        LwM2mPath::Resource(3, 0, 6),
        LwM2mPath::ResourceInstance(3, 0, 6, 0),
        LwM2mPath::Object(10234),
    ] {
        let _ = decoder.decode(data, Some(ContentFormat::TLV), &path, &model);
    }
});
