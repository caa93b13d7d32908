#![no_main]

use libfuzzer_sys::fuzz_target;
use lwm2m_codec::test_utils::test_model;
use lwm2m_codec::{ContentFormat, LwM2mDecoder, LwM2mPath};

fuzz_target!(|data: &[u8]| {
    let model = test_model();
    let decoder = LwM2mDecoder::default();
    for format in [ContentFormat::SENML_JSON, ContentFormat::SENML_CBOR] {
        let _ = decoder.decode(data, Some(format), &LwM2mPath::ObjectInstance(3, 0), &model);
        let _ = decoder.decode_nodes(data, Some(format), None, &model);
        let _ = decoder.decode_timestamped_nodes(data, Some(format), &model);
        let _ = decoder.decode_paths(data, Some(format));
    }
});
