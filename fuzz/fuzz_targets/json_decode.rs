#![no_main]

use libfuzzer_sys::fuzz_target;
use lwm2m_codec::test_utils::test_model;
use lwm2m_codec::{ContentFormat, LwM2mDecoder, LwM2mPath};

fuzz_target!(|data: &[u8]| {
    let model = test_model();
    let decoder = LwM2mDecoder::default();
    let path = LwM2mPath::ObjectInstance(3, 0);
    let _ = decoder.decode(data, Some(ContentFormat::JSON), &path, &model);
    let _ = decoder.decode_timestamped_data(data, Some(ContentFormat::JSON), &path, &model);
});
