#![no_main]
use bson_streaming::{frame, FrameDecoder};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Anything that decodes must encode again, and decode to the same document
    if let Ok(doc) = frame::decode(data) {
        let bytes = frame::encode(&doc).unwrap();
        assert!(frame::decode(&bytes).unwrap().key_eq(&doc));
    }

    // Split the input in two so the decoder sees a frame boundary mid-chunk
    let split = data.first().map_or(0, |b| *b as usize).min(data.len());
    let mut decoder = FrameDecoder::new().with_max_frame_len(1 << 16);
    for chunk in [&data[..split], &data[split..]] {
        decoder.feed(chunk);
        loop {
            match decoder.next_frame() {
                Ok(Some(_)) => continue,
                Ok(None) => break,
                Err(_) => return,
            }
        }
    }
    let _ = decoder.finish();
});
