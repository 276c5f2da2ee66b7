use criterion::{Criterion, black_box, criterion_group, criterion_main};
use hls_proxy::hls::rewrite_manifest;
use hls_proxy::url_codec::ProxyUrlCodec;
use std::fmt::Write;
use url::Url;

/// VOD media playlist with a key rotation every 50 segments.
fn media_playlist(segments: usize) -> String {
    let mut playlist = String::from("#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-TARGETDURATION:4\n");
    for i in 0..segments {
        if i % 50 == 0 {
            let _ = writeln!(playlist, "#EXT-X-KEY:METHOD=AES-128,URI=\"keys/{i}.key\"");
        }
        let _ = writeln!(playlist, "#EXTINF:4.000,\nsegment{i:05}.ts");
    }
    playlist.push_str("#EXT-X-ENDLIST\n");
    playlist
}

fn bench_rewrite(c: &mut Criterion) {
    let codec = ProxyUrlCodec::default();
    let origin = Url::parse("https://cdn.example.com/vod/movie/720p/index.m3u8").unwrap();

    for segments in [100, 1_000] {
        let playlist = media_playlist(segments);
        c.bench_function(&format!("rewrite_manifest/{segments}_segments"), |b| {
            b.iter(|| rewrite_manifest(black_box(playlist.as_bytes()), &origin, &codec).unwrap())
        });
    }

    let absolute = media_playlist(1_000).replace("segment", "https://other.example.com/segment");
    c.bench_function("rewrite_manifest/1000_absolute_segments", |b| {
        b.iter(|| rewrite_manifest(black_box(absolute.as_bytes()), &origin, &codec).unwrap())
    });
}

criterion_group!(benches, bench_rewrite);
criterion_main!(benches);
