// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the identifier codec. Tokens are produced for
// every printed ticket and decoded for every scan, so both directions are
// measured on a realistic UUID.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use ticketwerk_core::TicketKind;
use ticketwerk_core::codec::{detag_and_decode, tag_and_encode};

const BUNDLE_ID: &str = "bb5f93d3-7489-42fc-a721-be6bdd1780a4";

fn bench_encode(c: &mut Criterion) {
    c.bench_function("tag_and_encode (uuid)", |b| {
        b.iter(|| black_box(tag_and_encode(TicketKind::Bundle, black_box(BUNDLE_ID))));
    });
}

fn bench_decode(c: &mut Criterion) {
    let token = tag_and_encode(TicketKind::Bundle, BUNDLE_ID);

    c.bench_function("detag_and_decode (uuid)", |b| {
        b.iter(|| black_box(detag_and_decode(black_box(token.as_str()))));
    });

    // URL payloads take the compatibility branch before the tagged format.
    c.bench_function("detag_and_decode (legacy url)", |b| {
        b.iter(|| black_box(detag_and_decode(black_box("https://tickets.example/i/abc123/"))));
    });
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
