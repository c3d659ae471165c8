// vm-sample - Bytecode VM Sample Payload
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use std::hint::black_box;

pub const SPIN_ITERATIONS: u32 = 20_000_000;
pub const SPIN_STEP: f32 = 0.0001;

/// Burns CPU time with `iterations` float additions and returns the number of
/// steps executed. The accumulator is kept opaque to the optimizer and is
/// never handed back to the caller.
pub fn spin(iterations: u32) -> u32 {
    let step = black_box(SPIN_STEP);
    let mut acc = black_box(0.0f32);
    let mut steps = 0;

    for _ in 0..iterations {
        acc = black_box(acc + step);
        steps += 1;
    }

    black_box(acc);
    steps
}
