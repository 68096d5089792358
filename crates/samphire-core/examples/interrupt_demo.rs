//! Timed interrupt emission against a simulated skewed stream
//!
//! Run with: cargo run --example interrupt_demo -p samphire-core
//!
//! Simulates a 48 kHz source whose clock runs 200 ppm fast relative to the
//! host, with a little scheduling jitter on every pass, then requests one
//! wall-clock interrupt and one sample-index interrupt.

use samphire_core::prelude::*;

fn main() {
    let nominal_rate = 48_000.0;
    let true_rate = nominal_rate * 1.0002; // source clock 200 ppm fast
    let batch = 4800u64;
    let jitter_ms = [0.7, -0.3, 0.2, -0.6, 0.4];

    let mut emitter = InterruptEmitter::new(nominal_rate, false, 0.05).unwrap();

    println!("nominal rate {} Hz, true source rate {} Hz\n", nominal_rate, true_rate);

    for pass in 0..40u64 {
        let first = pass * batch;
        let last = first + batch - 1;
        // The host observes each pass a moment after its last sample, with
        // jitter on top.
        let now =
            (last + 1) as f64 / true_rate + 1.5e-3 + 1e-3 * jitter_ms[(pass % 5) as usize];

        // The stream start carries the reference tag: sample 0 at t = 0.
        let tag = (pass == 0).then(|| TimeTag::discontinuous(0, 0, 0.0));

        if pass == 10 {
            println!("pass {:2}: requesting interrupt at t = 1.3 s", pass);
            emitter.request(TriggerRequest::at_seconds(1.3));
        }
        if pass == 25 {
            println!("pass {:2}: requesting interrupt at sample 150000", pass);
            emitter.request(TriggerRequest::at_sample(150_000));
        }

        if let Some(fired) = emitter.work(first, batch as usize, tag.as_ref(), now) {
            println!(
                "pass {:2}: fired at sample {:6} late_delta {:+.6} s for {:?}",
                pass, fired.trigger_sample, fired.late_delta, fired.trigger_time
            );
        }
    }

    let tb = emitter.timebase();
    println!("\nrate correction: {:.6}", tb.rate_correction());
    println!("effective rate:  {:.1} Hz (true {:.1} Hz)", tb.effective_rate(), true_rate);
}
