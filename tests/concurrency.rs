//! Cross-thread publication tests.
//!
//! A control thread publishes while an audio-side thread reads, the way the
//! UI and device callback share the voice.

use ringbuf::traits::{Consumer, Producer};
use sq_engine::{EngineConfig, EnvelopeLut, PingPong, VoiceRenderer, LUT_SIZE};
use sq_ir::{AudioBuffer, ChannelId, EnvelopeTarget, NoteEvent};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;

const ROUNDS: u32 = 2_000;

/// Once the reader sees a flip it must see that whole table, never a mix.
#[test]
fn observed_flip_shows_complete_table() {
    let table = Arc::new(PingPong::<LUT_SIZE>::new(0.0));
    let published = Arc::new(AtomicU32::new(0));
    let acked = Arc::new(AtomicU32::new(0));

    let writer = {
        let table = Arc::clone(&table);
        let published = Arc::clone(&published);
        let acked = Arc::clone(&acked);
        thread::spawn(move || {
            for k in 1..=ROUNDS {
                table.publish(|_| k as f32);
                published.store(k, Ordering::Release);
                // One bake in flight at a time: wait for the reader to see it.
                while acked.load(Ordering::Acquire) < k {
                    thread::yield_now();
                }
            }
        })
    };

    let mut last = 0u32;
    while last < ROUNDS {
        let floor = published.load(Ordering::Acquire);
        let view = table.active();
        let first = view.get(0);
        for i in 1..view.len() {
            assert_eq!(view.get(i), first, "mixed table at index {}", i);
        }
        let seen = first as u32;
        assert!(seen >= floor, "saw {} after {} was published", seen, floor);
        assert!(seen >= last, "went back from {} to {}", last, seen);
        last = seen;
        acked.store(seen, Ordering::Release);
    }

    writer.join().unwrap();
}

#[test]
fn envelope_bakes_are_uniform_to_the_reader() {
    let lut = Arc::new(EnvelopeLut::new(1.0));
    let done = Arc::new(AtomicBool::new(false));
    let acked = Arc::new(AtomicU32::new(0));

    let writer = {
        let lut = Arc::clone(&lut);
        let done = Arc::clone(&done);
        let acked = Arc::clone(&acked);
        thread::spawn(move || {
            for k in 1..=500u32 {
                let value = if k % 2 == 0 { 0.25 } else { 0.75 };
                lut.bake(&[value; 32]);
                while acked.load(Ordering::Acquire) < k {
                    thread::yield_now();
                }
            }
            done.store(true, Ordering::Release);
        })
    };

    let mut rounds = 0u32;
    let mut last_index = lut.active_index();
    while !done.load(Ordering::Acquire) {
        let index = lut.active_index();
        let view = lut.active_lut();
        let mut values = vec![0.0f32; LUT_SIZE];
        view.copy_to(&mut values);
        assert!(values.iter().all(|&v| v == values[0]), "non-uniform view");
        assert!([1.0, 0.25, 0.75].contains(&values[0]));
        if index != last_index {
            rounds += 1;
            last_index = index;
            acked.store(rounds, Ordering::Release);
        }
    }

    writer.join().unwrap();
    assert_eq!(rounds, 500);
}

/// With no handshake at all, a snapshot that reports itself whole is never
/// a mix of two publishes.
#[test]
fn whole_snapshots_survive_back_to_back_publishes() {
    let table = Arc::new(PingPong::<LUT_SIZE>::new(0.0));
    let stop = Arc::new(AtomicBool::new(false));

    let writer = {
        let table = Arc::clone(&table);
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let mut k = 0u32;
            while !stop.load(Ordering::Acquire) {
                k += 1;
                table.publish(|_| k as f32);
            }
            k
        })
    };

    let mut out = vec![0.0f32; LUT_SIZE];
    for _ in 0..20_000 {
        if table.snapshot(&mut out) {
            assert!(out.iter().all(|&v| v == out[0]), "whole snapshot was mixed");
        }
    }
    stop.store(true, Ordering::Release);
    let last = writer.join().unwrap();

    assert!(table.snapshot(&mut out));
    assert!(out.iter().all(|&v| v == last as f32));
}

/// Render on one thread while another hammers every control value.
#[test]
fn renderer_tolerates_concurrent_control() {
    let config = EngineConfig::default().with_max_block_size(256);
    let (mut renderer, mut ctl) = VoiceRenderer::new(config);
    let shared = Arc::clone(&ctl.shared);
    let stop = Arc::new(AtomicBool::new(false));

    let audio = {
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let mut buffer = AudioBuffer::new(2, 256);
            let mut blocks = 0u32;
            while !stop.load(Ordering::Acquire) {
                buffer.channel_mut(0).fill(0.2);
                buffer.channel_mut(1).fill(0.2);
                renderer.render_block(&mut buffer);
                for ch in 0..2 {
                    assert!(buffer.channel(ch).iter().all(|s| s.is_finite() && s.abs() <= 3.0));
                }
                blocks += 1;
            }
            blocks
        })
    };

    let mut scope = vec![0.0f32; 1024];
    for n in 0..2_000u32 {
        if n % 50 == 0 {
            let _ = ctl.notes.try_push(NoteEvent::note_on(40 + (n / 50 % 30) as u8));
        }
        let value = (n % 10) as f32 * 0.2;
        shared.lut(EnvelopeTarget::Amplitude).bake(&[value, 1.0 - value * 0.5]);
        shared.lut(EnvelopeTarget::Pitch).bake(&[100.0 + n as f32]);
        shared.set_pitch_override(n % 3 == 0);
        shared.set_gain_db(-((n % 24) as f32));
        let channel = ChannelId::ALL[(n % 3) as usize];
        shared.channels().set_mute(channel, n % 4 == 0);
        shared.channels().set_solo(channel, n % 6 == 0);
        let _ = shared.channels().peak_db(ChannelId::Oomph);
        ctl.scope.pop_slice(&mut scope);
        if n % 100 == 0 {
            thread::sleep(std::time::Duration::from_millis(1));
        }
    }

    stop.store(true, Ordering::Release);
    let blocks = audio.join().unwrap();
    assert!(blocks > 0);
}
