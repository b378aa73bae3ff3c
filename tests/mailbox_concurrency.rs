use gisting::ResultChannel;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
fn consumer_sees_strictly_increasing_values_ending_with_last() {
    const LAST: u64 = 50_000;
    let channel = Arc::new(ResultChannel::new());

    let producer = {
        let channel = channel.clone();
        thread::spawn(move || {
            for value in 1..=LAST {
                assert!(channel.put(value));
                if value % 1000 == 0 {
                    thread::yield_now();
                }
            }
            channel.close();
        })
    };

    let mut seen = Vec::new();
    loop {
        match channel.try_take(Duration::from_millis(50)) {
            Some(value) => seen.push(value),
            None if channel.is_closed() => {
                // Closing keeps an unread value available
                if let Some(value) = channel.take() {
                    seen.push(value);
                }
                break;
            }
            None => {}
        }
    }
    producer.join().unwrap();

    assert!(!seen.is_empty());
    assert!(seen.windows(2).all(|w| w[0] < w[1]), "values went backwards");
    assert_eq!(seen.last(), Some(&LAST));
    assert_eq!(channel.overwritten() + seen.len() as u64, LAST);
}

#[test]
fn many_producers_never_lose_the_slot_value() {
    let channel = Arc::new(ResultChannel::new());
    let producers: Vec<_> = (0..4u64)
        .map(|id| {
            let channel = channel.clone();
            thread::spawn(move || {
                for n in 0..1000u64 {
                    channel.put(id * 10_000 + n);
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }

    let value = channel.take().unwrap();
    assert!(value % 10_000 == 999, "last write of some producer, got {}", value);
    assert_eq!(channel.take(), None);
    assert_eq!(channel.overwritten(), 3999);
}

#[test]
fn close_wakes_a_waiting_consumer() {
    let channel: Arc<ResultChannel<u8>> = Arc::new(ResultChannel::new());
    let waiter = {
        let channel = channel.clone();
        thread::spawn(move || channel.try_take(Duration::from_secs(30)))
    };
    thread::sleep(Duration::from_millis(50));
    channel.close();

    assert_eq!(waiter.join().unwrap(), None);
    assert!(!channel.put(7));
}
