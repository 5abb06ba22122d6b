use std::time::Duration;

use aquarium::fps::FpsTimer;

#[test]
fn reports_once_per_second() {
    let mut timer = FpsTimer::new();
    let reports: Vec<usize> = (1..=250)
        .filter(|_| timer.update(Duration::from_millis(10)))
        .collect();
    assert_eq!(reports, vec![100, 200]);
    assert_eq!(timer.frames(), 250);
    assert_eq!(timer.elapsed(), Duration::from_millis(2500));
}

#[test]
fn average_covers_recent_frames() {
    let mut timer = FpsTimer::default();
    assert_eq!(timer.average_fps(), 0.0);
    for _ in 0..100 {
        timer.update(Duration::from_millis(50));
    }
    assert!((timer.average_fps() - 20.0).abs() < 1e-9);
    for _ in 0..100 {
        timer.update(Duration::from_millis(10));
    }
    assert!((timer.average_fps() - 100.0).abs() < 1e-9);
}
