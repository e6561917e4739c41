//! Integration tests for the frame model

use govee_patterns::frame::hsv_to_rgb;
use govee_patterns::Frame;

#[test]
fn full_saturation_and_value_always_has_a_full_channel() {
    for tenth in 0..3600 {
        let h = tenth as f64 / 10.0;
        let frame = Frame::from_hsv(h, 1.0, 1.0, 100);
        assert!(!frame.is_black(), "black at hue {}", h);
        assert!(
            frame.red == 255 || frame.green == 255 || frame.blue == 255,
            "no full channel at hue {}: {:?}",
            h,
            frame
        );
    }
}

#[test]
fn black_stays_black() {
    assert_eq!(
        Frame::from_hsv(0.0, 0.0, 0.0, 50),
        Frame { red: 0, green: 0, blue: 0, brightness: 50 }
    );
}

#[test]
fn pure_green() {
    assert_eq!(
        Frame::from_hsv(120.0, 1.0, 1.0, 100),
        Frame { red: 0, green: 255, blue: 0, brightness: 100 }
    );
}

#[test]
fn hue_360_equals_hue_0() {
    for &(s, v) in &[(1.0, 1.0), (0.5, 0.8), (0.2, 0.3), (0.0, 1.0)] {
        assert_eq!(
            Frame::from_hsv(360.0, s, v, 70),
            Frame::from_hsv(0.0, s, v, 70)
        );
    }
}

#[test]
fn brightness_is_clamped_in_hsv_constructor() {
    assert_eq!(Frame::from_hsv(10.0, 1.0, 1.0, 0).brightness, 1);
    assert_eq!(Frame::from_hsv(10.0, 1.0, 1.0, 1000).brightness, 100);
}

#[test]
fn secondary_colors() {
    assert_eq!(hsv_to_rgb(60.0, 1.0, 1.0), (255, 255, 0));
    assert_eq!(hsv_to_rgb(180.0, 1.0, 1.0), (0, 255, 255));
    assert_eq!(hsv_to_rgb(300.0, 1.0, 1.0), (255, 0, 255));
}

#[test]
fn frames_are_plain_values() {
    let a = Frame::from_rgb(10, 20, 30, 40);
    let b = a;
    assert_eq!(a, b);
    assert_eq!(
        serde_json::to_value(a).unwrap(),
        serde_json::json!({"red": 10, "green": 20, "blue": 30, "brightness": 40})
    );
}
