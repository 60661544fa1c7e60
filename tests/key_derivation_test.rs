// Property tests for cache key derivation
use proptest::prelude::*;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use svg_image_cache::svg_image::{
    DisplayConfig, LogicalSize, SvgRequest, TintColor, derive_key,
};

fn hash_of<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

fn optional_extent() -> impl Strategy<Value = Option<f64>> {
    prop::option::of(0.0f64..4096.0)
}

fn optional_scale() -> impl Strategy<Value = Option<f64>> {
    prop::option::of(-4.0f64..8.0)
}

prop_compose! {
    fn request()(
        locator in "[a-z]{1,12}\\.svg",
        width in optional_extent(),
        height in optional_extent(),
        scale in optional_scale(),
        tint in prop::option::of(any::<[u8; 4]>()),
    ) -> SvgRequest {
        let mut request = SvgRequest::asset(locator);
        request.requested_size = LogicalSize { width, height };
        request.requested_scale = scale;
        request.tint = tint.map(|[r, g, b, a]| TintColor::rgba(r, g, b, a));
        request
    }
}

prop_compose! {
    fn display()(
        width in optional_extent(),
        height in optional_extent(),
        ratio in optional_scale(),
    ) -> DisplayConfig {
        DisplayConfig {
            size: LogicalSize { width, height },
            device_pixel_ratio: ratio,
        }
    }
}

proptest! {
    #[test]
    fn derivation_is_deterministic(request in request(), display in display()) {
        let first = derive_key(&request, &display);
        let second = derive_key(&request.clone(), &display);

        prop_assert_eq!(&first, &second);
        prop_assert_eq!(hash_of(&first), hash_of(&second));
    }

    #[test]
    fn scale_is_always_positive(request in request(), display in display()) {
        let key = derive_key(&request, &display);

        prop_assert!(key.scale() > 0.0);
        prop_assert!(key.scale().is_finite());
    }

    #[test]
    fn pixel_size_is_rounded_product(
        width in 0.0f64..2048.0,
        height in 0.0f64..2048.0,
        scale in 0.1f64..6.0,
    ) {
        let key = derive_key(
            &SvgRequest::raw("<svg/>").with_size(width, height).with_scale(scale),
            &DisplayConfig::default(),
        );

        prop_assert_eq!(key.pixel_width(), (width * scale).round() as u32);
        prop_assert_eq!(key.pixel_height(), (height * scale).round() as u32);
    }

    #[test]
    fn height_never_borrows_the_width_fallback(
        requested_width in 1.0f64..512.0,
        ambient_width in 1.0f64..512.0,
        ambient_height in 1.0f64..512.0,
    ) {
        let key = derive_key(
            &SvgRequest::asset("a.svg").with_width(requested_width),
            &DisplayConfig::new(LogicalSize::new(ambient_width, ambient_height), 1.0),
        );

        prop_assert_eq!(key.pixel_width(), requested_width.round() as u32);
        prop_assert_eq!(key.pixel_height(), ambient_height.round() as u32);
    }

    #[test]
    fn tint_passes_through_unchanged(request in request(), display in display()) {
        let key = derive_key(&request, &display);

        prop_assert_eq!(key.tint(), request.tint);
    }
}

#[test]
fn end_to_end_key_for_asset_icon() {
    let request = SvgRequest::asset("icon.svg").with_size(32.0, 32.0);
    let display = DisplayConfig::new(LogicalSize::default(), 2.0);

    let key = derive_key(&request, &display);

    assert_eq!(key.pixel_width(), 64);
    assert_eq!(key.pixel_height(), 64);
    assert_eq!(key.scale(), 2.0);
    assert_eq!(key.tint(), None);
}

#[test]
fn width_forty_with_ambient_sixty_by_eighty() {
    let request = SvgRequest::asset("a.svg").with_width(40.0);
    let display = DisplayConfig::new(LogicalSize::new(60.0, 80.0), 1.0);

    let key = derive_key(&request, &display);

    assert_eq!((key.pixel_width(), key.pixel_height()), (40, 80));
}

#[test]
fn ten_and_a_half_at_double_scale_is_twenty_one() {
    let key = derive_key(
        &SvgRequest::asset("a.svg").with_size(10.5, 10.5).with_scale(2.0),
        &DisplayConfig::default(),
    );

    assert_eq!((key.pixel_width(), key.pixel_height()), (21, 21));
}
