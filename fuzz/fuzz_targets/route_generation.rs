#![no_main]

use ferrous_kernel::{RouteOptions, Router};
use libfuzzer_sys::fuzz_target;

// Arbitrary route patterns and parameter values: registration may fail,
// generation and matching must not panic.
fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    let (pattern, value) = input.split_once('\n').unwrap_or((input, ""));

    let router = Router::new();
    if router.get(pattern, "Target", RouteOptions::named("target")).is_err() {
        return;
    }

    let _ = router.route_path("target", &[]);
    if let Ok(path) = router.route_path("target", &[("id", value), ("slug", value)]) {
        let _ = router.dispatch(&http::Method::GET, &path);
    }
});
